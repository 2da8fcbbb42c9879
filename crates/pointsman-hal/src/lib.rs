//! `pointsman-hal` – the two motion channels and the clock between them.
//!
//! # Modules
//!
//! - [`sim`] – [`SimulatedArm`][sim::SimulatedArm]: blocking "move to target"
//!   interface of the simulation environment, plus
//!   [`KinematicSim`][sim::KinematicSim], an in-process stand-in used for
//!   headless runs and CI.
//! - [`link`] – [`CommandLink`][link::CommandLink]: write-only text link to
//!   the physical controller. [`TcpLink`][link::TcpLink] is the real socket;
//!   [`RecordingLink`][link::RecordingLink] captures traffic in tests.
//! - [`probe`] – [`probe`][probe::probe]: one-shot reachability check that
//!   hands over the opened connection on success.
//! - [`pacer`] – [`Pacer`][pacer::Pacer]: the open-loop wait between
//!   physical commands.

pub mod link;
pub mod pacer;
pub mod probe;
pub mod sim;

pub use link::{CommandLink, LinkJournal, RecordingLink, TcpLink};
pub use pacer::{Pacer, RecordingPacer, ThreadPacer};
pub use probe::{ProbeOutcome, probe};
pub use sim::{KinematicSim, SimulatedArm};
