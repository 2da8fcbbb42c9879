//! `pointsman-runtime` – routine dispatch across the simulated and physical
//! channels.
//!
//! # Modules
//!
//! - [`channel`] – [`MotionChannel`][channel::MotionChannel] and its two
//!   implementations. [`SimulatedChannel`][channel::SimulatedChannel] blocks
//!   on the simulator; [`PhysicalChannel`][channel::PhysicalChannel] streams
//!   script lines to the controller and waits a calibrated duration after
//!   each one.
//! - [`dispatcher`] – [`Dispatcher`][dispatcher::Dispatcher]: the
//!   `Idle → RunningRoutine → Idle` state machine that plays an ordered list
//!   of routines, one channel at a time.
//! - [`session`] – [`Session`][session::Session]: probes the controller once,
//!   owns the link for the whole run and closes it on every exit path.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with an optional OTLP span exporter.
//!
//! # Open-loop gap
//!
//! The physical channel has no completion feedback. If a move outlasts its
//! calibrated wait the next command is queued behind it and nothing in this
//! crate can tell. The waits are carried on every command as
//! [`OpenLoopTiming`][pointsman_types::OpenLoopTiming] so the assumption is
//! visible in the types.

pub mod channel;
pub mod dispatcher;
pub mod session;
pub mod telemetry;

pub use channel::{ChannelKind, ChannelOutcome, MotionChannel, PhysicalChannel, SimulatedChannel};
pub use dispatcher::{Dispatcher, DispatcherState, RoutineReport};
pub use session::{Session, SessionConfig, SessionReport};
pub use telemetry::{TracerProviderGuard, init_tracing};
