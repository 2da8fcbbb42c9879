//! `pointsman-motion` – what the arm does, independent of how it is driven.
//!
//! # Modules
//!
//! - [`waypoints`] – [`WaypointLibrary`][waypoints::WaypointLibrary]: the
//!   named poses and joint configurations of the traffic gestures, and the
//!   default motion parameters per move kind.
//! - [`command`] – [`MotionCommand`][command::MotionCommand]: a validated
//!   joint, linear, or circular move.
//! - [`encoder`] – renders a command as controller script text or as a
//!   blocking simulator instruction.
//! - [`routine`] – [`Routine`][routine::Routine] and
//!   [`RoutineBuilder`][routine::RoutineBuilder], plus the deployed
//!   `Init`, `PriorityPeople` and `PriorityCars` choreographies.

pub mod command;
pub mod encoder;
pub mod routine;
pub mod waypoints;

pub use command::{CircularMode, Motion, MotionCommand, MoveKind, NamedTarget};
pub use encoder::{encode_physical, encode_set_tcp, encode_simulated};
pub use routine::{Routine, RoutineBuilder, standard_program};
pub use waypoints::{Waypoint, WaypointLibrary};
