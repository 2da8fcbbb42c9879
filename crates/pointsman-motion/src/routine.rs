//! Routines: named, ordered sequences of motion commands.
//!
//! The order of commands in a routine is the choreography. Routines are
//! built against a [`WaypointLibrary`]; every name is resolved at build time
//! so a misspelt target fails before any motion is attempted.

use std::time::Duration;

use pointsman_types::ArmError;
use tracing::debug;

use crate::command::{CircularMode, Motion, MotionCommand, MoveKind};
use crate::waypoints::WaypointLibrary;

pub const INIT: &str = "Init";
pub const PRIORITY_PEOPLE: &str = "PriorityPeople";
pub const PRIORITY_CARS: &str = "PriorityCars";

/// A named, immutable sequence of motion commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    name: String,
    commands: Vec<MotionCommand>,
}

impl Routine {
    /// Build a routine from already validated commands.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidCommand`] for an empty name or an empty command
    /// list.
    pub fn new(name: impl Into<String>, commands: Vec<MotionCommand>) -> Result<Self, ArmError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ArmError::InvalidCommand("routine name must not be empty".to_string()));
        }
        if commands.is_empty() {
            return Err(ArmError::InvalidCommand(format!("routine '{name}' has no commands")));
        }
        Ok(Self { name, commands })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[MotionCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Sum of the calibrated open-loop waits of every command, excluding the
    /// tool settle time.
    pub fn open_loop_budget(&self) -> Duration {
        self.commands.iter().map(MotionCommand::open_loop_wait).sum()
    }
}

/// Fluent builder resolving waypoint names against a library.
///
/// The first failure is kept and returned from [`build`][Self::build]; later
/// calls are ignored once an error is recorded.
pub struct RoutineBuilder<'a> {
    library: &'a WaypointLibrary,
    name: String,
    commands: Vec<MotionCommand>,
    error: Option<ArmError>,
}

impl<'a> RoutineBuilder<'a> {
    pub fn new(library: &'a WaypointLibrary, name: impl Into<String>) -> Self {
        Self {
            library,
            name: name.into(),
            commands: Vec::new(),
            error: None,
        }
    }

    fn push(mut self, command: Result<MotionCommand, ArmError>) -> Self {
        if self.error.is_none() {
            match command {
                Ok(c) => self.commands.push(c),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Joint move to a joint-configuration waypoint with default parameters.
    pub fn joint(self, target: &str) -> Self {
        let cmd = self.library.joints(target).and_then(|joints| {
            MotionCommand::joint(target, joints, self.library.defaults(MoveKind::Joint))
        });
        self.push(cmd)
    }

    /// Linear move to a pose waypoint with default parameters.
    pub fn linear(self, target: &str) -> Self {
        let cmd = self.library.pose(target).and_then(|pose| {
            MotionCommand::linear(target, pose, self.library.defaults(MoveKind::Linear))
        });
        self.push(cmd)
    }

    /// Circular move through `via` to `to` with default parameters.
    pub fn circular(self, via: &str, to: &str, mode: CircularMode) -> Self {
        let cmd = self.library.pose(via).and_then(|via_pose| {
            let to_pose = self.library.pose(to)?;
            MotionCommand::circular(
                via,
                via_pose,
                to,
                to_pose,
                mode,
                self.library.defaults(MoveKind::Circular),
            )
        });
        self.push(cmd)
    }

    /// Append an arbitrary pre-built command. Its target names must still be
    /// known to the library.
    pub fn command(self, command: MotionCommand) -> Self {
        let names: Vec<String> = match command.motion() {
            Motion::Circular { via, to, .. } => {
                vec![via.name.clone(), to.name.clone()]
            }
            _ => vec![command.destination().to_string()],
        };
        let checked = names
            .iter()
            .try_for_each(|n| self.library.get(n).map(|_| ()))
            .map(|()| command);
        self.push(checked)
    }

    /// # Errors
    ///
    /// The first error recorded while adding commands, or
    /// [`ArmError::InvalidCommand`] for an empty routine.
    pub fn build(self) -> Result<Routine, ArmError> {
        if let Some(e) = self.error {
            debug!(routine = %self.name, error = %e, "routine rejected");
            return Err(e);
        }
        let routine = Routine::new(self.name, self.commands)?;
        debug!(
            routine = routine.name(),
            commands = routine.len(),
            budget = ?routine.open_loop_budget(),
            "routine built"
        );
        Ok(routine)
    }
}

/// Return to the neutral pose, then hold traffic with the stop-car gesture.
pub fn init(library: &WaypointLibrary) -> Result<Routine, ArmError> {
    RoutineBuilder::new(library, INIT)
        .joint("Init")
        .linear("Stop_car")
        .build()
}

/// Wave pedestrians across: sweep the hand twice between the two sides.
pub fn priority_people(library: &WaypointLibrary) -> Result<Routine, ArmError> {
    RoutineBuilder::new(library, PRIORITY_PEOPLE)
        .linear("Move_people_1")
        .linear("Move_people_2")
        .linear("Move_people_1")
        .linear("Move_people_2")
        .build()
}

/// Stop pedestrians, then wave cars through with two circular beckons.
pub fn priority_cars(library: &WaypointLibrary) -> Result<Routine, ArmError> {
    RoutineBuilder::new(library, PRIORITY_CARS)
        .joint("Stop_people")
        .linear("Move_car_1")
        .circular("Move_car_2", "Move_car_3", CircularMode::FixedOrientation)
        .linear("Move_car_1")
        .circular("Move_car_2", "Move_car_3", CircularMode::FixedOrientation)
        .build()
}

/// The deployed program, in playback order.
pub fn standard_program(library: &WaypointLibrary) -> Result<Vec<Routine>, ArmError> {
    Ok(vec![
        init(library)?,
        priority_people(library)?,
        priority_cars(library)?,
    ])
}
