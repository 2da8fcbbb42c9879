//! Simulated channel.
//!
//! The simulation environment (inverse kinematics, rendering, station file)
//! lives outside this workspace. The rest of the stack only
//! talks to the [`SimulatedArm`] trait, so a real simulator bridge and the
//! in-process [`KinematicSim`] are interchangeable.

use std::collections::BTreeSet;

use pointsman_types::{ArmError, Pose, SimInstruction, SimMotion};
use tracing::debug;

/// A simulated robot arm that can move to named station targets.
pub trait SimulatedArm: Send {
    /// Robot name inside the simulation station, e.g. `"UR5e"`.
    fn name(&self) -> &str;

    /// Assign the reference frame all pose targets are expressed in.
    fn set_pose_frame(&mut self, frame: &str) -> Result<(), ArmError>;

    /// Assign the tool-center-point offset used for pose targets.
    fn set_pose_tool(&mut self, tool: &Pose) -> Result<(), ArmError>;

    /// Simulated linear speed in mm/s.
    fn set_speed(&mut self, speed_mm_s: f64) -> Result<(), ArmError>;

    /// Whether the station defines a target called `name`.
    fn has_target(&self, name: &str) -> bool;

    /// Execute a move. When `instruction.blocking` is set this returns only
    /// once the simulator reports the move complete.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::SimulationTargetInvalid`] for a target the station
    /// does not know and [`ArmError::SimulationFault`] if the move fails.
    fn execute(&mut self, instruction: &SimInstruction) -> Result<(), ArmError>;
}

/// In-process simulated arm.
///
/// Moves complete instantly. The arm records every executed instruction and
/// the station setup so tests can assert on what the simulated channel saw.
pub struct KinematicSim {
    name: String,
    station: BTreeSet<String>,
    frame: Option<String>,
    tool: Option<Pose>,
    speed_mm_s: Option<f64>,
    current_target: Option<String>,
    history: Vec<SimInstruction>,
}

impl KinematicSim {
    /// Create a simulated arm with an empty station.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            station: BTreeSet::new(),
            frame: None,
            tool: None,
            speed_mm_s: None,
            current_target: None,
            history: Vec::new(),
        }
    }

    /// Add a named target to the station.
    pub fn with_target(mut self, name: impl Into<String>) -> Self {
        self.station.insert(name.into());
        self
    }

    /// Add several named targets to the station.
    pub fn with_targets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.station.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn frame(&self) -> Option<&str> {
        self.frame.as_deref()
    }

    pub fn tool(&self) -> Option<&Pose> {
        self.tool.as_ref()
    }

    pub fn speed(&self) -> Option<f64> {
        self.speed_mm_s
    }

    /// The last target the arm arrived at.
    pub fn current_target(&self) -> Option<&str> {
        self.current_target.as_deref()
    }

    /// Every instruction executed so far, in order.
    pub fn history(&self) -> &[SimInstruction] {
        &self.history
    }
}

impl SimulatedArm for KinematicSim {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_pose_frame(&mut self, frame: &str) -> Result<(), ArmError> {
        self.frame = Some(frame.to_string());
        Ok(())
    }

    fn set_pose_tool(&mut self, tool: &Pose) -> Result<(), ArmError> {
        tool.validate()?;
        self.tool = Some(*tool);
        Ok(())
    }

    fn has_target(&self, name: &str) -> bool {
        self.station.contains(name)
    }

    fn set_speed(&mut self, speed_mm_s: f64) -> Result<(), ArmError> {
        if !(speed_mm_s.is_finite() && speed_mm_s > 0.0) {
            return Err(ArmError::SimulationFault {
                target: self.name.clone(),
                details: format!("speed must be positive, got {speed_mm_s}"),
            });
        }
        self.speed_mm_s = Some(speed_mm_s);
        Ok(())
    }

    fn execute(&mut self, instruction: &SimInstruction) -> Result<(), ArmError> {
        for target in instruction.target_names() {
            if !self.station.contains(target) {
                return Err(ArmError::SimulationTargetInvalid(target.to_string()));
            }
        }
        let arrived = match &instruction.motion {
            SimMotion::Joint { target, .. } | SimMotion::Linear { target, .. } => target,
            SimMotion::Circular { to, .. } => to,
        };
        debug!(robot = %self.name, target = %arrived, "simulated move complete");
        self.current_target = Some(arrived.clone());
        self.history.push(instruction.clone());
        Ok(())
    }
}
