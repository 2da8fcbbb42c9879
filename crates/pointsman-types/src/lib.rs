use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Degrees of freedom of the deployed arm (UR5e).
pub const DOF: usize = 6;

/// A Cartesian tool pose: position in metres plus orientation as a rotation
/// vector in radians.
///
/// Serialised as a flat `[x, y, z, rx, ry, rz]` array so it reads naturally
/// in TOML and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, z: f64, rx: f64, ry: f64, rz: f64) -> Self {
        Self { x, y, z, rx, ry, rz }
    }

    /// The identity pose (no translation, no rotation).
    pub const fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
    }

    pub const fn as_array(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.rx, self.ry, self.rz]
    }

    /// Reject poses carrying NaN or infinite components.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidCommand`] naming the offending component.
    pub fn validate(&self) -> Result<(), ArmError> {
        const NAMES: [&str; 6] = ["x", "y", "z", "rx", "ry", "rz"];
        for (name, value) in NAMES.iter().zip(self.as_array()) {
            if !value.is_finite() {
                return Err(ArmError::InvalidCommand(format!(
                    "pose component {name} is not finite ({value})"
                )));
            }
        }
        Ok(())
    }
}

impl From<[f64; 6]> for Pose {
    fn from(v: [f64; 6]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }
}

impl From<Pose> for [f64; 6] {
    fn from(p: Pose) -> Self {
        p.as_array()
    }
}

/// Target joint angles in radians, one per axis, base first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointConfiguration([f64; DOF]);

impl JointConfiguration {
    /// Build a configuration from a fixed-size array. Used for compile-time
    /// waypoint constants, where the length is already guaranteed.
    pub const fn from_array(angles: [f64; DOF]) -> Self {
        Self(angles)
    }

    /// Build a configuration from an arbitrary slice.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidCommand`] when `angles.len() != DOF` or any
    /// angle is not finite.
    pub fn new(angles: &[f64]) -> Result<Self, ArmError> {
        let fixed: [f64; DOF] = angles.try_into().map_err(|_| {
            ArmError::InvalidCommand(format!(
                "joint configuration has {} angles, expected {DOF}",
                angles.len()
            ))
        })?;
        let cfg = Self(fixed);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn angles(&self) -> &[f64; DOF] {
        &self.0
    }

    /// # Errors
    ///
    /// Returns [`ArmError::InvalidCommand`] when any angle is NaN or infinite.
    pub fn validate(&self) -> Result<(), ArmError> {
        match self.0.iter().position(|a| !a.is_finite()) {
            Some(i) => Err(ArmError::InvalidCommand(format!(
                "joint {} angle is not finite ({})",
                i + 1,
                self.0[i]
            ))),
            None => Ok(()),
        }
    }
}

/// Unit family a [`MotionParameters`] set is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionUnits {
    /// rad/s and rad/s², used by joint-space moves.
    Angular,
    /// m/s and m/s², used by Cartesian (linear and circular) moves.
    Linear,
}

impl fmt::Display for MotionUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionUnits::Angular => write!(f, "angular"),
            MotionUnits::Linear => write!(f, "linear"),
        }
    }
}

/// How long to wait after streaming a command to the physical controller
/// before streaming the next one.
///
/// These durations are calibrated by the routine author, not measured: the
/// controller sends no completion acknowledgment on the command channel. If
/// the real move takes longer than `wait`, the next command is queued behind
/// it and nothing in the system notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLoopTiming {
    pub wait: Duration,
}

impl OpenLoopTiming {
    pub const fn calibrated(wait: Duration) -> Self {
        Self { wait }
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self::calibrated(Duration::from_secs(secs))
    }
}

/// Acceleration, velocity, blend and timing for a single move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionParameters {
    pub units: MotionUnits,
    pub acceleration: f64,
    pub velocity: f64,
    /// Metres. `0.0` stops exactly at the target, larger values blend into
    /// the next move.
    pub blend_radius: f64,
    /// Controller-side move time in seconds (`t` field of the wire command).
    /// `0.0` lets the controller derive it from acceleration and velocity.
    pub move_time: f64,
    pub timing: OpenLoopTiming,
}

impl MotionParameters {
    pub const fn angular(acceleration: f64, velocity: f64, timing: OpenLoopTiming) -> Self {
        Self {
            units: MotionUnits::Angular,
            acceleration,
            velocity,
            blend_radius: 0.0,
            move_time: 0.0,
            timing,
        }
    }

    pub const fn linear(acceleration: f64, velocity: f64, timing: OpenLoopTiming) -> Self {
        Self {
            units: MotionUnits::Linear,
            acceleration,
            velocity,
            blend_radius: 0.0,
            move_time: 0.0,
            timing,
        }
    }

    pub const fn with_blend(mut self, blend_radius: f64) -> Self {
        self.blend_radius = blend_radius;
        self
    }

    pub const fn with_move_time(mut self, move_time: f64) -> Self {
        self.move_time = move_time;
        self
    }

    pub const fn with_timing(mut self, timing: OpenLoopTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Check that this parameter set is usable for a move expressed in
    /// `expected` units.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidCommand`] on a unit mismatch, a
    /// non-positive acceleration or velocity, or a negative blend radius or
    /// move time.
    pub fn validate_for(&self, expected: MotionUnits) -> Result<(), ArmError> {
        if self.units != expected {
            return Err(ArmError::InvalidCommand(format!(
                "{} parameters supplied where {expected} parameters are required",
                self.units
            )));
        }
        if !(self.acceleration.is_finite() && self.acceleration > 0.0) {
            return Err(ArmError::InvalidCommand(format!(
                "acceleration must be positive, got {}",
                self.acceleration
            )));
        }
        if !(self.velocity.is_finite() && self.velocity > 0.0) {
            return Err(ArmError::InvalidCommand(format!(
                "velocity must be positive, got {}",
                self.velocity
            )));
        }
        if !(self.blend_radius.is_finite() && self.blend_radius >= 0.0) {
            return Err(ArmError::InvalidCommand(format!(
                "blend radius must be non-negative, got {}",
                self.blend_radius
            )));
        }
        if !(self.move_time.is_finite() && self.move_time >= 0.0) {
            return Err(ArmError::InvalidCommand(format!(
                "move time must be non-negative, got {}",
                self.move_time
            )));
        }
        Ok(())
    }
}

/// Whether the physical controller answered the session's one-shot probe.
///
/// Decided once per session and never re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelCapability {
    PhysicalReachable,
    SimulationOnly,
}

impl ChannelCapability {
    pub fn is_physical(self) -> bool {
        matches!(self, ChannelCapability::PhysicalReachable)
    }
}

impl fmt::Display for ChannelCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelCapability::PhysicalReachable => write!(f, "physical+simulation"),
            ChannelCapability::SimulationOnly => write!(f, "simulation-only"),
        }
    }
}

/// A blocking move understood by the simulation environment.
///
/// Targets are referenced by their station name so the simulator can resolve
/// them against its own target list; the numeric value travels alongside for
/// simulators that only accept raw targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimMotion {
    Joint {
        target: String,
        joints: JointConfiguration,
    },
    Linear {
        target: String,
        pose: Pose,
    },
    Circular {
        via: String,
        via_pose: Pose,
        to: String,
        to_pose: Pose,
    },
}

/// Instruction for the simulated channel. `blocking` is always `true` for
/// choreography playback: the simulator's own completion is the
/// synchronisation point for that channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimInstruction {
    pub motion: SimMotion,
    pub blocking: bool,
}

impl SimInstruction {
    /// Every station target name this instruction refers to, in order.
    pub fn target_names(&self) -> Vec<&str> {
        match &self.motion {
            SimMotion::Joint { target, .. } | SimMotion::Linear { target, .. } => {
                vec![target.as_str()]
            }
            SimMotion::Circular { via, to, .. } => vec![via.as_str(), to.as_str()],
        }
    }
}

/// Error type shared by every layer of the motion stack.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArmError {
    /// Probe failure. Recovered by falling back to simulation-only playback.
    #[error("Physical controller unreachable at {address}: {reason}")]
    ChannelUnreachable { address: String, reason: String },

    /// A motion command violated its structural invariant.
    #[error("Invalid motion command: {0}")]
    InvalidCommand(String),

    /// The physical link failed mid-routine.
    #[error("Transport write failed in routine '{routine}' at command #{index} ({command}): {reason}")]
    TransportWriteFailure {
        routine: String,
        index: usize,
        command: String,
        reason: String,
    },

    /// A named target is not part of the waypoint library / simulation station.
    #[error("Unknown simulation target '{0}'")]
    SimulationTargetInvalid(String),

    /// The simulator refused or failed to complete a move.
    #[error("Simulation fault on {target}: {details}")]
    SimulationFault { target: String, details: String },
}

impl ArmError {
    /// Only probe failures are recoverable; everything else aborts the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ArmError::ChannelUnreachable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joint_configuration_rejects_wrong_length() {
        let err = JointConfiguration::new(&[0.0; 5]).unwrap_err();
        assert!(matches!(err, ArmError::InvalidCommand(_)));
        assert!(err.to_string().contains("expected 6"));

        assert!(JointConfiguration::new(&[0.0; 7]).is_err());
        assert!(JointConfiguration::new(&[0.0; 6]).is_ok());
    }

    #[test]
    fn joint_configuration_rejects_nan() {
        let err = JointConfiguration::new(&[0.0, 0.0, f64::NAN, 0.0, 0.0, 0.0]).unwrap_err();
        assert!(err.to_string().contains("joint 3"));
    }

    #[test]
    fn pose_validate_names_bad_component() {
        let pose = Pose::new(0.0, 0.0, 0.0, 0.0, f64::INFINITY, 0.0);
        let err = pose.validate().unwrap_err();
        assert!(err.to_string().contains("ry"));
        assert!(Pose::identity().validate().is_ok());
    }

    #[test]
    fn pose_serialises_as_flat_array() {
        let pose = Pose::new(0.0, 0.0, 0.05, 0.0, 0.0, 0.0);
        let json = serde_json::to_string(&pose).unwrap();
        assert_eq!(json, "[0.0,0.0,0.05,0.0,0.0,0.0]");
        let back: Pose = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pose);
    }

    #[test]
    fn parameters_reject_unit_mismatch() {
        let params = MotionParameters::angular(1.2, 0.75, OpenLoopTiming::from_secs(6));
        assert!(params.validate_for(MotionUnits::Angular).is_ok());
        let err = params.validate_for(MotionUnits::Linear).unwrap_err();
        assert!(err.to_string().contains("angular parameters supplied"));
    }

    #[test]
    fn parameters_reject_non_positive_velocity_and_negative_blend() {
        let timing = OpenLoopTiming::from_secs(4);
        assert!(MotionParameters::linear(1.2, 0.0, timing)
            .validate_for(MotionUnits::Linear)
            .is_err());
        assert!(MotionParameters::linear(1.2, 0.25, timing)
            .with_blend(-0.1)
            .validate_for(MotionUnits::Linear)
            .is_err());
        assert!(MotionParameters::linear(1.2, 0.25, timing)
            .with_blend(0.452)
            .validate_for(MotionUnits::Linear)
            .is_ok());
    }

    #[test]
    fn circular_instruction_lists_both_targets() {
        let instr = SimInstruction {
            motion: SimMotion::Circular {
                via: "Move_car_2".to_string(),
                via_pose: Pose::identity(),
                to: "Move_car_3".to_string(),
                to_pose: Pose::identity(),
            },
            blocking: true,
        };
        assert_eq!(instr.target_names(), vec!["Move_car_2", "Move_car_3"]);
    }

    #[test]
    fn only_unreachable_channel_is_recoverable() {
        let unreachable = ArmError::ChannelUnreachable {
            address: "192.168.1.5:30002".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(!unreachable.is_fatal());
        assert!(ArmError::InvalidCommand("x".to_string()).is_fatal());
        assert!(ArmError::SimulationTargetInvalid("Nowhere".to_string()).is_fatal());
    }

    #[test]
    fn transport_failure_display_names_routine_and_index() {
        let err = ArmError::TransportWriteFailure {
            routine: "PriorityCars".to_string(),
            index: 3,
            command: "movel(...)".to_string(),
            reason: "broken pipe".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PriorityCars"));
        assert!(msg.contains("#3"));
    }

    #[test]
    fn capability_display() {
        assert_eq!(ChannelCapability::SimulationOnly.to_string(), "simulation-only");
        assert!(ChannelCapability::PhysicalReachable.is_physical());
    }
}
