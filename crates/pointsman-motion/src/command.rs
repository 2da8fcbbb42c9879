//! Validated motion commands.
//!
//! A [`MotionCommand`] can only be built through its constructors, which
//! check the structural invariants up front: finite targets, non-empty target
//! names, and a parameter set whose units match the move kind (angular for
//! joint moves, linear for Cartesian ones). Anything that reaches the encoder
//! is therefore well formed.

use std::fmt;
use std::time::Duration;

use pointsman_types::{ArmError, JointConfiguration, MotionParameters, MotionUnits, OpenLoopTiming, Pose};

/// Move family, as understood by both channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKind {
    Joint,
    Linear,
    Circular,
}

impl MoveKind {
    /// Unit family this kind of move is parameterised in.
    pub fn units(self) -> MotionUnits {
        match self {
            MoveKind::Joint => MotionUnits::Angular,
            MoveKind::Linear | MoveKind::Circular => MotionUnits::Linear,
        }
    }
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveKind::Joint => write!(f, "joint"),
            MoveKind::Linear => write!(f, "linear"),
            MoveKind::Circular => write!(f, "circular"),
        }
    }
}

/// Orientation behaviour along a circular arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircularMode {
    /// Orientation interpolated from start pose to target pose.
    Unconstrained,
    /// Orientation kept fixed relative to the arc tangent.
    FixedOrientation,
}

impl CircularMode {
    /// Integer used in the `movec` mode field.
    pub fn wire_value(self) -> u8 {
        match self {
            CircularMode::Unconstrained => 0,
            CircularMode::FixedOrientation => 1,
        }
    }
}

/// A waypoint value together with the station name it is known by.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTarget<T> {
    pub name: String,
    pub value: T,
}

/// The move itself. Read through [`MotionCommand::motion`].
#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    Joint {
        target: NamedTarget<JointConfiguration>,
        params: MotionParameters,
    },
    Linear {
        target: NamedTarget<Pose>,
        params: MotionParameters,
    },
    Circular {
        via: NamedTarget<Pose>,
        to: NamedTarget<Pose>,
        mode: CircularMode,
        params: MotionParameters,
    },
}

/// One validated move.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionCommand {
    motion: Motion,
}

fn check_name(name: &str) -> Result<(), ArmError> {
    if name.trim().is_empty() {
        return Err(ArmError::InvalidCommand("target name must not be empty".to_string()));
    }
    Ok(())
}

impl MotionCommand {
    /// Joint-space move to `joints`.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidCommand`] when `params` are not angular, or any
    /// value is out of range.
    pub fn joint(
        name: impl Into<String>,
        joints: JointConfiguration,
        params: MotionParameters,
    ) -> Result<Self, ArmError> {
        let name = name.into();
        check_name(&name)?;
        joints.validate()?;
        params.validate_for(MoveKind::Joint.units())?;
        Ok(Self {
            motion: Motion::Joint {
                target: NamedTarget { name, value: joints },
                params,
            },
        })
    }

    /// Straight-line Cartesian move to `pose`.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidCommand`] when `params` are not linear, or any
    /// value is out of range.
    pub fn linear(
        name: impl Into<String>,
        pose: Pose,
        params: MotionParameters,
    ) -> Result<Self, ArmError> {
        let name = name.into();
        check_name(&name)?;
        pose.validate()?;
        params.validate_for(MoveKind::Linear.units())?;
        Ok(Self {
            motion: Motion::Linear {
                target: NamedTarget { name, value: pose },
                params,
            },
        })
    }

    /// Circular move through `via` to `to`.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidCommand`] when `params` are not linear, or any
    /// value is out of range.
    pub fn circular(
        via_name: impl Into<String>,
        via: Pose,
        to_name: impl Into<String>,
        to: Pose,
        mode: CircularMode,
        params: MotionParameters,
    ) -> Result<Self, ArmError> {
        let via_name = via_name.into();
        let to_name = to_name.into();
        check_name(&via_name)?;
        check_name(&to_name)?;
        via.validate()?;
        to.validate()?;
        params.validate_for(MoveKind::Circular.units())?;
        Ok(Self {
            motion: Motion::Circular {
                via: NamedTarget { name: via_name, value: via },
                to: NamedTarget { name: to_name, value: to },
                mode,
                params,
            },
        })
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    pub fn kind(&self) -> MoveKind {
        match self.motion {
            Motion::Joint { .. } => MoveKind::Joint,
            Motion::Linear { .. } => MoveKind::Linear,
            Motion::Circular { .. } => MoveKind::Circular,
        }
    }

    pub fn params(&self) -> &MotionParameters {
        match &self.motion {
            Motion::Joint { params, .. }
            | Motion::Linear { params, .. }
            | Motion::Circular { params, .. } => params,
        }
    }

    pub fn timing(&self) -> OpenLoopTiming {
        self.params().timing
    }

    /// Calibrated wait after this command on the physical channel.
    pub fn open_loop_wait(&self) -> Duration {
        self.timing().wait
    }

    /// Name of the target the arm ends up at.
    pub fn destination(&self) -> &str {
        match &self.motion {
            Motion::Joint { target, .. } => &target.name,
            Motion::Linear { target, .. } => &target.name,
            Motion::Circular { to, .. } => &to.name,
        }
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.motion {
            Motion::Circular { via, to, .. } => {
                write!(f, "circular via {} to {}", via.name, to.name)
            }
            _ => write!(f, "{} to {}", self.kind(), self.destination()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angular() -> MotionParameters {
        MotionParameters::angular(1.2, 0.75, OpenLoopTiming::from_secs(6))
    }

    fn linear() -> MotionParameters {
        MotionParameters::linear(1.2, 0.25, OpenLoopTiming::from_secs(4))
    }

    #[test]
    fn joint_move_requires_angular_parameters() {
        let joints = JointConfiguration::from_array([0.0; 6]);
        assert!(MotionCommand::joint("Init", joints, angular()).is_ok());
        let err = MotionCommand::joint("Init", joints, linear()).unwrap_err();
        assert!(matches!(err, ArmError::InvalidCommand(_)));
    }

    #[test]
    fn cartesian_moves_require_linear_parameters() {
        let pose = Pose::identity();
        assert!(MotionCommand::linear("Stop_car", pose, linear()).is_ok());
        assert!(MotionCommand::linear("Stop_car", pose, angular()).is_err());
        assert!(
            MotionCommand::circular("a", pose, "b", pose, CircularMode::Unconstrained, angular())
                .is_err()
        );
    }

    #[test]
    fn empty_name_and_non_finite_pose_are_rejected() {
        assert!(MotionCommand::linear("  ", Pose::identity(), linear()).is_err());
        let bad = Pose::new(f64::NAN, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert!(MotionCommand::linear("x", bad, linear()).is_err());
        assert!(
            MotionCommand::circular("a", Pose::identity(), "b", bad, CircularMode::FixedOrientation, linear())
                .is_err()
        );
    }

    #[test]
    fn accessors_reflect_kind() {
        let cmd = MotionCommand::circular(
            "Move_car_2",
            Pose::identity(),
            "Move_car_3",
            Pose::identity(),
            CircularMode::FixedOrientation,
            linear().with_timing(OpenLoopTiming::from_secs(8)),
        )
        .unwrap();
        assert_eq!(cmd.kind(), MoveKind::Circular);
        assert_eq!(cmd.destination(), "Move_car_3");
        assert_eq!(cmd.open_loop_wait(), Duration::from_secs(8));
        assert_eq!(cmd.to_string(), "circular via Move_car_2 to Move_car_3");
    }

    #[test]
    fn circular_mode_wire_values() {
        assert_eq!(CircularMode::Unconstrained.wire_value(), 0);
        assert_eq!(CircularMode::FixedOrientation.wire_value(), 1);
    }
}
