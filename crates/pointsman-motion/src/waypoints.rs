//! Waypoint library.
//!
//! Named targets for the traffic gestures of a UR5e mounted with a hand
//! tool, together with the default motion parameters for each move kind.
//! Everything here is a constant; the library is read-only once built.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use pointsman_types::{ArmError, JointConfiguration, MotionParameters, OpenLoopTiming, Pose};

use crate::command::MoveKind;

// ────────────────────────────────────────────────────────────────────────────
// Targets
// ────────────────────────────────────────────────────────────────────────────

pub const INIT: JointConfiguration =
    JointConfiguration::from_array([-1.403391, -3.022038, 0.702024, 3.890810, -1.570796, 1.403391]);
pub const STOP_PEOPLE: JointConfiguration =
    JointConfiguration::from_array([1.780096, 4.905597, 0.927049, 2.021336, -1.570796, -3.350893]);

pub const STOP_CAR: Pose = Pose::new(0.000000, -0.550440, 0.650000, 0.000000, 0.000000, 1.570796);
pub const MOVE_PEOPLE_1: Pose = Pose::new(0.420932, -0.429770, 0.500000, 1.570796, 0.000000, 0.000000);
pub const MOVE_PEOPLE_2: Pose = Pose::new(-0.348293, -0.479116, 0.500000, 1.570796, 0.000000, 0.000000);
pub const MOVE_CAR_1: Pose = Pose::new(-0.131592, -0.773596, 0.543016, 0.515761, 0.515761, -1.508563);
pub const MOVE_CAR_2: Pose = Pose::new(-0.131592, -0.353295, 0.748730, -0.062968, -0.062970, -1.569875);
pub const MOVE_CAR_3: Pose = Pose::new(-0.131593, -0.015090, 0.712308, -0.625258, -0.625264, -1.478832);

/// Flange-to-hand offset: the hand tip sits 50 mm along the tool Z axis.
/// Sent as `set_tcp` before every physical routine.
pub const TOOL_OFFSET: Pose = Pose::new(0.0, 0.0, 0.05, 0.0, 0.0, 0.0);

// ────────────────────────────────────────────────────────────────────────────
// Motion defaults
// ────────────────────────────────────────────────────────────────────────────

pub const JOINT_DEFAULTS: MotionParameters =
    MotionParameters::angular(1.2, 0.75, OpenLoopTiming::from_secs(6));
pub const LINEAR_DEFAULTS: MotionParameters =
    MotionParameters::linear(1.2, 0.25, OpenLoopTiming::from_secs(4));
pub const CIRCULAR_DEFAULTS: MotionParameters =
    MotionParameters::linear(1.2, 0.25, OpenLoopTiming::from_secs(8));

/// Wait after `set_tcp` so the controller applies the offset before the
/// first move of a routine.
pub const TOOL_SETTLE: Duration = Duration::from_secs(1);

/// A stored target: either a joint configuration or a Cartesian pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waypoint {
    Joints(JointConfiguration),
    Pose(Pose),
}

/// Catalogue of named waypoints plus per-kind motion defaults.
#[derive(Debug, Clone)]
pub struct WaypointLibrary {
    waypoints: BTreeMap<String, Waypoint>,
    defaults: HashMap<MoveKind, MotionParameters>,
}

impl Default for WaypointLibrary {
    fn default() -> Self {
        Self::standard()
    }
}

impl WaypointLibrary {
    /// A library with no waypoints and the standard motion defaults.
    pub fn empty() -> Self {
        let defaults = HashMap::from([
            (MoveKind::Joint, JOINT_DEFAULTS),
            (MoveKind::Linear, LINEAR_DEFAULTS),
            (MoveKind::Circular, CIRCULAR_DEFAULTS),
        ]);
        Self {
            waypoints: BTreeMap::new(),
            defaults,
        }
    }

    /// The deployed traffic-gesture catalogue.
    pub fn standard() -> Self {
        Self::empty()
            .with_waypoint("Init", Waypoint::Joints(INIT))
            .with_waypoint("Stop_car", Waypoint::Pose(STOP_CAR))
            .with_waypoint("Move_people_1", Waypoint::Pose(MOVE_PEOPLE_1))
            .with_waypoint("Move_people_2", Waypoint::Pose(MOVE_PEOPLE_2))
            .with_waypoint("Stop_people", Waypoint::Joints(STOP_PEOPLE))
            .with_waypoint("Move_car_1", Waypoint::Pose(MOVE_CAR_1))
            .with_waypoint("Move_car_2", Waypoint::Pose(MOVE_CAR_2))
            .with_waypoint("Move_car_3", Waypoint::Pose(MOVE_CAR_3))
    }

    pub fn with_waypoint(mut self, name: impl Into<String>, waypoint: Waypoint) -> Self {
        self.waypoints.insert(name.into(), waypoint);
        self
    }

    pub fn with_defaults(mut self, kind: MoveKind, params: MotionParameters) -> Self {
        self.defaults.insert(kind, params);
        self
    }

    /// # Errors
    ///
    /// [`ArmError::SimulationTargetInvalid`] when `name` is not in the
    /// library.
    pub fn get(&self, name: &str) -> Result<&Waypoint, ArmError> {
        self.waypoints
            .get(name)
            .ok_or_else(|| ArmError::SimulationTargetInvalid(name.to_string()))
    }

    /// Look up a joint-configuration waypoint.
    ///
    /// # Errors
    ///
    /// [`ArmError::SimulationTargetInvalid`] for an unknown name,
    /// [`ArmError::InvalidCommand`] when the waypoint is a pose.
    pub fn joints(&self, name: &str) -> Result<JointConfiguration, ArmError> {
        match self.get(name)? {
            Waypoint::Joints(j) => Ok(*j),
            Waypoint::Pose(_) => Err(ArmError::InvalidCommand(format!(
                "waypoint '{name}' is a pose, a joint configuration is required"
            ))),
        }
    }

    /// Look up a pose waypoint.
    ///
    /// # Errors
    ///
    /// [`ArmError::SimulationTargetInvalid`] for an unknown name,
    /// [`ArmError::InvalidCommand`] when the waypoint is a joint
    /// configuration.
    pub fn pose(&self, name: &str) -> Result<Pose, ArmError> {
        match self.get(name)? {
            Waypoint::Pose(p) => Ok(*p),
            Waypoint::Joints(_) => Err(ArmError::InvalidCommand(format!(
                "waypoint '{name}' is a joint configuration, a pose is required"
            ))),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.waypoints.contains_key(name)
    }

    /// Waypoint names in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.waypoints.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Default parameters for `kind`.
    pub fn defaults(&self, kind: MoveKind) -> MotionParameters {
        match self.defaults.get(&kind) {
            Some(params) => *params,
            None => match kind {
                MoveKind::Joint => JOINT_DEFAULTS,
                MoveKind::Linear => LINEAR_DEFAULTS,
                MoveKind::Circular => CIRCULAR_DEFAULTS,
            },
        }
    }
}
