//! Motion command encoder.
//!
//! The physical controller parses a fixed grammar, so the precision of every
//! numeric field is part of the wire contract:
//!
//! | Field | Format |
//! |---|---|
//! | joint angles, pose components | 6 decimals |
//! | acceleration, velocity | 5 decimals |
//! | blend radius (`movej`, `movec`) | 4 decimals |
//! | blend radius (`movel`) | 3 decimals |
//! | move time | `0` when unset, otherwise 3 decimals |
//!
//! ```text
//! movej([j1, j2, j3, j4, j5, j6], a, v, t, r)
//! movel(p[x, y, z, rx, ry, rz], a, v, t, r)
//! movec(p[via], p[to], a, v, r, mode)
//! set_tcp(p[x, y, z, rx, ry, rz])
//! ```

use pointsman_types::{Pose, SimInstruction, SimMotion};

use crate::command::{Motion, MotionCommand};

/// Format `value` with `precision` decimals, never emitting a negative zero.
fn fixed(value: f64, precision: usize) -> String {
    let s = format!("{value:.precision$}");
    match s.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => s,
    }
}

fn list(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| fixed(*v, 6))
        .collect::<Vec<_>>()
        .join(", ")
}

fn pose(p: &Pose) -> String {
    format!("p[{}]", list(&p.as_array()))
}

fn move_time(t: f64) -> String {
    if t == 0.0 { "0".to_string() } else { fixed(t, 3) }
}

/// Render `command` as a single line of controller script, without the
/// trailing newline.
pub fn encode_physical(command: &MotionCommand) -> String {
    match command.motion() {
        Motion::Joint { target, params } => format!(
            "movej([{}], {}, {}, {}, {})",
            list(target.value.angles()),
            fixed(params.acceleration, 5),
            fixed(params.velocity, 5),
            move_time(params.move_time),
            fixed(params.blend_radius, 4),
        ),
        Motion::Linear { target, params } => format!(
            "movel({}, {}, {}, {}, {})",
            pose(&target.value),
            fixed(params.acceleration, 5),
            fixed(params.velocity, 5),
            move_time(params.move_time),
            fixed(params.blend_radius, 3),
        ),
        Motion::Circular {
            via,
            to,
            mode,
            params,
        } => format!(
            "movec({}, {}, {}, {}, {}, {})",
            pose(&via.value),
            pose(&to.value),
            fixed(params.acceleration, 5),
            fixed(params.velocity, 5),
            fixed(params.blend_radius, 4),
            mode.wire_value(),
        ),
    }
}

/// Render the tool-center-point offset command sent before each routine.
pub fn encode_set_tcp(offset: &Pose) -> String {
    format!("set_tcp({})", pose(offset))
}

/// Build the blocking simulator instruction for `command`.
pub fn encode_simulated(command: &MotionCommand) -> SimInstruction {
    let motion = match command.motion() {
        Motion::Joint { target, .. } => SimMotion::Joint {
            target: target.name.clone(),
            joints: target.value,
        },
        Motion::Linear { target, .. } => SimMotion::Linear {
            target: target.name.clone(),
            pose: target.value,
        },
        Motion::Circular { via, to, .. } => SimMotion::Circular {
            via: via.name.clone(),
            via_pose: via.value,
            to: to.name.clone(),
            to_pose: to.value,
        },
    };
    SimInstruction {
        motion,
        blocking: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CircularMode;
    use crate::waypoints::{
        CIRCULAR_DEFAULTS, INIT, JOINT_DEFAULTS, LINEAR_DEFAULTS, MOVE_CAR_2, MOVE_CAR_3,
        MOVE_PEOPLE_1, TOOL_OFFSET,
    };
    use pointsman_types::{JointConfiguration, MotionParameters, OpenLoopTiming};

    /// Pull every numeric literal out of a rendered command, in order.
    fn numbers(text: &str) -> Vec<f64> {
        let mut out = Vec::new();
        let mut current = String::new();
        for c in text.chars() {
            if c.is_ascii_digit() || c == '.' || c == '-' {
                current.push(c);
            } else if !current.is_empty() {
                out.push(current.parse().unwrap());
                current.clear();
            }
        }
        if !current.is_empty() {
            out.push(current.parse().unwrap());
        }
        out
    }

    fn assert_close(actual: &[f64], expected: &[f64], decimals: &[i32]) {
        assert_eq!(actual.len(), expected.len(), "field count");
        for ((a, e), d) in actual.iter().zip(expected).zip(decimals) {
            let tolerance = 0.5 * 10f64.powi(-d) + 1e-12;
            assert!((a - e).abs() <= tolerance, "{a} vs {e} at {d} decimals");
        }
    }

    #[test]
    fn init_joint_move_matches_reference_text() {
        let cmd = MotionCommand::joint("Init", INIT, JOINT_DEFAULTS).unwrap();
        assert_eq!(
            encode_physical(&cmd),
            "movej([-1.403391, -3.022038, 0.702024, 3.890810, -1.570796, 1.403391], 1.20000, 0.75000, 0, 0.0000)"
        );
    }

    #[test]
    fn linear_move_uses_pose_literal_and_three_decimal_blend() {
        let cmd = MotionCommand::linear("Move_people_1", MOVE_PEOPLE_1, LINEAR_DEFAULTS).unwrap();
        assert_eq!(
            encode_physical(&cmd),
            "movel(p[0.420932, -0.429770, 0.500000, 1.570796, 0.000000, 0.000000], 1.20000, 0.25000, 0, 0.000)"
        );
    }

    #[test]
    fn circular_move_renders_via_to_and_mode() {
        let cmd = MotionCommand::circular(
            "Move_car_2",
            MOVE_CAR_2,
            "Move_car_3",
            MOVE_CAR_3,
            CircularMode::FixedOrientation,
            CIRCULAR_DEFAULTS,
        )
        .unwrap();
        assert_eq!(
            encode_physical(&cmd),
            "movec(p[-0.131592, -0.353295, 0.748730, -0.062968, -0.062970, -1.569875], \
             p[-0.131593, -0.015090, 0.712308, -0.625258, -0.625264, -1.478832], \
             1.20000, 0.25000, 0.0000, 1)"
        );
    }

    #[test]
    fn set_tcp_renders_offset() {
        assert_eq!(
            encode_set_tcp(&TOOL_OFFSET),
            "set_tcp(p[0.000000, 0.000000, 0.050000, 0.000000, 0.000000, 0.000000])"
        );
    }

    #[test]
    fn negative_zero_is_normalised() {
        assert_eq!(fixed(-0.0, 6), "0.000000");
        assert_eq!(fixed(-0.0000001, 6), "0.000000");
        assert_eq!(fixed(-0.5, 3), "-0.500");
    }

    #[test]
    fn non_zero_move_time_is_rendered() {
        let params = LINEAR_DEFAULTS.with_move_time(2.5).with_blend(0.0125);
        let cmd = MotionCommand::linear("x", MOVE_PEOPLE_1, params).unwrap();
        let text = encode_physical(&cmd);
        assert!(text.ends_with(", 2.500, 0.013)") || text.ends_with(", 2.500, 0.012)"), "{text}");
    }

    #[test]
    fn joint_move_round_trips_to_wire_precision() {
        let joints = JointConfiguration::new(&[0.1234567, -2.9876543, 1.0, -0.0000004, 3.14159265, -1.5])
            .unwrap();
        let params = MotionParameters::angular(0.987654321, 1.0500049, OpenLoopTiming::from_secs(1))
            .with_blend(0.01234);
        let cmd = MotionCommand::joint("j", joints, params).unwrap();
        let text = encode_physical(&cmd);
        assert!(text.starts_with("movej(["));

        let mut expected = joints.angles().to_vec();
        expected.extend([0.987654321, 1.0500049, 0.0, 0.01234]);
        assert_close(&numbers(&text), &expected, &[6, 6, 6, 6, 6, 6, 5, 5, 0, 4]);
    }

    #[test]
    fn circular_move_round_trips_to_wire_precision() {
        let via = Pose::new(-0.1315924, 0.25, 0.7487301, -0.06, 0.0, 1.0);
        let to = Pose::new(0.5, -0.0150901, 0.7123084, 0.1, -0.2, -1.4788321);
        let params = MotionParameters::linear(1.3333333, 0.2222222, OpenLoopTiming::from_secs(8))
            .with_blend(0.45249);
        let cmd = MotionCommand::circular("v", via, "t", to, CircularMode::Unconstrained, params)
            .unwrap();
        let text = encode_physical(&cmd);
        assert!(text.starts_with("movec(p["));

        let mut expected = via.as_array().to_vec();
        expected.extend(to.as_array());
        expected.extend([1.3333333, 0.2222222, 0.45249, 0.0]);
        let mut decimals = vec![6; 12];
        decimals.extend([5, 5, 4, 0]);
        assert_close(&numbers(&text), &expected, &decimals);
    }

    #[test]
    fn simulated_instruction_is_blocking_and_named() {
        let cmd = MotionCommand::joint("Init", INIT, JOINT_DEFAULTS).unwrap();
        let instr = encode_simulated(&cmd);
        assert!(instr.blocking);
        assert_eq!(
            instr.motion,
            SimMotion::Joint {
                target: "Init".to_string(),
                joints: INIT
            }
        );
    }

    #[test]
    fn encoding_is_deterministic() {
        let cmd = MotionCommand::linear("Move_people_1", MOVE_PEOPLE_1, LINEAR_DEFAULTS).unwrap();
        assert_eq!(encode_physical(&cmd), encode_physical(&cmd.clone()));
    }
}
