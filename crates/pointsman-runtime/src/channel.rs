//! The two ways a routine reaches an arm.
//!
//! Both channels play the same [`Routine`] but synchronise differently:
//!
//! - [`SimulatedChannel`] issues blocking simulator moves; the simulator's
//!   completion is the synchronisation point.
//! - [`PhysicalChannel`] streams script lines and sleeps a calibrated
//!   duration after each one. There is no completion feedback, so a move
//!   that outlasts its wait goes unnoticed.

use std::fmt;
use std::time::Duration;

use pointsman_hal::{CommandLink, Pacer, SimulatedArm};
use pointsman_motion::{Routine, encode_physical, encode_set_tcp, encode_simulated};
use pointsman_types::{ArmError, Pose};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Simulated,
    Physical,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Simulated => write!(f, "simulated"),
            ChannelKind::Physical => write!(f, "physical"),
        }
    }
}

/// What one channel did for one routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: ChannelKind,
    /// Motion commands executed or streamed (excludes `set_tcp`).
    pub commands: usize,
    /// Total calibrated waiting, including the tool settle time.
    pub open_loop: Duration,
}

/// A destination a routine can be played on.
pub trait MotionChannel {
    fn kind(&self) -> ChannelKind;

    /// Check that `routine` can be played without moving anything.
    fn preflight(&self, _routine: &Routine) -> Result<(), ArmError> {
        Ok(())
    }

    /// Play every command of `routine` in order.
    fn play(&mut self, routine: &Routine) -> Result<ChannelOutcome, ArmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated channel
// ────────────────────────────────────────────────────────────────────────────

pub struct SimulatedChannel<'a> {
    arm: &'a mut dyn SimulatedArm,
}

impl<'a> SimulatedChannel<'a> {
    pub fn new(arm: &'a mut dyn SimulatedArm) -> Self {
        Self { arm }
    }
}

impl MotionChannel for SimulatedChannel<'_> {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Simulated
    }

    fn preflight(&self, routine: &Routine) -> Result<(), ArmError> {
        for command in routine.commands() {
            for target in encode_simulated(command).target_names() {
                if !self.arm.has_target(target) {
                    return Err(ArmError::SimulationTargetInvalid(target.to_string()));
                }
            }
        }
        Ok(())
    }

    fn play(&mut self, routine: &Routine) -> Result<ChannelOutcome, ArmError> {
        info!(routine = routine.name(), channel = %self.kind(), robot = self.arm.name(), "simulating routine");
        for (index, command) in routine.commands().iter().enumerate() {
            let _span = info_span!("sim_move", index, %command).entered();
            self.arm.execute(&encode_simulated(command))?;
        }
        info!(routine = routine.name(), "simulated routine reached its final target");
        Ok(ChannelOutcome {
            channel: ChannelKind::Simulated,
            commands: routine.len(),
            open_loop: Duration::ZERO,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Physical channel
// ────────────────────────────────────────────────────────────────────────────

/// Streams a routine to the controller, preceded by `set_tcp`.
pub struct PhysicalChannel<'a> {
    link: &'a mut dyn CommandLink,
    pacer: &'a mut dyn Pacer,
    tool_offset: Pose,
    tool_settle: Duration,
}

impl<'a> PhysicalChannel<'a> {
    pub fn new(
        link: &'a mut dyn CommandLink,
        pacer: &'a mut dyn Pacer,
        tool_offset: Pose,
        tool_settle: Duration,
    ) -> Self {
        Self {
            link,
            pacer,
            tool_offset,
            tool_settle,
        }
    }

    /// Send one line; on failure close the link and describe where it broke.
    fn send(&mut self, routine: &Routine, index: usize, line: &str) -> Result<(), ArmError> {
        if let Err(e) = self.link.send(line) {
            error!(
                routine = routine.name(),
                index,
                command = line,
                error = %e,
                "controller write failed; closing link and aborting"
            );
            if let Err(close_err) = self.link.close() {
                error!(error = %close_err, "closing controller link failed");
            }
            return Err(ArmError::TransportWriteFailure {
                routine: routine.name().to_string(),
                index,
                command: line.to_string(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }
}

impl MotionChannel for PhysicalChannel<'_> {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Physical
    }

    fn play(&mut self, routine: &Routine) -> Result<ChannelOutcome, ArmError> {
        info!(
            routine = routine.name(),
            channel = %self.kind(),
            peer = %self.link.peer(),
            budget = ?routine.open_loop_budget(),
            "streaming routine to controller"
        );

        // A set_tcp failure is reported against index 0, the first command
        // it precedes; the command text tells the two apart.
        let set_tcp = encode_set_tcp(&self.tool_offset);
        self.send(routine, 0, &set_tcp)?;
        self.pacer.wait(self.tool_settle);
        let mut open_loop = self.tool_settle;

        for (index, command) in routine.commands().iter().enumerate() {
            let line = encode_physical(command);
            self.send(routine, index, &line)?;
            let wait = command.open_loop_wait();
            debug!(routine = routine.name(), index, command = %line, ?wait, "streamed");
            self.pacer.wait(wait);
            open_loop += wait;
        }

        info!(routine = routine.name(), ?open_loop, "routine streamed (completion not confirmed)");
        Ok(ChannelOutcome {
            channel: ChannelKind::Physical,
            commands: routine.len(),
            open_loop,
        })
    }
}
