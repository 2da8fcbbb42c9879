//! [`Dispatcher`] – plays an ordered list of routines across the available
//! channels.
//!
//! # State machine
//!
//! ```text
//! Idle ──run_routine──▶ RunningRoutine(name) ──done / fatal error──▶ Idle
//! ```
//!
//! For each routine the channels are played in registration order and never
//! interleave: the simulated channel finishes the whole routine before the
//! physical channel streams its first line. Any error aborts the current
//! routine and every routine after it.

use std::time::Duration;

use pointsman_motion::Routine;
use pointsman_types::ArmError;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn};

use crate::channel::{ChannelKind, MotionChannel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    RunningRoutine(String),
}

/// Per-routine summary across channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineReport {
    pub name: String,
    pub simulated_moves: usize,
    pub physical_commands: usize,
    /// `true` when no physical channel was available for this routine.
    pub physical_skipped: bool,
    /// Calibrated waiting spent on the physical channel (not measured).
    pub open_loop: Duration,
}

pub struct Dispatcher<'a> {
    channels: Vec<Box<dyn MotionChannel + 'a>>,
    state: DispatcherState,
}

impl Default for Dispatcher<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Dispatcher<'a> {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            state: DispatcherState::Idle,
        }
    }

    /// Add a channel. Channels play each routine in the order they were
    /// added; register the simulated channel first.
    pub fn with_channel(mut self, channel: Box<dyn MotionChannel + 'a>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn state(&self) -> &DispatcherState {
        &self.state
    }

    pub fn has_physical(&self) -> bool {
        self.channels.iter().any(|c| c.kind() == ChannelKind::Physical)
    }

    /// Validate every routine on every channel before anything moves.
    ///
    /// # Errors
    ///
    /// The first channel error, e.g. [`ArmError::SimulationTargetInvalid`].
    pub fn preflight(&self, routines: &[Routine]) -> Result<(), ArmError> {
        for routine in routines {
            for channel in &self.channels {
                channel.preflight(routine)?;
            }
        }
        Ok(())
    }

    /// Play one routine on every channel.
    ///
    /// # Errors
    ///
    /// Propagates the first channel error; the dispatcher returns to
    /// [`DispatcherState::Idle`] either way.
    pub fn run_routine(&mut self, routine: &Routine) -> Result<RoutineReport, ArmError> {
        let _span = info_span!("routine", routine = routine.name()).entered();
        self.state = DispatcherState::RunningRoutine(routine.name().to_string());
        let result = self.play_all(routine);
        self.state = DispatcherState::Idle;
        if let Err(e) = &result {
            error!(routine = routine.name(), error = %e, "routine aborted");
        }
        result
    }

    fn play_all(&mut self, routine: &Routine) -> Result<RoutineReport, ArmError> {
        let mut report = RoutineReport {
            name: routine.name().to_string(),
            simulated_moves: 0,
            physical_commands: 0,
            physical_skipped: true,
            open_loop: Duration::ZERO,
        };
        for channel in &mut self.channels {
            let outcome = channel.play(routine)?;
            match outcome.channel {
                ChannelKind::Simulated => report.simulated_moves += outcome.commands,
                ChannelKind::Physical => {
                    report.physical_commands += outcome.commands;
                    report.physical_skipped = false;
                    report.open_loop += outcome.open_loop;
                }
            }
        }
        Ok(report)
    }

    /// Play `routines` in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// The first routine error. Routines after it are not started.
    pub fn run(&mut self, routines: &[Routine]) -> Result<Vec<RoutineReport>, ArmError> {
        if !self.has_physical() {
            warn!(
                routines = routines.len(),
                "no physical channel; no physical motion will occur"
            );
        }
        let mut reports = Vec::with_capacity(routines.len());
        for routine in routines {
            reports.push(self.run_routine(routine)?);
            info!(routine = routine.name(), "routine finished");
        }
        Ok(reports)
    }
}
