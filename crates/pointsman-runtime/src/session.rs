//! Session controller.
//!
//! A [`Session`] owns everything with a lifetime longer than one routine:
//! the probed controller link, the simulated arm, and the pacer. The
//! capability is decided once in [`Session::open`] and never re-probed.
//! The link is closed on every exit path: after a failed run, on
//! [`Session::close`], and on drop.

use std::time::Duration;

use chrono::{DateTime, Utc};
use pointsman_hal::{CommandLink, Pacer, ProbeOutcome, SimulatedArm, ThreadPacer, probe};
use pointsman_motion::Routine;
use pointsman_types::{ArmError, ChannelCapability, Pose};
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::channel::{PhysicalChannel, SimulatedChannel};
use crate::dispatcher::{Dispatcher, RoutineReport};

pub const DEFAULT_CONTROLLER_ADDRESS: &str = "192.168.1.5";
/// Secondary client interface of the controller.
pub const DEFAULT_CONTROLLER_PORT: u16 = 30002;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_REFERENCE_FRAME: &str = "UR5e Base";
/// Simulated linear speed in mm/s.
pub const DEFAULT_SIMULATION_SPEED: f64 = 60.0;

/// Fixed inputs of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub controller_address: String,
    pub controller_port: u16,
    pub probe_timeout: Duration,
    pub reference_frame: String,
    pub tool_offset: Pose,
    pub tool_settle: Duration,
    pub simulation_speed: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            controller_address: DEFAULT_CONTROLLER_ADDRESS.to_string(),
            controller_port: DEFAULT_CONTROLLER_PORT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            reference_frame: DEFAULT_REFERENCE_FRAME.to_string(),
            tool_offset: pointsman_motion::waypoints::TOOL_OFFSET,
            tool_settle: pointsman_motion::waypoints::TOOL_SETTLE,
            simulation_speed: DEFAULT_SIMULATION_SPEED,
        }
    }
}

/// Outcome of [`Session::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub capability: ChannelCapability,
    pub routines: Vec<RoutineReport>,
}

impl SessionReport {
    pub fn physical_commands(&self) -> usize {
        self.routines.iter().map(|r| r.physical_commands).sum()
    }

    pub fn simulated_moves(&self) -> usize {
        self.routines.iter().map(|r| r.simulated_moves).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    config: SessionConfig,
    capability: ChannelCapability,
    link: Option<Box<dyn CommandLink>>,
    simulator: Option<Box<dyn SimulatedArm>>,
    pacer: Box<dyn Pacer>,
    probe_error: Option<ArmError>,
}

impl Session {
    /// Probe the controller once and prepare the simulated arm.
    ///
    /// An unreachable controller is not an error: the session continues in
    /// [`ChannelCapability::SimulationOnly`].
    ///
    /// # Errors
    ///
    /// Fails only when the simulated arm rejects the frame, tool, or speed
    /// assignment.
    pub fn open(
        config: SessionConfig,
        simulator: Option<Box<dyn SimulatedArm>>,
    ) -> Result<Self, ArmError> {
        let outcome = probe(
            &config.controller_address,
            config.controller_port,
            config.probe_timeout,
        );
        match outcome {
            ProbeOutcome::Reachable(link) => Self::with_link(config, Some(Box::new(link)), simulator),
            ProbeOutcome::Unreachable(reason) => {
                let mut session = Self::with_link(config, None, simulator)?;
                session.probe_error = Some(reason);
                Ok(session)
            }
        }
    }

    /// Build a session around an already opened link (or none).
    ///
    /// # Errors
    ///
    /// See [`Session::open`].
    pub fn with_link(
        config: SessionConfig,
        link: Option<Box<dyn CommandLink>>,
        mut simulator: Option<Box<dyn SimulatedArm>>,
    ) -> Result<Self, ArmError> {
        let id = Uuid::new_v4();
        let capability = if link.is_some() {
            ChannelCapability::PhysicalReachable
        } else {
            ChannelCapability::SimulationOnly
        };

        if let Some(sim) = simulator.as_deref_mut() {
            sim.set_pose_frame(&config.reference_frame)?;
            sim.set_pose_tool(&config.tool_offset)?;
            sim.set_speed(config.simulation_speed)?;
            info!(
                session_id = %id,
                robot = sim.name(),
                frame = %config.reference_frame,
                speed_mm_s = config.simulation_speed,
                "simulated arm configured"
            );
        }

        info!(session_id = %id, %capability, "session opened");
        Ok(Self {
            id,
            started_at: Utc::now(),
            config,
            capability,
            link,
            simulator,
            pacer: Box::new(ThreadPacer),
            probe_error: None,
        })
    }

    /// Replace the pacer used between physical commands.
    pub fn with_pacer(mut self, pacer: Box<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn capability(&self) -> ChannelCapability {
        self.capability
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Why the controller probe failed, for a session opened without a link.
    pub fn probe_error(&self) -> Option<&ArmError> {
        self.probe_error.as_ref()
    }

    /// Dispatch `routines` in order.
    ///
    /// Every routine is checked against every channel before the first
    /// move. Any error aborts the remaining routines and closes the link.
    ///
    /// # Errors
    ///
    /// The first [`ArmError`] raised by a channel.
    pub fn run(&mut self, routines: &[Routine]) -> Result<SessionReport, ArmError> {
        let _span = info_span!("session", session_id = %self.id, capability = %self.capability)
            .entered();

        if let Some(reason) = &self.probe_error {
            warn!(error = %reason, "controller not connected this session");
        }

        let result = self.dispatch(routines);
        match result {
            Ok(routines) => {
                let report = SessionReport {
                    session_id: self.id,
                    started_at: self.started_at,
                    finished_at: Utc::now(),
                    capability: self.capability,
                    routines,
                };
                info!(
                    simulated_moves = report.simulated_moves(),
                    physical_commands = report.physical_commands(),
                    "session finished"
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "session aborted");
                self.close_link();
                Err(e)
            }
        }
    }

    fn dispatch(&mut self, routines: &[Routine]) -> Result<Vec<RoutineReport>, ArmError> {
        let mut dispatcher = Dispatcher::new();
        if let Some(sim) = self.simulator.as_deref_mut() {
            dispatcher = dispatcher.with_channel(Box::new(SimulatedChannel::new(sim)));
        }
        if let Some(link) = self.link.as_deref_mut() {
            dispatcher = dispatcher.with_channel(Box::new(PhysicalChannel::new(
                link,
                self.pacer.as_mut(),
                self.config.tool_offset,
                self.config.tool_settle,
            )));
        }
        dispatcher.preflight(routines)?;
        dispatcher.run(routines)
    }

    fn close_link(&mut self) {
        // A channel that hit a write failure has already closed the link.
        if let Some(mut link) = self.link.take().filter(|link| link.is_open()) {
            match link.close() {
                Ok(()) => info!(peer = %link.peer(), "controller link closed"),
                Err(e) => warn!(peer = %link.peer(), error = %e, "closing controller link failed"),
            }
        }
    }

    /// Release the controller link.
    pub fn close(mut self) {
        self.close_link();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close_link();
    }
}
