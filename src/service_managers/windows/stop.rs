//! Stop control followed by status polling until the service reports `Stopped`

use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::DaemonError;
use crate::service_managers::windows::errors::translate;
use crate::service_managers::windows::scm::{
    NativeError, ScmService, ServiceControlManager, ServiceState, ERROR_SERVICE_DOES_NOT_EXIST,
};

/// Used when `WaitToKillServiceTimeout` is missing or not a number.
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_millis(20_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPhase {
    Connecting,
    Controlling,
    Polling,
    Stopped,
    TimedOut,
    Failed,
}

/// Parse the registry value, in milliseconds.
pub fn kill_timeout(raw: Option<&str>) -> Duration {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_KILL_TIMEOUT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopPolicy {
    pub budget: Duration,
    pub poll_interval: Duration,
}

impl StopPolicy {
    /// The deadline is the budget plus two poll intervals of slack.
    pub fn window(&self) -> Duration {
        self.budget + self.poll_interval * 2
    }
}

#[derive(Debug)]
pub enum PollError {
    TimedOut,
    Query(NativeError),
}

/// Re-query `service` every poll interval until it reports `Stopped` or the window closes.
pub async fn poll_until_stopped(
    service: &dyn ScmService,
    mut state: ServiceState,
    policy: StopPolicy,
) -> Result<(), PollError> {
    let deadline = sleep(policy.window());
    tokio::pin!(deadline);

    let mut ticker = interval(policy.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    while state != ServiceState::Stopped {
        tokio::select! {
            _ = ticker.tick() => {
                state = service.query().map_err(PollError::Query)?;
                debug!(?state, "polled service state");
            }
            _ = &mut deadline => return Err(PollError::TimedOut),
        }
    }
    Ok(())
}

/// One run of the stop sequence against the SCM.
pub struct StopSequence<'a> {
    scm: &'a dyn ServiceControlManager,
    name: &'a str,
    poll_interval: Duration,
    phase: StopPhase,
}

impl<'a> StopSequence<'a> {
    pub fn new(scm: &'a dyn ServiceControlManager, name: &'a str, poll_interval: Duration) -> Self {
        Self {
            scm,
            name,
            poll_interval,
            phase: StopPhase::Connecting,
        }
    }

    pub fn phase(&self) -> StopPhase {
        self.phase
    }

    fn enter(&mut self, phase: StopPhase) {
        debug!(service = self.name, from = ?self.phase, to = ?phase, "stop sequence");
        self.phase = phase;
    }

    fn fail(&mut self, operation: &str, err: NativeError) -> DaemonError {
        self.enter(StopPhase::Failed);
        if err.code == ERROR_SERVICE_DOES_NOT_EXIST {
            DaemonError::NotInstalled {
                name: self.name.to_string(),
            }
        } else {
            translate(operation, err)
        }
    }

    pub async fn run(&mut self) -> Result<(), DaemonError> {
        self.enter(StopPhase::Connecting);
        let connection = self
            .scm
            .connect()
            .map_err(|e| self.fail("OpenSCManager", e))?;
        let service = connection
            .open_service(self.name)
            .map_err(|e| self.fail("OpenService", e))?;

        let current = service
            .query()
            .map_err(|e| self.fail("QueryServiceStatus", e))?;
        if current == ServiceState::Stopped {
            debug!(service = self.name, "already stopped");
            self.enter(StopPhase::Stopped);
            return Ok(());
        }

        self.enter(StopPhase::Controlling);
        let state = service
            .control_stop()
            .map_err(|e| self.fail("ControlService", e))?;

        let policy = StopPolicy {
            budget: kill_timeout(self.scm.wait_to_kill_timeout().as_deref()),
            poll_interval: self.poll_interval,
        };
        self.enter(StopPhase::Polling);
        match poll_until_stopped(service.as_ref(), state, policy).await {
            Ok(()) => {
                self.enter(StopPhase::Stopped);
                info!(service = self.name, "service stopped");
                Ok(())
            }
            Err(PollError::TimedOut) => {
                self.enter(StopPhase::TimedOut);
                Err(DaemonError::StopTimeout {
                    name: self.name.to_string(),
                })
            }
            Err(PollError::Query(e)) => Err(self.fail("QueryServiceStatus", e)),
        }
    }
}
