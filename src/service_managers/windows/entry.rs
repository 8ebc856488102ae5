//! Service entry: the control loop run when the SCM launches this process

use std::sync::mpsc::Receiver;
use std::time::Duration;
use tracing::{debug, info};

use crate::service_managers::windows::scm::{NativeError, ServiceState};

/// Pause between the two reports answering an interrogate request.
pub const INTERROGATE_PAUSE: Duration = Duration::from_millis(100);
/// Delay between reporting `Stopped` and exiting the process.
pub const EXIT_DELAY: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    Stop,
    Pause,
    Continue,
    Interrogate,
    Shutdown,
    Other(u32),
}

impl ControlRequest {
    /// Map a `SERVICE_CONTROL_*` code.
    pub fn from_raw(control: u32) -> Self {
        match control {
            0x1 => ControlRequest::Stop,
            0x2 => ControlRequest::Pause,
            0x3 => ControlRequest::Continue,
            0x4 => ControlRequest::Interrogate,
            0x5 => ControlRequest::Shutdown,
            other => ControlRequest::Other(other),
        }
    }
}

/// `dwControlsAccepted` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcceptedControls {
    pub stop: bool,
    pub pause_continue: bool,
    pub shutdown: bool,
}

impl AcceptedControls {
    pub const NONE: Self = Self {
        stop: false,
        pause_continue: false,
        shutdown: false,
    };

    pub const ALL: Self = Self {
        stop: true,
        pause_continue: true,
        shutdown: true,
    };

    pub fn to_raw(self) -> u32 {
        let mut raw = 0;
        if self.stop {
            raw |= 0x1;
        }
        if self.pause_continue {
            raw |= 0x2;
        }
        if self.shutdown {
            raw |= 0x4;
        }
        raw
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportedStatus {
    pub state: ServiceState,
    pub accepts: AcceptedControls,
}

impl ReportedStatus {
    pub fn new(state: ServiceState, accepts: AcceptedControls) -> Self {
        Self { state, accepts }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    Report(ReportedStatus),
    Pause(Duration),
    ExitAfter(Duration),
}

/// Transition function of the service entry. Holds the last reported status.
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    current: ReportedStatus,
}

impl ServiceEntry {
    /// The entry after startup, with the reports that got it there.
    pub fn start() -> (Self, Vec<EntryAction>) {
        let pending = ReportedStatus::new(ServiceState::StartPending, AcceptedControls::NONE);
        let running = ReportedStatus::new(ServiceState::Running, AcceptedControls::ALL);
        (
            Self { current: running },
            vec![EntryAction::Report(pending), EntryAction::Report(running)],
        )
    }

    pub fn current(&self) -> ReportedStatus {
        self.current
    }

    pub fn on_control(&mut self, request: ControlRequest) -> Vec<EntryAction> {
        match request {
            ControlRequest::Interrogate => vec![
                EntryAction::Report(self.current),
                EntryAction::Pause(INTERROGATE_PAUSE),
                EntryAction::Report(self.current),
            ],
            ControlRequest::Stop
            | ControlRequest::Shutdown
            | ControlRequest::Pause
            | ControlRequest::Continue => {
                self.current = ReportedStatus::new(ServiceState::Stopped, AcceptedControls::NONE);
                vec![
                    EntryAction::Report(self.current),
                    EntryAction::ExitAfter(EXIT_DELAY),
                ]
            }
            ControlRequest::Other(_) => Vec::new(),
        }
    }
}

/// Where status reports go; `SetServiceStatus` in a real service.
pub trait StatusReporter {
    fn report(&self, status: ReportedStatus) -> Result<(), NativeError>;
}

pub trait ExitScheduler {
    fn schedule_exit(&self, delay: Duration);
}

/// Exits the process with status 0 from a background thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExit;

impl ExitScheduler for ProcessExit {
    fn schedule_exit(&self, delay: Duration) {
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            std::process::exit(0);
        });
    }
}

fn apply(
    actions: Vec<EntryAction>,
    reporter: &dyn StatusReporter,
    exit: &dyn ExitScheduler,
) -> Result<(), NativeError> {
    for action in actions {
        match action {
            EntryAction::Report(status) => {
                debug!(state = ?status.state, "reporting service status");
                reporter.report(status)?;
            }
            EntryAction::Pause(duration) => std::thread::sleep(duration),
            EntryAction::ExitAfter(delay) => {
                info!(?delay, "service stopping, exit scheduled");
                exit.schedule_exit(delay);
            }
        }
    }
    Ok(())
}

/// Drive the entry until the request channel closes. Runs on the
/// dispatcher's thread, so it blocks.
pub fn serve(
    requests: Receiver<ControlRequest>,
    reporter: &dyn StatusReporter,
    exit: &dyn ExitScheduler,
) -> Result<(), NativeError> {
    let (mut entry, startup) = ServiceEntry::start();
    apply(startup, reporter, exit)?;

    for request in requests {
        debug!(?request, "control request");
        let actions = entry.on_control(request);
        apply(actions, reporter, exit)?;
    }
    Ok(())
}
