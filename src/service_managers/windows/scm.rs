//! Abstraction over the Windows Service Control Manager
//!
//! The controller only talks to these traits. The winapi implementation
//! lives in `native` and is compiled on Windows only.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// `ERROR_SERVICE_DOES_NOT_EXIST`
pub const ERROR_SERVICE_DOES_NOT_EXIST: u32 = 1060;
/// `ERROR_NOT_SUPPORTED`
pub const ERROR_NOT_SUPPORTED: u32 = 50;

/// A failed SCM or registry call, carrying the Win32 error code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (os error {code})")]
pub struct NativeError {
    pub code: u32,
    pub message: String,
}

impl NativeError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// `dwCurrentState` of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    StartPending,
    StopPending,
    Running,
    ContinuePending,
    PausePending,
    Paused,
    Unknown(u32),
}

impl ServiceState {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => ServiceState::Stopped,
            2 => ServiceState::StartPending,
            3 => ServiceState::StopPending,
            4 => ServiceState::Running,
            5 => ServiceState::ContinuePending,
            6 => ServiceState::PausePending,
            7 => ServiceState::Paused,
            other => ServiceState::Unknown(other),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            ServiceState::Stopped => 1,
            ServiceState::StartPending => 2,
            ServiceState::StopPending => 3,
            ServiceState::Running => 4,
            ServiceState::ContinuePending => 5,
            ServiceState::PausePending => 6,
            ServiceState::Paused => 7,
            ServiceState::Unknown(raw) => raw,
        }
    }

    /// States that `status` reports as running.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ServiceState::StartPending | ServiceState::Running | ServiceState::ContinuePending
        )
    }
}

/// A "restart the service" failure action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryAction {
    pub delay: Duration,
}

/// Parameters of a new SCM entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub executable_path: PathBuf,
    pub args: Vec<String>,
    pub dependencies: Vec<String>,
}

impl ServiceSpec {
    /// `lpBinaryPathName`: the quoted executable followed by its arguments.
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable_path.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .map(|arg| quote_arg(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Quote one argument the way `CommandLineToArgvW` splits it back.
pub fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '"']) {
        return arg.to_string();
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                quoted.extend(std::iter::repeat('\\').take(backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.extend(std::iter::repeat('\\').take(backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }
    quoted.extend(std::iter::repeat('\\').take(backslashes * 2));
    quoted.push('"');
    quoted
}

/// Entry point to the SCM. Each lifecycle call connects anew and drops the
/// connection when done.
pub trait ServiceControlManager: Send + Sync {
    fn connect(&self) -> Result<Box<dyn ScmConnection>, NativeError>;

    /// Raw `HKLM\SYSTEM\CurrentControlSet\Control\WaitToKillServiceTimeout`.
    fn wait_to_kill_timeout(&self) -> Option<String>;

    /// Hand the current thread to the service dispatcher. Blocks for the
    /// lifetime of the service.
    fn run_service(&self, name: &str) -> Result<(), NativeError>;
}

/// An open SCM database handle.
pub trait ScmConnection: Send + Sync {
    fn open_service(&self, name: &str) -> Result<Box<dyn ScmService>, NativeError>;

    fn create_service(&self, spec: &ServiceSpec) -> Result<Box<dyn ScmService>, NativeError>;
}

/// An open service handle.
pub trait ScmService: Send + Sync {
    fn query(&self) -> Result<ServiceState, NativeError>;

    fn start(&self) -> Result<(), NativeError>;

    /// Send `SERVICE_CONTROL_STOP`; returns the state reported with the acknowledgement.
    fn control_stop(&self) -> Result<ServiceState, NativeError>;

    fn delete(&self) -> Result<(), NativeError>;

    fn set_recovery_actions(
        &self,
        actions: &[RecoveryAction],
        reset_period: Duration,
    ) -> Result<(), NativeError>;
}

/// Stand-in used where no SCM exists; every call fails with `ERROR_NOT_SUPPORTED`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableScm;

impl UnavailableScm {
    fn error() -> NativeError {
        NativeError::new(
            ERROR_NOT_SUPPORTED,
            "the Service Control Manager is not available on this platform",
        )
    }
}

impl ServiceControlManager for UnavailableScm {
    fn connect(&self) -> Result<Box<dyn ScmConnection>, NativeError> {
        Err(Self::error())
    }

    fn wait_to_kill_timeout(&self) -> Option<String> {
        None
    }

    fn run_service(&self, _name: &str) -> Result<(), NativeError> {
        Err(Self::error())
    }
}
