//! Service manager implementations

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::command::{CommandRunner, SystemCommandRunner};
use crate::config::DaemonSettings;
use crate::error::DaemonError;
use crate::privilege::{EffectiveGroup, PrivilegeCheck};

/// Lifecycle operations on one native service.
///
/// Exactly one implementation is live per process, chosen by
/// [`crate::platform::detect_controller`].
#[async_trait]
pub trait DaemonController: Send + Sync {
    fn service_name(&self) -> &str;

    /// Whether the registration artifact exists. The artifact's content is not inspected.
    async fn is_installed(&self) -> bool;

    /// Register the service with `args` as its invocation arguments.
    /// Succeeds without changes when already installed.
    async fn install(&self, args: &[String]) -> Result<(), DaemonError>;

    /// Remove the registration, stopping the service first when it runs.
    async fn uninstall(&self) -> Result<(), DaemonError>;

    async fn start(&self) -> Result<(), DaemonError>;

    async fn stop(&self) -> Result<(), DaemonError>;

    async fn restart(&self) -> Result<(), DaemonError>;

    /// `Ok(())` when running, [`DaemonError::Stopped`] when not.
    async fn status(&self) -> Result<(), DaemonError>;

    /// Entry point when the native manager launches this process as the service.
    async fn run(&self) -> Result<(), DaemonError>;
}

/// Everything a controller needs from its surroundings.
#[derive(Clone)]
pub struct ControllerContext {
    pub root: PathBuf,
    pub runner: Arc<dyn CommandRunner>,
    pub privilege: Arc<dyn PrivilegeCheck>,
    pub launchd_label_prefix: String,
    pub stop_poll_interval: Duration,
}

impl ControllerContext {
    pub fn system() -> Self {
        Self::from_settings(&DaemonSettings::default())
    }

    pub fn from_settings(settings: &DaemonSettings) -> Self {
        Self {
            root: settings.root.clone(),
            runner: Arc::new(SystemCommandRunner::new()),
            privilege: Arc::new(EffectiveGroup),
            launchd_label_prefix: settings.launchd_label_prefix.clone(),
            stop_poll_interval: settings.stop_poll_interval(),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_privilege(mut self, privilege: Arc<dyn PrivilegeCheck>) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Resolve an absolute system path against the configured root.
    pub fn path(&self, absolute: &str) -> PathBuf {
        self.root.join(absolute.trim_start_matches('/'))
    }
}

impl std::fmt::Debug for ControllerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerContext")
            .field("root", &self.root)
            .field("launchd_label_prefix", &self.launchd_label_prefix)
            .field("stop_poll_interval", &self.stop_poll_interval)
            .finish_non_exhaustive()
    }
}

// Platform-specific service managers
pub mod init;
pub mod launchd;
pub mod posix;
pub mod rc_d;
pub mod systemd;
pub mod upstart;
pub mod windows;

pub use init::InitServiceManager;
pub use launchd::LaunchdServiceManager;
pub use posix::{PosixDaemon, ServiceManager};
pub use rc_d::RcServiceManager;
pub use systemd::SystemdServiceManager;
pub use upstart::UpstartServiceManager;
pub use windows::WindowsDaemon;
