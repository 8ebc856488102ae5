//! Windows Service Control Manager controller
//!
//! No privilege pre-check here: the SCM answers `ERROR_ACCESS_DENIED`,
//! which the error table turns into a readable message.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::descriptor::ServiceDescriptor;
use crate::error::DaemonError;
use crate::service_managers::{ControllerContext, DaemonController};

pub mod entry;
pub mod errors;
#[cfg(windows)]
pub mod native;
pub mod scm;
pub mod stop;

#[cfg(windows)]
pub use native::NativeScm;
pub use scm::{
    NativeError, RecoveryAction, ScmConnection, ScmService, ServiceControlManager, ServiceSpec,
    ServiceState, UnavailableScm,
};
pub use stop::{StopPhase, StopSequence};

use errors::translate;
use scm::ERROR_SERVICE_DOES_NOT_EXIST;

/// Delay of each restart recovery action.
pub const RESTART_DELAY: Duration = Duration::from_secs(5);
/// Number of restart recovery actions registered at install.
pub const RESTART_ATTEMPTS: usize = 3;

/// The SCM of the running platform.
pub fn system_scm() -> Arc<dyn ServiceControlManager> {
    #[cfg(windows)]
    {
        Arc::new(NativeScm)
    }
    #[cfg(not(windows))]
    {
        Arc::new(UnavailableScm)
    }
}

/// An opened service. The service handle is released before its connection.
struct OpenedService {
    service: Box<dyn ScmService>,
    _connection: Box<dyn ScmConnection>,
}

pub struct WindowsDaemon {
    descriptor: ServiceDescriptor,
    scm: Arc<dyn ServiceControlManager>,
    poll_interval: Duration,
}

impl WindowsDaemon {
    pub fn new(descriptor: ServiceDescriptor, ctx: &ControllerContext) -> Self {
        Self::with_scm(descriptor, system_scm(), ctx.stop_poll_interval)
    }

    pub fn with_scm(
        descriptor: ServiceDescriptor,
        scm: Arc<dyn ServiceControlManager>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            descriptor,
            scm,
            poll_interval,
        }
    }

    fn open(&self) -> Result<OpenedService, DaemonError> {
        let connection = self
            .scm
            .connect()
            .map_err(|e| translate("OpenSCManager", e))?;
        let service = connection
            .open_service(self.service_name())
            .map_err(|e| {
                if e.code == ERROR_SERVICE_DOES_NOT_EXIST {
                    DaemonError::NotInstalled {
                        name: self.service_name().to_string(),
                    }
                } else {
                    translate("OpenService", e)
                }
            })?;
        Ok(OpenedService {
            service,
            _connection: connection,
        })
    }

    fn spec(&self, args: &[String]) -> ServiceSpec {
        ServiceSpec {
            name: self.service_name().to_string(),
            display_name: self.service_name().to_string(),
            description: self.descriptor.description().to_string(),
            executable_path: self.descriptor.executable_path().to_path_buf(),
            args: args.to_vec(),
            dependencies: self.descriptor.dependencies().to_vec(),
        }
    }
}

#[async_trait]
impl DaemonController for WindowsDaemon {
    fn service_name(&self) -> &str {
        self.descriptor.service_name()
    }

    async fn is_installed(&self) -> bool {
        self.open().is_ok()
    }

    async fn install(&self, args: &[String]) -> Result<(), DaemonError> {
        let connection = self
            .scm
            .connect()
            .map_err(|e| translate("OpenSCManager", e))?;

        if connection.open_service(self.service_name()).is_ok() {
            debug!(service = self.service_name(), "already installed");
            return Ok(());
        }

        let service = connection
            .create_service(&self.spec(args))
            .map_err(|e| translate("CreateService", e))?;

        let recovery = [RecoveryAction {
            delay: RESTART_DELAY,
        }; RESTART_ATTEMPTS];
        service
            .set_recovery_actions(&recovery, Duration::ZERO)
            .map_err(|e| translate("SetRecoveryActions", e))?;

        info!(service = self.service_name(), manager = "scm", "service installed");
        Ok(())
    }

    async fn uninstall(&self) -> Result<(), DaemonError> {
        if !self.is_installed().await {
            debug!(service = self.service_name(), "not installed, nothing to remove");
            return Ok(());
        }

        self.stop().await?;

        let opened = self.open()?;
        opened
            .service
            .delete()
            .map_err(|e| translate("DeleteService", e))?;
        info!(service = self.service_name(), "service uninstalled");
        Ok(())
    }

    async fn start(&self) -> Result<(), DaemonError> {
        let opened = self.open()?;

        if let Ok(state) = opened.service.query() {
            if state.is_active() {
                debug!(service = self.service_name(), ?state, "already running");
                return Ok(());
            }
        }

        opened
            .service
            .start()
            .map_err(|e| translate("StartService", e))?;
        info!(service = self.service_name(), "service started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), DaemonError> {
        StopSequence::new(self.scm.as_ref(), self.service_name(), self.poll_interval)
            .run()
            .await
    }

    async fn restart(&self) -> Result<(), DaemonError> {
        if self.status().await.is_ok() {
            self.stop().await?;
        }
        self.start().await
    }

    async fn status(&self) -> Result<(), DaemonError> {
        let opened = self.open()?;
        match opened.service.query() {
            Ok(state) if state.is_active() => Ok(()),
            Ok(_) | Err(_) => Err(DaemonError::Stopped {
                name: self.service_name().to_string(),
            }),
        }
    }

    async fn run(&self) -> Result<(), DaemonError> {
        let scm = Arc::clone(&self.scm);
        let name = self.service_name().to_string();
        info!(service = %name, "handing control to the service dispatcher");

        tokio::task::spawn_blocking(move || scm.run_service(&name))
            .await
            .map_err(|e| DaemonError::native("StartServiceCtrlDispatcher", e.to_string()))?
            .map_err(|e| translate("StartServiceCtrlDispatcher", e))
    }
}
