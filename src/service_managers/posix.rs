//! Lifecycle protocol shared by the file-registered service managers
//!
//! Every mutating verb runs the same gate, in order, stopping at the first
//! failure: root group check, installation check, then the running-state
//! check that makes start/stop idempotent.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::DaemonError;
use crate::privilege::PrivilegeCheck;
use crate::service_managers::DaemonController;

/// Native primitives of one file-registered service manager.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Short name used in logs, e.g. `systemd`.
    fn manager_name(&self) -> &'static str;

    fn service_name(&self) -> &str;

    /// The file whose existence means "installed".
    fn artifact_path(&self) -> PathBuf;

    /// Query the native manager. Never cached.
    async fn is_running(&self) -> bool;

    /// Write the artifact (and any companion files) and register it.
    async fn install_artifacts(&self, args: &[String]) -> Result<(), DaemonError>;

    /// Native deregistration performed before the artifact is removed.
    async fn disable_service(&self) -> Result<(), DaemonError> {
        Ok(())
    }

    /// Cleanup performed after the artifact is removed.
    async fn after_uninstall(&self) -> Result<(), DaemonError> {
        Ok(())
    }

    async fn start_service(&self) -> Result<(), DaemonError>;

    async fn stop_service(&self) -> Result<(), DaemonError>;

    async fn restart_service(&self) -> Result<(), DaemonError>;
}

/// [`DaemonController`] over any file-registered [`ServiceManager`].
pub struct PosixDaemon<M> {
    manager: M,
    privilege: Arc<dyn PrivilegeCheck>,
}

impl<M: ServiceManager> PosixDaemon<M> {
    pub fn new(manager: M, privilege: Arc<dyn PrivilegeCheck>) -> Self {
        Self { manager, privilege }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    fn ensure_privileged(&self) -> Result<(), DaemonError> {
        if self.privilege.is_privileged() {
            Ok(())
        } else {
            Err(DaemonError::InsufficientPrivilege)
        }
    }

    async fn ensure_installed(&self) -> Result<(), DaemonError> {
        if self.is_installed().await {
            Ok(())
        } else {
            Err(DaemonError::NotInstalled {
                name: self.manager.service_name().to_string(),
            })
        }
    }
}

#[async_trait]
impl<M: ServiceManager> DaemonController for PosixDaemon<M> {
    fn service_name(&self) -> &str {
        self.manager.service_name()
    }

    async fn is_installed(&self) -> bool {
        tokio::fs::metadata(self.manager.artifact_path())
            .await
            .is_ok()
    }

    async fn install(&self, args: &[String]) -> Result<(), DaemonError> {
        self.ensure_privileged()?;

        if self.is_installed().await {
            debug!(service = self.service_name(), "already installed");
            return Ok(());
        }

        self.manager.install_artifacts(args).await?;
        info!(
            service = self.service_name(),
            manager = self.manager.manager_name(),
            path = %self.manager.artifact_path().display(),
            "service installed"
        );
        Ok(())
    }

    async fn uninstall(&self) -> Result<(), DaemonError> {
        self.ensure_privileged()?;

        if !self.is_installed().await {
            debug!(service = self.service_name(), "not installed, nothing to remove");
            return Ok(());
        }

        if self.manager.is_running().await {
            self.stop().await?;
        }

        self.manager.disable_service().await?;

        let path = self.manager.artifact_path();
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| DaemonError::io(&path, e))?;

        self.manager.after_uninstall().await?;
        info!(service = self.service_name(), "service uninstalled");
        Ok(())
    }

    async fn start(&self) -> Result<(), DaemonError> {
        self.ensure_privileged()?;
        self.ensure_installed().await?;

        if self.manager.is_running().await {
            debug!(service = self.service_name(), "already running");
            return Ok(());
        }

        self.manager.start_service().await?;
        info!(service = self.service_name(), "service started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), DaemonError> {
        self.ensure_privileged()?;
        self.ensure_installed().await?;

        if !self.manager.is_running().await {
            debug!(service = self.service_name(), "already stopped");
            return Ok(());
        }

        self.manager.stop_service().await?;
        info!(service = self.service_name(), "service stopped");
        Ok(())
    }

    async fn restart(&self) -> Result<(), DaemonError> {
        self.ensure_privileged()?;
        self.ensure_installed().await?;

        self.manager.restart_service().await?;
        info!(service = self.service_name(), "service restarted");
        Ok(())
    }

    async fn status(&self) -> Result<(), DaemonError> {
        self.ensure_privileged()?;
        self.ensure_installed().await?;

        if self.manager.is_running().await {
            Ok(())
        } else {
            Err(DaemonError::Stopped {
                name: self.service_name().to_string(),
            })
        }
    }

    async fn run(&self) -> Result<(), DaemonError> {
        // The native manager execs the binary directly; nothing to hand over.
        Ok(())
    }
}
