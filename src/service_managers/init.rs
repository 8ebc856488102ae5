//! Init script service manager for legacy Linux systems

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::command::CommandOutput;
use crate::descriptor::ServiceDescriptor;
use crate::error::DaemonError;
use crate::service_managers::{ControllerContext, ServiceManager};
use crate::templates::{set_mode, TemplateFields, TemplateKind, TemplateRenderer};

pub struct InitServiceManager {
    descriptor: ServiceDescriptor,
    ctx: ControllerContext,
}

impl InitServiceManager {
    pub fn new(descriptor: ServiceDescriptor, ctx: ControllerContext) -> Self {
        Self { descriptor, ctx }
    }

    async fn service(&self, verb: &str) -> Result<(), DaemonError> {
        self.ctx
            .runner
            .run("service", &[self.service_name(), verb])
            .await?;
        Ok(())
    }
}

/// `service <name> status` output from the init script mentions the process name when it runs.
pub fn reports_running(name: &str, output: &CommandOutput) -> bool {
    output.success && output.stdout.contains(name)
}

/// Write `/etc/logrotate.d/<name>` and create `/var/log/<name>`.
pub(crate) async fn install_log_rotation(
    ctx: &ControllerContext,
    fields: &TemplateFields,
) -> Result<(), DaemonError> {
    let log_dir = ctx.path(&format!("/var/log/{}", fields.name));
    tokio::fs::create_dir_all(&log_dir)
        .await
        .map_err(|e| DaemonError::io(&log_dir, e))?;
    set_mode(&log_dir, 0o755).await?;

    let conf = log_rotation_path(ctx, &fields.name);
    TemplateRenderer::render_to_file(TemplateKind::LogRotate, fields, &conf, 0o644).await
}

/// Remove the logrotate config written by [`install_log_rotation`]. Logs stay.
pub(crate) async fn remove_log_rotation(
    ctx: &ControllerContext,
    name: &str,
) -> Result<(), DaemonError> {
    let conf = log_rotation_path(ctx, name);
    match tokio::fs::remove_file(&conf).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %conf.display(), "no logrotate config to remove");
            Ok(())
        }
        Err(e) => Err(DaemonError::io(&conf, e)),
    }
}

fn log_rotation_path(ctx: &ControllerContext, name: &str) -> PathBuf {
    ctx.path(&format!("/etc/logrotate.d/{name}"))
}

#[async_trait]
impl ServiceManager for InitServiceManager {
    fn manager_name(&self) -> &'static str {
        "sysv"
    }

    fn service_name(&self) -> &str {
        self.descriptor.service_name()
    }

    fn artifact_path(&self) -> PathBuf {
        self.ctx
            .path(&format!("/etc/init.d/{}", self.descriptor.service_name()))
    }

    async fn is_running(&self) -> bool {
        match self
            .ctx
            .runner
            .output("service", &[self.service_name(), "status"])
            .await
        {
            Ok(output) => reports_running(self.service_name(), &output),
            Err(_) => false,
        }
    }

    async fn install_artifacts(&self, args: &[String]) -> Result<(), DaemonError> {
        let fields = TemplateFields::new(&self.descriptor, args);
        TemplateRenderer::render_to_file(
            TemplateKind::SysVScript,
            &fields,
            &self.artifact_path(),
            0o755,
        )
        .await?;
        install_log_rotation(&self.ctx, &fields).await?;

        self.ctx
            .runner
            .run("chkconfig", &["--add", self.service_name()])
            .await?;
        Ok(())
    }

    async fn disable_service(&self) -> Result<(), DaemonError> {
        self.ctx
            .runner
            .run("chkconfig", &["--del", self.service_name()])
            .await?;
        Ok(())
    }

    async fn after_uninstall(&self) -> Result<(), DaemonError> {
        remove_log_rotation(&self.ctx, self.service_name()).await
    }

    async fn start_service(&self) -> Result<(), DaemonError> {
        self.service("start").await
    }

    async fn stop_service(&self) -> Result<(), DaemonError> {
        self.service("stop").await
    }

    async fn restart_service(&self) -> Result<(), DaemonError> {
        self.service("restart").await
    }
}
