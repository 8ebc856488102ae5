//! Upstart service manager

use async_trait::async_trait;
use std::path::PathBuf;

use crate::command::CommandOutput;
use crate::descriptor::ServiceDescriptor;
use crate::error::DaemonError;
use crate::service_managers::init::{install_log_rotation, remove_log_rotation};
use crate::service_managers::{ControllerContext, ServiceManager};
use crate::templates::{TemplateFields, TemplateKind, TemplateRenderer};

pub struct UpstartServiceManager {
    descriptor: ServiceDescriptor,
    ctx: ControllerContext,
}

impl UpstartServiceManager {
    pub fn new(descriptor: ServiceDescriptor, ctx: ControllerContext) -> Self {
        Self { descriptor, ctx }
    }

    async fn initctl(&self, verb: &str) -> Result<(), DaemonError> {
        self.ctx.runner.run(verb, &[self.service_name()]).await?;
        Ok(())
    }
}

/// `status <name>` prints `<name> start/running, process N` for a live job.
pub fn reports_running(name: &str, output: &CommandOutput) -> bool {
    let running = format!("{name} start/running");
    output.success && output.stdout.lines().any(|line| line.starts_with(&running))
}

#[async_trait]
impl ServiceManager for UpstartServiceManager {
    fn manager_name(&self) -> &'static str {
        "upstart"
    }

    fn service_name(&self) -> &str {
        self.descriptor.service_name()
    }

    fn artifact_path(&self) -> PathBuf {
        self.ctx
            .path(&format!("/etc/init/{}.conf", self.descriptor.service_name()))
    }

    async fn is_running(&self) -> bool {
        match self.ctx.runner.output("status", &[self.service_name()]).await {
            Ok(output) => reports_running(self.service_name(), &output),
            Err(_) => false,
        }
    }

    async fn install_artifacts(&self, args: &[String]) -> Result<(), DaemonError> {
        let fields = TemplateFields::new(&self.descriptor, args);
        TemplateRenderer::render_to_file(
            TemplateKind::UpstartConf,
            &fields,
            &self.artifact_path(),
            0o644,
        )
        .await?;
        install_log_rotation(&self.ctx, &fields).await
    }

    async fn after_uninstall(&self) -> Result<(), DaemonError> {
        remove_log_rotation(&self.ctx, self.service_name()).await
    }

    async fn start_service(&self) -> Result<(), DaemonError> {
        self.initctl("start").await
    }

    async fn stop_service(&self) -> Result<(), DaemonError> {
        self.initctl("stop").await
    }

    async fn restart_service(&self) -> Result<(), DaemonError> {
        self.initctl("restart").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(stdout: &str) -> CommandOutput {
        CommandOutput {
            success: true,
            stdout: stdout.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_running_job() {
        assert!(reports_running(
            "backupd",
            &status("backupd start/running, process 1811\n")
        ));
    }

    #[test]
    fn test_waiting_job() {
        assert!(!reports_running("backupd", &status("backupd stop/waiting\n")));
    }

    #[test]
    fn test_other_job_running() {
        assert!(!reports_running(
            "backupd",
            &status("backupd-web start/running, process 77\n")
        ));
        assert!(!reports_running(
            "backupd",
            &status("xbackupd start/running, process 78\n")
        ));
    }
}
