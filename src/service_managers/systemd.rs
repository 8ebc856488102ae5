//! Systemd service manager for Linux systems

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

use crate::command::CommandOutput;
use crate::descriptor::ServiceDescriptor;
use crate::error::DaemonError;
use crate::service_managers::{ControllerContext, ServiceManager};
use crate::templates::{TemplateFields, TemplateKind, TemplateRenderer};

static ACTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Active:\s+active\b").expect("Invalid systemd status pattern"));

pub struct SystemdServiceManager {
    descriptor: ServiceDescriptor,
    ctx: ControllerContext,
}

impl SystemdServiceManager {
    pub fn new(descriptor: ServiceDescriptor, ctx: ControllerContext) -> Self {
        Self { descriptor, ctx }
    }
}

/// `systemctl status` exits non-zero for inactive units; only a successful
/// call reporting `Active: active` counts as running.
pub fn is_active(output: &CommandOutput) -> bool {
    output.success && ACTIVE.is_match(&output.stdout)
}

#[async_trait]
impl ServiceManager for SystemdServiceManager {
    fn manager_name(&self) -> &'static str {
        "systemd"
    }

    fn service_name(&self) -> &str {
        self.descriptor.service_name()
    }

    fn artifact_path(&self) -> PathBuf {
        self.ctx.path(&format!(
            "/etc/systemd/system/{}.service",
            self.descriptor.service_name()
        ))
    }

    async fn is_running(&self) -> bool {
        match self
            .ctx
            .runner
            .output("systemctl", &["status", self.service_name()])
            .await
        {
            Ok(output) => is_active(&output),
            Err(_) => false,
        }
    }

    async fn install_artifacts(&self, args: &[String]) -> Result<(), DaemonError> {
        let fields = TemplateFields::new(&self.descriptor, args);
        TemplateRenderer::render_to_file(
            TemplateKind::SystemdUnit,
            &fields,
            &self.artifact_path(),
            0o644,
        )
        .await?;

        self.ctx.runner.run("systemctl", &["daemon-reload"]).await?;
        self.ctx
            .runner
            .run("systemctl", &["enable", self.service_name()])
            .await?;
        Ok(())
    }

    async fn disable_service(&self) -> Result<(), DaemonError> {
        self.ctx
            .runner
            .run("systemctl", &["disable", self.service_name()])
            .await?;
        Ok(())
    }

    async fn after_uninstall(&self) -> Result<(), DaemonError> {
        self.ctx.runner.run("systemctl", &["daemon-reload"]).await?;
        Ok(())
    }

    async fn start_service(&self) -> Result<(), DaemonError> {
        self.ctx
            .runner
            .run("systemctl", &["start", self.service_name()])
            .await?;
        Ok(())
    }

    async fn stop_service(&self) -> Result<(), DaemonError> {
        self.ctx
            .runner
            .run("systemctl", &["stop", self.service_name()])
            .await?;
        Ok(())
    }

    async fn restart_service(&self) -> Result<(), DaemonError> {
        self.ctx
            .runner
            .run("systemctl", &["restart", self.service_name()])
            .await?;
        Ok(())
    }
}
