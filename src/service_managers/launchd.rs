//! Launchd service manager for macOS

use async_trait::async_trait;
use std::path::PathBuf;

use crate::command::CommandOutput;
use crate::descriptor::ServiceDescriptor;
use crate::error::DaemonError;
use crate::service_managers::{ControllerContext, ServiceManager};
use crate::templates::{TemplateFields, TemplateKind, TemplateRenderer};

pub struct LaunchdServiceManager {
    descriptor: ServiceDescriptor,
    ctx: ControllerContext,
}

impl LaunchdServiceManager {
    pub fn new(descriptor: ServiceDescriptor, ctx: ControllerContext) -> Self {
        Self { descriptor, ctx }
    }

    fn plist(&self) -> String {
        self.artifact_path().to_string_lossy().to_string()
    }

    async fn launchctl(&self, verb: &str) -> Result<(), DaemonError> {
        let plist = self.plist();
        self.ctx.runner.run("launchctl", &[verb, &plist]).await?;
        Ok(())
    }
}

/// `launchctl list <label>` fails for unknown labels and prints the job
/// dictionary, including its label, for loaded ones.
pub fn is_listed(name: &str, output: &CommandOutput) -> bool {
    output.success && output.stdout.contains(name)
}

#[async_trait]
impl ServiceManager for LaunchdServiceManager {
    fn manager_name(&self) -> &'static str {
        "launchd"
    }

    fn service_name(&self) -> &str {
        self.descriptor.service_name()
    }

    fn artifact_path(&self) -> PathBuf {
        self.ctx.path(&format!(
            "/Library/LaunchDaemons/{}.{}.plist",
            self.ctx.launchd_label_prefix,
            self.descriptor.service_name()
        ))
    }

    async fn is_running(&self) -> bool {
        match self
            .ctx
            .runner
            .output("launchctl", &["list", self.service_name()])
            .await
        {
            Ok(output) => is_listed(self.service_name(), &output),
            Err(_) => false,
        }
    }

    async fn install_artifacts(&self, args: &[String]) -> Result<(), DaemonError> {
        let fields = TemplateFields::new(&self.descriptor, args).xml_escaped();
        TemplateRenderer::render_to_file(
            TemplateKind::LaunchdPlist,
            &fields,
            &self.artifact_path(),
            0o644,
        )
        .await
    }

    async fn start_service(&self) -> Result<(), DaemonError> {
        self.launchctl("load").await
    }

    async fn stop_service(&self) -> Result<(), DaemonError> {
        self.launchctl("unload").await
    }

    async fn restart_service(&self) -> Result<(), DaemonError> {
        // launchctl has no restart verb
        if self.is_running().await {
            self.launchctl("unload").await?;
        }
        self.launchctl("load").await
    }
}
