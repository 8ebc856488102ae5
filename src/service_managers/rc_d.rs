//! rc.d service manager for FreeBSD and the other BSDs

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::warn;

use crate::command::CommandOutput;
use crate::descriptor::ServiceDescriptor;
use crate::error::DaemonError;
use crate::service_managers::{ControllerContext, ServiceManager};
use crate::templates::{TemplateFields, TemplateKind, TemplateRenderer};

pub struct RcServiceManager {
    descriptor: ServiceDescriptor,
    ctx: ControllerContext,
}

impl RcServiceManager {
    pub fn new(descriptor: ServiceDescriptor, ctx: ControllerContext) -> Self {
        Self { descriptor, ctx }
    }

    async fn is_enabled(&self) -> bool {
        let rc_conf = self.ctx.path("/etc/rc.conf");
        match tokio::fs::read_to_string(&rc_conf).await {
            Ok(content) => rc_conf_enables(self.service_name(), &content),
            Err(_) => false,
        }
    }

    /// rc.d refuses plain verbs for services without `<name>_enable="YES"`;
    /// the `one` prefix forces them.
    async fn verb(&self, verb: &str) -> String {
        if self.is_enabled().await {
            verb.to_string()
        } else {
            warn!(
                service = self.service_name(),
                "service is not enabled in /etc/rc.conf, using \"one{verb}\" instead"
            );
            format!("one{verb}")
        }
    }

    async fn service(&self, verb: &str) -> Result<(), DaemonError> {
        let verb = self.verb(verb).await;
        self.ctx
            .runner
            .run("service", &[self.service_name(), &verb])
            .await?;
        Ok(())
    }
}

/// Whether an uncommented `<name>_enable="YES"` assignment appears in rc.conf.
pub fn rc_conf_enables(name: &str, rc_conf: &str) -> bool {
    let needle = format!("{name}_enable=\"YES\"");
    rc_conf.lines().any(|line| {
        let line = line.trim_start();
        !line.starts_with('#') && line.contains(&needle)
    })
}

pub fn reports_running(name: &str, output: &CommandOutput) -> bool {
    output.success && output.stdout.contains(name)
}

#[async_trait]
impl ServiceManager for RcServiceManager {
    fn manager_name(&self) -> &'static str {
        "rc.d"
    }

    fn service_name(&self) -> &str {
        self.descriptor.service_name()
    }

    fn artifact_path(&self) -> PathBuf {
        self.ctx.path(&format!(
            "/usr/local/etc/rc.d/{}",
            self.descriptor.service_name()
        ))
    }

    async fn is_running(&self) -> bool {
        let verb = self.verb("status").await;
        match self
            .ctx
            .runner
            .output("service", &[self.service_name(), &verb])
            .await
        {
            Ok(output) => reports_running(self.service_name(), &output),
            Err(_) => false,
        }
    }

    async fn install_artifacts(&self, args: &[String]) -> Result<(), DaemonError> {
        let fields = TemplateFields::new(&self.descriptor, args);
        TemplateRenderer::render_to_file(
            TemplateKind::RcScript,
            &fields,
            &self.artifact_path(),
            0o755,
        )
        .await
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
