//! Init system detection and controller construction

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::config::DaemonSettings;
use crate::descriptor::ServiceDescriptor;
use crate::error::DaemonError;
use crate::service_managers::{
    ControllerContext, DaemonController, InitServiceManager, LaunchdServiceManager, PosixDaemon,
    RcServiceManager, SystemdServiceManager, UpstartServiceManager, WindowsDaemon,
};

/// The native service manager a controller talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    Systemd,
    Upstart,
    SysV,
    Launchd,
    RcD,
    Windows,
}

impl PlatformKind {
    /// Detect the service manager of the running host. Never fails; Linux
    /// hosts without systemd or Upstart markers fall back to SysV.
    pub fn detect(root: &Path) -> Self {
        let kind = Self::for_target(root);
        debug!(platform = %kind, "detected service manager");
        kind
    }

    #[cfg(target_os = "linux")]
    fn for_target(root: &Path) -> Self {
        Self::probe_linux(root)
    }

    #[cfg(target_os = "macos")]
    fn for_target(_root: &Path) -> Self {
        PlatformKind::Launchd
    }

    #[cfg(windows)]
    fn for_target(_root: &Path) -> Self {
        PlatformKind::Windows
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
    fn for_target(_root: &Path) -> Self {
        PlatformKind::RcD
    }

    /// Linux probe order: systemd runtime directory, Upstart's initctl, then SysV.
    pub fn probe_linux(root: &Path) -> Self {
        if root.join("run/systemd/system").exists() {
            PlatformKind::Systemd
        } else if root.join("sbin/initctl").exists() {
            PlatformKind::Upstart
        } else {
            PlatformKind::SysV
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PlatformKind::Systemd => "systemd",
            PlatformKind::Upstart => "upstart",
            PlatformKind::SysV => "sysv",
            PlatformKind::Launchd => "launchd",
            PlatformKind::RcD => "rc.d",
            PlatformKind::Windows => "windows",
        }
    }

    /// Dependencies every service gets on this platform.
    pub fn default_dependencies(self) -> &'static [&'static str] {
        match self {
            PlatformKind::Systemd | PlatformKind::Upstart | PlatformKind::SysV => {
                &["network.target"]
            }
            PlatformKind::Launchd | PlatformKind::RcD | PlatformKind::Windows => &[],
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptor of the current executable with platform defaults and settings applied.
pub fn service_descriptor(
    kind: PlatformKind,
    settings: &DaemonSettings,
) -> Result<ServiceDescriptor, DaemonError> {
    let descriptor = ServiceDescriptor::current()?
        .with_dependencies(kind.default_dependencies().iter().copied());
    Ok(settings.apply(descriptor))
}

pub fn create_controller(
    kind: PlatformKind,
    descriptor: ServiceDescriptor,
    ctx: &ControllerContext,
) -> Box<dyn DaemonController> {
    let privilege = Arc::clone(&ctx.privilege);
    match kind {
        PlatformKind::Systemd => Box::new(PosixDaemon::new(
            SystemdServiceManager::new(descriptor, ctx.clone()),
            privilege,
        )),
        PlatformKind::Upstart => Box::new(PosixDaemon::new(
            UpstartServiceManager::new(descriptor, ctx.clone()),
            privilege,
        )),
        PlatformKind::SysV => Box::new(PosixDaemon::new(
            InitServiceManager::new(descriptor, ctx.clone()),
            privilege,
        )),
        PlatformKind::Launchd => Box::new(PosixDaemon::new(
            LaunchdServiceManager::new(descriptor, ctx.clone()),
            privilege,
        )),
        PlatformKind::RcD => Box::new(PosixDaemon::new(
            RcServiceManager::new(descriptor, ctx.clone()),
            privilege,
        )),
        PlatformKind::Windows => Box::new(WindowsDaemon::new(descriptor, ctx)),
    }
}

/// Detect the platform under `ctx.root` and build its controller.
pub fn detect_controller(
    descriptor: ServiceDescriptor,
    ctx: &ControllerContext,
) -> Box<dyn DaemonController> {
    create_controller(PlatformKind::detect(&ctx.root), descriptor, ctx)
}
