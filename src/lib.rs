//! Rustle Service - native service lifecycle controller
//!
//! Registers the running executable with the host's service manager
//! (systemd, SysV init, Upstart, launchd, BSD rc.d or the Windows Service
//! Control Manager) and drives it through install, start, stop, restart,
//! status and uninstall.

pub mod cli;
pub mod command;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod platform;
pub mod privilege;
pub mod service_managers;
pub mod templates;

pub use config::DaemonSettings;
pub use descriptor::ServiceDescriptor;
pub use error::DaemonError;
pub use platform::{create_controller, detect_controller, PlatformKind};
pub use service_managers::{ControllerContext, DaemonController};
