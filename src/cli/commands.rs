use tracing::info;

use crate::cli::options::{Verb, RUN_VERB};
use crate::error::DaemonError;
use crate::service_managers::DaemonController;

/// Result of a successful verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Installed,
    Uninstalled,
    Started,
    Stopped,
    Restarted,
    Running,
    Dead,
    NotInstalled,
    Served,
}

/// Arguments registered with the native manager: the hidden `run` verb
/// followed by the caller's own arguments, so a launched service parses
/// back into [`Verb::Run`].
pub fn launch_args(args: &[String]) -> Vec<String> {
    std::iter::once(RUN_VERB.to_string())
        .chain(args.iter().cloned())
        .collect()
}

/// Route one verb to the controller.
///
/// `status` folds the stopped and not-installed conditions into an
/// [`Outcome`]; every other error is returned to the caller.
pub async fn execute(controller: &dyn DaemonController, verb: &Verb) -> Result<Outcome, DaemonError> {
    match verb {
        Verb::Install { args } => {
            controller.install(&launch_args(args)).await?;
            Ok(Outcome::Installed)
        }
        Verb::Uninstall => {
            controller.uninstall().await?;
            Ok(Outcome::Uninstalled)
        }
        Verb::Start { args } => {
            if !controller.is_installed().await {
                info!(service = controller.service_name(), "not installed, installing before start");
                controller.install(&launch_args(args)).await?;
            }
            controller.start().await?;
            Ok(Outcome::Started)
        }
        Verb::Stop => {
            controller.stop().await?;
            Ok(Outcome::Stopped)
        }
        Verb::Restart => {
            controller.restart().await?;
            Ok(Outcome::Restarted)
        }
        Verb::Status => match controller.status().await {
            Ok(()) => Ok(Outcome::Running),
            Err(DaemonError::Stopped { .. }) => Ok(Outcome::Dead),
            Err(DaemonError::NotInstalled { .. }) => Ok(Outcome::NotInstalled),
            Err(e) => Err(e),
        },
        Verb::Run { .. } => {
            controller.run().await?;
            Ok(Outcome::Served)
        }
    }
}
