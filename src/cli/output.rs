use crate::cli::commands::Outcome;
use crate::error::DaemonError;

/// One-line message for a successful verb.
pub fn describe_outcome(name: &str, outcome: Outcome) -> String {
    match outcome {
        Outcome::Installed => format!("{name} installed"),
        Outcome::Uninstalled => format!("{name} removed"),
        Outcome::Started => format!("{name} started"),
        Outcome::Stopped => format!("{name} stopped"),
        Outcome::Restarted => format!("{name} restarted"),
        Outcome::Running => format!("{name} is running"),
        Outcome::Dead => format!("{name} is dead"),
        Outcome::NotInstalled => format!("{name} is not installed"),
        Outcome::Served => format!("{name} service exited"),
    }
}

/// `<verb> <name>: <error>`
pub fn describe_failure(verb: &str, name: &str, error: &DaemonError) -> String {
    format!("{verb} {name}: {error}")
}

pub fn print_outcome(name: &str, outcome: Outcome) {
    println!("{}", describe_outcome(name, outcome));
}

pub fn print_failure(verb: &str, name: &str, error: &DaemonError) {
    eprintln!("{}", describe_failure(verb, name, error));
}
