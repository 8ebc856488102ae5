//! Readable messages for SCM error codes

use crate::error::DaemonError;
use crate::service_managers::windows::scm::NativeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemError {
    pub code: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub action: &'static str,
}

impl SystemError {
    const fn new(code: u32, title: &'static str, description: &'static str) -> Self {
        Self {
            code,
            title,
            description,
            action: "",
        }
    }

    /// `title: description action`, without a trailing space when there is no action.
    pub fn render(&self) -> String {
        if self.action.is_empty() {
            format!("{}: {}", self.title, self.description)
        } else {
            format!("{}: {} {}", self.title, self.description, self.action)
        }
    }
}

/// Sorted by code.
pub static SYSTEM_ERRORS: [SystemError; 27] = [
    SystemError {
        code: 5,
        title: "ERROR_ACCESS_DENIED",
        description: "Access denied.",
        action: "Administrator access is needed to install a service.",
    },
    SystemError::new(
        1051,
        "ERROR_DEPENDENT_SERVICES_RUNNING",
        "A stop control has been sent to a service that other running services are dependent on.",
    ),
    SystemError::new(
        1052,
        "ERROR_INVALID_SERVICE_CONTROL",
        "The requested control is not valid for this service.",
    ),
    SystemError::new(
        1053,
        "ERROR_SERVICE_REQUEST_TIMEOUT",
        "The service did not respond to the start or control request in a timely fashion.",
    ),
    SystemError::new(
        1054,
        "ERROR_SERVICE_NO_THREAD",
        "A thread could not be created for the service.",
    ),
    SystemError::new(
        1055,
        "ERROR_SERVICE_DATABASE_LOCKED",
        "The service database is locked.",
    ),
    SystemError::new(
        1056,
        "ERROR_SERVICE_ALREADY_RUNNING",
        "An instance of the service is already running.",
    ),
    SystemError::new(
        1057,
        "ERROR_INVALID_SERVICE_ACCOUNT",
        "The account name is invalid or does not exist, or the password is invalid for the account name specified.",
    ),
    SystemError::new(
        1058,
        "ERROR_SERVICE_DISABLED",
        "The service cannot be started, either because it is disabled or because it has no enabled devices associated with it.",
    ),
    SystemError::new(
        1060,
        "ERROR_SERVICE_DOES_NOT_EXIST",
        "The specified service does not exist as an installed service.",
    ),
    SystemError::new(
        1061,
        "ERROR_SERVICE_CANNOT_ACCEPT_CTRL",
        "The service cannot accept control messages at this time.",
    ),
    SystemError::new(
        1062,
        "ERROR_SERVICE_NOT_ACTIVE",
        "The service has not been started.",
    ),
    SystemError::new(
        1063,
        "ERROR_FAILED_SERVICE_CONTROLLER_CONNECT",
        "The service process could not connect to the service controller.",
    ),
    SystemError::new(
        1064,
        "ERROR_EXCEPTION_IN_SERVICE",
        "An exception occurred in the service when handling the control request.",
    ),
    SystemError::new(
        1066,
        "ERROR_SERVICE_SPECIFIC_ERROR",
        "The service has returned a service-specific error code.",
    ),
    SystemError::new(
        1068,
        "ERROR_SERVICE_DEPENDENCY_FAIL",
        "The dependency service or group failed to start.",
    ),
    SystemError::new(
        1069,
        "ERROR_SERVICE_LOGON_FAILED",
        "The service did not start due to a logon failure.",
    ),
    SystemError::new(
        1070,
        "ERROR_SERVICE_START_HANG",
        "After starting, the service hung in a start-pending state.",
    ),
    SystemError::new(
        1071,
        "ERROR_INVALID_SERVICE_LOCK",
        "The specified service database lock is invalid.",
    ),
    SystemError::new(
        1072,
        "ERROR_SERVICE_MARKED_FOR_DELETE",
        "The specified service has been marked for deletion.",
    ),
    SystemError::new(
        1073,
        "ERROR_SERVICE_EXISTS",
        "The specified service already exists.",
    ),
    SystemError::new(
        1075,
        "ERROR_SERVICE_DEPENDENCY_DELETED",
        "The dependency service does not exist or has been marked for deletion.",
    ),
    SystemError::new(
        1077,
        "ERROR_SERVICE_NEVER_STARTED",
        "No attempts to start the service have been made since the last boot.",
    ),
    SystemError::new(
        1078,
        "ERROR_DUPLICATE_SERVICE_NAME",
        "The name is already in use as either a service name or a service display name.",
    ),
    SystemError::new(
        1079,
        "ERROR_DIFFERENT_SERVICE_ACCOUNT",
        "The account specified for this service is different from the account specified for other services running in the same process.",
    ),
    SystemError::new(
        1083,
        "ERROR_SERVICE_NOT_IN_EXE",
        "The executable program that this service is configured to run in does not implement the service.",
    ),
    SystemError::new(
        1084,
        "ERROR_NOT_SAFEBOOT_SERVICE",
        "This service cannot be started in Safe Mode.",
    ),
];

pub fn lookup(code: u32) -> Option<&'static SystemError> {
    SYSTEM_ERRORS
        .binary_search_by_key(&code, |entry| entry.code)
        .ok()
        .map(|index| &SYSTEM_ERRORS[index])
}

/// Wrap a failed SCM call, replacing the OS message with the table entry when the code is known.
pub fn translate(operation: &str, err: NativeError) -> DaemonError {
    let detail = match lookup(err.code) {
        Some(entry) => entry.render(),
        None => err.to_string(),
    };
    DaemonError::native(operation, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_and_unique() {
        assert!(SYSTEM_ERRORS
            .windows(2)
            .all(|pair| pair[0].code < pair[1].code));
    }

    #[test]
    fn test_access_denied_carries_action() {
        let err = translate("OpenSCManager", NativeError::new(5, "Access is denied."));
        assert_eq!(
            err.to_string(),
            "OpenSCManager failed: ERROR_ACCESS_DENIED: Access denied. \
             Administrator access is needed to install a service."
        );
    }

    #[test]
    fn test_mapped_code_without_action() {
        let err = translate("StartService", NativeError::new(1058, "disabled"));
        assert_eq!(
            err.to_string(),
            "StartService failed: ERROR_SERVICE_DISABLED: The service cannot be started, \
             either because it is disabled or because it has no enabled devices associated with it."
        );
    }

    #[test]
    fn test_unmapped_code_passes_through() {
        let err = translate("QueryServiceStatus", NativeError::new(87, "The parameter is incorrect."));
        assert_eq!(
            err.to_string(),
            "QueryServiceStatus failed: The parameter is incorrect. (os error 87)"
        );
        assert!(lookup(1065).is_none());
        assert!(lookup(1084).is_some());
    }
}
