//! Root group check for mutating service operations

/// Answers whether the calling process may mutate native service state.
pub trait PrivilegeCheck: Send + Sync {
    fn is_privileged(&self) -> bool;
}

/// Checks the effective group id of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct EffectiveGroup;

impl PrivilegeCheck for EffectiveGroup {
    #[cfg(unix)]
    fn is_privileged(&self) -> bool {
        nix::unistd::getegid().as_raw() == 0
    }

    // The SCM rejects unprivileged callers with ERROR_ACCESS_DENIED itself.
    #[cfg(not(unix))]
    fn is_privileged(&self) -> bool {
        true
    }
}

/// Fixed answer, for tests and for callers that already checked elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct StaticPrivilege(pub bool);

impl PrivilegeCheck for StaticPrivilege {
    fn is_privileged(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_effective_group_matches_nix() {
        let expected = nix::unistd::getegid().as_raw() == 0;
        assert_eq!(EffectiveGroup.is_privileged(), expected);
    }

    #[test]
    fn test_static_privilege() {
        assert!(StaticPrivilege(true).is_privileged());
        assert!(!StaticPrivilege(false).is_privileged());
    }
}
