use std::collections::HashSet;

/// Allow-list of Slack users permitted to run the command.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    allowed_users: HashSet<String>,
    enforce: bool,
}

impl AccessPolicy {
    pub fn new<I, S>(enforce: bool, allowed_users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_users: allowed_users.into_iter().map(Into::into).collect(),
            enforce,
        }
    }

    /// Policy that lets everyone through.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn enforced(&self) -> bool {
        self.enforce
    }

    pub fn is_allowed(&self, user: &str) -> bool {
        !self.enforce || self.allowed_users.contains(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enforced_policy_checks_membership() {
        let policy = AccessPolicy::new(true, ["alice"]);
        assert!(policy.is_allowed("alice"));
        assert!(!policy.is_allowed("bob"));
        assert!(!policy.is_allowed(""));
        assert!(!policy.is_allowed("Alice"));
    }

    #[test]
    fn disabled_policy_allows_everyone() {
        let policy = AccessPolicy::new(false, ["alice"]);
        assert!(policy.is_allowed("alice"));
        assert!(policy.is_allowed("bob"));
        assert!(AccessPolicy::open().is_allowed("anyone"));
    }

    #[test]
    fn enforced_empty_list_denies_everyone() {
        let policy = AccessPolicy::new(true, Vec::<String>::new());
        assert!(policy.enforced());
        assert!(!policy.is_allowed("alice"));
    }
}
