use chrono::{DateTime, Utc};

/// An add-on requested for installation that should join `group` once the
/// inventory reports it installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallWaitEntry {
    pub addon_id: String,
    pub group: String,
    pub requested_at: DateTime<Utc>,
}

impl InstallWaitEntry {
    pub fn new(addon_id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            addon_id: addon_id.into(),
            group: group.into(),
            requested_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, ttl: Option<chrono::Duration>, now: DateTime<Utc>) -> bool {
        match ttl {
            Some(ttl) => now - self.requested_at > ttl,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_expires_without_ttl() {
        let mut entry = InstallWaitEntry::new("ext.a", "Work");
        entry.requested_at = Utc::now() - chrono::Duration::days(365);
        assert!(!entry.is_expired(None, Utc::now()));
    }

    #[test]
    fn expires_after_ttl() {
        let mut entry = InstallWaitEntry::new("ext.a", "Work");
        let now = Utc::now();
        entry.requested_at = now - chrono::Duration::seconds(120);
        assert!(entry.is_expired(Some(chrono::Duration::seconds(60)), now));
        assert!(!entry.is_expired(Some(chrono::Duration::seconds(600)), now));
    }
}
