//! Pieces shared by the Linux and macOS backends.

use std::collections::HashMap;

use nix::unistd::{Uid, User};
use tracing::debug;

/// Per-call uid -> account name lookups, so a full listing resolves each
/// uid once.
#[derive(Default)]
pub(crate) struct OwnerNames {
    names: HashMap<u32, Option<String>>,
}

impl OwnerNames {
    pub(crate) fn resolve(&mut self, uid: u32) -> Option<String> {
        self.names
            .entry(uid)
            .or_insert_with(|| match User::from_uid(Uid::from_raw(uid)) {
                Ok(Some(user)) => Some(user.name),
                Ok(None) => {
                    debug!(uid, "no account name for uid");
                    None
                }
                Err(e) => {
                    debug!(uid, error = %e, "account lookup failed");
                    None
                }
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_resolves() {
        let mut owners = OwnerNames::default();
        assert_eq!(owners.resolve(0).as_deref(), Some("root"));
    }

    #[test]
    fn test_lookups_are_memoized() {
        let mut owners = OwnerNames::default();
        let first = owners.resolve(0x7FFF_FFF0);
        assert_eq!(owners.resolve(0x7FFF_FFF0), first);
        assert_eq!(owners.names.len(), 1);
    }
}
