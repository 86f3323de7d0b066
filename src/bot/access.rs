//! Capability checks for admin commands.

use std::collections::BTreeSet;

use crate::error::AccessError;

/// Something only some identities may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Run the draw, send results, clear the event.
    Admin,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Static allow-list of admin identities. `"*"` admits everyone.
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    admins: BTreeSet<String>,
}

impl AdminGate {
    pub fn new(admins: impl IntoIterator<Item = String>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    /// Check if any of the provided identities holds `capability`.
    ///
    /// Matching ignores ASCII case, since platform handles do.
    pub fn has<'a>(
        &self,
        capability: Capability,
        identities: impl IntoIterator<Item = &'a str>,
    ) -> bool {
        match capability {
            Capability::Admin => {
                let ids: Vec<&str> = identities.into_iter().collect();
                self.admins
                    .iter()
                    .any(|a| a == "*" || ids.iter().any(|id| id.eq_ignore_ascii_case(a)))
            }
        }
    }

    /// `Ok` when `identity` (or its handle) holds `capability`.
    pub fn authorize(
        &self,
        identity: &str,
        handle: Option<&str>,
        capability: Capability,
    ) -> Result<(), AccessError> {
        let identities = std::iter::once(identity).chain(handle);
        if self.has(capability, identities) {
            return Ok(());
        }
        tracing::warn!(identity, %capability, "Refusing command from non-admin");
        Err(AccessError::Denied {
            identity: identity.to_string(),
            capability: capability.to_string(),
        })
    }
}
