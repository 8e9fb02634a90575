//! External-credential availability gate.
//!
//! Checked before any call to the external source; a missing credential
//! aborts that entity's sync without touching the network.

use booksim_core::EntityType;

pub trait CredentialGate: Send + Sync {
    fn has_external_credential(&self, entity: EntityType) -> bool;
}

/// Closures work as gates, which keeps tests short.
impl<F> CredentialGate for F
where
    F: Fn(EntityType) -> bool + Send + Sync,
{
    fn has_external_credential(&self, entity: EntityType) -> bool {
        self(entity)
    }
}

/// Credential read from an environment variable; blank values count as absent.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl CredentialGate for EnvCredential {
    fn has_external_credential(&self, entity: EntityType) -> bool {
        let available = std::env::var(&self.var)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        if !available {
            tracing::debug!(entity = %entity, var = %self.var, "external credential not set");
        }
        available
    }
}
