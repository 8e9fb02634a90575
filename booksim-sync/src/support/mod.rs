//! Shared foundation used by every entity sync.

pub mod backup;
pub mod credentials;
pub mod extract;
pub mod session;

pub use backup::BackupRotation;
pub use credentials::{CredentialGate, EnvCredential};
pub use extract::{extract_text, AsText, FieldText};
pub use session::SyncSession;
