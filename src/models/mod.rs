pub mod credential;

pub use credential::{
    CredentialRecord, CredentialStatus, PersistedCredential, RawTokenPayload, StoredCredential,
};
