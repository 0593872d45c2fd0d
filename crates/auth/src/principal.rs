use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sahara_core::IdentityId;

/// Principal handed back by the identity provider.
///
/// Only the id and contact address are ever read by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: IdentityId) -> Self {
        Self { id, email: None }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Credential bound to an [`Identity`].
///
/// The access token is opaque here: it is carried for the transport layer and
/// never parsed. Expiry is the provider's business; `expires_at` is whatever it
/// reported, kept for diagnostics.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    identity: Identity,
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(identity: Identity, access_token: impl Into<String>) -> Self {
        Self {
            identity,
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

// Tokens must never end up in logs.
impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_token() {
        let session = Session::new(Identity::new(IdentityId::new()), "secret-token-value");
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token-value"));
        assert!(rendered.contains("<redacted>"));
        assert_eq!(session.access_token(), "secret-token-value");
    }
}
