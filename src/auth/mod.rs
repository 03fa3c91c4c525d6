//! API credential storage and verification.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::providers::{ModelProvider, ProviderError};
use crate::core::store::{KeyValueStore, StoreError, CREDENTIAL_KEY};

/// Prompt used to check a credential, and the token the reply must contain.
pub const VERIFY_PROMPT: &str = "Say 'OK'";
pub const VERIFY_TOKEN: &str = "OK";

#[derive(Debug)]
pub enum CredentialError {
    /// The value was empty after trimming.
    Empty,
    /// The provider rejected the credential.
    Invalid(ProviderError),
    /// The provider could not be reached or answered unexpectedly.
    Connectivity {
        reason: String,
        source: Option<ProviderError>,
    },
    /// The durable store failed.
    Store(StoreError),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::Empty => write!(f, "The API key cannot be empty"),
            CredentialError::Invalid(err) => write!(
                f,
                "Invalid API key. Check that it is correct and enabled in Google AI Studio ({err})"
            ),
            CredentialError::Connectivity { reason, .. } => {
                write!(f, "Could not verify the API key: {reason}")
            }
            CredentialError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CredentialError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CredentialError::Invalid(err) => Some(err),
            CredentialError::Connectivity {
                source: Some(err), ..
            } => Some(err),
            CredentialError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for CredentialError {
    fn from(err: StoreError) -> Self {
        CredentialError::Store(err)
    }
}

/// The single stored API credential.
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the stored credential; `None` if never set.
    pub fn get(&self) -> Result<Option<String>, StoreError> {
        let value = self.store.get(CREDENTIAL_KEY)?;
        Ok(value.filter(|value| {
            let usable = !value.trim().is_empty();
            if !usable {
                warn!("stored API key is blank; treating it as unset");
            }
            usable
        }))
    }

    /// Store a credential. Whitespace-only values are rejected and leave the
    /// previous credential untouched.
    pub fn set(&self, value: &str) -> Result<(), CredentialError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CredentialError::Empty);
        }
        self.store.set(CREDENTIAL_KEY, trimmed)?;
        info!("API key saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(CREDENTIAL_KEY)?;
        info!("API key removed");
        Ok(())
    }

    /// Check a credential with one short round-trip. Advisory only: nothing
    /// here stops an unverified credential from being stored or used.
    pub async fn verify(
        &self,
        provider: &dyn ModelProvider,
        value: &str,
    ) -> Result<(), CredentialError> {
        verify_credential(provider, value).await
    }
}

pub async fn verify_credential(
    provider: &dyn ModelProvider,
    value: &str,
) -> Result<(), CredentialError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CredentialError::Empty);
    }

    match provider.complete(value, VERIFY_PROMPT).await {
        Ok(reply) if reply.trim().contains(VERIFY_TOKEN) => {
            debug!("API key verified");
            Ok(())
        }
        Ok(reply) => {
            warn!(reply = %reply, "unexpected reply while verifying API key");
            Err(CredentialError::Connectivity {
                reason: format!("the model answered unexpectedly: {}", reply.trim()),
                source: None,
            })
        }
        Err(err) if err.is_auth() => {
            warn!(error = %err, "API key rejected");
            Err(CredentialError::Invalid(err))
        }
        Err(err) => {
            warn!(error = %err, "API key check failed");
            Err(CredentialError::Connectivity {
                reason: err.to_string(),
                source: Some(err),
            })
        }
    }
}

/// First five characters of a credential, for display.
pub fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(5).collect();
    format!("{prefix}...")
}
