//! Everything a front end needs to run interviews: the loaded character
//! list, the stored credential, the history archive and a provider.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::{CredentialError, CredentialStore};
use crate::character::loader::select;
use crate::character::{CatalogError, CharacterCatalog, CharacterRecord};
use crate::core::config::{Config, ConfigError};
use crate::core::history::{ArchivedConversation, HistoryArchive, HistoryError};
use crate::core::providers::{GeminiProvider, ModelProvider};
use crate::core::session::{ConversationSession, SessionError};
use crate::core::store::{FileStore, KeyValueStore, StoreError};

/// What became of a session handed to [`AppContext::close_session`].
#[derive(Debug)]
pub enum CloseOutcome {
    AlreadyClosed,
    Discarded,
    Archived(ArchivedConversation),
    /// The conversation ended but its durable copy is missing.
    ArchiveFailed {
        entry: ArchivedConversation,
        error: HistoryError,
    },
}

pub struct AppContext {
    provider: Arc<dyn ModelProvider>,
    credentials: CredentialStore,
    history: HistoryArchive,
    catalog: CharacterCatalog,
    characters: Result<Vec<CharacterRecord>, CatalogError>,
    credential: Option<String>,
}

impl AppContext {
    /// Build a context and perform the initial catalog and credential load.
    pub fn load(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn ModelProvider>,
    ) -> Self {
        let catalog = CharacterCatalog::from_config(&config);
        let history = HistoryArchive::new(Arc::clone(&store)).with_limit(config.history_limit);
        let mut context = Self {
            characters: Ok(Vec::new()),
            credential: None,
            credentials: CredentialStore::new(store),
            provider,
            history,
            catalog,
        };
        if let Err(err) = context.reload_characters() {
            warn!(error = %err, "character list not loaded");
        }
        if let Err(err) = context.reload_credential() {
            warn!(error = %err, "stored API key not readable");
        }
        context
    }

    /// Context backed by the data directory and the Gemini API.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let data_dir: PathBuf = config.data_dir().ok_or(ConfigError::NoConfigDir)?;
        debug!(data_dir = %crate::core::config::path_display(&data_dir), "opening data directory");
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(data_dir));
        let provider: Arc<dyn ModelProvider> = Arc::new(GeminiProvider::from_config(&config));
        Ok(Self::load(config, store, provider))
    }

    pub fn history(&self) -> &HistoryArchive {
        &self.history
    }

    /// Characters from the last load, or why there are none.
    pub fn characters(&self) -> Result<&[CharacterRecord], &CatalogError> {
        self.characters.as_deref()
    }

    pub fn reload_characters(&mut self) -> Result<&[CharacterRecord], &CatalogError> {
        self.characters = self.catalog.load_all();
        self.characters()
    }

    pub fn select_character(&self, selector: &str) -> Result<CharacterRecord, CatalogError> {
        let records = self.characters.as_ref().map_err(Clone::clone)?;
        select(records, selector).cloned()
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn reload_credential(&mut self) -> Result<Option<&str>, StoreError> {
        self.credential = None;
        self.credential = self.credentials.get()?;
        Ok(self.credential())
    }

    pub fn set_credential(&mut self, value: &str) -> Result<(), CredentialError> {
        self.credentials.set(value)?;
        self.credential = Some(value.trim().to_string());
        Ok(())
    }

    pub fn clear_credential(&mut self) -> Result<(), StoreError> {
        self.credentials.clear()?;
        self.credential = None;
        Ok(())
    }

    /// Verify `value`, or the stored credential when `value` is `None`.
    pub async fn verify_credential(&self, value: Option<&str>) -> Result<(), CredentialError> {
        let value = value
            .or(self.credential.as_deref())
            .ok_or(CredentialError::Empty)?;
        self.credentials.verify(self.provider.as_ref(), value).await
    }

    pub async fn start_session(
        &self,
        character: CharacterRecord,
    ) -> Result<ConversationSession, SessionError> {
        ConversationSession::start(self.provider.as_ref(), character, self.credential()).await
    }

    /// Close `session` and archive it when asked. A failed write is logged and
    /// reported but the session stays closed.
    pub fn close_session(&self, session: &mut ConversationSession, archive: bool) -> CloseOutcome {
        if session.state().is_closed() {
            return CloseOutcome::AlreadyClosed;
        }
        let Some(entry) = session.close(archive) else {
            return CloseOutcome::Discarded;
        };
        match self.history.append(entry.clone()) {
            Ok(()) => CloseOutcome::Archived(entry),
            Err(error) => {
                warn!(id = %entry.id, error = %error, "conversation closed but not archived");
                CloseOutcome::ArchiveFailed { entry, error }
            }
        }
    }
}
