//! Archive of finished conversations.
//!
//! The whole archive is one JSON array under [`HISTORY_KEY`], most recent
//! first. Every mutation reads the array, changes it and writes it back, so
//! callers must not run two mutations at once.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::core::message::Message;
use crate::core::store::{KeyValueStore, StoreError, HISTORY_KEY};

/// Length of an entry's preview, in grapheme clusters.
pub const PREVIEW_LENGTH: usize = 30;
const ELLIPSIS: &str = "...";

/// A closed conversation, frozen at the moment it was archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedConversation {
    pub id: String,
    pub character_name: String,
    #[serde(alias = "date")]
    pub closed_at: String,
    pub preview: String,
    #[serde(alias = "messages")]
    pub transcript: Vec<Message>,
}

impl ArchivedConversation {
    pub fn new(character_name: impl Into<String>, transcript: Vec<Message>) -> Self {
        let preview = transcript
            .last()
            .map(|message| preview_of(&message.text))
            .unwrap_or_default();
        Self {
            id: next_archive_id(),
            character_name: character_name.into(),
            closed_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            preview,
            transcript,
        }
    }
}

/// First [`PREVIEW_LENGTH`] graphemes of `text`, with an ellipsis when cut.
pub fn preview_of(text: &str) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(PREVIEW_LENGTH).collect();
    if graphemes.next().is_some() {
        format!("{head}{ELLIPSIS}")
    } else {
        head
    }
}

static LAST_ARCHIVE_ID: AtomicI64 = AtomicI64::new(0);

/// Millisecond timestamp, bumped past any id already handed out.
fn next_archive_id() -> String {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ARCHIVE_ID.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_ARCHIVE_ID.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return next.to_string(),
            Err(current) => last = current,
        }
    }
}

#[derive(Debug)]
pub enum HistoryError {
    /// The durable store could not be read or written.
    Persistence(StoreError),
    Encode(serde_json::Error),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Persistence(err) => write!(f, "Chat history not saved: {err}"),
            HistoryError::Encode(err) => write!(f, "Chat history could not be encoded: {err}"),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::Persistence(err) => Some(err),
            HistoryError::Encode(err) => Some(err),
        }
    }
}

impl From<StoreError> for HistoryError {
    fn from(err: StoreError) -> Self {
        HistoryError::Persistence(err)
    }
}

pub struct HistoryArchive {
    store: Arc<dyn KeyValueStore>,
    limit: Option<usize>,
}

impl HistoryArchive {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, limit: None }
    }

    /// Keep at most `limit` entries; the oldest are dropped on append.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit.filter(|limit| *limit > 0);
        self
    }

    /// Every archived conversation, most recent first.
    pub fn list(&self) -> Result<Vec<ArchivedConversation>, HistoryError> {
        let Some(raw) = self.store.get(HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<ArchivedConversation>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(error = %err, "stored chat history is malformed; ignoring it");
                Ok(Vec::new())
            }
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<ArchivedConversation>, HistoryError> {
        Ok(self.list()?.into_iter().find(|entry| entry.id == id))
    }

    pub fn append(&self, entry: ArchivedConversation) -> Result<(), HistoryError> {
        let mut entries = self.list()?;
        debug!(id = %entry.id, character = %entry.character_name, "archiving conversation");
        entries.insert(0, entry);
        if let Some(limit) = self.limit {
            entries.truncate(limit);
        }
        self.persist(&entries)
    }

    /// Remove one entry. Returns `false`, without writing, when `id` is unknown.
    pub fn delete(&self, id: &str) -> Result<bool, HistoryError> {
        let mut entries = self.list()?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.persist(&entries)?;
        debug!(id, "deleted archived conversation");
        Ok(true)
    }

    fn persist(&self, entries: &[ArchivedConversation]) -> Result<(), HistoryError> {
        let encoded = serde_json::to_string(entries).map_err(HistoryError::Encode)?;
        self.store.set(HISTORY_KEY, &encoded)?;
        Ok(())
    }
}
