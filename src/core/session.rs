//! One interview with one character.
//!
//! A session moves `Closed → Opening → Active → Archived | Discarded` and
//! owns the provider's [`Dialogue`] handle for as long as it is active.
//! Sending is split in two: [`ConversationSession::submit`] records the user
//! message and the in-flight turn synchronously, so a caller can render it
//! before [`ConversationSession::resolve`] waits for the reply.

use std::fmt;

use tracing::{debug, info, warn};

use crate::character::CharacterRecord;
use crate::core::history::ArchivedConversation;
use crate::core::message::Message;
use crate::core::providers::{Dialogue, ModelProvider, ProviderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet opened.
    Closed,
    Opening,
    Active,
    /// Closed and handed to the archive.
    Archived,
    /// Closed without archiving, or failed to open.
    Discarded,
}

impl SessionState {
    pub fn is_closed(self) -> bool {
        matches!(
            self,
            SessionState::Closed | SessionState::Archived | SessionState::Discarded
        )
    }
}

/// User text whose reply has not arrived yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    /// A reply is still outstanding.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Replied(Message),
    Ignored(IgnoreReason),
}

#[derive(Debug)]
pub enum SessionError {
    /// The session could not be opened; nothing was kept. `None` means no
    /// credential was available.
    Open(Option<ProviderError>),
    /// `open` was called on a session that was already used.
    AlreadyOpened,
    NotActive,
    /// `resolve` was called without a submitted turn.
    NothingPending,
    /// The model answered with blank text.
    EmptyReply,
    /// The remote call failed; the user message stays in the transcript.
    SendFailed(ProviderError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Open(None) => write!(f, "Could not start the chat: missing API key"),
            SessionError::Open(Some(err)) => write!(f, "Could not start the chat: {err}"),
            SessionError::AlreadyOpened => write!(f, "This chat has already been started"),
            SessionError::NotActive => write!(f, "The chat is not active"),
            SessionError::NothingPending => write!(f, "No message is waiting for a reply"),
            SessionError::EmptyReply => write!(f, "The chatbot did not give a valid answer"),
            SessionError::SendFailed(err) => write!(f, "Error in the chatbot's reply: {err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Open(Some(err)) | SessionError::SendFailed(err) => Some(err),
            _ => None,
        }
    }
}

pub struct ConversationSession {
    character: CharacterRecord,
    state: SessionState,
    transcript: Vec<Message>,
    dialogue: Option<Box<dyn Dialogue>>,
    in_flight: Option<PendingTurn>,
}

/// Clears the in-flight turn however `resolve` ends, including when its
/// future is dropped.
struct InFlightGuard<'a>(&'a mut Option<PendingTurn>);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.take();
    }
}

impl ConversationSession {
    pub fn new(character: CharacterRecord) -> Self {
        Self {
            character,
            state: SessionState::Closed,
            transcript: Vec::new(),
            dialogue: None,
            in_flight: None,
        }
    }

    /// Create and open a session in one step.
    pub async fn start(
        provider: &dyn ModelProvider,
        character: CharacterRecord,
        credential: Option<&str>,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(character);
        session.open(provider, credential).await?;
        Ok(session)
    }

    /// Open the remote dialogue and seed the transcript with the greeting.
    pub async fn open(
        &mut self,
        provider: &dyn ModelProvider,
        credential: Option<&str>,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Closed {
            return Err(SessionError::AlreadyOpened);
        }
        self.state = SessionState::Opening;

        let Some(credential) = credential.map(str::trim).filter(|c| !c.is_empty()) else {
            self.state = SessionState::Discarded;
            return Err(SessionError::Open(None));
        };

        let system_prompt = self.character.build_system_prompt();
        match provider.open_dialogue(credential, &system_prompt).await {
            Ok(dialogue) => {
                self.dialogue = Some(dialogue);
                self.transcript = vec![Message::assistant(self.character.get_greeting())];
                self.state = SessionState::Active;
                info!(character = %self.character.name, "chat started");
                Ok(())
            }
            Err(err) => {
                warn!(character = %self.character.name, error = %err, "failed to start chat");
                self.transcript.clear();
                self.state = SessionState::Discarded;
                Err(SessionError::Open(Some(err)))
            }
        }
    }

    /// Record a user message and mark its reply as in flight.
    ///
    /// Blank input and input arriving while a reply is outstanding are
    /// ignored without touching the transcript.
    pub fn submit(&mut self, text: &str) -> Result<Submission, SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotActive);
        }
        let text = text.trim();
        if text.is_empty() {
            return Ok(Submission::Ignored(IgnoreReason::EmptyInput));
        }
        if self.in_flight.is_some() {
            debug!("ignoring message while a reply is outstanding");
            return Ok(Submission::Ignored(IgnoreReason::Busy));
        }

        self.transcript.push(Message::user(text));
        self.in_flight = Some(PendingTurn {
            text: text.to_string(),
        });
        Ok(Submission::Accepted)
    }

    /// Wait for the reply to the submitted turn.
    ///
    /// Only the new user text travels; the dialogue remembers earlier turns.
    /// On failure the user message stays and no assistant message is added.
    pub async fn resolve(&mut self) -> Result<Message, SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotActive);
        }
        let Self {
            dialogue,
            transcript,
            in_flight,
            ..
        } = self;
        let text = match in_flight.as_ref() {
            Some(turn) => turn.text.clone(),
            None => return Err(SessionError::NothingPending),
        };
        let dialogue = dialogue.as_mut().ok_or(SessionError::NotActive)?;

        let guard = InFlightGuard(in_flight);
        let result = dialogue.send(&text).await;
        drop(guard);

        match result {
            Ok(reply) if !reply.trim().is_empty() => {
                let message = Message::assistant(reply);
                transcript.push(message.clone());
                Ok(message)
            }
            Ok(_) => {
                warn!("model returned an empty reply");
                Err(SessionError::EmptyReply)
            }
            Err(err) => {
                warn!(error = %err, "message not answered");
                Err(SessionError::SendFailed(err))
            }
        }
    }

    /// `submit` followed by `resolve`.
    pub async fn send(&mut self, text: &str) -> Result<SendOutcome, SessionError> {
        match self.submit(text)? {
            Submission::Ignored(reason) => Ok(SendOutcome::Ignored(reason)),
            Submission::Accepted => self.resolve().await.map(SendOutcome::Replied),
        }
    }

    /// End the session, producing an archive entry when `archive` is set and
    /// there is something to keep. Calling it again does nothing.
    pub fn close(&mut self, archive: bool) -> Option<ArchivedConversation> {
        if self.state.is_closed() {
            return None;
        }

        self.in_flight = None;
        let entry = if archive && !self.transcript.is_empty() {
            self.state = SessionState::Archived;
            let transcript = std::mem::take(&mut self.transcript);
            Some(ArchivedConversation::new(
                self.character.name.clone(),
                transcript,
            ))
        } else {
            self.state = SessionState::Discarded;
            self.transcript.clear();
            None
        };
        self.dialogue = None;

        info!(
            character = %self.character.name,
            archived = entry.is_some(),
            "chat closed"
        );
        entry
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn character(&self) -> &CharacterRecord {
        &self.character
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn pending(&self) -> Option<&PendingTurn> {
        self.in_flight.as_ref()
    }
}
