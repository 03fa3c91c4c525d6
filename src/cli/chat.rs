//! Line-based interview loop.

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::warn;

use crate::character::CharacterRecord;
use crate::cli::character_list::character_lines;
use crate::core::app::{AppContext, CloseOutcome};
use crate::core::config::Config;
use crate::core::message::Message;
use crate::core::session::{ConversationSession, IgnoreReason, SessionError, Submission};
use crate::utils::logging::TranscriptLog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Save,
    Discard,
    Quit,
    Help,
    Unknown(String),
}

/// Recognize a `/command`; anything else is a message for the character.
pub fn parse_chat_command(line: &str) -> Option<ChatCommand> {
    let trimmed = line.trim();
    let name = trimmed.strip_prefix('/')?;
    let name = name.split_whitespace().next().unwrap_or_default();
    Some(match name.to_lowercase().as_str() {
        "save" => ChatCommand::Save,
        "discard" => ChatCommand::Discard,
        "quit" | "exit" => ChatCommand::Quit,
        "help" => ChatCommand::Help,
        _ => ChatCommand::Unknown(trimmed.to_string()),
    })
}

/// Answer to "save this interview?"; anything but an explicit no saves.
pub fn wants_to_save(answer: &str) -> bool {
    !matches!(answer.trim().to_lowercase().as_str(), "n" | "no")
}

fn print_help() {
    println!("Commands:");
    println!("  /save      End the interview and keep it in the history");
    println!("  /discard   End the interview without saving");
    println!("  /quit      End the interview, asking whether to save");
    println!("  /help      Show this help");
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

fn print_message(message: &Message, character_name: &str) {
    if message.is_user() {
        println!("You: {}", message.text);
    } else {
        println!("{character_name}: {}", message.text);
    }
    println!();
}

pub async fn run_chat(selector: Option<String>, log: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let context = AppContext::from_config(config)?;

    if !context.has_credential() {
        eprintln!("❌ No API key stored. Get one from Google AI Studio and save it with:");
        eprintln!("   intervistai key set");
        std::process::exit(1);
    }
    if let Err(e) = context.characters() {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let character = match selector {
        Some(selector) => context.select_character(&selector)?,
        None => match choose_character(&context, &mut lines).await? {
            Some(character) => character,
            None => return Ok(()),
        },
    };

    let transcript_log = TranscriptLog::new(log)?;
    println!("Starting the interview with {}...\n", character.name);
    let mut session = context.start_session(character).await?;
    if let Err(e) = transcript_log.log_heading(&format!("Interview with {}", session.character().name)) {
        warn!(error = %e, "transcript log unavailable");
    }
    println!("Type /help for commands.\n");

    let outcome = run_interview(&context, &mut session, &mut lines, &transcript_log).await?;
    report_close(&outcome);
    Ok(())
}

/// Ask for a character until one resolves. `None` when input ends.
async fn choose_character<R>(
    context: &AppContext,
    lines: &mut Lines<R>,
) -> Result<Option<CharacterRecord>, Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
{
    let records = context.characters().map_err(Clone::clone)?;
    println!("Who would you like to interview?\n");
    for line in character_lines(records) {
        println!("{line}");
    }
    println!();

    loop {
        prompt("Character (number or name): ");
        let Some(answer) = lines.next_line().await? else {
            return Ok(None);
        };
        if answer.trim().is_empty() {
            continue;
        }
        match context.select_character(&answer) {
            Ok(character) => return Ok(Some(character)),
            Err(e) => eprintln!("❌ {e}"),
        }
    }
}

/// Drive an open session from `lines` until the user ends it or input runs
/// out, then close it through `context`.
pub async fn run_interview<R>(
    context: &AppContext,
    session: &mut ConversationSession,
    lines: &mut Lines<R>,
    transcript_log: &TranscriptLog,
) -> Result<CloseOutcome, Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
{
    let name = session.character().name.clone();
    for message in session.transcript() {
        print_message(message, &name);
        log_message(transcript_log, message, &name);
    }

    let archive = loop {
        prompt("You: ");
        let Some(line) = lines.next_line().await? else {
            println!();
            break true;
        };

        match parse_chat_command(&line) {
            Some(ChatCommand::Save) => break true,
            Some(ChatCommand::Discard) => break false,
            Some(ChatCommand::Quit) => {
                prompt("Save this interview to the history? [Y/n] ");
                let answer = lines.next_line().await?.unwrap_or_default();
                break wants_to_save(&answer);
            }
            Some(ChatCommand::Help) => {
                print_help();
                continue;
            }
            Some(ChatCommand::Unknown(command)) => {
                println!("Unknown command: {command} (try /help)");
                continue;
            }
            None => {}
        }

        match session.submit(&line)? {
            Submission::Accepted => {}
            Submission::Ignored(IgnoreReason::EmptyInput) => continue,
            Submission::Ignored(IgnoreReason::Busy) => {
                println!("⏳ {name} is still answering.");
                continue;
            }
        }
        if let Some(message) = session.transcript().last() {
            log_message(transcript_log, message, &name);
        }

        println!("{name} is writing...");
        let (result, input_closed) = wait_for_reply(session, lines, &name).await;
        match result {
            Ok(reply) => {
                println!();
                print_message(&reply, &name);
                log_message(transcript_log, &reply, &name);
            }
            Err(err @ SessionError::NotActive) => return Err(err.into()),
            Err(err) => eprintln!("❌ {err}\n"),
        }
        if input_closed {
            break true;
        }
    };

    Ok(context.close_session(session, archive))
}

/// Await the reply while still reading input, so lines typed in the
/// meantime are refused rather than queued. Reports whether input ended.
async fn wait_for_reply<R>(
    session: &mut ConversationSession,
    lines: &mut Lines<R>,
    name: &str,
) -> (Result<Message, SessionError>, bool)
where
    R: AsyncBufRead + Unpin,
{
    let reply = session.resolve();
    tokio::pin!(reply);
    let mut input_closed = false;

    loop {
        tokio::select! {
            biased;
            result = &mut reply => return (result, input_closed),
            line = lines.next_line(), if !input_closed => match line {
                Ok(Some(_)) => println!("⏳ {name} is still answering; that message was not sent."),
                Ok(None) | Err(_) => input_closed = true,
            },
        }
    }
}

fn log_message(transcript_log: &TranscriptLog, message: &Message, name: &str) {
    if let Err(e) = transcript_log.log_message(message, name) {
        warn!(error = %e, "failed to write transcript log");
    }
}

fn report_close(outcome: &CloseOutcome) {
    match outcome {
        CloseOutcome::Archived(_) => println!("✅ Interview saved to the history."),
        CloseOutcome::Discarded | CloseOutcome::AlreadyClosed => {
            println!("Interview ended without saving.")
        }
        CloseOutcome::ArchiveFailed { error, .. } => {
            eprintln!("⚠️  Interview ended, but it could not be saved: {error}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::core::session::SessionState;
    use crate::utils::test_utils::{FakeProvider, Outcome};
    use std::sync::Arc;

    fn context(replies: Vec<Outcome>) -> AppContext {
        let mut context = AppContext::load(
            Config::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(FakeProvider::with_replies(replies)),
        );
        context.set_credential("AIza-test").unwrap();
        context
    }

    async fn interview(context: &AppContext, input: &'static str) -> (CloseOutcome, ConversationSession) {
        let character = context.select_character("1").unwrap();
        let mut session = context.start_session(character).await.unwrap();
        let mut lines = BufReader::new(input.as_bytes()).lines();
        let log = TranscriptLog::new(None).unwrap();
        let outcome = run_interview(context, &mut session, &mut lines, &log)
            .await
            .unwrap();
        (outcome, session)
    }

    #[test]
    fn commands_are_recognized_case_insensitively() {
        assert_eq!(parse_chat_command("/save"), Some(ChatCommand::Save));
        assert_eq!(parse_chat_command("  /QUIT "), Some(ChatCommand::Quit));
        assert_eq!(parse_chat_command("/discard now"), Some(ChatCommand::Discard));
        assert_eq!(
            parse_chat_command("/dance"),
            Some(ChatCommand::Unknown("/dance".to_string()))
        );
        assert_eq!(parse_chat_command("What is 1/2?"), None);
    }

    #[test]
    fn save_prompt_defaults_to_yes() {
        assert!(wants_to_save(""));
        assert!(wants_to_save("y"));
        assert!(!wants_to_save(" No "));
        assert!(!wants_to_save("n"));
    }

    #[tokio::test]
    async fn save_command_archives_the_interview() {
        let context = context(vec![Outcome::Reply("Time is relative.".to_string())]);
        let (outcome, session) = interview(&context, "What is time?\n/save\n").await;

        let CloseOutcome::Archived(entry) = outcome else {
            panic!("interview should be archived");
        };
        assert_eq!(entry.transcript.len(), 3);
        assert_eq!(entry.transcript[1], Message::user("What is time?"));
        assert_eq!(session.state(), SessionState::Archived);
        assert_eq!(context.history().list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn discard_and_declined_quit_keep_nothing() {
        for input in ["Hello\n/discard\n", "Hello\n/quit\nn\n"] {
            let context = context(vec![Outcome::Reply("Hi.".to_string())]);
            let (outcome, _) = interview(&context, input).await;
            assert!(matches!(outcome, CloseOutcome::Discarded));
            assert!(context.history().list().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn end_of_input_archives() {
        let context = context(vec![]);
        let (outcome, _) = interview(&context, "").await;
        assert!(matches!(outcome, CloseOutcome::Archived(_)));
    }

    #[tokio::test]
    async fn failed_reply_keeps_the_interview_going() {
        let context = context(vec![
            Outcome::NetworkFailure,
            Outcome::Reply("I am here.".to_string()),
        ]);
        let (outcome, _) = interview(&context, "Hello\n\n/help\nAre you there?\n/save\n").await;

        let CloseOutcome::Archived(entry) = outcome else {
            panic!("interview should be archived");
        };
        let texts: Vec<&str> = entry.transcript[1..]
            .iter()
            .map(|message| message.text.as_str())
            .collect();
        assert_eq!(texts, vec!["Hello", "Are you there?", "I am here."]);
    }
}
