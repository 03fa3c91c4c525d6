use std::error::Error;

use unicode_width::UnicodeWidthStr;

use crate::cli::HistoryCommands;
use crate::core::app::AppContext;
use crate::core::config::Config;
use crate::core::history::ArchivedConversation;

pub fn run_history(command: HistoryCommands) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let context = AppContext::from_config(config)?;
    let history = context.history();

    match command {
        HistoryCommands::List => {
            let entries = history.list()?;
            if entries.is_empty() {
                println!("No saved interviews yet.");
                return Ok(());
            }
            println!("Saved interviews (most recent first):\n");
            for line in history_lines(&entries) {
                println!("{line}");
            }
            println!("\n💡 Read one with:");
            println!("   intervistai history show <id>");
        }
        HistoryCommands::Show { id } => match history.get(&id)? {
            Some(entry) => {
                println!("Interview with {} ({})\n", entry.character_name, entry.closed_at);
                for message in &entry.transcript {
                    let speaker = if message.is_user() {
                        "You"
                    } else {
                        entry.character_name.as_str()
                    };
                    println!("{speaker}: {}\n", message.text);
                }
            }
            None => {
                eprintln!("❌ No saved interview with id {id}");
                std::process::exit(1);
            }
        },
        HistoryCommands::Delete { id } => {
            if history.delete(&id)? {
                println!("✅ Deleted interview {id}");
            } else {
                println!("No saved interview with id {id}");
            }
        }
    }

    Ok(())
}

/// One aligned line per entry: id, date, character and preview.
pub fn history_lines(entries: &[ArchivedConversation]) -> Vec<String> {
    let id_width = entries.iter().map(|e| e.id.width()).max().unwrap_or(0);
    let date_width = entries.iter().map(|e| e.closed_at.width()).max().unwrap_or(0);
    let name_width = entries
        .iter()
        .map(|e| e.character_name.width())
        .max()
        .unwrap_or(0);

    entries
        .iter()
        .map(|entry| {
            format!(
                "  {}  {}  {}  {}",
                pad(&entry.id, id_width),
                pad(&entry.closed_at, date_width),
                pad(&entry.character_name, name_width),
                entry.preview
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}
