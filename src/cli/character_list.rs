use std::error::Error;

use unicode_width::UnicodeWidthStr;

use crate::character::loader::duplicate_names;
use crate::character::{CharacterCatalog, CharacterRecord};
use crate::core::config::Config;

pub fn list_characters() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let catalog = CharacterCatalog::from_config(&config);

    match catalog.load_all() {
        Ok(records) => {
            println!("Available characters ({}):\n", catalog.origin());
            if records.is_empty() {
                println!("  No characters found.");
                return Ok(());
            }
            for line in character_lines(&records) {
                println!("{line}");
            }
            let duplicates = duplicate_names(&records);
            if !duplicates.is_empty() {
                println!();
                for (name, positions) in duplicates {
                    let positions: Vec<String> = positions.iter().map(|p| p.to_string()).collect();
                    println!(
                        "⚠️  '{name}' appears more than once (numbers {}); pick it by number",
                        positions.join(", ")
                    );
                }
            }
            println!("\n💡 Start an interview with:");
            println!("   intervistai chat -c <number|name>");
        }
        Err(e) => {
            eprintln!("❌ Error loading characters: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Numbered, aligned listing: `  1. Name    opening line`.
pub fn character_lines(records: &[CharacterRecord]) -> Vec<String> {
    let number_width = records.len().to_string().len();
    let name_width = records
        .iter()
        .map(|record| record.name.width())
        .max()
        .unwrap_or(0);

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let number = format!("{:>number_width$}", index + 1);
            match &record.opening_line {
                Some(line) => {
                    let padding = " ".repeat(name_width - record.name.width());
                    format!("  {number}. {}{padding}  “{line}”", record.name)
                }
                None => format!("  {number}. {}", record.name),
            }
        })
        .collect()
}
