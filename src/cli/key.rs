use std::error::Error;
use std::io::{self, Write};

use crate::auth::{mask, CredentialError};
use crate::cli::KeyCommands;
use crate::core::app::AppContext;
use crate::core::config::Config;

pub async fn run_key(command: KeyCommands) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let mut context = AppContext::from_config(config)?;

    match command {
        KeyCommands::Set { value, skip_verify } => {
            let value = match value {
                Some(value) => value,
                None => read_key_from_stdin()?,
            };
            match context.set_credential(&value) {
                Ok(()) => println!("✅ API key saved ({})", mask(value.trim())),
                Err(CredentialError::Empty) => {
                    eprintln!("❌ The API key cannot be empty");
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
            if !skip_verify {
                report_verification(context.verify_credential(None).await);
            }
        }
        KeyCommands::Show => match context.credential() {
            Some(value) => println!("API key: {}", mask(value)),
            None => println!("No API key stored. Save one with: intervistai key set"),
        },
        KeyCommands::Test => {
            if !context.has_credential() {
                eprintln!("❌ No API key stored. Save one with: intervistai key set");
                std::process::exit(1);
            }
            println!("Checking the API key...");
            if !report_verification(context.verify_credential(None).await) {
                std::process::exit(1);
            }
        }
        KeyCommands::Clear => {
            if context.has_credential() {
                context.clear_credential()?;
                println!("✅ API key removed");
            } else {
                println!("No API key stored.");
            }
        }
    }

    Ok(())
}

fn read_key_from_stdin() -> Result<String, Box<dyn Error>> {
    print!("Enter your Gemini API key (from Google AI Studio): ");
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value)
}

fn report_verification(result: Result<(), CredentialError>) -> bool {
    match result {
        Ok(()) => {
            println!("✅ API key verified");
            true
        }
        Err(e @ CredentialError::Invalid(_)) => {
            eprintln!("❌ {e}");
            false
        }
        Err(e) => {
            eprintln!("⚠️  {e}");
            false
        }
    }
}
