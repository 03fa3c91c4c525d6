use crate::core::message::Message;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Plain-text copy of a conversation, appended as it happens (`chat --log`).
pub struct TranscriptLog {
    file_path: Option<PathBuf>,
}

impl TranscriptLog {
    /// Open a log; `None` disables logging. Fails early when the file cannot
    /// be created or appended to.
    pub fn new(log_file: Option<PathBuf>) -> std::io::Result<Self> {
        if let Some(path) = &log_file {
            Self::test_file_access(path)?;
        }
        Ok(Self {
            file_path: log_file,
        })
    }

    pub fn is_active(&self) -> bool {
        self.file_path.is_some()
    }

    pub fn log_heading(&self, heading: &str) -> std::io::Result<()> {
        self.write_to_log(&format!("## {heading}"))
    }

    pub fn log_message(&self, message: &Message, character_name: &str) -> std::io::Result<()> {
        let speaker = if message.is_user() {
            "You"
        } else {
            character_name
        };
        self.write_to_log(&format!("{speaker}: {}", message.text))
    }

    fn write_to_log(&self, content: &str) -> std::io::Result<()> {
        let Some(file_path) = &self.file_path else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        // Blank line between entries, matching the screen.
        writeln!(writer)?;

        writer.flush()
    }

    fn test_file_access(path: &Path) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()
    }
}
