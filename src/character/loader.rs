use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::character::CharacterRecord;
use crate::core::config::{path_display, Config};

/// Character list compiled into the binary.
pub const BUNDLED_CHARACTERS: &str = include_str!("../../assets/characters.json");

const LIST_FIELD: &str = "transcription";

/// Errors that can occur when loading or selecting characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The character list could not be read, parsed or validated
    Unavailable { origin: String, reason: String },
    /// No character matches the selector
    UnknownCharacter(String),
    /// More than one character carries the requested name
    AmbiguousCharacter { name: String, positions: Vec<usize> },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Unavailable { origin, reason } => {
                write!(f, "Character list unavailable ({origin}): {reason}")
            }
            CatalogError::UnknownCharacter(selector) => {
                write!(f, "Character '{selector}' not found")
            }
            CatalogError::AmbiguousCharacter { name, positions } => {
                let positions = positions
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "Several characters are named '{name}' (positions {positions}); select one by number"
                )
            }
        }
    }
}

impl std::error::Error for CatalogError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CatalogSource {
    Bundled,
    File(PathBuf),
}

/// Read-only access to the character list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterCatalog {
    source: CatalogSource,
}

impl CharacterCatalog {
    pub fn bundled() -> Self {
        Self {
            source: CatalogSource::Bundled,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: CatalogSource::File(path.into()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        match config.characters_path() {
            Some(path) => Self::from_path(path),
            None => Self::bundled(),
        }
    }

    /// Human-readable origin of the list, for messages.
    pub fn origin(&self) -> String {
        match &self.source {
            CatalogSource::Bundled => "bundled".to_string(),
            CatalogSource::File(path) => path_display(path),
        }
    }

    /// Load every character, in document order. Either the whole list loads
    /// or nothing does.
    pub fn load_all(&self) -> Result<Vec<CharacterRecord>, CatalogError> {
        let records = match &self.source {
            CatalogSource::Bundled => parse_catalog(BUNDLED_CHARACTERS, "bundled")?,
            CatalogSource::File(path) => load_catalog_file(path)?,
        };

        for (name, positions) in duplicate_names(&records) {
            warn!(
                name = %name,
                positions = ?positions,
                "character list contains duplicate names"
            );
        }
        debug!(origin = %self.origin(), count = records.len(), "loaded characters");
        Ok(records)
    }
}

fn load_catalog_file(path: &Path) -> Result<Vec<CharacterRecord>, CatalogError> {
    let origin = path_display(path);
    let contents = fs::read_to_string(path).map_err(|e| CatalogError::Unavailable {
        origin: origin.clone(),
        reason: e.to_string(),
    })?;
    parse_catalog(&contents, &origin)
}

/// Parse a `{ "transcription": [...] }` document.
pub fn parse_catalog(contents: &str, origin: &str) -> Result<Vec<CharacterRecord>, CatalogError> {
    let unavailable = |reason: String| CatalogError::Unavailable {
        origin: origin.to_string(),
        reason,
    };

    let document: serde_json::Value = serde_json::from_str(contents)
        .map_err(|e| unavailable(format!("invalid JSON: {e}")))?;
    let list = document
        .get(LIST_FIELD)
        .filter(|value| value.is_array())
        .cloned()
        .ok_or_else(|| unavailable(format!("missing \"{LIST_FIELD}\" array")))?;

    let records: Vec<CharacterRecord> = serde_json::from_value(list)
        .map_err(|e| unavailable(format!("invalid character entry: {e}")))?;

    let errors: Vec<String> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.name.trim().is_empty())
        .map(|(index, _)| format!("entry {} has an empty name", index + 1))
        .collect();
    if !errors.is_empty() {
        return Err(unavailable(errors.join("; ")));
    }

    Ok(records)
}

/// Names that occur more than once (case-insensitive), with their 1-based
/// positions, in order of first appearance.
pub fn duplicate_names(records: &[CharacterRecord]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let key = record.name.trim().to_lowercase();
        match groups.iter_mut().find(|(name, _)| name.to_lowercase() == key) {
            Some((_, positions)) => positions.push(index + 1),
            None => groups.push((record.name.trim().to_string(), vec![index + 1])),
        }
    }
    groups.retain(|(_, positions)| positions.len() > 1);
    groups
}

/// Resolve a selector that is either a 1-based position or a name.
///
/// Names match case-insensitively; a name shared by several characters is
/// rejected so the caller picks one by position.
pub fn select<'a>(
    records: &'a [CharacterRecord],
    selector: &str,
) -> Result<&'a CharacterRecord, CatalogError> {
    let selector = selector.trim();
    if let Ok(position) = selector.parse::<usize>() {
        if let Some(record) = position.checked_sub(1).and_then(|index| records.get(index)) {
            return Ok(record);
        }
    }

    let matches: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.name.trim().eq_ignore_ascii_case(selector))
        .map(|(index, _)| index)
        .collect();

    match matches.as_slice() {
        [] => Err(CatalogError::UnknownCharacter(selector.to_string())),
        [index] => Ok(&records[*index]),
        _ => Err(CatalogError::AmbiguousCharacter {
            name: selector.to_string(),
            positions: matches.iter().map(|index| index + 1).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_records() -> Vec<CharacterRecord> {
        vec![
            CharacterRecord::new("Einstein", "You are Einstein."),
            CharacterRecord::new("Curie", "You are Curie."),
            CharacterRecord::new("einstein", "You are a second Einstein."),
        ]
    }

    #[test]
    fn test_single_entry_document() {
        let records = parse_catalog(
            r#"{"transcription":[{"Personaggio":"Einstein","guida":"You are Einstein."}]}"#,
            "test",
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Einstein");
        assert_eq!(records[0].opening_line, None);
    }

    #[test]
    fn test_document_order_is_preserved() {
        let records = parse_catalog(
            r#"{"transcription":[{"Personaggio":"Zeno","guida":"z"},{"Personaggio":"Archimede","guida":"a"}]}"#,
            "test",
        )
        .unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Zeno", "Archimede"]);
    }

    #[test]
    fn test_invalid_json_is_unavailable() {
        let err = parse_catalog("{not json", "test").unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable { .. }));
    }

    #[test]
    fn test_missing_or_non_array_list_is_unavailable() {
        for doc in [r#"{"characters":[]}"#, r#"{"transcription":{}}"#, "[]"] {
            let err = parse_catalog(doc, "test").unwrap_err();
            assert!(
                err.to_string().contains("missing \"transcription\" array"),
                "unexpected error for {doc}: {err}"
            );
        }
    }

    #[test]
    fn test_one_bad_entry_fails_whole_load() {
        let err = parse_catalog(
            r#"{"transcription":[{"Personaggio":"Einstein","guida":"g"},{"guida":"nameless"}]}"#,
            "test",
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable { .. }));

        let err = parse_catalog(
            r#"{"transcription":[{"Personaggio":"  ","guida":"g"}]}"#,
            "test",
        )
        .unwrap_err();
        assert!(err.to_string().contains("entry 1 has an empty name"));
    }

    #[test]
    fn test_duplicates_are_accepted_and_reported() {
        let records = sample_records();
        assert_eq!(
            duplicate_names(&records),
            vec![("Einstein".to_string(), vec![1, 3])]
        );
    }

    #[test]
    fn test_select_by_position_and_name() {
        let records = sample_records();
        assert_eq!(select(&records, "2").unwrap().name, "Curie");
        assert_eq!(select(&records, " curie ").unwrap().name, "Curie");
        assert_eq!(select(&records, "3").unwrap().name, "einstein");
    }

    #[test]
    fn test_select_rejects_ambiguous_and_unknown_names() {
        let records = sample_records();
        match select(&records, "EINSTEIN") {
            Err(CatalogError::AmbiguousCharacter { positions, .. }) => {
                assert_eq!(positions, vec![1, 3])
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
        assert!(matches!(
            select(&records, "Galileo"),
            Err(CatalogError::UnknownCharacter(_))
        ));
        assert!(matches!(
            select(&records, "0"),
            Err(CatalogError::UnknownCharacter(_))
        ));
    }

    #[test]
    fn test_load_from_file_and_missing_file() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        temp_file
            .write_all(br#"{"transcription":[{"Personaggio":"Ada","guida":"You are Ada."}]}"#)
            .unwrap();
        temp_file.flush().unwrap();

        let records = CharacterCatalog::from_path(temp_file.path()).load_all().unwrap();
        assert_eq!(records[0].name, "Ada");

        let missing = CharacterCatalog::from_path(temp_file.path().with_extension("missing"));
        assert!(matches!(
            missing.load_all(),
            Err(CatalogError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_bundled_list_loads() {
        let records = CharacterCatalog::bundled().load_all().unwrap();
        assert!(!records.is_empty());
        assert!(duplicate_names(&records).is_empty());
    }

    #[test]
    fn test_from_config_uses_override_path() {
        let config = Config {
            characters_path: Some(PathBuf::from("/srv/list.json")),
            ..Default::default()
        };
        assert_eq!(
            CharacterCatalog::from_config(&config),
            CharacterCatalog::from_path("/srv/list.json")
        );
        assert_eq!(
            CharacterCatalog::from_config(&Config::default()),
            CharacterCatalog::bundled()
        );
    }
}
