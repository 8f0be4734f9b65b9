//! Key=value flat-file record store.
//!
//! The server and the bot tester only ever touch the abstract get/set/add/
//! sync/remove operations below; `FileSysDatabase` is this crate's one
//! reference backend, storing each record as `<id>.ini` under a home
//! directory. Nothing elsewhere in the crate assumes a file-backed store, so
//! a different `Database` impl can replace this one without touching
//! callers.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::GameError;

/// An ordered multi-map: a key may accumulate more than one value, in the
/// order they were added (matching repeated `key=value` lines on disk).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DBRecord {
    id: String,
    values: BTreeMap<String, Vec<String>>,
}

impl DBRecord {
    pub fn new(id: impl Into<String>) -> DBRecord {
        DBRecord {
            id: id.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The first value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// All values for `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace every value for `key` with a single `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), GameError> {
        let value = value.into();
        validate_value(&value)?;
        self.values.insert(key.into(), vec![value]);
        Ok(())
    }

    /// Append `value` to `key`'s list without disturbing existing values.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), GameError> {
        let value = value.into();
        validate_value(&value)?;
        self.values.entry(key.into()).or_default().push(value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        for (key, values) in &self.values {
            for value in values {
                out.push_str(key);
                out.push('=');
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }

    fn from_text(id: &str, text: &str) -> DBRecord {
        let mut record = DBRecord::new(id);
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                record
                    .values
                    .entry(key.trim().to_string())
                    .or_default()
                    .push(value.trim().to_string());
            }
        }
        record
    }
}

fn validate_value(value: &str) -> Result<(), GameError> {
    if value.contains('\n') {
        Err(GameError::Validation(
            "database values may not contain a newline".to_string(),
        ))
    } else {
        Ok(())
    }
}

fn validate_id(id: &str) -> Result<(), GameError> {
    match id.chars().next() {
        Some(c) if c.is_ascii_alphanumeric() => Ok(()),
        _ => Err(GameError::Validation(format!(
            "record id must start with an alphanumeric character: {id:?}"
        ))),
    }
}

/// A path-addressed store: one `<id>.ini` file per record under `home`.
pub struct FileSysDatabase {
    home: PathBuf,
}

impl FileSysDatabase {
    pub fn new(home: impl Into<PathBuf>) -> Result<FileSysDatabase, GameError> {
        let home = home.into();
        fs::create_dir_all(&home)?;
        Ok(FileSysDatabase { home })
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, GameError> {
        validate_id(id)?;
        Ok(self.home.join(format!("{id}.ini")))
    }

    /// Read a record from disk, or an empty record if it does not yet exist.
    pub fn get(&self, id: &str) -> Result<DBRecord, GameError> {
        let path = self.path_for(id)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(DBRecord::from_text(id, &text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DBRecord::new(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `record` to disk, replacing any prior contents.
    pub fn sync(&self, record: &DBRecord) -> Result<(), GameError> {
        let path = self.path_for(record.id())?;
        fs::write(&path, record.to_text())?;
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<(), GameError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }
}

/// The record ID a finished game's results are saved under.
pub fn game_record_id(title: &str) -> String {
    format!("game.{title}")
}

/// The record ID a player's cumulative stats are saved under.
pub fn player_record_id(name: &str) -> String {
    format!("player.{name}")
}

/// The record ID the bot tester accumulates per-board-size, per-bot stats
/// under, e.g. `test.10x10.heuristic-1`.
pub fn test_record_id(width: u32, height: u32, bot: &str, version: &str) -> String {
    format!("test.{width}x{height}.{bot}-{version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_home(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("boat-sinker-db-test-{name}-{}", std::process::id()))
    }

    #[test]
    fn set_and_get_round_trip_through_disk() {
        let home = temp_home("set-get");
        let db = FileSysDatabase::new(&home).unwrap();
        let mut record = DBRecord::new("player.alice");
        record.set("wins", "3").unwrap();
        db.sync(&record).unwrap();

        let loaded = db.get("player.alice").unwrap();
        assert_eq!(loaded.get("wins"), Some("3"));
        fs::remove_dir_all(&home).ok();
    }

    #[test]
    fn add_accumulates_an_ordered_list() {
        let mut record = DBRecord::new("game.friendly");
        record.add("player", "alice").unwrap();
        record.add("player", "bob").unwrap();
        assert_eq!(record.get_all("player"), &["alice", "bob"]);
    }

    #[test]
    fn set_replaces_prior_values_for_the_key() {
        let mut record = DBRecord::new("player.alice");
        record.add("score", "1").unwrap();
        record.add("score", "2").unwrap();
        record.set("score", "9").unwrap();
        assert_eq!(record.get_all("score"), &["9"]);
    }

    #[test]
    fn from_text_skips_comments_and_blank_lines() {
        let text = "# a comment\n\nwins=3\nlosses=1\n";
        let record = DBRecord::from_text("player.alice", text);
        assert_eq!(record.get("wins"), Some("3"));
        assert_eq!(record.get("losses"), Some("1"));
    }

    #[test]
    fn get_missing_record_returns_empty_record() {
        let home = temp_home("missing");
        let db = FileSysDatabase::new(&home).unwrap();
        let record = db.get("player.nobody").unwrap();
        assert!(record.get("wins").is_none());
        fs::remove_dir_all(&home).ok();
    }

    #[test]
    fn rejects_newline_in_value() {
        let mut record = DBRecord::new("x");
        assert!(record.set("k", "a\nb").is_err());
    }

    #[test]
    fn rejects_id_not_starting_alphanumeric() {
        let home = temp_home("bad-id");
        let db = FileSysDatabase::new(&home).unwrap();
        assert!(db.get(".hidden").is_err());
        fs::remove_dir_all(&home).ok();
    }

    #[test]
    fn well_known_record_ids_match_documented_shape() {
        assert_eq!(game_record_id("friendly"), "game.friendly");
        assert_eq!(player_record_id("alice"), "player.alice");
        assert_eq!(test_record_id(10, 10, "heuristic", "1"), "test.10x10.heuristic-1");
    }
}
