// Per-day self-evaluation notes, persisted as a JSON object keyed by date
use chrono::NaiveDate;
use dirs_next as dirs;
use std::collections::BTreeMap;
use std::path::PathBuf;

const FILE: &str = "running_calendar_evaluations.json";

/// Free-text notes keyed by `YYYY-MM-DD` date strings.
///
/// Loaded once at startup; every save rewrites the whole file, pretty
/// printed, so the on-disk state always matches memory.
#[derive(Debug, Default)]
pub struct Evaluations {
    notes: BTreeMap<String, String>,
}

impl Evaluations {
    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(FILE))
    }

    fn key(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Load the notes file; a missing or malformed file yields an empty store.
    pub fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                if let Ok(notes) = serde_json::from_str(&data) {
                    return Self { notes };
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no config directory",
            ));
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&self.notes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, data)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&str> {
        self.notes.get(&Self::key(date)).map(String::as_str)
    }

    /// Store the note for a date, overwriting any previous text. An empty
    /// note removes the entry.
    pub fn set(&mut self, date: NaiveDate, note: &str) {
        if note.trim().is_empty() {
            self.notes.remove(&Self::key(date));
        } else {
            self.notes.insert(Self::key(date), note.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
