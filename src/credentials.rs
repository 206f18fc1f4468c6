// Credential file handling: athlete identifier plus API key
use dirs_next as dirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stored login for the fitness API.
///
/// Persisted as a small JSON object in the platform config directory. An
/// absent or unreadable file simply means no credentials; the UI opens the
/// credentials window and a later save overwrites whatever was there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub athlete_id: String,
    pub api_key: String,
}

impl Credentials {
    const FILE: &'static str = "running_calendar_credentials.json";

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    /// Load credentials from disk.
    ///
    /// Returns `None` when the file is missing, malformed, or either field is
    /// empty, so callers treat all three cases the same way.
    pub fn load() -> Option<Self> {
        let path = Self::path()?;
        let data = std::fs::read_to_string(path).ok()?;
        let creds: Credentials = serde_json::from_str(&data).ok()?;
        if creds.athlete_id.is_empty() || creds.api_key.is_empty() {
            return None;
        }
        Some(creds)
    }

    /// Write the credentials file, creating the config directory if needed.
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
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn with_temp_config<F: FnOnce()>(f: F) {
        let _guard = crate::test_support::ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let prev = env::var_os("XDG_CONFIG_HOME");
        unsafe {
            env::set_var("XDG_CONFIG_HOME", dir.path());
        }

        f();

        if let Some(val) = prev {
            unsafe {
                env::set_var("XDG_CONFIG_HOME", val);
            }
        } else {
            unsafe {
                env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }

    #[test]
    fn roundtrip() {
        with_temp_config(|| {
            assert!(Credentials::load().is_none());

            let creds = Credentials {
                athlete_id: "12345".into(),
                api_key: "token".into(),
            };
            creds.save().unwrap();
            assert_eq!(Credentials::load(), Some(creds));
        });
    }

    #[test]
    fn malformed_file_reads_as_missing() {
        with_temp_config(|| {
            let path = Credentials::path().unwrap();
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "not json").unwrap();
            assert!(Credentials::load().is_none());
        });
    }

    #[test]
    fn empty_fields_read_as_missing() {
        with_temp_config(|| {
            let creds = Credentials {
                athlete_id: "12345".into(),
                api_key: String::new(),
            };
            creds.save().unwrap();
            assert!(Credentials::load().is_none());
        });
    }
}
