use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const TOKEN_KEY: &str = "token";
const USERNAME_KEY: &str = "username";

/// Persisted login state.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Session {
    values: BTreeMap<String, String>,
}

impl Session {
    pub fn new(token: &str, username: Option<&str>) -> Self {
        let mut session = Self::default();
        session.set(TOKEN_KEY, token);
        if let Some(username) = username {
            session.set(USERNAME_KEY, username);
        }
        session
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Blank values remove the key.
    pub fn set(&mut self, key: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.values.remove(key);
        } else {
            self.values.insert(key.to_string(), value.to_string());
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.get(TOKEN_KEY)
    }

    pub fn username(&self) -> Option<&str> {
        self.get(USERNAME_KEY)
    }
}

#[derive(Debug, Error)]
pub enum LoadSessionError {
    #[error("failed to read session: {0}")]
    Read(#[from] io::Error),

    #[error("failed to parse session: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SaveSessionError {
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write session: {0}")]
    Write(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ClearSessionError {
    #[error("failed to remove session: {0}")]
    Remove(#[from] io::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    values: BTreeMap<String, String>,
}

fn session_path(state_dir: &Path) -> PathBuf {
    state_dir.join("session.json")
}

pub fn load_session(state_dir: &Path) -> Result<Session, LoadSessionError> {
    let path = session_path(state_dir);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Ok(Session::default());
        }
        Err(error) => return Err(error.into()),
    };

    let file: SessionFile = serde_json::from_str(&raw)?;
    Ok(Session {
        values: file.values,
    })
}

pub fn save_session(state_dir: &Path, session: &Session) -> Result<(), SaveSessionError> {
    fs::create_dir_all(state_dir)?;

    let path = session_path(state_dir);
    let tmp = path.with_extension("json.tmp");
    let file = SessionFile {
        version: 1,
        values: session.values.clone(),
    };
    let text = serde_json::to_string_pretty(&file)?;
    fs::write(&tmp, text)?;
    fs::rename(tmp, path)?;
    Ok(())
}

pub fn clear_session(state_dir: &Path) -> Result<(), ClearSessionError> {
    match fs::remove_file(session_path(state_dir)) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty_session() {
        let dir = tempdir().expect("tempdir");
        let session = load_session(dir.path()).expect("load");
        assert_eq!(session, Session::default());
        assert_eq!(session.token(), None);
    }

    #[test]
    fn saves_and_loads_token_and_username() {
        let dir = tempdir().expect("tempdir");
        let state = dir.path().join("nested");
        save_session(&state, &Session::new("abc", Some("budi"))).expect("save");

        let raw = fs::read_to_string(state.join("session.json")).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(
            value,
            json!({"version": 1, "values": {"token": "abc", "username": "budi"}})
        );
        assert!(!state.join("session.json.tmp").exists());

        let loaded = load_session(&state).expect("load");
        assert_eq!(loaded.token(), Some("abc"));
        assert_eq!(loaded.username(), Some("budi"));
    }

    #[test]
    fn clear_removes_file_and_tolerates_absence() {
        let dir = tempdir().expect("tempdir");
        save_session(dir.path(), &Session::new("abc", None)).expect("save");
        clear_session(dir.path()).expect("clear");
        clear_session(dir.path()).expect("clear twice");
        assert_eq!(load_session(dir.path()).expect("load").token(), None);
    }

    #[test]
    fn blank_values_are_not_stored() {
        let mut session = Session::new("abc", Some("  "));
        assert_eq!(session.username(), None);
        session.set(TOKEN_KEY, "");
        assert_eq!(session.token(), None);
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("session.json"), "{").expect("write");
        assert!(matches!(
            load_session(dir.path()),
            Err(LoadSessionError::Parse(_))
        ));
    }
}
