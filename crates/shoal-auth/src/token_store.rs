//! Access-token persistence under the config root.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::oauth::linkedin::TokenResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub obtained_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl StoredToken {
    pub fn from_response(resp: &TokenResponse) -> Self {
        Self {
            access_token: resp.access_token.clone(),
            obtained_at: Utc::now(),
            expires_in: resp.expires_in,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .map(|secs| self.obtained_at + Duration::seconds(secs as i64))
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at().is_some_and(|at| at <= Utc::now())
    }
}

/// Reads and writes `linkedin_token.json` in the config root.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(config_root: &Path) -> Self {
        Self {
            path: config_root.join("linkedin_token.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let token = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(token))
    }

    pub fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        let token = StoredToken {
            access_token: "tok-1".into(),
            obtained_at: Utc::now(),
            expires_in: Some(3600),
        };
        store.save(&token).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "tok-1");
        assert!(!loaded.is_expired());
    }

    #[test]
    fn expiry_from_obtained_at() {
        let token = StoredToken {
            access_token: "tok-2".into(),
            obtained_at: Utc::now() - Duration::hours(2),
            expires_in: Some(3600),
        };
        assert!(token.is_expired());

        let token = StoredToken {
            access_token: "tok-3".into(),
            obtained_at: Utc::now(),
            expires_in: None,
        };
        assert!(!token.is_expired());
    }
}
