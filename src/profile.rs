//! Operator profile persisted as a flat JSON record.

use crate::error::{Error, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct UserProfile {
    pub name: String,
    pub role: String,
    pub email: String,
    pub department: String,
    pub unique_id: String,
    /// SHA-256 of the password, hex encoded. The password itself is never stored.
    pub password_hash: Option<String>,
    pub security_key: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "Admin User".to_string(),
            role: "System Administrator".to_string(),
            email: "admin@company.com".to_string(),
            department: "IT Operations".to_string(),
            unique_id: String::new(),
            password_hash: None,
            security_key: String::new(),
        }
    }
}

fn random_hex(len: usize) -> String {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode_upper(buf)
}

/// Four dash-separated groups, e.g. `9F2C-01AB-77E0-C4D1`.
fn security_key() -> String {
    let raw = random_hex(8);
    raw.as_bytes()
        .chunks(4)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

impl UserProfile {
    /// Reads the profile at `path`. Missing fields take their defaults; a
    /// missing or corrupt file yields the default profile. When the file is
    /// missing or lacks its ids, fresh ones are generated and written back
    /// so they stay the same from then on. A corrupt file is left alone.
    pub fn load(path: &Path) -> Self {
        let (mut profile, persist) = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Self>(&content) {
                Ok(p) => {
                    tracing::info!("profile loaded");
                    (p, true)
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "invalid JSON in profile");
                    (Self::default(), false)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("profile file not found, using defaults");
                (Self::default(), true)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to read profile");
                (Self::default(), false)
            }
        };

        if profile.ensure_ids() && persist {
            if let Err(e) = profile.save(path) {
                tracing::warn!(error = %e, "could not persist generated profile ids");
            }
        }
        profile
    }

    /// Fills in a blank `unique_id` or `security_key`. Returns whether
    /// anything was generated.
    pub fn ensure_ids(&mut self) -> bool {
        let mut generated = false;
        if self.unique_id.trim().is_empty() {
            self.unique_id = random_hex(8);
            generated = true;
        }
        if self.security_key.trim().is_empty() {
            self.security_key = security_key();
            generated = true;
        }
        generated
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let json = serde_json::to_string_pretty(self)?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        std::fs::write(path, json).map_err(|e| Error::io(path, e))?;
        tracing::info!("profile saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("Name cannot be empty".into()));
        }
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(Error::Validation("Invalid email format".into()));
        }
        Ok(())
    }

    pub fn set_password(&mut self, password: &str) {
        self.password_hash = Some(hash_password(password));
    }

    pub fn verify_password(&self, password: &str) -> bool {
        self.password_hash
            .as_deref()
            .is_some_and(|h| h == hash_password(password))
    }
}
