use std::path::PathBuf;

use anyhow::{Result, bail};

/// Placeholder passwords that MUST NOT be used for the bootstrap account.
const PLACEHOLDER_PASSWORDS: &[&str] = &["change-me", "password", "admin"];

/// Process settings read from the environment (after `.env`).
#[derive(Debug)]
pub struct Settings {
    pub db_path: PathBuf,
    pub superuser: Option<SuperUser>,
}

#[derive(Debug)]
pub struct SuperUser {
    pub username: String,
    pub password: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path: PathBuf = lookup("AGORA_DB_PATH")
            .unwrap_or_else(|| "agora.db".into())
            .into();

        let username = lookup("AGORA_SUPERUSER").filter(|v| !v.is_empty());
        let password = lookup("AGORA_SUPERUSER_PASSWORD").filter(|v| !v.is_empty());
        let superuser = match (username, password) {
            (None, None) => None,
            (Some(username), Some(password)) => {
                if PLACEHOLDER_PASSWORDS.contains(&password.as_str()) {
                    bail!("AGORA_SUPERUSER_PASSWORD is still a placeholder");
                }
                Some(SuperUser { username, password })
            }
            _ => bail!("AGORA_SUPERUSER and AGORA_SUPERUSER_PASSWORD must be set together"),
        };

        Ok(Self { db_path, superuser })
    }
}
