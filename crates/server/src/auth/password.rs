use std::collections::HashMap;
use std::path::Path;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordVerifier};

use crate::error::ServerError;

/// Verify a candidate password against an argon2 hash string.
///
/// Returns `true` if the password matches.
pub fn verify_password(hash: &str, candidate: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}

/// Users loaded from a password file.
///
/// One `username:hash` entry per line, the hash in argon2 PHC form. Blank
/// lines and lines starting with `#` are skipped.
#[derive(Debug, Default)]
pub struct PasswordFile {
    users: HashMap<String, String>,
}

impl PasswordFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let file = Self::parse(&contents)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), users = file.len(), "loaded password file");
        Ok(file)
    }

    pub fn parse(contents: &str) -> Result<Self, String> {
        let mut users = HashMap::new();
        for (n, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((user, hash)) = line.split_once(':') else {
                return Err(format!("line {}: expected `username:hash`", n + 1));
            };
            if user.is_empty() {
                return Err(format!("line {}: empty username", n + 1));
            }
            if PasswordHash::new(hash).is_err() {
                return Err(format!("line {}: invalid password hash for {user}", n + 1));
            }
            users.insert(user.to_owned(), hash.to_owned());
        }
        Ok(Self { users })
    }

    /// Returns `true` if `username` exists and `password` matches its hash.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|hash| verify_password(hash, password))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
