pub mod bearer;
pub mod middleware;
pub mod password;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use fragments_core::{OwnerId, hash_owner};

use self::bearer::BearerVerifier;
use self::password::PasswordFile;
use crate::config::{AuthConfig, AuthStrategy};
use crate::error::ServerError;

/// The authenticated caller, inserted into request extensions by
/// [`middleware::AuthMiddleware`]. Carries only the hashed identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub OwnerId);

impl Owner {
    /// Hash a raw identifier (email or username) into an owner.
    pub fn from_identifier(identifier: &str) -> Self {
        Self(hash_owner(identifier))
    }

    /// The single owner used when authentication is disabled.
    pub fn anonymous() -> Self {
        Self::from_identifier("anonymous")
    }
}

/// Credential checking for one configured strategy, built once at startup.
#[derive(Debug)]
pub enum AuthProvider {
    Basic(PasswordFile),
    Bearer(BearerVerifier),
}

impl AuthProvider {
    /// Build the provider for `config`. `None` means authentication is
    /// disabled.
    pub fn from_config(config: &AuthConfig) -> Result<Option<Self>, ServerError> {
        match config.strategy {
            AuthStrategy::None => Ok(None),
            AuthStrategy::Basic => {
                let path = config.password_file.as_deref().ok_or_else(|| {
                    ServerError::Config("basic auth requires 'password_file' in [auth]".into())
                })?;
                Ok(Some(Self::Basic(PasswordFile::load(path)?)))
            }
            AuthStrategy::Bearer => {
                let secret = config
                    .bearer_secret
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        ServerError::Config("bearer auth requires 'bearer_secret' in [auth]".into())
                    })?;
                Ok(Some(Self::Bearer(BearerVerifier::new(
                    secret,
                    config.bearer_audience.as_deref(),
                ))))
            }
        }
    }

    /// The authentication scheme this provider expects.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Basic(_) => "Basic",
            Self::Bearer(_) => "Bearer",
        }
    }

    /// Check an `Authorization` header value and return the caller's raw
    /// identifier.
    pub fn authenticate(&self, header: &str) -> Result<String, String> {
        let Some((scheme, credentials)) = header.split_once(' ') else {
            return Err("malformed authorization header".into());
        };
        if !scheme.eq_ignore_ascii_case(self.scheme()) {
            return Err(format!("expected {} credentials", self.scheme()));
        }
        let credentials = credentials.trim();

        match self {
            Self::Basic(users) => {
                let decoded = STANDARD
                    .decode(credentials)
                    .map_err(|_| "malformed basic credentials".to_owned())?;
                let decoded =
                    String::from_utf8(decoded).map_err(|_| "malformed basic credentials".to_owned())?;
                let Some((username, password)) = decoded.split_once(':') else {
                    return Err("malformed basic credentials".into());
                };
                if users.verify(username, password) {
                    Ok(username.to_owned())
                } else {
                    Err("invalid credentials".into())
                }
            }
            Self::Bearer(verifier) => verifier.verify(credentials),
        }
    }
}
