use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

/// The claims read from an identity token.
#[derive(Debug, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub email: Option<String>,
    /// Expiry (seconds since epoch).
    pub exp: usize,
}

/// Verifies HS256 identity tokens signed with a shared secret.
pub struct BearerVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for BearerVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerVerifier")
            .field("audience", &self.validation.aud)
            .finish_non_exhaustive()
    }
}

impl BearerVerifier {
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Check signature and expiry, returning the caller's identifier: the
    /// `email` claim, or `sub` when there is no email.
    pub fn verify(&self, token: &str) -> Result<String, String> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| format!("invalid token: {e}"))?;
        let claims = data.claims;
        claims
            .email
            .filter(|e| !e.is_empty())
            .or(claims.sub.filter(|s| !s.is_empty()))
            .ok_or_else(|| "token has no email or sub claim".to_owned())
    }
}
