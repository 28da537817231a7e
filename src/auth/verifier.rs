//! Credential verification against the platform's token issuer.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

use super::identity::{Identity, UserProfile};

/// Turns a raw bearer credential into an [`Identity`].
///
/// Implementations must contain every failure mode: malformed tokens,
/// expired tokens, signature mismatches, and unknown subjects all resolve
/// to [`Identity::Anonymous`]. The verifier never raises to the caller.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + std::fmt::Debug {
    /// Resolves `token` to an identity, or anonymous on any failure.
    async fn verify(&self, token: &str) -> Identity;
}

/// Claims carried by platform-issued access tokens.
#[derive(Debug, Deserialize)]
struct Claims {
    /// Subject: the user id as a decimal string.
    sub: String,
    /// Display name captured at issue time.
    username: String,
    /// Expiry, seconds since the epoch. Checked by `jsonwebtoken`.
    #[allow(dead_code)]
    exp: u64,
}

/// HS256 JWT verifier sharing the platform's signing secret.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier").finish_non_exhaustive()
    }
}

impl JwtVerifier {
    /// Creates a verifier for tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Identity {
        let validation = Validation::new(Algorithm::HS256);
        match decode::<Claims>(token, &self.key, &validation) {
            Ok(data) => match data.claims.sub.parse::<i64>() {
                Ok(id) => Identity::Known(UserProfile {
                    id,
                    username: data.claims.username,
                }),
                Err(_) => {
                    tracing::debug!(sub = %data.claims.sub, "token subject is not a user id");
                    Identity::Anonymous
                }
            },
            Err(err) => {
                tracing::debug!(error = %err, "bearer token rejected");
                Identity::Anonymous
            }
        }
    }
}
