//! Authorization boundary for incoming WebSocket connections.
//!
//! Token issuance lives elsewhere in the platform; the gateway only
//! verifies a presented credential before a connection may enter the
//! registry. [`Authorizer`] is the seam: the transport-accept path calls
//! it with the raw token and either receives an [`AuthContext`] or closes
//! the socket without registering anything. [`JwtAuthorizer`] is the
//! production implementation, validating HS256 access tokens.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

use crate::error::GatewayError;

/// Role claim value granting elevated access.
const ADMIN_ROLE: &str = "admin";

/// Verified identity attached to a connection for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Subject of the validated credential.
    pub user_id: String,
    /// Optional role claim.
    pub role: Option<String>,
}

impl AuthContext {
    /// Returns `true` if the identity carries the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

/// External identity collaborator consulted before registration.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Validates `token` and returns the identity it proves.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AuthRejected`] for any invalid credential;
    /// the connection is refused and never counted.
    async fn authorize(&self, token: &str) -> Result<AuthContext, GatewayError>;
}

/// Claims carried by a platform access token.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(rename = "type")]
    token_type: String,
}

/// HS256 access-token verifier.
pub struct JwtAuthorizer {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthorizer").finish_non_exhaustive()
    }
}

impl JwtAuthorizer {
    /// Creates a verifier for tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl Authorizer for JwtAuthorizer {
    async fn authorize(&self, token: &str) -> Result<AuthContext, GatewayError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| GatewayError::AuthRejected(err.to_string()))?;

        let claims = data.claims;
        if claims.token_type != "access" {
            return Err(GatewayError::AuthRejected(
                "invalid token type".to_string(),
            ));
        }
        if claims.sub.is_empty() {
            return Err(GatewayError::AuthRejected(
                "invalid token payload".to_string(),
            ));
        }

        Ok(AuthContext {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}
