use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::{error::Error as StdError, fmt};

// Errors returned by access-token verification. All of them are authentication failures.
#[derive(Debug)]
pub enum AccessJwtError {
    Jwt(jsonwebtoken::errors::Error),
    MissingScheme,
    EmptyClaim(&'static str),
}

impl fmt::Display for AccessJwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwt(e) => write!(f, "jwt verification failed: {}", e),
            Self::MissingScheme => write!(f, "credential is not a bearer token"),
            Self::EmptyClaim(name) => write!(f, "empty '{}' claim", name),
        }
    }
}

impl StdError for AccessJwtError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Jwt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AccessJwtError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Jwt(e)
    }
}

/// Access token claims. Role is deliberately absent: it is re-resolved per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Verified subject identity extracted from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub uid: String,
    pub username: String,
    pub exp: i64,
}

/// Returns the token part of an `Authorization` value using the `Bearer` scheme.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// HS256 access-token verifier.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared strictly against the current time.
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            decoding_key,
            validation,
        }
    }

    /// Verify the value of an `Authorization` header. The `Bearer` scheme is mandatory.
    pub fn verify_header(&self, value: &str) -> Result<VerifiedToken, AccessJwtError> {
        let token = bearer_token(value).ok_or(AccessJwtError::MissingScheme)?;
        self.verify(token)
    }

    /// Signature, structure and expiry check of a raw token.
    ///
    /// `jsonwebtoken::Validation` covers signature and `exp`; this method
    /// additionally fails closed on an empty subject.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, AccessJwtError> {
        let data =
            jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        if claims.uid.trim().is_empty() {
            return Err(AccessJwtError::EmptyClaim("uid"));
        }

        Ok(VerifiedToken {
            uid: claims.uid,
            username: claims.username,
            exp: claims.exp,
        })
    }
}
