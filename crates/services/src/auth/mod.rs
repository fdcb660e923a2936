mod identity;

pub use identity::IdentityContext;

use argon2::password_hash::rand_core::OsRng;
use argon2::{
    Algorithm as HashAlgorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier,
    Version, password_hash::SaltString,
};
use bizchat_config::{JwtSettings, PasswordSettings};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account disabled: {0}")]
    AccountDisabled(String),
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token signing failed: {0}")]
    Signing(String),
    #[error("Password hash error: {0}")]
    HashError(String),
}

/// Session token payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user_id: String,
    pub company_id: String,
    pub email: String,
    pub role_id: String,
    pub role_name: String,
    pub permissions: Vec<String>,
    pub is_super_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Password hashing and session tokens. Read-only after construction.
pub struct AuthService {
    token_ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    argon2: Argon2<'static>,
    /// Verified against when there is no usable stored hash, so that every
    /// failed credential check costs one full verification.
    dummy_hash: String,
}

impl AuthService {
    pub fn new(jwt: &JwtSettings, password: &PasswordSettings) -> Result<Self, AuthError> {
        let params = Params::new(
            password.memory_kib,
            password.iterations,
            password.parallelism,
            None,
        )
        .map_err(|e| AuthError::HashError(e.to_string()))?;
        let argon2 = Argon2::new(HashAlgorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, "bizchat-placeholder-credential")?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            token_ttl: Duration::seconds(i64::try_from(jwt.token_ttl_secs).unwrap_or(i64::MAX)),
            encoding_key: EncodingKey::from_secret(jwt.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt.secret.as_bytes()),
            validation,
            argon2,
            dummy_hash,
        })
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        hash_with(&self.argon2, password)
    }

    /// Malformed hashes verify as `false` after the same amount of work as a
    /// wrong password.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                debug!(error = %e, "Stored password hash is malformed");
                self.burn_verification(password);
                false
            }
        }
    }

    /// Runs one verification against the placeholder hash and discards it.
    pub fn burn_verification(&self, password: &str) {
        if let Ok(parsed) = PasswordHash::new(&self.dummy_hash) {
            let _ = self.argon2.verify_password(password.as_bytes(), &parsed);
        }
    }

    pub fn issue_token(&self, ctx: &IdentityContext) -> Result<IssuedToken, AuthError> {
        self.issue_token_at(ctx, Utc::now())
    }

    pub fn issue_token_at(
        &self,
        ctx: &IdentityContext,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = issued_at + self.token_ttl;
        let claims = ctx.to_claims(issued_at.timestamp(), expires_at.timestamp());
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Every failure (signature, algorithm, expiry, shape) is `InvalidToken`.
    pub fn parse_and_verify(&self, token: &str) -> Result<IdentityContext, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!(error = %e, "Token rejected");
            AuthError::InvalidToken
        })?;
        IdentityContext::try_from(data.claims)
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashError(e.to_string()))?;
    Ok(hash.to_string())
}
