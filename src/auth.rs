//! Registration, login and session checks.
//!
//! Passwords are stored as salted PBKDF2-SHA256 hashes. A successful
//! login yields two credentials: an HMAC-signed session cookie value,
//! which is what actually gates later requests, and an HS256 token that
//! is handed to the client but never checked server-side.

use std::num::NonZeroU32;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};
use ring::{hmac, pbkdf2};
use thiserror::Error;

use crate::metadata_store::{MetadataStore, MetadataStoreError, UserRecord};

const PBKDF2_SCHEME: &str = "pbkdf2-sha256";
const PBKDF2_ITERATIONS: NonZeroU32 = NonZeroU32::new(100_000).unwrap();
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

pub const SESSION_TTL_SECS: i64 = 86_400;
const TOKEN_TTL_SECS: i64 = 3_600;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("username is already taken")]
    UsernameTaken,
    #[error("password hashing failed")]
    Hashing,
    #[error("metadata store: {0}")]
    Store(#[from] MetadataStoreError),
}

/// Credentials returned by a successful login.
#[derive(Debug)]
pub struct LoginGrant {
    pub token: String,
    pub session: String,
}

pub struct AuthGate {
    metadata_store: Arc<dyn MetadataStore>,
    sessions: SessionSigner,
    tokens: TokenIssuer,
}

impl AuthGate {
    pub fn new(
        metadata_store: Arc<dyn MetadataStore>,
        session_secret: &str,
        token_secret: &str,
    ) -> Self {
        Self {
            metadata_store,
            sessions: SessionSigner::new(session_secret),
            tokens: TokenIssuer::new(token_secret),
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let user = UserRecord {
            username: username.to_string(),
            password_hash: hash_password(password)?,
        };
        match self.metadata_store.create_user(&user).await {
            Ok(()) => Ok(()),
            Err(MetadataStoreError::AlreadyExists(_)) => Err(AuthError::UsernameTaken),
            Err(e) => Err(e.into()),
        }
    }

    /// Checks the password against the stored hash. Unknown usernames and
    /// wrong passwords are indistinguishable to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginGrant, AuthError> {
        let user = self.metadata_store.get_user(username).await?;
        let valid = user
            .as_ref()
            .map(|u| verify_password(&u.password_hash, password))
            .unwrap_or(false);
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(LoginGrant {
            token: self.tokens.issue(username),
            session: self.sessions.issue(username, SESSION_TTL_SECS),
        })
    }

    /// Resolves a session cookie value back to its username, or `None` if
    /// the value is forged or expired.
    pub fn session_user(&self, cookie_value: &str) -> Option<String> {
        self.sessions.validate(cookie_value)
    }
}

/// Signs and validates session cookie values of the form
/// `b64(username).expiry_unix.b64(mac)`.
pub struct SessionSigner {
    key: hmac::Key,
}

impl SessionSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
        }
    }

    pub fn issue(&self, username: &str, ttl_secs: i64) -> String {
        let expires = Utc::now().timestamp() + ttl_secs;
        let payload = format!("{}.{expires}", base64_url_encode(username.as_bytes()));
        let mac = hmac::sign(&self.key, payload.as_bytes());
        format!("{payload}.{}", base64_url_encode(mac.as_ref()))
    }

    pub fn validate(&self, value: &str) -> Option<String> {
        let (payload, mac_b64) = value.rsplit_once('.')?;
        let mac = base64_url_decode(mac_b64).ok()?;
        hmac::verify(&self.key, payload.as_bytes(), &mac).ok()?;

        let (name_b64, expires) = payload.split_once('.')?;
        let expires: i64 = expires.parse().ok()?;
        if expires < Utc::now().timestamp() {
            return None;
        }

        let name = base64_url_decode(name_b64).ok()?;
        String::from_utf8(name).ok()
    }
}

/// Mints the HS256 token included in the login response.
///
/// No endpoint validates these tokens; clients that want to present one
/// elsewhere can, but the session cookie is the credential this service
/// trusts.
pub struct TokenIssuer {
    key: hmac::Key,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
        }
    }

    pub fn issue(&self, username: &str) -> String {
        let header = serde_json::json!({ "alg": "HS256", "typ": "JWT" });
        let now = Utc::now().timestamp();
        let claims = serde_json::json!({
            "username": username,
            "iat": now,
            "exp": now + TOKEN_TTL_SECS,
        });

        let signing_input = format!(
            "{}.{}",
            base64_url_encode(header.to_string().as_bytes()),
            base64_url_encode(claims.to_string().as_bytes())
        );
        let mac = hmac::sign(&self.key, signing_input.as_bytes());
        format!("{signing_input}.{}", base64_url_encode(mac.as_ref()))
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt).map_err(|_| AuthError::Hashing)?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(format!(
        "{PBKDF2_SCHEME}${PBKDF2_ITERATIONS}${}${}",
        base64_url_encode(&salt),
        base64_url_encode(&hash)
    ))
}

pub fn verify_password(stored: &str, candidate: &str) -> bool {
    let mut parts = stored.split('$');
    let (scheme, iterations, salt, hash) = match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(scheme), Some(iterations), Some(salt), Some(hash), None) => {
            (scheme, iterations, salt, hash)
        }
        _ => return false,
    };
    if scheme != PBKDF2_SCHEME {
        return false;
    }
    let Some(iterations) = iterations.parse().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (base64_url_decode(salt), base64_url_decode(hash)) else {
        return false;
    };

    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        candidate.as_bytes(),
        &hash,
    )
    .is_ok()
}

fn base64_url_encode(data: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn base64_url_decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::URL_SAFE_NO_PAD.decode(data)
}
