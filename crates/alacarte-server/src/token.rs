//! Opaque session tokens.
//!
//! A token is `base64url(claims) "." base64url(mac)`, where the MAC is a
//! BLAKE3 keyed hash of the encoded claims. Tokens expire after a fixed
//! window and are never refreshed.

use alacarte_core::user::UserId;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const KEY_CONTEXT: &str = "alacarte 2024-06 session token mac";

/// Shortest accepted secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
  #[error("token secret must be at least {MIN_SECRET_LEN} bytes")]
  WeakSecret,
  #[error("malformed token")]
  Malformed,
  #[error("bad token signature")]
  BadSignature,
  #[error("token expired")]
  Expired,
  #[error("token encoding error: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
  sub: i64,
  iat: i64,
  exp: i64,
}

/// Issues and verifies session tokens under one server secret.
pub struct TokenService {
  key: [u8; 32],
  ttl: Duration,
}

impl TokenService {
  pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
    if secret.len() < MIN_SECRET_LEN {
      return Err(TokenError::WeakSecret);
    }
    Ok(Self { key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()), ttl })
  }

  pub fn issue(&self, user: UserId) -> Result<String, TokenError> {
    self.issue_at(user, Utc::now())
  }

  pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
    self.verify_at(token, Utc::now())
  }

  fn issue_at(&self, user: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
    let claims = Claims {
      sub: user.0,
      iat: now.timestamp(),
      exp: (now + self.ttl).timestamp(),
    };
    let payload = B64.encode(serde_json::to_vec(&claims)?);
    let mac = blake3::keyed_hash(&self.key, payload.as_bytes());
    Ok(format!("{payload}.{}", B64.encode(mac.as_bytes())))
  }

  fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError> {
    let (payload, mac) = token.split_once('.').ok_or(TokenError::Malformed)?;
    let mac: [u8; 32] = B64
      .decode(mac)
      .map_err(|_| TokenError::Malformed)?
      .try_into()
      .map_err(|_| TokenError::Malformed)?;

    // `blake3::Hash` equality is constant-time.
    if blake3::keyed_hash(&self.key, payload.as_bytes()) != blake3::Hash::from(mac) {
      return Err(TokenError::BadSignature);
    }

    let claims: Claims =
      serde_json::from_slice(&B64.decode(payload).map_err(|_| TokenError::Malformed)?)?;
    if now.timestamp() >= claims.exp {
      return Err(TokenError::Expired);
    }
    Ok(UserId(claims.sub))
  }
}
