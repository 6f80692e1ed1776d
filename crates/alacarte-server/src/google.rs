//! Google sign-in: verifies a Google ID token through the `tokeninfo`
//! endpoint and checks it was minted for this application.

use alacarte_core::identity::{IdentityError, IdentityProvider, VerifiedIdentity, VerifyFuture};
use reqwest::Client;
use serde::Deserialize;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Clone, Debug)]
pub struct GoogleIdentityProvider {
  client_id:   String,
  http_client: Client,
  endpoint:    String,
}

/// The subset of `tokeninfo` claims we rely on.
#[derive(Debug, Deserialize)]
struct TokenInfo {
  aud:     String,
  sub:     String,
  #[serde(default)]
  email:   String,
  #[serde(default)]
  name:    String,
  #[serde(default)]
  picture: String,
}

impl GoogleIdentityProvider {
  #[must_use]
  pub fn new(client_id: String) -> Self {
    Self {
      client_id,
      http_client: Client::new(),
      endpoint: TOKENINFO_URL.to_owned(),
    }
  }

  async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError> {
    let response = self
      .http_client
      .get(&self.endpoint)
      .query(&[("id_token", id_token)])
      .send()
      .await
      .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

    if !response.status().is_success() {
      return Err(IdentityError::Rejected(format!(
        "tokeninfo returned {}",
        response.status()
      )));
    }

    let info: TokenInfo = response
      .json()
      .await
      .map_err(|e| IdentityError::Rejected(format!("unreadable tokeninfo: {e}")))?;
    self.check_claims(info)
  }

  fn check_claims(&self, info: TokenInfo) -> Result<VerifiedIdentity, IdentityError> {
    if info.aud != self.client_id {
      return Err(IdentityError::Rejected("token audience mismatch".into()));
    }
    if info.sub.is_empty() || info.email.is_empty() || info.name.is_empty() {
      return Err(IdentityError::Rejected("incomplete identity claims".into()));
    }
    Ok(VerifiedIdentity {
      subject_id: info.sub,
      email:      info.email,
      full_name:  info.name,
      avatar_url: info.picture,
    })
  }
}

impl IdentityProvider for GoogleIdentityProvider {
  fn verify<'a>(&'a self, credential: &'a str) -> VerifyFuture<'a> {
    Box::pin(self.verify_id_token(credential))
  }
}
