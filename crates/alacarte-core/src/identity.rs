//! The identity-provider boundary: turn a provider-issued credential into a
//! verified identity.

use std::{future::Future, pin::Pin};

use thiserror::Error;

/// Claims extracted from a successfully verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
  /// The provider's stable subject id.
  pub subject_id: String,
  pub email:      String,
  pub full_name:  String,
  pub avatar_url: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
  #[error("credential rejected: {0}")]
  Rejected(String),

  #[error("identity provider unreachable: {0}")]
  Unavailable(String),
}

pub type VerifyFuture<'a> =
  Pin<Box<dyn Future<Output = Result<VerifiedIdentity, IdentityError>> + Send + 'a>>;

/// A source of verified identities. Object safe so the server can hold one
/// behind `Arc<dyn IdentityProvider>`.
pub trait IdentityProvider: Send + Sync {
  fn verify<'a>(&'a self, credential: &'a str) -> VerifyFuture<'a>;
}
