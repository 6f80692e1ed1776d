//! Core types and business rules for the alacarte catalog.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backend and the identity provider are reached through the
//! [`store::Store`] and [`identity::IdentityProvider`] traits.

// Native `async fn` in traits; the store trait spells out `Send` bounds itself.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod directory;
pub mod engine;
pub mod error;
pub mod identity;
pub mod impact;
pub mod item;
pub mod rating;
pub mod store;
pub mod user;

pub use error::{Error, ErrorKind, Result};
