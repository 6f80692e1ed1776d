//! axum handlers, one module per resource.

pub mod admin;
pub mod items;
pub mod ratings;
pub mod session;
pub mod stats;
pub mod users;

use alacarte_core::item::{ItemRef, ItemType};

use crate::error::Error;

/// Resolve the `{item_type}/{id}` path pair.
pub(crate) fn item_ref(item_type: &str, id: i64) -> Result<ItemRef, Error> {
  Ok(ItemRef::new(ItemType::parse(item_type)?, id))
}
