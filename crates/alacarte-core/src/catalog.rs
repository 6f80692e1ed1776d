//! The catalog registry: item CRUD over the five item types.

use std::sync::Arc;

use crate::{
  Error, Result,
  impact::{CascadeReport, DeleteImpact},
  item::{Item, ItemRef, ItemType, ItemValue},
  store::{Store, StoreResultExt as _},
};

pub struct Catalog<S> {
  store: Arc<S>,
}

impl<S> Clone for Catalog<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: Store> Catalog<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Validate client-supplied attributes and store a new item.
  pub async fn create(&self, item_type: ItemType, attrs: serde_json::Value) -> Result<Item> {
    let value = ItemValue::parse(item_type, attrs)?;
    let item = self.store.insert_item(value).await.into_core()?;
    tracing::info!(item = %item.item_ref(), "item created");
    Ok(item)
  }

  pub async fn list(&self, item_type: ItemType) -> Result<Vec<Item>> {
    self.store.list_items(item_type).await.into_core()
  }

  pub async fn get(&self, item: ItemRef) -> Result<Item> {
    self
      .store
      .get_item(item)
      .await
      .into_core()?
      .ok_or(Error::ItemNotFound(item))
  }

  pub async fn exists(&self, item: ItemRef) -> Result<bool> {
    self.store.item_exists(item).await.into_core()
  }

  /// Replace the attributes of an existing item of the same type.
  pub async fn update(&self, item: ItemRef, attrs: serde_json::Value) -> Result<Item> {
    let value = ItemValue::parse(item.item_type, attrs)?;
    let updated = self
      .store
      .update_item(item, value)
      .await
      .into_core()?
      .ok_or(Error::ItemNotFound(item))?;
    tracing::info!(item = %item, "item updated");
    Ok(updated)
  }

  /// Attach (or clear) an image reference produced elsewhere.
  pub async fn set_image(&self, item: ItemRef, image_url: Option<String>) -> Result<Item> {
    let image_url = image_url.map(|u| u.trim().to_owned()).filter(|u| !u.is_empty());
    self
      .store
      .set_item_image(item, image_url)
      .await
      .into_core()?
      .ok_or(Error::ItemNotFound(item))
  }

  pub async fn delete_impact(&self, item: ItemRef) -> Result<DeleteImpact> {
    self
      .store
      .item_delete_impact(item)
      .await
      .into_core()?
      .ok_or(Error::ItemNotFound(item))
  }

  /// Remove the item together with every rating of it.
  pub async fn delete(&self, item: ItemRef) -> Result<CascadeReport> {
    let report = self
      .store
      .delete_item_cascade(item)
      .await
      .into_core()?
      .ok_or(Error::ItemNotFound(item))?;
    tracing::info!(
      item = %item,
      ratings_deleted = report.ratings_deleted,
      viewer_links_deleted = report.viewer_links_deleted,
      "item deleted"
    );
    Ok(report)
  }
}
