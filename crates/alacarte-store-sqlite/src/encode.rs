//! Encoding and decoding helpers between domain types and SQLite rows.
//!
//! Timestamps are stored as RFC 3339 strings and item attributes as compact
//! JSON. Rows are first read into plain `Raw*` structs inside the database
//! thread, then decoded into domain types on the async side.

use alacarte_core::{
  item::{Item, ItemId, ItemRef, ItemType, ItemValue},
  rating::{AuthorSummary, Rating, RatingId, RatingView, ViewerSummary},
  user::{PublicUser, User, UserId},
};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "id, google_id, email, full_name, avatar, display_name, \
   discoverable, profile_completed, is_admin, last_login_at, created_at";

pub struct RawUser {
  pub id:                i64,
  pub google_id:         String,
  pub email:             String,
  pub full_name:         String,
  pub avatar:            String,
  pub display_name:      Option<String>,
  pub discoverable:      bool,
  pub profile_completed: bool,
  pub is_admin:          bool,
  pub last_login_at:     String,
  pub created_at:        String,
}

impl RawUser {
  /// Read a row selected with [`USER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      google_id:         row.get(1)?,
      email:             row.get(2)?,
      full_name:         row.get(3)?,
      avatar:            row.get(4)?,
      display_name:      row.get(5)?,
      discoverable:      row.get(6)?,
      profile_completed: row.get(7)?,
      is_admin:          row.get(8)?,
      last_login_at:     row.get(9)?,
      created_at:        row.get(10)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:                UserId(self.id),
      google_id:         self.google_id,
      email:             self.email,
      full_name:         self.full_name,
      avatar:            self.avatar,
      display_name:      self.display_name,
      discoverable:      self.discoverable,
      profile_completed: self.profile_completed,
      is_admin:          self.is_admin,
      last_login_at:     decode_dt(&self.last_login_at)?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

/// `(id, display_name, avatar)` as selected for public projections.
pub fn public_user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PublicUser> {
  let display_name: Option<String> = row.get(1)?;
  Ok(PublicUser {
    id:           UserId(row.get(0)?),
    display_name: display_name.unwrap_or_default(),
    avatar:       row.get(2)?,
  })
}

// ─── Items ───────────────────────────────────────────────────────────────────

pub const ITEM_COLUMNS: &str = "id, item_type, value_json, image_url, created_at, updated_at";

pub struct RawItem {
  pub id:         i64,
  pub item_type:  String,
  pub value_json: String,
  pub image_url:  Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl RawItem {
  /// Read a row selected with [`ITEM_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      item_type:  row.get(1)?,
      value_json: row.get(2)?,
      image_url:  row.get(3)?,
      created_at: row.get(4)?,
      updated_at: row.get(5)?,
    })
  }

  pub fn into_item(self) -> Result<Item> {
    let item_type = ItemType::parse(&self.item_type)?;
    let data: serde_json::Value = serde_json::from_str(&self.value_json)?;
    Ok(Item {
      id:         ItemId(self.id),
      value:      ItemValue::from_parts(item_type, data)?,
      image_url:  self.image_url,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Ratings ─────────────────────────────────────────────────────────────────

pub const RATING_COLUMNS: &str =
  "id, author_id, item_type, item_id, grade, note, created_at, updated_at";

pub struct RawRating {
  pub id:         i64,
  pub author_id:  i64,
  pub item_type:  String,
  pub item_id:    i64,
  pub grade:      f64,
  pub note:       String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawRating {
  /// Read a row selected with [`RATING_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      author_id:  row.get(1)?,
      item_type:  row.get(2)?,
      item_id:    row.get(3)?,
      grade:      row.get(4)?,
      note:       row.get(5)?,
      created_at: row.get(6)?,
      updated_at: row.get(7)?,
    })
  }

  pub fn into_rating(self) -> Result<Rating> {
    Ok(Rating {
      id:         RatingId(self.id),
      author_id:  UserId(self.author_id),
      item:       ItemRef::new(ItemType::parse(&self.item_type)?, self.item_id),
      grade:      self.grade as f32,
      note:       self.note,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawAuthor {
  pub display_name: Option<String>,
  pub avatar:       String,
  pub discoverable: bool,
}

/// A rating row joined with its author and followed by its viewers.
pub struct RawRatingView {
  pub rating:  RawRating,
  pub author:  RawAuthor,
  pub viewers: Vec<PublicUser>,
}

impl RawRatingView {
  pub fn into_view(self) -> Result<RatingView> {
    let rating = self.rating.into_rating()?;
    let author = AuthorSummary {
      id:           rating.author_id,
      display_name: self.author.display_name.unwrap_or_default(),
      avatar:       self.author.avatar,
      discoverable: self.author.discoverable,
    };
    let viewers = self
      .viewers
      .into_iter()
      .map(|v| ViewerSummary { id: v.id, display_name: v.display_name, avatar: v.avatar })
      .collect();
    Ok(RatingView { rating, author, viewers })
  }
}
