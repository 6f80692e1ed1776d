//! [`SqliteStore`], the SQLite implementation of [`Store`].

use std::path::Path;

use alacarte_core::{
  Error as CoreError,
  impact::{AffectedUser, CascadeReport, DeleteImpact},
  item::{Item, ItemRef, ItemType, ItemValue},
  rating::{
    CommunityStats, NewRating, Rating, RatingChanges, RatingId, RatingQuery, RatingView,
  },
  store::Store,
  user::{NewUser, ProfileUpdate, ShareableUsers, User, UserId},
};
use chrono::Utc;
use rusqlite::{OptionalExtension as _, ToSql};

use crate::{
  Error, Result,
  encode::{
    ITEM_COLUMNS, RATING_COLUMNS, RawAuthor, RawItem, RawRating, RawRatingView, RawUser,
    USER_COLUMNS, encode_dt, public_user_from_row,
  },
  error::conflict_on_unique,
  schema::SCHEMA,
};

const DISPLAY_NAME_TAKEN: &str = "display name is already taken";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An alacarte store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection handle is shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `sql` (an `UPDATE ... RETURNING` over [`USER_COLUMNS`]) and decode
  /// the row, if one matched.
  async fn update_user_returning(
    &self,
    sql: String,
    params: Vec<Box<dyn ToSql + Send>>,
    conflict: &str,
  ) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let params: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref() as &dyn ToSql).collect();
        Ok(conn.query_row(&sql, params.as_slice(), RawUser::from_row).optional()?)
      })
      .await
      .map_err(|e| conflict_on_unique(e, conflict))?;
    raw.map(RawUser::into_user).transpose()
  }
}

fn boxed<T: ToSql + Send + 'static>(value: T) -> Box<dyn ToSql + Send> { Box::new(value) }

// ─── Impact queries ──────────────────────────────────────────────────────────

/// Three statements over the same parameters: a rating count, a viewer-link
/// count, and `(user id, display name, count)` rows.
struct ImpactSql {
  ratings:  &'static str,
  sharings: &'static str,
  affected: &'static str,
}

const ITEM_IMPACT: ImpactSql = ImpactSql {
  ratings:  "SELECT COUNT(*) FROM ratings WHERE item_type = ?1 AND item_id = ?2",
  sharings: "SELECT COUNT(*) FROM rating_viewers v
             JOIN ratings r ON r.id = v.rating_id
             WHERE r.item_type = ?1 AND r.item_id = ?2",
  affected: "SELECT u.id, u.display_name, COUNT(*) FROM ratings r
             JOIN users u ON u.id = r.author_id
             WHERE r.item_type = ?1 AND r.item_id = ?2
             GROUP BY u.id ORDER BY u.display_name, u.id",
};

const USER_IMPACT: ImpactSql = ImpactSql {
  ratings:  "SELECT COUNT(*) FROM ratings WHERE author_id = ?1",
  sharings: "SELECT COUNT(*) FROM rating_viewers v
             JOIN ratings r ON r.id = v.rating_id
             WHERE r.author_id = ?1",
  affected: "SELECT u.id, u.display_name, COUNT(*) FROM rating_viewers v
             JOIN ratings r ON r.id = v.rating_id
             JOIN users u ON u.id = v.user_id
             WHERE r.author_id = ?1
             GROUP BY u.id ORDER BY u.display_name, u.id",
};

fn collect_impact(
  conn: &rusqlite::Connection,
  sql: &ImpactSql,
  params: &[&dyn ToSql],
) -> rusqlite::Result<DeleteImpact> {
  let ratings_count: i64 = conn.query_row(sql.ratings, params, |r| r.get(0))?;
  let sharings_count: i64 = conn.query_row(sql.sharings, params, |r| r.get(0))?;
  let mut stmt = conn.prepare(sql.affected)?;
  let affected_users = stmt
    .query_map(params, |row| {
      let display_name: Option<String> = row.get(1)?;
      let count: i64 = row.get(2)?;
      Ok(AffectedUser {
        id:            UserId(row.get(0)?),
        display_name:  display_name.unwrap_or_default(),
        ratings_count: count as u64,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(DeleteImpact {
    ratings_count:  ratings_count as u64,
    users_affected: affected_users.len() as u64,
    sharings_count: sharings_count as u64,
    affected_users,
  })
}

fn item_exists(conn: &rusqlite::Connection, item_type: &str, id: i64) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS(SELECT 1 FROM items WHERE item_type = ?1 AND id = ?2)",
    rusqlite::params![item_type, id],
    |r| r.get(0),
  )
}

fn user_exists(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
    rusqlite::params![id],
    |r| r.get(0),
  )
}

// ─── Trait implementation ────────────────────────────────────────────────────

impl Store for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────

  async fn create_user(&self, user: NewUser) -> Result<User> {
    let now = encode_dt(Utc::now());
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "INSERT INTO users (google_id, email, full_name, avatar, last_login_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             RETURNING {USER_COLUMNS}"
          ),
          rusqlite::params![user.google_id, user.email, user.full_name, user.avatar, now],
          RawUser::from_row,
        )?)
      })
      .await
      .map_err(|e| conflict_on_unique(e, "an account with this email already exists"))?;
    raw.into_user()
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
              rusqlite::params![id.0],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_google_id(&self, google_id: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE google_id = ?1"),
              rusqlite::params![google_id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn record_login(&self, id: UserId) -> Result<Option<User>> {
    self
      .update_user_returning(
        format!("UPDATE users SET last_login_at = ?2 WHERE id = ?1 RETURNING {USER_COLUMNS}"),
        vec![boxed(id.0), boxed(encode_dt(Utc::now()))],
        DISPLAY_NAME_TAKEN,
      )
      .await
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn display_name_taken(&self, display_name: String, except: Option<UserId>) -> Result<bool> {
    let except = except.map(|u| u.0);
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(
            "SELECT EXISTS(
               SELECT 1 FROM users WHERE display_name = ?1 AND (?2 IS NULL OR id != ?2)
             )",
            rusqlite::params![display_name, except],
            |r| r.get(0),
          )?)
        })
        .await?,
    )
  }

  async fn complete_profile(
    &self,
    id: UserId,
    display_name: String,
    discoverable: bool,
  ) -> Result<Option<User>> {
    self
      .update_user_returning(
        format!(
          "UPDATE users SET display_name = ?2, discoverable = ?3, profile_completed = 1
           WHERE id = ?1 RETURNING {USER_COLUMNS}"
        ),
        vec![boxed(id.0), boxed(display_name), boxed(discoverable)],
        DISPLAY_NAME_TAKEN,
      )
      .await
  }

  async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<Option<User>> {
    self
      .update_user_returning(
        format!(
          "UPDATE users SET
             display_name = COALESCE(?2, display_name),
             discoverable = COALESCE(?3, discoverable)
           WHERE id = ?1 RETURNING {USER_COLUMNS}"
        ),
        vec![boxed(id.0), boxed(update.display_name), boxed(update.discoverable)],
        DISPLAY_NAME_TAKEN,
      )
      .await
  }

  async fn set_admin(&self, id: UserId, is_admin: bool) -> Result<Option<User>> {
    self
      .update_user_returning(
        format!("UPDATE users SET is_admin = ?2 WHERE id = ?1 RETURNING {USER_COLUMNS}"),
        vec![boxed(id.0), boxed(is_admin)],
        DISPLAY_NAME_TAKEN,
      )
      .await
  }

  async fn shareable_users(&self, id: UserId) -> Result<ShareableUsers> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let previous_connections = tx
            .prepare(
              "SELECT u.id, u.display_name, u.avatar
               FROM sharing_relationships s JOIN users u ON u.id = s.owner_id
               WHERE s.viewer_id = ?1 AND u.profile_completed = 1
               ORDER BY u.display_name, u.id",
            )?
            .query_map(rusqlite::params![id.0], public_user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          let discoverable = tx
            .prepare(
              "SELECT id, display_name, avatar FROM users
               WHERE discoverable = 1 AND profile_completed = 1 AND id != ?1
                 AND id NOT IN (
                   SELECT s.owner_id FROM sharing_relationships s
                   JOIN users o ON o.id = s.owner_id
                   WHERE s.viewer_id = ?1 AND o.profile_completed = 1
                 )
               ORDER BY display_name, id",
            )?
            .query_map(rusqlite::params![id.0], public_user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          tx.commit()?;
          Ok(ShareableUsers { previous_connections, discoverable })
        })
        .await?,
    )
  }

  async fn user_delete_impact(&self, id: UserId) -> Result<Option<DeleteImpact>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          if !user_exists(&tx, id.0)? {
            return Ok(None);
          }
          let impact = collect_impact(&tx, &USER_IMPACT, rusqlite::params![id.0])?;
          tx.commit()?;
          Ok(Some(impact))
        })
        .await?,
    )
  }

  async fn delete_user_cascade(&self, id: UserId) -> Result<Option<CascadeReport>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          if !user_exists(&tx, id.0)? {
            return Ok(None);
          }
          let own_links = tx.execute(
            "DELETE FROM rating_viewers
             WHERE rating_id IN (SELECT id FROM ratings WHERE author_id = ?1)",
            rusqlite::params![id.0],
          )?;
          let memberships = tx.execute(
            "DELETE FROM rating_viewers WHERE user_id = ?1",
            rusqlite::params![id.0],
          )?;
          let ratings = tx.execute(
            "DELETE FROM ratings WHERE author_id = ?1",
            rusqlite::params![id.0],
          )?;
          tx.execute(
            "DELETE FROM sharing_relationships WHERE owner_id = ?1 OR viewer_id = ?1",
            rusqlite::params![id.0],
          )?;
          tx.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id.0])?;
          tx.commit()?;
          Ok(Some(CascadeReport {
            ratings_deleted:      ratings as u64,
            viewer_links_deleted: (own_links + memberships) as u64,
          }))
        })
        .await?,
    )
  }

  // ── Items ─────────────────────────────────────────────────────────────

  async fn insert_item(&self, value: ItemValue) -> Result<Item> {
    let item_type   = value.item_type();
    let natural_key = value.natural_key();
    let name        = value.name().trim().to_owned();
    let value_json  = value.to_json()?.to_string();
    let now         = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "INSERT INTO items (item_type, natural_key, name, value_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             RETURNING {ITEM_COLUMNS}"
          ),
          rusqlite::params![item_type.as_str(), natural_key, name, value_json, now],
          RawItem::from_row,
        )?)
      })
      .await
      .map_err(|e| conflict_on_unique(e, &format!("this {item_type} already exists")))?;
    raw.into_item()
  }

  async fn get_item(&self, item: ItemRef) -> Result<Option<Item>> {
    let raw: Option<RawItem> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ITEM_COLUMNS} FROM items WHERE item_type = ?1 AND id = ?2"),
              rusqlite::params![item.item_type.as_str(), item.item_id.0],
              RawItem::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawItem::into_item).transpose()
  }

  async fn list_items(&self, item_type: ItemType) -> Result<Vec<Item>> {
    let raws: Vec<RawItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ITEM_COLUMNS} FROM items WHERE item_type = ?1
           ORDER BY name COLLATE NOCASE, id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![item_type.as_str()], RawItem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawItem::into_item).collect()
  }

  async fn item_exists(&self, item: ItemRef) -> Result<bool> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(item_exists(conn, item.item_type.as_str(), item.item_id.0)?))
        .await?,
    )
  }

  async fn update_item(&self, item: ItemRef, value: ItemValue) -> Result<Option<Item>> {
    if value.item_type() != item.item_type {
      return Err(Error::Core(CoreError::ItemTypeMismatch {
        expected: item.item_type,
        actual:   value.item_type(),
      }));
    }
    let natural_key = value.natural_key();
    let name        = value.name().trim().to_owned();
    let value_json  = value.to_json()?.to_string();
    let now         = encode_dt(Utc::now());

    let raw: Option<RawItem> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE items SET natural_key = ?3, name = ?4, value_json = ?5, updated_at = ?6
                 WHERE item_type = ?1 AND id = ?2
                 RETURNING {ITEM_COLUMNS}"
              ),
              rusqlite::params![
                item.item_type.as_str(),
                item.item_id.0,
                natural_key,
                name,
                value_json,
                now
              ],
              RawItem::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(|e| conflict_on_unique(e, &format!("this {} already exists", item.item_type)))?;
    raw.map(RawItem::into_item).transpose()
  }

  async fn set_item_image(&self, item: ItemRef, image_url: Option<String>) -> Result<Option<Item>> {
    let now = encode_dt(Utc::now());
    let raw: Option<RawItem> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE items SET image_url = ?3, updated_at = ?4
                 WHERE item_type = ?1 AND id = ?2
                 RETURNING {ITEM_COLUMNS}"
              ),
              rusqlite::params![item.item_type.as_str(), item.item_id.0, image_url, now],
              RawItem::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawItem::into_item).transpose()
  }

  async fn item_delete_impact(&self, item: ItemRef) -> Result<Option<DeleteImpact>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let item_type = item.item_type.as_str();
          if !item_exists(&tx, item_type, item.item_id.0)? {
            return Ok(None);
          }
          let impact =
            collect_impact(&tx, &ITEM_IMPACT, rusqlite::params![item_type, item.item_id.0])?;
          tx.commit()?;
          Ok(Some(impact))
        })
        .await?,
    )
  }

  async fn delete_item_cascade(&self, item: ItemRef) -> Result<Option<CascadeReport>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let item_type = item.item_type.as_str();
          let item_id = item.item_id.0;
          if !item_exists(&tx, item_type, item_id)? {
            return Ok(None);
          }
          let links = tx.execute(
            "DELETE FROM rating_viewers WHERE rating_id IN (
               SELECT id FROM ratings WHERE item_type = ?1 AND item_id = ?2
             )",
            rusqlite::params![item_type, item_id],
          )?;
          let ratings = tx.execute(
            "DELETE FROM ratings WHERE item_type = ?1 AND item_id = ?2",
            rusqlite::params![item_type, item_id],
          )?;
          tx.execute(
            "DELETE FROM items WHERE item_type = ?1 AND id = ?2",
            rusqlite::params![item_type, item_id],
          )?;
          tx.commit()?;
          Ok(Some(CascadeReport {
            ratings_deleted:      ratings as u64,
            viewer_links_deleted: links as u64,
          }))
        })
        .await?,
    )
  }

  // ── Ratings ───────────────────────────────────────────────────────────

  async fn insert_rating(&self, rating: NewRating) -> Result<Rating> {
    let now = encode_dt(Utc::now());
    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = tx.query_row(
          &format!(
            "INSERT INTO ratings (author_id, item_type, item_id, grade, note, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             RETURNING {RATING_COLUMNS}"
          ),
          rusqlite::params![
            rating.author_id.0,
            rating.item.item_type.as_str(),
            rating.item.item_id.0,
            f64::from(rating.grade),
            rating.note,
            now
          ],
          RawRating::from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;
    raw.into_rating()
  }

  async fn get_rating(&self, id: RatingId) -> Result<Option<Rating>> {
    let raw: Option<RawRating> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RATING_COLUMNS} FROM ratings WHERE id = ?1"),
              rusqlite::params![id.0],
              RawRating::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawRating::into_rating).transpose()
  }

  async fn list_ratings(&self, query: RatingQuery) -> Result<Vec<RatingView>> {
    let id          = query.id.map(|r| r.0);
    let author      = query.author.map(|u| u.0);
    let visible_to  = query.visible_to.map(|u| u.0);
    let item_type   = query.item_type.map(ItemType::as_str);
    let item_ref    = query.item.map(|i| (i.item_type.as_str(), i.item_id.0));
    let (ref_type, ref_id) = item_ref.unzip();

    let raws: Vec<RawRatingView> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let ratings = tx
          .prepare(
            "SELECT r.id, r.author_id, r.item_type, r.item_id, r.grade, r.note,
                    r.created_at, r.updated_at,
                    u.display_name, u.avatar, u.discoverable
             FROM ratings r JOIN users u ON u.id = r.author_id
             WHERE (?1 IS NULL OR r.id = ?1)
               AND (?2 IS NULL OR r.author_id = ?2)
               AND (?3 IS NULL OR r.author_id = ?3 OR EXISTS (
                     SELECT 1 FROM rating_viewers v WHERE v.rating_id = r.id AND v.user_id = ?3))
               AND (?4 IS NULL OR r.item_type = ?4)
               AND (?5 IS NULL OR (r.item_type = ?5 AND r.item_id = ?6))
             ORDER BY r.created_at DESC, r.id DESC",
          )?
          .query_map(
            rusqlite::params![id, author, visible_to, item_type, ref_type, ref_id],
            |row| {
              Ok((RawRating::from_row(row)?, RawAuthor {
                display_name: row.get(8)?,
                avatar:       row.get(9)?,
                discoverable: row.get(10)?,
              }))
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut viewers = tx.prepare(
          "SELECT u.id, u.display_name, u.avatar
           FROM rating_viewers v JOIN users u ON u.id = v.user_id
           WHERE v.rating_id = ?1
           ORDER BY u.display_name, u.id",
        )?;
        let mut views = Vec::with_capacity(ratings.len());
        for (rating, author) in ratings {
          let listed = viewers
            .query_map(rusqlite::params![rating.id], public_user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          views.push(RawRatingView { rating, author, viewers: listed });
        }
        drop(viewers);
        tx.commit()?;
        Ok(views)
      })
      .await?;

    raws.into_iter().map(RawRatingView::into_view).collect()
  }

  async fn update_rating(&self, id: RatingId, changes: RatingChanges) -> Result<Option<Rating>> {
    let grade     = changes.grade.map(f64::from);
    let item_type = changes.item.map(|i| i.item_type.as_str());
    let item_id   = changes.item.map(|i| i.item_id.0);
    let now       = encode_dt(Utc::now());

    let raw: Option<RawRating> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE ratings SET
                   grade      = COALESCE(?2, grade),
                   note       = COALESCE(?3, note),
                   item_type  = COALESCE(?4, item_type),
                   item_id    = COALESCE(?5, item_id),
                   updated_at = ?6
                 WHERE id = ?1
                 RETURNING {RATING_COLUMNS}"
              ),
              rusqlite::params![id.0, grade, changes.note, item_type, item_id, now],
              RawRating::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawRating::into_rating).transpose()
  }

  async fn delete_rating(&self, id: RatingId) -> Result<bool> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          tx.execute(
            "DELETE FROM rating_viewers WHERE rating_id = ?1",
            rusqlite::params![id.0],
          )?;
          let deleted = tx.execute("DELETE FROM ratings WHERE id = ?1", rusqlite::params![id.0])?;
          tx.commit()?;
          Ok(deleted > 0)
        })
        .await?,
    )
  }

  async fn add_viewers(&self, id: RatingId, viewers: Vec<UserId>) -> Result<()> {
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let author: Option<i64> = tx
          .query_row(
            "SELECT author_id FROM ratings WHERE id = ?1",
            rusqlite::params![id.0],
            |r| r.get(0),
          )
          .optional()?;
        let Some(author) = author else {
          return Ok(());
        };
        {
          let mut link = tx.prepare(
            "INSERT OR IGNORE INTO rating_viewers (rating_id, user_id)
             SELECT ?1, id FROM users WHERE id = ?2",
          )?;
          let mut relate = tx.prepare(
            "INSERT OR IGNORE INTO sharing_relationships (owner_id, viewer_id, first_shared_at)
             VALUES (?1, ?2, ?3)",
          )?;
          for viewer in viewers {
            if link.execute(rusqlite::params![id.0, viewer.0])? > 0 {
              relate.execute(rusqlite::params![author, viewer.0, now])?;
            }
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_viewers(&self, id: RatingId, viewers: Vec<UserId>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut unlink =
            tx.prepare("DELETE FROM rating_viewers WHERE rating_id = ?1 AND user_id = ?2")?;
          for viewer in viewers {
            unlink.execute(rusqlite::params![id.0, viewer.0])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn clear_viewers_by_author(&self, author: UserId) -> Result<u64> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let owned: i64 = tx.query_row(
            "SELECT COUNT(*) FROM ratings WHERE author_id = ?1",
            rusqlite::params![author.0],
            |r| r.get(0),
          )?;
          tx.execute(
            "DELETE FROM rating_viewers
             WHERE rating_id IN (SELECT id FROM ratings WHERE author_id = ?1)",
            rusqlite::params![author.0],
          )?;
          tx.commit()?;
          Ok(owned as u64)
        })
        .await?,
    )
  }

  async fn remove_viewer_by_author(&self, author: UserId, viewer: UserId) -> Result<u64> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let removed = tx.execute(
            "DELETE FROM rating_viewers
             WHERE user_id = ?2
               AND rating_id IN (SELECT id FROM ratings WHERE author_id = ?1)",
            rusqlite::params![author.0, viewer.0],
          )?;
          tx.commit()?;
          Ok(removed as u64)
        })
        .await?,
    )
  }

  async fn community_stats(&self, item: ItemRef) -> Result<CommunityStats> {
    let (total, average): (i64, f64) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*), COALESCE(AVG(grade), 0.0) FROM ratings
           WHERE item_type = ?1 AND item_id = ?2",
          rusqlite::params![item.item_type.as_str(), item.item_id.0],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?)
      })
      .await?;
    Ok(CommunityStats { total_ratings: total as u64, average_rating: average })
  }
}
