//! SQL schema for the alacarte SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    google_id         TEXT NOT NULL UNIQUE,
    email             TEXT NOT NULL UNIQUE,
    full_name         TEXT NOT NULL,
    avatar            TEXT NOT NULL DEFAULT '',
    display_name      TEXT UNIQUE,        -- NULL until the profile is completed
    discoverable      INTEGER NOT NULL DEFAULT 1,
    profile_completed INTEGER NOT NULL DEFAULT 0,
    is_admin          INTEGER NOT NULL DEFAULT 0,
    last_login_at     TEXT NOT NULL,
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    item_type    TEXT NOT NULL,           -- kebab-case ItemType tag
    natural_key  TEXT NOT NULL,
    name         TEXT NOT NULL,
    value_json   TEXT NOT NULL,           -- attributes without the type tag
    image_url    TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (item_type, natural_key)
);

-- item_type/item_id is a soft reference; item deletes cascade explicitly.
CREATE TABLE IF NOT EXISTS ratings (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    author_id   INTEGER NOT NULL REFERENCES users(id),
    item_type   TEXT NOT NULL,
    item_id     INTEGER NOT NULL,
    grade       REAL NOT NULL,
    note        TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rating_viewers (
    rating_id INTEGER NOT NULL REFERENCES ratings(id) ON DELETE CASCADE,
    user_id   INTEGER NOT NULL REFERENCES users(id),
    PRIMARY KEY (rating_id, user_id)
);

-- Who has ever shared with whom; feeds the shareable-users suggestions.
CREATE TABLE IF NOT EXISTS sharing_relationships (
    owner_id        INTEGER NOT NULL REFERENCES users(id),
    viewer_id       INTEGER NOT NULL REFERENCES users(id),
    first_shared_at TEXT NOT NULL,
    PRIMARY KEY (owner_id, viewer_id),
    CHECK (owner_id != viewer_id)
);

-- An author is never a viewer of their own rating.
CREATE TRIGGER IF NOT EXISTS rating_viewers_skip_author
BEFORE INSERT ON rating_viewers
WHEN NEW.user_id = (SELECT author_id FROM ratings WHERE id = NEW.rating_id)
BEGIN
    SELECT RAISE(IGNORE);
END;

CREATE TRIGGER IF NOT EXISTS ratings_author_immutable
BEFORE UPDATE OF author_id ON ratings
WHEN NEW.author_id != OLD.author_id
BEGIN
    SELECT RAISE(ABORT, 'rating author is immutable');
END;

CREATE INDEX IF NOT EXISTS ratings_author_idx  ON ratings(author_id);
CREATE INDEX IF NOT EXISTS ratings_item_idx    ON ratings(item_type, item_id);
CREATE INDEX IF NOT EXISTS viewers_user_idx    ON rating_viewers(user_id);
CREATE INDEX IF NOT EXISTS sharing_viewer_idx  ON sharing_relationships(viewer_id);
CREATE INDEX IF NOT EXISTS items_type_name_idx ON items(item_type, name);

PRAGMA user_version = 1;
";
