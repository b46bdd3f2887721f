//! v001: options, users, roles, metadata, license index.

pub const SQL: &str = "
    CREATE TABLE IF NOT EXISTS options (
        name       TEXT PRIMARY KEY,
        value      TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%S', 'now'))
    );

    CREATE TABLE IF NOT EXISTS users (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        login          TEXT NOT NULL UNIQUE COLLATE NOCASE,
        email          TEXT NOT NULL UNIQUE COLLATE NOCASE,
        password_hash  TEXT NOT NULL,
        display_name   TEXT NOT NULL DEFAULT '',
        first_name     TEXT NOT NULL DEFAULT '',
        activation_key TEXT,
        created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%S', 'now'))
    );

    CREATE TABLE IF NOT EXISTS user_roles (
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        role    TEXT NOT NULL,
        PRIMARY KEY (user_id, role)
    );

    CREATE TABLE IF NOT EXISTS user_meta (
        user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        meta_key   TEXT NOT NULL,
        meta_value TEXT NOT NULL,
        PRIMARY KEY (user_id, meta_key)
    );

    CREATE TABLE IF NOT EXISTS license_index (
        license_key TEXT PRIMARY KEY,
        user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_license_index_user
        ON license_index(user_id);
";
