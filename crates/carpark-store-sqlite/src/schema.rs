//! SQL schema for the carpark SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Reference tables are only ever appended to.
CREATE TABLE IF NOT EXISTS car_park_types (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS parking_system_types (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS carparks (
    carpark_id             TEXT PRIMARY KEY,
    car_park_no            TEXT NOT NULL UNIQUE,
    address                TEXT NOT NULL,
    x_coord                REAL NOT NULL,
    y_coord                REAL NOT NULL,
    short_term_parking     TEXT NOT NULL,
    free_parking           TEXT NOT NULL,
    night_parking          INTEGER NOT NULL,   -- 0 | 1
    car_park_decks         INTEGER NOT NULL,
    gantry_height          REAL NOT NULL,
    car_park_basement      INTEGER NOT NULL,   -- 0 | 1
    car_park_type_id       INTEGER NOT NULL REFERENCES car_park_types(id),
    parking_system_type_id INTEGER NOT NULL REFERENCES parking_system_types(id),
    created_at             TEXT NOT NULL,      -- ISO 8601 UTC
    updated_at             TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    token_hash  TEXT NOT NULL UNIQUE,   -- hex SHA-256 of the bearer token
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS favorites (
    user_id     TEXT NOT NULL REFERENCES users(user_id),
    carpark_id  TEXT NOT NULL REFERENCES carparks(carpark_id),
    created_at  TEXT NOT NULL,
    PRIMARY KEY (user_id, carpark_id)
);

CREATE INDEX IF NOT EXISTS carparks_height_idx ON carparks(gantry_height);
CREATE INDEX IF NOT EXISTS favorites_user_idx  ON favorites(user_id, created_at);

PRAGMA user_version = 1;
";
