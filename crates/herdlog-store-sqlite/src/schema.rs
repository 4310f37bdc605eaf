//! SQL schema for the herdlog SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS tags (
    tag_id  INTEGER PRIMARY KEY,
    name    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS questions (
    question_id INTEGER PRIMARY KEY,
    tag_id      INTEGER NOT NULL REFERENCES tags(tag_id),
    text        TEXT
);

-- Answers are append-only apart from the tombstone flag.
-- rowid is the insertion order and breaks created_at ties.
CREATE TABLE IF NOT EXISTS answers (
    answer_id      TEXT PRIMARY KEY,
    owner_id       INTEGER NOT NULL,
    animal_type_id INTEGER NOT NULL,
    animal_number  TEXT NOT NULL,
    question_id    INTEGER NOT NULL REFERENCES questions(question_id),
    value          TEXT NOT NULL,
    logic_value    TEXT,
    created_at     TEXT NOT NULL,   -- RFC 3339, microseconds, UTC 'Z'
    deleted        INTEGER NOT NULL DEFAULT 0
);

-- Not unique: a correction is a new row.
CREATE TABLE IF NOT EXISTS mother_calf_links (
    link_id              INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id             INTEGER NOT NULL,
    animal_type_id       INTEGER NOT NULL,
    delivery_date        TEXT NOT NULL,   -- YYYY-MM-DD
    mother_animal_number TEXT NOT NULL,
    calf_animal_number   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS milk_records (
    owner_id       INTEGER NOT NULL,
    animal_type_id INTEGER NOT NULL,
    animal_number  TEXT NOT NULL,
    record_date    TEXT NOT NULL,   -- YYYY-MM-DD
    morning_qty    REAL NOT NULL DEFAULT 0,
    evening_qty    REAL NOT NULL DEFAULT 0,
    deleted        INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS lactation_samples (
    sample_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id         INTEGER NOT NULL,
    animal_type_id   INTEGER NOT NULL,
    animal_number    TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    lactating_status TEXT NOT NULL,
    pregnancy_status TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS answers_animal_idx
    ON answers(owner_id, animal_type_id, animal_number, created_at);
CREATE INDEX IF NOT EXISTS answers_herd_idx
    ON answers(owner_id, animal_type_id);
-- At most one live record per animal and day.
CREATE UNIQUE INDEX IF NOT EXISTS milk_live_day_idx
    ON milk_records(owner_id, animal_type_id, animal_number, record_date)
    WHERE deleted = 0;
CREATE INDEX IF NOT EXISTS links_calf_idx
    ON mother_calf_links(owner_id, animal_type_id, calf_animal_number);
CREATE INDEX IF NOT EXISTS links_mother_idx
    ON mother_calf_links(owner_id, animal_type_id, mother_animal_number);
CREATE INDEX IF NOT EXISTS samples_animal_idx
    ON lactation_samples(owner_id, animal_type_id, animal_number, created_at);

PRAGMA user_version = 1;
";
