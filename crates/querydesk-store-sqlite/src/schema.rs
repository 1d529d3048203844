//! SQL schema for the querydesk SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS queries (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    query_id           TEXT NOT NULL UNIQUE,   -- natural key from the sheet
    ghaid              TEXT,
    scrn_id            TEXT,
    mom_id             TEXT,
    preg_id            TEXT,
    infant_id          TEXT,
    visit_type         TEXT,
    visit_date         TEXT,                   -- YYYY-MM-DD
    form               TEXT,
    variable_name      TEXT,
    variable_value     TEXT,
    edit_type          TEXT,
    upload_date        TEXT,                   -- YYYY-MM-DD
    field_type         TEXT,
    date_edit_reported TEXT,                   -- YYYY-MM-DD
    form_edit_type     TEXT,
    var_form_edit      TEXT,
    remove_edit        TEXT,
    notes              TEXT,
    status             TEXT NOT NULL DEFAULT 'Pending'
                       CHECK (status IN ('Pending', 'In Progress', 'Resolved', 'Closed')),
    created_at         TEXT NOT NULL,          -- RFC 3339 UTC
    updated_at         TEXT NOT NULL           -- RFC 3339 UTC
);

CREATE INDEX IF NOT EXISTS queries_status_idx     ON queries(status);
CREATE INDEX IF NOT EXISTS queries_form_idx       ON queries(form);
CREATE INDEX IF NOT EXISTS queries_edit_type_idx  ON queries(edit_type);
CREATE INDEX IF NOT EXISTS queries_visit_type_idx ON queries(visit_type);

PRAGMA user_version = 1;
";
