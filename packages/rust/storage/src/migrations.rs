//! SQL migration definitions for the TenderScan database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as one batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: tenders, ingest_runs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per tender document. Keyed logically by TenderNumber; uniqueness is
-- enforced by the existence check before every insert.
CREATE TABLE IF NOT EXISTS tenders (
    TenderNumber                TEXT NOT NULL,
    TenderEndSubmissionDateTime TEXT,
    ContactNumber               TEXT,
    TenderType                  TEXT,
    TenderOpeningDateTime       TEXT,
    ContactAddress              TEXT,
    NameOfWebSite               TEXT,
    CrawlingDateTime            TEXT,
    EarnestMoneyDeposite        TEXT,
    TenderEstimatedCost         TEXT,
    Address                     TEXT,
    RequirementWorkBrief        TEXT,
    TenderProdNo                TEXT,
    ContactPhone2               TEXT,
    TenderDetailWorkDescription TEXT,
    HTMLcontent                 TEXT,
    Document                    TEXT,
    OrganizationName            TEXT
);

CREATE INDEX IF NOT EXISTS idx_tenders_number ON tenders(TenderNumber);

-- Batch run history
CREATE TABLE IF NOT EXISTS ingest_runs (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    stats_json  TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
