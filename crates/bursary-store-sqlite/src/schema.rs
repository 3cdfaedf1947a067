//! SQL schema for the Bursary SQLite store.
//!
//! Money is stored as INTEGER cents, timestamps as RFC 3339 TEXT, uuids as
//! hyphenated lowercase TEXT. The CHECK constraints on the balance columns
//! back up the ledger invariants at the storage level.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS donors (
    donor_id           TEXT PRIMARY KEY,
    name               TEXT NOT NULL,
    email              TEXT NOT NULL UNIQUE,
    total_donated      INTEGER NOT NULL DEFAULT 0 CHECK (total_donated >= 0),
    students_supported INTEGER NOT NULL DEFAULT 0,
    impact_score       INTEGER NOT NULL DEFAULT 0,
    is_active          INTEGER NOT NULL DEFAULT 1,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    student_id          TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    email               TEXT NOT NULL UNIQUE,
    school              TEXT NOT NULL,
    major               TEXT NOT NULL,
    location            TEXT NOT NULL,
    graduation_year     INTEGER NOT NULL,
    bio                 TEXT NOT NULL DEFAULT '',
    urgency             TEXT NOT NULL DEFAULT 'medium',
    funding_goal        INTEGER NOT NULL DEFAULT 0,
    -- Written only by the ledger operations; never negative.
    amount_raised       INTEGER NOT NULL DEFAULT 0 CHECK (amount_raised >= 0),
    total_donations     INTEGER NOT NULL DEFAULT 0,
    registration_status TEXT NOT NULL DEFAULT 'incomplete',
    verified            INTEGER NOT NULL DEFAULT 0,
    is_active           INTEGER NOT NULL DEFAULT 1,
    public_profile      INTEGER NOT NULL DEFAULT 1,
    last_active         TEXT NOT NULL,
    created_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS registry_items (
    item_id       TEXT PRIMARY KEY,
    student_id    TEXT NOT NULL REFERENCES students(student_id),
    name          TEXT NOT NULL,
    description   TEXT NOT NULL DEFAULT '',
    price         INTEGER NOT NULL CHECK (price > 0),
    -- The funding guard keeps amount_funded <= price.
    amount_funded INTEGER NOT NULL DEFAULT 0 CHECK (amount_funded >= 0),
    funded_status TEXT NOT NULL DEFAULT 'needed',  -- needed | partial | funded
    created_at    TEXT NOT NULL
);

-- Data records only: nothing in this codebase consumes next_payment_date
-- to trigger charges.
CREATE TABLE IF NOT EXISTS recurring_donations (
    recurring_id      TEXT PRIMARY KEY,
    donor_id          TEXT NOT NULL REFERENCES donors(donor_id),
    student_id        TEXT NOT NULL REFERENCES students(student_id),
    amount            INTEGER NOT NULL CHECK (amount > 0),
    frequency         TEXT NOT NULL,   -- weekly | monthly | quarterly | yearly
    active            INTEGER NOT NULL DEFAULT 1,
    next_payment_date TEXT NOT NULL,
    created_at        TEXT NOT NULL,
    cancelled_at      TEXT
);

-- Source of truth for all money movement. Denormalized balances elsewhere
-- are derivable from this table; reconciliation checks them.
CREATE TABLE IF NOT EXISTS donations (
    donation_id        TEXT PRIMARY KEY,
    student_id         TEXT NOT NULL REFERENCES students(student_id),
    donor_id           TEXT REFERENCES donors(donor_id),          -- NULL = anonymous
    amount             INTEGER NOT NULL CHECK (amount > 0),
    net_amount         INTEGER NOT NULL,
    status             TEXT NOT NULL,   -- pending | completed | failed | refunded
    donation_type      TEXT NOT NULL,   -- general | item | emergency | registration_fee
    payment_method     TEXT NOT NULL,   -- card | zelle | other
    target_registry_id TEXT REFERENCES registry_items(item_id),
    recurring_id       TEXT REFERENCES recurring_donations(recurring_id),
    receipt_number     TEXT NOT NULL UNIQUE,
    created_at         TEXT NOT NULL,
    processed_at       TEXT,
    refund_amount      INTEGER CHECK (refund_amount IS NULL OR refund_amount <= amount),
    refund_reason      TEXT,
    refunded_at        TEXT
);

-- One verification per student; resubmission after rejection overwrites
-- the same row.
CREATE TABLE IF NOT EXISTS school_verifications (
    verification_id  TEXT PRIMARY KEY,
    student_id       TEXT NOT NULL UNIQUE REFERENCES students(student_id),
    school_id        TEXT NOT NULL REFERENCES schools(school_id),
    document_url     TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'pending',  -- pending | approved | rejected
    rejection_reason TEXT,
    submitted_at     TEXT NOT NULL,
    reviewed_at      TEXT
);

CREATE TABLE IF NOT EXISTS bookmarks (
    donor_id   TEXT NOT NULL REFERENCES donors(donor_id),
    student_id TEXT NOT NULL REFERENCES students(student_id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (donor_id, student_id)
);

CREATE TABLE IF NOT EXISTS schools (
    school_id TEXT PRIMARY KEY,
    name      TEXT NOT NULL UNIQUE,
    city      TEXT NOT NULL,
    state     TEXT NOT NULL
);

-- Audit trail written alongside admin mutations.
CREATE TABLE IF NOT EXISTS admin_actions (
    action_id  TEXT PRIMARY KEY,
    admin_id   TEXT NOT NULL,
    action     TEXT NOT NULL,
    target_id  TEXT NOT NULL,
    detail     TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS credentials (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL,
    role          TEXT NOT NULL,   -- donor | student | admin | super_admin
    password_hash TEXT NOT NULL,
    UNIQUE (email, role)
);

CREATE INDEX IF NOT EXISTS donations_student_idx   ON donations(student_id);
CREATE INDEX IF NOT EXISTS donations_donor_idx     ON donations(donor_id);
CREATE INDEX IF NOT EXISTS donations_status_idx    ON donations(status);
CREATE INDEX IF NOT EXISTS donations_processed_idx ON donations(processed_at);
CREATE INDEX IF NOT EXISTS registry_student_idx    ON registry_items(student_id);
CREATE INDEX IF NOT EXISTS recurring_donor_idx     ON recurring_donations(donor_id);
CREATE INDEX IF NOT EXISTS students_school_idx     ON students(school);

PRAGMA user_version = 1;
";
