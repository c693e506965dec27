//! SQL schema for the freight SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Identity collaborator: one role per user.
CREATE TABLE IF NOT EXISTS user_roles (
    user_id    TEXT PRIMARY KEY,
    role_id    TEXT NOT NULL,
    role_name  TEXT NOT NULL
);

-- Commission rate table. Read-only from the engine's point of view.
CREATE TABLE IF NOT EXISTS role_commissions (
    role_id          TEXT NOT NULL,
    billing_cycle    TEXT NOT NULL,   -- 'hourly' | 'weekly' | 'monthly'
    commission_type  TEXT NOT NULL,   -- 'percentage' | 'fixed_amount'
    percent          REAL NOT NULL DEFAULT 0,
    fixed_amount     INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (role_id, billing_cycle)
);

CREATE TABLE IF NOT EXISTS jobs (
    job_id           TEXT PRIMARY KEY,
    posted_by        TEXT NOT NULL,
    title            TEXT NOT NULL,
    pay_amount       INTEGER NOT NULL,
    billing_cycle    TEXT NOT NULL,
    assignment_type  TEXT NOT NULL,   -- 'auto' | 'manual'
    status           TEXT NOT NULL,
    parent_job_id    TEXT REFERENCES jobs(job_id),
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS job_applications (
    application_id  TEXT PRIMARY KEY,
    job_id          TEXT NOT NULL REFERENCES jobs(job_id),
    applicant_id    TEXT NOT NULL,
    status          TEXT NOT NULL,
    proposed_rate   INTEGER,
    cover_letter    TEXT,
    notes           TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- At most one live application per (job, applicant). Rejected and
-- withdrawn rows do not block re-application.
CREATE UNIQUE INDEX IF NOT EXISTS applications_live_idx
    ON job_applications(job_id, applicant_id)
    WHERE status IN ('pending', 'accepted');

-- Contracts are never deleted; their lifecycle ends at completed/cancelled.
CREATE TABLE IF NOT EXISTS contracts (
    contract_id                  TEXT PRIMARY KEY,
    job_id                       TEXT NOT NULL REFERENCES jobs(job_id),
    application_id               TEXT NOT NULL REFERENCES job_applications(application_id),
    hired_by_user_id             TEXT NOT NULL,
    hired_user_id                TEXT NOT NULL,
    amount                       INTEGER NOT NULL,
    status                       TEXT NOT NULL,
    billing_cycle                TEXT NOT NULL,
    parent_contract_id           TEXT REFERENCES contracts(contract_id),
    commission_type              TEXT NOT NULL,
    platform_commission_percent  REAL NOT NULL DEFAULT 0,
    platform_commission_amount   INTEGER,
    created_at                   TEXT NOT NULL,
    updated_at                   TEXT NOT NULL,
    completed_at                 TEXT
);

CREATE TABLE IF NOT EXISTS contract_participants (
    contract_id  TEXT NOT NULL REFERENCES contracts(contract_id),
    user_id      TEXT NOT NULL,
    role         TEXT NOT NULL,
    status       TEXT NOT NULL,   -- 'active' | 'removed' | 'invited'
    joined_at    TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    PRIMARY KEY (contract_id, user_id)
);

-- Append-only audit trail of participant changes.
CREATE TABLE IF NOT EXISTS participant_history (
    event_id     TEXT PRIMARY KEY,
    contract_id  TEXT NOT NULL REFERENCES contracts(contract_id),
    user_id      TEXT NOT NULL,
    action       TEXT NOT NULL,   -- 'added' | 'removed' | 'role_changed' | 'status_changed'
    before_json  TEXT,
    after_json   TEXT,
    actor_id     TEXT NOT NULL,
    recorded_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sub_contracts (
    id                           TEXT PRIMARY KEY,
    root_contract_id             TEXT NOT NULL REFERENCES contracts(contract_id),
    parent_contract_id           TEXT NOT NULL REFERENCES contracts(contract_id),
    sub_contract_id              TEXT NOT NULL UNIQUE REFERENCES contracts(contract_id),
    reshared_job_id              TEXT NOT NULL REFERENCES jobs(job_id),
    split_percentage             REAL NOT NULL,
    split_amount                 INTEGER NOT NULL,
    commission_type              TEXT NOT NULL,
    platform_commission_percent  REAL NOT NULL DEFAULT 0,
    platform_commission_amount   INTEGER NOT NULL DEFAULT 0,
    created_at                   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS payouts (
    payout_id          TEXT PRIMARY KEY,
    root_contract_id   TEXT NOT NULL REFERENCES contracts(contract_id),
    party_user_id      TEXT NOT NULL,
    contract_ids       TEXT NOT NULL,   -- JSON array of contract UUIDs
    gross              INTEGER NOT NULL,
    deductions         INTEGER NOT NULL,
    platform_fee       INTEGER NOT NULL,
    net                INTEGER NOT NULL CHECK (net >= 0),
    recorded_at        TEXT NOT NULL
);

-- Collaboration channel bootstrap: one conversation per job.
CREATE TABLE IF NOT EXISTS conversations (
    conversation_id  TEXT PRIMARY KEY,
    job_id           TEXT NOT NULL UNIQUE,
    title            TEXT NOT NULL,
    participants     TEXT NOT NULL,   -- JSON array of user UUIDs
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conversation_messages (
    message_id       TEXT PRIMARY KEY,
    conversation_id  TEXT NOT NULL REFERENCES conversations(conversation_id),
    body             TEXT NOT NULL,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS jobs_parent_idx            ON jobs(parent_job_id);
CREATE INDEX IF NOT EXISTS applications_job_idx       ON job_applications(job_id);
CREATE INDEX IF NOT EXISTS contracts_job_idx          ON contracts(job_id);
CREATE INDEX IF NOT EXISTS contracts_parent_idx       ON contracts(parent_contract_id);
CREATE INDEX IF NOT EXISTS sub_contracts_parent_idx   ON sub_contracts(parent_contract_id);
CREATE INDEX IF NOT EXISTS participants_user_idx      ON contract_participants(user_id);
CREATE INDEX IF NOT EXISTS history_contract_idx       ON participant_history(contract_id);

PRAGMA user_version = 1;
";
