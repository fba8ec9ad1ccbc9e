pub const SCHEMA: &str = r#"
-- news table
CREATE TABLE IF NOT EXISTS news (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    published_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'processed')),
    processed_at TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_news_status ON news(status);
CREATE INDEX IF NOT EXISTS idx_news_published_at ON news(published_at DESC);

-- generated_artifacts table (source_news_ids is a comma-separated id list)
CREATE TABLE IF NOT EXISTS generated_artifacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    hashtags TEXT NOT NULL,
    description TEXT NOT NULL,
    body TEXT NOT NULL,
    source_news_ids TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'sent_to_schedule')),
    schedule_id INTEGER,
    generated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_generated_artifacts_status ON generated_artifacts(status, generated_at);
"#;

/// Table owned by the downstream scheduler. Created only when it is missing so
/// a fresh schedule database can be used locally.
pub const SCHEDULE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schedules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    hashtags TEXT NOT NULL,
    description TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
);
"#;
