use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_observations",
        sql: r#"
CREATE SEQUENCE IF NOT EXISTS observation_seq START 1;

CREATE TABLE IF NOT EXISTS observations (
    seq BIGINT PRIMARY KEY DEFAULT nextval('observation_seq'),
    symbol TEXT NOT NULL,
    price DOUBLE NOT NULL,
    ts TIMESTAMP NOT NULL,
    source TEXT,
    ingested_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS ingest_log (
    request_id TEXT NOT NULL,
    source TEXT NOT NULL,
    row_count BIGINT NOT NULL,
    status TEXT NOT NULL,
    timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_observations_ts ON observations(ts);
CREATE INDEX IF NOT EXISTS idx_observations_symbol_ts ON observations(symbol, ts);
"#,
    },
];

/// Apply pending migrations in order, recording each in `schema_migrations`.
pub fn apply_migrations(connection: &Connection) -> Result<usize, ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    let mut applied = 0;
    for migration in MIGRATIONS {
        let already: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            [migration.version],
            |row| row.get(0),
        )?;
        if already > 0 {
            continue;
        }

        connection.execute_batch(migration.sql)?;
        connection.execute(
            "INSERT INTO schema_migrations (version) VALUES (?)",
            [migration.version],
        )?;
        applied += 1;
    }

    Ok(applied)
}
