use serde::Serialize;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::persist::LedgerSnapshot;

/// Bulk-load a snapshot into empty tables using COPY FROM STDIN (text format).
///
/// Intended for seeding a fresh database, e.g. when moving from JSONL files
/// to Postgres. Existing rows with the same keys make the COPY fail.
pub async fn copy_snapshot(pool: &PgPool, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
    // Factions
    {
        let mut buf = String::new();
        for f in &snapshot.factions {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\n",
                f.id(),
                escape(f.name()),
                escape(&enum_str(&f.kind())?),
                escape(&serde_json::to_string(f)?),
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_factions.sql"), &buf).await?;
    }

    // Lands
    {
        let mut buf = String::new();
        for land in &snapshot.lands {
            let key = land.key();
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                escape(&key.world),
                key.dimension,
                key.x,
                key.z,
                land.claimer_id(),
                escape(&array_literal(&land.owners())),
            ));
        }
        copy_in(pool, include_str!("../../sql/copy_lands.sql"), &buf).await?;
    }

    // Relations
    {
        let mut buf = String::new();
        for r in &snapshot.relations {
            buf.push_str(&format!("{}\t{}\t{}\n", r.one(), r.two(), r.kind));
        }
        copy_in(pool, include_str!("../../sql/copy_relations.sql"), &buf).await?;
    }

    tracing::info!(
        factions = snapshot.factions.len(),
        lands = snapshot.lands.len(),
        relations = snapshot.relations.len(),
        "snapshot copied into postgres"
    );
    Ok(())
}

/// Execute a COPY FROM STDIN with the given text-format payload.
async fn copy_in(pool: &PgPool, statement: &str, data: &str) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let mut copy = conn.copy_in_raw(statement).await?;
    copy.send(data.as_bytes()).await?;
    copy.finish().await?;
    Ok(())
}

/// Escape a string for Postgres COPY text format.
/// Backslash must be escaped first, then the special whitespace characters.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Render strings as a Postgres array literal, every element quoted.
fn array_literal(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|s| format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{{{}}}", quoted.join(","))
}

/// Serialize a serde enum variant to its snake_case string (strips JSON quotes).
pub(crate) fn enum_str<T: Serialize>(val: &T) -> Result<String, StoreError> {
    match serde_json::to_value(val)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(StoreError::Corrupt(format!("expected a unit variant, got {other}"))),
    }
}
