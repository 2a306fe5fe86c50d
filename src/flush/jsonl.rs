use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::persist::LedgerSnapshot;

pub const FACTIONS_FILE: &str = "factions.jsonl";
pub const LANDS_FILE: &str = "lands.jsonl";
pub const RELATIONS_FILE: &str = "relations.jsonl";

/// Write an iterator of serializable items to a JSONL file (one JSON object per line).
fn write_jsonl<T: Serialize>(path: &Path, items: impl Iterator<Item = T>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, &item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Read a JSONL file. A missing file reads as empty; blank lines are skipped.
fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let mut items = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        items.push(serde_json::from_str(&line)?);
    }
    Ok(items)
}

/// Flush a ledger snapshot to JSONL files in the given output directory.
///
/// Creates the output directory if it does not exist. Writes 3 files:
/// - `factions.jsonl`: one faction per line, invitations left out
/// - `lands.jsonl`: one claimed cell per line
/// - `relations.jsonl`: one non-neutral edge per line, pair in canonical order
pub fn flush_to_jsonl(snapshot: &LedgerSnapshot, output_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;

    write_jsonl(&output_dir.join(FACTIONS_FILE), snapshot.factions.iter())?;
    write_jsonl(&output_dir.join(LANDS_FILE), snapshot.lands.iter())?;
    write_jsonl(&output_dir.join(RELATIONS_FILE), snapshot.relations.iter())?;

    tracing::debug!(dir = %output_dir.display(), "snapshot flushed to jsonl");
    Ok(())
}

/// Read back what [`flush_to_jsonl`] wrote. Missing files read as empty, so
/// a fresh directory yields an empty snapshot.
pub fn load_from_jsonl(input_dir: &Path) -> Result<LedgerSnapshot, StoreError> {
    Ok(LedgerSnapshot {
        factions: read_jsonl(&input_dir.join(FACTIONS_FILE))?,
        lands: read_jsonl(&input_dir.join(LANDS_FILE))?,
        relations: read_jsonl(&input_dir.join(RELATIONS_FILE))?,
    })
}
