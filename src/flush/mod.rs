mod jsonl;

pub use jsonl::{FACTIONS_FILE, LANDS_FILE, RELATIONS_FILE, flush_to_jsonl, load_from_jsonl};
