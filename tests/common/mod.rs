#![allow(dead_code)]

use faction_ledger::{FactionId, LandKey, Ledger, LedgerConfig, PersistQueue, RelationKind};

pub struct TestWorld {
    pub ledger: Ledger,
    pub reds: FactionId,
    pub blues: FactionId,
    pub greens: FactionId,
}

pub fn key(x: i32, z: i32) -> LandKey {
    LandKey::new(x, z, "world", 0)
}

/// Three factions with a few claims and relations:
/// - Reds: alice (admin), mia (mod), bob (member); claims (3,-2) and (4,-2)
/// - Blues: carol (admin); claims (10,10); allied with Reds
/// - Greens: gus (admin); enemy of Reds
pub fn build_test_ledger_with(config: LedgerConfig, queue: PersistQueue) -> TestWorld {
    let ledger = Ledger::new(config, queue);
    let reds = ledger.create_faction("alice", "Reds").unwrap();
    let blues = ledger.create_faction("carol", "Blues").unwrap();
    let greens = ledger.create_faction("gus", "Greens").unwrap();

    ledger.invite("alice", "bob").unwrap();
    ledger.join("bob", "Reds").unwrap();
    ledger.invite("alice", "mia").unwrap();
    ledger.join("mia", "Reds").unwrap();
    ledger.toggle_mod("alice", "mia").unwrap();

    ledger.claim_here("alice", &key(3, -2)).unwrap();
    ledger.claim_here("mia", &key(4, -2)).unwrap();
    ledger.claim_here("carol", &key(10, 10)).unwrap();

    ledger.declare("alice", "Blues", RelationKind::Ally).unwrap();
    ledger.declare("gus", "Reds", RelationKind::Enemy).unwrap();

    TestWorld {
        ledger,
        reds,
        blues,
        greens,
    }
}

pub fn build_test_ledger() -> TestWorld {
    build_test_ledger_with(LedgerConfig::default(), PersistQueue::disabled())
}

pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
