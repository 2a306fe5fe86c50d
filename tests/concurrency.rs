mod common;

use std::sync::Arc;
use std::thread;

use common::{build_test_ledger, build_test_ledger_with, key};
use faction_ledger::{LedgerConfig, LedgerError, PersistQueue, PersistRequest, Rank, RelationKind};

#[test]
fn racing_first_lookups_share_one_cell() {
    let world = build_test_ledger();
    let ledger = Arc::new(world.ledger);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.lands().land_at(&key(77, 77)))
        })
        .collect();
    let cells: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for cell in &cells[1..] {
        assert!(Arc::ptr_eq(&cells[0], cell));
    }
}

#[test]
fn contested_cell_has_exactly_one_claimer() {
    let world = build_test_ledger();
    let ledger = Arc::new(world.ledger);
    let contenders = ["alice", "carol", "gus"];

    let handles: Vec<_> = contenders
        .iter()
        .map(|actor| {
            let ledger = Arc::clone(&ledger);
            let actor = actor.to_string();
            thread::spawn(move || ledger.claim_here(&actor, &key(50, 50)))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for result in &results {
        if let Err(err) = result {
            assert_eq!(err, &LedgerError::AlreadyClaimed(*winners[0]));
        }
    }
    assert_eq!(ledger.lands().claimer_of(&key(50, 50)), *winners[0]);
}

#[test]
fn concurrent_claims_and_reads_stay_consistent() {
    let world = build_test_ledger();
    let reds = world.reds;
    let ledger = Arc::new(world.ledger);

    let writer = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || {
            for x in 0..200 {
                ledger.claim_here("alice", &key(x, 500)).unwrap();
                if x % 2 == 0 {
                    ledger.unclaim_here("alice", &key(x, 500)).unwrap();
                }
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for x in 0..200 {
                    let claimer = ledger.lands().claimer_of(&key(x, 500));
                    assert!(claimer == reds || claimer.is_wilderness());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    // Two cells from the fixture plus the 100 odd columns.
    assert_eq!(ledger.lands().count_of(reds), 102);
}

#[test]
fn declarations_from_both_sides_do_not_deadlock() {
    let (queue, mut rx) = PersistQueue::channel();
    let world = build_test_ledger_with(LedgerConfig::default(), queue);
    let ledger = Arc::new(world.ledger);

    let a = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || {
            for i in 0..500 {
                let kind = if i % 2 == 0 { RelationKind::Ally } else { RelationKind::Neutral };
                ledger.declare("alice", "Blues", kind).unwrap();
            }
        })
    };
    let b = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || {
            for i in 0..500 {
                let kind = if i % 2 == 0 { RelationKind::Enemy } else { RelationKind::Ally };
                ledger.declare("carol", "Reds", kind).unwrap();
            }
        })
    };
    a.join().unwrap();
    b.join().unwrap();

    let stored = ledger
        .relations()
        .relations()
        .into_iter()
        .filter(|r| r.is_involved(world.blues) && r.is_involved(world.reds))
        .count();
    assert!(stored <= 1);

    // The last queued write for the pair must match memory, or a store
    // worker would persist a stale relation.
    let pair = if world.reds < world.blues {
        (world.reds, world.blues)
    } else {
        (world.blues, world.reds)
    };
    let mut last = None;
    while let Ok(request) = rx.try_recv() {
        match request {
            PersistRequest::SaveRelation(r) if r.pair() == pair => last = Some(r.kind),
            PersistRequest::DeleteRelation(one, two) if (one, two) == pair => {
                last = Some(RelationKind::Neutral)
            }
            _ => {}
        }
    }
    assert_eq!(last, Some(ledger.relation_between(world.reds, world.blues)));
}

#[test]
fn disband_racing_with_transfer_admin_has_one_winner() {
    for _ in 0..200 {
        let world = build_test_ledger();
        let reds = world.reds;
        let ledger = Arc::new(world.ledger);

        let disbander = {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.disband("alice").map(|_| ()))
        };
        let transferrer = {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.transfer_admin("alice", "mia"))
        };
        let disbanded = disbander.join().unwrap();
        let transferred = transferrer.join().unwrap();

        match (disbanded, transferred) {
            (Ok(()), Err(LedgerError::NoFaction { .. })) => {
                assert!(ledger.factions().get(reds).is_none());
                assert_eq!(ledger.factions().faction_id_of("mia"), None);
            }
            (Err(LedgerError::InsufficientRank { .. }), Ok(())) => {
                let faction = ledger.factions().get(reds).unwrap();
                let faction = faction.read();
                assert_eq!(faction.admin(), "mia");
                assert_eq!(faction.rank("alice"), Ok(Rank::Mod));
            }
            other => panic!("expected exactly one of disband and transfer to win, got {other:?}"),
        }
    }
}

#[test]
fn disband_racing_with_claims_leaves_no_orphans() {
    for _ in 0..20 {
        let world = build_test_ledger();
        let reds = world.reds;
        let ledger = Arc::new(world.ledger);

        let claimer = {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for x in 0..50 {
                    // Fails once the faction is gone.
                    let _ = ledger.claim_here("mia", &key(x, 900));
                }
            })
        };
        let disbander = {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.disband("alice").unwrap())
        };
        claimer.join().unwrap();
        disbander.join().unwrap();

        assert!(ledger.lands_of(reds).is_empty());
    }
}
