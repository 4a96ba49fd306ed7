use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Config, Store};
use crate::test_util::{Faulty, Position};

fn small_store() -> Store<Position> {
    Store::new(Config { initial_capacity: 4, ..Config::default() })
}

#[test]
fn fix_assigns_dense_offsets() {
    let store = small_store();
    for entity in 1..=3 {
        let offset = store.fix_with(entity, Position::new(entity as f32, 0.0));
        assert_eq!(offset as u64 + 1, entity);
    }

    assert_eq!(store.len(), 3);
    assert_eq!(store.entity_at(1), 2);
    assert_eq!(store.entity_at(3), 0, "offsets past the dense prefix report no entity");
}

#[test]
fn growth_waits_for_the_hard_edge() {
    let store = small_store();

    for entity in 1..=4 {
        store.fix(entity);
        assert_eq!(store.capacity(), 4);
    }
    store.fix(5);
    assert_eq!(store.capacity(), 8, "the 5th fixation doubles capacity");

    for entity in 6..=8 {
        store.fix(entity);
        assert_eq!(store.capacity(), 8);
    }
    store.fix(9);
    assert_eq!(store.capacity(), 16, "the 9th fixation doubles capacity again");
}

#[test]
fn trigger_below_one_grows_early() {
    let store: Store<Position> = Store::new(Config {
        initial_capacity: 4,
        growth_trigger: 0.5,
        ..Config::default()
    });

    for entity in 1..=3 {
        store.fix(entity);
        assert_eq!(store.capacity(), 4, "offsets up to 2 stay within the trigger edge");
    }
    store.fix(4);
    assert_eq!(store.capacity(), 8, "offset 3 exceeds floor(4 * 0.5)");
}

#[test]
fn expand_grows_capacity_only() {
    let store = small_store();
    store.fix(1);

    assert_eq!(store.expand(12), 12);
    assert_eq!(store.capacity(), 16);
    assert_eq!(store.len(), 1);
}

#[test]
fn release_marks_without_compacting() {
    let store = small_store();
    for entity in 1..=3 {
        store.fix(entity);
    }
    let handle = store.handle_at(1).expect("offset 1 is live");

    assert!(store.release(1));
    assert_eq!(store.len(), 3, "release leaves the dense prefix untouched");
    assert_eq!(store.pending_cleanup(), 1);
    assert!(!handle.is_valid());
    assert_eq!(store.entity_at(1), 0, "released slots report no entity");

    assert!(!store.release(1), "double release is a no-op");
    assert!(!store.release(17), "out-of-range release is a no-op");
    assert_eq!(store.pending_cleanup(), 1);
}

#[test]
fn rearrange_compacts_and_relocates() {
    let store: Store<Position> = Store::default();
    let refs: Vec<_> = (1..=10)
        .map(|entity| {
            let offset = store.fix_with(entity, Position::new(entity as f32, 0.0));
            store.ref_at(offset).expect("just fixed")
        })
        .collect();

    for offset in [3, 5, 7] {
        assert!(store.release(offset));
    }
    store.rearrange();

    assert_eq!(store.len(), 7);
    assert_eq!(store.pending_cleanup(), 0);

    // surviving refs follow their slots wherever they moved
    for typed in refs.iter().filter(|typed| typed.is_valid()) {
        let entity = typed.entity();
        assert!(!matches!(entity, 4 | 6 | 8), "released entities must not survive");
        assert_eq!(typed.get().x, entity as f32);
    }

    // every live slot's handle points back at its own offset
    for offset in 0..store.len() {
        let handle = store.handle_at(offset).expect("compacted slots are live");
        assert_eq!(handle.offset(), offset);
        assert!(handle.is_valid());
    }
}

#[test]
fn rearrange_skips_holes_already_at_the_tail() {
    let store: Store<Position> = Store::default();
    let refs: Vec<_> = (1..=10)
        .map(|entity| {
            let offset = store.fix(entity);
            store.ref_at(offset).expect("just fixed")
        })
        .collect();

    assert!(store.release(8));
    assert!(store.release(9));
    store.rearrange();

    assert_eq!(store.len(), 8);
    for typed in &refs[..8] {
        assert!(typed.is_valid());
        assert_eq!(typed.handle().offset() as u64 + 1, typed.entity(), "no slot moved");
    }
}

#[test]
fn reuse_bumps_the_version() {
    let store = small_store();
    store.fix(1);
    let stale = store.handle_at(0).expect("offset 0 is live");
    let first_version = stale.version();
    assert_eq!(first_version, 1);

    store.release(0);
    store.rearrange();
    store.fix(2);

    let fresh = store.handle_at(0).expect("offset 0 was refixed");
    assert!(fresh.version() > first_version);
    assert!(!stale.is_valid(), "the stale handle must not validate against the reused slot");
    assert!(!store
        .locator()
        .not_null(first_version, 0), "the captured version is gone from offset 0");
}

#[test]
fn guards_validate_and_track_revisions() {
    let store = small_store();
    let offset = store.fix_with(7, Position::new(1.0, 2.0));
    let handle = store.handle_at(offset).expect("just fixed");
    let locator = store.locator();

    assert_eq!(locator.revision_at(offset), 0, "fixation resets the revision");
    assert_eq!(store.read(&handle).expect("live handle").y, 2.0);
    assert_eq!(locator.revision_at(offset), 0, "reading does not touch the revision");

    store.write(&handle).expect("live handle").x = 9.0;
    assert_eq!(locator.revision_at(offset), 1, "writing bumps the revision");
    assert_eq!(store.read(&handle).expect("live handle").x, 9.0);

    assert_eq!(locator.bump_revision(offset), 2, "an explicit bump returns the new value");
    assert_eq!(locator.bump_revision(99), 0, "out of range bumps report 0");

    store.release(offset);
    assert!(store.read(&handle).is_none(), "released handles fail the read guard");
    assert!(store.write(&handle).is_none(), "released handles fail the write guard");
}

#[test]
fn guards_reject_foreign_handles() {
    let store = small_store();
    let other = small_store();
    store.fix(1);
    other.fix(1);

    let foreign = other.handle_at(0).expect("just fixed");
    assert!(store.read(&foreign).is_none());
    assert!(store.write(&foreign).is_none());
}

#[test]
fn hook_panics_are_swallowed() {
    let store: Store<Faulty> = Store::default();
    let offset =
        store.fix_with(1, Faulty { panic_on_create: true, panic_on_destroy: true });

    assert_eq!(store.len(), 1, "the slot is live even though on_create panicked");
    assert!(store.handle_at(offset).expect("live slot").is_valid());

    assert!(store.release(offset), "release completes even though on_destroy panicked");
    assert_eq!(store.pending_cleanup(), 1);
}

#[test]
fn locator_is_inert_after_the_store_drops() {
    let store = small_store();
    store.fix_with(5, Position::new(1.0, 1.0));
    let handle = store.handle_at(0).expect("just fixed");
    let locator = store.locator();
    drop(store);

    assert!(!handle.is_valid());
    assert!(!locator.not_null(1, 0));
    assert_eq!(locator.entity_at(0), 0);
    assert_eq!(locator.revision_at(0), 0);
    assert_eq!(locator.bump_revision(0), 0);
    assert!(locator.handle_at(0).is_none());
}

#[test]
fn for_each_skips_released_slots() {
    let store = small_store();
    for entity in 1..=4 {
        store.fix_with(entity, Position::new(entity as f32, 0.0));
    }
    store.release(2);

    let mut seen = Vec::new();
    store.for_each(|offset, entity, value| seen.push((offset, entity, value.x)));
    assert_eq!(seen, vec![(0, 1, 1.0), (1, 2, 2.0), (3, 4, 4.0)]);

    store.for_each_mut(|_, _, value| value.x += 10.0);
    let locator = store.locator();
    assert_eq!(locator.revision_at(0), 1, "mutable visits bump the revision");
    assert_eq!(locator.revision_at(2), 0, "released slots are not visited");
}

// Random fix/release/rearrange churn; every surviving ref must keep resolving
// to its own payload, and compaction must keep the prefix dense.
#[test]
fn random_churn_preserves_live_refs() {
    let mut rng = StdRng::seed_from_u64(0x510_7ec);
    let store: Store<Position> =
        Store::new(Config { initial_capacity: 8, ..Config::default() });
    let mut live = Vec::new();
    let mut next_entity: u64 = 1;

    for step in 0_u32..2000 {
        match rng.gen_range(0_u32..10) {
            0..=5 => {
                let entity = next_entity;
                next_entity += 1;
                let offset =
                    store.fix_with(entity, Position::new(entity as f32, -(entity as f32)));
                live.push(store.ref_at(offset).expect("just fixed"));
            }
            6..=8 if !live.is_empty() => {
                let index = rng.gen_range(0..live.len());
                let typed = live.swap_remove(index);
                assert!(store.release(typed.handle().offset()));
            }
            9 => {
                store.rearrange();
                assert_eq!(store.len(), live.len());
            }
            _ => {}
        }

        if step % 64 == 0 {
            for typed in &live {
                let entity = typed.entity();
                let value = typed.get();
                assert_eq!(value.x, entity as f32);
                assert_eq!(value.y, -(entity as f32));
            }
        }
    }

    store.rearrange();
    assert_eq!(store.len(), live.len());

    let mut offsets: Vec<_> = live.iter().map(|typed| typed.handle().offset()).collect();
    offsets.sort_unstable();
    assert_eq!(offsets, (0..live.len()).collect::<Vec<_>>(), "live offsets form a dense prefix");
}
