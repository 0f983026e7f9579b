use std::rc::Rc;

use crate::diff::{diff, ListUpdate};

#[derive(Debug)]
struct Item {
    id: u64,
    rev: u32,
}

fn items(pairs: &[(u64, u32)]) -> Vec<Rc<Item>> {
    pairs
        .iter()
        .map(|&(id, rev)| Rc::new(Item { id, rev }))
        .collect()
}

fn run(old: &[(u64, u32)], new: &[(u64, u32)]) -> Vec<ListUpdate> {
    diff(
        &items(old),
        &items(new),
        &|a: &Item, b: &Item| a.id == b.id,
        &|a: &Item, b: &Item| a.id == b.id && a.rev == b.rev,
    )
}

#[test]
fn identical_snapshots_produce_nothing() {
    assert!(run(&[(1, 0), (2, 0)], &[(1, 0), (2, 0)]).is_empty());
}

#[test]
fn append_is_a_tail_insert() {
    assert_eq!(
        run(&[(1, 0)], &[(1, 0), (2, 0)]),
        vec![ListUpdate::Inserted { index: 1, count: 1 }]
    );
}

#[test]
fn first_population_inserts_everything() {
    assert_eq!(
        run(&[], &[(1, 0), (2, 0), (3, 0)]),
        vec![ListUpdate::Inserted { index: 0, count: 3 }]
    );
}

#[test]
fn clearing_removes_everything() {
    assert_eq!(
        run(&[(1, 0), (2, 0)], &[]),
        vec![ListUpdate::Removed { index: 0, count: 2 }]
    );
}

#[test]
fn middle_removal_is_positional() {
    assert_eq!(
        run(&[(1, 0), (2, 0), (3, 0)], &[(1, 0), (3, 0)]),
        vec![ListUpdate::Removed { index: 1, count: 1 }]
    );
}

#[test]
fn middle_insertion_is_positional() {
    assert_eq!(
        run(&[(1, 0), (3, 0)], &[(1, 0), (2, 0), (3, 0)]),
        vec![ListUpdate::Inserted { index: 1, count: 1 }]
    );
}

#[test]
fn content_change_inside_stable_prefix() {
    assert_eq!(
        run(&[(1, 0), (2, 0), (3, 0)], &[(1, 0), (2, 1), (3, 0)]),
        vec![ListUpdate::Changed { index: 1, count: 1 }]
    );
}

#[test]
fn adjacent_content_changes_coalesce() {
    assert_eq!(
        run(
            &[(1, 0), (2, 0), (3, 0), (4, 0)],
            &[(1, 0), (2, 1), (3, 1), (4, 0)],
        ),
        vec![ListUpdate::Changed { index: 1, count: 2 }]
    );
}

#[test]
fn separated_content_changes_stay_separate() {
    assert_eq!(
        run(
            &[(1, 0), (2, 0), (3, 0)],
            &[(1, 1), (2, 0), (3, 1)],
        ),
        vec![
            ListUpdate::Changed { index: 0, count: 1 },
            ListUpdate::Changed { index: 2, count: 1 },
        ]
    );
}

#[test]
fn unstable_middle_is_replaced_wholesale() {
    assert_eq!(
        run(
            &[(1, 0), (2, 0), (3, 0), (4, 0)],
            &[(1, 0), (7, 0), (8, 0), (9, 0), (4, 0)],
        ),
        vec![
            ListUpdate::Removed { index: 1, count: 2 },
            ListUpdate::Inserted { index: 1, count: 3 },
        ]
    );
}

#[test]
fn suffix_changes_use_new_indices() {
    assert_eq!(
        run(&[(1, 0), (2, 0), (3, 0)], &[(9, 0), (2, 1), (3, 0)]),
        vec![
            ListUpdate::Removed { index: 0, count: 1 },
            ListUpdate::Inserted { index: 0, count: 1 },
            ListUpdate::Changed { index: 1, count: 1 },
        ]
    );
}
