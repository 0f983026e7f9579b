//! Minimal list diffing.
//!
//! Computes positional updates between two snapshots by trimming the
//! identity-stable prefix and suffix and replacing the middle wholesale.
//! Inside the stable regions, runs of content-unequal items are coalesced
//! into `Changed` ranges. Indices refer to the new snapshot except for
//! `Removed`, whose index is the position the run occupied before removal.

use std::rc::Rc;

/// One positional update against the previously committed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListUpdate {
    Inserted { index: usize, count: usize },
    Removed { index: usize, count: usize },
    Changed { index: usize, count: usize },
}

pub(crate) fn diff<T>(
    old: &[Rc<T>],
    new: &[Rc<T>],
    same_identity: &dyn Fn(&T, &T) -> bool,
    same_content: &dyn Fn(&T, &T) -> bool,
) -> Vec<ListUpdate> {
    let mut prefix = 0;
    while prefix < old.len()
        && prefix < new.len()
        && same_identity(&old[prefix], &new[prefix])
    {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < old.len() - prefix
        && suffix < new.len() - prefix
        && same_identity(&old[old.len() - 1 - suffix], &new[new.len() - 1 - suffix])
    {
        suffix += 1;
    }

    let mut updates = Vec::new();
    push_changed_runs(&mut updates, (0..prefix).filter_map(|i| {
        (!same_content(&old[i], &new[i])).then_some(i)
    }));

    let old_mid = old.len() - prefix - suffix;
    let new_mid = new.len() - prefix - suffix;
    if old_mid > 0 {
        updates.push(ListUpdate::Removed {
            index: prefix,
            count: old_mid,
        });
    }
    if new_mid > 0 {
        updates.push(ListUpdate::Inserted {
            index: prefix,
            count: new_mid,
        });
    }

    let old_base = old.len() - suffix;
    let new_base = new.len() - suffix;
    push_changed_runs(&mut updates, (0..suffix).filter_map(|k| {
        (!same_content(&old[old_base + k], &new[new_base + k])).then_some(new_base + k)
    }));

    updates
}

/// Coalesces ascending changed indices into contiguous `Changed` ranges.
fn push_changed_runs(updates: &mut Vec<ListUpdate>, indices: impl Iterator<Item = usize>) {
    let mut run: Option<(usize, usize)> = None;
    for index in indices {
        match &mut run {
            Some((start, count)) if *start + *count == index => *count += 1,
            _ => {
                if let Some((index, count)) = run.take() {
                    updates.push(ListUpdate::Changed { index, count });
                }
                run = Some((index, 1));
            }
        }
    }
    if let Some((index, count)) = run {
        updates.push(ListUpdate::Changed { index, count });
    }
}
