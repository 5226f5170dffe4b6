//! Keyed Children Diff
//!
//! Children are reconciled from both ends inward:
//!
//! 1. Prefix scan: patch pairs of the same type from the start.
//! 2. Suffix scan: patch pairs of the same type from the end.
//! 3. If only new children remain, mount them. If only old children remain,
//!    unmount them.
//! 4. Otherwise pair the remaining children by key (unkeyed children by
//!    type), unmount old children without a partner, and patch the pairs.
//!    Then walk the new range backwards, mounting unpaired children and
//!    moving paired ones that are not part of the longest increasing
//!    subsequence of old positions. That subsequence already sits in the
//!    right relative order, so it is never touched.
//!
//! All ranges use exclusive upper bounds.

use std::collections::HashMap;

use super::{first_host_node, Renderer};
use crate::host::{Host, HostNode};
use crate::vnode::{Key, VNode};

impl<H: Host> Renderer<H> {
    pub(super) fn patch_keyed_children(
        &self,
        old: &[VNode],
        new: &[VNode],
        container: HostNode,
        parent_anchor: Option<HostNode>,
    ) {
        let mut i = 0;
        let mut old_end = old.len();
        let mut new_end = new.len();

        // 1. prefix
        while i < old_end && i < new_end && old[i].is_same_type(&new[i]) {
            self.patch(Some(&old[i]), &new[i], container, None);
            i += 1;
        }

        // 2. suffix
        while i < old_end && i < new_end && old[old_end - 1].is_same_type(&new[new_end - 1]) {
            self.patch(Some(&old[old_end - 1]), &new[new_end - 1], container, None);
            old_end -= 1;
            new_end -= 1;
        }

        // 3. one side exhausted
        if i >= old_end {
            if i < new_end {
                let anchor = anchor_after(new, new_end - 1, parent_anchor);
                for node in &new[i..new_end] {
                    self.patch(None, node, container, anchor);
                }
            }
            return;
        }
        if i >= new_end {
            for node in &old[i..old_end] {
                self.unmount(node, true);
            }
            return;
        }

        // 4. unknown middle range
        let (old_start, new_start) = (i, i);
        let to_patch = new_end - new_start;

        let key_to_new: HashMap<&Key, usize> = (new_start..new_end)
            .filter_map(|j| new[j].key().map(|key| (key, j)))
            .collect();

        // Old position + 1 for each new child in the range; 0 means unpaired
        let mut new_to_old = vec![0usize; to_patch];
        let mut patched = 0;
        let mut moved = false;
        let mut max_new_index = 0;

        for (old_index, prev) in old.iter().enumerate().take(old_end).skip(old_start) {
            if patched >= to_patch {
                // Every new child is paired; the rest can only go
                self.unmount(prev, true);
                continue;
            }

            let new_index = match prev.key() {
                Some(key) => key_to_new.get(key).copied(),
                None => (new_start..new_end).find(|&j| {
                    new_to_old[j - new_start] == 0
                        && new[j].key().is_none()
                        && prev.is_same_type(&new[j])
                }),
            };

            match new_index {
                Some(j) if new_to_old[j - new_start] == 0 => {
                    new_to_old[j - new_start] = old_index + 1;
                    if j >= max_new_index {
                        max_new_index = j;
                    } else {
                        moved = true;
                    }
                    self.patch(Some(prev), &new[j], container, None);
                    patched += 1;
                }
                _ => self.unmount(prev, true),
            }
        }

        let stable = if moved {
            longest_increasing_subsequence(&new_to_old)
        } else {
            Vec::new()
        };
        let mut stable = stable.iter().rev().peekable();

        tracing::trace!(to_patch, patched, moved, stable = stable.len(), "keyed middle range");

        for k in (0..to_patch).rev() {
            let index = new_start + k;
            let node = &new[index];
            let anchor = anchor_after(new, index, parent_anchor);

            if new_to_old[k] == 0 {
                self.patch(None, node, container, anchor);
            } else if moved {
                if stable.peek() == Some(&&k) {
                    stable.next();
                } else {
                    self.move_node(node, container, anchor);
                }
            }
        }
    }
}

/// First host node after `new[index]`, falling back to the parent anchor.
fn anchor_after(new: &[VNode], index: usize, parent_anchor: Option<HostNode>) -> Option<HostNode> {
    new[index + 1..]
        .iter()
        .find_map(first_host_node)
        .or(parent_anchor)
}

/// Indices of a longest strictly increasing subsequence of `values`,
/// ignoring zero entries.
pub(crate) fn longest_increasing_subsequence(values: &[usize]) -> Vec<usize> {
    let mut predecessor = vec![0usize; values.len()];
    let mut result: Vec<usize> = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        if value == 0 {
            continue;
        }

        match result.last() {
            Some(&last) if values[last] < value => {
                predecessor[i] = last;
                result.push(i);
                continue;
            }
            None => {
                result.push(i);
                continue;
            }
            Some(_) => {}
        }

        let slot = result.partition_point(|&r| values[r] < value);
        if value < values[result[slot]] {
            if slot > 0 {
                predecessor[i] = result[slot - 1];
            }
            result[slot] = i;
        }
    }

    let mut cursor = match result.last() {
        Some(&last) => last,
        None => return result,
    };
    for slot in result.iter_mut().rev() {
        *slot = cursor;
        cursor = predecessor[cursor];
    }
    result
}
