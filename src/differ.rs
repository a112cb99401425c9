//! Computes mutation lists from pairs of shadow trees.
//!
//! Both trees are sliced into lists of mounted views first: nodes that do not form a stacking
//! context are flattened, so their children are mounted into the nearest ancestor that does.
//! Children lists are then compared by tag. Every level produces its mutations in blocks,
//! concatenated in this order:
//!
//! 1. mutations for subtrees that lost all of their children (and removed subtrees),
//! 2. updates,
//! 3. removes, highest index first,
//! 4. deletes,
//! 5. creates,
//! 6. mutations for the remaining subtrees,
//! 7. inserts, lowest index first.
//!
//! Removes therefore never invalidate the indices of later removes, and inserts always refer
//! to the final children list.

use crate::mutation::{ShadowView, ShadowViewMutation, ShadowViewMutationList};
use crate::shadow_node::{ShadowNode, ShadowNodeTraits, SharedShadowNode};
use crate::Tag;
use cgmath::{EuclideanSpace, Vector2};
use log::{log_enabled, trace, Level};
use std::collections::HashSet;
use std::sync::Arc;

/// Selects the children diffing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DifferentiatorMode {
    /// Matches the common prefix, then removes every remaining old child and inserts every
    /// remaining new child. Reinserted views are moved instead of recreated.
    Classic,
    /// Matches the common prefix, then walks both lists at once and only moves the children
    /// that actually changed position.
    #[default]
    OptimizedMoves,
}

/// A mounted view and the node it came from.
pub(crate) struct ShadowViewNodePair<'a> {
    pub view: ShadowView,
    pub node: &'a SharedShadowNode,
}

/// Lists the views that are mounted directly into the view of `node`.
///
/// Nodes that form a view but no stacking context are listed themselves and have their
/// children hoisted; their frames (and those of their hoisted descendants) are offset by the
/// origins of the flattened ancestors.
pub(crate) fn slice_child_pairs(node: &ShadowNode) -> Vec<ShadowViewNodePair<'_>> {
    let mut pairs = Vec::new();

    let traits = node.traits();
    if !traits.contains(ShadowNodeTraits::FORMS_STACKING_CONTEXT)
        && traits.contains(ShadowNodeTraits::FORMS_VIEW)
    {
        return pairs;
    }

    slice_child_pairs_recursively(&mut pairs, Vector2::new(0., 0.), node);
    pairs
}

fn slice_child_pairs_recursively<'a>(
    pairs: &mut Vec<ShadowViewNodePair<'a>>,
    offset: Vector2<f64>,
    node: &'a ShadowNode,
) {
    for child in node.children().iter() {
        let mut view = ShadowView::from(&**child);
        if !view.layout_metrics.is_empty() {
            view.layout_metrics.frame = view.layout_metrics.frame + offset;
        }

        let traits = child.traits();
        if traits.contains(ShadowNodeTraits::FORMS_STACKING_CONTEXT) {
            pairs.push(ShadowViewNodePair { view, node: child });
        } else {
            let origin = view.layout_metrics.frame.origin.to_vec();
            if traits.contains(ShadowNodeTraits::FORMS_VIEW) {
                pairs.push(ShadowViewNodePair { view, node: child });
            }
            slice_child_pairs_recursively(pairs, origin, child);
        }
    }
}

/// Stable-sorts pairs by order index, if any of them has one.
pub(crate) fn reorder_in_place_if_needed(pairs: &mut [ShadowViewNodePair]) {
    if pairs.len() < 2 || pairs.iter().all(|pair| pair.node.order_index() == 0) {
        return;
    }
    pairs.sort_by_key(|pair| pair.node.order_index());
}

#[derive(Default)]
struct MutationBlocks {
    destructive_downward: ShadowViewMutationList,
    updates: ShadowViewMutationList,
    removes: ShadowViewMutationList,
    deletes: ShadowViewMutationList,
    creates: ShadowViewMutationList,
    downward: ShadowViewMutationList,
    inserts: ShadowViewMutationList,
}

impl MutationBlocks {
    fn flush_into(self, mutations: &mut ShadowViewMutationList) {
        mutations.extend(self.destructive_downward);
        mutations.extend(self.updates);
        mutations.extend(self.removes.into_iter().rev());
        mutations.extend(self.deletes);
        mutations.extend(self.creates);
        mutations.extend(self.downward);
        mutations.extend(self.inserts);
    }
}

fn push_updates(mutations: &mut ShadowViewMutationList, old: &ShadowView, new: &ShadowView) {
    if old.props_changed(new) {
        mutations.push(ShadowViewMutation::Update {
            old: old.clone(),
            new: new.clone(),
        });
    }
    if old.state_changed(new) {
        mutations.push(ShadowViewMutation::UpdateState {
            old: old.clone(),
            new: new.clone(),
        });
    }
    if old.layout_metrics_changed(new) {
        mutations.push(ShadowViewMutation::UpdateLayoutMetrics {
            old: old.clone(),
            new: new.clone(),
        });
    }
}

/// Diffs a child that exists in both lists.
fn diff_matched(
    mode: DifferentiatorMode,
    blocks: &mut MutationBlocks,
    old: &ShadowViewNodePair,
    new: &ShadowViewNodePair,
) {
    push_updates(&mut blocks.updates, &old.view, &new.view);

    if Arc::ptr_eq(old.node, new.node) {
        return;
    }

    let old_grandchildren = slice_child_pairs(old.node);
    let new_grandchildren = slice_child_pairs(new.node);
    let target = if new_grandchildren.is_empty() {
        &mut blocks.destructive_downward
    } else {
        &mut blocks.downward
    };
    diff_children(mode, target, &new.view, old_grandchildren, new_grandchildren);
}

/// Removes and deletes an old child and tears down its subtree.
fn diff_removed(
    mode: DifferentiatorMode,
    blocks: &mut MutationBlocks,
    parent: &ShadowView,
    old: &ShadowViewNodePair,
    index: usize,
) {
    blocks.removes.push(ShadowViewMutation::Remove {
        parent: parent.clone(),
        old: old.view.clone(),
        index,
    });
    blocks.deletes.push(ShadowViewMutation::Delete {
        old: old.view.clone(),
    });
    diff_children(
        mode,
        &mut blocks.destructive_downward,
        &old.view,
        slice_child_pairs(old.node),
        Vec::new(),
    );
}

/// Creates a new child and builds its subtree. The insert is emitted separately.
fn diff_created(mode: DifferentiatorMode, blocks: &mut MutationBlocks, new: &ShadowViewNodePair) {
    blocks.creates.push(ShadowViewMutation::Create {
        new: new.view.clone(),
    });
    diff_children(
        mode,
        &mut blocks.downward,
        &new.view,
        Vec::new(),
        slice_child_pairs(new.node),
    );
}

fn diff_children(
    mode: DifferentiatorMode,
    mutations: &mut ShadowViewMutationList,
    parent: &ShadowView,
    mut old_pairs: Vec<ShadowViewNodePair>,
    mut new_pairs: Vec<ShadowViewNodePair>,
) {
    if old_pairs.is_empty() && new_pairs.is_empty() {
        return;
    }

    reorder_in_place_if_needed(&mut old_pairs);
    reorder_in_place_if_needed(&mut new_pairs);

    let blocks = match mode {
        DifferentiatorMode::Classic => diff_children_classic(mode, parent, &old_pairs, &new_pairs),
        DifferentiatorMode::OptimizedMoves => {
            diff_children_optimized_moves(mode, parent, &old_pairs, &new_pairs)
        }
    };
    blocks.flush_into(mutations);
}

/// Diffs the common prefix of both lists and returns its length.
fn diff_common_prefix(
    mode: DifferentiatorMode,
    blocks: &mut MutationBlocks,
    old_pairs: &[ShadowViewNodePair],
    new_pairs: &[ShadowViewNodePair],
) -> usize {
    let mut index = 0;
    while index < old_pairs.len() && index < new_pairs.len() {
        let (old, new) = (&old_pairs[index], &new_pairs[index]);
        if old.view.tag != new.view.tag {
            break;
        }
        diff_matched(mode, blocks, old, new);
        index += 1;
    }
    index
}

fn diff_children_classic(
    mode: DifferentiatorMode,
    parent: &ShadowView,
    old_pairs: &[ShadowViewNodePair],
    new_pairs: &[ShadowViewNodePair],
) -> MutationBlocks {
    let mut blocks = MutationBlocks::default();
    let prefix = diff_common_prefix(mode, &mut blocks, old_pairs, new_pairs);

    // (tag, index into new_pairs) of every view inserted so far
    let mut inserted: Vec<(Tag, usize)> = Vec::new();
    for (index, new) in new_pairs.iter().enumerate().skip(prefix) {
        blocks.inserts.push(ShadowViewMutation::Insert {
            parent: parent.clone(),
            new: new.view.clone(),
            index,
        });
        inserted.push((new.view.tag, index));
    }

    for (index, old) in old_pairs.iter().enumerate().skip(prefix) {
        match inserted.iter().position(|&(tag, _)| tag == old.view.tag) {
            Some(position) => {
                // reinserted: this is a move, not a new view
                let (_, new_index) = inserted.remove(position);
                blocks.removes.push(ShadowViewMutation::Remove {
                    parent: parent.clone(),
                    old: old.view.clone(),
                    index,
                });
                diff_matched(mode, &mut blocks, old, &new_pairs[new_index]);
            }
            None => diff_removed(mode, &mut blocks, parent, old, index),
        }
    }

    for (_, index) in inserted {
        diff_created(mode, &mut blocks, &new_pairs[index]);
    }

    blocks
}

fn diff_children_optimized_moves(
    mode: DifferentiatorMode,
    parent: &ShadowView,
    old_pairs: &[ShadowViewNodePair],
    new_pairs: &[ShadowViewNodePair],
) -> MutationBlocks {
    let mut blocks = MutationBlocks::default();
    let prefix = diff_common_prefix(mode, &mut blocks, old_pairs, new_pairs);

    if prefix == new_pairs.len() {
        for (index, old) in old_pairs.iter().enumerate().skip(prefix) {
            diff_removed(mode, &mut blocks, parent, old, index);
        }
        return blocks;
    }

    if prefix == old_pairs.len() {
        for (index, new) in new_pairs.iter().enumerate().skip(prefix) {
            blocks.inserts.push(ShadowViewMutation::Insert {
                parent: parent.clone(),
                new: new.view.clone(),
                index,
            });
            diff_created(mode, &mut blocks, new);
        }
        return blocks;
    }

    let mut new_remaining: HashSet<Tag> = new_pairs[prefix..]
        .iter()
        .map(|pair| pair.view.tag)
        .collect();
    // (tag, index into new_pairs), in insertion order
    let mut new_inserted: Vec<(Tag, usize)> = Vec::new();

    let (mut old_index, mut new_index) = (prefix, prefix);
    while old_index < old_pairs.len() || new_index < new_pairs.len() {
        let have_old = old_index < old_pairs.len();
        let have_new = new_index < new_pairs.len();

        if have_old && have_new {
            let (old, new) = (&old_pairs[old_index], &new_pairs[new_index]);
            if old.view.tag == new.view.tag {
                new_remaining.remove(&old.view.tag);
                diff_matched(mode, &mut blocks, old, new);
                old_index += 1;
                new_index += 1;
                continue;
            }
        }

        if have_old {
            let old = &old_pairs[old_index];

            // already inserted further up: the view moved
            if let Some(position) = new_inserted
                .iter()
                .position(|&(tag, _)| tag == old.view.tag)
            {
                let (_, inserted_index) = new_inserted.remove(position);
                blocks.removes.push(ShadowViewMutation::Remove {
                    parent: parent.clone(),
                    old: old.view.clone(),
                    index: old_index,
                });
                diff_matched(mode, &mut blocks, old, &new_pairs[inserted_index]);
                old_index += 1;
                continue;
            }

            if !new_remaining.contains(&old.view.tag) {
                diff_removed(mode, &mut blocks, parent, old, old_index);
                old_index += 1;
                continue;
            }
        }

        if !have_new {
            panic!(
                "view {} appears more than once among the children of view {}",
                old_pairs[old_index].view.tag, parent.tag
            );
        }

        let new = &new_pairs[new_index];
        blocks.inserts.push(ShadowViewMutation::Insert {
            parent: parent.clone(),
            new: new.view.clone(),
            index: new_index,
        });
        new_inserted.push((new.view.tag, new_index));
        new_index += 1;
    }

    for (_, index) in new_inserted {
        diff_created(mode, &mut blocks, &new_pairs[index]);
    }

    blocks
}

/// Computes the mutations that turn the mounted views of `old_root` into those of `new_root`.
///
/// A missing old root means a full mount (starting with the creation of the root view); a
/// missing new root means a full unmount (ending with its deletion). Identical subtrees are
/// skipped without being visited.
///
/// # Panics
/// - if both roots are present but belong to different families
pub fn calculate_mutations(
    mode: DifferentiatorMode,
    old_root: Option<&SharedShadowNode>,
    new_root: Option<&SharedShadowNode>,
) -> ShadowViewMutationList {
    let mut mutations = ShadowViewMutationList::new();

    match (old_root, new_root) {
        (None, None) => (),
        (Some(old_root), Some(new_root)) => {
            if Arc::ptr_eq(old_root, new_root) {
                return mutations;
            }
            assert!(
                old_root.same_family(new_root),
                "can not diff unrelated roots {} and {}",
                old_root.tag(),
                new_root.tag()
            );

            let old_view = ShadowView::from(&**old_root);
            let new_view = ShadowView::from(&**new_root);
            push_updates(&mut mutations, &old_view, &new_view);
            diff_children(
                mode,
                &mut mutations,
                &new_view,
                slice_child_pairs(old_root),
                slice_child_pairs(new_root),
            );
        }
        (None, Some(new_root)) => {
            let new_view = ShadowView::from(&**new_root);
            mutations.push(ShadowViewMutation::Create {
                new: new_view.clone(),
            });
            diff_children(
                mode,
                &mut mutations,
                &new_view,
                Vec::new(),
                slice_child_pairs(new_root),
            );
        }
        (Some(old_root), None) => {
            let old_view = ShadowView::from(&**old_root);
            diff_children(
                mode,
                &mut mutations,
                &old_view,
                slice_child_pairs(old_root),
                Vec::new(),
            );
            mutations.push(ShadowViewMutation::Delete { old: old_view });
        }
    }

    if log_enabled!(Level::Trace) {
        for mutation in &mutations {
            trace!("{}", mutation);
        }
    }

    mutations
}
