//! An in-memory mirror of mounted views, for checking mutation lists.

use crate::differ::{reorder_in_place_if_needed, slice_child_pairs};
use crate::mutation::{ShadowView, ShadowViewMutation};
use crate::shadow_node::ShadowNode;
use crate::Tag;
use core::fmt;
use std::collections::HashMap;
use std::error::Error;

/// Errors that may occur when applying a mutation to a [`StubViewTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubViewTreeError {
    /// The view does not exist.
    NoSuchView(Tag),
    /// A view with this tag already exists.
    ViewExists(Tag),
    /// The view is still mounted in a parent.
    StillMounted { tag: Tag, parent: Tag },
    /// The view is deleted while it still has children.
    HasChildren(Tag),
    /// The index is past the end of the parent's children.
    IndexOutOfRange { parent: Tag, index: usize, len: usize },
    /// The view to remove is not at the given index.
    ChildMismatch {
        parent: Tag,
        index: usize,
        expected: Tag,
        found: Tag,
    },
}

impl fmt::Display for StubViewTreeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StubViewTreeError::NoSuchView(tag) => write!(f, "no view with tag {}", tag),
            StubViewTreeError::ViewExists(tag) => write!(f, "view {} already exists", tag),
            StubViewTreeError::StillMounted { tag, parent } => {
                write!(f, "view {} is still mounted in {}", tag, parent)
            }
            StubViewTreeError::HasChildren(tag) => write!(f, "view {} still has children", tag),
            StubViewTreeError::IndexOutOfRange { parent, index, len } => write!(
                f,
                "index {} out of range for view {} with {} children",
                index, parent, len
            ),
            StubViewTreeError::ChildMismatch {
                parent,
                index,
                expected,
                found,
            } => write!(
                f,
                "expected view {} at index {} of {}, found {}",
                expected, index, parent, found
            ),
        }
    }
}

impl Error for StubViewTreeError {}

#[derive(Debug, Clone, PartialEq)]
struct StubView {
    view: ShadowView,
    parent: Option<Tag>,
    children: Vec<Tag>,
}

/// Mounted views by tag.
///
/// Applying the mutations between two shadow trees to the stub of the first must produce the
/// stub of the second.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StubViewTree {
    views: HashMap<Tag, StubView>,
}

impl StubViewTree {
    pub fn new() -> StubViewTree {
        StubViewTree::default()
    }

    /// Builds the views that a full mount of `root` would produce.
    pub fn from_root(root: &ShadowNode) -> StubViewTree {
        let mut tree = StubViewTree::new();
        tree.add_subtree(ShadowView::from(root), root, None);
        tree
    }

    fn add_subtree(&mut self, view: ShadowView, node: &ShadowNode, parent: Option<Tag>) {
        let mut pairs = slice_child_pairs(node);
        reorder_in_place_if_needed(&mut pairs);

        let tag = view.tag;
        self.views.insert(
            tag,
            StubView {
                view,
                parent,
                children: pairs.iter().map(|pair| pair.view.tag).collect(),
            },
        );
        for pair in pairs {
            self.add_subtree(pair.view, pair.node, Some(tag));
        }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// The current snapshot of a view.
    pub fn view(&self, tag: Tag) -> Option<&ShadowView> {
        self.views.get(&tag).map(|stub| &stub.view)
    }

    /// Tags of the children of a view, in mounting order.
    pub fn children(&self, tag: Tag) -> Option<&[Tag]> {
        self.views.get(&tag).map(|stub| &*stub.children)
    }

    pub fn parent(&self, tag: Tag) -> Option<Tag> {
        self.views.get(&tag).and_then(|stub| stub.parent)
    }

    /// Applies mutations in order, stopping at the first invalid one.
    pub fn mutate(&mut self, mutations: &[ShadowViewMutation]) -> Result<(), StubViewTreeError> {
        for mutation in mutations {
            self.apply(mutation)?;
        }
        Ok(())
    }

    fn get_mut(&mut self, tag: Tag) -> Result<&mut StubView, StubViewTreeError> {
        self.views
            .get_mut(&tag)
            .ok_or(StubViewTreeError::NoSuchView(tag))
    }

    fn apply(&mut self, mutation: &ShadowViewMutation) -> Result<(), StubViewTreeError> {
        match mutation {
            ShadowViewMutation::Create { new } => {
                if self.views.contains_key(&new.tag) {
                    return Err(StubViewTreeError::ViewExists(new.tag));
                }
                self.views.insert(
                    new.tag,
                    StubView {
                        view: new.clone(),
                        parent: None,
                        children: Vec::new(),
                    },
                );
            }
            ShadowViewMutation::Delete { old } => {
                let stub = self.get_mut(old.tag)?;
                if let Some(parent) = stub.parent {
                    return Err(StubViewTreeError::StillMounted {
                        tag: old.tag,
                        parent,
                    });
                }
                if !stub.children.is_empty() {
                    return Err(StubViewTreeError::HasChildren(old.tag));
                }
                self.views.remove(&old.tag);
            }
            ShadowViewMutation::Insert { parent, new, index } => {
                let len = self.get_mut(parent.tag)?.children.len();
                if *index > len {
                    return Err(StubViewTreeError::IndexOutOfRange {
                        parent: parent.tag,
                        index: *index,
                        len,
                    });
                }

                let child = self.get_mut(new.tag)?;
                if let Some(current) = child.parent {
                    return Err(StubViewTreeError::StillMounted {
                        tag: new.tag,
                        parent: current,
                    });
                }
                child.parent = Some(parent.tag);
                child.view = new.clone();
                self.get_mut(parent.tag)?.children.insert(*index, new.tag);
            }
            ShadowViewMutation::Remove { parent, old, index } => {
                let parent_stub = self.get_mut(parent.tag)?;
                let len = parent_stub.children.len();
                match parent_stub.children.get(*index) {
                    None => {
                        return Err(StubViewTreeError::IndexOutOfRange {
                            parent: parent.tag,
                            index: *index,
                            len,
                        })
                    }
                    Some(&found) if found != old.tag => {
                        return Err(StubViewTreeError::ChildMismatch {
                            parent: parent.tag,
                            index: *index,
                            expected: old.tag,
                            found,
                        })
                    }
                    Some(_) => {
                        parent_stub.children.remove(*index);
                    }
                }
                self.get_mut(old.tag)?.parent = None;
            }
            ShadowViewMutation::Update { new, .. }
            | ShadowViewMutation::UpdateState { new, .. }
            | ShadowViewMutation::UpdateLayoutMetrics { new, .. } => {
                self.get_mut(new.tag)?.view = new.clone();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component_descriptor::ComponentDescriptorRegistry;
    use crate::differ::{calculate_mutations, DifferentiatorMode};
    use crate::element::{ComponentBuilder, Element};
    use crate::rect::Rect;
    use crate::shadow_node::SharedShadowNode;
    use std::sync::Arc;

    const MODES: [DifferentiatorMode; 2] =
        [DifferentiatorMode::Classic, DifferentiatorMode::OptimizedMoves];

    fn builder() -> ComponentBuilder {
        ComponentBuilder::new(Arc::new(ComponentDescriptorRegistry::with_defaults()), 1)
    }

    fn row(tags: &[i32]) -> Vec<Element> {
        tags.iter().map(|&tag| Element::view(tag)).collect()
    }

    /// Diffs every consecutive pair of trees and checks the mutations against the stubs.
    fn check_transitions(trees: &[SharedShadowNode]) {
        for mode in MODES {
            let mut stub = StubViewTree::new();
            stub.mutate(&calculate_mutations(mode, None, Some(&trees[0])))
                .expect("full mount should apply cleanly");
            assert_eq!(stub, StubViewTree::from_root(&trees[0]), "{:?}: mount", mode);

            for (i, pair) in trees.windows(2).enumerate() {
                let mutations = calculate_mutations(mode, Some(&pair[0]), Some(&pair[1]));
                if let Err(err) = stub.mutate(&mutations) {
                    panic!("{:?}: transition {} failed: {}; mutations: {:#?}", mode, i, err, mutations);
                }
                assert_eq!(
                    stub,
                    StubViewTree::from_root(&pair[1]),
                    "{:?}: transition {} should reach the new tree",
                    mode,
                    i
                );
            }

            let last = trees[trees.len() - 1].clone();
            stub.mutate(&calculate_mutations(mode, Some(&last), None))
                .expect("full unmount should apply cleanly");
            assert!(stub.is_empty(), "{:?}: unmount should delete every view", mode);
        }
    }

    #[test]
    fn test_reorders() {
        let builder = builder();
        let trees: Vec<_> = [
            vec![2, 3, 4, 5, 6],
            vec![6, 5, 4, 3, 2],
            vec![3, 2, 7, 6],
            vec![8, 3, 6, 2],
            vec![],
            vec![9, 2],
        ]
        .iter()
        .map(|tags| builder.build(&Element::root(1).children(row(tags))))
        .collect();
        check_transitions(&trees);
    }

    #[test]
    fn test_nested_moves_and_deletes() {
        let builder = builder();
        let trees = vec![
            builder.build(&Element::root(1).children(vec![
                Element::view(2).children(row(&[10, 11])),
                Element::view(3).children(vec![Element::view(12).children(row(&[20]))]),
            ])),
            builder.build(&Element::root(1).children(vec![
                Element::view(3).children(vec![Element::view(12).children(row(&[21, 20]))]),
                Element::view(2).children(row(&[11])),
            ])),
            builder.build(&Element::root(1).children(vec![Element::view(2)])),
        ];
        check_transitions(&trees);
    }

    #[test]
    fn test_flattening_and_order_index() {
        let builder = builder();
        let collapsed = |tag| Element::view(tag).prop("collapsable", true);
        let trees = vec![
            builder.build(&Element::root(1).children(vec![
                collapsed(2)
                    .frame(Rect::from_xywh(10., 10., 50., 50.))
                    .children(vec![Element::view(3).frame(Rect::from_xywh(1., 2., 5., 5.))]),
                Element::view(4).prop("zIndex", 2),
                Element::view(5),
            ])),
            builder.build(&Element::root(1).children(vec![
                collapsed(2)
                    .frame(Rect::from_xywh(20., 10., 50., 50.))
                    .children(vec![Element::view(3).frame(Rect::from_xywh(1., 2., 5., 5.))]),
                Element::view(4),
                Element::view(5).prop("zIndex", -1),
            ])),
            builder.build(&Element::root(1).children(vec![
                Element::view(2).children(vec![Element::view(3)]),
                Element::view(5),
            ])),
        ];
        check_transitions(&trees);

        let stub = StubViewTree::from_root(&trees[0]);
        assert_eq!(stub.children(1), Some(&[3, 5, 4][..]), "3 is hoisted, 4 sorts last");
        assert_eq!(stub.parent(3), Some(1));
        assert_eq!(
            stub.view(3).map(|view| view.layout_metrics.frame),
            Some(Rect::from_xywh(11., 12., 5., 5.)),
            "hoisted frames are offset by the flattened parent"
        );
    }

    #[test]
    fn test_invalid_mutations() {
        let builder = builder();
        let tree = builder.build(&Element::root(1).children(row(&[2, 3])));
        let root = ShadowView::from(&*tree);
        let child = ShadowView::from(&*tree.children()[0]);
        let other = ShadowView::from(&*tree.children()[1]);

        let mut stub = StubViewTree::from_root(&tree);
        assert_eq!(stub.len(), 3);
        assert_eq!(
            stub.mutate(&[ShadowViewMutation::Create { new: child.clone() }]),
            Err(StubViewTreeError::ViewExists(2))
        );
        assert_eq!(
            stub.mutate(&[ShadowViewMutation::Delete { old: child.clone() }]),
            Err(StubViewTreeError::StillMounted { tag: 2, parent: 1 })
        );
        assert_eq!(
            stub.mutate(&[ShadowViewMutation::Remove {
                parent: root.clone(),
                old: child.clone(),
                index: 1,
            }]),
            Err(StubViewTreeError::ChildMismatch {
                parent: 1,
                index: 1,
                expected: 2,
                found: 3,
            })
        );
        assert_eq!(
            stub.mutate(&[
                ShadowViewMutation::Remove {
                    parent: root.clone(),
                    old: other.clone(),
                    index: 1,
                },
                ShadowViewMutation::Insert {
                    parent: root.clone(),
                    new: other,
                    index: 5,
                },
            ]),
            Err(StubViewTreeError::IndexOutOfRange {
                parent: 1,
                index: 5,
                len: 1,
            })
        );
        assert_eq!(
            stub.mutate(&[ShadowViewMutation::Delete { old: root }]),
            Err(StubViewTreeError::HasChildren(1))
        );
    }
}
