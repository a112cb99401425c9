use crate::component_descriptor::{ComponentHandle, ComponentName};
use crate::family::ShadowNodeFamily;
use crate::layout::LayoutMetrics;
use crate::props::SharedProps;
use crate::state::State;
use crate::{SurfaceId, Tag};
use bitflags::bitflags;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

bitflags! {
    /// Flags describing how a node participates in mounting.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShadowNodeTraits: u32 {
        /// The node is represented by a native view.
        const FORMS_VIEW = 1 << 0;
        /// The node's children are mounted into the node's own view.
        ///
        /// Nodes without this trait are flattened: their children are hoisted into the
        /// nearest ancestor that forms a stacking context.
        const FORMS_STACKING_CONTEXT = 1 << 1;
        /// The node is the root of a surface.
        const ROOT = 1 << 2;
        /// The node can not have children.
        const LEAF = 1 << 3;
    }
}

pub type SharedShadowNode = Arc<ShadowNode>;
pub type SharedChildren = Arc<Vec<SharedShadowNode>>;

/// Overrides for creating or cloning a shadow node. Absent fields are taken from the source
/// node (or defaults, for new nodes).
#[derive(Debug, Clone, Default)]
pub struct ShadowNodeFragment {
    pub props: Option<SharedProps>,
    pub children: Option<SharedChildren>,
    pub state: Option<Arc<State>>,
    pub layout_metrics: Option<LayoutMetrics>,
}

impl ShadowNodeFragment {
    pub fn new() -> ShadowNodeFragment {
        ShadowNodeFragment::default()
    }

    pub fn with_props(mut self, props: SharedProps) -> Self {
        self.props = Some(props);
        self
    }

    pub fn with_children(self, children: Vec<SharedShadowNode>) -> Self {
        self.with_shared_children(Arc::new(children))
    }

    pub fn with_shared_children(mut self, children: SharedChildren) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_state(mut self, state: Arc<State>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_layout_metrics(mut self, layout_metrics: LayoutMetrics) -> Self {
        self.layout_metrics = Some(layout_metrics);
        self
    }
}

/// One immutable revision of a UI element.
///
/// Shadow nodes are built unsealed, possibly mutated in place while they are still exclusively
/// owned (appending children, setting layout metrics), and then sealed when they are committed.
/// After that, any change goes through [`clone_with`](ShadowNode::clone_with), which produces a
/// new revision that shares everything the fragment does not override, including the children
/// list.
pub struct ShadowNode {
    family: Arc<ShadowNodeFamily>,
    props: SharedProps,
    state: Option<Arc<State>>,
    children: SharedChildren,
    layout_metrics: LayoutMetrics,
    traits: ShadowNodeTraits,
    order_index: i32,
    revision: u64,
    sealed: AtomicBool,
}

impl ShadowNode {
    /// Creates the first revision of a node in the given family.
    ///
    /// Stateful components without a state in the fragment get their initial state here.
    ///
    /// # Panics
    /// - if a leaf node is given children
    pub fn new(fragment: ShadowNodeFragment, family: Arc<ShadowNodeFamily>) -> ShadowNode {
        let descriptor = Arc::clone(family.descriptor());
        let props = fragment.props.unwrap_or_else(|| descriptor.default_props());
        let state = fragment.state.or_else(|| {
            let data = descriptor.initial_state_data(&*props)?;
            let state = Arc::new(State::initial(&family, data));
            family.set_most_recent_state(Arc::clone(&state));
            Some(state)
        });
        let children = fragment.children.unwrap_or_default();
        let traits = descriptor.traits(&*props);
        let order_index = descriptor.order_index(&*props);

        assert!(
            !traits.contains(ShadowNodeTraits::LEAF) || children.is_empty(),
            "leaf node {} ({}) can not have children",
            family.tag(),
            family.component_name()
        );

        for child in children.iter() {
            child.family.set_parent(&family);
        }

        ShadowNode {
            family,
            props,
            state,
            children,
            layout_metrics: fragment.layout_metrics.unwrap_or_default(),
            traits,
            order_index,
            revision: 1,
            sealed: AtomicBool::new(false),
        }
    }

    /// Creates the next revision of this node, overriding the fields present in the fragment.
    ///
    /// # Panics
    /// - if this node is not sealed yet
    pub fn clone_with(&self, fragment: ShadowNodeFragment) -> ShadowNode {
        assert!(
            self.is_sealed(),
            "shadow node {} r{} can not be cloned before being sealed",
            self.tag(),
            self.revision
        );

        let (props, traits, order_index) = match fragment.props {
            Some(props) => {
                let descriptor = self.family.descriptor();
                let traits = descriptor.traits(&*props);
                let order_index = descriptor.order_index(&*props);
                (props, traits, order_index)
            }
            None => (Arc::clone(&self.props), self.traits, self.order_index),
        };

        let children = match fragment.children {
            Some(children) => {
                assert!(
                    !traits.contains(ShadowNodeTraits::LEAF) || children.is_empty(),
                    "leaf node {} ({}) can not have children",
                    self.tag(),
                    self.component_name()
                );
                for child in children.iter() {
                    child.family.set_parent(&self.family);
                }
                children
            }
            None => Arc::clone(&self.children),
        };

        ShadowNode {
            family: Arc::clone(&self.family),
            props,
            state: fragment.state.or_else(|| self.state.clone()),
            children,
            layout_metrics: fragment.layout_metrics.unwrap_or(self.layout_metrics),
            traits,
            order_index,
            revision: self.revision + 1,
            sealed: AtomicBool::new(false),
        }
    }

    pub fn tag(&self) -> Tag {
        self.family.tag()
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.family.surface_id()
    }

    pub fn component_handle(&self) -> ComponentHandle {
        self.family.component_handle()
    }

    pub fn component_name(&self) -> ComponentName {
        self.family.component_name()
    }

    pub fn family(&self) -> &Arc<ShadowNodeFamily> {
        &self.family
    }

    pub fn props(&self) -> &SharedProps {
        &self.props
    }

    pub fn state(&self) -> Option<&Arc<State>> {
        self.state.as_ref()
    }

    pub fn children(&self) -> &SharedChildren {
        &self.children
    }

    pub fn layout_metrics(&self) -> LayoutMetrics {
        self.layout_metrics
    }

    pub fn traits(&self) -> ShadowNodeTraits {
        self.traits
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns true if both nodes are revisions of the same element.
    pub fn same_family(&self, other: &ShadowNode) -> bool {
        Arc::ptr_eq(&self.family, &other.family)
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Seals this node and all of its descendants.
    ///
    /// Sealed subtrees are skipped, so sealing a new revision only visits nodes created since
    /// the last seal.
    pub fn seal(&self) {
        if self.sealed.swap(true, Ordering::AcqRel) {
            return;
        }
        for child in self.children.iter() {
            child.seal();
        }
    }

    fn ensure_unsealed(&self) {
        if self.is_sealed() {
            panic!(
                "attempted to mutate sealed shadow node {} ({}) r{}",
                self.tag(),
                self.component_name(),
                self.revision
            );
        }
    }

    /// Appends a child to an unsealed node.
    ///
    /// # Panics
    /// - if the node is sealed
    /// - if the node is a leaf
    pub fn append_child(&mut self, child: SharedShadowNode) {
        self.ensure_unsealed();
        assert!(
            !self.traits.contains(ShadowNodeTraits::LEAF),
            "leaf node {} ({}) can not have children",
            self.tag(),
            self.component_name()
        );
        child.family.set_parent(&self.family);
        Arc::make_mut(&mut self.children).push(child);
    }

    /// Sets the layout metrics of an unsealed node.
    ///
    /// # Panics
    /// - if the node is sealed
    pub fn set_layout_metrics(&mut self, layout_metrics: LayoutMetrics) {
        self.ensure_unsealed();
        self.layout_metrics = layout_metrics;
    }

    /// Finds the path from `root` to this node.
    ///
    /// Returns every ancestor node in the given tree revision, root first, paired with the index
    /// of the next node on the path among its children. The list is empty if this node is the
    /// root or is not part of the tree.
    pub fn ancestors<'a>(&self, root: &'a ShadowNode) -> Vec<(&'a ShadowNode, usize)> {
        let mut families = self.family.ancestors();
        families.reverse();

        match families.first() {
            Some(family) if Arc::ptr_eq(family, &root.family) => (),
            _ => return Vec::new(),
        }

        let mut path = Vec::with_capacity(families.len());
        let mut current = root;
        for family in families.iter().skip(1).chain(Some(&self.family)) {
            let index = match current
                .children
                .iter()
                .position(|child| Arc::ptr_eq(&child.family, family))
            {
                Some(index) => index,
                None => return Vec::new(),
            };
            path.push((current, index));
            current = &*current.children[index];
        }
        path
    }

    /// Clones the path from this node (a root) to the node of the given family, replacing that
    /// node with the result of `callback`.
    ///
    /// Every node off the path is shared with the source tree. Returns `None` if the family is
    /// not part of this tree.
    pub fn clone_tree<F>(&self, family: &ShadowNodeFamily, callback: F) -> Option<SharedShadowNode>
    where
        F: FnOnce(&ShadowNode) -> ShadowNode,
    {
        if core::ptr::eq(&*self.family, family) {
            return Some(Arc::new(callback(self)));
        }

        let mut families = family.ancestors();
        families.reverse();
        let target = {
            let first = families.first()?;
            if !Arc::ptr_eq(first, &self.family) {
                return None;
            }
            let mut path = Vec::with_capacity(families.len());
            let mut current = self;
            for next in families.iter().skip(1) {
                let index = current
                    .children
                    .iter()
                    .position(|child| Arc::ptr_eq(&child.family, next))?;
                path.push((current, index));
                current = &*current.children[index];
            }
            let index = current
                .children
                .iter()
                .position(|child| core::ptr::eq(&*child.family, family))?;
            path.push((current, index));
            path
        };

        let (parent, index) = target[target.len() - 1];
        let mut node = Arc::new(callback(&*parent.children[index]));
        for (parent, index) in target.into_iter().rev() {
            let mut children = (*parent.children).clone();
            children[index] = node;
            node = Arc::new(
                parent.clone_with(ShadowNodeFragment::new().with_children(children)),
            );
        }
        Some(node)
    }

    /// Finds a descendant (or this node) by tag, depth first.
    pub fn find_descendant(&self, tag: Tag) -> Option<&ShadowNode> {
        if self.tag() == tag {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_descendant(tag))
    }
}

impl fmt::Debug for ShadowNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ShadowNode")
            .field("tag", &self.tag())
            .field("component", &self.component_name())
            .field("revision", &self.revision)
            .field("sealed", &self.is_sealed())
            .field("props", &self.props)
            .field("state", &self.state)
            .field("layout_metrics", &self.layout_metrics)
            .field("children", &self.children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::view::view_descriptor;
    use crate::rect::Rect;

    fn node(tag: Tag, children: Vec<SharedShadowNode>) -> ShadowNode {
        ShadowNode::new(
            ShadowNodeFragment::new().with_children(children),
            ShadowNodeFamily::new(tag, 1, view_descriptor()),
        )
    }

    fn sealed(tag: Tag, children: Vec<SharedShadowNode>) -> SharedShadowNode {
        let node = Arc::new(node(tag, children));
        node.seal();
        node
    }

    #[test]
    fn test_clone_shares_children() {
        let root = sealed(1, vec![sealed(2, vec![]), sealed(3, vec![])]);
        let frame = Rect::from_xywh(0., 0., 100., 100.);
        let clone = root.clone_with(
            ShadowNodeFragment::new().with_layout_metrics(LayoutMetrics::with_frame(frame)),
        );

        assert!(clone.same_family(&root));
        assert_eq!(clone.tag(), 1);
        assert_eq!(clone.revision(), root.revision() + 1);
        assert!(!clone.is_sealed(), "clones should start out unsealed");
        assert!(
            Arc::ptr_eq(clone.children(), root.children()),
            "the children list should be shared, not copied"
        );
        assert!(Arc::ptr_eq(clone.props(), root.props()));
        assert_eq!(clone.layout_metrics().frame, frame);
    }

    #[test]
    fn test_seal_is_recursive() {
        let child = Arc::new(node(2, vec![]));
        let root = node(1, vec![Arc::clone(&child)]);
        root.seal();
        root.seal();
        assert!(root.is_sealed());
        assert!(child.is_sealed(), "sealing should reach descendants");
    }

    #[test]
    #[should_panic(expected = "sealed")]
    fn test_mutating_sealed_node_panics() {
        let mut root = node(1, vec![]);
        root.seal();
        root.append_child(sealed(2, vec![]));
    }

    #[test]
    #[should_panic(expected = "before being sealed")]
    fn test_cloning_unsealed_node_panics() {
        let root = node(1, vec![]);
        let _next = root.clone_with(ShadowNodeFragment::new());
    }

    #[test]
    fn test_append_child_sets_parent_family() {
        let mut root = node(1, vec![sealed(2, vec![])]);
        let child = sealed(3, vec![]);
        root.append_child(Arc::clone(&child));

        let tags: Vec<_> = root.children().iter().map(|c| c.tag()).collect();
        assert_eq!(tags, vec![2, 3]);
        assert!(root.family().is_ancestor_of(child.family()));
    }

    #[test]
    fn test_ancestors() {
        let leaf = sealed(4, vec![]);
        let root = sealed(1, vec![sealed(2, vec![]), sealed(3, vec![Arc::clone(&leaf)])]);

        let path: Vec<_> = leaf
            .ancestors(&root)
            .iter()
            .map(|(node, index)| (node.tag(), *index))
            .collect();
        assert_eq!(path, vec![(1, 1), (3, 0)]);
        assert!(root.ancestors(&root).is_empty(), "the root has no ancestors");

        let stranger = sealed(9, vec![]);
        assert!(stranger.ancestors(&root).is_empty());
    }

    #[test]
    fn test_clone_tree_copies_only_the_path() {
        let untouched = sealed(2, vec![sealed(5, vec![])]);
        let leaf = sealed(4, vec![]);
        let root = sealed(1, vec![Arc::clone(&untouched), sealed(3, vec![Arc::clone(&leaf)])]);

        let frame = Rect::from_xywh(1., 2., 3., 4.);
        let new_root = root
            .clone_tree(leaf.family(), |node| {
                node.clone_with(
                    ShadowNodeFragment::new().with_layout_metrics(LayoutMetrics::with_frame(frame)),
                )
            })
            .expect("leaf should be found");

        assert!(new_root.same_family(&root));
        assert_eq!(new_root.revision(), 2);
        assert!(
            Arc::ptr_eq(&new_root.children()[0], &untouched),
            "siblings off the path should be shared"
        );
        let new_leaf = new_root
            .find_descendant(4)
            .expect("new tree should contain the leaf");
        assert_eq!(new_leaf.layout_metrics().frame, frame);
        assert_eq!(leaf.layout_metrics(), LayoutMetrics::empty(), "source is untouched");

        let stranger = sealed(9, vec![]);
        assert!(root
            .clone_tree(stranger.family(), |node| node.clone_with(ShadowNodeFragment::new()))
            .is_none());
    }

    #[test]
    fn test_stateful_node_gets_initial_state() {
        use crate::component_descriptor::{ComponentHandle, ConcreteComponentDescriptor};
        use crate::state::StateData;

        let descriptor = Arc::new(
            ConcreteComponentDescriptor::<()>::new(ComponentHandle(50), "Counter")
                .with_initial_state(|_: &()| -> StateData { Arc::new(0u32) }),
        );
        let family = ShadowNodeFamily::new(8, 1, descriptor);
        let node = ShadowNode::new(ShadowNodeFragment::new(), Arc::clone(&family));

        let state = node.state().expect("stateful node should have state");
        assert_eq!(state.revision(), 1);
        assert_eq!(state.get::<u32>(), Some(&0));
        assert!(
            family
                .most_recent_state()
                .map_or(false, |recent| Arc::ptr_eq(&recent, state)),
            "the family should know about the initial state"
        );
    }
}
