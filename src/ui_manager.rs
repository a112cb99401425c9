use crate::component_descriptor::ComponentDescriptorRegistry;
use crate::differ::DifferentiatorMode;
use crate::family::ShadowNodeFamily;
use crate::layout::{LayoutConstraints, LayoutEngine, LayoutMetrics};
use crate::mounting_coordinator::MountingCoordinator;
use crate::raw_props::RawProps;
use crate::shadow_node::{ShadowNode, ShadowNodeFragment, SharedShadowNode};
use crate::shadow_tree::{
    CommitOptions, CommitStatus, ShadowTree, ShadowTreeDelegate, ShadowTreeOptions,
};
use crate::state::StateUpdate;
use crate::{SurfaceId, Tag};
use cgmath::{EuclideanSpace, Point2};
use core::fmt;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Weak};

/// Errors returned by [`UIManager`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UIManagerError {
    /// No component with this name is registered.
    UnknownComponent(String),
    /// No surface with this id is running.
    NoSuchSurface(SurfaceId),
    /// A surface with this id is already running.
    SurfaceAlreadyRunning(SurfaceId),
    /// The node is referenced from elsewhere and can not be mutated in place.
    SharedNode(Tag),
}

impl fmt::Display for UIManagerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UIManagerError::UnknownComponent(name) => write!(f, "unknown component {:?}", name),
            UIManagerError::NoSuchSurface(id) => write!(f, "no surface with id {}", id),
            UIManagerError::SurfaceAlreadyRunning(id) => {
                write!(f, "surface {} is already running", id)
            }
            UIManagerError::SharedNode(tag) => {
                write!(f, "node {} is shared and can not be mutated", tag)
            }
        }
    }
}

impl Error for UIManagerError {}

/// Gets notified after every successful commit on any surface.
pub trait UIManagerDelegate: Send + Sync {
    fn ui_manager_did_finish_transaction(&self, coordinator: &Arc<MountingCoordinator>);
}

/// Configuration shared by every surface of a [`UIManager`].
#[derive(Clone)]
pub struct UIManagerConfig {
    pub differentiator_mode: DifferentiatorMode,
    /// Progress every committed node to the most recent state of its family.
    pub enable_state_reconciliation: bool,
    pub layout_engine: Option<Arc<dyn LayoutEngine>>,
}

impl Default for UIManagerConfig {
    fn default() -> UIManagerConfig {
        UIManagerConfig {
            differentiator_mode: DifferentiatorMode::default(),
            enable_state_reconciliation: true,
            layout_engine: None,
        }
    }
}

/// Node construction and commit entry points for all surfaces.
pub struct UIManager {
    this: Weak<UIManager>,
    registry: Arc<ComponentDescriptorRegistry>,
    config: UIManagerConfig,
    trees: RwLock<HashMap<SurfaceId, Arc<ShadowTree>>>,
    delegate: RwLock<Option<Weak<dyn UIManagerDelegate>>>,
}

impl UIManager {
    pub fn new(registry: Arc<ComponentDescriptorRegistry>, config: UIManagerConfig) -> Arc<UIManager> {
        Arc::new_cyclic(|this| UIManager {
            this: Weak::clone(this),
            registry,
            config,
            trees: RwLock::new(HashMap::new()),
            delegate: RwLock::new(None),
        })
    }

    pub fn set_delegate(&self, delegate: Weak<dyn UIManagerDelegate>) {
        *self.delegate.write() = Some(delegate);
    }

    pub fn registry(&self) -> &Arc<ComponentDescriptorRegistry> {
        &self.registry
    }

    fn commit_options(&self) -> CommitOptions {
        CommitOptions {
            enable_state_reconciliation: self.config.enable_state_reconciliation,
            ..CommitOptions::default()
        }
    }

    /// Creates a new node in a new family.
    pub fn create_node(
        &self,
        tag: Tag,
        component_name: &str,
        surface_id: SurfaceId,
        raw_props: &RawProps,
    ) -> Result<SharedShadowNode, UIManagerError> {
        let descriptor = self
            .registry
            .find_by_name(component_name)
            .ok_or_else(|| UIManagerError::UnknownComponent(component_name.to_string()))?;
        let props = descriptor.clone_props(None, raw_props);
        let family = ShadowNodeFamily::new(tag, surface_id, descriptor);
        Ok(Arc::new(ShadowNode::new(
            ShadowNodeFragment::new().with_props(props),
            family,
        )))
    }

    /// Clones a node as it is.
    ///
    /// The source node is sealed; all `clone_node*` operations finish their source.
    pub fn clone_node(&self, node: &ShadowNode) -> SharedShadowNode {
        node.seal();
        Arc::new(node.clone_with(ShadowNodeFragment::new()))
    }

    /// Clones a node without its children.
    pub fn clone_node_with_new_children(&self, node: &ShadowNode) -> SharedShadowNode {
        node.seal();
        Arc::new(node.clone_with(ShadowNodeFragment::new().with_children(Vec::new())))
    }

    /// Clones a node with raw props applied on top of its props.
    pub fn clone_node_with_new_props(&self, node: &ShadowNode, raw_props: &RawProps) -> SharedShadowNode {
        node.seal();
        let props = node
            .family()
            .descriptor()
            .clone_props(Some(node.props()), raw_props);
        Arc::new(node.clone_with(ShadowNodeFragment::new().with_props(props)))
    }

    /// Clones a node without its children and with raw props applied on top of its props.
    pub fn clone_node_with_new_children_and_props(
        &self,
        node: &ShadowNode,
        raw_props: &RawProps,
    ) -> SharedShadowNode {
        node.seal();
        let props = node
            .family()
            .descriptor()
            .clone_props(Some(node.props()), raw_props);
        Arc::new(
            node.clone_with(
                ShadowNodeFragment::new()
                    .with_props(props)
                    .with_children(Vec::new()),
            ),
        )
    }

    /// Appends a child to a node that is still exclusively owned by the caller.
    pub fn append_child(
        &self,
        parent: &mut SharedShadowNode,
        child: SharedShadowNode,
    ) -> Result<(), UIManagerError> {
        let tag = parent.tag();
        let parent = Arc::get_mut(parent).ok_or(UIManagerError::SharedNode(tag))?;
        parent.append_child(child);
        Ok(())
    }

    /// Starts a surface and returns its mounting coordinator.
    pub fn start_surface(
        &self,
        surface_id: SurfaceId,
        layout_constraints: LayoutConstraints,
    ) -> Result<Arc<MountingCoordinator>, UIManagerError> {
        let mut trees = self.trees.write();
        if trees.contains_key(&surface_id) {
            return Err(UIManagerError::SurfaceAlreadyRunning(surface_id));
        }

        let delegate: Weak<dyn ShadowTreeDelegate> = self.this.clone();
        let tree = Arc::new(ShadowTree::new(
            surface_id,
            layout_constraints,
            ShadowTreeOptions {
                differentiator_mode: self.config.differentiator_mode,
                layout_engine: self.config.layout_engine.clone(),
                delegate: Some(delegate),
            },
        ));
        let coordinator = Arc::clone(tree.mounting_coordinator());
        trees.insert(surface_id, tree);
        debug!("surface {} started", surface_id);
        Ok(coordinator)
    }

    /// Stops a surface. Its pending transactions are dropped.
    pub fn stop_surface(&self, surface_id: SurfaceId) -> Result<(), UIManagerError> {
        let tree = self
            .trees
            .write()
            .remove(&surface_id)
            .ok_or(UIManagerError::NoSuchSurface(surface_id))?;
        tree.stop();
        debug!("surface {} stopped", surface_id);
        Ok(())
    }

    /// The shadow tree of a running surface.
    pub fn shadow_tree(&self, surface_id: SurfaceId) -> Option<Arc<ShadowTree>> {
        self.trees.read().get(&surface_id).cloned()
    }

    fn tree(&self, surface_id: SurfaceId) -> Result<Arc<ShadowTree>, UIManagerError> {
        self.shadow_tree(surface_id)
            .ok_or(UIManagerError::NoSuchSurface(surface_id))
    }

    /// Commits a new root with the given children.
    pub fn complete_surface(
        &self,
        surface_id: SurfaceId,
        children: Vec<SharedShadowNode>,
    ) -> Result<CommitStatus, UIManagerError> {
        let tree = self.tree(surface_id)?;
        Ok(tree.commit(
            move |root| {
                Some(Arc::new(
                    root.clone_with(ShadowNodeFragment::new().with_children(children)),
                ))
            },
            self.commit_options(),
        ))
    }

    /// Commits new layout constraints for a surface.
    pub fn set_constraints(
        &self,
        surface_id: SurfaceId,
        layout_constraints: LayoutConstraints,
    ) -> Result<CommitStatus, UIManagerError> {
        Ok(self.tree(surface_id)?.set_constraints(layout_constraints))
    }

    /// Applies a state update produced on any thread.
    ///
    /// Stale updates and updates for elements that are gone are dropped.
    pub fn update_state(&self, update: StateUpdate) -> CommitStatus {
        let family = match update.family() {
            Some(family) => family,
            None => return CommitStatus::Cancelled,
        };
        let tree = match self.shadow_tree(family.surface_id()) {
            Some(tree) => tree,
            None => {
                debug!(
                    "dropping state update for tag {} on stopped surface {}",
                    family.tag(),
                    family.surface_id()
                );
                return CommitStatus::Cancelled;
            }
        };
        if !family.set_most_recent_state(Arc::clone(update.state())) {
            return CommitStatus::Cancelled;
        }

        let state = Arc::clone(update.state());
        tree.commit(
            |root| {
                root.clone_tree(&family, |node| {
                    node.clone_with(ShadowNodeFragment::new().with_state(state))
                })
            },
            self.commit_options(),
        )
    }

    /// Finds a node by tag in the current tree of a surface.
    pub fn find_node(&self, surface_id: SurfaceId, tag: Tag) -> Option<SharedShadowNode> {
        let root = self.shadow_tree(surface_id)?.root();
        if root.tag() == tag {
            return Some(root);
        }
        let node = root.find_descendant(tag)?;
        let (parent, index) = *node.ancestors(&root).last()?;
        Some(Arc::clone(&parent.children()[index]))
    }

    /// Computes the layout metrics of `node` relative to `ancestor` (or the root of its surface)
    /// in the current tree.
    ///
    /// Returns `None` if the node is not part of the current tree or `ancestor` is not one of
    /// its ancestors.
    pub fn get_relative_layout_metrics(
        &self,
        node: &ShadowNode,
        ancestor: Option<&ShadowNode>,
    ) -> Option<LayoutMetrics> {
        let root = self.shadow_tree(node.surface_id())?.root();
        if node.same_family(&root) {
            return match ancestor {
                Some(ancestor) if !ancestor.same_family(&root) => None,
                _ => {
                    let mut metrics = root.layout_metrics();
                    metrics.frame = metrics.frame.with_origin(Point2::origin());
                    Some(metrics)
                }
            };
        }

        let path = node.ancestors(&root);
        let (parent, index) = *path.last()?;
        let current = &parent.children()[index];

        let start = match ancestor {
            Some(ancestor) => {
                path.iter()
                    .position(|(node, _)| node.same_family(ancestor))?
                    + 1
            }
            None => 1,
        };

        let mut origin = current.layout_metrics().frame.origin;
        for (node, _) in &path[start.min(path.len())..] {
            origin += node.layout_metrics().frame.origin.to_vec();
        }

        let mut metrics = current.layout_metrics();
        metrics.frame.origin = origin;
        Some(metrics)
    }
}

impl ShadowTreeDelegate for UIManager {
    fn shadow_tree_did_finish_transaction(
        &self,
        _shadow_tree: &ShadowTree,
        coordinator: &Arc<MountingCoordinator>,
    ) {
        let delegate = self.delegate.read().as_ref().and_then(Weak::upgrade);
        match delegate {
            Some(delegate) => delegate.ui_manager_did_finish_transaction(coordinator),
            None => debug!(
                "surface {}: finished transaction has no delegate to notify",
                coordinator.surface_id()
            ),
        }
    }
}

impl fmt::Debug for UIManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut surfaces: Vec<_> = self.trees.read().keys().copied().collect();
        surfaces.sort_unstable();
        f.debug_struct("UIManager")
            .field("surfaces", &surfaces)
            .field("differentiator_mode", &self.config.differentiator_mode)
            .finish()
    }
}
