use crate::components::root::{root_descriptor, RootProps};
use crate::differ::{calculate_mutations, DifferentiatorMode};
use crate::family::ShadowNodeFamily;
use crate::layout::{layout_tree, LayoutConstraints, LayoutEngine};
use crate::mounting_coordinator::MountingCoordinator;
use crate::mounting_transaction::{MountingTransaction, TransactionNumber};
use crate::props::SharedProps;
use crate::shadow_node::{ShadowNode, ShadowNodeFragment, SharedShadowNode};
use crate::telemetry::TransactionTelemetry;
use crate::state::State;
use crate::{SurfaceId, Tag};
use core::convert::Infallible;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Scheduling hint for a commit. Does not change what a commit does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    #[default]
    Normal,
    Synchronous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOptions {
    pub mode: CommitMode,
    /// Progress every node to the most recent state of its family before diffing.
    pub enable_state_reconciliation: bool,
}

impl Default for CommitOptions {
    fn default() -> CommitOptions {
        CommitOptions {
            mode: CommitMode::Normal,
            enable_state_reconciliation: true,
        }
    }
}

/// Outcome of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// A new revision was published.
    Succeeded,
    /// The transform returned the current root; nothing happened.
    NoChange,
    /// The transform gave up, or the tree was stopped.
    Cancelled,
}

/// Gets notified after every successful commit.
pub trait ShadowTreeDelegate: Send + Sync {
    fn shadow_tree_did_finish_transaction(
        &self,
        shadow_tree: &ShadowTree,
        coordinator: &Arc<MountingCoordinator>,
    );
}

/// Optional collaborators of a shadow tree.
#[derive(Clone, Default)]
pub struct ShadowTreeOptions {
    pub differentiator_mode: DifferentiatorMode,
    pub layout_engine: Option<Arc<dyn LayoutEngine>>,
    pub delegate: Option<Weak<dyn ShadowTreeDelegate>>,
}

/// A committed tree revision.
#[derive(Debug, Clone)]
pub struct ShadowTreeRevision {
    pub root: SharedShadowNode,
    pub number: TransactionNumber,
    pub telemetry: TransactionTelemetry,
}

/// The shadow tree of one surface.
///
/// Commits are serialized; each one turns the current root into a new root through a
/// transform, diffs the two, publishes the new root and hands the mutations to the mounting
/// coordinator. Readers always see some complete revision.
pub struct ShadowTree {
    surface_id: SurfaceId,
    commit_lock: Mutex<()>,
    current: RwLock<ShadowTreeRevision>,
    coordinator: Arc<MountingCoordinator>,
    differentiator_mode: DifferentiatorMode,
    layout_engine: Option<Arc<dyn LayoutEngine>>,
    delegate: Option<Weak<dyn ShadowTreeDelegate>>,
    stopped: AtomicBool,
}

impl ShadowTree {
    /// Creates a tree with an empty root and queues the transaction that creates the root view.
    pub fn new(
        surface_id: SurfaceId,
        layout_constraints: LayoutConstraints,
        options: ShadowTreeOptions,
    ) -> ShadowTree {
        let family = ShadowNodeFamily::new(surface_id, surface_id, root_descriptor());
        let props: SharedProps = Arc::new(RootProps {
            layout_constraints,
            ..RootProps::default()
        });
        let root = Arc::new(ShadowNode::new(
            ShadowNodeFragment::new().with_props(props),
            family,
        ));
        root.seal();

        let mut telemetry = TransactionTelemetry::new();
        telemetry.will_commit();
        telemetry.will_diff();
        let mutations = calculate_mutations(options.differentiator_mode, None, Some(&root));
        telemetry.did_diff();
        telemetry.set_number_of_mutations(mutations.len());
        telemetry.did_commit();

        let coordinator = Arc::new(MountingCoordinator::new(surface_id));
        coordinator.push(MountingTransaction::new(
            surface_id,
            0,
            mutations,
            telemetry.clone(),
        ));
        debug!("surface {}: shadow tree created", surface_id);

        ShadowTree {
            surface_id,
            commit_lock: Mutex::new(()),
            current: RwLock::new(ShadowTreeRevision {
                root,
                number: 0,
                telemetry,
            }),
            coordinator,
            differentiator_mode: options.differentiator_mode,
            layout_engine: options.layout_engine,
            delegate: options.delegate,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn mounting_coordinator(&self) -> &Arc<MountingCoordinator> {
        &self.coordinator
    }

    /// The current root.
    pub fn root(&self) -> SharedShadowNode {
        Arc::clone(&self.current.read().root)
    }

    /// The current revision.
    pub fn current_revision(&self) -> ShadowTreeRevision {
        self.current.read().clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Commits the result of `transform`.
    ///
    /// The transform gets the current root and returns the new root, or `None` to cancel.
    ///
    /// # Panics
    /// - if the new root belongs to a different family than the current root
    pub fn commit<F>(&self, transform: F, options: CommitOptions) -> CommitStatus
    where
        F: FnOnce(&SharedShadowNode) -> Option<SharedShadowNode>,
    {
        match self.try_commit(|root| Ok::<_, Infallible>(transform(root)), options) {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }

    /// Commits the result of a fallible transform. If the transform fails, the tree is left
    /// untouched and the error is returned.
    pub fn try_commit<F, E>(&self, transform: F, options: CommitOptions) -> Result<CommitStatus, E>
    where
        F: FnOnce(&SharedShadowNode) -> Result<Option<SharedShadowNode>, E>,
    {
        if self.is_stopped() {
            warn!("surface {}: commit on a stopped shadow tree", self.surface_id);
            return Ok(CommitStatus::Cancelled);
        }

        let commit_lock = self.commit_lock.lock();
        // stop() may have won the race for the lock
        if self.is_stopped() {
            return Ok(CommitStatus::Cancelled);
        }

        let mut telemetry = TransactionTelemetry::new();
        telemetry.will_commit();

        let old_revision = self.current_revision();
        let new_root = match transform(&old_revision.root)? {
            Some(new_root) => new_root,
            None => return Ok(CommitStatus::Cancelled),
        };
        if Arc::ptr_eq(&new_root, &old_revision.root) {
            return Ok(CommitStatus::NoChange);
        }
        assert!(
            new_root.same_family(&old_revision.root),
            "surface {}: commit replaced the root with an unrelated node {}",
            self.surface_id,
            new_root.tag()
        );
        new_root.seal();

        let new_root = if options.enable_state_reconciliation {
            progress_state(&new_root)
        } else {
            keep_committed_states(&new_root, &old_revision.root)
        };
        new_root.seal();
        let new_root = self.layout(&new_root, &mut telemetry);
        new_root.seal();

        telemetry.will_diff();
        let mutations =
            calculate_mutations(self.differentiator_mode, Some(&old_revision.root), Some(&new_root));
        telemetry.did_diff();
        telemetry.set_number_of_mutations(mutations.len());

        let number = old_revision.number + 1;
        telemetry.did_commit();
        *self.current.write() = ShadowTreeRevision {
            root: new_root,
            number,
            telemetry: telemetry.clone(),
        };

        debug!(
            "surface {}: committed revision {} with {} mutations ({:?})",
            self.surface_id,
            number,
            mutations.len(),
            options.mode
        );
        self.coordinator.push(MountingTransaction::new(
            self.surface_id,
            number,
            mutations,
            telemetry,
        ));
        drop(commit_lock);

        if let Some(delegate) = self.delegate.as_ref().and_then(Weak::upgrade) {
            delegate.shadow_tree_did_finish_transaction(self, &self.coordinator);
        }
        Ok(CommitStatus::Succeeded)
    }

    fn layout(
        &self,
        root: &SharedShadowNode,
        telemetry: &mut TransactionTelemetry,
    ) -> SharedShadowNode {
        let engine = match &self.layout_engine {
            Some(engine) => engine,
            None => return Arc::clone(root),
        };
        let props = root
            .props()
            .as_any()
            .downcast_ref::<RootProps>()
            .cloned()
            .unwrap_or_default();

        telemetry.will_layout();
        let laid_out = layout_tree(
            root,
            &**engine,
            &props.layout_constraints,
            props.point_scale_factor,
        );
        telemetry.did_layout();
        laid_out
    }

    /// Commits new layout constraints for the root.
    pub fn set_constraints(&self, layout_constraints: LayoutConstraints) -> CommitStatus {
        self.commit(
            |root| {
                let mut props = root
                    .props()
                    .as_any()
                    .downcast_ref::<RootProps>()
                    .cloned()
                    .unwrap_or_default();
                if props.layout_constraints == layout_constraints {
                    return Some(Arc::clone(root));
                }
                props.layout_constraints = layout_constraints;
                let props: SharedProps = Arc::new(props);
                Some(Arc::new(
                    root.clone_with(ShadowNodeFragment::new().with_props(props)),
                ))
            },
            CommitOptions::default(),
        )
    }

    /// Commits a root without children, so that the mounting layer tears down every view
    /// except the root.
    pub fn commit_empty_tree(&self) -> CommitStatus {
        self.commit(
            |root| {
                if root.children().is_empty() {
                    return Some(Arc::clone(root));
                }
                Some(Arc::new(
                    root.clone_with(ShadowNodeFragment::new().with_children(Vec::new())),
                ))
            },
            CommitOptions::default(),
        )
    }

    /// Stops the tree: further commits are cancelled and pending transactions are dropped.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        // wait for a running commit to finish
        let _commit_lock = self.commit_lock.lock();
        self.coordinator.revoke();
        debug!("surface {}: shadow tree stopped", self.surface_id);
    }
}

impl fmt::Debug for ShadowTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let current = self.current.read();
        f.debug_struct("ShadowTree")
            .field("surface_id", &self.surface_id)
            .field("revision", &current.number)
            .field("stopped", &self.is_stopped())
            .field("root", &current.root)
            .finish()
    }
}

/// Replaces every node whose family has a newer state than the node itself.
///
/// Returns the same root if every node is up to date.
pub fn progress_state(node: &SharedShadowNode) -> SharedShadowNode {
    replace_states(node, &|node: &ShadowNode| node.family().most_recent_state())
}

/// Replaces every node whose state is older than the state committed for its family in
/// `committed_root`, so that a commit built from stale nodes never moves state backward.
///
/// Returns the same root if no node carries an outdated state.
pub fn keep_committed_states(
    node: &SharedShadowNode,
    committed_root: &SharedShadowNode,
) -> SharedShadowNode {
    let mut committed = HashMap::new();
    collect_states(committed_root, &mut committed);
    if committed.is_empty() {
        return Arc::clone(node);
    }
    replace_states(node, &|node: &ShadowNode| committed.get(&node.tag()).cloned())
}

fn collect_states(node: &ShadowNode, states: &mut HashMap<Tag, Arc<State>>) {
    if let Some(state) = node.state() {
        states.insert(node.tag(), Arc::clone(state));
    }
    for child in node.children().iter() {
        collect_states(child, states);
    }
}

fn replace_states<F>(node: &SharedShadowNode, candidate: &F) -> SharedShadowNode
where
    F: Fn(&ShadowNode) -> Option<Arc<State>>,
{
    let mut children_changed = false;
    let children: Vec<_> = node
        .children()
        .iter()
        .map(|child| {
            let replaced = replace_states(child, candidate);
            children_changed |= !Arc::ptr_eq(&replaced, child);
            replaced
        })
        .collect();

    let newer_state = candidate(node).filter(|candidate| match node.state() {
        Some(state) => candidate.is_newer_than(state),
        None => true,
    });

    if newer_state.is_none() && !children_changed {
        return Arc::clone(node);
    }

    let mut fragment = ShadowNodeFragment::new();
    if let Some(state) = newer_state {
        fragment = fragment.with_state(state);
    }
    if children_changed {
        fragment = fragment.with_children(children);
    }
    Arc::new(node.clone_with(fragment))
}
