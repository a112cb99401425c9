//! Shadow tree commit, diffing and mounting engine.
//!
//! # Conceptual overview
//! Weft keeps an immutable model of a UI (the shadow tree) per surface, turns every change to it
//! into a minimal list of view mutations, and hands those to a platform layer that mounts them.
//!
//! ## Shadow nodes
//! A shadow node is one revision of an element: a tag, props, optional state, layout metrics and
//! children. Nodes are shared through `Arc`s and never change once sealed; a change means cloning
//! the node (and the path from the root to it) while every untouched subtree is shared with the
//! previous revision. All revisions of the same element belong to one family, which is where
//! identity lives: two nodes are "the same view" if they share a family.
//!
//! Everything component-specific (how raw props are parsed, which traits a node has, initial
//! state) is behind a [`ComponentDescriptor`], looked up by [`ComponentHandle`].
//!
//! ## Commits
//! Each surface has a [`ShadowTree`] holding its current root and revision number. A commit takes
//! a transform from the current root to a new root; the tree seals the result, optionally
//! progresses stale states, runs layout, diffs the new root against the old one and publishes the
//! resulting [`MountingTransaction`]. Commits are serialized per surface and may come from any
//! thread.
//!
//! ## Diffing
//! The differ compares two roots level by level, matching children by tag, and skips subtrees
//! that are the same object in both revisions. Nodes that do not form a stacking context are
//! flattened: their children are mounted into the closest ancestor view that does. Mutations come
//! in a fixed order per level (removes before inserts, removes with descending indices), so they
//! can be applied one by one without further bookkeeping.
//!
//! ## Mounting
//! Transactions are queued in a [`MountingCoordinator`]. The mounting side pulls whenever it is
//! ready; everything queued since the last pull is merged into one transaction, so a slow
//! consumer skips revisions without ever seeing an inconsistent tree. A [`MountingManager`] then
//! replays the mutations against a platform [`Backend`].
//!
//! ## Coordinate System
//! Frames are relative to the parent node, with the y-axis pointing down. Frames of flattened
//! nodes' children are offset into the coordinate space of the view they are mounted into.

pub mod backend;
pub mod color;
pub mod component_descriptor;
pub mod components;
pub mod differ;
pub mod element;
pub mod family;
pub mod layout;
pub mod mounting_coordinator;
pub mod mounting_manager;
pub mod mounting_transaction;
pub mod mutation;
#[macro_use]
pub mod props;
pub mod raw_props;
mod rect;
pub mod scheduler;
pub mod shadow_node;
pub mod shadow_tree;
pub mod state;
pub mod stub_view_tree;
pub mod telemetry;
pub mod ui_manager;

/// Identifies an element within a surface. Assigned by whoever creates nodes.
pub type Tag = i32;

/// Identifies a surface. The root node of a surface carries the surface id as its tag.
pub type SurfaceId = i32;

pub use backend::{Backend, ViewChange};
pub use component_descriptor::{
    ComponentDescriptor, ComponentDescriptorRegistry, ComponentHandle, ComponentName,
    ConcreteComponentDescriptor,
};
pub use differ::{calculate_mutations, DifferentiatorMode};
pub use family::ShadowNodeFamily;
pub use layout::{LayoutConstraints, LayoutEngine, LayoutMetrics};
pub use mounting_coordinator::MountingCoordinator;
pub use mounting_manager::{MountError, MountingManager};
pub use mounting_transaction::{MountingTransaction, TransactionNumber};
pub use mutation::{ShadowView, ShadowViewMutation, ShadowViewMutationList};
pub use props::{ConcreteProps, Props, SharedProps};
pub use raw_props::{RawProps, RawValue};
pub use rect::Rect;
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerDelegate};
pub use shadow_node::{
    ShadowNode, ShadowNodeFragment, ShadowNodeTraits, SharedChildren, SharedShadowNode,
};
pub use shadow_tree::{CommitMode, CommitOptions, CommitStatus, ShadowTree, ShadowTreeDelegate};
pub use state::{State, StateData, StateUpdate};
pub use stub_view_tree::{StubViewTree, StubViewTreeError};
pub use ui_manager::{UIManager, UIManagerDelegate, UIManagerError};
