//! Mounting instructions.

use crate::component_descriptor::{ComponentHandle, ComponentName};
use crate::layout::LayoutMetrics;
use crate::props::{props_equal, SharedProps};
use crate::shadow_node::{ShadowNode, ShadowNodeTraits};
use crate::state::State;
use crate::{SurfaceId, Tag};
use core::fmt;
use std::sync::Arc;

/// What the mounting layer needs to know about one node: a flat snapshot without children.
#[derive(Debug, Clone)]
pub struct ShadowView {
    pub tag: Tag,
    pub surface_id: SurfaceId,
    pub component_handle: ComponentHandle,
    pub component_name: ComponentName,
    pub traits: ShadowNodeTraits,
    pub props: SharedProps,
    pub state: Option<Arc<State>>,
    pub layout_metrics: LayoutMetrics,
}

impl ShadowView {
    /// Returns true if the props differ.
    pub fn props_changed(&self, other: &ShadowView) -> bool {
        !props_equal(&self.props, &other.props)
    }

    /// Returns true if the states are different objects.
    pub fn state_changed(&self, other: &ShadowView) -> bool {
        match (&self.state, &other.state) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        }
    }

    pub fn layout_metrics_changed(&self, other: &ShadowView) -> bool {
        self.layout_metrics != other.layout_metrics
    }
}

impl From<&ShadowNode> for ShadowView {
    fn from(node: &ShadowNode) -> ShadowView {
        ShadowView {
            tag: node.tag(),
            surface_id: node.surface_id(),
            component_handle: node.component_handle(),
            component_name: node.component_name(),
            traits: node.traits(),
            props: Arc::clone(node.props()),
            state: node.state().cloned(),
            layout_metrics: node.layout_metrics(),
        }
    }
}

impl PartialEq for ShadowView {
    fn eq(&self, other: &ShadowView) -> bool {
        self.tag == other.tag
            && self.surface_id == other.surface_id
            && self.component_handle == other.component_handle
            && !self.props_changed(other)
            && !self.state_changed(other)
            && !self.layout_metrics_changed(other)
    }
}

/// One instruction for the mounting layer.
///
/// Indices refer to the parent's list of mounted children, which may differ from its list of
/// shadow node children when nodes are flattened.
#[derive(Debug, Clone, PartialEq)]
pub enum ShadowViewMutation {
    /// Creates a native view.
    Create { new: ShadowView },
    /// Destroys a native view. The view has already been removed from its parent.
    Delete { old: ShadowView },
    /// Inserts a created view into a parent.
    Insert {
        parent: ShadowView,
        new: ShadowView,
        index: usize,
    },
    /// Removes a view from its parent without destroying it.
    Remove {
        parent: ShadowView,
        old: ShadowView,
        index: usize,
    },
    /// The props of a view changed.
    Update { old: ShadowView, new: ShadowView },
    /// The state of a view changed.
    UpdateState { old: ShadowView, new: ShadowView },
    /// The frame of a view changed.
    UpdateLayoutMetrics { old: ShadowView, new: ShadowView },
}

pub type ShadowViewMutationList = Vec<ShadowViewMutation>;

impl ShadowViewMutation {
    /// The tag of the view this mutation is about.
    pub fn tag(&self) -> Tag {
        match self {
            ShadowViewMutation::Create { new } => new.tag,
            ShadowViewMutation::Delete { old } => old.tag,
            ShadowViewMutation::Insert { new, .. } => new.tag,
            ShadowViewMutation::Remove { old, .. } => old.tag,
            ShadowViewMutation::Update { new, .. }
            | ShadowViewMutation::UpdateState { new, .. }
            | ShadowViewMutation::UpdateLayoutMetrics { new, .. } => new.tag,
        }
    }

    /// The tag of the parent, for inserts and removes.
    pub fn parent_tag(&self) -> Option<Tag> {
        match self {
            ShadowViewMutation::Insert { parent, .. } | ShadowViewMutation::Remove { parent, .. } => {
                Some(parent.tag)
            }
            _ => None,
        }
    }

    /// The child index, for inserts and removes.
    pub fn index(&self) -> Option<usize> {
        match self {
            ShadowViewMutation::Insert { index, .. } | ShadowViewMutation::Remove { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, ShadowViewMutation::Create { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, ShadowViewMutation::Delete { .. })
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, ShadowViewMutation::Insert { .. })
    }

    pub fn is_remove(&self) -> bool {
        matches!(self, ShadowViewMutation::Remove { .. })
    }
}

impl fmt::Display for ShadowViewMutation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShadowViewMutation::Create { new } => {
                write!(f, "Create [{}] {}", new.tag, new.component_name)
            }
            ShadowViewMutation::Delete { old } => write!(f, "Delete [{}]", old.tag),
            ShadowViewMutation::Insert { parent, new, index } => {
                write!(f, "Insert [{}] into [{}] at {}", new.tag, parent.tag, index)
            }
            ShadowViewMutation::Remove { parent, old, index } => {
                write!(f, "Remove [{}] from [{}] at {}", old.tag, parent.tag, index)
            }
            ShadowViewMutation::Update { new, .. } => write!(f, "Update [{}]", new.tag),
            ShadowViewMutation::UpdateState { new, .. } => {
                write!(f, "UpdateState [{}]", new.tag)
            }
            ShadowViewMutation::UpdateLayoutMetrics { new, .. } => write!(
                f,
                "UpdateLayoutMetrics [{}] {:?}",
                new.tag, new.layout_metrics.frame
            ),
        }
    }
}
