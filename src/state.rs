use crate::family::ShadowNodeFamily;
use core::any::Any;
use core::fmt;
use std::sync::{Arc, Weak};

/// Opaque state payload.
pub type StateData = Arc<dyn Any + Send + Sync>;

/// Versioned, opaque per-node data (e.g. a scroll offset).
///
/// States are produced on arbitrary threads. Every state knows the family it belongs to, and
/// revisions grow monotonically within a family: a family will refuse to adopt a state that is
/// not newer than the one it already has, so a slow producer can never roll state back.
pub struct State {
    revision: u64,
    data: StateData,
    family: Weak<ShadowNodeFamily>,
}

impl State {
    /// Creates the first state revision for a family.
    pub fn initial(family: &Arc<ShadowNodeFamily>, data: StateData) -> State {
        State {
            revision: 1,
            data,
            family: Arc::downgrade(family),
        }
    }

    /// Creates a state update based on this state.
    ///
    /// The update will carry the next revision number. If another update based on the same
    /// revision has already been applied, this one will be dropped.
    pub fn update(&self, data: StateData) -> StateUpdate {
        StateUpdate {
            family: Weak::clone(&self.family),
            state: Arc::new(State {
                revision: self.revision + 1,
                data,
                family: Weak::clone(&self.family),
            }),
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The raw payload.
    pub fn data(&self) -> &StateData {
        &self.data
    }

    /// Returns the payload if it is of type `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        (*self.data).downcast_ref::<T>()
    }

    /// The family this state belongs to, if it still exists.
    pub fn family(&self) -> Option<Arc<ShadowNodeFamily>> {
        self.family.upgrade()
    }

    /// Returns true if this state is strictly newer than the other state.
    pub fn is_newer_than(&self, other: &State) -> bool {
        self.revision > other.revision
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("State")
            .field("revision", &self.revision)
            .finish()
    }
}

/// A pending state change for one family.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    pub(crate) family: Weak<ShadowNodeFamily>,
    pub(crate) state: Arc<State>,
}

impl StateUpdate {
    pub fn family(&self) -> Option<Arc<ShadowNodeFamily>> {
        self.family.upgrade()
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }
}
