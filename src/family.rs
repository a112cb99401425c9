use crate::component_descriptor::{ComponentDescriptor, ComponentHandle, ComponentName};
use crate::state::State;
use crate::{SurfaceId, Tag};
use core::fmt;
use log::warn;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Identity of one logical UI element across all revisions of the shadow tree.
///
/// Every [`ShadowNode`](crate::ShadowNode) revision of the same element shares one family. The
/// family outlives any single node and carries the two pieces of information that do not belong
/// to a particular revision:
///
/// - a weak link to the parent family, so ancestry can be answered without knowing which tree
///   revision is being looked at, and
/// - the most recent [`State`], which state producers on other threads update independently of
///   commits.
pub struct ShadowNodeFamily {
    tag: Tag,
    surface_id: SurfaceId,
    descriptor: Arc<dyn ComponentDescriptor>,
    parent: Mutex<Weak<ShadowNodeFamily>>,
    most_recent_state: Mutex<Option<Arc<State>>>,
}

impl ShadowNodeFamily {
    pub fn new(
        tag: Tag,
        surface_id: SurfaceId,
        descriptor: Arc<dyn ComponentDescriptor>,
    ) -> Arc<ShadowNodeFamily> {
        Arc::new(ShadowNodeFamily {
            tag,
            surface_id,
            descriptor,
            parent: Mutex::new(Weak::new()),
            most_recent_state: Mutex::new(None),
        })
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn component_handle(&self) -> ComponentHandle {
        self.descriptor.handle()
    }

    pub fn component_name(&self) -> ComponentName {
        self.descriptor.name()
    }

    /// The descriptor that created this family.
    pub fn descriptor(&self) -> &Arc<dyn ComponentDescriptor> {
        &self.descriptor
    }

    /// Sets the parent family.
    pub(crate) fn set_parent(&self, parent: &Arc<ShadowNodeFamily>) {
        *self.parent.lock() = Arc::downgrade(parent);
    }

    /// The parent family, if there is one and it still exists.
    pub fn parent(&self) -> Option<Arc<ShadowNodeFamily>> {
        self.parent.lock().upgrade()
    }

    /// Returns all ancestor families, closest first.
    pub fn ancestors(&self) -> Vec<Arc<ShadowNodeFamily>> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(family) = current {
            current = family.parent();
            ancestors.push(family);
        }
        ancestors
    }

    /// Returns true if this family is a (transitive) ancestor of the other family.
    pub fn is_ancestor_of(&self, other: &ShadowNodeFamily) -> bool {
        other
            .ancestors()
            .iter()
            .any(|family| core::ptr::eq(&**family, self))
    }

    /// The newest state any producer has handed to this family.
    pub fn most_recent_state(&self) -> Option<Arc<State>> {
        self.most_recent_state.lock().clone()
    }

    /// Adopts a state if it is newer than the current one.
    ///
    /// Returns false (and leaves the family untouched) for stale states.
    pub fn set_most_recent_state(&self, state: Arc<State>) -> bool {
        let mut current = self.most_recent_state.lock();
        if let Some(current) = &*current {
            if !state.is_newer_than(current) {
                warn!(
                    "dropping stale state r{} for tag {}; r{} is already applied",
                    state.revision(),
                    self.tag,
                    current.revision()
                );
                return false;
            }
        }
        *current = Some(state);
        true
    }
}

impl fmt::Debug for ShadowNodeFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ShadowNodeFamily")
            .field("tag", &self.tag)
            .field("surface_id", &self.surface_id)
            .field("component", &self.descriptor.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::view::view_descriptor;
    use crate::state::State;

    #[test]
    fn test_family_ancestry() {
        let descriptor = view_descriptor();
        let root = ShadowNodeFamily::new(1, 1, Arc::clone(&descriptor));
        let a = ShadowNodeFamily::new(2, 1, Arc::clone(&descriptor));
        let aa = ShadowNodeFamily::new(3, 1, Arc::clone(&descriptor));
        a.set_parent(&root);
        aa.set_parent(&a);

        let ancestors: Vec<_> = aa.ancestors().iter().map(|f| f.tag()).collect();
        assert_eq!(ancestors, vec![2, 1], "ancestors should be listed closest first");
        assert!(root.is_ancestor_of(&aa));
        assert!(a.is_ancestor_of(&aa));
        assert!(!aa.is_ancestor_of(&a));
        assert!(!aa.is_ancestor_of(&aa), "a family is not its own ancestor");
    }

    #[test]
    fn test_family_parent_is_weak() {
        let descriptor = view_descriptor();
        let child = ShadowNodeFamily::new(2, 1, Arc::clone(&descriptor));
        {
            let parent = ShadowNodeFamily::new(1, 1, Arc::clone(&descriptor));
            child.set_parent(&parent);
            assert!(child.parent().is_some());
        }
        assert!(child.parent().is_none(), "the parent link must not keep the parent alive");
    }

    #[test]
    fn test_state_is_monotonic() {
        let family = ShadowNodeFamily::new(7, 1, view_descriptor());
        let initial = Arc::new(State::initial(&family, Arc::new(0.0f64)));
        assert!(family.set_most_recent_state(Arc::clone(&initial)));

        let newer = initial.update(Arc::new(10.0f64));
        let newest = newer.state().update(Arc::new(20.0f64));
        assert!(family.set_most_recent_state(Arc::clone(newest.state())));

        // a producer that was still working off r2 must not roll the family back
        assert!(!family.set_most_recent_state(Arc::clone(newer.state())));
        // neither can a state that was already applied
        assert!(!family.set_most_recent_state(Arc::clone(newest.state())));

        let current = family.most_recent_state().expect("family should have a state");
        assert_eq!(current.revision(), 3);
        assert_eq!(current.get::<f64>(), Some(&20.0));
    }
}
