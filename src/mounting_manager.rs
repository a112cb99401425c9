//! Replays mounting transactions against a [`Backend`].

use crate::backend::{Backend, ViewChange};
use crate::mounting_transaction::{MountingTransaction, TransactionNumber};
use crate::mutation::{ShadowView, ShadowViewMutation};
use crate::shadow_node::ShadowNodeTraits;
use crate::{SurfaceId, Tag};
use core::fmt;
use log::{debug, trace};
use std::collections::HashMap;
use std::error::Error;

/// Errors that may occur when mounting a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountError<E> {
    /// A mutation refers to a view that was never created (or was already deleted).
    NoSuchView(Tag),
    /// A view is created twice.
    ViewExists(Tag),
    /// A view is inserted while it is still mounted, or deleted while it is mounted.
    StillMounted(Tag),
    /// An index is out of range for the parent.
    IndexOutOfRange { parent: Tag, index: usize, len: usize },
    /// The transaction is not newer than the last one mounted.
    OutOfOrder {
        last: TransactionNumber,
        number: TransactionNumber,
    },
    /// The backend failed.
    Backend(E),
}

impl<E: fmt::Display> fmt::Display for MountError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MountError::NoSuchView(tag) => write!(f, "no mounted view with tag {}", tag),
            MountError::ViewExists(tag) => write!(f, "view {} is already mounted", tag),
            MountError::StillMounted(tag) => write!(f, "view {} still has a parent", tag),
            MountError::IndexOutOfRange { parent, index, len } => write!(
                f,
                "index {} out of range for view {} with {} subviews",
                index, parent, len
            ),
            MountError::OutOfOrder { last, number } => write!(
                f,
                "transaction {} arrived after transaction {}",
                number, last
            ),
            MountError::Backend(err) => write!(f, "backend error: {}", err),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> Error for MountError<E> {}

struct MountedView<V> {
    view_ref: V,
    parent: Option<Tag>,
    subviews: Vec<Tag>,
}

/// Owns the backend views of one surface.
pub struct MountingManager<B: Backend> {
    surface_id: SurfaceId,
    backend: B,
    views: HashMap<Tag, MountedView<B::ViewRef>>,
    last_transaction: Option<TransactionNumber>,
}

impl<B: Backend> MountingManager<B> {
    pub fn new(surface_id: SurfaceId, backend: B) -> MountingManager<B> {
        MountingManager {
            surface_id,
            backend,
            views: HashMap::new(),
            last_transaction: None,
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Number of the last transaction that was mounted.
    pub fn last_transaction(&self) -> Option<TransactionNumber> {
        self.last_transaction
    }

    /// Number of mounted views, attached or not.
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn view_ref(&self, tag: Tag) -> Option<&B::ViewRef> {
        self.views.get(&tag).map(|view| &view.view_ref)
    }

    /// Tags of the subviews of a mounted view.
    pub fn subviews(&self, tag: Tag) -> Option<&[Tag]> {
        self.views.get(&tag).map(|view| &*view.subviews)
    }

    /// Mounts a transaction.
    ///
    /// Mutations are applied in order. On error, the mutations before the failing one stay
    /// applied and the transaction is not recorded as mounted.
    pub fn apply(&mut self, transaction: &MountingTransaction) -> Result<(), MountError<B::Error>> {
        if let Some(last) = self.last_transaction {
            if transaction.number() <= last {
                return Err(MountError::OutOfOrder {
                    last,
                    number: transaction.number(),
                });
            }
        }

        for mutation in transaction.mutations() {
            trace!("surface {}: mounting {}", self.surface_id, mutation);
            self.apply_mutation(mutation)?;
        }

        self.last_transaction = Some(transaction.number());
        debug!(
            "surface {}: mounted transaction {} ({} mutations)",
            self.surface_id,
            transaction.number(),
            transaction.mutations().len()
        );
        Ok(())
    }

    fn apply_mutation(&mut self, mutation: &ShadowViewMutation) -> Result<(), MountError<B::Error>> {
        match mutation {
            ShadowViewMutation::Create { new } => self.create(new),
            ShadowViewMutation::Delete { old } => self.delete(old.tag),
            ShadowViewMutation::Insert { parent, new, index } => {
                self.insert(parent.tag, new.tag, *index)
            }
            ShadowViewMutation::Remove { parent, old, index } => {
                self.remove(parent.tag, old.tag, *index)
            }
            ShadowViewMutation::Update { new, .. } => self.update(new, ViewChange::Props),
            ShadowViewMutation::UpdateState { new, .. } => self.update(new, ViewChange::State),
            ShadowViewMutation::UpdateLayoutMetrics { new, .. } => {
                self.update(new, ViewChange::LayoutMetrics)
            }
        }
    }

    fn create(&mut self, view: &ShadowView) -> Result<(), MountError<B::Error>> {
        if self.views.contains_key(&view.tag) {
            return Err(MountError::ViewExists(view.tag));
        }
        let view_ref = self.backend.create_view(view).map_err(MountError::Backend)?;
        if view.traits.contains(ShadowNodeTraits::ROOT) {
            self.backend
                .set_root_view(self.surface_id, Some(&view_ref))
                .map_err(MountError::Backend)?;
        }
        self.views.insert(
            view.tag,
            MountedView {
                view_ref,
                parent: None,
                subviews: Vec::new(),
            },
        );
        Ok(())
    }

    fn delete(&mut self, tag: Tag) -> Result<(), MountError<B::Error>> {
        let view = self.views.remove(&tag).ok_or(MountError::NoSuchView(tag))?;
        if view.parent.is_some() {
            self.views.insert(tag, view);
            return Err(MountError::StillMounted(tag));
        }
        if tag == self.surface_id {
            self.backend
                .set_root_view(self.surface_id, None)
                .map_err(MountError::Backend)?;
        }
        self.backend
            .delete_view(view.view_ref)
            .map_err(MountError::Backend)
    }

    fn update(&mut self, view: &ShadowView, change: ViewChange) -> Result<(), MountError<B::Error>> {
        let mounted = self
            .views
            .get_mut(&view.tag)
            .ok_or(MountError::NoSuchView(view.tag))?;
        self.backend
            .update_view(&mut mounted.view_ref, view, change)
            .map_err(MountError::Backend)
    }

    fn insert(&mut self, parent_tag: Tag, tag: Tag, index: usize) -> Result<(), MountError<B::Error>> {
        match self.views.get(&tag) {
            Some(view) if view.parent.is_some() => return Err(MountError::StillMounted(tag)),
            Some(_) => (),
            None => return Err(MountError::NoSuchView(tag)),
        }

        // take the parent out so the child can be borrowed alongside it
        let mut parent = self
            .views
            .remove(&parent_tag)
            .ok_or(MountError::NoSuchView(parent_tag))?;
        let result = self.insert_into(&mut parent, parent_tag, tag, index);
        self.views.insert(parent_tag, parent);
        result?;

        if let Some(child) = self.views.get_mut(&tag) {
            child.parent = Some(parent_tag);
        }
        Ok(())
    }

    fn insert_into(
        &mut self,
        parent: &mut MountedView<B::ViewRef>,
        parent_tag: Tag,
        tag: Tag,
        index: usize,
    ) -> Result<(), MountError<B::Error>> {
        if index > parent.subviews.len() {
            return Err(MountError::IndexOutOfRange {
                parent: parent_tag,
                index,
                len: parent.subviews.len(),
            });
        }
        // a view being its own parent is not in the map while its parent is taken out
        let child = self.views.get(&tag).ok_or(MountError::NoSuchView(tag))?;
        self.backend
            .insert_subview(&mut parent.view_ref, &child.view_ref, index)
            .map_err(MountError::Backend)?;
        parent.subviews.insert(index, tag);
        Ok(())
    }

    fn remove(&mut self, parent_tag: Tag, tag: Tag, index: usize) -> Result<(), MountError<B::Error>> {
        let mut parent = self
            .views
            .remove(&parent_tag)
            .ok_or(MountError::NoSuchView(parent_tag))?;
        let result = self.remove_from(&mut parent, parent_tag, tag, index);
        self.views.insert(parent_tag, parent);
        result?;

        if let Some(child) = self.views.get_mut(&tag) {
            child.parent = None;
        }
        Ok(())
    }

    fn remove_from(
        &mut self,
        parent: &mut MountedView<B::ViewRef>,
        parent_tag: Tag,
        tag: Tag,
        index: usize,
    ) -> Result<(), MountError<B::Error>> {
        if parent.subviews.get(index) != Some(&tag) {
            return Err(MountError::IndexOutOfRange {
                parent: parent_tag,
                index,
                len: parent.subviews.len(),
            });
        }
        let child = self.views.get(&tag).ok_or(MountError::NoSuchView(tag))?;
        self.backend
            .remove_subview(&mut parent.view_ref, &child.view_ref, index)
            .map_err(MountError::Backend)?;
        parent.subviews.remove(index);
        Ok(())
    }
}

impl<B: Backend + fmt::Debug> fmt::Debug for MountingManager<B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MountingManager")
            .field("surface_id", &self.surface_id)
            .field("backend", &self.backend)
            .field("views", &self.views.len())
            .field("last_transaction", &self.last_transaction)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component_descriptor::ComponentDescriptorRegistry;
    use crate::differ::{calculate_mutations, DifferentiatorMode};
    use crate::element::{ComponentBuilder, Element};
    use crate::shadow_node::SharedShadowNode;
    use crate::telemetry::TransactionTelemetry;
    use std::sync::Arc;

    /// Records every backend call.
    #[derive(Debug, Default)]
    struct RecordingBackend {
        log: Vec<String>,
        fail_on_create: Option<Tag>,
    }

    impl Backend for RecordingBackend {
        type ViewRef = Tag;
        type Error = String;

        fn create_view(&mut self, view: &ShadowView) -> Result<Tag, String> {
            if self.fail_on_create == Some(view.tag) {
                return Err(format!("can not create {}", view.tag));
            }
            self.log.push(format!("create {} {}", view.tag, view.component_name));
            Ok(view.tag)
        }

        fn update_view(&mut self, view_ref: &mut Tag, _: &ShadowView, change: ViewChange) -> Result<(), String> {
            self.log.push(format!("update {} {:?}", view_ref, change));
            Ok(())
        }

        fn insert_subview(&mut self, parent: &mut Tag, child: &Tag, index: usize) -> Result<(), String> {
            self.log.push(format!("insert {} into {} at {}", child, parent, index));
            Ok(())
        }

        fn remove_subview(&mut self, parent: &mut Tag, child: &Tag, index: usize) -> Result<(), String> {
            self.log.push(format!("remove {} from {} at {}", child, parent, index));
            Ok(())
        }

        fn delete_view(&mut self, view_ref: Tag) -> Result<(), String> {
            self.log.push(format!("delete {}", view_ref));
            Ok(())
        }

        fn set_root_view(&mut self, surface_id: SurfaceId, view_ref: Option<&Tag>) -> Result<(), String> {
            self.log.push(format!("root of {} is {:?}", surface_id, view_ref));
            Ok(())
        }
    }

    fn transaction(
        number: TransactionNumber,
        old: Option<&SharedShadowNode>,
        new: Option<&SharedShadowNode>,
    ) -> MountingTransaction {
        MountingTransaction::new(
            1,
            number,
            calculate_mutations(DifferentiatorMode::OptimizedMoves, old, new),
            TransactionTelemetry::new(),
        )
    }

    #[test]
    fn test_mount_update_unmount() {
        let builder = ComponentBuilder::new(Arc::new(ComponentDescriptorRegistry::with_defaults()), 1);
        let first = builder.build(&Element::root(1).children(vec![Element::view(2), Element::view(3)]));
        let second = builder.build(
            &Element::root(1).children(vec![Element::view(3), Element::view(2).prop("opacity", 0.5)]),
        );

        let mut manager = MountingManager::new(1, RecordingBackend::default());
        manager
            .apply(&transaction(0, None, Some(&first)))
            .expect("mount should succeed");
        assert_eq!(
            manager.backend().log,
            vec![
                "create 1 RootView",
                "root of 1 is Some(1)",
                "create 2 View",
                "create 3 View",
                "insert 2 into 1 at 0",
                "insert 3 into 1 at 1",
            ]
        );
        assert_eq!(manager.subviews(1), Some(&[2, 3][..]));

        manager.backend_mut().log.clear();
        manager
            .apply(&transaction(1, Some(&first), Some(&second)))
            .expect("update should succeed");
        assert_eq!(manager.subviews(1), Some(&[3, 2][..]), "views should be reordered");
        assert!(manager.backend().log.contains(&"update 2 Props".to_string()));

        manager
            .apply(&transaction(2, Some(&second), None))
            .expect("unmount should succeed");
        assert_eq!(manager.view_count(), 0);
        assert_eq!(manager.last_transaction(), Some(2));
        let log = &manager.backend().log;
        assert_eq!(log[log.len() - 2..], ["root of 1 is None", "delete 1"]);
    }

    #[test]
    fn test_errors() {
        let builder = ComponentBuilder::new(Arc::new(ComponentDescriptorRegistry::with_defaults()), 1);
        let tree = builder.build(&Element::root(1).children(vec![Element::view(2)]));

        let mut manager = MountingManager::new(1, RecordingBackend::default());
        manager
            .apply(&transaction(3, None, Some(&tree)))
            .expect("mount should succeed");
        assert_eq!(
            manager.apply(&transaction(3, None, Some(&tree))).err(),
            Some(MountError::OutOfOrder { last: 3, number: 3 })
        );
        assert_eq!(
            manager.apply(&transaction(4, None, Some(&tree))).err(),
            Some(MountError::ViewExists(1)),
            "a second full mount recreates existing views"
        );

        let child = ShadowView::from(&*tree.children()[0]);
        let root = ShadowView::from(&*tree);
        let delete_mounted = MountingTransaction::new(
            1,
            5,
            vec![ShadowViewMutation::Delete { old: child.clone() }],
            TransactionTelemetry::new(),
        );
        assert_eq!(manager.apply(&delete_mounted).err(), Some(MountError::StillMounted(2)));

        let bad_index = MountingTransaction::new(
            1,
            6,
            vec![ShadowViewMutation::Remove {
                parent: root,
                old: child,
                index: 4,
            }],
            TransactionTelemetry::new(),
        );
        assert_eq!(
            manager.apply(&bad_index).err(),
            Some(MountError::IndexOutOfRange {
                parent: 1,
                index: 4,
                len: 1,
            })
        );
        assert_eq!(manager.subviews(1), Some(&[2][..]), "failed mutations change nothing");

        let mut failing = MountingManager::new(
            1,
            RecordingBackend {
                fail_on_create: Some(2),
                ..RecordingBackend::default()
            },
        );
        let err = failing
            .apply(&transaction(0, None, Some(&tree)))
            .expect_err("backend failure should surface");
        assert_eq!(err.to_string(), "backend error: can not create 2");
        assert_eq!(failing.last_transaction(), None);
    }
}
