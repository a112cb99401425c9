//! Traits for backends.

use crate::mutation::ShadowView;
use crate::SurfaceId;

/// What changed about a view in an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewChange {
    Props,
    State,
    LayoutMetrics,
}

/// A platform view hierarchy that mutations are mounted into.
///
/// Backends are only called from the thread that owns the
/// [`MountingManager`](crate::MountingManager), so they need not be thread-safe.
pub trait Backend {
    /// A reference to a view in the backend.
    type ViewRef;

    /// Error type.
    type Error;

    /// Creates a new, unattached view.
    fn create_view(&mut self, view: &ShadowView) -> Result<Self::ViewRef, Self::Error>;

    /// Updates a view with a new snapshot.
    fn update_view(
        &mut self,
        view_ref: &mut Self::ViewRef,
        new: &ShadowView,
        change: ViewChange,
    ) -> Result<(), Self::Error>;

    /// Inserts `child` into the subviews of `parent` at `index`.
    fn insert_subview(
        &mut self,
        parent: &mut Self::ViewRef,
        child: &Self::ViewRef,
        index: usize,
    ) -> Result<(), Self::Error>;

    /// Removes `child` from the subviews of `parent`, where it is at `index`.
    fn remove_subview(
        &mut self,
        parent: &mut Self::ViewRef,
        child: &Self::ViewRef,
        index: usize,
    ) -> Result<(), Self::Error>;

    /// Destroys a view that is not attached to any parent.
    fn delete_view(&mut self, view_ref: Self::ViewRef) -> Result<(), Self::Error>;

    /// Makes a view the root of a surface.
    fn set_root_view(
        &mut self,
        surface_id: SurfaceId,
        view_ref: Option<&Self::ViewRef>,
    ) -> Result<(), Self::Error>;
}
