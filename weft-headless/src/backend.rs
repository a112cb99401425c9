//! An in-memory view hierarchy.

use core::fmt;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::Write;
use weft::backend::{Backend, ViewChange};
use weft::components::view::ViewProps;
use weft::{ComponentName, Rect, ShadowView, SurfaceId, Tag};

/// Index of a view in a [`HeadlessBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessViewRef(usize);

/// Errors that may occur in a [`HeadlessBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadlessError {
    /// The view was deleted.
    DeadView(HeadlessViewRef),
    /// The child is not where the removal expects it.
    NotASubview {
        parent: HeadlessViewRef,
        child: HeadlessViewRef,
        index: usize,
    },
}

impl fmt::Display for HeadlessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HeadlessError::DeadView(view) => write!(f, "view #{} was deleted", view.0),
            HeadlessError::NotASubview {
                parent,
                child,
                index,
            } => write!(
                f,
                "view #{} is not subview {} of view #{}",
                child.0, index, parent.0
            ),
        }
    }
}

impl Error for HeadlessError {}

/// A mounted view.
#[derive(Debug, Clone)]
pub struct HeadlessView {
    pub tag: Tag,
    pub component_name: ComponentName,
    pub frame: Rect,
    pub opacity: f64,
    pub state_revision: Option<u64>,
    pub updates: usize,
    subviews: Vec<HeadlessViewRef>,
}

impl HeadlessView {
    fn new(view: &ShadowView) -> HeadlessView {
        let mut headless = HeadlessView {
            tag: view.tag,
            component_name: view.component_name,
            frame: Rect::zero(),
            opacity: 1.,
            state_revision: None,
            updates: 0,
            subviews: Vec::new(),
        };
        headless.apply(view);
        headless
    }

    fn apply(&mut self, view: &ShadowView) {
        self.frame = view.layout_metrics.frame;
        self.opacity = view
            .props
            .as_any()
            .downcast_ref::<ViewProps>()
            .map_or(1., |props| props.opacity);
        self.state_revision = view.state.as_ref().map(|state| state.revision());
    }
}

/// Keeps views in an arena; deleted slots are reused.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    views: Vec<Option<HeadlessView>>,
    free: Vec<usize>,
    roots: HashMap<SurfaceId, HeadlessViewRef>,
}

impl HeadlessBackend {
    pub fn new() -> HeadlessBackend {
        HeadlessBackend::default()
    }

    pub fn get(&self, view_ref: HeadlessViewRef) -> Option<&HeadlessView> {
        self.views.get(view_ref.0).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, view_ref: HeadlessViewRef) -> Result<&mut HeadlessView, HeadlessError> {
        self.views
            .get_mut(view_ref.0)
            .and_then(Option::as_mut)
            .ok_or(HeadlessError::DeadView(view_ref))
    }

    /// Number of live views.
    pub fn view_count(&self) -> usize {
        self.views.iter().filter(|view| view.is_some()).count()
    }

    pub fn root(&self, surface_id: SurfaceId) -> Option<&HeadlessView> {
        self.roots.get(&surface_id).and_then(|root| self.get(*root))
    }

    /// Subviews of a view, in order.
    pub fn subviews(&self, view: &HeadlessView) -> Vec<&HeadlessView> {
        view.subviews
            .iter()
            .filter_map(|view_ref| self.get(*view_ref))
            .collect()
    }

    /// Renders the hierarchy of a surface, one view per line.
    ///
    /// ```text
    /// RootView [1] 0,0 320x480
    ///   View [2] 0,0 320x240 opacity 0.5
    /// ```
    pub fn describe(&self, surface_id: SurfaceId) -> String {
        let mut out = String::new();
        if let Some(root) = self.root(surface_id) {
            self.describe_view(&mut out, root, 0);
        }
        out
    }

    fn describe_view(&self, out: &mut String, view: &HeadlessView, depth: usize) {
        let frame = view.frame;
        let _ = write!(
            out,
            "{:indent$}{} [{}] {},{} {}x{}",
            "",
            view.component_name,
            view.tag,
            frame.origin.x,
            frame.origin.y,
            frame.size.x,
            frame.size.y,
            indent = depth * 2
        );
        if view.opacity != 1. {
            let _ = write!(out, " opacity {}", view.opacity);
        }
        if let Some(revision) = view.state_revision {
            let _ = write!(out, " state r{}", revision);
        }
        out.push('\n');
        for subview in self.subviews(view) {
            self.describe_view(out, subview, depth + 1);
        }
    }
}

impl Backend for HeadlessBackend {
    type ViewRef = HeadlessViewRef;
    type Error = HeadlessError;

    fn create_view(&mut self, view: &ShadowView) -> Result<HeadlessViewRef, HeadlessError> {
        let headless = HeadlessView::new(view);
        let index = match self.free.pop() {
            Some(index) => {
                self.views[index] = Some(headless);
                index
            }
            None => {
                self.views.push(Some(headless));
                self.views.len() - 1
            }
        };
        Ok(HeadlessViewRef(index))
    }

    fn update_view(
        &mut self,
        view_ref: &mut HeadlessViewRef,
        new: &ShadowView,
        _: ViewChange,
    ) -> Result<(), HeadlessError> {
        let view = self.get_mut(*view_ref)?;
        view.apply(new);
        view.updates += 1;
        Ok(())
    }

    fn insert_subview(
        &mut self,
        parent: &mut HeadlessViewRef,
        child: &HeadlessViewRef,
        index: usize,
    ) -> Result<(), HeadlessError> {
        self.get_mut(*child)?;
        let parent_view = self.get_mut(*parent)?;
        let index = index.min(parent_view.subviews.len());
        parent_view.subviews.insert(index, *child);
        Ok(())
    }

    fn remove_subview(
        &mut self,
        parent: &mut HeadlessViewRef,
        child: &HeadlessViewRef,
        index: usize,
    ) -> Result<(), HeadlessError> {
        let parent_ref = *parent;
        let parent_view = self.get_mut(parent_ref)?;
        if parent_view.subviews.get(index) != Some(child) {
            return Err(HeadlessError::NotASubview {
                parent: parent_ref,
                child: *child,
                index,
            });
        }
        parent_view.subviews.remove(index);
        Ok(())
    }

    fn delete_view(&mut self, view_ref: HeadlessViewRef) -> Result<(), HeadlessError> {
        self.get_mut(view_ref)?;
        self.views[view_ref.0] = None;
        self.free.push(view_ref.0);
        Ok(())
    }

    fn set_root_view(
        &mut self,
        surface_id: SurfaceId,
        view_ref: Option<&HeadlessViewRef>,
    ) -> Result<(), HeadlessError> {
        match view_ref {
            Some(view_ref) => {
                self.get_mut(*view_ref)?;
                self.roots.insert(surface_id, *view_ref);
            }
            None => {
                self.roots.remove(&surface_id);
            }
        }
        Ok(())
    }
}
