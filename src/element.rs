//! Declarative shadow tree construction.
//!
//! ```text
//! let builder = ComponentBuilder::new(registry, surface_id);
//! let root = builder.build(&Element::root(1).children(vec![
//!     Element::view(2).prop("opacity", 0.5),
//!     Element::view(3),
//! ]));
//! ```

use crate::component_descriptor::{ComponentDescriptorRegistry, ComponentHandle};
use crate::components::root::ROOT_HANDLE;
use crate::components::view::VIEW_HANDLE;
use crate::family::ShadowNodeFamily;
use crate::layout::LayoutMetrics;
use crate::raw_props::{RawProps, RawValue};
use crate::rect::Rect;
use crate::shadow_node::{ShadowNode, ShadowNodeFragment, SharedShadowNode};
use crate::state::{State, StateData};
use crate::{SurfaceId, Tag};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A description of a shadow node and its subtree.
#[derive(Debug, Clone)]
pub struct Element {
    tag: Tag,
    component: ComponentHandle,
    props: RawProps,
    state: Option<StateData>,
    layout_metrics: Option<LayoutMetrics>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(tag: Tag, component: ComponentHandle) -> Element {
        Element {
            tag,
            component,
            props: RawProps::new(),
            state: None,
            layout_metrics: None,
            children: Vec::new(),
        }
    }

    /// A root view element.
    pub fn root(tag: Tag) -> Element {
        Element::new(tag, ROOT_HANDLE)
    }

    /// A view element.
    pub fn view(tag: Tag) -> Element {
        Element::new(tag, VIEW_HANDLE)
    }

    pub fn props(mut self, props: RawProps) -> Element {
        self.props = props;
        self
    }

    pub fn prop<V: Into<RawValue>>(mut self, name: &str, value: V) -> Element {
        self.props.insert(name, value);
        self
    }

    pub fn state(mut self, data: StateData) -> Element {
        self.state = Some(data);
        self
    }

    pub fn frame(mut self, frame: Rect) -> Element {
        self.layout_metrics = Some(LayoutMetrics::with_frame(frame));
        self
    }

    pub fn children(mut self, children: Vec<Element>) -> Element {
        self.children = children;
        self
    }
}

/// Builds sealed shadow trees from elements.
///
/// Elements with the same tag and component always end up in the same family, so trees built
/// one after another by the same builder are revisions of each other.
#[derive(Debug)]
pub struct ComponentBuilder {
    registry: Arc<ComponentDescriptorRegistry>,
    surface_id: SurfaceId,
    families: Mutex<HashMap<Tag, Arc<ShadowNodeFamily>>>,
}

impl ComponentBuilder {
    pub fn new(registry: Arc<ComponentDescriptorRegistry>, surface_id: SurfaceId) -> ComponentBuilder {
        ComponentBuilder {
            registry,
            surface_id,
            families: Mutex::new(HashMap::new()),
        }
    }

    /// Builds and seals a tree.
    ///
    /// # Panics
    /// - if an element refers to a component that is not registered
    pub fn build(&self, element: &Element) -> SharedShadowNode {
        let node = self.build_node(element);
        node.seal();
        node
    }

    fn family(&self, element: &Element) -> Arc<ShadowNodeFamily> {
        let mut families = self.families.lock();
        if let Some(family) = families.get(&element.tag) {
            if family.component_handle() == element.component {
                return Arc::clone(family);
            }
        }

        let descriptor = match self.registry.get(element.component) {
            Some(descriptor) => descriptor,
            None => panic!(
                "no component descriptor registered for {:?} (tag {})",
                element.component, element.tag
            ),
        };
        let family = ShadowNodeFamily::new(element.tag, self.surface_id, descriptor);
        families.insert(element.tag, Arc::clone(&family));
        family
    }

    fn build_node(&self, element: &Element) -> SharedShadowNode {
        let family = self.family(element);
        let props = family.descriptor().clone_props(None, &element.props);
        let children = element
            .children
            .iter()
            .map(|child| self.build_node(child))
            .collect();

        let mut fragment = ShadowNodeFragment::new()
            .with_props(props)
            .with_children(children);
        if let Some(data) = &element.state {
            let state = match family.most_recent_state() {
                Some(current) => Arc::clone(current.update(Arc::clone(data)).state()),
                None => Arc::new(State::initial(&family, Arc::clone(data))),
            };
            family.set_most_recent_state(Arc::clone(&state));
            fragment = fragment.with_state(state);
        }
        if let Some(layout_metrics) = element.layout_metrics {
            fragment = fragment.with_layout_metrics(layout_metrics);
        }

        Arc::new(ShadowNode::new(fragment, family))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::view::ViewProps;

    #[test]
    fn test_build_reuses_families() {
        let builder = ComponentBuilder::new(Arc::new(ComponentDescriptorRegistry::with_defaults()), 7);
        let element = Element::root(1).children(vec![
            Element::view(2).prop("opacity", 0.25),
            Element::view(3).frame(Rect::from_xywh(0., 0., 10., 10.)),
        ]);

        let first = builder.build(&element);
        let second = builder.build(&element);
        assert!(first.is_sealed(), "built trees should be sealed");
        assert!(first.children()[1].is_sealed());
        assert!(first.same_family(&second));
        assert!(first.children()[0].same_family(&second.children()[0]));
        assert_eq!(first.surface_id(), 7);

        let props = first.children()[0]
            .props()
            .as_any()
            .downcast_ref::<ViewProps>()
            .expect("view props should be ViewProps");
        assert_eq!(props.opacity, 0.25);
        assert_eq!(
            first.children()[1].layout_metrics().frame,
            Rect::from_xywh(0., 0., 10., 10.)
        );
        assert!(first.family().is_ancestor_of(first.children()[1].family()));
    }

    #[test]
    fn test_build_state_revisions_advance() {
        let builder = ComponentBuilder::new(Arc::new(ComponentDescriptorRegistry::with_defaults()), 1);
        let first = builder.build(&Element::view(5).state(Arc::new("a")));
        let second = builder.build(&Element::view(5).state(Arc::new("b")));

        let revision = |node: &SharedShadowNode| node.state().map(|state| state.revision());
        assert_eq!(revision(&first), Some(1));
        assert_eq!(revision(&second), Some(2));
        assert_eq!(
            second.state().and_then(|state| state.get::<&str>()),
            Some(&"b")
        );
    }
}
