//! The component at the root of every surface.

use crate::component_descriptor::{ComponentDescriptor, ComponentHandle, ConcreteComponentDescriptor};
use crate::impl_props;
use crate::layout::LayoutConstraints;
use crate::props::ConcreteProps;
use crate::raw_props::RawValue;
use crate::shadow_node::ShadowNodeTraits;
use std::sync::Arc;

pub const ROOT_HANDLE: ComponentHandle = ComponentHandle(1);

/// Props of the root view.
#[derive(Debug, Clone, PartialEq)]
pub struct RootProps {
    pub layout_constraints: LayoutConstraints,
    pub point_scale_factor: f64,
}

impl Default for RootProps {
    fn default() -> RootProps {
        RootProps {
            layout_constraints: LayoutConstraints::default(),
            point_scale_factor: 1.,
        }
    }
}

impl_props!(RootProps);

impl ConcreteProps for RootProps {
    fn set_prop(&mut self, name: &str, value: &RawValue) {
        let constraints = &mut self.layout_constraints;
        let value = match value.as_f64() {
            Some(value) => value,
            None => return,
        };
        match name {
            "minWidth" => constraints.minimum_size.x = value,
            "minHeight" => constraints.minimum_size.y = value,
            "maxWidth" => constraints.maximum_size.x = value,
            "maxHeight" => constraints.maximum_size.y = value,
            "pointScaleFactor" => self.point_scale_factor = value,
            _ => (),
        }
    }
}

/// Creates the descriptor for `RootView`.
pub fn root_descriptor() -> Arc<dyn ComponentDescriptor> {
    Arc::new(
        ConcreteComponentDescriptor::<RootProps>::new(ROOT_HANDLE, "RootView")
            .with_traits(ShadowNodeTraits::ROOT),
    )
}
