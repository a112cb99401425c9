//! The basic container component.

use crate::color::Color;
use crate::component_descriptor::{ComponentDescriptor, ComponentHandle, ConcreteComponentDescriptor};
use crate::impl_props;
use crate::props::ConcreteProps;
use crate::raw_props::RawValue;
use crate::shadow_node::ShadowNodeTraits;
use std::sync::Arc;

pub const VIEW_HANDLE: ComponentHandle = ComponentHandle(2);

/// Props of a `View`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewProps {
    pub opacity: f64,
    pub background_color: Color,
    pub z_index: i32,
    /// Whether the view may be flattened away if it has no visual effect of its own.
    pub collapsable: bool,
    pub native_id: Option<String>,
}

impl Default for ViewProps {
    fn default() -> ViewProps {
        ViewProps {
            opacity: 1.,
            background_color: Color::default(),
            z_index: 0,
            collapsable: false,
            native_id: None,
        }
    }
}

impl_props!(ViewProps);

impl ViewProps {
    /// Returns true if the view would not be visible as a view of its own.
    fn is_invisible_container(&self) -> bool {
        self.opacity == 1.
            && self.background_color.is_transparent()
            && self.z_index == 0
            && self.native_id.is_none()
    }
}

impl ConcreteProps for ViewProps {
    fn set_prop(&mut self, name: &str, value: &RawValue) {
        let defaults = ViewProps::default();
        match name {
            "opacity" => self.opacity = value.as_f64().unwrap_or(defaults.opacity),
            "backgroundColor" => {
                self.background_color = value
                    .as_f64()
                    .map(|argb| Color::from_argb(argb as u32))
                    .unwrap_or(defaults.background_color)
            }
            "zIndex" => self.z_index = value.as_f64().map_or(defaults.z_index, |z| z as i32),
            "collapsable" => self.collapsable = value.as_bool().unwrap_or(defaults.collapsable),
            "nativeID" => self.native_id = value.as_str().map(str::to_string),
            _ => (),
        }
    }

    fn traits(&self) -> ShadowNodeTraits {
        if self.collapsable && self.is_invisible_container() {
            ShadowNodeTraits::empty()
        } else {
            ShadowNodeTraits::FORMS_VIEW | ShadowNodeTraits::FORMS_STACKING_CONTEXT
        }
    }

    fn order_index(&self) -> i32 {
        self.z_index
    }
}

/// Creates the descriptor for `View`.
pub fn view_descriptor() -> Arc<dyn ComponentDescriptor> {
    Arc::new(ConcreteComponentDescriptor::<ViewProps>::new(VIEW_HANDLE, "View"))
}

#[test]
fn test_view_flattening_traits() {
    use crate::raw_props::RawProps;

    let descriptor = view_descriptor();
    let props = descriptor.clone_props(None, &RawProps::new().with("collapsable", true));
    assert!(
        descriptor.traits(&*props).is_empty(),
        "an invisible collapsable view should be flattened"
    );

    let props = descriptor.clone_props(Some(&props), &RawProps::new().with("opacity", 0.5));
    assert_eq!(
        descriptor.traits(&*props),
        ShadowNodeTraits::FORMS_VIEW | ShadowNodeTraits::FORMS_STACKING_CONTEXT,
        "a translucent view has to stay a view"
    );

    let props = descriptor.clone_props(None, &RawProps::new().with("backgroundColor", 0xFF00_00FFu32));
    let props = props
        .as_any()
        .downcast_ref::<ViewProps>()
        .expect("view props should be ViewProps");
    assert_eq!(props.background_color, Color { r: 0., g: 0., b: 1., a: 1. });
}
