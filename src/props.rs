use crate::raw_props::RawProps;
use crate::shadow_node::ShadowNodeTraits;
use core::any::Any;
use core::fmt;
use std::sync::Arc;

/// Implements the `Props` trait for a given struct.
///
/// Assumes that `PartialEq` is implemented; props that compare equal will not produce update
/// mutations.
///
/// ```text
/// impl_props! {
///     /// docs
///     StructName
/// }
/// ```
#[macro_export]
macro_rules! impl_props {
    ($(#[$attr:meta])* $struct:ty) => {
        $(#[$attr])*
        impl $crate::Props for $struct {
            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn eq_props(&self, other: &dyn $crate::Props) -> bool {
                if let Some(other) = other.as_any().downcast_ref::<$struct>() {
                    self == other
                } else {
                    false
                }
            }
        }
    };
}

/// Component properties.
///
/// Props objects are immutable once shared: a shadow node holds them through [`SharedProps`] and
/// a new set of props always means a new object. Concrete props types are only known to their
/// component descriptors; the engine itself compares them through `eq_props`.
///
/// This trait should probably be implemented using the [`impl_props`] macro.
pub trait Props: Any + fmt::Debug + Send + Sync {
    /// For downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Compares these props to another set; used for diffing.
    fn eq_props(&self, other: &dyn Props) -> bool;
}

pub type SharedProps = Arc<dyn Props>;

/// Returns true if both props are the same object or compare equal.
pub fn props_equal(a: &SharedProps, b: &SharedProps) -> bool {
    Arc::ptr_eq(a, b) || a.eq_props(&**b)
}

/// Concrete props that can be built up from raw props.
pub trait ConcreteProps: Props + Clone + Default {
    /// Applies a single raw prop. Unknown props should be ignored.
    fn set_prop(&mut self, name: &str, value: &crate::raw_props::RawValue);

    /// Traits of a node with these props.
    fn traits(&self) -> ShadowNodeTraits {
        ShadowNodeTraits::FORMS_VIEW | ShadowNodeTraits::FORMS_STACKING_CONTEXT
    }

    /// Sibling order of a node with these props.
    fn order_index(&self) -> i32 {
        0
    }

    /// Applies all raw props in order.
    fn apply(&mut self, raw: &RawProps) {
        for (name, value) in raw.iter() {
            self.set_prop(name, value);
        }
    }
}

impl_props! {
    /// Empty props.
    ()
}

impl ConcreteProps for () {
    fn set_prop(&mut self, _name: &str, _value: &crate::raw_props::RawValue) {}
}

#[test]
fn test_props_equal() {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct Opacity(f64);
    impl_props!(Opacity);

    let a: SharedProps = Arc::new(Opacity(0.5));
    let b: SharedProps = Arc::new(Opacity(0.5));
    let c: SharedProps = Arc::new(Opacity(1.));
    let unit: SharedProps = Arc::new(());

    assert!(props_equal(&a, &a), "props should equal themselves");
    assert!(props_equal(&a, &b), "structurally equal props should be equal");
    assert!(!props_equal(&a, &c));
    assert!(!props_equal(&a, &unit), "props of different types are never equal");
}
