use crate::props::{ConcreteProps, Props, SharedProps};
use crate::raw_props::RawProps;
use crate::shadow_node::ShadowNodeTraits;
use crate::state::StateData;
use core::any::type_name;
use core::fmt;
use core::marker::PhantomData;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Small integer identifying a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentHandle(pub u32);

/// Human-readable component name, e.g. `"View"`.
pub type ComponentName = &'static str;

/// Knows how to make shadow nodes of one component type.
///
/// The commit and diff machinery never sees concrete props or state types; everything
/// component-specific is routed through this trait, looked up by [`ComponentHandle`].
pub trait ComponentDescriptor: fmt::Debug + Send + Sync {
    fn handle(&self) -> ComponentHandle;

    fn name(&self) -> ComponentName;

    /// Props for a node created without any.
    fn default_props(&self) -> SharedProps;

    /// Builds a new props object from `base` (or the defaults) with `raw` applied on top.
    fn clone_props(&self, base: Option<&SharedProps>, raw: &RawProps) -> SharedProps;

    /// Traits of a node with the given props.
    fn traits(&self, props: &dyn Props) -> ShadowNodeTraits;

    /// Sibling order (z-index) of a node with the given props.
    fn order_index(&self, props: &dyn Props) -> i32 {
        let _ = props;
        0
    }

    /// State payload for a freshly created node, for stateful components.
    fn initial_state_data(&self, props: &dyn Props) -> Option<StateData> {
        let _ = props;
        None
    }
}

type InitialStateFn<P> = Box<dyn Fn(&P) -> StateData + Send + Sync>;

/// A component descriptor for a concrete props type.
pub struct ConcreteComponentDescriptor<P> {
    handle: ComponentHandle,
    name: ComponentName,
    base_traits: ShadowNodeTraits,
    initial_state: Option<InitialStateFn<P>>,
    _props: PhantomData<fn() -> P>,
}

impl<P: ConcreteProps> ConcreteComponentDescriptor<P> {
    pub fn new(handle: ComponentHandle, name: ComponentName) -> Self {
        ConcreteComponentDescriptor {
            handle,
            name,
            base_traits: ShadowNodeTraits::empty(),
            initial_state: None,
            _props: PhantomData,
        }
    }

    /// Adds traits every node of this component has regardless of its props.
    pub fn with_traits(mut self, traits: ShadowNodeTraits) -> Self {
        self.base_traits |= traits;
        self
    }

    /// Makes the component stateful.
    pub fn with_initial_state<F>(mut self, initial_state: F) -> Self
    where
        F: Fn(&P) -> StateData + Send + Sync + 'static,
    {
        self.initial_state = Some(Box::new(initial_state));
        self
    }

    fn downcast<'a>(&self, props: &'a dyn Props) -> &'a P {
        match props.as_any().downcast_ref::<P>() {
            Some(props) => props,
            None => panic!(
                "{} received props of the wrong type; expected {}",
                self.name,
                type_name::<P>()
            ),
        }
    }
}

impl<P: ConcreteProps> ComponentDescriptor for ConcreteComponentDescriptor<P> {
    fn handle(&self) -> ComponentHandle {
        self.handle
    }

    fn name(&self) -> ComponentName {
        self.name
    }

    fn default_props(&self) -> SharedProps {
        Arc::new(P::default())
    }

    fn clone_props(&self, base: Option<&SharedProps>, raw: &RawProps) -> SharedProps {
        let mut props = match base {
            Some(base) => self.downcast(&**base).clone(),
            None => P::default(),
        };
        props.apply(raw);
        Arc::new(props)
    }

    fn traits(&self, props: &dyn Props) -> ShadowNodeTraits {
        self.base_traits | self.downcast(props).traits()
    }

    fn order_index(&self, props: &dyn Props) -> i32 {
        self.downcast(props).order_index()
    }

    fn initial_state_data(&self, props: &dyn Props) -> Option<StateData> {
        let initial_state = self.initial_state.as_ref()?;
        Some(initial_state(self.downcast(props)))
    }
}

impl<P> fmt::Debug for ConcreteComponentDescriptor<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConcreteComponentDescriptor")
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("base_traits", &self.base_traits)
            .field("stateful", &self.initial_state.is_some())
            .finish()
    }
}

/// Component descriptors by handle.
#[derive(Debug, Default)]
pub struct ComponentDescriptorRegistry {
    descriptors: RwLock<HashMap<ComponentHandle, Arc<dyn ComponentDescriptor>>>,
}

impl ComponentDescriptorRegistry {
    pub fn new() -> ComponentDescriptorRegistry {
        ComponentDescriptorRegistry::default()
    }

    /// Creates a registry with the built-in root and view components.
    pub fn with_defaults() -> ComponentDescriptorRegistry {
        let registry = ComponentDescriptorRegistry::new();
        registry.add(crate::components::root::root_descriptor());
        registry.add(crate::components::view::view_descriptor());
        registry
    }

    /// Registers a descriptor, replacing any previous one with the same handle.
    pub fn add(&self, descriptor: Arc<dyn ComponentDescriptor>) {
        self.descriptors.write().insert(descriptor.handle(), descriptor);
    }

    pub fn get(&self, handle: ComponentHandle) -> Option<Arc<dyn ComponentDescriptor>> {
        self.descriptors.read().get(&handle).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<dyn ComponentDescriptor>> {
        self.descriptors
            .read()
            .values()
            .find(|descriptor| descriptor.name() == name)
            .cloned()
    }
}
