//! Built-in components.

pub mod root;
pub mod view;
