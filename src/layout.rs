//! Layout metrics and the layout pass.
//!
//! Computing geometry is up to a [`LayoutEngine`]; this module only walks the tree, asks the
//! engine for frames, and clones the nodes whose frames changed.

use crate::rect::Rect;
use crate::shadow_node::{ShadowNode, ShadowNodeFragment, SharedShadowNode};
use cgmath::Vector2;
use std::sync::Arc;

/// Computed geometry of a node.
///
/// Frames are relative to the parent node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub frame: Rect,
    pub point_scale_factor: f64,
}

impl LayoutMetrics {
    /// Metrics of a node that has not been laid out yet.
    pub fn empty() -> LayoutMetrics {
        LayoutMetrics {
            frame: Rect::from_xywh(0., 0., -1., -1.),
            point_scale_factor: 1.,
        }
    }

    pub fn with_frame(frame: Rect) -> LayoutMetrics {
        LayoutMetrics {
            frame,
            ..LayoutMetrics::empty()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == LayoutMetrics::empty()
    }
}

impl Default for LayoutMetrics {
    fn default() -> LayoutMetrics {
        LayoutMetrics::empty()
    }
}

/// Size bounds for laying out a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConstraints {
    pub minimum_size: Vector2<f64>,
    pub maximum_size: Vector2<f64>,
}

impl LayoutConstraints {
    /// Constraints that allow exactly one size.
    pub fn exact(size: Vector2<f64>) -> LayoutConstraints {
        LayoutConstraints {
            minimum_size: size,
            maximum_size: size,
        }
    }

    /// Clamps a size to these constraints.
    pub fn clamp(&self, size: Vector2<f64>) -> Vector2<f64> {
        Vector2::new(
            size.x.max(self.minimum_size.x).min(self.maximum_size.x),
            size.y.max(self.minimum_size.y).min(self.maximum_size.y),
        )
    }
}

impl Default for LayoutConstraints {
    fn default() -> LayoutConstraints {
        LayoutConstraints {
            minimum_size: Vector2::new(0., 0.),
            maximum_size: Vector2::new(f64::INFINITY, f64::INFINITY),
        }
    }
}

/// Computes frames for shadow nodes.
pub trait LayoutEngine: Send + Sync {
    /// Returns the frame of `node`, which is the `index`th child of its parent (0 for the root).
    ///
    /// Constraints for children are derived from their parent's frame size.
    fn layout(&self, node: &ShadowNode, index: usize, constraints: &LayoutConstraints) -> Rect;
}

impl<F> LayoutEngine for F
where
    F: Fn(&ShadowNode, usize, &LayoutConstraints) -> Rect + Send + Sync,
{
    fn layout(&self, node: &ShadowNode, index: usize, constraints: &LayoutConstraints) -> Rect {
        self(node, index, constraints)
    }
}

/// Makes every node fill the space it is given.
///
/// Unbounded dimensions fall back to the minimum size.
#[derive(Debug, Clone, Copy, Default)]
pub struct FillLayout;

impl LayoutEngine for FillLayout {
    fn layout(&self, _: &ShadowNode, _: usize, constraints: &LayoutConstraints) -> Rect {
        let pick = |min: f64, max: f64| if max.is_finite() { max } else { min };
        Rect::from_xywh(
            0.,
            0.,
            pick(constraints.minimum_size.x, constraints.maximum_size.x),
            pick(constraints.minimum_size.y, constraints.maximum_size.y),
        )
    }
}

/// Lays out a whole tree.
///
/// Returns the same root if no frame changed; otherwise only the nodes with changed frames and
/// their ancestors are cloned.
pub fn layout_tree(
    root: &SharedShadowNode,
    engine: &dyn LayoutEngine,
    constraints: &LayoutConstraints,
    point_scale_factor: f64,
) -> SharedShadowNode {
    layout_node(root, 0, engine, constraints, point_scale_factor)
}

fn layout_node(
    node: &SharedShadowNode,
    index: usize,
    engine: &dyn LayoutEngine,
    constraints: &LayoutConstraints,
    point_scale_factor: f64,
) -> SharedShadowNode {
    let frame = engine.layout(node, index, constraints);
    let child_constraints = LayoutConstraints {
        minimum_size: Vector2::new(0., 0.),
        maximum_size: frame.size,
    };

    let mut children_changed = false;
    let children: Vec<_> = node
        .children()
        .iter()
        .enumerate()
        .map(|(i, child)| {
            let laid_out = layout_node(child, i, engine, &child_constraints, point_scale_factor);
            children_changed |= !Arc::ptr_eq(&laid_out, child);
            laid_out
        })
        .collect();

    let metrics = LayoutMetrics {
        frame,
        point_scale_factor,
    };
    let metrics_changed = metrics != node.layout_metrics();

    if !metrics_changed && !children_changed {
        return Arc::clone(node);
    }

    let mut fragment = ShadowNodeFragment::new();
    if metrics_changed {
        fragment = fragment.with_layout_metrics(metrics);
    }
    if children_changed {
        fragment = fragment.with_children(children);
    }
    Arc::new(node.clone_with(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::view::view_descriptor;
    use crate::family::ShadowNodeFamily;

    fn sealed(tag: i32, children: Vec<SharedShadowNode>) -> SharedShadowNode {
        let node = Arc::new(ShadowNode::new(
            ShadowNodeFragment::new().with_children(children),
            ShadowNodeFamily::new(tag, 1, view_descriptor()),
        ));
        node.seal();
        node
    }

    /// Stacks children vertically, 10 points each.
    fn rows(node: &ShadowNode, index: usize, constraints: &LayoutConstraints) -> Rect {
        if node.tag() == 1 {
            Rect::from_xywh(0., 0., constraints.maximum_size.x, constraints.maximum_size.y)
        } else {
            Rect::from_xywh(0., 10. * index as f64, constraints.maximum_size.x, 10.)
        }
    }

    #[test]
    fn test_layout_tree_is_copy_on_write() {
        let root = sealed(1, vec![sealed(2, vec![]), sealed(3, vec![])]);
        let constraints = LayoutConstraints::exact(Vector2::new(100., 50.));

        let laid_out = layout_tree(&root, &rows, &constraints, 2.);
        assert!(!Arc::ptr_eq(&laid_out, &root), "first layout should change every frame");
        assert_eq!(laid_out.layout_metrics().frame, Rect::from_xywh(0., 0., 100., 50.));
        assert_eq!(laid_out.layout_metrics().point_scale_factor, 2.);
        assert_eq!(
            laid_out.children()[1].layout_metrics().frame,
            Rect::from_xywh(0., 10., 100., 10.)
        );

        laid_out.seal();
        let again = layout_tree(&laid_out, &rows, &constraints, 2.);
        assert!(
            Arc::ptr_eq(&again, &laid_out),
            "a layout pass without changes should return the same tree"
        );
    }

    #[test]
    fn test_fill_layout() {
        let root = sealed(1, vec![]);
        let mut constraints = LayoutConstraints::default();
        constraints.minimum_size = Vector2::new(20., 30.);
        assert_eq!(
            FillLayout.layout(&root, 0, &constraints),
            Rect::from_xywh(0., 0., 20., 30.),
            "unbounded constraints should fall back to the minimum size"
        );
        assert_eq!(
            constraints.clamp(Vector2::new(5., 500.)),
            Vector2::new(20., 500.)
        );
    }
}
