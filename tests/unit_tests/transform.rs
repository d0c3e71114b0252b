use discretize::mesh::ElementMode;
use discretize::refmap::{reference_edge_point, reference_vertex};
use discretize::transform::{edge_half, half_label, interior_sibling, neighbor_label, EdgeHalf, TransformPath};
use matrixcompare::assert_scalar_eq;
use nalgebra::Point2;
use proptest::prelude::*;

const MODES: [ElementMode; 2] = [ElementMode::Triangle, ElementMode::Quad];

fn assert_points_eq(a: &Point2<f64>, b: &Point2<f64>) {
    assert_scalar_eq!(a.x, b.x, comp = abs, tol = 1e-14);
    assert_scalar_eq!(a.y, b.y, comp = abs, tol = 1e-14);
}

fn midpoint(a: &Point2<f64>, b: &Point2<f64>) -> Point2<f64> {
    Point2::from((a.coords + b.coords) * 0.5)
}

#[test]
fn corner_sons_keep_their_vertex() {
    for mode in MODES {
        for k in 0..mode.num_vertices() {
            let path = TransformPath::from_labels(vec![k as u8]);
            let vertex = reference_vertex(mode, k);
            assert_points_eq(&path.apply(mode, &vertex), &vertex);
        }
    }
}

#[test]
fn middle_triangle_son_is_reflected() {
    let mode = ElementMode::Triangle;
    let path = TransformPath::from_labels(vec![3]);
    let v = |k| reference_vertex(mode, k);
    // Vertex k of the middle son is the midpoint of the parent edge opposite to vertex k
    assert_points_eq(&path.apply(mode, &v(0)), &midpoint(&v(1), &v(2)));
    assert_points_eq(&path.apply(mode, &v(1)), &midpoint(&v(2), &v(0)));
    assert_points_eq(&path.apply(mode, &v(2)), &midpoint(&v(0), &v(1)));
}

#[test]
fn path_jacobian_scales_by_half_per_level() {
    let path = TransformPath::from_labels(vec![0, 2, 1]);
    let jacobian = path.jacobian(ElementMode::Quad);
    assert_scalar_eq!(jacobian.determinant(), 0.125f64.powi(2), comp = abs, tol = 1e-15);
    let reflected = TransformPath::from_labels(vec![3, 3]).jacobian(ElementMode::Triangle);
    assert_scalar_eq!(reflected[(0, 0)], 0.25, comp = abs, tol = 1e-15);
}

#[test]
fn half_labels_cover_edge_halves() {
    for mode in MODES {
        for edge in 0..mode.num_edges() {
            for half in [EdgeHalf::First, EdgeHalf::Second] {
                let label = half_label(mode, edge, half);
                assert_eq!(edge_half(mode, label, edge), Some(half));

                // The son's copy of the edge maps onto the expected half of the parent edge
                let path = TransformPath::from_labels(vec![label]);
                let (t_start, t_end) = match half {
                    EdgeHalf::First => (-1.0, 0.0),
                    EdgeHalf::Second => (0.0, 1.0),
                };
                let start = path.apply(mode, &reference_edge_point(mode, edge, -1.0));
                let end = path.apply(mode, &reference_edge_point(mode, edge, 1.0));
                assert_points_eq(&start, &reference_edge_point(mode, edge, t_start));
                assert_points_eq(&end, &reference_edge_point(mode, edge, t_end));
            }
        }
    }
}

#[test]
fn interior_siblings_share_edge_in_opposite_direction() {
    for mode in MODES {
        for label in 0..4u8 {
            for edge in 0..mode.num_edges() {
                let Some((sibling, sibling_edge)) = interior_sibling(mode, label, edge) else {
                    continue;
                };
                assert_eq!(edge_half(mode, label, edge), None);
                let own = TransformPath::from_labels(vec![label]);
                let other = TransformPath::from_labels(vec![sibling]);
                for t in [-1.0, -0.3, 0.5, 1.0] {
                    let p = own.apply(mode, &reference_edge_point(mode, edge, t));
                    let q = other.apply(mode, &reference_edge_point(mode, sibling_edge, -t));
                    assert_points_eq(&p, &q);
                }
            }
        }
    }
}

#[test]
fn every_son_edge_is_on_parent_boundary_or_interior() {
    for mode in MODES {
        for label in 0..4u8 {
            for edge in 0..mode.num_edges() {
                let on_boundary = edge_half(mode, label, edge).is_some();
                let interior = interior_sibling(mode, label, edge).is_some();
                assert!(on_boundary ^ interior, "{mode:?} son {label} edge {edge}");
            }
        }
    }
}

#[test]
fn neighbor_label_selects_matching_half() {
    // Central quad edge 1 against a neighbor quad's edge 3, running in opposite directions
    let (central, neighbor) = (ElementMode::Quad, ElementMode::Quad);
    assert_eq!(neighbor_label(central, 1, 1, neighbor, 3, false), 0);
    assert_eq!(neighbor_label(central, 1, 2, neighbor, 3, false), 3);
    // Same direction keeps the half
    assert_eq!(neighbor_label(central, 1, 1, neighbor, 3, true), 3);
    assert_eq!(neighbor_label(ElementMode::Triangle, 0, 0, ElementMode::Quad, 2, false), 3);
}

proptest! {
    #[test]
    fn nested_paths_compose(labels in prop::collection::vec(0..4u8, 0..6), x in -1.0..1.0, y in -1.0..1.0) {
        let mode = ElementMode::Quad;
        let xi = Point2::new(x, y);
        let path = TransformPath::from_labels(labels.clone());
        let (head, tail) = labels.split_at(labels.len() / 2);
        let inner = TransformPath::from_labels(tail.to_vec()).apply(mode, &xi);
        let composed = TransformPath::from_labels(head.to_vec()).apply(mode, &inner);
        prop_assert!((path.apply(mode, &xi) - composed).norm() < 1e-13);
        prop_assert_eq!(path.joined(&[]), path.clone());
        prop_assert!(path.with(1).starts_with(path.labels()));
    }
}
