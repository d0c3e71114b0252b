use discretize::mesh::procedural::{
    create_rectangular_uniform_quad_mesh, create_unit_square_uniform_quad_mesh, create_unit_square_uniform_tri_mesh,
    BOTTOM, LEFT, RIGHT, TOP,
};
use discretize::mesh::{BaseElement, BoundaryEdge, ElementMode, Mesh, DEFAULT_BOUNDARY_MARKER};
use discretize::refmap::RefMap;
use matrixcompare::assert_scalar_eq;
use nalgebra::{Point2, Vector2};

fn total_area(mesh: &Mesh) -> f64 {
    mesh.active_elements()
        .map(|element| {
            let points: Vec<_> = element.vertices().iter().map(|&v| *mesh.vertex(v)).collect();
            let n = points.len();
            0.5 * (0..n)
                .map(|i| {
                    let (p, q) = (points[i], points[(i + 1) % n]);
                    p.x * q.y - q.x * p.y
                })
                .sum::<f64>()
        })
        .sum()
}

#[test]
fn uniform_quad_mesh_has_expected_layout() {
    let mesh = create_rectangular_uniform_quad_mesh(&Point2::origin(), &Vector2::new(2.0, 1.0), 2, 1).unwrap();
    assert_eq!(mesh.vertices().len(), 6);
    assert_eq!(mesh.num_base_elements(), 2);
    assert_eq!(mesh.num_active_elements(), 2);
    assert_eq!(mesh.element(1).vertices(), &[1, 2, 5, 4]);
    assert!(mesh.elements().iter().all(|e| e.mode() == ElementMode::Quad));

    assert_eq!(mesh.boundary_marker(0, 1), Some(BOTTOM));
    assert_eq!(mesh.boundary_marker(2, 5), Some(RIGHT));
    assert_eq!(mesh.boundary_marker(4, 3), Some(TOP));
    assert_eq!(mesh.boundary_marker(3, 0), Some(LEFT));
    // The shared edge is interior
    assert_eq!(mesh.boundary_marker(1, 4), None);
    assert_eq!(mesh.boundary_marker_id("right"), Some(RIGHT));
}

#[test]
fn uniform_tri_mesh_covers_unit_square() {
    let mesh = create_unit_square_uniform_tri_mesh(3).unwrap();
    assert_eq!(mesh.num_active_elements(), 18);
    assert_scalar_eq!(total_area(&mesh), 1.0, comp = abs, tol = 1e-14);
}

#[test]
fn clockwise_elements_are_reoriented() {
    let vertices = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
    let mesh = Mesh::from_base_elements(vertices, vec![BaseElement::new([0, 2, 1], 7)], vec![]).unwrap();
    assert_eq!(mesh.element(0).vertices(), &[1, 2, 0]);
    assert_eq!(mesh.element(0).marker(), 7);
    assert_scalar_eq!(total_area(&mesh), 0.5, comp = abs, tol = 1e-15);
    // Unlisted boundary edges receive the default marker
    assert_eq!(mesh.boundary_marker(0, 1), Some(DEFAULT_BOUNDARY_MARKER));
}

#[test]
fn invalid_base_meshes_are_rejected() {
    let vertices = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)];
    let degenerate = Mesh::from_base_elements(vertices.clone(), vec![BaseElement::new([0, 1, 2], 0)], vec![]);
    assert!(degenerate.is_err());

    let missing_vertex = Mesh::from_base_elements(vertices.clone(), vec![BaseElement::new([0, 1, 5], 0)], vec![]);
    assert!(missing_vertex.is_err());

    let square = vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ];
    let reserved_marker = Mesh::from_base_elements(
        square,
        vec![BaseElement::new([0, 1, 2, 3], 0)],
        vec![BoundaryEdge {
            vertices: [0, 1],
            marker: 0,
        }],
    );
    assert!(reserved_marker.is_err());
}

#[test]
fn refinement_keeps_history_and_area() {
    let mut mesh = create_unit_square_uniform_quad_mesh(1).unwrap();
    let seq = mesh.seq();
    mesh.refine_element(0).unwrap();
    assert_ne!(mesh.seq(), seq);
    assert!(!mesh.element(0).is_active());
    assert_eq!(mesh.element(0).sons(), Some(&[1, 2, 3, 4]));
    assert_eq!(mesh.num_active_elements(), 4);

    for (label, &son) in [1, 2, 3, 4].iter().enumerate() {
        let son = mesh.element(son);
        assert_eq!(son.parent(), Some(0));
        assert_eq!(son.son_label(), Some(label as u8));
        assert_eq!(son.level(), 1);
    }
    assert_scalar_eq!(total_area(&mesh), 1.0, comp = abs, tol = 1e-14);

    // Son 0 sits at vertex 0, the center is a new vertex
    let son = mesh.element(1);
    assert_eq!(*mesh.vertex(son.vertex(0)), Point2::new(0.0, 0.0));
    assert_eq!(*mesh.vertex(son.vertex(2)), Point2::new(0.5, 0.5));

    assert!(mesh.refine_element(0).is_err());
    assert!(mesh.refine_element(100).is_err());
}

#[test]
fn refined_boundary_segments_inherit_markers() {
    let mut mesh = create_unit_square_uniform_quad_mesh(1).unwrap();
    mesh.refine_all_elements().unwrap();
    let mid = mesh.midpoint(0, 1).unwrap();
    assert_eq!(*mesh.vertex(mid), Point2::new(0.5, 0.0));
    assert_eq!(mesh.boundary_marker(0, mid), Some(BOTTOM));
    assert_eq!(mesh.boundary_marker(mid, 1), Some(BOTTOM));
    let center = mesh.element(1).vertex(2);
    assert_eq!(mesh.boundary_marker(mid, center), None);
}

#[test]
fn triangle_sons_tile_parent() {
    let mut mesh = create_unit_square_uniform_tri_mesh(1).unwrap();
    mesh.refine_all_elements().unwrap();
    mesh.refine_all_elements().unwrap();
    assert_eq!(mesh.num_active_elements(), 32);
    assert_scalar_eq!(total_area(&mesh), 1.0, comp = abs, tol = 1e-14);
    for element in mesh.active_elements() {
        let refmap = RefMap::new(&mesh, element);
        assert!(refmap.is_jacobian_const());
        assert_scalar_eq!(refmap.diameter(), 0.25 * 2f64.sqrt(), comp = abs, tol = 1e-14);
    }
}

#[test]
fn edge_neighbor_finds_element_sharing_segment() {
    let mesh = create_rectangular_uniform_quad_mesh(&Point2::origin(), &Vector2::new(2.0, 1.0), 2, 1).unwrap();
    // Right edge of element 0 is the left edge of element 1
    assert_eq!(mesh.edge_neighbor(mesh.element(0), 1), Some((1, 3)));
    assert_eq!(mesh.edge_neighbor(mesh.element(1), 3), Some((0, 1)));
    assert_eq!(mesh.edge_neighbor(mesh.element(0), 0), None);
}

#[test]
fn named_markers_resolve_to_regions() {
    use discretize::weakform::Region;
    let mesh = create_unit_square_uniform_quad_mesh(2)
        .unwrap()
        .with_element_marker_name("material", 0);
    let region = Region::named_boundary(&mesh, &["left", "top"]).unwrap();
    assert!(region.contains(LEFT) && region.contains(TOP));
    assert!(!region.contains(BOTTOM));
    assert!(Region::named_elements(&mesh, &["material"]).unwrap().contains(0));
    assert!(Region::named_boundary(&mesh, &["nowhere"]).is_err());
}
