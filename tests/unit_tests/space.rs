use discretize::mesh::procedural::{
    create_rectangular_uniform_quad_mesh, create_unit_square_uniform_quad_mesh, create_unit_square_uniform_tri_mesh,
    BOTTOM, LEFT, TOP,
};
use discretize::mesh::Mesh;
use discretize::space::{assign_dofs, AssemblyList, H1Space, L2Space, Space};
use nalgebra::{Point2, Vector2};
use std::collections::BTreeMap;
use std::sync::Arc;

fn two_cell_mesh_with_refined_left_cell() -> Arc<Mesh> {
    let mut mesh = create_rectangular_uniform_quad_mesh(&Point2::origin(), &Vector2::new(2.0, 1.0), 2, 1).unwrap();
    mesh.refine_element(0).unwrap();
    Arc::new(mesh)
}

#[test]
fn h1_space_has_one_dof_per_vertex() {
    let mesh = Arc::new(create_unit_square_uniform_quad_mesh(2).unwrap());
    let space = H1Space::new(mesh.clone());
    assert_eq!(space.num_dofs(), 9);
    assert_eq!(space.first_dof(), 0);
    assert_eq!(space.element_order(0), 1);

    let mut list = AssemblyList::new();
    for element in mesh.active_elements() {
        space.element_assembly_list(element.id(), &mut list);
        assert_eq!(list.idx, vec![0, 1, 2, 3]);
        assert!(list.dof.iter().all(Option::is_some));
        assert!(list.coef.iter().all(|&c| c == 1.0));
    }
}

#[test]
fn h1_essential_vertices_carry_lift() {
    let mesh = Arc::new(create_unit_square_uniform_quad_mesh(2).unwrap());
    let space = H1Space::with_essential(mesh, BTreeMap::from([(LEFT, 2.0)]));
    assert_eq!(space.num_dofs(), 6);
    assert!(space.is_essential(LEFT));
    assert!(!space.is_essential(TOP));

    // Local vertices 0 and 3 of element 0 lie on the left boundary
    let mut list = AssemblyList::new();
    space.element_assembly_list(0, &mut list);
    assert_eq!(list.dof[0], None);
    assert_eq!(list.coef[0], 2.0);
    assert_eq!(list.dof[3], None);
    assert_eq!(list.coef[3], 2.0);
    assert!(list.dof[1].is_some());
    assert!(list.dof[2].is_some());
}

#[test]
fn h1_corner_takes_value_of_smallest_marker() {
    let mesh = Arc::new(create_unit_square_uniform_quad_mesh(1).unwrap());
    let essential = BTreeMap::from([(BOTTOM, 1.0), (LEFT, 4.0)]);
    let space = H1Space::with_essential(mesh, essential);
    assert_eq!(space.num_dofs(), 1);

    let mut list = AssemblyList::new();
    space.element_assembly_list(0, &mut list);
    assert_eq!(list.dof[0], None);
    assert_eq!(list.coef[0], 1.0);
    assert_eq!(list.coef[3], 4.0);
}

#[test]
fn h1_fully_constrained_square_keeps_interior_dof() {
    let mesh = Arc::new(create_unit_square_uniform_quad_mesh(2).unwrap());
    let essential = (1..=4).map(|marker| (marker, 0.0)).collect();
    let space = H1Space::with_essential(mesh, essential);
    assert_eq!(space.num_dofs(), 1);
}

#[test]
fn h1_boundary_list_covers_edge_vertices() {
    let mesh = Arc::new(create_unit_square_uniform_quad_mesh(1).unwrap());
    let space = H1Space::new(mesh);
    let mut element_list = AssemblyList::new();
    let mut list = AssemblyList::new();
    space.element_assembly_list(0, &mut element_list);
    space.boundary_assembly_list(0, 3, &mut list);
    assert_eq!(list.idx, vec![3, 0]);
    assert_eq!(list.dof, vec![element_list.dof[3], element_list.dof[0]]);
}

#[test]
fn h1_hanging_vertex_is_averaged() {
    let mesh = two_cell_mesh_with_refined_left_cell();
    let space = H1Space::new(mesh.clone());
    // 6 base vertices plus 3 edge midpoints and the center; the midpoint on the shared edge hangs
    assert_eq!(space.num_dofs(), 10);

    let mut coarse = AssemblyList::new();
    space.element_assembly_list(1, &mut coarse);
    let (bottom, top) = (coarse.dof[0], coarse.dof[3]);

    // Son 1 of element 0 touches the shared edge with its local vertex 2
    let son = mesh.element(0).sons().unwrap()[1];
    let mut list = AssemblyList::new();
    space.element_assembly_list(son, &mut list);
    assert_eq!(list.len(), 5);
    let hanging: Vec<_> = (0..list.len()).filter(|&k| list.idx[k] == 2).collect();
    assert_eq!(hanging.len(), 2);
    for &k in &hanging {
        assert_eq!(list.coef[k], 0.5);
    }
    let mut dofs: Vec<_> = hanging.iter().map(|&k| list.dof[k]).collect();
    dofs.sort();
    let mut expected = vec![bottom, top];
    expected.sort();
    assert_eq!(dofs, expected);
}

#[test]
fn assign_dofs_numbers_spaces_consecutively() {
    let mesh = Arc::new(create_unit_square_uniform_quad_mesh(2).unwrap());
    let mut h1 = H1Space::new(mesh.clone());
    let mut l2 = L2Space::new(mesh, 0);
    let seq_before = l2.seq();

    let total = assign_dofs(&mut [&mut h1, &mut l2]);
    assert_eq!(total, 9 + 4);
    assert_eq!(h1.first_dof(), 0);
    assert_eq!(l2.first_dof(), 9);
    assert_ne!(l2.seq(), seq_before);

    let mut list = AssemblyList::new();
    l2.element_assembly_list(0, &mut list);
    assert_eq!(list.dof, vec![Some(9)]);
}

#[test]
fn l2_dof_counts_follow_element_shape_and_order() {
    let quads = Arc::new(create_unit_square_uniform_quad_mesh(2).unwrap());
    let tris = Arc::new(create_unit_square_uniform_tri_mesh(2).unwrap());
    assert_eq!(L2Space::new(quads.clone(), 0).num_dofs(), 4);
    assert_eq!(L2Space::new(quads.clone(), 1).num_dofs(), 16);
    assert_eq!(L2Space::new(tris, 1).num_dofs(), 24);

    let space = L2Space::new(quads, 1).with_element_order(0, 2);
    assert_eq!(space.num_dofs(), 9 + 3 * 4);
    assert_eq!(space.element_order(0), 2);
    assert_eq!(space.element_order(1), 1);
}

#[test]
fn l2_dofs_are_element_local() {
    let mesh = Arc::new(create_unit_square_uniform_quad_mesh(2).unwrap());
    let space = L2Space::new(mesh, 1);
    let mut first = AssemblyList::new();
    let mut second = AssemblyList::new();
    space.element_assembly_list(0, &mut first);
    space.element_assembly_list(1, &mut second);
    assert_eq!(first.dof, vec![Some(0), Some(1), Some(2), Some(3)]);
    assert_eq!(second.dof, vec![Some(4), Some(5), Some(6), Some(7)]);

    let mut boundary = AssemblyList::new();
    space.boundary_assembly_list(0, 0, &mut boundary);
    assert_eq!(boundary, first);
}

#[test]
fn l2_disabled_element_has_no_dofs() {
    let mesh = Arc::new(create_unit_square_uniform_quad_mesh(2).unwrap());
    let space = L2Space::new(mesh, 0).with_disabled_element(0);
    assert_eq!(space.num_dofs(), 3);
    assert_eq!(space.element_order(0), 0);

    let mut list = AssemblyList::new();
    space.element_assembly_list(0, &mut list);
    assert!(list.is_empty());
    space.element_assembly_list(1, &mut list);
    assert_eq!(list.dof, vec![Some(0)]);
}
