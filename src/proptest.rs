//! Strategies for property-based tests of meshes and their refinements.
use crate::mesh::procedural::{create_unit_square_uniform_quad_mesh, create_unit_square_uniform_tri_mesh};
use crate::mesh::{ElementMode, Mesh};
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use ::proptest::sample::Index;

/// Refines the active element picked by each index, in order.
pub fn refine_by_indices(mesh: &mut Mesh, choices: &[Index]) -> eyre::Result<()> {
    for choice in choices {
        let active: Vec<usize> = mesh.active_elements().map(|e| e.id()).collect();
        mesh.refine_element(active[choice.index(active.len())])?;
    }
    Ok(())
}

pub fn element_mode() -> impl Strategy<Value = ElementMode> {
    prop_oneof![Just(ElementMode::Triangle), Just(ElementMode::Quad)]
}

/// Unit square meshes with `1..=max_cells` cells per dimension.
pub fn unit_square_mesh(max_cells: usize) -> impl Strategy<Value = Mesh> {
    (element_mode(), 1..=max_cells).prop_filter_map("mesh generation failed", |(mode, cells)| match mode {
        ElementMode::Triangle => create_unit_square_uniform_tri_mesh(cells).ok(),
        ElementMode::Quad => create_unit_square_uniform_quad_mesh(cells).ok(),
    })
}

/// `count` meshes sharing one base mesh, each refined independently at up to
/// `max_refinements` randomly chosen active elements.
pub fn refined_meshes(count: usize, max_cells: usize, max_refinements: usize) -> impl Strategy<Value = Vec<Mesh>> {
    let choices = vec(vec(any::<Index>(), 0..=max_refinements), count);
    (unit_square_mesh(max_cells), choices).prop_filter_map("refinement failed", |(base, choices)| {
        choices
            .iter()
            .map(|choices| {
                let mut mesh = base.clone();
                refine_by_indices(&mut mesh, choices)?;
                Ok(mesh)
            })
            .collect::<eyre::Result<Vec<_>>>()
            .ok()
    })
}
