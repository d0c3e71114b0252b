//! Lockstep traversal of several refinements of one base mesh.
//!
//! Starting from each base element, the traversal descends into the sons of every mesh whose
//! element is still refined, while meshes whose element is already active stay on it and
//! record the son label in their transformation path. A [`State`] is produced whenever all
//! meshes have reached an active element. Its region, the *union cell*, is the intersection of
//! those elements, which coincides with the active element of at least one mesh.
use crate::error::AssemblyError;
use crate::mesh::{ElementMode, Mesh};
use crate::transform::{num_sons, TransformPath};
use std::sync::Arc;

/// The active element of one mesh on a state, with the path selecting the union cell inside
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub element: usize,
    pub path: TransformPath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    /// One cell per mesh, in stage order.
    pub cells: Vec<Cell>,
    /// A mesh whose active element is the union cell itself.
    pub fine: usize,
    pub mode: ElementMode,
    /// Element marker of the union cell.
    pub marker: u32,
    /// Boundary marker of every edge of the union cell, `None` on inner edges.
    pub edge_markers: Vec<Option<u32>>,
}

impl State {
    pub fn num_edges(&self) -> usize {
        self.mode.num_edges()
    }
}

/// Checks that all meshes refine the same base mesh.
pub fn check_base_meshes(meshes: &[Arc<Mesh>]) -> Result<(), AssemblyError> {
    let Some((first, rest)) = meshes.split_first() else {
        return Ok(());
    };
    let base_vertices = |mesh: &Mesh| {
        mesh.base_elements()
            .iter()
            .flat_map(|e| e.vertices().iter().map(|&v| *mesh.vertex(v)))
            .collect::<Vec<_>>()
    };
    let reference = base_vertices(first);
    for mesh in rest {
        if mesh.num_base_elements() != first.num_base_elements() || base_vertices(mesh) != reference {
            return Err(AssemblyError::IncompatibleBaseMeshes);
        }
    }
    Ok(())
}

/// Visits every state of the given meshes, base element by base element.
pub fn traverse<F>(meshes: &[Arc<Mesh>], mut visit: F) -> eyre::Result<()>
where
    F: FnMut(&State) -> eyre::Result<()>,
{
    check_base_meshes(meshes)?;
    let Some(first) = meshes.first() else {
        return Ok(());
    };
    for base in 0..first.num_base_elements() {
        let cells = vec![
            Cell {
                element: base,
                path: TransformPath::new(),
            };
            meshes.len()
        ];
        descend(meshes, cells, &mut visit)?;
    }
    Ok(())
}

fn descend<F>(meshes: &[Arc<Mesh>], cells: Vec<Cell>, visit: &mut F) -> eyre::Result<()>
where
    F: FnMut(&State) -> eyre::Result<()>,
{
    let refined = meshes
        .iter()
        .zip(&cells)
        .any(|(mesh, cell)| !mesh.element(cell.element).is_active());

    if !refined {
        return visit(&make_state(meshes, cells));
    }

    let mode = meshes[0].element(cells[0].element).mode();
    for son in 0..num_sons(mode) {
        let son_cells = meshes
            .iter()
            .zip(&cells)
            .map(|(mesh, cell)| match mesh.element(cell.element).sons() {
                Some(sons) => Cell {
                    element: sons[son],
                    path: TransformPath::new(),
                },
                None => Cell {
                    element: cell.element,
                    path: cell.path.with(son as u8),
                },
            })
            .collect();
        descend(meshes, son_cells, visit)?;
    }
    Ok(())
}

fn make_state(meshes: &[Arc<Mesh>], cells: Vec<Cell>) -> State {
    // The mesh that caused the last descent holds an active element without a sub-path
    let fine = cells
        .iter()
        .position(|cell| cell.path.is_empty())
        .expect("Some mesh must contribute an active element to every union cell");
    let mesh = &meshes[fine];
    let element = mesh.element(cells[fine].element);
    let edge_markers = (0..element.num_edges())
        .map(|edge| {
            let (a, b) = element.edge_vertices(edge);
            mesh.boundary_marker(a, b)
        })
        .collect();
    State {
        cells,
        fine,
        mode: element.mode(),
        marker: element.marker(),
        edge_markers,
    }
}
