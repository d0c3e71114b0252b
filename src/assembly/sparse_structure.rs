//! Discovery of the sparsity pattern of the global matrix.
use crate::assembly::neighbor::resolve_neighbors;
use crate::assembly::traverse::traverse;
use crate::mesh::Mesh;
use crate::space::{AssemblyList, Space};
use crate::sparse::SparseMatrix;
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Nonzero positions of the global matrix, collected before anything is committed to a
/// backend.
#[derive(Debug, Clone, Default)]
pub struct SparseStructure {
    size: usize,
    entries: FxHashSet<(usize, usize)>,
}

impl SparseStructure {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.entries.contains(&(row, col))
    }

    fn couple(&mut self, rows: &AssemblyList, cols: &AssemblyList) {
        for row in rows.dof.iter().flatten() {
            for col in cols.dof.iter().flatten() {
                self.entries.insert((*row, *col));
            }
        }
    }

    /// Replaces the structure of `matrix` with this one.
    pub fn commit(&self, matrix: &mut dyn SparseMatrix) -> eyre::Result<()> {
        matrix.prealloc(self.size);
        let mut entries: Vec<_> = self.entries.iter().copied().collect();
        entries.sort_unstable();
        for (row, col) in entries {
            matrix.pre_add(row, col);
        }
        matrix.alloc()
    }
}

/// Collects the sparsity pattern of all coupled blocks.
///
/// `blocks[m][n]` tells whether block `(m, n)` receives contributions. Every pair of DOFs of
/// spaces `m` and `n` that share a state is coupled. With `inner_edges`, DOFs of elements on
/// either side of an inner edge are coupled as well.
pub fn collect_structure(
    spaces: &[&dyn Space],
    blocks: &[Vec<bool>],
    num_dofs: usize,
    inner_edges: bool,
) -> eyre::Result<SparseStructure> {
    let mut meshes: Vec<Arc<Mesh>> = spaces.iter().map(|space| space.mesh().clone()).collect();
    meshes.sort_by_key(|mesh| mesh.seq());
    meshes.dedup_by_key(|mesh| mesh.seq());
    // Meshes are sorted by their unique sequence numbers, so every space finds its own
    let space_mesh: Vec<usize> = spaces
        .iter()
        .map(|space| meshes.partition_point(|mesh| mesh.seq() < space.mesh().seq()))
        .collect();

    let coupled: Vec<(usize, usize)> = (0..spaces.len())
        .flat_map(|m| (0..spaces.len()).map(move |n| (m, n)))
        .filter(|&(m, n)| blocks[m][n])
        .collect();

    let mut structure = SparseStructure {
        size: num_dofs,
        entries: FxHashSet::default(),
    };
    let mut lists = vec![AssemblyList::new(); spaces.len()];
    let mut neighbor_lists = vec![AssemblyList::new(); spaces.len()];

    traverse(&meshes, |state| {
        for (i, (space, list)) in spaces.iter().zip(&mut lists).enumerate() {
            space.element_assembly_list(state.cells[space_mesh[i]].element, list);
        }
        for &(m, n) in &coupled {
            structure.couple(&lists[m], &lists[n]);
        }

        if !inner_edges {
            return Ok(());
        }
        for edge in 0..state.num_edges() {
            if state.edge_markers[edge].is_some() {
                continue;
            }
            let neighbors = resolve_neighbors(&meshes, state, edge)?;
            for segment in 0..neighbors.num_segments() {
                for (i, space) in spaces.iter().enumerate() {
                    let record = &neighbors.records[space_mesh[i]][segment];
                    space.element_assembly_list(record.neighbor, &mut neighbor_lists[i]);
                }
                for &(m, n) in &coupled {
                    structure.couple(&lists[m], &neighbor_lists[n]);
                    structure.couple(&neighbor_lists[m], &lists[n]);
                }
            }
        }
        Ok(())
    })?;

    Ok(structure)
}
