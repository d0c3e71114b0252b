//! Neighbor resolution along one edge of a union cell across all meshes of a stage.
//!
//! Each mesh first lists the neighbors it sees across the edge, relative to the union cell.
//! Meshes refined differently on the far side see different numbers of neighbors, so the
//! central paths of all meshes are merged into a [`MultimeshTree`] and every record that ends
//! above a leaf is split into one record per leaf below it. Afterwards every mesh lists the
//! same segments in the same (depth-first) order.
use crate::assembly::multimesh_tree::MultimeshTree;
use crate::assembly::traverse::{Cell, State};
use crate::error::AssemblyError;
use crate::mesh::neighbors::{find_neighbors, NeighborRecord};
use crate::mesh::{ElementMode, Mesh};
use crate::transform::{edge_half, interior_sibling, neighbor_label, TransformPath};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Reconciled neighbors of one union-cell edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeNeighbors {
    /// Path selecting each segment inside the union cell, in depth-first order.
    pub segments: Vec<TransformPath>,
    /// Per mesh, one record per segment. Central paths are relative to the union cell.
    pub records: Vec<Vec<NeighborRecord>>,
}

impl EdgeNeighbors {
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }
}

struct EdgeFrame {
    mode: ElementMode,
    edge: usize,
}

impl EdgeFrame {
    /// Maps labels that subdivide the central edge to the labels subdividing the same part
    /// of the neighbor.
    fn map_labels(&self, labels: &[u8], neighbor_mode: ElementMode, neighbor_edge: usize, same: bool) -> Vec<u8> {
        labels
            .iter()
            .map(|&label| neighbor_label(self.mode, self.edge, label, neighbor_mode, neighbor_edge, same))
            .collect()
    }
}

/// Resolves the neighbors of `edge` of the union cell of `state`.
pub fn resolve_neighbors(meshes: &[Arc<Mesh>], state: &State, edge: usize) -> Result<EdgeNeighbors, AssemblyError> {
    let frame = EdgeFrame { mode: state.mode, edge };
    let raw: Vec<Vec<NeighborRecord>> = meshes
        .iter()
        .zip(&state.cells)
        .map(|(mesh, cell)| union_cell_neighbors(mesh, cell, &frame))
        .collect();

    let mut tree = MultimeshTree::new();
    for record in raw.iter().flatten() {
        tree.insert(record.central_path.labels())?;
    }
    let segments = tree.leaf_paths()?;
    let order: FxHashMap<&TransformPath, usize> = segments.iter().enumerate().map(|(i, p)| (p, i)).collect();

    let mut records = Vec::with_capacity(raw.len());
    for (mesh, mesh_records) in meshes.iter().zip(raw) {
        let mut expanded = Vec::new();
        for record in mesh_records {
            let node = tree.find(record.central_path.labels())?;
            if tree.is_leaf(node) {
                expanded.push(record);
                continue;
            }
            let mode = mesh.element(record.neighbor).mode();
            for leaf in tree.leaf_paths_below(node)? {
                let tail = frame.map_labels(leaf.labels(), mode, record.neighbor_edge, record.same_direction);
                expanded.push(NeighborRecord {
                    central_path: record.central_path.joined(leaf.labels()),
                    neighbor_path: record.neighbor_path.joined(&tail),
                    ..record.clone()
                });
            }
        }
        expanded.sort_by_key(|record| order.get(&record.central_path).copied().unwrap_or(usize::MAX));
        records.push(expanded);
    }

    let counts: Vec<usize> = records.iter().map(Vec::len).collect();
    if counts.iter().any(|&count| count != segments.len()) {
        return Err(AssemblyError::NeighborCountMismatch { counts });
    }

    Ok(EdgeNeighbors { segments, records })
}

/// Neighbors of one mesh across `frame.edge` of the union cell selected by `cell`.
fn union_cell_neighbors(mesh: &Mesh, cell: &Cell, frame: &EdgeFrame) -> Vec<NeighborRecord> {
    let labels = cell.path.labels();
    let edge = frame.edge;

    // The union cell's edge lies inside the element: the neighbor is a sibling sub-element of
    // the same element.
    if let Some(k) = labels.iter().rposition(|&l| edge_half(frame.mode, l, edge).is_none()) {
        let Some((sibling, sibling_edge)) = interior_sibling(frame.mode, labels[k], edge) else {
            return Vec::new();
        };
        let mut neighbor_path = labels[..k].to_vec();
        neighbor_path.push(sibling);
        neighbor_path.extend(frame.map_labels(&labels[k + 1..], frame.mode, sibling_edge, false));
        return vec![NeighborRecord {
            neighbor: cell.element,
            neighbor_edge: sibling_edge,
            same_direction: false,
            central_path: TransformPath::new(),
            neighbor_path: TransformPath::from_labels(neighbor_path),
        }];
    }

    find_neighbors(mesh, cell.element, edge)
        .into_iter()
        .filter_map(|record| {
            let central = record.central_path.labels().to_vec();
            if labels.starts_with(&central) {
                // The neighbor covers the whole union-cell edge
                let tail = frame.map_labels(
                    &labels[central.len()..],
                    mesh.element(record.neighbor).mode(),
                    record.neighbor_edge,
                    record.same_direction,
                );
                Some(NeighborRecord {
                    central_path: TransformPath::new(),
                    neighbor_path: record.neighbor_path.joined(&tail),
                    ..record
                })
            } else if central.starts_with(labels) {
                Some(NeighborRecord {
                    central_path: TransformPath::from_labels(&central[labels.len()..]),
                    ..record
                })
            } else {
                None
            }
        })
        .collect()
}
