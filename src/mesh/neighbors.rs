//! Neighbor search across one edge of an active element of a single mesh.
//!
//! Neighbors across an edge may be refined differently from the central element. Each returned
//! [`NeighborRecord`] describes one segment of the edge on which exactly one active element of
//! each side is present, together with the sub-element paths that select that segment from the
//! central and the neighbor side.
use crate::mesh::{Element, Mesh};
use crate::transform::{half_label, neighbor_label, EdgeHalf, TransformPath};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRecord {
    /// Active element on the other side of the segment.
    pub neighbor: usize,
    /// Local edge of `neighbor` that contains the segment.
    pub neighbor_edge: usize,
    /// Whether the neighbor's edge runs in the same direction as the central edge.
    pub same_direction: bool,
    /// Selects the segment within the central element. Non-empty when the neighbor is finer.
    pub central_path: TransformPath,
    /// Selects the segment within the neighbor. Non-empty when the neighbor is coarser.
    pub neighbor_path: TransformPath,
}

fn same_direction(central: &Element, edge: usize, neighbor: &Element, neighbor_edge: usize) -> bool {
    central.edge_vertices(edge).0 == neighbor.edge_vertices(neighbor_edge).0
}

/// Finds all active elements across `edge` of the active element `element`.
///
/// Returns an empty list on the boundary.
pub fn find_neighbors(mesh: &Mesh, element: usize, edge: usize) -> Vec<NeighborRecord> {
    let central = mesh.element(element);
    let mut records = Vec::new();

    if let Some((neighbor, neighbor_edge)) = mesh.edge_neighbor(central, edge) {
        let same = same_direction(central, edge, mesh.element(neighbor), neighbor_edge);
        collect_finer(mesh, central, edge, neighbor, neighbor_edge, same, TransformPath::new(), &mut records);
        return records;
    }

    // Climb until an ancestor's edge has a neighbor, remembering the son labels on the way.
    let mut labels = Vec::new();
    let mut current = central;
    while let (Some(parent), Some(label)) = (current.parent(), current.son_label()) {
        labels.push(label);
        current = mesh.element(parent);
        if let Some((neighbor, neighbor_edge)) = mesh.edge_neighbor(current, edge) {
            let neighbor_element = mesh.element(neighbor);
            let same = same_direction(current, edge, neighbor_element, neighbor_edge);
            let neighbor_path = labels
                .iter()
                .rev()
                .map(|&label| {
                    neighbor_label(
                        central.mode(),
                        edge,
                        label,
                        neighbor_element.mode(),
                        neighbor_edge,
                        same,
                    )
                })
                .collect::<Vec<_>>();
            records.push(NeighborRecord {
                neighbor,
                neighbor_edge,
                same_direction: same,
                central_path: TransformPath::new(),
                neighbor_path: TransformPath::from_labels(neighbor_path),
            });
            break;
        }
    }
    records
}

#[allow(clippy::too_many_arguments)]
fn collect_finer(
    mesh: &Mesh,
    central: &Element,
    edge: usize,
    neighbor: usize,
    neighbor_edge: usize,
    same: bool,
    central_path: TransformPath,
    records: &mut Vec<NeighborRecord>,
) {
    let neighbor_element = mesh.element(neighbor);
    match neighbor_element.sons() {
        None => records.push(NeighborRecord {
            neighbor,
            neighbor_edge,
            same_direction: same,
            central_path,
            neighbor_path: TransformPath::new(),
        }),
        Some(sons) => {
            let mode = neighbor_element.mode();
            for neighbor_half in [EdgeHalf::First, EdgeHalf::Second] {
                let son = sons[half_label(mode, neighbor_edge, neighbor_half) as usize];
                let central_half = match (neighbor_half, same) {
                    (EdgeHalf::First, true) | (EdgeHalf::Second, false) => EdgeHalf::First,
                    _ => EdgeHalf::Second,
                };
                let label = half_label(central.mode(), edge, central_half);
                collect_finer(
                    mesh,
                    central,
                    edge,
                    son,
                    neighbor_edge,
                    same,
                    central_path.with(label),
                    records,
                );
            }
        }
    }
}
