//! Finite element spaces: DOF numbering and assembly lists.
use crate::mesh::{Element, Mesh};
use crate::next_seq;
use crate::shapeset::{LegendreShapeset, LinearShapeset, Shapeset};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Describes how the local shape functions of one element map into global unknowns.
///
/// Entry `k` states that shape function `idx[k]`, scaled by `coef[k]`, contributes to the
/// global DOF `dof[k]`. A `None` DOF marks a fixed (Dirichlet) contribution; its coefficient is
/// the lift value. One shape function may appear several times, for example when a hanging
/// vertex is expanded into the DOFs of the edge it hangs on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyList {
    pub idx: Vec<usize>,
    pub dof: Vec<Option<usize>>,
    pub coef: Vec<f64>,
}

impl AssemblyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.idx.clear();
        self.dof.clear();
        self.coef.clear();
    }

    pub fn push(&mut self, idx: usize, dof: Option<usize>, coef: f64) {
        self.idx.push(idx);
        self.dof.push(dof);
        self.coef.push(coef);
    }

    pub fn len(&self) -> usize {
        self.idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    /// Appends all entries of `other`.
    pub fn extend_from(&mut self, other: &AssemblyList) {
        self.idx.extend_from_slice(&other.idx);
        self.dof.extend_from_slice(&other.dof);
        self.coef.extend_from_slice(&other.coef);
    }
}

/// A discrete function space on a mesh.
pub trait Space: Debug + Send + Sync {
    fn mesh(&self) -> &Arc<Mesh>;

    fn shapeset(&self) -> &Arc<dyn Shapeset>;

    /// Change-sequence number, renewed whenever DOFs are (re)assigned.
    fn seq(&self) -> u64;

    fn first_dof(&self) -> usize;

    fn num_dofs(&self) -> usize;

    /// Polynomial order on an active element.
    fn element_order(&self, element: usize) -> u32;

    /// Fills `list` with the assembly list of an active element. Elements without DOFs produce
    /// an empty list.
    fn element_assembly_list(&self, element: usize, list: &mut AssemblyList);

    /// Fills `list` with the entries whose shape functions do not vanish on `edge`.
    fn boundary_assembly_list(&self, element: usize, edge: usize, list: &mut AssemblyList);

    /// Whether an essential (Dirichlet) condition is imposed on the given boundary marker.
    fn is_essential(&self, marker: u32) -> bool;

    /// Numbers the DOFs starting at `first_dof` and returns their count.
    fn assign_dofs(&mut self, first_dof: usize) -> usize;
}

/// Numbers the DOFs of all spaces consecutively. Returns the total number of DOFs.
pub fn assign_dofs(spaces: &mut [&mut dyn Space]) -> usize {
    spaces
        .iter_mut()
        .fold(0, |first_dof, space| first_dof + space.assign_dofs(first_dof))
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum VertexDof {
    Free(usize),
    Fixed(f64),
    Hanging(usize, usize),
}

/// Continuous, piecewise linear (bilinear on quadrilaterals) space.
///
/// Essential conditions prescribe a constant value per boundary marker. Vertices in the middle
/// of an edge of a coarser active element are constrained to the average of that edge's end
/// vertices.
#[derive(Debug, Clone)]
pub struct H1Space {
    mesh: Arc<Mesh>,
    shapeset: Arc<dyn Shapeset>,
    essential: BTreeMap<u32, f64>,
    seq: u64,
    first_dof: usize,
    num_dofs: usize,
    vertex_dofs: FxHashMap<usize, VertexDof>,
}

impl H1Space {
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self::with_essential(mesh, BTreeMap::new())
    }

    /// Creates a space with essential conditions `marker -> value`. DOFs are numbered from zero.
    pub fn with_essential(mesh: Arc<Mesh>, essential: BTreeMap<u32, f64>) -> Self {
        let mut space = Self {
            mesh,
            shapeset: Arc::new(LinearShapeset),
            essential,
            seq: 0,
            first_dof: 0,
            num_dofs: 0,
            vertex_dofs: FxHashMap::default(),
        };
        space.assign_dofs(0);
        space
    }

    fn resolve(&self, vertex: usize, scale: f64, out: &mut Vec<(Option<usize>, f64)>) {
        match self.vertex_dofs.get(&vertex) {
            Some(VertexDof::Free(local)) => out.push((Some(self.first_dof + local), scale)),
            Some(VertexDof::Fixed(value)) => out.push((None, scale * value)),
            Some(&VertexDof::Hanging(a, b)) => {
                self.resolve(a, 0.5 * scale, out);
                self.resolve(b, 0.5 * scale, out);
            }
            None => {}
        }
    }

    fn push_vertex(&self, element: &Element, local: usize, list: &mut AssemblyList) {
        let mut contributions = Vec::new();
        self.resolve(element.vertex(local), 1.0, &mut contributions);
        for (dof, coef) in contributions {
            list.push(local, dof, coef);
        }
    }
}

impl Space for H1Space {
    fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    fn shapeset(&self) -> &Arc<dyn Shapeset> {
        &self.shapeset
    }

    fn seq(&self) -> u64 {
        self.seq
    }

    fn first_dof(&self) -> usize {
        self.first_dof
    }

    fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    fn element_order(&self, _element: usize) -> u32 {
        1
    }

    fn element_assembly_list(&self, element: usize, list: &mut AssemblyList) {
        list.clear();
        let element = self.mesh.element(element);
        for local in 0..element.vertices().len() {
            self.push_vertex(element, local, list);
        }
    }

    fn boundary_assembly_list(&self, element: usize, edge: usize, list: &mut AssemblyList) {
        list.clear();
        let element = self.mesh.element(element);
        let n = element.num_edges();
        self.push_vertex(element, edge, list);
        self.push_vertex(element, (edge + 1) % n, list);
    }

    fn is_essential(&self, marker: u32) -> bool {
        self.essential.contains_key(&marker)
    }

    fn assign_dofs(&mut self, first_dof: usize) -> usize {
        let mesh = &self.mesh;
        let active_edges: FxHashSet<(usize, usize)> = mesh
            .active_elements()
            .flat_map(|e| (0..e.num_edges()).map(move |edge| e.edge_vertices(edge)))
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();

        let mut vertex_dofs = FxHashMap::default();
        for ((a, b), m) in mesh.midpoints() {
            if active_edges.contains(&(a, b)) {
                vertex_dofs.insert(m, VertexDof::Hanging(a, b));
            }
        }

        // Fixed vertices; on conflicting markers the smallest marker wins.
        let mut fixed: FxHashMap<usize, (u32, f64)> = FxHashMap::default();
        for element in mesh.active_elements() {
            for edge in 0..element.num_edges() {
                let (a, b) = element.edge_vertices(edge);
                let Some(marker) = mesh.boundary_marker(a, b) else { continue };
                let Some(&value) = self.essential.get(&marker) else { continue };
                for v in [a, b] {
                    let entry = fixed.entry(v).or_insert((marker, value));
                    if marker < entry.0 {
                        *entry = (marker, value);
                    }
                }
            }
        }

        let mut num_dofs = 0;
        for element in mesh.active_elements() {
            for &v in element.vertices() {
                if vertex_dofs.contains_key(&v) {
                    continue;
                }
                let dof = match fixed.get(&v) {
                    Some(&(_, value)) => VertexDof::Fixed(value),
                    None => {
                        num_dofs += 1;
                        VertexDof::Free(num_dofs - 1)
                    }
                };
                vertex_dofs.insert(v, dof);
            }
        }

        self.vertex_dofs = vertex_dofs;
        self.first_dof = first_dof;
        self.num_dofs = num_dofs;
        self.seq = next_seq();
        num_dofs
    }
}

/// Discontinuous space of Legendre products with element-local DOFs.
#[derive(Debug, Clone)]
pub struct L2Space {
    mesh: Arc<Mesh>,
    shapeset: Arc<dyn Shapeset>,
    default_order: u32,
    orders: FxHashMap<usize, u32>,
    disabled: FxHashSet<usize>,
    seq: u64,
    first_dof: usize,
    num_dofs: usize,
    element_dofs: FxHashMap<usize, (usize, Vec<usize>)>,
}

impl L2Space {
    /// Creates a space of uniform order. DOFs are numbered from zero.
    pub fn new(mesh: Arc<Mesh>, order: u32) -> Self {
        let mut space = Self {
            mesh,
            shapeset: Arc::new(LegendreShapeset),
            default_order: order,
            orders: FxHashMap::default(),
            disabled: FxHashSet::default(),
            seq: 0,
            first_dof: 0,
            num_dofs: 0,
            element_dofs: FxHashMap::default(),
        };
        space.assign_dofs(0);
        space
    }

    /// Sets the order on one element and renumbers from the current first DOF.
    pub fn with_element_order(mut self, element: usize, order: u32) -> Self {
        self.orders.insert(element, order);
        self.assign_dofs(self.first_dof);
        self
    }

    /// Removes all DOFs of one element and renumbers from the current first DOF.
    pub fn with_disabled_element(mut self, element: usize) -> Self {
        self.disabled.insert(element);
        self.assign_dofs(self.first_dof);
        self
    }

    fn order_of(&self, element: usize) -> u32 {
        self.orders.get(&element).copied().unwrap_or(self.default_order)
    }
}

impl Space for L2Space {
    fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    fn shapeset(&self) -> &Arc<dyn Shapeset> {
        &self.shapeset
    }

    fn seq(&self) -> u64 {
        self.seq
    }

    fn first_dof(&self) -> usize {
        self.first_dof
    }

    fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    fn element_order(&self, element: usize) -> u32 {
        if self.disabled.contains(&element) {
            0
        } else {
            self.order_of(element)
        }
    }

    fn element_assembly_list(&self, element: usize, list: &mut AssemblyList) {
        list.clear();
        if let Some((first_local, indices)) = self.element_dofs.get(&element) {
            for (k, &idx) in indices.iter().enumerate() {
                list.push(idx, Some(self.first_dof + first_local + k), 1.0);
            }
        }
    }

    fn boundary_assembly_list(&self, element: usize, _edge: usize, list: &mut AssemblyList) {
        self.element_assembly_list(element, list);
    }

    fn is_essential(&self, _marker: u32) -> bool {
        false
    }

    fn assign_dofs(&mut self, first_dof: usize) -> usize {
        let mut element_dofs = FxHashMap::default();
        let mut num_dofs = 0;
        for element in self.mesh.active_elements() {
            if self.disabled.contains(&element.id()) {
                continue;
            }
            let indices = LegendreShapeset::indices(element.mode(), self.order_of(element.id()) as usize);
            let count = indices.len();
            element_dofs.insert(element.id(), (num_dofs, indices));
            num_dofs += count;
        }
        self.element_dofs = element_dofs;
        self.first_dof = first_dof;
        self.num_dofs = num_dofs;
        self.seq = next_seq();
        num_dofs
    }
}

