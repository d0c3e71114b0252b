//! Two-dimensional meshes of triangles and quadrilaterals with a refinement history.
//!
//! A mesh keeps every element it ever contained: the base elements it was created from and all
//! sons produced by refinement. Only elements without sons are *active*. Keeping the history
//! lets the assembly engine walk several independently refined meshes that share one base mesh
//! in lockstep, and lets neighbor searches climb to coarser ancestors.
use crate::next_seq;
use eyre::eyre;
use log::debug;
use nalgebra::Point2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod neighbors;
pub mod procedural;

/// Marker carried by edges in the interior of the domain.
pub const INNER_EDGE_MARKER: u32 = 0;

/// Marker assigned to boundary edges that were not given one explicitly.
pub const DEFAULT_BOUNDARY_MARKER: u32 = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementMode {
    Triangle,
    Quad,
}

impl ElementMode {
    pub fn num_vertices(self) -> usize {
        match self {
            ElementMode::Triangle => 3,
            ElementMode::Quad => 4,
        }
    }

    pub fn num_edges(self) -> usize {
        self.num_vertices()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    id: usize,
    mode: ElementMode,
    vertices: [usize; 4],
    marker: u32,
    parent: Option<usize>,
    son_label: Option<u8>,
    sons: Option<[usize; 4]>,
    level: usize,
}

impl Element {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn mode(&self) -> ElementMode {
        self.mode
    }

    pub fn num_edges(&self) -> usize {
        self.mode.num_edges()
    }

    /// Vertex indices in counter-clockwise order.
    pub fn vertices(&self) -> &[usize] {
        &self.vertices[..self.mode.num_vertices()]
    }

    pub fn vertex(&self, local_index: usize) -> usize {
        self.vertices()[local_index]
    }

    /// The vertices of local edge `edge`, which runs from vertex `edge` to vertex `edge + 1`.
    pub fn edge_vertices(&self, edge: usize) -> (usize, usize) {
        let n = self.num_edges();
        (self.vertices[edge], self.vertices[(edge + 1) % n])
    }

    pub fn marker(&self) -> u32 {
        self.marker
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// The label under which this element appears among its parent's sons.
    pub fn son_label(&self) -> Option<u8> {
        self.son_label
    }

    pub fn sons(&self) -> Option<&[usize; 4]> {
        self.sons.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.sons.is_none()
    }

    pub fn level(&self) -> usize {
        self.level
    }
}

/// Description of an element of the initial (base) mesh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseElement {
    pub vertices: Vec<usize>,
    pub marker: u32,
}

impl BaseElement {
    pub fn new(vertices: impl Into<Vec<usize>>, marker: u32) -> Self {
        Self {
            vertices: vertices.into(),
            marker,
        }
    }
}

/// A marked boundary edge of the base mesh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryEdge {
    pub vertices: [usize; 2],
    pub marker: u32,
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn signed_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (p, q) = (points[i], points[(i + 1) % n]);
            p.x * q.y - q.x * p.y
        })
        .sum::<f64>()
        * 0.5
}

#[derive(Debug, Clone)]
pub struct Mesh {
    seq: u64,
    vertices: Vec<Point2<f64>>,
    elements: Vec<Element>,
    num_base_elements: usize,
    // Sorted vertex pair -> (element, local edge) for every element ever created
    edges: FxHashMap<(usize, usize), Vec<(usize, usize)>>,
    midpoints: FxHashMap<(usize, usize), usize>,
    boundary_markers: FxHashMap<(usize, usize), u32>,
    element_marker_names: BTreeMap<String, u32>,
    boundary_marker_names: BTreeMap<String, u32>,
}

impl Mesh {
    /// Creates a mesh from base elements and marked boundary edges.
    ///
    /// Elements given in clockwise order are reoriented. Boundary edges (edges owned by a single
    /// element) that are not listed in `boundary` receive [`DEFAULT_BOUNDARY_MARKER`].
    pub fn from_base_elements(
        vertices: Vec<Point2<f64>>,
        elements: Vec<BaseElement>,
        boundary: Vec<BoundaryEdge>,
    ) -> eyre::Result<Self> {
        let mut mesh = Self {
            seq: next_seq(),
            vertices,
            elements: Vec::with_capacity(elements.len()),
            num_base_elements: elements.len(),
            edges: FxHashMap::default(),
            midpoints: FxHashMap::default(),
            boundary_markers: FxHashMap::default(),
            element_marker_names: BTreeMap::new(),
            boundary_marker_names: BTreeMap::new(),
        };

        for (id, base) in elements.into_iter().enumerate() {
            let mode = match base.vertices.len() {
                3 => ElementMode::Triangle,
                4 => ElementMode::Quad,
                n => return Err(eyre!("element {id} has {n} vertices, expected 3 or 4")),
            };
            if let Some(&v) = base.vertices.iter().find(|&&v| v >= mesh.vertices.len()) {
                return Err(eyre!("element {id} references vertex {v}, which does not exist"));
            }
            let points: Vec<_> = base.vertices.iter().map(|&v| mesh.vertices[v]).collect();
            let area = signed_area(&points);
            if area == 0.0 {
                return Err(eyre!("element {id} is degenerate"));
            }
            let mut local = base.vertices;
            if area < 0.0 {
                local.reverse();
            }
            let mut element_vertices = [0; 4];
            element_vertices[..local.len()].copy_from_slice(&local);
            mesh.elements.push(Element {
                id,
                mode,
                vertices: element_vertices,
                marker: base.marker,
                parent: None,
                son_label: None,
                sons: None,
                level: 0,
            });
            mesh.register_edges(id)?;
        }

        for edge in boundary {
            let key = edge_key(edge.vertices[0], edge.vertices[1]);
            match mesh.edges.get(&key).map(Vec::len) {
                Some(1) => {}
                Some(_) => return Err(eyre!("edge {:?} is not on the boundary", edge.vertices)),
                None => return Err(eyre!("edge {:?} is not an edge of the mesh", edge.vertices)),
            }
            if edge.marker == INNER_EDGE_MARKER {
                return Err(eyre!(
                    "boundary edge {:?} uses the reserved inner edge marker",
                    edge.vertices
                ));
            }
            mesh.boundary_markers.insert(key, edge.marker);
        }

        let unmarked: Vec<_> = mesh
            .edges
            .iter()
            .filter(|(key, owners)| owners.len() == 1 && !mesh.boundary_markers.contains_key(*key))
            .map(|(&key, _)| key)
            .collect();
        if !unmarked.is_empty() {
            debug!(
                "Assigning default marker {DEFAULT_BOUNDARY_MARKER} to {} unmarked boundary edges",
                unmarked.len()
            );
        }
        for key in unmarked {
            mesh.boundary_markers.insert(key, DEFAULT_BOUNDARY_MARKER);
        }

        Ok(mesh)
    }

    /// Associates a user-facing name with an element marker.
    pub fn with_element_marker_name(mut self, name: impl Into<String>, marker: u32) -> Self {
        self.element_marker_names.insert(name.into(), marker);
        self
    }

    /// Associates a user-facing name with a boundary marker.
    pub fn with_boundary_marker_name(mut self, name: impl Into<String>, marker: u32) -> Self {
        self.boundary_marker_names.insert(name.into(), marker);
        self
    }

    pub fn element_marker_id(&self, name: &str) -> Option<u32> {
        self.element_marker_names.get(name).copied()
    }

    pub fn boundary_marker_id(&self, name: &str) -> Option<u32> {
        self.boundary_marker_names.get(name).copied()
    }

    /// Change-sequence number. It is unique across all meshes of the process and changes on
    /// every refinement, so it also identifies the mesh.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    pub fn vertex(&self, index: usize) -> &Point2<f64> {
        &self.vertices[index]
    }

    /// # Panics
    ///
    /// Panics if the element does not exist.
    pub fn element(&self, id: usize) -> &Element {
        &self.elements[id]
    }

    pub fn get_element(&self, id: usize) -> Option<&Element> {
        self.elements.get(id)
    }

    /// All elements, including inactive (refined) ones.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn num_base_elements(&self) -> usize {
        self.num_base_elements
    }

    pub fn base_elements(&self) -> &[Element] {
        &self.elements[..self.num_base_elements]
    }

    pub fn active_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.is_active())
    }

    pub fn num_active_elements(&self) -> usize {
        self.active_elements().count()
    }

    /// The vertex created at the midpoint of the segment `a`-`b`, if the segment was split.
    pub fn midpoint(&self, a: usize, b: usize) -> Option<usize> {
        self.midpoints.get(&edge_key(a, b)).copied()
    }

    /// Iterates over split segments as `((a, b), midpoint)`.
    pub fn midpoints(&self) -> impl Iterator<Item = ((usize, usize), usize)> + '_ {
        self.midpoints.iter().map(|(&key, &m)| (key, m))
    }

    /// Marker of the boundary segment `a`-`b`, or `None` if it is not a boundary segment.
    pub fn boundary_marker(&self, a: usize, b: usize) -> Option<u32> {
        self.boundary_markers.get(&edge_key(a, b)).copied()
    }

    /// The other element that has the same segment as `edge` of `element` as one of its edges,
    /// together with that element's local edge index.
    pub fn edge_neighbor(&self, element: &Element, edge: usize) -> Option<(usize, usize)> {
        let (a, b) = element.edge_vertices(edge);
        self.edges
            .get(&edge_key(a, b))?
            .iter()
            .find(|(owner, _)| *owner != element.id)
            .copied()
    }

    /// Largest distance between two vertices of the element.
    pub fn diameter(&self, element: &Element) -> f64 {
        let vertices = element.vertices();
        let mut diameter: f64 = 0.0;
        for (i, &a) in vertices.iter().enumerate() {
            for &b in &vertices[i + 1..] {
                diameter = diameter.max((self.vertices[a] - self.vertices[b]).norm());
            }
        }
        diameter
    }

    /// Splits an active element into four sons.
    pub fn refine_element(&mut self, id: usize) -> eyre::Result<()> {
        let element = self
            .elements
            .get(id)
            .ok_or_else(|| eyre!("element {id} does not exist"))?
            .clone();
        if !element.is_active() {
            return Err(eyre!("element {id} is already refined"));
        }

        let n = element.num_edges();
        let mids: Vec<usize> = (0..n)
            .map(|edge| {
                let (a, b) = element.edge_vertices(edge);
                self.split_segment(a, b)
            })
            .collect();
        let v = element.vertices();

        let son_vertices: [[usize; 4]; 4] = match element.mode {
            ElementMode::Triangle => [
                [v[0], mids[0], mids[2], 0],
                [mids[0], v[1], mids[1], 0],
                [mids[2], mids[1], v[2], 0],
                [mids[1], mids[2], mids[0], 0],
            ],
            ElementMode::Quad => {
                let center = v
                    .iter()
                    .fold(Point2::origin(), |acc, &i| acc + self.vertices[i].coords * 0.25);
                let c = self.vertices.len();
                self.vertices.push(center);
                [
                    [v[0], mids[0], c, mids[3]],
                    [mids[0], v[1], mids[1], c],
                    [c, mids[1], v[2], mids[2]],
                    [mids[3], c, mids[2], v[3]],
                ]
            }
        };

        let first_son = self.elements.len();
        let sons = [first_son, first_son + 1, first_son + 2, first_son + 3];
        for (label, vertices) in son_vertices.into_iter().enumerate() {
            self.elements.push(Element {
                id: first_son + label,
                mode: element.mode,
                vertices,
                marker: element.marker,
                parent: Some(id),
                son_label: Some(label as u8),
                sons: None,
                level: element.level + 1,
            });
            self.register_edges(first_son + label)?;
        }
        self.elements[id].sons = Some(sons);
        self.seq = next_seq();
        Ok(())
    }

    /// Refines every currently active element once.
    pub fn refine_all_elements(&mut self) -> eyre::Result<()> {
        let active: Vec<usize> = self.active_elements().map(Element::id).collect();
        for id in active {
            self.refine_element(id)?;
        }
        Ok(())
    }

    fn split_segment(&mut self, a: usize, b: usize) -> usize {
        let key = edge_key(a, b);
        if let Some(&m) = self.midpoints.get(&key) {
            return m;
        }
        let m = self.vertices.len();
        self.vertices
            .push(Point2::from((self.vertices[a].coords + self.vertices[b].coords) * 0.5));
        self.midpoints.insert(key, m);
        if let Some(marker) = self.boundary_markers.get(&key).copied() {
            self.boundary_markers.insert(edge_key(a, m), marker);
            self.boundary_markers.insert(edge_key(m, b), marker);
        }
        m
    }

    fn register_edges(&mut self, id: usize) -> eyre::Result<()> {
        let element = &self.elements[id];
        for edge in 0..element.num_edges() {
            let (a, b) = element.edge_vertices(edge);
            let owners = self.edges.entry(edge_key(a, b)).or_default();
            if owners.len() >= 2 {
                return Err(eyre!("segment ({a}, {b}) is shared by more than two elements"));
            }
            owners.push((id, edge));
        }
        Ok(())
    }
}
