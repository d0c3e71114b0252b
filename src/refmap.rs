//! Reference-to-physical element maps.
//!
//! Triangles and parallelograms are mapped affinely, general quadrilaterals bilinearly. The
//! reference triangle has the vertices `(-1, -1)`, `(1, -1)` and `(-1, 1)`; the reference
//! quadrilateral is `[-1, 1]^2`.
use crate::mesh::{Element, ElementMode, Mesh};
use nalgebra::{Matrix2, Point2, Vector2};

const REFERENCE_TRIANGLE: [[f64; 2]; 3] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0]];
const REFERENCE_QUAD: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

/// Vertex `index` of the reference element.
pub fn reference_vertex(mode: ElementMode, index: usize) -> Point2<f64> {
    let [x, y] = match mode {
        ElementMode::Triangle => REFERENCE_TRIANGLE[index],
        ElementMode::Quad => REFERENCE_QUAD[index],
    };
    Point2::new(x, y)
}

/// Maps the edge parameter `t` in `[-1, 1]` to a point on reference edge `edge`.
pub fn reference_edge_point(mode: ElementMode, edge: usize, t: f64) -> Point2<f64> {
    let a = reference_vertex(mode, edge);
    let b = reference_vertex(mode, (edge + 1) % mode.num_edges());
    a + (b - a) * (0.5 * (t + 1.0))
}

/// Derivative of [`reference_edge_point`] with respect to `t`.
pub fn reference_edge_tangent(mode: ElementMode, edge: usize) -> Vector2<f64> {
    let a = reference_vertex(mode, edge);
    let b = reference_vertex(mode, (edge + 1) % mode.num_edges());
    (b - a) * 0.5
}

#[derive(Debug, Clone, PartialEq)]
enum MapKind {
    Affine {
        jacobian: Matrix2<f64>,
        inverse_jacobian: Matrix2<f64>,
    },
    Bilinear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefMap {
    mode: ElementMode,
    vertices: [Point2<f64>; 4],
    kind: MapKind,
    diameter: f64,
}

impl RefMap {
    pub fn new(mesh: &Mesh, element: &Element) -> Self {
        let mode = element.mode();
        let mut vertices = [Point2::origin(); 4];
        for (v, &index) in vertices.iter_mut().zip(element.vertices()) {
            *v = *mesh.vertex(index);
        }

        let affine_jacobian = |a: Vector2<f64>, b: Vector2<f64>| Matrix2::from_columns(&[a * 0.5, b * 0.5]);
        let jacobian = match mode {
            ElementMode::Triangle => Some(affine_jacobian(vertices[1] - vertices[0], vertices[2] - vertices[0])),
            ElementMode::Quad => {
                let defect = (vertices[0].coords + vertices[2].coords) - (vertices[1].coords + vertices[3].coords);
                let scale = (vertices[2] - vertices[0]).norm();
                (defect.norm() <= 1e-12 * scale)
                    .then(|| affine_jacobian(vertices[1] - vertices[0], vertices[3] - vertices[0]))
            }
        };
        let kind = jacobian
            .and_then(|j| j.try_inverse().map(|inverse| (j, inverse)))
            .map(|(jacobian, inverse_jacobian)| MapKind::Affine {
                jacobian,
                inverse_jacobian,
            })
            .unwrap_or(MapKind::Bilinear);

        Self {
            mode,
            vertices,
            kind,
            diameter: mesh.diameter(element),
        }
    }

    pub fn mode(&self) -> ElementMode {
        self.mode
    }

    pub fn is_jacobian_const(&self) -> bool {
        matches!(self.kind, MapKind::Affine { .. })
    }

    /// The constant inverse Jacobian of an affine map.
    pub fn const_inverse_jacobian(&self) -> Option<&Matrix2<f64>> {
        match &self.kind {
            MapKind::Affine { inverse_jacobian, .. } => Some(inverse_jacobian),
            MapKind::Bilinear => None,
        }
    }

    /// Polynomial order added to integrands by the inverse map: 0 for affine, 2 otherwise.
    pub fn inverse_ref_order(&self) -> u32 {
        if self.is_jacobian_const() {
            0
        } else {
            2
        }
    }

    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    /// Maps a reference point to physical coordinates.
    pub fn map_point(&self, xi: &Point2<f64>) -> Point2<f64> {
        let v = &self.vertices;
        match self.mode {
            ElementMode::Triangle => {
                v[0] + (v[1] - v[0]) * (0.5 * (xi.x + 1.0)) + (v[2] - v[0]) * (0.5 * (xi.y + 1.0))
            }
            ElementMode::Quad => {
                let [n0, n1, n2, n3] = bilinear_basis(xi);
                Point2::from(v[0].coords * n0 + v[1].coords * n1 + v[2].coords * n2 + v[3].coords * n3)
            }
        }
    }

    /// Jacobian `dx/dxi` at a reference point.
    pub fn jacobian(&self, xi: &Point2<f64>) -> Matrix2<f64> {
        match &self.kind {
            MapKind::Affine { jacobian, .. } => *jacobian,
            MapKind::Bilinear => {
                let v = &self.vertices;
                let (x, y) = (xi.x, xi.y);
                let d_dx = [-(1.0 - y), 1.0 - y, 1.0 + y, -(1.0 + y)];
                let d_dy = [-(1.0 - x), -(1.0 + x), 1.0 + x, 1.0 - x];
                let mut columns = [Vector2::zeros(); 2];
                for k in 0..4 {
                    columns[0] += v[k].coords * (0.25 * d_dx[k]);
                    columns[1] += v[k].coords * (0.25 * d_dy[k]);
                }
                Matrix2::from_columns(&columns)
            }
        }
    }

    /// Inverse Jacobian at a reference point. Zero for degenerate points.
    pub fn inverse_jacobian(&self, xi: &Point2<f64>) -> Matrix2<f64> {
        match &self.kind {
            MapKind::Affine { inverse_jacobian, .. } => *inverse_jacobian,
            MapKind::Bilinear => self.jacobian(xi).try_inverse().unwrap_or_else(Matrix2::zeros),
        }
    }
}

fn bilinear_basis(xi: &Point2<f64>) -> [f64; 4] {
    let (x, y) = (xi.x, xi.y);
    [
        0.25 * (1.0 - x) * (1.0 - y),
        0.25 * (1.0 + x) * (1.0 - y),
        0.25 * (1.0 + x) * (1.0 + y),
        0.25 * (1.0 - x) * (1.0 + y),
    ]
}
