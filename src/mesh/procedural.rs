//! Basic procedural mesh generation routines.
//!
//! Generated meshes mark their boundary with `1` (bottom), `2` (right), `3` (top) and `4`
//! (left), registered under the names `"bottom"`, `"right"`, `"top"` and `"left"`. All elements
//! carry marker `0`.
use crate::mesh::{BaseElement, BoundaryEdge, Mesh};
use eyre::eyre;
use nalgebra::{Point2, Vector2};

pub const BOTTOM: u32 = 1;
pub const RIGHT: u32 = 2;
pub const TOP: u32 = 3;
pub const LEFT: u32 = 4;

pub fn create_unit_square_uniform_quad_mesh(cells_per_dim: usize) -> eyre::Result<Mesh> {
    create_rectangular_uniform_quad_mesh(
        &Point2::origin(),
        &Vector2::new(1.0, 1.0),
        cells_per_dim,
        cells_per_dim,
    )
}

pub fn create_unit_square_uniform_tri_mesh(cells_per_dim: usize) -> eyre::Result<Mesh> {
    create_rectangular_uniform_tri_mesh(
        &Point2::origin(),
        &Vector2::new(1.0, 1.0),
        cells_per_dim,
        cells_per_dim,
    )
}

/// Generates an axis-aligned rectangle `[origin, origin + extents]` split into
/// `cells_x * cells_y` quadrilaterals.
///
/// Vertices are numbered row by row starting at `origin`.
pub fn create_rectangular_uniform_quad_mesh(
    origin: &Point2<f64>,
    extents: &Vector2<f64>,
    cells_x: usize,
    cells_y: usize,
) -> eyre::Result<Mesh> {
    let grid = Grid::new(origin, extents, cells_x, cells_y)?;
    let mut elements = Vec::with_capacity(cells_x * cells_y);
    for j in 0..cells_y {
        for i in 0..cells_x {
            elements.push(BaseElement::new(
                [
                    grid.vertex(i, j),
                    grid.vertex(i + 1, j),
                    grid.vertex(i + 1, j + 1),
                    grid.vertex(i, j + 1),
                ],
                0,
            ));
        }
    }
    grid.into_mesh(elements)
}

/// Same as [`create_rectangular_uniform_quad_mesh`], with every cell split into two triangles
/// along the diagonal from its lower left to its upper right corner.
pub fn create_rectangular_uniform_tri_mesh(
    origin: &Point2<f64>,
    extents: &Vector2<f64>,
    cells_x: usize,
    cells_y: usize,
) -> eyre::Result<Mesh> {
    let grid = Grid::new(origin, extents, cells_x, cells_y)?;
    let mut elements = Vec::with_capacity(2 * cells_x * cells_y);
    for j in 0..cells_y {
        for i in 0..cells_x {
            let (a, b) = (grid.vertex(i, j), grid.vertex(i + 1, j));
            let (c, d) = (grid.vertex(i + 1, j + 1), grid.vertex(i, j + 1));
            elements.push(BaseElement::new([a, b, c], 0));
            elements.push(BaseElement::new([a, c, d], 0));
        }
    }
    grid.into_mesh(elements)
}

struct Grid {
    cells_x: usize,
    cells_y: usize,
    vertices: Vec<Point2<f64>>,
}

impl Grid {
    fn new(origin: &Point2<f64>, extents: &Vector2<f64>, cells_x: usize, cells_y: usize) -> eyre::Result<Self> {
        if cells_x == 0 || cells_y == 0 {
            return Err(eyre!("a rectangular mesh needs at least one cell in each direction"));
        }
        if extents.x <= 0.0 || extents.y <= 0.0 {
            return Err(eyre!("rectangle extents must be positive, got {extents:?}"));
        }
        let h = Vector2::new(extents.x / cells_x as f64, extents.y / cells_y as f64);
        let vertices = (0..=cells_y)
            .flat_map(|j| (0..=cells_x).map(move |i| (i, j)))
            .map(|(i, j)| origin + Vector2::new(i as f64 * h.x, j as f64 * h.y))
            .collect();
        Ok(Self {
            cells_x,
            cells_y,
            vertices,
        })
    }

    fn vertex(&self, i: usize, j: usize) -> usize {
        (self.cells_x + 1) * j + i
    }

    fn boundary(&self) -> Vec<BoundaryEdge> {
        let (nx, ny) = (self.cells_x, self.cells_y);
        let edge = |a, b, marker| BoundaryEdge {
            vertices: [a, b],
            marker,
        };
        let bottom = (0..nx).map(|i| edge(self.vertex(i, 0), self.vertex(i + 1, 0), BOTTOM));
        let right = (0..ny).map(|j| edge(self.vertex(nx, j), self.vertex(nx, j + 1), RIGHT));
        let top = (0..nx).map(|i| edge(self.vertex(i + 1, ny), self.vertex(i, ny), TOP));
        let left = (0..ny).map(|j| edge(self.vertex(0, j + 1), self.vertex(0, j), LEFT));
        bottom.chain(right).chain(top).chain(left).collect()
    }

    fn into_mesh(self, elements: Vec<BaseElement>) -> eyre::Result<Mesh> {
        let boundary = self.boundary();
        Ok(Mesh::from_base_elements(self.vertices, elements, boundary)?
            .with_boundary_marker_name("bottom", BOTTOM)
            .with_boundary_marker_name("right", RIGHT)
            .with_boundary_marker_name("top", TOP)
            .with_boundary_marker_name("left", LEFT))
    }
}
