//! Functions evaluated at integration points.
use crate::error::AssemblyError;
use crate::mesh::Mesh;
use crate::refmap::RefMap;
use crate::shapeset::Shapeset;
use crate::space::{AssemblyList, Space};
use nalgebra::{Point2, Vector2};
use rustc_hash::FxHashMap;
use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

/// Values and physical first derivatives of a function at a set of points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Func {
    pub val: Vec<f64>,
    pub dx: Vec<f64>,
    pub dy: Vec<f64>,
}

impl Func {
    pub fn zeros(num_points: usize) -> Self {
        Self {
            val: vec![0.0; num_points],
            dx: vec![0.0; num_points],
            dy: vec![0.0; num_points],
        }
    }

    pub fn len(&self) -> usize {
        self.val.len()
    }

    pub fn is_empty(&self) -> bool {
        self.val.is_empty()
    }

    /// Evaluates a single shape function at reference points of an element.
    pub fn from_shape(shapeset: &dyn Shapeset, index: usize, refmap: &RefMap, points: &[Point2<f64>]) -> Self {
        let mut func = Self::zeros(points.len());
        accumulate_shape(shapeset, index, 1.0, refmap, points, &mut func);
        func
    }
}

/// Adds `coef` times shape function `index` to `out`.
fn accumulate_shape(
    shapeset: &dyn Shapeset,
    index: usize,
    coef: f64,
    refmap: &RefMap,
    points: &[Point2<f64>],
    out: &mut Func,
) {
    let mode = refmap.mode();
    for (k, xi) in points.iter().enumerate() {
        let grad: Vector2<f64> = refmap.inverse_jacobian(xi).transpose() * shapeset.gradient(mode, index, xi);
        out.val[k] += coef * shapeset.value(mode, index, xi);
        out.dx[k] += coef * grad.x;
        out.dy[k] += coef * grad.y;
    }
}

/// A function with values on both sides of an inner edge.
///
/// A side is absent when the function has no support there, as is the case for a shape
/// function of the central element seen from the neighbor.
#[derive(Debug, Copy, Clone)]
pub struct DiscontinuousFunc<'a> {
    pub central: Option<&'a Func>,
    pub neighbor: Option<&'a Func>,
}

impl<'a> DiscontinuousFunc<'a> {
    pub fn new(central: Option<&'a Func>, neighbor: Option<&'a Func>) -> Self {
        Self { central, neighbor }
    }

    pub fn val_central(&self, k: usize) -> f64 {
        self.central.map_or(0.0, |f| f.val[k])
    }

    pub fn val_neighbor(&self, k: usize) -> f64 {
        self.neighbor.map_or(0.0, |f| f.val[k])
    }

    /// Central minus neighbor value.
    pub fn jump(&self, k: usize) -> f64 {
        self.val_central(k) - self.val_neighbor(k)
    }

    pub fn average(&self, k: usize) -> f64 {
        0.5 * (self.val_central(k) + self.val_neighbor(k))
    }

    pub fn grad_central(&self, k: usize) -> Vector2<f64> {
        self.central.map_or(Vector2::zeros(), |f| Vector2::new(f.dx[k], f.dy[k]))
    }

    pub fn grad_neighbor(&self, k: usize) -> Vector2<f64> {
        self.neighbor.map_or(Vector2::zeros(), |f| Vector2::new(f.dx[k], f.dy[k]))
    }

    pub fn grad_average(&self, k: usize) -> Vector2<f64> {
        (self.grad_central(k) + self.grad_neighbor(k)) * 0.5
    }
}

/// A function defined on the elements of a mesh.
pub trait MeshFunction: Debug + Send + Sync {
    fn mesh(&self) -> &Arc<Mesh>;

    /// Polynomial order on an active element, used by order inference.
    fn order(&self, element: usize) -> u32;

    /// Evaluates the function at reference points of an active element.
    fn evaluate(&self, element: usize, refmap: &RefMap, points: &[Point2<f64>]) -> Func;
}

/// A discrete function given by coefficients over a space.
#[derive(Debug, Clone)]
pub struct Solution {
    mesh: Arc<Mesh>,
    shapeset: Arc<dyn Shapeset>,
    orders: FxHashMap<usize, u32>,
    // Per element: (shape index, combined coefficient)
    terms: FxHashMap<usize, Vec<(usize, f64)>>,
}

impl Solution {
    /// Builds the function `sum_k coef_k * c[dof_k] * phi_k` on every active element.
    ///
    /// With `add_dirichlet_lift`, fixed entries contribute their lift value; otherwise they are
    /// dropped.
    pub fn from_coefficients(space: &dyn Space, coefficients: &[f64], add_dirichlet_lift: bool) -> eyre::Result<Self> {
        let required = space.first_dof() + space.num_dofs();
        if coefficients.len() < required {
            return Err(AssemblyError::CoefficientVectorTooShort {
                len: coefficients.len(),
                required,
            }
            .into());
        }

        let mesh = space.mesh().clone();
        let mut orders = FxHashMap::default();
        let mut terms = FxHashMap::default();
        let mut list = AssemblyList::new();
        for element in mesh.active_elements() {
            space.element_assembly_list(element.id(), &mut list);
            let element_terms: Vec<_> = (0..list.len())
                .filter_map(|k| {
                    let factor = match list.dof[k] {
                        Some(dof) => coefficients[dof],
                        None if add_dirichlet_lift => 1.0,
                        None => return None,
                    };
                    Some((list.idx[k], list.coef[k] * factor))
                })
                .collect();
            orders.insert(element.id(), space.element_order(element.id()));
            terms.insert(element.id(), element_terms);
        }

        Ok(Self {
            mesh,
            shapeset: space.shapeset().clone(),
            orders,
            terms,
        })
    }
}

impl MeshFunction for Solution {
    fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    fn order(&self, element: usize) -> u32 {
        self.orders.get(&element).copied().unwrap_or(0)
    }

    fn evaluate(&self, element: usize, refmap: &RefMap, points: &[Point2<f64>]) -> Func {
        let mut func = Func::zeros(points.len());
        for &(index, coef) in self.terms.get(&element).into_iter().flatten() {
            accumulate_shape(self.shapeset.as_ref(), index, coef, refmap, points, &mut func);
        }
        func
    }
}

/// A constant function on a mesh.
#[derive(Debug, Clone)]
pub struct ConstantFunction {
    mesh: Arc<Mesh>,
    value: f64,
}

impl ConstantFunction {
    pub fn new(mesh: Arc<Mesh>, value: f64) -> Self {
        Self { mesh, value }
    }
}

impl MeshFunction for ConstantFunction {
    fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    fn order(&self, _element: usize) -> u32 {
        0
    }

    fn evaluate(&self, _element: usize, _refmap: &RefMap, points: &[Point2<f64>]) -> Func {
        Func {
            val: vec![self.value; points.len()],
            ..Func::zeros(points.len())
        }
    }
}

type ExactFn = dyn Fn(&Point2<f64>) -> (f64, Vector2<f64>) + Send + Sync;

/// A function given in closed form, returning its value and gradient at a physical point.
#[derive(Clone)]
pub struct ExactFunction {
    mesh: Arc<Mesh>,
    order: u32,
    function: Arc<ExactFn>,
}

impl ExactFunction {
    /// `order` is the polynomial order reported to order inference.
    pub fn new<F>(mesh: Arc<Mesh>, order: u32, function: F) -> Self
    where
        F: Fn(&Point2<f64>) -> (f64, Vector2<f64>) + Send + Sync + 'static,
    {
        Self {
            mesh,
            order,
            function: Arc::new(function),
        }
    }
}

impl Debug for ExactFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExactFunction")
            .field("mesh", &self.mesh.seq())
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl MeshFunction for ExactFunction {
    fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    fn order(&self, _element: usize) -> u32 {
        self.order
    }

    fn evaluate(&self, _element: usize, refmap: &RefMap, points: &[Point2<f64>]) -> Func {
        let mut func = Func::zeros(points.len());
        for (k, xi) in points.iter().enumerate() {
            let (value, grad) = (self.function)(&refmap.map_point(xi));
            func.val[k] = value;
            func.dx[k] = grad.x;
            func.dy[k] = grad.y;
        }
        func
    }
}
