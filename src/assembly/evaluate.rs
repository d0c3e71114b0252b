//! Numerical evaluation of single forms.
//!
//! An evaluation integrates an integrand over the union cell of a state, one of its edges, or
//! one segment of an inner edge. Every function involved is evaluated on a [`Side`]: an
//! element of one mesh together with the transformation path that selects the integration
//! domain inside it. Points come from the quadrature rule of the union cell (or edge), mapped
//! through the side's path, so that point `k` is the same physical point on every side.
use crate::assembly::cache::{AssemblyCache, Domain, FunctionKey, GeometryKey, MapClass};
use crate::assembly::stage::{Slot, SlotSource};
use crate::assembly::AssemblySettings;
use crate::function::{DiscontinuousFunc, Func};
use crate::mesh::ElementMode;
use crate::order::{FuncOrder, GeometryOrder, OrderArgs, PolyOrder};
use crate::quadrature::Quad2d;
use crate::refmap::{reference_edge_tangent, RefMap};
use crate::shapeset::Shapeset;
use crate::transform::TransformPath;
use crate::weakform::{
    AdaptiveSettings, DgMatrixIntegrand, DgVectorIntegrand, ElementInfo, FormArgs, Geometry, MatrixIntegrand,
    VectorIntegrand,
};
use log::warn;
use nalgebra::{Point2, Vector2};
use std::rc::Rc;

/// Results whose largest component is below this magnitude are accepted without error
/// control.
const NEGLIGIBLE_MAGNITUDE: f64 = 1e-6;

/// An element of one mesh seen through a transformation path.
#[derive(Debug, Clone)]
pub struct Side<'a> {
    /// Index of the mesh within the stage.
    pub mesh: usize,
    pub element: usize,
    pub refmap: &'a RefMap,
    pub path: TransformPath,
    pub domain: Domain,
}

impl<'a> Side<'a> {
    pub fn mode(&self) -> ElementMode {
        self.refmap.mode()
    }

    /// The same side restricted further by `labels`.
    pub fn extended(&self, labels: &[u8]) -> Self {
        Self {
            path: self.path.joined(labels),
            ..self.clone()
        }
    }

    /// Integration points in the element's reference coordinates.
    fn points(&self, quad: &Quad2d, order: usize) -> Vec<Point2<f64>> {
        let mode = self.mode();
        let reference = match self.domain {
            Domain::Volume => quad.volume(mode, order).points.clone(),
            Domain::Edge { edge, reversed } => quad.edge(mode, edge, order, reversed).points,
        };
        reference.iter().map(|p| self.path.apply(mode, p)).collect()
    }
}

/// A shape function of a space, evaluated on a side.
#[derive(Debug, Clone, Copy)]
pub struct ShapeRef<'s, 'a> {
    pub shapeset: &'s dyn Shapeset,
    pub index: usize,
    pub side: &'s Side<'a>,
}

impl<'s, 'a> ShapeRef<'s, 'a> {
    pub fn order(&self) -> FuncOrder {
        FuncOrder::of(self.shapeset.order(self.side.mode(), self.index))
    }

    pub fn directional_order(&self) -> [u32; 2] {
        self.shapeset.directional_order(self.side.mode(), self.index)
    }
}

/// Everything a volume or boundary evaluation needs besides the shape functions.
#[derive(Debug, Clone)]
pub struct FormContext<'a> {
    /// Side the geometry is computed on.
    pub geometry: Side<'a>,
    /// Previous iterate, starting at the form's offset, as `(slot, side)`.
    pub u_ext: Vec<(usize, Side<'a>)>,
    pub ext: Vec<(usize, Side<'a>)>,
    pub element: ElementInfo,
    pub scaling: f64,
}

/// A slot function seen from both sides of an inner edge.
#[derive(Debug, Clone)]
pub struct DgSlot<'a> {
    pub slot: usize,
    pub central: Side<'a>,
    pub neighbor: Side<'a>,
}

/// Everything an inner-edge evaluation needs besides the shape functions.
#[derive(Debug, Clone)]
pub struct DgContext<'a> {
    pub geometry: Side<'a>,
    /// Largest inverse reference-map order over both sides of the segment.
    pub inverse_ref_order: u32,
    pub u_ext: Vec<DgSlot<'a>>,
    pub ext: Vec<DgSlot<'a>>,
    pub element: ElementInfo,
    pub scaling: f64,
}

/// A shape function on one side of an inner edge.
#[derive(Debug, Clone, Copy)]
pub struct DgShapeRef<'s, 'a> {
    pub shape: ShapeRef<'s, 'a>,
    pub on_neighbor: bool,
}

pub struct Evaluator<'a> {
    pub quad: &'a Quad2d,
    pub settings: &'a AssemblySettings,
    pub slots: &'a [Slot],
}

impl<'a> Evaluator<'a> {
    fn weights(&self, mode: ElementMode, domain: Domain, order: usize) -> Vec<f64> {
        match domain {
            Domain::Volume => self.quad.volume(mode, order).weights.clone(),
            Domain::Edge { .. } => self.quad.line(order).0.to_vec(),
        }
    }

    pub fn shape(&self, cache: &mut AssemblyCache, shape: &ShapeRef, order: usize) -> Rc<Func> {
        let side = shape.side;
        let key = FunctionKey::Shape {
            shapeset: shape.shapeset.id(),
            index: shape.index,
            mode: side.mode(),
            map: MapClass::of(side.refmap, side.mesh, side.element),
            path: side.path.clone(),
            order,
            domain: side.domain,
        };
        cache.function(key, || {
            Func::from_shape(shape.shapeset, shape.index, side.refmap, &side.points(self.quad, order))
        })
    }

    pub fn slot_function(&self, cache: &mut AssemblyCache, slot: usize, side: &Side, order: usize) -> Rc<Func> {
        let key = FunctionKey::External {
            slot,
            element: side.element,
            path: side.path.clone(),
            order,
            domain: side.domain,
        };
        cache.function(key, || {
            let points = side.points(self.quad, order);
            match &self.slots[slot].source {
                SlotSource::Function(function) => function.evaluate(side.element, side.refmap, &points),
                SlotSource::Space(_) => Func::zeros(points.len()),
            }
        })
    }

    pub fn slot_order(&self, slot: usize, element: usize) -> FuncOrder {
        match &self.slots[slot].source {
            SlotSource::Function(function) => FuncOrder::of(function.order(element)),
            SlotSource::Space(_) => FuncOrder::default(),
        }
    }

    pub fn geometry(&self, cache: &mut AssemblyCache, side: &Side, order: usize) -> Rc<Geometry> {
        let key = GeometryKey {
            mesh: side.mesh,
            element: side.element,
            path: side.path.clone(),
            order,
            domain: side.domain,
        };
        cache.geometry(key, || self.compute_geometry(side, order))
    }

    fn compute_geometry(&self, side: &Side, order: usize) -> Geometry {
        let mode = side.mode();
        let points = side.points(self.quad, order);
        let weights = self.weights(mode, side.domain, order);
        let path_jacobian = side.path.jacobian(mode);
        let mut geometry = Geometry::default();
        for (xi, w) in points.iter().zip(&weights) {
            let x = side.refmap.map_point(xi);
            geometry.x.push(x.x);
            geometry.y.push(x.y);
            let jacobian = side.refmap.jacobian(xi) * path_jacobian;
            match side.domain {
                Domain::Volume => geometry.jwt.push(w * jacobian.determinant().abs()),
                Domain::Edge { edge, .. } => {
                    let tangent: Vector2<f64> = jacobian * reference_edge_tangent(mode, edge);
                    let length = tangent.norm();
                    let unit = if length > 0.0 { tangent / length } else { tangent };
                    geometry.jwt.push(w * length);
                    geometry.tx.push(unit.x);
                    geometry.ty.push(unit.y);
                    geometry.nx.push(unit.y);
                    geometry.ny.push(-unit.x);
                }
            }
        }
        geometry
    }

    /// Clamps an inferred order to the available quadrature.
    fn finish_order(&self, inverse_ref_order: u32, form_order: PolyOrder) -> usize {
        if self.settings.finite_volume {
            return self.quad.limit_order(inverse_ref_order as usize);
        }
        self.quad.limit_order((inverse_ref_order + form_order.value()) as usize)
    }

    fn order_args(&self, u_ext: impl Iterator<Item = FuncOrder>, ext: impl Iterator<Item = FuncOrder>) -> OrderArgs {
        OrderArgs {
            u_ext: u_ext.collect(),
            ext: ext.collect(),
            geometry: GeometryOrder::default(),
        }
    }

    fn context_order_args(&self, ctx: &FormContext) -> OrderArgs {
        self.order_args(
            ctx.u_ext.iter().map(|(slot, side)| self.slot_order(*slot, side.element)),
            ctx.ext.iter().map(|(slot, side)| self.slot_order(*slot, side.element)),
        )
    }

    fn dg_order_args(&self, ctx: &DgContext) -> OrderArgs {
        let order = |s: &DgSlot| {
            let central = self.slot_order(s.slot, s.central.element);
            let neighbor = self.slot_order(s.slot, s.neighbor.element);
            FuncOrder {
                val: central.val + neighbor.val,
                dx: central.dx + neighbor.dx,
                dy: central.dy + neighbor.dy,
            }
        };
        self.order_args(ctx.u_ext.iter().map(order), ctx.ext.iter().map(order))
    }

    pub fn matrix_order(&self, ctx: &FormContext, integrand: &dyn MatrixIntegrand, u: &ShapeRef, v: &ShapeRef) -> usize {
        let inverse_ref_order = u.side.refmap.inverse_ref_order().max(v.side.refmap.inverse_ref_order());
        let args = self.context_order_args(ctx);
        self.finish_order(inverse_ref_order, integrand.order(&args, u.order(), v.order()))
    }

    pub fn vector_order(&self, ctx: &FormContext, integrand: &dyn VectorIntegrand, v: &ShapeRef) -> usize {
        let inverse_ref_order = v.side.refmap.inverse_ref_order();
        let args = self.context_order_args(ctx);
        self.finish_order(inverse_ref_order, integrand.order(&args, v.order()))
    }

    pub fn dg_matrix_order(
        &self,
        ctx: &DgContext,
        integrand: &dyn DgMatrixIntegrand,
        u: &DgShapeRef,
        v: &DgShapeRef,
    ) -> usize {
        let inverse_ref_order = ctx.inverse_ref_order;
        let args = self.dg_order_args(ctx);
        self.finish_order(inverse_ref_order, integrand.order(&args, u.shape.order(), v.shape.order()))
    }

    pub fn dg_vector_order(&self, ctx: &DgContext, integrand: &dyn DgVectorIntegrand, v: &ShapeRef) -> usize {
        let inverse_ref_order = ctx.inverse_ref_order;
        let args = self.dg_order_args(ctx);
        self.finish_order(inverse_ref_order, integrand.order(&args, v.order()))
    }

    fn context_functions(
        &self,
        cache: &mut AssemblyCache,
        slots: &[(usize, Side)],
        extra: &[u8],
        order: usize,
    ) -> Vec<Rc<Func>> {
        slots
            .iter()
            .map(|(slot, side)| self.slot_function(cache, *slot, &side.extended(extra), order))
            .collect()
    }

    /// Integrates a matrix integrand on the domain of `ctx`, restricted by `extra`.
    #[allow(clippy::too_many_arguments)]
    pub fn matrix(
        &self,
        cache: &mut AssemblyCache,
        ctx: &FormContext,
        integrand: &dyn MatrixIntegrand,
        u: &ShapeRef,
        v: &ShapeRef,
        order: usize,
        extra: &[u8],
        out: &mut [f64],
    ) {
        let geometry = self.geometry(cache, &ctx.geometry.extended(extra), order);
        let u_ext = self.context_functions(cache, &ctx.u_ext, extra, order);
        let ext = self.context_functions(cache, &ctx.ext, extra, order);
        let u_side = u.side.extended(extra);
        let v_side = v.side.extended(extra);
        let u_func = self.shape(cache, &ShapeRef { side: &u_side, ..*u }, order);
        let v_func = self.shape(cache, &ShapeRef { side: &v_side, ..*v }, order);

        let u_ext: Vec<&Func> = u_ext.iter().map(Rc::as_ref).collect();
        let ext: Vec<&Func> = ext.iter().map(Rc::as_ref).collect();
        let args = FormArgs {
            geometry: &geometry,
            element: ctx.element,
            u_ext: &u_ext,
            ext: &ext,
        };
        out.fill(0.0);
        integrand.value(&args, &u_func, &v_func, out);
        scale(out, ctx.scaling);
    }

    pub fn vector(
        &self,
        cache: &mut AssemblyCache,
        ctx: &FormContext,
        integrand: &dyn VectorIntegrand,
        v: &ShapeRef,
        order: usize,
        extra: &[u8],
        out: &mut [f64],
    ) {
        let geometry = self.geometry(cache, &ctx.geometry.extended(extra), order);
        let u_ext = self.context_functions(cache, &ctx.u_ext, extra, order);
        let ext = self.context_functions(cache, &ctx.ext, extra, order);
        let v_side = v.side.extended(extra);
        let v_func = self.shape(cache, &ShapeRef { side: &v_side, ..*v }, order);

        let u_ext: Vec<&Func> = u_ext.iter().map(Rc::as_ref).collect();
        let ext: Vec<&Func> = ext.iter().map(Rc::as_ref).collect();
        let args = FormArgs {
            geometry: &geometry,
            element: ctx.element,
            u_ext: &u_ext,
            ext: &ext,
        };
        out.fill(0.0);
        integrand.value(&args, &v_func, out);
        scale(out, ctx.scaling);
    }

    fn dg_functions(&self, cache: &mut AssemblyCache, slots: &[DgSlot], order: usize) -> Vec<(Rc<Func>, Rc<Func>)> {
        slots
            .iter()
            .map(|s| {
                (
                    self.slot_function(cache, s.slot, &s.central, order),
                    self.slot_function(cache, s.slot, &s.neighbor, order),
                )
            })
            .collect()
    }

    pub fn dg_matrix(
        &self,
        cache: &mut AssemblyCache,
        ctx: &DgContext,
        integrand: &dyn DgMatrixIntegrand,
        u: &DgShapeRef,
        v: &DgShapeRef,
        order: usize,
        out: &mut [f64],
    ) {
        let geometry = self.geometry(cache, &ctx.geometry, order);
        let u_ext = self.dg_functions(cache, &ctx.u_ext, order);
        let ext = self.dg_functions(cache, &ctx.ext, order);
        let u_func = self.shape(cache, &u.shape, order);
        let v_func = self.shape(cache, &v.shape, order);

        let u_ext = discontinuous(&u_ext);
        let ext = discontinuous(&ext);
        let args = FormArgs {
            geometry: &geometry,
            element: ctx.element,
            u_ext: &u_ext,
            ext: &ext,
        };
        out.fill(0.0);
        integrand.value(&args, &one_sided(&u_func, u.on_neighbor), &one_sided(&v_func, v.on_neighbor), out);
        scale(out, ctx.scaling);
    }

    pub fn dg_vector(
        &self,
        cache: &mut AssemblyCache,
        ctx: &DgContext,
        integrand: &dyn DgVectorIntegrand,
        v: &ShapeRef,
        order: usize,
        out: &mut [f64],
    ) {
        let geometry = self.geometry(cache, &ctx.geometry, order);
        let u_ext = self.dg_functions(cache, &ctx.u_ext, order);
        let ext = self.dg_functions(cache, &ctx.ext, order);
        let v_func = self.shape(cache, v, order);

        let u_ext = discontinuous(&u_ext);
        let ext = discontinuous(&ext);
        let args = FormArgs {
            geometry: &geometry,
            element: ctx.element,
            u_ext: &u_ext,
            ext: &ext,
        };
        out.fill(0.0);
        integrand.value(&args, &v_func, out);
        scale(out, ctx.scaling);
    }

    /// Error-controlled integration by recursive subdivision.
    ///
    /// `eval(order, extra)` integrates at `order` on the sub-domain selected by `extra`.
    /// Starting from the estimate at `start_order`, the domain is split into `sons`, which are
    /// integrated at the increased order and summed. The sum is accepted once it is negligible
    /// or within the relative tolerance of the coarser estimate; otherwise each son is refined
    /// on its own, with its value as the coarse estimate.
    pub fn adaptive(
        &self,
        start_order: usize,
        sons: &[u8],
        adaptive: &AdaptiveSettings,
        eval: &mut dyn FnMut(usize, &[u8]) -> Vec<f64>,
    ) -> Vec<f64> {
        let start_order = self.quad.limit_order(start_order);
        let coarse = eval(start_order, &[]);
        self.refine(start_order, coarse, &TransformPath::new(), 0, sons, adaptive, eval)
    }

    #[allow(clippy::too_many_arguments)]
    fn refine(
        &self,
        order: usize,
        coarse: Vec<f64>,
        extra: &TransformPath,
        depth: usize,
        sons: &[u8],
        adaptive: &AdaptiveSettings,
        eval: &mut dyn FnMut(usize, &[u8]) -> Vec<f64>,
    ) -> Vec<f64> {
        let sub_order = self.quad.limit_order(order + adaptive.order_increase as usize);
        let mut sub_values = Vec::with_capacity(sons.len());
        for &son in sons {
            sub_values.push(eval(sub_order, extra.with(son).labels()));
        }
        let sum = sum_components(&sub_values, coarse.len());

        let magnitude = max_abs(sum.iter().copied());
        if magnitude < NEGLIGIBLE_MAGNITUDE {
            return sum;
        }
        let error = max_abs(sum.iter().zip(&coarse).map(|(s, c)| s - c)) / magnitude;
        if error < adaptive.relative_tolerance {
            return sum;
        }
        if depth + 1 >= self.settings.adaptive_max_depth {
            warn!(
                "Adaptive quadrature stopped at depth {} with relative error {error:.3e} (tolerance {:.3e})",
                depth + 1,
                adaptive.relative_tolerance
            );
            return sum;
        }

        let mut refined = Vec::with_capacity(sons.len());
        for (&son, value) in sons.iter().zip(sub_values) {
            refined.push(self.refine(sub_order, value, &extra.with(son), depth + 1, sons, adaptive, eval));
        }
        sum_components(&refined, coarse.len())
    }
}

fn scale(out: &mut [f64], factor: f64) {
    for value in out {
        *value *= factor;
    }
}

fn sum_components(values: &[Vec<f64>], len: usize) -> Vec<f64> {
    let mut sum = vec![0.0; len];
    for value in values {
        for (s, v) in sum.iter_mut().zip(value) {
            *s += v;
        }
    }
    sum
}

fn max_abs(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, |max, v| max.max(v.abs()))
}

fn discontinuous(funcs: &[(Rc<Func>, Rc<Func>)]) -> Vec<DiscontinuousFunc<'_>> {
    funcs
        .iter()
        .map(|(central, neighbor)| DiscontinuousFunc::new(Some(&**central), Some(&**neighbor)))
        .collect()
}

fn one_sided(func: &Func, on_neighbor: bool) -> DiscontinuousFunc<'_> {
    if on_neighbor {
        DiscontinuousFunc::new(None, Some(func))
    } else {
        DiscontinuousFunc::new(Some(func), None)
    }
}

/// Adaptive start order of a volume form, from the directional orders of its shape
/// functions.
pub fn volume_start_order(u: Option<[u32; 2]>, v: [u32; 2]) -> usize {
    let half_sum = |[h, w]: [u32; 2]| ((h + w) / 2) as usize;
    u.map_or(0, half_sum) + half_sum(v)
}

/// Adaptive start order of a boundary form.
pub fn surface_start_order(u: Option<u32>, v: u32) -> usize {
    u.unwrap_or(0) as usize + v as usize
}
