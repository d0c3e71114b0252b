//! Commonly used integrands.
use crate::function::{DiscontinuousFunc, Func};
use crate::order::{FuncOrder, OrderArgs, PolyOrder};
use crate::weakform::{DgMatrixIntegrand, DgVectorIntegrand, FormArgs, MatrixIntegrand, VectorIntegrand};
use itertools::izip;
use nalgebra::Vector2;

/// `c * u * v`. Used as volume mass matrix and as boundary (Robin) term.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mass {
    pub coefficient: f64,
}

impl MatrixIntegrand for Mass {
    fn value(&self, args: &FormArgs<'_, &Func>, u: &Func, v: &Func, out: &mut [f64]) {
        let sum: f64 = izip!(&args.geometry.jwt, &u.val, &v.val)
            .map(|(w, u, v)| w * u * v)
            .sum();
        out[0] = self.coefficient * sum;
    }

    fn order(&self, _args: &OrderArgs, u: FuncOrder, v: FuncOrder) -> PolyOrder {
        u.val * v.val
    }
}

/// `c * grad u . grad v`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Laplace {
    pub coefficient: f64,
}

impl MatrixIntegrand for Laplace {
    fn value(&self, args: &FormArgs<'_, &Func>, u: &Func, v: &Func, out: &mut [f64]) {
        let sum: f64 = izip!(&args.geometry.jwt, &u.dx, &u.dy, &v.dx, &v.dy)
            .map(|(w, udx, udy, vdx, vdy)| w * (udx * vdx + udy * vdy))
            .sum();
        out[0] = self.coefficient * sum;
    }

    fn order(&self, _args: &OrderArgs, u: FuncOrder, v: FuncOrder) -> PolyOrder {
        u.dx * v.dx + u.dy * v.dy
    }
}

/// `c_k * u * v` written to output component `k`, for multi-component mass matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentMass {
    pub coefficients: Vec<f64>,
}

impl MatrixIntegrand for ComponentMass {
    fn value(&self, args: &FormArgs<'_, &Func>, u: &Func, v: &Func, out: &mut [f64]) {
        let sum: f64 = izip!(&args.geometry.jwt, &u.val, &v.val)
            .map(|(w, u, v)| w * u * v)
            .sum();
        for (out, c) in out.iter_mut().zip(&self.coefficients) {
            *out = c * sum;
        }
    }

    fn order(&self, _args: &OrderArgs, u: FuncOrder, v: FuncOrder) -> PolyOrder {
        u.val * v.val
    }
}

/// `c * v`. Used as volume source and as boundary flux.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Source {
    pub value: f64,
}

impl VectorIntegrand for Source {
    fn value(&self, args: &FormArgs<'_, &Func>, v: &Func, out: &mut [f64]) {
        let sum: f64 = izip!(&args.geometry.jwt, &v.val).map(|(w, v)| w * v).sum();
        out[0] = self.value * sum;
    }

    fn order(&self, _args: &OrderArgs, v: FuncOrder) -> PolyOrder {
        v.val
    }
}

/// `f * v` with `f` the form's first external function.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ExtSource;

impl VectorIntegrand for ExtSource {
    fn value(&self, args: &FormArgs<'_, &Func>, v: &Func, out: &mut [f64]) {
        let f = args.ext[0];
        out[0] = izip!(&args.geometry.jwt, &f.val, &v.val)
            .map(|(w, f, v)| w * f * v)
            .sum();
    }

    fn order(&self, args: &OrderArgs, v: FuncOrder) -> PolyOrder {
        args.ext[0].val * v.val
    }
}

/// Residual `c * grad u_ext . grad v` of the Laplace operator at the previous iterate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LaplaceResidual {
    pub coefficient: f64,
}

impl VectorIntegrand for LaplaceResidual {
    fn value(&self, args: &FormArgs<'_, &Func>, v: &Func, out: &mut [f64]) {
        let u = args.u_ext[0];
        let sum: f64 = izip!(&args.geometry.jwt, &u.dx, &u.dy, &v.dx, &v.dy)
            .map(|(w, udx, udy, vdx, vdy)| w * (udx * vdx + udy * vdy))
            .sum();
        out[0] = self.coefficient * sum;
    }

    fn order(&self, args: &OrderArgs, v: FuncOrder) -> PolyOrder {
        args.u_ext[0].dx * v.dx + args.u_ext[0].dy * v.dy
    }
}

/// Interior penalty `sigma / h * [u] [v]` on inner edges.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct JumpPenalty {
    pub sigma: f64,
}

impl DgMatrixIntegrand for JumpPenalty {
    fn value(
        &self,
        args: &FormArgs<'_, DiscontinuousFunc<'_>>,
        u: &DiscontinuousFunc<'_>,
        v: &DiscontinuousFunc<'_>,
        out: &mut [f64],
    ) {
        let sum: f64 = args
            .geometry
            .jwt
            .iter()
            .enumerate()
            .map(|(k, w)| w * u.jump(k) * v.jump(k))
            .sum();
        out[0] = self.sigma / args.element.diameter * sum;
    }

    fn order(&self, _args: &OrderArgs, u: FuncOrder, v: FuncOrder) -> PolyOrder {
        u.val * v.val
    }
}

/// Symmetric interior penalty flux
/// `-{grad u}.n [v] - {grad v}.n [u] + sigma / h [u] [v]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SymmetricInteriorPenalty {
    pub sigma: f64,
}

impl DgMatrixIntegrand for SymmetricInteriorPenalty {
    fn value(
        &self,
        args: &FormArgs<'_, DiscontinuousFunc<'_>>,
        u: &DiscontinuousFunc<'_>,
        v: &DiscontinuousFunc<'_>,
        out: &mut [f64],
    ) {
        let g = args.geometry;
        let penalty = self.sigma / args.element.diameter;
        out[0] = izip!(0.., &g.jwt, &g.nx, &g.ny)
            .map(|(k, w, nx, ny)| {
                let n = Vector2::new(*nx, *ny);
                let consistency = u.grad_average(k).dot(&n) * v.jump(k) + v.grad_average(k).dot(&n) * u.jump(k);
                w * (penalty * u.jump(k) * v.jump(k) - consistency)
            })
            .sum();
    }

    fn order(&self, args: &OrderArgs, u: FuncOrder, v: FuncOrder) -> PolyOrder {
        let n = args.geometry.normal;
        u.dx * n * v.val + u.val * v.dx * n + u.val * v.val
    }
}

/// Penalized jump of the previous iterate, `sigma / h * [u_ext] v`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct JumpResidual {
    pub sigma: f64,
}

impl DgVectorIntegrand for JumpResidual {
    fn value(&self, args: &FormArgs<'_, DiscontinuousFunc<'_>>, v: &Func, out: &mut [f64]) {
        let u = &args.u_ext[0];
        let sum: f64 = izip!(0.., &args.geometry.jwt, &v.val)
            .map(|(k, w, v)| w * u.jump(k) * v)
            .sum();
        out[0] = self.sigma / args.element.diameter * sum;
    }

    fn order(&self, args: &OrderArgs, v: FuncOrder) -> PolyOrder {
        args.u_ext[0].val * v.val
    }
}
