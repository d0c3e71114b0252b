//! Polynomial order tracking for integration order inference.
//!
//! Integrands report the polynomial order of their value in terms of the orders of their
//! arguments. [`PolyOrder`] supports the arithmetic needed to write such estimates the same way
//! the integrand itself is written: sums take the larger order, products add orders and scalar
//! factors leave the order unchanged. Anything that is not a polynomial (division, `sqrt`,
//! `exp`, ...) saturates to [`PolyOrder::MAX`].
use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PolyOrder(pub u32);

impl PolyOrder {
    /// Saturated order of non-polynomial expressions.
    pub const MAX: PolyOrder = PolyOrder(u32::MAX / 4);

    pub fn new(order: u32) -> Self {
        Self(order)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn pow(self, exponent: u32) -> Self {
        Self(self.0.saturating_mul(exponent).min(Self::MAX.0))
    }

    /// Order of a transcendental function of `self`.
    pub fn saturate(self) -> Self {
        if self.0 == 0 {
            self
        } else {
            Self::MAX
        }
    }
}

impl Add for PolyOrder {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.max(rhs)
    }
}

impl Sub for PolyOrder {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.max(rhs)
    }
}

impl Mul for PolyOrder {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0).min(Self::MAX.0))
    }
}

impl Div for PolyOrder {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        if rhs.0 == 0 {
            self
        } else {
            Self::MAX
        }
    }
}

impl Neg for PolyOrder {
    type Output = Self;

    fn neg(self) -> Self {
        self
    }
}

impl Mul<f64> for PolyOrder {
    type Output = Self;

    fn mul(self, _rhs: f64) -> Self {
        self
    }
}

impl Mul<PolyOrder> for f64 {
    type Output = PolyOrder;

    fn mul(self, rhs: PolyOrder) -> PolyOrder {
        rhs
    }
}

impl Add<f64> for PolyOrder {
    type Output = Self;

    fn add(self, _rhs: f64) -> Self {
        self
    }
}

impl Div<f64> for PolyOrder {
    type Output = Self;

    fn div(self, _rhs: f64) -> Self {
        self
    }
}

/// Orders of a function and its first derivatives.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FuncOrder {
    pub val: PolyOrder,
    pub dx: PolyOrder,
    pub dy: PolyOrder,
}

impl FuncOrder {
    /// Orders of a polynomial of the given order. Derivatives keep the order, which is exact
    /// for the mixed-degree bases used on quadrilaterals.
    pub fn of(order: u32) -> Self {
        let order = PolyOrder(order);
        Self {
            val: order,
            dx: order,
            dy: order,
        }
    }
}

/// Orders of the geometric quantities available to integrands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GeometryOrder {
    /// Physical coordinates.
    pub x: PolyOrder,
    pub y: PolyOrder,
    /// Normal and tangent components on edges.
    pub normal: PolyOrder,
}

impl Default for GeometryOrder {
    fn default() -> Self {
        Self {
            x: PolyOrder(1),
            y: PolyOrder(1),
            normal: PolyOrder(0),
        }
    }
}

/// Everything an integrand may use to estimate its order, besides the orders of its trial and
/// test functions.
#[derive(Debug, Clone, Default)]
pub struct OrderArgs {
    /// Orders of the previous iterate, starting at the form's offset.
    pub u_ext: Vec<FuncOrder>,
    /// Orders of the form's external functions.
    pub ext: Vec<FuncOrder>,
    pub geometry: GeometryOrder,
}
