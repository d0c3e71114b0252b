//! Memoization of evaluated shape functions, external functions and geometry.
//!
//! A cache lives for one state (volume and boundary integrals) or one edge segment (inner-edge
//! integrals) and is cleared before moving on. Keys contain the transformation path, so
//! evaluations on different sub-elements never alias.
use crate::function::Func;
use crate::mesh::ElementMode;
use crate::refmap::RefMap;
use crate::transform::TransformPath;
use crate::weakform::Geometry;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// The part of an element an evaluation runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Volume,
    /// An edge, traversed backwards when `reversed`.
    Edge { edge: usize, reversed: bool },
}

/// Distinguishes reference maps for shape function values.
///
/// Physical derivatives of a shape function depend on the element only through the inverse
/// Jacobian. For affine maps that Jacobian is constant, so elements with bitwise equal inverse
/// Jacobians share entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapClass {
    Affine([u64; 4]),
    NonAffine { mesh: usize, element: usize },
}

impl MapClass {
    pub fn of(refmap: &RefMap, mesh: usize, element: usize) -> Self {
        match refmap.const_inverse_jacobian() {
            Some(inverse) => {
                let mut bits = [0; 4];
                for (bits, value) in bits.iter_mut().zip(inverse.iter()) {
                    *bits = value.to_bits();
                }
                MapClass::Affine(bits)
            }
            None => MapClass::NonAffine { mesh, element },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionKey {
    Shape {
        shapeset: u32,
        index: usize,
        mode: ElementMode,
        map: MapClass,
        path: TransformPath,
        order: usize,
        domain: Domain,
    },
    External {
        slot: usize,
        element: usize,
        path: TransformPath,
        order: usize,
        domain: Domain,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeometryKey {
    pub mesh: usize,
    pub element: usize,
    pub path: TransformPath,
    pub order: usize,
    pub domain: Domain,
}

#[derive(Debug, Default)]
pub struct AssemblyCache {
    functions: FxHashMap<FunctionKey, Rc<Func>>,
    geometry: FxHashMap<GeometryKey, Rc<Geometry>>,
}

impl AssemblyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(&mut self, key: FunctionKey, compute: impl FnOnce() -> Func) -> Rc<Func> {
        self.functions
            .entry(key)
            .or_insert_with(|| Rc::new(compute()))
            .clone()
    }

    pub fn geometry(&mut self, key: GeometryKey, compute: impl FnOnce() -> Geometry) -> Rc<Geometry> {
        self.geometry
            .entry(key)
            .or_insert_with(|| Rc::new(compute()))
            .clone()
    }

    pub fn clear(&mut self) {
        self.functions.clear();
        self.geometry.clear();
    }

    pub fn len(&self) -> usize {
        self.functions.len() + self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
