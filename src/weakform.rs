//! Weak forms: collections of matrix and vector forms over volumes, boundaries and inner edges.
use crate::error::AssemblyError;
use crate::function::{DiscontinuousFunc, Func, MeshFunction};
use crate::mesh::Mesh;
use crate::next_seq;
use crate::order::{FuncOrder, OrderArgs, PolyOrder};
use eyre::eyre;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

pub mod integrals;

/// Where a form is integrated. For volume forms the markers are element markers, for boundary
/// forms boundary edge markers. Inner-edge forms are integrated on every inner edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    #[default]
    Anywhere,
    Markers(BTreeSet<u32>),
}

impl Region {
    pub fn markers(markers: impl IntoIterator<Item = u32>) -> Self {
        Region::Markers(markers.into_iter().collect())
    }

    /// Region of the named element markers of `mesh`.
    pub fn named_elements(mesh: &Mesh, names: &[&str]) -> eyre::Result<Self> {
        Self::named(names, |name| mesh.element_marker_id(name))
    }

    /// Region of the named boundary markers of `mesh`.
    pub fn named_boundary(mesh: &Mesh, names: &[&str]) -> eyre::Result<Self> {
        Self::named(names, |name| mesh.boundary_marker_id(name))
    }

    fn named(names: &[&str], lookup: impl Fn(&str) -> Option<u32>) -> eyre::Result<Self> {
        names
            .iter()
            .map(|&name| lookup(name).ok_or_else(|| eyre!("unknown marker name \"{name}\"")))
            .collect::<eyre::Result<BTreeSet<_>>>()
            .map(Region::Markers)
    }

    pub fn contains(&self, marker: u32) -> bool {
        match self {
            Region::Anywhere => true,
            Region::Markers(markers) => markers.contains(&marker),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symmetry {
    #[default]
    None,
    Symmetric,
    Antisymmetric,
}

/// Settings for error-controlled evaluation by recursive subdivision.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveSettings {
    /// Accepted relative difference between a coarse estimate and its refinement.
    pub relative_tolerance: f64,
    /// Order added at each subdivision level.
    pub order_increase: u32,
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self {
            relative_tolerance: 1e-3,
            order_increase: 1,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Integral {
    Volume,
    Boundary,
    DgInner,
}

/// Physical data at the integration points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Unit outward normal of the central element. Empty for volume integrals.
    pub nx: Vec<f64>,
    pub ny: Vec<f64>,
    /// Unit tangent, counter-clockwise with respect to the central element.
    pub tx: Vec<f64>,
    pub ty: Vec<f64>,
    /// Quadrature weights multiplied by the Jacobian of the map to physical space.
    pub jwt: Vec<f64>,
}

impl Geometry {
    pub fn len(&self) -> usize {
        self.jwt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jwt.is_empty()
    }
}

/// Per-element data available to integrands.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ElementInfo {
    pub diameter: f64,
    pub element_marker: u32,
    /// Marker of the edge being integrated over. `None` for volume integrals, `Some(0)` on
    /// inner edges.
    pub edge_marker: Option<u32>,
}

/// Arguments shared by all integrands. `F` is `&Func` for volume and boundary integrals and
/// [`DiscontinuousFunc`] on inner edges.
#[derive(Debug, Clone)]
pub struct FormArgs<'a, F> {
    pub geometry: &'a Geometry,
    pub element: ElementInfo,
    /// Previous iterate, starting at the form's offset.
    pub u_ext: &'a [F],
    pub ext: &'a [F],
}

impl<'a, F> FormArgs<'a, F> {
    pub fn num_points(&self) -> usize {
        self.geometry.len()
    }
}

/// A bilinear volume or boundary integrand. Writes one value per output component.
pub trait MatrixIntegrand: Send + Sync {
    fn value(&self, args: &FormArgs<'_, &Func>, u: &Func, v: &Func, out: &mut [f64]);

    fn order(&self, args: &OrderArgs, u: FuncOrder, v: FuncOrder) -> PolyOrder;
}

/// A linear volume or boundary integrand.
pub trait VectorIntegrand: Send + Sync {
    fn value(&self, args: &FormArgs<'_, &Func>, v: &Func, out: &mut [f64]);

    fn order(&self, args: &OrderArgs, v: FuncOrder) -> PolyOrder;
}

/// A bilinear integrand on inner edges. Trial and test functions are supported on the central
/// element, the neighbor, or both.
pub trait DgMatrixIntegrand: Send + Sync {
    fn value(
        &self,
        args: &FormArgs<'_, DiscontinuousFunc<'_>>,
        u: &DiscontinuousFunc<'_>,
        v: &DiscontinuousFunc<'_>,
        out: &mut [f64],
    );

    fn order(&self, args: &OrderArgs, u: FuncOrder, v: FuncOrder) -> PolyOrder;
}

/// A linear integrand on inner edges. The test function lives on the central element.
pub trait DgVectorIntegrand: Send + Sync {
    fn value(&self, args: &FormArgs<'_, DiscontinuousFunc<'_>>, v: &Func, out: &mut [f64]);

    fn order(&self, args: &OrderArgs, v: FuncOrder) -> PolyOrder;
}

#[derive(Clone)]
pub enum MatrixKernel {
    Volume(Arc<dyn MatrixIntegrand>),
    Boundary(Arc<dyn MatrixIntegrand>),
    DgInner(Arc<dyn DgMatrixIntegrand>),
}

#[derive(Clone)]
pub enum VectorKernel {
    Volume(Arc<dyn VectorIntegrand>),
    Boundary(Arc<dyn VectorIntegrand>),
    DgInner(Arc<dyn DgVectorIntegrand>),
}

impl MatrixKernel {
    pub fn integral(&self) -> Integral {
        match self {
            MatrixKernel::Volume(_) => Integral::Volume,
            MatrixKernel::Boundary(_) => Integral::Boundary,
            MatrixKernel::DgInner(_) => Integral::DgInner,
        }
    }
}

impl VectorKernel {
    pub fn integral(&self) -> Integral {
        match self {
            VectorKernel::Volume(_) => Integral::Volume,
            VectorKernel::Boundary(_) => Integral::Boundary,
            VectorKernel::DgInner(_) => Integral::DgInner,
        }
    }
}

/// Form metadata shared by matrix and vector forms.
#[derive(Clone, Default)]
pub struct FormSettings {
    pub region: Region,
    pub scaling: f64,
    pub adaptive: Option<AdaptiveSettings>,
    pub ext: Vec<Arc<dyn MeshFunction>>,
    pub u_ext_offset: usize,
}

impl FormSettings {
    fn new() -> Self {
        Self {
            scaling: 1.0,
            ..Default::default()
        }
    }
}

/// A bilinear form contributing to one or more matrix blocks.
///
/// A single-output form contributes to block `(row, col)`. A multi-output form evaluates its
/// integrand with the shape functions of its first coordinate and writes component `c` of the
/// result into the block given by coordinate `c`.
#[derive(Clone)]
pub struct MatrixForm {
    kernel: MatrixKernel,
    coordinates: Vec<(usize, usize)>,
    multi: bool,
    symmetry: Symmetry,
    settings: FormSettings,
}

macro_rules! matrix_form_constructors {
    ($single:ident, $multi:ident, $variant:ident, $integrand:ident) => {
        pub fn $single(row: usize, col: usize, integrand: impl $integrand + 'static) -> Self {
            Self::new(MatrixKernel::$variant(Arc::new(integrand)), vec![(row, col)], false)
        }

        pub fn $multi(coordinates: Vec<(usize, usize)>, integrand: impl $integrand + 'static) -> Self {
            Self::new(MatrixKernel::$variant(Arc::new(integrand)), coordinates, true)
        }
    };
}

impl MatrixForm {
    matrix_form_constructors!(volume, multi_volume, Volume, MatrixIntegrand);
    matrix_form_constructors!(boundary, multi_boundary, Boundary, MatrixIntegrand);
    matrix_form_constructors!(dg_inner, multi_dg_inner, DgInner, DgMatrixIntegrand);

    fn new(kernel: MatrixKernel, coordinates: Vec<(usize, usize)>, multi: bool) -> Self {
        Self {
            kernel,
            coordinates,
            multi,
            symmetry: Symmetry::None,
            settings: FormSettings::new(),
        }
    }

    pub fn with_symmetry(mut self, symmetry: Symmetry) -> Self {
        self.symmetry = symmetry;
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.settings.region = region;
        self
    }

    pub fn with_scaling(mut self, scaling: f64) -> Self {
        self.settings.scaling = scaling;
        self
    }

    pub fn with_adaptive(mut self, adaptive: AdaptiveSettings) -> Self {
        self.settings.adaptive = Some(adaptive);
        self
    }

    pub fn with_ext(mut self, ext: Vec<Arc<dyn MeshFunction>>) -> Self {
        self.settings.ext = ext;
        self
    }

    pub fn with_u_ext_offset(mut self, offset: usize) -> Self {
        self.settings.u_ext_offset = offset;
        self
    }

    pub fn kernel(&self) -> &MatrixKernel {
        &self.kernel
    }

    pub fn integral(&self) -> Integral {
        self.kernel.integral()
    }

    /// Block of the first coordinate.
    pub fn row(&self) -> usize {
        self.coordinates[0].0
    }

    pub fn col(&self) -> usize {
        self.coordinates[0].1
    }

    pub fn coordinates(&self) -> &[(usize, usize)] {
        &self.coordinates
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn symmetry(&self) -> Symmetry {
        self.symmetry
    }

    pub fn settings(&self) -> &FormSettings {
        &self.settings
    }
}

/// A linear form contributing to one or more vector blocks.
#[derive(Clone)]
pub struct VectorForm {
    kernel: VectorKernel,
    rows: Vec<usize>,
    multi: bool,
    settings: FormSettings,
}

macro_rules! vector_form_constructors {
    ($single:ident, $multi:ident, $variant:ident, $integrand:ident) => {
        pub fn $single(row: usize, integrand: impl $integrand + 'static) -> Self {
            Self::new(VectorKernel::$variant(Arc::new(integrand)), vec![row], false)
        }

        pub fn $multi(rows: Vec<usize>, integrand: impl $integrand + 'static) -> Self {
            Self::new(VectorKernel::$variant(Arc::new(integrand)), rows, true)
        }
    };
}

impl VectorForm {
    vector_form_constructors!(volume, multi_volume, Volume, VectorIntegrand);
    vector_form_constructors!(boundary, multi_boundary, Boundary, VectorIntegrand);
    vector_form_constructors!(dg_inner, multi_dg_inner, DgInner, DgVectorIntegrand);

    fn new(kernel: VectorKernel, rows: Vec<usize>, multi: bool) -> Self {
        Self {
            kernel,
            rows,
            multi,
            settings: FormSettings::new(),
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.settings.region = region;
        self
    }

    pub fn with_scaling(mut self, scaling: f64) -> Self {
        self.settings.scaling = scaling;
        self
    }

    pub fn with_adaptive(mut self, adaptive: AdaptiveSettings) -> Self {
        self.settings.adaptive = Some(adaptive);
        self
    }

    pub fn with_ext(mut self, ext: Vec<Arc<dyn MeshFunction>>) -> Self {
        self.settings.ext = ext;
        self
    }

    pub fn with_u_ext_offset(mut self, offset: usize) -> Self {
        self.settings.u_ext_offset = offset;
        self
    }

    pub fn kernel(&self) -> &VectorKernel {
        &self.kernel
    }

    pub fn integral(&self) -> Integral {
        self.kernel.integral()
    }

    pub fn row(&self) -> usize {
        self.rows[0]
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn settings(&self) -> &FormSettings {
        &self.settings
    }
}

/// An ordered collection of matrix and vector forms for a system of `neq` equations.
#[derive(Clone)]
pub struct WeakForm {
    neq: usize,
    seq: u64,
    matrix_forms: Vec<MatrixForm>,
    vector_forms: Vec<VectorForm>,
}

impl WeakForm {
    pub fn new(neq: usize) -> Self {
        Self {
            neq,
            seq: next_seq(),
            matrix_forms: Vec::new(),
            vector_forms: Vec::new(),
        }
    }

    pub fn neq(&self) -> usize {
        self.neq
    }

    /// Change-sequence number, renewed whenever a form is added.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn add_matrix_form(&mut self, form: MatrixForm) {
        self.matrix_forms.push(form);
        self.seq = next_seq();
    }

    pub fn add_vector_form(&mut self, form: VectorForm) {
        self.vector_forms.push(form);
        self.seq = next_seq();
    }

    pub fn matrix_forms(&self) -> &[MatrixForm] {
        &self.matrix_forms
    }

    pub fn vector_forms(&self) -> &[VectorForm] {
        &self.vector_forms
    }

    pub fn has_dg_matrix_forms(&self) -> bool {
        self.matrix_forms.iter().any(|f| f.integral() == Integral::DgInner)
    }

    pub fn has_dg_forms(&self) -> bool {
        self.has_dg_matrix_forms() || self.vector_forms.iter().any(|f| f.integral() == Integral::DgInner)
    }

    /// Which matrix blocks receive contributions.
    ///
    /// Block `(m, n)` is coupled when a matrix form writes to it, or to `(n, m)` with
    /// (anti)symmetry. With `force_diagonal_blocks` all diagonal blocks are coupled.
    pub fn blocks(&self, force_diagonal_blocks: bool) -> Vec<Vec<bool>> {
        let mut blocks = vec![vec![false; self.neq]; self.neq];
        for m in 0..self.neq {
            blocks[m][m] = force_diagonal_blocks;
        }
        for form in &self.matrix_forms {
            for &(i, j) in form.coordinates() {
                if i < self.neq && j < self.neq {
                    blocks[i][j] = true;
                    if form.symmetry() != Symmetry::None {
                        blocks[j][i] = true;
                    }
                }
            }
        }
        blocks
    }

    /// Checks space indices and multi-component symmetry.
    pub fn validate(&self) -> Result<(), AssemblyError> {
        let check = |index: usize| {
            if index < self.neq {
                Ok(())
            } else {
                Err(AssemblyError::SpaceIndexOutOfBounds {
                    index,
                    equations: self.neq,
                })
            }
        };
        for form in &self.matrix_forms {
            if form.coordinates().is_empty() {
                return Err(AssemblyError::EmptyMultiComponentForm);
            }
            for &(i, j) in form.coordinates() {
                check(i)?;
                check(j)?;
                if form.is_multi() && form.symmetry() != Symmetry::None && i != j {
                    return Err(AssemblyError::AsymmetricMultiComponentForm { coordinate: (i, j) });
                }
            }
        }
        for form in &self.vector_forms {
            if form.rows().is_empty() {
                return Err(AssemblyError::EmptyMultiComponentForm);
            }
            form.rows().iter().try_for_each(|&i| check(i))?;
        }
        Ok(())
    }
}
