//! Numeric assembly of one stage, state by state.
use crate::assembly::cache::{AssemblyCache, Domain};
use crate::assembly::evaluate::{
    surface_start_order, volume_start_order, DgContext, DgShapeRef, DgSlot, Evaluator, FormContext, ShapeRef, Side,
};
use crate::assembly::neighbor::resolve_neighbors;
use crate::assembly::stage::{LoadedMatrixForm, LoadedVectorForm, Stage};
use crate::assembly::traverse::State;
use crate::assembly::{BlockWeights, NEGLIGIBLE};
use crate::error::AssemblyError;
use crate::mesh::INNER_EDGE_MARKER;
use crate::refmap::RefMap;
use crate::space::{AssemblyList, Space};
use crate::sparse::{SparseMatrix, Vector};
use crate::transform::{half_label, EdgeHalf};
use crate::weakform::{
    AdaptiveSettings, DgMatrixIntegrand, DgVectorIntegrand, ElementInfo, FormSettings, MatrixIntegrand, MatrixKernel,
    Symmetry, VectorIntegrand, VectorKernel,
};
use nalgebra::DMatrix;
use rustc_hash::FxHashSet;

/// The matrix and vector receiving contributions. Either may be absent.
pub struct Sinks<'m, 'v> {
    pub matrix: Option<&'m mut dyn SparseMatrix>,
    pub vector: Option<&'v mut dyn Vector>,
}

impl<'m, 'v> Sinks<'m, 'v> {
    fn add_block(&mut self, rows: &[Option<usize>], cols: &[Option<usize>], block: &DMatrix<f64>) -> eyre::Result<()> {
        match self.matrix.as_deref_mut() {
            Some(matrix) => matrix.add_block(rows, cols, block),
            None => Ok(()),
        }
    }

    fn add(&mut self, index: usize, value: f64) {
        if let Some(vector) = self.vector.as_deref_mut() {
            vector.add(index, value);
        }
    }

    pub fn finish(&mut self) {
        if let Some(matrix) = self.matrix.as_deref_mut() {
            matrix.finish();
        }
        if let Some(vector) = self.vector.as_deref_mut() {
            vector.finish();
        }
    }
}

/// Per-stage buffers reused from state to state.
#[derive(Debug, Default)]
struct Scratch {
    cache: AssemblyCache,
    /// Elements of earlier states, as `(mesh, element)`. Only tracked with inner-edge matrix
    /// forms.
    visited: FxHashSet<(usize, usize)>,
    lists: Vec<AssemblyList>,
    boundary_lists: Vec<AssemblyList>,
    extended_lists: Vec<AssemblyList>,
    neighbor_list: AssemblyList,
    blocks: LocalBlocks,
}

/// Dense local matrices, one per output block of a form.
#[derive(Debug, Default)]
struct LocalBlocks(Vec<DMatrix<f64>>);

impl LocalBlocks {
    /// Returns `count` zeroed `rows x cols` matrices, reusing earlier allocations.
    fn reset(&mut self, count: usize, rows: usize, cols: usize) -> &mut [DMatrix<f64>] {
        if self.0.len() < count {
            self.0.resize_with(count, || DMatrix::zeros(0, 0));
        }
        for block in &mut self.0[..count] {
            if block.shape() != (rows, cols) {
                block.resize_mut(rows, cols, 0.0);
            }
            block.fill(0.0);
        }
        &mut self.0[..count]
    }
}

/// Integration domain of volume and boundary forms on one state.
struct Patch<'r> {
    lists: &'r [AssemblyList],
    sides: Vec<Side<'r>>,
    fine: usize,
    element: ElementInfo,
    /// Son labels used by adaptive subdivision.
    sons: Vec<u8>,
    surface: bool,
}

pub struct StageAssembler<'p, 'a> {
    stage: &'p Stage<'a>,
    spaces: &'p [&'a dyn Space],
    evaluator: Evaluator<'p>,
    block_weights: Option<&'p BlockWeights>,
}

impl<'p, 'a> StageAssembler<'p, 'a> {
    pub fn new(
        stage: &'p Stage<'a>,
        spaces: &'p [&'a dyn Space],
        evaluator: Evaluator<'p>,
        block_weights: Option<&'p BlockWeights>,
    ) -> Self {
        Self {
            stage,
            spaces,
            evaluator,
            block_weights,
        }
    }

    /// Traverses the stage and adds all contributions. Returns the number of states.
    pub fn assemble(&self, sinks: &mut Sinks) -> eyre::Result<usize> {
        let n = self.spaces.len();
        let mut scratch = Scratch {
            lists: vec![AssemblyList::new(); n],
            boundary_lists: vec![AssemblyList::new(); n],
            extended_lists: vec![AssemblyList::new(); n],
            ..Default::default()
        };
        let mut num_states = 0;
        crate::assembly::traverse::traverse(&self.stage.meshes, |state| {
            num_states += 1;
            self.assemble_state(state, &mut scratch, sinks)
        })?;
        Ok(num_states)
    }

    fn block_weight(&self, row: usize, col: usize) -> f64 {
        self.block_weights.map_or(1.0, |weights| weights[(row, col)])
    }

    fn assemble_state(&self, state: &State, scratch: &mut Scratch, sinks: &mut Sinks) -> eyre::Result<()> {
        scratch.cache.clear();
        let refmaps: Vec<RefMap> = self
            .stage
            .meshes
            .iter()
            .zip(&state.cells)
            .map(|(mesh, cell)| RefMap::new(mesh, mesh.element(cell.element)))
            .collect();

        for space in self.stage.spaces() {
            let cell = &state.cells[self.stage.space_mesh(space)];
            self.spaces[space].element_assembly_list(cell.element, &mut scratch.lists[space]);
        }
        if self.stage.has_dg_matrix_forms() {
            for (mesh, cell) in state.cells.iter().enumerate() {
                scratch.visited.insert((mesh, cell.element));
            }
        }

        let element = ElementInfo {
            diameter: refmaps[state.fine].diameter(),
            element_marker: state.marker,
            edge_marker: None,
        };
        let volume = Patch {
            lists: &scratch.lists,
            sides: self.sides(state, &refmaps, Domain::Volume),
            fine: state.fine,
            element,
            sons: (0..4).collect(),
            surface: false,
        };
        self.assemble_volume(&mut scratch.cache, &mut scratch.blocks, &volume, state.marker, sinks)?;

        for edge in 0..state.num_edges() {
            match state.edge_markers[edge] {
                Some(marker) => {
                    if self.stage.boundary_matrix.is_empty() && self.stage.boundary_vector.is_empty() {
                        continue;
                    }
                    scratch.cache.clear();
                    for space in self.stage.spaces() {
                        let cell = &state.cells[self.stage.space_mesh(space)];
                        self.spaces[space].boundary_assembly_list(cell.element, edge, &mut scratch.boundary_lists[space]);
                    }
                    let boundary = Patch {
                        lists: &scratch.boundary_lists,
                        sides: self.sides(state, &refmaps, Domain::Edge { edge, reversed: false }),
                        fine: state.fine,
                        element: ElementInfo {
                            edge_marker: Some(marker),
                            ..element
                        },
                        sons: vec![
                            half_label(state.mode, edge, EdgeHalf::First),
                            half_label(state.mode, edge, EdgeHalf::Second),
                        ],
                        surface: true,
                    };
                    self.assemble_boundary(&mut scratch.cache, &mut scratch.blocks, &boundary, marker, sinks)?;
                }
                None if self.stage.has_dg_forms() => {
                    self.assemble_inner_edge(state, &refmaps, edge, scratch, sinks)?;
                }
                None => {}
            }
        }
        Ok(())
    }

    fn sides<'r>(&self, state: &State, refmaps: &'r [RefMap], domain: Domain) -> Vec<Side<'r>> {
        state
            .cells
            .iter()
            .zip(refmaps)
            .enumerate()
            .map(|(mesh, (cell, refmap))| Side {
                mesh,
                element: cell.element,
                refmap,
                path: cell.path.clone(),
                domain,
            })
            .collect()
    }

    fn form_context<'r>(&self, patch: &Patch<'r>, settings: &FormSettings, ext: &[usize]) -> FormContext<'r> {
        let side = |slot: usize| (slot, patch.sides[self.stage.slots[slot].mesh].clone());
        FormContext {
            geometry: patch.sides[patch.fine].clone(),
            u_ext: self
                .stage
                .u_ext_slots
                .iter()
                .skip(settings.u_ext_offset)
                .map(|&slot| side(slot))
                .collect(),
            ext: ext.iter().map(|&slot| side(slot)).collect(),
            element: patch.element,
            scaling: settings.scaling,
        }
    }

    fn shape<'s, 'r>(&self, space: usize, list: &AssemblyList, k: usize, side: &'s Side<'r>) -> ShapeRef<'s, 'r>
    where
        'p: 's,
    {
        ShapeRef {
            shapeset: self.spaces[space].shapeset().as_ref(),
            index: list.idx[k],
            side,
        }
    }

    /// Checks that all coordinates of a multi-component form see the same local shape
    /// functions as its first coordinate.
    fn check_compatible(&self, lists: &[AssemblyList], coordinates: &[(usize, usize)]) -> Result<(), AssemblyError> {
        let (m, n) = coordinates[0];
        for &(row, col) in &coordinates[1..] {
            for (first, other) in [(m, row), (n, col)] {
                if lists[first].idx != lists[other].idx {
                    return Err(AssemblyError::IncompatibleMultiComponentSpaces { first, other });
                }
            }
        }
        Ok(())
    }

    fn check_compatible_rows(&self, lists: &[AssemblyList], rows: &[usize]) -> Result<(), AssemblyError> {
        let first = rows[0];
        match rows[1..].iter().find(|&&other| lists[other].idx != lists[first].idx) {
            Some(&other) => Err(AssemblyError::IncompatibleMultiComponentSpaces { first, other }),
            None => Ok(()),
        }
    }

    fn assemble_volume(
        &self,
        cache: &mut AssemblyCache,
        blocks: &mut LocalBlocks,
        patch: &Patch,
        marker: u32,
        sinks: &mut Sinks,
    ) -> eyre::Result<()> {
        for loaded in &self.stage.volume_matrix {
            let MatrixKernel::Volume(integrand) = loaded.form.kernel() else { continue };
            if is_active(loaded.form.settings(), marker) {
                self.assemble_matrix_form(cache, blocks, patch, loaded, integrand.as_ref(), sinks)?;
            }
        }
        for loaded in &self.stage.volume_vector {
            let VectorKernel::Volume(integrand) = loaded.form.kernel() else { continue };
            if is_active(loaded.form.settings(), marker) {
                self.assemble_vector_form(cache, patch, loaded, integrand.as_ref(), sinks)?;
            }
        }
        Ok(())
    }

    fn assemble_boundary(
        &self,
        cache: &mut AssemblyCache,
        blocks: &mut LocalBlocks,
        patch: &Patch,
        marker: u32,
        sinks: &mut Sinks,
    ) -> eyre::Result<()> {
        // A space is natural on the edge unless an essential condition claims its marker
        let natural = |space: usize| marker > 0 && !self.spaces[space].is_essential(marker);

        for loaded in &self.stage.boundary_matrix {
            let MatrixKernel::Boundary(integrand) = loaded.form.kernel() else { continue };
            let (m, n) = loaded.output.first();
            if is_active(loaded.form.settings(), marker) && natural(m) && natural(n) {
                self.assemble_matrix_form(cache, blocks, patch, loaded, integrand.as_ref(), sinks)?;
            }
        }
        for loaded in &self.stage.boundary_vector {
            let VectorKernel::Boundary(integrand) = loaded.form.kernel() else { continue };
            if is_active(loaded.form.settings(), marker) && natural(loaded.output.first()) {
                self.assemble_vector_form(cache, patch, loaded, integrand.as_ref(), sinks)?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble_matrix_form(
        &self,
        cache: &mut AssemblyCache,
        blocks: &mut LocalBlocks,
        patch: &Patch,
        loaded: &LoadedMatrixForm,
        integrand: &dyn MatrixIntegrand,
        sinks: &mut Sinks,
    ) -> eyre::Result<()> {
        let coordinates = loaded.output.coordinates();
        let (m, n) = loaded.output.first();
        let symmetry = loaded.form.symmetry();
        let transposed = m != n && symmetry != Symmetry::None;
        let weights: Vec<f64> = coordinates.iter().map(|&(i, j)| self.block_weight(i, j)).collect();
        // Weights of the mirrored blocks (col, row) receiving the transpose
        let transpose_weights: Vec<f64> = coordinates
            .iter()
            .map(|&(i, j)| if transposed { self.block_weight(j, i) } else { 0.0 })
            .collect();
        if weights.iter().chain(&transpose_weights).all(|w| w.abs() < NEGLIGIBLE) {
            return Ok(());
        }
        self.check_compatible(patch.lists, &coordinates)?;

        let settings = loaded.form.settings();
        let (lm, ln) = (&patch.lists[m], &patch.lists[n]);
        let symmetric = m == n && symmetry == Symmetry::Symmetric;
        let v_side = &patch.sides[self.stage.space_mesh(m)];
        let u_side = &patch.sides[self.stage.space_mesh(n)];
        let ctx = self.form_context(patch, settings, &loaded.ext);

        let blocks = blocks.reset(coordinates.len(), lm.len(), ln.len());
        let mut values = vec![0.0; coordinates.len()];
        for i in 0..lm.len() {
            if lm.dof[i].is_none() || lm.coef[i].abs() < NEGLIGIBLE {
                continue;
            }
            let v = self.shape(m, lm, i, v_side);
            let first = if symmetric { i } else { 0 };
            for j in first..ln.len() {
                if ln.dof[j].is_none() || ln.coef[j].abs() < NEGLIGIBLE {
                    continue;
                }
                let u = self.shape(n, ln, j, u_side);
                self.evaluate_matrix(cache, patch, &ctx, integrand, &u, &v, settings.adaptive.as_ref(), &mut values);
                for (c, &(row, col)) in coordinates.iter().enumerate() {
                    let value = values[c] * patch.lists[row].coef[i] * patch.lists[col].coef[j];
                    blocks[c][(i, j)] = value;
                    if symmetric && i != j {
                        blocks[c][(j, i)] = value;
                    }
                }
            }
        }

        for (c, &(row, col)) in coordinates.iter().enumerate() {
            let (rows, cols) = (&patch.lists[row].dof, &patch.lists[col].dof);
            if transpose_weights[c].abs() >= NEGLIGIBLE {
                let sign = if symmetry == Symmetry::Antisymmetric { -1.0 } else { 1.0 };
                let transpose = blocks[c].transpose() * (sign * transpose_weights[c]);
                sinks.add_block(cols, rows, &transpose)?;
            }
            if weights[c].abs() >= NEGLIGIBLE {
                blocks[c] *= weights[c];
                sinks.add_block(rows, cols, &blocks[c])?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_matrix(
        &self,
        cache: &mut AssemblyCache,
        patch: &Patch,
        ctx: &FormContext,
        integrand: &dyn MatrixIntegrand,
        u: &ShapeRef,
        v: &ShapeRef,
        adaptive: Option<&AdaptiveSettings>,
        out: &mut [f64],
    ) {
        let evaluator = &self.evaluator;
        let Some(adaptive) = adaptive else {
            let order = evaluator.matrix_order(ctx, integrand, u, v);
            evaluator.matrix(cache, ctx, integrand, u, v, order, &[], out);
            return;
        };
        let start = if patch.surface {
            surface_start_order(Some(u.order().val.value()), v.order().val.value())
        } else {
            volume_start_order(Some(u.directional_order()), v.directional_order())
        };
        let len = out.len();
        let result = evaluator.adaptive(start, &patch.sons, adaptive, &mut |order, extra| {
            let mut values = vec![0.0; len];
            evaluator.matrix(cache, ctx, integrand, u, v, order, extra, &mut values);
            values
        });
        out.copy_from_slice(&result);
    }

    fn assemble_vector_form(
        &self,
        cache: &mut AssemblyCache,
        patch: &Patch,
        loaded: &LoadedVectorForm,
        integrand: &dyn VectorIntegrand,
        sinks: &mut Sinks,
    ) -> eyre::Result<()> {
        let rows = loaded.output.rows();
        self.check_compatible_rows(patch.lists, &rows)?;

        let settings = loaded.form.settings();
        let m = loaded.output.first();
        let lm = &patch.lists[m];
        let v_side = &patch.sides[self.stage.space_mesh(m)];
        let ctx = self.form_context(patch, settings, &loaded.ext);
        let evaluator = &self.evaluator;

        let mut values = vec![0.0; rows.len()];
        for i in 0..lm.len() {
            if lm.dof[i].is_none() || lm.coef[i].abs() < NEGLIGIBLE {
                continue;
            }
            let v = self.shape(m, lm, i, v_side);
            match settings.adaptive.as_ref() {
                None => {
                    let order = evaluator.vector_order(&ctx, integrand, &v);
                    evaluator.vector(cache, &ctx, integrand, &v, order, &[], &mut values);
                }
                Some(adaptive) => {
                    let start = if patch.surface {
                        surface_start_order(None, v.order().val.value())
                    } else {
                        volume_start_order(None, v.directional_order())
                    };
                    let len = values.len();
                    let result = evaluator.adaptive(start, &patch.sons, adaptive, &mut |order, extra| {
                        let mut values = vec![0.0; len];
                        evaluator.vector(cache, &ctx, integrand, &v, order, extra, &mut values);
                        values
                    });
                    values.copy_from_slice(&result);
                }
            }
            for (c, &row) in rows.iter().enumerate() {
                let list = &patch.lists[row];
                if let Some(dof) = list.dof[i] {
                    sinks.add(dof, values[c] * list.coef[i]);
                }
            }
        }
        Ok(())
    }

    fn assemble_inner_edge(
        &self,
        state: &State,
        refmaps: &[RefMap],
        edge: usize,
        scratch: &mut Scratch,
        sinks: &mut Sinks,
    ) -> eyre::Result<()> {
        let meshes = &self.stage.meshes;
        let neighbors = resolve_neighbors(meshes, state, edge)?;

        for segment in 0..neighbors.num_segments() {
            scratch.cache.clear();
            let records: Vec<_> = neighbors.records.iter().map(|records| &records[segment]).collect();
            let neighbor_refmaps: Vec<RefMap> = meshes
                .iter()
                .zip(&records)
                .map(|(mesh, record)| RefMap::new(mesh, mesh.element(record.neighbor)))
                .collect();
            let central: Vec<Side> = state
                .cells
                .iter()
                .zip(refmaps)
                .zip(&records)
                .enumerate()
                .map(|(mesh, ((cell, refmap), record))| Side {
                    mesh,
                    element: cell.element,
                    refmap,
                    path: cell.path.joined(record.central_path.labels()),
                    domain: Domain::Edge { edge, reversed: false },
                })
                .collect();
            let neighbor: Vec<Side> = records
                .iter()
                .zip(&neighbor_refmaps)
                .enumerate()
                .map(|(mesh, (record, refmap))| Side {
                    mesh,
                    element: record.neighbor,
                    refmap,
                    path: record.neighbor_path.clone(),
                    domain: Domain::Edge {
                        edge: record.neighbor_edge,
                        reversed: !record.same_direction,
                    },
                })
                .collect();

            // Central entries first, then the neighbor's
            let mut central_counts = vec![0; self.spaces.len()];
            for space in self.stage.spaces() {
                let mesh = self.stage.space_mesh(space);
                let extended = &mut scratch.extended_lists[space];
                extended.clear();
                extended.extend_from(&scratch.lists[space]);
                central_counts[space] = extended.len();
                self.spaces[space].element_assembly_list(records[mesh].neighbor, &mut scratch.neighbor_list);
                extended.extend_from(&scratch.neighbor_list);
            }

            let processed = records
                .iter()
                .enumerate()
                .all(|(mesh, record)| scratch.visited.contains(&(mesh, record.neighbor)));

            let inverse_ref_order = refmaps
                .iter()
                .chain(&neighbor_refmaps)
                .map(RefMap::inverse_ref_order)
                .max()
                .unwrap_or(0);
            let element = ElementInfo {
                diameter: refmaps[state.fine].diameter(),
                element_marker: state.marker,
                edge_marker: Some(INNER_EDGE_MARKER),
            };
            let context = |settings: &FormSettings, ext: &[usize]| {
                let slot = |slot: usize| {
                    let mesh = self.stage.slots[slot].mesh;
                    DgSlot {
                        slot,
                        central: central[mesh].clone(),
                        neighbor: neighbor[mesh].clone(),
                    }
                };
                DgContext {
                    geometry: central[state.fine].clone(),
                    inverse_ref_order,
                    u_ext: self
                        .stage
                        .u_ext_slots
                        .iter()
                        .skip(settings.u_ext_offset)
                        .map(|&s| slot(s))
                        .collect(),
                    ext: ext.iter().map(|&s| slot(s)).collect(),
                    element,
                    scaling: settings.scaling,
                }
            };
            let segment_sides = SegmentSides {
                central: &central,
                neighbor: &neighbor,
                lists: &scratch.extended_lists,
                central_counts: &central_counts,
            };

            if !processed {
                for loaded in &self.stage.dg_matrix {
                    let MatrixKernel::DgInner(integrand) = loaded.form.kernel() else { continue };
                    let settings = loaded.form.settings();
                    if settings.scaling.abs() < NEGLIGIBLE {
                        continue;
                    }
                    let ctx = context(settings, &loaded.ext);
                    self.assemble_dg_matrix_form(
                        &mut scratch.cache,
                        &mut scratch.blocks,
                        &segment_sides,
                        &ctx,
                        loaded,
                        integrand.as_ref(),
                        sinks,
                    )?;
                }
            }
            for loaded in &self.stage.dg_vector {
                let VectorKernel::DgInner(integrand) = loaded.form.kernel() else { continue };
                let settings = loaded.form.settings();
                if settings.scaling.abs() < NEGLIGIBLE {
                    continue;
                }
                let ctx = context(settings, &loaded.ext);
                self.assemble_dg_vector_form(
                    &mut scratch.cache,
                    &segment_sides,
                    &scratch.lists,
                    &ctx,
                    loaded,
                    integrand.as_ref(),
                    sinks,
                )?;
            }
        }
        Ok(())
    }

    fn dg_shape<'s, 'r>(&self, sides: &'s SegmentSides<'_, 'r>, space: usize, k: usize) -> DgShapeRef<'s, 'r>
    where
        'p: 's,
    {
        let mesh = self.stage.space_mesh(space);
        let on_neighbor = k >= sides.central_counts[space];
        let side = if on_neighbor { &sides.neighbor[mesh] } else { &sides.central[mesh] };
        DgShapeRef {
            shape: self.shape(space, &sides.lists[space], k, side),
            on_neighbor,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble_dg_matrix_form(
        &self,
        cache: &mut AssemblyCache,
        blocks: &mut LocalBlocks,
        sides: &SegmentSides,
        ctx: &DgContext,
        loaded: &LoadedMatrixForm,
        integrand: &dyn DgMatrixIntegrand,
        sinks: &mut Sinks,
    ) -> eyre::Result<()> {
        let coordinates = loaded.output.coordinates();
        let weights: Vec<f64> = coordinates.iter().map(|&(i, j)| self.block_weight(i, j)).collect();
        if weights.iter().all(|w| w.abs() < NEGLIGIBLE) {
            return Ok(());
        }
        self.check_compatible(sides.lists, &coordinates)?;

        let (m, n) = loaded.output.first();
        let (lm, ln) = (&sides.lists[m], &sides.lists[n]);
        let blocks = blocks.reset(coordinates.len(), lm.len(), ln.len());
        let mut values = vec![0.0; coordinates.len()];
        for i in 0..lm.len() {
            if lm.dof[i].is_none() || lm.coef[i].abs() < NEGLIGIBLE {
                continue;
            }
            let v = self.dg_shape(sides, m, i);
            for j in 0..ln.len() {
                if ln.dof[j].is_none() || ln.coef[j].abs() < NEGLIGIBLE {
                    continue;
                }
                let u = self.dg_shape(sides, n, j);
                let order = self.evaluator.dg_matrix_order(ctx, integrand, &u, &v);
                self.evaluator.dg_matrix(cache, ctx, integrand, &u, &v, order, &mut values);
                for (c, &(row, col)) in coordinates.iter().enumerate() {
                    blocks[c][(i, j)] = values[c] * sides.lists[row].coef[i] * sides.lists[col].coef[j];
                }
            }
        }

        for (c, &(row, col)) in coordinates.iter().enumerate() {
            if weights[c].abs() >= NEGLIGIBLE {
                blocks[c] *= weights[c];
                sinks.add_block(&sides.lists[row].dof, &sides.lists[col].dof, &blocks[c])?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble_dg_vector_form(
        &self,
        cache: &mut AssemblyCache,
        sides: &SegmentSides,
        lists: &[AssemblyList],
        ctx: &DgContext,
        loaded: &LoadedVectorForm,
        integrand: &dyn DgVectorIntegrand,
        sinks: &mut Sinks,
    ) -> eyre::Result<()> {
        let rows = loaded.output.rows();
        self.check_compatible_rows(lists, &rows)?;

        let m = loaded.output.first();
        let lm = &lists[m];
        let side = &sides.central[self.stage.space_mesh(m)];
        let mut values = vec![0.0; rows.len()];
        for i in 0..lm.len() {
            if lm.dof[i].is_none() || lm.coef[i].abs() < NEGLIGIBLE {
                continue;
            }
            let v = self.shape(m, lm, i, side);
            let order = self.evaluator.dg_vector_order(ctx, integrand, &v);
            self.evaluator.dg_vector(cache, ctx, integrand, &v, order, &mut values);
            for (c, &row) in rows.iter().enumerate() {
                let list = &lists[row];
                if let Some(dof) = list.dof[i] {
                    sinks.add(dof, values[c] * list.coef[i]);
                }
            }
        }
        Ok(())
    }
}

/// Both sides of one inner-edge segment, with the extended assembly lists of every space.
struct SegmentSides<'s, 'r> {
    central: &'s [Side<'r>],
    neighbor: &'s [Side<'r>],
    lists: &'s [AssemblyList],
    central_counts: &'s [usize],
}

fn is_active(settings: &FormSettings, marker: u32) -> bool {
    settings.scaling.abs() >= NEGLIGIBLE && settings.region.contains(marker)
}
