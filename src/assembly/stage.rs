//! Grouping of forms into stages.
//!
//! A stage is the set of forms that read from exactly the same set of meshes. All meshes of a
//! stage are traversed together, so every form of the stage sees one active element per mesh
//! on every state.
use crate::error::AssemblyError;
use crate::function::MeshFunction;
use crate::mesh::Mesh;
use crate::space::Space;
use crate::weakform::{Integral, MatrixForm, VectorForm, WeakForm};
use std::collections::BTreeSet;
use std::sync::Arc;

/// What a slot evaluates.
#[derive(Debug, Clone)]
pub enum SlotSource {
    Space(usize),
    Function(Arc<dyn MeshFunction>),
}

/// A space or function of a stage, attached to one of the stage's meshes.
#[derive(Debug, Clone)]
pub struct Slot {
    pub source: SlotSource,
    pub mesh: usize,
}

/// Blocks a loaded matrix form writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixOutput<'a> {
    Single { row: usize, col: usize },
    Multi(&'a [(usize, usize)]),
}

impl<'a> MatrixOutput<'a> {
    /// Row and column space of the shape functions the form is evaluated with.
    pub fn first(&self) -> (usize, usize) {
        match self {
            MatrixOutput::Single { row, col } => (*row, *col),
            MatrixOutput::Multi(coordinates) => coordinates[0],
        }
    }

    pub fn coordinates(&self) -> Vec<(usize, usize)> {
        match self {
            MatrixOutput::Single { row, col } => vec![(*row, *col)],
            MatrixOutput::Multi(coordinates) => coordinates.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorOutput<'a> {
    Single { row: usize },
    Multi(&'a [usize]),
}

impl<'a> VectorOutput<'a> {
    pub fn first(&self) -> usize {
        match self {
            VectorOutput::Single { row } => *row,
            VectorOutput::Multi(rows) => rows[0],
        }
    }

    pub fn rows(&self) -> Vec<usize> {
        match self {
            VectorOutput::Single { row } => vec![*row],
            VectorOutput::Multi(rows) => rows.to_vec(),
        }
    }
}

/// A matrix form with its outputs and external functions resolved to stage slots.
#[derive(Clone)]
pub struct LoadedMatrixForm<'a> {
    pub form: &'a MatrixForm,
    pub output: MatrixOutput<'a>,
    pub ext: Vec<usize>,
}

#[derive(Clone)]
pub struct LoadedVectorForm<'a> {
    pub form: &'a VectorForm,
    pub output: VectorOutput<'a>,
    pub ext: Vec<usize>,
}

#[derive(Clone, Default)]
pub struct Stage<'a> {
    /// Meshes, ordered by sequence number.
    pub meshes: Vec<Arc<Mesh>>,
    pub slots: Vec<Slot>,
    /// Slot of every space used by the stage, indexed by space.
    pub space_slots: Vec<Option<usize>>,
    /// Slots of the previous iterate, one per space. Empty without a previous iterate.
    pub u_ext_slots: Vec<usize>,
    pub volume_matrix: Vec<LoadedMatrixForm<'a>>,
    pub boundary_matrix: Vec<LoadedMatrixForm<'a>>,
    pub dg_matrix: Vec<LoadedMatrixForm<'a>>,
    pub volume_vector: Vec<LoadedVectorForm<'a>>,
    pub boundary_vector: Vec<LoadedVectorForm<'a>>,
    pub dg_vector: Vec<LoadedVectorForm<'a>>,
}

impl<'a> Stage<'a> {
    /// Indices of the spaces used by the stage.
    pub fn spaces(&self) -> impl Iterator<Item = usize> + '_ {
        self.space_slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|_| i))
    }

    /// Mesh index of space `i`.
    ///
    /// # Panics
    ///
    /// Panics if the space is not used by the stage.
    pub fn space_mesh(&self, space: usize) -> usize {
        let slot = self.space_slots[space].expect("Space must be used by the stage");
        self.slots[slot].mesh
    }

    pub fn has_dg_matrix_forms(&self) -> bool {
        !self.dg_matrix.is_empty()
    }

    pub fn has_dg_forms(&self) -> bool {
        !self.dg_matrix.is_empty() || !self.dg_vector.is_empty()
    }

    pub fn num_forms(&self) -> usize {
        self.volume_matrix.len()
            + self.boundary_matrix.len()
            + self.dg_matrix.len()
            + self.volume_vector.len()
            + self.boundary_vector.len()
            + self.dg_vector.len()
    }

    fn mesh_index(&self, mesh: &Mesh) -> Result<usize, AssemblyError> {
        self.meshes
            .iter()
            .position(|m| m.seq() == mesh.seq())
            .ok_or(AssemblyError::MeshNotInStage { seq: mesh.seq() })
    }

    fn function_slot(&mut self, function: &Arc<dyn MeshFunction>) -> Result<usize, AssemblyError> {
        let existing = self.slots.iter().position(|slot| match &slot.source {
            SlotSource::Function(f) => same_function(f, function),
            SlotSource::Space(_) => false,
        });
        if let Some(slot) = existing {
            return Ok(slot);
        }
        let mesh = self.mesh_index(function.mesh())?;
        self.slots.push(Slot {
            source: SlotSource::Function(function.clone()),
            mesh,
        });
        Ok(self.slots.len() - 1)
    }

    fn use_space(&mut self, space: usize, spaces: &[&dyn Space]) -> Result<(), AssemblyError> {
        if self.space_slots[space].is_none() {
            let mesh = self.mesh_index(spaces[space].mesh())?;
            self.slots.push(Slot {
                source: SlotSource::Space(space),
                mesh,
            });
            self.space_slots[space] = Some(self.slots.len() - 1);
        }
        Ok(())
    }
}

fn same_function(a: &Arc<dyn MeshFunction>, b: &Arc<dyn MeshFunction>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Forms of one stage before slots are assigned.
#[derive(Default)]
struct StageDraft<'a> {
    seqs: BTreeSet<u64>,
    meshes: Vec<Arc<Mesh>>,
    matrix_forms: Vec<&'a MatrixForm>,
    vector_forms: Vec<&'a VectorForm>,
}

impl<'a> StageDraft<'a> {
    fn add_mesh(&mut self, mesh: &Arc<Mesh>) {
        if self.seqs.insert(mesh.seq()) {
            self.meshes.push(mesh.clone());
        }
    }
}

/// Partitions the forms of `weak_form` into stages.
///
/// `u_ext` holds the previous iterate, one function per space, or is empty. When present,
/// every stage also traverses the meshes of all spaces.
pub fn build_stages<'a>(
    weak_form: &'a WeakForm,
    spaces: &[&dyn Space],
    u_ext: &[Arc<dyn MeshFunction>],
) -> Result<Vec<Stage<'a>>, AssemblyError> {
    let mut drafts: Vec<StageDraft<'a>> = Vec::new();

    let mut draft_for = |space_indices: &mut dyn Iterator<Item = usize>, ext: &[Arc<dyn MeshFunction>]| {
        let mut draft = StageDraft::default();
        for i in space_indices {
            draft.add_mesh(spaces[i].mesh());
        }
        for function in ext {
            draft.add_mesh(function.mesh());
        }
        if !u_ext.is_empty() {
            for space in spaces {
                draft.add_mesh(space.mesh());
            }
        }
        match drafts.iter().position(|d| d.seqs == draft.seqs) {
            Some(index) => index,
            None => {
                drafts.push(draft);
                drafts.len() - 1
            }
        }
    };

    let mut matrix_stage = Vec::new();
    for form in weak_form.matrix_forms() {
        let mut indices = form.coordinates().iter().flat_map(|&(i, j)| [i, j]);
        matrix_stage.push(draft_for(&mut indices, &form.settings().ext));
    }
    let mut vector_stage = Vec::new();
    for form in weak_form.vector_forms() {
        let mut indices = form.rows().iter().copied();
        vector_stage.push(draft_for(&mut indices, &form.settings().ext));
    }
    for (form, &stage) in weak_form.matrix_forms().iter().zip(&matrix_stage) {
        drafts[stage].matrix_forms.push(form);
    }
    for (form, &stage) in weak_form.vector_forms().iter().zip(&vector_stage) {
        drafts[stage].vector_forms.push(form);
    }

    drafts
        .into_iter()
        .map(|draft| load_stage(draft, spaces, u_ext))
        .collect()
}

fn load_stage<'a>(
    draft: StageDraft<'a>,
    spaces: &[&dyn Space],
    u_ext: &[Arc<dyn MeshFunction>],
) -> Result<Stage<'a>, AssemblyError> {
    let mut meshes = draft.meshes;
    meshes.sort_by_key(|mesh| mesh.seq());
    let mut stage = Stage {
        meshes,
        space_slots: vec![None; spaces.len()],
        ..Default::default()
    };

    let u_ext_slots: Vec<usize> = u_ext
        .iter()
        .map(|f| stage.function_slot(f))
        .collect::<Result<_, _>>()?;
    stage.u_ext_slots = u_ext_slots;

    for form in draft.matrix_forms {
        for &(i, j) in form.coordinates() {
            stage.use_space(i, spaces)?;
            stage.use_space(j, spaces)?;
        }
        let ext = form
            .settings()
            .ext
            .iter()
            .map(|f| stage.function_slot(f))
            .collect::<Result<_, _>>()?;
        let output = if form.is_multi() {
            MatrixOutput::Multi(form.coordinates())
        } else {
            MatrixOutput::Single {
                row: form.row(),
                col: form.col(),
            }
        };
        let loaded = LoadedMatrixForm { form, output, ext };
        match form.integral() {
            Integral::Volume => stage.volume_matrix.push(loaded),
            Integral::Boundary => stage.boundary_matrix.push(loaded),
            Integral::DgInner => stage.dg_matrix.push(loaded),
        }
    }

    for form in draft.vector_forms {
        for &i in form.rows() {
            stage.use_space(i, spaces)?;
        }
        let ext = form
            .settings()
            .ext
            .iter()
            .map(|f| stage.function_slot(f))
            .collect::<Result<_, _>>()?;
        let output = if form.is_multi() {
            VectorOutput::Multi(form.rows())
        } else {
            VectorOutput::Single { row: form.row() }
        };
        let loaded = LoadedVectorForm { form, output, ext };
        match form.integral() {
            Integral::Volume => stage.volume_vector.push(loaded),
            Integral::Boundary => stage.boundary_vector.push(loaded),
            Integral::DgInner => stage.dg_vector.push(loaded),
        }
    }

    Ok(stage)
}
