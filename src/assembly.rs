//! Assembly of global systems from weak forms.
//!
//! [`DiscreteProblem`] ties a [`WeakForm`] to its spaces. Each call to
//! [`DiscreteProblem::assemble`] first makes sure the matrix carries the right sparsity
//! pattern, then partitions the forms into stages (see [`stage`]) and integrates every stage
//! over the common refinement of its meshes (see [`traverse`]).
use crate::error::AssemblyError;
use crate::function::{MeshFunction, Solution};
use crate::quadrature::Quad2d;
use crate::space::Space;
use crate::sparse::{SparseMatrix, Vector};
use crate::weakform::WeakForm;
use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod cache;
pub mod evaluate;
pub mod multimesh_tree;
pub mod neighbor;
pub mod sparse_structure;
pub mod stage;
pub mod state;
pub mod traverse;

use evaluate::Evaluator;
use sparse_structure::collect_structure;
use state::{Sinks, StageAssembler};

/// Factors below this magnitude (scalings, block weights, assembly coefficients) are treated
/// as zero.
pub(crate) const NEGLIGIBLE: f64 = 1e-12;

/// Per-block weights `w[m][n]`, multiplying every contribution to block `(m, n)`.
pub type BlockWeights = DMatrix<f64>;

/// Settings fixed for the lifetime of a [`DiscreteProblem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblySettings {
    /// Ceiling on the quadrature order of any integral.
    pub max_quadrature_order: usize,
    /// Maximum number of nested subdivisions in adaptive integration.
    pub adaptive_max_depth: usize,
    /// Integrate with the order of the reference map only, ignoring form orders.
    pub finite_volume: bool,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            max_quadrature_order: 24,
            adaptive_max_depth: 8,
            finite_volume: false,
        }
    }
}

/// Options of a single assembly call.
#[derive(Debug, Clone, Default)]
pub struct AssemblyOptions<'a> {
    /// Coefficients of the previous iterate, exposed to forms as `u_ext`.
    pub coefficients: Option<&'a [f64]>,
    /// Always include the diagonal blocks in the sparsity pattern.
    pub force_diagonal_blocks: bool,
    /// Whether fixed DOFs contribute their lift to the previous iterate.
    pub add_dirichlet_lift: bool,
    pub block_weights: Option<&'a BlockWeights>,
}

/// What a matrix structure was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StructureKey {
    weak_form_seq: u64,
    space_seqs: Vec<u64>,
    blocks: Vec<Vec<bool>>,
}

/// A weak form together with the spaces it is discretized with.
pub struct DiscreteProblem<'a> {
    weak_form: &'a WeakForm,
    spaces: Vec<&'a dyn Space>,
    settings: AssemblySettings,
    quad: Quad2d,
    structure: Option<StructureKey>,
}

impl<'a> DiscreteProblem<'a> {
    pub fn new(weak_form: &'a WeakForm, spaces: Vec<&'a dyn Space>, settings: AssemblySettings) -> eyre::Result<Self> {
        if spaces.is_empty() {
            return Err(AssemblyError::NoSpaces.into());
        }
        if spaces.len() != weak_form.neq() {
            return Err(AssemblyError::SpaceCountMismatch {
                spaces: spaces.len(),
                equations: weak_form.neq(),
            }
            .into());
        }
        weak_form.validate()?;
        let quad = Quad2d::new(settings.max_quadrature_order)?;
        Ok(Self {
            weak_form,
            spaces,
            settings,
            quad,
            structure: None,
        })
    }

    pub fn weak_form(&self) -> &WeakForm {
        self.weak_form
    }

    pub fn spaces(&self) -> &[&'a dyn Space] {
        &self.spaces
    }

    pub fn settings(&self) -> &AssemblySettings {
        &self.settings
    }

    pub fn num_dofs(&self) -> usize {
        self.spaces.iter().map(|space| space.num_dofs()).sum()
    }

    /// Whether the last structure was built for the current weak form and space numbering.
    pub fn is_up_to_date(&self) -> bool {
        self.structure.as_ref().is_some_and(|key| {
            key.weak_form_seq == self.weak_form.seq() && key.space_seqs == self.space_seqs()
        })
    }

    fn space_seqs(&self) -> Vec<u64> {
        self.spaces.iter().map(|space| space.seq()).collect()
    }

    /// Block coupling mask after applying block weights.
    fn blocks(&self, options: &AssemblyOptions) -> Result<Vec<Vec<bool>>, AssemblyError> {
        let neq = self.weak_form.neq();
        let mut blocks = self.weak_form.blocks(options.force_diagonal_blocks);
        if let Some(weights) = options.block_weights {
            if weights.nrows() != neq || weights.ncols() != neq {
                return Err(AssemblyError::BlockWeightsShape {
                    rows: weights.nrows(),
                    cols: weights.ncols(),
                    equations: neq,
                });
            }
            for m in 0..neq {
                for n in 0..neq {
                    let forced = m == n && options.force_diagonal_blocks;
                    if weights[(m, n)].abs() < NEGLIGIBLE && !forced {
                        blocks[m][n] = false;
                    }
                }
            }
        }
        Ok(blocks)
    }

    /// Assembles the matrix and/or the vector.
    ///
    /// The matrix structure is rebuilt when the weak form, the space numbering or the block
    /// coupling changed since the last call, or when `matrix` has the wrong size. Otherwise
    /// both outputs are zeroed and refilled.
    pub fn assemble(
        &mut self,
        matrix: Option<&mut dyn SparseMatrix>,
        vector: Option<&mut dyn Vector>,
        options: &AssemblyOptions,
    ) -> eyre::Result<()> {
        let blocks = self.blocks(options)?;
        let ndof = self.num_dofs();
        let mut sinks = Sinks { matrix, vector };

        if let Some(matrix) = sinks.matrix.as_deref_mut() {
            let key = StructureKey {
                weak_form_seq: self.weak_form.seq(),
                space_seqs: self.space_seqs(),
                blocks,
            };
            if self.structure.as_ref() == Some(&key) && matrix.size() == ndof {
                debug!("Reusing sparse structure of size {}", ndof);
                matrix.zero();
            } else {
                let structure =
                    collect_structure(&self.spaces, &key.blocks, ndof, self.weak_form.has_dg_matrix_forms())?;
                structure.commit(matrix)?;
                debug!(
                    "Built sparse structure of size {} with {} nonzeros",
                    structure.size(),
                    structure.nnz()
                );
                self.structure = Some(key);
            }
        }
        if let Some(vector) = sinks.vector.as_deref_mut() {
            if vector.len() == ndof {
                vector.zero();
            } else {
                vector.alloc(ndof);
            }
        }

        let u_ext: Vec<Arc<dyn MeshFunction>> = match options.coefficients {
            Some(coefficients) => self
                .spaces
                .iter()
                .map(|space| {
                    let solution = Solution::from_coefficients(*space, coefficients, options.add_dirichlet_lift)?;
                    Ok(Arc::new(solution) as Arc<dyn MeshFunction>)
                })
                .collect::<eyre::Result<_>>()?,
            None => Vec::new(),
        };

        let stages = stage::build_stages(self.weak_form, &self.spaces, &u_ext)?;
        debug!("Assembling {} stages", stages.len());
        for (index, stage) in stages.iter().enumerate() {
            let evaluator = Evaluator {
                quad: &self.quad,
                settings: &self.settings,
                slots: &stage.slots,
            };
            let assembler = StageAssembler::new(stage, &self.spaces, evaluator, options.block_weights);
            let num_states = assembler.assemble(&mut sinks)?;
            debug!(
                "Stage {} with {} meshes and {} forms: {} states",
                index,
                stage.meshes.len(),
                stage.num_forms(),
                num_states
            );
            sinks.finish();
        }
        Ok(())
    }
}
