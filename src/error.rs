//! Configuration errors raised by the assembly engine.
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// Fatal configuration errors.
///
/// These abort assembly entirely and are never retried. They are reported through
/// [`eyre::Report`] and can be recovered with `report.downcast_ref::<AssemblyError>()`.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyError {
    /// The number of spaces does not match the number of equations of the weak form.
    SpaceCountMismatch { spaces: usize, equations: usize },
    /// A problem was constructed without any space.
    NoSpaces,
    /// The block weight table is not `neq x neq`.
    BlockWeightsShape { rows: usize, cols: usize, equations: usize },
    /// A form refers to a space index that does not exist.
    SpaceIndexOutOfBounds { index: usize, equations: usize },
    /// A symmetric multi-component form couples different row and column spaces.
    AsymmetricMultiComponentForm { coordinate: (usize, usize) },
    /// A multi-component form was given no coordinates.
    EmptyMultiComponentForm,
    /// A multi-component form refers to spaces whose assembly lists cannot be aligned.
    IncompatibleMultiComponentSpaces { first: usize, other: usize },
    /// A third distinct transformation label was inserted below one multimesh tree node.
    TreeLabelCollision { depth: usize, label: u8 },
    /// A multimesh tree node has a right child but no left child.
    MalformedTreeNode { node: usize },
    /// A transformation path could not be located in the multimesh tree.
    TreePathNotFound { path: Vec<u8> },
    /// After reconciliation, meshes report different numbers of neighbor segments.
    NeighborCountMismatch { counts: Vec<usize> },
    /// Meshes traversed together do not originate from the same base mesh.
    IncompatibleBaseMeshes,
    /// A space or function lives on a mesh that the stage does not traverse.
    MeshNotInStage { seq: u64 },
    /// The previous-iterate coefficient vector is shorter than the number of DOFs.
    CoefficientVectorTooShort { len: usize, required: usize },
    /// A value was added outside the allocated sparsity pattern.
    EntryOutsidePattern { row: usize, col: usize },
    /// The sparse backend was used before it was allocated.
    BackendNotAllocated,
}

impl Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            AssemblyError::SpaceCountMismatch { spaces, equations } => {
                write!(f, "bad number of spaces: got {spaces}, the weak form has {equations} equations")
            }
            AssemblyError::NoSpaces => write!(f, "a discrete problem needs at least one space"),
            AssemblyError::BlockWeightsShape { rows, cols, equations } => write!(
                f,
                "block weight table is {rows}x{cols}, expected {equations}x{equations}"
            ),
            AssemblyError::SpaceIndexOutOfBounds { index, equations } => {
                write!(f, "form refers to space {index}, but there are only {equations} equations")
            }
            AssemblyError::AsymmetricMultiComponentForm { coordinate } => write!(
                f,
                "symmetric multi-component form has off-diagonal coordinate ({}, {})",
                coordinate.0, coordinate.1
            ),
            AssemblyError::EmptyMultiComponentForm => write!(f, "multi-component form has no coordinates"),
            AssemblyError::IncompatibleMultiComponentSpaces { first, other } => write!(
                f,
                "multi-component form couples spaces {first} and {other} with incompatible assembly lists"
            ),
            AssemblyError::TreeLabelCollision { depth, label } => write!(
                f,
                "multimesh tree node at depth {depth} already has two children, cannot add label {label}"
            ),
            AssemblyError::MalformedTreeNode { node } => {
                write!(f, "multimesh tree node {node} has a right child but no left child")
            }
            AssemblyError::TreePathNotFound { path } => {
                write!(f, "transformation path {path:?} not present in the multimesh tree")
            }
            AssemblyError::NeighborCountMismatch { counts } => {
                write!(f, "meshes report different neighbor counts along one edge: {counts:?}")
            }
            AssemblyError::IncompatibleBaseMeshes => {
                write!(f, "meshes assembled together must share the same base mesh")
            }
            AssemblyError::MeshNotInStage { seq } => {
                write!(f, "mesh with sequence number {seq} is not traversed by its assembly stage")
            }
            AssemblyError::CoefficientVectorTooShort { len, required } => write!(
                f,
                "coefficient vector has length {len}, but at least {required} entries are required"
            ),
            AssemblyError::EntryOutsidePattern { row, col } => {
                write!(f, "entry ({row}, {col}) is not part of the sparsity pattern")
            }
            AssemblyError::BackendNotAllocated => write!(f, "sparse backend has not been allocated"),
        }
    }
}

impl Error for AssemblyError {}
