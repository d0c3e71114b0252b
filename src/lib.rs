//! Assembly of finite element systems on independently refined 2D meshes.
//!
//! The central type is [`assembly::DiscreteProblem`], which turns a [`weakform::WeakForm`] and a
//! set of [`space::Space`]s into a global sparse matrix and load vector. Spaces may live on
//! different refinements of a common base mesh; the engine walks all meshes in lockstep and
//! integrates every form on the common refinement.
use std::sync::atomic::{AtomicU64, Ordering};

pub mod assembly;
pub mod error;
pub mod function;
pub mod mesh;
pub mod order;
pub mod quadrature;
pub mod refmap;
pub mod shapeset;
pub mod space;
pub mod sparse;
pub mod transform;
pub mod weakform;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

static SEQ: AtomicU64 = AtomicU64::new(1);

/// Draws a new change-sequence number. Numbers are unique within the process.
pub(crate) fn next_seq() -> u64 {
    SEQ.fetch_add(1, Ordering::Relaxed)
}
