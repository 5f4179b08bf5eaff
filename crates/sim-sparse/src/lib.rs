//! Sparse direct solver for circuit simulation matrices.
//!
//! This crate implements an LU factorization engine specialized for the
//! matrices produced by modified nodal analysis: very sparse, nearly
//! structurally symmetric, with values spread over many orders of magnitude
//! and the occasional structural zero on the diagonal. Given a square
//! matrix accumulated incrementally through stamps, it computes
//! `P·A·Q = L·U` with Markowitz-ordered threshold pivoting and solves
//! `A·x = b` (or `Aᵀ·x = b`) for real or complex systems.
//!
//! # Workflow
//!
//! 1. Create a [`Matrix`] with a [`Config`].
//! 2. Stamp values through [`Matrix::get_element`] /
//!    [`Matrix::get_admittance`] and the returned stable [`ElemId`]s.
//! 3. Call [`Matrix::order_and_factor`] the first time (and whenever the
//!    structure changes), or [`Matrix::factor`] to refactor new values over
//!    the committed pattern.
//! 4. Call [`Matrix::solve`] and friends for each right-hand side.
//! 5. Query diagnostics ([`Matrix::determinant`], [`Matrix::condition`],
//!    [`Matrix::roundoff`], ...) as needed.
//!
//! # Example
//!
//! ```
//! use sim_sparse::{Config, Matrix};
//!
//! // A 1 kΩ / 2 kΩ voltage divider driven by a 5 V source:
//! // node equations for nodes 1 and 2 plus the source branch row.
//! let mut m = Matrix::new(3, Config::real_only()).unwrap();
//! for (row, col, val) in [
//!     (1, 1, 1e-3),
//!     (1, 2, -1e-3),
//!     (2, 1, -1e-3),
//!     (2, 2, 2e-3),
//!     (3, 1, 1.0),
//!     (1, 3, 1.0),
//! ] {
//!     let id = m.get_element(row, col).unwrap();
//!     m.add_real(id, val);
//! }
//! m.mna_preorder();
//!
//! let b = [0.0, 0.0, 0.0, 5.0];
//! m.order_and_factor(Some(&b), 1e-3, 0.0, true).unwrap();
//! let x = m.solve(&b).unwrap();
//!
//! assert!((x[1] - 5.0).abs() < 1e-9);
//! assert!((x[2] - 2.5).abs() < 1e-9);
//! ```
//!
//! # Design notes
//!
//! Elements live in an arena and are threaded through two singly linked
//! orderings (by row within each column, by column within each row), so the
//! factorization can create fill-ins in sorted position in O(1) once a scan
//! pointer is in place. Handles ([`ElemId`]) stay valid for the life of the
//! matrix, which lets device models cache their stamp locations across
//! `clear` / `initialize` / `factor` cycles. The engine is single-threaded;
//! distinct matrices are independent.

mod cmplx;
mod config;
mod diagnostics;
mod element;
mod eliminate;
mod error;
mod exchange;
mod factor;
mod markowitz;
mod matrix;
mod mna;
mod pivot;
mod solve;

pub use config::{Annotate, Config, PartitionMode};
pub use config::{LARGEST_LONG_INTEGER, LARGEST_SHORT_INTEGER, MACHINE_RESOLUTION, SLACK};
pub use element::{Admittance, ElemId};
pub use error::Error;
pub use matrix::Matrix;
pub use pivot::PivotStrategy;
