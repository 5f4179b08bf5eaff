//! Nonzero elements and the admittance stamp template.
//!
//! Elements live in an arena owned by the matrix and are addressed by
//! [`ElemId`]. An id stays valid for the life of the matrix: elements are
//! never moved or freed, so stamp code may cache ids across `clear`,
//! `initialize`, and refactorization. Slot 0 is reserved for the ground
//! sentinel returned by `get_element` when either index is 0; it is linked
//! into no chain, so writes to it are discarded.

use num_complex::Complex64;

/// Stable handle to one nonzero element of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElemId(pub(crate) u32);

impl ElemId {
    /// The ground/discard sentinel (arena slot 0).
    pub const GROUND: ElemId = ElemId(0);

    #[inline]
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }

    /// True if this is the ground sentinel.
    #[inline]
    pub fn is_ground(self) -> bool {
        self.0 == 0
    }
}

/// One nonzero entry, threaded through both a row chain and a column chain.
#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) real: f64,
    pub(crate) imag: f64,
    pub(crate) row: usize,
    pub(crate) col: usize,
    pub(crate) next_in_row: Option<ElemId>,
    pub(crate) next_in_col: Option<ElemId>,
    /// Baseline restored by `initialize`; zero is restored when absent.
    pub(crate) init_info: Option<(f64, f64)>,
}

impl Element {
    pub(crate) fn new(row: usize, col: usize) -> Self {
        Self {
            real: 0.0,
            imag: 0.0,
            row,
            col,
            next_in_row: None,
            next_in_col: None,
            init_info: None,
        }
    }

    #[inline]
    pub(crate) fn value(&self) -> Complex64 {
        Complex64::new(self.real, self.imag)
    }

    #[inline]
    pub(crate) fn set_value(&mut self, v: Complex64) {
        self.real = v.re;
        self.imag = v.im;
    }
}

/// The four matrix positions a two-terminal admittance stamps into:
/// (n1,n1), (n2,n2), (n2,n1), (n1,n2). The last two receive the negated
/// value. When n1 is ground, `element1` and `element2` are swapped so that
/// `element1` always refers to the non-ground diagonal.
#[derive(Debug, Clone, Copy)]
pub struct Admittance {
    pub element1: ElemId,
    pub element2: ElemId,
    pub element3_negated: ElemId,
    pub element4_negated: ElemId,
}

/// A link slot in a column chain: either a column header or the
/// `next_in_col` field of an element. Walking code carries one of these so a
/// later splice is O(1) without back-pointers.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ColLink {
    Head(usize),
    After(ElemId),
}

/// A link slot in a row chain; see [`ColLink`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum RowLink {
    Head(usize),
    After(ElemId),
}
