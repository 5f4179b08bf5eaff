//! Markowitz bookkeeping: per-row/column nonzero counts, clamped products,
//! and the singleton tally, maintained incrementally across elimination.

use crate::config::{LARGEST_LONG_INTEGER, LARGEST_SHORT_INTEGER};
use crate::element::ElemId;
use crate::matrix::Matrix;

/// Clamped product of two Markowitz counts. Once either operand exceeds the
/// short-integer range the product is formed in floating point and saturated
/// so later comparisons cannot wrap.
#[inline]
pub(crate) fn clamped_product(a: i64, b: i64) -> i64 {
    if (a > LARGEST_SHORT_INTEGER && b != 0) || (b > LARGEST_SHORT_INTEGER && a != 0) {
        let p = a as f64 * b as f64;
        if p >= LARGEST_LONG_INTEGER as f64 {
            LARGEST_LONG_INTEGER
        } else {
            p as i64
        }
    } else {
        a * b
    }
}

impl Matrix {
    /// Counts the remaining nonzeros in each row and column of the reduced
    /// sub-matrix at `step`, minus one. A nonzero residual right-hand-side
    /// entry also participates in the row count, so source rows are not
    /// mistaken for singletons.
    pub(crate) fn count_markowitz(&mut self, rhs: Option<&[f64]>, step: usize) {
        for i in step..=self.size {
            let mut count: i64 = -1;
            let mut p = self.first_in_row[i];
            while let Some(id) = p {
                let e = self.e(id);
                if e.col >= step {
                    break;
                }
                p = e.next_in_row;
            }
            while let Some(id) = p {
                count += 1;
                p = self.e(id).next_in_row;
            }

            if let Some(rhs) = rhs {
                let ext_row = self.int_to_ext_row[i];
                let nonzero = if self.cfg.separated_complex_vectors {
                    rhs.get(ext_row).copied().unwrap_or(0.0) != 0.0
                } else if self.complex {
                    rhs.get(2 * ext_row).copied().unwrap_or(0.0) != 0.0
                        || rhs.get(2 * ext_row + 1).copied().unwrap_or(0.0) != 0.0
                } else {
                    rhs.get(i).copied().unwrap_or(0.0) != 0.0
                };
                if nonzero {
                    count += 1;
                }
            }
            self.markowitz_row[i] = count;
        }

        for j in step..=self.size {
            let mut count: i64 = -1;
            let mut p = self.first_in_col[j];
            while let Some(id) = p {
                let e = self.e(id);
                if e.row >= step {
                    break;
                }
                p = e.next_in_col;
            }
            while let Some(id) = p {
                count += 1;
                p = self.e(id).next_in_col;
            }
            self.markowitz_col[j] = count;
        }
    }

    /// Forms the products for the active range and recounts the singletons.
    pub(crate) fn markowitz_products(&mut self, step: usize) {
        self.singletons = 0;
        for i in step..=self.size {
            self.markowitz_prod[i] = clamped_product(self.markowitz_row[i], self.markowitz_col[i]);
            if self.markowitz_prod[i] == 0 {
                self.singletons += 1;
            }
        }
    }

    /// Updates the counts after eliminating `pivot`: every row touched below
    /// the pivot and every column touched to its right loses one nonzero.
    /// Rows or columns whose count reaches zero become singletons.
    pub(crate) fn update_markowitz_numbers(&mut self, pivot: ElemId) {
        let mut p = self.e(pivot).next_in_col;
        while let Some(id) = p {
            let row = self.e(id).row;
            self.markowitz_row[row] -= 1;
            self.markowitz_prod[row] =
                clamped_product(self.markowitz_row[row], self.markowitz_col[row]);
            if self.markowitz_row[row] == 0 {
                self.singletons += 1;
            }
            p = self.e(id).next_in_col;
        }

        let mut p = self.e(pivot).next_in_row;
        while let Some(id) = p {
            let col = self.e(id).col;
            self.markowitz_col[col] -= 1;
            self.markowitz_prod[col] =
                clamped_product(self.markowitz_row[col], self.markowitz_col[col]);
            if self.markowitz_col[col] == 0 && self.markowitz_row[col] != 0 {
                self.singletons += 1;
            }
            p = self.e(id).next_in_row;
        }
    }
}
