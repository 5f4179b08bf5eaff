//! Pre-ordering pass for modified-nodal-analysis matrices.
//!
//! MNA formulations put structural zeros on the diagonal wherever a branch
//! equation meets its own current variable, and those zeros would be fatal to
//! diagonal pivoting on the very first step. The pass below repairs them
//! before factorization by hunting for "twins": a ±1 at (i, j) whose mirror
//! (j, i) is also ±1. Swapping columns i and j then lands a ±1 on the empty
//! diagonal without disturbing the values.
//!
//! Columns with exactly one twin candidate are swapped immediately; columns
//! with several are deferred so the unambiguous swaps can shrink their
//! choices first, and only then is a first-seen choice forced.

use crate::element::ElemId;
use crate::matrix::Matrix;

impl Matrix {
    /// Exchanges columns to remove structural zeros from the diagonal.
    ///
    /// Meaningful for matrices built by modified nodal analysis. Must run
    /// before the first factorization; once row links exist the ordering is
    /// already committed and the pass does nothing.
    pub fn mna_preorder(&mut self) {
        if self.rows_linked {
            return;
        }
        self.reordered = true;
        let size = self.size;
        let mut start_at = 1;

        loop {
            let mut another_pass_needed = false;
            let mut swapped = false;

            for j in start_at..=size {
                if self.diag[j].is_none() {
                    let (twins, pair) = self.count_twins(j);
                    if twins == 1 {
                        if let Some((twin1, twin2)) = pair {
                            self.swap_twin_cols(twin1, twin2);
                            swapped = true;
                        }
                    } else if twins > 1 && !another_pass_needed {
                        another_pass_needed = true;
                        start_at = j;
                    }
                }
            }

            if another_pass_needed && !swapped {
                // Every remaining empty diagonal is ambiguous; force the
                // first-seen pairing and rescan.
                for j in start_at..=size {
                    if self.diag[j].is_none() {
                        let (_, pair) = self.count_twins(j);
                        if let Some((twin1, twin2)) = pair {
                            self.swap_twin_cols(twin1, twin2);
                            break;
                        }
                    }
                }
            }

            if !another_pass_needed {
                break;
            }
        }
    }

    /// Counts twin candidates for an empty diagonal at `col`: elements of
    /// magnitude one in the column whose mirror element is also magnitude
    /// one. Stops counting at two, since only a unique candidate is acted on
    /// immediately. Returns the first pair found as (in-column, mirror).
    fn count_twins(&self, col: usize) -> (usize, Option<(ElemId, ElemId)>) {
        let mut twins = 0;
        let mut pair = None;

        let mut p1 = self.first_in_col[col];
        while let Some(t1) = p1 {
            if self.element_mag(t1) == 1.0 {
                let row = self.e(t1).row;
                let mut p2 = self.first_in_col[row];
                while let Some(t2) = p2 {
                    if self.e(t2).row == col {
                        break;
                    }
                    p2 = self.e(t2).next_in_col;
                }
                if let Some(t2) = p2 {
                    if self.element_mag(t2) == 1.0 {
                        twins += 1;
                        if twins >= 2 {
                            return (twins, pair);
                        }
                        pair = Some((t1, t2));
                    }
                }
            }
            p1 = self.e(t1).next_in_col;
        }

        (twins, pair)
    }

    /// Swaps the columns holding a twin pair so both land on the diagonal.
    /// Only the column heads and maps move; element column indices are
    /// refreshed later by `link_rows`.
    fn swap_twin_cols(&mut self, twin1: ElemId, twin2: ElemId) {
        // twin1 sits in the empty-diagonal column, twin2 in its row's column.
        let col1 = self.e(twin2).row;
        let col2 = self.e(twin1).row;

        self.first_in_col.swap(col1, col2);
        self.int_to_ext_col.swap(col1, col2);
        if self.cfg.translate {
            self.ext_to_int_col[self.int_to_ext_col[col2]] = Some(col2);
            self.ext_to_int_col[self.int_to_ext_col[col1]] = Some(col1);
        }

        self.diag[col1] = Some(twin2);
        self.diag[col2] = Some(twin1);
        self.interchanges_odd = !self.interchanges_odd;
    }
}
