//! Rank-1 update of the remaining sub-matrix for one elimination step.
//!
//! With the pivot at (step, step), every element u to the pivot's right is
//! scaled by the pivot reciprocal, and for every element l below the pivot
//! the entry at (l.row, u.col) receives `-u * l`, being created as a fill-in
//! when absent. The scan pointer through u's column never backtracks: the
//! rows of l increase strictly, so each column chain is walked exactly once
//! per step and insertion is O(1) through the carried link slot.

use crate::cmplx;
use crate::element::{ColLink, ElemId, RowLink};
use crate::error::Error;
use crate::matrix::Matrix;

impl Matrix {
    pub(crate) fn real_row_col_elimination(&mut self, pivot: ElemId) -> Result<(), Error> {
        if self.element_mag(pivot) == 0.0 {
            let row = self.e(pivot).row;
            let col = self.e(pivot).col;
            self.singular_row = row;
            self.singular_col = col;
            return Err(Error::Singular { row, col });
        }

        let recip = {
            let p = self.e_mut(pivot);
            p.real = 1.0 / p.real;
            p.real
        };

        let mut upper = self.e(pivot).next_in_row;
        while let Some(u) = upper {
            let u_real = {
                let e = self.e_mut(u);
                e.real *= recip;
                e.real
            };
            let u_col = self.e(u).col;

            let mut p_above = ColLink::After(u);
            let mut p_sub = self.e(u).next_in_col;
            let mut lower = self.e(pivot).next_in_col;
            while let Some(l) = lower {
                let row = self.e(l).row;
                while let Some(s) = p_sub {
                    if self.e(s).row >= row {
                        break;
                    }
                    p_above = ColLink::After(s);
                    p_sub = self.e(s).next_in_col;
                }

                let target = match p_sub {
                    Some(s) if self.e(s).row == row => s,
                    _ => self.create_element(row, u_col, RowLink::After(l), p_above, true),
                };

                let l_real = self.e(l).real;
                self.e_mut(target).real -= u_real * l_real;

                p_above = ColLink::After(target);
                p_sub = self.e(target).next_in_col;
                lower = self.e(l).next_in_col;
            }
            upper = self.e(u).next_in_row;
        }
        Ok(())
    }

    pub(crate) fn complex_row_col_elimination(&mut self, pivot: ElemId) -> Result<(), Error> {
        if self.element_mag(pivot) == 0.0 {
            let row = self.e(pivot).row;
            let col = self.e(pivot).col;
            self.singular_row = row;
            self.singular_col = col;
            return Err(Error::Singular { row, col });
        }

        let recip = cmplx::reciprocal(self.e(pivot).value());
        self.e_mut(pivot).set_value(recip);

        let mut upper = self.e(pivot).next_in_row;
        while let Some(u) = upper {
            let u_val = self.e(u).value() * recip;
            self.e_mut(u).set_value(u_val);
            let u_col = self.e(u).col;

            let mut p_above = ColLink::After(u);
            let mut p_sub = self.e(u).next_in_col;
            let mut lower = self.e(pivot).next_in_col;
            while let Some(l) = lower {
                let row = self.e(l).row;
                while let Some(s) = p_sub {
                    if self.e(s).row >= row {
                        break;
                    }
                    p_above = ColLink::After(s);
                    p_sub = self.e(s).next_in_col;
                }

                let target = match p_sub {
                    Some(s) if self.e(s).row == row => s,
                    _ => self.create_element(row, u_col, RowLink::After(l), p_above, true),
                };

                let l_val = self.e(l).value();
                let updated = self.e(target).value() - u_val * l_val;
                self.e_mut(target).set_value(updated);

                p_above = ColLink::After(target);
                p_sub = self.e(target).next_in_col;
                lower = self.e(l).next_in_col;
            }
            upper = self.e(u).next_in_row;
        }
        Ok(())
    }
}
