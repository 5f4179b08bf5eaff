//! Triangular solves against the in-place LU factors.
//!
//! The forward sweep runs down the columns of L (skipping zero components of
//! the gathered right-hand side, which circuit sources leave mostly zero),
//! the backward sweep runs up the rows of U. The diagonal holds reciprocal
//! pivots, so both sweeps multiply and never divide. Row and column index
//! maps apply the permutations on the way in and out.
//!
//! Complex right-hand sides come in the layout selected at configuration
//! time: separate (re, im) arrays, or one interleaved array with the pair
//! (re, im) of external index e at (2e, 2e + 1).

use num_complex::Complex64;

use crate::error::Error;
use crate::matrix::Matrix;

impl Matrix {
    /// Highest external index a right-hand-side or solution vector must
    /// accommodate.
    pub(crate) fn vector_top(&self) -> usize {
        if self.cfg.translate {
            self.ext_size.max(self.size)
        } else {
            self.size
        }
    }

    #[inline]
    fn interm(&self, i: usize) -> Complex64 {
        Complex64::new(self.intermediate[2 * i], self.intermediate[2 * i + 1])
    }

    #[inline]
    fn set_interm(&mut self, i: usize, v: Complex64) {
        self.intermediate[2 * i] = v.re;
        self.intermediate[2 * i + 1] = v.im;
    }

    /// Solves `A x = b` for a real matrix. `rhs` is indexed 1-based by
    /// external row; the returned solution is indexed by external column.
    pub fn solve(&mut self, rhs: &[f64]) -> Result<Vec<f64>, Error> {
        if !self.factored {
            return Err(Error::NotFactored);
        }
        if self.complex {
            return Err(Error::ComplexMismatch);
        }
        let top = self.vector_top();
        if rhs.len() < top + 1 {
            return Err(Error::SizeMismatch { expected: top + 1, got: rhs.len() });
        }
        self.create_internal_vectors();
        let size = self.size;

        for i in (1..=size).rev() {
            self.intermediate[i] = rhs[self.int_to_ext_row[i]];
        }

        // Forward elimination: L c = b.
        for i in 1..=size {
            let mut t = self.intermediate[i];
            if t != 0.0 {
                let pivot = match self.diag[i] {
                    Some(d) => d,
                    None => return Err(Error::ZeroPivot { step: i }),
                };
                t *= self.e(pivot).real;
                self.intermediate[i] = t;

                let mut p = self.e(pivot).next_in_col;
                while let Some(id) = p {
                    let (row, val, next) = {
                        let e = self.e(id);
                        (e.row, e.real, e.next_in_col)
                    };
                    self.intermediate[row] -= t * val;
                    p = next;
                }
            }
        }

        // Backward substitution: U x = c.
        for i in (1..=size).rev() {
            let mut t = self.intermediate[i];
            let pivot = match self.diag[i] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step: i }),
            };
            let mut p = self.e(pivot).next_in_row;
            while let Some(id) = p {
                let e = self.e(id);
                t -= e.real * self.intermediate[e.col];
                p = e.next_in_row;
            }
            self.intermediate[i] = t;
        }

        let mut solution = vec![0.0; top + 1];
        for i in (1..=size).rev() {
            solution[self.int_to_ext_col[i]] = self.intermediate[i];
        }
        Ok(solution)
    }

    /// Solves `Aᵀ x = b` for a real matrix. The roles of the index maps and
    /// of the row/column chains swap relative to [`Self::solve`], with the
    /// reciprocal pivot applied in the backward sweep.
    pub fn solve_transposed(&mut self, rhs: &[f64]) -> Result<Vec<f64>, Error> {
        if !self.factored {
            return Err(Error::NotFactored);
        }
        if self.complex {
            return Err(Error::ComplexMismatch);
        }
        let top = self.vector_top();
        if rhs.len() < top + 1 {
            return Err(Error::SizeMismatch { expected: top + 1, got: rhs.len() });
        }
        self.create_internal_vectors();
        let size = self.size;

        for i in (1..=size).rev() {
            self.intermediate[i] = rhs[self.int_to_ext_col[i]];
        }

        // Forward elimination across the rows of U (Uᵀ is lower triangular).
        for i in 1..=size {
            let t = self.intermediate[i];
            if t != 0.0 {
                let pivot = match self.diag[i] {
                    Some(d) => d,
                    None => return Err(Error::ZeroPivot { step: i }),
                };
                let mut p = self.e(pivot).next_in_row;
                while let Some(id) = p {
                    let (col, val, next) = {
                        let e = self.e(id);
                        (e.col, e.real, e.next_in_row)
                    };
                    self.intermediate[col] -= t * val;
                    p = next;
                }
            }
        }

        // Backward substitution down the columns of L (Lᵀ is upper
        // triangular), with the pivot multiply.
        for i in (1..=size).rev() {
            let pivot = match self.diag[i] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step: i }),
            };
            let mut t = self.intermediate[i];
            let mut p = self.e(pivot).next_in_col;
            while let Some(id) = p {
                let e = self.e(id);
                t -= e.real * self.intermediate[e.row];
                p = e.next_in_col;
            }
            self.intermediate[i] = t * self.e(pivot).real;
        }

        let mut solution = vec![0.0; top + 1];
        for i in (1..=size).rev() {
            solution[self.int_to_ext_row[i]] = self.intermediate[i];
        }
        Ok(solution)
    }

    /// Solves `A x = b` for a complex matrix.
    ///
    /// With separated vectors, `rhs`/`irhs` hold the real and imaginary
    /// parts and the result is `(x_re, x_im)`. Interleaved, `rhs` holds
    /// (re, im) pairs at (2e, 2e + 1), `irhs` is ignored, and the result is
    /// `(x_interleaved, empty)`.
    pub fn solve_complex(&mut self, rhs: &[f64], irhs: &[f64]) -> Result<(Vec<f64>, Vec<f64>), Error> {
        if !self.factored {
            return Err(Error::NotFactored);
        }
        if !self.complex {
            return Err(Error::ComplexMismatch);
        }
        let top = self.vector_top();
        let separated = self.cfg.separated_complex_vectors;
        self.check_complex_rhs(rhs, irhs, top)?;
        self.create_internal_vectors();
        let size = self.size;

        for i in 1..=size {
            let ext = self.int_to_ext_row[i];
            let v = if separated {
                Complex64::new(rhs[ext], irhs[ext])
            } else {
                Complex64::new(rhs[2 * ext], rhs[2 * ext + 1])
            };
            self.set_interm(i, v);
        }

        // Forward elimination.
        for i in 1..=size {
            let mut t = self.interm(i);
            if t.re != 0.0 || t.im != 0.0 {
                let pivot = match self.diag[i] {
                    Some(d) => d,
                    None => return Err(Error::ZeroPivot { step: i }),
                };
                t *= self.e(pivot).value();
                self.set_interm(i, t);

                let mut p = self.e(pivot).next_in_col;
                while let Some(id) = p {
                    let (row, val, next) = {
                        let e = self.e(id);
                        (e.row, e.value(), e.next_in_col)
                    };
                    let updated = self.interm(row) - t * val;
                    self.set_interm(row, updated);
                    p = next;
                }
            }
        }

        // Backward substitution.
        for i in (1..=size).rev() {
            let mut t = self.interm(i);
            let pivot = match self.diag[i] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step: i }),
            };
            let mut p = self.e(pivot).next_in_row;
            while let Some(id) = p {
                let (col, val, next) = {
                    let e = self.e(id);
                    (e.col, e.value(), e.next_in_row)
                };
                t -= val * self.interm(col);
                p = next;
            }
            self.set_interm(i, t);
        }

        Ok(self.scatter_complex_solution(top, false))
    }

    /// Solves `Aᵀ x = b` for a complex matrix; layouts as in
    /// [`Self::solve_complex`].
    pub fn solve_complex_transposed(
        &mut self,
        rhs: &[f64],
        irhs: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>), Error> {
        if !self.factored {
            return Err(Error::NotFactored);
        }
        if !self.complex {
            return Err(Error::ComplexMismatch);
        }
        let top = self.vector_top();
        let separated = self.cfg.separated_complex_vectors;
        self.check_complex_rhs(rhs, irhs, top)?;
        self.create_internal_vectors();
        let size = self.size;

        for i in 1..=size {
            let ext = self.int_to_ext_col[i];
            let v = if separated {
                Complex64::new(rhs[ext], irhs[ext])
            } else {
                Complex64::new(rhs[2 * ext], rhs[2 * ext + 1])
            };
            self.set_interm(i, v);
        }

        // Forward elimination across rows.
        for i in 1..=size {
            let t = self.interm(i);
            if t.re != 0.0 || t.im != 0.0 {
                let pivot = match self.diag[i] {
                    Some(d) => d,
                    None => return Err(Error::ZeroPivot { step: i }),
                };
                let mut p = self.e(pivot).next_in_row;
                while let Some(id) = p {
                    let (col, val, next) = {
                        let e = self.e(id);
                        (e.col, e.value(), e.next_in_row)
                    };
                    let updated = self.interm(col) - t * val;
                    self.set_interm(col, updated);
                    p = next;
                }
            }
        }

        // Backward substitution down columns, pivot applied last.
        for i in (1..=size).rev() {
            let pivot = match self.diag[i] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step: i }),
            };
            let mut t = self.interm(i);
            let mut p = self.e(pivot).next_in_col;
            while let Some(id) = p {
                let (row, val, next) = {
                    let e = self.e(id);
                    (e.row, e.value(), e.next_in_col)
                };
                t -= val * self.interm(row);
                p = next;
            }
            t *= self.e(pivot).value();
            self.set_interm(i, t);
        }

        Ok(self.scatter_complex_solution(top, true))
    }

    fn check_complex_rhs(&self, rhs: &[f64], irhs: &[f64], top: usize) -> Result<(), Error> {
        if self.cfg.separated_complex_vectors {
            if rhs.len() < top + 1 {
                return Err(Error::SizeMismatch { expected: top + 1, got: rhs.len() });
            }
            if irhs.len() < top + 1 {
                return Err(Error::SizeMismatch { expected: top + 1, got: irhs.len() });
            }
        } else if rhs.len() < 2 * (top + 1) {
            return Err(Error::SizeMismatch { expected: 2 * (top + 1), got: rhs.len() });
        }
        Ok(())
    }

    /// Unscrambles the intermediate vector into the configured output
    /// layout. `transposed` selects the row map instead of the column map.
    fn scatter_complex_solution(&self, top: usize, transposed: bool) -> (Vec<f64>, Vec<f64>) {
        let size = self.size;
        if self.cfg.separated_complex_vectors {
            let mut re = vec![0.0; top + 1];
            let mut im = vec![0.0; top + 1];
            for i in (1..=size).rev() {
                let ext = if transposed {
                    self.int_to_ext_row[i]
                } else {
                    self.int_to_ext_col[i]
                };
                let v = self.interm(i);
                re[ext] = v.re;
                im[ext] = v.im;
            }
            (re, im)
        } else {
            let mut out = vec![0.0; 2 * (top + 1)];
            for i in (1..=size).rev() {
                let ext = if transposed {
                    self.int_to_ext_row[i]
                } else {
                    self.int_to_ext_col[i]
                };
                let v = self.interm(i);
                out[2 * ext] = v.re;
                out[2 * ext + 1] = v.im;
            }
            (out, Vec::new())
        }
    }
}
