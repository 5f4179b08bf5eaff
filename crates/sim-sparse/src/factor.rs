//! Factorization paths: the ordering factorization and the pre-ordered
//! refactorization with direct/indirect address-mode partitioning.
//!
//! `order_and_factor` interleaves Markowitz pivot selection with numeric
//! elimination and is the path whenever the structure changed. `factor`
//! reuses the committed ordering: it runs a left-looking update per column,
//! either gathering into a dense scratch (direct mode) or chasing element
//! links (indirect mode), as decided by `partition`.

use num_complex::Complex64;

use crate::cmplx;
use crate::config::{Annotate, PartitionMode};
use crate::element::ElemId;
use crate::error::Error;
use crate::matrix::Matrix;

impl Matrix {
    /// Factors the matrix, choosing the pivot order as it goes.
    ///
    /// When the ordering is still valid, a fast pass first retries the
    /// existing diagonal pivots, falling back to the full Markowitz search
    /// from the first step whose diagonal fails the threshold test.
    ///
    /// `rhs` lets nonzero source rows participate in the Markowitz counts.
    /// Thresholds outside their valid ranges keep the previous values.
    pub fn order_and_factor(
        &mut self,
        rhs: Option<&[f64]>,
        rel_threshold: f64,
        abs_threshold: f64,
        diag_pivoting: bool,
    ) -> Result<(), Error> {
        if rel_threshold > 0.0 && rel_threshold <= 1.0 {
            self.rel_threshold = rel_threshold;
        }
        if abs_threshold >= 0.0 {
            self.abs_threshold = abs_threshold;
        }

        self.factored = false;
        let size = self.size;
        let mut step = 1;

        if !self.needs_ordering {
            // Fast path: keep the committed pivot order while every diagonal
            // still dominates its column.
            while step <= size {
                let pivot = match self.diag[step] {
                    Some(p) => p,
                    None => {
                        self.needs_ordering = true;
                        break;
                    }
                };
                let largest_in_col = self.find_biggest_in_col(self.e(pivot).next_in_col);
                if largest_in_col * self.rel_threshold < self.element_mag(pivot) {
                    if self.complex {
                        self.complex_row_col_elimination(pivot)?;
                    } else {
                        self.real_row_col_elimination(pivot)?;
                    }
                } else {
                    self.needs_ordering = true;
                    break;
                }
                step += 1;
            }

            if !self.needs_ordering {
                self.factored = true;
                return Ok(());
            }
        } else {
            step = 1;
            if !self.rows_linked {
                self.link_rows();
            }
        }

        self.count_markowitz(rhs, step);
        self.markowitz_products(step);
        self.max_row_count_in_lower_tri = -1;

        while step <= size {
            let pivot = match self.search_for_pivot(step, diag_pivoting) {
                Some(p) => p,
                None => {
                    self.singular_row = step;
                    self.singular_col = step;
                    return Err(Error::Singular { row: step, col: step });
                }
            };

            self.exchange_rows_and_cols(pivot, step);

            if self.complex {
                self.complex_row_col_elimination(pivot)?;
            } else {
                self.real_row_col_elimination(pivot)?;
            }

            self.update_markowitz_numbers(pivot);

            if self.cfg.annotate >= Annotate::OnStrangeBehavior {
                log::debug!(
                    "step {}: pivot from ({}, {}) via '{}', {} singletons left",
                    step,
                    self.pivots_original_row,
                    self.pivots_original_col,
                    self.pivot_selection.map(|s| s.tag()).unwrap_or('?'),
                    self.singletons,
                );
            }
            step += 1;
        }

        self.needs_ordering = false;
        self.reordered = true;
        self.factored = true;
        Ok(())
    }

    /// Refactors the matrix with the committed ordering and partition.
    /// Falls back to [`Self::order_and_factor`] when the structure changed
    /// since the last ordering.
    pub fn factor(&mut self) -> Result<(), Error> {
        if self.needs_ordering {
            return self.order_and_factor(None, 0.0, 0.0, true);
        }
        if !self.partitioned {
            self.partition(PartitionMode::Default)?;
        }

        self.factored = false;
        if self.complex {
            return self.factor_complex();
        }

        let first = match self.diag[1] {
            Some(d) if self.e(d).real != 0.0 => d,
            _ => {
                self.singular_row = 1;
                self.singular_col = 1;
                return Err(Error::ZeroPivot { step: 1 });
            }
        };
        {
            let e = self.e_mut(first);
            e.real = 1.0 / e.real;
        }

        let mut dest: Vec<Option<ElemId>> = vec![None; self.size + 1];
        for step in 2..=self.size {
            if self.do_real_direct[step] {
                self.factor_real_direct(step)?;
            } else {
                self.factor_real_indirect(step, &mut dest)?;
            }
        }

        self.factored = true;
        Ok(())
    }

    /// One direct-mode step: gather the column into the dense scratch,
    /// eliminate against the earlier diagonals, scatter back.
    fn factor_real_direct(&mut self, step: usize) -> Result<(), Error> {
        let mut p = self.first_in_col[step];
        while let Some(id) = p {
            let (row, val, next) = {
                let e = self.e(id);
                (e.row, e.real, e.next_in_col)
            };
            self.intermediate[row] = val;
            p = next;
        }

        let mut pc = self.first_in_col[step];
        while let Some(c) = pc {
            let c_row = self.e(c).row;
            if c_row >= step {
                break;
            }
            let d = match self.diag[c_row] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step }),
            };
            let c_val = self.intermediate[c_row] * self.e(d).real;
            self.e_mut(c).real = c_val;

            let mut p = self.e(d).next_in_col;
            while let Some(id) = p {
                let (row, val, next) = {
                    let e = self.e(id);
                    (e.row, e.real, e.next_in_col)
                };
                self.intermediate[row] -= c_val * val;
                p = next;
            }
            pc = self.e(c).next_in_col;
        }

        let diag = match self.diag[step] {
            Some(d) => d,
            None => return Err(Error::ZeroPivot { step }),
        };
        let mut p = self.e(diag).next_in_col;
        while let Some(id) = p {
            let row = self.e(id).row;
            self.e_mut(id).real = self.intermediate[row];
            p = self.e(id).next_in_col;
        }

        if self.intermediate[step] == 0.0 {
            self.singular_row = step;
            self.singular_col = step;
            return Err(Error::ZeroPivot { step });
        }
        self.e_mut(diag).real = 1.0 / self.intermediate[step];
        Ok(())
    }

    /// One indirect-mode step: the same update through the element links,
    /// using a row-to-element map for the current column.
    fn factor_real_indirect(
        &mut self,
        step: usize,
        dest: &mut [Option<ElemId>],
    ) -> Result<(), Error> {
        let mut p = self.first_in_col[step];
        while let Some(id) = p {
            let e = self.e(id);
            dest[e.row] = Some(id);
            p = e.next_in_col;
        }

        let mut pc = self.first_in_col[step];
        while let Some(c) = pc {
            let c_row = self.e(c).row;
            if c_row >= step {
                break;
            }
            let d = match self.diag[c_row] {
                Some(d) => d,
                None => {
                    pc = self.e(c).next_in_col;
                    continue;
                }
            };
            let c_val = self.e(c).real * self.e(d).real;
            self.e_mut(c).real = c_val;

            let mut p = self.e(d).next_in_col;
            while let Some(id) = p {
                let (row, val, next) = {
                    let e = self.e(id);
                    (e.row, e.real, e.next_in_col)
                };
                if let Some(target) = dest[row] {
                    self.e_mut(target).real -= c_val * val;
                }
                p = next;
            }
            pc = self.e(c).next_in_col;
        }

        let diag = match self.diag[step] {
            Some(d) if self.e(d).real != 0.0 => d,
            _ => {
                self.singular_row = step;
                self.singular_col = step;
                return Err(Error::ZeroPivot { step });
            }
        };
        let e = self.e_mut(diag);
        e.real = 1.0 / e.real;
        Ok(())
    }

    /// Complex refactorization; same structure as the real path with complex
    /// products and the scaled reciprocal.
    fn factor_complex(&mut self) -> Result<(), Error> {
        let first = match self.diag[1] {
            Some(d) if cmplx::one_norm(self.e(d).value()) != 0.0 => d,
            _ => {
                self.singular_row = 1;
                self.singular_col = 1;
                return Err(Error::ZeroPivot { step: 1 });
            }
        };
        let recip = cmplx::reciprocal(self.e(first).value());
        self.e_mut(first).set_value(recip);

        let mut scratch: Vec<Complex64> = vec![Complex64::new(0.0, 0.0); self.size + 1];
        let mut dest: Vec<Option<ElemId>> = vec![None; self.size + 1];

        for step in 2..=self.size {
            if self.do_complex_direct[step] {
                self.factor_complex_direct(step, &mut scratch)?;
            } else {
                self.factor_complex_indirect(step, &mut dest)?;
            }
        }

        self.factored = true;
        Ok(())
    }

    fn factor_complex_direct(&mut self, step: usize, scratch: &mut [Complex64]) -> Result<(), Error> {
        let mut p = self.first_in_col[step];
        while let Some(id) = p {
            let e = self.e(id);
            scratch[e.row] = e.value();
            p = e.next_in_col;
        }

        let mut pc = self.first_in_col[step];
        while let Some(c) = pc {
            let c_row = self.e(c).row;
            if c_row >= step {
                break;
            }
            let d = match self.diag[c_row] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step }),
            };
            let c_val = scratch[c_row] * self.e(d).value();
            scratch[c_row] = c_val;
            self.e_mut(c).set_value(c_val);

            let mut p = self.e(d).next_in_col;
            while let Some(id) = p {
                let (row, val, next) = {
                    let e = self.e(id);
                    (e.row, e.value(), e.next_in_col)
                };
                scratch[row] -= c_val * val;
                p = next;
            }
            pc = self.e(c).next_in_col;
        }

        let diag = match self.diag[step] {
            Some(d) => d,
            None => return Err(Error::ZeroPivot { step }),
        };
        let mut p = self.e(diag).next_in_col;
        while let Some(id) = p {
            let row = self.e(id).row;
            let v = scratch[row];
            self.e_mut(id).set_value(v);
            p = self.e(id).next_in_col;
        }

        if cmplx::one_norm(scratch[step]) == 0.0 {
            self.singular_row = step;
            self.singular_col = step;
            return Err(Error::ZeroPivot { step });
        }
        let recip = cmplx::reciprocal(scratch[step]);
        self.e_mut(diag).set_value(recip);
        Ok(())
    }

    fn factor_complex_indirect(
        &mut self,
        step: usize,
        dest: &mut [Option<ElemId>],
    ) -> Result<(), Error> {
        let mut p = self.first_in_col[step];
        while let Some(id) = p {
            let e = self.e(id);
            dest[e.row] = Some(id);
            p = e.next_in_col;
        }

        let mut pc = self.first_in_col[step];
        while let Some(c) = pc {
            let c_row = self.e(c).row;
            if c_row >= step {
                break;
            }
            let d = match self.diag[c_row] {
                Some(d) => d,
                None => {
                    pc = self.e(c).next_in_col;
                    continue;
                }
            };
            let c_val = self.e(c).value() * self.e(d).value();
            self.e_mut(c).set_value(c_val);

            let mut p = self.e(d).next_in_col;
            while let Some(id) = p {
                let (row, val, next) = {
                    let e = self.e(id);
                    (e.row, e.value(), e.next_in_col)
                };
                if let Some(target) = dest[row] {
                    let updated = self.e(target).value() - c_val * val;
                    self.e_mut(target).set_value(updated);
                }
                p = next;
            }
            pc = self.e(c).next_in_col;
        }

        let diag = match self.diag[step] {
            Some(d) if cmplx::one_norm(self.e(d).value()) != 0.0 => d,
            _ => {
                self.singular_row = step;
                self.singular_col = step;
                return Err(Error::ZeroPivot { step });
            }
        };
        let recip = cmplx::reciprocal(self.e(diag).value());
        self.e_mut(diag).set_value(recip);
        Ok(())
    }

    /// Assigns the per-step address mode used by [`Self::factor`].
    ///
    /// `Auto` estimates, for each step, the number of column entries (nc),
    /// upper neighbors (nm), and off-diagonal contributions (no), and picks
    /// direct mode when the dense gather amortizes:
    /// `nm + no > 3·nc − 2·nm` for real steps, `nm + no > 7·nc − 4·nm` for
    /// complex ones. The Markowitz arrays serve as scratch; they carry no
    /// live data once the ordering is committed.
    pub fn partition(&mut self, mode: PartitionMode) -> Result<(), Error> {
        if self.partitioned {
            return Ok(());
        }
        let size = self.size;
        self.partitioned = true;

        let mode = if mode == PartitionMode::Default {
            self.cfg.default_partition
        } else {
            mode
        };

        match mode {
            PartitionMode::Direct => {
                for step in 1..=size {
                    if self.cfg.real {
                        self.do_real_direct[step] = true;
                    }
                    if self.cfg.complex {
                        self.do_complex_direct[step] = true;
                    }
                }
                return Ok(());
            }
            PartitionMode::Indirect => {
                for step in 1..=size {
                    if self.cfg.real {
                        self.do_real_direct[step] = false;
                    }
                    if self.cfg.complex {
                        self.do_complex_direct[step] = false;
                    }
                }
                return Ok(());
            }
            PartitionMode::Default | PartitionMode::Auto => {}
        }

        for step in 1..=size {
            let mut nc: i64 = 0;
            let mut no: i64 = 0;
            let mut nm: i64 = 0;

            let mut p = self.first_in_col[step];
            while let Some(id) = p {
                nc += 1;
                p = self.e(id).next_in_col;
            }

            let mut pc = self.first_in_col[step];
            while let Some(c) = pc {
                if self.e(c).row >= step {
                    break;
                }
                nm += 1;
                if let Some(d) = self.diag[self.e(c).row] {
                    let mut p = self.e(d).next_in_col;
                    while let Some(id) = p {
                        no += 1;
                        p = self.e(id).next_in_col;
                    }
                }
                pc = self.e(c).next_in_col;
            }

            self.markowitz_row[step] = nc;
            self.markowitz_col[step] = no;
            self.markowitz_prod[step] = nm;
        }

        for step in 1..=size {
            let nc = self.markowitz_row[step];
            let no = self.markowitz_col[step];
            let nm = self.markowitz_prod[step];
            if self.cfg.real {
                self.do_real_direct[step] = nm + no > 3 * nc - 2 * nm;
            }
            if self.cfg.complex {
                self.do_complex_direct[step] = nm + no > 7 * nc - 4 * nm;
            }
        }

        if self.cfg.annotate == Annotate::Full {
            let ops: i64 = (1..=size).map(|s| self.markowitz_col[s]).sum();
            self.operation_count = ops as usize;
            log::debug!(
                "partition: {} inner-loop operations across {} steps",
                ops,
                size
            );
        }

        Ok(())
    }
}
