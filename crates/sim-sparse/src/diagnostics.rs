//! Numerical diagnostics derived from the stamped values or the factors:
//! determinant, infinity norm, a Hager/O'Leary reciprocal condition
//! estimate, the extremal-pivot pseudo-condition, the largest-element and
//! Barlow/Reid roundoff bounds, matrix-vector products against the stamped
//! values, and the normalized residual built on them.

use num_complex::Complex64;

use crate::cmplx;
use crate::config::{MACHINE_RESOLUTION, SLACK};
use crate::error::Error;
use crate::matrix::Matrix;

impl Matrix {
    // ------------------------------------------------------------------
    // Determinant
    // ------------------------------------------------------------------

    /// Determinant of the factored matrix as `mantissa * 10^exponent`, the
    /// mantissa scaled into [1, 10). For complex matrices the imaginary
    /// mantissa is returned as well and the scaling applies to the larger
    /// component. Returns zeros when unfactored or singular.
    pub fn determinant(&self) -> (f64, i32, Option<f64>) {
        let zero_imag = if self.complex { Some(0.0) } else { None };
        if !self.factored || self.singular_row > 0 || self.singular_col > 0 {
            return (0.0, 0, zero_imag);
        }

        let mut exponent = 0i32;
        if self.complex {
            let mut det = Complex64::new(1.0, 0.0);
            for i in 1..=self.size {
                let pivot = match self.diag[i] {
                    Some(d) => self.e(d).value(),
                    None => return (0.0, 0, zero_imag),
                };
                // The diagonal stores the reciprocal pivot.
                det /= pivot;

                let mut scale = cmplx::inf_norm(det);
                if scale != 0.0 {
                    while scale >= 1.0e12 {
                        det *= 1.0e-12;
                        exponent += 12;
                        scale = cmplx::inf_norm(det);
                    }
                    while scale < 1.0e-12 {
                        det *= 1.0e12;
                        exponent -= 12;
                        scale = cmplx::inf_norm(det);
                    }
                }
            }

            let mut scale = cmplx::inf_norm(det);
            if scale != 0.0 {
                while scale >= 10.0 {
                    det *= 0.1;
                    exponent += 1;
                    scale = cmplx::inf_norm(det);
                }
                while scale < 1.0 {
                    det *= 10.0;
                    exponent -= 1;
                    scale = cmplx::inf_norm(det);
                }
            }
            if self.interchanges_odd {
                det = -det;
            }
            (det.re, exponent, Some(det.im))
        } else {
            let mut det = 1.0f64;
            for i in 1..=self.size {
                let pivot = match self.diag[i] {
                    Some(d) => self.e(d).real,
                    None => return (0.0, 0, None),
                };
                det /= pivot;

                if det != 0.0 {
                    while det.abs() >= 1.0e12 {
                        det *= 1.0e-12;
                        exponent += 12;
                    }
                    while det.abs() < 1.0e-12 {
                        det *= 1.0e12;
                        exponent -= 12;
                    }
                }
            }

            if det != 0.0 {
                while det.abs() >= 10.0 {
                    det *= 0.1;
                    exponent += 1;
                }
                while det.abs() < 1.0 {
                    det *= 10.0;
                    exponent -= 1;
                }
            }
            if self.interchanges_odd {
                det = -det;
            }
            (det, exponent, None)
        }
    }

    // ------------------------------------------------------------------
    // Norms and element bounds
    // ------------------------------------------------------------------

    /// Infinity norm of the stamped matrix: the largest row sum of element
    /// 1-norms. Only meaningful before factoring, since the factors
    /// overwrite the values in place.
    pub fn norm(&mut self) -> Result<f64, Error> {
        if self.factored {
            return Err(Error::AlreadyFactored);
        }
        if !self.rows_linked {
            self.link_rows();
        }

        let mut max = 0.0f64;
        for i in (1..=self.size).rev() {
            let mut row_sum = 0.0;
            let mut p = self.first_in_row[i];
            while let Some(id) = p {
                let e = self.e(id);
                row_sum += if self.complex {
                    cmplx::one_norm(e.value())
                } else {
                    e.real.abs()
                };
                p = e.next_in_row;
            }
            max = max.max(row_sum);
        }
        Ok(max)
    }

    /// Before factoring: the largest element magnitude. After factoring: an
    /// upper bound on the largest element of A recovered from the factors,
    /// the row maximum over |L| times the column sum over |U| with its unit
    /// diagonal.
    pub fn largest_element(&self) -> f64 {
        if !self.factored {
            let mut max = 0.0f64;
            for j in 1..=self.size {
                let mut p = self.first_in_col[j];
                while let Some(id) = p {
                    let e = self.e(id);
                    let mag = if self.complex {
                        cmplx::inf_norm(e.value())
                    } else {
                        e.real.abs()
                    };
                    max = max.max(mag);
                    p = e.next_in_col;
                }
            }
            return max;
        }

        if self.singular_row > 0 || self.singular_col > 0 {
            return 0.0;
        }

        let mut max_row = 0.0f64;
        let mut max_col = 0.0f64;
        for i in 1..=self.size {
            let diag = match self.diag[i] {
                Some(d) => d,
                None => return 0.0,
            };

            // The stored diagonal is the reciprocal; undo it for the pivot
            // magnitude in L.
            let pivot_mag = if self.complex {
                cmplx::inf_norm(cmplx::reciprocal(self.e(diag).value()))
            } else {
                (1.0 / self.e(diag).real).abs()
            };
            max_row = max_row.max(pivot_mag);

            let mut p = self.first_in_row[i];
            while let Some(id) = p {
                if id == diag {
                    break;
                }
                let e = self.e(id);
                let mag = if self.complex {
                    cmplx::inf_norm(e.value())
                } else {
                    e.real.abs()
                };
                max_row = max_row.max(mag);
                p = e.next_in_row;
            }

            let mut abs_col_sum = 1.0f64;
            let mut p = self.first_in_col[i];
            while let Some(id) = p {
                if id == diag {
                    break;
                }
                let e = self.e(id);
                abs_col_sum += if self.complex {
                    cmplx::inf_norm(e.value())
                } else {
                    e.real.abs()
                };
                p = e.next_in_col;
            }
            max_col = max_col.max(abs_col_sum);
        }

        max_row * max_col
    }

    /// Barlow/Reid bound on the largest element of `E = A - LU`.
    /// `rho` is the largest-element bound; pass `None` to compute it here.
    pub fn roundoff(&mut self, rho: Option<f64>) -> f64 {
        if !self.factored {
            return 0.0;
        }
        let rho = match rho {
            Some(r) => r,
            None => self.largest_element(),
        };

        if self.max_row_count_in_lower_tri < 0 {
            let mut max_count = 0i64;
            for i in (1..=self.size).rev() {
                let mut count = 0i64;
                let mut p = self.first_in_row[i];
                while let Some(id) = p {
                    let e = self.e(id);
                    if e.col >= i {
                        break;
                    }
                    count += 1;
                    p = e.next_in_row;
                }
                max_count = max_count.max(count);
            }
            self.max_row_count_in_lower_tri = max_count;
        }

        let max_count = self.max_row_count_in_lower_tri as f64;
        let gear = 1.01 * ((max_count + 1.0) * self.rel_threshold + 1.0) * max_count * max_count;
        let reid = 3.01 * self.size as f64;
        MACHINE_RESOLUTION * rho * gear.min(reid)
    }

    /// Ratio of the largest to the smallest pivot magnitude. Cheap, and a
    /// useful smell test, but not a condition number. Returns 0 when the
    /// matrix is unfactored or singular.
    pub fn pseudo_condition(&self) -> f64 {
        if !self.factored || self.singular_row > 0 || self.singular_col > 0 {
            return 0.0;
        }

        let mag_of = |m: &Matrix, i: usize| -> Option<f64> {
            let d = m.diag[i]?;
            Some(if m.complex {
                cmplx::inf_norm(m.e(d).value())
            } else {
                m.e(d).real.abs()
            })
        };

        let first = match mag_of(self, 1) {
            Some(v) => v,
            None => return 0.0,
        };
        let mut max_pivot = first;
        let mut min_pivot = first;
        for i in 2..=self.size {
            let mag = match mag_of(self, i) {
                Some(v) => v,
                None => return 0.0,
            };
            if mag > max_pivot {
                max_pivot = mag;
            } else if mag < min_pivot {
                min_pivot = mag;
            }
        }

        if max_pivot <= 0.0 {
            return 0.0;
        }
        max_pivot / min_pivot
    }

    // ------------------------------------------------------------------
    // Condition estimate
    // ------------------------------------------------------------------

    /// Reciprocal condition-number estimate in the style of Hager and
    /// O'Leary: grow a right-hand side with ±1 choices that maximizes the
    /// solution of `Aᵀ y = e`, solve once more against `A`, and combine the
    /// 1-norm growth ratios. `norm_of_matrix` is the value returned by
    /// [`Self::norm`] before factoring.
    pub fn condition(&mut self, norm_of_matrix: f64) -> Result<f64, Error> {
        if !self.factored {
            return Err(Error::NotFactored);
        }
        if norm_of_matrix == 0.0 {
            return Err(Error::Singular { row: 0, col: 0 });
        }
        if self.complex {
            return self.condition_complex(norm_of_matrix);
        }

        let size = self.size;
        let mut t = vec![0.0f64; size + 2];
        let mut tm = vec![0.0f64; size + 2];
        let mut e = 1.0f64;

        // Part 1: back-solve Uᵀ w = ±e, steering each sign to inflate the
        // running solution.
        for i in 1..=size {
            let pivot = match self.diag[i] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step: i }),
            };
            let pivot_val = self.e(pivot).real;
            let em = if t[i] < 0.0 { -e } else { e };
            let mut wm = (em + t[i]) * pivot_val;

            if wm.abs() > SLACK {
                let scale = 1.0 / (SLACK * SLACK).max(wm.abs());
                for k in (1..=size).rev() {
                    t[k] *= scale;
                }
                e *= scale;
                let em = if t[i] < 0.0 { -e } else { e };
                wm = (em + t[i]) * pivot_val;
            }
            let em = if t[i] < 0.0 { -e } else { e };
            let wp = (t[i] - em) * pivot_val;
            let mut asp = (t[i] - em).abs();
            let mut asm = (em + t[i]).abs();

            let mut p = self.e(pivot).next_in_col;
            while let Some(id) = p {
                let (row, val, next) = {
                    let el = self.e(id);
                    (el.row, el.real, el.next_in_col)
                };
                tm[row] = t[row] - wm * val;
                t[row] -= wp * val;
                asp += t[row].abs();
                asm += tm[row].abs();
                p = next;
            }

            if asm > asp {
                t[i] = wm;
                let mut p = self.e(pivot).next_in_col;
                while let Some(id) = p {
                    let (row, next) = {
                        let el = self.e(id);
                        (el.row, el.next_in_col)
                    };
                    t[row] = tm[row];
                    p = next;
                }
            } else {
                t[i] = wp;
            }
        }

        let asw: f64 = (1..=size).map(|i| t[i].abs()).sum();
        let scale = 1.0 / (SLACK * asw);
        if scale < 0.5 {
            for i in (1..=size).rev() {
                t[i] *= scale;
            }
            e *= scale;
        }

        // Finish Aᵀ y = e with the Lᵀ sweep.
        for i in (1..=size).rev() {
            let pivot = match self.diag[i] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step: i }),
            };
            let mut p = self.e(pivot).next_in_row;
            while let Some(id) = p {
                let el = self.e(id);
                t[i] -= el.real * t[el.col];
                p = el.next_in_row;
            }
            if t[i].abs() > SLACK {
                let scale = 1.0 / (SLACK * SLACK).max(t[i].abs());
                for k in (1..=size).rev() {
                    t[k] *= scale;
                }
                e *= scale;
            }
        }

        let mut asy: f64 = (1..=size).map(|i| t[i].abs()).sum();
        let scale = 1.0 / (SLACK * asy);
        if scale < 0.5 {
            for i in (1..=size).rev() {
                t[i] *= scale;
            }
            asy = 1.0 / SLACK;
            e *= scale;
        }

        let mut max_y = 0.0f64;
        for i in (1..=size).rev() {
            max_y = max_y.max(t[i].abs());
        }

        // Part 2: solve A z = y.
        for i in 1..=size {
            let pivot = match self.diag[i] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step: i }),
            };
            let mut p = self.e(pivot).next_in_row;
            while let Some(id) = p {
                let el = self.e(id);
                t[el.col] -= t[i] * el.real;
                p = el.next_in_row;
            }
            if t[i].abs() > SLACK {
                let scale = 1.0 / (SLACK * SLACK).max(t[i].abs());
                for k in (1..=size).rev() {
                    t[k] *= scale;
                }
                asy *= scale;
            }
        }

        let asv: f64 = (1..=size).map(|i| t[i].abs()).sum();
        let scale = 1.0 / (SLACK * asv);
        if scale < 0.5 {
            for i in (1..=size).rev() {
                t[i] *= scale;
            }
            asy *= scale;
        }

        for i in (1..=size).rev() {
            let pivot = match self.diag[i] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step: i }),
            };
            let mut p = self.e(pivot).next_in_col;
            while let Some(id) = p {
                let el = self.e(id);
                t[i] -= el.real * t[el.row];
                p = el.next_in_col;
            }
            t[i] *= self.e(pivot).real;
            if t[i].abs() > SLACK {
                let scale = 1.0 / (SLACK * SLACK).max(t[i].abs());
                for k in (1..=size).rev() {
                    t[k] *= scale;
                }
                asy *= scale;
            }
        }

        let asz: f64 = (1..=size).map(|i| t[i].abs()).sum();

        let linpack = asy / asz;
        let oleary = e / max_y;
        let inv_norm_of_inverse = linpack.min(oleary);
        Ok(inv_norm_of_inverse / norm_of_matrix)
    }

    /// Complex variant of [`Self::condition`], in complex 1-norms.
    fn condition_complex(&mut self, norm_of_matrix: f64) -> Result<f64, Error> {
        let size = self.size;
        let zero = Complex64::new(0.0, 0.0);
        let mut t = vec![zero; size + 2];
        let mut tm = vec![zero; size + 2];
        let mut e = 1.0f64;

        for i in 1..=size {
            let pivot = match self.diag[i] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step: i }),
            };
            let pivot_val = self.e(pivot).value();
            let mut em = if t[i].re < 0.0 { -e } else { e };

            let mut wm = t[i] + em;
            let mut asm = cmplx::one_norm(wm);
            wm *= pivot_val;

            if cmplx::one_norm(wm) > SLACK {
                let scale = 1.0 / (SLACK * SLACK).max(cmplx::one_norm(wm));
                for k in (1..=size).rev() {
                    t[k] *= scale;
                }
                e *= scale;
                em *= scale;
                asm *= scale;
                wm *= scale;
            }

            let wp = (t[i] - em) * pivot_val;
            let mut asp = cmplx::one_norm(t[i] - em);

            let mut p = self.e(pivot).next_in_col;
            while let Some(id) = p {
                let (row, val, next) = {
                    let el = self.e(id);
                    (el.row, el.value(), el.next_in_col)
                };
                tm[row] = t[row] - wm * val;
                t[row] -= wp * val;
                asp += cmplx::one_norm(t[row]);
                asm += cmplx::one_norm(tm[row]);
                p = next;
            }

            if asm > asp {
                t[i] = wm;
                let mut p = self.e(pivot).next_in_col;
                while let Some(id) = p {
                    let (row, next) = {
                        let el = self.e(id);
                        (el.row, el.next_in_col)
                    };
                    t[row] = tm[row];
                    p = next;
                }
            } else {
                t[i] = wp;
            }
        }

        let asw: f64 = (1..=size).map(|i| cmplx::one_norm(t[i])).sum();
        let scale = 1.0 / (SLACK * asw);
        if scale < 0.5 {
            for i in (1..=size).rev() {
                t[i] *= scale;
            }
            e *= scale;
        }

        for i in (1..=size).rev() {
            let pivot = match self.diag[i] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step: i }),
            };
            let mut p = self.e(pivot).next_in_row;
            while let Some(id) = p {
                let (col, val, next) = {
                    let el = self.e(id);
                    (el.col, el.value(), el.next_in_row)
                };
                let tcol = t[col];
                t[i] -= val * tcol;
                p = next;
            }
            if cmplx::one_norm(t[i]) > SLACK {
                let scale = 1.0 / (SLACK * SLACK).max(cmplx::one_norm(t[i]));
                for k in (1..=size).rev() {
                    t[k] *= scale;
                }
                e *= scale;
            }
        }

        let mut asy: f64 = (1..=size).map(|i| cmplx::one_norm(t[i])).sum();
        let scale = 1.0 / (SLACK * asy);
        if scale < 0.5 {
            for i in (1..=size).rev() {
                t[i] *= scale;
            }
            asy = 1.0 / SLACK;
            e *= scale;
        }

        let mut max_y = 0.0f64;
        for i in (1..=size).rev() {
            max_y = max_y.max(cmplx::one_norm(t[i]));
        }

        for i in 1..=size {
            let pivot = match self.diag[i] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step: i }),
            };
            let ti = t[i];
            let mut p = self.e(pivot).next_in_row;
            while let Some(id) = p {
                let (col, val, next) = {
                    let el = self.e(id);
                    (el.col, el.value(), el.next_in_row)
                };
                t[col] -= ti * val;
                p = next;
            }
            if cmplx::one_norm(t[i]) > SLACK {
                let scale = 1.0 / (SLACK * SLACK).max(cmplx::one_norm(t[i]));
                for k in (1..=size).rev() {
                    t[k] *= scale;
                }
                asy *= scale;
            }
        }

        let asv: f64 = (1..=size).map(|i| cmplx::one_norm(t[i])).sum();
        let scale = 1.0 / (SLACK * asv);
        if scale < 0.5 {
            for i in (1..=size).rev() {
                t[i] *= scale;
            }
            asy *= scale;
        }

        for i in (1..=size).rev() {
            let pivot = match self.diag[i] {
                Some(d) => d,
                None => return Err(Error::ZeroPivot { step: i }),
            };
            let mut p = self.e(pivot).next_in_col;
            while let Some(id) = p {
                let (row, val, next) = {
                    let el = self.e(id);
                    (el.row, el.value(), el.next_in_col)
                };
                let trow = t[row];
                t[i] -= val * trow;
                p = next;
            }
            t[i] *= self.e(pivot).value();
            if cmplx::one_norm(t[i]) > SLACK {
                let scale = 1.0 / (SLACK * SLACK).max(cmplx::one_norm(t[i]));
                for k in (1..=size).rev() {
                    t[k] *= scale;
                }
                asy *= scale;
            }
        }

        let asz: f64 = (1..=size).map(|i| cmplx::one_norm(t[i])).sum();

        let linpack = asy / asz;
        let oleary = e / max_y;
        let inv_norm_of_inverse = linpack.min(oleary);
        Ok(inv_norm_of_inverse / norm_of_matrix)
    }

    // ------------------------------------------------------------------
    // Matrix-vector products and residual
    // ------------------------------------------------------------------

    /// Computes `A x` against the stamped (unfactored) values, honoring the
    /// index maps and the configured complex layout. Returns `(b, ib)`;
    /// `ib` is empty for real matrices and interleaved layouts.
    pub fn multiply(
        &mut self,
        solution: &[f64],
        isolution: Option<&[f64]>,
    ) -> Result<(Vec<f64>, Vec<f64>), Error> {
        if !self.rows_linked {
            self.link_rows();
        }
        self.create_internal_vectors();
        let top = self.vector_top();

        if self.complex {
            return self.multiply_complex(solution, isolution, top, false);
        }
        if solution.len() < top + 1 {
            return Err(Error::SizeMismatch { expected: top + 1, got: solution.len() });
        }

        for i in 1..=self.size {
            self.intermediate[i] = solution[self.int_to_ext_col[i]];
        }

        let mut rhs = vec![0.0; top + 1];
        for i in 1..=self.size {
            let mut sum = 0.0;
            let mut p = self.first_in_row[i];
            while let Some(id) = p {
                let e = self.e(id);
                sum += e.real * self.intermediate[e.col];
                p = e.next_in_row;
            }
            rhs[self.int_to_ext_row[i]] = sum;
        }
        Ok((rhs, Vec::new()))
    }

    /// Computes `Aᵀ x` against the stamped values; mirror of
    /// [`Self::multiply`] with the maps and chains swapped.
    pub fn multiply_transposed(
        &mut self,
        solution: &[f64],
        isolution: Option<&[f64]>,
    ) -> Result<(Vec<f64>, Vec<f64>), Error> {
        self.create_internal_vectors();
        let top = self.vector_top();

        if self.complex {
            return self.multiply_complex(solution, isolution, top, true);
        }
        if solution.len() < top + 1 {
            return Err(Error::SizeMismatch { expected: top + 1, got: solution.len() });
        }

        for i in 1..=self.size {
            self.intermediate[i] = solution[self.int_to_ext_row[i]];
        }

        let mut rhs = vec![0.0; top + 1];
        for i in 1..=self.size {
            let mut sum = 0.0;
            let mut p = self.first_in_col[i];
            while let Some(id) = p {
                let e = self.e(id);
                sum += e.real * self.intermediate[e.row];
                p = e.next_in_col;
            }
            rhs[self.int_to_ext_col[i]] = sum;
        }
        Ok((rhs, Vec::new()))
    }

    fn multiply_complex(
        &mut self,
        solution: &[f64],
        isolution: Option<&[f64]>,
        top: usize,
        transposed: bool,
    ) -> Result<(Vec<f64>, Vec<f64>), Error> {
        let separated = self.cfg.separated_complex_vectors;
        if separated {
            if solution.len() < top + 1 {
                return Err(Error::SizeMismatch { expected: top + 1, got: solution.len() });
            }
            match isolution {
                Some(im) if im.len() >= top + 1 => {}
                Some(im) => {
                    return Err(Error::SizeMismatch { expected: top + 1, got: im.len() })
                }
                None => return Err(Error::ComplexMismatch),
            }
        } else if solution.len() < 2 * (top + 1) {
            return Err(Error::SizeMismatch { expected: 2 * (top + 1), got: solution.len() });
        }

        let size = self.size;
        let mut vector = vec![Complex64::new(0.0, 0.0); size + 1];
        for i in 1..=size {
            let ext = if transposed {
                self.int_to_ext_row[i]
            } else {
                self.int_to_ext_col[i]
            };
            vector[i] = if separated {
                Complex64::new(solution[ext], isolution.map(|s| s[ext]).unwrap_or(0.0))
            } else {
                Complex64::new(solution[2 * ext], solution[2 * ext + 1])
            };
        }

        let mut rhs;
        let mut irhs;
        if separated {
            rhs = vec![0.0; top + 1];
            irhs = vec![0.0; top + 1];
        } else {
            rhs = vec![0.0; 2 * (top + 1)];
            irhs = Vec::new();
        }

        for i in 1..=size {
            let mut sum = Complex64::new(0.0, 0.0);
            if transposed {
                let mut p = self.first_in_col[i];
                while let Some(id) = p {
                    let e = self.e(id);
                    sum += e.value() * vector[e.row];
                    p = e.next_in_col;
                }
            } else {
                let mut p = self.first_in_row[i];
                while let Some(id) = p {
                    let e = self.e(id);
                    sum += e.value() * vector[e.col];
                    p = e.next_in_row;
                }
            }

            let ext = if transposed {
                self.int_to_ext_col[i]
            } else {
                self.int_to_ext_row[i]
            };
            if separated {
                rhs[ext] = sum.re;
                irhs[ext] = sum.im;
            } else {
                rhs[2 * ext] = sum.re;
                rhs[2 * ext + 1] = sum.im;
            }
        }
        Ok((rhs, irhs))
    }

    /// Recomputes `A x` from the element baselines and returns
    /// `(||Ax - b||₁ / ||b||∞, ||b||∞)`.
    ///
    /// The element values are first reset through [`Self::initialize`], so
    /// meaningful use requires init-info baselines recorded at stamp time.
    /// Verification runs against `Aᵀ` when the configuration says the
    /// system was solved transposed.
    pub fn calculate_normalized_residual(
        &mut self,
        rhs: &[f64],
        solution: &[f64],
        irhs: Option<&[f64]>,
        isolution: Option<&[f64]>,
    ) -> Result<(f64, f64), Error> {
        let top = self.vector_top();
        let separated = self.cfg.separated_complex_vectors;
        self.initialize();

        let mut max_rhs = 0.0f64;
        if self.complex {
            if separated {
                let irhs = irhs.ok_or(Error::ComplexMismatch)?;
                if rhs.len() < top + 1 || irhs.len() < top + 1 {
                    return Err(Error::SizeMismatch {
                        expected: top + 1,
                        got: rhs.len().min(irhs.len()),
                    });
                }
                for i in 1..=top {
                    max_rhs = max_rhs.max(rhs[i].abs()).max(irhs[i].abs());
                }
            } else {
                if rhs.len() < 2 * (top + 1) {
                    return Err(Error::SizeMismatch { expected: 2 * (top + 1), got: rhs.len() });
                }
                for i in 1..=top {
                    max_rhs = max_rhs.max(rhs[2 * i].abs()).max(rhs[2 * i + 1].abs());
                }
            }
        } else {
            if rhs.len() < top + 1 {
                return Err(Error::SizeMismatch { expected: top + 1, got: rhs.len() });
            }
            for i in 1..=top {
                max_rhs = max_rhs.max(rhs[i].abs());
            }
        }

        let (verif, iverif) = if self.cfg.transpose {
            self.multiply_transposed(solution, isolution)?
        } else {
            self.multiply(solution, isolution)?
        };

        let mut residual = 0.0f64;
        if self.complex {
            if separated {
                let irhs = irhs.ok_or(Error::ComplexMismatch)?;
                for i in 1..=top {
                    residual += (rhs[i] - verif[i]).abs() + (irhs[i] - iverif[i]).abs();
                }
            } else {
                for i in 1..=top {
                    residual += (rhs[2 * i] - verif[2 * i]).abs()
                        + (rhs[2 * i + 1] - verif[2 * i + 1]).abs();
                }
            }
        } else {
            for i in 1..=top {
                residual += (rhs[i] - verif[i]).abs();
            }
        }

        if max_rhs == 0.0 {
            return Ok((0.0, 0.0));
        }
        Ok((residual / max_rhs, max_rhs))
    }
}
