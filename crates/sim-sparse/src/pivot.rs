//! Pivot selection for the ordering factorization.
//!
//! Strategies are tried cheapest-first:
//!
//! 1. **Singleton**: a row or column with no other nonzeros in the reduced
//!    sub-matrix gives a fill-free pivot.
//! 2. **Quick diagonal**: scan diagonals in increasing Markowitz product,
//!    accepting immediately on the tight "dimer" pattern (product one with a
//!    symmetric off-diagonal pair the diagonal dominates).
//! 3. **Diagonal**: exhaustive over the diagonal with bounded tie-breaking
//!    on the column ratio.
//! 4. **Entire matrix**: every remaining element; if nothing passes the
//!    threshold, the largest element is taken so factorization can limp on.
//!
//! A candidate of magnitude m is acceptable iff `m > abs_threshold` and
//! `m > rel_threshold * largest`, where largest is the biggest magnitude in
//! the candidate's column at or below the current step, the candidate's own
//! row excluded.

use crate::element::ElemId;
use crate::markowitz::clamped_product;
use crate::matrix::Matrix;

/// Which search produced the chosen pivot. The single-letter tags match the
/// traditional status output ('s', 'q', 'd', 'e').
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotStrategy {
    Singleton,
    QuickDiagonal,
    Diagonal,
    EntireMatrix,
}

impl PivotStrategy {
    /// One-character tag for compact status lines.
    pub fn tag(self) -> char {
        match self {
            PivotStrategy::Singleton => 's',
            PivotStrategy::QuickDiagonal => 'q',
            PivotStrategy::Diagonal => 'd',
            PivotStrategy::EntireMatrix => 'e',
        }
    }
}

impl Matrix {
    /// Picks the pivot for `step`, recording the strategy that found it.
    /// Returns `None` only when the remaining sub-matrix is entirely zero.
    pub(crate) fn search_for_pivot(&mut self, step: usize, diag_pivoting: bool) -> Option<ElemId> {
        if self.singletons > 0 {
            if let Some(pivot) = self.search_for_singleton(step) {
                self.pivot_selection = Some(PivotStrategy::Singleton);
                return Some(pivot);
            }
        }

        if diag_pivoting {
            if let Some(pivot) = self.quickly_search_diagonal(step) {
                self.pivot_selection = Some(PivotStrategy::QuickDiagonal);
                return Some(pivot);
            }
            if let Some(pivot) = self.search_diagonal(step) {
                self.pivot_selection = Some(PivotStrategy::Diagonal);
                return Some(pivot);
            }
        }

        let pivot = self.search_entire_matrix(step);
        self.pivot_selection = Some(PivotStrategy::EntireMatrix);
        pivot
    }

    /// Largest magnitude in `elem`'s column at or below `step`, excluding
    /// `elem`'s own row. This is the reference value for the relative
    /// threshold test.
    pub(crate) fn find_biggest_in_col_exclude(&self, elem: ElemId, step: usize) -> f64 {
        let col = self.e(elem).col;
        let exclude_row = self.e(elem).row;

        let mut cur = self.first_in_col[col];
        while let Some(id) = cur {
            if self.e(id).row >= step {
                break;
            }
            cur = self.e(id).next_in_col;
        }
        let first = match cur {
            Some(id) => id,
            None => return 0.0,
        };

        let mut largest = if self.e(first).row != exclude_row {
            self.element_mag(first)
        } else {
            0.0
        };
        let mut cur = self.e(first).next_in_col;
        while let Some(id) = cur {
            let mag = self.element_mag(id);
            if mag > largest && self.e(id).row != exclude_row {
                largest = mag;
            }
            cur = self.e(id).next_in_col;
        }
        largest
    }

    /// Largest magnitude from `from` to the end of its column chain.
    pub(crate) fn find_biggest_in_col(&self, from: Option<ElemId>) -> f64 {
        let mut largest = 0.0;
        let mut cur = from;
        while let Some(id) = cur {
            let mag = self.element_mag(id);
            if mag > largest {
                largest = mag;
            }
            cur = self.e(id).next_in_col;
        }
        largest
    }

    /// Strategy 1: walk the product array from the top down looking for zero
    /// products. Each hit names an index whose diagonal, column, or row can
    /// supply a fill-free pivot if it passes the threshold. A consumed
    /// singleton stays consumed; a fruitless search restores the tally.
    fn search_for_singleton(&mut self, step: usize) -> Option<ElemId> {
        self.markowitz_prod[self.size + 1] = self.markowitz_prod[step];
        self.markowitz_prod[step - 1] = 0;

        let mut remaining = self.singletons;
        self.singletons -= 1;

        let mut scan = self.size + 1;
        while remaining > 0 {
            while scan >= step && self.markowitz_prod[scan] != 0 {
                scan -= 1;
            }
            let mut i = scan;
            if i < step {
                break;
            }
            if i > self.size {
                i = step;
            }

            if let Some(diag) = self.diag[i] {
                let mag = self.element_mag(diag);
                if mag > self.abs_threshold
                    && mag > self.rel_threshold * self.find_biggest_in_col_exclude(diag, step)
                {
                    return Some(diag);
                }
            } else {
                let mut chosen: Option<ElemId> = None;
                if self.markowitz_col[i] == 0 {
                    let mut p = self.first_in_col[i];
                    while let Some(id) = p {
                        if self.e(id).row >= step {
                            break;
                        }
                        p = self.e(id).next_in_col;
                    }
                    chosen = p;
                }
                if chosen.is_none() && self.markowitz_row[i] == 0 {
                    let mut p = self.first_in_row[i];
                    while let Some(id) = p {
                        if self.e(id).col >= step {
                            break;
                        }
                        p = self.e(id).next_in_row;
                    }
                    chosen = p;
                }
                if let Some(pivot) = chosen {
                    let mag = self.element_mag(pivot);
                    if mag > self.abs_threshold
                        && mag > self.rel_threshold * self.find_biggest_in_col_exclude(pivot, step)
                    {
                        return Some(pivot);
                    }
                }
            }

            remaining -= 1;
            scan -= 1;
        }

        self.singletons += 1;
        None
    }

    /// Strategy 2: descend the diagonal in order of increasing Markowitz
    /// product, tracking the current minimum. A product-one diagonal whose
    /// single row partner and column partner mirror each other and are both
    /// dominated by the diagonal is accepted on the spot. The best candidate
    /// otherwise faces the column threshold test once at the end.
    fn quickly_search_diagonal(&mut self, step: usize) -> Option<ElemId> {
        let mut min_product = i64::MAX;
        self.markowitz_prod[self.size + 1] = self.markowitz_prod[step];
        self.markowitz_prod[step - 1] = -1;

        let mut chosen: Option<ElemId> = None;
        let mut index = self.size + 2;
        loop {
            index -= 1;
            while self.markowitz_prod[index] >= min_product {
                index -= 1;
            }

            let mut i = index;
            if i < step {
                break;
            }
            if i > self.size {
                i = step;
            }

            let diag = match self.diag[i] {
                Some(d) => d,
                None => continue,
            };
            let magnitude = self.element_mag(diag);
            if magnitude <= self.abs_threshold {
                continue;
            }

            if self.markowitz_prod[i] == 1 {
                let mut other_in_row = self.e(diag).next_in_row;
                let mut other_in_col = self.e(diag).next_in_col;
                if other_in_row.is_none() && other_in_col.is_none() {
                    // The partners sit before the diagonal in their chains.
                    let mut p = self.first_in_row[i];
                    while let Some(id) = p {
                        let c = self.e(id).col;
                        if c >= step && c != i {
                            break;
                        }
                        p = self.e(id).next_in_row;
                    }
                    other_in_row = p;

                    let mut p = self.first_in_col[i];
                    while let Some(id) = p {
                        let r = self.e(id).row;
                        if r >= step && r != i {
                            break;
                        }
                        p = self.e(id).next_in_col;
                    }
                    other_in_col = p;
                }

                if let (Some(in_row), Some(in_col)) = (other_in_row, other_in_col) {
                    if self.e(in_row).col == self.e(in_col).row {
                        let largest_off =
                            self.element_mag(in_row).max(self.element_mag(in_col));
                        if magnitude >= largest_off {
                            return Some(diag);
                        }
                    }
                }
            }

            min_product = self.markowitz_prod[i];
            chosen = Some(diag);
        }

        if let Some(pivot) = chosen {
            let largest_in_col = self.find_biggest_in_col_exclude(pivot, step);
            if self.element_mag(pivot) <= self.rel_threshold * largest_in_col {
                return None;
            }
        }
        chosen
    }

    /// Strategy 3: exhaustive diagonal search. Ties on the Markowitz product
    /// are broken toward the smallest column ratio, and the tie count is
    /// bounded by `min_product * ties_multiplier` to cap the work.
    fn search_diagonal(&mut self, step: usize) -> Option<ElemId> {
        let mut chosen: Option<ElemId> = None;
        let mut min_product = i64::MAX;
        let mut number_of_ties: i64 = 0;
        let mut ratio_of_accepted = 0.0;

        for i in (step..=self.size).rev() {
            if self.markowitz_prod[i] > min_product {
                continue;
            }
            let diag = match self.diag[i] {
                Some(d) => d,
                None => continue,
            };
            let magnitude = self.element_mag(diag);
            if magnitude <= self.abs_threshold {
                continue;
            }
            let largest_in_col = self.find_biggest_in_col_exclude(diag, step);
            if magnitude <= self.rel_threshold * largest_in_col {
                continue;
            }

            if self.markowitz_prod[i] < min_product {
                chosen = Some(diag);
                min_product = self.markowitz_prod[i];
                ratio_of_accepted = largest_in_col / magnitude;
                number_of_ties = 0;
            } else {
                number_of_ties += 1;
                let ratio = largest_in_col / magnitude;
                if ratio < ratio_of_accepted {
                    chosen = Some(diag);
                    ratio_of_accepted = ratio;
                }
                if number_of_ties >= min_product * self.cfg.ties_multiplier {
                    return chosen;
                }
            }
        }
        chosen
    }

    /// Strategy 4: every element of the reduced sub-matrix, same tie rules
    /// as the diagonal search. When no element passes the threshold the
    /// largest one found is returned anyway, since a bad pivot beats an
    /// aborted factorization for nearly singular systems.
    fn search_entire_matrix(&mut self, step: usize) -> Option<ElemId> {
        let mut chosen: Option<ElemId> = None;
        let mut largest_element: Option<ElemId> = None;
        let mut largest_mag = 0.0;
        let mut min_product = i64::MAX;
        let mut number_of_ties: i64 = 0;
        let mut ratio_of_accepted = 0.0;

        for j in step..=self.size {
            let mut cur = self.first_in_col[j];
            while let Some(id) = cur {
                if self.e(id).row >= step {
                    break;
                }
                cur = self.e(id).next_in_col;
            }
            let largest_in_col = self.find_biggest_in_col(cur);
            if largest_in_col == 0.0 {
                continue;
            }

            while let Some(id) = cur {
                let magnitude = self.element_mag(id);
                if magnitude > largest_mag {
                    largest_mag = magnitude;
                    largest_element = Some(id);
                }

                let product = clamped_product(
                    self.markowitz_row[self.e(id).row],
                    self.markowitz_col[self.e(id).col],
                );
                if product <= min_product
                    && magnitude > self.rel_threshold * largest_in_col
                    && magnitude > self.abs_threshold
                {
                    if product < min_product {
                        chosen = Some(id);
                        min_product = product;
                        ratio_of_accepted = largest_in_col / magnitude;
                        number_of_ties = 0;
                    } else {
                        number_of_ties += 1;
                        let ratio = largest_in_col / magnitude;
                        if ratio < ratio_of_accepted {
                            chosen = Some(id);
                            ratio_of_accepted = ratio;
                        }
                        if number_of_ties >= min_product * self.cfg.ties_multiplier {
                            return chosen;
                        }
                    }
                }
                cur = self.e(id).next_in_col;
            }
        }

        if chosen.is_some() {
            return chosen;
        }
        if largest_mag == 0.0 {
            return None;
        }
        log::warn!(
            "no pivot met the threshold at step {}; using the largest remaining element",
            step
        );
        largest_element
    }
}
