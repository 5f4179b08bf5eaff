//! Row and column exchanges that move a chosen pivot to the current step.
//!
//! Exchanging two rows must leave every column chain sorted, and vice versa,
//! so the swap works pairwise: the two rows are walked in parallel by
//! ascending column, and each column that holds an element of either row gets
//! its chain respliced so the two elements trade places. Only `next_in_col`
//! links and row indices change during a row exchange, which keeps the row
//! chains safe to traverse mid-swap.

use crate::element::{ColLink, ElemId, RowLink};
use crate::markowitz::clamped_product;
use crate::matrix::Matrix;

impl Matrix {
    /// Finds the diagonal element of `index` by scanning its column.
    pub(crate) fn find_diag(&self, index: usize) -> Option<ElemId> {
        let mut p = self.first_in_col[index];
        while let Some(id) = p {
            let e = self.e(id);
            if e.row == index {
                return Some(id);
            }
            if e.row > index {
                return None;
            }
            p = e.next_in_col;
        }
        None
    }

    /// Moves `pivot` from its current position to (step, step) with at most
    /// one row swap and one column swap, keeping the Markowitz products and
    /// singleton tally consistent. The pivot's original position is recorded
    /// for status reporting.
    pub(crate) fn exchange_rows_and_cols(&mut self, pivot: ElemId, step: usize) {
        let row = self.e(pivot).row;
        let col = self.e(pivot).col;
        self.pivots_original_row = row;
        self.pivots_original_col = col;

        if row == step && col == step {
            return;
        }

        if row == col {
            self.row_exchange(step, row);
            self.col_exchange(step, col);
            self.markowitz_prod.swap(step, row);
            self.diag.swap(step, row);
        } else {
            let old_step = self.markowitz_prod[step];
            let old_row = self.markowitz_prod[row];
            let old_col = self.markowitz_prod[col];

            if row != step {
                self.row_exchange(step, row);
                self.markowitz_prod[row] =
                    clamped_product(self.markowitz_row[row], self.markowitz_col[row]);
                if (self.markowitz_prod[row] == 0) != (old_row == 0) {
                    if old_row == 0 {
                        self.singletons -= 1;
                    } else {
                        self.singletons += 1;
                    }
                }
            }

            if col != step {
                self.col_exchange(step, col);
                self.markowitz_prod[col] =
                    clamped_product(self.markowitz_row[col], self.markowitz_col[col]);
                if (self.markowitz_prod[col] == 0) != (old_col == 0) {
                    if old_col == 0 {
                        self.singletons -= 1;
                    } else {
                        self.singletons += 1;
                    }
                }
                self.diag[col] = self.find_diag(col);
            }

            if row != step {
                self.diag[row] = self.find_diag(row);
            }
            self.diag[step] = self.find_diag(step);

            self.markowitz_prod[step] =
                clamped_product(self.markowitz_row[step], self.markowitz_col[step]);
            if (self.markowitz_prod[step] == 0) != (old_step == 0) {
                if old_step == 0 {
                    self.singletons -= 1;
                } else {
                    self.singletons += 1;
                }
            }
        }
    }

    /// Swaps two rows in every column chain, then swaps the row-level arrays
    /// and maps. Flips the interchange parity used by the determinant sign.
    pub(crate) fn row_exchange(&mut self, row1: usize, row2: usize) {
        let (row1, row2) = if row1 > row2 { (row2, row1) } else { (row1, row2) };

        let mut p1 = self.first_in_row[row1];
        let mut p2 = self.first_in_row[row2];
        while p1.is_some() || p2.is_some() {
            let (column, elem1, elem2) = match (p1, p2) {
                (None, Some(b)) => {
                    let c = self.e(b).col;
                    p2 = self.e(b).next_in_row;
                    (c, None, Some(b))
                }
                (Some(a), None) => {
                    let c = self.e(a).col;
                    p1 = self.e(a).next_in_row;
                    (c, Some(a), None)
                }
                (Some(a), Some(b)) => {
                    let ca = self.e(a).col;
                    let cb = self.e(b).col;
                    if ca < cb {
                        p1 = self.e(a).next_in_row;
                        (ca, Some(a), None)
                    } else if ca > cb {
                        p2 = self.e(b).next_in_row;
                        (cb, None, Some(b))
                    } else {
                        p1 = self.e(a).next_in_row;
                        p2 = self.e(b).next_in_row;
                        (ca, Some(a), Some(b))
                    }
                }
                (None, None) => break,
            };
            self.exchange_col_elements(row1, elem1, row2, elem2, column);
        }

        self.markowitz_row.swap(row1, row2);
        self.first_in_row.swap(row1, row2);
        self.int_to_ext_row.swap(row1, row2);
        if self.cfg.translate {
            self.ext_to_int_row[self.int_to_ext_row[row1]] = Some(row1);
            self.ext_to_int_row[self.int_to_ext_row[row2]] = Some(row2);
        }
        self.interchanges_odd = !self.interchanges_odd;
    }

    /// Swaps two columns in every row chain; mirror of [`Self::row_exchange`].
    pub(crate) fn col_exchange(&mut self, col1: usize, col2: usize) {
        let (col1, col2) = if col1 > col2 { (col2, col1) } else { (col1, col2) };

        let mut p1 = self.first_in_col[col1];
        let mut p2 = self.first_in_col[col2];
        while p1.is_some() || p2.is_some() {
            let (row, elem1, elem2) = match (p1, p2) {
                (None, Some(b)) => {
                    let r = self.e(b).row;
                    p2 = self.e(b).next_in_col;
                    (r, None, Some(b))
                }
                (Some(a), None) => {
                    let r = self.e(a).row;
                    p1 = self.e(a).next_in_col;
                    (r, Some(a), None)
                }
                (Some(a), Some(b)) => {
                    let ra = self.e(a).row;
                    let rb = self.e(b).row;
                    if ra < rb {
                        p1 = self.e(a).next_in_col;
                        (ra, Some(a), None)
                    } else if ra > rb {
                        p2 = self.e(b).next_in_col;
                        (rb, None, Some(b))
                    } else {
                        p1 = self.e(a).next_in_col;
                        p2 = self.e(b).next_in_col;
                        (ra, Some(a), Some(b))
                    }
                }
                (None, None) => break,
            };
            self.exchange_row_elements(col1, elem1, col2, elem2, row);
        }

        self.markowitz_col.swap(col1, col2);
        self.first_in_col.swap(col1, col2);
        self.int_to_ext_col.swap(col1, col2);
        if self.cfg.translate {
            self.ext_to_int_col[self.int_to_ext_col[col1]] = Some(col1);
            self.ext_to_int_col[self.int_to_ext_col[col2]] = Some(col2);
        }
        self.interchanges_odd = !self.interchanges_odd;
    }

    /// Resplices one column chain so the elements of `row1` and `row2` trade
    /// places. Either element may be absent; at least one is present.
    fn exchange_col_elements(
        &mut self,
        row1: usize,
        elem1: Option<ElemId>,
        row2: usize,
        elem2: Option<ElemId>,
        column: usize,
    ) {
        // Link slot just above row1's position.
        let mut above1 = ColLink::Head(column);
        let mut cur = self.col_next(above1);
        while let Some(id) = cur {
            if self.e(id).row >= row1 {
                break;
            }
            above1 = ColLink::After(id);
            cur = self.e(id).next_in_col;
        }

        match (elem1, elem2) {
            (Some(e1), None) => {
                // e1 slides down to row2's position if anything sits between.
                let below1 = self.e(e1).next_in_col;
                if let Some(b) = below1 {
                    if self.e(b).row < row2 {
                        self.set_col_next(above1, below1);
                        let mut above2 = ColLink::After(b);
                        let mut cur2 = self.e(b).next_in_col;
                        while let Some(id) = cur2 {
                            if self.e(id).row >= row2 {
                                break;
                            }
                            above2 = ColLink::After(id);
                            cur2 = self.e(id).next_in_col;
                        }
                        self.set_col_next(above2, Some(e1));
                        self.e_mut(e1).next_in_col = cur2;
                    }
                }
                self.e_mut(e1).row = row2;
            }
            (Some(e1), Some(e2)) => {
                let below1 = self.e(e1).next_in_col;
                if below1 == Some(e2) {
                    let below2 = self.e(e2).next_in_col;
                    self.e_mut(e1).next_in_col = below2;
                    self.e_mut(e2).next_in_col = Some(e1);
                    self.set_col_next(above1, Some(e2));
                } else {
                    let b = match below1 {
                        Some(b) => b,
                        None => return,
                    };
                    let mut above2 = ColLink::After(b);
                    let mut cur2 = self.e(b).next_in_col;
                    while let Some(id) = cur2 {
                        if self.e(id).row >= row2 {
                            break;
                        }
                        above2 = ColLink::After(id);
                        cur2 = self.e(id).next_in_col;
                    }
                    let below2 = self.e(e2).next_in_col;
                    self.set_col_next(above1, Some(e2));
                    self.e_mut(e2).next_in_col = below1;
                    self.set_col_next(above2, Some(e1));
                    self.e_mut(e1).next_in_col = below2;
                }
                self.e_mut(e1).row = row2;
                self.e_mut(e2).row = row1;
            }
            (None, Some(e2)) => {
                // e2 climbs to row1's position unless it is already the
                // first element at or below row1.
                if let Some(below_row1) = cur {
                    if below_row1 != e2 {
                        let mut above2 = ColLink::After(below_row1);
                        let mut cur2 = self.e(below_row1).next_in_col;
                        while let Some(id) = cur2 {
                            if self.e(id).row >= row2 {
                                break;
                            }
                            above2 = ColLink::After(id);
                            cur2 = self.e(id).next_in_col;
                        }
                        let below2 = self.e(e2).next_in_col;
                        self.set_col_next(above2, below2);
                        self.set_col_next(above1, Some(e2));
                        self.e_mut(e2).next_in_col = Some(below_row1);
                    }
                }
                self.e_mut(e2).row = row1;
            }
            (None, None) => {}
        }
    }

    /// Resplices one row chain so the elements of `col1` and `col2` trade
    /// places; mirror of [`Self::exchange_col_elements`].
    fn exchange_row_elements(
        &mut self,
        col1: usize,
        elem1: Option<ElemId>,
        col2: usize,
        elem2: Option<ElemId>,
        row: usize,
    ) {
        let mut left1 = RowLink::Head(row);
        let mut cur = self.row_next(left1);
        while let Some(id) = cur {
            if self.e(id).col >= col1 {
                break;
            }
            left1 = RowLink::After(id);
            cur = self.e(id).next_in_row;
        }

        match (elem1, elem2) {
            (Some(e1), None) => {
                let right1 = self.e(e1).next_in_row;
                if let Some(b) = right1 {
                    if self.e(b).col < col2 {
                        self.set_row_next(left1, right1);
                        let mut left2 = RowLink::After(b);
                        let mut cur2 = self.e(b).next_in_row;
                        while let Some(id) = cur2 {
                            if self.e(id).col >= col2 {
                                break;
                            }
                            left2 = RowLink::After(id);
                            cur2 = self.e(id).next_in_row;
                        }
                        self.set_row_next(left2, Some(e1));
                        self.e_mut(e1).next_in_row = cur2;
                    }
                }
                self.e_mut(e1).col = col2;
            }
            (Some(e1), Some(e2)) => {
                let right1 = self.e(e1).next_in_row;
                if right1 == Some(e2) {
                    let right2 = self.e(e2).next_in_row;
                    self.e_mut(e1).next_in_row = right2;
                    self.e_mut(e2).next_in_row = Some(e1);
                    self.set_row_next(left1, Some(e2));
                } else {
                    let b = match right1 {
                        Some(b) => b,
                        None => return,
                    };
                    let mut left2 = RowLink::After(b);
                    let mut cur2 = self.e(b).next_in_row;
                    while let Some(id) = cur2 {
                        if self.e(id).col >= col2 {
                            break;
                        }
                        left2 = RowLink::After(id);
                        cur2 = self.e(id).next_in_row;
                    }
                    let right2 = self.e(e2).next_in_row;
                    self.set_row_next(left1, Some(e2));
                    self.e_mut(e2).next_in_row = right1;
                    self.set_row_next(left2, Some(e1));
                    self.e_mut(e1).next_in_row = right2;
                }
                self.e_mut(e1).col = col2;
                self.e_mut(e2).col = col1;
            }
            (None, Some(e2)) => {
                if let Some(right_of_col1) = cur {
                    if right_of_col1 != e2 {
                        let mut left2 = RowLink::After(right_of_col1);
                        let mut cur2 = self.e(right_of_col1).next_in_row;
                        while let Some(id) = cur2 {
                            if self.e(id).col >= col2 {
                                break;
                            }
                            left2 = RowLink::After(id);
                            cur2 = self.e(id).next_in_row;
                        }
                        let right2 = self.e(e2).next_in_row;
                        self.set_row_next(left2, right2);
                        self.set_row_next(left1, Some(e2));
                        self.e_mut(e2).next_in_row = Some(right_of_col1);
                    }
                }
                self.e_mut(e2).col = col1;
            }
            (None, None) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::matrix::Matrix;

    fn build(n: usize, entries: &[(usize, usize, f64)]) -> Matrix {
        let cfg = Config {
            translate: false,
            expandable: false,
            ..Config::real_only()
        };
        let mut m = Matrix::new(n, cfg).unwrap();
        for &(r, c, v) in entries {
            let id = m.get_element(r, c).unwrap();
            m.add_real(id, v);
        }
        m.link_rows();
        m
    }

    fn col_rows(m: &Matrix, col: usize) -> Vec<(usize, f64)> {
        let mut out = Vec::new();
        let mut p = m.first_in_col[col];
        while let Some(id) = p {
            out.push((m.e(id).row, m.e(id).real));
            p = m.e(id).next_in_col;
        }
        out
    }

    fn row_cols(m: &Matrix, row: usize) -> Vec<(usize, f64)> {
        let mut out = Vec::new();
        let mut p = m.first_in_row[row];
        while let Some(id) = p {
            out.push((m.e(id).col, m.e(id).real));
            p = m.e(id).next_in_row;
        }
        out
    }

    #[test]
    fn row_exchange_preserves_sorted_chains() {
        let mut m = build(
            3,
            &[
                (1, 1, 11.0),
                (1, 3, 13.0),
                (2, 2, 22.0),
                (3, 1, 31.0),
                (3, 2, 32.0),
                (3, 3, 33.0),
            ],
        );
        m.row_exchange(1, 3);

        // Values follow their rows; chains stay sorted by row index.
        assert_eq!(col_rows(&m, 1), vec![(1, 31.0), (3, 11.0)]);
        assert_eq!(col_rows(&m, 2), vec![(1, 32.0), (2, 22.0)]);
        assert_eq!(col_rows(&m, 3), vec![(1, 33.0), (3, 13.0)]);
        assert_eq!(row_cols(&m, 1), vec![(1, 31.0), (2, 32.0), (3, 33.0)]);
        assert_eq!(row_cols(&m, 3), vec![(1, 11.0), (3, 13.0)]);
        assert!(m.interchanges_odd);
        assert_eq!(m.int_to_ext_row[1], 3);
        assert_eq!(m.int_to_ext_row[3], 1);
    }

    #[test]
    fn col_exchange_preserves_sorted_chains() {
        let mut m = build(
            3,
            &[
                (1, 1, 11.0),
                (2, 1, 21.0),
                (2, 2, 22.0),
                (1, 3, 13.0),
                (3, 3, 33.0),
            ],
        );
        m.col_exchange(1, 3);

        assert_eq!(row_cols(&m, 1), vec![(1, 13.0), (3, 11.0)]);
        assert_eq!(row_cols(&m, 2), vec![(2, 22.0), (3, 21.0)]);
        assert_eq!(row_cols(&m, 3), vec![(1, 33.0)]);
        assert_eq!(col_rows(&m, 1), vec![(1, 13.0), (3, 33.0)]);
        assert_eq!(col_rows(&m, 3), vec![(1, 11.0), (2, 21.0)]);
        assert!(m.interchanges_odd);
    }

    #[test]
    fn exchange_to_step_moves_offdiagonal_pivot() {
        let mut m = build(
            3,
            &[
                (1, 2, 12.0),
                (2, 1, 21.0),
                (2, 3, 23.0),
                (3, 2, 32.0),
                (3, 3, 33.0),
            ],
        );
        m.count_markowitz(None, 1);
        m.markowitz_products(1);

        // Move the element at (2, 1) to the (1, 1) pivot position.
        let pivot = m.get_element(2, 1).unwrap();
        m.exchange_rows_and_cols(pivot, 1);
        assert_eq!(m.e(pivot).row, 1);
        assert_eq!(m.e(pivot).col, 1);
        assert_eq!(m.diag[1], Some(pivot));
        assert_eq!(m.pivots_original_row, 2);
        assert_eq!(m.pivots_original_col, 1);
    }
}
