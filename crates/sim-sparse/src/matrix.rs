//! The sparse matrix: element storage, index translation, and lifecycle.
//!
//! # Storage layout
//!
//! Nonzeros live in an arena (`Vec<Element>`) and are threaded through two
//! singly linked orderings: each column chain starts at `first_in_col[j]` and
//! is sorted by ascending row; each row chain starts at `first_in_row[i]` and
//! is sorted by ascending column. Row chains are built lazily by
//! [`Matrix::link_rows`] the first time an operation needs row traversal.
//! `diag[i]` shortcuts to the (i, i) element when present.
//!
//! All indices are 1-based; index 0 is the ground sentinel. `get_element`
//! with a zero row or column returns [`ElemId::GROUND`], an element that is
//! linked into no chain, so stamping into it has no effect on the matrix.
//!
//! After factorization the same nodes store L (strictly lower) and U
//! (strictly upper, unit diagonal implied); the diagonal element holds the
//! reciprocal of the pivot so the triangular sweeps multiply instead of
//! divide.
//!
//! # Index translation
//!
//! With `Config::translate` set, callers stamp with arbitrary external
//! indices. The first reference to an external index allocates the next
//! internal slot and records the mapping in both directions; row and column
//! axes share the assignment so external index e names the same internal
//! axis in both dimensions.

use num_complex::Complex64;

use crate::cmplx;
use crate::config::Config;
use crate::element::{Admittance, ColLink, ElemId, Element, RowLink};
use crate::error::Error;
use crate::pivot::PivotStrategy;

/// A square sparse matrix holding both the stamped values and, after
/// factorization, the LU factors in place.
pub struct Matrix {
    pub(crate) cfg: Config,
    /// Internal size N.
    pub(crate) size: usize,
    /// Largest external index seen (translation mode).
    pub(crate) ext_size: usize,
    /// Internal slots assigned so far (translation mode).
    pub(crate) current_size: usize,
    /// Complex arithmetic selected for this matrix.
    pub(crate) complex: bool,

    pub(crate) elems: Vec<Element>,
    pub(crate) first_in_row: Vec<Option<ElemId>>,
    pub(crate) first_in_col: Vec<Option<ElemId>>,
    pub(crate) diag: Vec<Option<ElemId>>,

    /// Scratch vector for gathers, triangular sweeps, and verification.
    /// Length `size + 1` for real matrices, `2 * (size + 1)` for complex.
    pub(crate) intermediate: Vec<f64>,

    pub(crate) markowitz_row: Vec<i64>,
    pub(crate) markowitz_col: Vec<i64>,
    /// Clamped row*col products; slot `size + 1` is scratch for the
    /// singleton and quick-diagonal scans.
    pub(crate) markowitz_prod: Vec<i64>,
    /// Cached by the roundoff bound; -1 until first computed.
    pub(crate) max_row_count_in_lower_tri: i64,

    pub(crate) rel_threshold: f64,
    pub(crate) abs_threshold: f64,

    pub(crate) needs_ordering: bool,
    pub(crate) interchanges_odd: bool,
    pub(crate) partitioned: bool,
    pub(crate) factored: bool,
    pub(crate) reordered: bool,
    pub(crate) rows_linked: bool,

    pub(crate) singular_row: usize,
    pub(crate) singular_col: usize,

    pub(crate) elements: usize,
    pub(crate) fillins: usize,
    pub(crate) singletons: i64,

    pub(crate) pivots_original_row: usize,
    pub(crate) pivots_original_col: usize,
    pub(crate) pivot_selection: Option<PivotStrategy>,

    pub(crate) int_to_ext_row: Vec<usize>,
    pub(crate) int_to_ext_col: Vec<usize>,
    pub(crate) ext_to_int_row: Vec<Option<usize>>,
    pub(crate) ext_to_int_col: Vec<Option<usize>>,

    pub(crate) do_real_direct: Vec<bool>,
    pub(crate) do_complex_direct: Vec<bool>,
    pub(crate) operation_count: usize,
}

impl Matrix {
    /// Creates a matrix of the given (internal) size.
    ///
    /// The size must be positive. All chains start empty; elements are
    /// allocated on first reference through [`Matrix::get_element`] or
    /// [`Matrix::get_admittance`].
    pub fn new(size: usize, cfg: Config) -> Result<Self, Error> {
        if size == 0 {
            return Err(Error::InvalidSize { size });
        }

        let n2 = size + 2;
        let mut m = Self {
            complex: cfg.complex,
            rel_threshold: cfg.default_threshold,
            abs_threshold: 0.0,
            cfg,
            size,
            ext_size: size,
            current_size: 0,
            elems: vec![Element::new(0, 0)],
            first_in_row: vec![None; n2],
            first_in_col: vec![None; n2],
            diag: vec![None; n2],
            intermediate: Vec::new(),
            markowitz_row: vec![0; n2],
            markowitz_col: vec![0; n2],
            markowitz_prod: vec![0; n2],
            max_row_count_in_lower_tri: -1,
            needs_ordering: true,
            interchanges_odd: false,
            partitioned: false,
            factored: false,
            reordered: false,
            rows_linked: false,
            singular_row: 0,
            singular_col: 0,
            elements: 0,
            fillins: 0,
            singletons: 0,
            pivots_original_row: 0,
            pivots_original_col: 0,
            pivot_selection: None,
            int_to_ext_row: (0..n2).collect(),
            int_to_ext_col: (0..n2).collect(),
            ext_to_int_row: vec![None; n2],
            ext_to_int_col: vec![None; n2],
            do_real_direct: vec![false; n2],
            do_complex_direct: vec![false; n2],
            operation_count: 0,
        };
        m.create_internal_vectors();
        Ok(m)
    }

    // ------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------

    #[inline]
    pub(crate) fn e(&self, id: ElemId) -> &Element {
        &self.elems[id.idx()]
    }

    #[inline]
    pub(crate) fn e_mut(&mut self, id: ElemId) -> &mut Element {
        &mut self.elems[id.idx()]
    }

    #[inline]
    pub(crate) fn col_next(&self, link: ColLink) -> Option<ElemId> {
        match link {
            ColLink::Head(c) => self.first_in_col[c],
            ColLink::After(id) => self.e(id).next_in_col,
        }
    }

    #[inline]
    pub(crate) fn set_col_next(&mut self, link: ColLink, to: Option<ElemId>) {
        match link {
            ColLink::Head(c) => self.first_in_col[c] = to,
            ColLink::After(id) => self.e_mut(id).next_in_col = to,
        }
    }

    #[inline]
    pub(crate) fn row_next(&self, link: RowLink) -> Option<ElemId> {
        match link {
            RowLink::Head(r) => self.first_in_row[r],
            RowLink::After(id) => self.e(id).next_in_row,
        }
    }

    #[inline]
    pub(crate) fn set_row_next(&mut self, link: RowLink, to: Option<ElemId>) {
        match link {
            RowLink::Head(r) => self.first_in_row[r] = to,
            RowLink::After(id) => self.e_mut(id).next_in_row = to,
        }
    }

    /// Pivot magnitude of an element: `|re| + |im|` for complex matrices,
    /// `|re|` for real ones.
    #[inline]
    pub(crate) fn element_mag(&self, id: ElemId) -> f64 {
        let e = self.e(id);
        if self.complex {
            cmplx::one_norm(e.value())
        } else {
            e.real.abs()
        }
    }

    // ------------------------------------------------------------------
    // Element values
    // ------------------------------------------------------------------

    /// Current value of an element.
    pub fn value(&self, id: ElemId) -> Complex64 {
        self.e(id).value()
    }

    /// Accumulates into the real part.
    pub fn add_real(&mut self, id: ElemId, v: f64) {
        self.e_mut(id).real += v;
    }

    /// Accumulates into the imaginary part.
    pub fn add_imag(&mut self, id: ElemId, v: f64) {
        self.e_mut(id).imag += v;
    }

    /// Accumulates a complex value.
    pub fn add_complex(&mut self, id: ElemId, v: Complex64) {
        let e = self.e_mut(id);
        e.real += v.re;
        e.imag += v.im;
    }

    /// Overwrites the real part.
    pub fn set_real(&mut self, id: ElemId, v: f64) {
        self.e_mut(id).real = v;
    }

    /// Overwrites both parts.
    pub fn set_complex(&mut self, id: ElemId, v: Complex64) {
        self.e_mut(id).set_value(v);
    }

    /// Records the baseline `initialize` restores for this element.
    pub fn set_init_info(&mut self, id: ElemId, re: f64, im: f64) {
        self.e_mut(id).init_info = Some((re, im));
    }

    /// The recorded baseline, if any.
    pub fn init_info(&self, id: ElemId) -> Option<(f64, f64)> {
        self.e(id).init_info
    }

    // ------------------------------------------------------------------
    // Element lookup and creation
    // ------------------------------------------------------------------

    /// Returns the element at (row, col), creating it in sorted position if
    /// absent. Row or column 0 names ground and yields the discard sentinel.
    ///
    /// With translation enabled the indices are external and may extend the
    /// maps; otherwise an index past the current size grows the matrix when
    /// it is expandable and fails when it is not.
    pub fn get_element(&mut self, row: usize, col: usize) -> Result<ElemId, Error> {
        if row == 0 || col == 0 {
            return Ok(ElemId::GROUND);
        }

        let (row, col) = if self.cfg.translate {
            self.translate(row, col)?
        } else {
            let top = row.max(col);
            if top > self.size {
                if !self.cfg.expandable {
                    return Err(Error::SizeFixed { index: top, size: self.size });
                }
                self.enlarge(top);
            }
            (row, col)
        };

        if row == col {
            if let Some(d) = self.diag[row] {
                return Ok(d);
            }
        }

        Ok(self.create_element(row, col, RowLink::Head(row), ColLink::Head(col), false))
    }

    /// Maps an external (row, col) pair to internal indices, allocating new
    /// internal slots for indices seen for the first time.
    pub(crate) fn translate(&mut self, ext_row: usize, ext_col: usize) -> Result<(usize, usize), Error> {
        let top = ext_row.max(ext_col);
        self.ensure_ext_maps(top);
        if top > self.ext_size {
            self.ext_size = top;
        }

        let int_row = match self.ext_to_int_row[ext_row] {
            Some(i) => i,
            None => self.assign_internal(ext_row)?,
        };
        let int_col = match self.ext_to_int_col[ext_col] {
            Some(i) => i,
            None => self.assign_internal(ext_col)?,
        };
        Ok((int_row, int_col))
    }

    /// Binds external index `ext` to the next internal slot on both axes.
    fn assign_internal(&mut self, ext: usize) -> Result<usize, Error> {
        let slot = self.current_size + 1;
        if slot > self.size {
            if !self.cfg.expandable {
                return Err(Error::SizeFixed { index: ext, size: self.size });
            }
            self.enlarge(slot);
        }
        self.current_size = slot;
        self.ext_to_int_row[ext] = Some(slot);
        self.ext_to_int_col[ext] = Some(slot);
        self.int_to_ext_row[slot] = ext;
        self.int_to_ext_col[slot] = ext;
        Ok(slot)
    }

    fn ensure_ext_maps(&mut self, ext: usize) {
        if ext + 1 > self.ext_to_int_row.len() {
            self.ext_to_int_row.resize(ext + 1, None);
            self.ext_to_int_col.resize(ext + 1, None);
        }
    }

    /// Grows every size-indexed array to hold `new_size` rows and columns.
    /// A no-op when the matrix is already large enough.
    pub(crate) fn enlarge(&mut self, new_size: usize) {
        if new_size <= self.size {
            return;
        }
        let n2 = new_size + 2;
        self.first_in_row.resize(n2, None);
        self.first_in_col.resize(n2, None);
        self.diag.resize(n2, None);
        self.markowitz_row.resize(n2, 0);
        self.markowitz_col.resize(n2, 0);
        self.markowitz_prod.resize(n2, 0);
        self.do_real_direct.resize(n2, false);
        self.do_complex_direct.resize(n2, false);

        let old_len = self.int_to_ext_row.len();
        self.int_to_ext_row.resize(n2, 0);
        self.int_to_ext_col.resize(n2, 0);
        for i in old_len..n2 {
            self.int_to_ext_row[i] = i;
            self.int_to_ext_col[i] = i;
        }
        self.ensure_ext_maps(new_size);

        self.size = new_size;
        if self.ext_size < new_size {
            self.ext_size = new_size;
        }
        self.create_internal_vectors();
    }

    pub(crate) fn create_internal_vectors(&mut self) {
        let len = if self.complex {
            2 * (self.size + 1)
        } else {
            self.size + 1
        };
        if self.intermediate.len() < len {
            self.intermediate = vec![0.0; len];
        }
    }

    /// Creates and inserts the element at (row, col) into both orderings,
    /// walking forward from the given link slots. Returns the existing
    /// element when the position is already occupied.
    ///
    /// `fillin` distinguishes fill-ins created during elimination, which
    /// must keep the Markowitz state consistent, from structural stamps,
    /// which invalidate the ordering instead.
    pub(crate) fn create_element(
        &mut self,
        row: usize,
        col: usize,
        row_start: RowLink,
        col_start: ColLink,
        fillin: bool,
    ) -> ElemId {
        let mut prev = col_start;
        let mut cur = self.col_next(prev);
        while let Some(id) = cur {
            let e = self.e(id);
            if e.row >= row {
                break;
            }
            prev = ColLink::After(id);
            cur = e.next_in_col;
        }
        if let Some(id) = cur {
            if self.e(id).row == row {
                return id;
            }
        }

        if fillin {
            self.fillins += 1;
            self.markowitz_row[row] += 1;
            self.markowitz_col[col] += 1;
            self.markowitz_prod[row] =
                crate::markowitz::clamped_product(self.markowitz_row[row], self.markowitz_col[row]);
            self.markowitz_prod[col] =
                crate::markowitz::clamped_product(self.markowitz_row[col], self.markowitz_col[col]);
            if self.markowitz_row[row] == 1 && self.markowitz_col[row] != 0 {
                self.singletons -= 1;
            }
            if self.markowitz_row[col] != 0 && self.markowitz_col[col] == 1 {
                self.singletons -= 1;
            }
        } else {
            self.needs_ordering = true;
        }
        self.elements += 1;

        let new_id = ElemId(self.elems.len() as u32);
        let mut el = Element::new(row, col);
        el.next_in_col = cur;
        self.elems.push(el);
        self.set_col_next(prev, Some(new_id));

        if self.rows_linked {
            let mut prev = row_start;
            let mut cur = self.row_next(prev);
            while let Some(id) = cur {
                let e = self.e(id);
                if e.col >= col {
                    break;
                }
                prev = RowLink::After(id);
                cur = e.next_in_row;
            }
            self.e_mut(new_id).next_in_row = cur;
            self.set_row_next(prev, Some(new_id));
        }

        if row == col {
            self.diag[row] = Some(new_id);
        }
        new_id
    }

    /// Fetches the four elements a two-terminal admittance between `node1`
    /// and `node2` stamps into, creating them as needed. With `node1` at
    /// ground the first two template slots are swapped so `element1` is the
    /// non-ground diagonal.
    pub fn get_admittance(&mut self, node1: usize, node2: usize) -> Result<Admittance, Error> {
        let mut quad = Admittance {
            element1: self.get_element(node1, node1)?,
            element2: self.get_element(node2, node2)?,
            element3_negated: self.get_element(node2, node1)?,
            element4_negated: self.get_element(node1, node2)?,
        };
        if node1 == 0 {
            std::mem::swap(&mut quad.element1, &mut quad.element2);
        }
        Ok(quad)
    }

    /// Stamps a real admittance through a quad template: +v on the two
    /// diagonals, -v on the two off-diagonals.
    pub fn add_quad_real(&mut self, quad: &Admittance, v: f64) {
        self.add_real(quad.element1, v);
        self.add_real(quad.element2, v);
        self.add_real(quad.element3_negated, -v);
        self.add_real(quad.element4_negated, -v);
    }

    /// Stamps an imaginary admittance through a quad template.
    pub fn add_quad_imag(&mut self, quad: &Admittance, v: f64) {
        self.add_imag(quad.element1, v);
        self.add_imag(quad.element2, v);
        self.add_imag(quad.element3_negated, -v);
        self.add_imag(quad.element4_negated, -v);
    }

    /// Stamps a complex admittance through a quad template.
    pub fn add_quad_complex(&mut self, quad: &Admittance, v: Complex64) {
        self.add_quad_real(quad, v.re);
        self.add_quad_imag(quad, v.im);
    }

    // ------------------------------------------------------------------
    // Row linkage
    // ------------------------------------------------------------------

    /// Builds the row chains from the column chains. Processing columns in
    /// descending order and prepending leaves every row chain sorted by
    /// ascending column. Also refreshes each element's column index, which
    /// can be stale after an MNA column swap.
    pub(crate) fn link_rows(&mut self) {
        for r in 1..=self.size {
            self.first_in_row[r] = None;
        }
        for col in (1..=self.size).rev() {
            let mut p = self.first_in_col[col];
            while let Some(id) = p {
                let row;
                {
                    let e = self.e_mut(id);
                    e.col = col;
                    row = e.row;
                    p = e.next_in_col;
                }
                let head = self.first_in_row[row];
                self.e_mut(id).next_in_row = head;
                self.first_in_row[row] = Some(id);
            }
        }
        self.rows_linked = true;
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Zeroes every element value. The element graph, ordering, and index
    /// maps are preserved.
    pub fn clear(&mut self) {
        for col in (1..=self.size).rev() {
            let mut p = self.first_in_col[col];
            while let Some(id) = p {
                let e = self.e_mut(id);
                e.real = 0.0;
                e.imag = 0.0;
                p = e.next_in_col;
            }
        }
        self.elems[0].real = 0.0;
        self.elems[0].imag = 0.0;
        self.factored = false;
        self.singular_row = 0;
        self.singular_col = 0;
    }

    /// Resets every element to its recorded init-info baseline, or to zero
    /// when none was recorded. The element graph is preserved.
    pub fn initialize(&mut self) {
        for col in 1..=self.size {
            let mut p = self.first_in_col[col];
            while let Some(id) = p {
                let e = self.e_mut(id);
                match e.init_info {
                    Some((re, im)) => {
                        e.real = re;
                        e.imag = im;
                    }
                    None => {
                        e.real = 0.0;
                        e.imag = 0.0;
                    }
                }
                p = e.next_in_col;
            }
        }
        self.elems[0].real = 0.0;
        self.elems[0].imag = 0.0;
        self.factored = false;
        self.singular_row = 0;
        self.singular_col = 0;
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Number of elements created, fill-ins included, the ground sentinel
    /// excluded.
    pub fn element_count(&self) -> usize {
        self.elements
    }

    /// Number of fill-ins created by elimination.
    pub fn fillin_count(&self) -> usize {
        self.fillins
    }

    /// Matrix size. With translation active, `external` selects the largest
    /// external index instead of the internal size.
    pub fn size(&self, external: bool) -> usize {
        if self.cfg.translate && external {
            self.ext_size
        } else {
            self.size
        }
    }

    /// Row witness from the last singularity, 0 if none.
    pub fn singular_row(&self) -> usize {
        self.singular_row
    }

    /// Column witness from the last singularity, 0 if none.
    pub fn singular_col(&self) -> usize {
        self.singular_col
    }

    /// True once a factorization has completed and not been invalidated.
    pub fn is_factored(&self) -> bool {
        self.factored
    }

    /// Strategy that produced the most recent pivot, if any ordering ran.
    pub fn pivot_selection_method(&self) -> Option<PivotStrategy> {
        self.pivot_selection
    }

    /// Inner-loop operation count collected by `partition` under
    /// [`Annotate::Full`](crate::Annotate::Full).
    pub fn operation_count(&self) -> usize {
        self.operation_count
    }

    /// The configuration this matrix was created with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn real_matrix(n: usize) -> Matrix {
        let cfg = Config {
            translate: false,
            expandable: false,
            ..Config::real_only()
        };
        Matrix::new(n, cfg).unwrap()
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(matches!(
            Matrix::new(0, Config::default()),
            Err(Error::InvalidSize { size: 0 })
        ));
    }

    #[test]
    fn ground_writes_are_discarded() {
        let mut m = real_matrix(2);
        let g = m.get_element(0, 1).unwrap();
        assert!(g.is_ground());
        m.add_real(g, 42.0);
        let g2 = m.get_element(1, 0).unwrap();
        assert!(g2.is_ground());
        assert_eq!(m.element_count(), 0);
        // Matrix values untouched: stamping a real element still starts at 0.
        let a = m.get_element(1, 1).unwrap();
        assert_eq!(m.value(a).re, 0.0);
    }

    #[test]
    fn get_element_is_idempotent() {
        let mut m = real_matrix(3);
        let a = m.get_element(2, 3).unwrap();
        let b = m.get_element(2, 3).unwrap();
        assert_eq!(a, b);
        assert_eq!(m.element_count(), 1);
    }

    #[test]
    fn column_chains_stay_sorted() {
        let mut m = real_matrix(4);
        for &r in &[3, 1, 4, 2] {
            m.get_element(r, 2).unwrap();
        }
        let mut rows = Vec::new();
        let mut p = m.first_in_col[2];
        while let Some(id) = p {
            rows.push(m.e(id).row);
            p = m.e(id).next_in_col;
        }
        assert_eq!(rows, vec![1, 2, 3, 4]);
    }

    #[test]
    fn row_chains_sorted_after_linking() {
        let mut m = real_matrix(4);
        for &(r, c) in &[(2, 4), (2, 1), (2, 3), (1, 2), (3, 2)] {
            m.get_element(r, c).unwrap();
        }
        m.link_rows();
        let mut cols = Vec::new();
        let mut p = m.first_in_row[2];
        while let Some(id) = p {
            cols.push(m.e(id).col);
            p = m.e(id).next_in_row;
        }
        assert_eq!(cols, vec![1, 3, 4]);
    }

    #[test]
    fn fixed_size_rejects_out_of_range() {
        let mut m = real_matrix(2);
        assert!(matches!(
            m.get_element(3, 1),
            Err(Error::SizeFixed { index: 3, size: 2 })
        ));
    }

    #[test]
    fn expandable_grows_on_demand() {
        let cfg = Config {
            translate: false,
            ..Config::real_only()
        };
        let mut m = Matrix::new(2, cfg).unwrap();
        m.get_element(5, 5).unwrap();
        assert_eq!(m.size(false), 5);
        assert!(m.diag[5].is_some());
    }

    #[test]
    fn translation_assigns_slots_in_first_seen_order() {
        let mut m = Matrix::new(4, Config::real_only()).unwrap();
        m.get_element(7, 7).unwrap();
        m.get_element(3, 7).unwrap();
        assert_eq!(m.ext_to_int_row[7], Some(1));
        assert_eq!(m.ext_to_int_row[3], Some(2));
        assert_eq!(m.int_to_ext_row[1], 7);
        assert_eq!(m.int_to_ext_col[2], 3);
        assert_eq!(m.size(true), 7);
    }

    #[test]
    fn clear_zeroes_but_keeps_graph() {
        let mut m = real_matrix(2);
        let a = m.get_element(1, 1).unwrap();
        m.add_real(a, 5.0);
        m.clear();
        assert_eq!(m.value(a).re, 0.0);
        assert_eq!(m.element_count(), 1);
    }

    #[test]
    fn initialize_restores_baselines() {
        let mut m = real_matrix(2);
        let a = m.get_element(1, 1).unwrap();
        let b = m.get_element(2, 2).unwrap();
        m.set_init_info(a, 2.5, 0.0);
        m.add_real(a, 100.0);
        m.add_real(b, 7.0);
        m.initialize();
        assert_eq!(m.value(a).re, 2.5);
        assert_eq!(m.value(b).re, 0.0);
    }

    #[test]
    fn admittance_quad_swaps_for_ground() {
        let mut m = Matrix::new(3, Config::real_only()).unwrap();
        let q = m.get_admittance(0, 2).unwrap();
        assert!(!q.element1.is_ground());
        assert!(q.element2.is_ground());
        m.add_quad_real(&q, 0.5);
        // Only the non-ground diagonal holds the stamp.
        assert_eq!(m.value(q.element1).re, 0.5);
    }
}
