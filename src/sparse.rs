//! Compressed sparse row matrices and the memory-bounded triple accumulator.
//!
//! Co-occurrence counting emits a stream of `(row, col, weight)` triples whose
//! raw volume can dwarf the final matrix. `CooBuilder` buffers triples up to a
//! byte budget, compacts each full buffer into a partial `CsrMatrix`, and sums
//! the partials, so peak memory tracks the budget plus the compacted result
//! rather than the triple stream.

use serde::{Deserialize, Serialize};

/// Bytes occupied by one buffered triple: u32 row + u32 col + f64 value.
pub const TRIPLE_BYTES: usize = 16;

/// A compressed sparse row matrix of `f64` weights.
///
/// Entries within each row are sorted by column and unique. Positions not
/// stored are implicitly zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    /// Row start offsets into `indices`/`data`; length `n_rows + 1`.
    indptr: Vec<usize>,
    /// Column indices of stored entries (sorted within each row).
    indices: Vec<u32>,
    /// Stored weights (parallel to `indices`).
    data: Vec<f64>,
}

impl CsrMatrix {
    /// Create an empty matrix of the given shape.
    #[must_use]
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            indptr: vec![0; n_rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Build from unordered `(row, col, value)` triples.
    ///
    /// Duplicate coordinates are summed in their order of appearance; exact
    /// zeros (input or resulting from summation) are not stored.
    #[must_use]
    pub fn from_triples(n_rows: usize, n_cols: usize, triples: &[(u32, u32, f64)]) -> Self {
        let mut order: Vec<usize> = (0..triples.len()).collect();
        // Stable sort keeps duplicates in emission order, so the summation
        // order does not depend on how the triples were batched.
        order.sort_by_key(|&i| (triples[i].0, triples[i].1));

        let mut indptr = vec![0usize; n_rows + 1];
        let mut indices = Vec::new();
        let mut data = Vec::new();

        let mut iter = order.into_iter().map(|i| triples[i]).peekable();
        while let Some((r, c, v)) = iter.next() {
            let mut sum = v;
            while let Some(&(nr, nc, nv)) = iter.peek() {
                if nr == r && nc == c {
                    sum += nv;
                    iter.next();
                } else {
                    break;
                }
            }
            if sum != 0.0 {
                indptr[r as usize + 1] += 1;
                indices.push(c);
                data.push(sum);
            }
        }
        for i in 0..n_rows {
            indptr[i + 1] += indptr[i];
        }

        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        }
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored (non-zero) entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Value at `(row, col)`, zero when not stored.
    #[must_use]
    pub fn get(&self, row: usize, col: u32) -> f64 {
        let (cols, vals) = self.row(row);
        match cols.binary_search(&col) {
            Ok(i) => vals[i],
            Err(_) => 0.0,
        }
    }

    /// Column indices and values of one row.
    #[must_use]
    pub fn row(&self, row: usize) -> (&[u32], &[f64]) {
        let lo = self.indptr[row];
        let hi = self.indptr[row + 1];
        (&self.indices[lo..hi], &self.data[lo..hi])
    }

    /// Iterate all stored entries as `(row, col, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32, f64)> + '_ {
        (0..self.n_rows).flat_map(move |r| {
            let (cols, vals) = self.row(r);
            cols.iter().zip(vals).map(move |(&c, &v)| (r, c, v))
        })
    }

    /// Elementwise sum of two matrices of equal shape.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        debug_assert_eq!(self.n_rows, other.n_rows);
        debug_assert_eq!(self.n_cols, other.n_cols);

        let mut indptr = Vec::with_capacity(self.n_rows + 1);
        indptr.push(0);
        let mut indices = Vec::with_capacity(self.nnz().max(other.nnz()));
        let mut data = Vec::with_capacity(indices.capacity());

        for r in 0..self.n_rows {
            let (ac, av) = self.row(r);
            let (bc, bv) = other.row(r);
            let (mut i, mut j) = (0, 0);
            while i < ac.len() || j < bc.len() {
                let (c, v) = if j >= bc.len() || (i < ac.len() && ac[i] < bc[j]) {
                    let out = (ac[i], av[i]);
                    i += 1;
                    out
                } else if i >= ac.len() || bc[j] < ac[i] {
                    let out = (bc[j], bv[j]);
                    j += 1;
                    out
                } else {
                    let out = (ac[i], av[i] + bv[j]);
                    i += 1;
                    j += 1;
                    out
                };
                if v != 0.0 {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }

        Self {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            indptr,
            indices,
            data,
        }
    }

    /// Transposed copy.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut indptr = vec![0usize; self.n_cols + 1];
        for &c in &self.indices {
            indptr[c as usize + 1] += 1;
        }
        for i in 0..self.n_cols {
            indptr[i + 1] += indptr[i];
        }

        let mut next = indptr.clone();
        let mut indices = vec![0u32; self.nnz()];
        let mut data = vec![0.0f64; self.nnz()];
        for (r, c, v) in self.iter() {
            let slot = next[c as usize];
            indices[slot] = u32::try_from(r).unwrap_or(u32::MAX);
            data[slot] = v;
            next[c as usize] += 1;
        }

        Self {
            n_rows: self.n_cols,
            n_cols: self.n_rows,
            indptr,
            indices,
            data,
        }
    }

    /// Horizontally concatenate blocks with equal row counts.
    #[must_use]
    pub fn hstack(blocks: &[Self]) -> Self {
        let n_rows = blocks.first().map_or(0, |b| b.n_rows);
        debug_assert!(blocks.iter().all(|b| b.n_rows == n_rows));
        let n_cols = blocks.iter().map(|b| b.n_cols).sum();

        let mut indptr = Vec::with_capacity(n_rows + 1);
        indptr.push(0);
        let mut indices = Vec::with_capacity(blocks.iter().map(Self::nnz).sum());
        let mut data = Vec::with_capacity(indices.capacity());

        for r in 0..n_rows {
            let mut shift = 0u32;
            for block in blocks {
                let (cols, vals) = block.row(r);
                for (&c, &v) in cols.iter().zip(vals) {
                    indices.push(c + shift);
                    data.push(v);
                }
                shift += u32::try_from(block.n_cols).unwrap_or(u32::MAX);
            }
            indptr.push(indices.len());
        }

        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        }
    }

    /// L1-normalize each row; rows summing to zero are left untouched.
    #[must_use]
    pub fn l1_normalize_rows(&self) -> Self {
        let mut out = self.clone();
        for r in 0..out.n_rows {
            let lo = out.indptr[r];
            let hi = out.indptr[r + 1];
            let total: f64 = out.data[lo..hi].iter().map(|v| v.abs()).sum();
            if total > 0.0 {
                for v in &mut out.data[lo..hi] {
                    *v /= total;
                }
            }
        }
        out
    }

    /// Keep only entries strictly greater than `threshold`.
    #[must_use]
    pub fn retain_greater(&self, threshold: f64) -> Self {
        let mut indptr = Vec::with_capacity(self.n_rows + 1);
        indptr.push(0);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        for r in 0..self.n_rows {
            let (cols, vals) = self.row(r);
            for (&c, &v) in cols.iter().zip(vals) {
                if v > threshold {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }
        Self {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            indptr,
            indices,
            data,
        }
    }

    /// Zero out one row and one column (used for mask nullification).
    #[must_use]
    pub fn zero_row_col(&self, idx: u32) -> Self {
        let mut indptr = Vec::with_capacity(self.n_rows + 1);
        indptr.push(0);
        let mut indices = Vec::with_capacity(self.nnz());
        let mut data = Vec::with_capacity(self.nnz());
        for r in 0..self.n_rows {
            if r != idx as usize {
                let (cols, vals) = self.row(r);
                for (&c, &v) in cols.iter().zip(vals) {
                    if c != idx {
                        indices.push(c);
                        data.push(v);
                    }
                }
            }
            indptr.push(indices.len());
        }
        Self {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            indptr,
            indices,
            data,
        }
    }

    /// Dense copy, row-major. Intended for tests and small matrices.
    #[must_use]
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let mut dense = vec![vec![0.0; self.n_cols]; self.n_rows];
        for (r, c, v) in self.iter() {
            dense[r][c as usize] = v;
        }
        dense
    }

    /// Same shape, same sparsity pattern, values within `tol` of each other.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.n_rows == other.n_rows
            && self.n_cols == other.n_cols
            && self.indptr == other.indptr
            && self.indices == other.indices
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| (a - b).abs() <= tol)
    }
}

/// Memory-bounded coordinate-format accumulator.
///
/// Triples are buffered until the configured byte budget is reached, then
/// compacted into a partial `CsrMatrix` and merged into the running sum.
#[derive(Debug)]
pub struct CooBuilder {
    n_rows: usize,
    n_cols: usize,
    capacity: usize,
    buffer: Vec<(u32, u32, f64)>,
    merged: CsrMatrix,
    flushes: usize,
}

impl CooBuilder {
    /// `budget_bytes` bounds the triple buffer; it never affects the result.
    #[must_use]
    pub fn new(n_rows: usize, n_cols: usize, budget_bytes: usize) -> Self {
        let capacity = (budget_bytes / TRIPLE_BYTES).max(16);
        Self {
            n_rows,
            n_cols,
            capacity,
            buffer: Vec::with_capacity(capacity.min(1 << 20)),
            merged: CsrMatrix::zeros(n_rows, n_cols),
            flushes: 0,
        }
    }

    pub fn push(&mut self, row: u32, col: u32, value: f64) {
        if self.buffer.len() >= self.capacity {
            self.flush();
        }
        self.buffer.push((row, col, value));
    }

    pub fn extend(&mut self, triples: &[(u32, u32, f64)]) {
        for &(r, c, v) in triples {
            self.push(r, c, v);
        }
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let partial = CsrMatrix::from_triples(self.n_rows, self.n_cols, &self.buffer);
        self.merged = self.merged.add(&partial);
        self.buffer.clear();
        self.flushes += 1;
    }

    /// Number of compactions performed so far.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    #[must_use]
    pub fn finish(mut self) -> CsrMatrix {
        self.flush();
        self.merged
    }
}
