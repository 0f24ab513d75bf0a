//! Dense row-major f32 arrays with explicit shapes.
//!
//! Shape bookkeeping is the main failure mode of this pipeline, so the
//! arrays carry their dimensions and all indexing goes through checked
//! row views instead of ad hoc offset math at call sites.

/// 2D array, shape `[rows, cols]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Array2 {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
}

impl Array2 {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    pub fn from_vec(data: Vec<f32>, rows: usize, cols: usize) -> Self {
        assert_eq!(data.len(), rows * cols, "Array2: data length != rows*cols");
        Self { data, rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    pub fn row(&self, i: usize) -> &[f32] {
        assert!(i < self.rows, "Array2: row {} out of {}", i, self.rows);
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f32] {
        assert!(i < self.rows, "Array2: row {} out of {}", i, self.rows);
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// 3D array, shape `[n, rows, cols]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Array3 {
    data: Vec<f32>,
    n: usize,
    rows: usize,
    cols: usize,
}

impl Array3 {
    pub fn zeros(n: usize, rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; n * rows * cols],
            n,
            rows,
            cols,
        }
    }

    pub fn from_vec(data: Vec<f32>, n: usize, rows: usize, cols: usize) -> Self {
        assert_eq!(
            data.len(),
            n * rows * cols,
            "Array3: data length != n*rows*cols"
        );
        Self { data, n, rows, cols }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.n, self.rows, self.cols]
    }

    /// All rows of sample `i`, flattened to `rows*cols`.
    pub fn slab(&self, i: usize) -> &[f32] {
        assert!(i < self.n, "Array3: sample {} out of {}", i, self.n);
        let stride = self.rows * self.cols;
        &self.data[i * stride..(i + 1) * stride]
    }

    pub fn row(&self, i: usize, r: usize) -> &[f32] {
        assert!(r < self.rows, "Array3: row {} out of {}", r, self.rows);
        let slab = self.slab(i);
        &slab[r * self.cols..(r + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize, r: usize) -> &mut [f32] {
        assert!(i < self.n, "Array3: sample {} out of {}", i, self.n);
        assert!(r < self.rows, "Array3: row {} out of {}", r, self.rows);
        let stride = self.rows * self.cols;
        let start = i * stride + r * self.cols;
        &mut self.data[start..start + self.cols]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array2_rows_are_contiguous() {
        let mut a = Array2::zeros(3, 2);
        a.row_mut(1).copy_from_slice(&[1.0, 2.0]);
        assert_eq!(a.row(0), &[0.0, 0.0]);
        assert_eq!(a.row(1), &[1.0, 2.0]);
        assert_eq!(a.data(), &[0.0, 0.0, 1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn array3_slab_and_row_agree() {
        let mut a = Array3::zeros(2, 2, 3);
        a.row_mut(1, 0).copy_from_slice(&[1.0, 2.0, 3.0]);
        a.row_mut(1, 1).copy_from_slice(&[4.0, 5.0, 6.0]);
        assert_eq!(a.slab(1), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(a.row(1, 1), &[4.0, 5.0, 6.0]);
        assert_eq!(a.slab(0), &[0.0; 6]);
    }

    #[test]
    #[should_panic]
    fn from_vec_rejects_bad_length() {
        let _ = Array2::from_vec(vec![0.0; 5], 2, 3);
    }
}
