//! Dense row-major cell storage.
//!
//! [`CellStore`] is the plain, unsynchronized shape of the grid. The
//! concurrent container stripes it across its lock partition for cell-level
//! work and gathers it back here whenever a structural operation needs to
//! rebuild the whole thing.

/// A `rows x cols` block of text values. Every row always holds exactly
/// `cols` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellStore {
    cols: usize,
    cells: Vec<Vec<String>>,
}

impl CellStore {
    pub fn new(rows: usize, cols: usize) -> Self {
        let cells = (0..rows).map(|_| vec![String::new(); cols]).collect();
        Self { cols, cells }
    }

    /// Build a store from ragged rows. The first row fixes the column count;
    /// shorter rows are padded with empty strings and longer rows truncated.
    pub fn from_rows<I, R, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cols = None;
        let mut cells = Vec::new();
        for row in rows {
            let mut values: Vec<String> = row.into_iter().map(Into::into).collect();
            let width = *cols.get_or_insert(values.len());
            values.resize(width, String::new());
            cells.push(values);
        }
        Self {
            cols: cols.unwrap_or(0),
            cells,
        }
    }

    /// Rebuild from row-major values; `values.len()` must equal `rows * cols`.
    pub(crate) fn from_flat(rows: usize, cols: usize, values: Vec<String>) -> Self {
        debug_assert_eq!(values.len(), rows * cols);
        if cols == 0 {
            return Self::new(rows, 0);
        }
        let mut values = values.into_iter();
        let cells = (0..rows)
            .map(|_| values.by_ref().take(cols).collect())
            .collect();
        Self { cols, cells }
    }

    pub(crate) fn into_flat(self) -> impl Iterator<Item = String> {
        self.cells.into_iter().flatten()
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns (rows, cols)
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.rows(), self.cols)
    }

    pub fn len(&self) -> usize {
        self.rows() * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.cells.get(row)?.get(col).map(String::as_str)
    }

    pub fn row(&self, row: usize) -> Option<&[String]> {
        self.cells.get(row).map(Vec::as_slice)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[String]> {
        self.cells.iter().map(Vec::as_slice)
    }

    /// Insert an empty row after `after`, or at the top when `after` is `None`.
    /// Existing rows below the insertion point shift down by one.
    pub fn with_row_inserted(mut self, after: Option<usize>) -> Self {
        let at = after.map_or(0, |row| row + 1);
        self.cells.insert(at, vec![String::new(); self.cols]);
        self
    }

    /// Insert an empty column after `after`, or at the left edge when `after`
    /// is `None`.
    pub fn with_column_inserted(mut self, after: Option<usize>) -> Self {
        let at = after.map_or(0, |col| col + 1);
        for row in &mut self.cells {
            row.insert(at, String::new());
        }
        self.cols += 1;
        self
    }
}
