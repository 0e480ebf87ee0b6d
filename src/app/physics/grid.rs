use glam::DVec2;

/// Uniform bucket index over slot positions. Entries are stored cell by cell
/// in one flat table, so a rebuild is a counting sort with no per-cell
/// allocation.
#[derive(Debug, Default)]
pub(in crate::app) struct SpatialGrid {
    origin: DVec2,
    cell_size: f64,
    columns: usize,
    rows: usize,
    cell_of: Vec<usize>,
    cell_start: Vec<usize>,
    entries: Vec<usize>,
}

impl SpatialGrid {
    pub(in crate::app) fn new() -> Self {
        Self::default()
    }

    /// Buckets `positions` into square cells of at least `cell_size`. The
    /// side doubles until the table holds no more than `4n + 16` cells.
    pub(in crate::app) fn rebuild(&mut self, positions: &[DVec2], cell_size: f64) {
        self.cell_of.clear();
        self.cell_start.clear();
        self.entries.clear();
        self.columns = 0;
        self.rows = 0;
        self.cell_size = cell_size;

        if positions.is_empty() {
            return;
        }

        let mut min = DVec2::splat(f64::INFINITY);
        let mut max = DVec2::splat(f64::NEG_INFINITY);
        for position in positions {
            min = min.min(*position);
            max = max.max(*position);
        }

        let budget = (positions.len() * 4 + 16) as f64;
        let span = max - min;
        if !span.is_finite() || positions.iter().any(|position| !position.is_finite()) {
            // Everything shares one cell; neighbour queries degrade to brute force.
            self.origin = DVec2::ZERO;
            self.columns = 1;
            self.rows = 1;
        } else {
            let mut side = cell_size;
            loop {
                let columns = (span.x / side).floor() + 1.0;
                let rows = (span.y / side).floor() + 1.0;
                if columns * rows <= budget {
                    self.columns = columns as usize;
                    self.rows = rows as usize;
                    break;
                }
                side *= 2.0;
            }
            self.origin = min;
            self.cell_size = side;
        }

        let cell_count = self.columns * self.rows;
        self.cell_start.resize(cell_count + 1, 0);
        for position in positions {
            let cell = self.cell_index(*position);
            self.cell_of.push(cell);
            self.cell_start[cell + 1] += 1;
        }
        for cell in 0..cell_count {
            self.cell_start[cell + 1] += self.cell_start[cell];
        }

        let mut cursor = self.cell_start[..cell_count].to_vec();
        self.entries.resize(positions.len(), 0);
        for (slot, &cell) in self.cell_of.iter().enumerate() {
            self.entries[cursor[cell]] = slot;
            cursor[cell] += 1;
        }
    }

    fn cell_index(&self, position: DVec2) -> usize {
        if self.columns == 1 && self.rows == 1 {
            return 0;
        }

        let local = (position - self.origin) / self.cell_size;
        let column = (local.x.max(0.0) as usize).min(self.columns - 1);
        let row = (local.y.max(0.0) as usize).min(self.rows - 1);
        row * self.columns + column
    }

    /// Slots sharing a cell with `slot` or sitting in one of the 8 cells
    /// around it, excluding `slot` itself.
    pub(in crate::app) fn neighbors(&self, slot: usize) -> impl Iterator<Item = usize> + '_ {
        let (columns, rows) = match self.cell_of.get(slot) {
            Some(&cell) => {
                let column = cell % self.columns;
                let row = cell / self.columns;
                (
                    column.saturating_sub(1)..=(column + 1).min(self.columns - 1),
                    row.saturating_sub(1)..=(row + 1).min(self.rows - 1),
                )
            }
            #[allow(clippy::reversed_empty_ranges)]
            None => (1..=0, 1..=0),
        };

        rows.flat_map(move |row| {
            columns
                .clone()
                .map(move |column| row * self.columns + column)
        })
        .flat_map(move |cell| {
            self.entries[self.cell_start[cell]..self.cell_start[cell + 1]]
                .iter()
                .copied()
        })
        .filter(move |&other| other != slot)
    }

    /// Effective cell side after the last rebuild.
    #[cfg(test)]
    pub(in crate::app) fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[cfg(test)]
    pub(in crate::app) fn dimensions(&self) -> (usize, usize) {
        (self.columns, self.rows)
    }

    #[cfg(test)]
    pub(in crate::app) fn len(&self) -> usize {
        self.cell_of.len()
    }
}
