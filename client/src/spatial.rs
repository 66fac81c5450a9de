use chronopolis_shared::DerivedFeature;

const GRID_COLS: usize = 50;
const GRID_ROWS: usize = 50;

/// A flat 2D grid over world space for cheap point hit-testing.
/// Rebuilt when the per-year feature set changes.
pub struct FeatureIndex {
    cells: Vec<Vec<usize>>,
    xs: Vec<f64>,
    ys: Vec<f64>,
    min_x: f64,
    min_y: f64,
    cell_w: f64,
    cell_h: f64,
}

impl FeatureIndex {
    pub fn build(features: &[DerivedFeature]) -> Self {
        if features.is_empty() {
            return Self {
                cells: Vec::new(),
                xs: Vec::new(),
                ys: Vec::new(),
                min_x: 0.0,
                min_y: 0.0,
                cell_w: 1.0,
                cell_h: 1.0,
            };
        }

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for f in features {
            min_x = min_x.min(f.geometry.0);
            min_y = min_y.min(f.geometry.1);
            max_x = max_x.max(f.geometry.0);
            max_y = max_y.max(f.geometry.1);
        }

        // Pad so single-point and degenerate extents still get real cells.
        min_x -= 1.0;
        min_y -= 1.0;
        max_x += 1.0;
        max_y += 1.0;

        let cell_w = (max_x - min_x) / GRID_COLS as f64;
        let cell_h = (max_y - min_y) / GRID_ROWS as f64;

        let mut cells = vec![Vec::new(); GRID_COLS * GRID_ROWS];
        let mut xs = Vec::with_capacity(features.len());
        let mut ys = Vec::with_capacity(features.len());

        for (idx, f) in features.iter().enumerate() {
            let (x, y) = f.geometry;
            xs.push(x);
            ys.push(y);

            let col = (((x - min_x) / cell_w) as usize).min(GRID_COLS - 1);
            let row = (((y - min_y) / cell_h) as usize).min(GRID_ROWS - 1);
            cells[row * GRID_COLS + col].push(idx);
        }

        Self {
            cells,
            xs,
            ys,
            min_x,
            min_y,
            cell_w,
            cell_h,
        }
    }

    /// Index of the nearest feature within `radius` world units of the query
    /// point, or `None`.
    pub fn find_within(&self, wx: f64, wy: f64, radius: f64) -> Option<usize> {
        if self.cells.is_empty() {
            return None;
        }

        let col_lo = (((wx - radius - self.min_x) / self.cell_w).floor()).max(0.0) as usize;
        let col_hi =
            ((((wx + radius - self.min_x) / self.cell_w).floor()) as usize).min(GRID_COLS - 1);
        let row_lo = (((wy - radius - self.min_y) / self.cell_h).floor()).max(0.0) as usize;
        let row_hi =
            ((((wy + radius - self.min_y) / self.cell_h).floor()) as usize).min(GRID_ROWS - 1);
        if col_lo > col_hi || row_lo > row_hi {
            return None;
        }

        let radius_sq = radius * radius;
        let mut best: Option<(usize, f64)> = None;
        for row in row_lo..=row_hi {
            for col in col_lo..=col_hi {
                for &idx in &self.cells[row * GRID_COLS + col] {
                    let dx = self.xs[idx] - wx;
                    let dy = self.ys[idx] - wy;
                    let dist_sq = dx * dx + dy * dy;
                    if dist_sq <= radius_sq && best.is_none_or(|(_, d)| dist_sq < d) {
                        best = Some((idx, dist_sq));
                    }
                }
            }
        }
        best.map(|(idx, _)| idx)
    }
}
