use geo::Coord;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::bucket::column_boundaries;

/// Pixel distance within which a `RemoveDivider` click matches an existing
/// divider. Measured in page-render space, not display space.
pub const DIVIDER_HIT_TOLERANCE: f32 = 8.0;

/// Calibrated pixel boundaries for one document template. All coordinates are
/// in the rendered-page space of the template at a fixed scale factor; the
/// same layout is reused unmodified for every file in a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub header_top: Option<f32>,
    pub header_bottom: Option<f32>,
    pub table_bottom: Option<f32>,
    pub left: Option<f32>,
    pub right: Option<f32>,
    #[serde(default)]
    pub dividers: Vec<f32>,
}

impl Layout {
    /// Boundaries that must be set before extraction can run. `header_top` is
    /// only needed for header-title inference and is not listed here.
    pub fn missing_boundaries(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.header_bottom.is_none() {
            missing.push("header_bottom");
        }
        if self.table_bottom.is_none() {
            missing.push("table_bottom");
        }
        if self.left.is_none() {
            missing.push("left");
        }
        if self.right.is_none() {
            missing.push("right");
        }
        missing
    }

    pub fn missing_header_boundaries(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.header_top.is_none() {
            missing.push("header_top");
        }
        if self.header_bottom.is_none() {
            missing.push("header_bottom");
        }
        if self.left.is_none() {
            missing.push("left");
        }
        if self.right.is_none() {
            missing.push("right");
        }
        missing
    }

    /// The data rectangle `(x0, y0, x1, y1)`, from the header's bottom edge
    /// down to the table bottom. No ordering is enforced; an inverted range
    /// yields a negative-size rectangle that the crop clamps to zero area.
    pub fn data_region(&self) -> Option<(f32, f32, f32, f32)> {
        Some((
            self.left?,
            self.header_bottom?,
            self.right?,
            self.table_bottom?,
        ))
    }

    /// The header strip `(x0, y0, x1, y1)` used for column-title inference.
    pub fn header_region(&self) -> Option<(f32, f32, f32, f32)> {
        Some((
            self.left?,
            self.header_top?,
            self.right?,
            self.header_bottom?,
        ))
    }
}

/// Which boundary the next calibration click will set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationMode {
    HeaderTop,
    HeaderBottom,
    TableBottom,
    LeftEdge,
    RightEdge,
    AddDivider,
    RemoveDivider,
}

/// Column intervals derived from a layout. `names.len()` is always
/// `boundaries.len() - 1`; column `i` spans `[boundaries[i], boundaries[i+1])`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSet {
    pub boundaries: Vec<f32>,
    pub names: Vec<String>,
}

impl ColumnSet {
    /// Derive the column intervals from a layout, filtering out dividers that
    /// fell outside the current left/right edges. Returns `None` until both
    /// edges are set. Missing or empty names are filled with `"Column N"`.
    pub fn derive(layout: &Layout, names: &[String]) -> Option<Self> {
        let boundaries = column_boundaries(layout.left?, layout.right?, &layout.dividers);
        let count = boundaries.len() - 1;
        let names = (0..count)
            .map(|i| {
                names
                    .get(i)
                    .filter(|name| !name.is_empty())
                    .cloned()
                    .unwrap_or_else(|| default_column_name(i))
            })
            .collect();
        Some(Self { boundaries, names })
    }

    pub fn column_count(&self) -> usize {
        self.names.len()
    }
}

fn default_column_name(index: usize) -> String {
    format!("Column {}", index + 1)
}

/// Turns a sequence of pointer clicks into a validated layout. One instance
/// per calibration session; clicks never fail, nonsensical configurations are
/// accepted and only surface as empty extraction results downstream.
#[derive(Debug, Clone)]
pub struct Calibrator {
    layout: Layout,
    names: Vec<String>,
    mode: CalibrationMode,
    divider_tolerance: f32,
}

impl Calibrator {
    pub fn new() -> Self {
        Self {
            layout: Layout::default(),
            names: Vec::new(),
            mode: CalibrationMode::HeaderTop,
            divider_tolerance: DIVIDER_HIT_TOLERANCE,
        }
    }

    pub fn with_divider_tolerance(mut self, tolerance: f32) -> Self {
        self.divider_tolerance = tolerance;
        self
    }

    pub fn set_mode(&mut self, mode: CalibrationMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    /// Apply one click in page-render space under the current mode. Line
    /// modes overwrite their boundary; `AddDivider` keeps the divider list
    /// sorted; `RemoveDivider` is a no-op when no divider is within tolerance.
    #[instrument(level = "trace", skip(self))]
    pub fn apply_click(&mut self, point: Coord<f32>) {
        match self.mode {
            CalibrationMode::HeaderTop => self.layout.header_top = Some(point.y),
            CalibrationMode::HeaderBottom => self.layout.header_bottom = Some(point.y),
            CalibrationMode::TableBottom => self.layout.table_bottom = Some(point.y),
            CalibrationMode::LeftEdge => self.layout.left = Some(point.x),
            CalibrationMode::RightEdge => self.layout.right = Some(point.x),
            CalibrationMode::AddDivider => {
                self.layout.dividers.push(point.x);
                self.layout.dividers.sort_by(|a, b| a.total_cmp(b));
            }
            CalibrationMode::RemoveDivider => {
                let nearest = self
                    .layout
                    .dividers
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| {
                        (**a - point.x).abs().total_cmp(&(**b - point.x).abs())
                    })
                    .map(|(index, divider)| (index, *divider));
                if let Some((index, divider)) = nearest {
                    if (divider - point.x).abs() <= self.divider_tolerance {
                        self.layout.dividers.remove(index);
                    } else {
                        log::trace!("no divider within {}px of {}", self.divider_tolerance, point.x);
                    }
                }
            }
        }
        self.sync_names();
    }

    /// Clear every boundary and all column names. Idempotent.
    pub fn reset(&mut self) {
        self.layout = Layout::default();
        self.names.clear();
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn into_layout(self) -> Layout {
        self.layout
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Overwrite a single column name, e.g. from a user edit. Out-of-range
    /// indices are ignored.
    pub fn set_name(&mut self, index: usize, name: impl Into<String>) {
        if let Some(slot) = self.names.get_mut(index) {
            *slot = name.into();
        }
    }

    /// Install names inferred from the header region, then re-fit the list to
    /// the current column count.
    pub fn install_names(&mut self, names: Vec<String>) {
        self.names = names;
        self.sync_names();
    }

    pub fn column_set(&self) -> Option<ColumnSet> {
        ColumnSet::derive(&self.layout, &self.names)
    }

    // Keeps names.len() == dividers.len() + 1, preserving entries by index.
    fn sync_names(&mut self) {
        let count = self.layout.dividers.len() + 1;
        self.names.truncate(count);
        while self.names.len() < count {
            self.names.push(default_column_name(self.names.len()));
        }
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new()
    }
}
