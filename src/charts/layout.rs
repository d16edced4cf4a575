//! Dashboard Layout
//! Declarative panel list and the 6 x 4 grid geometry they are placed on.
//!
//! Each panel names its chart kind, the table it reads, the fields it plots
//! and the grid cell it occupies. The planner and the renderer both walk
//! [`PANELS`] in order.

use crate::config::{
    COL_CO2, COL_COUNTRY, COL_ELECTRICITY, COL_ENERGY_USE, COL_GDP_GROWTH, COL_GDP_PER_CAPITA,
    COL_INFLATION, COL_REGION, COL_YEAR,
};
use plotters::style::RGBColor;

pub const GRID_ROWS: u32 = 6;
pub const GRID_COLS: u32 = 4;

/// Horizontal gap between cells, as a fraction of the average cell width.
pub const WSPACE: f64 = 0.6;
/// Vertical gap between cells, as a fraction of the average cell height.
pub const HSPACE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Pie,
    Scatter,
    GroupedBar,
}

/// Which table a panel reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Observations,
    Yearly,
    /// Per-(year, country) mean and interval of the bar metric
    YearlySpread,
    Regional,
}

/// A rectangular block of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub row: u32,
    pub rows: u32,
    pub col: u32,
    pub cols: u32,
}

impl GridCell {
    pub const fn new(row: u32, rows: u32, col: u32, cols: u32) -> Self {
        Self {
            row,
            rows,
            col,
            cols,
        }
    }
}

/// Arrow annotation in data coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Annotation {
    pub text: &'static str,
    pub target: (f64, f64),
    pub text_at: (f64, f64),
    pub color: RGBColor,
}

/// One chart in the dashboard.
#[derive(Debug, Clone, Copy)]
pub struct PanelSpec {
    pub title: &'static str,
    pub kind: ChartKind,
    pub source: DataSource,
    /// X field (ignored by pies)
    pub x: &'static str,
    /// Value field
    pub y: &'static str,
    /// Field that splits the data into series or slices
    pub series: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub legend: bool,
    pub cell: GridCell,
    pub annotations: &'static [Annotation],
}

const GDP_GROWTH_NOTES: [Annotation; 2] = [
    Annotation {
        text: "Witness the negative GDP growth in 2020 (COVID)",
        target: (9.0, -1.0),
        text_at: (7.0, -3.0),
        color: RGBColor(0, 128, 0),
    },
    Annotation {
        text: "Only negative growth for Nigeria",
        target: (5.0, -1.0),
        text_at: (3.0, -3.0),
        color: RGBColor(255, 0, 0),
    },
];

const fn pie(title: &'static str, metric: &'static str, col: u32) -> PanelSpec {
    PanelSpec {
        title,
        kind: ChartKind::Pie,
        source: DataSource::Regional,
        x: COL_REGION,
        y: metric,
        series: COL_REGION,
        x_label: "",
        y_label: "",
        legend: false,
        cell: GridCell::new(2, 1, col, 1),
        annotations: &[],
    }
}

pub const PANELS: [PanelSpec; 8] = [
    PanelSpec {
        title: "GDP Per Capita of Countries since 2012",
        kind: ChartKind::Line,
        source: DataSource::Yearly,
        x: COL_YEAR,
        y: COL_GDP_PER_CAPITA,
        series: COL_COUNTRY,
        x_label: "Year",
        y_label: "GDP Per Capita",
        legend: true,
        cell: GridCell::new(0, 1, 0, GRID_COLS),
        annotations: &[],
    },
    PanelSpec {
        title: "Access to Electricity of Countries since 2012",
        kind: ChartKind::Line,
        source: DataSource::Yearly,
        x: COL_YEAR,
        y: COL_ELECTRICITY,
        series: COL_COUNTRY,
        x_label: "Year",
        y_label: "Access to Electricity (%)",
        legend: true,
        cell: GridCell::new(1, 1, 0, GRID_COLS),
        annotations: &[],
    },
    pie("Energy Use per Capita by Region", COL_ENERGY_USE, 0),
    pie("CO₂ Emissions by Region", COL_CO2, 1),
    pie("Inflation by Region", COL_INFLATION, 2),
    pie("Access to Electricity by Region", COL_ELECTRICITY, 3),
    PanelSpec {
        title: "Inflation in Countries since 2012",
        kind: ChartKind::Scatter,
        source: DataSource::Observations,
        x: COL_YEAR,
        y: COL_INFLATION,
        series: COL_COUNTRY,
        x_label: "Year",
        y_label: "Inflation",
        legend: true,
        cell: GridCell::new(3, 1, 0, GRID_COLS),
        annotations: &[],
    },
    PanelSpec {
        title: "GDP Annual Growth in Countries since 2012",
        kind: ChartKind::GroupedBar,
        source: DataSource::YearlySpread,
        x: COL_YEAR,
        y: COL_GDP_GROWTH,
        series: COL_COUNTRY,
        x_label: "Year",
        y_label: "GDP Growth(Annual)",
        legend: true,
        cell: GridCell::new(4, 2, 0, GRID_COLS),
        annotations: &GDP_GROWTH_NOTES,
    },
];

/// Free-standing notes, positioned as fractions of the canvas.
pub const HEADLINES: [(&str, f64, f64, RGBColor); 3] = [
    (
        "USA has the highest GDP Per Capita throughout",
        0.58,
        0.672,
        RGBColor(255, 0, 0),
    ),
    (
        "The rise of Bangladesh in electricity access is impressive!",
        0.58,
        0.680,
        RGBColor(0, 0, 255),
    ),
    (
        "Inflation has been highest in Africa throughout",
        0.58,
        0.688,
        RGBColor(8, 0, 10),
    ),
];

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl PixelRect {
    pub fn right(&self) -> i32 {
        self.x + self.w as i32
    }

    /// Grow the rectangle outwards by the given margins.
    pub fn expand(&self, left: u32, top: u32, right: u32, bottom: u32) -> PixelRect {
        PixelRect {
            x: self.x - left as i32,
            y: self.y - top as i32,
            w: self.w + left + right,
            h: self.h + top + bottom,
        }
    }
}

/// Grid geometry over a region of the canvas.
///
/// Cell sizes follow the usual gridspec rule: with `n` cells and spacing
/// `s`, each cell gets `total / (n + s * (n - 1))` and each gap `s` times
/// that.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    pub region: PixelRect,
    pub rows: u32,
    pub cols: u32,
    pub wspace: f64,
    pub hspace: f64,
}

impl GridSpec {
    /// The dashboard grid on a canvas of the given size.
    pub fn dashboard(width: u32, height: u32) -> Self {
        let left = (width as f64 * 0.06) as i32;
        let right = (width as f64 * 0.86) as i32;
        let top = (height as f64 * 0.09) as i32;
        let bottom = (height as f64 * 0.96) as i32;

        Self {
            region: PixelRect {
                x: left,
                y: top,
                w: (right - left) as u32,
                h: (bottom - top) as u32,
            },
            rows: GRID_ROWS,
            cols: GRID_COLS,
            wspace: WSPACE,
            hspace: HSPACE,
        }
    }

    pub fn cell_width(&self) -> f64 {
        self.region.w as f64 / (self.cols as f64 + self.wspace * (self.cols - 1) as f64)
    }

    pub fn cell_height(&self) -> f64 {
        self.region.h as f64 / (self.rows as f64 + self.hspace * (self.rows - 1) as f64)
    }

    pub fn col_gap(&self) -> f64 {
        self.cell_width() * self.wspace
    }

    pub fn row_gap(&self) -> f64 {
        self.cell_height() * self.hspace
    }

    /// Pixel rectangle of the plot area covered by `cell`.
    pub fn cell_rect(&self, cell: GridCell) -> PixelRect {
        let cw = self.cell_width();
        let ch = self.cell_height();
        let (gw, gh) = (self.col_gap(), self.row_gap());

        let x0 = self.region.x as f64 + cell.col as f64 * (cw + gw);
        let y0 = self.region.y as f64 + cell.row as f64 * (ch + gh);
        let w = cell.cols as f64 * cw + (cell.cols.saturating_sub(1)) as f64 * gw;
        let h = cell.rows as f64 * ch + (cell.rows.saturating_sub(1)) as f64 * gh;

        PixelRect {
            x: x0.round() as i32,
            y: y0.round() as i32,
            w: w.round() as u32,
            h: h.round() as u32,
        }
    }
}
