//! Static Chart Renderer
//! Draws the planned panels onto one canvas and writes it as PNG.
//!
//! Layout:
//! 1. Title and subtitle centered at the top
//! 2. Eight panels on the 6 x 4 grid (see `layout::PANELS`)
//! 3. Legends to the right of their panel, outside the plot area
//! 4. Headline notes between the scatter and bar panels
//!
//! The whole canvas is drawn into an in-memory RGB buffer and encoded before
//! the output file is touched, so a failed run never leaves a partial image.
//! Fonts are compiled in and registered with plotters before drawing.

use crate::charts::layout::{GridSpec, PixelRect, HEADLINES};
use crate::charts::plotter::{ChartData, LineData, PlotContent, ScatterPoint, SeriesKey, PALETTE};
use crate::config::DashboardConfig;
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontStyle};
use std::io::Cursor;
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, info};

// Colors
const BACKGROUND: RGBColor = RGBColor(249, 245, 250);
const TITLE_COLOR: RGBColor = RGBColor(144, 3, 168);

const FONT: &str = "sans-serif";
const FONT_REGULAR: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const FONT_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

const LEGEND_ROW_H: i32 = 18;
const LEGEND_COL_W: i32 = 80;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Font registration failed: {0}")]
    Font(String),
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("Canvas buffer does not match {0}x{1}")]
    Buffer(u32, u32),
    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render every panel and write the PNG to `config.output_path`,
    /// replacing any existing file.
    pub fn render_dashboard(
        config: &DashboardConfig,
        charts: &[ChartData],
    ) -> Result<(), RenderError> {
        let png = Self::render_png(config, charts)?;
        std::fs::write(&config.output_path, &png)?;
        info!(bytes = png.len(), "wrote {}", config.output_path.display());
        Ok(())
    }

    /// Render the dashboard to PNG bytes.
    pub fn render_png(config: &DashboardConfig, charts: &[ChartData]) -> Result<Vec<u8>, RenderError> {
        Self::register_fonts()?;

        let (width, height) = (config.width, config.height);
        let mut buffer = vec![0u8; width as usize * height as usize * 3];

        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            Self::draw_dashboard(&root, config, charts)
                .map_err(|e| RenderError::Drawing(e.to_string()))?;
            root.present()
                .map_err(|e| RenderError::Drawing(e.to_string()))?;
        }

        let img = RgbImage::from_raw(width, height, buffer).ok_or(RenderError::Buffer(width, height))?;
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }

    fn register_fonts() -> Result<(), RenderError> {
        for (style, bytes) in [(FontStyle::Normal, FONT_REGULAR), (FontStyle::Bold, FONT_BOLD)] {
            register_font(FONT, style, bytes).map_err(|_| RenderError::Font("InvalidFont".to_string()))?;
        }
        Ok(())
    }

    fn draw_dashboard<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        config: &DashboardConfig,
        charts: &[ChartData],
    ) -> DrawResult<DB> {
        root.fill(&BACKGROUND)?;
        let (width, height) = root.dim_in_pixel();
        let center = Pos::new(HPos::Center, VPos::Top);

        let title_style = (FONT, 30)
            .into_font()
            .style(FontStyle::Bold)
            .color(&TITLE_COLOR)
            .pos(center);
        root.draw_text(
            &config.title,
            &title_style,
            ((width / 2) as i32, (height as f64 * 0.015) as i32),
        )?;

        let subtitle_style = (FONT, 18).into_font().color(&BLACK).pos(center);
        root.draw_text(
            &config.subtitle,
            &subtitle_style,
            ((width / 2) as i32, (height as f64 * 0.04) as i32),
        )?;

        let grid = GridSpec::dashboard(width, height);
        let pad_x = (grid.col_gap() * 0.45) as u32;
        let pad_y = (grid.row_gap() * 0.45) as u32;

        for chart in charts {
            let cell = grid.cell_rect(chart.spec.cell);
            let outer = cell.expand(pad_x, pad_y, 10, pad_y);
            let area = root.clone().shrink((outer.x, outer.y), (outer.w, outer.h));

            match &chart.content {
                PlotContent::Lines(series) => Self::draw_lines(&area, chart, series)?,
                PlotContent::Pie(slices) => Self::draw_pie(&area, chart, slices)?,
                PlotContent::Scatter { keys, points } => {
                    Self::draw_scatter(&area, chart, keys, points)?
                }
                PlotContent::Bars {
                    categories,
                    keys,
                    values,
                    errors,
                } => Self::draw_bars(&area, chart, categories, keys, values, errors)?,
            }

            if chart.spec.legend {
                Self::draw_legend(root, &chart.legend_keys(), cell)?;
            }
            debug!(panel = chart.spec.title, "drawn");
        }

        for (text, fx, fy, color) in HEADLINES {
            let style = (FONT, 14).into_font().color(&color);
            root.draw_text(
                text,
                &style,
                ((width as f64 * fx) as i32, (height as f64 * fy) as i32),
            )?;
        }

        Ok(())
    }

    fn draw_lines<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        chart: &ChartData,
        series: &[LineData],
    ) -> DrawResult<DB> {
        let x_range = padded_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)));
        let y_range = padded_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));

        let mut ctx = ChartBuilder::on(area)
            .caption(chart.spec.title, (FONT, 18))
            .margin(5)
            .x_label_area_size(35)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)?;

        ctx.configure_mesh()
            .x_desc(chart.spec.x_label)
            .y_desc(chart.spec.y_label)
            .x_label_formatter(&year_label)
            .label_style((FONT, 12))
            .axis_desc_style((FONT, 13))
            .draw()?;

        for line in series {
            ctx.draw_series(LineSeries::new(
                line.points.iter().copied(),
                line.key.rgb().stroke_width(2),
            ))?;
        }

        Ok(())
    }

    fn draw_pie<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        chart: &ChartData,
        slices: &[(String, f64)],
    ) -> DrawResult<DB> {
        let area = area.titled(chart.spec.title, (FONT, 16))?;
        let (w, h) = area.dim_in_pixel();
        let center = ((w / 2) as i32, (h / 2) as i32);

        let total: f64 = slices.iter().map(|(_, v)| v).sum();
        if total <= 0.0 {
            return area.draw(&Text::new(
                "no data",
                (center.0 - 20, center.1),
                (FONT, 12).into_font(),
            ));
        }

        let radius = w.min(h) as f64 * 0.32;
        let sizes: Vec<f64> = slices.iter().map(|(_, v)| *v).collect();
        let labels: Vec<String> = slices.iter().map(|(label, _)| label.clone()).collect();
        let colors: Vec<RGBColor> = (0..slices.len())
            .map(|i| PALETTE[i % PALETTE.len()])
            .collect();

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.label_style((FONT, 12).into_font().color(&BLACK));
        area.draw(&pie)
    }

    fn draw_scatter<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        chart: &ChartData,
        keys: &[SeriesKey],
        points: &[ScatterPoint],
    ) -> DrawResult<DB> {
        let x_range = padded_range(points.iter().map(|p| p.x));
        let y_range = padded_range(points.iter().map(|p| p.y));

        let mut ctx = ChartBuilder::on(area)
            .caption(chart.spec.title, (FONT, 18))
            .margin(5)
            .x_label_area_size(35)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)?;

        ctx.configure_mesh()
            .x_desc(chart.spec.x_label)
            .y_desc(chart.spec.y_label)
            .x_label_formatter(&year_label)
            .label_style((FONT, 12))
            .axis_desc_style((FONT, 13))
            .draw()?;

        ctx.draw_series(points.iter().map(|p| {
            let color = keys.get(p.series).map(SeriesKey::rgb).unwrap_or(BLACK);
            let radius = (p.area / std::f64::consts::PI).sqrt().round().max(1.0) as i32;
            Circle::new((p.x, p.y), radius, color.mix(0.85).filled())
        }))?;

        Ok(())
    }

    fn draw_bars<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        chart: &ChartData,
        categories: &[i64],
        keys: &[SeriesKey],
        values: &[Vec<Option<f64>>],
        errors: &[Vec<Option<f64>>],
    ) -> DrawResult<DB> {
        let notes = chart.spec.annotations;
        let whiskers: Vec<(f64, f64, f64)> = values
            .iter()
            .zip(errors)
            .enumerate()
            .flat_map(|(c, (row, spread))| {
                row.iter().zip(spread).enumerate().filter_map(move |(k, (v, e))| {
                    Some((bar_center(c, k, keys.len()), (*v)?, (*e)?))
                })
            })
            .collect();
        let x_max = notes
            .iter()
            .map(|n| n.target.0.max(n.text_at.0) + 0.5)
            .fold(categories.len().max(1) as f64 - 0.5, f64::max);
        let y_range = padded_range(
            values
                .iter()
                .flatten()
                .flatten()
                .copied()
                .chain(whiskers.iter().flat_map(|(_, v, e)| [v - e, v + e]))
                .chain(notes.iter().flat_map(|n| [n.target.1, n.text_at.1]))
                .chain(std::iter::once(0.0)),
        );

        let mut ctx = ChartBuilder::on(area)
            .caption(chart.spec.title, (FONT, 18))
            .margin(5)
            .x_label_area_size(35)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5..x_max, y_range)?;

        let category_label = |x: &f64| {
            let idx = x.round();
            if (x - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            categories
                .get(idx as usize)
                .map(|c| c.to_string())
                .unwrap_or_default()
        };

        ctx.configure_mesh()
            .x_labels(categories.len() * 2 + 1)
            .x_desc(chart.spec.x_label)
            .y_desc(chart.spec.y_label)
            .x_label_formatter(&category_label)
            .label_style((FONT, 12))
            .axis_desc_style((FONT, 13))
            .draw()?;

        let bar_w = BAR_GROUP_W / keys.len().max(1) as f64;
        for (k, key) in keys.iter().enumerate() {
            let color = key.rgb();
            ctx.draw_series(values.iter().enumerate().filter_map(|(c, row)| {
                let v = row.get(k).copied().flatten()?;
                let x0 = bar_center(c, k, keys.len()) - bar_w / 2.0;
                Some(Rectangle::new([(x0, 0.0), (x0 + bar_w, v)], color.filled()))
            }))?;
        }

        ctx.draw_series(whiskers.iter().map(|&(x, v, e)| {
            ErrorBar::new_vertical(x, v - e, v, v + e, BLACK.stroke_width(1), 4)
        }))?;

        for note in notes {
            ctx.draw_series(std::iter::once(PathElement::new(
                vec![note.text_at, note.target],
                note.color.stroke_width(2),
            )))?;
            ctx.draw_series(std::iter::once(Circle::new(
                note.target,
                4,
                note.color.filled(),
            )))?;
            ctx.draw_series(std::iter::once(Text::new(
                note.text,
                note.text_at,
                (FONT, 13).into_font(),
            )))?;
        }

        Ok(())
    }

    /// Colour boxes and labels to the right of `cell`, vertically centered.
    /// Wraps into extra columns when the keys do not fit the cell height.
    fn draw_legend<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        keys: &[SeriesKey],
        cell: PixelRect,
    ) -> DrawResult<DB> {
        if keys.is_empty() {
            return Ok(());
        }
        let (_, rows) = legend_grid(keys.len(), cell.h);
        let rows = rows as i32;

        let x0 = cell.right() + 20;
        let y0 = cell.y + cell.h as i32 / 2 - rows * LEGEND_ROW_H / 2;

        for (i, key) in keys.iter().enumerate() {
            let (col, row) = (i as i32 / rows, i as i32 % rows);
            let x = x0 + col * LEGEND_COL_W;
            let y = y0 + row * LEGEND_ROW_H;

            root.draw(&Rectangle::new([(x, y), (x + 12, y + 12)], key.rgb().filled()))?;
            root.draw(&Text::new(
                key.label.as_str(),
                (x + 18, y),
                (FONT, 13).into_font(),
            ))?;
        }

        Ok(())
    }
}

/// Fraction of a category slot covered by its group of bars.
const BAR_GROUP_W: f64 = 0.8;

/// X position of the centre of bar `k` of `n` in category slot `c`.
fn bar_center(c: usize, k: usize, n: usize) -> f64 {
    let bar_w = BAR_GROUP_W / n.max(1) as f64;
    c as f64 - BAR_GROUP_W / 2.0 + (k as f64 + 0.5) * bar_w
}

/// (columns, rows) of a legend with `len` entries next to a cell `cell_h`
/// pixels tall. Entries fill a column top to bottom before wrapping.
fn legend_grid(len: usize, cell_h: u32) -> (usize, usize) {
    if len == 0 {
        return (0, 0);
    }
    let rows_fit = (cell_h as i32 / LEGEND_ROW_H).max(1) as usize;
    let columns = len.div_ceil(rows_fit);
    (columns, len.div_ceil(columns))
}

/// Tick label for a year axis; blank between whole years.
fn year_label(x: &f64) -> String {
    if (x - x.round()).abs() < 1e-6 {
        format!("{:.0}", x)
    } else {
        String::new()
    }
}

/// Data range with 5% padding; degenerate inputs widen to a unit span.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return 0.0..1.0;
    }
    if lo == hi {
        return (lo - 1.0)..(hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{ChartPlotter, DashboardTables};
    use crate::config::{
        COL_CO2, COL_COUNTRY, COL_ELECTRICITY, COL_ENERGY_USE, COL_EXPORTS, COL_GDP_GROWTH,
        COL_GDP_PER_CAPITA, COL_INFLATION, COL_YEAR, COUNTRY_CODES, REGION_MAP,
    };
    use crate::data::DataProcessor;
    use image::{GenericImageView, Rgb};
    use polars::prelude::*;
    use tempfile::tempdir;

    /// Two years of every charted country.
    fn charts() -> Vec<ChartData> {
        let n = COUNTRY_CODES.len();
        let years: Vec<i64> = (0..2 * n).map(|i| 2012 + (i / n) as i64).collect();
        let countries: Vec<&str> = (0..2 * n).map(|i| COUNTRY_CODES[i % n]).collect();
        let ramp = |base: f64| -> Vec<f64> { (0..2 * n).map(|i| base + i as f64).collect() };

        let observations = df!(
            COL_YEAR => years,
            COL_COUNTRY => countries,
            COL_EXPORTS => ramp(10.0),
            COL_GDP_PER_CAPITA => ramp(1000.0),
            COL_CO2 => ramp(0.5),
            COL_ELECTRICITY => ramp(60.0),
            COL_INFLATION => ramp(1.0),
            COL_GDP_GROWTH => ramp(-2.0),
            COL_ENERGY_USE => ramp(0.3)
        )
        .unwrap();

        let tables = DashboardTables {
            yearly: DataProcessor::yearly_means(&observations).unwrap(),
            spread: DataProcessor::yearly_spread(&observations, COL_GDP_GROWTH).unwrap(),
            regional: DataProcessor::regional_means(&observations, &REGION_MAP).unwrap(),
            observations,
        };
        ChartPlotter::plan(&tables).unwrap()
    }

    #[test]
    fn renders_full_canvas_over_existing_file() {
        let tmp = tempdir().unwrap();
        let output_path = tmp.path().join("dashboard.png");
        std::fs::write(&output_path, b"stale").unwrap();

        let config = DashboardConfig {
            output_path: output_path.clone(),
            ..DashboardConfig::default()
        };
        StaticChartRenderer::render_dashboard(&config, &charts()).unwrap();

        let img = image::open(&output_path).unwrap();
        assert_eq!(img.dimensions(), (1800, 2000));
        assert_eq!(img.to_rgb8().get_pixel(0, 0), &Rgb([249, 245, 250]));
    }

    #[test]
    fn legend_wraps_when_cell_is_short() {
        // 166 px fits nine 18 px rows
        assert_eq!(legend_grid(10, 166), (2, 5));
        assert_eq!(legend_grid(10, 400), (1, 10));
        assert_eq!(legend_grid(3, 5), (3, 1));
        assert_eq!(legend_grid(0, 166), (0, 0));
    }

    #[test]
    fn bars_are_centered_in_their_slot() {
        assert!((bar_center(0, 0, 1) - 0.0).abs() < 1e-9);
        assert!((bar_center(2, 0, 2) - 1.8).abs() < 1e-9);
        assert!((bar_center(2, 1, 2) - 2.2).abs() < 1e-9);
    }

    #[test]
    fn padded_range_covers_values() {
        let r = padded_range([2012.0, 2020.0].into_iter());
        assert!(r.start < 2012.0 && r.end > 2020.0);
        assert!((r.start - 2011.6).abs() < 1e-9);
    }

    #[test]
    fn padded_range_handles_degenerate_input() {
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
        assert_eq!(padded_range([5.0, 5.0].into_iter()), 4.0..6.0);
        assert_eq!(padded_range([f64::NAN].into_iter()), 0.0..1.0);
    }

    #[test]
    fn year_labels_only_on_whole_years() {
        assert_eq!(year_label(&2015.0), "2015");
        assert_eq!(year_label(&2015.5), "");
    }
}
