//! Charts module - Panel planning and rendering

mod layout;
mod plotter;
mod renderer;

pub use plotter::{ChartPlotter, DashboardTables};
pub use renderer::StaticChartRenderer;
