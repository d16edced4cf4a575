//! Data module - CSV loading and aggregation

mod loader;
mod processor;

pub use loader::DataLoader;
pub use processor::DataProcessor;
