pub mod exporter;
pub mod gif;
pub mod sink;
