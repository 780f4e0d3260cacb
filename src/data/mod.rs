//! Result tables and their exporters

pub mod data_exporter;
pub mod datatable;
