//! psyphys-batch: run the ECG and EDA pipelines over a manifest of recordings

pub mod manifest;
pub mod ingest;
pub mod runner;
pub mod report;
pub mod demo;

pub use manifest::{Manifest, UnitSpec};
pub use runner::{BatchRunner, Pipelines};
pub use report::BatchReport;
