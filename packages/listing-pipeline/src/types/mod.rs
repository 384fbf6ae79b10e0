//! Data types shared across the pipeline.

pub mod attributes;
pub mod listing;
pub mod product;
