pub mod batch;
pub mod rollup;
