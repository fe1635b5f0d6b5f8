//! Benchmark-only crate; see `benches/check_pipeline.rs`.
