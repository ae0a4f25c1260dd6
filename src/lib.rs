//! reelvault: personal video library ingestion and background job pipeline.
//!
//! The heavy lifting lives in the `rv-*` workspace crates. This crate wires
//! them together behind the operator CLI.

pub mod app;

pub use app::App;
