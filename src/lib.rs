//! wxdash library
//!
//! Weather data normalization, caching and rendering behind the `wxdash`
//! binary, exposed for integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod render;
pub mod search;
pub mod ui;
