//! Terminal presentation layer.

pub mod app;
