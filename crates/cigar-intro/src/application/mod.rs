//! Application layer: script loading, the async runner and read-only views.

pub mod runner;
pub mod script;
pub mod views;
