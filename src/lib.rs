pub mod api;
pub mod config;
pub mod datetime;
pub mod host;
pub mod orchestrator;
pub mod page;
pub mod presets;
pub mod push;
pub mod schedule;
