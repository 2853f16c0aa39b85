pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod harvester;
pub mod loader;
pub mod logging;
pub mod normalize;
pub mod reproject;
pub mod sink;
pub mod sources;
pub mod types;
