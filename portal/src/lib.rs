pub mod api;
pub mod boundary;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod model;
pub mod pages;
pub mod panels;
pub mod routes;
pub mod scene;
pub mod sliders;
pub mod speech;
pub mod wizard;

pub use routes::{AppState, build_router};
