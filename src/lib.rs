pub mod camera;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod pose;
pub mod render;
