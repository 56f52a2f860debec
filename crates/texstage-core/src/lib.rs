pub mod config;
pub mod logging;

pub mod composite;
pub mod fetch;
pub mod manifest;
pub mod queue;
pub mod raster;
pub mod selection;
pub mod staging;
pub mod url_model;
