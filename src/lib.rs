pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod loader;
pub mod overlay;
pub mod picker;
pub mod playback;
pub mod render;
pub mod requests;
pub mod viewer;

pub use catalog::{Catalog, ImagePath, ScanOptions};
pub use config::Configuration;
pub use controller::Slideshow;
pub use error::Error;
