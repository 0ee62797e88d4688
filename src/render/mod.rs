//! Render module - progress text, result images and output files

pub mod image;
pub mod output;
pub mod progress;

pub use image::RenderedImage;
pub use output::ImageWriter;
pub use progress::{progress_bar, progress_line, status_line};
