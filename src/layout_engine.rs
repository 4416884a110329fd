pub mod engine;
mod error;
pub mod geometry;

pub use engine::WindowManager;
pub use error::WindowError;
