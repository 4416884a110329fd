pub mod event;
pub mod geometry;
pub mod host;
pub mod keys;
pub mod store;
