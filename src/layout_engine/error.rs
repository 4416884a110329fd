use thiserror::Error;

use crate::model::window::ContentId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WindowError {
    #[error("Content not found in host canvas: {0}")]
    ContentNotFound(ContentId),
    #[error("No floating window for content: {0}")]
    WindowNotFound(ContentId),
    #[error("Window is locked: {0}")]
    Locked(ContentId),
    #[error("Invalid snapshot for {0}: {1}")]
    InvalidSnapshot(ContentId, String),
}
