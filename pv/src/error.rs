//! Session-level errors

use pivotstore::StoreError;
use thiserror::Error;

use crate::controller::ControllerError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error("No event is open")]
    NoEvent,

    #[error("Comment text is required")]
    EmptyComment,

    #[error("Invalid ID token")]
    InvalidToken,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
