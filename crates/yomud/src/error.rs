//! Error types of the command line interface.

use thiserror::Error;

use super::*;

/// Everything a command can fail with.
#[derive(Error, Debug)]
pub enum YomudError {
  /// A library operation failed
  #[error(transparent)]
  Yomu(#[from] YomuError),

  /// Reading an answer from the terminal failed
  #[error(transparent)]
  Dialog(#[from] dialoguer::Error),

  /// Writing to the terminal or the filesystem failed
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// Output could not be rendered as JSON
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// The command could not do what was asked
  #[error("{0}")]
  Command(String),
}

/// Result alias of the command line interface.
pub type Result<T> = std::result::Result<T, YomudError>;
