//! Error types for `trackline-core`.

use thiserror::Error;

use crate::{notify::NotifyError, status::MAX_TEXT_LEN};

#[derive(Debug, Error)]
pub enum Error {
  #[error("status text is {0} characters; the limit is {MAX_TEXT_LEN}")]
  TextTooLong(usize),

  #[error("unknown lifecycle code: {0:?}")]
  UnknownCode(String),

  #[error(transparent)]
  Notify(#[from] NotifyError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
