use thiserror::Error;

/// Failure of a single fetch. One attempt, one outcome: nothing here is retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
  /// Transport-level failure (connect, TLS, timeout, body read).
  #[error("network error: {0}")]
  Network(String),

  /// The server answered with something other than 200.
  #[error("server returned {status} for {url}")]
  Server { status: u16, url: String },

  /// The body arrived but could not be decoded.
  #[error("could not decode response: {0}")]
  Decode(String),

  /// The fetch was superseded or released before it resolved.
  /// Swallowed by the image binder; never shown to the user.
  #[error("cancelled")]
  Cancelled,
}

impl FetchError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, FetchError::Cancelled)
  }
}

impl From<reqwest::Error> for FetchError {
  fn from(e: reqwest::Error) -> Self {
    FetchError::Network(e.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn server_error_names_status_and_url() {
    let e = FetchError::Server { status: 404, url: "http://x/a.png".to_string() };
    assert_eq!(e.to_string(), "server returned 404 for http://x/a.png");
    assert!(!e.is_cancelled());
  }

  #[test]
  fn only_cancelled_is_cancelled() {
    assert!(FetchError::Cancelled.is_cancelled());
    assert!(!FetchError::Network("reset".to_string()).is_cancelled());
  }
}
