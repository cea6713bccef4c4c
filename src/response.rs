//! Response envelopes and the host-supplied error mapper.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;

/// `{data, error}` envelope returned by every raw client call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse<T, E> {
    pub data: Option<T>,
    pub error: Option<E>,
}

impl<T, E> QueryResponse<T, E> {
    /// Successful envelope.
    pub fn ok(data: T) -> Self {
        QueryResponse {
            data: Some(data),
            error: None,
        }
    }

    /// Envelope carrying a response-level error.
    pub fn err(error: E) -> Self {
        QueryResponse {
            data: None,
            error: Some(error),
        }
    }

    /// Unwrap the envelope through `mapper`.
    ///
    /// A present `error` always wins over `data` and is handed to the mapper
    /// together with the reporting flag.
    pub fn into_result(self, mapper: &dyn ErrorMapper<E>, should_report: bool) -> Result<T> {
        if let Some(error) = self.error {
            return Err(mapper.map_error(error, should_report));
        }

        self.data.ok_or(Error::EmptyResponse)
    }
}

/// Converts response-level errors into [`Error`], reporting them when asked.
///
/// `should_report == true` means the end user is expected to be notified
/// (toast, banner, ...). `false` suppresses the notification only; the
/// returned error still reaches the caller.
///
/// Any `Fn(E, bool) -> Error` closure is an `ErrorMapper<E>`.
pub trait ErrorMapper<E>: Send + Sync {
    fn map_error(&self, error: E, should_report: bool) -> Error;
}

impl<E, F> ErrorMapper<E> for F
where
    F: Fn(E, bool) -> Error + Send + Sync,
{
    fn map_error(&self, error: E, should_report: bool) -> Error {
        self(error, should_report)
    }
}

/// Reporter hook used by [`ReportingErrorMapper`].
pub type Reporter = Arc<dyn Fn(&str) + Send + Sync>;

/// Error mapper for `Display` errors that forwards reportable messages to a hook.
///
/// # Example
///
/// ```
/// use query_kit::response::{ErrorMapper, ReportingErrorMapper};
///
/// let mapper = ReportingErrorMapper::new(|msg: &str| eprintln!("toast: {}", msg));
/// let err = mapper.map_error("not found".to_string(), true);
/// assert_eq!(err.to_string(), "Response error: not found");
/// ```
#[derive(Clone)]
pub struct ReportingErrorMapper {
    reporter: Reporter,
}

impl ReportingErrorMapper {
    pub fn new<R>(reporter: R) -> Self
    where
        R: Fn(&str) + Send + Sync + 'static,
    {
        ReportingErrorMapper {
            reporter: Arc::new(reporter),
        }
    }

    /// Mapper whose reports only go to the log.
    pub fn log_only() -> Self {
        ReportingErrorMapper::new(|_| {})
    }
}

impl<E: Display> ErrorMapper<E> for ReportingErrorMapper {
    fn map_error(&self, error: E, should_report: bool) -> Error {
        let message = error.to_string();

        if should_report {
            warn!("Reporting response error: {}", message);
            (self.reporter)(&message);
        } else {
            debug!("Response error (not reported): {}", message);
        }

        Error::Response(message)
    }
}
