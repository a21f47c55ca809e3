//! Fatal errors and their translation into process exit codes.

use std::fmt;

use crate::errors::BoxError;
use crate::observability::LogEvent;

/// Message logged when a fatal error carries none of its own.
pub const DEFAULT_MESSAGE: &str = "A fatal error occurred";

type EventProducer = Box<dyn Fn() -> LogEvent + Send + Sync>;
type EventDecorator = Box<dyn Fn(LogEvent) -> LogEvent + Send + Sync>;

/// An error annotated with how it should be reported on exit.
///
/// Every part is optional. An empty `FatalError` still reports
/// [`DEFAULT_MESSAGE`] at error level.
#[derive(Default)]
pub struct FatalError {
    pub cause: Option<BoxError>,
    pub msg: String,
    /// Produces the record to write, replacing the default error-level one.
    pub logger: Option<EventProducer>,
    /// Adds fields to the record before it is written.
    pub with_params: Option<EventDecorator>,
}

impl FatalError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            ..Self::default()
        }
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_logger<F>(mut self, logger: F) -> Self
    where
        F: Fn() -> LogEvent + Send + Sync + 'static,
    {
        self.logger = Some(Box::new(logger));
        self
    }

    pub fn with_params<F>(mut self, params: F) -> Self
    where
        F: Fn(LogEvent) -> LogEvent + Send + Sync + 'static,
    {
        self.with_params = Some(Box::new(params));
        self
    }

    /// Write the single record describing this error.
    fn report(&self) {
        let msg = if self.msg.is_empty() {
            DEFAULT_MESSAGE
        } else {
            self.msg.as_str()
        };

        let mut event = match &self.logger {
            Some(logger) => logger(),
            None => LogEvent::error(),
        };
        if let Some(cause) = &self.cause {
            event = event.err(cause.as_ref());
        }
        if let Some(params) = &self.with_params {
            event = params(event);
        }

        event.msg(msg);
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{cause}"),
            None => f.write_str(&self.msg),
        }
    }
}

impl fmt::Debug for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FatalError")
            .field("cause", &self.cause)
            .field("msg", &self.msg)
            .field("logger", &self.logger.is_some())
            .field("with_params", &self.with_params.is_some())
            .finish()
    }
}

impl std::error::Error for FatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// An error on its way out of the process.
#[derive(Debug)]
pub enum ExitError {
    /// Carries its own message and logging customisation.
    Fatal(FatalError),
    /// Any other error; reported with [`DEFAULT_MESSAGE`].
    Other(BoxError),
}

impl ExitError {
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal(err) => fmt::Display::fmt(err, f),
            Self::Other(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for ExitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fatal(err) => err.source(),
            Self::Other(err) => Some(err.as_ref()),
        }
    }
}

impl From<FatalError> for ExitError {
    fn from(err: FatalError) -> Self {
        Self::Fatal(err)
    }
}

impl From<BoxError> for ExitError {
    fn from(err: BoxError) -> Self {
        // A FatalError that travelled through a boxed error keeps its annotations.
        match err.downcast::<FatalError>() {
            Ok(fatal) => Self::Fatal(*fatal),
            Err(other) => Self::Other(other),
        }
    }
}

/// Report an outcome and return the exit code for it.
///
/// `Ok` is silent and yields 0. Any error writes exactly one log record and
/// yields 1.
pub fn handle_fatal_error<T>(result: Result<T, ExitError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(ExitError::Fatal(err)) => {
            err.report();
            1
        }
        Err(ExitError::Other(err)) => {
            LogEvent::error().err(err.as_ref()).msg(DEFAULT_MESSAGE);
            1
        }
    }
}
