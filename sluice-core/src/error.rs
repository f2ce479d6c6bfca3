use std::{
    error,
    fmt::{self, Display},
};

/// Failure reported by the native client library of a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    pub backend: &'static str,
    pub code: Option<i64>,
    pub message: String,
}

impl NativeError {
    pub fn new(backend: &'static str, code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            backend,
            code,
            message: message.into(),
        }
    }
}

impl Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.message)?;
        if let Some(code) = self.code {
            write!(f, " (code {})", code)?;
        }
        Ok(())
    }
}

impl error::Error for NativeError {}
