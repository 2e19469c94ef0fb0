use core::fmt;
use ohno::EnrichableExt;

/// Failure of a single call against the GitHub API.
///
/// Every variant is scoped to one identity: the collector records it against that identity and
/// carries on with the others.
#[derive(Debug)]
pub enum FetchError {
    /// The credential or signing key was rejected, or no credential could be produced.
    Authentication(ohno::AppError),

    /// Transport failure, request timeout, or a transient server-side error.
    Network(ohno::AppError),

    /// The server answered, but not with the documented payload.
    MalformedResponse(ohno::AppError),
}

impl FetchError {
    #[must_use]
    pub const fn error(&self) -> &ohno::AppError {
        match self {
            Self::Authentication(e) | Self::Network(e) | Self::MalformedResponse(e) => e,
        }
    }

    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Add context to the wrapped error while keeping its classification.
    #[must_use]
    pub fn enrich_with<F, S>(self, context: F) -> Self
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        match self {
            Self::Authentication(e) => Self::Authentication(e.enrich_with(|| context().into())),
            Self::Network(e) => Self::Network(e.enrich_with(|| context().into())),
            Self::MalformedResponse(e) => Self::MalformedResponse(e.enrich_with(|| context().into())),
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication error",
            Self::Network(_) => "network error",
            Self::MalformedResponse(_) => "malformed response",
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.label(), self.error())
    }
}
