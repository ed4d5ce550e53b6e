//! Error taxonomy shared across the workspace (spec §7).
//!
//! `Transient` and `MalformedInput` are typically logged and swallowed at
//! the call site (a dropped document, a skipped link); `BadRequest` and
//! `NotIdentified` are surfaced to the page-request caller; `Fatal` aborts
//! startup. This mirrors how `meilisearch-types::error::ErrorCode` gives
//! every error a status/classification, but without the HTTP coupling since
//! the request/response framework is out of scope here.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Timeouts, empty responses, decode failures. Log at debug, drop and continue.
    #[error("transient error: {0}")]
    Transient(String),

    /// Bad address length, unparseable link block, non-hex. Skip the offending item.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Missing or mistyped user-supplied parameters.
    #[error("bad request{}{}", format_params("omitted", .omitted), format_params("mistyped", .mistyped))]
    BadRequest { omitted: Vec<(String, &'static str)>, mistyped: Vec<(String, &'static str)> },

    /// A per-user operation was attempted without an identity.
    #[error("not identified")]
    NotIdentified,

    /// Index directory unwritable, DB open failure, missing required config: abort startup.
    #[error("fatal: {0}")]
    Fatal(String),
}

fn format_params(label: &str, params: &[(String, &'static str)]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let joined =
        params.iter().map(|(name, ty)| format!("{name}:{ty}")).collect::<Vec<_>>().join(", ");
    format!("\nsome params are {label} {joined}")
}

impl Error {
    pub fn bad_request() -> BadRequestBuilder {
        BadRequestBuilder::default()
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }
}

#[derive(Default)]
pub struct BadRequestBuilder {
    omitted: Vec<(String, &'static str)>,
    mistyped: Vec<(String, &'static str)>,
}

impl BadRequestBuilder {
    pub fn omit(mut self, name: impl Into<String>, ty: &'static str) -> Self {
        self.omitted.push((name.into(), ty));
        self
    }

    pub fn mistype(mut self, name: impl Into<String>, ty: &'static str) -> Self {
        self.mistyped.push((name.into(), ty));
        self
    }

    pub fn build(self) -> Error {
        Error::BadRequest { omitted: self.omitted, mistyped: self.mistyped }
    }
}

impl fmt::Debug for BadRequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BadRequestBuilder").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_message_lists_params() {
        let err = Error::bad_request().omit("query", "String").mistype("page", "u32").build();
        let msg = err.to_string();
        assert!(msg.contains("omitted"));
        assert!(msg.contains("query:String"));
        assert!(msg.contains("mistyped"));
        assert!(msg.contains("page:u32"));
    }

    #[test]
    fn fatal_is_detected() {
        assert!(Error::Fatal("no disk space".into()).is_fatal());
        assert!(!Error::NotIdentified.is_fatal());
    }
}
