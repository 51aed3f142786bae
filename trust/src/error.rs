use hyper::http;
use std::fmt::{self, Display};
use thiserror::Error;

/// Single outcome type of one `Trust` call.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Structural(#[from] Violation),
    #[error("trust: the after handler dropped its completion without signalling it")]
    CompletionDropped,
}

impl Error {
    pub fn descriptor_kind(&self) -> Option<&DescriptorErrorKind> {
        match self {
            Error::Descriptor(e) => Some(&e.kind),
            _ => None,
        }
    }

    pub fn violation_kind(&self) -> Option<ViolationKind> {
        match self {
            Error::Structural(v) => Some(v.kind),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DescriptorScope {
    Request,
    Response,
}

impl Display for DescriptorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorScope::Request => write!(f, "request_options"),
            DescriptorScope::Response => write!(f, "response_options"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DescriptorErrorKind {
    MissingRequest,
    MissingMethod,
    InvalidMethodType,
    InvalidMethod,
    MissingPath,
    InvalidPathType,
    InvalidPathFormat,
    InvalidHeaders,
    UnexpectedBody,
    InvalidBodyType,
    InvalidStatusCode,
    InvalidContentType,
    InvalidResponseType,
    InvalidExpectationBody,
    InvalidFieldExpectation { key: String },
    InvalidFieldType { key: String },
    ValueTypeMismatch { key: String },
}

/// A malformed request descriptor or response expectation.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{scope}: {}", self.reason())]
pub struct DescriptorError {
    pub scope: DescriptorScope,
    pub kind: DescriptorErrorKind,
}

impl DescriptorError {
    pub fn request(kind: DescriptorErrorKind) -> Self {
        Self {
            scope: DescriptorScope::Request,
            kind,
        }
    }

    pub fn response(kind: DescriptorErrorKind) -> Self {
        Self {
            scope: DescriptorScope::Response,
            kind,
        }
    }

    fn reason(&self) -> String {
        match &self.kind {
            DescriptorErrorKind::MissingRequest => "request_options not defined".into(),
            DescriptorErrorKind::MissingMethod => "method not specified".into(),
            DescriptorErrorKind::InvalidMethodType => "method not a string".into(),
            DescriptorErrorKind::InvalidMethod => "method not valid method".into(),
            DescriptorErrorKind::MissingPath => "path not specified".into(),
            DescriptorErrorKind::InvalidPathType => "path not a string".into(),
            DescriptorErrorKind::InvalidPathFormat => "path should contain /".into(),
            DescriptorErrorKind::InvalidHeaders => {
                "headers should be an object of string values".into()
            }
            DescriptorErrorKind::UnexpectedBody => {
                "should not contain body if method is get or delete".into()
            }
            DescriptorErrorKind::InvalidBodyType => "body should be an object".into(),
            DescriptorErrorKind::InvalidStatusCode => {
                "code not a valid http response code".into()
            }
            DescriptorErrorKind::InvalidContentType => {
                "content_type should be a valid pattern".into()
            }
            DescriptorErrorKind::InvalidResponseType => {
                "type should be 'object' or 'array'".into()
            }
            DescriptorErrorKind::InvalidExpectationBody => "body should be an object".into(),
            DescriptorErrorKind::InvalidFieldExpectation { key } => {
                format!("expectation for key `{}` is malformed", key)
            }
            DescriptorErrorKind::InvalidFieldType { key } => {
                format!("expected type for key `{}` is not a known type", key)
            }
            DescriptorErrorKind::ValueTypeMismatch { key } => format!(
                "body expected value should be same as expected type for key `{}`",
                key
            ),
        }
    }
}

/// The HTTP client could not complete the exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("hyper error: {0}")]
    Hyper(#[from] hyper::Error),
    #[error("http error: {0}")]
    Http(#[from] http::Error),
    #[error("invalid uri: {0}")]
    InvalidUri(String),
    #[error("invalid header name")]
    InvalidHeaderName,
    #[error("invalid header value")]
    InvalidHeaderValue,
    #[error("malformed json body: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ViolationKind {
    InvalidHttpCode,
    IncorrectContentType,
    IncorrectType,
    MissingBody,
    UnexpectedBody,
    UnknownKey,
    MissingKey,
    IncorrectValue,
}

impl ViolationKind {
    pub fn code(self) -> &'static str {
        match self {
            ViolationKind::InvalidHttpCode => "INVALID_HTTP_CODE",
            ViolationKind::IncorrectContentType => "INCORRECT_CONTENT_TYPE",
            ViolationKind::IncorrectType => "INCORRECT_TYPE",
            ViolationKind::MissingBody => "MISSING_BODY",
            ViolationKind::UnexpectedBody => "UNEXPECTED_BODY",
            ViolationKind::UnknownKey => "UNKNOWN_KEY",
            ViolationKind::MissingKey => "MISSING_KEY",
            ViolationKind::IncorrectValue => "INCORRECT_VALUE",
        }
    }
}

/// Part of the response a [`Violation`] was found in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ViolationScope {
    Body,
    Headers,
}

impl Display for ViolationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationScope::Body => write!(f, "body"),
            ViolationScope::Headers => write!(f, "headers"),
        }
    }
}

/// First structural mismatch between a response and its expectation.
///
/// `key` is the dotted path of the offending field, `None` for checks on the
/// response as a whole.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("response_validation: {}: {}", self.kind.code(), self.reason())]
pub struct Violation {
    pub kind: ViolationKind,
    pub key: Option<String>,
    pub scope: ViolationScope,
}

impl Violation {
    pub fn new(kind: ViolationKind) -> Self {
        Self {
            kind,
            key: None,
            scope: ViolationScope::Body,
        }
    }

    pub fn at<S: Into<String>>(kind: ViolationKind, key: S) -> Self {
        Self {
            kind,
            key: Some(key.into()),
            scope: ViolationScope::Body,
        }
    }

    /// Marks the violation as found in the response headers.
    pub fn in_headers(mut self) -> Self {
        self.scope = ViolationScope::Headers;
        self
    }

    fn reason(&self) -> String {
        let key = self.key.as_deref().unwrap_or("<root>");
        let scope = self.scope;

        match self.kind {
            ViolationKind::InvalidHttpCode => "http response code invalid".into(),
            ViolationKind::IncorrectContentType => "content type should match".into(),
            ViolationKind::IncorrectType => match &self.key {
                Some(key) => format!("incorrect type for key `{}` in {}", key, scope),
                None => "should be specified type".into(),
            },
            ViolationKind::MissingBody => format!("{} should not be null at `{}`", scope, key),
            ViolationKind::UnexpectedBody => format!("{} should be null at `{}`", scope, key),
            ViolationKind::UnknownKey => format!(
                "{} should not contain key `{}` not specified in validation {}",
                scope, key, scope
            ),
            ViolationKind::MissingKey => {
                format!("{} should contain required key `{}`", scope, key)
            }
            ViolationKind::IncorrectValue => {
                format!("incorrect value for key `{}` in {}", key, scope)
            }
        }
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Self {
        Error::Transport(TransportError::Hyper(e))
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::Transport(TransportError::Http(e))
    }
}

impl From<hyper::header::InvalidHeaderName> for Error {
    fn from(_: hyper::header::InvalidHeaderName) -> Self {
        Error::Transport(TransportError::InvalidHeaderName)
    }
}

impl From<hyper::header::InvalidHeaderValue> for Error {
    fn from(_: hyper::header::InvalidHeaderValue) -> Self {
        Error::Transport(TransportError::InvalidHeaderValue)
    }
}
