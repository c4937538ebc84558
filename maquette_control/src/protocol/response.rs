//! Response lines.

use maquette_common::consts::MAX_RESPONSE_BODY;
use std::fmt;

/// Response status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
    /// Unsolicited notification, not tied to a request.
    Info,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::Info => "INFO",
        }
    }
}

/// One `<STATUS>:<BODY>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: Status,
    body: String,
}

impl Response {
    pub fn new(status: Status, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(Status::Ok, body)
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self::new(Status::Error, body)
    }

    pub fn info(body: impl Into<String>) -> Self {
        Self::new(Status::Info, body)
    }

    /// Build a response from format arguments. The body is cut to
    /// `MAX_RESPONSE_BODY` characters.
    ///
    /// ```
    /// use maquette_control::protocol::{Response, Status};
    /// let r = Response::formatted(Status::Ok, format_args!("{:.3}", 812.25));
    /// assert_eq!(r.encode(), "OK:812.250\n");
    /// ```
    pub fn formatted(status: Status, args: fmt::Arguments<'_>) -> Self {
        let mut body = fmt::format(args);
        if let Some((cut, _)) = body.char_indices().nth(MAX_RESPONSE_BODY) {
            body.truncate(cut);
        }
        Self::new(status, body)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Wire form, newline terminated.
    pub fn encode(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.status.as_str(), self.body)
    }
}
