//! The `{success, data}` / `{success: false, error}` envelope every command
//! prints, and the mapping from each crate's error kinds onto it.

use serde::Serialize;
use serde_json::Value;

const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    Conflict,
    Internal,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

/// What an external process left behind when it failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Details {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
}

impl Details {
    pub fn new(code: i32, stderr: &str, stdout: &str) -> Self {
        let captured = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());
        Self { code, stderr: captured(stderr), stdout: captured(stdout) }
    }
}

impl From<(i32, &str, &str)> for Details {
    fn from((code, stderr, stdout): (i32, &str, &str)) -> Self {
        Self::new(code, stderr, stdout)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Response {
    #[serde(skip)]
    pub status: Status,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Details>,
}

impl Response {
    pub fn ok(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => {
                Self { status: Status::Ok, success: true, data: Some(data), error: None, code: None, details: None }
            },
            Err(err) => {
                tracing::error!(error = %err, "Could not serialize response");
                Self::internal()
            },
        }
    }

    pub fn failure(status: Status, error: impl Into<String>) -> Self {
        Self { status, success: false, data: None, error: Some(error.into()), code: None, details: None }
    }

    /// A failure that says nothing about what went wrong.
    pub fn internal() -> Self {
        Self::failure(Status::Internal, INTERNAL_ERROR)
    }

    fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    fn with_details(mut self, details: Option<Details>) -> Self {
        self.details = details;
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|_| format!(r#"{{"success":false,"error":"{INTERNAL_ERROR}"}}"#))
    }
}

/// Turns an error into the response the caller sees. Anything not deliberately
/// classified becomes [`Response::internal`].
pub trait IntoResponse {
    fn into_response(&self) -> Response;
}

impl IntoResponse for scanbridge_devices::error::ErrorKind {
    fn into_response(&self) -> Response {
        use scanbridge_devices::error::ErrorKind;
        match self {
            ErrorKind::UnknownDriver(_) => Response::failure(Status::BadRequest, self.to_string()),
            ErrorKind::Console | ErrorKind::AllDriversFailed(_) => {
                Response::failure(Status::Internal, self.to_string())
            },
            ErrorKind::DeviceList { .. } => Response::failure(Status::Internal, self.to_string())
                .with_details(self.process_details().map(Details::from)),
            ErrorKind::Enumeration(_) | ErrorKind::MalformedListing => Response::internal(),
        }
    }
}

impl IntoResponse for scanbridge_profiles::error::ErrorKind {
    fn into_response(&self) -> Response {
        use scanbridge_profiles::error::ErrorKind;
        let (status, code) = match self {
            ErrorKind::Validation(_) => (Status::BadRequest, "VALIDATION_ERROR"),
            ErrorKind::NotFound(_) => (Status::NotFound, "NOT_FOUND"),
            ErrorKind::Duplicate(_) => (Status::Conflict, "DUPLICATE_ERROR"),
            ErrorKind::Parse(_) => (Status::Internal, "PARSE_ERROR"),
            ErrorKind::Io(_) => return Response::internal(),
        };
        Response::failure(status, self.to_string()).with_code(code)
    }
}

impl IntoResponse for scanbridge_scan::error::ErrorKind {
    fn into_response(&self) -> Response {
        use scanbridge_scan::error::ErrorKind;
        match self {
            ErrorKind::Validation(_) => Response::failure(Status::BadRequest, self.to_string()),
            ErrorKind::ProfileNotFound(_) => Response::failure(Status::NotFound, self.to_string()),
            ErrorKind::Execution { .. } => Response::failure(Status::Internal, self.to_string())
                .with_details(self.process_details().map(Details::from)),
            ErrorKind::Profiles | ErrorKind::Console | ErrorKind::Verification(_) | ErrorKind::Closed => {
                Response::failure(Status::Internal, self.to_string())
            },
            ErrorKind::Io(_) => Response::internal(),
        }
    }
}

impl IntoResponse for scanbridge_config::error::ErrorKind {
    fn into_response(&self) -> Response {
        Response::failure(Status::Internal, self.to_string())
    }
}
