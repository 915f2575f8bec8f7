//! Standardized API response wrapper for JSON endpoints.

use axum::http::StatusCode;
use axum::Json;
use courselens_core::Error;
use serde::Serialize;

/// Response envelope for all JSON API endpoints:
///
/// ```json
/// {
///   "success": true,
///   "data": { ... },
///   "message": "Some message"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Constructs a success response with the given data and message.
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Constructs an error response with a message and default `data`.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }
}

/// Map a core fault onto an HTTP status and error envelope.
pub fn fault(err: Error) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = match &err {
        Error::CourseNotFound(_) => StatusCode::NOT_FOUND,
        Error::Forbidden { .. } => StatusCode::FORBIDDEN,
        Error::UserNotEnrolled(_) | Error::EmptyUserSet => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match &err {
        Error::UserNotEnrolled(_) => "User not enrolled in course".to_string(),
        other => other.to_string(),
    };
    (status, Json(ApiResponse::error(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_status_mapping() {
        let (status, _) = fault(Error::CourseNotFound(9));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = fault(Error::UserNotEnrolled(3));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.message, "User not enrolled in course");

        let (status, _) = fault(Error::Forbidden {
            user_id: 1,
            capability: "report/analytics:view",
        });
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
