use axum::http::StatusCode;
use serde::Serialize;
use services::ServiceError;

/// Standardized API response wrapper for all outgoing JSON responses.
///
/// Every endpoint answers with the same envelope:
/// ```json
/// {
///   "success": true,
///   "data": { ... },
///   "message": "Some message"
/// }
/// ```
///
/// - `T` is the type of the `data` payload.
/// - `success` indicates whether the operation went through.
/// - `message` provides a human-readable context string.
#[derive(Serialize)]
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
    ///
    /// # Requires
    /// - `T` must implement `Default`, since error responses do not include useful data.
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

/// Maps a service outcome onto the HTTP status it travels under.
///
/// The mapping follows the error taxonomy rather than severity: duplicates
/// and state conflicts are 409 ("already checked in" is information, not a
/// fault), token and proximity refusals are 422 (the user should scan again
/// or move closer), and only database failures become 500.
pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) | ServiceError::UnknownSession(_) => StatusCode::NOT_FOUND,
        ServiceError::AmbiguousMatch { .. } => StatusCode::CONFLICT,
        ServiceError::SessionNotActive | ServiceError::SessionClosed => StatusCode::CONFLICT,
        ServiceError::TokenMismatch
        | ServiceError::ExpiredToken
        | ServiceError::OutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::DuplicateCheckIn => StatusCode::CONFLICT,
        ServiceError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Shorthand for the common "map a ServiceError to (status, envelope)" tail.
pub fn error_response<T>(err: &ServiceError) -> (StatusCode, axum::Json<ApiResponse<T>>)
where
    T: Serialize + Default,
{
    if matches!(err, ServiceError::Db(_)) {
        tracing::error!(error = %err, "request failed on a database error");
    }
    (status_for(err), axum::Json(ApiResponse::error(err.to_string())))
}
