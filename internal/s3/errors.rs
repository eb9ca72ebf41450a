use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S3Error {
    Unauthorized,
    Forbidden,
    NoSuchKey,
    NoSuchBucket,
    NoSuchUpload,
    InvalidPart,
    InvalidArgument,
    NotImplemented,
    InternalError,
}

impl S3Error {
    pub fn code(&self) -> &'static str {
        match self {
            S3Error::Unauthorized => "Unauthorized",
            S3Error::Forbidden => "Forbidden",
            S3Error::NoSuchKey => "NoSuchKey",
            S3Error::NoSuchBucket => "NoSuchBucket",
            S3Error::NoSuchUpload => "NoSuchUpload",
            S3Error::InvalidPart => "InvalidPart",
            S3Error::InvalidArgument => "InvalidArgument",
            S3Error::NotImplemented => "NotImplemented",
            S3Error::InternalError => "InternalError",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            S3Error::Unauthorized => "Missing or invalid authorization token",
            S3Error::Forbidden => "Token is not valid for this bucket",
            S3Error::NoSuchKey => "The specified key does not exist",
            S3Error::NoSuchBucket => "The specified bucket does not exist",
            S3Error::NoSuchUpload => "The specified upload does not exist",
            S3Error::InvalidPart => "One or more of the specified parts could not be found",
            S3Error::InvalidArgument => "Invalid Argument",
            S3Error::NotImplemented => "Not Implemented",
            S3Error::InternalError => "Internal Error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            S3Error::Unauthorized => StatusCode::UNAUTHORIZED,
            S3Error::Forbidden => StatusCode::FORBIDDEN,
            S3Error::NoSuchKey => StatusCode::NOT_FOUND,
            S3Error::NoSuchBucket => StatusCode::NOT_FOUND,
            S3Error::NoSuchUpload => StatusCode::NOT_FOUND,
            S3Error::InvalidPart => StatusCode::BAD_REQUEST,
            S3Error::InvalidArgument => StatusCode::BAD_REQUEST,
            S3Error::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            S3Error::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub fn s3_error(error: S3Error, request_id: &str) -> Response {
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Error><Code>{}</Code><Message>{}</Message><RequestId>{}</RequestId></Error>",
        error.code(),
        error.message(),
        request_id
    );
    (
        error.status(),
        [
            ("Content-Type", "application/xml"),
            ("x-amz-request-id", request_id),
        ],
        body,
    )
        .into_response()
}
