use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde::Serialize;
use thiserror::Error;

/// Reasons a candidate entry is rejected before any write is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name is required")]
    MissingName,

    #[error("Message is required")]
    MissingMessage,

    #[error("Please confirm your attendance")]
    MissingAttendance,

    #[error("Unknown attendance choice: '{0}'")]
    UnknownAttendance(String),

    #[error("{field} too long: {len} characters (max: {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

/// Failures talking to the remote collection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    #[error("Guestbook storage unavailable: {0}")]
    Unavailable(String),

    #[error("Guestbook query failed: {0}")]
    Query(String),

    #[error("Malformed guestbook record: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum GuestbookError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("A submission from you is already being sent")]
    InFlight,

    #[error("Too many submissions, please try again later")]
    Throttled,

    #[error("Could not save your message: {0}")]
    Remote(#[from] CollectionError),
}

impl GuestbookError {
    pub fn status(&self) -> Status {
        match self {
            GuestbookError::Invalid(_) => Status::UnprocessableEntity,
            GuestbookError::InFlight => Status::Conflict,
            GuestbookError::Throttled => Status::TooManyRequests,
            GuestbookError::Remote(_) => Status::ServiceUnavailable,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl<'r> Responder<'r, 'static> for GuestbookError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (self.status(), body).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            GuestbookError::from(ValidationError::MissingName).status(),
            Status::UnprocessableEntity
        );
        assert_eq!(GuestbookError::InFlight.status(), Status::Conflict);
        assert_eq!(GuestbookError::Throttled.status(), Status::TooManyRequests);
        assert_eq!(
            GuestbookError::from(CollectionError::Unavailable("down".into())).status(),
            Status::ServiceUnavailable
        );
    }

    #[test]
    fn too_long_message_names_the_field() {
        let err = ValidationError::TooLong {
            field: "Name",
            len: 120,
            max: 100,
        };
        assert_eq!(err.to_string(), "Name too long: 120 characters (max: 100)");
    }
}
