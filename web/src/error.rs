/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::Error as AnyhowError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use builder::scheduler::{ActionError, SubmissionError};
use remote_core::types::BaseResponse;
use std::fmt;

#[derive(Debug)]
pub enum WebError {
    BadRequest(String),
    NotFound(String),
    Submission(SubmissionError),
    Action(ActionError),
    Internal(AnyhowError),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            WebError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            WebError::Submission(err) => write!(f, "Submission error: {}", err),
            WebError::Action(err) => write!(f, "Action error: {}", err),
            WebError::Internal(err) => write!(f, "Internal error: {}", err),
        }
    }
}

impl std::error::Error for WebError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WebError::Submission(err) => Some(err),
            WebError::Action(err) => Some(err),
            WebError::Internal(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<SubmissionError> for WebError {
    fn from(err: SubmissionError) -> Self {
        WebError::Submission(err)
    }
}

impl From<ActionError> for WebError {
    fn from(err: ActionError) -> Self {
        WebError::Action(err)
    }
}

impl From<AnyhowError> for WebError {
    fn from(err: AnyhowError) -> Self {
        WebError::Internal(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            WebError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            WebError::Submission(err) => match err {
                SubmissionError::QueueFull(_) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
                _ => (StatusCode::BAD_REQUEST, err.to_string()),
            },
            WebError::Action(err) => match err {
                ActionError::NotFound(_) | ActionError::NotAvailable(_) => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                ActionError::Builder(e) => {
                    tracing::error!("Builder action failed: {:#}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
                }
            },
            WebError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(BaseResponse {
            error: true,
            message: error_message,
        });

        (status, body).into_response()
    }
}

pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    pub fn not_found(resource: &str) -> Self {
        WebError::NotFound(format!("{} not found", resource))
    }

    pub fn invalid_parameter(name: &str, value: &str) -> Self {
        WebError::BadRequest(format!("Invalid {} `{}`", name, value))
    }
}
