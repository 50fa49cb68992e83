use rocket::http::{ContentType, Status};
use serde_json::json;

use crate::config::{AppConfig, ErrorFormat};
use crate::images::PreviewError;

#[derive(Debug)]
pub enum ApiError {
    PreviewError(PreviewError),
}

impl From<PreviewError> for ApiError {
    fn from(error: PreviewError) -> Self {
        ApiError::PreviewError(error)
    }
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::PreviewError(error) => match error {
                PreviewError::InvalidRequest(_) | PreviewError::OutOfBounds { .. } => {
                    Status::BadRequest
                }
                PreviewError::RemoteFetchFailed(_)
                | PreviewError::ImageNotFound(_)
                | PreviewError::NotAnImage(_)
                | PreviewError::ImageTooLarge { .. }
                | PreviewError::DecodeFailed(_) => Status::BadGateway,
                PreviewError::PersistFailed(_) | PreviewError::ResizeFailed(_) => {
                    Status::InternalServerError
                }
            },
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::PreviewError(error) => error.to_string(),
        }
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        let status = self.status();
        let message = self.message();

        if status.code >= 500 {
            log::error!("{} {} failed: {}", req.method(), req.uri(), message);
        } else {
            log::warn!("{} {} rejected: {}", req.method(), req.uri(), message);
        }

        let format = req
            .rocket()
            .state::<AppConfig>()
            .map(|config| config.error_format)
            .unwrap_or_default();

        let (content_type, body) = match format {
            ErrorFormat::Json => (ContentType::JSON, json!({ "message": message }).to_string()),
            ErrorFormat::Text => (ContentType::Plain, message),
        };

        rocket::Response::build()
            .status(status)
            .header(content_type)
            .sized_body(None, std::io::Cursor::new(body))
            .ok()
    }
}
