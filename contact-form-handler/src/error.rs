use lambda_http::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    Body, Response,
};
use tracing::{error, warn};

pub(crate) const TEXT_PLAIN_UTF_8: &str = "text/plain; charset=utf-8";

#[derive(Debug)]
pub enum ContactFormError {
    OriginRejected { origin: Option<String> },
    ValidationFailed(String),
    MalformedBody(String),
    MimeConstruction(String),
    Transport(String),
    NotFound,
}

impl ContactFormError {
    pub fn log(&self) {
        match self {
            ContactFormError::OriginRejected { origin } => {
                warn!("Origin not allowed: {}", origin.as_deref().unwrap_or("(none)"));
            }
            ContactFormError::ValidationFailed(description) => {
                warn!("Rejected contact form submission: {description}");
            }
            ContactFormError::MalformedBody(description) => {
                error!("Could not parse contact form submission: {description}");
            }
            ContactFormError::MimeConstruction(description) => {
                error!("MIME error: {description}");
            }
            ContactFormError::Transport(description) => {
                error!("Error sending contact form email: {description}");
            }
            ContactFormError::NotFound => {}
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ContactFormError::OriginRejected { .. } => StatusCode::FORBIDDEN,
            ContactFormError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ContactFormError::MalformedBody(_)
            | ContactFormError::MimeConstruction(_)
            | ContactFormError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ContactFormError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn into_response(self) -> Response<Body> {
        let status = self.status();
        let body = match self {
            ContactFormError::OriginRejected { .. } => "Origin not allowed".into(),
            ContactFormError::ValidationFailed(description) => description,
            ContactFormError::MalformedBody(description)
            | ContactFormError::Transport(description) => format!("Error: {description}"),
            ContactFormError::MimeConstruction(description) => format!("MIME error: {description}"),
            ContactFormError::NotFound => "Not Found".into(),
        };
        let mut response = Response::new(Body::Text(body));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF_8));
        response
    }
}

impl std::fmt::Display for ContactFormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContactFormError::OriginRejected { origin } => write!(
                f,
                "Origin not allowed: {}",
                origin.as_deref().unwrap_or("(none)")
            ),
            ContactFormError::ValidationFailed(description) => {
                write!(f, "Validation failed: {description}")
            }
            ContactFormError::MalformedBody(description) => {
                write!(f, "Malformed body: {description}")
            }
            ContactFormError::MimeConstruction(description) => {
                write!(f, "MIME error: {description}")
            }
            ContactFormError::Transport(description) => write!(f, "Transport error: {description}"),
            ContactFormError::NotFound => write!(f, "Not found"),
        }
    }
}

impl std::error::Error for ContactFormError {}
