use lambda_http::{
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        StatusCode,
    },
    Body, Response,
};

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "https://civiclabs.us",
    "https://civic-labs.ai",
    "http://localhost:51287",
];

const ALLOWED_METHODS: &str = "POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";
const ANY_ORIGIN: &str = "*";

/// Frontend origins permitted to submit the contact form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedOrigins(Vec<String>);

impl AllowedOrigins {
    pub fn new(origins: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(origins.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.0.iter().any(|allowed| allowed == origin)
    }

    /// The value for `Access-Control-Allow-Origin`: the origin itself if it is allowed, else `*`.
    pub fn allow_origin_value<'a>(&self, origin: Option<&'a str>) -> &'a str {
        match origin {
            Some(origin) if self.contains(origin) => origin,
            _ => ANY_ORIGIN,
        }
    }

    pub fn preflight_response(
        &self,
        origin: Option<&str>,
    ) -> Result<Response<Body>, lambda_http::http::Error> {
        Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin_value(origin))
            .header(ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS)
            .header(ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS)
            .body(Body::Empty)
    }
}

impl Default for AllowedOrigins {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_ORIGINS)
    }
}
