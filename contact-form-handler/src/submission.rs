use crate::error::ContactFormError;
use lambda_http::http::HeaderMap;
use lettre::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder for request metadata the platform did not supply.
pub const UNKNOWN: &str = "Unknown";

const CLIENT_IP_HEADER: &str = "cf-connecting-ip";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const COUNTRY_HEADER: &str = "cloudfront-viewer-country";
const FALLBACK_COUNTRY_HEADER: &str = "cf-ipcountry";
const REGION_HEADER: &str = "cloudfront-viewer-country-region";
const CITY_HEADER: &str = "cloudfront-viewer-city";
const TIMEZONE_HEADER: &str = "cloudfront-viewer-time-zone";

/// The JSON body of a contact form submission, as sent by the browser.
///
/// Fields are kept as raw JSON values: anything other than a non-empty string counts as missing.
#[derive(Deserialize, Debug, Default)]
pub struct ContactSubmission {
    pub name: Option<Value>,
    pub email: Option<Value>,
    pub company: Option<Value>,
    pub message: Option<Value>,
}

impl ContactSubmission {
    pub fn validate(&self) -> Result<ValidatedSubmission<'_>, ContactFormError> {
        let (Some(name), Some(email), Some(company), Some(message)) = (
            non_empty(&self.name),
            non_empty(&self.email),
            non_empty(&self.company),
            non_empty(&self.message),
        ) else {
            return Err(ContactFormError::ValidationFailed(
                "Missing required fields".into(),
            ));
        };
        // The name ends up in the Reply-To and Subject headers.
        if name.chars().any(char::is_control) {
            return Err(ContactFormError::ValidationFailed(
                "Name must not contain control characters".into(),
            ));
        }
        let Ok(address) = email.parse() else {
            return Err(ContactFormError::ValidationFailed(format!(
                "Invalid email address {email}"
            )));
        };

        Ok(ValidatedSubmission {
            name,
            email,
            company,
            message,
            address,
        })
    }
}

fn non_empty(field: &Option<Value>) -> Option<&str> {
    field
        .as_ref()
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

/// A submission whose fields are all present and non-empty.
#[derive(Serialize, Debug, Clone)]
pub struct ValidatedSubmission<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub company: &'a str,
    pub message: &'a str,
    #[serde(skip)]
    pub address: Address,
}

/// Where the submission came from, according to the headers added by the CDN in front of us.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RequestMetadata {
    pub client_ip: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub timezone: String,
}

impl RequestMetadata {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let client_ip = header_value(headers, CLIENT_IP_HEADER).or_else(|| {
            header_value(headers, FORWARDED_FOR_HEADER)
                .and_then(|forwarded| forwarded.split(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        });
        let country = header_value(headers, COUNTRY_HEADER)
            .or_else(|| header_value(headers, FALLBACK_COUNTRY_HEADER));

        Self {
            client_ip: or_unknown(client_ip),
            country: or_unknown(country),
            region: or_unknown(header_value(headers, REGION_HEADER)),
            city: or_unknown(header_value(headers, CITY_HEADER)),
            timezone: or_unknown(header_value(headers, TIMEZONE_HEADER)),
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn or_unknown(value: Option<&str>) -> String {
    value.unwrap_or(UNKNOWN).into()
}

#[cfg(test)]
mod tests {
    use super::{ContactSubmission, RequestMetadata};
    use crate::error::ContactFormError;
    use googletest::prelude::*;
    use lambda_http::http::{HeaderMap, HeaderValue};
    use serde_json::{json, Value};

    fn complete_submission() -> ContactSubmission {
        ContactSubmission {
            name: Some("Ana".into()),
            email: Some("ana@x.com".into()),
            company: Some("Acme".into()),
            message: Some("Hi".into()),
        }
    }

    #[test]
    fn accepts_complete_submission() -> Result<()> {
        let submission = complete_submission();

        let validated = submission.validate().unwrap();

        verify_that!(validated.name, eq("Ana"))?;
        verify_that!(validated.address.to_string(), eq("ana@x.com"))
    }

    #[test]
    fn rejects_each_missing_field() -> Result<()> {
        let without_fields = [
            ContactSubmission {
                name: None,
                ..complete_submission()
            },
            ContactSubmission {
                email: None,
                ..complete_submission()
            },
            ContactSubmission {
                company: None,
                ..complete_submission()
            },
            ContactSubmission {
                message: None,
                ..complete_submission()
            },
        ];

        for submission in without_fields {
            verify_that!(
                submission.validate(),
                err(matches_pattern!(ContactFormError::ValidationFailed(eq(
                    "Missing required fields"
                ))))
            )?;
        }
        Ok(())
    }

    #[test]
    fn treats_empty_string_as_missing() -> Result<()> {
        let submission = ContactSubmission {
            company: Some("".into()),
            ..complete_submission()
        };

        verify_that!(
            submission.validate(),
            err(matches_pattern!(ContactFormError::ValidationFailed(eq(
                "Missing required fields"
            ))))
        )
    }

    #[test]
    fn treats_non_string_values_as_missing() -> Result<()> {
        let without_strings = [
            ContactSubmission {
                name: Some(json!(0)),
                ..complete_submission()
            },
            ContactSubmission {
                email: Some(json!(false)),
                ..complete_submission()
            },
            ContactSubmission {
                company: Some(Value::Null),
                ..complete_submission()
            },
            ContactSubmission {
                message: Some(json!(42)),
                ..complete_submission()
            },
        ];

        for submission in without_strings {
            verify_that!(
                submission.validate(),
                err(matches_pattern!(ContactFormError::ValidationFailed(eq(
                    "Missing required fields"
                ))))
            )?;
        }
        Ok(())
    }

    #[test]
    fn rejects_line_breaks_and_control_characters_in_name() -> Result<()> {
        for name in ["Ana\r\nBcc: evil@x.com", "Ana\nB", "Ana\u{0}", "Ana\tB"] {
            let submission = ContactSubmission {
                name: Some(name.into()),
                ..complete_submission()
            };

            verify_that!(
                submission.validate(),
                err(matches_pattern!(ContactFormError::ValidationFailed(
                    contains_substring("control characters")
                )))
            )?;
        }
        Ok(())
    }

    #[test]
    fn accepts_line_breaks_in_company_and_message() -> Result<()> {
        let submission = ContactSubmission {
            company: Some("Acme\r\nLabs".into()),
            message: Some("First line\nSecond line\tindented".into()),
            ..complete_submission()
        };

        let validated = submission.validate().unwrap();

        verify_that!(validated.company, eq("Acme\r\nLabs"))?;
        verify_that!(validated.message, eq("First line\nSecond line\tindented"))
    }

    #[test]
    fn accepts_quotes_and_non_ascii_in_name() -> Result<()> {
        let submission = ContactSubmission {
            name: Some("José \"Q\"".into()),
            ..complete_submission()
        };

        verify_that!(submission.validate(), ok(anything()))
    }

    #[test]
    fn rejects_unparseable_email_address() -> Result<()> {
        let submission = ContactSubmission {
            email: Some("not an address".into()),
            ..complete_submission()
        };

        verify_that!(
            submission.validate(),
            err(matches_pattern!(ContactFormError::ValidationFailed(
                contains_substring("Invalid email address not an address")
            )))
        )
    }

    #[test]
    fn defaults_missing_metadata_to_unknown() -> Result<()> {
        let metadata = RequestMetadata::from_headers(&HeaderMap::new());

        verify_that!(
            metadata,
            eq(RequestMetadata {
                client_ip: "Unknown".into(),
                country: "Unknown".into(),
                region: "Unknown".into(),
                city: "Unknown".into(),
                timezone: "Unknown".into(),
            })
        )
    }

    #[test]
    fn reads_metadata_from_cdn_headers() -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.7"));
        headers.insert("cloudfront-viewer-country", HeaderValue::from_static("US"));
        headers.insert(
            "cloudfront-viewer-country-region",
            HeaderValue::from_static("CO"),
        );
        headers.insert("cloudfront-viewer-city", HeaderValue::from_static("Denver"));
        headers.insert(
            "cloudfront-viewer-time-zone",
            HeaderValue::from_static("America/Denver"),
        );

        let metadata = RequestMetadata::from_headers(&headers);

        verify_that!(
            metadata,
            eq(RequestMetadata {
                client_ip: "203.0.113.7".into(),
                country: "US".into(),
                region: "CO".into(),
                city: "Denver".into(),
                timezone: "America/Denver".into(),
            })
        )
    }

    #[test]
    fn keeps_tabs_in_metadata_headers_verbatim() -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert("cloudfront-viewer-city", HeaderValue::from_static("New\tYork"));

        let metadata = RequestMetadata::from_headers(&headers);

        verify_that!(metadata.city, eq("New\tYork"))
    }

    #[test]
    fn ignores_metadata_headers_that_are_not_visible_ascii() -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cloudfront-viewer-city",
            HeaderValue::from_bytes(b"M\xfcnchen").unwrap(),
        );

        let metadata = RequestMetadata::from_headers(&headers);

        verify_that!(metadata.city, eq("Unknown"))
    }

    #[test]
    fn falls_back_to_first_forwarded_address() -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.2, 10.0.0.1"),
        );
        headers.insert("cf-ipcountry", HeaderValue::from_static("DE"));

        let metadata = RequestMetadata::from_headers(&headers);

        verify_that!(metadata.client_ip, eq("198.51.100.2"))?;
        verify_that!(metadata.country, eq("DE"))
    }
}
