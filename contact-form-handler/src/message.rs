use crate::{
    config::HandlerConfig,
    error::ContactFormError,
    submission::{RequestMetadata, ValidatedSubmission},
};
use lettre::{
    message::{header::ContentType, Mailbox},
    Address, Message,
};
use serde::Serialize;
use tinytemplate::{error::Error, format_unescaped, TinyTemplate};

const CONTACT_MESSAGE_TEMPLATE_NAME: &str = "contact-message";
const CONTACT_MESSAGE_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/contact-message.txt"
));

#[derive(Serialize)]
struct Context<'a> {
    submission: &'a ValidatedSubmission<'a>,
    metadata: &'a RequestMetadata,
}

/// A serialized MIME message together with its SMTP envelope.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub raw: Vec<u8>,
    pub from: Address,
    pub to: Vec<Address>,
}

/// Renders the plain-text body of the email. Submitted values are inserted verbatim.
pub fn render_message_body(
    submission: &ValidatedSubmission,
    metadata: &RequestMetadata,
) -> Result<String, Error> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&format_unescaped);
    tt.add_template(CONTACT_MESSAGE_TEMPLATE_NAME, CONTACT_MESSAGE_TEMPLATE)?;
    tt.render(
        CONTACT_MESSAGE_TEMPLATE_NAME,
        &Context {
            submission,
            metadata,
        },
    )
}

pub fn subject_for(submission: &ValidatedSubmission) -> String {
    format!("Contact Form Submission from {}", submission.name)
}

pub fn build_email(
    config: &HandlerConfig,
    submission: &ValidatedSubmission,
    metadata: &RequestMetadata,
) -> Result<OutgoingEmail, ContactFormError> {
    let body = render_message_body(submission, metadata).map_err(|error| {
        ContactFormError::MimeConstruction(format!("Error rendering message body: {error}"))
    })?;

    let mut builder = Message::builder()
        .from(Mailbox::new(
            Some(config.from_name.clone()),
            config.from_email.clone(),
        ))
        .reply_to(Mailbox::new(
            Some(submission.name.into()),
            submission.address.clone(),
        ))
        .subject(subject_for(submission))
        .header(ContentType::TEXT_PLAIN);
    for destination in &config.destinations {
        builder = builder.to(Mailbox::new(None, destination.clone()));
    }
    let message = builder
        .body(body)
        .map_err(|error| ContactFormError::MimeConstruction(error.to_string()))?;

    let envelope = message.envelope();
    let Some(from) = envelope.from().cloned() else {
        return Err(ContactFormError::MimeConstruction(
            "Message has no sender".into(),
        ));
    };
    Ok(OutgoingEmail {
        from,
        to: envelope.to().to_vec(),
        raw: message.formatted(),
    })
}

#[cfg(test)]
mod tests {
    use super::{build_email, render_message_body};
    use crate::{
        config::{HandlerConfig, SmtpConfig},
        cors::AllowedOrigins,
        error::ContactFormError,
        submission::{ContactSubmission, RequestMetadata},
    };
    use googletest::prelude::*;
    use lambda_http::http::HeaderMap;

    fn config() -> HandlerConfig {
        HandlerConfig {
            from_name: "CivicLabs".into(),
            from_email: "noreply@civiclabs.us".parse().unwrap(),
            destinations: vec![
                "team@civiclabs.us".parse().unwrap(),
                "sales@civiclabs.us".parse().unwrap(),
            ],
            allowed_origins: AllowedOrigins::default(),
            slack_webhook: None,
            smtp: SmtpConfig::default(),
        }
    }

    fn submission(message: &str) -> ContactSubmission {
        ContactSubmission {
            name: Some("Ana".into()),
            email: Some("ana@x.com".into()),
            company: Some("Acme".into()),
            message: Some(message.into()),
        }
    }

    fn metadata() -> RequestMetadata {
        RequestMetadata {
            client_ip: "203.0.113.7".into(),
            ..RequestMetadata::from_headers(&HeaderMap::new())
        }
    }

    #[test]
    fn renders_all_fields_and_metadata() -> Result<()> {
        let submission = submission("Hi");

        let body = render_message_body(&submission.validate().unwrap(), &metadata()).unwrap();

        verify_that!(
            body,
            eq("Name: Ana\n\
                Email: ana@x.com\n\
                Company: Acme\n\
                Message: Hi\n\
                IP Address: 203.0.113.7\n\
                Country: Unknown\n\
                Region: Unknown\n\
                City: Unknown\n\
                Timezone: Unknown")
        )
    }

    #[test]
    fn does_not_escape_user_input() -> Result<()> {
        let submission = submission("Tom & Jerry <3");

        let body = render_message_body(&submission.validate().unwrap(), &metadata()).unwrap();

        verify_that!(body, contains_substring("Message: Tom & Jerry <3"))
    }

    #[googletest::test]
    fn builds_message_with_headers_and_envelope() {
        let submission = submission("Hi");

        let email = build_email(&config(), &submission.validate().unwrap(), &metadata()).unwrap();
        let raw = String::from_utf8(email.raw).unwrap();

        expect_that!(email.from.to_string(), eq("noreply@civiclabs.us"));
        expect_that!(
            email
                .to
                .iter()
                .map(|address| address.to_string())
                .collect::<Vec<_>>(),
            elements_are![eq("team@civiclabs.us"), eq("sales@civiclabs.us")]
        );
        expect_that!(
            raw,
            all!(
                contains_substring("From: CivicLabs"),
                contains_substring("<noreply@civiclabs.us>"),
                contains_substring("Reply-To: "),
                contains_substring("<ana@x.com>"),
                contains_substring("team@civiclabs.us"),
                contains_substring("sales@civiclabs.us"),
                contains_substring("Subject: Contact Form Submission from Ana"),
                contains_substring("Content-Type: text/plain"),
                contains_substring("Company: Acme")
            )
        );
    }

    #[test]
    fn reports_mime_error_without_destinations() -> Result<()> {
        let config = HandlerConfig {
            destinations: vec![],
            ..config()
        };
        let submission = submission("Hi");

        let result = build_email(&config, &submission.validate().unwrap(), &metadata());

        verify_that!(
            result,
            err(matches_pattern!(ContactFormError::MimeConstruction(
                anything()
            )))
        )
    }
}
