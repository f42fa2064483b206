use crate::{
    config::HandlerConfig,
    email::EmailSender,
    error::{ContactFormError, TEXT_PLAIN_UTF_8},
    message::build_email,
    submission::{ContactSubmission, RequestMetadata, ValidatedSubmission},
    webhook::{WebhookNotifier, WebhookPayload},
};
use lambda_http::{
    http::{
        header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, ORIGIN},
        Method, StatusCode,
    },
    Body, Error, Request, Response,
};
use tracing::{debug, info, warn};

pub const CONTACT_PATH: &str = "/api/contact";

pub struct ContactFormHandler<EmailSenderT: EmailSender, WebhookNotifierT: WebhookNotifier> {
    config: HandlerConfig,
    email_sender: EmailSenderT,
    webhook_notifier: Option<WebhookNotifierT>,
}

impl<EmailSenderT: EmailSender, WebhookNotifierT: WebhookNotifier>
    ContactFormHandler<EmailSenderT, WebhookNotifierT>
{
    pub fn new(
        config: HandlerConfig,
        email_sender: EmailSenderT,
        webhook_notifier: Option<WebhookNotifierT>,
    ) -> Self {
        Self {
            config,
            email_sender,
            webhook_notifier,
        }
    }

    pub async fn handle(&self, event: Request) -> Result<Response<Body>, Error> {
        let origin = event
            .headers()
            .get(ORIGIN)
            .and_then(|value| value.to_str().ok());
        info!(
            "Received {} {} from origin {}",
            event.method(),
            event.uri().path(),
            origin.unwrap_or("(none)")
        );

        if event.method() == Method::OPTIONS {
            debug!("Answering CORS preflight request");
            return Ok(self.config.allowed_origins.preflight_response(origin)?);
        }
        if event.method() != Method::POST || event.uri().path() != CONTACT_PATH {
            return Ok(ContactFormError::NotFound.into_response());
        }

        match self.process_submission(&event, origin).await {
            Ok(origin) => Ok(Self::success_response(origin)?),
            Err(error) => {
                error.log();
                Ok(error.into_response())
            }
        }
    }

    async fn process_submission<'a>(
        &self,
        event: &Request,
        origin: Option<&'a str>,
    ) -> Result<&'a str, ContactFormError> {
        let Some(origin) = origin.filter(|origin| self.config.allowed_origins.contains(origin))
        else {
            return Err(ContactFormError::OriginRejected {
                origin: origin.map(Into::into),
            });
        };

        let body: &[u8] = event.body();
        let submission: ContactSubmission = serde_json::from_slice(body)
            .map_err(|error| ContactFormError::MalformedBody(error.to_string()))?;
        debug!("Received submission {submission:?}");
        let submission = submission.validate()?;
        let metadata = RequestMetadata::from_headers(event.headers());

        let email = build_email(&self.config, &submission, &metadata)?;
        debug!("Constructed email:\n{}", String::from_utf8_lossy(&email.raw));

        self.email_sender
            .send(&email.raw, &email.from, &email.to)
            .await
            .map_err(|error| ContactFormError::Transport(error.to_string()))?;
        info!("Contact form email sent to {} recipient(s)", email.to.len());

        self.notify_webhook(&submission).await;
        Ok(origin)
    }

    async fn notify_webhook(&self, submission: &ValidatedSubmission<'_>) {
        let Some(webhook_notifier) = self.webhook_notifier.as_ref() else {
            return;
        };
        match webhook_notifier
            .notify(&WebhookPayload::new(submission))
            .await
        {
            Ok(()) => debug!("Webhook notified"),
            Err(error) => warn!("Could not notify webhook, ignoring: {error}"),
        }
    }

    fn success_response(origin: &str) -> Result<Response<Body>, lambda_http::http::Error> {
        Response::builder()
            .status(StatusCode::OK)
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, origin)
            .header(CONTENT_TYPE, TEXT_PLAIN_UTF_8)
            .body("Form submission successful".into())
    }
}
