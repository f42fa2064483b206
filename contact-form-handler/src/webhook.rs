use crate::submission::ValidatedSubmission;
use async_trait::async_trait;
use lambda_http::Error;
use reqwest::Client;
use serde::Serialize;

/// Summary of a submission posted to the notification webhook.
///
/// `text` is what Slack displays; the remaining fields are there for any other consumer.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WebhookPayload<'a> {
    pub text: String,
    pub name: &'a str,
    pub email: &'a str,
    pub company: &'a str,
    pub message: &'a str,
}

impl<'a> WebhookPayload<'a> {
    pub fn new(submission: &ValidatedSubmission<'a>) -> Self {
        Self {
            text: format!(
                "New contact form submission from {} <{}> ({}):\n{}",
                submission.name, submission.email, submission.company, submission.message
            ),
            name: submission.name,
            email: submission.email,
            company: submission.company,
            message: submission.message,
        }
    }
}

#[async_trait]
pub trait WebhookNotifier: Send + Sync {
    async fn notify(&self, payload: &WebhookPayload<'_>) -> Result<(), Error>;
}

pub struct SlackWebhookNotifier {
    client: Client,
    url: String,
}

impl SlackWebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl WebhookNotifier for SlackWebhookNotifier {
    async fn notify(&self, payload: &WebhookPayload<'_>) -> Result<(), Error> {
        self.client
            .post(&self.url)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
