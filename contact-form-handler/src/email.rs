use crate::{config::SmtpConfig, secrets::SecretRepository};
use async_once_cell::OnceCell;
use async_trait::async_trait;
use lambda_http::Error;
use lettre::{
    address::Envelope,
    transport::smtp::authentication::{Credentials, Mechanism},
    Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use serde::Deserialize;
use tracing::info;

/// Delivers an already serialized MIME message.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, raw_message: &[u8], from: &Address, to: &[Address]) -> Result<(), Error>;
}

pub struct SmtpEmailSender<SecretRepositoryT: SecretRepository> {
    smtp: SmtpConfig,
    secrets_repository: SecretRepositoryT,
    mailer: OnceCell<AsyncSmtpTransport<Tokio1Executor>>,
}

impl<SecretRepositoryT: SecretRepository> SmtpEmailSender<SecretRepositoryT> {
    pub fn new(smtp: SmtpConfig, secrets_repository: SecretRepositoryT) -> Self {
        Self {
            smtp,
            secrets_repository,
            mailer: Default::default(),
        }
    }

    async fn initialise_mailer(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, Error> {
        let smtp_url = self.smtp.url.as_str();
        // Credentials are only ever sent over TLS. A misconfigured plain-text URL makes the
        // server reject the session instead.
        let credentials = if smtp_url.starts_with("smtps://") {
            let parsed_credentials: SmtpCredentials = self
                .secrets_repository
                .get_secret(&self.smtp.credentials_name)
                .await?;
            Some(Credentials::new(
                parsed_credentials.username,
                parsed_credentials.password,
            ))
        } else {
            None
        };

        info!("Connecting to {smtp_url}");
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::from_url(smtp_url)?
            .authentication(vec![Mechanism::Plain]);
        if let Some(credentials) = credentials {
            builder = builder.credentials(credentials);
        }
        Ok(builder.build())
    }
}

#[async_trait]
impl<SecretRepositoryT: SecretRepository> EmailSender for SmtpEmailSender<SecretRepositoryT> {
    async fn send(&self, raw_message: &[u8], from: &Address, to: &[Address]) -> Result<(), Error> {
        let envelope = Envelope::new(Some(from.clone()), to.to_vec())?;
        let mailer = self
            .mailer
            .get_or_try_init(self.initialise_mailer())
            .await
            .map_err(|error| format!("Unable to connect to SMTP server: {error}"))?;
        mailer.send_raw(&envelope, raw_message).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct SmtpCredentials {
    #[serde(rename = "SMTP_USERNAME")]
    username: String,
    #[serde(rename = "SMTP_PASSWORD")]
    password: String,
}
