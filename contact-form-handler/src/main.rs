use contact_form_handler::{
    email::SmtpEmailSender,
    secrets::{AwsSecretsManagerSecretRepository, SecretRepository},
    webhook::SlackWebhookNotifier,
    ContactFormHandler, HandlerConfig,
};
use lambda_http::{run, service_fn, Error};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let config = HandlerConfig::from_env()?;
    info!(
        "Forwarding contact form submissions from {} to {} recipient(s)",
        config.from_email,
        config.destinations.len()
    );
    let secrets_repository = AwsSecretsManagerSecretRepository::open().await;
    let email_sender = SmtpEmailSender::new(config.smtp.clone(), secrets_repository);
    let webhook_notifier = config.slack_webhook.clone().map(SlackWebhookNotifier::new);
    let handler = ContactFormHandler::new(config, email_sender, webhook_notifier);

    run(service_fn(|event| handler.handle(event))).await
}
