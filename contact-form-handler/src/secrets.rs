use async_trait::async_trait;
use aws_config::BehaviorVersion;
use lambda_http::Error;
use serde::de::DeserializeOwned;

const SECRETS_REGION: &str = "eu-north-1";

/// Source of JSON-encoded secrets, such as SMTP credentials.
#[async_trait]
pub trait SecretRepository: Send + Sync {
    async fn open() -> Self;

    async fn get_secret<T: DeserializeOwned>(&self, name: &str) -> Result<T, Error>;
}

pub struct AwsSecretsManagerSecretRepository(aws_sdk_secretsmanager::Client);

#[async_trait]
impl SecretRepository for AwsSecretsManagerSecretRepository {
    async fn open() -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(SECRETS_REGION);
        if let Ok(url) = std::env::var("AWS_ENDPOINT_URL") {
            loader = loader.endpoint_url(url);
        }
        let config = loader.load().await;
        Self(aws_sdk_secretsmanager::Client::new(&config))
    }

    async fn get_secret<T: DeserializeOwned>(&self, name: &str) -> Result<T, Error> {
        let secret = self.0.get_secret_value().secret_id(name).send().await?;
        let Some(secret_value) = secret.secret_string() else {
            return Err(Box::new(SecretError::NotAString(name.into())));
        };
        Ok(serde_json::from_str(secret_value)?)
    }
}

#[derive(Debug)]
pub enum SecretError {
    NotAString(String),
    NotFound(String),
}

impl std::fmt::Display for SecretError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretError::NotAString(name) => write!(f, "Secret {name} has no string value"),
            SecretError::NotFound(name) => write!(f, "No such secret {name}"),
        }
    }
}

impl std::error::Error for SecretError {}
