use crate::cors::AllowedOrigins;
use anyhow::{bail, Context};
use lettre::Address;
use std::collections::BTreeMap;

const DEFAULT_FROM_NAME: &str = "CivicLabs";
const DEFAULT_SMTP_URL: &str = "smtps://email-smtp.eu-north-1.amazonaws.com";
const DEFAULT_SMTP_CREDENTIALS_NAME: &str = "smtp-ses-credentials";

const DESTINATION_PREFIX: &str = "DESTINATION_";
const DESTINATION_SUFFIX: &str = "_EMAIL";

/// Static configuration of the handler, read once when the function starts.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Display name used in the `From` header.
    pub from_name: String,
    /// Address used as the `From` header and the envelope sender.
    pub from_email: Address,
    /// Every recipient of the contact form email, ordered by variable name.
    pub destinations: Vec<Address>,
    pub allowed_origins: AllowedOrigins,
    /// Incoming webhook notified after each successful submission, if any.
    pub slack_webhook: Option<String>,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub url: String,
    /// Name of the secret holding the SMTP username and password.
    pub credentials_name: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SMTP_URL.into(),
            credentials_name: DEFAULT_SMTP_CREDENTIALS_NAME.into(),
        }
    }
}

impl HandlerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Builds the configuration from `(name, value)` pairs as found in the environment.
    pub fn from_vars<I, K, V>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: BTreeMap<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        let Some(from_email) = lookup(&vars, "FROM_EMAIL") else {
            bail!("FROM_EMAIL must be set");
        };
        let from_email: Address = from_email
            .parse()
            .with_context(|| format!("FROM_EMAIL {from_email} is not a valid address"))?;

        let destinations = vars
            .iter()
            .filter(|(key, _)| is_destination_key(key))
            .map(|(key, value)| (key, value.trim()))
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| {
                value
                    .parse::<Address>()
                    .with_context(|| format!("{key} {value} is not a valid address"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        if destinations.is_empty() {
            bail!("At least one of DESTINATION_EMAIL or DESTINATION_*_EMAIL must be set");
        }

        let allowed_origins = match lookup(&vars, "ALLOWED_ORIGINS") {
            Some(origins) => AllowedOrigins::new(
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty()),
            ),
            None => AllowedOrigins::default(),
        };

        let defaults = SmtpConfig::default();
        let smtp = SmtpConfig {
            url: lookup(&vars, "SMTP_URL")
                .map(Into::into)
                .unwrap_or(defaults.url),
            credentials_name: lookup(&vars, "SMTP_CREDENTIALS_NAME")
                .map(Into::into)
                .unwrap_or(defaults.credentials_name),
        };

        Ok(Self {
            from_name: lookup(&vars, "FROM_NAME")
                .unwrap_or(DEFAULT_FROM_NAME)
                .into(),
            from_email,
            destinations,
            allowed_origins,
            slack_webhook: lookup(&vars, "SLACK_WEBHOOK").map(Into::into),
            smtp,
        })
    }
}

fn lookup<'a>(vars: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

// DESTINATION_EMAIL itself matches too.
fn is_destination_key(key: &str) -> bool {
    key.starts_with(DESTINATION_PREFIX) && key.ends_with(DESTINATION_SUFFIX)
}
