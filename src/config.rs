//! Environment-driven configuration.

use anyhow::Context;
use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    /// Absent means the in-memory store backs the service.
    pub database_url: Option<String>,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_api_base: String,
    pub gateway_timeout: Duration,
    /// Absent means confirmation mails are logged instead of sent.
    pub brevo_api_key: Option<String>,
    pub mail_from: String,
    pub currency: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
        let bind_addr =
            env::var("BIND_ADDR").unwrap_or_else(|_| format!("0.0.0.0:{port}"));
        let gateway_timeout_secs: u64 = env::var("GATEWAY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("GATEWAY_TIMEOUT_SECS must be an integer")?;

        Ok(Self {
            bind_addr,
            database_url: env::var("DATABASE_URL").ok(),
            razorpay_key_id: env::var("RAZORPAY_KEY_ID").context("RAZORPAY_KEY_ID is required")?,
            razorpay_key_secret: env::var("RAZORPAY_KEY_SECRET")
                .context("RAZORPAY_KEY_SECRET is required")?,
            razorpay_api_base: env::var("RAZORPAY_API_BASE")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            gateway_timeout: Duration::from_secs(gateway_timeout_secs),
            brevo_api_key: env::var("BREVO_API_KEY").ok(),
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "orders@localhost".to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string()),
        })
    }
}
