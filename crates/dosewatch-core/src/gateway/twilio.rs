//! Twilio REST adapter for the notification gateway.
//!
//! Posts form-encoded requests to `Calls.json` / `Messages.json` under the
//! account, authenticated with HTTP basic auth. The base URL is overridable
//! so tests can point at a local mock server.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{DeliveryId, NotificationGateway};
use crate::config::TwilioConfig;
use crate::error::GatewayError;

const TWILIO_API_BASE: &str = "https://api.twilio.com";

#[derive(Debug)]
pub struct TwilioGateway {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Deserialize)]
struct CreatedResource {
    sid: String,
}

impl TwilioGateway {
    /// Build a gateway from configuration.
    ///
    /// # Errors
    /// Returns an error if any credential field is empty.
    pub fn from_config(config: &TwilioConfig) -> Result<Self, GatewayError> {
        if config.account_sid.is_empty() || config.auth_token.is_empty() {
            return Err(GatewayError::NotConfigured(
                "twilio account_sid/auth_token not set".to_string(),
            ));
        }
        if config.from_number.is_empty() {
            return Err(GatewayError::NotConfigured(
                "twilio from_number not set".to_string(),
            ));
        }
        Ok(Self::new(
            TWILIO_API_BASE,
            &config.account_sid,
            &config.auth_token,
            &config.from_number,
        ))
    }

    /// Build a gateway against an explicit API base URL (tests).
    pub fn new(base_url: &str, account_sid: &str, auth_token: &str, from_number: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        }
    }

    async fn create(
        &self,
        resource: &str,
        form: &[(&str, &str)],
    ) -> Result<DeliveryId, GatewayError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/{resource}",
            self.base_url, self.account_sid
        );

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let created: CreatedResource = resp.json().await?;
            Ok(created.sid)
        } else if status.is_client_error() {
            // 4xx from Twilio means the request itself is bad (unreachable
            // number, bad credentials); retrying the same payload is futile.
            let text = resp.text().await.unwrap_or_default();
            Err(GatewayError::Rejected {
                reason: format!("HTTP {status}: {text}"),
            })
        } else {
            let text = resp.text().await.unwrap_or_default();
            Err(GatewayError::Transport {
                reason: format!("HTTP {status}: {text}"),
            })
        }
    }
}

#[async_trait]
impl NotificationGateway for TwilioGateway {
    async fn place_voice_call(&self, to: &str, script: &str) -> Result<DeliveryId, GatewayError> {
        self.create(
            "Calls.json",
            &[("Twiml", script), ("To", to), ("From", &self.from_number)],
        )
        .await
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<DeliveryId, GatewayError> {
        self.create(
            "Messages.json",
            &[("Body", body), ("To", to), ("From", &self.from_number)],
        )
        .await
    }
}
