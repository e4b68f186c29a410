use crate::config::Settings;
use crate::error::{BotError, Result};
use crate::messaging::{MessageReceipt, MessagingDispatcher, WHATSAPP_SCHEME};
use anyhow::Context;
use serde::Serialize;
use std::time::Duration;

const API_VERSION: &str = "2010-04-01";

#[derive(Debug, Clone)]
pub struct TwilioMessenger {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Debug, Serialize)]
struct CreateMessageForm<'a> {
    #[serde(rename = "From")]
    from: String,
    #[serde(rename = "To")]
    to: String,
    #[serde(rename = "Body")]
    body: &'a str,
}

impl TwilioMessenger {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let account_sid = settings.require_twilio_account_sid()?.to_string();
        let auth_token = settings.require_twilio_auth_token()?.to_string();
        let from_number = settings.require_phone_number()?.to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()
            .context("failed to build twilio http client")?;

        Ok(Self {
            http,
            base_url: settings.twilio_base_url.clone(),
            account_sid,
            auth_token,
            from_number,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/{API_VERSION}/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.account_sid
        )
    }

    fn form<'a>(&self, recipient_phone: &str, text: &'a str) -> CreateMessageForm<'a> {
        CreateMessageForm {
            from: format!("{WHATSAPP_SCHEME}{}", self.from_number),
            to: format!("{WHATSAPP_SCHEME}{recipient_phone}"),
            body: text,
        }
    }
}

#[async_trait::async_trait]
impl MessagingDispatcher for TwilioMessenger {
    async fn send(&self, recipient_phone: &str, text: &str) -> Result<MessageReceipt> {
        let res = self
            .http
            .post(self.url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&self.form(recipient_phone, text))
            .send()
            .await
            .map_err(|e| BotError::Delivery(format!("twilio request failed: {e}")))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| BotError::Delivery(format!("failed to read twilio response: {e}")))?;
        if !status.is_success() {
            return Err(BotError::Delivery(format!("twilio HTTP {status}: {body}")));
        }

        let receipt = serde_json::from_str::<MessageReceipt>(&body)
            .map_err(|e| BotError::Delivery(format!("unexpected twilio response ({e}): {body}")))?;
        tracing::info!(sid = %receipt.sid, status = ?receipt.status, "whatsapp message queued");
        Ok(receipt)
    }
}
