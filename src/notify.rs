// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Emergency notifications.
//!
//! An assistance request fans one alert out to every emergency contact of
//! the caller. Delivery failures are collected per contact and returned to
//! the caller; they never fail the request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::storage::EmergencyContact;

const DEFAULT_TWILIO_API_BASE_URL: &str = "https://api.twilio.com";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notifications are not configured")]
    NotConfigured,

    #[error("Notification request failed: {0}")]
    Request(String),

    #[error("Notification provider rejected the message: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn notify(&self, phone: &str, message: &str) -> Result<(), NotifyError>;
}

/// Sender used when no provider is configured. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSender;

#[async_trait]
impl NotificationSender for DisabledSender {
    async fn notify(&self, _phone: &str, _message: &str) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }
}

/// Delivery channel for Twilio messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwilioChannel {
    WhatsApp,
    Sms,
}

impl TwilioChannel {
    /// Parse `TWILIO_CHANNEL`; anything but `sms` means WhatsApp.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("sms") {
            TwilioChannel::Sms
        } else {
            TwilioChannel::WhatsApp
        }
    }

    fn address(&self, phone: &str) -> String {
        match self {
            TwilioChannel::WhatsApp => format!("whatsapp:{phone}"),
            TwilioChannel::Sms => phone.to_string(),
        }
    }
}

/// Credentials and sender number for the Twilio Messages API.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub channel: TwilioChannel,
}

#[derive(Debug, Clone)]
pub struct TwilioSender {
    config: TwilioConfig,
    api_base_url: Url,
    http: Client,
}

#[derive(Serialize)]
struct MessageForm<'a> {
    #[serde(rename = "From")]
    from: &'a str,
    #[serde(rename = "To")]
    to: &'a str,
    #[serde(rename = "Body")]
    body: &'a str,
}

impl TwilioSender {
    pub fn new(config: TwilioConfig) -> Result<Self, NotifyError> {
        let api_base_url = Url::parse(DEFAULT_TWILIO_API_BASE_URL)
            .map_err(|e| NotifyError::Request(format!("invalid Twilio base URL: {e}")))?;
        Self::with_base_url(config, api_base_url)
    }

    pub fn with_base_url(config: TwilioConfig, api_base_url: Url) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NotifyError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            api_base_url,
            http,
        })
    }

    fn messages_url(&self) -> Result<Url, NotifyError> {
        self.api_base_url
            .join(&format!(
                "/2010-04-01/Accounts/{}/Messages.json",
                self.config.account_sid
            ))
            .map_err(|e| NotifyError::Request(format!("invalid Twilio URL: {e}")))
    }
}

#[async_trait]
impl NotificationSender for TwilioSender {
    async fn notify(&self, phone: &str, message: &str) -> Result<(), NotifyError> {
        let from = self.config.channel.address(&self.config.from_number);
        let to = self.config.channel.address(phone);

        let response = self
            .http
            .post(self.messages_url()?)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&MessageForm {
                from: &from,
                to: &to,
                body: message,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Rejected(format!("{status}: {body}")))
        }
    }
}

/// A contact that could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryFailure {
    pub phone: String,
    pub error: String,
}

pub fn emergency_message(user_name: &str) -> String {
    format!(
        "Emergency Alert: {user_name} may be experiencing stroke symptoms. \
         Please check on them immediately or call emergency services!"
    )
}

/// Send the alert to each contact once, in order, collecting failures.
pub async fn dispatch_emergency_alert(
    sender: &dyn NotificationSender,
    user_name: &str,
    contacts: &[EmergencyContact],
) -> Vec<DeliveryFailure> {
    let message = emergency_message(user_name);
    let mut failures = Vec::new();
    for contact in contacts {
        if let Err(e) = sender.notify(&contact.phone, &message).await {
            tracing::warn!(relation = %contact.relation, error = %e, "emergency alert not delivered");
            failures.push(DeliveryFailure {
                phone: contact.phone.clone(),
                error: e.to_string(),
            });
        }
    }
    tracing::info!(
        contacts = contacts.len(),
        failed = failures.len(),
        "emergency alert dispatched"
    );
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Form, http::StatusCode, routing::post, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn notify(&self, phone: &str, message: &str) -> Result<(), NotifyError> {
            if self.fail_for.as_deref() == Some(phone) {
                return Err(NotifyError::Rejected("unreachable".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((phone.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn contact(phone: &str) -> EmergencyContact {
        EmergencyContact {
            name: "Ravi".to_string(),
            relation: "brother".to_string(),
            phone: phone.to_string(),
        }
    }

    #[tokio::test]
    async fn every_contact_is_notified_once() {
        let sender = RecordingSender::default();
        let failures =
            dispatch_emergency_alert(&sender, "Asha", &[contact("+1555"), contact("+1666")]).await;

        assert!(failures.is_empty());
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].1.contains("Asha may be experiencing stroke symptoms"));
    }

    #[tokio::test]
    async fn failures_are_collected_not_raised() {
        let sender = RecordingSender {
            fail_for: Some("+1666".to_string()),
            ..RecordingSender::default()
        };
        let failures =
            dispatch_emergency_alert(&sender, "Asha", &[contact("+1555"), contact("+1666")]).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].phone, "+1666");
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disabled_sender_fails_every_contact() {
        let failures = dispatch_emergency_alert(&DisabledSender, "Asha", &[contact("+1555")]).await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].error, "Notifications are not configured");
    }

    #[test]
    fn channel_prefixes_addresses() {
        assert_eq!(TwilioChannel::parse("whatsapp").address("+1555"), "whatsapp:+1555");
        assert_eq!(TwilioChannel::parse("SMS").address("+1555"), "+1555");
    }

    #[tokio::test]
    async fn twilio_sender_posts_message_form() {
        let received: Arc<Mutex<Vec<HashMap<String, String>>>> = Arc::default();
        let sink = received.clone();
        let router = Router::new().route(
            "/2010-04-01/Accounts/AC123/Messages.json",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(form);
                    StatusCode::CREATED
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let sender = TwilioSender::with_base_url(
            TwilioConfig {
                account_sid: "AC123".to_string(),
                auth_token: "token".to_string(),
                from_number: "+1000".to_string(),
                channel: TwilioChannel::WhatsApp,
            },
            Url::parse(&format!("http://{addr}")).unwrap(),
        )
        .unwrap();

        sender.notify("+1555", "hello").await.unwrap();

        let forms = received.lock().unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0]["From"], "whatsapp:+1000");
        assert_eq!(forms[0]["To"], "whatsapp:+1555");
        assert_eq!(forms[0]["Body"], "hello");
    }
}
