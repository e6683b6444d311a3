use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("ticket {0} not found")]
    NotFound(u64),
    #[error("helpdesk unreachable: {0}")]
    Unavailable(#[source] reqwest::Error),
    #[error("helpdesk returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("could not decode helpdesk response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Embedded requester block, present when the ticket is fetched with
/// `include=requester`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: u64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, alias = "primary_email")]
    pub email: Option<String>,
}

impl Requester {
    pub fn display_name(&self) -> Option<String> {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !name.is_empty() {
            return Some(name);
        }
        self.email.clone().filter(|email| !email.trim().is_empty())
    }
}

/// The subset of the ticket resource this bot renders.
///
/// See https://api.freshservice.com/#view_a_ticket
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Ticket {
    pub id: u64,
    pub subject: String,
    pub status: u8,
    pub priority: u8,
    #[serde(default)]
    pub requester_id: Option<u64>,
    #[serde(default)]
    pub requester: Option<Requester>,
    #[serde(default)]
    pub description_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub due_by: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn status_label(&self) -> String {
        match self.status {
            2 => "Open".to_string(),
            3 => "Pending".to_string(),
            4 => "Resolved".to_string(),
            5 => "Closed".to_string(),
            other => format!("Unknown ({})", other),
        }
    }

    pub fn priority_label(&self) -> String {
        match self.priority {
            1 => "Low".to_string(),
            2 => "Medium".to_string(),
            3 => "High".to_string(),
            4 => "Urgent".to_string(),
            other => format!("Unknown ({})", other),
        }
    }

    pub fn requester_label(&self) -> String {
        self.requester
            .as_ref()
            .and_then(Requester::display_name)
            .or_else(|| self.requester_id.map(|id| format!("#{}", id)))
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct TicketEnvelope {
    ticket: Ticket,
}

pub struct FreshdeskClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FreshdeskClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Fetches one ticket with its requester embedded. Single attempt.
    pub async fn get_ticket(&self, ticket_id: u64) -> Result<Ticket, TicketError> {
        let response = self
            .client
            .get(format!("{}/api/v2/tickets/{}", self.base_url, ticket_id))
            .query(&[("include", "requester")])
            .basic_auth(&self.api_key, Some("X"))
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(TicketError::Unavailable)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TicketError::NotFound(ticket_id));
        }
        if !status.is_success() {
            return Err(TicketError::Upstream {
                status: status.as_u16(),
                body: upstream_body(response.text().await),
            });
        }

        let envelope: TicketEnvelope = response.json().await.map_err(TicketError::Decode)?;
        Ok(envelope.ticket)
    }
}

/// Error bodies are diagnostics only; a failed read is reported in their place.
fn upstream_body(body: Result<String, reqwest::Error>) -> String {
    body.unwrap_or_else(|e| {
        warn!(error = %e, "could not read helpdesk error body");
        format!("<unreadable body: {}>", e)
    })
}
