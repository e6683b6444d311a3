use lambda_http::http::{Method, StatusCode};
use lambda_http::{Body, Error, Request, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::AccessPolicy;
use crate::config::Config;
use crate::format;
use crate::freshdesk::{FreshdeskClient, TicketError};
use crate::slack::{self, ParseError, SignatureVerifier};
use crate::types::{SlackCommand, SlackResponse};

/// Why a verified command produced an error reply instead of a ticket.
#[derive(Debug, Error)]
pub enum CommandFailure {
    #[error("user {0} is not on the allow-list")]
    Unauthorized(String),
    #[error("invalid command text: {0}")]
    Usage(#[from] ParseError),
    #[error(transparent)]
    Ticket(#[from] TicketError),
}

impl CommandFailure {
    /// User-facing reply. Upstream details stay in the logs.
    pub fn reply(&self) -> SlackResponse {
        let text = match self {
            CommandFailure::Unauthorized(user) => {
                format!("Sorry, user {} isn't authorized.", user)
            }
            CommandFailure::Usage(e) => format!("Sorry, {}.\n{}", e, slack::USAGE),
            CommandFailure::Ticket(TicketError::NotFound(id)) => format!("Ticket {} not found", id),
            CommandFailure::Ticket(TicketError::Unavailable(_)) => {
                "Sorry, the helpdesk isn't responding right now. Please try again shortly.".to_string()
            }
            CommandFailure::Ticket(TicketError::Upstream { .. } | TicketError::Decode(_)) => {
                "Sorry, the helpdesk returned an error while looking up that ticket.".to_string()
            }
        };
        SlackResponse::ephemeral(text)
    }
}

/// Everything a request needs, built once per cold start.
pub struct App {
    verifier: SignatureVerifier,
    access: AccessPolicy,
    freshdesk: FreshdeskClient,
    web_url: String,
}

impl App {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            verifier: SignatureVerifier::new(config.slack_signing_secret.clone()),
            access: config.access.clone(),
            freshdesk: FreshdeskClient::new(
                config.freshdesk_url.clone(),
                config.freshdesk_api_key.clone(),
                config.freshdesk_timeout,
            )?,
            web_url: config.freshdesk_web_url.clone(),
        })
    }

    pub async fn handle(&self, event: Request) -> Result<Response<Body>, Error> {
        match (event.method(), event.uri().path()) {
            (&Method::GET, "/") => json_response(&json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            })),
            // API Gateway REST APIs prefix the stage, e.g. `/prod/ticket`
            (&Method::POST, path) if path.ends_with("/ticket") => self.ticket_command(&event).await,
            (method, path) => {
                info!(%method, path, "no route");
                text_response(StatusCode::NOT_FOUND, "Not Found")
            }
        }
    }

    async fn ticket_command(&self, event: &Request) -> Result<Response<Body>, Error> {
        let body = String::from_utf8_lossy(event.body());
        let slack_signature = header(event, "X-Slack-Signature");
        let slack_timestamp = header(event, "X-Slack-Request-Timestamp");

        if let Err(e) = self.verifier.verify(&body, slack_timestamp, slack_signature) {
            warn!(error = %e, "rejected slack request");
            return text_response(StatusCode::UNAUTHORIZED, "Unauthorized");
        }

        let command: SlackCommand = match serde_urlencoded::from_str(&body) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "undecodable slash command body");
                return text_response(StatusCode::BAD_REQUEST, "Bad Request");
            }
        };

        let response = match self.dispatch(&command).await {
            Ok(response) => response,
            Err(failure) => {
                match &failure {
                    CommandFailure::Ticket(TicketError::NotFound(_)) | CommandFailure::Usage(_) => {
                        info!(user = %command.user_name, text = %command.text, "{}", failure)
                    }
                    CommandFailure::Unauthorized(_) => {
                        warn!(user_id = %command.user_id, "{}", failure)
                    }
                    CommandFailure::Ticket(e) => error!(error = ?e, "ticket lookup failed"),
                }
                failure.reply()
            }
        };

        json_response(&response)
    }

    /// Authorize, parse, fetch, format. The first failing stage wins.
    pub async fn dispatch(&self, command: &SlackCommand) -> Result<SlackResponse, CommandFailure> {
        if !self.access.is_allowed(&command.user_name) && !self.access.is_allowed(&command.user_id) {
            return Err(CommandFailure::Unauthorized(command.user_name.clone()));
        }

        let request = slack::parse_command_text(&command.text)?;
        let ticket = self.freshdesk.get_ticket(request.ticket_id).await?;
        info!(
            ticket_id = ticket.id,
            user = %command.user_name,
            verbose = request.verbose,
            public = request.public,
            "ticket lookup"
        );

        Ok(format::ticket_message(&ticket, &request, &self.web_url))
    }
}

fn header<'a>(event: &'a Request, name: &str) -> &'a str {
    event
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn json_response<T: serde::Serialize>(payload: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(payload)?))?)
}

fn text_response(status: StatusCode, text: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Body::from(text.to_string()))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_hide_upstream_details() {
        let failure = CommandFailure::Ticket(TicketError::Upstream {
            status: 500,
            body: "stack trace with secrets".to_string(),
        });
        let reply = failure.reply();
        assert!(!reply.text.contains("secrets"));
        assert!(!reply.text.contains("500"));
        assert_eq!(reply.response_type, crate::types::ResponseType::Ephemeral);
    }

    #[test]
    fn usage_reply_explains_the_problem() {
        let failure = CommandFailure::from(ParseError::InvalidTicketId("abc".to_string()));
        let reply = failure.reply();
        assert!(reply.text.contains("`abc` is not a valid ticket id"));
        assert!(reply.text.contains(slack::USAGE));
    }

    #[test]
    fn not_found_and_unauthorized_replies() {
        assert_eq!(
            CommandFailure::Ticket(TicketError::NotFound(999)).reply().text,
            "Ticket 999 not found"
        );
        assert_eq!(
            CommandFailure::Unauthorized("bob".to_string()).reply().text,
            "Sorry, user bob isn't authorized."
        );
    }
}
