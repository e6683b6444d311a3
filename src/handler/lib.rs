//! Slack `/ticket` slash command backed by the Freshservice helpdesk API.
//!
//! `/ticket [-v] [-p] TICKET_ID` replies with the ticket's subject, status and
//! a link; `-v` adds priority, requester, dates and description, `-p` posts the
//! reply in the channel instead of only to the caller.

pub mod auth;
pub mod config;
pub mod format;
pub mod freshdesk;
pub mod handler;
pub mod slack;
pub mod types;

pub use config::Config;
pub use handler::App;
