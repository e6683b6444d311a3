use chrono::{DateTime, Utc};

use crate::freshdesk::Ticket;
use crate::types::{Block, ResponseType, SlackResponse, TextObject, TicketRequest};

/// Slack caps header text at 150 characters.
const HEADER_LIMIT: usize = 150;
/// Slack caps section text at 3000 characters; leave room for the label.
const DESCRIPTION_LIMIT: usize = 2900;

/// Renders a ticket as a Block Kit message.
pub fn ticket_message(ticket: &Ticket, request: &TicketRequest, web_url: &str) -> SlackResponse {
    let link = format!("{}/helpdesk/tickets/{}", web_url.trim_end_matches('/'), ticket.id);
    let number = format!("Ticket #{}", ticket.id);
    // Slack rejects a header with empty text
    let (header, fallback) = match ticket.subject.trim() {
        "" => (number.clone(), number),
        subject => (subject.to_string(), format!("{}: {}", number, subject)),
    };

    let mut fields = vec![
        TextObject::mrkdwn(format!("*Ticket:*\n<{}|#{}>", link, ticket.id)),
        TextObject::mrkdwn(format!("*Status:*\n{}", ticket.status_label())),
    ];
    if request.verbose {
        fields.push(TextObject::mrkdwn(format!("*Priority:*\n{}", ticket.priority_label())));
        fields.push(TextObject::mrkdwn(format!("*Requester:*\n{}", ticket.requester_label())));
    }

    let mut blocks = vec![
        Block::Header {
            text: TextObject::plain(truncate(&header, HEADER_LIMIT)),
        },
        Block::Section { text: None, fields },
    ];

    if request.verbose {
        let mut dates = vec![
            TextObject::mrkdwn(slack_date("Created", &ticket.created_at)),
            TextObject::mrkdwn(slack_date("Updated", &ticket.updated_at)),
        ];
        if let Some(due_by) = &ticket.due_by {
            dates.push(TextObject::mrkdwn(slack_date("Due By", due_by)));
        }

        let description = ticket
            .description_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or("_No description_");

        blocks.push(Block::Divider);
        blocks.push(Block::Section {
            text: None,
            fields: dates,
        });
        blocks.push(Block::Section {
            text: Some(TextObject::mrkdwn(format!(
                "*Description:*\n{}",
                truncate(description, DESCRIPTION_LIMIT)
            ))),
            fields: Vec::new(),
        });
    }

    SlackResponse {
        response_type: if request.public {
            ResponseType::InChannel
        } else {
            ResponseType::Ephemeral
        },
        text: fallback,
        blocks,
    }
}

/// Slack date token, rendered in each viewer's own timezone.
fn slack_date(title: &str, date: &DateTime<Utc>) -> String {
    format!(
        "*{}:*\n<!date^{}^{{date}} {{time}}|{}>",
        title,
        date.timestamp(),
        date.format("%c")
    )
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::freshdesk::Requester;

    fn ticket() -> Ticket {
        Ticket {
            id: 100,
            subject: " Printer broken ".to_string(),
            status: 3,
            priority: 4,
            requester_id: Some(7),
            requester: Some(Requester {
                id: 7,
                first_name: Some("Ada".to_string()),
                last_name: Some("Lovelace".to_string()),
                email: None,
            }),
            description_text: Some("It prints only blank pages.".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap(),
            due_by: None,
        }
    }

    fn request(verbose: bool, public: bool) -> TicketRequest {
        TicketRequest {
            ticket_id: 100,
            verbose,
            public,
        }
    }

    #[test]
    fn compact_message_has_link_and_status_only() {
        let message = ticket_message(&ticket(), &request(false, false), "https://acme.freshservice.com/");
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["response_type"], "ephemeral");
        assert_eq!(json["text"], "Ticket #100: Printer broken");
        assert_eq!(json["blocks"][0]["type"], "header");
        assert_eq!(json["blocks"][0]["text"]["type"], "plain_text");
        assert_eq!(json["blocks"][0]["text"]["text"], "Printer broken");
        assert_eq!(
            json["blocks"][1]["fields"][0]["text"],
            "*Ticket:*\n<https://acme.freshservice.com/helpdesk/tickets/100|#100>"
        );
        assert_eq!(json["blocks"][1]["fields"][1]["text"], "*Status:*\nPending");
        assert_eq!(json["blocks"].as_array().unwrap().len(), 2);

        let rendered = json.to_string();
        assert!(!rendered.contains("Priority"));
        assert!(!rendered.contains("blank pages"));
    }

    #[test]
    fn verbose_message_adds_details() {
        let message = ticket_message(&ticket(), &request(true, false), "https://acme.freshservice.com");
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["blocks"][1]["fields"][2]["text"], "*Priority:*\nUrgent");
        assert_eq!(json["blocks"][1]["fields"][3]["text"], "*Requester:*\nAda Lovelace");
        assert_eq!(json["blocks"][2]["type"], "divider");
        assert_eq!(
            json["blocks"][3]["fields"][0]["text"],
            "*Created:*\n<!date^1709285400^{date} {time}|Fri Mar  1 09:30:00 2024>"
        );
        assert_eq!(json["blocks"][3]["fields"].as_array().unwrap().len(), 2);
        assert_eq!(
            json["blocks"][4]["text"]["text"],
            "*Description:*\nIt prints only blank pages."
        );
    }

    #[test]
    fn public_flag_posts_in_channel() {
        let message = ticket_message(&ticket(), &request(false, true), "https://acme.freshservice.com");
        assert_eq!(message.response_type, ResponseType::InChannel);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["response_type"], "in_channel");
    }

    #[test]
    fn long_description_is_truncated() {
        let mut ticket = ticket();
        ticket.description_text = Some("é".repeat(5000));
        ticket.due_by = Some(Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap());
        let message = ticket_message(&ticket, &request(true, false), "https://acme.freshservice.com");

        match &message.blocks[4] {
            Block::Section {
                text: Some(TextObject::Mrkdwn { text }),
                ..
            } => {
                let body = text.trim_start_matches("*Description:*\n");
                assert_eq!(body.chars().count(), DESCRIPTION_LIMIT);
                assert!(body.ends_with('…'));
            }
            other => panic!("unexpected block: {other:?}"),
        }
        match &message.blocks[3] {
            Block::Section { fields, .. } => assert_eq!(fields.len(), 3),
            other => panic!("unexpected block: {other:?}"),
        }
    }

    #[test]
    fn missing_description_is_marked() {
        let mut ticket = ticket();
        ticket.description_text = Some("   ".to_string());
        let json = serde_json::to_value(ticket_message(&ticket, &request(true, false), "https://x")).unwrap();
        assert_eq!(json["blocks"][4]["text"]["text"], "*Description:*\n_No description_");
    }

    #[test]
    fn blank_subject_falls_back_to_ticket_number() {
        let mut ticket = ticket();
        ticket.subject = " \t ".to_string();
        let json = serde_json::to_value(ticket_message(&ticket, &request(false, false), "https://x")).unwrap();
        assert_eq!(json["blocks"][0]["text"]["text"], "Ticket #100");
        assert_eq!(json["text"], "Ticket #100");
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }
}
