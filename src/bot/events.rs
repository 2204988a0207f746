//! Normalized inbound events, delivered by the platform adapter.

/// Who sent an event: the platform user and, inside a group chat, the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSource {
    pub user_id: String,
    pub group_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Event {
    Message {
        source: EventSource,
        reply_token: String,
        text: String,
    },
    /// Sent when the user completes a template action, e.g. the date/time
    /// picker; `datetime` carries the picked value.
    Postback {
        source: EventSource,
        reply_token: String,
        datetime: Option<String>,
    },
    Follow {
        source: EventSource,
        reply_token: String,
    },
    Unfollow {
        source: EventSource,
    },
    Join {
        source: EventSource,
        reply_token: String,
    },
    Leave {
        source: EventSource,
    },
}

impl Event {
    pub fn source(&self) -> &EventSource {
        match self {
            Event::Message { source, .. }
            | Event::Postback { source, .. }
            | Event::Follow { source, .. }
            | Event::Unfollow { source }
            | Event::Join { source, .. }
            | Event::Leave { source } => source,
        }
    }

    /// Events the platform does not expect an answer to have no token.
    pub fn reply_token(&self) -> Option<&str> {
        match self {
            Event::Message { reply_token, .. }
            | Event::Postback { reply_token, .. }
            | Event::Follow { reply_token, .. }
            | Event::Join { reply_token, .. } => Some(reply_token),
            Event::Unfollow { .. } | Event::Leave { .. } => None,
        }
    }
}
