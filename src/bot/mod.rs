//! Conversation handling: one webhook batch in, replies out through the
//! sink. Transport, signatures and template rendering live in the adapter.

pub mod activity;
pub mod events;
pub mod replies;
pub mod state;

use std::error::Error;
use std::fmt;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::error;

use self::events::Event;
use self::replies::Reply;

/// Outbound delivery seam, implemented by the platform adapter.
pub trait ReplySink {
    fn send(&mut self, reply_token: &str, reply: Reply) -> Result<(), SinkError>;
}

#[derive(Debug)]
pub struct SinkError(pub String);

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reply delivery failed: {}", self.0)
    }
}

impl Error for SinkError {}

/// Handles one inbound batch. Each event runs in its own transaction, so a
/// failed turn persists nothing; failures degrade to a generic error reply
/// and never take the event loop down.
pub fn handle_events(conn: &mut SqliteConnection, events: &[Event], sink: &mut dyn ReplySink) {
    for event in events {
        match handle_event(conn, event) {
            Ok(Some(reply)) => {
                if let Some(token) = event.reply_token() {
                    if let Err(err) = sink.send(token, reply) {
                        error!("{}", err);
                    }
                }
            }
            Ok(None) => {}
            Err(err) => {
                error!("handling event failed: {}", err);
                if let Some(token) = event.reply_token() {
                    let fallback = Reply::Text(replies::SYSTEM_ERROR_TEXT.to_string());
                    if let Err(err) = sink.send(token, fallback) {
                        error!("{}", err);
                    }
                }
            }
        }
    }
}

/// Dispatches a single event; any error rolls its store changes back.
pub fn handle_event(conn: &mut SqliteConnection, event: &Event) -> QueryResult<Option<Reply>> {
    conn.transaction(|conn| match event {
        Event::Message { .. } => state::match_text_and_assign(conn, event),
        Event::Postback { .. } => state::ask_question_states(conn, event),
        Event::Follow { source, .. } => {
            activity::record_follow(conn, &source.user_id).map(|_| None)
        }
        Event::Unfollow { source } => {
            activity::record_unfollow(conn, &source.user_id).map(|_| None)
        }
        Event::Join { source, .. } => match &source.group_id {
            Some(group) => activity::record_join(conn, group).map(|_| None),
            None => Ok(None),
        },
        Event::Leave { source } => match &source.group_id {
            Some(group) => activity::record_leave(conn, group).map(|_| None),
            None => Ok(None),
        },
    })
}
