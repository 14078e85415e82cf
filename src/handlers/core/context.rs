//! Handler context and labeled-response capture.
//!
//! A [`Context`] is built for every queued command. Replies addressed to the
//! requesting client go through it: unlabeled requests write straight to the
//! session (numerics take the builder's fast path), labeled requests are
//! buffered and emitted by [`Context::finish`] as an `ACK`, a single tagged
//! reply or a `labeled-response` batch.

use crate::error::HandlerError;
use crate::state::{Matrix, Session};
use slirc_wire::{Message, Numeric, Tag};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BATCH: AtomicU64 = AtomicU64::new(1);

fn next_batch_ref() -> String {
    format!("lr{:x}", NEXT_BATCH.fetch_add(1, Ordering::Relaxed))
}

/// Handler context passed to each command handler.
pub struct Context<'a> {
    /// The session the command came from.
    pub session: &'a Arc<Session>,
    /// Shared server state.
    pub matrix: &'a Arc<Matrix>,
    label: Option<String>,
    captured: Vec<Message>,
    close_reason: Option<String>,
}

impl<'a> Context<'a> {
    pub fn new(session: &'a Arc<Session>, matrix: &'a Arc<Matrix>, label: Option<String>) -> Self {
        Self {
            session,
            matrix,
            label,
            captured: Vec::new(),
            close_reason: None,
        }
    }

    #[inline]
    pub fn server_name(&self) -> &str {
        &self.matrix.server.name
    }

    /// Label of the request, when the client negotiated labeled-response.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Send a reply to the requesting client.
    pub fn send(&mut self, msg: Message) {
        if self.label.is_some() {
            self.captured.push(msg);
        } else {
            self.session.send_line(&msg);
        }
    }

    /// Send `:server NNN <nick> params...` to the requesting client.
    pub fn numeric(&mut self, numeric: Numeric, params: &[&str]) {
        if self.label.is_none() {
            self.session.send_numeric(numeric, params);
            return;
        }
        let target = self.session.nick_or_star();
        let mut all = Vec::with_capacity(params.len() + 1);
        all.push(target.as_str());
        all.extend_from_slice(params);
        let msg = Message::new(format!("{:03}", numeric.code()), all)
            .with_prefix(self.server_name().to_owned());
        self.captured.push(msg);
    }

    /// Report a handler error with its numeric, if it has one.
    pub fn reply_error(&mut self, command: &str, err: &HandlerError) {
        if let Some((numeric, params)) = err.to_numeric(command) {
            let params: Vec<&str> = params.iter().map(String::as_str).collect();
            self.numeric(numeric, &params);
        }
    }

    /// Close the session once the replies so far have been sent.
    pub fn disconnect_after(&mut self, reason: impl Into<String>) {
        self.close_reason = Some(reason.into());
    }

    /// Emit captured replies and apply a pending disconnect.
    pub fn finish(self) {
        let session = self.session;
        if let Some(label) = self.label {
            let server: &str = &self.matrix.server.name;
            let label_tag = Tag::new("label", Some(label));
            match self.captured.as_slice() {
                [] => {
                    let ack = Message::new("ACK", std::iter::empty::<String>())
                        .with_prefix(server)
                        .with_tags([label_tag]);
                    session.send_line(&ack);
                }
                [only] => {
                    session.send_with_tags(only, &[label_tag]);
                }
                many => {
                    let reference = next_batch_ref();
                    let start = Message::new("BATCH", [format!("+{reference}"), "labeled-response".into()])
                        .with_prefix(server)
                        .with_tags([label_tag]);
                    session.send_line(&start);
                    let batch_tag = [Tag::new("batch", Some(reference.as_str()))];
                    for msg in many {
                        session.send_with_tags(msg, &batch_tag);
                    }
                    session.send_line(&Message::new("BATCH", [format!("-{reference}")]).with_prefix(server));
                }
            }
        }
        if let Some(reason) = self.close_reason {
            session.close(&reason);
        }
    }
}
