//! PRIVMSG and NOTICE between users.
//!
//! Targets are nicknames only; a comma-separated list is delivered to each
//! in turn. Recipients that negotiated `message-tags` receive the sender's
//! client-only (`+`) tags, and `server-time` recipients get a `time` tag.
//! NOTICE never produces error replies.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::Session;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use slirc_wire::{Message, Tag};
use tracing::trace;

/// Most targets accepted in one command.
const MAX_TARGETS: usize = 4;

/// Handler for PRIVMSG.
pub struct PrivmsgHandler;

#[async_trait]
impl Handler for PrivmsgHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        relay(ctx, msg, "PRIVMSG", false)
    }
}

/// Handler for NOTICE.
pub struct NoticeHandler;

#[async_trait]
impl Handler for NoticeHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        relay(ctx, msg, "NOTICE", true)
    }
}

fn relay(ctx: &mut Context<'_>, msg: &Message, command: &str, notice: bool) -> HandlerResult {
    let result = deliver_all(ctx, msg, command, notice);
    if notice { Ok(()) } else { result }
}

fn deliver_all(ctx: &mut Context<'_>, msg: &Message, command: &str, notice: bool) -> HandlerResult {
    let targets = msg
        .arg(0)
        .filter(|t| !t.is_empty())
        .ok_or(HandlerError::NoRecipient)?;
    let text = msg
        .arg(1)
        .filter(|t| !t.is_empty())
        .ok_or(HandlerError::NoTextToSend)?;

    let client_tags: Vec<Tag> = msg
        .tags
        .iter()
        .flatten()
        .filter(|t| t.key().starts_with('+'))
        .cloned()
        .collect();
    let prefix = ctx.session.prefix();

    for target in targets.split(',').filter(|t| !t.is_empty()).take(MAX_TARGETS) {
        let Some(recipient) = ctx.matrix.find_nick(target) else {
            if !notice {
                ctx.reply_error(command, &HandlerError::NoSuchNick(target.to_owned()));
            }
            continue;
        };
        let out = Message::new(command, [target, text]).with_prefix(prefix.as_str());
        send_to(&recipient, &out, &client_tags);
        trace!(from = %ctx.session.uid(), to = %recipient.uid(), command, "message relayed");
    }
    Ok(())
}

/// Deliver with the tags this recipient negotiated.
fn send_to(recipient: &Session, out: &Message, client_tags: &[Tag]) {
    let mut tags = Vec::new();
    if recipient.has_cap("server-time") {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        tags.push(Tag::new("time", Some(now)));
    }
    if recipient.has_cap("message-tags") {
        tags.extend_from_slice(client_tags);
    }
    recipient.send_with_tags(out, &tags);
}
