//! IRCv3 capability negotiation (`CAP LS | LIST | REQ | END`).
//!
//! Capabilities offered come from the matrix's
//! [`CapabilityRegistry`](crate::state::CapabilityRegistry); the ones a
//! client enabled live in its session state. `CAP LS` or `CAP REQ` before
//! registration holds the welcome burst back until `CAP END`.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::connection::try_complete_registration;
use crate::handlers::{Context, Handler};
use crate::state::Stage;
use async_trait::async_trait;
use slirc_wire::Message;
use slirc_wire::limits::MAX_LINE_LEN;
use tracing::debug;

/// Handler for CAP.
pub struct CapHandler;

#[async_trait]
impl Handler for CapHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let sub = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        match sub.to_ascii_uppercase().as_str() {
            "LS" => handle_ls(ctx, msg.arg(1)),
            "LIST" => handle_list(ctx),
            "REQ" => handle_req(ctx, msg.arg(1).unwrap_or("")),
            "END" => handle_end(ctx),
            _ => Err(HandlerError::InvalidCapCommand(sub.to_owned())),
        }
    }
}

fn cap_reply(ctx: &Context<'_>, sub: &str, more: bool, body: String) -> Message {
    let target = ctx.session.nick_or_star();
    let params = if more {
        vec![target, sub.to_owned(), "*".to_owned(), body]
    } else {
        vec![target, sub.to_owned(), body]
    };
    let mut reply = Message::new("CAP", params);
    reply.prefix = Some(ctx.server_name().to_owned());
    reply
}

fn start_negotiation(ctx: &Context<'_>) {
    if ctx.session.stage() < Stage::Registered {
        ctx.session.state().cap_negotiating = true;
    }
}

/// `CAP LS [version]`
fn handle_ls(ctx: &mut Context<'_>, version_arg: Option<&str>) -> HandlerResult {
    let version = version_arg.and_then(|v| v.parse().ok()).unwrap_or(301);
    start_negotiation(ctx);
    {
        let mut state = ctx.session.state();
        state.cap_version = state.cap_version.max(version);
        // 302 implies cap-notify.
        if version >= 302 {
            state.caps.insert("cap-notify".to_owned());
        }
    }

    let tokens = ctx.matrix.caps.ls_tokens(version);
    let nick = ctx.session.nick_or_star();
    let lines = pack_cap_ls_lines(ctx.server_name(), &nick, &tokens);
    let count = lines.len();
    for (i, body) in lines.into_iter().enumerate() {
        let reply = cap_reply(ctx, "LS", i + 1 < count, body);
        ctx.send(reply);
    }
    debug!(uid = %ctx.session.uid(), version, "CAP LS sent");
    Ok(())
}

/// `CAP LIST`
fn handle_list(ctx: &mut Context<'_>) -> HandlerResult {
    let mut enabled: Vec<String> = ctx.session.state().caps.iter().cloned().collect();
    enabled.sort_unstable();
    let reply = cap_reply(ctx, "LIST", false, enabled.join(" "));
    ctx.send(reply);
    Ok(())
}

/// `CAP REQ :<caps>`. The request is applied whole or refused whole.
fn handle_req(ctx: &mut Context<'_>, requested: &str) -> HandlerResult {
    start_negotiation(ctx);

    let mut changes = Vec::new();
    for token in requested.split_whitespace() {
        let (remove, name) = match token.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, token),
        };
        if !ctx.matrix.caps.is_supported(name) {
            debug!(uid = %ctx.session.uid(), cap = %name, "CAP REQ NAK");
            let reply = cap_reply(ctx, "NAK", false, requested.to_owned());
            ctx.send(reply);
            return Ok(());
        }
        changes.push((remove, name));
    }

    {
        let mut state = ctx.session.state();
        for (remove, name) in &changes {
            if *remove {
                state.caps.remove(*name);
            } else {
                state.caps.insert((*name).to_owned());
            }
        }
    }
    let reply = cap_reply(ctx, "ACK", false, requested.trim().to_owned());
    ctx.send(reply);
    Ok(())
}

/// `CAP END`
fn handle_end(ctx: &mut Context<'_>) -> HandlerResult {
    if ctx.session.stage() >= Stage::Registered {
        return Ok(());
    }
    ctx.session.state().cap_negotiating = false;
    try_complete_registration(ctx)
}

/// Split `CAP LS` tokens into bodies that fit one line each.
///
/// Every line is sized as if it carried the `*` continuation marker, so the
/// last line has a little slack.
fn pack_cap_ls_lines(server_name: &str, nick: &str, caps: &[String]) -> Vec<String> {
    // ":server CAP nick LS * :" + body + CRLF
    let overhead = 1 + server_name.len() + " CAP ".len() + nick.len() + " LS * :".len() + 2;
    let budget = MAX_LINE_LEN.saturating_sub(overhead);

    let mut lines = Vec::new();
    let mut current = String::new();
    for cap in caps {
        if !current.is_empty() && current.len() + 1 + cap.len() > budget {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(cap);
    }
    lines.push(current);
    lines
}
