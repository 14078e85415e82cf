//! NICK command handler.

use super::try_complete_registration;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::Stage;
use async_trait::async_trait;
use slirc_wire::{Message, NickExt};
use tracing::info;

/// Handler for NICK.
pub struct NickHandler;

#[async_trait]
impl Handler for NickHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let nick = msg
            .arg(0)
            .filter(|n| !n.is_empty())
            .ok_or(HandlerError::NoNicknameGiven)?;

        if !nick.is_valid_nick_len(ctx.matrix.config.limits.nick_len) {
            return Err(HandlerError::ErroneousNickname(nick.to_owned()));
        }

        let session = ctx.session;
        if session.nick().as_deref() == Some(nick) {
            return Ok(());
        }

        let old_prefix = session.prefix();
        let old = ctx
            .matrix
            .claim_nick(session, nick)
            .map_err(|_| HandlerError::NicknameInUse(nick.to_owned()))?;

        if session.stage() == Stage::Registered {
            info!(uid = %session.uid(), old = old.as_deref().unwrap_or("*"), new = %nick, "Nick changed");
            ctx.send(Message::new("NICK", [nick]).with_prefix(old_prefix));
            return Ok(());
        }

        session.stage_cell().advance(Stage::Registering);
        try_complete_registration(ctx)
    }
}
