//! Operator commands: OPER and KILL.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use async_trait::async_trait;
use slirc_wire::{Message, Numeric};
use tracing::{info, warn};

/// `OPER <name> <password>`
pub struct OperHandler;

#[async_trait]
impl Handler for OperHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let (Some(name), Some(password)) = (msg.arg(0), msg.arg(1)) else {
            return Err(HandlerError::NeedMoreParams);
        };
        let session = ctx.session;
        let Some(granted) = ctx.matrix.permissions.on_oper(name, password) else {
            warn!(uid = %session.uid(), oper = %name, host = %session.host(), "Failed OPER attempt");
            return Err(HandlerError::PasswordMismatch);
        };

        session.grant(granted);
        session.state().oper_name = Some(name.to_owned());
        info!(uid = %session.uid(), oper = %name, permissions = ?granted, "OPER granted");
        ctx.numeric(Numeric::RPL_YOUREOPER, &["You are now an IRC operator"]);
        Ok(())
    }
}

/// `KILL <nickname> [:reason]`. Requires the KILL permission.
pub struct KillHandler;

#[async_trait]
impl Handler for KillHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let target = msg
            .arg(0)
            .filter(|t| !t.is_empty())
            .ok_or(HandlerError::NeedMoreParams)?;
        let reason = msg.arg(1).unwrap_or("No reason given");
        let victim = ctx
            .matrix
            .find_nick(target)
            .ok_or_else(|| HandlerError::NoSuchNick(target.to_owned()))?;

        let killer = ctx.session.nick_or_star();
        info!(%killer, target = %target, %reason, "KILL");
        victim.close(&format!("Killed by {killer} ({reason})"));
        Ok(())
    }
}
