//! PING and PONG handlers.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use async_trait::async_trait;
use slirc_wire::Message;

/// Handler for PING: answer with `PONG <server> <token>`.
pub struct PingHandler;

#[async_trait]
impl Handler for PingHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let token = msg.arg(0).ok_or(HandlerError::NoOrigin)?;
        let server = ctx.server_name().to_owned();
        ctx.send(Message::pong(&server, token).with_prefix(server.as_str()));
        Ok(())
    }
}

/// Handler for PONG. Activity is already recorded on receipt.
pub struct PongHandler;

#[async_trait]
impl Handler for PongHandler {
    async fn handle(&self, _ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if msg.arg(0).is_none() {
            return Err(HandlerError::NoOrigin);
        }
        Ok(())
    }
}
