//! The handler trait.

use super::context::Context;
use crate::error::HandlerResult;
use async_trait::async_trait;
use slirc_wire::Message;

/// A command handler.
///
/// Handlers run on the session's command queue, one at a time per session,
/// after the dispatcher has applied the stage and permission gates declared
/// in the command's [`CommandSpec`](super::registry::CommandSpec). Replies go
/// through the [`Context`] so labeled requests can be answered as a unit.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult;
}
