//! QUIT command handler.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use async_trait::async_trait;
use slirc_wire::Message;

/// Handler for QUIT. The dispatcher turns the error into the closing link.
pub struct QuitHandler;

#[async_trait]
impl Handler for QuitHandler {
    async fn handle(&self, _ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        Err(HandlerError::Quit(msg.arg(0).map(str::to_owned)))
    }
}
