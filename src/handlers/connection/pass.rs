//! PASS command handler.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::Stage;
use async_trait::async_trait;
use slirc_wire::Message;

/// Handler for PASS. The password is checked when registration completes.
pub struct PassHandler;

#[async_trait]
impl Handler for PassHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if ctx.session.stage() >= Stage::Registered {
            return Err(HandlerError::AlreadyRegistered);
        }
        let password = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        ctx.session.state().password = Some(password.to_owned());
        ctx.session.stage_cell().advance(Stage::Registering);
        Ok(())
    }
}
