//! USER command handler.

use super::try_complete_registration;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::Stage;
use async_trait::async_trait;
use slirc_wire::Message;

/// Longest username kept; longer ones are cut.
const USER_LEN: usize = 10;

/// Handler for `USER <username> <mode> <unused> :<realname>`.
pub struct UserHandler;

#[async_trait]
impl Handler for UserHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let session = ctx.session;
        if session.stage() >= Stage::Registered || session.state().user.is_some() {
            return Err(HandlerError::AlreadyRegistered);
        }
        if msg.params.len() < 4 {
            return Err(HandlerError::NeedMoreParams);
        }
        let username: String = msg.params[0]
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '@')
            .take(USER_LEN)
            .collect();
        if username.is_empty() {
            return Err(HandlerError::NeedMoreParams);
        }

        {
            let mut state = session.state();
            state.user = Some(username);
            state.realname = Some(msg.params[3].clone());
        }
        session.stage_cell().advance(Stage::Registering);
        try_complete_registration(ctx)
    }
}
