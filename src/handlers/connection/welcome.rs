//! Registration completion and the welcome burst.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::Context;
use crate::state::Stage;
use slirc_wire::Numeric;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

/// Complete registration if NICK, USER and any CAP negotiation are done.
///
/// Runs at most once per session: the Registering → Registered transition
/// is a compare-and-swap, so a second caller finds nothing to do.
pub(crate) fn try_complete_registration(ctx: &mut Context<'_>) -> HandlerResult {
    let session = ctx.session;
    let (nick, user, password) = {
        let state = session.state();
        match (&state.nick, &state.user) {
            (Some(nick), Some(user)) if !state.cap_negotiating => {
                (nick.clone(), user.clone(), state.password.clone())
            }
            _ => return Ok(()),
        }
    };

    if let Some(required) = &ctx.matrix.config.server.password {
        let matches = password
            .as_deref()
            .is_some_and(|given| bool::from(given.as_bytes().ct_eq(required.as_bytes())));
        if !matches {
            warn!(uid = %session.uid(), %nick, "Registration refused: bad password");
            ctx.reply_error("PASS", &HandlerError::PasswordMismatch);
            ctx.disconnect_after("Bad Password");
            return Ok(());
        }
    }

    if !session
        .stage_cell()
        .transition(Stage::Registering, Stage::Registered)
    {
        return Ok(());
    }

    session.set_permissions(ctx.matrix.permissions.on_register(&nick));
    info!(uid = %session.uid(), %nick, %user, host = %session.host(), "Client registered");
    send_welcome_burst(ctx, &nick, &user);
    Ok(())
}

/// 001-005 followed by the MOTD.
fn send_welcome_burst(ctx: &mut Context<'_>, nick: &str, user: &str) {
    let matrix = ctx.matrix;
    let server = &matrix.server;
    let host = ctx.session.host().to_owned();

    let welcome = format!(
        "Welcome to the {} Internet Relay Chat Network {nick}!{user}@{host}",
        server.network
    );
    ctx.numeric(Numeric::RPL_WELCOME, &[welcome.as_str()]);
    let your_host = format!(
        "Your host is {}, running version {}",
        server.name, server.version
    );
    ctx.numeric(Numeric::RPL_YOURHOST, &[your_host.as_str()]);
    let created = format!(
        "This server was created {}",
        server.created.format("%a %b %d %Y at %H:%M:%S UTC")
    );
    ctx.numeric(Numeric::RPL_CREATED, &[created.as_str()]);
    ctx.numeric(
        Numeric::RPL_MYINFO,
        &[&*server.name, server.version, "o", "-"],
    );

    let network = format!("NETWORK={}", server.network);
    let nicklen = format!("NICKLEN={}", matrix.config.limits.nick_len);
    ctx.numeric(
        Numeric::RPL_ISUPPORT,
        &[
            network.as_str(),
            "CASEMAPPING=rfc1459",
            nicklen.as_str(),
            "are supported by this server",
        ],
    );

    let motd = &matrix.config.motd.lines;
    if motd.is_empty() {
        ctx.numeric(Numeric::ERR_NOMOTD, &["MOTD File is missing"]);
        return;
    }
    let start = format!("- {} Message of the day - ", server.name);
    ctx.numeric(Numeric::RPL_MOTDSTART, &[start.as_str()]);
    for line in motd {
        let line = format!("- {line}");
        ctx.numeric(Numeric::RPL_MOTD, &[line.as_str()]);
    }
    ctx.numeric(Numeric::RPL_ENDOFMOTD, &["End of /MOTD command."]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::matrix::tests::{connect, test_config, test_matrix};
    use crate::state::session::tests::drain;

    fn ready(session: &crate::state::Session, password: Option<&str>) {
        let mut state = session.state();
        state.nick = Some("alice".into());
        state.user = Some("a".into());
        state.password = password.map(str::to_owned);
        drop(state);
        session.stage_cell().advance(Stage::Registering);
    }

    #[test]
    fn test_welcome_burst_with_motd() {
        let mut config = test_config();
        config.motd.lines = vec!["hello".into(), "world".into()];
        let matrix = test_matrix(config);
        let (session, mut rx) = connect(&matrix, 1);
        ready(&session, None);

        let mut ctx = Context::new(&session, &matrix, None);
        try_complete_registration(&mut ctx).unwrap();
        ctx.finish();

        let lines = drain(&mut rx);
        let codes: Vec<&str> = lines.iter().map(|l| l.split(' ').nth(1).unwrap()).collect();
        assert_eq!(codes, ["001", "002", "003", "004", "005", "375", "372", "372", "376"]);
        assert!(lines[0].ends_with("TestNet Internet Relay Chat Network alice!a@198.51.100.1\r\n"));
        assert_eq!(lines[6], ":irc.test 372 alice :- hello\r\n");
        assert_eq!(session.stage(), Stage::Registered);
    }

    #[test]
    fn test_completion_happens_once() {
        let matrix = test_matrix(test_config());
        let (session, mut rx) = connect(&matrix, 1);
        ready(&session, None);
        for _ in 0..2 {
            let mut ctx = Context::new(&session, &matrix, None);
            try_complete_registration(&mut ctx).unwrap();
            ctx.finish();
        }
        let lines = drain(&mut rx);
        assert_eq!(lines.iter().filter(|l| l.contains(" 001 ")).count(), 1);
        assert!(lines.last().unwrap().contains(" 422 "));
    }

    #[test]
    fn test_cap_negotiation_blocks_completion() {
        let matrix = test_matrix(test_config());
        let (session, mut rx) = connect(&matrix, 1);
        ready(&session, None);
        session.state().cap_negotiating = true;
        let mut ctx = Context::new(&session, &matrix, None);
        try_complete_registration(&mut ctx).unwrap();
        ctx.finish();
        assert!(drain(&mut rx).is_empty());
        assert_eq!(session.stage(), Stage::Registering);
    }

    #[test]
    fn test_wrong_password_disconnects() {
        let mut config = test_config();
        config.server.password = Some("sekrit".into());
        let matrix = test_matrix(config);
        let (session, mut rx) = connect(&matrix, 1);
        ready(&session, Some("guess"));

        let mut ctx = Context::new(&session, &matrix, None);
        try_complete_registration(&mut ctx).unwrap();
        ctx.finish();
        assert_eq!(
            drain(&mut rx),
            vec![
                ":irc.test 464 alice :Password incorrect\r\n",
                "ERROR :Closing Link: 198.51.100.1 (Bad Password)\r\n",
            ]
        );
        assert_eq!(session.stage(), Stage::Disconnecting);
    }

    #[test]
    fn test_right_password_registers() {
        let mut config = test_config();
        config.server.password = Some("sekrit".into());
        let matrix = test_matrix(config);
        let (session, _rx) = connect(&matrix, 1);
        ready(&session, Some("sekrit"));
        let mut ctx = Context::new(&session, &matrix, None);
        try_complete_registration(&mut ctx).unwrap();
        assert_eq!(session.stage(), Stage::Registered);
    }
}
