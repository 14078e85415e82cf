//! Line ingestion and gated command dispatch.
//!
//! [`Dispatcher`] is the session layer's [`ConnectionEvents`] implementation.
//! The receive path (`on_line`) does the cheap work at arrival time: length
//! check, parse, command lookup, flood accounting and label capture. The rest
//! runs as a job on the session's [`CommandQueue`](crate::state::CommandQueue)
//! so it observes the state left behind by the previous command.

use super::context::Context;
use super::registry::{CommandSpec, Registry};
use crate::error::HandlerError;
use crate::network::{Connection, ConnectionEvents};
use crate::security::FloodVerdict;
use crate::state::queue::warn_dropped;
use crate::state::{Matrix, Pushed, Session, Stage};
use crate::telemetry::{CommandTimer, spans};
use slirc_wire::{LineRef, Message, Numeric, check_line_length};
use std::sync::Arc;
use tracing::{Instrument, debug, warn};

/// Routes framed lines from every transport into session command queues.
#[derive(Debug)]
pub struct Dispatcher {
    matrix: Arc<Matrix>,
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(matrix: Arc<Matrix>, registry: Arc<Registry>) -> Self {
        Self { matrix, registry }
    }

    pub fn matrix(&self) -> &Arc<Matrix> {
        &self.matrix
    }

    /// Receive-path handling of one line.
    fn ingest(&self, session: &Arc<Session>, line: &[u8]) {
        if session.stage() == Stage::Disconnecting {
            return;
        }

        if let Err(e) = check_line_length(line) {
            debug!(uid = %session.uid(), error = %e, "input line too long");
            crate::metrics::record_input_too_long();
            session.send_numeric(Numeric::ERR_INPUTTOOLONG, &["Input line was too long"]);
            return;
        }

        let parsed = match LineRef::parse(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(uid = %session.uid(), error = %e, "dropping malformed line");
                return;
            }
        };

        // Only commands that would pass their gates right now are charged
        // at arrival. The rest are charged in the job if the gates pass by then.
        let spec = self.registry.get(parsed.command()).cloned();
        let charged = spec.as_ref().is_some_and(|s| passes_gates(session, s));
        if charged && !admit(session, spec.as_ref().map_or(0, |s| s.cost)) {
            return;
        }

        let msg = match parsed.to_message() {
            Ok(msg) => msg,
            Err(e) => {
                debug!(uid = %session.uid(), error = %e, "dropping undecodable line");
                return;
            }
        };

        let label = if session.has_cap("labeled-response") {
            msg.tag_value("label")
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
        } else {
            None
        };

        session.touch();
        let job = execute(
            Arc::clone(session),
            Arc::clone(&self.matrix),
            spec,
            msg,
            label,
            charged,
        );
        match session.queue().push(job) {
            Pushed::Queued => {}
            Pushed::DroppedOldest => warn_dropped(session.uid()),
            Pushed::Closed => debug!(uid = %session.uid(), "queue closed, line dropped"),
        }
    }
}

/// Stage and permission gates as they stand now.
fn passes_gates(session: &Session, spec: &CommandSpec) -> bool {
    session.stage() >= spec.min_stage && session.permissions().contains(spec.requires)
}

/// Charge `cost` against the flood limiter. False when the command must not run.
fn admit(session: &Session, cost: u32) -> bool {
    match session.check_flood(cost) {
        FloodVerdict::Allowed => true,
        FloodVerdict::Throttled => {
            crate::metrics::record_flood("throttled");
            debug!(uid = %session.uid(), "flood throttled, line dropped");
            false
        }
        FloodVerdict::ExcessFlood => {
            crate::metrics::record_flood("excess");
            warn!(uid = %session.uid(), host = %session.host(), "Excess flood, disconnecting");
            session.close("Excess Flood");
            false
        }
    }
}

/// The serialized part of dispatch.
async fn execute(
    session: Arc<Session>,
    matrix: Arc<Matrix>,
    spec: Option<Arc<CommandSpec>>,
    msg: Message,
    label: Option<String>,
    charged: bool,
) {
    if session.is_closing() {
        return;
    }
    let mut ctx = Context::new(&session, &matrix, label);
    let stage = session.stage();

    let Some(spec) = spec else {
        if stage == Stage::Registered {
            crate::metrics::record_command_error("UNKNOWN", "unknown_command");
            ctx.numeric(Numeric::ERR_UNKNOWNCOMMAND, &[msg.command.as_str(), "Unknown command"]);
            ctx.finish();
        }
        return;
    };

    if stage < spec.min_stage {
        if stage >= Stage::Registering {
            ctx.numeric(Numeric::ERR_NOTREGISTERED, &["You have not registered"]);
            ctx.finish();
        }
        return;
    }

    if !session.permissions().contains(spec.requires) {
        crate::metrics::record_command_error(spec.name, HandlerError::NoPrivileges.error_code());
        ctx.reply_error(spec.name, &HandlerError::NoPrivileges);
        ctx.finish();
        return;
    }

    if !charged && !admit(&session, spec.cost) {
        return;
    }

    let span = spans::command(spec.name, session.uid(), ctx.label());
    let result = {
        let _timer = CommandTimer::new(spec.name);
        spec.handler().handle(&mut ctx, &msg).instrument(span).await
    };

    match result {
        Ok(()) => ctx.finish(),
        Err(HandlerError::Quit(reason)) => {
            let reason = match reason {
                Some(text) if !text.is_empty() => format!("Quit: {text}"),
                _ => "Client Quit".to_owned(),
            };
            session.close(&reason);
        }
        Err(e) => {
            crate::metrics::record_command_error(spec.name, e.error_code());
            debug!(uid = %session.uid(), command = spec.name, error = %e, "command failed");
            ctx.reply_error(spec.name, &e);
            ctx.finish();
        }
    }
}

impl ConnectionEvents for Dispatcher {
    type Peer = Arc<Session>;

    fn on_connected(&self, conn: &Arc<Connection>) -> Arc<Session> {
        let session = self.matrix.create_session(Arc::clone(conn));
        let span = spans::session(session.uid(), session.host());
        let consumer = Arc::clone(&session);
        let matrix = Arc::clone(&self.matrix);
        tokio::spawn(
            async move {
                consumer.queue().run().await;
                matrix.remove_session(&consumer);
            }
            .instrument(span),
        );
        session
    }

    fn on_line(&self, session: &Arc<Session>, line: &[u8]) {
        self.ingest(session, line);
    }

    fn on_disconnected(&self, session: Arc<Session>) {
        session.mark_disconnected();
    }
}
