//! Connection and registration handlers.
//!
//! Handles PASS, NICK, USER, PING, PONG and QUIT, plus the registration
//! completion check shared with `CAP END`.

mod nick;
mod pass;
mod ping;
mod quit;
mod user;
mod welcome;

pub use nick::NickHandler;
pub use pass::PassHandler;
pub use ping::{PingHandler, PongHandler};
pub use quit::QuitHandler;
pub use user::UserHandler;
pub(crate) use welcome::try_complete_registration;
