//! Handler errors.
//!
//! Handlers return a [`HandlerError`] instead of writing error numerics
//! themselves. The dispatcher logs it, counts it by [`error_code`] and turns
//! it into the matching numeric reply.
//!
//! [`error_code`]: HandlerError::error_code

use slirc_wire::Numeric;
use thiserror::Error;

/// Errors that can occur during command handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("not enough parameters")]
    NeedMoreParams,

    #[error("no recipient given")]
    NoRecipient,

    #[error("no text to send")]
    NoTextToSend,

    #[error("no nickname given")]
    NoNicknameGiven,

    #[error("nickname in use: {0}")]
    NicknameInUse(String),

    #[error("erroneous nickname: {0}")]
    ErroneousNickname(String),

    #[error("no such nick: {0}")]
    NoSuchNick(String),

    #[error("no origin specified")]
    NoOrigin,

    #[error("already registered")]
    AlreadyRegistered,

    #[error("password mismatch")]
    PasswordMismatch,

    #[error("permission denied")]
    NoPrivileges,

    #[error("invalid CAP subcommand: {0}")]
    InvalidCapCommand(String),

    #[error("client quit: {0:?}")]
    Quit(Option<String>),
}

impl HandlerError {
    /// Static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NeedMoreParams => "need_more_params",
            Self::NoRecipient => "no_recipient",
            Self::NoTextToSend => "no_text_to_send",
            Self::NoNicknameGiven => "no_nickname_given",
            Self::NicknameInUse(_) => "nickname_in_use",
            Self::ErroneousNickname(_) => "erroneous_nickname",
            Self::NoSuchNick(_) => "no_such_nick",
            Self::NoOrigin => "no_origin",
            Self::AlreadyRegistered => "already_registered",
            Self::PasswordMismatch => "password_mismatch",
            Self::NoPrivileges => "no_privileges",
            Self::InvalidCapCommand(_) => "invalid_cap_command",
            Self::Quit(_) => "quit",
        }
    }

    /// The numeric reply for this error, with the parameters that follow
    /// the target. `None` for errors with no client-visible reply.
    pub fn to_numeric(&self, command: &str) -> Option<(Numeric, Vec<String>)> {
        let reply = match self {
            Self::NeedMoreParams => (
                Numeric::ERR_NEEDMOREPARAMS,
                vec![command.to_owned(), "Not enough parameters".into()],
            ),
            Self::NoRecipient => (
                Numeric::ERR_NORECIPIENT,
                vec![format!("No recipient given ({command})")],
            ),
            Self::NoTextToSend => (Numeric::ERR_NOTEXTTOSEND, vec!["No text to send".into()]),
            Self::NoNicknameGiven => (
                Numeric::ERR_NONICKNAMEGIVEN,
                vec!["No nickname given".into()],
            ),
            Self::NicknameInUse(nick) => (
                Numeric::ERR_NICKNAMEINUSE,
                vec![nick.clone(), "Nickname is already in use".into()],
            ),
            Self::ErroneousNickname(nick) => (
                Numeric::ERR_ERRONEUSNICKNAME,
                vec![nick.clone(), "Erroneous nickname".into()],
            ),
            Self::NoSuchNick(nick) => (
                Numeric::ERR_NOSUCHNICK,
                vec![nick.clone(), "No such nick/channel".into()],
            ),
            Self::NoOrigin => (Numeric::ERR_NOORIGIN, vec!["No origin specified".into()]),
            Self::AlreadyRegistered => (
                Numeric::ERR_ALREADYREGISTERED,
                vec!["You may not reregister".into()],
            ),
            Self::PasswordMismatch => (
                Numeric::ERR_PASSWDMISMATCH,
                vec!["Password incorrect".into()],
            ),
            Self::NoPrivileges => (
                Numeric::ERR_NOPRIVILEGES,
                vec!["Permission Denied- You're not an IRC operator".into()],
            ),
            Self::InvalidCapCommand(sub) => (
                Numeric::ERR_INVALIDCAPCMD,
                vec![sub.clone(), "Invalid CAP command".into()],
            ),
            Self::Quit(_) => return None,
        };
        Some(reply)
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_need_more_params_names_command() {
        let (numeric, params) = HandlerError::NeedMoreParams.to_numeric("USER").unwrap();
        assert_eq!(numeric, Numeric::ERR_NEEDMOREPARAMS);
        assert_eq!(params, vec!["USER", "Not enough parameters"]);
    }

    #[test]
    fn test_quit_is_silent() {
        assert!(HandlerError::Quit(None).to_numeric("QUIT").is_none());
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let all = [
            HandlerError::NeedMoreParams,
            HandlerError::NoRecipient,
            HandlerError::NoTextToSend,
            HandlerError::NoNicknameGiven,
            HandlerError::NicknameInUse(String::new()),
            HandlerError::ErroneousNickname(String::new()),
            HandlerError::NoSuchNick(String::new()),
            HandlerError::NoOrigin,
            HandlerError::AlreadyRegistered,
            HandlerError::PasswordMismatch,
            HandlerError::NoPrivileges,
            HandlerError::InvalidCapCommand(String::new()),
            HandlerError::Quit(None),
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(HandlerError::error_code).collect();
        assert_eq!(codes.len(), all.len());
    }
}
