//! Numeric reply codes used by the daemon.

#![allow(non_camel_case_types)]

/// Server numeric reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Numeric {
    /// 001
    RPL_WELCOME = 1,
    /// 002
    RPL_YOURHOST = 2,
    /// 003
    RPL_CREATED = 3,
    /// 004
    RPL_MYINFO = 4,
    /// 005
    RPL_ISUPPORT = 5,
    /// 372
    RPL_MOTD = 372,
    /// 375
    RPL_MOTDSTART = 375,
    /// 376
    RPL_ENDOFMOTD = 376,
    /// 381
    RPL_YOUREOPER = 381,
    /// 401
    ERR_NOSUCHNICK = 401,
    /// 409
    ERR_NOORIGIN = 409,
    /// 410
    ERR_INVALIDCAPCMD = 410,
    /// 411
    ERR_NORECIPIENT = 411,
    /// 412
    ERR_NOTEXTTOSEND = 412,
    /// 417
    ERR_INPUTTOOLONG = 417,
    /// 421
    ERR_UNKNOWNCOMMAND = 421,
    /// 422
    ERR_NOMOTD = 422,
    /// 431
    ERR_NONICKNAMEGIVEN = 431,
    /// 432
    ERR_ERRONEUSNICKNAME = 432,
    /// 433
    ERR_NICKNAMEINUSE = 433,
    /// 451
    ERR_NOTREGISTERED = 451,
    /// 461
    ERR_NEEDMOREPARAMS = 461,
    /// 462
    ERR_ALREADYREGISTERED = 462,
    /// 464
    ERR_PASSWDMISMATCH = 464,
    /// 481
    ERR_NOPRIVILEGES = 481,
    /// 491
    ERR_NOOPERHOST = 491,
}

impl Numeric {
    /// Three-digit code.
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Whether this is an error reply (400-599).
    pub fn is_error(self) -> bool {
        (400..600).contains(&self.code())
    }
}
