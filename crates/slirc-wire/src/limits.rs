//! Protocol length limits.

use crate::error::LengthError;

/// Maximum message body length, CRLF included (RFC 1459/2812).
///
/// Applies to everything after the tag block.
pub const MAX_LINE_LEN: usize = 512;

/// Maximum client-sent tag data, excluding the leading `@` and the trailing
/// space (IRCv3 message-tags).
pub const MAX_CLIENT_TAG_DATA: usize = 4094;

/// Maximum server-sent tag data, excluding the leading `@` and the trailing
/// space.
pub const MAX_SERVER_TAG_DATA: usize = 8191;

/// Size of a connection's receive buffer: the largest legal tagged line.
///
/// A buffer of this size that fills without a line terminator means the peer
/// sent an oversized line and the connection is dropped.
pub const RECV_BUFFER_LEN: usize = MAX_CLIENT_TAG_DATA + 2 + MAX_LINE_LEN;

/// Capacity of the outbound line builder.
pub const SEND_BUFFER_LEN: usize = MAX_SERVER_TAG_DATA + 2 + MAX_LINE_LEN;

/// Validate a client line (terminators already stripped) against the
/// protocol limits.
///
/// Tag data is measured between `@` and the first space; the body is the
/// rest of the line plus the two terminator bytes.
pub fn check_line_length(line: &[u8]) -> Result<(), LengthError> {
    let body = if line.first() == Some(&b'@') {
        let tag_end = line.iter().position(|&b| b == b' ').unwrap_or(line.len());
        let tag_data = tag_end - 1;
        if tag_data > MAX_CLIENT_TAG_DATA {
            return Err(LengthError::TagsTooLong {
                actual: tag_data,
                limit: MAX_CLIENT_TAG_DATA,
            });
        }
        line.get(tag_end + 1..).unwrap_or_default()
    } else {
        line
    };

    let body_len = body.len() + 2;
    if body_len > MAX_LINE_LEN {
        return Err(LengthError::LineTooLong {
            actual: body_len,
            limit: MAX_LINE_LEN,
        });
    }
    Ok(())
}
