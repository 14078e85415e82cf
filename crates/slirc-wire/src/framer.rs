//! Line framing.
//!
//! The framer is a pure scan: it never allocates, never mutates the buffer and
//! keeps no state between calls. Callers own the buffer and compact it using
//! the returned byte count.

/// Scan `buf[..valid]` for complete lines.
///
/// Each LF-terminated line is handed to `on_line` with the LF and an
/// immediately preceding CR removed. Zero-length lines are skipped. Returns
/// the number of bytes consumed, i.e. the offset just past the last LF; any
/// bytes after it belong to an incomplete line.
///
/// ```
/// use slirc_wire::frame_lines;
///
/// let mut lines = Vec::new();
/// let used = frame_lines(b"PING a\r\n\r\nPONG b\nPAR", 20, |l| lines.push(l.to_vec()));
/// assert_eq!(lines, vec![b"PING a".to_vec(), b"PONG b".to_vec()]);
/// assert_eq!(used, 17);
/// ```
pub fn frame_lines<F>(buf: &[u8], valid: usize, mut on_line: F) -> usize
where
    F: FnMut(&[u8]),
{
    let region = &buf[..valid.min(buf.len())];
    let mut consumed = 0;

    while let Some(offset) = region[consumed..].iter().position(|&b| b == b'\n') {
        let lf = consumed + offset;
        let mut end = lf;
        if end > consumed && region[end - 1] == b'\r' {
            end -= 1;
        }
        if end > consumed {
            on_line(&region[consumed..end]);
        }
        consumed = lf + 1;
    }

    consumed
}
