//! Echo protocol
//!
//! Text written to the RX characteristic is decoded as UTF-8, trimmed of
//! surrounding whitespace and sent back on TX with a single trailing newline.

use crate::config::nus::{MAX_PACKET_SIZE, MAX_REPLY_SIZE};
use heapless::String;

/// Reply notified on the TX characteristic
pub type EchoReply = String<MAX_REPLY_SIZE>;

/// Errors that can occur while building an echo reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoError {
    /// Written bytes are not valid UTF-8
    InvalidUtf8,
    /// Reply does not fit in a TX notification
    TooLong,
}

/// Build the echo reply for bytes written to RX.
pub fn echo_reply(raw: &[u8]) -> Result<EchoReply, EchoError> {
    let text = core::str::from_utf8(raw).map_err(|_| EchoError::InvalidUtf8)?;

    let mut reply = EchoReply::new();
    reply.push_str(text.trim()).map_err(|_| EchoError::TooLong)?;
    reply.push('\n').map_err(|_| EchoError::TooLong)?;

    Ok(reply)
}
