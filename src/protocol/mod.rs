pub mod echo;

pub use echo::{echo_reply, EchoError, EchoReply};
