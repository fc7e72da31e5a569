#![warn(missing_docs)]
//! Synthesizes Microsoft Outlook `.msg` files (MS-CFB container + MS-OXMSG
//! property layout) from an in-memory description, with no Outlook, MAPI, or
//! Windows dependency.
//!
//! Callers populate a [`MessageDescription`], then hand it to [`write`]
//! along with the timestamp to stamp it with. Everything else — property
//! ordering, stream naming, the mini-stream/FAT split, conversation-index
//! synthesis — is this crate's job.
//!
//! ```no_run
//! use msgcraft::{MessageDescription, Sender};
//! use std::fs::File;
//!
//! let mut desc = MessageDescription::new("Hello", Sender::new("a@example.com", "A. Sender"));
//! desc.body.plain = Some("Hello, world!".to_string());
//! let file = File::create("hello.msg")?;
//! msgcraft::write(&desc, time::OffsetDateTime::now_utc(), file)?;
//! # Ok::<(), msgcraft::MsgError>(())
//! ```

mod compose;

pub mod codec;
pub mod error;
pub mod message;
mod tags;

pub use codec::{Codepage, PropertyValue};
pub use error::MsgError;
pub use message::{
    AttachMethod, Attachment, Body, Conversation, ConversationIndexStyle, MessageDescription,
    MessageFlags, Recipient, RecipientKind, Sender,
};

use std::io::Write;
use time::OffsetDateTime;

/// Serializes `desc` into a `.msg` byte stream and writes it to `sink`.
///
/// `now` stamps every timestamped property this crate emits (submit time,
/// delivery time, creation/modification time, and the conversation-index
/// header block when the message starts a new thread). Callers that need
/// byte-for-byte reproducible output should pass a fixed value rather than
/// [`OffsetDateTime::now_utc`].
pub fn write<W: Write>(desc: &MessageDescription, now: OffsetDateTime, sink: W) -> Result<(), MsgError> {
    let root = compose::compose_root(desc, now)?;
    msgcraft_cfb::write(root, sink)?;
    Ok(())
}
