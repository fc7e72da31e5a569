//! Message builder façade (component F): the in-memory description callers
//! populate before handing it to [`crate::write`]. None of this is the core
//! encoder — it is a thin data-gathering surface the storage composer reads.
use crate::codec::{Codepage, PropertyValue};
use crate::error::MsgError;

/// The sender identity a message is stamped with. The façade imposes no
/// mediation here: callers set whatever address and display name they want,
/// which is the entire point of a library that builds `.msg` files without
/// an Outlook/MAPI profile in the loop.
#[derive(Debug, Clone)]
pub struct Sender {
    /// SMTP (or other) address.
    pub address: String,
    /// Display name shown in mail clients.
    pub display_name: String,
    /// MAPI address type, e.g. `"SMTP"` or `"EX"`.
    pub address_type: String,
}

impl Sender {
    /// Creates a sender with address type `"SMTP"`.
    pub fn new(address: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: display_name.into(),
            address_type: "SMTP".to_string(),
        }
    }
}

/// A recipient kind, matching `PR_RECIPIENT_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    /// `MAPI_TO` (1).
    To = 1,
    /// `MAPI_CC` (2).
    Cc = 2,
    /// `MAPI_BCC` (3).
    Bcc = 3,
}

/// A single message recipient. `index` is assigned by
/// [`MessageDescription::add_recipient`] in insertion order and determines
/// both `PR_ROWID` and the recipient storage's zero-padded suffix.
#[derive(Debug, Clone)]
pub struct Recipient {
    /// SMTP (or other) address.
    pub address: String,
    /// Display name shown in mail clients.
    pub display_name: String,
    /// MAPI address type, defaults to `"SMTP"`.
    pub address_type: String,
    /// To/Cc/Bcc.
    pub kind: RecipientKind,
    pub(crate) index: u32,
}

/// How an attachment's data is stored, matching `PR_ATTACH_METHOD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachMethod {
    /// `ATTACH_BY_VALUE` (1): the attachment's bytes are stored inline, in
    /// `PR_ATTACH_DATA_BIN`. The only method this crate emits.
    ByValue = 1,
}

/// A single message attachment. `index` is assigned by
/// [`MessageDescription::add_attachment`] in insertion order and determines
/// both `PR_RENDERING_POSITION`-adjacent ordering and the attachment
/// storage's zero-padded suffix.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// Raw attachment payload.
    pub payload: Vec<u8>,
    /// MIME type, when known.
    pub mime_type: Option<String>,
    /// Content-ID, for `cid:` references from an HTML body.
    pub content_id: Option<String>,
    /// Whether this attachment is an inline (hidden) part of the body rather
    /// than a user-visible attachment.
    pub inline: bool,
    /// Storage method; always [`AttachMethod::ByValue`] today.
    pub attach_method: AttachMethod,
    pub(crate) index: u32,
}

/// A message's plain-text and/or HTML body. At least one of the two should
/// be set; an entirely empty body (both `None`) is legal (§8 S6).
#[derive(Debug, Clone, Default)]
pub struct Body {
    /// Plain-text body, stored as `PR_BODY`.
    pub plain: Option<String>,
    /// HTML body, stored as `PR_HTML` (binary, in the message's codepage)
    /// with a matching `PR_NATIVE_BODY_INFO`.
    pub html: Option<String>,
}

/// How a reply's conversation-index child block is encoded, gating the
/// open question in §9: whether to encode an actual MS-OXCMSG time delta or
/// fall back to the simpler, also-accepted random-padding form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationIndexStyle {
    /// Encode a best-effort MS-OXCMSG time-delta child block. The default:
    /// readers that validate strictly see a well-formed delta, not random
    /// bytes masquerading as one.
    #[default]
    Standard,
    /// Append five random bytes as the child block, matching what some
    /// real-world encoders do in practice. Readers tolerate this, but it is
    /// not the literal MS-OXCMSG encoding — opt in explicitly.
    Trivial,
}

/// Threading metadata: the conversation topic and, optionally, the parent
/// message's conversation-index bytes (making this message a reply).
#[derive(Debug, Clone)]
pub struct Conversation {
    /// `PR_CONVERSATION_TOPIC`.
    pub topic: String,
    /// The parent message's full `PR_CONVERSATION_INDEX` bytes, if this
    /// message is a reply.
    pub parent_index: Option<Vec<u8>>,
    /// Entropy for the 16 random bytes in a synthesized root index. Defaults
    /// to a fresh random GUID; override for deterministic test output (§8
    /// testable property 5).
    pub entropy: [u8; 16],
    /// See [`ConversationIndexStyle`].
    pub style: ConversationIndexStyle,
}

impl Conversation {
    /// Starts a new conversation thread (no parent), with random entropy.
    pub fn new_thread(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            parent_index: None,
            entropy: *uuid::Uuid::new_v4().as_bytes(),
            style: ConversationIndexStyle::default(),
        }
    }

    /// Continues an existing thread, given the parent's conversation index.
    pub fn reply(topic: impl Into<String>, parent_index: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            parent_index: Some(parent_index),
            entropy: *uuid::Uuid::new_v4().as_bytes(),
            style: ConversationIndexStyle::default(),
        }
    }

    /// Overrides the entropy used when synthesizing a root conversation
    /// index, for deterministic output.
    pub fn with_entropy(mut self, entropy: [u8; 16]) -> Self {
        self.entropy = entropy;
        self
    }

    /// Overrides the child-block encoding style.
    pub fn with_style(mut self, style: ConversationIndexStyle) -> Self {
        self.style = style;
        self
    }
}

/// Read/unread and sent/unsent housekeeping flags. `PR_MESSAGE_FLAGS`'s
/// has-attachments bit is derived from the attachment list at serialize
/// time (invariant 3), not stored here, so it can never disagree with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFlags {
    /// `MSGFLAG_READ`.
    pub read: bool,
    /// `MSGFLAG_UNSENT`.
    pub unsent: bool,
}

/// The root aggregate: every field a caller populates before calling
/// [`crate::write`]. Mutable during façade population; the core treats it as
/// read-only once serialization begins (it only ever takes `&self`).
#[derive(Debug, Clone)]
pub struct MessageDescription {
    /// `PR_SUBJECT`.
    pub subject: String,
    /// Sender identity.
    pub sender: Sender,
    /// Plain-text and/or HTML body.
    pub body: Body,
    /// Recipients, in insertion order.
    recipients: Vec<Recipient>,
    /// Attachments, in insertion order.
    attachments: Vec<Attachment>,
    /// Threading metadata, if this message participates in a conversation.
    pub conversation: Option<Conversation>,
    /// `STRING8` codepage hint; defaults to Windows-1252.
    pub codepage: Codepage,
    /// When `true`, a `STRING8` value containing characters the codepage
    /// cannot represent fails with [`MsgError::EncodingError`] instead of
    /// substituting `?`. Defaults to `false` (lossy), per §4.A.
    pub strict_encoding: bool,
    /// Read/unread and sent/unsent flags.
    pub flags: MessageFlags,
    /// Additional caller-supplied properties, keyed by property id. A
    /// custom property whose tag collides with one of the required
    /// properties in §4.D is dropped with a `tracing::warn!` rather than
    /// erroring the whole message (see §10.1).
    extra_properties: Vec<(u16, PropertyValue)>,
}

impl MessageDescription {
    /// Creates a new message with the given subject and sender, an empty
    /// body, no recipients or attachments, and default housekeeping flags.
    pub fn new(subject: impl Into<String>, sender: Sender) -> Self {
        Self {
            subject: subject.into(),
            sender,
            body: Body::default(),
            recipients: Vec::new(),
            attachments: Vec::new(),
            conversation: None,
            codepage: Codepage::default(),
            strict_encoding: false,
            flags: MessageFlags::default(),
            extra_properties: Vec::new(),
        }
    }

    /// Adds a recipient, assigning it the next zero-based insertion index.
    pub fn add_recipient(
        &mut self,
        address: impl Into<String>,
        display_name: impl Into<String>,
        kind: RecipientKind,
    ) -> &mut Recipient {
        let index = self.recipients.len() as u32;
        self.recipients.push(Recipient {
            address: address.into(),
            display_name: display_name.into(),
            address_type: "SMTP".to_string(),
            kind,
            index,
        });
        self.recipients.last_mut().expect("just pushed")
    }

    /// Returns the recipients added so far, in insertion order.
    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Adds an attachment, assigning it the next zero-based insertion index.
    pub fn add_attachment(
        &mut self,
        filename: impl Into<String>,
        payload: Vec<u8>,
    ) -> &mut Attachment {
        let index = self.attachments.len() as u32;
        self.attachments.push(Attachment {
            filename: filename.into(),
            payload,
            mime_type: None,
            content_id: None,
            inline: false,
            attach_method: AttachMethod::ByValue,
            index,
        });
        self.attachments.last_mut().expect("just pushed")
    }

    /// Returns the attachments added so far, in insertion order.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Adds (or overwrites) a custom property. Rejects property ids in the
    /// 0x8000-0xFFFF named-property range, which this crate's minimal
    /// named-property map (§4.D) cannot resolve, with [`MsgError::InvalidInput`].
    pub fn set_custom_property(&mut self, id: u16, value: PropertyValue) -> Result<(), MsgError> {
        if id & 0x8000 != 0 {
            return Err(MsgError::InvalidInput(format!(
                "property id 0x{id:04X} falls in the named-property range, which this crate does not map"
            )));
        }
        if let Some(existing) = self.extra_properties.iter_mut().find(|(i, _)| *i == id) {
            existing.1 = value;
        } else {
            self.extra_properties.push((id, value));
        }
        Ok(())
    }

    /// Returns the custom properties added so far.
    pub(crate) fn extra_properties(&self) -> &[(u16, PropertyValue)] {
        &self.extra_properties
    }

    /// Validates the description's required fields ahead of serialization.
    pub(crate) fn validate(&self) -> Result<(), MsgError> {
        if self.sender.address.trim().is_empty() {
            return Err(MsgError::InvalidInput(
                "sender address must not be empty".to_string(),
            ));
        }
        for r in &self.recipients {
            if r.address.trim().is_empty() {
                return Err(MsgError::InvalidInput(format!(
                    "recipient #{} address must not be empty",
                    r.index
                )));
            }
        }
        if let Some(conv) = &self.conversation {
            if let Some(parent) = &conv.parent_index {
                if parent.len() < 22 {
                    return Err(MsgError::InvalidInput(format!(
                        "parent conversation index must be at least 22 bytes, got {}",
                        parent.len()
                    )));
                }
            }
        }
        Ok(())
    }
}
