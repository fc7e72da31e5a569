//! MAPI property-id constants for the properties this crate emits (§4.D).
//! Mirrors the tag table the workspace's MSG reader keeps alongside its own
//! property parser, just populated for the write side instead of the read
//! side.

// --- message storage ---
pub(crate) const PR_MESSAGE_CLASS: u16 = 0x001A;
pub(crate) const PR_SUBJECT: u16 = 0x0037;
pub(crate) const PR_SUBJECT_PREFIX: u16 = 0x003D;
pub(crate) const PR_NORMALIZED_SUBJECT: u16 = 0x0E1D;
pub(crate) const PR_SENT_REPRESENTING_ADDRTYPE: u16 = 0x0064;
pub(crate) const PR_SENT_REPRESENTING_EMAIL_ADDRESS: u16 = 0x0065;
pub(crate) const PR_SENDER_ADDRTYPE: u16 = 0x0C1E;
pub(crate) const PR_SENDER_EMAIL_ADDRESS: u16 = 0x0C1F;
pub(crate) const PR_SENT_REPRESENTING_NAME: u16 = 0x0042;
pub(crate) const PR_SENDER_NAME: u16 = 0x0C1A;
pub(crate) const PR_BODY: u16 = 0x1000;
pub(crate) const PR_HTML: u16 = 0x1013;
pub(crate) const PR_NATIVE_BODY_INFO: u16 = 0x1016;
pub(crate) const PR_MESSAGE_FLAGS: u16 = 0x0E07;
pub(crate) const PR_CLIENT_SUBMIT_TIME: u16 = 0x0039;
pub(crate) const PR_MESSAGE_DELIVERY_TIME: u16 = 0x0E06;
pub(crate) const PR_CREATION_TIME: u16 = 0x3007;
pub(crate) const PR_LAST_MODIFICATION_TIME: u16 = 0x3008;
pub(crate) const PR_CONVERSATION_TOPIC: u16 = 0x0070;
pub(crate) const PR_CONVERSATION_INDEX: u16 = 0x0071;
pub(crate) const PR_STORE_SUPPORT_MASK: u16 = 0x340D;

// --- recipient storage ---
pub(crate) const PR_OBJECT_TYPE: u16 = 0x0FFE;
pub(crate) const PR_DISPLAY_TYPE: u16 = 0x3900;
pub(crate) const PR_RECIPIENT_TYPE: u16 = 0x0C15;
pub(crate) const PR_ROWID: u16 = 0x3000;
pub(crate) const PR_EMAIL_ADDRESS: u16 = 0x3003;
pub(crate) const PR_ADDRTYPE: u16 = 0x3002;
pub(crate) const PR_DISPLAY_NAME: u16 = 0x3001;
pub(crate) const PR_SEARCH_KEY: u16 = 0x300B;

// --- attachment storage ---
pub(crate) const PR_ATTACH_METHOD: u16 = 0x3705;
pub(crate) const PR_ATTACH_FILENAME: u16 = 0x3704;
pub(crate) const PR_ATTACH_LONG_FILENAME: u16 = 0x3707;
pub(crate) const PR_ATTACH_DATA_BIN: u16 = 0x3701;
pub(crate) const PR_ATTACH_SIZE: u16 = 0x0E20;
pub(crate) const PR_ATTACH_MIME_TAG: u16 = 0x370E;
pub(crate) const PR_ATTACH_CONTENT_ID: u16 = 0x3712;
pub(crate) const PR_ATTACH_FLAGS: u16 = 0x3714;
pub(crate) const PR_ATTACHMENT_HIDDEN: u16 = 0x7FFE;

/// `ATT_MHTML_REF`: the attachment is referenced inline from the HTML body.
pub(crate) const ATT_MHTML_REF: i32 = 0x4;

pub(crate) const MSGFLAG_READ: i32 = 0x0001;
pub(crate) const MSGFLAG_SUBMITTED: i32 = 0x0004;
pub(crate) const MSGFLAG_UNSENT: i32 = 0x0008;
pub(crate) const MSGFLAG_HASATTACH: i32 = 0x0010;

pub(crate) const STORE_SUPPORT_MASK_UNICODE: i32 = 0x0004_0000;

pub(crate) const OBJ_MESSAGE: i32 = 6;
pub(crate) const OBJ_ATTACH: i32 = 7;

/// `PR_NATIVE_BODY_INFO` values (MS-OXCMSG 2.2.1.56.4).
pub(crate) const NATIVE_BODY_PLAIN_TEXT: i32 = 1;
pub(crate) const NATIVE_BODY_HTML: i32 = 3;
