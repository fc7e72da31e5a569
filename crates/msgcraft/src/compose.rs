//! Storage composer (component D): turns a [`MessageDescription`] into the
//! logical [`Storage`] tree that [`msgcraft_cfb::write`] serializes, calling
//! the property-table writer (component B) and variable-stream emitter
//! (component C) for each storage along the way.
use crate::codec::{Codepage, PropertyValue};
use crate::error::MsgError;
use crate::message::{
    Attachment, Conversation, ConversationIndexStyle, MessageDescription, Recipient,
};
use crate::tags::*;
use msgcraft_cfb::tree::Storage;
use msgcraft_util::win32::datetime_to_filetime;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Which header a property table is prefixed with (§4.B): the top-level
/// message carries recipient/attachment bookkeeping counts; recipient and
/// attachment storages carry 8 reserved zero bytes.
enum TableHeader {
    TopLevel {
        recipient_count: u32,
        attachment_count: u32,
    },
    Sub,
}

/// Builds the `__properties_version1.0` stream bytes for one storage, plus
/// the list of `(stream name, body)` pairs its variable-length properties
/// need (component C). Entries are written in ascending-tag order (§4.B);
/// duplicate tags are a caller bug caught before this function is reached
/// (see [`merge_properties`]).
fn build_property_table(
    header: TableHeader,
    mut properties: Vec<(u16, PropertyValue)>,
    codepage: Codepage,
    strict: bool,
) -> Result<(Vec<u8>, Vec<(String, Vec<u8>)>), MsgError> {
    properties.sort_by_key(|(id, v)| ((*id as u32) << 16) | v.type_code() as u32);

    let mut table = Vec::new();
    match header {
        TableHeader::TopLevel {
            recipient_count,
            attachment_count,
        } => {
            table.extend_from_slice(&[0u8; 8]);
            table.extend_from_slice(&recipient_count.to_le_bytes()); // next_recipient_id
            table.extend_from_slice(&attachment_count.to_le_bytes()); // next_attachment_id
            table.extend_from_slice(&recipient_count.to_le_bytes());
            table.extend_from_slice(&attachment_count.to_le_bytes());
            table.extend_from_slice(&[0u8; 8]);
        }
        TableHeader::Sub => table.extend_from_slice(&[0u8; 8]),
    }

    let mut streams = Vec::new();
    for (id, value) in properties {
        let tag: u32 = ((id as u32) << 16) | value.type_code() as u32;
        table.extend_from_slice(&tag.to_le_bytes());
        table.extend_from_slice(&0x0000_0006u32.to_le_bytes()); // PROPATTR_READABLE | PROPATTR_WRITABLE

        if value.is_fixed_length() {
            let encoded = value.encode(codepage, strict)?;
            debug_assert!(encoded.len() <= 8, "fixed-length property wider than 8 bytes");
            let mut payload = [0u8; 8];
            payload[..encoded.len()].copy_from_slice(&encoded);
            table.extend_from_slice(&payload);
        } else {
            let encoded = value.encode(codepage, strict)?;
            let size = encoded.len() as u32;
            table.extend_from_slice(&size.to_le_bytes());
            table.extend_from_slice(&[0u8; 4]);
            let name = format!("__substg1.0_{tag:08X}");
            debug!(name, size, "emitting variable-length property stream");
            streams.push((name, encoded));
        }
    }
    Ok((table, streams))
}

/// Drops any custom property whose tag collides with one already staged for
/// a storage, keeping the required/earlier one and logging the collision —
/// a recoverable façade-level oddity (§10.1), not a reason to abort.
fn merge_properties(
    mut required: Vec<(u16, PropertyValue)>,
    custom: &[(u16, PropertyValue)],
) -> Vec<(u16, PropertyValue)> {
    for (id, value) in custom {
        if required.iter().any(|(rid, _)| rid == id) {
            warn!(id = format!("0x{id:04X}"), "custom property collides with a reserved tag, dropping the custom value");
            continue;
        }
        required.push((*id, value.clone()));
    }
    required
}

fn add_properties_to_storage(
    storage: &mut Storage,
    header: TableHeader,
    properties: Vec<(u16, PropertyValue)>,
    codepage: Codepage,
    strict: bool,
) -> Result<(), MsgError> {
    let (table, streams) = build_property_table(header, properties, codepage, strict)?;
    storage.add_stream("__properties_version1.0", table);
    for (name, data) in streams {
        storage.add_stream(name, data);
    }
    Ok(())
}

/// Synthesizes a 22-byte root `PR_CONVERSATION_INDEX` (§4.D): 1 header byte,
/// 5 bytes of the current FILETIME's high-order 40 bits, 16 bytes of
/// entropy.
fn synthesize_root_index(now: OffsetDateTime, entropy: [u8; 16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(22);
    out.push(0x01);
    let ticks = datetime_to_filetime(now).unwrap_or(0);
    // MS-OXCMSG header time: the top 40 bits of the FILETIME, big-endian.
    let truncated = ticks >> 24;
    out.extend_from_slice(&truncated.to_be_bytes()[3..8]);
    out.extend_from_slice(&entropy);
    out
}

/// Appends a 5-byte reply child block to a parent conversation index.
fn append_child_block(parent: &[u8], now: OffsetDateTime, style: ConversationIndexStyle) -> Vec<u8> {
    let mut out = parent.to_vec();
    match style {
        ConversationIndexStyle::Trivial => {
            // Sanctioned by §9's open question as accepted-but-not-literal:
            // derive pseudo-randomness from the current tick count rather
            // than from a parent byte we'd otherwise have to decode.
            let ticks = datetime_to_filetime(now).unwrap_or(0);
            out.extend_from_slice(&ticks.to_le_bytes()[0..5]);
        }
        ConversationIndexStyle::Standard => {
            let parent_high = if parent.len() >= 6 {
                let mut be = [0u8; 8];
                be[3..8].copy_from_slice(&parent[1..6]);
                u64::from_be_bytes(be) << 24
            } else {
                0
            };
            let now_ticks = datetime_to_filetime(now).unwrap_or(parent_high);
            let delta = now_ticks.saturating_sub(parent_high);
            // Clamp the delta to 32 bits and emit it as a flag byte (top bit
            // marks "delta present") followed by the full 4-byte big-endian
            // magnitude — 5 bytes total, none of them repeated.
            let clamped = delta.min(u32::MAX as u64) as u32;
            let magnitude = clamped.to_be_bytes();
            let flags: u8 = 0x80 | (magnitude[0] & 0x7F);
            out.push(flags);
            out.extend_from_slice(&magnitude);
        }
    }
    out
}

fn conversation_index_bytes(conv: &Conversation, now: OffsetDateTime) -> Vec<u8> {
    match &conv.parent_index {
        Some(parent) => append_child_block(parent, now, conv.style),
        None => synthesize_root_index(now, conv.entropy),
    }
}

fn compose_recipient_storage(
    r: &Recipient,
    codepage: Codepage,
    strict: bool,
) -> Result<Storage, MsgError> {
    let mut storage = Storage::new(format!("__recip_version1.0_#{:08X}", r.index));
    let search_key = {
        let mut sk = format!("SMTP:{}", r.address).to_uppercase().into_bytes();
        sk.push(0);
        sk
    };
    let properties = vec![
        (PR_OBJECT_TYPE, PropertyValue::Integer32(OBJ_MESSAGE)),
        (PR_DISPLAY_TYPE, PropertyValue::Integer32(0)),
        (PR_RECIPIENT_TYPE, PropertyValue::Integer32(r.kind as i32)),
        (PR_ROWID, PropertyValue::Integer32(r.index as i32)),
        (PR_EMAIL_ADDRESS, PropertyValue::String8(r.address.clone())),
        (PR_ADDRTYPE, PropertyValue::String8(r.address_type.clone())),
        (PR_DISPLAY_NAME, PropertyValue::Unicode(r.display_name.clone())),
        (PR_SEARCH_KEY, PropertyValue::Binary(search_key)),
    ];
    add_properties_to_storage(&mut storage, TableHeader::Sub, properties, codepage, strict)?;
    Ok(storage)
}

fn compose_attachment_storage(
    a: &Attachment,
    codepage: Codepage,
    strict: bool,
) -> Result<Storage, MsgError> {
    let mut storage = Storage::new(format!("__attach_version1.0_#{:08X}", a.index));
    let mut properties = vec![
        (PR_OBJECT_TYPE, PropertyValue::Integer32(OBJ_ATTACH)),
        (PR_ATTACH_METHOD, PropertyValue::Integer32(a.attach_method as i32)),
        (PR_ATTACH_FILENAME, PropertyValue::String8(short_filename(&a.filename))),
        (PR_ATTACH_LONG_FILENAME, PropertyValue::Unicode(a.filename.clone())),
        (PR_ATTACH_DATA_BIN, PropertyValue::Binary(a.payload.clone())),
        (PR_ATTACH_SIZE, PropertyValue::Integer32(a.payload.len() as i32)),
    ];
    if let Some(mime) = &a.mime_type {
        properties.push((PR_ATTACH_MIME_TAG, PropertyValue::String8(mime.clone())));
    }
    if let Some(cid) = &a.content_id {
        properties.push((PR_ATTACH_CONTENT_ID, PropertyValue::Unicode(cid.clone())));
    }
    if a.inline {
        properties.push((PR_ATTACH_FLAGS, PropertyValue::Integer32(ATT_MHTML_REF)));
        properties.push((PR_ATTACHMENT_HIDDEN, PropertyValue::Boolean(true)));
    }
    add_properties_to_storage(&mut storage, TableHeader::Sub, properties, codepage, strict)?;
    Ok(storage)
}

/// MS-OXMSG's `PR_ATTACH_FILENAME` is the legacy 8.3-style short name; this
/// crate has no real short-name generation algorithm (not required by any
/// covered scenario), so it truncates the long name to fit. Good enough for
/// a property no modern reader actually relies on.
fn short_filename(long: &str) -> String {
    if long.len() <= 12 {
        long.to_string()
    } else {
        long.chars().take(12).collect()
    }
}

fn message_flags(desc: &MessageDescription) -> i32 {
    let mut flags = 0;
    if desc.flags.read {
        flags |= MSGFLAG_READ;
    }
    if desc.flags.unsent {
        flags |= MSGFLAG_UNSENT;
    } else {
        flags |= MSGFLAG_SUBMITTED;
    }
    if !desc.attachments().is_empty() {
        flags |= MSGFLAG_HASATTACH;
    }
    flags
}

fn compose_message_properties(
    desc: &MessageDescription,
    now: OffsetDateTime,
) -> Vec<(u16, PropertyValue)> {
    let mut properties = vec![
        (PR_MESSAGE_CLASS, PropertyValue::Unicode("IPM.Note".to_string())),
        (PR_SUBJECT, PropertyValue::Unicode(desc.subject.clone())),
        (PR_SUBJECT_PREFIX, PropertyValue::Unicode(String::new())),
        (PR_NORMALIZED_SUBJECT, PropertyValue::Unicode(desc.subject.clone())),
        (
            PR_SENDER_ADDRTYPE,
            PropertyValue::String8(desc.sender.address_type.clone()),
        ),
        (
            PR_SENDER_EMAIL_ADDRESS,
            PropertyValue::String8(desc.sender.address.clone()),
        ),
        (PR_SENDER_NAME, PropertyValue::Unicode(desc.sender.display_name.clone())),
        (
            PR_SENT_REPRESENTING_ADDRTYPE,
            PropertyValue::String8(desc.sender.address_type.clone()),
        ),
        (
            PR_SENT_REPRESENTING_EMAIL_ADDRESS,
            PropertyValue::String8(desc.sender.address.clone()),
        ),
        (
            PR_SENT_REPRESENTING_NAME,
            PropertyValue::Unicode(desc.sender.display_name.clone()),
        ),
        (PR_MESSAGE_FLAGS, PropertyValue::Integer32(message_flags(desc))),
        (PR_CLIENT_SUBMIT_TIME, PropertyValue::SysTime(now)),
        (PR_MESSAGE_DELIVERY_TIME, PropertyValue::SysTime(now)),
        (PR_CREATION_TIME, PropertyValue::SysTime(now)),
        (PR_LAST_MODIFICATION_TIME, PropertyValue::SysTime(now)),
        (
            PR_STORE_SUPPORT_MASK,
            PropertyValue::Integer32(STORE_SUPPORT_MASK_UNICODE),
        ),
    ];

    if let Some(plain) = &desc.body.plain {
        properties.push((PR_BODY, PropertyValue::Unicode(plain.clone())));
    }
    if let Some(html) = &desc.body.html {
        properties.push((PR_HTML, PropertyValue::Binary(html.clone().into_bytes())));
        properties.push((PR_NATIVE_BODY_INFO, PropertyValue::Integer32(NATIVE_BODY_HTML)));
    } else if desc.body.plain.is_some() {
        properties.push((
            PR_NATIVE_BODY_INFO,
            PropertyValue::Integer32(NATIVE_BODY_PLAIN_TEXT),
        ));
    }

    if let Some(conv) = &desc.conversation {
        properties.push((PR_CONVERSATION_TOPIC, PropertyValue::Unicode(conv.topic.clone())));
        properties.push((
            PR_CONVERSATION_INDEX,
            PropertyValue::Binary(conversation_index_bytes(conv, now)),
        ));
    }

    properties
}

/// Assembles the full logical directory tree (§4.D) for one
/// [`MessageDescription`], ready for [`msgcraft_cfb::write`].
pub(crate) fn compose_root(desc: &MessageDescription, now: OffsetDateTime) -> Result<Storage, MsgError> {
    desc.validate()?;

    let mut root = Storage::new("/");
    let required = compose_message_properties(desc, now);
    let properties = merge_properties(required, desc.extra_properties());
    add_properties_to_storage(
        &mut root,
        TableHeader::TopLevel {
            recipient_count: desc.recipients().len() as u32,
            attachment_count: desc.attachments().len() as u32,
        },
        properties,
        desc.codepage,
        desc.strict_encoding,
    )?;

    // Named-property map: three minimal empty streams (§9 "named-property
    // map"); no named properties are ever emitted, so the map stays empty.
    let nameid = root.add_storage("__nameid_version1.0");
    nameid.add_stream("__substg1.0_00020102", Vec::new());
    nameid.add_stream("__substg1.0_00030102", Vec::new());
    nameid.add_stream("__substg1.0_00040102", Vec::new());

    for r in desc.recipients() {
        let storage = compose_recipient_storage(r, desc.codepage, desc.strict_encoding)?;
        root.add_child_storage(storage);
    }
    for a in desc.attachments() {
        let storage = compose_attachment_storage(a, desc.codepage, desc.strict_encoding)?;
        root.add_child_storage(storage);
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{RecipientKind, Sender};

    fn sample_now() -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH
    }

    #[test]
    fn property_table_entries_are_tag_ordered() {
        let properties = vec![
            (0x3000, PropertyValue::Integer32(1)),
            (0x0037, PropertyValue::Unicode("s".into())),
            (0x0003, PropertyValue::Integer32(0)),
        ];
        let (table, _) = build_property_table(TableHeader::Sub, properties, Codepage::default(), true).unwrap();
        let entry_tags: Vec<u32> = table[8..]
            .chunks(16)
            .map(|c| u32::from_le_bytes(c[0..4].try_into().unwrap()))
            .collect();
        let mut sorted = entry_tags.clone();
        sorted.sort();
        assert_eq!(entry_tags, sorted);
    }

    #[test]
    fn variable_length_stream_size_matches_table_entry() {
        let properties = vec![(0x0037, PropertyValue::Unicode("Hello".into()))];
        let (table, streams) = build_property_table(TableHeader::Sub, properties, Codepage::default(), true).unwrap();
        assert_eq!(streams.len(), 1);
        let (name, body) = &streams[0];
        assert_eq!(name, "__substg1.0_0037001F");
        let declared_size = u32::from_le_bytes(table[16..20].try_into().unwrap());
        assert_eq!(declared_size as usize, body.len());
        assert_eq!(body, b"H\0e\0l\0l\0o\0\0\0");
    }

    #[test]
    fn custom_property_colliding_with_reserved_tag_is_dropped() {
        let required = vec![(PR_SUBJECT, PropertyValue::Unicode("original".into()))];
        let custom = vec![(PR_SUBJECT, PropertyValue::Unicode("hijacked".into()))];
        let merged = merge_properties(required, &custom);
        assert_eq!(merged.len(), 1);
        assert!(matches!(&merged[0].1, PropertyValue::Unicode(s) if s == "original"));
    }

    #[test]
    fn reply_index_begins_with_parent_prefix() {
        let mut desc = MessageDescription::new("Re: hi", Sender::new("a@x.y", "A"));
        desc.add_recipient("b@x.y", "B", RecipientKind::To);
        let parent = synthesize_root_index(sample_now(), [7u8; 16]);
        assert_eq!(parent.len(), 22);
        desc.conversation = Some(Conversation::reply("hi", parent.clone()));
        let properties = compose_message_properties(&desc, sample_now());
        let (_, value) = properties
            .iter()
            .find(|(id, _)| *id == PR_CONVERSATION_INDEX)
            .unwrap();
        if let PropertyValue::Binary(bytes) = value {
            assert!(bytes.len() >= 27);
            assert_eq!(&bytes[..22], &parent[..]);
        } else {
            panic!("expected binary conversation index");
        }
    }

    #[test]
    fn has_attachment_flag_tracks_attachment_list() {
        let mut desc = MessageDescription::new("s", Sender::new("a@x.y", "A"));
        assert_eq!(message_flags(&desc) & MSGFLAG_HASATTACH, 0);
        desc.add_attachment("f.txt", b"hi".to_vec());
        assert_ne!(message_flags(&desc) & MSGFLAG_HASATTACH, 0);
    }
}
