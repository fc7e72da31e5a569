//! Property codec (component A): encodes a typed MAPI value to its on-wire
//! byte form, and classifies properties as fixed- or variable-length for the
//! property-table writer.
use crate::error::MsgError;
use encoding_rs::Encoding;
use msgcraft_util::win32::datetime_to_filetime;
use time::OffsetDateTime;
use tracing::warn;

/// A MAPI property value. Variants cover the eight wire formats this crate
/// implements; [`PropertyValue::Unsupported`] is a deliberate trap for
/// callers that ask for a MAPI type outside that set — it carries only the
/// type code so [`PropertyValue::encode`] can report it, never a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `PtypInteger16` (0x0002): 2-byte little-endian, padded to 8 in the
    /// property table.
    Integer16(i16),
    /// `PtypInteger32` (0x0003): 4-byte little-endian, padded to 8.
    Integer32(i32),
    /// `PtypBoolean` (0x000B): 2-byte little-endian 0/1, padded to 8.
    Boolean(bool),
    /// `PtypInteger64` (0x0014): 8-byte little-endian.
    Integer64(i64),
    /// `PtypTime` (0x0040): a Windows FILETIME (100ns ticks since
    /// 1601-01-01 UTC), stored as 8-byte little-endian.
    SysTime(OffsetDateTime),
    /// `PtypString8` (0x001E): a single-byte-codepage string, stored in its
    /// own stream with a single trailing NUL.
    String8(String),
    /// `PtypString` (0x001F): a UTF-16LE string, stored in its own stream
    /// with a trailing `00 00`.
    Unicode(String),
    /// `PtypBinary` (0x0102): raw bytes, stored in its own stream verbatim.
    Binary(Vec<u8>),
    /// A MAPI type this codec does not implement. Always fails to encode
    /// with [`MsgError::UnsupportedType`]; exists so callers can express "I
    /// tried to use type X" without it being a compile-time impossibility.
    Unsupported(u16),
}

/// The MAPI property types fixed-width enough to be stored inline in the
/// property table rather than in an external stream.
const FIXED_LENGTH_TYPES: [u16; 5] = [0x0002, 0x0003, 0x000B, 0x0014, 0x0040];

impl PropertyValue {
    /// The 16-bit MAPI property type this value encodes as.
    pub fn type_code(&self) -> u16 {
        match self {
            Self::Integer16(_) => 0x0002,
            Self::Integer32(_) => 0x0003,
            Self::Boolean(_) => 0x000B,
            Self::Integer64(_) => 0x0014,
            Self::SysTime(_) => 0x0040,
            Self::String8(_) => 0x001E,
            Self::Unicode(_) => 0x001F,
            Self::Binary(_) => 0x0102,
            Self::Unsupported(t) => *t,
        }
    }

    /// Whether this value's type is stored inline in the property table
    /// (fixed-length) rather than in a dedicated `__substg1.0_` stream.
    pub fn is_fixed_length(&self) -> bool {
        FIXED_LENGTH_TYPES.contains(&self.type_code())
    }

    /// Encodes the value to its raw on-wire bytes. For fixed-length types
    /// this is the exact-width payload later left-aligned and zero-padded to
    /// 8 bytes by the property-table writer; for variable-length types it is
    /// the full body of the dedicated stream, including any terminator.
    pub fn encode(&self, codepage: Codepage, strict: bool) -> Result<Vec<u8>, MsgError> {
        match self {
            Self::Integer16(v) => Ok(v.to_le_bytes().to_vec()),
            Self::Integer32(v) => Ok(v.to_le_bytes().to_vec()),
            Self::Boolean(v) => Ok((*v as u16).to_le_bytes().to_vec()),
            Self::Integer64(v) => Ok(v.to_le_bytes().to_vec()),
            Self::SysTime(dt) => {
                let ticks = datetime_to_filetime(*dt).ok_or_else(|| {
                    MsgError::InvalidInput(format!(
                        "{dt:?} predates the Windows epoch or overflows FILETIME"
                    ))
                })?;
                Ok(ticks.to_le_bytes().to_vec())
            }
            Self::String8(s) => encode_string8(s, codepage.encoding(), strict),
            Self::Unicode(s) => {
                let mut out = Vec::with_capacity(s.len() * 2 + 2);
                for unit in s.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
                out.extend_from_slice(&[0, 0]);
                Ok(out)
            }
            Self::Binary(bytes) => Ok(bytes.clone()),
            Self::Unsupported(t) => Err(MsgError::UnsupportedType(format!(
                "MAPI type 0x{t:04X} is not implemented by this codec"
            ))),
        }
    }
}

fn encode_string8(s: &str, encoding: &'static Encoding, strict: bool) -> Result<Vec<u8>, MsgError> {
    let mut out = Vec::with_capacity(s.len() + 1);
    let mut tmp = [0u8; 4];
    for ch in s.chars() {
        let ch_str = ch.encode_utf8(&mut tmp);
        let (bytes, _, had_errors) = encoding.encode(ch_str);
        if had_errors {
            if strict {
                return Err(MsgError::EncodingError(format!(
                    "character {ch:?} is not representable in codepage {}",
                    encoding.name()
                )));
            }
            warn!(codepage = encoding.name(), char = %ch, "lossy STRING8 encode, substituting '?'");
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out.push(0);
    Ok(out)
}

/// A Windows codepage hint for `STRING8` encoding. Defaults to Windows-1252
/// (MS-OXMSG's default message codepage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codepage(u16);

impl Codepage {
    /// Windows-1252, the default MS-OXMSG message codepage.
    pub const WINDOWS_1252: Codepage = Codepage(1252);

    /// Builds a codepage hint from a raw Windows codepage number.
    pub fn from_raw(cp: u16) -> Self {
        Self(cp)
    }

    /// Returns the raw Windows codepage number.
    pub fn as_raw(self) -> u16 {
        self.0
    }

    /// Resolves this hint to an [`encoding_rs`] encoding. Unrecognized
    /// codepages fall back to Windows-1252: a single-byte codepage that
    /// cannot be mapped has no better legacy-compatible substitute.
    fn encoding(self) -> &'static Encoding {
        match self.0 {
            1250 => encoding_rs::WINDOWS_1250,
            1251 => encoding_rs::WINDOWS_1251,
            1252 => encoding_rs::WINDOWS_1252,
            1253 => encoding_rs::WINDOWS_1253,
            1254 => encoding_rs::WINDOWS_1254,
            1255 => encoding_rs::WINDOWS_1255,
            1256 => encoding_rs::WINDOWS_1256,
            1257 => encoding_rs::WINDOWS_1257,
            1258 => encoding_rs::WINDOWS_1258,
            874 => encoding_rs::WINDOWS_874,
            _ => encoding_rs::WINDOWS_1252,
        }
    }
}

impl Default for Codepage {
    fn default() -> Self {
        Self::WINDOWS_1252
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_length_classification() {
        assert!(PropertyValue::Integer16(0).is_fixed_length());
        assert!(PropertyValue::Integer32(0).is_fixed_length());
        assert!(PropertyValue::Boolean(true).is_fixed_length());
        assert!(PropertyValue::Integer64(0).is_fixed_length());
        assert!(PropertyValue::SysTime(OffsetDateTime::UNIX_EPOCH).is_fixed_length());
        assert!(!PropertyValue::String8(String::new()).is_fixed_length());
        assert!(!PropertyValue::Unicode(String::new()).is_fixed_length());
        assert!(!PropertyValue::Binary(Vec::new()).is_fixed_length());
    }

    #[test]
    fn type_codes_match_mapi() {
        assert_eq!(PropertyValue::Integer16(0).type_code(), 0x0002);
        assert_eq!(PropertyValue::Integer32(0).type_code(), 0x0003);
        assert_eq!(PropertyValue::Boolean(false).type_code(), 0x000B);
        assert_eq!(PropertyValue::Integer64(0).type_code(), 0x0014);
        assert_eq!(
            PropertyValue::SysTime(OffsetDateTime::UNIX_EPOCH).type_code(),
            0x0040
        );
        assert_eq!(PropertyValue::String8(String::new()).type_code(), 0x001E);
        assert_eq!(PropertyValue::Unicode(String::new()).type_code(), 0x001F);
        assert_eq!(PropertyValue::Binary(Vec::new()).type_code(), 0x0102);
        assert_eq!(PropertyValue::Unsupported(0x0005).type_code(), 0x0005);
    }

    #[test]
    fn unicode_ends_with_double_nul() {
        let bytes = PropertyValue::Unicode("Hi".into())
            .encode(Codepage::default(), true)
            .unwrap();
        assert_eq!(bytes, b"H\0i\0\0\0".to_vec());
    }

    #[test]
    fn string8_ends_with_single_nul() {
        let bytes = PropertyValue::String8("Hi".into())
            .encode(Codepage::default(), true)
            .unwrap();
        assert_eq!(bytes, b"Hi\0".to_vec());
    }

    #[test]
    fn string8_lossy_replaces_with_question_mark() {
        let bytes = PropertyValue::String8("café \u{4e2d}".into())
            .encode(Codepage::default(), false)
            .unwrap();
        assert_eq!(bytes, b"caf\xe9 ?\0".to_vec());
    }

    #[test]
    fn string8_strict_rejects_unmappable() {
        let err = PropertyValue::String8("\u{4e2d}".into())
            .encode(Codepage::default(), true)
            .unwrap_err();
        assert!(matches!(err, MsgError::EncodingError(_)));
    }

    #[test]
    fn unsupported_type_never_encodes() {
        let err = PropertyValue::Unsupported(0x0005)
            .encode(Codepage::default(), true)
            .unwrap_err();
        assert!(matches!(err, MsgError::UnsupportedType(_)));
    }

    #[test]
    fn filetime_unix_epoch_matches_spec() {
        let bytes = PropertyValue::SysTime(OffsetDateTime::UNIX_EPOCH)
            .encode(Codepage::default(), true)
            .unwrap();
        assert_eq!(bytes, vec![0x00, 0x80, 0x3E, 0xD5, 0xDE, 0xB1, 0x9D, 0x01]);
    }

    #[test]
    fn filetime_roundtrips_a_concrete_date() {
        let dt = OffsetDateTime::new_utc(
            time::Date::from_calendar_date(1995, time::Month::November, 16).unwrap(),
            time::Time::from_hms(17, 43, 44).unwrap(),
        );
        let bytes = PropertyValue::SysTime(dt)
            .encode(Codepage::default(), true)
            .unwrap();
        assert_eq!(u64::from_le_bytes(bytes.try_into().unwrap()), 0x01BAB44B12F98800);
    }
}
