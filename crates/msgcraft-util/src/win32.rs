//! Win32 structs and fns
#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};
use std::fmt::{self, Debug, Display};
use std::str::FromStr;

/// A Win32 GUID
#[derive(PartialEq, Eq, Clone)]
pub struct GUID {
    data1: u32,
    data2: u16,
    data3: u16,
    data4: [u8; 8],
}

impl GUID {
    /// Create a null (all zeroes) GUID
    pub fn null() -> Self {
        Self {
            data1: 0,
            data2: 0,
            data3: 0,
            data4: [0u8; 8],
        }
    }

    /// Create a GUID from its raw fields
    pub fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Create a GUID from 16 raw little-endian bytes
    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 16 {
            return None;
        }
        let data1 = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let data2 = u16::from_le_bytes(bytes[4..6].try_into().unwrap());
        let data3 = u16::from_le_bytes(bytes[6..8].try_into().unwrap());
        let data4: [u8; 8] = bytes[8..16].try_into().unwrap();
        Some(Self {
            data1,
            data2,
            data3,
            data4,
        })
    }

    /// Serialize the GUID to its 16-byte little-endian wire form
    pub fn to_le_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..4].copy_from_slice(&self.data1.to_le_bytes());
        out[4..6].copy_from_slice(&self.data2.to_le_bytes());
        out[6..8].copy_from_slice(&self.data3.to_le_bytes());
        out[8..16].copy_from_slice(&self.data4);
        out
    }

    /// Check whether the GUID is null
    pub fn is_null(&self) -> bool {
        *self == Self::null()
    }
}

impl Display for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7]
        )
    }
}

#[cfg(feature = "serde")]
impl Serialize for GUID {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl Debug for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self)
    }
}

impl Default for GUID {
    fn default() -> Self {
        Self::null()
    }
}

impl FromStr for GUID {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.as_bytes();
        if s.len() != 36 {
            return Err(());
        }
        if s[8] != b'-' || s[13] != b'-' || s[18] != b'-' || s[23] != b'-' {
            return Err(());
        }
        let le_bytes: [u8; 16] = [
            hex_decode_byte(&s[6..8])?,
            hex_decode_byte(&s[4..6])?,
            hex_decode_byte(&s[2..4])?,
            hex_decode_byte(&s[0..2])?,
            hex_decode_byte(&s[11..13])?,
            hex_decode_byte(&s[9..11])?,
            hex_decode_byte(&s[16..18])?,
            hex_decode_byte(&s[14..16])?,
            hex_decode_byte(&s[19..21])?,
            hex_decode_byte(&s[21..23])?,
            hex_decode_byte(&s[24..26])?,
            hex_decode_byte(&s[26..28])?,
            hex_decode_byte(&s[28..30])?,
            hex_decode_byte(&s[30..32])?,
            hex_decode_byte(&s[32..34])?,
            hex_decode_byte(&s[34..36])?,
        ];
        Self::from_le_bytes(&le_bytes).ok_or(())
    }
}

#[inline]
fn hex_decode_nibble(c: u8) -> Result<u8, ()> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(()),
    }
}

#[inline]
fn hex_decode_byte(s: &[u8]) -> Result<u8, ()> {
    if s.len() != 2 {
        return Err(());
    }
    Ok((hex_decode_nibble(s[0])? << 4) | hex_decode_nibble(s[1])?)
}

/// Windows epoch (1601-01-01T00:00:00Z), expressed as seconds before the Unix epoch.
const FILETIME_UNIX_DIFF_SECS: i128 = 11_644_473_600;

/// Translates a Windows FILETIME to a [datetime](time::OffsetDateTime)
///
/// Returns None if the date is out of range
pub fn filetime_to_datetime(ftime: u64) -> Option<time::OffsetDateTime> {
    let ftime = i128::from(ftime);
    let ftime = ftime.checked_sub(FILETIME_UNIX_DIFF_SECS * 10_000_000)?;
    time::OffsetDateTime::from_unix_timestamp_nanos(ftime * 100).ok()
}

/// Translates a [datetime](time::OffsetDateTime) to a Windows FILETIME
///
/// Returns None if the date predates the Windows epoch (1601-01-01) or would
/// overflow the 64-bit tick count.
pub fn datetime_to_filetime(dt: time::OffsetDateTime) -> Option<u64> {
    let nanos_since_unix = dt.unix_timestamp_nanos();
    let ticks_since_windows_epoch =
        nanos_since_unix / 100 + FILETIME_UNIX_DIFF_SECS * 10_000_000;
    u64::try_from(ticks_since_windows_epoch).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_nibble() {
        assert_eq!(hex_decode_nibble(b'0'), Ok(0));
        assert_eq!(hex_decode_nibble(b'1'), Ok(1));
        assert_eq!(hex_decode_nibble(b'9'), Ok(9));
        assert_eq!(hex_decode_nibble(b'A'), Ok(0xa));
        assert_eq!(hex_decode_nibble(b'F'), Ok(0xf));
        assert_eq!(hex_decode_nibble(b'a'), Ok(0xa));
        assert_eq!(hex_decode_nibble(b'f'), Ok(0xf));
        assert_eq!(hex_decode_nibble(b'q'), Err(()));
    }

    #[test]
    fn test_decode_bytes() {
        assert_eq!(hex_decode_byte(b"aC"), Ok(0xac));
        assert_eq!(hex_decode_byte(b"13"), Ok(0x13));
        assert_eq!(hex_decode_byte(b"-A"), Err(()));
        assert_eq!(hex_decode_byte(b"1234"), Err(()));
    }

    #[test]
    fn test_guid_roundtrip() {
        let guid = GUID::from_le_bytes(&[
            0x53, 0xff, 0x4b, 0x99, 0xf9, 0xdd, 0xad, 0x42, 0xa5, 0x6a, 0xff, 0xea, 0x36, 0x17,
            0xac, 0x16,
        ])
        .unwrap();
        assert_eq!(guid.to_string(), "994bff53-ddf9-42ad-a56a-ffea3617ac16");
        assert_eq!(
            GUID::from_str("994BFF53-ddf9-42AD-a56a-FFEA3617AC16").unwrap(),
            guid
        );
        assert_eq!(guid.to_le_bytes().as_slice(), &[
            0x53, 0xff, 0x4b, 0x99, 0xf9, 0xdd, 0xad, 0x42, 0xa5, 0x6a, 0xff, 0xea, 0x36, 0x17,
            0xac, 0x16,
        ]);
        assert!(!guid.is_null());
        assert!(GUID::null().is_null());
    }

    #[test]
    fn test_filetime_to_datetime() {
        assert_eq!(
            filetime_to_datetime(0x01BAB44B12F98800).unwrap(),
            time::OffsetDateTime::new_utc(
                time::Date::from_calendar_date(1995, time::Month::November, 16).unwrap(),
                time::Time::from_hms(17, 43, 44).unwrap()
            )
        );
    }

    #[test]
    fn test_datetime_to_filetime_roundtrip() {
        let dt = time::OffsetDateTime::new_utc(
            time::Date::from_calendar_date(1995, time::Month::November, 16).unwrap(),
            time::Time::from_hms(17, 43, 44).unwrap(),
        );
        assert_eq!(datetime_to_filetime(dt).unwrap(), 0x01BAB44B12F98800);
    }

    #[test]
    fn test_filetime_unix_epoch() {
        let unix_epoch = time::OffsetDateTime::UNIX_EPOCH;
        let ft = datetime_to_filetime(unix_epoch).unwrap();
        assert_eq!(ft.to_le_bytes(), [0x00, 0x80, 0x3E, 0xD5, 0xDE, 0xB1, 0x9D, 0x01]);
    }
}
