//! SML time values

use crate::error::{SmlError, SmlResult};
use crate::value::SmlValue;
use serde::{Deserialize, Serialize};

const TAG_SEC_INDEX: u8 = 0x01;
const TAG_TIMESTAMP: u8 = 0x02;
const TAG_LOCAL_TIMESTAMP: u8 = 0x03;

/// SML_Time choice
///
/// Encoded as a list of two elements: a choice tag (Unsigned8) and the
/// value. Some meters send a bare Unsigned32 instead of the list; that form
/// is read as a seconds index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmlTime {
    /// Seconds since an arbitrary device-specific epoch
    SecIndex(u32),
    /// Unix timestamp (UTC)
    Timestamp(u32),
    /// Unix timestamp with local and season offsets in minutes
    LocalTimestamp {
        timestamp: u32,
        local_offset: i16,
        season_offset: i16,
    },
}

impl SmlTime {
    /// Decode from a generic value
    pub fn from_value(value: &SmlValue) -> SmlResult<Self> {
        if let SmlValue::Unsigned32(sec) = value {
            return Ok(SmlTime::SecIndex(*sec));
        }

        let items = value.as_list_of(2)?;
        let tag = items[0].as_u8()?;
        match tag {
            TAG_SEC_INDEX => Ok(SmlTime::SecIndex(items[1].as_u32()?)),
            TAG_TIMESTAMP => Ok(SmlTime::Timestamp(items[1].as_u32()?)),
            TAG_LOCAL_TIMESTAMP => {
                let local = items[1].as_list_of(3)?;
                Ok(SmlTime::LocalTimestamp {
                    timestamp: local[0].as_u32()?,
                    local_offset: to_i16(&local[1])?,
                    season_offset: to_i16(&local[2])?,
                })
            }
            other => Err(SmlError::MalformedMessage(format!(
                "Unknown SML_Time choice: 0x{:02X}",
                other
            ))),
        }
    }

    /// Encode into a generic value
    pub fn to_value(&self) -> SmlValue {
        match *self {
            SmlTime::SecIndex(sec) => {
                SmlValue::List(vec![SmlValue::Unsigned8(TAG_SEC_INDEX), SmlValue::Unsigned32(sec)])
            }
            SmlTime::Timestamp(ts) => {
                SmlValue::List(vec![SmlValue::Unsigned8(TAG_TIMESTAMP), SmlValue::Unsigned32(ts)])
            }
            SmlTime::LocalTimestamp {
                timestamp,
                local_offset,
                season_offset,
            } => SmlValue::List(vec![
                SmlValue::Unsigned8(TAG_LOCAL_TIMESTAMP),
                SmlValue::List(vec![
                    SmlValue::Unsigned32(timestamp),
                    SmlValue::Integer16(local_offset),
                    SmlValue::Integer16(season_offset),
                ]),
            ]),
        }
    }
}

fn to_i16(value: &SmlValue) -> SmlResult<i16> {
    let v = value.as_integer()?;
    i16::try_from(v).map_err(|_| SmlError::MalformedMessage(format!("Offset {} out of range", v)))
}
