//! SML message structures
//!
//! Every structure is decoded in two steps: the generic TLV tree is read by
//! [`SmlDecoder`], then mapped field by field onto the typed structure. A
//! shape mismatch at any step is a `MalformedMessage`.

use crate::crc::Crc16;
use crate::decoder::SmlDecoder;
use crate::error::{SmlError, SmlResult};
use serde::{Deserialize, Serialize};
use sml_core::{ObisCode, SmlTime, SmlType, SmlValue};

/// Message body tags defined by SML 1.04
pub mod tags {
    pub const OPEN_REQUEST: u32 = 0x0000_0100;
    pub const OPEN_RESPONSE: u32 = 0x0000_0101;
    pub const CLOSE_REQUEST: u32 = 0x0000_0200;
    pub const CLOSE_RESPONSE: u32 = 0x0000_0201;
    pub const GET_PROFILE_PACK_REQUEST: u32 = 0x0000_0300;
    pub const GET_PROFILE_PACK_RESPONSE: u32 = 0x0000_0301;
    pub const GET_PROFILE_LIST_REQUEST: u32 = 0x0000_0400;
    pub const GET_PROFILE_LIST_RESPONSE: u32 = 0x0000_0401;
    pub const GET_PROC_PARAMETER_REQUEST: u32 = 0x0000_0500;
    pub const GET_PROC_PARAMETER_RESPONSE: u32 = 0x0000_0501;
    pub const SET_PROC_PARAMETER_REQUEST: u32 = 0x0000_0600;
    pub const GET_LIST_REQUEST: u32 = 0x0000_0700;
    pub const GET_LIST_RESPONSE: u32 = 0x0000_0701;
    pub const GET_COSEM_REQUEST: u32 = 0x0000_0800;
    pub const GET_COSEM_RESPONSE: u32 = 0x0000_0801;
    pub const SET_COSEM_REQUEST: u32 = 0x0000_0900;
    pub const SET_COSEM_RESPONSE: u32 = 0x0000_0901;
    pub const ACTION_COSEM_REQUEST: u32 = 0x0000_0A00;
    pub const ACTION_COSEM_RESPONSE: u32 = 0x0000_0A01;
    pub const ATTENTION_RESPONSE: u32 = 0x0000_FF01;

    /// Tags that are valid on the wire but kept as raw values
    pub(crate) const UNSUPPORTED: [u32; 13] = [
        GET_PROFILE_PACK_REQUEST,
        GET_PROFILE_PACK_RESPONSE,
        GET_PROFILE_LIST_REQUEST,
        GET_PROFILE_LIST_RESPONSE,
        GET_PROC_PARAMETER_REQUEST,
        GET_PROC_PARAMETER_RESPONSE,
        SET_PROC_PARAMETER_REQUEST,
        GET_COSEM_REQUEST,
        GET_COSEM_RESPONSE,
        SET_COSEM_REQUEST,
        SET_COSEM_RESPONSE,
        ACTION_COSEM_REQUEST,
        ACTION_COSEM_RESPONSE,
    ];
}

/// Decoder behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Fail the decode when a message CRC does not match its bytes
    ///
    /// Off by default: a number of meters in the field transmit wrong
    /// message CRCs while the transport checksum is correct.
    pub verify_message_crc: bool,
}

/// One SML message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmlMessage {
    pub transaction_id: Vec<u8>,
    pub group_no: u8,
    pub abort_on_error: u8,
    pub body: SmlMessageBody,
    /// CRC as transmitted; recomputed by the encoder
    pub crc: u16,
}

impl SmlMessage {
    /// Create a message; the CRC is filled in when encoding
    pub fn new(transaction_id: Vec<u8>, group_no: u8, abort_on_error: u8, body: SmlMessageBody) -> Self {
        Self {
            transaction_id,
            group_no,
            abort_on_error,
            body,
            crc: 0,
        }
    }

    /// Decode one message at the decoder's position
    pub fn decode(decoder: &mut SmlDecoder<'_>, options: &DecodeOptions) -> SmlResult<Self> {
        let start = decoder.position();

        let tl = decoder.decode_type_length()?;
        if tl.sml_type != SmlType::List || tl.length != 6 {
            return Err(SmlError::MalformedMessage(format!(
                "Message must be a list of 6, found {} of {}",
                tl.sml_type, tl.length
            )));
        }

        let transaction_id = decoder.decode_value()?.as_bytes()?.to_vec();
        let group_no = decoder.decode_value()?.as_u8()?;
        let abort_on_error = decoder.decode_value()?.as_u8()?;
        let body = SmlMessageBody::from_value(&decoder.decode_value()?)?;

        let computed = Crc16::checksum(decoder.consumed_since(start));
        let crc = decoder.decode_value()?.as_u16()?;
        decoder.decode_end_of_message()?;

        if computed != crc {
            if options.verify_message_crc {
                return Err(SmlError::MalformedMessage(format!(
                    "Message CRC mismatch: transmitted 0x{:04X}, computed 0x{:04X}",
                    crc, computed
                )));
            }
            log::warn!(
                "SML message CRC mismatch ignored: transmitted 0x{:04X}, computed 0x{:04X}",
                crc,
                computed
            );
        }

        Ok(Self {
            transaction_id,
            group_no,
            abort_on_error,
            body,
            crc,
        })
    }
}

/// Message body choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SmlMessageBody {
    OpenRequest(OpenRequest),
    OpenResponse(OpenResponse),
    CloseRequest(CloseRequest),
    CloseResponse(CloseResponse),
    GetListRequest(GetListRequest),
    GetListResponse(GetListResponse),
    AttentionResponse(AttentionResponse),
    /// A body defined by SML 1.04 that is not mapped onto a structure
    Unsupported { tag: u32, value: SmlValue },
}

impl SmlMessageBody {
    /// Body tag
    pub fn tag(&self) -> u32 {
        match self {
            SmlMessageBody::OpenRequest(_) => tags::OPEN_REQUEST,
            SmlMessageBody::OpenResponse(_) => tags::OPEN_RESPONSE,
            SmlMessageBody::CloseRequest(_) => tags::CLOSE_REQUEST,
            SmlMessageBody::CloseResponse(_) => tags::CLOSE_RESPONSE,
            SmlMessageBody::GetListRequest(_) => tags::GET_LIST_REQUEST,
            SmlMessageBody::GetListResponse(_) => tags::GET_LIST_RESPONSE,
            SmlMessageBody::AttentionResponse(_) => tags::ATTENTION_RESPONSE,
            SmlMessageBody::Unsupported { tag, .. } => *tag,
        }
    }

    /// Map a `[tag, choice]` list onto a body
    pub fn from_value(value: &SmlValue) -> SmlResult<Self> {
        let items = value.as_list_of(2)?;
        let tag = items[0].as_u32()?;
        let choice = &items[1];

        let body = match tag {
            tags::OPEN_REQUEST => SmlMessageBody::OpenRequest(OpenRequest::from_value(choice)?),
            tags::OPEN_RESPONSE => SmlMessageBody::OpenResponse(OpenResponse::from_value(choice)?),
            tags::CLOSE_REQUEST => SmlMessageBody::CloseRequest(CloseRequest::from_value(choice)?),
            tags::CLOSE_RESPONSE => {
                SmlMessageBody::CloseResponse(CloseResponse::from_value(choice)?)
            }
            tags::GET_LIST_REQUEST => {
                SmlMessageBody::GetListRequest(GetListRequest::from_value(choice)?)
            }
            tags::GET_LIST_RESPONSE => {
                SmlMessageBody::GetListResponse(GetListResponse::from_value(choice)?)
            }
            tags::ATTENTION_RESPONSE => {
                SmlMessageBody::AttentionResponse(AttentionResponse::from_value(choice)?)
            }
            t if tags::UNSUPPORTED.contains(&t) => SmlMessageBody::Unsupported {
                tag: t,
                value: choice.clone(),
            },
            other => {
                return Err(SmlError::MalformedMessage(format!(
                    "Unknown message body tag: 0x{:08X}",
                    other
                )));
            }
        };
        Ok(body)
    }

    /// Encode into a `[tag, choice]` list
    pub fn to_value(&self) -> SmlValue {
        let choice = match self {
            SmlMessageBody::OpenRequest(b) => b.to_value(),
            SmlMessageBody::OpenResponse(b) => b.to_value(),
            SmlMessageBody::CloseRequest(b) => b.to_value(),
            SmlMessageBody::CloseResponse(b) => b.to_value(),
            SmlMessageBody::GetListRequest(b) => b.to_value(),
            SmlMessageBody::GetListResponse(b) => b.to_value(),
            SmlMessageBody::AttentionResponse(b) => b.to_value(),
            SmlMessageBody::Unsupported { value, .. } => value.clone(),
        };
        SmlValue::List(vec![narrowest_unsigned(u64::from(self.tag())), choice])
    }
}

/// SML_PublicOpen.Req
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenRequest {
    pub codepage: Option<Vec<u8>>,
    pub client_id: Vec<u8>,
    pub req_file_id: Vec<u8>,
    pub server_id: Option<Vec<u8>>,
    pub username: Option<Vec<u8>>,
    pub password: Option<Vec<u8>>,
    pub sml_version: Option<u8>,
}

impl OpenRequest {
    fn from_value(value: &SmlValue) -> SmlResult<Self> {
        let f = value.as_list_of(7)?;
        Ok(Self {
            codepage: optional_bytes(&f[0])?,
            client_id: f[1].as_bytes()?.to_vec(),
            req_file_id: f[2].as_bytes()?.to_vec(),
            server_id: optional_bytes(&f[3])?,
            username: optional_bytes(&f[4])?,
            password: optional_bytes(&f[5])?,
            sml_version: optional(&f[6], SmlValue::as_u8)?,
        })
    }

    fn to_value(&self) -> SmlValue {
        SmlValue::List(vec![
            bytes_or_absent(&self.codepage),
            SmlValue::from(self.client_id.clone()),
            SmlValue::from(self.req_file_id.clone()),
            bytes_or_absent(&self.server_id),
            bytes_or_absent(&self.username),
            bytes_or_absent(&self.password),
            value_or_absent(self.sml_version.map(SmlValue::Unsigned8)),
        ])
    }
}

/// SML_PublicOpen.Res
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenResponse {
    pub codepage: Option<Vec<u8>>,
    pub client_id: Option<Vec<u8>>,
    pub req_file_id: Vec<u8>,
    pub server_id: Vec<u8>,
    pub ref_time: Option<SmlTime>,
    pub sml_version: Option<u8>,
}

impl OpenResponse {
    fn from_value(value: &SmlValue) -> SmlResult<Self> {
        let f = value.as_list_of(6)?;
        Ok(Self {
            codepage: optional_bytes(&f[0])?,
            client_id: optional_bytes(&f[1])?,
            req_file_id: f[2].as_bytes()?.to_vec(),
            server_id: f[3].as_bytes()?.to_vec(),
            ref_time: optional(&f[4], SmlTime::from_value)?,
            sml_version: optional(&f[5], SmlValue::as_u8)?,
        })
    }

    fn to_value(&self) -> SmlValue {
        SmlValue::List(vec![
            bytes_or_absent(&self.codepage),
            bytes_or_absent(&self.client_id),
            SmlValue::from(self.req_file_id.clone()),
            SmlValue::from(self.server_id.clone()),
            value_or_absent(self.ref_time.map(|t| t.to_value())),
            value_or_absent(self.sml_version.map(SmlValue::Unsigned8)),
        ])
    }
}

/// SML_PublicClose.Req
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CloseRequest {
    pub global_signature: Option<Vec<u8>>,
}

impl CloseRequest {
    fn from_value(value: &SmlValue) -> SmlResult<Self> {
        let f = value.as_list_of(1)?;
        Ok(Self {
            global_signature: optional_bytes(&f[0])?,
        })
    }

    fn to_value(&self) -> SmlValue {
        SmlValue::List(vec![bytes_or_absent(&self.global_signature)])
    }
}

/// SML_PublicClose.Res
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CloseResponse {
    pub global_signature: Option<Vec<u8>>,
}

impl CloseResponse {
    fn from_value(value: &SmlValue) -> SmlResult<Self> {
        let f = value.as_list_of(1)?;
        Ok(Self {
            global_signature: optional_bytes(&f[0])?,
        })
    }

    fn to_value(&self) -> SmlValue {
        SmlValue::List(vec![bytes_or_absent(&self.global_signature)])
    }
}

/// SML_GetList.Req
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetListRequest {
    pub client_id: Vec<u8>,
    pub server_id: Option<Vec<u8>>,
    pub username: Option<Vec<u8>>,
    pub password: Option<Vec<u8>>,
    pub list_name: Option<Vec<u8>>,
}

impl GetListRequest {
    fn from_value(value: &SmlValue) -> SmlResult<Self> {
        let f = value.as_list_of(5)?;
        Ok(Self {
            client_id: f[0].as_bytes()?.to_vec(),
            server_id: optional_bytes(&f[1])?,
            username: optional_bytes(&f[2])?,
            password: optional_bytes(&f[3])?,
            list_name: optional_bytes(&f[4])?,
        })
    }

    fn to_value(&self) -> SmlValue {
        SmlValue::List(vec![
            SmlValue::from(self.client_id.clone()),
            bytes_or_absent(&self.server_id),
            bytes_or_absent(&self.username),
            bytes_or_absent(&self.password),
            bytes_or_absent(&self.list_name),
        ])
    }
}

/// SML_GetList.Res, the message carrying the meter readings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetListResponse {
    pub client_id: Option<Vec<u8>>,
    pub server_id: Vec<u8>,
    pub list_name: Option<Vec<u8>>,
    pub act_sensor_time: Option<SmlTime>,
    pub val_list: Vec<SmlListEntry>,
    pub list_signature: Option<Vec<u8>>,
    pub act_gateway_time: Option<SmlTime>,
}

impl GetListResponse {
    fn from_value(value: &SmlValue) -> SmlResult<Self> {
        let f = value.as_list_of(7)?;
        let val_list = f[4]
            .as_list()?
            .iter()
            .map(SmlListEntry::from_value)
            .collect::<SmlResult<Vec<_>>>()?;

        Ok(Self {
            client_id: optional_bytes(&f[0])?,
            server_id: f[1].as_bytes()?.to_vec(),
            list_name: optional_bytes(&f[2])?,
            act_sensor_time: optional(&f[3], SmlTime::from_value)?,
            val_list,
            list_signature: optional_bytes(&f[5])?,
            act_gateway_time: optional(&f[6], SmlTime::from_value)?,
        })
    }

    fn to_value(&self) -> SmlValue {
        SmlValue::List(vec![
            bytes_or_absent(&self.client_id),
            SmlValue::from(self.server_id.clone()),
            bytes_or_absent(&self.list_name),
            value_or_absent(self.act_sensor_time.map(|t| t.to_value())),
            SmlValue::List(self.val_list.iter().map(SmlListEntry::to_value).collect()),
            bytes_or_absent(&self.list_signature),
            value_or_absent(self.act_gateway_time.map(|t| t.to_value())),
        ])
    }
}

/// SML_ListEntry: one reading inside a GetList response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmlListEntry {
    pub obj_name: Vec<u8>,
    pub status: Option<u64>,
    pub val_time: Option<SmlTime>,
    pub unit: Option<u8>,
    pub scaler: Option<i8>,
    pub value: SmlValue,
    pub value_signature: Option<Vec<u8>>,
}

impl SmlListEntry {
    /// Entry with only a name and a value
    pub fn new(obj_name: Vec<u8>, value: SmlValue) -> Self {
        Self {
            obj_name,
            status: None,
            val_time: None,
            unit: None,
            scaler: None,
            value,
            value_signature: None,
        }
    }

    /// The entry name as an OBIS code, if it is 6 bytes long
    pub fn obis_code(&self) -> Option<ObisCode> {
        ObisCode::from_bytes(&self.obj_name)
    }

    fn from_value(value: &SmlValue) -> SmlResult<Self> {
        let f = value.as_list_of(7)?;
        Ok(Self {
            obj_name: f[0].as_bytes()?.to_vec(),
            status: optional(&f[1], SmlValue::as_unsigned)?,
            val_time: optional(&f[2], SmlTime::from_value)?,
            unit: optional(&f[3], SmlValue::as_u8)?,
            scaler: optional(&f[4], SmlValue::as_i8)?,
            value: f[5].clone(),
            value_signature: optional_bytes(&f[6])?,
        })
    }

    fn to_value(&self) -> SmlValue {
        SmlValue::List(vec![
            SmlValue::from(self.obj_name.clone()),
            value_or_absent(self.status.map(narrowest_unsigned)),
            value_or_absent(self.val_time.map(|t| t.to_value())),
            value_or_absent(self.unit.map(SmlValue::Unsigned8)),
            value_or_absent(self.scaler.map(SmlValue::Integer8)),
            self.value.clone(),
            bytes_or_absent(&self.value_signature),
        ])
    }
}

/// SML_Attention.Res
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttentionResponse {
    pub server_id: Vec<u8>,
    pub attention_no: Vec<u8>,
    pub attention_msg: Option<Vec<u8>>,
    pub attention_details: Option<SmlValue>,
}

impl AttentionResponse {
    fn from_value(value: &SmlValue) -> SmlResult<Self> {
        let f = value.as_list_of(4)?;
        Ok(Self {
            server_id: f[0].as_bytes()?.to_vec(),
            attention_no: f[1].as_bytes()?.to_vec(),
            attention_msg: optional_bytes(&f[2])?,
            attention_details: optional(&f[3], |v| Ok(v.clone()))?,
        })
    }

    fn to_value(&self) -> SmlValue {
        SmlValue::List(vec![
            SmlValue::from(self.server_id.clone()),
            SmlValue::from(self.attention_no.clone()),
            bytes_or_absent(&self.attention_msg),
            value_or_absent(self.attention_details.clone()),
        ])
    }
}

fn optional<T>(value: &SmlValue, map: impl FnOnce(&SmlValue) -> SmlResult<T>) -> SmlResult<Option<T>> {
    if value.is_absent() {
        Ok(None)
    } else {
        map(value).map(Some)
    }
}

fn optional_bytes(value: &SmlValue) -> SmlResult<Option<Vec<u8>>> {
    optional(value, |v| v.as_bytes().map(<[u8]>::to_vec))
}

fn bytes_or_absent(bytes: &Option<Vec<u8>>) -> SmlValue {
    match bytes {
        Some(bytes) => SmlValue::from(bytes.clone()),
        None => SmlValue::absent(),
    }
}

fn value_or_absent(value: Option<SmlValue>) -> SmlValue {
    value.unwrap_or_else(SmlValue::absent)
}

fn narrowest_unsigned(value: u64) -> SmlValue {
    if let Ok(v) = u8::try_from(value) {
        SmlValue::Unsigned8(v)
    } else if let Ok(v) = u16::try_from(value) {
        SmlValue::Unsigned16(v)
    } else if let Ok(v) = u32::try_from(value) {
        SmlValue::Unsigned32(v)
    } else {
        SmlValue::Unsigned64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(obis: [u8; 6], unit: u8, scaler: i8, value: SmlValue) -> SmlListEntry {
        SmlListEntry {
            obj_name: obis.to_vec(),
            status: Some(0x0001_0182),
            val_time: None,
            unit: Some(unit),
            scaler: Some(scaler),
            value,
            value_signature: None,
        }
    }

    #[test]
    fn test_list_entry_value_mapping() {
        let e = entry([1, 0, 1, 8, 0, 255], 30, -1, SmlValue::Unsigned32(123_456));
        let decoded = SmlListEntry::from_value(&e.to_value()).unwrap();
        assert_eq!(decoded, e);
        assert_eq!(decoded.obis_code(), Some(ObisCode::new(1, 0, 1, 8, 0, 255)));
    }

    #[test]
    fn test_get_list_response_mapping() {
        let body = SmlMessageBody::GetListResponse(GetListResponse {
            client_id: None,
            server_id: vec![0x0A, 0x01, 0x45, 0x4D, 0x48],
            list_name: Some(vec![1, 0, 98, 11, 0, 255]),
            act_sensor_time: Some(SmlTime::SecIndex(1_234_567)),
            val_list: vec![
                entry([1, 0, 1, 8, 0, 255], 30, -1, SmlValue::Unsigned64(987_654_321)),
                entry([1, 0, 16, 7, 0, 255], 27, 0, SmlValue::Integer32(-420)),
            ],
            list_signature: None,
            act_gateway_time: None,
        });
        let decoded = SmlMessageBody::from_value(&body.to_value()).unwrap();
        assert_eq!(decoded, body);
        assert_eq!(decoded.tag(), tags::GET_LIST_RESPONSE);
    }

    #[test]
    fn test_unsupported_body_is_preserved() {
        let raw = SmlValue::List(vec![
            SmlValue::Unsigned16(0x0401),
            SmlValue::List(vec![SmlValue::Unsigned8(1)]),
        ]);
        let body = SmlMessageBody::from_value(&raw).unwrap();
        assert!(matches!(
            body,
            SmlMessageBody::Unsupported { tag: tags::GET_PROFILE_LIST_RESPONSE, .. }
        ));
        assert_eq!(body.to_value(), raw);
    }

    #[test]
    fn test_unknown_body_tag_is_malformed() {
        let raw = SmlValue::List(vec![
            SmlValue::Unsigned32(0x0000_4242),
            SmlValue::List(vec![]),
        ]);
        assert!(matches!(
            SmlMessageBody::from_value(&raw),
            Err(SmlError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_wrong_field_type_is_malformed() {
        // server id must be an octet string
        let raw = SmlValue::List(vec![
            SmlValue::absent(),
            SmlValue::absent(),
            SmlValue::from(vec![0x01]),
            SmlValue::Unsigned8(5),
            SmlValue::absent(),
            SmlValue::absent(),
        ]);
        assert!(OpenResponse::from_value(&raw).is_err());
    }

    #[test]
    fn test_narrowest_unsigned() {
        assert_eq!(narrowest_unsigned(5), SmlValue::Unsigned8(5));
        assert_eq!(narrowest_unsigned(0x1_0000), SmlValue::Unsigned32(0x1_0000));
        assert_eq!(narrowest_unsigned(u64::MAX), SmlValue::Unsigned64(u64::MAX));
    }
}
