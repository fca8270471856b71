//! SML file: the ordered messages of one transmission

use crate::decoder::SmlDecoder;
use crate::error::{SmlError, SmlResult};
use crate::message::{DecodeOptions, GetListResponse, SmlMessage, SmlMessageBody};
use serde::{Deserialize, Serialize};

/// All messages decoded from one raw frame, in transmission order
///
/// Consumers locate the open, payload and close messages by position, so
/// the order is never changed after decoding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SmlFile {
    messages: Vec<SmlMessage>,
}

impl SmlFile {
    /// Create a file from already built messages
    pub fn new(messages: Vec<SmlMessage>) -> Self {
        Self { messages }
    }

    /// Decode every message of a raw frame
    ///
    /// All or nothing: the first failing message aborts the whole decode,
    /// and a frame without any message is malformed. A frame cut exactly
    /// between two messages decodes as the shorter file; completeness of a
    /// transmission is guaranteed by its end marker and transport CRC.
    pub fn decode(frame: &[u8], options: &DecodeOptions) -> SmlResult<Self> {
        if frame.is_empty() {
            return Err(SmlError::MalformedMessage("Empty frame".to_string()));
        }

        let mut decoder = SmlDecoder::new(frame);
        let mut messages = Vec::new();
        while !decoder.is_empty() {
            let offset = decoder.position();
            let message = SmlMessage::decode(&mut decoder, options).map_err(|e| match e {
                SmlError::MalformedMessage(msg) => SmlError::MalformedMessage(format!(
                    "message {} at offset {}: {}",
                    messages.len(),
                    offset,
                    msg
                )),
                other => other,
            })?;
            messages.push(message);
        }

        log::debug!("Decoded SML file with {} message(s)", messages.len());
        Ok(Self { messages })
    }

    /// Messages in transmission order
    pub fn messages(&self) -> &[SmlMessage] {
        &self.messages
    }

    /// Take ownership of the messages
    pub fn into_messages(self) -> Vec<SmlMessage> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SmlMessage> {
        self.messages.iter()
    }

    /// All GetList responses of the file, in order
    pub fn get_list_responses(&self) -> impl Iterator<Item = &GetListResponse> {
        self.messages.iter().filter_map(|m| match &m.body {
            SmlMessageBody::GetListResponse(res) => Some(res),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a SmlFile {
    type Item = &'a SmlMessage;
    type IntoIter = std::slice::Iter<'a, SmlMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{SmlEncoder, encode_file};
    use crate::message::{CloseResponse, GetListResponse, OpenResponse, SmlListEntry};
    use sml_core::{SmlTime, SmlValue};

    const STRICT: DecodeOptions = DecodeOptions {
        verify_message_crc: true,
    };

    // close response as a meter transmits it, CRC included
    const CLOSE_RESPONSE: [u8; 20] = [
        0x76, 0x05, 0x00, 0x00, 0x00, 0x03, 0x62, 0x00, 0x62, 0x00, 0x72, 0x63, 0x02, 0x01, 0x71,
        0x01, 0x63, 0xA8, 0xE6, 0x00,
    ];

    fn sample_file() -> SmlFile {
        let open = SmlMessage::new(
            vec![0x00, 0x00, 0x00, 0x01],
            0,
            0,
            SmlMessageBody::OpenResponse(OpenResponse {
                codepage: None,
                client_id: None,
                req_file_id: vec![0x00, 0x41, 0x42],
                server_id: vec![0x0A, 0x01, 0x49, 0x53, 0x4B],
                ref_time: None,
                sml_version: None,
            }),
        );
        let list = SmlMessage::new(
            vec![0x00, 0x00, 0x00, 0x02],
            0,
            0,
            SmlMessageBody::GetListResponse(GetListResponse {
                client_id: None,
                server_id: vec![0x0A, 0x01, 0x49, 0x53, 0x4B],
                list_name: None,
                act_sensor_time: Some(SmlTime::SecIndex(42)),
                val_list: vec![
                    SmlListEntry::new(vec![1, 0, 1, 8, 0, 255], SmlValue::Unsigned64(1)),
                    SmlListEntry::new(vec![1, 0, 2, 8, 0, 255], SmlValue::Integer16(-2)),
                    SmlListEntry::new(vec![1, 0, 16, 7, 0, 255], SmlValue::Integer32(3)),
                ],
                list_signature: None,
                act_gateway_time: None,
            }),
        );
        let close = SmlMessage::new(
            vec![0x00, 0x00, 0x00, 0x03],
            0,
            0,
            SmlMessageBody::CloseResponse(CloseResponse::default()),
        );
        SmlFile::new(vec![open, list, close])
    }

    #[test]
    fn test_decode_transmitted_close_response() {
        let file = SmlFile::decode(&CLOSE_RESPONSE, &STRICT).unwrap();
        assert_eq!(file.len(), 1);
        let message = &file.messages()[0];
        assert_eq!(message.transaction_id, vec![0x00, 0x00, 0x00, 0x03]);
        assert_eq!(message.crc, 0xA8E6);
        assert_eq!(
            message.body,
            SmlMessageBody::CloseResponse(CloseResponse {
                global_signature: None
            })
        );
    }

    #[test]
    fn test_encoder_matches_transmitted_bytes() {
        let file = SmlFile::decode(&CLOSE_RESPONSE, &STRICT).unwrap();
        assert_eq!(encode_file(&file), CLOSE_RESPONSE.to_vec());
    }

    #[test]
    fn test_round_trip_preserves_order_and_values() {
        let original = sample_file();
        let bytes = encode_file(&original);
        let decoded = SmlFile::decode(&bytes, &STRICT).unwrap();

        assert_eq!(decoded.len(), original.len());
        for (got, want) in decoded.iter().zip(original.iter()) {
            assert_eq!(got.transaction_id, want.transaction_id);
            assert_eq!(got.group_no, want.group_no);
            assert_eq!(got.abort_on_error, want.abort_on_error);
            assert_eq!(got.body, want.body);
        }

        let readings: Vec<_> = decoded
            .get_list_responses()
            .flat_map(|res| res.val_list.iter().map(|e| e.value.clone()))
            .collect();
        assert_eq!(
            readings,
            vec![
                SmlValue::Unsigned64(1),
                SmlValue::Integer16(-2),
                SmlValue::Integer32(3)
            ]
        );
    }

    #[test]
    fn test_message_crc_mismatch() {
        let mut bytes = CLOSE_RESPONSE;
        bytes[18] ^= 0xFF;

        assert!(matches!(
            SmlFile::decode(&bytes, &STRICT),
            Err(SmlError::MalformedMessage(_))
        ));
        // tolerated unless verification is requested
        let file = SmlFile::decode(&bytes, &DecodeOptions::default()).unwrap();
        assert_eq!(file.len(), 1);
    }

    #[test]
    fn test_empty_frame_is_malformed() {
        assert!(matches!(
            SmlFile::decode(&[], &DecodeOptions::default()),
            Err(SmlError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_truncation_at_every_offset() {
        let file = sample_file();
        let bytes = encode_file(&file);

        // offsets where a complete message ends
        let mut boundaries = Vec::new();
        let mut end = 0;
        for message in &file {
            let mut encoder = SmlEncoder::new();
            encoder.encode_message(message);
            end += encoder.as_bytes().len();
            boundaries.push(end);
        }

        for cut in 1..bytes.len() {
            let result = SmlFile::decode(&bytes[..cut], &DecodeOptions::default());
            match boundaries.iter().position(|&b| b == cut) {
                // a shorter but complete sequence of messages
                Some(i) => assert_eq!(result.unwrap().len(), i + 1),
                None => assert!(
                    matches!(result, Err(SmlError::MalformedMessage(_))),
                    "truncation at {} of {} did not fail as malformed",
                    cut,
                    bytes.len()
                ),
            }
        }
    }

    #[test]
    fn test_trailing_garbage_aborts_whole_file() {
        let mut bytes = encode_file(&sample_file());
        bytes.push(0x62);
        assert!(SmlFile::decode(&bytes, &DecodeOptions::default()).is_err());
    }
}
