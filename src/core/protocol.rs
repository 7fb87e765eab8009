//! Wire codec for the periodicity service socket
//!
//! Incoming frames are binary and little-endian:
//!
//! ```text
//! u32 message_type
//! u32 request_id            (SUPPLEMENT_DATASET only)
//! u32 metadata_length
//! [u8; metadata_length]     UTF-8 JSON metadata
//! f32 arrays                histograms, entropies, vectorstrengths, periods
//! f32 arrays                xs, ys, values, binning      (full loads only)
//! u32 array                 timestamps                   (full loads only)
//! ```
//!
//! Outgoing control messages are JSON text frames, the upload is a single
//! binary frame. Decoding never touches any model state.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

/// Leading u32 tag of every binary frame
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    BeginDataset = 0,
    SupplementDataset = 1,
    UploadDataset = 2,
    ReplaceDataset = 3,
    Error = 100,
}

impl MessageType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::BeginDataset),
            1 => Some(Self::SupplementDataset),
            2 => Some(Self::UploadDataset),
            3 => Some(Self::ReplaceDataset),
            100 => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("unexpected message type: {0}")]
    UnexpectedMessageType(u32),

    #[error("truncated message: needed {needed} bytes, got {available}")]
    TruncatedMessage { needed: usize, available: usize },

    #[error("message has {0} trailing bytes after the declared arrays")]
    InconsistentLength(usize),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("service reported an error")]
    ServiceError,

    #[error("message is not a binary frame")]
    NotBinary,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Statistic the histograms currently represent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayAttribute {
    #[default]
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "average value")]
    AverageValue,
    #[serde(rename = "variance")]
    Variance,
}

impl DisplayAttribute {
    pub const ALL: &'static [DisplayAttribute] = &[
        DisplayAttribute::Count,
        DisplayAttribute::AverageValue,
        DisplayAttribute::Variance,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DisplayAttribute::Count => "count",
            DisplayAttribute::AverageValue => "average value",
            DisplayAttribute::Variance => "variance",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.label() == text.trim())
    }
}

/// JSON text frames sent to the service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "request additional data")]
    RequestAdditionalData {
        periods: Vec<f64>,
        #[serde(rename = "requestId")]
        request_id: u32,
    },
    #[serde(rename = "set display attribute")]
    SetDisplayAttribute { attribute: DisplayAttribute },
}

impl ControlMessage {
    pub fn to_json(&self) -> String {
        // Serializing a tagged enum of plain numbers and strings cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Metadata of BEGIN_DATASET and REPLACE_DATASET frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullMetadata {
    pub num_bins: u32,
    pub period_count: u32,
    pub data_count: u32,
    pub temporal_domain: [f64; 2],
    pub period_domain: [f64; 2],
    pub num_binning_bins: u32,
    pub binning_bin_size: f64,
    pub temporal_domain_scaling: f64,
}

/// Metadata of SUPPLEMENT_DATASET frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementMetadata {
    pub period_count: u32,
    pub period_domain: [f64; 2],
}

fn check_domain(name: &str, domain: [f64; 2]) -> Result<()> {
    if !domain.iter().all(|v| v.is_finite()) || domain[0] > domain[1] {
        return Err(ProtocolError::InvalidMetadata(format!(
            "{name} is not a valid range: {domain:?}"
        )));
    }
    Ok(())
}

impl FullMetadata {
    fn validate(&self) -> Result<()> {
        check_domain("temporalDomain", self.temporal_domain)?;
        check_domain("periodDomain", self.period_domain)?;
        if !(self.temporal_domain_scaling.is_finite() && self.temporal_domain_scaling > 0.0) {
            return Err(ProtocolError::InvalidMetadata(format!(
                "temporalDomainScaling must be positive, got {}",
                self.temporal_domain_scaling
            )));
        }
        if !(self.binning_bin_size.is_finite() && self.binning_bin_size >= 0.0) {
            return Err(ProtocolError::InvalidMetadata(format!(
                "binningBinSize must be non-negative, got {}",
                self.binning_bin_size
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Frames
// ============================================================================

/// Complete dataset as sent on BEGIN_DATASET / REPLACE_DATASET.
/// Values are in the service's (unscaled) units.
#[derive(Debug, Clone, PartialEq)]
pub struct FullFrame {
    pub metadata: FullMetadata,
    pub histograms: Vec<f32>,
    pub entropies: Vec<f32>,
    pub vectorstrengths: Vec<f32>,
    pub periods: Vec<f32>,
    pub xs: Vec<f32>,
    pub ys: Vec<f32>,
    pub values: Vec<f32>,
    pub binning: Vec<f32>,
    pub timestamps: Vec<u32>,
}

/// Additional periods answered on SUPPLEMENT_DATASET
#[derive(Debug, Clone, PartialEq)]
pub struct SupplementFrame {
    pub request_id: u32,
    pub metadata: SupplementMetadata,
    pub histograms: Vec<f32>,
    pub entropies: Vec<f32>,
    pub vectorstrengths: Vec<f32>,
    pub periods: Vec<f32>,
}

/// Raw points sent on UPLOAD_DATASET
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadBatch {
    pub xs: Vec<f32>,
    pub ys: Vec<f32>,
    pub values: Vec<f32>,
    pub timestamps: Vec<u32>,
}

impl UploadBatch {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

// ============================================================================
// Reading
// ============================================================================

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).filter(|&end| end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.offset..end];
                self.offset = end;
                Ok(slice)
            }
            None => Err(ProtocolError::TruncatedMessage {
                needed: self.offset.saturating_add(len),
                available: self.bytes.len(),
            }),
        }
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32_array(&mut self, len: usize) -> Result<Vec<f32>> {
        let bytes = self.take(len.saturating_mul(4))?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn u32_array(&mut self, len: usize) -> Result<Vec<u32>> {
        let bytes = self.take(len.saturating_mul(4))?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn metadata<T: for<'de> Deserialize<'de>>(&mut self) -> Result<T> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ProtocolError::InvalidMetadata(e.to_string()))?;
        trace!(metadata = text, "Decoding metadata");
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidMetadata(e.to_string()))
    }

    /// Verify that exactly `words` 4-byte values follow
    fn expect_words(&self, words: usize) -> Result<()> {
        let needed = words.checked_mul(4).unwrap_or(usize::MAX);
        let available = self.remaining();
        if available < needed {
            return Err(ProtocolError::TruncatedMessage {
                needed: self.offset.saturating_add(needed),
                available: self.bytes.len(),
            });
        }
        if available > needed {
            return Err(ProtocolError::InconsistentLength(available - needed));
        }
        Ok(())
    }
}

fn checked_words(terms: &[(usize, usize)]) -> usize {
    terms
        .iter()
        .try_fold(0usize, |acc, &(a, b)| a.checked_mul(b).and_then(|w| acc.checked_add(w)))
        .unwrap_or(usize::MAX)
}

/// Read the leading message type tag
pub fn peek_message_type(bytes: &[u8]) -> Result<MessageType> {
    let raw = Reader::new(bytes).u32()?;
    MessageType::from_u32(raw).ok_or(ProtocolError::UnexpectedMessageType(raw))
}

/// Read the request id of a SUPPLEMENT_DATASET frame without decoding the rest
pub fn peek_request_id(bytes: &[u8]) -> Result<u32> {
    let mut reader = Reader::new(bytes);
    let raw = reader.u32()?;
    if raw != MessageType::SupplementDataset as u32 {
        return Err(ProtocolError::UnexpectedMessageType(raw));
    }
    reader.u32()
}

/// Decode a BEGIN_DATASET or REPLACE_DATASET frame
pub fn decode_full(bytes: &[u8], expected: MessageType) -> Result<FullFrame> {
    let mut reader = Reader::new(bytes);
    let raw = reader.u32()?;
    if raw == MessageType::Error as u32 {
        return Err(ProtocolError::ServiceError);
    }
    if raw != expected as u32 {
        return Err(ProtocolError::UnexpectedMessageType(raw));
    }

    let metadata: FullMetadata = reader.metadata()?;
    metadata.validate()?;

    let bins = metadata.num_bins as usize;
    let periods = metadata.period_count as usize;
    let data = metadata.data_count as usize;
    let binning = metadata.num_binning_bins as usize;
    reader.expect_words(checked_words(&[
        (bins, periods),
        (3, periods),
        (4, data),
        (1, binning),
    ]))?;

    let frame = FullFrame {
        histograms: reader.f32_array(bins * periods)?,
        entropies: reader.f32_array(periods)?,
        vectorstrengths: reader.f32_array(periods)?,
        periods: reader.f32_array(periods)?,
        xs: reader.f32_array(data)?,
        ys: reader.f32_array(data)?,
        values: reader.f32_array(data)?,
        binning: reader.f32_array(binning)?,
        timestamps: reader.u32_array(data)?,
        metadata,
    };

    debug!(
        kind = ?expected,
        num_bins = bins,
        period_count = periods,
        data_count = data,
        binning_bins = binning,
        "Decoded full dataset frame"
    );
    Ok(frame)
}

/// Decode a SUPPLEMENT_DATASET frame. The histogram row width is not part of
/// the frame, it comes from the dataset the request was made for.
pub fn decode_supplement(bytes: &[u8], num_bins: usize) -> Result<SupplementFrame> {
    let mut reader = Reader::new(bytes);
    let raw = reader.u32()?;
    if raw == MessageType::Error as u32 {
        return Err(ProtocolError::ServiceError);
    }
    if raw != MessageType::SupplementDataset as u32 {
        return Err(ProtocolError::UnexpectedMessageType(raw));
    }
    let request_id = reader.u32()?;

    let metadata: SupplementMetadata = reader.metadata()?;
    check_domain("periodDomain", metadata.period_domain)?;

    let periods = metadata.period_count as usize;
    reader.expect_words(checked_words(&[(num_bins, periods), (3, periods)]))?;

    let frame = SupplementFrame {
        request_id,
        histograms: reader.f32_array(num_bins * periods)?,
        entropies: reader.f32_array(periods)?,
        vectorstrengths: reader.f32_array(periods)?,
        periods: reader.f32_array(periods)?,
        metadata,
    };

    debug!(request_id, period_count = periods, "Decoded supplement frame");
    Ok(frame)
}

/// Decode an UPLOAD_DATASET frame (the service side of [`encode_upload`])
pub fn decode_upload(bytes: &[u8]) -> Result<UploadBatch> {
    let mut reader = Reader::new(bytes);
    let raw = reader.u32()?;
    if raw != MessageType::UploadDataset as u32 {
        return Err(ProtocolError::UnexpectedMessageType(raw));
    }
    let count = reader.u32()? as usize;
    reader.expect_words(checked_words(&[(4, count)]))?;

    Ok(UploadBatch {
        xs: reader.f32_array(count)?,
        ys: reader.f32_array(count)?,
        values: reader.f32_array(count)?,
        timestamps: reader.u32_array(count)?,
    })
}

// ============================================================================
// Writing
// ============================================================================

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn put_u32s(out: &mut Vec<u8>, values: &[u32]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn put_metadata<T: Serialize>(out: &mut Vec<u8>, metadata: &T) {
    let json = serde_json::to_vec(metadata).unwrap_or_default();
    put_u32(out, json.len() as u32);
    out.extend_from_slice(&json);
}

/// Encode the UPLOAD_DATASET frame: type, count, then xs, ys, values, timestamps
pub fn encode_upload(batch: &UploadBatch) -> Vec<u8> {
    let count = batch.len();
    let mut out = Vec::with_capacity(8 + 16 * count);
    put_u32(&mut out, MessageType::UploadDataset as u32);
    put_u32(&mut out, count as u32);
    put_f32s(&mut out, &batch.xs);
    put_f32s(&mut out, &batch.ys);
    put_f32s(&mut out, &batch.values);
    put_u32s(&mut out, &batch.timestamps);
    out
}

/// Encode a full dataset frame the way the service does
pub fn encode_full(kind: MessageType, frame: &FullFrame) -> Vec<u8> {
    let mut out = Vec::new();
    put_u32(&mut out, kind as u32);
    put_metadata(&mut out, &frame.metadata);
    for array in [
        &frame.histograms,
        &frame.entropies,
        &frame.vectorstrengths,
        &frame.periods,
        &frame.xs,
        &frame.ys,
        &frame.values,
        &frame.binning,
    ] {
        put_f32s(&mut out, array);
    }
    put_u32s(&mut out, &frame.timestamps);
    out
}

/// Encode a supplement frame the way the service does
pub fn encode_supplement(frame: &SupplementFrame) -> Vec<u8> {
    let mut out = Vec::new();
    put_u32(&mut out, MessageType::SupplementDataset as u32);
    put_u32(&mut out, frame.request_id);
    put_metadata(&mut out, &frame.metadata);
    put_f32s(&mut out, &frame.histograms);
    put_f32s(&mut out, &frame.entropies);
    put_f32s(&mut out, &frame.vectorstrengths);
    put_f32s(&mut out, &frame.periods);
    out
}

/// The bare ERROR frame
pub fn encode_error() -> Vec<u8> {
    (MessageType::Error as u32).to_le_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_full() -> FullFrame {
        FullFrame {
            metadata: FullMetadata {
                num_bins: 2,
                period_count: 3,
                data_count: 2,
                temporal_domain: [100.0, 200.0],
                period_domain: [1.0, 4.0],
                num_binning_bins: 4,
                binning_bin_size: 25.0,
                temporal_domain_scaling: 1.0,
            },
            histograms: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            entropies: vec![0.5, 0.4, 0.3],
            vectorstrengths: vec![0.1, 0.2, 0.3],
            periods: vec![1.0, 2.0, 4.0],
            xs: vec![0.5, 1.5],
            ys: vec![2.5, 3.5],
            values: vec![7.0, 8.0],
            binning: vec![1.0, 0.0, 2.0, 1.0],
            timestamps: vec![100, 200],
        }
    }

    fn sample_supplement() -> SupplementFrame {
        SupplementFrame {
            request_id: 7,
            metadata: SupplementMetadata { period_count: 2, period_domain: [1.0, 4.0] },
            histograms: vec![9.0, 8.0, 7.0, 6.0],
            entropies: vec![0.2, 0.25],
            vectorstrengths: vec![0.7, 0.6],
            periods: vec![1.5, 3.0],
        }
    }

    #[test]
    fn test_decode_full_frame() {
        let frame = sample_full();
        let bytes = encode_full(MessageType::BeginDataset, &frame);
        let decoded = decode_full(&bytes, MessageType::BeginDataset).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_binning_precedes_timestamps() {
        let bytes = encode_full(MessageType::BeginDataset, &sample_full());
        // Last 8 bytes are the two u32 timestamps
        let tail = &bytes[bytes.len() - 8..];
        assert_eq!(u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]), 100);
        assert_eq!(u32::from_le_bytes([tail[4], tail[5], tail[6], tail[7]]), 200);
    }

    #[test]
    fn test_decode_full_wrong_type() {
        let bytes = encode_full(MessageType::ReplaceDataset, &sample_full());
        let err = decode_full(&bytes, MessageType::BeginDataset).unwrap_err();
        assert_eq!(err, ProtocolError::UnexpectedMessageType(3));
    }

    #[test]
    fn test_decode_full_truncated() {
        let bytes = encode_full(MessageType::BeginDataset, &sample_full());
        let err = decode_full(&bytes[..bytes.len() - 3], MessageType::BeginDataset).unwrap_err();
        assert!(matches!(err, ProtocolError::TruncatedMessage { .. }));
    }

    #[test]
    fn test_decode_full_trailing_bytes() {
        let mut bytes = encode_full(MessageType::BeginDataset, &sample_full());
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        let err = decode_full(&bytes, MessageType::BeginDataset).unwrap_err();
        assert_eq!(err, ProtocolError::InconsistentLength(4));
    }

    #[test]
    fn test_decode_error_frame() {
        let err = decode_full(&encode_error(), MessageType::BeginDataset).unwrap_err();
        assert_eq!(err, ProtocolError::ServiceError);
    }

    #[test]
    fn test_decode_missing_metadata_field() {
        let mut bytes = Vec::new();
        put_u32(&mut bytes, 0);
        let json = br#"{"numBins": 2, "periodCount": 1}"#;
        put_u32(&mut bytes, json.len() as u32);
        bytes.extend_from_slice(json);
        let err = decode_full(&bytes, MessageType::BeginDataset).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMetadata(_)));
    }

    #[test]
    fn test_decode_ignores_unknown_metadata_fields() {
        let mut bytes = Vec::new();
        put_u32(&mut bytes, 1);
        put_u32(&mut bytes, 3);
        let json = br#"{"periodCount": 0, "periodDomain": [300, 86400], "phaseDomain": [0, 1]}"#;
        put_u32(&mut bytes, json.len() as u32);
        bytes.extend_from_slice(json);
        let frame = decode_supplement(&bytes, 25).unwrap();
        assert_eq!(frame.request_id, 3);
        assert!(frame.periods.is_empty());
    }

    #[test]
    fn test_decode_huge_declared_count_is_truncated() {
        let mut bytes = Vec::new();
        put_u32(&mut bytes, 1);
        put_u32(&mut bytes, 0);
        let json = br#"{"periodCount": 4294967295, "periodDomain": [1, 2]}"#;
        put_u32(&mut bytes, json.len() as u32);
        bytes.extend_from_slice(json);
        let err = decode_supplement(&bytes, 25).unwrap_err();
        assert!(matches!(err, ProtocolError::TruncatedMessage { .. }));
    }

    #[test]
    fn test_decode_supplement() {
        let frame = sample_supplement();
        let bytes = encode_supplement(&frame);
        assert_eq!(peek_message_type(&bytes).unwrap(), MessageType::SupplementDataset);
        assert_eq!(peek_request_id(&bytes).unwrap(), 7);
        assert_eq!(decode_supplement(&bytes, 2).unwrap(), frame);
    }

    #[test]
    fn test_decode_supplement_wrong_bin_count() {
        let bytes = encode_supplement(&sample_supplement());
        assert!(decode_supplement(&bytes, 3).is_err());
    }

    #[test]
    fn test_peek_unknown_type() {
        let bytes = 42u32.to_le_bytes();
        assert_eq!(
            peek_message_type(&bytes).unwrap_err(),
            ProtocolError::UnexpectedMessageType(42)
        );
        assert!(matches!(
            peek_message_type(&[1, 0]).unwrap_err(),
            ProtocolError::TruncatedMessage { needed: 4, available: 2 }
        ));
    }

    #[test]
    fn test_upload_roundtrip() {
        let batch = UploadBatch {
            xs: vec![1.25, -3.5, 0.0],
            ys: vec![10.0, 20.5, -1.0],
            values: vec![0.5, 1.0, 2.0],
            timestamps: vec![1_600_000_000, 1_600_000_060, 1_600_003_600],
        };
        let bytes = encode_upload(&batch);
        assert_eq!(bytes.len(), 8 + 16 * 3);
        assert_eq!(peek_message_type(&bytes).unwrap(), MessageType::UploadDataset);
        assert_eq!(decode_upload(&bytes).unwrap(), batch);
    }

    #[test]
    fn test_control_messages() {
        assert_eq!(ControlMessage::Ready.to_json(), r#"{"type":"ready"}"#);
        assert_eq!(
            ControlMessage::RequestAdditionalData { periods: vec![60.0, 120.5], request_id: 4 }.to_json(),
            r#"{"type":"request additional data","periods":[60.0,120.5],"requestId":4}"#
        );
        assert_eq!(
            ControlMessage::SetDisplayAttribute { attribute: DisplayAttribute::AverageValue }.to_json(),
            r#"{"type":"set display attribute","attribute":"average value"}"#
        );
    }

    #[test]
    fn test_display_attribute_parse() {
        assert_eq!(DisplayAttribute::parse("variance"), Some(DisplayAttribute::Variance));
        assert_eq!(DisplayAttribute::parse(" count "), Some(DisplayAttribute::Count));
        assert_eq!(DisplayAttribute::parse("median"), None);
    }
}
