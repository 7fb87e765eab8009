//! One dataset session over one socket
//!
//! The session owns the [`Dataset`] and the request bookkeeping for it. It
//! never blocks: outgoing frames go through a [`Transport`], incoming frames
//! are fed to [`DatasetSession::handle_frame`] by whoever drives the socket,
//! which returns what happened.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::dataset::{AdditionalData, Dataset, DatasetError, DatasetParts};
use super::protocol::{
    decode_full, decode_supplement, encode_upload, peek_message_type, peek_request_id,
    ControlMessage, DisplayAttribute, MessageType, ProtocolError, UploadBatch,
};

/// A socket frame in either direction
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Outgoing side of the socket
pub trait Transport {
    fn send(&mut self, frame: Frame) -> Result<()>;
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("transport failed: {0}")]
    Transport(String),

    #[error("no dataset loaded yet")]
    NotReady,
}

pub type Result<T> = std::result::Result<T, SessionError>;

pub type RequestId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    /// Handed back to the caller unmerged
    Detached,
    /// Merged into the dataset on arrival
    Splice,
    /// Merged, then `period` is selected exactly. Holds one suspension.
    ExactPeriod { period: f64 },
}

/// Result of [`DatasetSession::set_period_exact`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExactSelection {
    /// The period was present and is now selected
    Immediate,
    /// The period is being fetched under this request id
    Pending(RequestId),
}

/// What an incoming frame did to the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The initial BEGIN_DATASET arrived
    Loaded,
    /// Detached period data arrived
    Supplement(AdditionalData),
    /// Period data was merged into the dataset
    Spliced { request_id: RequestId },
    /// An exact period was fetched, merged and selected
    ExactPeriodSelected { request_id: RequestId, period: f64 },
    /// The dataset was replaced after a display attribute change
    Replaced(DisplayAttribute),
}

pub struct DatasetSession<T: Transport> {
    key: String,
    transport: T,
    dataset: Option<Dataset>,
    next_request_id: RequestId,
    pending: BTreeMap<RequestId, Pending>,
    pending_attribute: Option<DisplayAttribute>,
}

impl<T: Transport> DatasetSession<T> {
    /// Start a session for a named dataset; sends `ready`
    pub fn start(key: &str, mut transport: T) -> Result<Self> {
        send_control(&mut transport, &ControlMessage::Ready)?;
        info!(key, "Dataset session started");
        Ok(Self::new(key, transport))
    }

    /// Start a session for uploaded points; sends the UPLOAD frame, then `ready`
    pub fn start_upload(key: &str, batch: &UploadBatch, mut transport: T) -> Result<Self> {
        transport.send(Frame::Binary(encode_upload(batch)))?;
        info!(key, points = batch.len(), "Uploaded dataset");
        send_control(&mut transport, &ControlMessage::Ready)?;
        Ok(Self::new(key, transport))
    }

    fn new(key: &str, transport: T) -> Self {
        Self {
            key: key.to_string(),
            transport,
            dataset: None,
            next_request_id: 0,
            pending: BTreeMap::new(),
            pending_attribute: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_ready(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn dataset_mut(&mut self) -> Option<&mut Dataset> {
        self.dataset.as_mut()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Id the next request will carry
    pub fn next_request_id(&self) -> RequestId {
        self.next_request_id
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len() + usize::from(self.pending_attribute.is_some())
    }

    /// Display attribute the session is showing or switching to
    pub fn display_attribute(&self) -> Option<DisplayAttribute> {
        self.pending_attribute
            .or_else(|| self.dataset.as_ref().map(Dataset::display_attribute))
    }

    /// Request period data for arbitrary periods (seconds). With `splice` the
    /// data is merged on arrival, otherwise it comes back as
    /// [`SessionEvent::Supplement`].
    pub fn load_additional_periods(&mut self, periods: &[f64], splice: bool) -> Result<RequestId> {
        let pending = if splice { Pending::Splice } else { Pending::Detached };
        self.request(periods, pending)
    }

    fn request(&mut self, periods: &[f64], pending: Pending) -> Result<RequestId> {
        let scaling = self
            .dataset
            .as_ref()
            .ok_or(SessionError::NotReady)?
            .temporal_domain_scaling();

        let request_id = self.next_request_id;
        let message = ControlMessage::RequestAdditionalData {
            periods: periods.iter().map(|p| p / scaling).collect(),
            request_id,
        };
        send_control(&mut self.transport, &message)?;

        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.pending.insert(request_id, pending);
        debug!(request_id, periods = periods.len(), kind = ?pending, "Requested additional periods");
        Ok(request_id)
    }

    /// Select exactly `period`, fetching it first when it is not one of the
    /// dataset's periods. Notifications stay suspended until it is selected.
    pub fn set_period_exact(&mut self, period: f64) -> Result<ExactSelection> {
        let dataset = self.dataset.as_mut().ok_or(SessionError::NotReady)?;
        if let Some(index) = dataset.exact_index(period)? {
            dataset.set_index(index)?;
            return Ok(ExactSelection::Immediate);
        }

        dataset.suspend();
        match self.request(&[period], Pending::ExactPeriod { period }) {
            Ok(id) => Ok(ExactSelection::Pending(id)),
            Err(e) => {
                if let Some(dataset) = self.dataset.as_mut() {
                    dataset.resume();
                }
                Err(e)
            }
        }
    }

    /// Ask the service to recompute for another statistic. Returns false when
    /// `attribute` is already shown or requested.
    pub fn set_display_attribute(&mut self, attribute: DisplayAttribute) -> Result<bool> {
        let current = self.display_attribute().ok_or(SessionError::NotReady)?;
        if current == attribute {
            debug!(attribute = attribute.label(), "Display attribute unchanged");
            return Ok(false);
        }
        send_control(&mut self.transport, &ControlMessage::SetDisplayAttribute { attribute })?;
        self.pending_attribute = Some(attribute);
        Ok(true)
    }

    /// Apply one incoming frame
    pub fn handle_frame(&mut self, frame: Frame) -> Result<Option<SessionEvent>> {
        let bytes = match frame {
            Frame::Binary(bytes) => bytes,
            Frame::Text(text) => {
                warn!(len = text.len(), "Ignoring text frame from service");
                return Err(ProtocolError::NotBinary.into());
            }
        };

        match peek_message_type(&bytes)? {
            MessageType::BeginDataset => self.handle_begin(&bytes),
            MessageType::SupplementDataset => self.handle_supplement(&bytes),
            MessageType::ReplaceDataset => self.handle_replace(&bytes),
            MessageType::Error => {
                self.fail_all();
                Err(ProtocolError::ServiceError.into())
            }
            MessageType::UploadDataset => {
                Err(ProtocolError::UnexpectedMessageType(MessageType::UploadDataset as u32).into())
            }
        }
    }

    fn handle_begin(&mut self, bytes: &[u8]) -> Result<Option<SessionEvent>> {
        if self.dataset.is_some() {
            return Err(ProtocolError::UnexpectedMessageType(MessageType::BeginDataset as u32).into());
        }
        let frame = decode_full(bytes, MessageType::BeginDataset)?;
        let parts = DatasetParts::from_frame(&self.key, DisplayAttribute::default(), frame);
        self.dataset = Some(Dataset::from_parts(parts)?);
        info!(key = %self.key, "Dataset loaded");
        Ok(Some(SessionEvent::Loaded))
    }

    fn handle_supplement(&mut self, bytes: &[u8]) -> Result<Option<SessionEvent>> {
        let request_id = peek_request_id(bytes)?;
        let Some(pending) = self.pending.remove(&request_id) else {
            debug!(request_id, "Discarding supplement for unknown request");
            return Ok(None);
        };
        let Some(dataset) = self.dataset.as_mut() else {
            return Err(SessionError::NotReady);
        };

        let decoded = decode_supplement(bytes, dataset.num_bins());
        let mut data = match decoded {
            Ok(frame) => AdditionalData::from_frame(frame, dataset.temporal_domain_scaling()),
            Err(e) => {
                if matches!(pending, Pending::ExactPeriod { .. }) {
                    dataset.resume();
                }
                return Err(e.into());
            }
        };

        match pending {
            Pending::Detached => Ok(Some(SessionEvent::Supplement(data))),
            Pending::Splice => {
                dataset.splice(&data)?;
                Ok(Some(SessionEvent::Spliced { request_id }))
            }
            Pending::ExactPeriod { period } => {
                // The service echoes the period as f32; keep the requested value
                if let [returned] = data.periods.as_mut_slice() {
                    trace!(requested = period, returned = *returned, "Exact period echoed");
                    *returned = period;
                }
                let result = dataset
                    .splice(&data)
                    .and_then(|_| dataset.set_index(dataset.nearest_index(period)));
                dataset.resume();
                result?;
                Ok(Some(SessionEvent::ExactPeriodSelected { request_id, period }))
            }
        }
    }

    fn handle_replace(&mut self, bytes: &[u8]) -> Result<Option<SessionEvent>> {
        let Some(attribute) = self.pending_attribute else {
            debug!("Discarding unrequested dataset replacement");
            return Ok(None);
        };
        let dataset = self.dataset.as_mut().ok_or(SessionError::NotReady)?;
        let decoded = decode_full(bytes, MessageType::ReplaceDataset);
        self.pending_attribute = None;
        let parts = DatasetParts::from_frame(&self.key, attribute, decoded?);
        dataset.replace(parts)?;
        Ok(Some(SessionEvent::Replaced(attribute)))
    }

    /// The service reported an error; nothing in flight will be answered
    fn fail_all(&mut self) {
        let suspended = self
            .pending
            .values()
            .filter(|p| matches!(p, Pending::ExactPeriod { .. }))
            .count();
        warn!(
            requests = self.pending.len(),
            attribute = self.pending_attribute.is_some(),
            "Service error, failing requests in flight"
        );
        self.pending.clear();
        self.pending_attribute = None;
        if let Some(dataset) = self.dataset.as_mut() {
            for _ in 0..suspended {
                dataset.resume();
            }
        }
    }
}

fn send_control<T: Transport>(transport: &mut T, message: &ControlMessage) -> Result<()> {
    let json = message.to_json();
    debug!(message = %json, "Sending control message");
    transport.send(Frame::Text(json))
}
