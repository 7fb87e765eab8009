//! Platform-agnostic core module - shared between the desktop app and the CLI

pub mod dataset;
pub mod protocol;
pub mod session;
pub mod suggest;
pub mod units;
pub mod upload;
pub mod views;

pub use dataset::{AdditionalData, Datapoint, Dataset, DatasetError, DatasetParts, PhasedDatapoint, SubscriptionId};
pub use protocol::{DisplayAttribute, MessageType, ProtocolError, UploadBatch};
pub use session::{DatasetSession, ExactSelection, Frame, RequestId, SessionError, SessionEvent, Transport};
pub use suggest::{PeriodSuggestor, Suggestion, SuggestorConfig};
pub use units::{format_duration, parse_duration, DurationError, DAY_SECONDS};
pub use upload::{parse_upload, UploadError};
