//! Trace event wire format.
//!
//! The IPU runtime serialises every trace event as a `tensorflow.IpuTraceEvent`
//! protobuf message. Tag numbers and enum values here are owned by that
//! protocol and must not change.

use crate::utils::error::RecordError;
use log::debug;
use prost::{Enumeration, Message, Oneof};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind tag of a trace event.
///
/// This type corresponds to `IpuTraceEvent.Type`.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum TraceEventKind {
    CompileBegin = 0,
    CompileEnd = 1,
    HostToDeviceTransfer = 2,
    DeviceToHostTransfer = 3,
    LoadEngine = 4,
    Execute = 5,
}

impl TraceEventKind {
    /// All kinds, in tag order
    pub const ALL: [TraceEventKind; 6] = [
        Self::CompileBegin,
        Self::CompileEnd,
        Self::HostToDeviceTransfer,
        Self::DeviceToHostTransfer,
        Self::LoadEngine,
        Self::Execute,
    ];

    /// Protocol name of the kind (e.g. `COMPILE_END`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompileBegin => "COMPILE_BEGIN",
            Self::CompileEnd => "COMPILE_END",
            Self::HostToDeviceTransfer => "HOST_TO_DEVICE_TRANSFER",
            Self::DeviceToHostTransfer => "DEVICE_TO_HOST_TRANSFER",
            Self::LoadEngine => "LOAD_ENGINE",
            Self::Execute => "EXECUTE",
        }
    }

    /// Lower-case description used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            Self::CompileBegin => "compile-begin",
            Self::CompileEnd => "compile-end",
            Self::HostToDeviceTransfer => "host-to-device transfer",
            Self::DeviceToHostTransfer => "device-to-host transfer",
            Self::LoadEngine => "load-engine",
            Self::Execute => "execute",
        }
    }
}

impl fmt::Display for TraceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single trace event as it appears on the wire.
///
/// This type corresponds to `IpuTraceEvent`.
#[derive(Clone, PartialEq, Message)]
pub struct IpuTraceEvent {
    /// Seconds since the epoch at which the event was recorded
    #[prost(double, tag = "1")]
    pub timestamp: f64,

    #[prost(enumeration = "TraceEventKind", tag = "2")]
    pub r#type: i32,

    /// Device ordinal that produced the event
    #[prost(int32, tag = "3")]
    pub ordinal: i32,

    #[prost(oneof = "EventPayload", tags = "4, 5, 6, 7, 8")]
    pub payload: Option<EventPayload>,
}

/// Per-kind payload of an [`IpuTraceEvent`].
#[derive(Clone, PartialEq, Oneof)]
pub enum EventPayload {
    #[prost(message, tag = "4")]
    CompileBegin(CompileBeginEvent),

    #[prost(message, tag = "5")]
    CompileEnd(CompileEndEvent),

    #[prost(message, tag = "6")]
    DataTransfer(DataTransferEvent),

    #[prost(message, tag = "7")]
    LoadEngine(LoadEngineEvent),

    #[prost(message, tag = "8")]
    Execute(ExecuteEvent),
}

#[derive(Clone, PartialEq, Message)]
pub struct CompileBeginEvent {
    #[prost(bytes = "vec", tag = "1")]
    pub module_name: Vec<u8>,

    #[prost(bytes = "vec", tag = "2")]
    pub xla_graph: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CompileEndEvent {
    #[prost(bytes = "vec", tag = "1")]
    pub module_name: Vec<u8>,

    /// JSON compilation report; empty when reporting is disabled
    #[prost(bytes = "vec", tag = "2")]
    pub compilation_report: Vec<u8>,

    /// Compilation time in microseconds
    #[prost(int64, tag = "3")]
    pub duration: i64,

    /// JSON tensor-to-tile mapping
    #[prost(bytes = "vec", tag = "4")]
    pub tensor_map: Vec<u8>,

    #[prost(bytes = "vec", tag = "5")]
    pub instruction_info: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct DataTransferEvent {
    #[prost(bytes = "vec", tag = "1")]
    pub data_transfer: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct LoadEngineEvent {
    #[prost(bytes = "vec", tag = "1")]
    pub module_name: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ExecuteEvent {
    #[prost(bytes = "vec", tag = "1")]
    pub module_name: Vec<u8>,

    #[prost(bytes = "vec", tag = "2")]
    pub execution_report: Vec<u8>,

    #[prost(bytes = "vec", tag = "3")]
    pub activity_trace: Vec<u8>,
}

impl IpuTraceEvent {
    fn with_payload(kind: TraceEventKind, payload: EventPayload) -> Self {
        Self {
            timestamp: 0.0,
            r#type: kind as i32,
            ordinal: 0,
            payload: Some(payload),
        }
    }

    pub fn compile_begin(module_name: &str) -> Self {
        Self::with_payload(
            TraceEventKind::CompileBegin,
            EventPayload::CompileBegin(CompileBeginEvent {
                module_name: module_name.as_bytes().to_vec(),
                xla_graph: Vec::new(),
            }),
        )
    }

    /// Build a compile-end event carrying a report and tensor map
    pub fn compile_end(module_name: &str, report: &str, tensor_map: &str) -> Self {
        Self::with_payload(
            TraceEventKind::CompileEnd,
            EventPayload::CompileEnd(CompileEndEvent {
                module_name: module_name.as_bytes().to_vec(),
                compilation_report: report.as_bytes().to_vec(),
                duration: 0,
                tensor_map: tensor_map.as_bytes().to_vec(),
                instruction_info: Vec::new(),
            }),
        )
    }

    pub fn host_to_device(json: &str) -> Self {
        Self::with_payload(
            TraceEventKind::HostToDeviceTransfer,
            EventPayload::DataTransfer(DataTransferEvent {
                data_transfer: json.as_bytes().to_vec(),
            }),
        )
    }

    pub fn device_to_host(json: &str) -> Self {
        Self::with_payload(
            TraceEventKind::DeviceToHostTransfer,
            EventPayload::DataTransfer(DataTransferEvent {
                data_transfer: json.as_bytes().to_vec(),
            }),
        )
    }

    pub fn load_engine(module_name: &str) -> Self {
        Self::with_payload(
            TraceEventKind::LoadEngine,
            EventPayload::LoadEngine(LoadEngineEvent {
                module_name: module_name.as_bytes().to_vec(),
            }),
        )
    }

    pub fn execute(module_name: &str, report: &str) -> Self {
        Self::with_payload(
            TraceEventKind::Execute,
            EventPayload::Execute(ExecuteEvent {
                module_name: module_name.as_bytes().to_vec(),
                execution_report: report.as_bytes().to_vec(),
                activity_trace: Vec::new(),
            }),
        )
    }

    /// Attach instruction info to a compile-end event (no-op for other kinds)
    pub fn with_instruction_info(mut self, json: &str) -> Self {
        if let Some(EventPayload::CompileEnd(end)) = &mut self.payload {
            end.instruction_info = json.as_bytes().to_vec();
        }
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64, ordinal: i32) -> Self {
        self.timestamp = timestamp;
        self.ordinal = ordinal;
        self
    }

    /// Serialise to a single wire record
    pub fn to_record(&self) -> Vec<u8> {
        self.encode_to_vec()
    }
}

/// Decoded trace event, one variant per kind.
///
/// Payload blobs are kept as raw bytes; an empty blob means the producer
/// did not attach that payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    CompileBegin {
        module_name: Vec<u8>,
    },
    CompileEnd {
        module_name: Vec<u8>,
        compilation_report: Vec<u8>,
        tensor_map: Vec<u8>,
        instruction_info: Vec<u8>,
        duration: i64,
    },
    HostToDeviceTransfer {
        data: Vec<u8>,
    },
    DeviceToHostTransfer {
        data: Vec<u8>,
    },
    LoadEngine {
        module_name: Vec<u8>,
    },
    Execute {
        module_name: Vec<u8>,
        execution_report: Vec<u8>,
        activity_trace: Vec<u8>,
    },
}

impl TraceEvent {
    pub fn kind(&self) -> TraceEventKind {
        match self {
            Self::CompileBegin { .. } => TraceEventKind::CompileBegin,
            Self::CompileEnd { .. } => TraceEventKind::CompileEnd,
            Self::HostToDeviceTransfer { .. } => TraceEventKind::HostToDeviceTransfer,
            Self::DeviceToHostTransfer { .. } => TraceEventKind::DeviceToHostTransfer,
            Self::LoadEngine { .. } => TraceEventKind::LoadEngine,
            Self::Execute { .. } => TraceEventKind::Execute,
        }
    }

    /// Build the variant for `kind` from whatever payload the message carried.
    ///
    /// A payload of the wrong shape for the kind is treated as absent, the
    /// same as protobuf default field semantics.
    fn from_parts(kind: TraceEventKind, payload: Option<EventPayload>) -> Self {
        match kind {
            TraceEventKind::CompileBegin => {
                let begin = match payload {
                    Some(EventPayload::CompileBegin(b)) => b,
                    _ => CompileBeginEvent::default(),
                };
                Self::CompileBegin {
                    module_name: begin.module_name,
                }
            }
            TraceEventKind::CompileEnd => {
                let end = match payload {
                    Some(EventPayload::CompileEnd(e)) => e,
                    _ => CompileEndEvent::default(),
                };
                Self::CompileEnd {
                    module_name: end.module_name,
                    compilation_report: end.compilation_report,
                    tensor_map: end.tensor_map,
                    instruction_info: end.instruction_info,
                    duration: end.duration,
                }
            }
            TraceEventKind::HostToDeviceTransfer | TraceEventKind::DeviceToHostTransfer => {
                let data = match payload {
                    Some(EventPayload::DataTransfer(t)) => t.data_transfer,
                    _ => Vec::new(),
                };
                if kind == TraceEventKind::HostToDeviceTransfer {
                    Self::HostToDeviceTransfer { data }
                } else {
                    Self::DeviceToHostTransfer { data }
                }
            }
            TraceEventKind::LoadEngine => {
                let load = match payload {
                    Some(EventPayload::LoadEngine(l)) => l,
                    _ => LoadEngineEvent::default(),
                };
                Self::LoadEngine {
                    module_name: load.module_name,
                }
            }
            TraceEventKind::Execute => {
                let exec = match payload {
                    Some(EventPayload::Execute(e)) => e,
                    _ => ExecuteEvent::default(),
                };
                Self::Execute {
                    module_name: exec.module_name,
                    execution_report: exec.execution_report,
                    activity_trace: exec.activity_trace,
                }
            }
        }
    }
}

/// A decoded record: the event plus its envelope fields
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub timestamp: f64,
    pub ordinal: i32,
    pub event: TraceEvent,
}

impl TraceRecord {
    /// Decode one wire record
    ///
    /// # Errors
    /// * `RecordError::Protobuf` - bytes are not an `IpuTraceEvent`
    /// * `RecordError::UnknownKind` - kind tag outside the protocol's enum
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let raw = IpuTraceEvent::decode(bytes)?;
        let kind = TraceEventKind::try_from(raw.r#type)
            .map_err(|_| RecordError::UnknownKind(raw.r#type))?;

        Ok(Self {
            timestamp: raw.timestamp,
            ordinal: raw.ordinal,
            event: TraceEvent::from_parts(kind, raw.payload),
        })
    }

    pub fn kind(&self) -> TraceEventKind {
        self.event.kind()
    }
}

/// Collect every compile-end event that carries a compilation report.
///
/// Records that fail to decode are skipped.
pub fn extract_all_compile_end_events<R: AsRef<[u8]>>(records: &[R]) -> Vec<TraceRecord> {
    records
        .iter()
        .filter_map(|r| TraceRecord::from_bytes(r.as_ref()).ok())
        .filter(|rec| {
            matches!(&rec.event, TraceEvent::CompileEnd { compilation_report, .. } if !compilation_report.is_empty())
        })
        .collect()
}

/// Collect every execute event, with or without a report
pub fn extract_all_execute_events<R: AsRef<[u8]>>(records: &[R]) -> Vec<TraceRecord> {
    let events: Vec<TraceRecord> = records
        .iter()
        .filter_map(|r| TraceRecord::from_bytes(r.as_ref()).ok())
        .filter(|rec| rec.kind() == TraceEventKind::Execute)
        .collect();

    debug!("Extracted {} execute events", events.len());
    events
}
