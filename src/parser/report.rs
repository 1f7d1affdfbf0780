//! Report decoder.
//!
//! Turns one run's list of trace records into a [`DecodedReport`]: an
//! event-kind histogram plus the compilation report, tensor map, transfer
//! payloads and execution reports carried by those events.
//!
//! Payload problems are lenient: an event whose payload cannot be decoded is
//! skipped, logged, and recorded as a [`RecordDiagnostic`]. Structural
//! problems (count mismatch, unparseable record, duplicate singleton event)
//! abort the decode.

use super::schema::{CompilationReport, DataTransfer, InstructionInfo, MlType, Program};
use super::tensor_map::TensorMap;
use super::trace_event::{TraceEvent, TraceEventKind, TraceRecord};
use crate::utils::config::ML_TYPE_COUNT;
use crate::utils::error::{DecodeError, PayloadError, QueryError, RecordError};
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Why a record did not contribute its payload
#[derive(Debug)]
pub enum SkipReason {
    /// The kind tag is not part of the protocol
    UnknownKind(i32),
    /// The payload could not be decoded
    Payload(PayloadError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownKind(tag) => write!(f, "unknown event kind {}", tag),
            Self::Payload(e) => write!(f, "{}", e),
        }
    }
}

/// A record that was skipped during decoding
#[derive(Debug)]
pub struct RecordDiagnostic {
    /// Position of the record in the input list
    pub index: usize,
    pub kind: Option<TraceEventKind>,
    pub reason: SkipReason,
}

/// Everything decoded from a compile-end event
#[derive(Debug, Clone, PartialEq)]
pub struct CompileEnd {
    pub module_name: String,
    pub report: CompilationReport,
    pub tensor_map: TensorMap,
    pub instruction_info: InstructionInfo,
}

/// Decoded state of one run's trace events
#[derive(Debug, Default)]
pub struct DecodedReport {
    record_count: usize,
    event_counts: BTreeMap<TraceEventKind, usize>,
    compile_end: Option<CompileEnd>,
    host_to_device: Option<DataTransfer>,
    device_to_host: Option<DataTransfer>,
    execution_reports: Vec<serde_json::Value>,
    diagnostics: Vec<RecordDiagnostic>,
}

/// Decode a list of trace records
///
/// **Public** - main entry point for decoding
///
/// # Arguments
/// * `records` - Serialised trace events, in production order
/// * `expected_count` - If set, the exact number of records expected
/// * `message` - Context attached to a count mismatch
///
/// # Errors
/// * `DecodeError::CountMismatch` - record count differs from `expected_count`
/// * `DecodeError::InvalidRecord` - a record is not a valid protobuf event
/// * `DecodeError::DuplicateEvent` - a second compile-end or transfer payload
pub fn decode_events<R: AsRef<[u8]>>(
    records: &[R],
    expected_count: Option<usize>,
    message: &str,
) -> Result<DecodedReport, DecodeError> {
    if let Some(expected) = expected_count {
        if expected != records.len() {
            return Err(DecodeError::CountMismatch {
                expected,
                actual: records.len(),
                message: message.to_string(),
            });
        }
    }

    debug!("Decoding {} trace records", records.len());

    let mut decoded = DecodedReport {
        record_count: records.len(),
        ..Default::default()
    };

    for (index, bytes) in records.iter().enumerate() {
        let record = match TraceRecord::from_bytes(bytes.as_ref()) {
            Ok(record) => record,
            Err(RecordError::UnknownKind(tag)) => {
                warn!("Skipping record {}: unknown event kind {}", index, tag);
                decoded.diagnostics.push(RecordDiagnostic {
                    index,
                    kind: None,
                    reason: SkipReason::UnknownKind(tag),
                });
                continue;
            }
            Err(source) => return Err(DecodeError::InvalidRecord { index, source }),
        };

        let kind = record.kind();
        *decoded.event_counts.entry(kind).or_insert(0) += 1;

        if let Err(e) = decoded.absorb(record.event) {
            match e {
                Absorb::Fatal(err) => return Err(err),
                Absorb::Skipped(err) => {
                    warn!("Skipping payload of {} record {}: {}", kind, index, err);
                    decoded.diagnostics.push(RecordDiagnostic {
                        index,
                        kind: Some(kind),
                        reason: SkipReason::Payload(err),
                    });
                }
            }
        }
    }

    info!(
        "Decoded {} events ({} skipped), compile report {}",
        records.len(),
        decoded.diagnostics.len(),
        if decoded.compile_end.is_some() { "present" } else { "absent" }
    );

    Ok(decoded)
}

/// Failure while folding one event into the decoded state
enum Absorb {
    Fatal(DecodeError),
    Skipped(PayloadError),
}

impl From<PayloadError> for Absorb {
    fn from(e: PayloadError) -> Self {
        Absorb::Skipped(e)
    }
}

fn payload_text(bytes: &[u8]) -> Result<&str, PayloadError> {
    Ok(std::str::from_utf8(bytes)?)
}

impl DecodedReport {
    fn absorb(&mut self, event: TraceEvent) -> Result<(), Absorb> {
        match event {
            TraceEvent::CompileEnd {
                module_name,
                compilation_report,
                tensor_map,
                instruction_info,
                ..
            } => {
                if compilation_report.is_empty() {
                    return Ok(());
                }
                if self.compile_end.is_some() {
                    return Err(Absorb::Fatal(DecodeError::DuplicateEvent(
                        TraceEventKind::CompileEnd,
                    )));
                }

                let report = CompilationReport::from_json(payload_text(&compilation_report)?)?;
                let tensor_map = TensorMap::from_json(
                    payload_text(&tensor_map)?,
                    report.tiles_per_ipu(),
                    report.target.num_tiles,
                )?;
                let instruction_info = InstructionInfo::from_json(payload_text(&instruction_info)?)?;

                self.compile_end = Some(CompileEnd {
                    module_name: String::from_utf8_lossy(&module_name).into_owned(),
                    report,
                    tensor_map,
                    instruction_info,
                });
            }
            TraceEvent::HostToDeviceTransfer { data } => {
                Self::absorb_transfer(
                    &mut self.host_to_device,
                    TraceEventKind::HostToDeviceTransfer,
                    &data,
                )?;
            }
            TraceEvent::DeviceToHostTransfer { data } => {
                Self::absorb_transfer(
                    &mut self.device_to_host,
                    TraceEventKind::DeviceToHostTransfer,
                    &data,
                )?;
            }
            TraceEvent::Execute {
                execution_report, ..
            } => {
                if !execution_report.is_empty() {
                    let value: serde_json::Value =
                        serde_json::from_str(payload_text(&execution_report)?)
                            .map_err(PayloadError::from)?;
                    self.execution_reports.push(value);
                }
            }
            TraceEvent::CompileBegin { .. } | TraceEvent::LoadEngine { .. } => {}
        }

        Ok(())
    }

    fn absorb_transfer(
        slot: &mut Option<DataTransfer>,
        kind: TraceEventKind,
        data: &[u8],
    ) -> Result<(), Absorb> {
        if data.is_empty() {
            return Ok(());
        }
        if slot.is_some() {
            return Err(Absorb::Fatal(DecodeError::DuplicateEvent(kind)));
        }
        *slot = Some(DataTransfer::from_json(payload_text(data)?)?);
        Ok(())
    }

    // ---- event bookkeeping ----

    /// Occurrences of each event kind (kinds never seen are absent)
    pub fn event_counts(&self) -> &BTreeMap<TraceEventKind, usize> {
        &self.event_counts
    }

    pub fn count_of(&self, kind: TraceEventKind) -> usize {
        self.event_counts.get(&kind).copied().unwrap_or(0)
    }

    /// Events with a known kind
    pub fn total_events(&self) -> usize {
        self.event_counts.values().sum()
    }

    /// Records given to the decoder, including skipped ones
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn diagnostics(&self) -> &[RecordDiagnostic] {
        &self.diagnostics
    }

    pub fn skipped_count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn has_compile_end(&self) -> bool {
        self.compile_end.is_some()
    }

    pub fn compile_end(&self) -> Result<&CompileEnd, QueryError> {
        self.compile_end
            .as_ref()
            .ok_or(QueryError::MissingEvent(TraceEventKind::CompileEnd))
    }

    pub fn compilation_report(&self) -> Result<&CompilationReport, QueryError> {
        Ok(&self.compile_end()?.report)
    }

    // ---- memory ----

    /// Bytes used on each tile, excluding gaps
    pub fn each_tile_memory(&self) -> Result<&[u64], QueryError> {
        Ok(&self.compilation_report()?.memory.by_tile.total)
    }

    pub fn total_tile_memory(&self) -> Result<u64, QueryError> {
        Ok(self.each_tile_memory()?.iter().sum())
    }

    pub fn max_tile_memory(&self) -> Result<u64, QueryError> {
        self.each_tile_memory()?
            .iter()
            .copied()
            .max()
            .ok_or(QueryError::EmptyTileMemory)
    }

    pub fn always_live_memory(&self) -> Result<u64, QueryError> {
        Ok(self
            .compilation_report()?
            .memory
            .liveness
            .always_live
            .bytes_by_tile
            .iter()
            .sum())
    }

    // ---- target ----

    pub fn num_ipus(&self) -> Result<u64, QueryError> {
        Ok(self.compilation_report()?.target.num_ipus)
    }

    pub fn num_tiles(&self) -> Result<u64, QueryError> {
        Ok(self.compilation_report()?.target.num_tiles)
    }

    /// Real-valued tiles per IPU; see [`CompilationReport::tiles_per_ipu`]
    pub fn num_tiles_per_ipu(&self) -> Result<f64, QueryError> {
        Ok(self.compilation_report()?.tiles_per_ipu())
    }

    // ---- graph contents ----

    pub fn compute_sets(&self) -> Result<&[String], QueryError> {
        Ok(&self.compilation_report()?.compute_sets.names)
    }

    pub fn vertices(&self) -> Result<&[String], QueryError> {
        Ok(&self.compilation_report()?.vertex_types.names)
    }

    pub fn programs(&self) -> Result<&[Program], QueryError> {
        Ok(&self.compilation_report()?.programs)
    }

    pub fn program(&self, index: usize) -> Result<&Program, QueryError> {
        let programs = self.programs()?;
        programs.get(index).ok_or(QueryError::ProgramIndexOutOfRange {
            index,
            len: programs.len(),
        })
    }

    pub fn first_program_of_type(&self, program_type: &str) -> Result<Option<&Program>, QueryError> {
        Ok(self
            .programs()?
            .iter()
            .find(|p| p.program_type == program_type))
    }

    pub fn program_names_of_type(&self, program_type: &str) -> Result<Vec<String>, QueryError> {
        Ok(self
            .programs()?
            .iter()
            .filter(|p| p.program_type == program_type)
            .map(|p| p.name.clone())
            .collect())
    }

    pub fn tensor_map(&self) -> Result<&TensorMap, QueryError> {
        Ok(&self.compile_end()?.tensor_map)
    }

    pub fn instruction_info(&self) -> Result<&InstructionInfo, QueryError> {
        Ok(&self.compile_end()?.instruction_info)
    }

    /// Number of instructions of each ML type, indexed by `code - 1`
    pub fn ml_type_counts(&self) -> Result<[usize; ML_TYPE_COUNT], QueryError> {
        let mut counts = [0usize; ML_TYPE_COUNT];

        for (instruction, code) in &self.instruction_info()?.ml_types {
            if MlType::from_code(*code).is_none() {
                return Err(QueryError::InvalidMlType {
                    instruction: instruction.clone(),
                    code: *code,
                });
            }
            counts[(*code - 1) as usize] += 1;
        }

        Ok(counts)
    }

    // ---- run payloads ----

    /// Execution reports in event order; empty when execute events carried none
    pub fn execution_reports(&self) -> Result<&[serde_json::Value], QueryError> {
        if self.count_of(TraceEventKind::Execute) == 0 {
            return Err(QueryError::MissingEvent(TraceEventKind::Execute));
        }
        Ok(&self.execution_reports)
    }

    pub fn host_to_device(&self) -> Result<&DataTransfer, QueryError> {
        self.host_to_device
            .as_ref()
            .ok_or(QueryError::MissingEvent(TraceEventKind::HostToDeviceTransfer))
    }

    pub fn device_to_host(&self) -> Result<&DataTransfer, QueryError> {
        self.device_to_host
            .as_ref()
            .ok_or(QueryError::MissingEvent(TraceEventKind::DeviceToHostTransfer))
    }

    pub fn host_to_device_names(&self) -> Result<Vec<String>, QueryError> {
        Ok(self.host_to_device()?.names())
    }

    pub fn device_to_host_names(&self) -> Result<Vec<String>, QueryError> {
        Ok(self.device_to_host()?.names())
    }
}

/// Reusable decoder; every call starts from a clean state
#[derive(Debug, Clone, Default)]
pub struct ReportDecoder {
    expected_count: Option<usize>,
    message: String,
}

impl ReportDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require exactly `count` records, reporting `message` on mismatch
    pub fn expect_count(mut self, count: usize, message: impl Into<String>) -> Self {
        self.expected_count = Some(count);
        self.message = message.into();
        self
    }

    pub fn decode<R: AsRef<[u8]>>(&self, records: &[R]) -> Result<DecodedReport, DecodeError> {
        decode_events(records, self.expected_count, &self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::trace_event::IpuTraceEvent;
    use serde_json::json;

    fn report(by_tile: &[u64]) -> String {
        json!({
            "target": {"numIPUs": 2, "numTiles": 4},
            "memory": {
                "byTile": {"total": by_tile},
                "liveness": {"alwaysLive": {"bytesByTile": [1, 1, 1, 1]}}
            },
            "vertexTypes": {"names": []},
            "computeSets": {"names": ["a", "b"]},
            "programs": []
        })
        .to_string()
    }

    #[test]
    fn test_count_mismatch() {
        let records = vec![IpuTraceEvent::load_engine("m").to_record()];
        let err = decode_events(&records, Some(2), "after warmup").unwrap_err();

        match err {
            DecodeError::CountMismatch {
                expected,
                actual,
                message,
            } => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
                assert_eq!(message, "after warmup");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_histogram_counts_every_event() {
        let records = vec![
            IpuTraceEvent::compile_begin("m").to_record(),
            IpuTraceEvent::compile_end("m", "", "").to_record(),
            IpuTraceEvent::load_engine("m").to_record(),
            IpuTraceEvent::execute("m", "").to_record(),
            IpuTraceEvent::execute("m", "").to_record(),
        ];
        let decoded = decode_events(&records, Some(5), "").unwrap();

        assert_eq!(decoded.count_of(TraceEventKind::Execute), 2);
        assert_eq!(decoded.count_of(TraceEventKind::CompileEnd), 1);
        assert_eq!(decoded.count_of(TraceEventKind::HostToDeviceTransfer), 0);
        assert_eq!(decoded.total_events(), 5);
        assert!(!decoded.has_compile_end());
    }

    #[test]
    fn test_malformed_payload_is_skipped() {
        let records = vec![
            IpuTraceEvent::compile_end("m", "{not json", "").to_record(),
            IpuTraceEvent::compile_end("m", &report(&[1, 2, 3, 4]), "").to_record(),
        ];
        let decoded = decode_events(&records, None, "").unwrap();

        assert_eq!(decoded.skipped_count(), 1);
        assert_eq!(decoded.diagnostics()[0].index, 0);
        assert_eq!(decoded.total_tile_memory().unwrap(), 10);
    }

    #[test]
    fn test_invalid_utf8_payload_is_skipped() {
        let mut event = IpuTraceEvent::execute("m", "");
        if let Some(crate::parser::trace_event::EventPayload::Execute(e)) = &mut event.payload {
            e.execution_report = vec![0xc3, 0x28];
        }
        let decoded = decode_events(&[event.to_record()], None, "").unwrap();

        assert_eq!(decoded.skipped_count(), 1);
        assert!(matches!(
            decoded.diagnostics()[0].reason,
            SkipReason::Payload(PayloadError::Utf8(_))
        ));
    }

    #[test]
    fn test_duplicate_compile_end_is_fatal() {
        let records = vec![
            IpuTraceEvent::compile_end("m", &report(&[1, 2, 3, 4]), "").to_record(),
            IpuTraceEvent::compile_end("m", &report(&[1, 2, 3, 4]), "").to_record(),
        ];
        let err = decode_events(&records, None, "").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::DuplicateEvent(TraceEventKind::CompileEnd)
        ));
    }

    #[test]
    fn test_duplicate_transfer_is_fatal() {
        let payload = r#"{"tensors": [{"name": "x"}]}"#;
        let records = vec![
            IpuTraceEvent::device_to_host(payload).to_record(),
            IpuTraceEvent::device_to_host("").to_record(),
            IpuTraceEvent::device_to_host(payload).to_record(),
        ];
        let err = decode_events(&records, None, "").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::DuplicateEvent(TraceEventKind::DeviceToHostTransfer)
        ));
    }

    #[test]
    fn test_duplicate_host_to_device_is_fatal() {
        let payload = r#"{"tensors": [{"name": "x"}]}"#;
        let records = vec![
            IpuTraceEvent::host_to_device(payload).to_record(),
            IpuTraceEvent::host_to_device(payload).to_record(),
        ];
        let err = decode_events(&records, None, "").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::DuplicateEvent(TraceEventKind::HostToDeviceTransfer)
        ));
    }

    #[test]
    fn test_execute_without_report() {
        let records = vec![IpuTraceEvent::execute("m", "").to_record()];
        let decoded = decode_events(&records, None, "").unwrap();

        assert!(decoded.execution_reports().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_record_is_fatal() {
        let records = vec![vec![0xffu8, 0xff, 0xff]];
        let err = decode_events(&records, None, "").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidRecord { index: 0, .. }));
    }

    #[test]
    fn test_ml_type_counts() {
        let records = vec![IpuTraceEvent::compile_end("m", &report(&[0, 0, 0, 0]), "")
            .with_instruction_info(r#"{"ml_types": {"a": 1, "b": 2, "c": 2, "d": 4}}"#)
            .to_record()];
        let decoded = decode_events(&records, None, "").unwrap();

        assert_eq!(decoded.ml_type_counts().unwrap(), [1, 2, 0, 1]);
    }

    #[test]
    fn test_invalid_ml_type() {
        let records = vec![IpuTraceEvent::compile_end("m", &report(&[0, 0, 0, 0]), "")
            .with_instruction_info(r#"{"ml_types": {"a": 0}}"#)
            .to_record()];
        let decoded = decode_events(&records, None, "").unwrap();

        assert!(matches!(
            decoded.ml_type_counts(),
            Err(QueryError::InvalidMlType { code: 0, .. })
        ));
    }

    #[test]
    fn test_max_tile_memory_empty() {
        let records = vec![IpuTraceEvent::compile_end("m", &report(&[]), "").to_record()];
        let decoded = decode_events(&records, None, "").unwrap();

        assert_eq!(decoded.max_tile_memory(), Err(QueryError::EmptyTileMemory));
        assert_eq!(decoded.total_tile_memory(), Ok(0));
    }

    #[test]
    fn test_decoder_expect_count() {
        let decoder = ReportDecoder::new().expect_count(1, "one event");
        let records = vec![IpuTraceEvent::load_engine("m").to_record()];

        assert!(decoder.decode(&records).is_ok());
        assert!(decoder.decode(&[records[0].clone(), records[0].clone()]).is_err());
    }
}
