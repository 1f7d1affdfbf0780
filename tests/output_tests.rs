use ipu_trace_report::output::{read_summary, to_summary, write_summary};
use ipu_trace_report::parser::{decode_events, IpuTraceEvent};
use ipu_trace_report::utils::config::SCHEMA_VERSION;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_summary_of_compiled_run() {
    let report = json!({
        "target": {"numIPUs": 2, "numTiles": 4},
        "memory": {
            "byTile": {"total": [10, 20, 30, 40]},
            "liveness": {"alwaysLive": {"bytesByTile": [1, 1, 1, 1]}}
        },
        "vertexTypes": {"names": ["v0", "v1", "v2"]},
        "computeSets": {"names": ["cs0", "cs1"]},
        "programs": [{"type": "Sequence", "name": "main"}]
    });
    let records = vec![
        IpuTraceEvent::compile_end("m", &report.to_string(), "").to_record(),
        IpuTraceEvent::execute("m", r#"{"cycles": 5}"#).to_record(),
        IpuTraceEvent::execute("m", "").to_record(),
    ];
    let decoded = decode_events(&records, None, "").unwrap();

    let summary = to_summary(&decoded, "run.bin");

    assert_eq!(summary.version, SCHEMA_VERSION);
    assert_eq!(summary.source, "run.bin");
    assert_eq!(summary.event_counts["COMPILE_END"], 1);
    assert_eq!(summary.event_counts["EXECUTE"], 2);
    assert_eq!(summary.num_ipus, Some(2));
    assert_eq!(summary.tiles_per_ipu, Some(2.0));
    assert_eq!(summary.compute_set_count, 2);
    assert_eq!(summary.vertex_type_count, 3);
    assert_eq!(summary.program_count, 1);
    assert_eq!(summary.execution_report_count, 1);

    let memory = summary.memory.as_ref().unwrap();
    assert_eq!(memory.total, 100);
    assert_eq!(memory.max, 40);
    assert_eq!(memory.busiest_tile, Some(3));
}

#[test]
fn test_summary_file_round_trip() {
    let records = vec![IpuTraceEvent::load_engine("m").to_record()];
    let decoded = decode_events(&records, None, "").unwrap();
    let summary = to_summary(&decoded, "engine.bin");

    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("reports/summary.json");

    write_summary(&summary, &path).unwrap();
    let loaded = read_summary(&path).unwrap();

    assert_eq!(loaded, summary);
}

#[test]
fn test_read_summary_rejects_garbage() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("summary.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(read_summary(&path).is_err());
}
