//! Framing of trace record streams.
//!
//! A trace file is a plain concatenation of records, each prefixed by its
//! length as a protobuf varint (the standard length-delimited framing).

use crate::utils::config::MAX_RECORD_SIZE;
use crate::utils::error::RecordError;
use log::{debug, info};
use std::fs;
use std::path::Path;

/// Split a length-delimited byte stream into individual records
///
/// # Errors
/// * `RecordError::Protobuf` - malformed length prefix
/// * `RecordError::TooLarge` - a prefix exceeds `MAX_RECORD_SIZE`
/// * `RecordError::Truncated` - the stream ends inside a record
pub fn split_length_delimited(mut data: &[u8]) -> Result<Vec<Vec<u8>>, RecordError> {
    let mut records = Vec::new();

    while !data.is_empty() {
        let len = prost::decode_length_delimiter(&mut data)?;

        if len > MAX_RECORD_SIZE {
            return Err(RecordError::TooLarge(len));
        }
        if len > data.len() {
            return Err(RecordError::Truncated {
                expected: len,
                available: data.len(),
            });
        }

        let (record, rest) = data.split_at(len);
        records.push(record.to_vec());
        data = rest;
    }

    Ok(records)
}

/// Frame records into a single length-delimited byte stream
pub fn encode_length_delimited<R: AsRef<[u8]>>(records: &[R]) -> Vec<u8> {
    let mut out = Vec::new();

    for record in records {
        let record = record.as_ref();
        // Vec<u8> grows on demand, so encoding the delimiter cannot run out of space
        let _ = prost::encode_length_delimiter(record.len(), &mut out);
        out.extend_from_slice(record);
    }

    out
}

/// Read every record from a trace file
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<Vec<u8>>, RecordError> {
    let path = path.as_ref();

    debug!("Reading trace records from: {}", path.display());

    let data = fs::read(path)?;
    let records = split_length_delimited(&data)?;

    info!(
        "Read {} trace records ({} bytes) from {}",
        records.len(),
        data.len(),
        path.display()
    );

    Ok(records)
}

/// Write records to a trace file, replacing any existing content
pub fn write_records<R: AsRef<[u8]>>(
    path: impl AsRef<Path>,
    records: &[R],
) -> Result<(), RecordError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(path, encode_length_delimited(records))?;
    debug!("Wrote {} trace records to {}", records.len(), path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_multiple_records() {
        let stream = encode_length_delimited(&[b"abc".to_vec(), Vec::new(), vec![7u8; 200]]);
        let records = split_length_delimited(&stream).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0], b"abc");
        assert!(records[1].is_empty());
        assert_eq!(records[2].len(), 200);
    }

    #[test]
    fn test_empty_stream() {
        assert!(split_length_delimited(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_record() {
        let mut stream = encode_length_delimited(&[b"abcdef".to_vec()]);
        stream.truncate(4);

        let err = split_length_delimited(&stream).unwrap_err();
        assert!(matches!(
            err,
            RecordError::Truncated {
                expected: 6,
                available: 3
            }
        ));
    }

    #[test]
    fn test_oversized_prefix() {
        let mut stream = Vec::new();
        prost::encode_length_delimiter(MAX_RECORD_SIZE + 1, &mut stream).unwrap();

        let err = split_length_delimited(&stream).unwrap_err();
        assert!(matches!(err, RecordError::TooLarge(_)));
    }

    #[test]
    fn test_write_and_read_records() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/trace.bin");

        write_records(&path, &[b"one".to_vec(), b"two".to_vec()]).unwrap();
        let records = read_records(&path).unwrap();

        assert_eq!(records, vec![b"one".to_vec(), b"two".to_vec()]);
    }
}
