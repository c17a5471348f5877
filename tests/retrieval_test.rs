//! End-to-end retrieval tests: round trips and not-found paths

use std::path::PathBuf;
use tempfile::{tempdir, TempDir};
use tsblock::ingest::parse_record;
use tsblock::{Engine, Record, StorageConfig, StorageError};

fn write_source(dir: &TempDir, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

/// Irregular timestamps with a varying number of values per line
fn mixed_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let timestamp = 1_700_000_000_000i64 + (i as i64) * 250 - 3;
            let values: Vec<String> = (0..(i % 4)).map(|v| format!("{}", v as i64 - 1)).collect();
            if values.is_empty() {
                timestamp.to_string()
            } else {
                format!("{},{}", timestamp, values.join(","))
            }
        })
        .collect()
}

#[tokio::test]
async fn test_round_trip_per_block() {
    let dir = tempdir().unwrap();
    let lines = mixed_lines(53);
    let source = write_source(&dir, "mixed.txt", &lines);
    let mut engine = Engine::new(StorageConfig::new(dir.path().join("data")).block_size(10)).unwrap();

    let outcome = engine.ingest(&source).await.unwrap();

    for descriptor in &outcome.blocks {
        let block = engine.fetch_block(&source, descriptor.number).await.unwrap();

        let expected: Vec<Record> = lines
            [descriptor.start_offset as usize..descriptor.end_offset as usize]
            .iter()
            .map(|l| parse_record(l, ',').unwrap())
            .collect();

        assert_eq!(block.number, descriptor.number);
        assert_eq!(block.records, expected);
    }
}

#[tokio::test]
async fn test_timestamp_path_matches_number_path() {
    let dir = tempdir().unwrap();
    let lines = mixed_lines(30);
    let source = write_source(&dir, "mixed.txt", &lines);
    let mut engine = Engine::new(StorageConfig::new(dir.path().join("data")).block_size(8)).unwrap();

    let outcome = engine.ingest(&source).await.unwrap();

    for descriptor in &outcome.blocks {
        let first_line = &lines[descriptor.start_offset as usize];
        let timestamp = parse_record(first_line, ',').unwrap().timestamp;

        let number = engine.resolve(&source, timestamp).unwrap().unwrap();
        let by_timestamp = engine.fetch_block_by_timestamp(&source, timestamp).await.unwrap();
        let by_number = engine.fetch_block(&source, number).await.unwrap();

        assert_eq!(by_timestamp, by_number);
        assert_eq!(by_timestamp.records[0].timestamp, timestamp);
    }
}

#[tokio::test]
async fn test_repeated_reads_are_identical() {
    let dir = tempdir().unwrap();
    let source = write_source(&dir, "mixed.txt", &mixed_lines(12));
    let mut engine = Engine::new(StorageConfig::new(dir.path().join("data")).block_size(5)).unwrap();
    engine.ingest(&source).await.unwrap();

    let first = engine.fetch_block(&source, 1).await.unwrap();
    let second = engine.fetch_block(&source, 1).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_not_found_paths() {
    let dir = tempdir().unwrap();
    let source = write_source(&dir, "mixed.txt", &mixed_lines(5));
    let mut engine = Engine::new(StorageConfig::new(dir.path().join("data")).block_size(5)).unwrap();
    engine.ingest(&source).await.unwrap();

    let err = engine.fetch_block(&source, 1).await.unwrap_err();
    assert!(matches!(err, StorageError::BlockNotFound(1)));
    assert!(err.is_not_found());

    let err = engine.fetch_block_by_timestamp(&source, 42).await.unwrap_err();
    assert!(matches!(err, StorageError::TimestampNotFound(42)));

    // a source that was never ingested has an empty store
    let err = engine.fetch_block("never_seen", 0).await.unwrap_err();
    assert!(matches!(err, StorageError::BlockNotFound(0)));
}

#[tokio::test]
async fn test_deleted_block_file() {
    let dir = tempdir().unwrap();
    let source = write_source(&dir, "mixed.txt", &mixed_lines(10));
    let mut engine = Engine::new(StorageConfig::new(dir.path().join("data")).block_size(5)).unwrap();

    let outcome = engine.ingest(&source).await.unwrap();
    std::fs::remove_file(&outcome.blocks[1].file_path).unwrap();

    assert!(engine.fetch_block(&source, 0).await.is_ok());
    let err = engine.fetch_block(&source, 1).await.unwrap_err();
    assert!(matches!(err, StorageError::BlockNotFound(1)));

    let stats = engine.stats(&source).unwrap();
    assert_eq!(stats.blocks, 2);
    assert_eq!(stats.missing_blocks, 1);
}

#[tokio::test]
async fn test_read_from_second_engine() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let source = write_source(&dir, "mixed.txt", &mixed_lines(7));

    let expected = {
        let mut writer = Engine::new(StorageConfig::new(&data_dir).block_size(3)).unwrap();
        writer.ingest(&source).await.unwrap();
        writer.fetch_block(&source, 2).await.unwrap()
    };

    let mut reader = Engine::new(StorageConfig::new(&data_dir).block_size(3)).unwrap();
    let block = reader.fetch_block("mixed", 2).await.unwrap();
    assert_eq!(block, expected);
    assert_eq!(block.records.len(), 1);
}
