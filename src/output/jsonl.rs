//! JSON Lines export and sink fan-out

use crate::listing::ListingRecord;
use crate::output::traits::{ListingSink, OutputResult};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// Appends one JSON object per listing to a file
pub struct JsonLinesSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Opens `path` for appending, creating it and its parent directory if needed
    pub fn open(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl ListingSink for JsonLinesSink {
    fn append(&self, _page_number: u32, records: &[ListingRecord]) -> OutputResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        for record in records {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        Ok(records.len())
    }
}

/// Writes every page to several sinks in turn
///
/// The first sink is the primary: its count is reported and its failure fails
/// the append. Once the primary has committed, failures in the other sinks are
/// logged and do not undo it.
pub struct FanOutSink {
    sinks: Vec<Box<dyn ListingSink>>,
}

impl FanOutSink {
    pub fn new(sinks: Vec<Box<dyn ListingSink>>) -> Self {
        Self { sinks }
    }
}

impl ListingSink for FanOutSink {
    fn append(&self, page_number: u32, records: &[ListingRecord]) -> OutputResult<usize> {
        let Some((primary, secondaries)) = self.sinks.split_first() else {
            return Ok(0);
        };

        let written = primary.append(page_number, records)?;
        for sink in secondaries {
            if let Err(e) = sink.append(page_number, records) {
                tracing::warn!(
                    "Secondary sink failed for {} listings from page {}: {}",
                    records.len(),
                    page_number,
                    e
                );
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::StrategyKind;
    use crate::output::traits::OutputError;
    use std::io::{BufRead, BufReader};

    fn record(vin: &str) -> ListingRecord {
        let mut r = ListingRecord::new("Chevrolet", "Malibu", StrategyKind::StructuredState);
        r.vin = Some(vin.to_string());
        r.location = Some("Austin, TX".to_string());
        r
    }

    fn read_lines(path: &Path) -> Vec<ListingRecord> {
        BufReader::new(File::open(path).unwrap())
            .lines()
            .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("listings.jsonl");
        let sink = JsonLinesSink::open(&path).unwrap();

        assert_eq!(sink.append(1, &[record("A"), record("B")]).unwrap(), 2);
        assert_eq!(sink.append(2, &[]).unwrap(), 0);
        assert_eq!(sink.append(2, &[record("C")]).unwrap(), 1);

        let lines = read_lines(&path);
        let vins: Vec<_> = lines.iter().map(|r| r.vin.clone().unwrap()).collect();
        assert_eq!(vins, vec!["A", "B", "C"]);
        assert_eq!(lines[0], record("A"));
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.jsonl");
        JsonLinesSink::open(&path).unwrap().append(1, &[record("A")]).unwrap();
        JsonLinesSink::open(&path).unwrap().append(1, &[record("B")]).unwrap();
        assert_eq!(read_lines(&path).len(), 2);
    }

    #[test]
    fn test_fan_out_writes_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.jsonl");
        let second = dir.path().join("b.jsonl");
        let sink = FanOutSink::new(vec![
            Box::new(JsonLinesSink::open(&first).unwrap()),
            Box::new(JsonLinesSink::open(&second).unwrap()),
        ]);

        assert_eq!(sink.append(1, &[record("A")]).unwrap(), 1);
        assert_eq!(read_lines(&first).len(), 1);
        assert_eq!(read_lines(&second).len(), 1);
    }

    struct BrokenSink;

    impl ListingSink for BrokenSink {
        fn append(&self, _page_number: u32, _records: &[ListingRecord]) -> OutputResult<usize> {
            Err(OutputError::Write("read-only filesystem".to_string()))
        }
    }

    #[test]
    fn test_secondary_failure_keeps_primary_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        let sink = FanOutSink::new(vec![
            Box::new(JsonLinesSink::open(&path).unwrap()),
            Box::new(BrokenSink),
        ]);

        assert_eq!(sink.append(1, &[record("A"), record("B")]).unwrap(), 2);
        assert_eq!(read_lines(&path).len(), 2);
    }

    #[test]
    fn test_primary_failure_fails_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.jsonl");
        let sink = FanOutSink::new(vec![
            Box::new(BrokenSink),
            Box::new(JsonLinesSink::open(&path).unwrap()),
        ]);

        assert!(sink.append(1, &[record("A")]).is_err());
        assert!(read_lines(&path).is_empty());
    }
}
