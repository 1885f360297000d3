use std::fs::File;
use std::path::Path;

use parking_lot::Mutex;

use crate::errors::SinkError;

/// Destination for rows coming out of the bulk loader
///
/// `insert` is called concurrently from every worker; implementations
/// serialize internally as needed.
pub trait RecordSink: Send + Sync {
    /// Store one row whose fields line up with `headers`
    fn insert(&self, headers: &[String], row: &[String]) -> Result<(), SinkError>;

    /// Make stored rows durable
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

struct CsvSinkState {
    writer: csv::Writer<File>,
    header_written: bool,
}

/// Appends accepted rows to a CSV file, header first
pub struct CsvSink {
    state: Mutex<CsvSinkState>,
}

impl CsvSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let writer = csv::Writer::from_path(path)?;
        Ok(Self { state: Mutex::new(CsvSinkState { writer, header_written: false }) })
    }
}

impl RecordSink for CsvSink {
    fn insert(&self, headers: &[String], row: &[String]) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if !state.header_written {
            state.writer.write_record(headers)?;
            state.header_written = true;
        }
        state.writer.write_record(row)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.state.lock().writer.flush()?;
        Ok(())
    }
}

/// Keeps rows in memory
#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<Vec<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows stored so far, in insertion order
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

impl RecordSink for MemorySink {
    fn insert(&self, headers: &[String], row: &[String]) -> Result<(), SinkError> {
        if row.len() != headers.len() {
            return Err(SinkError::Rejected(format!("expected {} fields, got {}", headers.len(), row.len())));
        }
        self.rows.lock().push(row.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        vec!["ID".to_string(), "Name".to_string()]
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.insert(&headers(), &["1".to_string(), "Niki".to_string()]).unwrap();
        assert_eq!(sink.rows(), vec![vec!["1".to_string(), "Niki".to_string()]]);

        let err = sink.insert(&headers(), &["2".to_string()]).unwrap_err();
        assert!(matches!(err, SinkError::Rejected(_)));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_csv_sink_writes_header_once() {
        let path = std::env::temp_dir().join(format!("tb_app_sink_{}.csv", std::process::id()));
        let sink = CsvSink::create(&path).unwrap();

        sink.insert(&headers(), &["1".to_string(), "Niki".to_string()]).unwrap();
        sink.insert(&headers(), &["2".to_string(), "Jojo".to_string()]).unwrap();
        sink.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "ID,Name\n1,Niki\n2,Jojo\n");
        let _ = std::fs::remove_file(path);
    }
}
