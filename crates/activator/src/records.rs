//! Append-only activation audit trail.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One verification call, success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub name: Option<String>,
    pub role: Option<String>,
    pub isp: Option<String>,
    /// Normalized login once normalization ran, raw input before that.
    pub username: Option<String>,
    pub success: bool,
    pub ip: Option<String>,
    pub mac: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    pub iface: Option<String>,
}

#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn append(&self, record: &ActivationRecord) -> io::Result<()>;
}

/// Writes one JSON object per line.
pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl RecordSink for JsonlSink {
    async fn append(&self, record: &ActivationRecord) -> io::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await
    }
}

/// In-memory sink for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    records: std::sync::Mutex<Vec<ActivationRecord>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn records(&self) -> Vec<ActivationRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl RecordSink for MemorySink {
    async fn append(&self, record: &ActivationRecord) -> io::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn record(username: &str) -> ActivationRecord {
        ActivationRecord {
            name: Some("Li Si".into()),
            role: Some("student".into()),
            isp: Some("cdu".into()),
            username: Some(username.into()),
            success: false,
            ip: None,
            mac: Some("02:11:22:33:44:55".into()),
            error_code: Some("815".into()),
            error_message: Some("connection failed, no IP address obtained".into()),
            timestamp: "2026-03-01 12:00:00".into(),
            iface: Some("eth0.100".into()),
        }
    }

    #[tokio::test]
    async fn appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/activations.jsonl");
        let sink = JsonlSink::new(path.clone());

        sink.append(&record("a@cdu")).await.unwrap();
        sink.append(&record("b@cdu")).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Vec<ActivationRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed, vec![record("a@cdu"), record("b@cdu")]);
    }

    #[tokio::test]
    async fn record_json_uses_null_for_absent_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        JsonlSink::new(path.clone())
            .append(&record("a@cdu"))
            .await
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(tokio::fs::read_to_string(&path).await.unwrap().trim()).unwrap();
        assert!(value["ip"].is_null());
        assert_eq!(value["error_code"], "815");
        assert_eq!(value["timestamp"], "2026-03-01 12:00:00");
    }

    #[tokio::test]
    async fn concurrent_appends_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activations.jsonl");
        let sink = Arc::new(JsonlSink::new(path.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..32 {
            let sink = Arc::clone(&sink);
            tasks.spawn(async move { sink.append(&record(&format!("user{i}@cdu"))).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 32);
        for line in lines {
            serde_json::from_str::<ActivationRecord>(line).unwrap();
        }
    }
}
