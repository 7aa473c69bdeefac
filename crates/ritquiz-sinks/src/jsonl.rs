//! Append-only JSON-lines result store.
//!
//! One session record per line. Writers append under a lock, so concurrent
//! sessions sharing a sink never interleave partial lines.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use ritquiz_core::record::SessionRecord;
use ritquiz_core::traits::ResultSink;

use crate::error::SinkError;

/// Appends session records to a `.jsonl` file.
pub struct JsonLinesSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, creating the file and its parent directory if needed.
    pub async fn write_record(&self, record: &SessionRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SinkError::io(parent, e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| SinkError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SinkError::io(&self.path, e))?;
        file.flush().await.map_err(|e| SinkError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), id = %record.id, "record appended");
        Ok(())
    }
}

#[async_trait]
impl ResultSink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn append(&self, record: &SessionRecord) -> anyhow::Result<()> {
        self.write_record(record).await?;
        Ok(())
    }
}

/// Read every record from a JSON-lines file. A missing file holds no records.
pub fn load_records(path: &Path) -> Result<Vec<SessionRecord>, SinkError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SinkError::io(path, e)),
    };

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| SinkError::Corrupt {
                path: path.to_path_buf(),
                line: i + 1,
                source,
            })
        })
        .collect()
}

/// Find the record whose id equals or uniquely starts with `id_or_prefix`.
pub fn find_record<'a>(
    records: &'a [SessionRecord],
    id_or_prefix: &str,
) -> anyhow::Result<&'a SessionRecord> {
    let wanted = id_or_prefix.trim().to_ascii_lowercase();
    anyhow::ensure!(!wanted.is_empty(), "session id must not be empty");

    let matches: Vec<&SessionRecord> = records
        .iter()
        .filter(|r| r.id.to_string().starts_with(&wanted))
        .collect();

    match matches.as_slice() {
        [one] => Ok(one),
        [] => anyhow::bail!("no session matches '{id_or_prefix}'"),
        many => anyhow::bail!(
            "'{id_or_prefix}' is ambiguous ({} sessions match)",
            many.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(username: &str, id: &str) -> SessionRecord {
        SessionRecord {
            id: uuid::Uuid::parse_str(id).unwrap(),
            username: username.into(),
            grade_level: "Grade 7".into(),
            strands_selected: vec!["Algebra".into()],
            starting_rit: 200,
            final_rit: 210,
            rit_history: vec![210],
            questions_answered: vec!["Q1".into()],
            score_correct: 1,
            score_total: 1,
            points: vec![],
            started_at: None,
            timestamp: chrono::Utc::now(),
        }
    }

    const ID_A: &str = "aaaaaaaa-0000-4000-8000-000000000001";
    const ID_B: &str = "aaaabbbb-0000-4000-8000-000000000002";

    #[tokio::test]
    async fn appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results/sessions.jsonl");
        let sink = JsonLinesSink::new(&path);

        sink.append(&record("ada", ID_A)).await.unwrap();
        sink.append(&record("bob", ID_B)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].username, "ada");
        assert_eq!(records[1].username, "bob");
    }

    #[tokio::test]
    async fn concurrent_appends_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.jsonl");
        let sink = Arc::new(JsonLinesSink::new(&path));

        let mut handles = Vec::new();
        for i in 0..16 {
            let sink = Arc::clone(&sink);
            handles.push(tokio::spawn(async move {
                sink.append(&record(&format!("user-{i}"), ID_A)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(load_records(&path).unwrap().len(), 16);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records = load_records(&dir.path().join("nope.jsonl")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn corrupt_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.jsonl");
        let good = serde_json::to_string(&record("ada", ID_A)).unwrap();
        std::fs::write(&path, format!("{good}\n\nnot json\n")).unwrap();

        match load_records(&path).unwrap_err() {
            SinkError::Corrupt { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn find_by_prefix() {
        let records = vec![record("ada", ID_A), record("bob", ID_B)];

        assert_eq!(find_record(&records, ID_B).unwrap().username, "bob");
        assert_eq!(find_record(&records, "aaaaaaaa").unwrap().username, "ada");
        assert_eq!(find_record(&records, "AAAAB").unwrap().username, "bob");

        let err = find_record(&records, "aaaa").unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
        assert!(find_record(&records, "ffff").is_err());
        assert!(find_record(&records, "  ").is_err());
    }
}
