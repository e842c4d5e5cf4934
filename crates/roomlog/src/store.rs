use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use {
    async_trait::async_trait,
    fd_lock::RwLock,
    pineapple_channels::{
        Error, Result,
        message_log::{MessageLog, MessageLogEntry},
    },
    tracing::trace,
};

/// Append-only per-room text logs with file locking.
pub struct FlatFileLog {
    base_dir: PathBuf,
    marker: String,
}

impl FlatFileLog {
    /// `base_dir` must already exist; appends fail otherwise.
    pub fn new(base_dir: impl Into<PathBuf>, marker: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            marker: marker.into(),
        }
    }

    pub fn path_for(&self, room: &str) -> PathBuf {
        self.base_dir.join(format!("{room}.txt"))
    }

    /// Render an entry as its log line (without the trailing newline).
    pub fn format_line(&self, entry: &MessageLogEntry) -> String {
        if entry.from_self {
            format!("{}{}", self.marker, entry.body)
        } else {
            entry.body.clone()
        }
    }
}

#[async_trait]
impl MessageLog for FlatFileLog {
    async fn append(&self, entry: MessageLogEntry) -> Result<()> {
        let path = self.path_for(&entry.room);
        let line = self.format_line(&entry);
        let room = entry.room;

        let written = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let mut lock = RwLock::new(file);
            let mut guard = lock.write()?;
            writeln!(*guard, "{line}")?;
            Ok(())
        })
        .await
        .map_err(|e| Error::external("room log append task", e))?;

        written.map_err(|e| Error::log(room.as_str(), e))?;
        trace!(room = %room, "appended room log line");
        Ok(())
    }

    fn list_rooms(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.base_dir) else {
            return vec![];
        };
        let mut rooms: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.strip_suffix(".txt").map(str::to_owned)
            })
            .collect();
        rooms.sort();
        rooms
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::sync::Arc};

    const MARK: &str = "SOME_SECRET";

    fn temp_log() -> (FlatFileLog, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let log = FlatFileLog::new(dir.path(), MARK);
        (log, dir)
    }

    #[tokio::test]
    async fn append_writes_one_line_per_message() {
        let (log, _dir) = temp_log();
        log.append(MessageLogEntry::new("matrix_room", "hello", false))
            .await
            .unwrap();
        log.append(MessageLogEntry::new("matrix_room", "hi back", true))
            .await
            .unwrap();

        let raw = fs::read_to_string(log.path_for("matrix_room")).unwrap();
        assert_eq!(raw, format!("hello\n{MARK}hi back\n"));
    }

    #[tokio::test]
    async fn appends_keep_order() {
        let (log, _dir) = temp_log();
        for (body, own) in [("one", false), ("two", true), ("three", false)] {
            log.append(MessageLogEntry::new("r", body, own)).await.unwrap();
        }
        let raw = fs::read_to_string(log.path_for("r")).unwrap();
        assert_eq!(raw, format!("one\n{MARK}two\nthree\n"));
    }

    #[tokio::test]
    async fn missing_base_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = FlatFileLog::new(dir.path().join("does-not-exist"), MARK);
        let err = log
            .append(MessageLogEntry::new("r", "lost", false))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Log { .. }));
    }

    #[tokio::test]
    async fn concurrent_appends_do_not_interleave() {
        let (log, _dir) = temp_log();
        let log = Arc::new(log);
        let mut handles = Vec::new();
        for i in 0..32 {
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move {
                log.append(MessageLogEntry::new("busy", format!("message number {i}"), false))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let raw = fs::read_to_string(log.path_for("busy")).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 32);
        assert!(lines.iter().all(|l| l.starts_with("message number ")));
    }

    #[tokio::test]
    async fn list_rooms_only_sees_txt_files() {
        let (log, dir) = temp_log();
        log.append(MessageLogEntry::new("matrix_b", "x", false))
            .await
            .unwrap();
        log.append(MessageLogEntry::new("matrix_a", "y", false))
            .await
            .unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        assert_eq!(log.list_rooms(), vec!["matrix_a", "matrix_b"]);
    }

    #[test]
    fn format_line_marks_own_messages() {
        let log = FlatFileLog::new("/unused", MARK);
        assert_eq!(
            log.format_line(&MessageLogEntry::new("r", "me", true)),
            format!("{MARK}me")
        );
        assert_eq!(log.format_line(&MessageLogEntry::new("r", "you", false)), "you");
    }
}
