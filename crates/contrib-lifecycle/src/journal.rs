//! Append-only JSONL journal of lifecycle events

use crate::events::EventEnvelope;
use anyhow::{Context, Result};
use contrib_core::types::ContributionId;
use fs4::fs_std::FileExt;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default number of events shown by `log`
pub const DEFAULT_HISTORY_LIMIT: usize = 25;

pub struct EventJournal {
    path: PathBuf,
}

impl EventJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event under an exclusive file lock
    pub fn append(&self, envelope: &EventEnvelope) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create journal parent directory")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context("Failed to open journal file")?;

        // Released when `file` is dropped
        file.lock_exclusive()
            .context("Failed to acquire exclusive lock on journal")?;

        let line = serde_json::to_string(envelope).context("Failed to serialize event")?;
        writeln!(file, "{}", line).context("Failed to write event to journal")?;
        file.sync_all().context("Failed to sync journal file")?;

        Ok(())
    }

    /// Events in chronological order, optionally for one contribution.
    /// With a limit, the most recent `limit` events are returned.
    pub fn history(
        &self,
        contribution: Option<&ContributionId>,
        limit: Option<usize>,
    ) -> Result<Vec<EventEnvelope>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path).context("Failed to open journal file")?;
        let reader = BufReader::new(file);

        let mut events = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read line from journal")?;
            if line.trim().is_empty() {
                continue;
            }

            // A torn line from a crashed writer should not hide the rest
            let envelope: EventEnvelope = match serde_json::from_str(&line) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!("Skipping unreadable journal line {}: {}", index + 1, e);
                    continue;
                }
            };

            if contribution.is_none_or(|id| &envelope.contribution == id) {
                events.push(envelope);
            }
        }

        if let Some(limit) = limit {
            let skip = events.len().saturating_sub(limit);
            events.drain(..skip);
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ContributionState, LifecycleEvent};
    use contrib_core::types::ContributionType;
    use tempfile::TempDir;

    fn envelope(name: &str, version: &str) -> EventEnvelope {
        EventEnvelope::new(
            ContributionId::new(ContributionType::Library, name),
            Some(ContributionState::Available),
            ContributionState::Installed,
            LifecycleEvent::InstallCompleted {
                version: version.to_string(),
                duration_secs: 1,
            },
        )
    }

    #[test]
    fn test_missing_journal_is_empty() {
        let temp = TempDir::new().unwrap();
        let journal = EventJournal::new(temp.path().join("lifecycle.jsonl"));
        assert!(journal.history(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_append_and_filter() {
        let temp = TempDir::new().unwrap();
        let journal = EventJournal::new(temp.path().join("nested/lifecycle.jsonl"));

        journal.append(&envelope("sound", "1.0")).unwrap();
        journal.append(&envelope("video", "2.0")).unwrap();
        journal.append(&envelope("sound", "1.1")).unwrap();

        let all = journal.history(None, None).unwrap();
        assert_eq!(all.len(), 3);

        let sound = ContributionId::new(ContributionType::Library, "sound");
        let sound_events = journal.history(Some(&sound), None).unwrap();
        assert_eq!(sound_events.len(), 2);
        assert!(sound_events.iter().all(|e| e.contribution == sound));
    }

    #[test]
    fn test_limit_keeps_most_recent() {
        let temp = TempDir::new().unwrap();
        let journal = EventJournal::new(temp.path().join("lifecycle.jsonl"));
        for version in ["1", "2", "3"] {
            journal.append(&envelope("sound", version)).unwrap();
        }

        let tail = journal.history(None, Some(2)).unwrap();
        let versions: Vec<_> = tail
            .iter()
            .map(|e| match &e.event {
                LifecycleEvent::InstallCompleted { version, .. } => version.clone(),
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(versions, vec!["2", "3"]);
    }

    #[test]
    fn test_corrupt_line_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lifecycle.jsonl");
        let journal = EventJournal::new(&path);
        journal.append(&envelope("sound", "1.0")).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{\"event_id\": \"trunc").unwrap();
        drop(file);
        journal.append(&envelope("sound", "1.1")).unwrap();

        assert_eq!(journal.history(None, None).unwrap().len(), 2);
    }
}
