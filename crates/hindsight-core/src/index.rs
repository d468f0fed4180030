//! Overview index generation.
//!
//! The index is the one artifact the dashboard polls continuously, so it is
//! replaced atomically: serialize to a temp file next to the target, fsync,
//! then rename over it. A concurrent reader sees the old or the new index,
//! never a torn one.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::archive::ArchiveRecord;
use crate::config::MirrorDefaults;
use crate::error::{MirrorError, Result};

/// Summary of all archives currently present in the mirror.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverviewIndex {
    pub archives: Vec<OverviewEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverviewEntry {
    pub id: String,
    pub location: String,
    #[serde(rename = "last-synced")]
    pub last_synced: u64,
}

impl OverviewIndex {
    /// Build the index from the current record set, sorted by identifier.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ArchiveRecord>,
    {
        let mut archives: Vec<OverviewEntry> = records
            .into_iter()
            .map(|record| OverviewEntry {
                id: record.id.clone(),
                location: record.location.to_string(),
                last_synced: record.last_synced,
            })
            .collect();
        archives.sort_by(|a, b| a.id.cmp(&b.id));
        Self { archives }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.archives.iter().map(|entry| entry.id.as_str()).collect()
    }
}

/// Atomically replace the overview index under `web_dir`.
pub fn write_overview(web_dir: &Path, index: &OverviewIndex) -> Result<()> {
    let target = web_dir.join(MirrorDefaults::OVERVIEW_FILE);
    let temp = web_dir.join(format!(
        "{}.{}.tmp",
        MirrorDefaults::OVERVIEW_FILE,
        std::process::id()
    ));

    let serialized = serde_json::to_string_pretty(index)?;
    {
        let mut file =
            File::create(&temp).map_err(|e| MirrorError::io_with_path(e, &temp))?;
        file.write_all(serialized.as_bytes())
            .map_err(|e| MirrorError::io_with_path(e, &temp))?;
        file.sync_all()
            .map_err(|e| MirrorError::io_with_path(e, &temp))?;
    }
    fs::rename(&temp, &target).map_err(|e| MirrorError::io_with_path(e, &target))?;
    Ok(())
}

/// Read the overview index, or `None` if no cycle has completed yet.
pub fn read_overview(web_dir: &Path) -> Result<Option<OverviewIndex>> {
    let path = web_dir.join(MirrorDefaults::OVERVIEW_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(&path).map_err(|e| MirrorError::io_with_path(e, &path))?;
    Ok(Some(serde_json::from_str(&contents)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use url::Url;

    fn record(id: &str, cycle: u64) -> ArchiveRecord {
        ArchiveRecord {
            id: id.into(),
            location: Url::parse("file:///archives").unwrap(),
            last_synced: cycle,
        }
    }

    #[test]
    fn test_index_sorted_by_id() {
        let records = [record("job-b", 1), record("job-a", 2)];
        let index = OverviewIndex::from_records(records.iter());
        assert_eq!(index.ids(), vec!["job-a", "job-b"]);
    }

    #[test]
    fn test_write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let records = [record("job-a", 3)];
        let index = OverviewIndex::from_records(records.iter());

        write_overview(dir.path(), &index).unwrap();
        let read = read_overview(dir.path()).unwrap().unwrap();
        assert_eq!(read, index);
    }

    #[test]
    fn test_read_before_first_cycle() {
        let dir = TempDir::new().unwrap();
        assert!(read_overview(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_concurrent_reader_never_sees_torn_index() {
        let dir = TempDir::new().unwrap();
        let records = [record("job-a", 0)];
        write_overview(dir.path(), &OverviewIndex::from_records(records.iter())).unwrap();

        let writer_dir = dir.path().to_path_buf();
        let writer = std::thread::spawn(move || {
            for cycle in 1..=200u64 {
                let records: Vec<ArchiveRecord> = (0..20)
                    .map(|i| record(&format!("job-{i}"), cycle))
                    .collect();
                write_overview(&writer_dir, &OverviewIndex::from_records(records.iter()))
                    .unwrap();
            }
        });

        for _ in 0..200 {
            // a torn replacement would fail to parse here
            let index = read_overview(dir.path()).unwrap();
            assert!(index.is_some());
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let index = OverviewIndex::from_records(std::iter::empty());
        write_overview(dir.path(), &index).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![MirrorDefaults::OVERVIEW_FILE]);
    }
}
