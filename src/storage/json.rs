//! JSON file storage implementation
//!
//! Each record is written as a pretty-printed `<id>.json` file in the output
//! directory.

use crate::storage::traits::{PageStore, StorageResult};
use crate::storage::PageRecord;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory of one JSON document per page
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (creating if needed) the output directory
    pub fn new(dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl PageStore for JsonFileStore {
    fn save(&self, record: &PageRecord) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(record)?;
        let target = self.record_path(&record.id);
        let tmp = self.dir.join(format!(".{}.json.tmp", record.id));

        // Write beside the target and rename over it
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp, &target)?;

        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<Option<PageRecord>> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&content)?))
    }

    fn count(&self) -> StorageResult<usize> {
        let mut count = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_record = path.extension().and_then(|ext| ext.to_str()) == Some("json")
                && !path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with('.'));
            if is_record {
                count += 1;
            }
        }
        Ok(count)
    }
}
