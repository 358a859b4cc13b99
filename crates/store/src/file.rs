use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::Storage;

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating storage directory {}", dir.display()))?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {key}")),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        // Write aside and rename so a reader never sees a half-written file.
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("writing {key}"))?;
        fs::rename(&tmp, &path).with_context(|| format!("replacing {key}"))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {key}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use busticket_models::BookingRecord;
    use testresult::TestResult;

    use super::*;
    use crate::{Slot, Store};

    #[test]
    fn records_survive_reopening() -> TestResult {
        let dir = tempfile::tempdir()?;
        Store::open(dir.path())?.put(Slot::Booking, &BookingRecord::sample())?;

        let reopened = Store::open(dir.path())?;

        assert_eq!(reopened.get(Slot::Booking), Some(BookingRecord::sample()));
        assert!(dir.path().join("busBookingData.json").exists());
        Ok(())
    }

    #[test]
    fn corrupt_file_reads_as_empty() -> TestResult {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("busTicketData.json"), "\u{0}garbage")?;
        let store = Store::open(dir.path())?;

        assert_eq!(store.get::<serde_json::Value>(Slot::Ticket), None);
        Ok(())
    }

    #[test]
    fn removing_a_missing_key_is_fine() -> TestResult {
        let dir = tempfile::tempdir()?;
        let storage = FileStorage::open(dir.path())?;

        storage.remove("busTicketData")?;
        Ok(())
    }

    #[test]
    fn open_creates_nested_directory() -> TestResult {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("a").join("b");

        FileStorage::open(&nested)?;

        assert!(nested.is_dir());
        Ok(())
    }
}
