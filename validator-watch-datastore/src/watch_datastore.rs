use crate::{Error, Result};
use rocksdb::{IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A single write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Put(String, Vec<u8>),
    Delete(String),
}

#[derive(Debug)]
pub struct WatchDatastore {
    db: DB,
    path: PathBuf,
    // keeps the directory of an in-memory store alive for as long as the db
    _temp_dir: Option<TempDir>,
}

impl WatchDatastore {
    pub fn new(path: &Path) -> Result<Self> {
        Self::create_in_directory(path)
    }

    pub fn create_in_directory(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db, path: path.to_path_buf(), _temp_dir: None })
    }

    // "in-memory" database
    pub fn create_in_memory() -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_allow_mmap_reads(false);
        opts.set_compression_type(rocksdb::DBCompressionType::None);
        let temp_dir = tempfile::tempdir()?;
        let temp_path = temp_dir.path().to_path_buf();
        let db = DB::open(&opts, &temp_path)?;
        Ok(Self { db, path: temp_path, _temp_dir: Some(temp_dir) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get_data_by_key(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    pub async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get_data_by_key(key).await? {
            Some(data) => Ok(Some(String::from_utf8(data)?)),
            None => Ok(None),
        }
    }

    pub async fn get_json<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
        match self.get_string(key).await? {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.db.put(key, value)?;
        Ok(())
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let data = serde_json::to_vec(value)?;
        self.put(key, &data).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.db.delete(key)?;
        Ok(())
    }

    /// Applies every op or none of them.
    pub async fn write_batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        let mut batch = WriteBatch::default();
        for op in ops {
            match op {
                BatchOp::Put(key, value) => batch.put(key, value),
                BatchOp::Delete(key) => batch.delete(key),
            }
        }
        self.db.write(batch)?;
        Ok(())
    }

    /// Iterates every key strictly below `prefix/`.
    pub fn iterator(&self, prefix: &str) -> impl Iterator<Item = Result<(Box<[u8]>, Box<[u8]>)>> + '_ {
        let mut readopts = rocksdb::ReadOptions::default();
        readopts.set_iterate_lower_bound(format!("{}/", prefix).as_bytes());
        readopts.set_iterate_upper_bound(format!("{}0", prefix).as_bytes());
        self.db
            .iterator_opt(IteratorMode::Start, readopts)
            .map(|result| result.map_err(|e| Error::Database(e.to_string())))
    }

    /// Returns the key suffixes found below `prefix/`.
    pub async fn child_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut children = Vec::new();
        for result in self.iterator(prefix) {
            let (key, _) = result?;
            let key_str = String::from_utf8(key.to_vec())?;
            if let Some(child) = key_str.strip_prefix(&format!("{}/", prefix)) {
                children.push(child.to_string());
            }
        }
        Ok(children)
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl Drop for WatchDatastore {
    fn drop(&mut self) {
        if let Err(e) = self.db.flush() {
            log::warn!("Failed to flush datastore at {}: {}", self.path.display(), e);
        }
    }
}
