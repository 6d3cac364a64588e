//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::LmdbError;

const DEFAULT_MAP_SIZE: usize = 1 << 30;
const MAX_DBS: u32 = 8;

/// Wraps the LMDB environment and all database handles.
#[derive(Clone)]
pub struct LmdbStore {
    pub(crate) env: Arc<Env>,
    pub(crate) events_db: Database<Bytes, Bytes>,
    pub(crate) members_db: Database<Bytes, Bytes>,
    pub(crate) delegations_db: Database<Bytes, Bytes>,
    pub(crate) transfers_db: Database<Bytes, Bytes>,
    pub(crate) posts_db: Database<Bytes, Bytes>,
    pub(crate) curation_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbStore {
    /// Open or create an environment at `path` with the default map size.
    pub fn open(path: &Path) -> Result<Self, LmdbError> {
        Self::open_with_map_size(path, DEFAULT_MAP_SIZE)
    }

    pub fn open_with_map_size(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)
            .map_err(|e| LmdbError::Heed(format!("create {}: {e}", path.display())))?;
        // SAFETY: the environment is opened once per process per path and
        // never memory-mapped by anyone else.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let events_db = env.create_database(&mut wtxn, Some("events"))?;
        let members_db = env.create_database(&mut wtxn, Some("members"))?;
        let delegations_db = env.create_database(&mut wtxn, Some("delegations"))?;
        let transfers_db = env.create_database(&mut wtxn, Some("transfers"))?;
        let posts_db = env.create_database(&mut wtxn, Some("posts"))?;
        let curation_db = env.create_database(&mut wtxn, Some("curation"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            events_db,
            members_db,
            delegations_db,
            transfers_db,
            posts_db,
            curation_db,
            meta_db,
        })
    }

    pub(crate) fn put_row<T: Serialize>(
        &self,
        db: Database<Bytes, Bytes>,
        key: &[u8],
        value: &T,
    ) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(value)?;
        let mut wtxn = self.env.write_txn()?;
        db.put(&mut wtxn, key, &bytes)?;
        wtxn.commit()?;
        Ok(())
    }

    pub(crate) fn get_row<T: DeserializeOwned>(
        &self,
        db: Database<Bytes, Bytes>,
        key: &[u8],
    ) -> Result<Option<T>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        match db.get(&rtxn, key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn delete_row(&self, db: Database<Bytes, Bytes>, key: &[u8]) -> Result<bool, LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        let existed = db.delete(&mut wtxn, key)?;
        wtxn.commit()?;
        Ok(existed)
    }

    /// All rows in key order.
    pub(crate) fn scan<T: DeserializeOwned>(
        &self,
        db: Database<Bytes, Bytes>,
    ) -> Result<Vec<T>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let mut out = Vec::new();
        for item in db.iter(&rtxn)? {
            let (_, bytes) = item?;
            out.push(bincode::deserialize(bytes)?);
        }
        Ok(out)
    }

    /// Rows whose key starts with `prefix`, in key order.
    pub(crate) fn scan_prefix<T: DeserializeOwned>(
        &self,
        db: Database<Bytes, Bytes>,
        prefix: &[u8],
    ) -> Result<Vec<T>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let mut out = Vec::new();
        for item in db.prefix_iter(&rtxn, prefix)? {
            let (_, bytes) = item?;
            out.push(bincode::deserialize(bytes)?);
        }
        Ok(out)
    }
}
