// Copyright (c) 2026 Timbertrace
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Durable key-value storage for persisted batches and commitment records.
//!
//! A batch and its commitment record are written in one atomic commit, so a crash
//! never leaves a root without the batch that produced it.

use sled::transaction::ConflictableTransactionError;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened.
    #[error("db open")]
    DbOpen,
    /// A read, write or flush failed.
    #[error("db io")]
    DbIo,
    /// The transaction was aborted.
    #[error("tx conflict")]
    TxConflict,
    /// A writer panicked while holding the in-memory store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Store operation.
#[derive(Clone, Debug)]
pub enum KvOp {
    /// Put key/value.
    Put {
        /// Key.
        key: Vec<u8>,
        /// Value.
        value: Vec<u8>,
    },
    /// Delete key.
    Del {
        /// Key.
        key: Vec<u8>,
    },
}

impl KvOp {
    /// Convenience constructor for a put.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        KvOp::Put {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Minimal storage seam used by the commitment service.
pub trait KvStore {
    /// Get value.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    /// Apply all ops or none.
    fn commit_atomic(&self, ops: Vec<KvOp>) -> Result<(), StoreError>;
    /// Keys starting with `prefix`, ascending.
    fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError>;
}

/// sled-backed store.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open sled DB at path (directory).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|_| StoreError::DbOpen)?;
        Ok(Self { db })
    }

    /// Flush dirty pages to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().map(|_| ()).map_err(|_| StoreError::DbIo)
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let v = self.db.get(key).map_err(|_| StoreError::DbIo)?;
        Ok(v.map(|iv| iv.to_vec()))
    }

    fn commit_atomic(&self, ops: Vec<KvOp>) -> Result<(), StoreError> {
        let tree = &self.db;
        let res: Result<(), ConflictableTransactionError<StoreError>> = tree
            .transaction(|t| {
                for op in ops.iter() {
                    match op {
                        KvOp::Put { key, value } => {
                            t.insert(key.as_slice(), value.as_slice()).map_err(|_| {
                                ConflictableTransactionError::Abort(StoreError::DbIo)
                            })?;
                        }
                        KvOp::Del { key } => {
                            t.remove(key.as_slice()).map_err(|_| {
                                ConflictableTransactionError::Abort(StoreError::DbIo)
                            })?;
                        }
                    }
                }
                Ok(())
            })
            .map_err(|e| match e {
                sled::transaction::TransactionError::Abort(se) => {
                    ConflictableTransactionError::Abort(se)
                }
                sled::transaction::TransactionError::Storage(_) => {
                    ConflictableTransactionError::Abort(StoreError::DbIo)
                }
            });

        match res {
            Ok(()) => Ok(()),
            Err(ConflictableTransactionError::Abort(e)) => Err(e),
            Err(ConflictableTransactionError::Conflict) => Err(StoreError::TxConflict),
            Err(ConflictableTransactionError::Storage(_)) => Err(StoreError::DbIo),
        }
    }

    fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (k, _) = item.map_err(|_| StoreError::DbIo)?;
            out.push(k.to_vec());
        }
        Ok(out)
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let map = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn commit_atomic(&self, ops: Vec<KvOp>) -> Result<(), StoreError> {
        // Lock held across the whole batch.
        let mut map = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        for op in ops {
            match op {
                KvOp::Put { key, value } => {
                    map.insert(key, value);
                }
                KvOp::Del { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        let map = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
