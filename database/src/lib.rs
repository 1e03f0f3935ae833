//! A compressed key-value store with two interchangeable backings:
//! `libmdbx` on disk and an ordered map in memory for tests. Writes are
//! committed before `put` returns, which is what makes the block and state
//! stores crash-consistent.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use bytesize::ByteSize;
use im::OrdMap;
use libmdbx::{DatabaseFlags, Environment, Geometry, WriteFlags};
use snap::raw::{Decoder, Encoder};

const GROWTH_STEP: ByteSize = ByteSize::mib(256);
const MAX_NAMED_DATABASES: usize = 4;

#[derive(Clone, Copy)]
pub enum DatabaseMode {
    ReadOnly,
    ReadWrite,
}

impl DatabaseMode {
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::ReadOnly)
    }

    // Zero permissions mean "open existing, do not create".
    const fn mode_permissions(self) -> u16 {
        match self {
            Self::ReadOnly => 0,
            Self::ReadWrite => 0o600,
        }
    }

    #[must_use]
    #[cfg(target_os = "linux")]
    pub fn permissions(self) -> u32 {
        self.mode_permissions().into()
    }

    #[must_use]
    #[cfg(not(target_os = "linux"))]
    pub const fn permissions(self) -> u16 {
        self.mode_permissions()
    }
}

pub enum Database {
    Persistent(PersistentDatabase),
    InMemory(InMemoryDatabase),
}

impl Database {
    pub fn persistent(
        name: &str,
        directory: impl AsRef<Path>,
        max_size: ByteSize,
        mode: DatabaseMode,
    ) -> Result<Self> {
        PersistentDatabase::open(name, directory, max_size, mode).map(Self::Persistent)
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::InMemory(InMemoryDatabase::default())
    }

    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        match self {
            Self::Persistent(database) => database.contains_key(key.as_ref()),
            Self::InMemory(database) => Ok(database.map().contains_key(key.as_ref())),
        }
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        let compressed = match self {
            Self::Persistent(database) => database.get(key.as_ref())?,
            Self::InMemory(database) => database.map().get(key.as_ref()).map(|value| value.to_vec()),
        };

        compressed.as_deref().map(decompress).transpose()
    }

    pub fn put(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        self.put_batch(core::iter::once((key, value)))
    }

    pub fn put_batch(
        &self,
        pairs: impl IntoIterator<Item = (impl AsRef<[u8]>, impl AsRef<[u8]>)>,
    ) -> Result<()> {
        match self {
            Self::Persistent(database) => database.put_batch(pairs),
            Self::InMemory(database) => {
                // One batch is one atomic swap, like a transaction commit.
                let mut map = database.map();
                let mut new_map = map.clone();

                for (key, value) in pairs {
                    new_map.insert(key.as_ref().into(), compress(value.as_ref())?.into());
                }

                *map = new_map;

                Ok(())
            }
        }
    }

    pub fn delete(&self, key: impl AsRef<[u8]>) -> Result<()> {
        match self {
            Self::Persistent(database) => database.delete(key.as_ref()),
            Self::InMemory(database) => {
                database.map().remove(key.as_ref());
                Ok(())
            }
        }
    }
}

pub struct PersistentDatabase {
    name: String,
    environment: Environment,
}

impl PersistentDatabase {
    fn open(
        name: &str,
        directory: impl AsRef<Path>,
        max_size: ByteSize,
        mode: DatabaseMode,
    ) -> Result<Self> {
        if !mode.is_read_only() {
            fs_err::create_dir_all(&directory)?;
        }

        let environment = Environment::builder()
            .set_max_dbs(MAX_NAMED_DATABASES)
            .set_geometry(Geometry {
                size: Some(..usize::try_from(max_size.as_u64())?),
                growth_step: Some(isize::try_from(GROWTH_STEP.as_u64())?),
                shrink_threshold: None,
                page_size: None,
            })
            .open_with_permissions(directory.as_ref(), mode.permissions())?;

        let database = Self {
            name: name.to_owned(),
            environment,
        };

        if !mode.is_read_only() {
            let transaction = database.environment.begin_rw_txn()?;

            if transaction.open_db(Some(name)).is_err() {
                transaction.create_db(Some(name), DatabaseFlags::default())?;
            }

            transaction.commit()?;
        }

        Ok(database)
    }

    fn contains_key(&self, key: &[u8]) -> Result<bool> {
        let transaction = self.environment.begin_ro_txn()?;
        let database = transaction.open_db(Some(&self.name))?;

        Ok(transaction.get::<()>(database.dbi(), key)?.is_some())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let transaction = self.environment.begin_ro_txn()?;
        let database = transaction.open_db(Some(&self.name))?;

        Ok(transaction.get::<Vec<u8>>(database.dbi(), key)?)
    }

    fn put_batch(
        &self,
        pairs: impl IntoIterator<Item = (impl AsRef<[u8]>, impl AsRef<[u8]>)>,
    ) -> Result<()> {
        let transaction = self.environment.begin_rw_txn()?;
        let database = transaction.open_db(Some(&self.name))?;

        for (key, value) in pairs {
            let compressed = compress(value.as_ref())?;
            transaction.put(database.dbi(), key, compressed, WriteFlags::default())?;
        }

        transaction.commit()?;

        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let transaction = self.environment.begin_rw_txn()?;
        let database = transaction.open_db(Some(&self.name))?;

        let mut cursor = transaction.cursor(&database)?;

        if cursor.set::<()>(key)?.is_some() {
            cursor.del(WriteFlags::default())?;
            transaction.commit()?;
        }

        Ok(())
    }
}

// `OrdMap` clones entries on several operations, so keys and values are
// stored as cheaply cloneable `Arc<[u8]>`.
#[derive(Default)]
pub struct InMemoryDatabase {
    map: Mutex<OrdMap<Arc<[u8]>, Arc<[u8]>>>,
}

impl InMemoryDatabase {
    fn map(&self) -> std::sync::MutexGuard<'_, OrdMap<Arc<[u8]>, Arc<[u8]>>> {
        self.map.lock().expect("in-memory database mutex is poisoned")
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    Encoder::new().compress_vec(data).map_err(Into::into)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    Decoder::new().decompress_vec(data).map_err(Into::into)
}
