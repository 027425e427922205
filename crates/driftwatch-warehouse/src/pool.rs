//! Pooled `DuckDB` connections sharing one database instance.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ::duckdb::Connection;

/// Which lane a leased connection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Default)]
struct Lanes {
    read_only: Vec<Connection>,
    read_write: Vec<Connection>,
}

impl Lanes {
    fn lane(&mut self, mode: AccessMode) -> &mut Vec<Connection> {
        match mode {
            AccessMode::ReadOnly => &mut self.read_only,
            AccessMode::ReadWrite => &mut self.read_write,
        }
    }
}

struct PoolInner {
    db_path: PathBuf,
    max_idle: usize,
    // Every pooled connection is cloned from this one so they share a single
    // database instance (and its write lock) inside the process.
    root: Mutex<Connection>,
    idle: Mutex<Lanes>,
}

/// Cheaply cloneable handle to a small pool of `DuckDB` connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Open the database file and prepare a pool keeping at most
    /// `max_idle` idle connections per lane.
    pub fn open(path: impl Into<PathBuf>, max_idle: usize) -> Result<Self, ::duckdb::Error> {
        let db_path = path.into();
        let root = Connection::open(db_path.as_path())?;
        root.execute_batch("PRAGMA disable_progress_bar;")?;

        Ok(Self {
            inner: Arc::new(PoolInner {
                db_path,
                max_idle: max_idle.max(1),
                root: Mutex::new(root),
                idle: Mutex::new(Lanes::default()),
            }),
        })
    }

    /// Lease a connection, reusing an idle one from the lane when available.
    pub fn lease(&self, mode: AccessMode) -> Result<Lease, ::duckdb::Error> {
        let reused = lock(&self.inner.idle).lane(mode).pop();
        // `access_mode` is fixed per database instance, so read-only leases are
        // a lane of their own rather than a connection setting.
        let connection = match reused {
            Some(connection) => connection,
            None => lock(&self.inner.root).try_clone()?,
        };

        Ok(Lease {
            mode,
            pool: Arc::clone(&self.inner),
            connection: Some(connection),
        })
    }

    pub fn db_path(&self) -> &Path {
        self.inner.db_path.as_path()
    }

    #[cfg(test)]
    fn idle_count(&self, mode: AccessMode) -> usize {
        lock(&self.inner.idle).lane(mode).len()
    }
}

/// A leased connection; returned to its lane on drop.
pub struct Lease {
    mode: AccessMode,
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl Deref for Lease {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        // Only `Drop` takes the connection out.
        match self.connection.as_ref() {
            Some(connection) => connection,
            None => unreachable!("lease used after release"),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let mut lanes = lock(&self.pool.idle);
        let lane = lanes.lane(self.mode);
        if lane.len() < self.pool.max_idle {
            lane.push(connection);
        }
    }
}

// A panic while holding either lock leaves plain vectors or a connection
// behind, both of which are still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
