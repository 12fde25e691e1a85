//! Append-only console buffer shared between an operation and its readers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Captured console output of one operation.
///
/// **Purpose**: Operations append output as it is produced; readers poll with
/// a cursor and only ever receive chunks they have not seen yet.
///
/// **Sharing**: `ConsoleOutput` is a handle. Cloning it does not copy the
/// buffer, both handles see the same chunks. This is how the runner hands a
/// console to a subprocess drain thread while a poller reads from another
/// thread.
///
/// **Cursor**: The cursor is the number of chunks already delivered. It only
/// grows, chunks are never removed or rewritten, so reading twice from the
/// same cursor yields the same chunks.
///
/// # Example
///
/// ```rust
/// use stager_operation_protocol::ConsoleOutput;
///
/// let console = ConsoleOutput::new();
/// console.append("Loading composer repositories");
///
/// let first = console.read_from(0);
/// assert_eq!(first.chunks.len(), 1);
///
/// console.append("Installing dependencies");
/// let second = console.read_from(first.next_cursor);
/// assert_eq!(second.chunks, vec!["Installing dependencies".to_string()]);
/// assert_eq!(second.next_cursor, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConsoleOutput {
    chunks: Arc<Mutex<Vec<String>>>,
}

/// Result of a cursor read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleRead {
    /// Chunks at or after the requested cursor, in append order.
    pub chunks: Vec<String>,
    /// Cursor to pass to the next read.
    pub next_cursor: usize,
}

impl ConsoleOutput {
    /// Create an empty console.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a console pre-filled with chunks, e.g. when restoring a task.
    pub fn from_chunks(chunks: Vec<String>) -> Self {
        Self {
            chunks: Arc::new(Mutex::new(chunks)),
        }
    }

    /// Append one chunk. Empty chunks are ignored so they never move the cursor.
    pub fn append(&self, chunk: impl Into<String>) {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return;
        }
        self.lock().push(chunk);
    }

    /// Read every chunk appended at or after `cursor`.
    ///
    /// A cursor past the end returns no chunks and leaves the cursor at the
    /// current end, so a stale cursor can never skip future output.
    pub fn read_from(&self, cursor: usize) -> ConsoleRead {
        let chunks = self.lock();
        let start = cursor.min(chunks.len());
        ConsoleRead {
            chunks: chunks[start..].to_vec(),
            next_cursor: chunks.len(),
        }
    }

    /// Number of chunks appended so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of all chunks.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // Appends are single pushes, a poisoned buffer is still consistent.
        self.chunks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for ConsoleOutput {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot() == other.snapshot()
    }
}

impl Serialize for ConsoleOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConsoleOutput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<String>::deserialize(deserializer).map(Self::from_chunks)
    }
}
