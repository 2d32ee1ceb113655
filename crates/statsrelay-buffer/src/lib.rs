//! Durable per-collector metric buffering.
//!
//! Every collector appends its samples to one line-oriented buffer file; the
//! dispatcher reads and consumes them on its own cadence. The two sides are
//! coordinated by an offset-capture/prefix-consume protocol: the reader
//! captures the end-of-file offset, parses only complete lines below it, and
//! later removes exactly those bytes. Lines appended between capture and
//! consume survive untouched for the next tick.

pub mod error;
pub mod line;


use crate::error::{BufferError, Result};
use crate::line::encode_line;
use statsrelay_common::types::Metric;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The complete lines present in a buffer at capture time, together with the
/// exact number of bytes they span from the start of the file.
#[derive(Debug)]
pub struct Captured {
    pub lines: Vec<String>,
    pub consumed_bytes: u64,
}

/// A durable append-only metric queue backed by one file.
///
/// The collector task holds the write role (`append`), the dispatcher holds
/// the read/consume role (`capture` / `consume`). The internal mutex guards
/// only the short file operations; no network I/O ever happens under it, so
/// an append is never blocked on a slow sink.
pub struct MetricBuffer {
    path: PathBuf,
    lock: Mutex<()>,
}

impl MetricBuffer {
    /// Opens (creating if absent) the buffer file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(&path, e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends all metrics as one contiguous write of complete lines and
    /// syncs. A reader can never observe a partially written line.
    pub fn append(&self, metrics: &[Metric]) -> Result<()> {
        if metrics.is_empty() {
            return Ok(());
        }
        let mut payload = String::new();
        for metric in metrics {
            payload.push_str(&encode_line(metric));
        }

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_err(&self.path, e))?;
        file.write_all(payload.as_bytes())
            .map_err(|e| io_err(&self.path, e))?;
        file.sync_data().map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }

    /// Reads every complete line currently in the file and records how many
    /// bytes they occupy. Trailing bytes without a newline are left alone.
    pub fn capture(&self) -> Result<Captured> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = File::open(&self.path).map_err(|e| io_err(&self.path, e))?;
        let len = file
            .metadata()
            .map_err(|e| io_err(&self.path, e))?
            .len();

        let mut raw = vec![0u8; len as usize];
        file.read_exact(&mut raw).map_err(|e| io_err(&self.path, e))?;

        let complete_end = match raw.iter().rposition(|&b| b == b'\n') {
            Some(idx) => idx + 1,
            None => 0,
        };

        let lines = String::from_utf8_lossy(&raw[..complete_end])
            .lines()
            .map(str::to_string)
            .collect();

        Ok(Captured {
            lines,
            consumed_bytes: complete_end as u64,
        })
    }

    /// Removes exactly `consumed_bytes` from the front of the file by
    /// copying the tail down and shrinking, so bytes appended after the
    /// matching `capture` are preserved.
    pub fn consume(&self, consumed_bytes: u64) -> Result<()> {
        if consumed_bytes == 0 {
            return Ok(());
        }

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| io_err(&self.path, e))?;
        let len = file
            .metadata()
            .map_err(|e| io_err(&self.path, e))?
            .len();
        let consumed = consumed_bytes.min(len);

        let mut tail = Vec::with_capacity((len - consumed) as usize);
        file.seek(SeekFrom::Start(consumed))
            .map_err(|e| io_err(&self.path, e))?;
        file.read_to_end(&mut tail).map_err(|e| io_err(&self.path, e))?;

        file.seek(SeekFrom::Start(0))
            .map_err(|e| io_err(&self.path, e))?;
        file.write_all(&tail).map_err(|e| io_err(&self.path, e))?;
        file.set_len(tail.len() as u64)
            .map_err(|e| io_err(&self.path, e))?;
        file.sync_data().map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }
}

fn io_err(path: &Path, source: std::io::Error) -> BufferError {
    BufferError::Io {
        path: path.display().to_string(),
        source,
    }
}
