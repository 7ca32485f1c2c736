//! Streamed `tar.gz` export of a tenant: the file tree plus one JSON dump
//! per entity table.
//!
//! Table dumps are spooled to anonymous temp files a page at a time before the
//! archive starts, because a tar entry needs its size up front. The archive is
//! then produced on a blocking thread and handed to the async side chunk by
//! chunk through a bounded channel. Memory stays flat however large the
//! tenant is, and a dropped client stops the producer.

use flate2::write::GzEncoder;
use flate2::Compression;
use futures::Stream;
use std::io::{self, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::io::{AsyncSeekExt, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use super::error::StorageError;
use super::fs::ARCHIVE_DIR;
use super::paths::relative_display;
use crate::database::executor::JsonRow;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, io::Error>> + Send>>;

const CHUNK_SIZE: usize = 64 * 1024;
const CHANNEL_DEPTH: usize = 8;

/// One table's finished JSON document, waiting in a temp file
#[derive(Debug)]
pub struct EntityDump {
    pub table: String,
    pub rows: u64,
    size: u64,
    file: std::fs::File,
}

/// Writes `{"table": .., "data": [..], "count": n}` one row at a time
pub struct DumpSpool {
    table: String,
    out: BufWriter<tokio::fs::File>,
    rows: u64,
    size: u64,
}

impl DumpSpool {
    pub async fn create(table: &str) -> Result<Self, StorageError> {
        let file = tokio::task::spawn_blocking(tempfile::tempfile)
            .await
            .map_err(|e| StorageError::Export(e.to_string()))??;
        let mut spool = Self {
            table: table.to_string(),
            out: BufWriter::new(tokio::fs::File::from_std(file)),
            rows: 0,
            size: 0,
        };
        let head = format!("{{\n  \"table\": {},\n  \"data\": [", serde_json::to_string(table)?);
        spool.write(head.as_bytes()).await?;
        Ok(spool)
    }

    pub async fn push(&mut self, row: &JsonRow) -> Result<(), StorageError> {
        let mut line = if self.rows == 0 { b"\n    ".to_vec() } else { b",\n    ".to_vec() };
        serde_json::to_writer(&mut line, row)?;
        self.write(&line).await?;
        self.rows += 1;
        Ok(())
    }

    /// Close the document and rewind it for the archive writer
    pub async fn finish(mut self) -> Result<EntityDump, StorageError> {
        let tail = format!("\n  ],\n  \"count\": {}\n}}\n", self.rows);
        self.write(tail.as_bytes()).await?;
        self.out.flush().await?;

        let mut file = self.out.into_inner();
        file.seek(SeekFrom::Start(0)).await?;
        Ok(EntityDump {
            table: self.table,
            rows: self.rows,
            size: self.size,
            file: file.into_std().await,
        })
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes).await?;
        self.size += bytes.len() as u64;
        Ok(())
    }
}

/// Start producing the archive. The returned stream ends with an error item
/// if the producer fails part way.
pub fn export_stream(root: PathBuf, dumps: Vec<EntityDump>) -> ByteStream {
    let (tx, rx) = mpsc::channel::<Result<Vec<u8>, io::Error>>(CHANNEL_DEPTH);

    tokio::task::spawn_blocking(move || {
        let writer = ChannelWriter::new(tx.clone());
        let tables = dumps.len();
        match write_archive(writer, &root, dumps) {
            Ok(()) => debug!(root = %root.display(), tables, "Export finished"),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!(root = %root.display(), "Export receiver dropped")
            }
            Err(e) => {
                warn!(root = %root.display(), "Export failed: {}", e);
                let _ = tx.blocking_send(Err(e));
            }
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

fn write_archive(writer: ChannelWriter, root: &Path, dumps: Vec<EntityDump>) -> io::Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut tar = tar::Builder::new(encoder);
    tar.follow_symlinks(false);

    for file in collect_files(root)? {
        let name = format!("store/{}", relative_display(root, &file));
        tar.append_path_with_name(&file, name)?;
    }

    let mtime = chrono::Utc::now().timestamp().max(0) as u64;
    for mut dump in dumps {
        let mut header = tar::Header::new_gnu();
        header.set_size(dump.size);
        header.set_mode(0o644);
        header.set_mtime(mtime);
        header.set_cksum();
        tar.append_data(&mut header, format!("database/{}.json", dump.table), &mut dump.file)?;
    }

    let encoder = tar.into_inner()?;
    let mut writer = encoder.finish()?;
    writer.flush()
}

/// Regular files under `root`, sorted, skipping the top-level `archive/`
/// folder and symlinks
fn collect_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.is_dir() {
        return Ok(files);
    }
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                if dir == root && entry.file_name() == ARCHIVE_DIR {
                    continue;
                }
                pending.push(path);
            } else if file_type.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// `Write` adapter that forwards fixed-size chunks into the response channel
struct ChannelWriter {
    tx: mpsc::Sender<Result<Vec<u8>, io::Error>>,
    buf: Vec<u8>,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<Result<Vec<u8>, io::Error>>) -> Self {
        Self {
            tx,
            buf: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn send_buffer(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "export receiver dropped"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_SIZE {
            self.send_buffer()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffer()
    }
}
