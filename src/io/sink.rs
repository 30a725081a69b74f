// src/io/sink.rs

//! Buffered, shareable file writers that process output is teed into.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// A sink shared between the stdout and stderr pumps of one process.
pub(crate) type SharedSink = Arc<Mutex<Sink>>;

pub(crate) struct Sink {
    path: PathBuf,
    writer: Option<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl Sink {
    pub(crate) fn new(path: impl Into<PathBuf>, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            path: path.into(),
            writer: Some(Box::new(writer)),
        }
    }

    /// Open `path` for append, creating it if needed.
    pub(crate) async fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self::new(path, BufWriter::new(file)))
    }

    pub(crate) fn shared(self) -> SharedSink {
        Arc::new(Mutex::new(self))
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(w) => w.write_all(buf).await,
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("sink {:?} is closed", self.path),
            )),
        }
    }

    pub(crate) async fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(w) => w.flush().await,
            None => Ok(()),
        }
    }

    /// Flush buffered data and close the underlying file.
    ///
    /// Both steps are attempted; the last failure is returned. Closing twice
    /// is a no-op.
    pub(crate) async fn close(&mut self) -> io::Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        let mut last = Ok(());
        if let Err(e) = writer.flush().await {
            last = Err(e);
        }
        if let Err(e) = writer.shutdown().await {
            last = Err(e);
        }
        last
    }
}
