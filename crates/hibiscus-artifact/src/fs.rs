use std::path::PathBuf;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::{ByteStream, Error, Store};

/// Filesystem-based storage sink.
///
/// Stores blobs as files on the local filesystem. Each blob is stored at
/// `{base_path}/{key}` and addressed as a `file://` URI. Parent
/// directories are created automatically.
pub struct FsStore {
  base_path: PathBuf,
}

impl FsStore {
  /// Create a new filesystem store with the given base path.
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  fn key_to_path(&self, key: &str) -> PathBuf {
    self.base_path.join(key)
  }

  fn key_to_uri(&self, key: &str) -> String {
    format!("file://{}", self.key_to_path(key).display())
  }
}

#[async_trait]
impl Store for FsStore {
  async fn get(&self, key: &str) -> Result<ByteStream, Error> {
    let path = self.key_to_path(key);
    let file = File::open(&path).await.map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(key.to_string())
      } else {
        Error::Io(e)
      }
    })?;
    let stream = ReaderStream::new(file).map(|r| r.map_err(Error::Io));
    Ok(Box::pin(stream))
  }

  async fn put(&self, key: &str, data: ByteStream, _content_type: &str) -> Result<String, Error> {
    let path = self.key_to_path(key);

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }

    // Writes go to a staging file next to the final path; the blob only
    // becomes visible under its key once fully flushed and renamed, so
    // neither stream errors nor local write failures can leave a
    // partial blob behind.
    let staging = PathBuf::from(format!("{}.tmp", path.display()));
    let written = match write_staged(&staging, key, data).await {
      Ok(()) => fs::rename(&staging, &path).await.map_err(Error::Io),
      Err(e) => Err(e),
    };

    if let Err(e) = written {
      let _ = fs::remove_file(&staging).await;
      return Err(e);
    }

    Ok(self.key_to_uri(key))
  }

  async fn delete(&self, key: &str) -> Result<(), Error> {
    let path = self.key_to_path(key);
    fs::remove_file(&path).await.map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(key.to_string())
      } else {
        Error::Io(e)
      }
    })
  }
}

async fn write_staged(path: &PathBuf, key: &str, data: ByteStream) -> Result<(), Error> {
  let mut file = File::create(path).await?;
  let mut stream = std::pin::pin!(data);

  while let Some(chunk) = stream.next().await {
    let bytes = chunk.map_err(|e| Error::Transfer {
      key: key.to_string(),
      message: e.to_string(),
    })?;
    file.write_all(&bytes).await?;
  }

  file.flush().await?;
  Ok(())
}
