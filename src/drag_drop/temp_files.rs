//! Temporary files for promised drag data
//!
//! When another application accepts a promised file (a download that only
//! exists as a URL), the data is streamed into `<temp>/dnd_file*/<name>` and
//! the receiver gets a `file://` URI. The files must outlive the drop because
//! receivers often read them after the drag protocol reported completion, so
//! deletion is deferred and only happens immediately on teardown.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use url::Url;

use super::flavors;
use super::sanitize::validate_file_name;
use super::transferable::Transferable;
use crate::error::{Error, Result};

/// Opens a read stream on the source of a promised file
pub trait UriOpener {
    /// `origin` is the security context of the item that promised the file
    fn open(&self, uri: &Url, origin: Option<&str>) -> io::Result<Box<dyn Read>>;
}

/// Opener for `file:` URIs
#[derive(Debug, Default)]
pub struct FileUriOpener;

impl UriOpener for FileUriOpener {
    fn open(&self, uri: &Url, _origin: Option<&str>) -> io::Result<Box<dyn Read>> {
        if uri.scheme() != "file" {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("no channel for scheme {}", uri.scheme()),
            ));
        }
        let path = uri
            .to_file_path()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, uri.to_string()))?;
        Ok(Box::new(File::open(path)?))
    }
}

#[derive(Debug)]
struct Materialized {
    source: String,
    file_name: String,
    uri: Url,
}

pub struct TempFileManager {
    base_dir: PathBuf,
    opener: Box<dyn UriOpener>,
    /// Directories created for this and previous drags, removed on cleanup
    artifacts: Vec<PathBuf>,
    /// Files handed out during the current source session
    materialized: Vec<Materialized>,
    cleanup_deadline: Option<Instant>,
}

impl TempFileManager {
    pub fn new(base_dir: PathBuf, opener: Box<dyn UriOpener>) -> Self {
        Self {
            base_dir,
            opener,
            artifacts: Vec::new(),
            materialized: Vec::new(),
            cleanup_deadline: None,
        }
    }

    /// Stream the item's promised file into a fresh temp directory
    ///
    /// A second request for the same source and file name within one session
    /// returns the first URI: receivers ask again whenever the drop target
    /// changes.
    pub fn materialize(&mut self, item: &Transferable) -> Result<Url> {
        let (source, file_name) = download_details(item)?;
        let file_name = validate_file_name(&file_name)?.to_string();

        if let Some(existing) = self
            .materialized
            .iter()
            .find(|m| m.source == source.as_str() && m.file_name == file_name)
        {
            tracing::debug!("recycle promised file {}", existing.uri);
            return Ok(existing.uri.clone());
        }

        let mut reader = self.opener.open(&source, item.requesting_origin())?;

        let dir = tempfile::Builder::new()
            .prefix("dnd_file")
            .tempdir_in(&self.base_dir)?
            .keep();
        self.artifacts.push(dir.clone());
        // A new artifact restarts the cleanup countdown at the next session end
        self.cleanup_deadline = None;

        let path = dir.join(&file_name);
        let mut file = File::create(&path)?;
        io::copy(&mut reader, &mut file)?;
        file.sync_all()?;

        let uri = Url::from_file_path(&path).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, path.display().to_string())
        })?;
        tracing::debug!("storing promised file {} as {}", source, uri);
        self.materialized.push(Materialized {
            source: source.to_string(),
            file_name,
            uri: uri.clone(),
        });
        Ok(uri)
    }

    /// Forget the URIs handed out during the session; the files stay on disk
    pub fn end_session(&mut self) {
        self.materialized.clear();
    }

    pub fn has_artifacts(&self) -> bool {
        !self.artifacts.is_empty()
    }

    pub fn cleanup_armed(&self) -> bool {
        self.cleanup_deadline.is_some()
    }

    pub fn cleanup_deadline(&self) -> Option<Instant> {
        self.cleanup_deadline
    }

    /// Arm the one-shot deferred deletion, replacing any armed deadline
    pub fn schedule_cleanup(&mut self, delay: Duration) {
        tracing::debug!("queue removing of {} temporary directories", self.artifacts.len());
        self.cleanup_deadline = Some(Instant::now() + delay);
    }

    /// Run the deferred deletion if its deadline has passed
    pub fn run_due_cleanup(&mut self, now: Instant) -> bool {
        match self.cleanup_deadline {
            Some(deadline) if now >= deadline => {
                self.cleanup_now();
                true
            }
            _ => false,
        }
    }

    /// Delete every tracked artifact right away
    pub fn cleanup_now(&mut self) {
        self.cleanup_deadline = None;
        for dir in std::mem::take(&mut self.artifacts) {
            tracing::debug!("removing {}", dir.display());
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("failed to remove {}: {}", dir.display(), e);
                }
            }
        }
    }
}

impl Drop for TempFileManager {
    fn drop(&mut self) {
        self.cleanup_now();
    }
}

/// Source URI and destination file name of a promised file
fn download_details(item: &Transferable) -> Result<(Url, String)> {
    let source = item
        .text(flavors::FILE_PROMISE_URL)
        .filter(|uri| !uri.is_empty())
        .ok_or(Error::MissingPromise(flavors::FILE_PROMISE_URL))?;
    let source = Url::parse(&source)?;

    let file_name = match item.text(flavors::FILE_PROMISE_DEST_FILENAME) {
        Some(name) => name.into_owned(),
        None => {
            let segment = source
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or_default();
            urlencoding::decode(segment)
                .map(|name| name.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        }
    };
    if file_name.is_empty() {
        return Err(Error::MissingPromise(flavors::FILE_PROMISE_DEST_FILENAME));
    }
    Ok((source, file_name))
}
