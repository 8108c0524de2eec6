//! Data provision for drags started by this process
//!
//! Another application (or this one) asks for one native format at a time.
//! `text/uri-list` covers every dragged item; any other format is served
//! from the first item only.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use url::Url;

use super::flavors;
use super::native::{NativeBackend, SuspendedEvents};
use super::sanitize::can_export_as_url;
use super::temp_files::TempFileManager;
use super::transferable::{TransferData, Transferable};
use crate::error::Result;

/// `text/uri-list` for all items, one CRLF terminated URI per item
///
/// Promised files may be written while the list is built; native events stay
/// suspended meanwhile so the user cannot cancel the drop half way through.
pub fn uri_list<B: NativeBackend + ?Sized>(
    items: &[Transferable],
    external: bool,
    temp_files: &mut TempFileManager,
    backend: &mut B,
) -> Vec<u8> {
    let _suspended = SuspendedEvents::new(backend);

    let mut list = String::new();
    for item in items {
        let Some(mut uri) = item_uri(item, external, temp_files) else {
            continue;
        };
        // text/x-moz-url is url + "\n" + title; only the url goes in the list
        if let Some(separator) = uri.find('\n') {
            uri.truncate(separator);
        }
        list.push_str(&uri);
        list.push_str("\r\n");
    }
    tracing::debug!("uri list for {} items, external {}: {:?}", items.len(), external, list);
    list.into_bytes()
}

/// The URI one item contributes to a uri list
fn item_uri(item: &Transferable, external: bool, temp_files: &mut TempFileManager) -> Option<String> {
    let Some(url) = item.text(flavors::URL) else {
        return file_uri(item);
    };
    if !external || can_export_as_url(&url) {
        return Some(url.into_owned());
    }

    // Internal URL dropped on another application: hand out the file itself,
    // or download the promised data into a temporary file
    if let Some(uri) = file_uri(item) {
        return Some(uri);
    }
    if !item.has_data(flavors::FILE_PROMISE_URL) {
        return None;
    }
    match temp_files.materialize(item) {
        Ok(uri) => Some(uri.to_string()),
        Err(e) => {
            tracing::warn!("failed to store promised file: {}", e);
            None
        }
    }
}

fn file_uri(item: &Transferable) -> Option<String> {
    let path = item.data(flavors::FILE)?.as_file()?;
    Url::from_file_path(path).ok().map(String::from)
}

/// UTF-8 text of `flavor`
pub fn text(item: &Transferable, flavor: &str) -> Option<Vec<u8>> {
    item.text(flavor).map(|text| text.into_owned().into_bytes())
}

/// The native image encoded as the requested image format
pub fn image(item: &Transferable, flavor: &str) -> Result<Option<Vec<u8>>> {
    let Some(TransferData::Image(image)) = item.data(flavors::NATIVE_IMAGE) else {
        tracing::debug!("no native image to post");
        return Ok(None);
    };
    let (format, image) = match flavor {
        // JPEG has no alpha channel
        flavors::JPEG | flavors::JPG => (
            ImageFormat::Jpeg,
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image.clone()).to_rgb8()),
        ),
        flavors::GIF => (ImageFormat::Gif, DynamicImage::ImageRgba8(image.clone())),
        _ => (ImageFormat::Png, DynamicImage::ImageRgba8(image.clone())),
    };
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, format)?;
    Ok(Some(bytes.into_inner()))
}

/// Whatever is stored under `flavor`, as bytes
pub fn verbatim(item: &Transferable, flavor: &str) -> Option<Vec<u8>> {
    match item.data(flavor)? {
        TransferData::Bytes(bytes) => Some(bytes.clone()),
        TransferData::Text(text) => Some(text.clone().into_bytes()),
        TransferData::File(path) => Url::from_file_path(path)
            .ok()
            .map(|uri| String::from(uri).into_bytes()),
        TransferData::Image(_) => None,
    }
}

/// Reply codes of the direct save protocol
pub const DIRECT_SAVE_SUCCESS: u8 = b'S';
pub const DIRECT_SAVE_FAILURE: u8 = b'F';
pub const DIRECT_SAVE_ERROR: u8 = b'E';

/// Handle a direct save request: the destination wrote the target file URI
/// back; record it on the item as the promise directory and file name
pub fn direct_save(item: &mut Transferable, written: Option<&str>) -> u8 {
    let Some(written) = written else {
        tracing::debug!("no direct save uri written by the destination");
        return DIRECT_SAVE_ERROR;
    };
    let Ok(uri) = Url::parse(written.trim_end_matches('\0')) else {
        tracing::debug!("failed to parse direct save uri {}", written);
        return DIRECT_SAVE_ERROR;
    };
    if uri.scheme() != "file" {
        return DIRECT_SAVE_ERROR;
    }
    if let Some(host) = uri.host_str().filter(|host| !host.is_empty()) {
        if !is_local_host(host) {
            tracing::debug!("ignored direct save for different host {}", host);
            return DIRECT_SAVE_FAILURE;
        }
    }

    let path = match urlencoding::decode(uri.path()) {
        Ok(path) => PathBuf::from(path.into_owned()),
        Err(_) => return DIRECT_SAVE_ERROR,
    };
    let (Some(directory), Some(leaf)) = (path.parent(), path.file_name()) else {
        return DIRECT_SAVE_ERROR;
    };
    tracing::debug!("direct save file path is {}", path.display());

    item.set_data(flavors::FILE_PROMISE_DIRECTORY, TransferData::File(directory.to_path_buf()));
    item.set_data(
        flavors::FILE_PROMISE_DEST_FILENAME,
        TransferData::Text(leaf.to_string_lossy().into_owned()),
    );
    if item.has_data(flavors::FILE_PROMISE) {
        DIRECT_SAVE_SUCCESS
    } else {
        DIRECT_SAVE_ERROR
    }
}

fn is_local_host(host: &str) -> bool {
    if host == "localhost" {
        return true;
    }
    match hostname::get() {
        Ok(local) => local.to_string_lossy() == host,
        Err(e) => {
            tracing::warn!("failed to read host name: {}", e);
            false
        }
    }
}

/// File name published for the direct save protocol when a drag begins
pub fn direct_save_file_name(item: &Transferable) -> Option<String> {
    item.text(flavors::FILE_PROMISE_DEST_FILENAME)
        .map(|name| name.into_owned())
        .filter(|name| !name.is_empty() && Path::new(name).file_name().is_some())
}
