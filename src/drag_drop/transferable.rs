//! Transferable items: ordered, keyed bags of drag payloads
//!
//! The application supplies transferables for source drags and hands empty
//! ones (listing the flavors it can import) to `get_data` for target drags.

use std::borrow::Cow;
use std::path::PathBuf;

use image::RgbaImage;

/// One payload stored under a flavor
#[derive(Clone, Debug, PartialEq)]
pub enum TransferData {
    Bytes(Vec<u8>),
    Text(String),
    File(PathBuf),
    Image(RgbaImage),
}

impl TransferData {
    /// Textual view of the payload; files and images have none
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            TransferData::Text(text) => Some(Cow::Borrowed(text)),
            TransferData::Bytes(bytes) => Some(String::from_utf8_lossy(bytes)),
            TransferData::File(_) | TransferData::Image(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&PathBuf> {
        match self {
            TransferData::File(path) => Some(path),
            _ => None,
        }
    }
}

/// An ordered flavor -> payload mapping
///
/// Flavors keep their insertion order; a flavor may be declared without data
/// (the application asking for it) and filled in later.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transferable {
    entries: Vec<(String, Option<TransferData>)>,
    /// Security context used when fetching promised downloads
    requesting_origin: Option<String>,
}

impl Transferable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transferable that asks for `flavors`, in order of preference
    pub fn with_flavors<I, S>(flavors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut transferable = Self::new();
        for flavor in flavors {
            transferable.add_flavor(flavor);
        }
        transferable
    }

    pub fn add_flavor(&mut self, flavor: impl Into<String>) {
        let flavor = flavor.into();
        if !self.entries.iter().any(|(f, _)| *f == flavor) {
            self.entries.push((flavor, None));
        }
    }

    /// Store `data` under `flavor`, declaring the flavor if needed
    pub fn set_data(&mut self, flavor: impl Into<String>, data: TransferData) {
        let flavor = flavor.into();
        match self.entries.iter_mut().find(|(f, _)| *f == flavor) {
            Some(entry) => entry.1 = Some(data),
            None => self.entries.push((flavor, Some(data))),
        }
    }

    pub fn with_data(mut self, flavor: impl Into<String>, data: TransferData) -> Self {
        self.set_data(flavor, data);
        self
    }

    pub fn data(&self, flavor: &str) -> Option<&TransferData> {
        self.entries
            .iter()
            .find(|(f, _)| f == flavor)
            .and_then(|(_, data)| data.as_ref())
    }

    pub fn text(&self, flavor: &str) -> Option<Cow<'_, str>> {
        self.data(flavor).and_then(TransferData::as_text)
    }

    /// Every declared flavor, in order (what the item can import)
    pub fn flavors(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(f, _)| f.as_str())
    }

    /// Flavors that carry data (what the item can export)
    pub fn exportable_flavors(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, data)| data.is_some())
            .map(|(f, _)| f.as_str())
    }

    pub fn has_data(&self, flavor: &str) -> bool {
        self.data(flavor).is_some()
    }

    pub fn requesting_origin(&self) -> Option<&str> {
        self.requesting_origin.as_deref()
    }

    pub fn set_requesting_origin(&mut self, origin: Option<String>) {
        self.requesting_origin = origin;
    }
}
