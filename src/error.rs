//! Error type shared by the drag coordinator
//!
//! Only resource failures and invariant violations surface as errors.
//! Protocol desync is reported as a `bool` by the scheduling entry points and
//! missing data is reported as "nothing stored" by `get_data`.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A source session is still running (its end has not been processed yet)
    #[error("a previous source drag session has not finished yet")]
    NotAvailable,
    #[error("no drag items were supplied")]
    NoItems,
    #[error("the native layer failed to start the drag")]
    FailedToStartDrag,
    /// Target data was queried outside of a dispatched drag event
    #[error("no target widget for the current drag")]
    NoTargetWidget,
    /// A file promise is missing one of its required flavors
    #[error("promised file is missing {0}")]
    MissingPromise(&'static str),
    #[error("refusing unsafe promised file name: {0}")]
    UnsafeFileName(String),
    #[error("invalid uri: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
