//! Format identifiers exchanged with the native layer and the application

/// Plain text, UTF-8 on the wire
pub const TEXT: &str = "text/plain";
pub const TEXT_UTF8: &str = "text/plain;charset=utf-8";
pub const URI_LIST: &str = "text/uri-list";
/// Application link format: `url + "\n" + title`
pub const URL: &str = "text/x-moz-url";
/// Single link for the receiver to link to (not fetch): `url + "\n" + title`
pub const NETSCAPE_URL: &str = "_NETSCAPE_URL";
pub const FILE: &str = "application/x-moz-file";
/// All items of a multi-item drag; only meaningful inside this process
pub const INTERNAL_ITEM_LIST: &str = "application/x-moz-internal-item-list";
pub const FILE_PROMISE: &str = "application/x-moz-file-promise";
pub const FILE_PROMISE_URL: &str = "application/x-moz-file-promise-url";
pub const FILE_PROMISE_DEST_FILENAME: &str = "application/x-moz-file-promise-dest-filename";
pub const FILE_PROMISE_DIRECTORY: &str = "application/x-moz-file-promise-dir";
pub const DIRECT_SAVE: &str = "XdndDirectSave0";
pub const NATIVE_IMAGE: &str = "application/x-moz-nativeimage";
pub const PNG: &str = "image/png";
pub const JPEG: &str = "image/jpeg";
pub const JPG: &str = "image/jpg";
pub const GIF: &str = "image/gif";
/// Opaque custom data; never line-ending normalized
pub const CUSTOM_CLIPDATA: &str = "application/x-moz-custom-clipdata";
pub const TAB_DROP: &str = "application/x-moz-tabbrowser-tab";

pub const IMAGE_FLAVORS: [&str; 4] = [PNG, JPEG, JPG, GIF];

pub fn is_image(flavor: &str) -> bool {
    IMAGE_FLAVORS.contains(&flavor)
}
