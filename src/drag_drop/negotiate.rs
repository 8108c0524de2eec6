//! Format and action negotiation
//!
//! Pure functions shared by the source and target halves of the coordinator:
//! - which native formats a source drag advertises
//! - how a format requested by the application maps onto offered formats
//! - how native action bits map onto a single drag action and back

use std::path::PathBuf;

use url::Url;

use super::encoding::{decode_text, normalize_line_breaks, uri_list_item};
use super::flavors;
use super::sanitize::can_export_as_url;
use super::transferable::{TransferData, Transferable};
use crate::config::BackendQuirks;
use crate::types::{ActionSet, DragAction};

fn push_unique(formats: &mut Vec<String>, format: &str) {
    if !formats.iter().any(|f| f == format) {
        formats.push(format.to_string());
    }
}

/// Ordered set of native formats advertised for a source drag
///
/// Xdnd style protocols transfer one payload per request, so a multi-item
/// drag only offers the in-process item list and, when links are involved,
/// a flattened `text/uri-list`.
pub fn build_advertised_formats(items: &[Transferable], quirks: &BackendQuirks) -> Vec<String> {
    let mut formats = Vec::new();

    match items {
        [] => {}
        [item] => {
            for flavor in item.exportable_flavors() {
                push_unique(&mut formats, flavor);
                match flavor {
                    flavors::FILE | flavors::FILE_PROMISE_URL => {
                        push_unique(&mut formats, flavors::URI_LIST)
                    }
                    flavors::TEXT => push_unique(&mut formats, flavors::TEXT_UTF8),
                    flavors::URL => {
                        let exportable = item
                            .text(flavors::URL)
                            .is_some_and(|url| can_export_as_url(&url));
                        if exportable {
                            push_unique(&mut formats, flavors::NETSCAPE_URL);
                        }
                    }
                    flavors::FILE_PROMISE if quirks.direct_save_supported => {
                        push_unique(&mut formats, flavors::DIRECT_SAVE)
                    }
                    flavors::NATIVE_IMAGE => {
                        for image in flavors::IMAGE_FLAVORS {
                            push_unique(&mut formats, image);
                        }
                    }
                    _ => {}
                }
            }
        }
        items => {
            push_unique(&mut formats, flavors::INTERNAL_ITEM_LIST);
            if items.iter().any(|item| item.has_data(flavors::URL)) {
                push_unique(&mut formats, flavors::URI_LIST);
            }
        }
    }

    tracing::debug!("advertised drag formats {:?}", formats);
    formats
}

/// Whether `requested` can be served from the `offered` native formats,
/// directly or through a known conversion
pub fn flavor_supported(offered: &[String], requested: &str) -> bool {
    offered.iter().any(|native| {
        native == requested
            || (native == flavors::URI_LIST
                && (requested == flavors::URL || requested == flavors::FILE))
            || (native == flavors::NETSCAPE_URL && requested == flavors::URL)
    })
}

/// How fetched native bytes become application data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conversion {
    /// Decode as text (images and custom data stay bytes)
    Verbatim,
    /// Take the addressed `text/uri-list` entry as a local file
    FileFromUriList,
    /// Take the addressed `text/uri-list` entry as link text
    UriListEntry,
}

/// One native format to fetch for an application format
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    pub native: String,
    pub conversion: Conversion,
}

/// Ordered fetch attempts for an application format; the first attempt that
/// yields data decides the result
///
/// Only attempts whose native format is actually offered are returned, so an
/// empty plan means "not found".
pub fn resolve_format(requested: &str, offered: &[String]) -> Vec<Attempt> {
    let attempt = |native: &str, conversion| Attempt {
        native: native.to_string(),
        conversion,
    };
    let mut plan = match requested {
        // Text travels as UTF-8; the untagged variant is the fallback
        flavors::TEXT => vec![
            attempt(flavors::TEXT_UTF8, Conversion::Verbatim),
            attempt(flavors::TEXT, Conversion::Verbatim),
        ],
        flavors::FILE => vec![
            attempt(flavors::FILE, Conversion::FileFromUriList),
            attempt(flavors::URI_LIST, Conversion::FileFromUriList),
        ],
        flavors::URL => vec![
            attempt(flavors::URL, Conversion::Verbatim),
            attempt(flavors::URI_LIST, Conversion::UriListEntry),
            attempt(flavors::NETSCAPE_URL, Conversion::Verbatim),
        ],
        other => vec![attempt(other, Conversion::Verbatim)],
    };
    plan.retain(|a| offered.contains(&a.native));
    plan
}

/// Turn fetched bytes into the value stored under `requested`
///
/// `None` means the bytes could not be interpreted (e.g. a non-file URI for a
/// file request); the caller moves on to the next requested format.
pub fn convert(
    requested: &str,
    conversion: Conversion,
    bytes: &[u8],
    index: usize,
) -> Option<TransferData> {
    match conversion {
        Conversion::FileFromUriList => {
            let entry = uri_list_item(bytes, index);
            let path = file_path_from_uri(entry.trim())?;
            Some(TransferData::File(path))
        }
        Conversion::UriListEntry => Some(TransferData::Text(normalize_line_breaks(
            &uri_list_item(bytes, index),
        ))),
        Conversion::Verbatim if flavors::is_image(requested) => {
            Some(TransferData::Bytes(bytes.to_vec()))
        }
        Conversion::Verbatim if requested == flavors::CUSTOM_CLIPDATA => {
            Some(TransferData::Bytes(bytes.to_vec()))
        }
        Conversion::Verbatim => Some(TransferData::Text(normalize_line_breaks(&decode_text(bytes)))),
    }
}

fn file_path_from_uri(uri: &str) -> Option<PathBuf> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        tracing::debug!("not a file uri: {}", uri);
        return None;
    }
    url.to_file_path().ok()
}

/// Single action from the native action bits
///
/// Move wins over link, link over copy; a bare "default" bit means move.
pub fn action_from_native(actions: ActionSet) -> DragAction {
    if actions.contains(ActionSet::MOVE) {
        DragAction::Move
    } else if actions.contains(ActionSet::LINK) {
        DragAction::Link
    } else if actions.contains(ActionSet::COPY) {
        DragAction::Copy
    } else if actions.contains(ActionSet::DEFAULT) {
        DragAction::Move
    } else {
        DragAction::None
    }
}

/// Status bits sent in reply to a motion signal
pub fn motion_reply(can_drop: bool, action: DragAction, quirks: &BackendQuirks) -> ActionSet {
    if !can_drop {
        return ActionSet::NONE;
    }
    match ActionSet::from_action(action) {
        ActionSet::COPY if quirks.substitute_move_for_copy => ActionSet::MOVE,
        reply => reply,
    }
}

/// Drop effect of a finished source drag from the actions the destination
/// accepted. Several bits should not happen; copy is the safe reading.
pub fn drop_effect(accepted: ActionSet) -> DragAction {
    if accepted.is_empty() {
        DragAction::None
    } else if accepted.contains(ActionSet::COPY) {
        DragAction::Copy
    } else if accepted.contains(ActionSet::LINK) {
        DragAction::Link
    } else if accepted.contains(ActionSet::MOVE) {
        DragAction::Move
    } else {
        DragAction::Copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offered(formats: &[&str]) -> Vec<String> {
        formats.iter().map(|f| f.to_string()).collect()
    }

    fn text_item(flavor: &str, text: &str) -> Transferable {
        Transferable::new().with_data(flavor, TransferData::Text(text.into()))
    }

    #[test]
    fn test_single_text_item() {
        let items = [text_item(flavors::TEXT, "hello")];
        let formats = build_advertised_formats(&items, &BackendQuirks::default());
        assert_eq!(formats, [flavors::TEXT, flavors::TEXT_UTF8]);
    }

    #[test]
    fn test_single_item_derived_formats() {
        let item = Transferable::new()
            .with_data(flavors::URL, TransferData::Text("https://example.com\nExample".into()))
            .with_data(flavors::FILE, TransferData::File("/tmp/a".into()))
            .with_data(flavors::FILE_PROMISE_URL, TransferData::Text("https://example.com/a".into()))
            .with_data(flavors::NATIVE_IMAGE, TransferData::Image(image::RgbaImage::new(1, 1)));
        let formats = build_advertised_formats(&[item], &BackendQuirks::default());
        assert_eq!(
            formats,
            [
                flavors::URL,
                flavors::NETSCAPE_URL,
                flavors::FILE,
                flavors::URI_LIST,
                flavors::FILE_PROMISE_URL,
                flavors::NATIVE_IMAGE,
                flavors::PNG,
                flavors::JPEG,
                flavors::JPG,
                flavors::GIF,
            ]
        );
    }

    #[test]
    fn test_internal_url_is_not_advertised_as_link() {
        let items = [text_item(flavors::URL, "about:config\nConfig")];
        let formats = build_advertised_formats(&items, &BackendQuirks::default());
        assert_eq!(formats, [flavors::URL]);
    }

    #[test]
    fn test_direct_save_needs_backend_support() {
        let item = text_item(flavors::FILE_PROMISE, "promise");
        let plain = build_advertised_formats(std::slice::from_ref(&item), &BackendQuirks::default());
        assert_eq!(plain, [flavors::FILE_PROMISE]);

        let quirks = BackendQuirks {
            direct_save_supported: true,
            ..BackendQuirks::default()
        };
        let x11 = build_advertised_formats(&[item], &quirks);
        assert_eq!(x11, [flavors::FILE_PROMISE, flavors::DIRECT_SAVE]);
    }

    #[test]
    fn test_multiple_items() {
        let quirks = BackendQuirks::default();
        let texts = [text_item(flavors::TEXT, "a"), text_item(flavors::TEXT, "b")];
        assert_eq!(build_advertised_formats(&texts, &quirks), [flavors::INTERNAL_ITEM_LIST]);

        let links = [text_item(flavors::TEXT, "a"), text_item(flavors::URL, "https://b/")];
        assert_eq!(
            build_advertised_formats(&links, &quirks),
            [flavors::INTERNAL_ITEM_LIST, flavors::URI_LIST]
        );
    }

    #[test]
    fn test_flavor_supported_mappings() {
        let uri_list = offered(&[flavors::URI_LIST]);
        assert!(flavor_supported(&uri_list, flavors::URL));
        assert!(flavor_supported(&uri_list, flavors::FILE));
        assert!(!flavor_supported(&uri_list, flavors::TEXT));

        let netscape = offered(&[flavors::NETSCAPE_URL]);
        assert!(flavor_supported(&netscape, flavors::URL));
        assert!(!flavor_supported(&netscape, flavors::FILE));
        assert!(flavor_supported(&offered(&["text/html"]), "text/html"));
    }

    #[test]
    fn test_resolve_prefers_direct_match() {
        let plan = resolve_format(flavors::URL, &offered(&[flavors::URI_LIST, flavors::URL]));
        assert_eq!(plan[0].native, flavors::URL);
        assert_eq!(plan[1].native, flavors::URI_LIST);
    }

    #[test]
    fn test_resolve_text_tries_utf8_first() {
        let plan = resolve_format(flavors::TEXT, &offered(&[flavors::TEXT, flavors::TEXT_UTF8]));
        let natives: Vec<_> = plan.iter().map(|a| a.native.as_str()).collect();
        assert_eq!(natives, [flavors::TEXT_UTF8, flavors::TEXT]);
    }

    #[test]
    fn test_resolve_not_found() {
        assert!(resolve_format(flavors::FILE, &offered(&[flavors::TEXT])).is_empty());
        assert!(resolve_format("text/html", &offered(&[flavors::TEXT])).is_empty());

        let custom = resolve_format("application/x-custom", &offered(&["application/x-custom"]));
        assert_eq!(custom[0].conversion, Conversion::Verbatim);
    }

    #[test]
    fn test_file_from_uri_list() {
        let plan = resolve_format(flavors::FILE, &offered(&[flavors::URI_LIST]));
        assert_eq!(plan.len(), 1);
        let data = convert(
            flavors::FILE,
            plan[0].conversion,
            b"file:///tmp/a\r\nfile:///tmp/b\r\n",
            0,
        );
        assert_eq!(data, Some(TransferData::File(PathBuf::from("/tmp/a"))));

        let remote = convert(flavors::FILE, Conversion::FileFromUriList, b"https://a/\r\n", 0);
        assert_eq!(remote, None);
    }

    #[test]
    fn test_url_from_uri_list_entry() {
        let data = convert(
            flavors::URL,
            Conversion::UriListEntry,
            b"file:///tmp/a\r\nfile:///tmp/b\r\n",
            1,
        );
        assert_eq!(data, Some(TransferData::Text("file:///tmp/b".into())));
    }

    #[test]
    fn test_text_conversion_normalizes_line_breaks() {
        let text = convert("text/html", Conversion::Verbatim, b"<p>a</p>\r\n<p>b</p>", 0);
        assert_eq!(text, Some(TransferData::Text("<p>a</p>\n<p>b</p>".into())));

        let custom = convert(flavors::CUSTOM_CLIPDATA, Conversion::Verbatim, b"a\r\nb", 0);
        assert_eq!(custom, Some(TransferData::Bytes(b"a\r\nb".to_vec())));

        let png = convert(flavors::PNG, Conversion::Verbatim, b"\x89PNG\r\n", 0);
        assert_eq!(png, Some(TransferData::Bytes(b"\x89PNG\r\n".to_vec())));
    }

    #[test]
    fn test_action_precedence() {
        assert_eq!(action_from_native(ActionSet::DEFAULT), DragAction::Move);
        assert_eq!(action_from_native(ActionSet::COPY | ActionSet::LINK), DragAction::Link);
        assert_eq!(
            action_from_native(ActionSet::COPY | ActionSet::MOVE | ActionSet::LINK),
            DragAction::Move
        );
        assert_eq!(action_from_native(ActionSet::COPY | ActionSet::DEFAULT), DragAction::Copy);
        assert_eq!(action_from_native(ActionSet::NONE), DragAction::None);
    }

    #[test]
    fn test_motion_reply() {
        let plain = BackendQuirks::default();
        assert_eq!(motion_reply(false, DragAction::Copy, &plain), ActionSet::NONE);
        assert_eq!(motion_reply(true, DragAction::Copy, &plain), ActionSet::COPY);
        assert_eq!(motion_reply(true, DragAction::None, &plain), ActionSet::NONE);

        let latching = BackendQuirks {
            substitute_move_for_copy: true,
            ..BackendQuirks::default()
        };
        assert_eq!(motion_reply(true, DragAction::Copy, &latching), ActionSet::MOVE);
        assert_eq!(motion_reply(true, DragAction::Link, &latching), ActionSet::LINK);
    }

    #[test]
    fn test_drop_effect() {
        assert_eq!(drop_effect(ActionSet::NONE), DragAction::None);
        assert_eq!(drop_effect(ActionSet::MOVE | ActionSet::COPY), DragAction::Copy);
        assert_eq!(drop_effect(ActionSet::MOVE | ActionSet::LINK), DragAction::Link);
        assert_eq!(drop_effect(ActionSet::MOVE), DragAction::Move);
        assert_eq!(drop_effect(ActionSet::ASK), DragAction::Copy);
    }
}
