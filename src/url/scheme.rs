use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Leading scheme (optional) followed by `//`
static SCHEME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z][a-z0-9+.\-]*:)?//").expect("valid scheme regex"));

/// Rewrites a scheme-relative or insecure URL to the given scheme
///
/// `//cdn.example.com/a.m3u8` and `http://cdn.example.com/a.m3u8` both become
/// `https://cdn.example.com/a.m3u8` for `scheme = "https"`. Input without a
/// leading `//` authority is returned unchanged.
///
/// # Examples
///
/// ```
/// use stream_aggregator::url::rectify_url;
///
/// assert_eq!(
///     rectify_url("//cdn.example.com/master.m3u8", "https"),
///     "https://cdn.example.com/master.m3u8"
/// );
/// ```
pub fn rectify_url(raw: &str, scheme: &str) -> String {
    let raw = raw.trim();
    SCHEME_PREFIX
        .replace(raw, format!("{}://", scheme).as_str())
        .into_owned()
}

/// Resolves a playlist URI against the playlist it was listed in
///
/// Returns `None` for URIs that cannot be resolved.
pub fn resolve_uri(base: &Url, uri: &str) -> Option<Url> {
    let uri = uri.trim();
    if uri.is_empty() {
        return None;
    }
    base.join(uri).ok()
}
