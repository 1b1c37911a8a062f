use url::Url;

/// Query parameters that never change which resource a link points to
const TRACKING_PARAMS: &[&str] = &["utm_source", "utm_medium", "utm_campaign", "mc_eid", "ref"];

/// Builds the identity key used to deduplicate crawl references
///
/// # Normalization Steps
///
/// 1. Parse the URL; unparsable input is keyed by its trimmed text
/// 2. Lowercase the host (done by the parser)
/// 3. Remove dot segments and trailing slash (except for root /)
/// 4. Remove fragment
/// 5. Remove tracking parameters, sort the rest, drop an empty query
///
/// Two hrefs with the same key are treated as the same target.
///
/// # Examples
///
/// ```
/// use stream_aggregator::url::reference_key;
///
/// assert_eq!(
///     reference_key("https://API.example.com/items/1/?b=2&a=1#top"),
///     "https://api.example.com/items/1?a=1&b=2"
/// );
/// ```
pub fn reference_key(href: &str) -> String {
    let href = href.trim();
    let Ok(mut url) = Url::parse(href) else {
        return href.to_string();
    };

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);
    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    url.to_string()
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}
