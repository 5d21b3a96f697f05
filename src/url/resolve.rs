use url::Url;

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be ignored:
/// - javascript:, mailto:, tel:, data: schemes
/// - empty or fragment-only hrefs
/// - hrefs that cannot be joined onto `base_url`
/// - non-HTTP(S) results
///
/// # Examples
///
/// ```
/// use lot_trawler::url::resolve_link;
/// use url::Url;
///
/// let origin = Url::parse("https://www.example.com").unwrap();
/// assert_eq!(
///     resolve_link("/listing/abc/", &origin).as_deref(),
///     Some("https://www.example.com/listing/abc/")
/// );
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}

/// Returns the first value of query parameter `key`
pub fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Sets query parameter `key` to `value`, replacing any existing values
///
/// Other parameters keep their relative order; `key` moves to the end.
pub fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.push((key.to_string(), value.to_string()));

    url.query_pairs_mut().clear().extend_pairs(pairs);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://www.example.com").unwrap()
    }

    #[test]
    fn test_resolve_relative_link() {
        assert_eq!(
            resolve_link("/used/listing/1/", &origin()).as_deref(),
            Some("https://www.example.com/used/listing/1/")
        );
    }

    #[test]
    fn test_resolve_absolute_link() {
        assert_eq!(
            resolve_link("https://other.com/x", &origin()).as_deref(),
            Some("https://other.com/x")
        );
    }

    #[test]
    fn test_skip_special_links() {
        assert_eq!(resolve_link("", &origin()), None);
        assert_eq!(resolve_link("#top", &origin()), None);
        assert_eq!(resolve_link("javascript:void(0)", &origin()), None);
        assert_eq!(resolve_link("JavaScript:void(0)", &origin()), None);
        assert_eq!(resolve_link("mailto:a@b.com", &origin()), None);
        assert_eq!(resolve_link("tel:+15555555555", &origin()), None);
        assert_eq!(resolve_link("data:text/html,hi", &origin()), None);
        assert_eq!(resolve_link("ftp://example.com/file", &origin()), None);
    }

    #[test]
    fn test_query_param() {
        let url = Url::parse("https://example.com/?a=1&page=4&b=2").unwrap();
        assert_eq!(query_param(&url, "page").as_deref(), Some("4"));
        assert_eq!(query_param(&url, "missing"), None);
    }

    #[test]
    fn test_set_query_param_adds() {
        let mut url = Url::parse("https://example.com/listings/?makeSlug=ford").unwrap();
        set_query_param(&mut url, "page", "2");
        assert_eq!(
            url.as_str(),
            "https://example.com/listings/?makeSlug=ford&page=2"
        );
    }

    #[test]
    fn test_set_query_param_replaces() {
        let mut url = Url::parse("https://example.com/?page=2&page=7&zip=1").unwrap();
        set_query_param(&mut url, "page", "3");
        assert_eq!(url.as_str(), "https://example.com/?zip=1&page=3");
    }
}
