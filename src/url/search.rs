use crate::config::SearchConfig;
use crate::url::set_query_param;
use url::Url;

/// Builds the URL of the first results page
///
/// An explicit `start_url` wins. Otherwise the base listings URL gets one query
/// parameter per provided search field:
///
/// | Field | Parameter |
/// |-------|-----------|
/// | make | `makeSlug` (lowercased) |
/// | model | `modelSlug` (lowercased) |
/// | year_min | `yearMin` |
/// | year_max | `yearMax` |
/// | zip | `zip` |
///
/// # Examples
///
/// ```
/// use lot_trawler::config::SearchConfig;
/// use lot_trawler::url::build_search_url;
///
/// let url = build_search_url(&SearchConfig::default()).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://www.truecar.com/used-cars-for-sale/listings/?makeSlug=chevrolet&modelSlug=malibu"
/// );
/// ```
pub fn build_search_url(search: &SearchConfig) -> Result<Url, url::ParseError> {
    if let Some(start_url) = &search.start_url {
        return Url::parse(start_url);
    }

    let mut url = Url::parse(&search.base_url)?;

    if let Some(make) = non_blank(search.make.as_deref()) {
        set_query_param(&mut url, "makeSlug", &make.to_lowercase());
    }
    if let Some(model) = non_blank(search.model.as_deref()) {
        set_query_param(&mut url, "modelSlug", &model.to_lowercase());
    }
    if let Some(year_min) = search.year_min {
        set_query_param(&mut url, "yearMin", &year_min.to_string());
    }
    if let Some(year_max) = search.year_max {
        set_query_param(&mut url, "yearMax", &year_max.to_string());
    }
    if let Some(zip) = non_blank(search.zip.as_deref()) {
        set_query_param(&mut url, "zip", zip.trim());
    }

    Ok(url)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
