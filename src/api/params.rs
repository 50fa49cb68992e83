use url::Url;

use crate::images::PreviewError;
use crate::validation::{self, Constraint, FieldRule, FieldValue};

pub const MAX_DIMENSION: i64 = 9999;

const SCHEMES: [&str; 2] = ["https", "http"];
const DEFAULT_SCHEME: &str = "https";

#[derive(Debug, Clone, PartialEq)]
pub struct ImgParams {
    pub width: u32,
    pub height: u32,
    pub url: Url,
}

const DIMENSION: Constraint = Constraint::Range {
    min: 1,
    max: MAX_DIMENSION,
};

fn rules() -> [FieldRule<ImgParams>; 2] {
    [
        FieldRule::new("width", |p| FieldValue::Int(p.width as i64), DIMENSION),
        FieldRule::new("height", |p| FieldValue::Int(p.height as i64), DIMENSION),
    ]
}

impl ImgParams {
    pub fn new(width: &str, height: &str, url: Url) -> Result<Self, PreviewError> {
        let (width, height) = match (parse_dimension(width), parse_dimension(height)) {
            (Some(w), Some(h)) => (w, h),
            _ => {
                return Err(PreviewError::InvalidRequest(
                    "width and height must be positive integers".to_string(),
                ))
            }
        };

        let params = Self { width, height, url };
        validation::validate(&params, &rules())
            .map_err(|e| PreviewError::InvalidRequest(e.to_string()))?;

        Ok(params)
    }
}

// Plain decimal digits only: no sign, no whitespace
fn parse_dimension(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Parses `/fill/{width}/{height}/{url}`; a query string belongs to the source URL.
pub fn parse_fill_path(path: &str, query: Option<&str>) -> Result<ImgParams, PreviewError> {
    let parts: Vec<&str> = path.trim_start_matches('/').splitn(4, '/').collect();

    let [_, width, height, source] = parts.as_slice() else {
        return Err(PreviewError::InvalidRequest(
            "expected /fill/{width}/{height}/{url}".to_string(),
        ));
    };

    let url = normalize_source_url(source, query)?;
    ImgParams::new(width, height, url)
}

/// Turns the tail of the request path back into an absolute http(s) URL.
///
/// Accepts `host/path`, `https://host/path` and the single-slash form
/// `https:/host/path` left behind by path normalization. Repeated scheme
/// prefixes are collapsed and trailing slashes dropped.
pub fn normalize_source_url(raw: &str, query: Option<&str>) -> Result<Url, PreviewError> {
    let mut rest = raw.trim_matches('/');
    let mut scheme = None;

    while let Some((found, tail)) = split_scheme(rest) {
        scheme.get_or_insert(found);
        rest = tail;
    }

    if rest.is_empty() {
        return Err(PreviewError::InvalidRequest("missing image URL".to_string()));
    }

    let mut candidate = format!("{}://{}", scheme.unwrap_or(DEFAULT_SCHEME), rest);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        candidate.push('?');
        candidate.push_str(query);
    }

    let url = Url::parse(&candidate)
        .map_err(|e| PreviewError::InvalidRequest(format!("invalid URL: {}", e)))?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(PreviewError::InvalidRequest("invalid URL: missing host".to_string()));
    }

    Ok(url)
}

fn split_scheme(s: &str) -> Option<(&'static str, &str)> {
    SCHEMES.iter().find_map(|&scheme| {
        let tail = s.get(..scheme.len())?;
        if !tail.eq_ignore_ascii_case(scheme) {
            return None;
        }
        let rest = s[scheme.len()..].strip_prefix(':')?;
        Some((scheme, rest.trim_start_matches('/')))
    })
}
