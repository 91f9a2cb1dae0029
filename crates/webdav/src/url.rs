use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encodes the path of an unencoded `scheme://host/path` URL.
///
/// Scheme and authority are left alone; each path segment is encoded
/// separately so `/` keeps its meaning.
pub fn encode_url(url: &str) -> String {
    let (origin, path) = split_origin(url);
    let encoded: Vec<String> = path
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect();
    format!("{origin}{}", encoded.join("/"))
}

/// Decoded last path segment of `href`, ignoring a trailing slash.
pub fn last_segment(href: &str) -> String {
    let trimmed = href.trim_end_matches('/');
    let raw = trimmed.rsplit('/').next().unwrap_or(trimmed);
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn split_origin(url: &str) -> (&str, &str) {
    let after_scheme = url.find("://").map_or(0, |i| i + 3);
    match url[after_scheme..].find('/') {
        Some(i) => url.split_at(after_scheme + i),
        None => (url, ""),
    }
}
