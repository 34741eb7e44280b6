//! URL slicing for the upgrade path
//!
//! Only plain `http` URLs are upgrade candidates, and only their host feeds
//! the rule-database key walk. Both checks work on the borrowed string.

const HTTP_PREFIX: &[u8] = b"http://";

/// Whether `url` starts with `http://` (any case).
#[inline]
pub fn is_plain_http(url: &str) -> bool {
    url.as_bytes()
        .get(..HTTP_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(HTTP_PREFIX))
}

/// Host of an absolute URL, without userinfo or port.
///
/// `None` when `url` has no `://` authority or the host is empty.
pub fn extract_host(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];

    let host_and_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = host_and_port.split(':').next().unwrap_or(host_and_port);

    (!host.is_empty()).then_some(host)
}
