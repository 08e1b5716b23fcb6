//! URL helpers for the navigation hot path
//!
//! These functions work directly on string slices; the only allocations are
//! for the lowercased domain and for percent-encoding.

// =============================================================================
// Scheme
// =============================================================================

/// Whether the URL is an `http(s)` page the engine should look at.
#[inline]
pub fn is_web_url(url: &str) -> bool {
    let bytes = url.as_bytes();
    (bytes.len() >= 8 && bytes[..8].eq_ignore_ascii_case(b"https://"))
        || (bytes.len() >= 7 && bytes[..7].eq_ignore_ascii_case(b"http://"))
}

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();
    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    if bytes.len() > colon_pos + 2 && bytes[colon_pos + 1] == b'/' && bytes[colon_pos + 2] == b'/' {
        return Some(colon_pos + 3);
    }

    None
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Host without userinfo or port. Returns a slice into the original URL.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let scheme_end = get_scheme_end(url)?;
    let rest = &url[scheme_end..];

    let authority_end = rest
        .find(|c| c == '/' || c == '?' || c == '#')
        .unwrap_or(rest.len());
    let mut authority = &rest[..authority_end];

    if let Some(at_pos) = authority.rfind('@') {
        authority = &authority[at_pos + 1..];
    }

    // IPv6 literal
    if authority.starts_with('[') {
        let close = authority.find(']')?;
        return Some(&authority[..=close]);
    }

    let host = match authority.find(':') {
        Some(port_pos) => &authority[..port_pos],
        None => authority,
    };

    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Registrable-ish domain used as the permanent whitelist key:
/// the lowercased host with a leading `www.` removed.
pub fn domain_of(url: &str) -> Option<String> {
    let host = extract_host(url)?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

// =============================================================================
// Query Encoding
// =============================================================================

/// Percent-encode a query component the way `encodeURIComponent` does.
pub fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(hex_digit(b >> 4));
            out.push(hex_digit(b & 0x0f));
        }
    }
    out
}

/// Decode a percent-encoded query component. `+` is treated as a space.
/// Invalid escapes are kept verbatim; invalid UTF-8 is replaced.
pub fn decode_component(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (from_hex(bytes[i + 1]), from_hex(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Iterate the decoded `key=value` pairs of a URL's query string.
pub fn query_pairs(url: &str) -> impl Iterator<Item = (String, String)> + '_ {
    let query = match url.find('?') {
        Some(pos) => &url[pos + 1..],
        None => "",
    };
    let query = match query.find('#') {
        Some(pos) => &query[..pos],
        None => query,
    };

    query.split('&').filter(|pair| !pair.is_empty()).map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (decode_component(key), decode_component(value))
    })
}

/// First decoded value for `key` in the URL's query string.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    query_pairs(url).find(|(k, _)| k == key).map(|(_, v)| v)
}

#[inline]
fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')')
}

#[inline]
fn hex_digit(nibble: u8) -> char {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    HEX[(nibble & 0x0f) as usize] as char
}

#[inline]
fn from_hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
