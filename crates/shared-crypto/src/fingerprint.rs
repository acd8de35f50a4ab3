//! # Lead Fingerprints
//!
//! Duplicate-detection hashes over normalized identities. Miners game
//! duplicate checks with protocol variations, `www.` prefixes, query
//! strings, trailing slashes, case changes, URL encoding, and subpaths
//! (`/posts/`, `/about/`); normalization collapses all of those to one
//! canonical form before hashing.

use crate::hashing::sha256_hex;

/// Which LinkedIn entity a URL is expected to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// Personal profile: `linkedin.com/in/<slug>`.
    Profile,
    /// Company page: `linkedin.com/company/<slug>`.
    Company,
}

impl UrlKind {
    fn segment(self) -> &'static str {
        match self {
            UrlKind::Profile => "/in/",
            UrlKind::Company => "/company/",
        }
    }

    fn canonical_prefix(self) -> &'static str {
        match self {
            UrlKind::Profile => "linkedin.com/in/",
            UrlKind::Company => "linkedin.com/company/",
        }
    }
}

/// SHA-256 of the normalized, lowercased email address.
pub fn compute_email_hash(email: &str) -> String {
    sha256_hex(email.trim().to_lowercase().as_bytes())
}

/// Normalize a LinkedIn URL to `linkedin.com/in/<slug>` or
/// `linkedin.com/company/<slug>`. Returns an empty string for non-LinkedIn
/// or malformed input.
pub fn normalize_linkedin_url(url: &str, kind: UrlKind) -> String {
    if url.is_empty() {
        return String::new();
    }

    let mut url = percent_decode(url).trim().to_lowercase();

    for prefix in ["https://", "http://"] {
        if let Some(rest) = url.strip_prefix(prefix) {
            url = rest.to_string();
            break;
        }
    }
    if let Some(rest) = url.strip_prefix("www.") {
        url = rest.to_string();
    }

    if !url.starts_with("linkedin.com") {
        return String::new();
    }

    // Drop query and fragment.
    let url = url.split(['?', '#']).next().unwrap_or("");

    // Collapse repeated slashes and drop the trailing one.
    let mut collapsed = String::with_capacity(url.len());
    let mut prev_slash = false;
    for c in url.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        collapsed.push(c);
    }
    let collapsed = collapsed.trim_end_matches('/');

    // Extract the slug after /in/ or /company/.
    let segment = kind.segment();
    let Some(pos) = collapsed.find(segment) else {
        return String::new();
    };
    let slug: &str = collapsed[pos + segment.len()..]
        .split('/')
        .next()
        .unwrap_or("");
    if slug.is_empty() {
        return String::new();
    }

    format!("{}{}", kind.canonical_prefix(), slug)
}

/// SHA-256 over `profile || "||" || company`, identifying "person X at
/// company Y". Empty if either URL fails to normalize.
///
/// Normalized URLs cannot contain `||`, so the separator makes the
/// concatenation collision-free.
pub fn compute_linkedin_combo_hash(profile_url: &str, company_url: &str) -> String {
    let profile = normalize_linkedin_url(profile_url, UrlKind::Profile);
    let company = normalize_linkedin_url(company_url, UrlKind::Company);
    if profile.is_empty() || company.is_empty() {
        return String::new();
    }
    sha256_hex(format!("{}||{}", profile, company).as_bytes())
}

/// Minimal percent-decoding (`%20`, `%C3%A9`, ...). Invalid escapes pass
/// through unchanged.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(
                // Slicing two ASCII hex chars cannot split a char boundary.
                std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or(""),
                16,
            ) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
