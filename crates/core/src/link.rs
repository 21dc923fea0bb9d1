//! Share links and their resolution back to storage coordinates
//!
//! A share link is either a public URL (`{endpoint}/{bucket}/{key}`) or a
//! path-style presigned URL carrying signature and expiry query parameters.
//! Both forms resolve identically: the query string is ignored. Expiry of a
//! presigned link is read from its `X-Amz-Date` and `X-Amz-Expires`
//! parameters.

use std::fmt;
use std::time::Duration;

use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

/// Query parameter carrying the SigV4 signature of a presigned URL
pub const SIGNATURE_PARAM: &str = "X-Amz-Signature";

/// Query parameter carrying the validity window of a presigned URL
pub const EXPIRES_PARAM: &str = "X-Amz-Expires";

/// Query parameter carrying the signing time of a presigned URL
pub const DATE_PARAM: &str = "X-Amz-Date";

/// SigV4 basic format, always UTC
const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Bucket and key of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// A URL handed out for a published object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    /// The link itself
    pub url: String,

    /// Where the link points
    pub location: ObjectLocation,

    /// Validity of a signed link; `None` for public links
    pub expires_in: Option<Duration>,
}

impl ShareLink {
    /// Unsigned link into a public bucket
    pub fn public(endpoint: &Url, location: ObjectLocation) -> Self {
        Self {
            url: public_url(endpoint, &location),
            location,
            expires_in: None,
        }
    }

    /// Presigned link into a private bucket
    pub fn signed(url: impl Into<String>, location: ObjectLocation, expires_in: Duration) -> Self {
        Self {
            url: url.into(),
            location,
            expires_in: Some(expires_in),
        }
    }

    /// Whether the URL carries a signature and expiry
    pub fn is_signed(&self) -> bool {
        is_signed_url(&self.url)
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Build `{endpoint}/{bucket}/{key}` with the key percent-encoded
pub fn public_url(endpoint: &Url, location: &ObjectLocation) -> String {
    let base = endpoint.as_str().trim_end_matches('/');
    format!(
        "{base}/{}/{}",
        urlencoding::encode(&location.bucket),
        urlencoding::encode(&location.key)
    )
}

/// Whether `url` carries presigned query parameters
pub fn is_signed_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let mut signed = false;
    let mut expires = false;
    for (name, _) in parsed.query_pairs() {
        signed |= name.eq_ignore_ascii_case(SIGNATURE_PARAM);
        expires |= name.eq_ignore_ascii_case(EXPIRES_PARAM);
    }
    signed && expires
}

/// Instant a presigned link stops working
///
/// `None` when the link lacks a parseable signing time or validity window,
/// which includes every public link.
pub fn signed_expiry(link: &str) -> Option<Timestamp> {
    let url = Url::parse(link.trim()).ok()?;

    let mut signed_at = None;
    let mut valid_for = None;
    for (name, value) in url.query_pairs() {
        if name.eq_ignore_ascii_case(DATE_PARAM) {
            signed_at = Some(value.into_owned());
        } else if name.eq_ignore_ascii_case(EXPIRES_PARAM) {
            valid_for = value.parse::<i64>().ok();
        }
    }

    let signed_at = DateTime::strptime(AMZ_DATE_FORMAT, signed_at?)
        .ok()?
        .to_zoned(TimeZone::UTC)
        .ok()?
        .timestamp();
    Timestamp::from_second(signed_at.as_second().checked_add(valid_for?)?).ok()
}

/// Map a share link back to the object it references
///
/// The first path segment is the bucket, everything after it is the key.
/// Query parameters are ignored so public and presigned links resolve alike.
pub fn resolve(link: &str) -> Result<ObjectLocation> {
    let url = Url::parse(link.trim())
        .map_err(|e| Error::MalformedLink(format!("{link}: {e}")))?;

    let mut segments = url
        .path_segments()
        .ok_or_else(|| Error::MalformedLink(format!("{link}: url has no path")))?;

    let bucket = segments.next().unwrap_or_default();
    let rest: Vec<&str> = segments.collect();
    let key = rest.join("/");

    if bucket.is_empty() || rest.first().is_none_or(|first| first.is_empty()) {
        return Err(Error::MalformedLink(format!(
            "{link}: could not determine bucket and object name"
        )));
    }

    let bucket = decode(bucket, link)?;
    let key = decode(&key, link)?;

    Ok(ObjectLocation { bucket, key })
}

fn decode(segment: &str, link: &str) -> Result<String> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|e| Error::MalformedLink(format!("{link}: {e}")))
}
