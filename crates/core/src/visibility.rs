//! Bucket visibility
//!
//! Visibility is encoded in the bucket name: the private bucket is the public
//! bucket's base name with [`PRIVATE_SUFFIX`] appended.

use std::fmt;

use serde::Serialize;

/// Suffix distinguishing the private bucket from the public one
pub const PRIVATE_SUFFIX: &str = "-private";

/// Who may read objects in a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Anonymous read through a bucket policy; links never expire
    Public,
    /// No anonymous access; links are presigned and expire
    Private,
}

impl Visibility {
    /// Visibility selected by a `--private` style flag
    pub const fn from_private_flag(private: bool) -> Self {
        if private {
            Self::Private
        } else {
            Self::Public
        }
    }

    /// Name of the bucket holding objects of this visibility
    pub fn bucket_name(self, base: &str) -> String {
        match self {
            Self::Public => base.to_string(),
            Self::Private => format!("{base}{PRIVATE_SUFFIX}"),
        }
    }

    pub const fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::Private => f.write_str("private"),
        }
    }
}
