//! Read policies for profile documents.
//!
//! Every lenient read path goes through this module so the policy for each
//! call site is explicit:
//!
//! - the site's own profile: any failure reads as an empty profile
//!   ([`own_profile`]);
//! - a remote profile: failures are classified into [`FetchOutcome`], where
//!   only a timeout counts as "not downloaded".

use plume_cache::{CacheResult, FileContents};
use plume_types::Document;
use tracing::debug;

/// Result of fetching one remote profile.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchOutcome {
    /// The profile was read and parsed.
    Fetched(Document),
    /// The fetch did not finish within the timeout.
    TimedOut,
    /// Any other failure: missing file, unreachable peer, malformed JSON.
    Unavailable(String),
}

impl FetchOutcome {
    /// Classify the result of reading a profile file.
    pub fn classify(result: CacheResult<FileContents>) -> Self {
        match result {
            Ok(contents) => match contents.into_json().map(Document::from_value) {
                Some(Ok(doc)) => Self::Fetched(doc),
                Some(Err(e)) => Self::Unavailable(e.to_string()),
                None => Self::Unavailable("profile is not JSON".into()),
            },
            Err(e) if e.is_timeout() => Self::TimedOut,
            Err(e) => Self::Unavailable(e.to_string()),
        }
    }

    /// Whether the site counts as downloaded.
    ///
    /// Only a timeout yields `false`; other failures are reported as
    /// downloaded with an empty profile.
    pub fn downloaded(&self) -> bool {
        !matches!(self, Self::TimedOut)
    }

    /// The fetched profile, or an empty one.
    pub fn into_document(self) -> Document {
        match self {
            Self::Fetched(doc) => doc,
            Self::TimedOut | Self::Unavailable(_) => Document::new(),
        }
    }
}

/// The site's own profile, treating every failure as "no profile yet".
pub fn own_profile(result: CacheResult<FileContents>, url: &str) -> Document {
    match FetchOutcome::classify(result) {
        FetchOutcome::Fetched(doc) => doc,
        FetchOutcome::TimedOut => {
            debug!(url, "timed out reading /profile.json, treating as empty");
            Document::new()
        }
        FetchOutcome::Unavailable(reason) => {
            debug!(url, %reason, "failed reading /profile.json (this may not be a bug)");
            Document::new()
        }
    }
}
