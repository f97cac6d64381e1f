//! Well-known archive paths and broadcast file naming.
//!
//! Broadcasts live at `/broadcasts/<ms>.json`, where `<ms>` is a millisecond
//! timestamp rendered with at least 13 digits. Names produced by one
//! [`BroadcastClock`] are strictly increasing, so lexicographic order of the
//! names matches the order the posts were created in.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::url::normalize_url;

/// Path of the profile document inside a site archive.
pub const PROFILE_PATH: &str = "/profile.json";

/// Directory holding broadcast documents.
pub const BROADCASTS_DIR: &str = "/broadcasts";

/// Width the timestamp component is zero-padded to.
const TIMESTAMP_WIDTH: usize = 13;

/// Monotonic millisecond timestamp source for broadcast names.
///
/// Each call to [`tick`](Self::tick) returns `max(wall_clock, last + 1)`, so
/// two broadcasts requested within the same millisecond still get distinct,
/// ordered names. Use [`for_site`](Self::for_site) to share one clock among
/// every handle on the same site in this process.
pub struct BroadcastClock {
    last_ms: Mutex<u64>,
}

impl BroadcastClock {
    /// Create a clock that has not issued any timestamp yet.
    pub fn new() -> Self {
        Self {
            last_ms: Mutex::new(0),
        }
    }

    /// The process-wide clock for the site at `url`.
    ///
    /// Equivalent spellings of a site URL share one clock. URLs that do not
    /// normalize are keyed by their trimmed text.
    pub fn for_site(url: &str) -> Arc<Self> {
        static CLOCKS: OnceLock<Mutex<HashMap<String, Arc<BroadcastClock>>>> = OnceLock::new();
        let key = normalize_url(url).unwrap_or_else(|| url.trim());
        let mut clocks = CLOCKS
            .get_or_init(Default::default)
            .lock()
            .expect("clock registry poisoned");
        Arc::clone(clocks.entry(key.to_string()).or_default())
    }

    /// Issue the next timestamp, strictly greater than every previous one.
    pub fn tick(&self) -> u64 {
        self.tick_at(Self::wall_clock_ms())
    }

    /// Issue the next timestamp using `wall_ms` as the current wall clock.
    pub fn tick_at(&self, wall_ms: u64) -> u64 {
        let mut last = self.last_ms.lock().expect("clock mutex poisoned");
        let next = wall_ms.max(last.saturating_add(1));
        *last = next;
        next
    }

    /// The most recently issued timestamp, or `0` if none was issued.
    pub fn last(&self) -> u64 {
        *self.last_ms.lock().expect("clock mutex poisoned")
    }

    /// Issue the next timestamp and render it as a broadcast path.
    pub fn next_path(&self) -> String {
        broadcast_path(self.tick())
    }

    fn wall_clock_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

impl Default for BroadcastClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BroadcastClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastClock")
            .field("last_ms", &self.last())
            .finish()
    }
}

/// Render the archive path of the broadcast published at `ms`.
///
/// ```
/// use plume_types::broadcast_path;
///
/// assert_eq!(broadcast_path(42), "/broadcasts/0000000000042.json");
/// ```
pub fn broadcast_path(ms: u64) -> String {
    format!("{BROADCASTS_DIR}/{ms:0width$}.json", width = TIMESTAMP_WIDTH)
}

/// Parse the publish time encoded in a broadcast file name or path.
///
/// The name must end in `<digits>.json` (extension case-insensitive). Names
/// that do not match, overflow `u64`, or encode `0` yield `None`.
///
/// ```
/// use plume_types::parse_broadcast_filename;
///
/// assert_eq!(parse_broadcast_filename("1500000000000.json"), Some(1_500_000_000_000));
/// assert_eq!(parse_broadcast_filename("/broadcasts/post-17.JSON"), Some(17));
/// assert_eq!(parse_broadcast_filename("notes.json"), None);
/// ```
pub fn parse_broadcast_filename(name: &str) -> Option<u64> {
    let split = name.len().checked_sub(".json".len())?;
    if !name.is_char_boundary(split) || !name[split..].eq_ignore_ascii_case(".json") {
        return None;
    }
    let stem = &name[..split];
    let digit_count = stem.bytes().rev().take_while(u8::is_ascii_digit).count();
    let digits = &stem[stem.len() - digit_count..];
    if digits.is_empty() {
        return None;
    }
    match digits.parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(ms) => Some(ms),
    }
}

/// The directories that must exist before `path` can be written, outermost
/// first. The archive root is never included.
///
/// ```
/// use plume_types::parent_directories;
///
/// assert_eq!(parent_directories("/a/b/c.json"), vec!["/a", "/a/b"]);
/// assert!(parent_directories("/c.json").is_empty());
/// ```
pub fn parent_directories(path: &str) -> Vec<String> {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let Some((_, dirs)) = parts.split_last() else {
        return Vec::new();
    };
    (1..=dirs.len())
        .map(|i| format!("/{}", dirs[..i].join("/")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn site_clocks_are_shared_per_site() {
        let a = BroadcastClock::for_site("dat://clock-share");
        let b = BroadcastClock::for_site("dat://clock-share/some/path");
        let other = BroadcastClock::for_site("dat://clock-other");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));

        let first = a.tick_at(5);
        assert_eq!(b.tick_at(5), first + 1);
    }

    #[test]
    fn site_clock_ticks_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    let clock = BroadcastClock::for_site("dat://clock-threads");
                    (0..100).map(|_| clock.tick()).collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
    }

    #[test]
    fn tick_is_strictly_monotonic_within_same_millisecond() {
        let clock = BroadcastClock::new();
        let a = clock.tick_at(1_000);
        let b = clock.tick_at(1_000);
        let c = clock.tick_at(1_000);
        assert_eq!((a, b, c), (1_000, 1_001, 1_002));
    }

    #[test]
    fn tick_follows_wall_clock_when_it_advances() {
        let clock = BroadcastClock::new();
        clock.tick_at(1_000);
        clock.tick_at(1_000);
        assert_eq!(clock.tick_at(5_000), 5_000);
        assert_eq!(clock.last(), 5_000);
    }

    #[test]
    fn tick_never_goes_backwards() {
        let clock = BroadcastClock::new();
        clock.tick_at(5_000);
        assert_eq!(clock.tick_at(10), 5_001);
    }

    #[test]
    fn rapid_real_ticks_are_unique() {
        let clock = BroadcastClock::new();
        let mut prev = clock.tick();
        for _ in 0..1000 {
            let next = clock.tick();
            assert!(next > prev, "clock must be strictly monotonic: {prev} >= {next}");
            prev = next;
        }
    }

    #[test]
    fn next_path_roundtrips_through_parse() {
        let clock = BroadcastClock::new();
        let path = clock.next_path();
        assert!(path.starts_with("/broadcasts/"));
        assert_eq!(parse_broadcast_filename(&path), Some(clock.last()));
    }

    #[test]
    fn parse_rejects_non_broadcasts() {
        assert_eq!(parse_broadcast_filename(""), None);
        assert_eq!(parse_broadcast_filename(".json"), None);
        assert_eq!(parse_broadcast_filename("0.json"), None);
        assert_eq!(parse_broadcast_filename("12.txt"), None);
        assert_eq!(parse_broadcast_filename("12.json.bak"), None);
        assert_eq!(parse_broadcast_filename("99999999999999999999999.json"), None);
    }

    #[test]
    fn parse_takes_trailing_digits_only() {
        assert_eq!(parse_broadcast_filename("v2-post-0042.json"), Some(42));
        assert_eq!(parse_broadcast_filename("0000000000007.json"), Some(7));
    }

    #[test]
    fn parent_directories_of_nested_path() {
        assert_eq!(
            parent_directories("/broadcasts/1.json"),
            vec!["/broadcasts".to_string()]
        );
        assert_eq!(parent_directories("relative/x/y"), vec!["/relative", "/relative/x"]);
        assert!(parent_directories("").is_empty());
    }

    proptest! {
        #[test]
        fn path_order_matches_time_order(a in 1u64..9_999_999_999_999, b in 1u64..9_999_999_999_999) {
            let (pa, pb) = (broadcast_path(a), broadcast_path(b));
            prop_assert_eq!(a.cmp(&b), pa.cmp(&pb));
        }
    }
}
