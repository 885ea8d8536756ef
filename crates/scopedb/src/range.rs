//! Byte-range arithmetic for prefixes and intervals.
//!
//! Every scope and every prefix-restricted cursor sees the engine through a
//! [`KeyRange`] built by [`KeyRange::prefix`], and every range query narrows
//! that further with a caller-supplied [`RangeInterval`].

use std::cmp::Ordering;
use std::ops::Bound::{self, Excluded, Included, Unbounded};

/// Smallest key strictly greater than every key starting with `prefix`.
///
/// Increments the rightmost byte that is not `0xFF` and drops everything
/// after it. Returns `None` when no finite bound exists (`prefix` is empty or
/// all `0xFF`), meaning the range runs to the end of the keyspace.
///
/// - `b"a"` → `b"b"`
/// - `b"a\xff"` → `b"b"`
/// - `b"\xff\xff\xfe"` → `b"\xff\xff\xff"`
/// - `b"\xff\xff\xff"` → `None`
pub fn upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let last = prefix.iter().rposition(|&b| b != 0xFF)?;
    let mut bound = prefix[..=last].to_vec();
    bound[last] += 1;
    Some(bound)
}

fn concat(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + key.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(key);
    out
}

/// A half-open or closed interval of engine keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    start: Bound<Vec<u8>>,
    end: Bound<Vec<u8>>,
}

impl KeyRange {
    pub fn new(start: Bound<Vec<u8>>, end: Bound<Vec<u8>>) -> Self {
        Self { start, end }
    }

    /// The whole keyspace.
    pub fn all() -> Self {
        Self::new(Unbounded, Unbounded)
    }

    /// `[prefix, upper_bound(prefix))`, open-ended where no bound exists.
    pub fn prefix(prefix: &[u8]) -> Self {
        let start = if prefix.is_empty() {
            Unbounded
        } else {
            Included(prefix.to_vec())
        };
        let end = upper_bound(prefix).map_or(Unbounded, Excluded);
        Self::new(start, end)
    }

    pub fn start(&self) -> &Bound<Vec<u8>> {
        &self.start
    }

    pub fn end(&self) -> &Bound<Vec<u8>> {
        &self.end
    }

    /// Keys in both ranges. The tighter bound wins on each side; on equal
    /// keys the exclusive bound is tighter.
    pub fn intersect(&self, other: &KeyRange) -> KeyRange {
        KeyRange {
            start: tighter(&self.start, &other.start, Ordering::Greater),
            end: tighter(&self.end, &other.end, Ordering::Less),
        }
    }

    /// `key` is not below the start bound.
    pub fn after_start(&self, key: &[u8]) -> bool {
        match &self.start {
            Included(s) => key >= s.as_slice(),
            Excluded(s) => key > s.as_slice(),
            Unbounded => true,
        }
    }

    /// `key` is not above the end bound.
    pub fn before_end(&self, key: &[u8]) -> bool {
        match &self.end {
            Included(e) => key <= e.as_slice(),
            Excluded(e) => key < e.as_slice(),
            Unbounded => true,
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.after_start(key) && self.before_end(key)
    }

    /// True when no byte string can satisfy both bounds.
    ///
    /// An exclusive start `s` is the inclusive start `s ++ [0x00]`, the
    /// immediate successor of `s`, which makes the test exact.
    pub fn is_empty(&self) -> bool {
        let start = match &self.start {
            // Nothing sorts below the empty key
            Unbounded => Vec::new(),
            Included(s) => s.clone(),
            Excluded(s) => concat(s, &[0x00]),
        };
        match &self.end {
            Unbounded => false,
            Included(e) => start > *e,
            Excluded(e) => start >= *e,
        }
    }
}

/// Pick the more restrictive of two bounds on the same side. `wins` is the
/// key ordering that makes a bound tighter: `Greater` for starts, `Less` for
/// ends.
fn tighter(a: &Bound<Vec<u8>>, b: &Bound<Vec<u8>>, wins: Ordering) -> Bound<Vec<u8>> {
    match (a, b) {
        (Unbounded, other) | (other, Unbounded) => other.clone(),
        (Included(x) | Excluded(x), Included(y) | Excluded(y)) => match x.cmp(y) {
            Ordering::Equal if matches!(a, Excluded(_)) => a.clone(),
            Ordering::Equal => b.clone(),
            ord if ord == wins => a.clone(),
            _ => b.clone(),
        },
    }
}

/// A caller-facing interval in scope-local keys.
///
/// An absent bound is unbounded no matter what its inclusivity flag says.
/// A present start is inclusive and a present end exclusive unless
/// overridden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeInterval {
    start: Option<Vec<u8>>,
    start_inclusive: bool,
    end: Option<Vec<u8>>,
    end_inclusive: bool,
}

impl Default for RangeInterval {
    fn default() -> Self {
        Self {
            start: None,
            start_inclusive: true,
            end: None,
            end_inclusive: false,
        }
    }
}

impl RangeInterval {
    /// Unbounded on both sides.
    pub fn all() -> Self {
        Self::default()
    }

    /// `[start, end)`
    pub fn between(start: &[u8], end: &[u8]) -> Self {
        Self::default().start(start).end(end)
    }

    pub fn start(mut self, key: &[u8]) -> Self {
        self.start = Some(key.to_vec());
        self
    }

    pub fn end(mut self, key: &[u8]) -> Self {
        self.end = Some(key.to_vec());
        self
    }

    pub fn start_inclusive(mut self, yes: bool) -> Self {
        self.start_inclusive = yes;
        self
    }

    pub fn end_inclusive(mut self, yes: bool) -> Self {
        self.end_inclusive = yes;
        self
    }

    /// Build from standard bounds, e.g. `(Bound::Excluded(&b"a"[..]), Bound::Unbounded)`.
    pub fn from_bounds(start: Bound<&[u8]>, end: Bound<&[u8]>) -> Self {
        let mut interval = Self::default();
        match start {
            Included(k) => interval = interval.start(k),
            Excluded(k) => interval = interval.start(k).start_inclusive(false),
            Unbounded => {}
        }
        match end {
            Included(k) => interval = interval.end(k).end_inclusive(true),
            Excluded(k) => interval = interval.end(k),
            Unbounded => {}
        }
        interval
    }

    /// Translate into engine keys under `prefix`, clipped to the prefix's own
    /// range.
    pub fn to_key_range(&self, prefix: &[u8]) -> KeyRange {
        let bound = |key: &Option<Vec<u8>>, inclusive: bool| match key {
            None => Unbounded,
            Some(k) if inclusive => Included(concat(prefix, k)),
            Some(k) => Excluded(concat(prefix, k)),
        };
        KeyRange::new(
            bound(&self.start, self.start_inclusive),
            bound(&self.end, self.end_inclusive),
        )
        .intersect(&KeyRange::prefix(prefix))
    }
}
