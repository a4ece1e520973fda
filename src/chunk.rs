//! Spreading a sealed session across several cookies and putting it back together.
//!
//! A payload that fits in one cookie is stored under the bare prefix (`session`). Larger
//! payloads use zero-based indexed names (`session-0`, `session-1`, ...). Reassembly orders
//! chunks by the index embedded in the name, never by header order.
//!
//! Every chunk but the last is exactly `max_chunk_size` characters long. A set whose final
//! chunk is full may have lost chunks past the end, so [`ChunkSet::open`] reports a failure
//! to open such a set as a missing chunk.

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::{
    config::{DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MAX_CHUNKS},
    error::SessionError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Unindexed,
    Indexed(usize),
}

fn parse_slot(prefix: &str, name: &str, max_chunks: usize) -> Option<Slot> {
    let rest = name.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(Slot::Unindexed);
    }

    let digits = rest.strip_prefix('-')?;
    let canonical = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'));
    if !canonical {
        return None;
    }

    digits
        .parse()
        .ok()
        .filter(|index| *index < max_chunks)
        .map(Slot::Indexed)
}

/// Cookie name for chunk `index` of a multi-cookie session.
#[must_use]
pub fn chunk_name(prefix: &str, index: usize) -> String {
    format!("{prefix}-{index}")
}

/// Size bounds of a chunk set.
///
/// Indexed cookies at or beyond `max_chunks` are never part of a session, whoever sent them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimits {
    pub max_chunk_size: usize,
    pub max_chunks: usize,
}

impl ChunkLimits {
    #[must_use]
    pub fn new(max_chunk_size: usize, max_chunks: usize) -> Self {
        Self {
            max_chunk_size,
            max_chunks,
        }
    }
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MAX_CHUNKS)
    }
}

/// The set of cookie names a session occupies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkSlots {
    unindexed: bool,
    indexed: usize,
}

impl ChunkSlots {
    /// Slots used by a freshly split session of `count` chunks.
    #[must_use]
    pub fn for_count(count: usize) -> Self {
        match count {
            0 => Self::default(),
            1 => Self {
                unindexed: true,
                indexed: 0,
            },
            n => Self {
                unindexed: false,
                indexed: n,
            },
        }
    }

    /// Slots occupied by the given cookie names, ignoring indexes at or beyond `max_chunks`.
    /// Indexed slots cover everything up to the highest index seen, so gaps left by a lost
    /// chunk are still cleaned up.
    pub fn observe<I, N>(prefix: &str, names: I, max_chunks: usize) -> Self
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| parse_slot(prefix, name.as_ref(), max_chunks))
            .fold(Self::default(), |mut slots, slot| {
                match slot {
                    Slot::Unindexed => slots.unindexed = true,
                    Slot::Indexed(i) => slots.indexed = slots.indexed.max(i + 1),
                }
                slots
            })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.unindexed && self.indexed == 0
    }

    /// Every cookie name covered by these slots.
    #[must_use]
    pub fn names(&self, prefix: &str) -> Vec<String> {
        let unindexed = self.unindexed.then(|| prefix.to_string());
        unindexed
            .into_iter()
            .chain((0..self.indexed).map(|i| chunk_name(prefix, i)))
            .collect()
    }

    fn contains(&self, slot: Slot) -> bool {
        match slot {
            Slot::Unindexed => self.unindexed,
            Slot::Indexed(i) => i < self.indexed,
        }
    }
}

/// Encode `sealed` for transport and cut it into `(name, value)` pairs of at most
/// `max_chunk_size` characters each. Always yields at least one pair, and exactly
/// `ceil(encoded_len / max_chunk_size)` pairs for a non-empty payload.
#[must_use]
pub fn split(prefix: &str, sealed: &[u8], max_chunk_size: usize) -> Vec<(String, String)> {
    let encoded = URL_SAFE_NO_PAD.encode(sealed);
    let max = max_chunk_size.max(1);

    if encoded.len() <= max {
        return vec![(prefix.to_string(), encoded)];
    }

    // Base64 text is ASCII, so every byte offset is a char boundary.
    (0..encoded.len().div_ceil(max))
        .map(|i| {
            let start = i * max;
            let end = (start + max).min(encoded.len());
            (chunk_name(prefix, i), encoded[start..end].to_string())
        })
        .collect()
}

/// The transport text of one session, joined from its chunk cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSet {
    encoded: String,
    count: usize,
    open_ended: bool,
}

impl ChunkSet {
    /// Number of cookies the set was joined from.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// An indexed set whose last chunk is full. Chunks past the end may have been lost.
    #[must_use]
    pub fn is_open_ended(&self) -> bool {
        self.open_ended
    }

    /// Decode the transport text into sealed bytes.
    pub fn sealed(&self) -> Result<Vec<u8>, SessionError> {
        URL_SAFE_NO_PAD
            .decode(self.encoded.as_bytes())
            .map_err(|err| self.truncated_or(SessionError::MalformedPayload(err.to_string())))
    }

    /// Decode the sealed bytes and hand them to `open`. If an open-ended set fails to open,
    /// the failure is reported as the chunk after the last one present going missing.
    pub fn open<T, F>(&self, open: F) -> Result<T, SessionError>
    where
        F: FnOnce(&[u8]) -> Result<T, SessionError>,
    {
        open(&self.sealed()?).map_err(|err| match err {
            SessionError::TamperedOrCorrupt | SessionError::MalformedPayload(_) => {
                self.truncated_or(err)
            }
            other => other,
        })
    }

    fn truncated_or(&self, err: SessionError) -> SessionError {
        if self.open_ended {
            SessionError::MissingChunk { index: self.count }
        } else {
            err
        }
    }
}

/// Collect the chunk cookies for `prefix` from `cookies`, in any order.
pub fn reassemble<I, N, V>(
    prefix: &str,
    cookies: I,
    limits: ChunkLimits,
) -> Result<ChunkSet, SessionError>
where
    I: IntoIterator<Item = (N, V)>,
    N: AsRef<str>,
    V: AsRef<str>,
{
    let mut unindexed = None;
    let mut indexed = BTreeMap::new();

    for (name, value) in cookies {
        match parse_slot(prefix, name.as_ref(), limits.max_chunks) {
            Some(Slot::Unindexed) => unindexed = Some(value.as_ref().to_string()),
            Some(Slot::Indexed(i)) => {
                indexed.insert(i, value.as_ref().to_string());
            }
            None => {}
        }
    }

    match (unindexed, indexed.is_empty()) {
        (None, true) => Err(SessionError::NoSessionCookie),
        (Some(_), false) => Err(SessionError::ConflictingChunks),
        (Some(encoded), true) => Ok(ChunkSet {
            encoded,
            count: 1,
            open_ended: false,
        }),
        (None, false) => join(indexed, limits.max_chunk_size),
    }
}

fn join(indexed: BTreeMap<usize, String>, max_chunk_size: usize) -> Result<ChunkSet, SessionError> {
    let count = indexed.len();
    let mut encoded = String::new();
    let mut last_len = 0;
    for (expected, (index, value)) in indexed.into_iter().enumerate() {
        if index != expected {
            return Err(SessionError::MissingChunk { index: expected });
        }
        last_len = value.len();
        encoded.push_str(&value);
    }

    Ok(ChunkSet {
        encoded,
        count,
        open_ended: last_len >= max_chunk_size.max(1),
    })
}

/// Names occupied by `previous` that `next` does not reuse. These must be expired so a stale
/// chunk is never read back as part of a differently sized session.
#[must_use]
pub fn clear(prefix: &str, previous: ChunkSlots, next: ChunkSlots) -> Vec<String> {
    previous
        .names(prefix)
        .into_iter()
        .filter(|name| {
            parse_slot(prefix, name, usize::MAX)
                .map(|slot| !next.contains(slot))
                .unwrap_or(false)
        })
        .collect()
}
