use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::Rng;
use thiserror::Error;
use time::OffsetDateTime;

use crate::record::{IncomingLog, LogRecord, RawLog};
use crate::system::{memory_usage, MemoryUsage};

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_SEARCH_RESULTS: usize = 100;

/// Levels that are always reported in `by_level`, even before any admission.
pub const KNOWN_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

// 36^9 ids, roughly 1e14: collisions within a window of a few thousand
// records are vanishingly rare, and are re-drawn anyway.
const ID_LENGTH: usize = 9;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required fields: level and message")]
    MissingRequiredFields,
    #[error("Query parameter \"q\" is required")]
    MissingQuery,
}

/// Outcome of a successful admission.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub id: String,
    pub level: String,
    pub received_at: OffsetDateTime,
    /// Records pushed out of the window to make room.
    pub evicted: usize,
    /// Records held right after this admission.
    pub window_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    pub level: Option<String>,
    pub source: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            level: None,
            source: None,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogPage {
    pub logs: Vec<LogRecord>,
    /// Number of records matching the filter, across all pages.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub results: Vec<LogRecord>,
    /// Number of matching records, which may exceed `results.len()`.
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub total_received: u64,
    pub by_level: BTreeMap<String, u64>,
    pub last_received_at: Option<OffsetDateTime>,
    pub total_logs: usize,
    pub memory_usage: MemoryUsage,
}

struct StoreState {
    // Newest first.
    records: VecDeque<LogRecord>,
    live_ids: HashSet<String>,
    total_received: u64,
    by_level: BTreeMap<String, u64>,
    last_received_at: Option<OffsetDateTime>,
}

impl StoreState {
    fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            live_ids: HashSet::with_capacity(capacity),
            total_received: 0,
            by_level: KNOWN_LEVELS
                .iter()
                .map(|level| (level.to_string(), 0))
                .collect(),
            last_received_at: None,
        }
    }

    fn fresh_id<R: Rng>(&self, rng: &mut R) -> String {
        loop {
            let id = generate_id(rng);
            if !self.live_ids.contains(&id) {
                return id;
            }
        }
    }
}

fn generate_id<R: Rng>(rng: &mut R) -> String {
    (0..ID_LENGTH)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect()
}

/// Bounded, newest-first window of log records with running counters.
///
/// All state sits behind one lock: admissions and clears are serialized
/// against each other and against readers, so a reader never sees a record
/// counted but not yet inserted, or a window above capacity. Every operation
/// is a bounded in-memory computation and never awaits.
pub struct LogStore {
    capacity: usize,
    state: RwLock<StoreState>,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogStore {
    /// Creates an empty store. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: RwLock::new(StoreState::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validates and inserts a record at the head of the window, evicting the
    /// oldest records beyond capacity. Nothing changes when validation fails.
    pub fn admit(
        &self,
        raw: RawLog,
        received_at: OffsetDateTime,
    ) -> Result<Admission, ValidationError> {
        let incoming = IncomingLog::from_raw(raw)?;
        let level = incoming.level.clone();

        let mut state = self.write();
        let id = state.fresh_id(&mut rand::thread_rng());
        state.live_ids.insert(id.clone());
        state
            .records
            .push_front(incoming.into_record(id.clone(), received_at));

        let mut evicted = 0;
        while state.records.len() > self.capacity {
            let Some(oldest) = state.records.pop_back() else {
                break;
            };
            state.live_ids.remove(&oldest.id);
            evicted += 1;
        }

        state.total_received += 1;
        *state.by_level.entry(level.clone()).or_insert(0) += 1;
        state.last_received_at = Some(received_at);

        Ok(Admission {
            id,
            level,
            received_at,
            evicted,
            window_size: state.records.len(),
        })
    }

    /// Returns one page of the records matching the filter, in store order.
    pub fn list(&self, filter: &ListFilter) -> LogPage {
        let state = self.read();
        let matching: Vec<&LogRecord> = state
            .records
            .iter()
            .filter(|record| record.has_level(filter.level.as_deref()))
            .filter(|record| record.has_source(filter.source.as_deref()))
            .collect();

        let total = matching.len();
        let logs = matching
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .cloned()
            .collect();

        LogPage {
            logs,
            total,
            limit: filter.limit,
            offset: filter.offset,
            has_more: filter.offset.saturating_add(filter.limit) < total,
        }
    }

    /// Case-insensitive substring search over messages, optionally restricted
    /// to one level. Returns at most `MAX_SEARCH_RESULTS` records.
    pub fn search(
        &self,
        query: &str,
        level: Option<&str>,
    ) -> Result<SearchResults, ValidationError> {
        if query.is_empty() {
            return Err(ValidationError::MissingQuery);
        }
        let needle = query.to_lowercase();

        let state = self.read();
        let mut results = Vec::new();
        let mut total = 0;
        for record in state
            .records
            .iter()
            .filter(|record| record.has_level(level))
            .filter(|record| record.message.to_lowercase().contains(&needle))
        {
            if results.len() < MAX_SEARCH_RESULTS {
                results.push(record.clone());
            }
            total += 1;
        }

        Ok(SearchResults { results, total })
    }

    pub fn stats(&self) -> StoreStats {
        let memory_usage = memory_usage();
        let state = self.read();

        StoreStats {
            total_received: state.total_received,
            by_level: state.by_level.clone(),
            last_received_at: state.last_received_at,
            total_logs: state.records.len(),
            memory_usage,
        }
    }

    /// Drops every record and resets all counters, returning how many records
    /// were discarded.
    pub fn clear(&self) -> usize {
        let mut state = self.write();
        let cleared = state.records.len();
        *state = StoreState::new(self.capacity);
        cleared
    }

    // The lock is never held across a panic point mid-mutation, so a poisoned
    // lock still guards consistent state.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
