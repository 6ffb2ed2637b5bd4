//! Process-wide identity registry
//!
//! Hands out the `u64` ids shared by GameObjects and components and maps
//! each live id back to its arena slot. Ids are never reissued.
//!
//! Retirement costs no memory for ids handed out by the sequential counter:
//! everything below the counter that is not live is retired. Other ids
//! (random ones, or ids registered by hand) are remembered in a window of the
//! most recent [`RETIRED_WINDOW`] retirements. Past that window a random id is
//! kept unique by the 64-bit space alone, and a stale handle to it resolves
//! as unknown rather than destroyed.

use std::collections::{HashMap, HashSet, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Deserialize};

/// Attempts a random generator makes before reporting exhaustion
const MAX_RANDOM_ATTEMPTS: usize = 64;

/// Retired ids remembered outside the sequential counter's range
pub const RETIRED_WINDOW: usize = 4096;

/// How new ids are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdStrategy {
    /// Pseudo-random 64-bit ids; a fixed seed makes runs reproducible
    Random {
        /// Seed for the generator, or entropy when `None`
        seed: Option<u64>,
    },
    /// Monotonically increasing ids starting at `start` (0 is skipped)
    Sequential {
        /// First id handed out
        start: u64,
    },
}

impl Default for IdStrategy {
    fn default() -> Self {
        Self::Random { seed: None }
    }
}

/// Identity errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The id is already registered
    #[error("id {0} is already registered")]
    Duplicate(u64),

    /// Zero is reserved as "no id"
    #[error("id 0 is reserved")]
    Zero,

    /// The id belonged to an object that no longer exists
    #[error("id {0} has been retired")]
    Retired(u64),

    /// No fresh id could be produced
    #[error("id space exhausted")]
    Exhausted,
}

/// Most recent retirements, oldest evicted first
#[derive(Debug, Default)]
struct RetiredWindow {
    order: VecDeque<u64>,
    ids: HashSet<u64>,
}

impl RetiredWindow {
    fn insert(&mut self, id: u64) {
        if !self.ids.insert(id) {
            return;
        }
        self.order.push_back(id);
        if self.order.len() > RETIRED_WINDOW {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Registry of live ids
///
/// `generate_id` reserves a fresh id, `register` binds an id to a value and
/// `unregister` retires it.
#[derive(Debug)]
pub struct IdentityRegistry<T> {
    strategy: IdStrategy,
    rng: StdRng,
    first_sequential: u64,
    next_sequential: Option<u64>,
    live: HashMap<u64, T>,
    reserved: HashSet<u64>,
    released: HashSet<u64>,
    recently_retired: RetiredWindow,
}

impl<T: Copy> IdentityRegistry<T> {
    /// Create an empty registry
    pub fn new(strategy: IdStrategy) -> Self {
        let (rng, next_sequential) = match strategy {
            IdStrategy::Random { seed: Some(seed) } => (StdRng::seed_from_u64(seed), None),
            IdStrategy::Random { seed: None } => (StdRng::from_entropy(), None),
            IdStrategy::Sequential { start } => (StdRng::seed_from_u64(0), Some(start.max(1))),
        };

        Self {
            strategy,
            rng,
            first_sequential: next_sequential.unwrap_or(1),
            next_sequential,
            live: HashMap::new(),
            reserved: HashSet::new(),
            released: HashSet::new(),
            recently_retired: RetiredWindow::default(),
        }
    }

    /// Strategy this registry was created with
    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    /// Produce and reserve a fresh, non-zero id
    pub fn generate_id(&mut self) -> Result<u64, IdError> {
        let id = match self.strategy {
            IdStrategy::Random { .. } => self.next_random()?,
            IdStrategy::Sequential { .. } => self.next_sequential()?,
        };
        self.reserved.insert(id);
        Ok(id)
    }

    fn next_random(&mut self) -> Result<u64, IdError> {
        for _ in 0..MAX_RANDOM_ATTEMPTS {
            let candidate: u64 = self.rng.gen();
            if candidate != 0 && !self.is_taken(candidate) {
                return Ok(candidate);
            }
        }
        log::error!("Random id generation failed after {} attempts", MAX_RANDOM_ATTEMPTS);
        Err(IdError::Exhausted)
    }

    fn next_sequential(&mut self) -> Result<u64, IdError> {
        loop {
            // `None` once u64::MAX has been handed out
            let candidate = self.next_sequential.ok_or(IdError::Exhausted)?;
            if !self.is_taken(candidate) {
                self.next_sequential = candidate.checked_add(1);
                return Ok(candidate);
            }
            self.next_sequential = candidate.checked_add(1);
        }
    }

    /// Whether the sequential counter has already moved past `id`
    fn counter_passed(&self, id: u64) -> bool {
        matches!(self.strategy, IdStrategy::Sequential { .. })
            && id >= self.first_sequential
            // `None` means the counter ran through u64::MAX
            && self.next_sequential.map_or(true, |next| id < next)
    }

    fn is_taken(&self, id: u64) -> bool {
        self.live.contains_key(&id) || self.reserved.contains(&id) || self.is_retired(id)
    }

    /// Bind `id` to `value`
    ///
    /// Consumes the reservation made by [`Self::generate_id`] if there is one.
    pub fn register(&mut self, id: u64, value: T) -> Result<(), IdError> {
        if id == 0 {
            return Err(IdError::Zero);
        }
        if self.live.contains_key(&id) {
            return Err(IdError::Duplicate(id));
        }
        if self.is_retired(id) {
            return Err(IdError::Retired(id));
        }
        self.reserved.remove(&id);
        self.released.remove(&id);
        self.live.insert(id, value);
        Ok(())
    }

    /// Drop a reservation that will not be registered
    pub fn release(&mut self, id: u64) {
        if self.reserved.remove(&id) && self.counter_passed(id) {
            self.released.insert(id);
        }
    }

    /// Remove a live id and retire it
    pub fn unregister(&mut self, id: u64) -> Option<T> {
        let value = self.live.remove(&id)?;
        if !self.counter_passed(id) {
            self.recently_retired.insert(id);
        }
        Some(value)
    }

    /// Resolve a live id
    pub fn lookup(&self, id: u64) -> Option<T> {
        self.live.get(&id).copied()
    }

    /// Whether the id is currently registered
    pub fn is_live(&self, id: u64) -> bool {
        self.live.contains_key(&id)
    }

    /// Whether the id was registered once and has since been unregistered
    pub fn is_retired(&self, id: u64) -> bool {
        if self.live.contains_key(&id) || self.reserved.contains(&id) {
            return false;
        }
        self.recently_retired.contains(id) || (self.counter_passed(id) && !self.released.contains(&id))
    }

    /// Number of retired ids held in memory
    pub fn retired_tracked(&self) -> usize {
        self.recently_retired.len()
    }

    /// Number of live ids
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no id is live
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl<T: Copy> Default for IdentityRegistry<T> {
    fn default() -> Self {
        Self::new(IdStrategy::default())
    }
}
