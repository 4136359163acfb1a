//! Cached pool of pre-generated one-time codes.
//!
//! Session issuance pops a ready-made code instead of paying for random
//! generation on the hot path. The pool is the only shared mutable
//! in-process resource; a mutex guards it, and a drained pool refills
//! itself with a fresh batch.

use std::collections::VecDeque;
use std::sync::Mutex;

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Full length of a pooled code. Kinds needing shorter codes truncate.
pub const CODE_LENGTH: usize = 10;

const BATCH_SIZE: usize = 100;

pub struct CodePool {
    codes: Mutex<VecDeque<String>>,
}

impl CodePool {
    pub fn new() -> Self {
        let pool = Self {
            codes: Mutex::new(VecDeque::with_capacity(BATCH_SIZE)),
        };
        pool.refill();
        tracing::debug!(batch = BATCH_SIZE, "session code pool initialised");
        pool
    }

    /// Pop the next code, refilling first if the pool has run dry.
    pub fn draw(&self) -> String {
        let mut codes = self.codes.lock().unwrap_or_else(|e| e.into_inner());
        if codes.is_empty() {
            codes.extend(generate_batch());
        }
        // The pool is never empty after a refill.
        codes.pop_front().unwrap_or_else(generate_code)
    }

    fn refill(&self) {
        let mut codes = self.codes.lock().unwrap_or_else(|e| e.into_inner());
        codes.extend(generate_batch());
    }
}

impl Default for CodePool {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_batch() -> impl Iterator<Item = String> {
    (0..BATCH_SIZE).map(|_| generate_code())
}

fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}
