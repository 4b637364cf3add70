//! Token counting for prompts and chunks.
//!
//! Uses the cl100k_base encoding, which tracks hosted chat models closely
//! enough for sizing prompts and reporting chunk costs.

use parking_lot::{Mutex, RwLock};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;
use tiktoken_rs::{cl100k_base, CoreBPE};
use tracing::warn;

/// Entries kept before the cache is halved
const CACHE_CAPACITY: usize = 4096;

static ENCODER: OnceLock<Mutex<Option<CoreBPE>>> = OnceLock::new();
static TOKEN_CACHE: RwLock<Option<HashMap<u64, u32>>> = RwLock::new(None);

fn encode_len(text: &str) -> Option<u32> {
    let encoder = ENCODER.get_or_init(|| {
        Mutex::new(match cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(e) => {
                warn!(error = %e, "cl100k_base unavailable, using length estimate");
                None
            }
        })
    });
    let guard = encoder.lock();
    guard
        .as_ref()
        .map(|bpe| bpe.encode_with_special_tokens(text).len() as u32)
}

fn content_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Count tokens in `text`, caching by content hash.
pub fn count_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }

    let key = content_hash(text);
    if let Some(count) = TOKEN_CACHE.read().as_ref().and_then(|c| c.get(&key).copied()) {
        return count;
    }

    let Some(count) = encode_len(text) else {
        return estimate_tokens_quick(text);
    };

    let mut cache = TOKEN_CACHE.write();
    let cache = cache.get_or_insert_with(HashMap::new);
    if cache.len() >= CACHE_CAPACITY {
        let evict: Vec<u64> = cache.keys().take(CACHE_CAPACITY / 2).copied().collect();
        for k in evict {
            cache.remove(&k);
        }
    }
    cache.insert(key, count);

    count
}

pub fn count_tokens_batch(texts: &[&str]) -> Vec<u32> {
    texts.iter().map(|t| count_tokens(t)).collect()
}

/// Rough estimate at ~4 bytes per token
pub fn estimate_tokens_quick(text: &str) -> u32 {
    (text.len() as f64 / 4.0).ceil() as u32
}
