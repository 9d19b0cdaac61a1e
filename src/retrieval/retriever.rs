use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use futures_util::future::join_all;
use sha2::{Digest, Sha256};

use super::client::KnowledgeBase;
use super::types::{RetrievalError, RetrievalResult};
use crate::query::normalizer::QueryNormalizer;
use crate::query::expander::expand_query;

/// Per-variant memo capacity. Expansions repeat across nearby queries, so a
/// small window captures most of the benefit.
const MEMO_CAPACITY: usize = 32;

struct VariantMemo {
    entries: HashMap<String, Vec<RetrievalResult>>,
    order: VecDeque<String>,
}

impl VariantMemo {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, variant: &str) -> Option<Vec<RetrievalResult>> {
        self.entries.get(variant).cloned()
    }

    fn insert(&mut self, variant: String, results: Vec<RetrievalResult>) {
        if self.entries.contains_key(&variant) {
            return;
        }
        if self.order.len() >= MEMO_CAPACITY {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
        self.order.push_back(variant.clone());
        self.entries.insert(variant, results);
    }
}

/// Issues knowledge-base calls for a query and its expansion variants,
/// merging and deduplicating the results.
pub struct Retriever {
    kb: Arc<dyn KnowledgeBase>,
    normalizer: Arc<QueryNormalizer>,
    num_results: usize,
    memo: Mutex<VariantMemo>,
}

impl Retriever {
    pub fn new(kb: Arc<dyn KnowledgeBase>, normalizer: Arc<QueryNormalizer>, num_results: usize) -> Self {
        Self {
            kb,
            normalizer,
            num_results,
            memo: Mutex::new(VariantMemo::new()),
        }
    }

    /// Basic mode issues exactly one call for the normalized query. Advanced
    /// mode fans out over expansion variants, dedups by content digest and
    /// truncates to the configured maximum.
    pub async fn retrieve(
        &self,
        query: &str,
        advanced: bool,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let normalized = self.normalizer.normalize(query);
        if !advanced {
            return self.cached_query(&normalized).await;
        }

        let variants = expand_query(&normalized);
        let calls = variants.iter().map(|variant| self.cached_query(variant));
        let responses = join_all(calls).await;

        let mut merged = Vec::new();
        let mut seen = HashSet::new();
        let mut last_error = None;
        let mut any_succeeded = false;

        // Merge in variant order so dedup tie-breaking is deterministic:
        // the first occurrence of a passage wins.
        for (variant, response) in variants.iter().zip(responses) {
            match response {
                Ok(results) => {
                    any_succeeded = true;
                    for result in results {
                        if seen.insert(content_digest(&result.content)) {
                            merged.push(result);
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("Retrieval variant {:?} failed: {}", variant, err);
                    last_error = Some(err);
                }
            }
        }

        if !any_succeeded {
            if let Some(err) = last_error {
                return Err(err);
            }
        }

        merged.truncate(self.num_results);
        Ok(merged)
    }

    async fn cached_query(&self, variant: &str) -> Result<Vec<RetrievalResult>, RetrievalError> {
        if let Some(hit) = self
            .memo
            .lock()
            .expect("memo mutex poisoned")
            .get(variant)
        {
            return Ok(hit);
        }

        let results = self.kb.query(variant, self.num_results).await?;
        self.memo
            .lock()
            .expect("memo mutex poisoned")
            .insert(variant.to_string(), results.clone());
        Ok(results)
    }
}

/// Stable digest of the passage text. Two different URLs carrying identical
/// text collapse to one entry; portable across runs, unlike a builtin hash.
pub fn content_digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
