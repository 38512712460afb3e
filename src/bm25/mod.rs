//! In-memory sparse lexical index with Okapi BM25 scoring and JSON persistence.
//!
//! Supersedes the teacher's `adapters::hybrid_search::bm25::BM25Scorer`, which
//! recomputed document frequencies from a `Vec<CodeChunk>` on every call and
//! had no persistence. This index maintains postings incrementally so `add`
//! and `remove` are O(doc) instead of O(corpus).

use crate::domain::types::{CodeChunk, SearchMethod, SearchResult};
use crate::infrastructure::constants::BM25_TOKEN_MIN_LENGTH;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// BM25 persistence/tokenization failures.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed index file: {0}")]
    Malformed(String),
    #[error("unsupported index format version: {0}")]
    UnsupportedVersion(u32),
}

const FORMAT_VERSION: u32 = 1;
const TOKENIZER_ID: &str = "coderag-v1";
const MIN_TOKEN_LEN: usize = BM25_TOKEN_MIN_LENGTH;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "if", "of", "at", "by", "for", "in", "into", "on", "to",
    "with", "is", "are", "was", "were", "be", "been", "being", "this", "that", "these", "those",
    "it", "its", "as", "from", "do", "does", "did", "not", "no", "so", "than", "then", "self",
    "mut", "pub", "fn", "let", "var", "const",
];

/// Split `camelCase` / `PascalCase` / `snake_case` / `kebab-case` identifiers
/// into lowercase parts, plus lowercase-on-unicode-boundary splitting for
/// everything else. Implements the normative tokenizer: lowercase, split on
/// non-alphanumeric boundaries, further split on case/separator changes,
/// strip stop words and tokens shorter than `MIN_TOKEN_LEN`, but always also
/// emit the original joined (lowercased, alnum-only) word form.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for word in text.split(|c: char| !c.is_alphanumeric() && c != '_') {
        if word.is_empty() {
            continue;
        }
        let joined: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        let joined = joined.to_lowercase();

        for part in split_identifier(word) {
            let part = part.to_lowercase();
            if part.len() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(&part.as_str()) {
                tokens.push(part);
            }
        }

        if joined.len() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(&joined.as_str()) {
            tokens.push(joined);
        }
    }

    tokens
}

/// Split one already-non-alphanumeric-bounded word on camelCase / snake_case /
/// kebab-case boundaries. `_` and `-` are hard separators; a lowercase-to-
/// uppercase transition, or the last letter of a run of uppercase letters
/// followed by a lowercase letter (`HTTPServer` -> `HTTP`, `Server`), is a
/// soft separator.
fn split_identifier(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = word.chars().collect();

    for i in 0..chars.len() {
        let c = chars[i];
        if c == '_' || c == '-' {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            continue;
        }

        if i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1);
            let lower_to_upper = prev.is_lowercase() && c.is_uppercase();
            let acronym_boundary = prev.is_uppercase()
                && c.is_uppercase()
                && next.is_some_and(|n| n.is_lowercase());
            if (lower_to_upper || acronym_boundary) && !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocRecord {
    id: String,
    length: u32,
    tf: HashMap<String, u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OnDiskIndex {
    version: u32,
    k1: f32,
    b: f32,
    tokenizer_id: String,
    doc_count: u32,
    total_length: u64,
    docs: Vec<DocRecord>,
    df: HashMap<String, u32>,
}

struct IndexState {
    k1: f32,
    b: f32,
    doc_lengths: HashMap<String, u32>,
    doc_term_freq: HashMap<String, HashMap<String, u32>>,
    document_freq: HashMap<String, u32>,
    total_length: u64,
    chunks: HashMap<String, CodeChunk>,
}

impl IndexState {
    fn new(k1: f32, b: f32) -> Self {
        Self {
            k1,
            b,
            doc_lengths: HashMap::new(),
            doc_term_freq: HashMap::new(),
            document_freq: HashMap::new(),
            total_length: 0,
            chunks: HashMap::new(),
        }
    }

    fn doc_count(&self) -> usize {
        self.doc_lengths.len()
    }

    fn avg_doc_len(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            0.0
        } else {
            self.total_length as f32 / self.doc_lengths.len() as f32
        }
    }

    fn remove_one(&mut self, id: &str) {
        if let Some(len) = self.doc_lengths.remove(id) {
            self.total_length -= len as u64;
        }
        if let Some(tf) = self.doc_term_freq.remove(id) {
            for term in tf.keys() {
                if let Some(df) = self.document_freq.get_mut(term) {
                    *df = df.saturating_sub(1);
                    if *df == 0 {
                        self.document_freq.remove(term);
                    }
                }
            }
        }
        self.chunks.remove(id);
    }

    fn add_one(&mut self, chunk: CodeChunk) {
        self.remove_one(&chunk.id);

        let tokens = tokenize(&chunk.indexable_text());
        let length = tokens.len() as u32;
        let mut tf: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *tf.entry(token.clone()).or_insert(0) += 1;
        }
        for term in tf.keys() {
            *self.document_freq.entry(term.clone()).or_insert(0) += 1;
        }

        self.total_length += length as u64;
        self.doc_lengths.insert(chunk.id.clone(), length);
        self.doc_term_freq.insert(chunk.id.clone(), tf);
        self.chunks.insert(chunk.id.clone(), chunk);
    }

    fn score(&self, query_terms: &[String], id: &str) -> f32 {
        let Some(tf) = self.doc_term_freq.get(id) else {
            return 0.0;
        };
        let Some(&doc_len) = self.doc_lengths.get(id) else {
            return 0.0;
        };
        let doc_len = doc_len as f32;
        let avg_len = self.avg_doc_len();
        let n = self.doc_count() as f32;

        let mut score = 0.0;
        for term in query_terms {
            let Some(&term_tf) = tf.get(term) else {
                continue;
            };
            let df = *self.document_freq.get(term).unwrap_or(&0) as f32;
            if df <= 0.0 {
                continue;
            }
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            let term_tf = term_tf as f32;
            let denom = term_tf + self.k1 * (1.0 - self.b + self.b * doc_len / avg_len.max(1.0));
            score += idf * (term_tf * (self.k1 + 1.0)) / denom;
        }
        score
    }
}

/// Read-mostly inverted index guarded by a single-writer/multi-reader lock,
/// matching the concurrency discipline spec.md assigns to the BM25 index.
pub struct Bm25Index {
    inner: Arc<RwLock<IndexState>>,
}

impl Default for Bm25Index {
    fn default() -> Self {
        Self::new(1.2, 0.75)
    }
}

impl Bm25Index {
    pub fn new(k1: f32, b: f32) -> Self {
        Self {
            inner: Arc::new(RwLock::new(IndexState::new(k1, b))),
        }
    }

    /// Add or replace chunks. Idempotent on `chunk.id`.
    pub async fn add(&self, chunks: Vec<CodeChunk>) {
        tracing::debug!("bm25: indexing {} chunk(s)", chunks.len());
        let mut state = self.inner.write().await;
        for chunk in chunks {
            state.add_one(chunk);
        }
    }

    /// Remove chunks by id. Missing ids are ignored.
    pub async fn remove(&self, chunk_ids: &[String]) {
        tracing::debug!("bm25: removing {} chunk(s)", chunk_ids.len());
        let mut state = self.inner.write().await;
        for id in chunk_ids {
            state.remove_one(id);
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.doc_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Score every document containing at least one query term, break ties
    /// by chunk id ascending, and return the top `k`.
    pub async fn search(&self, query_text: &str, k: usize) -> Vec<SearchResult> {
        let state = self.inner.read().await;
        let query_terms: HashSet<String> = tokenize(query_text).into_iter().collect();
        if query_terms.is_empty() {
            return Vec::new();
        }
        let query_terms: Vec<String> = query_terms.into_iter().collect();

        let mut candidates: HashSet<&String> = HashSet::new();
        for id in state.doc_term_freq.keys() {
            let tf = &state.doc_term_freq[id];
            if query_terms.iter().any(|t| tf.contains_key(t)) {
                candidates.insert(id);
            }
        }

        let mut scored: Vec<(String, f32)> = candidates
            .into_iter()
            .map(|id| (id.clone(), state.score(&query_terms, id)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(id, score)| {
                let chunk = state.chunks.get(&id).cloned();
                SearchResult {
                    id: id.clone(),
                    file_path: chunk.as_ref().map(|c| c.file_path.clone()).unwrap_or_default(),
                    start_line: chunk.as_ref().map(|c| c.start_line).unwrap_or(0),
                    content: chunk.as_ref().map(|c| c.content.clone()).unwrap_or_default(),
                    score,
                    method: SearchMethod::Bm25,
                    chunk,
                    metadata: serde_json::Value::Null,
                }
            })
            .collect()
    }

    /// Look up a chunk by id, without scoring, for hydration by other components.
    pub async fn get_chunk(&self, id: &str) -> Option<CodeChunk> {
        self.inner.read().await.chunks.get(id).cloned()
    }

    /// All indexed chunks, for the benchmark query generator to draw from.
    pub async fn all_chunks(&self) -> Vec<CodeChunk> {
        self.inner.read().await.chunks.values().cloned().collect()
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        let state = self.inner.read().await;
        let docs = state
            .doc_lengths
            .keys()
            .map(|id| DocRecord {
                id: id.clone(),
                length: state.doc_lengths[id],
                tf: state.doc_term_freq[id].clone(),
            })
            .collect();

        let on_disk = OnDiskIndex {
            version: FORMAT_VERSION,
            k1: state.k1,
            b: state.b,
            tokenizer_id: TOKENIZER_ID.to_string(),
            doc_count: state.doc_count() as u32,
            total_length: state.total_length,
            docs,
            df: state.document_freq.clone(),
        };

        let json = serde_json::to_vec_pretty(&on_disk)
            .map_err(|e| IndexError::Malformed(e.to_string()))?;
        let path = path.as_ref();
        tokio::fs::write(path, json).await?;
        tracing::info!(
            "bm25: saved index ({} docs) to {}",
            on_disk.doc_count,
            path.display()
        );
        Ok(())
    }

    /// Load a persisted index. Chunk bodies are not persisted (only postings
    /// and statistics); callers that need hydrated results after a reload
    /// must re-`add` the chunks, which is idempotent and will not change the
    /// scores already reloaded from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let bytes = tokio::fs::read(path).await?;
        let on_disk: OnDiskIndex =
            serde_json::from_slice(&bytes).map_err(|e| IndexError::Malformed(e.to_string()))?;

        if on_disk.version != FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion(on_disk.version));
        }

        let mut state = IndexState::new(on_disk.k1, on_disk.b);
        state.total_length = on_disk.total_length;
        state.document_freq = on_disk.df;
        for doc in on_disk.docs {
            state.doc_lengths.insert(doc.id.clone(), doc.length);
            state.doc_term_freq.insert(doc.id, doc.tf);
        }

        tracing::info!(
            "bm25: loaded index ({} docs, format v{})",
            on_disk.doc_count,
            on_disk.version
        );
        Ok(Self {
            inner: Arc::new(RwLock::new(state)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ChunkType, Language};
    use serde_json::json;

    fn chunk(id: &str, content: &str) -> CodeChunk {
        CodeChunk {
            id: id.to_string(),
            content: content.to_string(),
            nl_summary: String::new(),
            file_path: format!("{id}.rs"),
            start_line: 1,
            end_line: 1,
            language: Language::Rust,
            chunk_type: ChunkType::Function,
            name: String::new(),
            declarations: vec![],
            imports: vec![],
            exports: vec![],
            metadata: json!({}),
        }
    }

    #[test]
    fn tokenizer_splits_camel_snake_and_kebab_case() {
        let tokens = tokenize("parseConfigFile and parse_config kebab-case-word");
        assert!(tokens.contains(&"parse".to_string()));
        assert!(tokens.contains(&"config".to_string()));
        assert!(tokens.contains(&"file".to_string()));
        assert!(tokens.contains(&"parseconfigfile".to_string()));
        assert!(tokens.contains(&"kebab".to_string()));
        assert!(tokens.contains(&"case".to_string()));
        assert!(tokens.contains(&"word".to_string()));
        // stop words / short tokens dropped
        assert!(!tokens.contains(&"and".to_string()));
    }

    #[tokio::test]
    async fn search_finds_chunk_by_split_and_joined_tokens() {
        let index = Bm25Index::default();
        index
            .add(vec![chunk("c1", "parseConfigFile and parse_config")])
            .await;

        assert_eq!(index.search("parse", 10).await.len(), 1);
        assert_eq!(index.search("parseconfigfile", 10).await.len(), 1);
        assert!(index.search("xyz", 10).await.is_empty());
    }

    #[tokio::test]
    async fn add_is_idempotent_on_id() {
        let index = Bm25Index::default();
        index.add(vec![chunk("c1", "alpha beta")]).await;
        index.add(vec![chunk("c1", "gamma delta")]).await;
        assert_eq!(index.len().await, 1);
        assert!(index.search("alpha", 10).await.is_empty());
        assert!(!index.search("gamma", 10).await.is_empty());
    }

    #[tokio::test]
    async fn remove_drops_postings() {
        let index = Bm25Index::default();
        index.add(vec![chunk("c1", "alpha beta")]).await;
        index.remove(&["c1".to_string()]).await;
        assert_eq!(index.len().await, 0);
        assert!(index.search("alpha", 10).await.is_empty());
    }

    #[tokio::test]
    async fn ties_break_by_chunk_id_ascending() {
        let index = Bm25Index::default();
        index.add(vec![chunk("b", "alpha"), chunk("a", "alpha")]).await;
        let results = index.search("alpha", 10).await;
        assert_eq!(results[0].id, "a");
        assert_eq!(results[1].id, "b");
    }

    #[tokio::test]
    async fn save_and_load_round_trips_scores_bit_for_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let index = Bm25Index::default();
        index
            .add(vec![
                chunk("c1", "parseConfigFile reads settings from disk"),
                chunk("c2", "writeConfigFile writes settings to disk"),
                chunk("c3", "completely unrelated content here"),
            ])
            .await;

        let before = index.search("config settings", 10).await;
        index.save(&path).await.unwrap();

        let loaded = Bm25Index::load(&path).await.unwrap();
        let after = loaded.search("config settings", 10).await;

        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.id, a.id);
            assert_eq!(b.score, a.score);
        }
    }

    #[tokio::test]
    async fn load_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        tokio::fs::write(&path, r#"{"version": 99, "k1": 1.2, "b": 0.75, "tokenizer_id": "x", "doc_count": 0, "total_length": 0, "docs": [], "df": {}}"#)
            .await
            .unwrap();

        let err = Bm25Index::load(&path).await.unwrap_err();
        assert!(matches!(err, IndexError::UnsupportedVersion(99)));
    }
}
