//! Optional grep baseline comparison (spec.md §4.8): for each query, extract
//! keyword tokens and run an external regex search over the workspace,
//! reporting file-level overlap against the retrieval engine's results.

use crate::bm25::tokenize;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrepComparisonEntry {
    pub query: String,
    pub grep_files: usize,
    pub engine_files: usize,
    pub overlap_files: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrepComparison {
    pub entries: Vec<GrepComparisonEntry>,
}

/// Walks `workspace_root`, matching each file whose contents contain any of
/// `query`'s keyword tokens (case-insensitive), and compares the resulting
/// file set against `engine_files` (the file paths the retrieval engine
/// returned for the same query).
pub fn compare(workspace_root: &Path, query: &str, engine_files: &HashSet<String>) -> GrepComparisonEntry {
    let tokens: Vec<String> = tokenize(query).into_iter().filter(|t| t.len() >= 3).collect();
    let mut grep_files: HashSet<String> = HashSet::new();

    if !tokens.is_empty() {
        let pattern = tokens
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        if let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() {
            for entry in walkdir::WalkDir::new(workspace_root)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
            {
                if let Ok(content) = std::fs::read_to_string(entry.path()) {
                    if re.is_match(&content) {
                        grep_files.insert(entry.path().display().to_string());
                    }
                }
            }
        }
    }

    let overlap = grep_files.intersection(engine_files).count();
    GrepComparisonEntry {
        query: query.to_string(),
        grep_files: grep_files.len(),
        engine_files: engine_files.len(),
        overlap_files: overlap,
    }
}
