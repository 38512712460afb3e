//! Incremental newline-delimited JSON parsing for the model-pull progress
//! stream (spec.md §4.4, §9: "incremental line splitter over chunked reads
//! with a carry-over buffer; no library assumption beyond UTF-8 decoding").

use serde::Deserialize;

/// One record from the pull progress stream.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRecord {
    pub status: Option<String>,
    pub completed: Option<u64>,
    pub total: Option<u64>,
    pub error: Option<String>,
}

/// Download progress reported to the caller's callback.
pub type PullProgress = PullRecord;

/// Splits a complete byte buffer into lines and parses each as JSON,
/// skipping unparseable lines. Used when the whole response body is
/// buffered; `LineSplitter` below is for true incremental/chunked reads.
pub fn parse_stream(body: &[u8]) -> Vec<PullRecord> {
    let text = String::from_utf8_lossy(body);
    let mut splitter = LineSplitter::new();
    let mut records = Vec::new();
    splitter.feed(&text, &mut records);
    splitter.finish(&mut records);
    records
}

/// Carries a partial line across chunk boundaries, so a record split across
/// two network reads still parses correctly.
#[derive(Default)]
pub struct LineSplitter {
    carry: String,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of text, appending any complete records to `out`.
    pub fn feed(&mut self, chunk: &str, out: &mut Vec<PullRecord>) {
        self.carry.push_str(chunk);
        while let Some(pos) = self.carry.find('\n') {
            let line = self.carry[..pos].trim().to_string();
            self.carry.drain(..=pos);
            if !line.is_empty() {
                if let Ok(record) = serde_json::from_str::<PullRecord>(&line) {
                    out.push(record);
                }
            }
        }
    }

    /// Flush any trailing partial line once the stream ends (a final record
    /// with no trailing newline is still valid NDJSON).
    pub fn finish(&mut self, out: &mut Vec<PullRecord>) {
        let line = self.carry.trim();
        if !line.is_empty() {
            if let Ok(record) = serde_json::from_str::<PullRecord>(line) {
                out.push(record);
            }
        }
        self.carry.clear();
    }
}
