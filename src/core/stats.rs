use std::time::SystemTime;
use serde::{Serialize, Deserialize};
use crate::core::error::Result;

/// Store statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    // General info
    pub uptime_secs: u64,
    pub start_time: SystemTime,

    // Primary store
    pub live_documents: usize,
    pub tree_slots: usize,           // Includes tombstones
    pub tree_height: usize,

    // Residency
    pub memory: ResidencyStats,

    // Undo
    pub undo_depth: usize,

    // Operation counters
    pub reads: u64,
    pub writes: u64,
    pub evictions: u64,
    pub promotions: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResidencyStats {
    pub resident_documents: usize,
    pub resident_bytes: usize,
    pub tiered_out_documents: usize,
    pub max_document_count: Option<usize>,
    pub max_document_bytes: Option<usize>,
}

impl ResidencyStats {
    /// Share of the tightest cap currently in use, if any cap is set.
    pub fn utilization_percent(&self) -> Option<f32> {
        let by_count = self
            .max_document_count
            .map(|max| self.resident_documents as f32 / max as f32);
        let by_bytes = self
            .max_document_bytes
            .map(|max| self.resident_bytes as f32 / max as f32);
        match (by_count, by_bytes) {
            (Some(a), Some(b)) => Some(a.max(b) * 100.0),
            (Some(u), None) | (None, Some(u)) => Some(u * 100.0),
            (None, None) => None,
        }
    }
}

/// Tiering and traffic counters kept by the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub reads: u64,
    pub writes: u64,
    pub evictions: u64,
    pub promotions: u64,
}

impl StoreStats {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
