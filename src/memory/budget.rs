use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};

/// Resident document usage against the two independent caps: document
/// count and raw content bytes. A cap of `None` is unlimited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryBudget {
    pub resident_count: usize,
    pub resident_bytes: usize,
    pub max_count: Option<usize>,
    pub max_bytes: Option<usize>,
}

impl MemoryBudget {
    pub fn new(max_count: Option<usize>, max_bytes: Option<usize>) -> Result<Self> {
        let mut budget = MemoryBudget::default();
        if let Some(limit) = max_count {
            budget.set_max_count(limit)?;
        }
        if let Some(limit) = max_bytes {
            budget.set_max_bytes(limit)?;
        }
        Ok(budget)
    }

    pub fn set_max_count(&mut self, limit: usize) -> Result<()> {
        self.max_count = Some(Self::check_limit(limit)?);
        Ok(())
    }

    pub fn set_max_bytes(&mut self, limit: usize) -> Result<()> {
        self.max_bytes = Some(Self::check_limit(limit)?);
        Ok(())
    }

    fn check_limit(limit: usize) -> Result<usize> {
        if limit < 1 {
            return Err(Error::new(ErrorKind::InvalidLimit, format!("limit must be at least 1, got {}", limit)));
        }
        Ok(limit)
    }

    /// Whether a single document of `bytes` could ever be resident.
    pub fn fits(&self, bytes: usize) -> bool {
        self.max_bytes.is_none_or(|max| bytes <= max)
    }

    /// Reject a document that on its own exceeds the byte cap.
    pub fn check_document(&self, bytes: usize) -> Result<()> {
        if self.fits(bytes) {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::DocumentTooLarge,
                format!("document of {} bytes exceeds the {} byte limit", bytes, self.max_bytes.unwrap_or(0)),
            ))
        }
    }

    pub fn admit(&mut self, bytes: usize) {
        self.resident_count += 1;
        self.resident_bytes += bytes;
    }

    pub fn release(&mut self, bytes: usize) {
        self.resident_count = self.resident_count.saturating_sub(1);
        self.resident_bytes = self.resident_bytes.saturating_sub(bytes);
    }

    pub fn over_count(&self) -> bool {
        self.max_count.is_some_and(|max| self.resident_count > max)
    }

    pub fn over_bytes(&self) -> bool {
        self.max_bytes.is_some_and(|max| self.resident_bytes > max)
    }
}
