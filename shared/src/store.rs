use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{Visit, VisitFields, VisitId};
use crate::{AppError, ErrorKind, UnixTimeMs, MAX_FIELD_LENGTH, MAX_VISITS};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("visit {0} not found")]
    UnknownVisit(VisitId),

    #[error("field '{field}' is too long: {len} bytes, max {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("too many visits: {count}, max {max}")]
    TooManyVisits { count: usize, max: usize },

    #[error("corrupted store: {reason}")]
    Corrupted { reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        let kind = match &e {
            StoreError::UnknownVisit(_) => ErrorKind::InvalidState,
            StoreError::FieldTooLong { .. } | StoreError::TooManyVisits { .. } => {
                ErrorKind::Validation
            }
            StoreError::Corrupted { .. } => ErrorKind::Deserialization,
            StoreError::Serialization(_) => ErrorKind::Serialization,
        };
        AppError::new(kind, e.to_string())
    }
}

/// The visit collection. Only the methods below mutate it; everything else
/// reads it through [`VisitStore::as_slice`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitStore {
    visits: Vec<Visit>,
    last_id: u64,
}

impl VisitStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from already-decoded records, keeping the first record per id.
    #[must_use]
    pub fn from_visits(visits: Vec<Visit>) -> Self {
        let mut seen = HashSet::with_capacity(visits.len());
        let mut kept = Vec::with_capacity(visits.len());

        for visit in visits {
            if seen.insert(visit.id) {
                kept.push(visit);
            } else {
                warn!(visit_id = %visit.id, "dropping persisted visit with duplicate id");
            }
        }

        let last_id = kept.iter().map(|v| v.id.as_u64()).max().unwrap_or(0);
        Self {
            visits: kept,
            last_id,
        }
    }

    /// Decodes the persisted slot. Any malformed payload is rejected as a whole.
    pub fn restore(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(StoreError::Corrupted {
                reason: "empty payload".into(),
            });
        }

        let visits: Vec<Visit> =
            serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupted {
                reason: e.to_string(),
            })?;

        if let Some(bad) = visits
            .iter()
            .find(|v| v.conclusion_date.is_some() && v.is_pending)
        {
            return Err(StoreError::Corrupted {
                reason: format!("visit {} is pending but has a conclusion date", bad.id),
            });
        }

        Ok(Self::from_visits(visits))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(&self.visits).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn create(&mut self, fields: VisitFields, now: UnixTimeMs) -> Result<VisitId, StoreError> {
        if self.visits.len() >= MAX_VISITS {
            return Err(StoreError::TooManyVisits {
                count: self.visits.len() + 1,
                max: MAX_VISITS,
            });
        }
        validate_fields(&fields)?;

        let id = self.next_id(now);
        self.visits.push(Visit::new(id, fields, now));
        debug!(visit_id = %id, "visit created");
        Ok(id)
    }

    pub fn update(
        &mut self,
        id: VisitId,
        fields: VisitFields,
        now: UnixTimeMs,
    ) -> Result<(), StoreError> {
        validate_fields(&fields)?;
        let visit = self.get_mut(id)?;
        visit.apply(fields, now);
        debug!(visit_id = %id, "visit updated");
        Ok(())
    }

    /// Flips the selection flag and returns the new value.
    pub fn toggle_selection(&mut self, id: VisitId) -> Result<bool, StoreError> {
        let visit = self.get_mut(id)?;
        visit.is_selected = !visit.is_selected;
        Ok(visit.is_selected)
    }

    /// Concludes every selected pending visit and returns how many changed.
    /// Selection flags are left as they were.
    pub fn conclude_selected(&mut self, now: UnixTimeMs) -> usize {
        let mut concluded = 0;
        for visit in self.visits.iter_mut().filter(|v| v.awaits_conclusion()) {
            visit.is_pending = false;
            visit.conclusion_date = Some(now);
            concluded += 1;
        }
        concluded
    }

    #[must_use]
    pub fn get(&self, id: VisitId) -> Option<&Visit> {
        self.visits.iter().find(|v| v.id == id)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Visit] {
        &self.visits
    }

    pub fn iter(&self) -> impl Iterator<Item = &Visit> {
        self.visits.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.visits.iter().filter(|v| v.is_pending).count()
    }

    #[must_use]
    pub fn has_pending_selected(&self) -> bool {
        self.visits.iter().any(Visit::awaits_conclusion)
    }

    fn get_mut(&mut self, id: VisitId) -> Result<&mut Visit, StoreError> {
        self.visits
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(StoreError::UnknownVisit(id))
    }

    fn next_id(&mut self, now: UnixTimeMs) -> VisitId {
        let id = now.as_millis().max(self.last_id.saturating_add(1));
        self.last_id = id;
        VisitId(id)
    }
}

fn validate_fields(fields: &VisitFields) -> Result<(), StoreError> {
    for (field, value) in fields.named() {
        if value.len() > MAX_FIELD_LENGTH {
            return Err(StoreError::FieldTooLong {
                field,
                len: value.len(),
                max: MAX_FIELD_LENGTH,
            });
        }
    }
    Ok(())
}
