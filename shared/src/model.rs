use serde::{Deserialize, Serialize};
use std::fmt;

use crate::form::VisitForm;
use crate::lookup::{LookupConfig, LookupTracker};
use crate::store::VisitStore;
use crate::view::ListQuery;
use crate::{get_current_time_ms, AppError, ErrorKind, UnixTimeMs};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitId(pub u64);

impl VisitId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user-editable part of a visit. `Default` is the empty draft.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitFields {
    pub cep: String,
    pub uf: String,
    pub city: String,
    pub neighborhood: String,
    pub address: String,
    pub number: String,
}

impl VisitFields {
    /// Every field paired with its name, for length checks and logging.
    pub fn named(&self) -> [(&'static str, &str); 6] {
        [
            ("cep", self.cep.as_str()),
            ("uf", self.uf.as_str()),
            ("city", self.city.as_str()),
            ("neighborhood", self.neighborhood.as_str()),
            ("address", self.address.as_str()),
            ("number", self.number.as_str()),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: VisitId,
    pub address: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    pub uf: String,
    pub cep: String,
    pub is_pending: bool,
    pub is_selected: bool,
    pub last_modified: UnixTimeMs,
    #[serde(default)]
    pub conclusion_date: Option<UnixTimeMs>,
}

impl Visit {
    #[must_use]
    pub fn new(id: VisitId, fields: VisitFields, now: UnixTimeMs) -> Self {
        Self {
            id,
            address: fields.address,
            number: fields.number,
            neighborhood: fields.neighborhood,
            city: fields.city,
            uf: fields.uf,
            cep: fields.cep,
            is_pending: true,
            is_selected: false,
            last_modified: now,
            conclusion_date: None,
        }
    }

    #[must_use]
    pub fn fields(&self) -> VisitFields {
        VisitFields {
            cep: self.cep.clone(),
            uf: self.uf.clone(),
            city: self.city.clone(),
            neighborhood: self.neighborhood.clone(),
            address: self.address.clone(),
            number: self.number.clone(),
        }
    }

    /// Overwrites the address fields. Pending state and conclusion date are untouched.
    pub fn apply(&mut self, fields: VisitFields, now: UnixTimeMs) {
        self.cep = fields.cep;
        self.uf = fields.uf;
        self.city = fields.city;
        self.neighborhood = fields.neighborhood;
        self.address = fields.address;
        self.number = fields.number;
        self.last_modified = now;
    }

    #[must_use]
    pub const fn is_concluded(&self) -> bool {
        self.conclusion_date.is_some()
    }

    #[must_use]
    pub const fn awaits_conclusion(&self) -> bool {
        self.is_selected && self.is_pending
    }
}

#[derive(Debug, Default)]
pub struct Model {
    pub store: VisitStore,
    pub is_loaded: bool,

    pub query: ListQuery,

    pub form: Option<VisitForm>,
    pub lookup: LookupConfig,
    pub lookup_tracker: LookupTracker,

    pub active_error: Option<AppError>,
    pub view_timestamp_ms: u64,
}

impl Model {
    pub fn update_timestamp(&mut self) {
        self.view_timestamp_ms = get_current_time_ms();
    }

    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    /// Drops the notice only if it is of `kind`.
    pub fn clear_error_of(&mut self, kind: ErrorKind) {
        if self.active_error.as_ref().is_some_and(|e| e.kind == kind) {
            self.active_error = None;
        }
    }

    /// Keeps the current page inside the range of the filtered collection.
    pub fn clamp_page(&mut self) {
        let total_pages = crate::view::total_pages(self.store.as_slice(), self.query.filter);
        self.query.clamp_page(total_pages);
    }
}
