use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lookup::{is_complete_postal_code, normalize_postal_code, AddressFields};
use crate::model::{Visit, VisitFields, VisitId};
use crate::{AppError, ErrorKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Cep,
    Uf,
    City,
    Neighborhood,
    Address,
    Number,
}

impl FormField {
    pub const ALL: [Self; 6] = [
        Self::Cep,
        Self::Uf,
        Self::City,
        Self::Neighborhood,
        Self::Address,
        Self::Number,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cep => "Postal code",
            Self::Uf => "State",
            Self::City => "City",
            Self::Neighborhood => "Neighborhood",
            Self::Address => "Address",
            Self::Number => "Number",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("{} is read-only", .0.label())]
    ReadOnly(FormField),

    #[error("missing required fields: {}", labels(.0))]
    MissingFields(Vec<FormField>),

    #[error("address lookup still in progress")]
    LookupInProgress,
}

fn labels(fields: &[FormField]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<FormError> for AppError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::MissingFields(_) => Self::new(ErrorKind::Validation, err.to_string()),
            FormError::ReadOnly(field) => Self::new(ErrorKind::InvalidState, err.to_string())
                .with_context("field", field.label()),
            FormError::LookupInProgress => Self::new(ErrorKind::InvalidState, err.to_string()),
        }
    }
}

/// `New` until the user types something or an existing visit is loaded.
/// A saved form is dropped, so there is no terminal phase here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormPhase {
    #[default]
    New,
    Populated,
    Submitting,
}

/// What a successful submit hands to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub target: Option<VisitId>,
    pub fields: VisitFields,
}

/// Draft state for one visit. Uf and city only ever come from the lookup;
/// neighborhood and address are typed by hand when the lookup left them empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisitForm {
    editing: Option<VisitId>,
    fields: VisitFields,
    neighborhood_locked: bool,
    address_locked: bool,
    loading: bool,
    phase: FormPhase,
}

impl VisitForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_edit(visit: &Visit) -> Self {
        let fields = visit.fields();
        Self {
            editing: Some(visit.id),
            neighborhood_locked: !fields.neighborhood.is_empty(),
            address_locked: !fields.address.is_empty(),
            fields,
            loading: false,
            phase: FormPhase::Populated,
        }
    }

    #[must_use]
    pub const fn editing(&self) -> Option<VisitId> {
        self.editing
    }

    #[must_use]
    pub const fn fields(&self) -> &VisitFields {
        &self.fields
    }

    #[must_use]
    pub const fn phase(&self) -> FormPhase {
        self.phase
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn title(&self) -> &'static str {
        if self.editing.is_some() {
            "Edit Visit"
        } else {
            "Create Visit"
        }
    }

    #[must_use]
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Cep => &self.fields.cep,
            FormField::Uf => &self.fields.uf,
            FormField::City => &self.fields.city,
            FormField::Neighborhood => &self.fields.neighborhood,
            FormField::Address => &self.fields.address,
            FormField::Number => &self.fields.number,
        }
    }

    /// Neighborhood and address wait for an in-flight lookup, which would overwrite them.
    #[must_use]
    pub const fn is_editable(&self, field: FormField) -> bool {
        match field {
            FormField::Cep | FormField::Number => true,
            FormField::Uf | FormField::City => false,
            FormField::Neighborhood => !self.loading && !self.neighborhood_locked,
            FormField::Address => !self.loading && !self.address_locked,
        }
    }

    /// Applies one keystroke-level change. Returns the normalized postal code
    /// when the change calls for a fresh lookup.
    pub fn set_field(
        &mut self,
        field: FormField,
        value: impl Into<String>,
    ) -> Result<Option<String>, FormError> {
        let value = value.into();

        let lookup = match field {
            FormField::Cep => self.set_postal_code(&value),
            FormField::Number => {
                self.fields.number = value;
                None
            }
            FormField::Neighborhood | FormField::Address if self.loading => {
                return Err(FormError::LookupInProgress);
            }
            FormField::Neighborhood if !self.neighborhood_locked => {
                self.fields.neighborhood = value;
                None
            }
            FormField::Address if !self.address_locked => {
                self.fields.address = value;
                None
            }
            FormField::Uf | FormField::City | FormField::Neighborhood | FormField::Address => {
                return Err(FormError::ReadOnly(field));
            }
        };

        self.phase = FormPhase::Populated;
        Ok(lookup)
    }

    fn set_postal_code(&mut self, raw: &str) -> Option<String> {
        let digits = normalize_postal_code(raw);
        self.fields.cep.clone_from(&digits);

        self.fields.uf.clear();
        self.fields.city.clear();
        self.fields.neighborhood.clear();
        self.fields.address.clear();
        self.neighborhood_locked = false;
        self.address_locked = false;

        self.loading = is_complete_postal_code(&digits);
        self.loading.then_some(digits)
    }

    pub fn apply_lookup(&mut self, address: AddressFields) {
        self.neighborhood_locked = !address.neighborhood.is_empty();
        self.address_locked = !address.address.is_empty();
        self.fields.uf = address.uf;
        self.fields.city = address.city;
        self.fields.neighborhood = address.neighborhood;
        self.fields.address = address.address;
        self.loading = false;
    }

    /// Not found or failed: fields stay empty and editable.
    pub fn lookup_failed(&mut self) {
        self.loading = false;
    }

    #[must_use]
    pub fn missing_fields(&self) -> Vec<FormField> {
        let mut missing = Vec::new();
        if !is_complete_postal_code(&self.fields.cep) {
            missing.push(FormField::Cep);
        }
        if self.fields.number.trim().is_empty() {
            missing.push(FormField::Number);
        }
        missing
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.loading && self.phase != FormPhase::Submitting && self.missing_fields().is_empty()
    }

    pub fn submit(&mut self) -> Result<Submission, FormError> {
        if self.loading {
            return Err(FormError::LookupInProgress);
        }
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(FormError::MissingFields(missing));
        }

        self.phase = FormPhase::Submitting;
        Ok(Submission {
            target: self.editing,
            fields: self.fields.clone(),
        })
    }

    /// The store refused the submission; the draft stays open for correction.
    pub fn submit_rejected(&mut self) {
        self.phase = FormPhase::Populated;
    }
}
