use serde::{Deserialize, Serialize};

use crate::capabilities::{HttpResult, KvResult};
use crate::form::FormField;
use crate::model::VisitId;
use crate::view::{FilterTag, SortDirection};

// Capability responses are boxed to keep the enum small.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    Noop,

    // Lifecycle
    AppStarted,
    LookupConfigured {
        base_url: String,
    },
    DismissNotice,

    // List
    ToggleSelection {
        id: VisitId,
    },
    ConcludeSelected,
    FilterChanged {
        filter: FilterTag,
    },
    SortToggled,
    SortChanged {
        direction: SortDirection,
    },
    PageChanged {
        page: usize,
    },

    // Form
    OpenCreateForm,
    OpenEditForm {
        id: VisitId,
    },
    CloseForm,
    PostalCodeChanged {
        value: String,
    },
    FieldChanged {
        field: FormField,
        value: String,
    },
    SubmitForm,

    // Capability responses
    VisitsLoaded(Box<KvResult>),
    VisitsPersisted(Box<KvResult>),
    AddressLookupResponse {
        seq: u64,
        result: Box<HttpResult>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AppStarted => "app_started",
            Self::LookupConfigured { .. } => "lookup_configured",
            Self::DismissNotice => "dismiss_notice",
            Self::ToggleSelection { .. } => "toggle_selection",
            Self::ConcludeSelected => "conclude_selected",
            Self::FilterChanged { .. } => "filter_changed",
            Self::SortToggled => "sort_toggled",
            Self::SortChanged { .. } => "sort_changed",
            Self::PageChanged { .. } => "page_changed",
            Self::OpenCreateForm => "open_create_form",
            Self::OpenEditForm { .. } => "open_edit_form",
            Self::CloseForm => "close_form",
            Self::PostalCodeChanged { .. } => "postal_code_changed",
            Self::FieldChanged { .. } => "field_changed",
            Self::SubmitForm => "submit_form",
            Self::VisitsLoaded(_) => "visits_loaded",
            Self::VisitsPersisted(_) => "visits_persisted",
            Self::AddressLookupResponse { .. } => "address_lookup_response",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::DismissNotice
                | Self::ToggleSelection { .. }
                | Self::ConcludeSelected
                | Self::FilterChanged { .. }
                | Self::SortToggled
                | Self::SortChanged { .. }
                | Self::PageChanged { .. }
                | Self::OpenCreateForm
                | Self::OpenEditForm { .. }
                | Self::CloseForm
                | Self::PostalCodeChanged { .. }
                | Self::FieldChanged { .. }
                | Self::SubmitForm
        )
    }
}
