use tracing::{debug, info, warn};

use crate::capabilities::{check_value_size, Capabilities, HttpResult, KvError, KvKey, KvResult};
use crate::event::Event;
use crate::form::{FormField, VisitForm};
use crate::lookup::{self, LookupConfig, LookupOutcome, REQUEST_ID_HEADER};
use crate::model::Model;
use crate::store::VisitStore;
use crate::view::ViewModel;
use crate::{AppError, ErrorKind, UnixTimeMs, VISITS_STORAGE_KEY};

#[derive(Default)]
pub struct App;

fn visits_key() -> Result<KvKey, KvError> {
    KvKey::user_data(VISITS_STORAGE_KEY)
}

impl App {
    fn load_visits(caps: &Capabilities) {
        match visits_key() {
            Ok(key) => caps.kv.get(key.into_string(), |result| {
                Event::VisitsLoaded(Box::new(result))
            }),
            Err(e) => warn!(error = %e, "visits key rejected"),
        }
    }

    /// Writes the whole collection over the slot. Failures are logged and never roll back.
    fn persist_visits(model: &mut Model, caps: &Capabilities) {
        let bytes = match model.store.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "visits could not be serialized");
                return;
            }
        };

        let key = match visits_key().and_then(|key| check_value_size(&bytes).map(|()| key)) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "visits not persisted");
                model.set_error(e.into());
                return;
            }
        };

        debug!(
            key = key.as_str(),
            count = model.store.len(),
            bytes = bytes.len(),
            "persisting visits"
        );
        caps.kv.set(key.into_string(), bytes, |result| {
            Event::VisitsPersisted(Box::new(result))
        });
    }

    fn visits_loaded(model: &mut Model, result: KvResult, caps: &Capabilities) {
        let loaded = match result {
            Ok(Some(bytes)) => match VisitStore::restore(&bytes) {
                Ok(store) => {
                    info!(count = store.len(), "visits restored");
                    store
                }
                Err(e) => {
                    warn!(error = %e, "discarding malformed persisted visits");
                    model.set_error(
                        AppError::new(ErrorKind::Deserialization, "Stored visits were unreadable")
                            .with_internal(e.to_string()),
                    );
                    VisitStore::new()
                }
            },
            Ok(None) => {
                debug!("no persisted visits");
                VisitStore::new()
            }
            Err(e) => {
                let e = KvError::from(e);
                warn!(error = %e, "reading persisted visits failed");
                model.set_error(e.into());
                VisitStore::new()
            }
        };

        model.is_loaded = true;

        if model.store.is_empty() {
            model.store = loaded;
        } else {
            // Visits were created before the slot was read. The in-memory
            // collection wins and overwrites the slot.
            warn!(
                in_memory = model.store.len(),
                discarded = loaded.len(),
                "visits changed before load completed"
            );
            Self::persist_visits(model, caps);
        }

        model.clamp_page();
    }

    fn field_changed(model: &mut Model, field: FormField, value: String, caps: &Capabilities) {
        if model.form.is_none() {
            warn!(?field, "field change without an open form");
            return;
        }
        if field == FormField::Cep {
            model.lookup_tracker.invalidate();
            model.clear_error_of(ErrorKind::NotFound);
        }
        let Some(form) = model.form.as_mut() else {
            return;
        };

        match form.set_field(field, value) {
            Ok(Some(cep)) => match model.lookup.build_request(&cep) {
                Ok(request) => {
                    let seq = model.lookup_tracker.begin();
                    debug!(
                        seq,
                        cep = %cep,
                        host = request.url.host(),
                        request_id = %request.request_id,
                        "address lookup started"
                    );
                    caps.http
                        .get(request.url.as_str())
                        .header("Accept", "application/json")
                        .header(REQUEST_ID_HEADER, request.request_id)
                        .send(move |result| Event::AddressLookupResponse {
                            seq,
                            result: Box::new(result),
                        });
                }
                Err(e) => {
                    warn!(error = %e, "address lookup request rejected");
                    form.lookup_failed();
                }
            },
            Ok(None) => {}
            Err(e) => warn!(?field, error = %e, "field change rejected"),
        }
    }

    /// Returns false when the response was stale and nothing changed.
    fn lookup_response(model: &mut Model, seq: u64, result: HttpResult) -> bool {
        if !model.lookup_tracker.accept(seq) {
            debug!(seq, "dropping stale address lookup response");
            return false;
        }
        let Some(form) = model.form.as_mut() else {
            debug!(seq, "address lookup finished after form closed");
            return false;
        };

        match lookup::interpret(result) {
            Ok(LookupOutcome::Found(address)) => {
                debug!(seq, city = %address.city, "address lookup applied");
                form.apply_lookup(address);
                model.clear_error_of(ErrorKind::NotFound);
            }
            Ok(LookupOutcome::NotFound) => {
                let cep = form.value(FormField::Cep).to_string();
                info!(seq, cep = %cep, "postal code not found");
                form.lookup_failed();
                model.set_error(
                    AppError::new(
                        ErrorKind::NotFound,
                        "Postal code not found. Check the digits and try again.",
                    )
                    .with_context("cep", cep),
                );
            }
            Err(e) => {
                warn!(seq, error = %e, "address lookup failed");
                form.lookup_failed();
            }
        }
        true
    }

    fn submit_form(model: &mut Model, now: UnixTimeMs, caps: &Capabilities) {
        let Some(form) = model.form.as_mut() else {
            warn!("submit without an open form");
            return;
        };

        let submission = match form.submit() {
            Ok(submission) => submission,
            Err(e) => {
                info!(error = %e, "form submit rejected");
                model.set_error(e.into());
                return;
            }
        };

        let saved = match submission.target {
            None => model.store.create(submission.fields, now).map(|id| {
                info!(visit_id = %id, "visit created");
            }),
            Some(id) => model.store.update(id, submission.fields, now).map(|()| {
                info!(visit_id = %id, "visit updated");
            }),
        };

        match saved {
            Ok(()) => {
                model.form = None;
                model.lookup_tracker.invalidate();
                model.clear_error();
                model.clamp_page();
                Self::persist_visits(model, caps);
            }
            Err(e) => {
                warn!(error = %e, "store rejected submission");
                form.submit_rejected();
                model.set_error(e.into());
            }
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        model.update_timestamp();
        let now = UnixTimeMs(model.view_timestamp_ms);

        if event.is_user_initiated() {
            debug!(event = event.name(), "user action");
        } else {
            debug!(event = event.name(), "update");
        }

        match event {
            Event::Noop => return,

            Event::AppStarted => {
                Self::load_visits(caps);
            }

            Event::LookupConfigured { base_url } => match LookupConfig::new(base_url) {
                Ok(config) => {
                    info!(base_url = config.base_url(), "lookup configured");
                    model.lookup = config;
                }
                Err(e) => warn!(error = %e, "lookup config rejected"),
            },

            Event::DismissNotice => model.clear_error(),

            Event::VisitsLoaded(result) => Self::visits_loaded(model, *result, caps),

            Event::VisitsPersisted(result) => match *result {
                Ok(_) => {
                    debug!("visits persisted");
                    return;
                }
                Err(e) => {
                    let e = KvError::from(e);
                    warn!(error = %e, retryable = e.is_retryable(), "persisting visits failed");
                    model.set_error(e.into());
                }
            },

            Event::ToggleSelection { id } => match model.store.toggle_selection(id) {
                Ok(selected) => {
                    debug!(visit_id = %id, selected, "selection toggled");
                    Self::persist_visits(model, caps);
                }
                Err(e) => warn!(error = %e, "toggle selection failed"),
            },

            Event::ConcludeSelected => {
                let concluded = model.store.conclude_selected(now);
                if concluded == 0 {
                    debug!("nothing selected to conclude");
                } else {
                    info!(concluded, at = %now, "visits concluded");
                    model.clamp_page();
                    Self::persist_visits(model, caps);
                }
            }

            Event::FilterChanged { filter } => model.query.set_filter(filter),

            Event::SortToggled => {
                let sort = model.query.sort.toggle();
                model.query.set_sort(sort);
            }

            Event::SortChanged { direction } => model.query.set_sort(direction),

            Event::PageChanged { page } => {
                model.query.page = page;
                model.clamp_page();
            }

            Event::OpenCreateForm => {
                model.lookup_tracker.invalidate();
                model.form = Some(VisitForm::new());
            }

            Event::OpenEditForm { id } => match model.store.get(id) {
                Some(visit) if visit.is_pending => {
                    model.lookup_tracker.invalidate();
                    model.form = Some(VisitForm::for_edit(visit));
                }
                Some(_) => warn!(visit_id = %id, "concluded visits cannot be edited"),
                None => warn!(visit_id = %id, "edit requested for unknown visit"),
            },

            Event::CloseForm => {
                model.lookup_tracker.invalidate();
                model.form = None;
            }

            Event::PostalCodeChanged { value } => {
                Self::field_changed(model, FormField::Cep, value, caps);
            }

            Event::FieldChanged { field, value } => {
                Self::field_changed(model, field, value, caps);
            }

            Event::SubmitForm => Self::submit_form(model, now, caps),

            Event::AddressLookupResponse { seq, result } => {
                if !Self::lookup_response(model, seq, *result) {
                    return;
                }
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::build(model)
    }
}
