mod common;

use assert_matches::assert_matches;
use common::*;
use crux_kv::KeyValueOperation;
use shared::model::{Visit, VisitFields, VisitId};
use shared::store::VisitStore;
use shared::view::{FilterTag, PendingLevel, SortDirection, VisitStatus};
use shared::{Event, UnixTimeMs};

fn seeded_visit(id: u64, last_modified: u64) -> Visit {
    let fields = VisitFields {
        cep: "01001000".into(),
        uf: "SP".into(),
        city: "São Paulo".into(),
        neighborhood: "Sé".into(),
        address: format!("Rua {id}"),
        number: id.to_string(),
    };
    Visit::new(VisitId(id), fields, UnixTimeMs(last_modified))
}

#[test]
fn create_after_lookup_yields_pending_visit() {
    let app = Tester::default();
    let mut model = started(&app);

    create_visit(&app, &mut model, SE_BODY, "01001-000", "100");

    assert_eq!(model.store.len(), 1);
    let visit = &model.store.as_slice()[0];
    assert_eq!(visit.cep, "01001000");
    assert_eq!(visit.uf, "SP");
    assert_eq!(visit.city, "São Paulo");
    assert_eq!(visit.neighborhood, "Sé");
    assert_eq!(visit.address, "Praça da Sé");
    assert_eq!(visit.number, "100");
    assert!(visit.is_pending);
    assert!(!visit.is_selected);
    assert_eq!(visit.conclusion_date, None);

    let view = app.view(&model);
    assert_eq!(view.header.pending_count, 1);
    assert_eq!(view.header.pending_level, PendingLevel::Low);
    assert_eq!(view.list.cards.len(), 1);
    assert_eq!(view.list.cards[0].status, VisitStatus::Pending);
    assert!(view.list.cards[0].can_edit);
    assert!(!view.footer.can_conclude);
    assert!(view.form.is_none());
}

#[test]
fn submit_without_number_is_rejected() {
    let app = Tester::default();
    let mut model = started(&app);

    app.update(Event::OpenCreateForm, &mut model);
    let update = app.update(Event::SubmitForm, &mut model);

    assert!(kv_requests(update.effects).is_empty());
    assert!(model.store.is_empty());
    assert!(model.form.is_some());

    let view = app.view(&model);
    let notice = view.notice.expect("validation notice");
    assert_eq!(notice.error_code, "VALIDATION_ERROR");
    assert!(!view.form.expect("form stays open").can_submit);
}

#[test]
fn conclude_touches_only_selected_pending_and_is_idempotent() {
    let app = Tester::default();
    let mut model = started(&app);

    create_visit(&app, &mut model, SE_BODY, "01001000", "1");
    create_visit(&app, &mut model, SE_BODY, "01001000", "2");
    let ids: Vec<VisitId> = model.store.iter().map(|v| v.id).collect();

    let update = app.update(Event::ToggleSelection { id: ids[0] }, &mut model);
    assert_eq!(kv_requests(update.effects).len(), 1);
    assert!(app.view(&model).footer.can_conclude);

    let update = app.update(Event::ConcludeSelected, &mut model);
    let writes = kv_requests(update.effects);
    assert_eq!(writes.len(), 1);
    assert_matches!(
        &writes[0].operation,
        KeyValueOperation::Set { key, .. } if key == "userdata:visits"
    );

    let first = model.store.get(ids[0]).unwrap().clone();
    assert!(!first.is_pending);
    assert!(first.is_selected, "selection survives conclusion");
    let concluded_at = first.conclusion_date.expect("conclusion date set");

    let second = model.store.get(ids[1]).unwrap();
    assert!(second.is_pending);
    assert_eq!(second.conclusion_date, None);

    assert!(!app.view(&model).footer.can_conclude);

    let update = app.update(Event::ConcludeSelected, &mut model);
    assert!(kv_requests(update.effects).is_empty());
    assert_eq!(model.store.get(ids[0]).unwrap().conclusion_date, Some(concluded_at));
}

#[test]
fn concluded_visit_cannot_be_edited() {
    let app = Tester::default();
    let mut model = started(&app);
    create_visit(&app, &mut model, SE_BODY, "01001000", "1");
    let id = model.store.as_slice()[0].id;

    app.update(Event::ToggleSelection { id }, &mut model);
    app.update(Event::ConcludeSelected, &mut model);
    let before = model.store.get(id).unwrap().clone();

    app.update(Event::OpenEditForm { id }, &mut model);
    assert!(model.form.is_none());
    assert_eq!(model.store.get(id), Some(&before));

    let view = app.view(&model);
    assert_eq!(view.list.cards[0].status, VisitStatus::Concluded);
    assert!(!view.list.cards[0].can_edit);
    assert!(view.list.cards[0].status_line.starts_with("Concluded"));
}

#[test]
fn edit_keeps_id_and_updates_fields() {
    let app = Tester::default();
    let mut model = started(&app);
    create_visit(&app, &mut model, SE_BODY, "01001000", "1");
    let id = model.store.as_slice()[0].id;

    app.update(Event::OpenEditForm { id }, &mut model);
    let view = app.view(&model);
    let form = view.form.expect("edit form open");
    assert_eq!(form.title, "Edit Visit");
    assert!(form.can_submit);

    app.update(
        Event::FieldChanged {
            field: shared::form::FormField::Number,
            value: "999".into(),
        },
        &mut model,
    );
    let update = app.update(Event::SubmitForm, &mut model);
    assert_eq!(kv_requests(update.effects).len(), 1);

    assert_eq!(model.store.len(), 1);
    let visit = model.store.get(id).unwrap();
    assert_eq!(visit.number, "999");
    assert_eq!(visit.city, "São Paulo");
    assert!(visit.is_pending);
}

#[test]
fn unknown_ids_change_nothing() {
    let app = Tester::default();
    let mut model = started(&app);
    create_visit(&app, &mut model, SE_BODY, "01001000", "1");
    let before = model.store.clone();

    let update = app.update(Event::ToggleSelection { id: VisitId(1) }, &mut model);
    assert!(kv_requests(update.effects).is_empty());
    app.update(Event::OpenEditForm { id: VisitId(1) }, &mut model);

    assert!(model.form.is_none());
    assert_eq!(model.store, before);
}

#[test]
fn pagination_filter_and_sort() {
    let app = Tester::default();
    let mut model = started(&app);

    let mut visits: Vec<Visit> = (1..=25).map(|i| seeded_visit(i, i * 1_000)).collect();
    for visit in visits.iter_mut().take(4) {
        visit.is_pending = false;
        visit.conclusion_date = Some(UnixTimeMs(99_000));
    }
    model.store = VisitStore::from_visits(visits);

    let view = app.view(&model);
    assert_eq!(view.list.total_pages, 3);
    assert_eq!(view.list.cards.len(), 10);
    assert_eq!(view.list.cards[0].id, VisitId(25), "newest first by default");
    assert_eq!(view.header.pending_count, 21);
    assert_eq!(view.header.pending_level, PendingLevel::High);

    let update = app.update(Event::PageChanged { page: 3 }, &mut model);
    assert!(renders(&update.effects));
    assert_eq!(app.view(&model).list.cards.len(), 5);

    app.update(Event::PageChanged { page: 9 }, &mut model);
    assert_eq!(model.query.page, 3);

    app.update(
        Event::FilterChanged {
            filter: FilterTag::Completed,
        },
        &mut model,
    );
    assert_eq!(model.query.page, 1);
    let view = app.view(&model);
    assert_eq!(view.list.total_items, 4);
    assert_eq!(view.list.total_pages, 1);
    assert!(view.list.cards.iter().all(|c| c.status == VisitStatus::Concluded));

    app.update(Event::SortToggled, &mut model);
    assert_eq!(model.query.sort, SortDirection::Asc);
    assert_eq!(app.view(&model).list.cards[0].id, VisitId(1));

    app.update(
        Event::SortChanged {
            direction: SortDirection::Desc,
        },
        &mut model,
    );
    assert_eq!(app.view(&model).list.cards[0].id, VisitId(4));
}

#[test]
fn concluding_shrinks_pending_filter_and_clamps_page() {
    let app = Tester::default();
    let mut model = started(&app);

    let mut visits: Vec<Visit> = (1..=11).map(|i| seeded_visit(i, i * 1_000)).collect();
    visits[0].is_selected = true;
    model.store = VisitStore::from_visits(visits);

    app.update(
        Event::FilterChanged {
            filter: FilterTag::Pending,
        },
        &mut model,
    );
    app.update(Event::PageChanged { page: 2 }, &mut model);
    assert_eq!(model.query.page, 2);

    app.update(Event::ConcludeSelected, &mut model);
    assert_eq!(model.query.page, 1);
    assert_eq!(app.view(&model).list.cards.len(), 10);
}
