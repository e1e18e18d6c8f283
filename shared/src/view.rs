//! Read-only projections of the model: the filtered, sorted page of visits
//! and the `ViewModel` handed to the shell.

use serde::{Deserialize, Serialize};

use crate::form::{FormField, VisitForm};
use crate::model::{Model, Visit, VisitId};
use crate::{
    format_time_ago, UserFacingError, PAGE_SIZE, PENDING_LEVEL_HIGH_FROM,
    PENDING_LEVEL_MEDIUM_FROM,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterTag {
    #[default]
    All,
    Pending,
    Completed,
}

impl FilterTag {
    #[must_use]
    pub const fn matches(self, visit: &Visit) -> bool {
        match self {
            Self::All => true,
            Self::Pending => visit.is_pending,
            Self::Completed => !visit.is_pending,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// What the list is currently showing. Pages are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub filter: FilterTag,
    pub sort: SortDirection,
    pub page: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: FilterTag::default(),
            sort: SortDirection::default(),
            page: 1,
        }
    }
}

impl ListQuery {
    pub fn set_filter(&mut self, filter: FilterTag) {
        self.filter = filter;
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: SortDirection) {
        self.sort = sort;
        self.page = 1;
    }

    pub fn clamp_page(&mut self, total_pages: usize) {
        self.page = self.page.clamp(1, total_pages.max(1));
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<'a> {
    pub items: Vec<&'a Visit>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[must_use]
pub fn total_pages(visits: &[Visit], filter: FilterTag) -> usize {
    let count = visits.iter().filter(|v| filter.matches(v)).count();
    count.div_ceil(PAGE_SIZE)
}

/// Filters, stable-sorts by `last_modified`, and cuts out one page.
/// A page outside `1..=total_pages` comes back with no items.
#[must_use]
pub fn paginate<'a>(
    visits: &'a [Visit],
    filter: FilterTag,
    sort: SortDirection,
    page: usize,
    page_size: usize,
) -> Page<'a> {
    let mut matching: Vec<&Visit> = visits.iter().filter(|v| filter.matches(v)).collect();

    match sort {
        SortDirection::Asc => matching.sort_by(|a, b| a.last_modified.cmp(&b.last_modified)),
        SortDirection::Desc => matching.sort_by(|a, b| b.last_modified.cmp(&a.last_modified)),
    }

    let total_items = matching.len();
    let page_size = page_size.max(1);
    let total_pages = total_items.div_ceil(page_size);

    let items = if page == 0 {
        Vec::new()
    } else {
        let start = (page - 1).saturating_mul(page_size);
        matching.into_iter().skip(start).take(page_size).collect()
    };

    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}

#[must_use]
pub fn query_page<'a>(visits: &'a [Visit], query: &ListQuery) -> Page<'a> {
    paginate(visits, query.filter, query.sort, query.page, PAGE_SIZE)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingLevel {
    Low,
    Medium,
    High,
}

impl PendingLevel {
    #[must_use]
    pub const fn for_count(pending: usize) -> Self {
        if pending >= PENDING_LEVEL_HIGH_FROM {
            Self::High
        } else if pending >= PENDING_LEVEL_MEDIUM_FROM {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Pending,
    Concluded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitCard {
    pub id: VisitId,
    pub address: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    pub uf: String,
    pub cep: String,
    pub is_selected: bool,
    pub can_edit: bool,
    pub status: VisitStatus,
    pub status_line: String,
    pub last_modified_ms: u64,
    pub conclusion_date_ms: Option<u64>,
}

impl VisitCard {
    #[must_use]
    pub fn new(visit: &Visit, now_ms: u64) -> Self {
        let (status, status_line) = match visit.conclusion_date {
            Some(concluded) => (
                VisitStatus::Concluded,
                format!("Concluded {}", format_time_ago(concluded.as_millis(), now_ms)),
            ),
            None => (
                VisitStatus::Pending,
                format!(
                    "Last modified {}",
                    format_time_ago(visit.last_modified.as_millis(), now_ms)
                ),
            ),
        };

        Self {
            id: visit.id,
            address: visit.address.clone(),
            number: visit.number.clone(),
            neighborhood: visit.neighborhood.clone(),
            city: visit.city.clone(),
            uf: visit.uf.clone(),
            cep: visit.cep.clone(),
            is_selected: visit.is_selected,
            can_edit: visit.is_pending,
            status,
            status_line,
            last_modified_ms: visit.last_modified.as_millis(),
            conclusion_date_ms: visit.conclusion_date.map(crate::UnixTimeMs::as_millis),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderView {
    pub pending_count: usize,
    pub pending_level: PendingLevel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListView {
    pub cards: Vec<VisitCard>,
    pub filter: FilterTag,
    pub sort: SortDirection,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterView {
    pub can_conclude: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldView {
    pub field: FormField,
    pub value: String,
    pub editable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormView {
    pub title: String,
    pub fields: Vec<FieldView>,
    pub is_loading: bool,
    pub can_submit: bool,
}

impl From<&VisitForm> for FormView {
    fn from(form: &VisitForm) -> Self {
        let fields = FormField::ALL
            .iter()
            .map(|&field| FieldView {
                field,
                value: form.value(field).to_string(),
                editable: form.is_editable(field),
            })
            .collect();

        Self {
            title: form.title().to_string(),
            fields,
            is_loading: form.is_loading(),
            can_submit: form.can_submit(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewModel {
    pub header: HeaderView,
    pub list: ListView,
    pub footer: FooterView,
    pub form: Option<FormView>,
    pub notice: Option<UserFacingError>,
    pub is_loaded: bool,
}

impl ViewModel {
    #[must_use]
    pub fn build(model: &Model) -> Self {
        let pending_count = model.store.pending_count();
        let page = query_page(model.store.as_slice(), &model.query);
        let now_ms = model.view_timestamp_ms;

        Self {
            header: HeaderView {
                pending_count,
                pending_level: PendingLevel::for_count(pending_count),
            },
            list: ListView {
                cards: page
                    .items
                    .iter()
                    .map(|visit| VisitCard::new(visit, now_ms))
                    .collect(),
                filter: model.query.filter,
                sort: model.query.sort,
                page: page.page,
                total_pages: page.total_pages,
                total_items: page.total_items,
            },
            footer: FooterView {
                can_conclude: model.store.has_pending_selected(),
            },
            form: model.form.as_ref().map(FormView::from),
            notice: model.active_error.as_ref().map(UserFacingError::from),
            is_loaded: model.is_loaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VisitFields;
    use crate::UnixTimeMs;
    use proptest::prelude::*;

    fn visit(id: u64, last_modified: u64, is_pending: bool) -> Visit {
        let mut visit = Visit::new(VisitId(id), VisitFields::default(), UnixTimeMs(last_modified));
        if !is_pending {
            visit.is_pending = false;
            visit.conclusion_date = Some(UnixTimeMs(last_modified + 1));
        }
        visit
    }

    fn ids(page: &Page<'_>) -> Vec<u64> {
        page.items.iter().map(|v| v.id.as_u64()).collect()
    }

    #[test]
    fn twenty_five_items_make_three_pages() {
        let visits: Vec<Visit> = (1..=25).map(|i| visit(i, i, true)).collect();

        let page1 = paginate(&visits, FilterTag::All, SortDirection::Desc, 1, 10);
        assert_eq!(page1.total_pages, 3);
        assert_eq!(page1.total_items, 25);
        assert_eq!(page1.items.len(), 10);

        let page3 = paginate(&visits, FilterTag::All, SortDirection::Desc, 3, 10);
        assert_eq!(page3.items.len(), 5);

        let page4 = paginate(&visits, FilterTag::All, SortDirection::Desc, 4, 10);
        assert!(page4.items.is_empty());
        assert_eq!(page4.total_pages, 3);
    }

    #[test]
    fn page_zero_and_empty_collection_are_empty() {
        let visits: Vec<Visit> = (1..=3).map(|i| visit(i, i, true)).collect();
        assert!(paginate(&visits, FilterTag::All, SortDirection::Desc, 0, 10)
            .items
            .is_empty());

        let empty = paginate(&[], FilterTag::All, SortDirection::Desc, 1, 10);
        assert!(empty.items.is_empty());
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn default_sort_is_newest_first() {
        let visits = vec![visit(1, 100, true), visit(2, 300, true), visit(3, 200, true)];

        let desc = paginate(&visits, FilterTag::All, ListQuery::default().sort, 1, 10);
        assert_eq!(ids(&desc), vec![2, 3, 1]);

        let asc = paginate(&visits, FilterTag::All, SortDirection::Asc, 1, 10);
        assert_eq!(ids(&asc), vec![1, 3, 2]);
    }

    #[test]
    fn ties_keep_insertion_order_in_both_directions() {
        let visits = vec![visit(1, 100, true), visit(2, 100, true), visit(3, 50, true)];

        let desc = paginate(&visits, FilterTag::All, SortDirection::Desc, 1, 10);
        assert_eq!(ids(&desc), vec![1, 2, 3]);

        let asc = paginate(&visits, FilterTag::All, SortDirection::Asc, 1, 10);
        assert_eq!(ids(&asc), vec![3, 1, 2]);
    }

    #[test]
    fn filters_select_by_pending_state() {
        let visits = vec![visit(1, 1, true), visit(2, 2, false), visit(3, 3, true)];

        let pending = paginate(&visits, FilterTag::Pending, SortDirection::Asc, 1, 10);
        assert_eq!(ids(&pending), vec![1, 3]);

        let completed = paginate(&visits, FilterTag::Completed, SortDirection::Asc, 1, 10);
        assert_eq!(ids(&completed), vec![2]);
    }

    #[test]
    fn list_query_resets_and_clamps_page() {
        let mut query = ListQuery {
            page: 4,
            ..ListQuery::default()
        };
        query.set_filter(FilterTag::Pending);
        assert_eq!(query.page, 1);

        query.page = 9;
        query.clamp_page(3);
        assert_eq!(query.page, 3);

        query.clamp_page(0);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn pending_level_thresholds() {
        assert_eq!(PendingLevel::for_count(0), PendingLevel::Low);
        assert_eq!(PendingLevel::for_count(3), PendingLevel::Low);
        assert_eq!(PendingLevel::for_count(4), PendingLevel::Medium);
        assert_eq!(PendingLevel::for_count(9), PendingLevel::Medium);
        assert_eq!(PendingLevel::for_count(10), PendingLevel::High);
    }

    #[test]
    fn card_reports_conclusion() {
        let concluded = visit(1, 1_000, false);
        let card = VisitCard::new(&concluded, 1_001);
        assert_eq!(card.status, VisitStatus::Concluded);
        assert!(!card.can_edit);
        assert_eq!(card.status_line, "Concluded just now");
        assert_eq!(card.conclusion_date_ms, Some(1_001));

        let pending = visit(2, 0, true);
        let card = VisitCard::new(&pending, 120_000);
        assert_eq!(card.status, VisitStatus::Pending);
        assert!(card.can_edit);
        assert_eq!(card.status_line, "Last modified 2m ago");
    }

    fn arb_visits() -> impl Strategy<Value = Vec<Visit>> {
        prop::collection::vec((0u64..50, any::<bool>()), 0..60).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (ts, pending))| visit(i as u64 + 1, ts, pending))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn pending_and_completed_partition_all(visits in arb_visits()) {
            let all = paginate(&visits, FilterTag::All, SortDirection::Desc, 1, usize::MAX);
            let pending = paginate(&visits, FilterTag::Pending, SortDirection::Desc, 1, usize::MAX);
            let completed = paginate(&visits, FilterTag::Completed, SortDirection::Desc, 1, usize::MAX);

            prop_assert_eq!(pending.total_items + completed.total_items, all.total_items);
            for v in &pending.items {
                prop_assert!(!completed.items.iter().any(|c| c.id == v.id));
            }
        }

        #[test]
        fn pages_cover_every_match_exactly_once(visits in arb_visits(), page_size in 1usize..15) {
            let first = paginate(&visits, FilterTag::All, SortDirection::Desc, 1, page_size);
            let mut seen = Vec::new();
            for page in 1..=first.total_pages {
                let p = paginate(&visits, FilterTag::All, SortDirection::Desc, page, page_size);
                prop_assert!(!p.items.is_empty());
                prop_assert!(p.items.len() <= page_size);
                seen.extend(p.items.iter().map(|v| v.id));
            }
            prop_assert_eq!(seen.len(), visits.len());

            let beyond = paginate(&visits, FilterTag::All, SortDirection::Desc, first.total_pages + 1, page_size);
            prop_assert!(beyond.items.is_empty());
        }

        #[test]
        fn double_toggle_restores_order(visits in arb_visits()) {
            let sort = SortDirection::Desc;
            let before = ids(&paginate(&visits, FilterTag::All, sort, 1, usize::MAX));
            let after = ids(&paginate(&visits, FilterTag::All, sort.toggle().toggle(), 1, usize::MAX));
            prop_assert_eq!(before, after);
        }
    }
}
