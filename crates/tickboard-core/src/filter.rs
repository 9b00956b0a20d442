//! Composite filter, free-text search, and stable sort over ticket snapshots.
//!
//! # Evaluation order
//!
//! 1. Search: when the trimmed term is non-empty, keep tickets whose
//!    lowercased title or id contains the lowercased term.
//! 2. Clauses: every [`FilterClause`] must hold (logical AND).
//! 3. Stable sort by [`SortField`] in [`SortDir`]; equal keys keep their
//!    input order.
//!
//! # Degradation
//!
//! Nothing in here fails. A clause whose value has the wrong shape for its
//! operator, whose operator does not apply to its field, or whose reference
//! date does not parse is compiled to [`Predicate::All`] and matches every
//! ticket. Tickets with an empty or unparseable timestamp never satisfy a
//! date predicate.

#![allow(clippy::module_name_repetitions)]

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::{debug, instrument};

use crate::model::{
    FilterClause, FilterField, FilterOperator, KNOWN_TYPES, SortDir, SortField, Ticket,
};

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A filter set plus search term and sort order, evaluated as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketQuery {
    pub filters: Vec<FilterClause>,
    pub sort_field: SortField,
    pub sort_dir: SortDir,
    pub search: Option<String>,
}

impl TicketQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, clause: FilterClause) -> Self {
        self.filters.push(clause);
        self
    }

    #[must_use]
    pub const fn sort(mut self, field: SortField, dir: SortDir) -> Self {
        self.sort_field = field;
        self.sort_dir = dir;
        self
    }

    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Evaluate against `tickets` using the current time for relative dates.
    #[must_use]
    pub fn run<'a>(&self, tickets: &'a [Ticket]) -> Vec<&'a Ticket> {
        self.run_at(tickets, Utc::now())
    }

    /// Evaluate against `tickets` with an explicit "now".
    #[must_use]
    pub fn run_at<'a>(&self, tickets: &'a [Ticket], now: DateTime<Utc>) -> Vec<&'a Ticket> {
        apply_filters_and_sort_at(
            tickets,
            &self.filters,
            self.sort_field,
            self.sort_dir,
            self.search.as_deref(),
            now,
        )
    }
}

/// Filter, search, and sort `tickets`. See the module docs for semantics.
///
/// The input is never mutated; the result borrows from it.
#[must_use]
pub fn apply_filters_and_sort<'a>(
    tickets: &'a [Ticket],
    filters: &[FilterClause],
    sort_field: SortField,
    sort_dir: SortDir,
    search: Option<&str>,
) -> Vec<&'a Ticket> {
    apply_filters_and_sort_at(tickets, filters, sort_field, sort_dir, search, Utc::now())
}

/// [`apply_filters_and_sort`] with an explicit reference time for the
/// relative date operators.
#[must_use]
#[instrument(
    skip_all,
    fields(tickets = tickets.len(), clauses = filters.len(), sort = %sort_field)
)]
pub fn apply_filters_and_sort_at<'a>(
    tickets: &'a [Ticket],
    filters: &[FilterClause],
    sort_field: SortField,
    sort_dir: SortDir,
    search: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<&'a Ticket> {
    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let predicates: Vec<Predicate> = filters.iter().map(|c| Predicate::compile(c, now)).collect();

    let mut out: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| needle.as_deref().is_none_or(|n| matches_search(t, n)))
        .filter(|t| predicates.iter().all(|p| p.matches(t)))
        .collect();

    sort_tickets(&mut out, sort_field, sort_dir);
    debug!(matched = out.len(), "applied filters");
    out
}

/// Evaluate a single clause against a single ticket.
#[must_use]
pub fn matches_clause(ticket: &Ticket, clause: &FilterClause, now: DateTime<Utc>) -> bool {
    Predicate::compile(clause, now).matches(ticket)
}

/// `needle` must already be lowercased.
fn matches_search(ticket: &Ticket, needle: &str) -> bool {
    ticket.title.to_lowercase().contains(needle) || ticket.id.to_lowercase().contains(needle)
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// A clause with its value decoded once, ready to test many tickets.
#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    /// Degraded clause: matches every ticket.
    All,
    /// Scalar field value membership (status, type, priority, assignee).
    InSet {
        field: FilterField,
        values: HashSet<String>,
        negate: bool,
    },
    TagsAny(HashSet<String>),
    TagsNone(HashSet<String>),
    AssigneeIs {
        value: String,
        negate: bool,
    },
    /// Lowercased needle.
    TitleContains(String),
    Before(FilterField, DateTime<Utc>),
    After(FilterField, DateTime<Utc>),
    Between(FilterField, DateTime<Utc>, DateTime<Utc>),
    /// Timestamp at or after the cutoff.
    Since(FilterField, DateTime<Utc>),
    /// Timestamp strictly before the cutoff.
    OlderThan(FilterField, DateTime<Utc>),
}

impl Predicate {
    fn compile(clause: &FilterClause, now: DateTime<Utc>) -> Self {
        use FilterField as F;
        use FilterOperator as Op;

        let compiled = match (clause.field, clause.operator) {
            (F::Status | F::Type | F::Priority | F::Assignee, Op::AnyOf | Op::NoneOf) => clause
                .value
                .as_list()
                .map(|values| Self::InSet {
                    field: clause.field,
                    values: values.into_iter().collect(),
                    negate: clause.operator == Op::NoneOf,
                }),
            (F::Tag, Op::AnyOf) => clause
                .value
                .as_list()
                .map(|v| Self::TagsAny(v.into_iter().collect())),
            (F::Tag, Op::NoneOf) => clause
                .value
                .as_list()
                .map(|v| Self::TagsNone(v.into_iter().collect())),
            (F::Assignee, Op::Is | Op::IsNot) => {
                clause.value.as_text().map(|value| Self::AssigneeIs {
                    value: value.to_string(),
                    negate: clause.operator == Op::IsNot,
                })
            }
            (F::Title, Op::Contains) => clause
                .value
                .as_text()
                .map(|s| Self::TitleContains(s.to_lowercase())),
            (F::Created | F::Modified, Op::Before) => clause
                .value
                .as_text()
                .and_then(parse_timestamp)
                .map(|at| Self::Before(clause.field, at)),
            (F::Created | F::Modified, Op::After) => clause
                .value
                .as_text()
                .and_then(parse_timestamp)
                .map(|at| Self::After(clause.field, at)),
            (F::Created | F::Modified, Op::Between) => {
                clause.value.as_range().and_then(|(from, to)| {
                    Some(Self::Between(
                        clause.field,
                        parse_timestamp(&from)?,
                        parse_timestamp(&to)?,
                    ))
                })
            }
            (F::Created | F::Modified, Op::LastNDays | Op::NewerThan) => clause
                .value
                .as_number()
                .and_then(|days| days_before(now, days))
                .map(|cutoff| Self::Since(clause.field, cutoff)),
            (F::Created | F::Modified, Op::OlderThan) => clause
                .value
                .as_number()
                .and_then(|days| days_before(now, days))
                .map(|cutoff| Self::OlderThan(clause.field, cutoff)),
            _ => {
                debug!(
                    field = %clause.field,
                    operator = %clause.operator,
                    "operator does not apply to field; clause matches everything"
                );
                return Self::All;
            }
        };

        compiled.unwrap_or_else(|| {
            debug!(
                clause = %clause.id,
                field = %clause.field,
                operator = %clause.operator,
                "malformed clause value; clause matches everything"
            );
            Self::All
        })
    }

    fn matches(&self, ticket: &Ticket) -> bool {
        match self {
            Self::All => true,
            Self::InSet {
                field,
                values,
                negate,
            } => {
                let hit = match field {
                    FilterField::Status => values.contains(ticket.status.as_str()),
                    FilterField::Type => values.contains(&ticket.ticket_type),
                    FilterField::Priority => values.contains(&ticket.priority.to_string()),
                    FilterField::Assignee => values.contains(ticket.assignee_or_empty()),
                    _ => return true,
                };
                hit != *negate
            }
            Self::TagsAny(values) => ticket.tags.iter().any(|t| values.contains(t)),
            Self::TagsNone(values) => !ticket.tags.iter().any(|t| values.contains(t)),
            Self::AssigneeIs { value, negate } => (ticket.assignee_or_empty() == value) != *negate,
            Self::TitleContains(needle) => ticket.title.to_lowercase().contains(needle.as_str()),
            Self::Before(field, at) => ticket_time(ticket, *field).is_some_and(|ts| ts < *at),
            Self::After(field, at) => ticket_time(ticket, *field).is_some_and(|ts| ts > *at),
            Self::Between(field, from, to) => {
                ticket_time(ticket, *field).is_some_and(|ts| ts >= *from && ts <= *to)
            }
            Self::Since(field, cutoff) => {
                ticket_time(ticket, *field).is_some_and(|ts| ts >= *cutoff)
            }
            Self::OlderThan(field, cutoff) => {
                ticket_time(ticket, *field).is_some_and(|ts| ts < *cutoff)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Parse an ISO-8601 timestamp or calendar date.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM[:SS[.f]]` (read as UTC), and
/// bare `YYYY-MM-DD` (UTC midnight). Empty input is `None`.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

fn ticket_time(ticket: &Ticket, field: FilterField) -> Option<DateTime<Utc>> {
    match field {
        FilterField::Created => parse_timestamp(&ticket.created),
        FilterField::Modified => parse_timestamp(&ticket.modified),
        _ => None,
    }
}

/// `now - days`, with fractional days honoured to the millisecond.
#[allow(clippy::cast_possible_truncation)]
fn days_before(now: DateTime<Utc>, days: f64) -> Option<DateTime<Utc>> {
    let millis = (days * 86_400_000.0).round();
    if !millis.is_finite() || millis.abs() > 1e15 {
        return None;
    }
    now.checked_sub_signed(Duration::milliseconds(millis as i64))
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Per-ticket sort key, computed once before sorting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Text(String),
    Number(i64),
    Ranked(u8, String),
    /// `None` (unknown) always sorts last, in either direction.
    Optional(Option<String>),
    Time(Option<DateTime<Utc>>),
}

fn sort_key(ticket: &Ticket, field: SortField) -> SortKey {
    match field {
        SortField::Id => SortKey::Text(ticket.id.to_lowercase()),
        SortField::Title => SortKey::Text(ticket.title.to_lowercase()),
        SortField::Status => SortKey::Number(i64::from(ticket.status.rank())),
        SortField::Type => {
            let rank = KNOWN_TYPES
                .iter()
                .position(|t| *t == ticket.ticket_type)
                .unwrap_or(KNOWN_TYPES.len());
            SortKey::Ranked(
                u8::try_from(rank).unwrap_or(u8::MAX),
                ticket.ticket_type.to_lowercase(),
            )
        }
        SortField::Priority => SortKey::Number(i64::from(ticket.priority)),
        SortField::Assignee => SortKey::Optional(
            ticket
                .assignee
                .as_deref()
                .filter(|a| !a.is_empty())
                .map(str::to_lowercase),
        ),
        SortField::Created => SortKey::Time(parse_timestamp(&ticket.created)),
        SortField::Modified => SortKey::Time(parse_timestamp(&ticket.modified)),
        SortField::Other => SortKey::Number(0),
    }
}

fn compare_keys(a: &SortKey, b: &SortKey, dir: SortDir) -> Ordering {
    let directed = |ord: Ordering| match dir {
        SortDir::Asc => ord,
        SortDir::Desc => ord.reverse(),
    };
    match (a, b) {
        (SortKey::Optional(x), SortKey::Optional(y)) => {
            missing_last(x.as_ref(), y.as_ref(), directed)
        }
        (SortKey::Time(x), SortKey::Time(y)) => missing_last(x.as_ref(), y.as_ref(), directed),
        _ => directed(a.cmp(b)),
    }
}

fn missing_last<T: Ord>(
    a: Option<&T>,
    b: Option<&T>,
    directed: impl Fn(Ordering) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => directed(x.cmp(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort in place. [`SortField::Other`] leaves the order untouched.
pub fn sort_tickets(tickets: &mut Vec<&Ticket>, field: SortField, dir: SortDir) {
    if field == SortField::Other {
        debug!("unknown sort field; keeping input order");
        return;
    }
    let mut keyed: Vec<(SortKey, &Ticket)> =
        tickets.iter().map(|t| (sort_key(t, field), *t)).collect();
    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, dir));
    tickets.clear();
    tickets.extend(keyed.into_iter().map(|(_, t)| t));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FilterField as Field, FilterOperator as Op, FilterValue, Status};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn clause(field: FilterField, operator: FilterOperator, value: FilterValue) -> FilterClause {
        FilterClause {
            id: "f-test".to_string(),
            field,
            operator,
            value,
        }
    }

    fn ids(tickets: &[&Ticket]) -> Vec<String> {
        tickets.iter().map(|t| t.id.clone()).collect()
    }

    /// Filter, then sort by id ascending.
    fn by_id(tickets: &[Ticket], filters: &[FilterClause]) -> Vec<String> {
        ids(&apply_filters_and_sort_at(tickets, filters, SortField::Id, SortDir::Asc, None, now()))
    }

    fn sorted(tickets: &[Ticket], field: SortField, dir: SortDir) -> Vec<String> {
        ids(&apply_filters_and_sort_at(tickets, &[], field, dir, None, now()))
    }

    fn searched(tickets: &[Ticket], search: &str) -> Vec<String> {
        ids(&apply_filters_and_sort_at(
            tickets,
            &[],
            SortField::Id,
            SortDir::Asc,
            Some(search),
            now(),
        ))
    }

    fn sample() -> Vec<Ticket> {
        vec![
            Ticket::new("t-1")
                .with_title("Fix login timeout")
                .with_priority(0)
                .with_tags(&["backend", "auth"])
                .with_created("2024-05-30T10:00:00Z")
                .with_assignee("ana"),
            Ticket::new("t-2")
                .with_title("Dark mode")
                .with_status(Status::Closed)
                .with_type("feature")
                .with_priority(1)
                .with_tags(&["ui"])
                .with_created("2024-01-15T00:00:00Z"),
            Ticket::new("t-3")
                .with_title("Crash on save")
                .with_status(Status::InProgress)
                .with_type("bug")
                .with_priority(0)
                .with_created(""),
        ]
    }

    #[test]
    fn empty_filter_set_keeps_everything_in_sorted_order() {
        let tickets = sample();
        assert_eq!(
            sorted(&tickets, SortField::Priority, SortDir::Asc),
            vec!["t-1", "t-3", "t-2"]
        );
    }

    #[test]
    fn status_any_of_and_none_of() {
        let tickets = sample();
        let any = clause(Field::Status, Op::AnyOf, FilterValue::list(&["open", "closed"]));
        let none = clause(Field::Status, Op::NoneOf, FilterValue::list(&["open"]));
        assert_eq!(by_id(&tickets, &[any]), vec!["t-1", "t-2"]);
        assert_eq!(by_id(&tickets, &[none]), vec!["t-2", "t-3"]);
    }

    #[test]
    fn priority_values_compare_as_strings() {
        let tickets = sample();
        let c: FilterClause = serde_json::from_str(
            r#"{"id":"f","field":"priority","operator":"any_of","value":[0]}"#,
        )
        .unwrap();
        assert_eq!(by_id(&tickets, &[c]), vec!["t-1", "t-3"]);
    }

    #[test]
    fn tag_any_of_and_none_of() {
        let tickets = sample();
        let any = clause(Field::Tag, Op::AnyOf, FilterValue::list(&["ui", "auth"]));
        let none = clause(Field::Tag, Op::NoneOf, FilterValue::list(&["ui", "auth"]));
        assert_eq!(by_id(&tickets, &[any]), vec!["t-1", "t-2"]);
        assert_eq!(by_id(&tickets, &[none]), vec!["t-3"]);
    }

    #[test]
    fn assignee_absent_compares_as_empty_string() {
        let tickets = sample();
        let unassigned = clause(Field::Assignee, Op::Is, FilterValue::text(""));
        let not_ana = clause(Field::Assignee, Op::IsNot, FilterValue::text("ana"));
        let any = clause(Field::Assignee, Op::AnyOf, FilterValue::list(&["ana"]));
        assert_eq!(by_id(&tickets, &[unassigned]), vec!["t-2", "t-3"]);
        assert_eq!(by_id(&tickets, &[not_ana]), vec!["t-2", "t-3"]);
        assert_eq!(by_id(&tickets, &[any]), vec!["t-1"]);
    }

    #[test]
    fn title_contains_is_case_insensitive() {
        let tickets = sample();
        let c = clause(Field::Title, Op::Contains, FilterValue::text("CRASH"));
        assert_eq!(by_id(&tickets, &[c]), vec!["t-3"]);
    }

    #[test]
    fn search_matches_title_or_id() {
        let tickets = sample();
        assert_eq!(searched(&tickets, "  LOGIN "), vec!["t-1"]);
        assert_eq!(searched(&tickets, "t-2"), vec!["t-2"]);
        assert_eq!(searched(&tickets, "   ").len(), 3);
    }

    #[test]
    fn malformed_value_matches_everything() {
        let tickets = sample();
        let bad = clause(Field::Status, Op::AnyOf, FilterValue::text("open"));
        assert_eq!(by_id(&tickets, &[bad]).len(), 3);
    }

    #[test]
    fn operator_not_valid_for_field_matches_everything() {
        let tickets = sample();
        let bad = clause(Field::Status, Op::Contains, FilterValue::text("open"));
        let other = clause(Field::Status, Op::Other, FilterValue::text("x"));
        assert_eq!(by_id(&tickets, &[bad, other]).len(), 3);
    }

    #[test]
    fn date_predicates_exclude_empty_dates() {
        let tickets = sample();
        let c = clause(Field::Created, Op::OlderThan, FilterValue::Number(0.0));
        assert_eq!(by_id(&tickets, &[c]), vec!["t-1", "t-2"]);
    }

    #[test]
    fn before_and_after_are_strict_between_is_inclusive() {
        let tickets = vec![Ticket::new("t-1").with_created("2024-01-15T00:00:00Z")];
        let boundary = "2024-01-15";
        let before = clause(Field::Created, Op::Before, FilterValue::text(boundary));
        let after = clause(Field::Created, Op::After, FilterValue::text(boundary));
        let start = clause(
            Field::Created,
            Op::Between,
            FilterValue::range(boundary, "2024-02-01"),
        );
        let end = clause(
            Field::Created,
            Op::Between,
            FilterValue::range("2024-01-01", boundary),
        );
        for c in [before, after] {
            assert!(!matches_clause(&tickets[0], &c, now()));
        }
        for c in [start, end] {
            assert!(matches_clause(&tickets[0], &c, now()));
        }
    }

    #[test]
    fn relative_dates_accept_fractional_days() {
        let tickets = vec![
            Ticket::new("recent").with_created("2024-06-01T09:00:00Z"),
            Ticket::new("stale").with_created("2024-06-01T07:00:00Z"),
        ];
        let four_hours = FilterValue::Number(4.0 / 24.0);
        let newer = clause(Field::Created, Op::NewerThan, four_hours.clone());
        let last = clause(Field::Created, Op::LastNDays, four_hours.clone());
        let older = clause(Field::Created, Op::OlderThan, four_hours);
        assert_eq!(by_id(&tickets, &[newer]), vec!["recent"]);
        assert_eq!(by_id(&tickets, &[last]), vec!["recent"]);
        assert_eq!(by_id(&tickets, &[older]), vec!["stale"]);
    }

    #[test]
    fn unparseable_reference_date_matches_everything() {
        let tickets = sample();
        let c = clause(Field::Created, Op::Before, FilterValue::text("last tuesday"));
        assert_eq!(by_id(&tickets, &[c]).len(), 3);
    }

    #[test]
    fn parse_timestamp_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-15T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-15T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-15T00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-15T00:00"), Some(midnight));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("soon"), None);
    }

    #[test]
    fn unknown_dates_sort_last_in_both_directions() {
        let tickets = sample();
        assert_eq!(
            sorted(&tickets, SortField::Created, SortDir::Asc),
            vec!["t-2", "t-1", "t-3"]
        );
        assert_eq!(
            sorted(&tickets, SortField::Created, SortDir::Desc),
            vec!["t-1", "t-2", "t-3"]
        );
    }

    #[test]
    fn descending_sort_keeps_ties_in_input_order() {
        let tickets = vec![
            Ticket::new("a").with_priority(1),
            Ticket::new("b").with_priority(2),
            Ticket::new("c").with_priority(1),
        ];
        assert_eq!(
            sorted(&tickets, SortField::Priority, SortDir::Desc),
            vec!["b", "a", "c"]
        );
    }

    #[test]
    fn type_sort_uses_board_order_then_name() {
        let tickets = vec![
            Ticket::new("a").with_type("spike"),
            Ticket::new("b").with_type("bug"),
            Ticket::new("c").with_type("epic"),
        ];
        assert_eq!(sorted(&tickets, SortField::Type, SortDir::Asc), vec!["c", "b", "a"]);
    }

    #[test]
    fn unknown_sort_field_keeps_input_order() {
        let tickets = sample();
        assert_eq!(
            sorted(&tickets, SortField::Other, SortDir::Desc),
            vec!["t-1", "t-2", "t-3"]
        );
    }

    #[test]
    fn query_builder_runs_the_same_pipeline() {
        let tickets = sample();
        let q = TicketQuery::new()
            .filter(clause(Field::Type, Op::NoneOf, FilterValue::list(&["feature"])))
            .sort(SortField::Title, SortDir::Asc)
            .search("o");
        assert_eq!(ids(&q.run_at(&tickets, now())), vec!["t-3", "t-1"]);
    }
}
