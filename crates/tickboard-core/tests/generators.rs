#![allow(dead_code)]

use proptest::prelude::*;
use tickboard_core::model::{
    FilterClause, FilterField, FilterOperator, FilterValue, KNOWN_TYPES, Scalar, SortDir, SortField,
    Status, Ticket,
};

const TAGS: [&str; 4] = ["ui", "api", "infra", "docs"];
const PEOPLE: [&str; 3] = ["ana", "bo", "cy"];
const WORDS: [&str; 6] = ["login", "cache", "export", "crash", "Layout", "sync"];

/// Raw per-ticket choices; ids are assigned by position afterwards.
#[derive(Debug, Clone)]
struct TicketDraft {
    status: Status,
    ticket_type: &'static str,
    priority: u8,
    tags: Vec<&'static str>,
    deps: Vec<usize>,
    links: Vec<usize>,
    created_hours: Option<u32>,
    modified_hours: Option<u32>,
    assignee: Option<&'static str>,
    title: Vec<&'static str>,
}

fn timestamp(hours: u32) -> String {
    let day = 1 + hours / 24;
    let hour = hours % 24;
    format!("2024-03-{day:02}T{hour:02}:00:00Z")
}

fn arb_draft(max_refs: usize) -> impl Strategy<Value = TicketDraft> {
    (
        prop::sample::select(Status::ALL.to_vec()),
        prop::sample::select(KNOWN_TYPES.to_vec()),
        0u8..5,
        prop::sample::subsequence(TAGS.to_vec(), 0..=2),
        prop::collection::vec(0..max_refs.max(1), 0..3),
        prop::collection::vec(0..max_refs.max(1), 0..2),
        prop::option::of(0u32..(24 * 20)),
        prop::option::of(0u32..(24 * 20)),
        prop::option::of(prop::sample::select(PEOPLE.to_vec())),
        prop::collection::vec(prop::sample::select(WORDS.to_vec()), 1..3),
    )
        .prop_map(
            |(
                status,
                ticket_type,
                priority,
                tags,
                deps,
                links,
                created_hours,
                modified_hours,
                assignee,
                title,
            )| TicketDraft {
                status,
                ticket_type,
                priority,
                tags,
                deps,
                links,
                created_hours,
                modified_hours,
                assignee,
                title,
            },
        )
}

/// Tickets `t-0..t-n` whose deps/links point at arbitrary ids in the same
/// range, cycles and self references included.
pub fn arb_tickets(max: usize) -> impl Strategy<Value = Vec<Ticket>> {
    prop::collection::vec(arb_draft(max), 0..max).prop_map(|drafts| {
        drafts
            .into_iter()
            .enumerate()
            .map(|(i, d)| Ticket {
                id: format!("t-{i}"),
                status: d.status,
                ticket_type: d.ticket_type.to_string(),
                priority: d.priority,
                tags: d.tags.iter().map(ToString::to_string).collect(),
                deps: d.deps.iter().map(|n| format!("t-{n}")).collect(),
                links: d.links.iter().map(|n| format!("t-{n}")).collect(),
                created: d.created_hours.map(timestamp).unwrap_or_default(),
                modified: d.modified_hours.map(timestamp).unwrap_or_default(),
                assignee: d.assignee.map(ToString::to_string),
                title: d.title.join(" "),
            })
            .collect()
    })
}

fn clause(field: FilterField, operator: FilterOperator, value: FilterValue) -> FilterClause {
    FilterClause {
        id: String::new(),
        field,
        operator,
        value,
    }
}

fn text_list(items: Vec<&'static str>) -> FilterValue {
    FilterValue::List(items.into_iter().map(|s| Scalar::Text(s.to_string())).collect())
}

/// Any well-formed clause plus a few malformed ones.
pub fn arb_clause() -> impl Strategy<Value = FilterClause> {
    let statuses: Vec<&'static str> = Status::ALL.iter().map(|s| s.as_str()).collect();
    prop_oneof![
        (prop::sample::subsequence(statuses, 1..=2), any::<bool>()).prop_map(|(v, neg)| clause(
            FilterField::Status,
            if neg { FilterOperator::NoneOf } else { FilterOperator::AnyOf },
            text_list(v),
        )),
        prop::collection::vec(0u8..5, 1..3).prop_map(|v| clause(
            FilterField::Priority,
            FilterOperator::AnyOf,
            FilterValue::List(v.into_iter().map(|p| Scalar::Number(f64::from(p))).collect()),
        )),
        (prop::sample::subsequence(TAGS.to_vec(), 1..=2), any::<bool>()).prop_map(|(v, neg)| clause(
            FilterField::Tag,
            if neg { FilterOperator::NoneOf } else { FilterOperator::AnyOf },
            text_list(v),
        )),
        prop::sample::select(PEOPLE.to_vec()).prop_map(|p| clause(
            FilterField::Assignee,
            FilterOperator::Is,
            FilterValue::Text(p.to_string()),
        )),
        prop::sample::select(WORDS.to_vec()).prop_map(|w| clause(
            FilterField::Title,
            FilterOperator::Contains,
            FilterValue::Text(w.to_lowercase()),
        )),
        (0u32..(24 * 20)).prop_map(|h| clause(
            FilterField::Created,
            FilterOperator::Before,
            FilterValue::Text(timestamp(h)),
        )),
        (0u32..(24 * 20), 0u32..(24 * 20)).prop_map(|(a, b)| clause(
            FilterField::Modified,
            FilterOperator::Between,
            FilterValue::List(vec![
                Scalar::Text(timestamp(a.min(b))),
                Scalar::Text(timestamp(a.max(b))),
            ]),
        )),
        Just(clause(
            FilterField::Status,
            FilterOperator::AnyOf,
            FilterValue::Number(3.0),
        )),
    ]
}

pub fn arb_sort_field() -> impl Strategy<Value = SortField> {
    prop::sample::select(SortField::ALL.to_vec())
}

pub fn arb_sort_dir() -> impl Strategy<Value = SortDir> {
    prop::sample::select(SortDir::ALL.to_vec())
}

pub fn arb_search() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![
        prop::sample::select(WORDS.to_vec()).prop_map(str::to_uppercase),
        (0usize..20).prop_map(|n| format!("t-{n}")),
    ])
}
