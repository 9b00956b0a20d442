//! Ticket snapshots and the descriptors consumed by the query, grouping, and
//! selection engines.
//!
//! Every type here is plain data. Tickets are owned by the caller and only
//! ever borrowed by the engines; descriptors (clauses, sort/group modes)
//! deserialize leniently so that a stale saved view degrades instead of
//! failing to load.

#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

use crate::ids::IdSource;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// The four lifecycle states of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Closed,
    Cancelled,
}

impl Status {
    /// Canonical board order.
    pub const ALL: [Self; 4] = [Self::Open, Self::InProgress, Self::Closed, Self::Cancelled];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable column label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Closed => "Closed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Position in the canonical board order (open first).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::InProgress => 1,
            Self::Closed => 2,
            Self::Cancelled => 3,
        }
    }

    /// The status a status-dot click moves to.
    ///
    /// `open -> in_progress -> closed -> open`; `cancelled` re-enters the
    /// cycle at `open`.
    #[must_use]
    pub const fn next_in_cycle(self) -> Self {
        match self {
            Self::Open => Self::InProgress,
            Self::InProgress => Self::Closed,
            Self::Closed | Self::Cancelled => Self::Open,
        }
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// Conventional ticket types, in board order.
pub const KNOWN_TYPES: [&str; 5] = ["epic", "feature", "task", "bug", "chore"];

/// The type value that marks a ticket as an epic.
pub const EPIC_TYPE: &str = "epic";

/// An immutable ticket snapshot.
///
/// Only `id` is required when deserializing; every other field falls back
/// to an empty/default value, and `null` lists read as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ticket {
    pub id: String,
    pub status: Status,
    #[serde(rename = "type")]
    pub ticket_type: String,
    /// 0 (most urgent) through 3.
    pub priority: u8,
    #[serde(deserialize_with = "nullable_list")]
    pub tags: Vec<String>,
    /// Ids this ticket depends on.
    #[serde(deserialize_with = "nullable_list")]
    pub deps: Vec<String>,
    /// Ids this ticket is linked to.
    #[serde(deserialize_with = "nullable_list")]
    pub links: Vec<String>,
    /// ISO-8601 timestamp; empty means unknown.
    pub created: String,
    /// ISO-8601 timestamp; empty means unknown.
    pub modified: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub title: String,
}

impl Default for Ticket {
    fn default() -> Self {
        Self {
            id: String::new(),
            status: Status::Open,
            ticket_type: "task".to_string(),
            priority: 2,
            tags: Vec::new(),
            deps: Vec::new(),
            links: Vec::new(),
            created: String::new(),
            modified: String::new(),
            assignee: None,
            title: String::new(),
        }
    }
}

impl Ticket {
    /// A default task with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_type(mut self, ticket_type: impl Into<String>) -> Self {
        self.ticket_type = ticket_type.into();
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| (*t).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_deps(mut self, deps: &[&str]) -> Self {
        self.deps = deps.iter().map(|d| (*d).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_links(mut self, links: &[&str]) -> Self {
        self.links = links.iter().map(|l| (*l).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_created(mut self, created: impl Into<String>) -> Self {
        self.created = created.into();
        self
    }

    #[must_use]
    pub fn with_modified(mut self, modified: impl Into<String>) -> Self {
        self.modified = modified.into();
        self
    }

    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Returns `true` if this ticket heads an epic group.
    #[must_use]
    pub fn is_epic(&self) -> bool {
        self.ticket_type == EPIC_TYPE
    }

    /// Upward edges toward potential epic ancestors: `deps` first, then
    /// `links`.
    pub fn parent_refs(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().chain(self.links.iter()).map(String::as_str)
    }

    /// Assignee as compared by filters (`""` when absent).
    #[must_use]
    pub fn assignee_or_empty(&self) -> &str {
        self.assignee.as_deref().unwrap_or_default()
    }
}

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Filter descriptors
// ---------------------------------------------------------------------------

/// Ticket field a [`FilterClause`] tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Status,
    Priority,
    Type,
    Tag,
    Assignee,
    Created,
    Modified,
    Title,
    /// Unrecognized field name; clauses on it match everything.
    #[serde(other)]
    Other,
}

impl FilterField {
    pub const ALL: [Self; 8] = [
        Self::Status,
        Self::Priority,
        Self::Type,
        Self::Tag,
        Self::Assignee,
        Self::Created,
        Self::Modified,
        Self::Title,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Priority => "priority",
            Self::Type => "type",
            Self::Tag => "tag",
            Self::Assignee => "assignee",
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Title => "title",
            Self::Other => "other",
        }
    }

    /// Operators a filter builder may offer for this field.
    #[must_use]
    pub const fn valid_operators(self) -> &'static [FilterOperator] {
        use FilterOperator as Op;
        match self {
            Self::Status | Self::Priority | Self::Type | Self::Tag => &[Op::AnyOf, Op::NoneOf],
            Self::Assignee => &[Op::Is, Op::IsNot, Op::AnyOf, Op::NoneOf],
            Self::Title => &[Op::Contains],
            Self::Created | Self::Modified => &[
                Op::Before,
                Op::After,
                Op::Between,
                Op::LastNDays,
                Op::NewerThan,
                Op::OlderThan,
            ],
            Self::Other => &[],
        }
    }

    /// Returns `true` for timestamp fields.
    #[must_use]
    pub const fn is_date(self) -> bool {
        matches!(self, Self::Created | Self::Modified)
    }
}

/// Comparison applied by a [`FilterClause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    AnyOf,
    NoneOf,
    Is,
    IsNot,
    Contains,
    Before,
    After,
    Between,
    LastNDays,
    NewerThan,
    OlderThan,
    /// Unrecognized operator name; the clause matches everything.
    #[serde(other)]
    Other,
}

impl FilterOperator {
    pub const ALL: [Self; 11] = [
        Self::AnyOf,
        Self::NoneOf,
        Self::Is,
        Self::IsNot,
        Self::Contains,
        Self::Before,
        Self::After,
        Self::Between,
        Self::LastNDays,
        Self::NewerThan,
        Self::OlderThan,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AnyOf => "any_of",
            Self::NoneOf => "none_of",
            Self::Is => "is",
            Self::IsNot => "is_not",
            Self::Contains => "contains",
            Self::Before => "before",
            Self::After => "after",
            Self::Between => "between",
            Self::LastNDays => "last_n_days",
            Self::NewerThan => "newer_than",
            Self::OlderThan => "older_than",
            Self::Other => "other",
        }
    }
}

/// One element of a list-valued clause. Numbers are accepted so that
/// `"priority": [0, 1]` and `["0", "1"]` mean the same thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(f64),
}

impl Scalar {
    /// String form used for set membership comparisons.
    #[must_use]
    pub fn to_match_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// The value side of a [`FilterClause`].
///
/// The shape the operator expects is not enforced here; a mismatched shape
/// is detected at evaluation time and the clause then matches everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
    List(Vec<Scalar>),
    Other(serde_json::Value),
}

impl FilterValue {
    /// Build a list value from string slices.
    #[must_use]
    pub fn list(items: &[&str]) -> Self {
        Self::List(items.iter().map(|s| Scalar::Text((*s).to_string())).collect())
    }

    /// Build an inclusive date range value.
    #[must_use]
    pub fn range(from: &str, to: &str) -> Self {
        Self::list(&[from, to])
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// List elements as strings, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<Vec<String>> {
        match self {
            Self::List(items) => Some(items.iter().map(Scalar::to_match_string).collect()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view; numeric strings are accepted.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Two-element list view used by `between`.
    #[must_use]
    pub fn as_range(&self) -> Option<(String, String)> {
        match self {
            Self::List(items) if items.len() == 2 => {
                Some((items[0].to_match_string(), items[1].to_match_string()))
            }
            _ => None,
        }
    }
}

/// One predicate over a ticket field. A filter set is an ordered list of
/// clauses, all AND-combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    #[serde(default)]
    pub id: String,
    pub field: FilterField,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl FilterClause {
    /// Create a clause with a fresh id from `ids`.
    pub fn new(
        ids: &mut impl IdSource,
        field: FilterField,
        operator: FilterOperator,
        value: FilterValue,
    ) -> Self {
        Self {
            id: ids.next_id(),
            field,
            operator,
            value,
        }
    }
}

/// Relative date presets offered next to the date operators. Values are in
/// (possibly fractional) days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatePreset {
    pub label: &'static str,
    pub days: f64,
}

pub const DATE_PRESETS: [DatePreset; 6] = [
    DatePreset {
        label: "1 hour",
        days: 1.0 / 24.0,
    },
    DatePreset {
        label: "4 hours",
        days: 4.0 / 24.0,
    },
    DatePreset {
        label: "24 hours",
        days: 1.0,
    },
    DatePreset {
        label: "7 days",
        days: 7.0,
    },
    DatePreset {
        label: "30 days",
        days: 30.0,
    },
    DatePreset {
        label: "90 days",
        days: 90.0,
    },
];

// ---------------------------------------------------------------------------
// Sort and group descriptors
// ---------------------------------------------------------------------------

/// Key used for the final stable sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    Title,
    Status,
    Type,
    #[default]
    Priority,
    Assignee,
    Created,
    Modified,
    /// Unrecognized sort key; input order is kept.
    #[serde(other)]
    Other,
}

impl SortField {
    pub const ALL: [Self; 8] = [
        Self::Id,
        Self::Title,
        Self::Status,
        Self::Type,
        Self::Priority,
        Self::Assignee,
        Self::Created,
        Self::Modified,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Status => "status",
            Self::Type => "type",
            Self::Priority => "priority",
            Self::Assignee => "assignee",
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub const ALL: [Self; 2] = [Self::Asc, Self::Desc];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// How the grouping engine partitions a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    None,
    Status,
    Type,
    Epic,
    /// Unrecognized mode; behaves like `None`.
    #[serde(other)]
    Other,
}

impl GroupBy {
    pub const ALL: [Self; 4] = [Self::None, Self::Status, Self::Type, Self::Epic];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Status => "status",
            Self::Type => "type",
            Self::Epic => "epic",
            Self::Other => "other",
        }
    }
}

// ---------------------------------------------------------------------------
// Text conversions
// ---------------------------------------------------------------------------

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace('-', "_")
}

fn parse_from<T: Copy>(
    s: &str,
    all: &[T],
    as_str: impl Fn(T) -> &'static str,
    expected: &'static str,
) -> Result<T, ParseEnumError> {
    let normalized = normalize(s);
    all.iter()
        .copied()
        .find(|v| as_str(*v) == normalized)
        .ok_or_else(|| ParseEnumError {
            expected,
            got: s.to_string(),
        })
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_from(s, &Self::ALL, Self::as_str, "status")
    }
}

impl FromStr for FilterField {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_from(s, &Self::ALL, Self::as_str, "filter field")
    }
}

impl FromStr for FilterOperator {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_from(s, &Self::ALL, Self::as_str, "filter operator")
    }
}

impl FromStr for SortField {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_from(s, &Self::ALL, Self::as_str, "sort field")
    }
}

impl FromStr for SortDir {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_from(s, &Self::ALL, Self::as_str, "sort direction")
    }
}

impl FromStr for GroupBy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_from(s, &Self::ALL, Self::as_str, "group mode")
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
