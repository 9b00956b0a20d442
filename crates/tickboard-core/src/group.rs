//! Partitioning of an already filtered and sorted ticket list into named
//! groups, and flattening of groups into display rows.
//!
//! Ordering within a group always equals input order; nothing here
//! re-sorts tickets.
//!
//! - **Flat** (`status` / `type`): one bucket per distinct field value.
//!   Known values follow the canonical board order; unknown values follow
//!   in first-seen order.
//! - **Epic**: every non-epic ticket joins the group of its nearest epic
//!   ancestor (see [`crate::epic`]). Epics in the input always head a group,
//!   even an empty one. Tickets with no reachable epic land in the
//!   [`UNGROUPED_KEY`] group, emitted last.

#![allow(clippy::module_name_repetitions)]

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, instrument};

use crate::epic::EpicResolver;
use crate::model::{GroupBy, KNOWN_TYPES, Status, Ticket};

/// Key of the synthetic group for tickets without a group.
pub const UNGROUPED_KEY: &str = "__ungrouped__";

/// Label of the synthetic group for tickets without a group.
pub const UNGROUPED_LABEL: &str = "Ungrouped";

/// A named bucket of tickets, optionally headed by an epic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketGroup<'a> {
    pub key: String,
    pub label: String,
    /// The heading epic, when it is part of the grouped input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epic: Option<&'a Ticket>,
    pub tickets: Vec<&'a Ticket>,
}

impl<'a> TicketGroup<'a> {
    fn new(key: impl Into<String>, label: impl Into<String>, epic: Option<&'a Ticket>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            epic,
            tickets: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

/// Group `tickets` using the list itself as the dependency graph.
#[must_use]
pub fn group_tickets<'a>(tickets: &[&'a Ticket], group_by: GroupBy) -> Vec<TicketGroup<'a>> {
    group_tickets_within(tickets, tickets.iter().copied(), group_by)
}

/// Group `tickets`, walking epic ancestry through `universe`.
///
/// `universe` is usually the unfiltered collection `tickets` was selected
/// from. An epic reached through it that is absent from `tickets` still gets
/// a group (after the input epics), with no `epic` attached and the
/// universe's title as label.
#[must_use]
#[instrument(skip_all, fields(tickets = tickets.len(), group_by = %group_by))]
pub fn group_tickets_within<'a>(
    tickets: &[&'a Ticket],
    universe: impl IntoIterator<Item = &'a Ticket>,
    group_by: GroupBy,
) -> Vec<TicketGroup<'a>> {
    match group_by {
        GroupBy::Status => group_flat(
            tickets,
            |t| t.status.as_str().to_string(),
            &status_order(),
            status_label,
        ),
        GroupBy::Type => group_flat(tickets, |t| t.ticket_type.clone(), &KNOWN_TYPES, capitalize),
        GroupBy::Epic => group_by_epic(tickets, EpicResolver::new(universe)),
        GroupBy::None | GroupBy::Other => {
            if group_by == GroupBy::Other {
                debug!("unknown group mode; returning a single bucket");
            }
            let mut all = TicketGroup::new(UNGROUPED_KEY, UNGROUPED_LABEL, None);
            all.tickets.extend_from_slice(tickets);
            vec![all]
        }
    }
}

fn status_order() -> [&'static str; 4] {
    Status::ALL.map(Status::as_str)
}

fn status_label(key: &str) -> String {
    key.parse::<Status>()
        .map_or_else(|_| capitalize(key), |s| s.label().to_string())
}

/// Uppercase the first character, leave the rest as-is.
#[must_use]
pub fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn group_flat<'a>(
    tickets: &[&'a Ticket],
    key_of: impl Fn(&Ticket) -> String,
    order: &[&str],
    label_of: impl Fn(&str) -> String,
) -> Vec<TicketGroup<'a>> {
    let mut groups: Vec<TicketGroup<'a>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for &ticket in tickets {
        let key = key_of(ticket);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(TicketGroup::new(key.clone(), label_of(&key), None));
            groups.len() - 1
        });
        groups[slot].tickets.push(ticket);
    }

    // Stable: unknown keys share the last rank and keep first-seen order.
    groups.sort_by_key(|g| {
        order
            .iter()
            .position(|k| *k == g.key)
            .unwrap_or(order.len())
    });
    groups
}

fn epic_label(epic: &Ticket) -> String {
    if epic.title.trim().is_empty() {
        epic.id.clone()
    } else {
        epic.title.clone()
    }
}

fn group_by_epic<'a>(
    tickets: &[&'a Ticket],
    mut resolver: EpicResolver<'a>,
) -> Vec<TicketGroup<'a>> {
    let mut groups: Vec<TicketGroup<'a>> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for &ticket in tickets.iter().filter(|t| t.is_epic()) {
        if !index.contains_key(ticket.id.as_str()) {
            index.insert(ticket.id.as_str(), groups.len());
            groups.push(TicketGroup::new(&ticket.id, epic_label(ticket), Some(ticket)));
        }
    }
    let input_epics = groups.len();

    let mut ungrouped = TicketGroup::new(UNGROUPED_KEY, UNGROUPED_LABEL, None);
    for &ticket in tickets.iter().filter(|t| !t.is_epic()) {
        let Some(epic) = resolver.nearest_epic(ticket) else {
            ungrouped.tickets.push(ticket);
            continue;
        };
        let slot = *index.entry(epic.id.as_str()).or_insert_with(|| {
            groups.push(TicketGroup::new(&epic.id, epic_label(epic), None));
            groups.len() - 1
        });
        groups[slot].tickets.push(ticket);
    }

    debug!(
        epics = input_epics,
        external = groups.len() - input_epics,
        ungrouped = ungrouped.len(),
        "grouped by epic"
    );

    if !ungrouped.is_empty() {
        groups.push(ungrouped);
    }
    groups
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// One display row of a grouped list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum FlatRow<'a> {
    Header {
        key: String,
        label: String,
        count: usize,
        collapsed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        epic: Option<&'a Ticket>,
    },
    Ticket {
        group_key: String,
        ticket: &'a Ticket,
    },
}

impl<'a> FlatRow<'a> {
    /// The ticket on a ticket row.
    #[must_use]
    pub const fn ticket(&self) -> Option<&'a Ticket> {
        match self {
            Self::Ticket { ticket, .. } => Some(*ticket),
            Self::Header { .. } => None,
        }
    }
}

/// Emit a header row per group followed by its tickets, omitting the
/// tickets of groups whose key is in `collapsed`.
#[must_use]
#[instrument(skip_all, fields(groups = groups.len(), collapsed = collapsed.len()))]
pub fn flatten_groups<'a>(
    groups: &[TicketGroup<'a>],
    collapsed: &HashSet<String>,
) -> Vec<FlatRow<'a>> {
    let mut rows = Vec::with_capacity(groups.iter().map(|g| g.len() + 1).sum());
    for group in groups {
        let is_collapsed = collapsed.contains(&group.key);
        rows.push(FlatRow::Header {
            key: group.key.clone(),
            label: group.label.clone(),
            count: group.len(),
            collapsed: is_collapsed,
            epic: group.epic,
        });
        if !is_collapsed {
            rows.extend(group.tickets.iter().map(|&ticket| FlatRow::Ticket {
                group_key: group.key.clone(),
                ticket,
            }));
        }
    }
    rows
}
