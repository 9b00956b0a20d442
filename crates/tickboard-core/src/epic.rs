//! Nearest-epic lookup through the dependency/link graph.
//!
//! A ticket's parents are its `deps` followed by its `links`, restricted to
//! ids present in the collection the resolver was built from. The nearest
//! epic is the epic-typed ancestor reachable in the fewest hops; at equal
//! depth the one discovered first wins, which makes `deps` take priority
//! over `links`.
//!
//! # Cycle safety
//!
//! Each lookup keeps its own visited set and marks nodes when they are
//! enqueued, so no ticket is visited twice and cyclic graphs terminate with
//! "no epic" when none is reachable.
//!
//! # Memoization
//!
//! Results are cached per starting ticket id for the lifetime of one
//! [`EpicResolver`]. Build a new resolver for every grouping pass; the graph
//! may differ between passes.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use crate::model::Ticket;

/// Short-lived lookup context over one ticket collection.
#[derive(Debug)]
pub struct EpicResolver<'a> {
    by_id: HashMap<&'a str, &'a Ticket>,
    memo: HashMap<&'a str, Option<&'a str>>,
}

impl<'a> EpicResolver<'a> {
    /// Index `universe` by id. On duplicate ids the first ticket wins.
    pub fn new(universe: impl IntoIterator<Item = &'a Ticket>) -> Self {
        let mut by_id = HashMap::new();
        for ticket in universe {
            by_id.entry(ticket.id.as_str()).or_insert(ticket);
        }
        Self {
            by_id,
            memo: HashMap::new(),
        }
    }

    /// Look up a ticket of the collection by id.
    #[must_use]
    pub fn ticket(&self, id: &str) -> Option<&'a Ticket> {
        self.by_id.get(id).copied()
    }

    /// Parents of `ticket` that exist in the collection, `deps` first.
    pub fn parents<'s>(&'s self, ticket: &'a Ticket) -> impl Iterator<Item = &'a Ticket> + 's {
        ticket.parent_refs().filter_map(|id| self.ticket(id))
    }

    /// Nearest epic ancestor of `ticket`, memoized per ticket id.
    ///
    /// `ticket` itself is never its own answer, even when it is an epic.
    pub fn nearest_epic(&mut self, ticket: &'a Ticket) -> Option<&'a Ticket> {
        if let Some(&cached) = self.memo.get(ticket.id.as_str()) {
            return cached.and_then(|id| self.ticket(id));
        }
        let found = self.nearest_epic_with_depth(ticket).map(|(epic, _)| epic);
        self.memo
            .insert(ticket.id.as_str(), found.map(|e| e.id.as_str()));
        found
    }

    /// Breadth-first search for the nearest epic, returning it with its hop
    /// count. Not memoized.
    #[must_use]
    pub fn nearest_epic_with_depth(&self, ticket: &'a Ticket) -> Option<(&'a Ticket, usize)> {
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(ticket.id.as_str());

        let mut queue: VecDeque<(&'a Ticket, usize)> = VecDeque::new();
        for parent in self.parents(ticket) {
            if visited.insert(parent.id.as_str()) {
                queue.push_back((parent, 1));
            }
        }

        while let Some((current, depth)) = queue.pop_front() {
            if current.is_epic() {
                trace!(ticket = %ticket.id, epic = %current.id, depth, "resolved epic");
                return Some((current, depth));
            }
            for parent in self.parents(current) {
                if visited.insert(parent.id.as_str()) {
                    queue.push_back((parent, depth + 1));
                }
            }
        }
        None
    }

    /// Number of memoized lookups.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.memo.len()
    }
}
