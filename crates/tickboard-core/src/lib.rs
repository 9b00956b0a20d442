//! tickboard-core library.
//!
//! In-memory query, grouping, and selection engine for a ticket board.
//! Everything here operates on plain [`model::Ticket`] values handed in by
//! the host; nothing reads or writes tickets on its own.
//!
//! - [`filter`]: AND-combined clauses, free-text search, stable sort.
//! - [`group`] and [`epic`]: flat and epic-ancestor grouping, flattening for
//!   virtualized lists.
//! - [`selection`]: pointer/keyboard multi-select and drag-select.
//! - [`layout`]: node/edge assembly for the dependency graph view.
//! - [`view`] and [`config`]: saved board views and layered TOML defaults.
//! - [`refs`]: ticket-id references in free text.
//!
//! # Conventions
//!
//! - **Errors**: the engines degrade instead of failing; fallible edges
//!   (config, saved views, patterns) return [`error::Result`].
//! - **Logging**: `tracing` macros (`debug!`, `trace!`); the host installs
//!   the subscriber.

pub mod config;
pub mod epic;
pub mod error;
pub mod filter;
pub mod group;
pub mod ids;
pub mod layout;
pub mod model;
pub mod refs;
pub mod selection;
pub mod view;

pub use error::{Error, ErrorCode, Result};
pub use filter::{TicketQuery, apply_filters_and_sort};
pub use group::{FlatRow, TicketGroup, flatten_groups, group_tickets};
pub use model::{
    FilterClause, FilterField, FilterOperator, FilterValue, GroupBy, SortDir, SortField, Status,
    Ticket,
};
pub use selection::{SelectionHost, SelectionMachine};
