//! Pointer-driven multi-select and drag-select state machine.
//!
//! The machine turns low-level pointer and keyboard events into a selection
//! set and a context-menu target list without any rendering dependency. The
//! list it operates on, navigation, and status changes are provided by a
//! [`SelectionHost`].
//!
//! # Phases
//!
//! ```text
//! Idle --mousedown(plain)--> Pending --move >= threshold--> Dragging
//!  ^                            |                              |
//!  +----------mouseup-----------+-----------mouseup------------+
//! ```
//!
//! Events address rows by index into the host's current visible order, but
//! every commit stores ticket ids, so re-sorting the list between events
//! does not change which tickets are selected.
//!
//! Range gestures (shift-click, drag) always union the inclusive index range
//! with the selection that existed before the gesture began.

#![allow(clippy::module_name_repetitions)]

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::model::{Status, Ticket};

/// Manhattan distance in device pixels that turns a press into a drag.
pub const DEFAULT_DRAG_THRESHOLD: u32 = 4;

// ---------------------------------------------------------------------------
// Host capabilities
// ---------------------------------------------------------------------------

/// Capabilities the embedding view supplies to a [`SelectionMachine`].
pub trait SelectionHost {
    /// Number of rows in the current visible order.
    fn visible_len(&self) -> usize;

    /// Ticket at `index` in the current visible order.
    fn visible_at(&self, index: usize) -> Option<&Ticket>;

    /// Open the given ticket.
    fn navigate(&mut self, ticket: &Ticket);

    /// Move `ticket` to `next`.
    fn cycle_status(&mut self, ticket: &Ticket, next: Status);

    /// Called after every change to the selection or context targets.
    fn on_change(&mut self, snapshot: &SelectionSnapshot) {
        let _ = snapshot;
    }
}

/// A host over a borrowed ticket list that records every callback.
#[derive(Debug, Clone, Default)]
pub struct ListHost<'a> {
    pub visible: Vec<&'a Ticket>,
    /// Ids passed to `navigate`, in order.
    pub navigations: Vec<String>,
    /// `(id, next status)` pairs passed to `cycle_status`, in order.
    pub status_changes: Vec<(String, Status)>,
    /// Every snapshot delivered through `on_change`.
    pub snapshots: Vec<SelectionSnapshot>,
}

impl<'a> ListHost<'a> {
    #[must_use]
    pub fn new(visible: Vec<&'a Ticket>) -> Self {
        Self {
            visible,
            ..Self::default()
        }
    }
}

impl SelectionHost for ListHost<'_> {
    fn visible_len(&self) -> usize {
        self.visible.len()
    }

    fn visible_at(&self, index: usize) -> Option<&Ticket> {
        self.visible.get(index).copied()
    }

    fn navigate(&mut self, ticket: &Ticket) {
        self.navigations.push(ticket.id.clone());
    }

    fn cycle_status(&mut self, ticket: &Ticket, next: Status) {
        self.status_changes.push((ticket.id.clone(), next));
    }

    fn on_change(&mut self, snapshot: &SelectionSnapshot) {
        self.snapshots.push(snapshot.clone());
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Modifier keys held during a pointer event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub meta: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        meta: false,
        ctrl: false,
    };
    pub const SHIFT: Self = Self {
        shift: true,
        meta: false,
        ctrl: false,
    };
    pub const META: Self = Self {
        shift: false,
        meta: true,
        ctrl: false,
    };
    pub const CTRL: Self = Self {
        shift: false,
        meta: false,
        ctrl: true,
    };

    /// Meta or ctrl: toggle a single row.
    #[must_use]
    pub const fn toggles(self) -> bool {
        self.meta || self.ctrl
    }
}

/// Which affordance of a row the pointer hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitTarget {
    #[default]
    Row,
    Checkbox,
    StatusDot,
}

/// What the caller should do with the native event after handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventResponse {
    pub stop_propagation: bool,
    pub prevent_default: bool,
}

impl EventResponse {
    pub const NONE: Self = Self {
        stop_propagation: false,
        prevent_default: false,
    };
    pub const STOP: Self = Self {
        stop_propagation: true,
        prevent_default: false,
    };
    pub const PREVENT: Self = Self {
        stop_propagation: false,
        prevent_default: true,
    };
}

/// A recorded input event, replayable through [`SelectionMachine::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    MouseDown {
        index: usize,
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
        #[serde(default)]
        target: HitTarget,
        #[serde(default)]
        modifiers: Modifiers,
    },
    MouseMove {
        x: i32,
        y: i32,
        #[serde(default)]
        hovered: Option<usize>,
    },
    MouseUp,
    Click {
        index: usize,
        #[serde(default)]
        target: HitTarget,
        #[serde(default)]
        modifiers: Modifiers,
    },
    ContextMenu {
        index: usize,
    },
    Escape,
    SelectAll,
    Clear,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Drag phase of the machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum DragPhase {
    #[default]
    Idle,
    /// Pressed but not yet moved far enough; navigation intent undecided.
    Pending { index: usize, x: i32, y: i32 },
    /// Range-selecting; `current` is the last hovered index.
    Dragging { current: usize },
}

/// The observable state delivered to [`SelectionHost::on_change`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionSnapshot {
    pub selection: BTreeSet<String>,
    pub context_targets: Vec<Ticket>,
}

/// Selection state for one ticket list view.
///
/// Owned by exactly one view. Call [`SelectionMachine::clear`] when the
/// underlying ticket collection is replaced.
#[derive(Debug)]
pub struct SelectionMachine<H> {
    host: H,
    threshold: u32,
    selection: BTreeSet<String>,
    /// Selection as it stood before the current gesture.
    base: BTreeSet<String>,
    context_targets: Vec<Ticket>,
    anchor: Option<usize>,
    phase: DragPhase,
    /// Set once a drag starts; swallows the click that ends it.
    drag_occurred: bool,
}

impl<H: SelectionHost> SelectionMachine<H> {
    #[must_use]
    pub fn new(host: H) -> Self {
        Self::with_threshold(host, DEFAULT_DRAG_THRESHOLD)
    }

    #[must_use]
    pub fn with_threshold(host: H, threshold: u32) -> Self {
        Self {
            host,
            threshold,
            selection: BTreeSet::new(),
            base: BTreeSet::new(),
            context_targets: Vec::new(),
            anchor: None,
            phase: DragPhase::Idle,
            drag_occurred: false,
        }
    }

    // -- accessors ----------------------------------------------------------

    #[must_use]
    pub const fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    #[must_use]
    pub fn context_targets(&self) -> &[Ticket] {
        &self.context_targets
    }

    #[must_use]
    pub const fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    #[must_use]
    pub const fn phase(&self) -> DragPhase {
        self.phase
    }

    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging { .. })
    }

    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    #[must_use]
    pub fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            selection: self.selection.clone(),
            context_targets: self.context_targets.clone(),
        }
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    pub const fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub fn into_host(self) -> H {
        self.host
    }

    // -- events -------------------------------------------------------------

    /// Route a recorded event to its handler.
    pub fn dispatch(&mut self, event: PointerEvent) -> EventResponse {
        match event {
            PointerEvent::MouseDown {
                index,
                x,
                y,
                target,
                modifiers,
            } => self.mouse_down(index, x, y, target, modifiers),
            PointerEvent::MouseMove { x, y, hovered } => {
                self.mouse_move(x, y, hovered);
                EventResponse::NONE
            }
            PointerEvent::MouseUp => {
                self.mouse_up();
                EventResponse::NONE
            }
            PointerEvent::Click {
                index,
                target,
                modifiers,
            } => self.click(index, target, modifiers),
            PointerEvent::ContextMenu { index } => self.context_menu(index),
            PointerEvent::Escape => {
                if self.escape() {
                    EventResponse::PREVENT
                } else {
                    EventResponse::NONE
                }
            }
            PointerEvent::SelectAll => {
                self.select_all();
                EventResponse::PREVENT
            }
            PointerEvent::Clear => {
                self.clear();
                EventResponse::NONE
            }
        }
    }

    /// Pointer pressed on row `index` at `(x, y)`.
    pub fn mouse_down(
        &mut self,
        index: usize,
        x: i32,
        y: i32,
        target: HitTarget,
        modifiers: Modifiers,
    ) -> EventResponse {
        self.drag_occurred = false;

        match target {
            HitTarget::StatusDot => return EventResponse::STOP,
            HitTarget::Checkbox => {
                self.toggle(index);
                return EventResponse::STOP;
            }
            HitTarget::Row => {}
        }

        if modifiers.toggles() {
            self.toggle(index);
            return EventResponse::PREVENT;
        }

        if modifiers.shift
            && let Some(anchor) = self.anchor
        {
            let before = self.snapshot();
            let mut next = self.base.clone();
            next.extend(self.range_ids(anchor, index));
            self.selection = next;
            self.base = self.selection.clone();
            trace!(anchor, index, selected = self.selection.len(), "shift range");
            self.emit_if_changed(&before);
            return EventResponse::PREVENT;
        }

        self.phase = DragPhase::Pending { index, x, y };
        trace!(index, "pending press");
        EventResponse::NONE
    }

    /// Global pointer move. `hovered` is the row under the pointer, if any.
    pub fn mouse_move(&mut self, x: i32, y: i32, hovered: Option<usize>) {
        match self.phase {
            DragPhase::Idle => {}
            DragPhase::Pending {
                index,
                x: x0,
                y: y0,
            } => {
                let distance = (i64::from(x) - i64::from(x0)).unsigned_abs()
                    + (i64::from(y) - i64::from(y0)).unsigned_abs();
                if distance < u64::from(self.threshold) {
                    return;
                }
                let before = self.snapshot();
                self.phase = DragPhase::Dragging { current: index };
                self.anchor = Some(index);
                self.drag_occurred = true;
                self.base.clear();
                self.selection = self.id_at(index).into_iter().collect();
                trace!(index, distance, "drag started");
                self.emit_if_changed(&before);
            }
            DragPhase::Dragging { current } => {
                let Some(hovered) = hovered.filter(|h| *h != current) else {
                    return;
                };
                let before = self.snapshot();
                self.phase = DragPhase::Dragging { current: hovered };
                if let Some(anchor) = self.anchor {
                    let mut next = self.base.clone();
                    next.extend(self.range_ids(anchor, hovered));
                    self.selection = next;
                }
                self.emit_if_changed(&before);
            }
        }
    }

    /// Global pointer release.
    pub fn mouse_up(&mut self) {
        if self.is_dragging() {
            self.base = self.selection.clone();
            trace!(selected = self.selection.len(), "drag finished");
        }
        self.phase = DragPhase::Idle;
    }

    /// Click on row `index`, delivered after the press/release pair.
    pub fn click(
        &mut self,
        index: usize,
        target: HitTarget,
        modifiers: Modifiers,
    ) -> EventResponse {
        if target == HitTarget::StatusDot {
            if let Some(ticket) = self.host.visible_at(index).cloned() {
                let next = ticket.status.next_in_cycle();
                trace!(ticket = %ticket.id, from = %ticket.status, to = %next, "cycle status");
                self.host.cycle_status(&ticket, next);
            }
            return EventResponse::STOP;
        }

        if std::mem::take(&mut self.drag_occurred) {
            return EventResponse::NONE;
        }
        // The press already toggled or extended; an anchorless shift press
        // was recorded as a plain one, so its click counts as plain too.
        if target == HitTarget::Checkbox
            || modifiers.toggles()
            || (modifiers.shift && self.anchor.is_some())
        {
            return EventResponse::NONE;
        }

        let Some(ticket) = self.host.visible_at(index).cloned() else {
            return EventResponse::NONE;
        };
        if self.selection.is_empty() {
            self.host.navigate(&ticket);
        } else {
            let before = self.snapshot();
            self.deselect_all();
            self.emit_if_changed(&before);
        }
        EventResponse::NONE
    }

    /// Secondary click on row `index`.
    ///
    /// On a selected row the context targets become every selected ticket in
    /// visible order; otherwise the selection collapses to that row.
    pub fn context_menu(&mut self, index: usize) -> EventResponse {
        let Some(ticket) = self.host.visible_at(index).cloned() else {
            return EventResponse::PREVENT;
        };
        let before = self.snapshot();
        if self.selection.contains(&ticket.id) {
            self.context_targets = (0..self.host.visible_len())
                .filter_map(|i| self.host.visible_at(i))
                .filter(|t| self.selection.contains(&t.id))
                .cloned()
                .collect();
        } else {
            self.selection = BTreeSet::from([ticket.id.clone()]);
            self.base = self.selection.clone();
            self.anchor = Some(index);
            self.context_targets = vec![ticket];
        }
        self.emit_if_changed(&before);
        EventResponse::PREVENT
    }

    /// Clear the selection. Returns `false` (and does nothing) when the
    /// selection is already empty.
    pub fn escape(&mut self) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        let before = self.snapshot();
        self.deselect_all();
        self.emit_if_changed(&before);
        true
    }

    /// Select every ticket in the current visible order.
    pub fn select_all(&mut self) {
        let before = self.snapshot();
        self.selection = (0..self.host.visible_len())
            .filter_map(|i| self.host.visible_at(i))
            .map(|t| t.id.clone())
            .collect();
        self.base = self.selection.clone();
        self.emit_if_changed(&before);
    }

    /// Reset everything; call when the ticket collection is replaced.
    pub fn clear(&mut self) {
        let before = self.snapshot();
        self.selection.clear();
        self.base.clear();
        self.context_targets.clear();
        self.anchor = None;
        self.phase = DragPhase::Idle;
        self.drag_occurred = false;
        self.emit_if_changed(&before);
    }

    /// Forget the context-menu targets (menu closed).
    pub fn clear_context_targets(&mut self) {
        let before = self.snapshot();
        self.context_targets.clear();
        self.emit_if_changed(&before);
    }

    /// Drop selected ids that are no longer in the visible order.
    pub fn retain_visible(&mut self) {
        let visible: BTreeSet<String> = (0..self.host.visible_len())
            .filter_map(|i| self.host.visible_at(i))
            .map(|t| t.id.clone())
            .collect();
        let before = self.snapshot();
        self.selection.retain(|id| visible.contains(id));
        self.base.retain(|id| visible.contains(id));
        self.emit_if_changed(&before);
    }

    // -- helpers ------------------------------------------------------------

    fn id_at(&self, index: usize) -> Option<String> {
        self.host.visible_at(index).map(|t| t.id.clone())
    }

    /// Targets only ever name selected tickets, so they go with the selection.
    fn deselect_all(&mut self) {
        self.selection.clear();
        self.base.clear();
        self.context_targets.clear();
        self.anchor = None;
    }

    /// Ids in the inclusive index range between `a` and `b`; indices past
    /// the end of the visible order are skipped.
    fn range_ids(&self, a: usize, b: usize) -> Vec<String> {
        (a.min(b)..=a.max(b)).map_while(|i| self.id_at(i)).collect()
    }

    fn toggle(&mut self, index: usize) {
        let Some(id) = self.id_at(index) else {
            trace!(index, "toggle on missing row ignored");
            return;
        };
        let before = self.snapshot();
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
        self.anchor = Some(index);
        self.base = self.selection.clone();
        self.emit_if_changed(&before);
    }

    fn emit_if_changed(&mut self, before: &SelectionSnapshot) {
        self.context_targets.retain(|t| self.selection.contains(&t.id));
        if before.selection == self.selection && before.context_targets == self.context_targets {
            return;
        }
        let snapshot = self.snapshot();
        self.host.on_change(&snapshot);
    }
}
