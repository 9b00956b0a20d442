//! Graph-layout boundary for the dependency view.
//!
//! # Overview
//!
//! [`build_layout_input`] turns tickets into a node/edge list; any
//! [`GraphLayout`] implementation turns that into positions and edge
//! polylines. The board treats the layout engine as a pure black box.
//!
//! [`LayeredLayout`] is the bundled engine: strongly connected components are
//! condensed so dependency cycles share a layer, then every component is
//! placed one layer below its deepest blocker (longest-path layering over a
//! topological order). Link edges are drawn but do not affect layering.

#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]

use std::collections::{HashMap, HashSet};

use petgraph::{
    Direction,
    algo::{condensation, toposort},
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::model::Ticket;

// ---------------------------------------------------------------------------
// Boundary types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Blocker to blocked ticket.
    Dep,
    /// Undirected association.
    Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutInput {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

/// Top-left corner of a placed node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedNode {
    pub id: String,
    #[serde(flatten)]
    pub position: NodePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    pub points: Vec<NodePosition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutOutput {
    pub nodes: Vec<PlacedNode>,
    pub edges: Vec<RoutedEdge>,
}

impl LayoutOutput {
    #[must_use]
    pub fn position(&self, id: &str) -> Option<NodePosition> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.position)
    }
}

/// A layout engine: nodes and edges in, positions and polylines out.
pub trait GraphLayout {
    fn layout(&self, input: &LayoutInput) -> LayoutOutput;
}

// ---------------------------------------------------------------------------
// Input assembly
// ---------------------------------------------------------------------------

/// Fallback node size: width grows with the title, clamped to a card range.
#[must_use]
pub fn default_node_size(ticket: &Ticket) -> (f64, f64) {
    let chars = ticket.title.chars().count().max(ticket.id.len()) as f64;
    ((chars * 7.0 + 32.0).clamp(120.0, 280.0), 48.0)
}

/// Nodes and edges for `tickets`.
///
/// Edges are emitted only when both endpoints are in `tickets`. Each dep
/// becomes a `Dep` edge from the blocker to the dependent ticket, once per
/// pair. A link listed on both ends is emitted once, in the orientation it
/// was first seen. Self references are dropped.
#[must_use]
#[instrument(skip_all, fields(tickets = tickets.len()))]
pub fn build_layout_input(
    tickets: &[Ticket],
    size_fn: impl Fn(&Ticket) -> (f64, f64),
) -> LayoutInput {
    let mut present: HashSet<&str> = HashSet::with_capacity(tickets.len());
    let mut nodes = Vec::with_capacity(tickets.len());
    for ticket in tickets {
        if !present.insert(ticket.id.as_str()) {
            continue;
        }
        let (width, height) = size_fn(ticket);
        nodes.push(LayoutNode {
            id: ticket.id.clone(),
            width,
            height,
        });
    }

    let mut edges = Vec::new();
    let mut seen_deps: HashSet<(&str, &str)> = HashSet::new();
    let mut seen_links: HashSet<(&str, &str)> = HashSet::new();
    for ticket in tickets {
        let id = ticket.id.as_str();
        for dep in &ticket.deps {
            let dep = dep.as_str();
            if dep == id || !present.contains(dep) || !seen_deps.insert((dep, id)) {
                continue;
            }
            edges.push(LayoutEdge {
                from: dep.to_string(),
                to: id.to_string(),
                kind: EdgeKind::Dep,
            });
        }
        for link in &ticket.links {
            let link = link.as_str();
            if link == id || !present.contains(link) {
                continue;
            }
            let pair = if id < link { (id, link) } else { (link, id) };
            if !seen_links.insert(pair) {
                continue;
            }
            edges.push(LayoutEdge {
                from: id.to_string(),
                to: link.to_string(),
                kind: EdgeKind::Link,
            });
        }
    }

    debug!(nodes = nodes.len(), edges = edges.len(), "layout input built");
    LayoutInput { nodes, edges }
}

// ---------------------------------------------------------------------------
// LayeredLayout
// ---------------------------------------------------------------------------

/// Top-down layered placement over the condensed dependency DAG.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayeredLayout {
    /// Horizontal space between nodes in one layer.
    pub node_gap: f64,
    /// Vertical space between layers.
    pub layer_gap: f64,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self {
            node_gap: 40.0,
            layer_gap: 80.0,
        }
    }
}

impl LayeredLayout {
    /// Layer index per input node, parallel to `input.nodes`.
    #[must_use]
    pub fn layers(input: &LayoutInput) -> Vec<usize> {
        let mut graph: DiGraph<usize, ()> =
            DiGraph::with_capacity(input.nodes.len(), input.edges.len());
        let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(input.nodes.len());
        // Input position of the first node carrying each node's id.
        let mut first_of: Vec<usize> = Vec::with_capacity(input.nodes.len());
        for (i, node) in input.nodes.iter().enumerate() {
            let v = *index
                .entry(node.id.as_str())
                .or_insert_with(|| graph.add_node(i));
            first_of.push(graph[v]);
        }
        for edge in input.edges.iter().filter(|e| e.kind == EdgeKind::Dep) {
            if let (Some(&a), Some(&b)) =
                (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
            {
                graph.add_edge(a, b, ());
            }
        }

        let condensed: DiGraph<Vec<usize>, ()> = condensation(graph, true);
        let topo: Vec<NodeIndex> =
            toposort(&condensed, None).unwrap_or_else(|_| condensed.node_indices().collect());

        let mut component_layer: HashMap<NodeIndex, usize> = HashMap::with_capacity(topo.len());
        for &v in &topo {
            let layer = condensed
                .edges_directed(v, Direction::Incoming)
                .filter_map(|e| component_layer.get(&e.source()).map(|l| l + 1))
                .max()
                .unwrap_or(0);
            component_layer.insert(v, layer);
        }

        let mut layers = vec![0; input.nodes.len()];
        for v in condensed.node_indices() {
            let layer = component_layer.get(&v).copied().unwrap_or(0);
            for &member in &condensed[v] {
                layers[member] = layer;
            }
        }
        for (i, &first) in first_of.iter().enumerate() {
            layers[i] = layers[first];
        }
        layers
    }
}

impl GraphLayout for LayeredLayout {
    #[instrument(skip_all, fields(nodes = input.nodes.len(), edges = input.edges.len()))]
    fn layout(&self, input: &LayoutInput) -> LayoutOutput {
        let layers = Self::layers(input);
        let depth = layers.iter().copied().max().map_or(0, |m| m + 1);

        let mut layer_height = vec![0.0_f64; depth];
        for (node, &layer) in input.nodes.iter().zip(&layers) {
            layer_height[layer] = layer_height[layer].max(node.height);
        }
        let mut layer_top = Vec::with_capacity(depth);
        let mut y = 0.0;
        for height in &layer_height {
            layer_top.push(y);
            y += height + self.layer_gap;
        }

        let mut cursor = vec![0.0_f64; depth];
        let mut placed: HashMap<&str, (NodePosition, &LayoutNode)> = HashMap::new();
        let mut nodes = Vec::with_capacity(input.nodes.len());
        for (node, &layer) in input.nodes.iter().zip(&layers) {
            let position = NodePosition {
                x: cursor[layer],
                y: layer_top[layer],
            };
            cursor[layer] += node.width + self.node_gap;
            placed.entry(node.id.as_str()).or_insert((position, node));
            nodes.push(PlacedNode {
                id: node.id.clone(),
                position,
            });
        }

        let edges = input
            .edges
            .iter()
            .filter_map(|edge| {
                let (from, from_node) = placed.get(edge.from.as_str())?;
                let (to, to_node) = placed.get(edge.to.as_str())?;
                Some(RoutedEdge {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    kind: edge.kind,
                    points: vec![center(*from, from_node), center(*to, to_node)],
                })
            })
            .collect();

        LayoutOutput { nodes, edges }
    }
}

fn center(position: NodePosition, node: &LayoutNode) -> NodePosition {
    NodePosition {
        x: position.x + node.width / 2.0,
        y: position.y + node.height / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(_: &Ticket) -> (f64, f64) {
        (100.0, 40.0)
    }

    fn edge_list(input: &LayoutInput) -> Vec<(String, String, EdgeKind)> {
        input
            .edges
            .iter()
            .map(|e| (e.from.clone(), e.to.clone(), e.kind))
            .collect()
    }

    #[test]
    fn edges_need_both_endpoints() {
        let tickets = vec![
            Ticket::new("a"),
            Ticket::new("b").with_deps(&["a", "ghost"]).with_links(&["ghost"]),
        ];
        let input = build_layout_input(&tickets, unit);
        assert_eq!(input.nodes.len(), 2);
        assert_eq!(
            edge_list(&input),
            vec![("a".to_string(), "b".to_string(), EdgeKind::Dep)]
        );
    }

    #[test]
    fn duplicate_deps_and_mirrored_links_collapse() {
        let tickets = vec![
            Ticket::new("a").with_links(&["b"]),
            Ticket::new("b").with_deps(&["a", "a"]).with_links(&["a"]),
        ];
        let input = build_layout_input(&tickets, unit);
        assert_eq!(
            edge_list(&input),
            vec![
                ("a".to_string(), "b".to_string(), EdgeKind::Link),
                ("a".to_string(), "b".to_string(), EdgeKind::Dep),
            ]
        );
    }

    #[test]
    fn self_references_are_dropped() {
        let tickets = vec![Ticket::new("a").with_deps(&["a"]).with_links(&["a"])];
        assert!(build_layout_input(&tickets, unit).edges.is_empty());
    }

    #[test]
    fn size_fn_is_applied() {
        let tickets = vec![Ticket::new("a").with_title("Short")];
        let input = build_layout_input(&tickets, default_node_size);
        assert!((input.nodes[0].width - 120.0).abs() < f64::EPSILON);
        assert!((input.nodes[0].height - 48.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dependents_sit_below_blockers() {
        let tickets = vec![
            Ticket::new("c").with_deps(&["b"]),
            Ticket::new("b").with_deps(&["a"]),
            Ticket::new("a"),
            Ticket::new("d").with_deps(&["a"]),
        ];
        let input = build_layout_input(&tickets, unit);
        let layers = LayeredLayout::layers(&input);
        assert_eq!(layers, vec![2, 1, 0, 1]);
    }

    #[test]
    fn cycles_share_a_layer_and_terminate() {
        let tickets = vec![
            Ticket::new("root"),
            Ticket::new("x").with_deps(&["root", "y"]),
            Ticket::new("y").with_deps(&["x"]),
            Ticket::new("z").with_deps(&["y"]),
        ];
        let input = build_layout_input(&tickets, unit);
        let layers = LayeredLayout::layers(&input);
        assert_eq!(layers, vec![0, 1, 1, 2]);
    }

    #[test]
    fn links_do_not_change_layers() {
        let tickets = vec![Ticket::new("a").with_links(&["b"]), Ticket::new("b")];
        let input = build_layout_input(&tickets, unit);
        assert_eq!(LayeredLayout::layers(&input), vec![0, 0]);
    }

    #[test]
    fn layout_places_rows_and_routes_edges() {
        let tickets = vec![
            Ticket::new("a"),
            Ticket::new("b"),
            Ticket::new("c").with_deps(&["a"]),
        ];
        let input = build_layout_input(&tickets, unit);
        let out = LayeredLayout::default().layout(&input);

        assert_eq!(out.position("a"), Some(NodePosition { x: 0.0, y: 0.0 }));
        assert_eq!(out.position("b"), Some(NodePosition { x: 140.0, y: 0.0 }));
        assert_eq!(out.position("c"), Some(NodePosition { x: 0.0, y: 120.0 }));

        assert_eq!(out.edges.len(), 1);
        assert_eq!(
            out.edges[0].points,
            vec![NodePosition { x: 50.0, y: 20.0 }, NodePosition { x: 50.0, y: 140.0 }]
        );
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let out = LayeredLayout::default().layout(&LayoutInput::default());
        assert!(out.nodes.is_empty());
        assert!(out.edges.is_empty());
    }
}
