//! Radial hierarchy builder: nested rings with a zoomable focus.
//!
//! The tree is partitioned once over the full circle (angle) and one unit per
//! ring (radius). Zooming does not rebuild the tree; it rescales every arc
//! against the focused node so the focus subtree fills the view.

use std::collections::HashMap;
use std::f64::consts::TAU;

use serde::Serialize;
use tracing::debug;

use crate::aggregation::AggregatedBucket;
use crate::color::ColorRegistry;
use crate::format;
use crate::schema::radial;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaScale {
    Linear,
    Log,
}

impl AreaScale {
    fn weight(self, value: f64) -> f64 {
        let value = value.max(0.0);
        match self {
            AreaScale::Linear => value,
            AreaScale::Log if value > 0.0 => (value + 1.0).ln(),
            AreaScale::Log => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadialArc {
    pub id: String,
    pub label: String,
    /// Names from the first ring down to this arc.
    pub path: Vec<String>,
    /// Ring relative to the focus (1 = first ring around the centre).
    pub depth: usize,
    pub value: f64,
    /// Share of the grand total, in percent.
    pub percentage: f64,
    pub color: String,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub visible: bool,
    pub has_children: bool,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadialChart {
    pub focus: Vec<String>,
    /// `Total`, then every focus ancestor down to the focus itself.
    pub breadcrumb: Vec<String>,
    pub breadcrumb_label: String,
    pub total: f64,
    pub focus_value: f64,
    pub scale: AreaScale,
    pub arcs: Vec<RadialArc>,
}

impl RadialChart {
    pub fn arc(&self, path: &[&str]) -> Option<&RadialArc> {
        self.arcs
            .iter()
            .find(|a| a.path.iter().map(String::as_str).eq(path.iter().copied()))
    }
}

/// Focus reached by clicking breadcrumb segment `index` (0 = `Total`).
pub fn breadcrumb_target(focus: &[String], index: usize) -> Vec<String> {
    focus[..index.min(focus.len())].to_vec()
}

/// Focus reached by clicking the centre: the parent of the current focus.
pub fn parent_focus(focus: &[String]) -> Vec<String> {
    focus[..focus.len().saturating_sub(1)].to_vec()
}

struct Node {
    name: String,
    path: Vec<String>,
    own: f64,
    value: f64,
    weight: f64,
    children: Vec<usize>,
    x0: f64,
    x1: f64,
}

struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_bucket(bucket: &AggregatedBucket, scale: AreaScale) -> Self {
        let mut tree = Tree {
            nodes: vec![Node {
                name: radial::ROOT_LABEL.to_string(),
                path: Vec::new(),
                own: 0.0,
                value: 0.0,
                weight: 0.0,
                children: Vec::new(),
                x0: 0.0,
                x1: TAU,
            }],
        };
        let mut index: HashMap<Vec<String>, usize> = HashMap::new();

        for group in bucket.groups() {
            let mut current = 0;
            for depth in 0..group.path.len() {
                let path = group.path[..=depth].to_vec();
                current = match index.get(&path) {
                    Some(&idx) => idx,
                    None => {
                        let idx = tree.nodes.len();
                        tree.nodes.push(Node {
                            name: group.path[depth].clone(),
                            path: path.clone(),
                            own: 0.0,
                            value: 0.0,
                            weight: 0.0,
                            children: Vec::new(),
                            x0: 0.0,
                            x1: 0.0,
                        });
                        tree.nodes[current].children.push(idx);
                        index.insert(path, idx);
                        idx
                    }
                };
            }
            tree.nodes[current].own += group.value;
        }

        tree.sum(0, scale);
        tree.partition(0);
        tree
    }

    /// Post-order totals: real value for tooltips, scaled weight for layout.
    /// Children are then ordered by descending weight.
    fn sum(&mut self, idx: usize, scale: AreaScale) {
        let children = self.nodes[idx].children.clone();
        let mut value = self.nodes[idx].own;
        let mut weight = scale.weight(self.nodes[idx].own);
        for &child in &children {
            self.sum(child, scale);
            value += self.nodes[child].value;
            weight += self.nodes[child].weight;
        }
        let mut ordered = children;
        ordered.sort_by(|a, b| self.nodes[*b].weight.total_cmp(&self.nodes[*a].weight));
        let node = &mut self.nodes[idx];
        node.value = value;
        node.weight = weight;
        node.children = ordered;
    }

    fn partition(&mut self, idx: usize) {
        let (x0, x1, weight) = {
            let n = &self.nodes[idx];
            (n.x0, n.x1, n.weight)
        };
        let span = x1 - x0;
        let mut cursor = x0;
        for child in self.nodes[idx].children.clone() {
            let share = if weight > 0.0 {
                self.nodes[child].weight / weight
            } else {
                0.0
            };
            self.nodes[child].x0 = cursor;
            cursor += span * share;
            self.nodes[child].x1 = cursor;
            self.partition(child);
        }
    }

    fn find(&self, focus: &[String]) -> Option<usize> {
        let mut current = 0;
        for name in focus {
            current = *self.nodes[current]
                .children
                .iter()
                .find(|&&c| self.nodes[c].name == *name)?;
        }
        Some(current)
    }

    fn preorder(&self, idx: usize, out: &mut Vec<usize>) {
        out.push(idx);
        for &child in &self.nodes[idx].children {
            self.preorder(child, out);
        }
    }
}

/// Build the radial view of one bucket zoomed on `focus`.
///
/// Returns `None` when `focus` names a node this bucket does not contain.
pub fn build(
    bucket: &AggregatedBucket,
    focus: &[String],
    scale: AreaScale,
    registry: &mut ColorRegistry,
) -> Option<RadialChart> {
    let tree = Tree::from_bucket(bucket, scale);
    let total = tree.nodes[0].value;

    let mut order = Vec::with_capacity(tree.nodes.len());
    tree.preorder(0, &mut order);
    for &idx in &order[1..] {
        registry.color_for(&tree.nodes[idx].name);
    }

    let focus_idx = tree.find(focus)?;
    let f = &tree.nodes[focus_idx];
    let focus_depth = focus.len();
    let width = f.x1 - f.x0;
    let rescale = |x: f64| {
        if width > 0.0 {
            ((x - f.x0) / width).clamp(0.0, 1.0) * TAU
        } else {
            0.0
        }
    };

    let mut subtree = Vec::new();
    tree.preorder(focus_idx, &mut subtree);

    let arcs = subtree[1..]
        .iter()
        .map(|&idx| {
            let node = &tree.nodes[idx];
            let depth = node.path.len() - focus_depth;
            let (x0, x1) = (rescale(node.x0), rescale(node.x1));
            let (y0, y1) = (depth as f64, depth as f64 + 1.0);
            let percentage = format::percentage(node.value, total);
            RadialArc {
                id: node.path.join(radial::TOOLTIP_SEPARATOR),
                label: node.name.clone(),
                path: node.path.clone(),
                depth,
                value: node.value,
                percentage,
                color: registry.color_for(&node.name),
                x0,
                x1,
                y0,
                y1,
                visible: y0 >= 1.0 && y1 <= 1.0 + radial::VISIBLE_RINGS && x1 > x0,
                has_children: !node.children.is_empty(),
                tooltip: tooltip(&node.path, node.value, total, scale),
            }
        })
        .collect::<Vec<_>>();

    let mut breadcrumb = vec![radial::ROOT_LABEL.to_string()];
    breadcrumb.extend(focus.iter().cloned());

    debug!(arcs = arcs.len(), depth = focus_depth, "built radial chart");

    Some(RadialChart {
        focus: focus.to_vec(),
        breadcrumb_label: breadcrumb.join(radial::BREADCRUMB_SEPARATOR),
        breadcrumb,
        total,
        focus_value: f.value,
        scale,
        arcs,
    })
}

fn tooltip(path: &[String], value: f64, total: f64, scale: AreaScale) -> String {
    let ratio = if total > 0.0 {
        match scale {
            AreaScale::Log => format!("{:.1}‰", value / total * 1000.0),
            AreaScale::Linear => format!("{:.1}%", value / total * 100.0),
        }
    } else {
        "0%".to_string()
    };
    format!(
        "{} {} ({ratio})",
        path.join(radial::TOOLTIP_SEPARATOR),
        format::number(value)
    )
}
