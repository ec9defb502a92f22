//! Hierarchical flow builder: one node per `(level, value)`, one link per
//! adjacent-level transition, percentages against the visible level total.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregation::AggregatedBucket;
use crate::color::ColorRegistry;
use crate::format;
use crate::graph::FlowGraph;

const ID_SEPARATOR: &str = "##";

/// Node id unique per level, so one value appearing at two levels never
/// folds into a loop.
pub fn node_id(level: usize, name: &str) -> String {
    format!("{name}{ID_SEPARATOR}{level}")
}

/// Inverse of [`node_id`].
pub fn parse_node_id(id: &str) -> Option<(usize, &str)> {
    let (name, level) = id.rsplit_once(ID_SEPARATOR)?;
    Some((level.parse().ok()?, name))
}

pub fn link_id(source: &str, target: &str) -> String {
    format!("{source}->{target}")
}

/// Drill-down selection on a flow diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowFilter {
    pub level: usize,
    pub value: String,
}

impl FlowFilter {
    pub fn from_node_id(id: &str) -> Option<Self> {
        let (level, value) = parse_node_id(id)?;
        Some(Self {
            level,
            value: value.to_string(),
        })
    }

    pub fn matches(&self, path: &[String]) -> bool {
        path.get(self.level).is_some_and(|v| *v == self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    pub level: usize,
    pub dimension: Option<String>,
    pub value: f64,
    pub color: String,
    /// Share of the node's level total, in percent.
    pub percentage: f64,
    /// Upstream node labels feeding this node.
    pub ancestry: Vec<String>,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowLink {
    pub id: String,
    pub source: String,
    pub target: String,
    pub value: f64,
    pub color: String,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowDiagram {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
    pub level_totals: Vec<f64>,
    pub filter: Option<FlowFilter>,
}

impl FlowDiagram {
    pub fn node(&self, label: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.label == label)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Build the diagram for one aggregated period.
///
/// `levels` names the hierarchy columns the bucket was grouped by. With a
/// filter only groups passing through the filtered node contribute, so the
/// result is a strict subset of the unfiltered diagram. Non-positive groups
/// carry no flow and are skipped.
pub fn build(
    bucket: &AggregatedBucket,
    levels: &[String],
    filter: Option<&FlowFilter>,
    registry: &mut ColorRegistry,
) -> FlowDiagram {
    let mut graph = FlowGraph::new();
    let mut values: HashMap<String, f64> = HashMap::new();
    let mut order: Vec<(usize, String)> = Vec::new();

    for group in bucket.groups() {
        if group.value <= 0.0 {
            continue;
        }
        if let Some(f) = filter {
            if !f.matches(&group.path) {
                continue;
            }
        }

        for (level, name) in group.path.iter().enumerate() {
            let id = node_id(level, name);
            graph.node(&id);
            let value = values.entry(id).or_insert_with(|| {
                order.push((level, name.clone()));
                0.0
            });
            *value += group.value;
        }
        for (level, pair) in group.path.windows(2).enumerate() {
            graph.add_flow(
                &node_id(level, &pair[0]),
                &node_id(level + 1, &pair[1]),
                group.value,
            );
        }
    }

    let depth = order.iter().map(|(l, _)| l + 1).max().unwrap_or(0);
    let mut level_totals = vec![0.0; depth];
    for (level, name) in &order {
        level_totals[*level] += values[&node_id(*level, name)];
    }

    let nodes: Vec<FlowNode> = order
        .iter()
        .map(|(level, name)| {
            let id = node_id(*level, name);
            let value = values[&id];
            let percentage = format::percentage(value, level_totals[*level]);
            let ancestry = graph
                .index_of(&id)
                .map(|idx| {
                    graph
                        .sources_of(idx)
                        .into_iter()
                        .filter_map(|s| parse_node_id(graph.id(s)).map(|(_, n)| n.to_string()))
                        .collect()
                })
                .unwrap_or_default();
            FlowNode {
                tooltip: format!(
                    "{name}\nTotal: {} ({percentage:.1}%)",
                    format::number(value)
                ),
                id,
                label: name.clone(),
                level: *level,
                dimension: levels.get(*level).cloned(),
                value,
                color: registry.color_for(name),
                percentage,
                ancestry,
            }
        })
        .collect();

    let links: Vec<FlowLink> = graph
        .edges()
        .map(|(src, dst, value)| {
            let source = graph.id(src).to_string();
            let target = graph.id(dst).to_string();
            let src_name = parse_node_id(&source).map(|(_, n)| n).unwrap_or(&source);
            let dst_name = parse_node_id(&target).map(|(_, n)| n).unwrap_or(&target);
            FlowLink {
                id: link_id(&source, &target),
                color: registry.color_for(src_name),
                tooltip: format!("{src_name} → {dst_name}\n{}", format::number(value)),
                source: source.clone(),
                target: target.clone(),
                value,
            }
        })
        .collect();

    debug!(
        nodes = nodes.len(),
        links = links.len(),
        filtered = filter.is_some(),
        "built flow diagram"
    );

    FlowDiagram {
        nodes,
        links,
        level_totals,
        filter: filter.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregate;
    use crate::parser::{Dataset, Row};
    use crate::period::{Granularity, PeriodKey, YearMonth};

    fn levels() -> Vec<String> {
        ["scheme", "tsp", "tech"].iter().map(|s| s.to_string()).collect()
    }

    fn row(month: u32, scheme: &str, tsp: &str, tech: &str, value: f64) -> Row {
        Row::new(YearMonth { year: 2024, month }, value)
            .with_field("scheme", scheme)
            .with_field("tsp", tsp)
            .with_field("tech", tech)
    }

    fn january() -> AggregatedBucket {
        let ds = Dataset::from_rows(vec![
            row(1, "Visa", "Worldline", "Credit", 1000.0),
            row(1, "CB", "Worldline", "Debit", 2000.0),
            row(1, "Mastercard", "Nets", "Credit", 500.0),
            row(2, "Visa", "Worldline", "Credit", 1100.0),
        ]);
        aggregate(&ds, &PeriodKey::new(2024, Granularity::Month, 1), &levels())
    }

    #[test]
    fn node_ids_round_trip() {
        assert_eq!(node_id(2, "Credit"), "Credit##2");
        assert_eq!(parse_node_id("Credit##2"), Some((2, "Credit")));
        assert_eq!(parse_node_id("a##b##1"), Some((1, "a##b")));
        assert_eq!(parse_node_id("plain"), None);
    }

    #[test]
    fn level_percentages() {
        let mut registry = ColorRegistry::new();
        let diagram = build(&january(), &levels(), None, &mut registry);

        let visa = diagram.node("Visa").unwrap();
        assert_eq!(visa.value, 1000.0);
        assert!((visa.percentage - 28.571).abs() < 0.01);
        assert_eq!(diagram.level_totals, vec![3500.0, 3500.0, 3500.0]);

        let worldline = diagram.node("Worldline").unwrap();
        assert_eq!(worldline.value, 3000.0);
        assert_eq!(worldline.ancestry, vec!["Visa", "CB"]);
        assert_eq!(diagram.links.len(), 6);
        assert!(visa.tooltip.contains("28.6%"));
    }

    #[test]
    fn links_are_weighted_by_transition() {
        let mut registry = ColorRegistry::new();
        let diagram = build(&january(), &levels(), None, &mut registry);
        let credit = diagram
            .links
            .iter()
            .filter(|l| l.target == "Credit##2")
            .map(|l| l.value)
            .sum::<f64>();
        assert_eq!(credit, 1500.0);
    }

    #[test]
    fn filter_keeps_a_strict_subset() {
        let mut registry = ColorRegistry::new();
        let full = build(&january(), &levels(), None, &mut registry);
        let filter = FlowFilter::from_node_id("Worldline##1").unwrap();
        let filtered = build(&january(), &levels(), Some(&filter), &mut registry);

        assert!(filtered.node("Mastercard").is_none());
        assert!(filtered.node("Nets").is_none());
        assert!(filtered.nodes.len() < full.nodes.len());
        for node in &filtered.nodes {
            assert!(full.nodes.iter().any(|n| n.id == node.id));
        }
        let visa = filtered.node("Visa").unwrap();
        assert!((visa.percentage - 100.0 / 3.0).abs() < 0.01);
    }

    #[test]
    fn colours_survive_filtering() {
        let mut registry = ColorRegistry::new();
        let full = build(&january(), &levels(), None, &mut registry);
        let filter = FlowFilter {
            level: 0,
            value: "CB".into(),
        };
        let filtered = build(&january(), &levels(), Some(&filter), &mut registry);
        assert_eq!(
            full.node("CB").unwrap().color,
            filtered.node("CB").unwrap().color
        );
    }

    #[test]
    fn unmatched_filter_builds_nothing() {
        let mut registry = ColorRegistry::new();
        let filter = FlowFilter {
            level: 0,
            value: "Amex".into(),
        };
        assert!(build(&january(), &levels(), Some(&filter), &mut registry).is_empty());
    }
}
