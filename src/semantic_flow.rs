//! Semantic flow builder: explicit `source → target` pairs coloured by a
//! fixed taxonomy keyed on each row's type tag.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::aggregation::AggregatedBucket;
use crate::color::taxonomy_style;
use crate::flow::{link_id, FlowLink};
use crate::format;
use crate::graph::FlowGraph;
use crate::schema::taxonomy;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticNode {
    pub id: String,
    pub label: String,
    /// Taxonomy tag of the rows flowing into this node.
    pub kind: String,
    pub level: usize,
    pub value: f64,
    pub color: String,
    pub percentage: f64,
    pub is_root: bool,
    pub ancestry: Vec<String>,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticFlowDiagram {
    pub nodes: Vec<SemanticNode>,
    pub links: Vec<FlowLink>,
    pub level_totals: Vec<f64>,
    pub filter: Option<String>,
}

impl SemanticFlowDiagram {
    pub fn node(&self, label: &str) -> Option<&SemanticNode> {
        self.nodes.iter().find(|n| n.label == label)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Build from a bucket grouped by `[source, target, type]`.
///
/// A filter keeps the flows entering or leaving the named node.
pub fn build(bucket: &AggregatedBucket, filter: Option<&str>) -> SemanticFlowDiagram {
    let mut graph = FlowGraph::new();
    let mut kinds: HashMap<String, String> = HashMap::new();

    for group in bucket.groups() {
        let [source, target, rest @ ..] = group.path.as_slice() else {
            continue;
        };
        if let Some(name) = filter {
            if source != name && target != name {
                continue;
            }
        }
        let kind = rest
            .first()
            .map(|k| k.to_lowercase())
            .unwrap_or_else(|| taxonomy::INPUT.to_string());
        kinds.insert(target.clone(), kind);
        graph.add_flow(source, target, group.value);
    }

    let depths = graph.depths();
    let columns = depths.values().copied().max().map_or(0, |d| d + 1);
    let mut level_totals = vec![0.0; columns];
    for idx in graph.node_indices() {
        level_totals[depths[&idx]] += graph.throughput(idx);
    }

    let nodes: Vec<SemanticNode> = graph
        .node_indices()
        .map(|idx| {
            let name = graph.id(idx).to_string();
            let kind = kinds
                .get(&name)
                .cloned()
                .unwrap_or_else(|| taxonomy::INPUT.to_string());
            let is_root = graph.is_root(idx);
            let color = if is_root {
                taxonomy_style(taxonomy::INPUT).node
            } else {
                taxonomy_style(&kind).node
            };
            let level = depths[&idx];
            let value = graph.throughput(idx);
            let percentage = format::percentage(value, level_totals[level]);
            SemanticNode {
                id: name.clone(),
                tooltip: format!("{name}\n{}", format::number(value)),
                ancestry: graph
                    .sources_of(idx)
                    .into_iter()
                    .map(|s| graph.id(s).to_string())
                    .collect(),
                label: name,
                kind,
                level,
                value,
                color: color.to_string(),
                percentage,
                is_root,
            }
        })
        .collect();

    let links: Vec<FlowLink> = graph
        .edges()
        .map(|(src, dst, value)| {
            let source = graph.id(src).to_string();
            let target = graph.id(dst).to_string();
            let kind = kinds.get(&target).map(String::as_str).unwrap_or(taxonomy::INPUT);
            FlowLink {
                id: link_id(&source, &target),
                color: taxonomy_style(kind).link.to_string(),
                tooltip: format!("{source} → {target}\n{}", format::number(value)),
                source,
                target,
                value,
            }
        })
        .collect();

    debug!(nodes = nodes.len(), links = links.len(), "built semantic flow");

    SemanticFlowDiagram {
        nodes,
        links,
        level_totals,
        filter: filter.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregate;
    use crate::parser::{Dataset, Row};
    use crate::period::{PeriodKey, YearMonth};

    fn row(year: i32, source: &str, target: &str, kind: &str, value: f64) -> Row {
        Row::new(YearMonth { year, month: 1 }, value)
            .with_field("source", source)
            .with_field("target", target)
            .with_field("type", kind)
    }

    fn bucket(year: i32) -> AggregatedBucket {
        let ds = Dataset::from_rows(vec![
            row(2025, "Sales", "Revenue", "input", 5000.0),
            row(2025, "Revenue", "Operating Profit", "Profit", 3000.0),
            row(2025, "Revenue", "Cost of Goods", "cost", 1500.0),
            row(2025, "Revenue", "Tax", "cost", 500.0),
            row(2024, "Sales", "Revenue", "input", 4000.0),
        ]);
        let path: Vec<String> = ["source", "target", "type"].iter().map(|s| s.to_string()).collect();
        aggregate(&ds, &PeriodKey::whole_year(year), &path)
    }

    #[test]
    fn colours_follow_the_taxonomy() {
        let diagram = build(&bucket(2025), None);
        assert_eq!(diagram.node("Operating Profit").unwrap().color, "#2e7d32");
        assert_eq!(diagram.node("Tax").unwrap().color, "#c62828");
        assert_eq!(diagram.node("Sales").unwrap().color, "#546e7a");
        assert!(diagram.node("Sales").unwrap().is_root);

        let tax_link = diagram.links.iter().find(|l| l.target == "Tax").unwrap();
        assert_eq!(tax_link.color, "#ef9a9a");
    }

    #[test]
    fn percentages_are_per_column() {
        let diagram = build(&bucket(2025), None);
        let revenue = diagram.node("Revenue").unwrap();
        assert_eq!(revenue.level, 1);
        assert_eq!(revenue.value, 5000.0);
        assert_eq!(revenue.percentage, 100.0);
        let profit = diagram.node("Operating Profit").unwrap();
        assert_eq!(profit.level, 2);
        assert_eq!(profit.percentage, 60.0);
        assert_eq!(diagram.level_totals, vec![5000.0, 5000.0, 5000.0]);
    }

    #[test]
    fn filter_keeps_adjacent_flows() {
        let diagram = build(&bucket(2025), Some("Tax"));
        assert_eq!(diagram.links.len(), 1);
        assert_eq!(diagram.nodes.len(), 2);
        assert!(diagram.node("Revenue").unwrap().is_root);
        assert_eq!(diagram.node("Revenue").unwrap().color, "#546e7a");
    }

    #[test]
    fn prior_year_builds_independently() {
        let diagram = build(&bucket(2024), None);
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.node("Revenue").unwrap().value, 4000.0);
    }
}
