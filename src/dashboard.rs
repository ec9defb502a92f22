//! The document: parsed datasets, widgets, their instances, the shared
//! colour registry and the twin pairing. All interaction goes through
//! [`Dashboard::handle`], which returns only once every affected instance
//! has been rebuilt.

use std::collections::BTreeMap;

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::aggregation::available_years;
use crate::color::ColorRegistry;
use crate::config::{DashboardConfig, WidgetConfig, WidgetKind};
use crate::control::{ControlEvent, ControlOutcome, ControlPanel};
use crate::error::{DashboardError, Result};
use crate::flow::FlowFilter;
use crate::parser::{Dataset, RawTable};
use crate::radial::{breadcrumb_target, parent_focus};
use crate::sync::SyncCoordinator;
use crate::widget::{BuildContext, FilterState, Frame, InstanceId, Role, WidgetInstance};

/// One user action routed from the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Interaction {
    Control { event: ControlEvent },
    SelectNode { node_id: String },
    SelectLink { link_id: String },
    ResetFilter,
    ZoomTo { path: Vec<String> },
    ZoomOut,
    Breadcrumb { index: usize },
}

struct Widget {
    config: WidgetConfig,
    dataset: Dataset,
    panel: ControlPanel,
    current: InstanceId,
    prior: Option<InstanceId>,
}

impl Widget {
    fn instance_ids(&self) -> Vec<InstanceId> {
        std::iter::once(self.current).chain(self.prior).collect()
    }
}

enum WidgetSlot {
    Ready(Box<Widget>),
    Failed { title: String, error: String },
}

/// Serializable snapshot of one widget for the rendering layer.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetView {
    pub index: usize,
    pub title: String,
    pub description: Option<String>,
    pub kind: Option<WidgetKind>,
    pub controls: Option<ControlPanel>,
    /// Display order: prior year first.
    pub instances: Vec<WidgetInstance>,
    /// Mapped columns absent from the dataset header; the hierarchy is
    /// shallower than configured when this is not empty.
    pub missing_columns: Vec<String>,
    /// Source lines left out for an unparseable date or value.
    pub dropped_rows: usize,
    pub error: Option<String>,
}

impl WidgetView {
    pub fn current(&self) -> Option<&WidgetInstance> {
        self.instances.iter().find(|i| i.role == Role::Current)
    }

    pub fn prior(&self) -> Option<&WidgetInstance> {
        self.instances.iter().find(|i| i.role == Role::Prior)
    }
}

/// Raw rows of one dataset ready to be written by the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportFile {
    pub dataset: usize,
    pub file_name: String,
    pub csv: String,
}

/// `{prefix}_dataset_{index}_{date}.csv`, the prefix being the lower-cased
/// title with every non-alphanumeric character replaced by `_`.
pub fn export_file_name(title: &str, index: usize, date: &str) -> String {
    let prefix: String = if title.is_empty() {
        "dashboard".to_string()
    } else {
        title
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    };
    format!("{prefix}_dataset_{index}_{date}.csv")
}

pub struct Dashboard {
    config: DashboardConfig,
    tables: Vec<Option<RawTable>>,
    widgets: Vec<WidgetSlot>,
    instances: BTreeMap<InstanceId, WidgetInstance>,
    sync: SyncCoordinator,
    registry: ColorRegistry,
    next_id: InstanceId,
}

impl Dashboard {
    /// Decode the document configuration and load it. Only malformed
    /// top-level JSON fails; widget problems are isolated per widget.
    pub fn from_json<S: AsRef<str>>(config_json: &str, datasets: &[S]) -> Result<Self> {
        let config = DashboardConfig::from_json(config_json)?;
        Ok(Self::load(config, datasets))
    }

    pub fn load<S: AsRef<str>>(config: DashboardConfig, datasets: &[S]) -> Self {
        let tables = datasets
            .iter()
            .enumerate()
            .map(|(index, text)| match RawTable::parse(text.as_ref()) {
                Ok(table) => Some(table),
                Err(err) => {
                    warn!(dataset = index, %err, "failed to parse dataset");
                    None
                }
            })
            .collect();

        let entries = config.widgets.clone();
        let mut dashboard = Self {
            config,
            tables,
            widgets: Vec::with_capacity(entries.len()),
            instances: BTreeMap::new(),
            sync: SyncCoordinator::new(),
            registry: ColorRegistry::new(),
            next_id: 0,
        };

        for (index, entry) in entries.iter().enumerate() {
            if let Err(err) = dashboard.mount(index, entry) {
                warn!(widget = index, %err, "widget failed to load");
                let title = entry
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                dashboard.widgets.push(WidgetSlot::Failed {
                    title,
                    error: err.to_string(),
                });
            }
        }

        info!(
            title = %dashboard.config.title,
            widgets = dashboard.widgets.len(),
            instances = dashboard.instances.len(),
            dev_mode = dashboard.config.dev_mode,
            "dashboard loaded"
        );
        dashboard
    }

    fn allocate(&mut self) -> InstanceId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn mount(&mut self, index: usize, entry: &Value) -> Result<()> {
        let config = WidgetConfig::from_value(entry)?;
        let table = self
            .tables
            .get(config.dataset_index)
            .ok_or_else(|| {
                DashboardError::InvalidConfig(format!(
                    "datasetIndex {} out of range",
                    config.dataset_index
                ))
            })?
            .as_ref()
            .ok_or_else(|| DashboardError::NotLoaded(format!("dataset {}", config.dataset_index)))?;

        let dataset = Dataset::from_table(
            table,
            config.date_column(),
            config.value_column(),
            &config.dimensions(),
        )?;
        let panel = ControlPanel::new(config.kind(), available_years(&dataset), config.options.yoy);

        let current = self.allocate();
        self.instances
            .insert(current, WidgetInstance::new(current, index, Role::Current));
        let prior = if config.kind().has_twin() && panel.yoy() {
            let prior = self.allocate();
            self.instances
                .insert(prior, WidgetInstance::new(prior, index, Role::Prior));
            self.sync.register(current, prior);
            Some(prior)
        } else {
            None
        };

        debug!(
            widget = index,
            kind = config.kind().tag(),
            rows = dataset.len(),
            dropped = dataset.dropped(),
            "mounted widget"
        );

        let widget = Widget {
            config,
            dataset,
            panel,
            current,
            prior,
        };
        let ids = widget.instance_ids();
        self.widgets.push(WidgetSlot::Ready(Box::new(widget)));
        self.rebuild(index, &ids);
        Ok(())
    }

    fn rebuild(&mut self, widget: usize, ids: &[InstanceId]) {
        let Some(WidgetSlot::Ready(widget)) = self.widgets.get(widget) else {
            return;
        };
        let ctx = BuildContext {
            config: &widget.config,
            dataset: &widget.dataset,
            panel: &widget.panel,
        };
        for id in ids {
            if let Some(instance) = self.instances.get_mut(id) {
                instance.rebuild(&ctx, &mut self.registry);
            }
        }
    }

    fn ready(&self, index: usize) -> Result<&Widget> {
        match self.widgets.get(index) {
            Some(WidgetSlot::Ready(widget)) => Ok(widget.as_ref()),
            Some(WidgetSlot::Failed { error, .. }) => {
                Err(DashboardError::InvalidConfig(error.clone()))
            }
            None => Err(DashboardError::General(format!("no widget at index {index}"))),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    pub fn registry(&self) -> &ColorRegistry {
        &self.registry
    }

    pub fn instance(&self, id: InstanceId) -> Option<&WidgetInstance> {
        self.instances.get(&id)
    }

    /// Year selector options of one widget.
    pub fn years(&self, widget: usize) -> Result<Vec<i32>> {
        Ok(self.ready(widget)?.panel.years().to_vec())
    }

    pub fn view(&self, index: usize) -> Result<WidgetView> {
        match self.widgets.get(index) {
            Some(WidgetSlot::Ready(widget)) => {
                let instances = widget
                    .prior
                    .into_iter()
                    .chain(std::iter::once(widget.current))
                    .filter_map(|id| self.instances.get(&id).cloned())
                    .collect();
                Ok(WidgetView {
                    index,
                    title: widget.config.title.clone(),
                    description: widget.config.description.clone(),
                    kind: Some(widget.config.kind()),
                    controls: Some(widget.panel.clone()),
                    instances,
                    missing_columns: widget.dataset.missing_columns().to_vec(),
                    dropped_rows: widget.dataset.dropped(),
                    error: None,
                })
            }
            Some(WidgetSlot::Failed { title, error }) => Ok(WidgetView {
                index,
                title: title.clone(),
                description: None,
                kind: None,
                controls: None,
                instances: Vec::new(),
                missing_columns: Vec::new(),
                dropped_rows: 0,
                error: Some(error.clone()),
            }),
            None => Err(DashboardError::General(format!("no widget at index {index}"))),
        }
    }

    pub fn views(&self) -> Vec<WidgetView> {
        (0..self.widgets.len())
            .filter_map(|index| self.view(index).ok())
            .collect()
    }

    pub fn views_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.views())?)
    }

    /// Apply one interaction on `instance` and return the owning widget's
    /// view with both twins rebuilt. Errors leave every state untouched.
    pub fn handle(&mut self, instance: InstanceId, interaction: &Interaction) -> Result<WidgetView> {
        let widget = self
            .instances
            .get(&instance)
            .ok_or(DashboardError::UnknownInstance(instance))?
            .widget;
        debug!(instance, ?interaction, "handling interaction");

        match interaction {
            Interaction::Control { event } => self.apply_control(widget, event)?,
            other => {
                let filter = self.next_filter(instance, other)?;
                let touched = self.sync.propagate(instance, &filter, &mut self.instances);
                self.rebuild(widget, &touched);
            }
        }
        self.view(widget)
    }

    fn apply_control(&mut self, index: usize, event: &ControlEvent) -> Result<()> {
        let Some(WidgetSlot::Ready(widget)) = self.widgets.get_mut(index) else {
            return Err(DashboardError::General(format!("no widget at index {index}")));
        };
        let outcome = widget.panel.apply(event)?;
        let kind = widget.config.kind();

        match outcome {
            ControlOutcome::Unchanged => return Ok(()),
            ControlOutcome::TwinShown if kind.has_twin() => {
                let prior = self.next_id;
                self.next_id += 1;
                let mut twin = WidgetInstance::new(prior, index, Role::Prior);
                if let Some(current) = self.instances.get(&widget.current) {
                    twin.filter = current.filter.clone();
                }
                self.instances.insert(prior, twin);
                self.sync.register(widget.current, prior);
                widget.prior = Some(prior);
            }
            ControlOutcome::TwinHidden => {
                if let Some(prior) = widget.prior.take() {
                    self.sync.unregister(prior);
                    self.instances.remove(&prior);
                }
            }
            _ => {}
        }

        let current = widget.current;
        let ids = widget.instance_ids();
        if kind == WidgetKind::Sunburst {
            self.sync
                .propagate(current, &FilterState::Unfiltered, &mut self.instances);
        }
        self.rebuild(index, &ids);
        Ok(())
    }

    /// Filter state an interaction leads to, validated against the frame the
    /// user clicked on.
    fn next_filter(&self, id: InstanceId, interaction: &Interaction) -> Result<FilterState> {
        let instance = self
            .instances
            .get(&id)
            .ok_or(DashboardError::UnknownInstance(id))?;
        let kind = self.ready(instance.widget)?.config.kind();

        let filter = match (&instance.frame, interaction) {
            (_, Interaction::ResetFilter) => FilterState::Unfiltered,

            (Frame::Flow(diagram), Interaction::SelectNode { node_id }) => {
                if !diagram.nodes.iter().any(|n| n.id == *node_id) {
                    return Err(unknown("node", node_id));
                }
                let filter =
                    FlowFilter::from_node_id(node_id).ok_or_else(|| unknown("node", node_id))?;
                toggle(&instance.filter, FilterState::Flow(filter))
            }
            (Frame::Flow(diagram), Interaction::SelectLink { link_id }) => {
                let link = diagram
                    .links
                    .iter()
                    .find(|l| l.id == *link_id)
                    .ok_or_else(|| unknown("link", link_id))?;
                let filter = FlowFilter::from_node_id(&link.source)
                    .ok_or_else(|| unknown("node", &link.source))?;
                toggle(&instance.filter, FilterState::Flow(filter))
            }

            (Frame::SemanticFlow(diagram), Interaction::SelectNode { node_id }) => {
                let node = diagram.node(node_id).ok_or_else(|| unknown("node", node_id))?;
                toggle(
                    &instance.filter,
                    FilterState::Node {
                        name: node.label.clone(),
                    },
                )
            }
            (Frame::SemanticFlow(diagram), Interaction::SelectLink { link_id }) => {
                let link = diagram
                    .links
                    .iter()
                    .find(|l| l.id == *link_id)
                    .ok_or_else(|| unknown("link", link_id))?;
                toggle(
                    &instance.filter,
                    FilterState::Node {
                        name: link.source.clone(),
                    },
                )
            }

            (Frame::Radial(chart), Interaction::SelectNode { node_id }) => {
                let arc = chart
                    .arcs
                    .iter()
                    .find(|a| a.id == *node_id)
                    .ok_or_else(|| unknown("arc", node_id))?;
                focus(arc.path.clone())
            }
            (Frame::Radial(chart), Interaction::ZoomTo { path }) => {
                let known = path.is_empty()
                    || *path == chart.focus
                    || chart.arcs.iter().any(|a| a.path == *path);
                if !known {
                    return Err(unknown("arc", &path.join(" > ")));
                }
                focus(path.clone())
            }
            (_, Interaction::ZoomOut) if kind == WidgetKind::Sunburst => {
                focus(parent_focus(instance.filter.focus()))
            }
            (_, Interaction::Breadcrumb { index }) if kind == WidgetKind::Sunburst => {
                let current = instance.filter.focus();
                if *index > current.len() {
                    return Err(DashboardError::InvalidSelection(format!(
                        "breadcrumb {index} beyond focus depth {}",
                        current.len()
                    )));
                }
                focus(breadcrumb_target(current, *index))
            }

            (Frame::Empty { .. }, _) => {
                return Err(DashboardError::InvalidSelection(
                    "nothing to select in an empty view".into(),
                ))
            }
            (_, other) => {
                return Err(DashboardError::Unsupported(format!(
                    "{other:?} on a {} widget",
                    kind.tag()
                )))
            }
        };
        Ok(filter)
    }

    /// Raw table of one dataset, as parsed.
    pub fn raw_table(&self, index: usize) -> Result<&RawTable> {
        self.tables
            .get(index)
            .and_then(Option::as_ref)
            .ok_or_else(|| DashboardError::NotLoaded(format!("dataset {index}")))
    }

    /// Every loaded dataset re-serialized as CSV with its export file name.
    pub fn export_datasets(&self) -> Result<Vec<ExportFile>> {
        let date = self
            .config
            .generation_date
            .clone()
            .unwrap_or_else(|| Local::now().format("%Y%m%d").to_string());

        let mut files = Vec::with_capacity(self.tables.len());
        for (index, table) in self.tables.iter().enumerate() {
            let Some(table) = table else {
                warn!(dataset = index, "skipping export of unparsed dataset");
                continue;
            };
            files.push(ExportFile {
                dataset: index,
                file_name: export_file_name(&self.config.title, index, &date),
                csv: table.to_csv()?,
            });
        }
        info!(files = files.len(), "exported datasets");
        Ok(files)
    }
}

fn unknown(what: &str, id: &str) -> DashboardError {
    DashboardError::InvalidSelection(format!("unknown {what} '{id}'"))
}

/// Selecting the active filter again clears it.
fn toggle(current: &FilterState, selected: FilterState) -> FilterState {
    if *current == selected {
        FilterState::Unfiltered
    } else {
        selected
    }
}

fn focus(path: Vec<String>) -> FilterState {
    if path.is_empty() {
        FilterState::Unfiltered
    } else {
        FilterState::Focus { path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_names_follow_the_title() {
        assert_eq!(
            export_file_name("Flux Monétiques 2025", 0, "20250115"),
            "flux_mon_tiques_2025_dataset_0_20250115.csv"
        );
        assert_eq!(export_file_name("", 2, "20250115"), "dashboard_dataset_2_20250115.csv");
    }

    #[test]
    fn toggling_the_active_filter_clears_it() {
        let tax = FilterState::Node { name: "Tax".into() };
        assert_eq!(toggle(&FilterState::Unfiltered, tax.clone()), tax);
        assert_eq!(toggle(&tax, tax.clone()), FilterState::Unfiltered);
    }

    #[test]
    fn root_focus_is_unfiltered() {
        assert_eq!(focus(Vec::new()), FilterState::Unfiltered);
        assert_eq!(
            focus(vec!["Visa".into()]),
            FilterState::Focus {
                path: vec!["Visa".into()]
            }
        );
    }

    #[test]
    fn interactions_decode_from_json() {
        let zoom: Interaction =
            serde_json::from_str(r#"{"action":"zoom_to","path":["Visa"]}"#).unwrap();
        assert_eq!(
            zoom,
            Interaction::ZoomTo {
                path: vec!["Visa".into()]
            }
        );
        let control: Interaction = serde_json::from_str(
            r#"{"action":"control","event":{"control":"set_year","year":2024}}"#,
        )
        .unwrap();
        assert_eq!(
            control,
            Interaction::Control {
                event: ControlEvent::SetYear { year: 2024 }
            }
        );
    }
}
