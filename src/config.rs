//! Document and widget configuration as supplied by the host.
//!
//! The document is decoded in two steps: the outer object first, then every
//! widget entry on its own, so one malformed widget never takes the others
//! down with it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DashboardError, Result};
use crate::schema::{horizon, widget_type};

fn default_title() -> String {
    "Dashboard".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    /// `YYYYMMDD` stamp used for export file names.
    #[serde(default)]
    pub generation_date: Option<String>,
    #[serde(default)]
    pub dev_mode: bool,
    /// Raw widget entries, decoded one by one with [`WidgetConfig::from_value`].
    #[serde(default)]
    pub widgets: Vec<Value>,
}

impl DashboardConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Sankey,
    FinancialSankey,
    Sunburst,
    Evolution,
    Horizon,
}

impl WidgetKind {
    pub fn tag(self) -> &'static str {
        match self {
            WidgetKind::Sankey => widget_type::SANKEY,
            WidgetKind::FinancialSankey => widget_type::FINANCIAL_SANKEY,
            WidgetKind::Sunburst => widget_type::SUNBURST,
            WidgetKind::Evolution => widget_type::EVOLUTION,
            WidgetKind::Horizon => widget_type::HORIZON,
        }
    }

    /// Types that draw the prior year as a separate synchronized instance.
    pub fn has_twin(self) -> bool {
        matches!(
            self,
            WidgetKind::Sankey | WidgetKind::FinancialSankey | WidgetKind::Sunburst
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(flatten)]
    pub spec: WidgetSpec,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dataset_index: usize,
    #[serde(default)]
    pub options: WidgetOptions,
}

impl WidgetConfig {
    /// Decode one widget entry. Unknown type tags and missing mapping keys
    /// are reported as errors for this widget only.
    pub fn from_value(value: &Value) -> Result<Self> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| DashboardError::InvalidConfig("widget without a type".into()))?;
        if !widget_type::ALL.contains(&tag) {
            return Err(DashboardError::UnknownWidgetType(tag.to_string()));
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn kind(&self) -> WidgetKind {
        match self.spec {
            WidgetSpec::Sankey { .. } => WidgetKind::Sankey,
            WidgetSpec::FinancialSankey { .. } => WidgetKind::FinancialSankey,
            WidgetSpec::Sunburst { .. } => WidgetKind::Sunburst,
            WidgetSpec::Evolution { .. } => WidgetKind::Evolution,
            WidgetSpec::Horizon { .. } => WidgetKind::Horizon,
        }
    }

    pub fn date_column(&self) -> &str {
        match &self.spec {
            WidgetSpec::Sankey { mapping } => &mapping.date,
            WidgetSpec::FinancialSankey { mapping } => &mapping.date,
            WidgetSpec::Sunburst { mapping } => &mapping.date,
            WidgetSpec::Evolution { mapping } => &mapping.date,
            WidgetSpec::Horizon { mapping } => &mapping.date,
        }
    }

    pub fn value_column(&self) -> &str {
        match &self.spec {
            WidgetSpec::Sankey { mapping } => &mapping.value,
            WidgetSpec::FinancialSankey { mapping } => &mapping.value,
            WidgetSpec::Sunburst { mapping } => &mapping.value,
            WidgetSpec::Evolution { mapping } => &mapping.value,
            WidgetSpec::Horizon { mapping } => &mapping.value,
        }
    }

    /// Categorical columns the widget groups by, in hierarchy order.
    pub fn dimensions(&self) -> Vec<String> {
        match &self.spec {
            WidgetSpec::Sankey { mapping } => mapping.levels(),
            WidgetSpec::FinancialSankey { mapping } => mapping.dimensions(),
            WidgetSpec::Sunburst { mapping } => mapping.hierarchy.clone(),
            WidgetSpec::Evolution { .. } => Vec::new(),
            WidgetSpec::Horizon { mapping } => vec![mapping.y.clone(), mapping.x.clone()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetSpec {
    Sankey { mapping: PathMapping },
    FinancialSankey { mapping: SemanticMapping },
    Sunburst { mapping: HierarchyMapping },
    Evolution { mapping: SeriesMapping },
    Horizon { mapping: HorizonMapping },
}

/// Multi-level flow: an ordered `path`, or a `source`/`target` pair.
#[derive(Debug, Clone, Deserialize)]
pub struct PathMapping {
    pub date: String,
    pub value: String,
    #[serde(default)]
    pub path: Option<Vec<String>>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

impl PathMapping {
    pub fn levels(&self) -> Vec<String> {
        match &self.path {
            Some(path) => path.clone(),
            None => self
                .source
                .iter()
                .chain(self.target.iter())
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SemanticMapping {
    pub date: String,
    pub value: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl SemanticMapping {
    /// Grouping order: source, target, then the taxonomy tag.
    pub fn dimensions(&self) -> Vec<String> {
        vec![self.source.clone(), self.target.clone(), self.kind.clone()]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HierarchyMapping {
    pub date: String,
    pub value: String,
    pub hierarchy: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesMapping {
    pub date: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HorizonMapping {
    pub date: String,
    pub value: String,
    pub x: String,
    pub y: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XAxisMode {
    #[default]
    Linear,
    Weekly,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetOptions {
    #[serde(default = "default_true")]
    pub yoy: bool,
    #[serde(default)]
    pub use_log_scale: bool,
    #[serde(default)]
    pub bands: Option<usize>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub x_axis_mode: XAxisMode,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            yoy: true,
            use_log_scale: false,
            bands: None,
            height: None,
            color: None,
            x_axis_mode: XAxisMode::Linear,
        }
    }
}

impl WidgetOptions {
    pub fn bands(&self) -> usize {
        self.bands.unwrap_or(horizon::BANDS).max(1)
    }

    pub fn row_height(&self) -> u32 {
        self.height.unwrap_or(horizon::ROW_HEIGHT_PX)
    }

    pub fn base_color(&self) -> &str {
        self.color.as_deref().unwrap_or(horizon::BASE_COLOR)
    }
}
