//! Widget instances: one rendering target bound to a dataset, a role in the
//! year-over-year pair, a filter and the last frame its builder produced.

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::aggregation::aggregate;
use crate::color::ColorRegistry;
use crate::config::{WidgetConfig, WidgetKind, WidgetSpec};
use crate::control::ControlPanel;
use crate::evolution::{self, EvolutionChart};
use crate::flow::{self, FlowDiagram, FlowFilter};
use crate::horizon::{self, HorizonChart};
use crate::parser::Dataset;
use crate::period::PeriodKey;
use crate::radial::{self, AreaScale, RadialChart};
use crate::schema::{empty, period};
use crate::semantic_flow::{self, SemanticFlowDiagram};

pub type InstanceId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Current,
    Prior,
}

/// Drill-down state of one instance. Mirrored verbatim onto the twin.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterState {
    #[default]
    Unfiltered,
    /// Hierarchical flow restricted to one `(level, value)` node.
    Flow(FlowFilter),
    /// Semantic flow restricted to flows touching one node.
    Node { name: String },
    /// Radial zoom; an empty path is the root.
    Focus { path: Vec<String> },
}

impl FilterState {
    pub fn is_active(&self) -> bool {
        match self {
            FilterState::Unfiltered => false,
            FilterState::Focus { path } => !path.is_empty(),
            _ => true,
        }
    }

    pub fn focus(&self) -> &[String] {
        match self {
            FilterState::Focus { path } => path,
            _ => &[],
        }
    }

    /// Text of the filter indicator shown next to the reset affordance.
    pub fn indicator(&self) -> Option<String> {
        match self {
            FilterState::Flow(f) => Some(format!("Filtre : {}", f.value)),
            FilterState::Node { name } => Some(format!("Filtre : {name}")),
            _ => None,
        }
    }
}

/// Renderable output of one build.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "chart", rename_all = "snake_case")]
pub enum Frame {
    Flow(FlowDiagram),
    SemanticFlow(SemanticFlowDiagram),
    Radial(RadialChart),
    Evolution(EvolutionChart),
    Horizon(HorizonChart),
    /// Nothing to draw, as opposed to a chart of zeros.
    Empty { message: String },
}

impl Frame {
    fn empty(message: &str) -> Self {
        Frame::Empty {
            message: message.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Frame::Empty { .. })
    }
}

/// Read-only inputs an instance rebuilds from.
pub struct BuildContext<'a> {
    pub config: &'a WidgetConfig,
    pub dataset: &'a Dataset,
    pub panel: &'a ControlPanel,
}

impl BuildContext<'_> {
    fn period(&self, role: Role) -> PeriodKey {
        let key = match self.config.kind() {
            WidgetKind::Sankey | WidgetKind::Sunburst => self.panel.period(),
            _ => PeriodKey::whole_year(self.panel.year()),
        };
        match role {
            Role::Current => key,
            Role::Prior => key.prior_year(),
        }
    }

    fn heading(&self, role: Role) -> String {
        let label = self.period(role).label();
        // Semantic flow headings carry the bare year.
        let suffixed = matches!(self.config.kind(), WidgetKind::Sankey | WidgetKind::Sunburst);
        if !suffixed || !self.panel.yoy() {
            return label;
        }
        match role {
            Role::Current => format!("{label}{}", period::CURRENT_SUFFIX),
            Role::Prior => format!("{label}{}", period::PRIOR_SUFFIX),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WidgetInstance {
    pub id: InstanceId,
    /// Render-target id, unique per instance.
    pub target: String,
    #[serde(skip)]
    pub widget: usize,
    pub role: Role,
    pub heading: String,
    pub filter: FilterState,
    pub indicator: Option<String>,
    pub frame: Frame,
}

impl WidgetInstance {
    pub fn new(id: InstanceId, widget: usize, role: Role) -> Self {
        Self {
            id,
            target: format!("widget-{}", Uuid::new_v4()),
            widget,
            role,
            heading: String::new(),
            filter: FilterState::Unfiltered,
            indicator: None,
            frame: Frame::empty(empty::NO_DATA),
        }
    }

    /// Re-aggregate and rebuild the frame from scratch.
    pub fn rebuild(&mut self, ctx: &BuildContext<'_>, registry: &mut ColorRegistry) {
        self.heading = ctx.heading(self.role);
        self.indicator = self.filter.indicator();
        self.frame = build_frame(ctx, self.role, &self.filter, registry);
        debug!(
            instance = self.id,
            role = ?self.role,
            empty = self.frame.is_empty(),
            "rebuilt widget instance"
        );
    }
}

fn build_frame(
    ctx: &BuildContext<'_>,
    role: Role,
    filter: &FilterState,
    registry: &mut ColorRegistry,
) -> Frame {
    let dataset = ctx.dataset;
    let key = ctx.period(role);

    match &ctx.config.spec {
        WidgetSpec::Sankey { mapping } => {
            let levels = mapping.levels();
            let bucket = aggregate(dataset, &key, &levels);
            if bucket.is_empty() {
                return Frame::empty(empty::NO_DATA);
            }
            let flow_filter = match filter {
                FilterState::Flow(f) => Some(f),
                _ => None,
            };
            let diagram = flow::build(&bucket, &levels, flow_filter, registry);
            match (diagram.is_empty(), flow_filter.is_some()) {
                (true, true) => Frame::empty(empty::NO_MATCH),
                (true, false) => Frame::empty(empty::NO_DATA),
                _ => Frame::Flow(diagram),
            }
        }
        WidgetSpec::FinancialSankey { mapping } => {
            let bucket = aggregate(dataset, &key, &mapping.dimensions());
            if bucket.is_empty() {
                return Frame::empty(empty::NO_DATA);
            }
            let name = match filter {
                FilterState::Node { name } => Some(name.as_str()),
                _ => None,
            };
            let diagram = semantic_flow::build(&bucket, name);
            match (diagram.is_empty(), name.is_some()) {
                (true, true) => Frame::empty(empty::NO_MATCH),
                (true, false) => Frame::empty(empty::NO_DATA),
                _ => Frame::SemanticFlow(diagram),
            }
        }
        WidgetSpec::Sunburst { mapping } => {
            let bucket = aggregate(dataset, &key, &mapping.hierarchy);
            if bucket.is_empty() {
                return Frame::empty(empty::NO_DATA);
            }
            let scale = if ctx.config.options.use_log_scale {
                AreaScale::Log
            } else {
                AreaScale::Linear
            };
            match radial::build(&bucket, filter.focus(), scale, registry) {
                Some(chart) => Frame::Radial(chart),
                None => Frame::empty(empty::NO_MATCH),
            }
        }
        WidgetSpec::Evolution { .. } => {
            let chart = evolution::build(dataset, key.year, ctx.panel.yoy());
            if chart.is_empty() {
                Frame::empty(empty::NO_DATA)
            } else {
                Frame::Evolution(chart)
            }
        }
        WidgetSpec::Horizon { mapping } => {
            let chart = horizon::build(
                dataset,
                key.year,
                &mapping.y,
                &mapping.x,
                &ctx.config.options,
            );
            if chart.is_empty() {
                Frame::empty(empty::NO_DATA_FOR_YEAR)
            } else {
                Frame::Horizon(chart)
            }
        }
    }
}
