pub mod aggregation;
pub mod color;
pub mod config;
pub mod control;
pub mod dashboard;
pub mod error;
pub mod evolution;
pub mod flow;
pub mod format;
pub mod graph;
pub mod horizon;
pub mod parser;
pub mod period;
pub mod radial;
pub mod schema;
pub mod semantic_flow;
pub mod sync;
pub mod widget;

#[cfg(feature = "python")]
mod python;

pub use config::{DashboardConfig, WidgetConfig, WidgetKind};
pub use control::ControlEvent;
pub use dashboard::{Dashboard, ExportFile, Interaction, WidgetView};
pub use error::{DashboardError, Result};
pub use period::{Granularity, PeriodKey};
pub use widget::{FilterState, Frame, InstanceId, Role};

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export schema constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Widget types
    let widget_type = PyModule::new(m.py(), "widget_type")?;
    widget_type.add("SANKEY", schema::widget_type::SANKEY)?;
    widget_type.add("FINANCIAL_SANKEY", schema::widget_type::FINANCIAL_SANKEY)?;
    widget_type.add("SUNBURST", schema::widget_type::SUNBURST)?;
    widget_type.add("EVOLUTION", schema::widget_type::EVOLUTION)?;
    widget_type.add("HORIZON", schema::widget_type::HORIZON)?;
    m.add_submodule(&widget_type)?;

    // Semantic flow taxonomy
    let taxonomy = PyModule::new(m.py(), "taxonomy")?;
    taxonomy.add("INPUT", schema::taxonomy::INPUT)?;
    taxonomy.add("PROFIT", schema::taxonomy::PROFIT)?;
    taxonomy.add("COST", schema::taxonomy::COST)?;
    m.add_submodule(&taxonomy)?;

    // Empty states
    let empty = PyModule::new(m.py(), "empty")?;
    empty.add("NO_DATA", schema::empty::NO_DATA)?;
    empty.add("NO_MATCH", schema::empty::NO_MATCH)?;
    empty.add("NO_DATA_FOR_YEAR", schema::empty::NO_DATA_FOR_YEAR)?;
    m.add_submodule(&empty)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn dashboard_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyDashboard>()?;
    add_schema_exports(m)?;
    Ok(())
}
