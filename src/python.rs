use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::dashboard::{Dashboard, Interaction};
use crate::error::DashboardError;

/// Python handle on one loaded document.
#[pyclass(name = "Dashboard")]
pub struct PyDashboard {
    inner: Dashboard,
}

#[pymethods]
impl PyDashboard {
    #[new]
    fn new(config_json: &str, datasets: Vec<String>) -> PyResult<Self> {
        Ok(Self {
            inner: Dashboard::from_json(config_json, &datasets)?,
        })
    }

    #[getter]
    fn title(&self) -> String {
        self.inner.config().title.clone()
    }

    #[getter]
    fn subtitle(&self) -> Option<String> {
        self.inner.config().subtitle.clone()
    }

    // ── Rendering payload ───────────────────────────────────────────────────

    /// JSON array with one view per configured widget, failed ones included.
    fn views(&self) -> PyResult<String> {
        Ok(self.inner.views_json()?)
    }

    /// Apply a JSON-encoded interaction, e.g.
    /// `{"action": "select_node", "node_id": "Visa##0"}`, and return the
    /// rebuilt widget view as JSON.
    fn handle(&mut self, instance_id: usize, interaction_json: &str) -> PyResult<String> {
        let interaction: Interaction =
            serde_json::from_str(interaction_json).map_err(DashboardError::from)?;
        let view = self.inner.handle(instance_id, &interaction)?;
        Ok(serde_json::to_string(&view).map_err(DashboardError::from)?)
    }

    fn years(&self, widget: usize) -> PyResult<Vec<i32>> {
        Ok(self.inner.years(widget)?)
    }

    // ── Export ──────────────────────────────────────────────────────────────

    /// `(file_name, csv)` for every loaded dataset.
    fn export_datasets(&self) -> PyResult<Vec<(String, String)>> {
        Ok(self
            .inner
            .export_datasets()?
            .into_iter()
            .map(|f| (f.file_name, f.csv))
            .collect())
    }

    /// Raw dataset as parsed: every column a string.
    fn raw_dataset(&self, index: usize) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.raw_table(index)?.frame().clone()))
    }
}
