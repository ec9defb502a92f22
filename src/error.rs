use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Dataset not loaded: {0}")]
    NotLoaded(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Unknown widget type: {0}")]
    UnknownWidgetType(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown widget instance: {0}")]
    UnknownInstance(usize),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Unsupported interaction: {0}")]
    Unsupported(String),

    #[error("{0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(feature = "python")]
impl From<DashboardError> for pyo3::PyErr {
    fn from(err: DashboardError) -> pyo3::PyErr {
        match err {
            DashboardError::Config(_)
            | DashboardError::InvalidConfig(_)
            | DashboardError::InvalidSelection(_)
            | DashboardError::UnknownWidgetType(_) => {
                pyo3::exceptions::PyValueError::new_err(err.to_string())
            }
            _ => pyo3::exceptions::PyRuntimeError::new_err(err.to_string()),
        }
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for DashboardError {
    fn from(err: pyo3::PyErr) -> Self {
        DashboardError::General(err.to_string())
    }
}
