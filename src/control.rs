//! Shared control panel: year → period type → period value → year-over-year.
//!
//! Every change yields a [`ControlOutcome`] telling the document what to
//! rebuild. Option lists are regenerated from scratch on each cascade step.

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WidgetKind;
use crate::error::{DashboardError, Result};
use crate::period::{Granularity, PeriodKey};

/// Which controls a widget type exposes. The year selector is always shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlVisibility {
    pub year: bool,
    pub period_type: bool,
    pub period_value: bool,
    pub yoy: bool,
}

impl ControlVisibility {
    pub fn for_kind(kind: WidgetKind) -> Self {
        let (period, yoy) = match kind {
            WidgetKind::Sankey | WidgetKind::Sunburst => (true, true),
            WidgetKind::FinancialSankey | WidgetKind::Evolution => (false, true),
            WidgetKind::Horizon => (false, false),
        };
        Self {
            year: true,
            period_type: period,
            period_value: period,
            yoy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodOption {
    pub value: u32,
    pub label: String,
}

/// Selectable values of one granularity, in order. `year` has a single
/// implicit whole-year entry.
pub fn period_options(granularity: Granularity) -> Vec<PeriodOption> {
    (1..=granularity.bucket_count())
        .map(|value| PeriodOption {
            value,
            label: granularity.value_label(value),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum ControlEvent {
    SetYear { year: i32 },
    SetGranularity { granularity: Granularity },
    SetPeriodValue { value: u32 },
    SetYoy { enabled: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The period selection changed; every instance must be re-aggregated.
    Reaggregate,
    TwinShown,
    TwinHidden,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlPanel {
    years: Vec<i32>,
    year: i32,
    granularity: Granularity,
    value: u32,
    yoy: bool,
    options: Vec<PeriodOption>,
    visible: ControlVisibility,
}

impl ControlPanel {
    /// Initial state: latest year present (the current calendar year when the
    /// dataset is empty), January, year-over-year as configured.
    pub fn new(kind: WidgetKind, years: Vec<i32>, yoy: bool) -> Self {
        let visible = ControlVisibility::for_kind(kind);
        let year = years.last().copied().unwrap_or_else(|| Local::now().year());
        let granularity = if visible.period_type {
            Granularity::Month
        } else {
            Granularity::Year
        };
        Self {
            years,
            year,
            granularity,
            value: 1,
            yoy: yoy && visible.yoy,
            options: period_options(granularity),
            visible,
        }
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn yoy(&self) -> bool {
        self.yoy
    }

    pub fn options(&self) -> &[PeriodOption] {
        &self.options
    }

    pub fn visible(&self) -> ControlVisibility {
        self.visible
    }

    /// Period the current-year instance aggregates.
    pub fn period(&self) -> PeriodKey {
        PeriodKey::new(self.year, self.granularity, self.value)
    }

    pub fn prior_period(&self) -> PeriodKey {
        self.period().prior_year()
    }

    /// Apply one change. Invalid selections leave the panel untouched.
    pub fn apply(&mut self, event: &ControlEvent) -> Result<ControlOutcome> {
        let outcome = match *event {
            ControlEvent::SetYear { year } => {
                if !self.years.contains(&year) && year != self.year {
                    return Err(DashboardError::InvalidSelection(format!(
                        "year {year} not present in dataset"
                    )));
                }
                self.year = year;
                self.options = period_options(self.granularity);
                ControlOutcome::Reaggregate
            }
            ControlEvent::SetGranularity { granularity } => {
                if !self.visible.period_type {
                    return Err(DashboardError::Unsupported(
                        "period type is fixed for this widget".into(),
                    ));
                }
                self.granularity = granularity;
                self.options = period_options(granularity);
                self.value = self.options.first().map_or(1, |o| o.value);
                ControlOutcome::Reaggregate
            }
            ControlEvent::SetPeriodValue { value } => {
                if !self.visible.period_value {
                    return Err(DashboardError::Unsupported(
                        "period value is fixed for this widget".into(),
                    ));
                }
                if !self.options.iter().any(|o| o.value == value) {
                    return Err(DashboardError::InvalidSelection(format!(
                        "{value} is not a valid {} value",
                        self.granularity
                    )));
                }
                self.value = value;
                ControlOutcome::Reaggregate
            }
            ControlEvent::SetYoy { enabled } => {
                if !self.visible.yoy {
                    return Err(DashboardError::Unsupported(
                        "year-over-year is disabled for this widget".into(),
                    ));
                }
                if self.yoy == enabled {
                    ControlOutcome::Unchanged
                } else {
                    self.yoy = enabled;
                    if enabled {
                        ControlOutcome::TwinShown
                    } else {
                        ControlOutcome::TwinHidden
                    }
                }
            }
        };
        debug!(?event, ?outcome, period = %self.period().label(), "control change");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> ControlPanel {
        ControlPanel::new(WidgetKind::Sankey, vec![2023, 2024, 2025], true)
    }

    #[test]
    fn starts_on_the_latest_year() {
        let panel = panel();
        assert_eq!(panel.year(), 2025);
        assert_eq!(panel.granularity(), Granularity::Month);
        assert_eq!(panel.value(), 1);
        assert_eq!(panel.options().len(), 12);
        assert_eq!(panel.options()[0].label, "Janvier");
        assert_eq!(panel.prior_period(), PeriodKey::new(2024, Granularity::Month, 1));
    }

    #[test]
    fn changing_period_type_resets_the_value() {
        let mut panel = panel();
        panel
            .apply(&ControlEvent::SetPeriodValue { value: 11 })
            .unwrap();
        let outcome = panel
            .apply(&ControlEvent::SetGranularity {
                granularity: Granularity::Quarter,
            })
            .unwrap();
        assert_eq!(outcome, ControlOutcome::Reaggregate);
        assert_eq!(panel.value(), 1);
        let labels: Vec<&str> = panel.options().iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["T1", "T2", "T3", "T4"]);

        panel
            .apply(&ControlEvent::SetGranularity {
                granularity: Granularity::Year,
            })
            .unwrap();
        assert_eq!(panel.options().len(), 1);
        assert_eq!(panel.period(), PeriodKey::whole_year(2025));
    }

    #[test]
    fn stale_values_are_rejected() {
        let mut panel = panel();
        panel
            .apply(&ControlEvent::SetGranularity {
                granularity: Granularity::Semester,
            })
            .unwrap();
        let err = panel.apply(&ControlEvent::SetPeriodValue { value: 3 });
        assert!(matches!(err, Err(DashboardError::InvalidSelection(_))));
        assert_eq!(panel.value(), 1);
    }

    #[test]
    fn unknown_year_leaves_state_untouched() {
        let mut panel = panel();
        assert!(panel.apply(&ControlEvent::SetYear { year: 1999 }).is_err());
        assert_eq!(panel.year(), 2025);
        assert_eq!(
            panel.apply(&ControlEvent::SetYear { year: 2024 }).unwrap(),
            ControlOutcome::Reaggregate
        );
        assert_eq!(panel.year(), 2024);
    }

    #[test]
    fn yoy_toggle_reports_twin_changes() {
        let mut panel = panel();
        let off = panel.apply(&ControlEvent::SetYoy { enabled: false }).unwrap();
        assert_eq!(off, ControlOutcome::TwinHidden);
        let again = panel.apply(&ControlEvent::SetYoy { enabled: false }).unwrap();
        assert_eq!(again, ControlOutcome::Unchanged);
        let on = panel.apply(&ControlEvent::SetYoy { enabled: true }).unwrap();
        assert_eq!(on, ControlOutcome::TwinShown);
    }

    #[test]
    fn whole_year_widgets_hide_period_controls() {
        let mut semantic = ControlPanel::new(WidgetKind::FinancialSankey, vec![2024], true);
        assert!(!semantic.visible().period_type);
        assert!(semantic.visible().yoy);
        assert_eq!(semantic.period(), PeriodKey::whole_year(2024));
        assert!(semantic
            .apply(&ControlEvent::SetGranularity {
                granularity: Granularity::Month
            })
            .is_err());

        let horizon = ControlPanel::new(WidgetKind::Horizon, vec![2024], true);
        assert!(!horizon.yoy());
        assert!(horizon.visible().year);
    }

    #[test]
    fn events_decode_from_json() {
        let event: ControlEvent =
            serde_json::from_str(r#"{"control":"set_granularity","granularity":"quarter"}"#)
                .unwrap();
        assert_eq!(
            event,
            ControlEvent::SetGranularity {
                granularity: Granularity::Quarter
            }
        );
    }
}
