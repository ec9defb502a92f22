/// Names and fixed values shared by the configuration, the builders and the
/// rendering payload. Single source of truth - exported to Python via PyO3.

// ── Widget type tags ────────────────────────────────────────────────────────
pub mod widget_type {
    pub const SANKEY: &str = "sankey";
    pub const FINANCIAL_SANKEY: &str = "financial_sankey";
    pub const SUNBURST: &str = "sunburst";
    pub const EVOLUTION: &str = "evolution";
    pub const HORIZON: &str = "horizon";

    pub const ALL: [&str; 5] = [SANKEY, FINANCIAL_SANKEY, SUNBURST, EVOLUTION, HORIZON];
}

// ── Period labels ───────────────────────────────────────────────────────────
pub mod period {
    pub const MONTHS: [&str; 12] = [
        "Janvier",
        "Février",
        "Mars",
        "Avril",
        "Mai",
        "Juin",
        "Juillet",
        "Août",
        "Septembre",
        "Octobre",
        "Novembre",
        "Décembre",
    ];
    pub const QUARTER_PREFIX: &str = "T";
    pub const SEMESTER_PREFIX: &str = "S";
    pub const YEAR_LABEL: &str = "Année";
    pub const CURRENT_SUFFIX: &str = " (N)";
    pub const PRIOR_SUFFIX: &str = " (N-1)";
}

// ── Radial hierarchy ────────────────────────────────────────────────────────
pub mod radial {
    pub const ROOT_LABEL: &str = "Total";
    pub const BREADCRUMB_SEPARATOR: &str = " › ";
    pub const TOOLTIP_SEPARATOR: &str = " > ";
    /// Rings shown below the focus before arcs are hidden.
    pub const VISIBLE_RINGS: f64 = 2.0;
}

// ── Category palette (Tableau10) ────────────────────────────────────────────
pub mod palette {
    pub const CATEGORY: [&str; 10] = [
        "#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
        "#9c755f", "#bab0ab",
    ];
    pub const POSITIVE: &str = "#2e7d32";
    pub const NEGATIVE: &str = "#c62828";
    pub const SERIES: &str = "#1f77b4";
}

// ── Semantic flow taxonomy ──────────────────────────────────────────────────
pub mod taxonomy {
    pub const INPUT: &str = "input";
    pub const PROFIT: &str = "profit";
    pub const COST: &str = "cost";
    pub const DEFAULT: &str = "default";
}

// ── Horizon defaults ────────────────────────────────────────────────────────
pub mod horizon {
    pub const BANDS: usize = 3;
    pub const ROW_HEIGHT_PX: u32 = 40;
    pub const BASE_COLOR: &str = "#08519c";
    pub const WEEKLY_GRID: [f64; 6] = [24.0, 48.0, 72.0, 96.0, 120.0, 144.0];
    pub const WEEKLY_TICKS: [f64; 7] = [0.0, 24.0, 48.0, 72.0, 96.0, 120.0, 144.0];
    pub const WEEKDAYS: [&str; 7] = ["Lun", "Mar", "Mer", "Jeu", "Ven", "Sam", "Dim"];
    pub const HEADING: &str = "Analyse temporelle";
}

// ── Empty-state messages ────────────────────────────────────────────────────
pub mod empty {
    pub const NO_DATA: &str = "Aucune donnée";
    pub const NO_MATCH: &str = "Aucune donnée pour ce filtre.";
    pub const NO_DATA_FOR_YEAR: &str = "Aucune donnée pour cette année";
}
