use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProjectionInput {
    pub current_assets: f64,
    pub monthly_contribution: f64,
    pub annual_return_pct: f64,
    pub duration_months: u32,
    pub target_assets: f64,
    pub withdrawal_rate_pct: f64,
    pub safety_margin_pct: f64,
    pub horizon_years: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPoint {
    pub year: u32,
    pub assets: f64,
    pub target: f64,
}
