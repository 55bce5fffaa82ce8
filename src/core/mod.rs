mod engine;
mod solver;
mod types;

pub use engine::{
    DEFAULT_HORIZON_YEARS, Trajectory, asset_gap, fire_number, future_value, monthly_rate,
    monthly_spend_estimate, months_to_target, progress_percent,
};
pub use solver::{
    ContributionSolveConfig, ContributionSolveIteration, ContributionSolveResult,
    solve_required_contribution,
};
pub use types::{ProjectionInput, TrajectoryPoint};
