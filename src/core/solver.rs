use serde::Serialize;

use super::engine::months_to_target;

#[derive(Debug, Clone, Copy)]
pub struct ContributionSolveConfig {
    pub deadline_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub months_to_target: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionSolveResult {
    pub deadline_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub achieved_months: Option<f64>,
    pub iterations: Vec<ContributionSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

// Finds the smallest monthly contribution that reaches `target` within the
// deadline. Valid because months_to_target is monotone non-increasing in the
// contribution.
pub fn solve_required_contribution(
    target: f64,
    current_assets: f64,
    annual_return_pct: f64,
    config: ContributionSolveConfig,
) -> Result<ContributionSolveResult, String> {
    validate_config(target, current_assets, annual_return_pct, config)?;

    let deadline = f64::from(config.deadline_months);
    let evaluate =
        |candidate: f64| months_to_target(target, current_assets, candidate, annual_return_pct);

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_months = evaluate(config.search_min);
    let high_months = evaluate(config.search_max);

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_months <= deadline {
        solved_value = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already meets the deadline at the lower contribution bound.".to_string();
    } else if high_months > deadline {
        feasible = false;
        message = "No feasible contribution found within the search bounds.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let months = evaluate(mid);
            iterations.push(ContributionSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_value: mid,
                months_to_target: months,
            });

            if months <= deadline {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                solved_value = Some(hi);
                break;
            }
        }
        if solved_value.is_none() {
            solved_value = Some(hi);
        }
        feasible = true;
        message = if converged {
            "Solved required monthly contribution.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate.".to_string()
        };
    }

    let achieved_months = solved_value.map(evaluate);

    Ok(ContributionSolveResult {
        deadline_months: config.deadline_months,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_value,
        achieved_months,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn validate_config(
    target: f64,
    current_assets: f64,
    annual_return_pct: f64,
    config: ContributionSolveConfig,
) -> Result<(), String> {
    if !target.is_finite() || target <= 0.0 {
        return Err("target must be a finite positive amount".to_string());
    }
    if !current_assets.is_finite() {
        return Err("current_assets must be finite".to_string());
    }
    if !annual_return_pct.is_finite() || annual_return_pct <= -100.0 {
        return Err("annual_return_pct must be > -100".to_string());
    }
    if config.deadline_months == 0 {
        return Err("deadline_months must be > 0".to_string());
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err("search bounds must be finite".to_string());
    }
    if config.search_min < 0.0 {
        return Err("search_min must be >= 0".to_string());
    }
    if config.search_max <= config.search_min {
        return Err("search_max must be greater than search_min".to_string());
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err("tolerance must be > 0".to_string());
    }
    if config.max_iterations == 0 {
        return Err("max_iterations must be > 0".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn base_config() -> ContributionSolveConfig {
        ContributionSolveConfig {
            deadline_months: 12,
            search_min: 0.0,
            search_max: 200.0,
            tolerance: 0.5,
            max_iterations: 24,
        }
    }

    #[test]
    fn finds_required_contribution_in_zero_rate_case() {
        // Zero growth: 1200 over 12 months needs exactly 100 per month.
        let result = solve_required_contribution(1_200.0, 0.0, 0.0, base_config())
            .expect("must solve");

        assert!(result.feasible);
        assert!(result.converged);
        let solved = result.solved_value.expect("value expected");
        assert_close(solved, 100.0, base_config().tolerance + 0.5);
        assert!(result.achieved_months.expect("months expected") <= 12.0);
    }

    #[test]
    fn short_circuits_when_lower_bound_already_suffices() {
        let result = solve_required_contribution(1_000.0, 2_000.0, 0.0, base_config())
            .expect("must solve");

        assert!(result.feasible);
        assert!(result.converged);
        assert_eq!(result.solved_value, Some(0.0));
        assert_eq!(result.achieved_months, Some(0.0));
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn reports_infeasible_when_bounds_are_too_low() {
        let mut config = base_config();
        config.search_max = 50.0;

        let result =
            solve_required_contribution(1_200.0, 0.0, 0.0, config).expect("must return result");
        assert!(!result.feasible);
        assert!(result.solved_value.is_none());
        assert!(result.achieved_months.is_none());
    }

    #[test]
    fn solved_contribution_respects_compounding() {
        // With growth the required contribution must come in below the
        // zero-rate answer of 100.
        let result = solve_required_contribution(1_200.0, 0.0, 12.0, base_config())
            .expect("must solve");

        let solved = result.solved_value.expect("value expected");
        assert!(solved < 100.0);
        assert!(result.achieved_months.expect("months expected") <= 12.0);
    }

    #[test]
    fn rejects_invalid_configs() {
        let mut config = base_config();
        config.search_max = -1.0;
        assert!(solve_required_contribution(1_000.0, 0.0, 8.0, config).is_err());

        let mut config = base_config();
        config.deadline_months = 0;
        assert!(solve_required_contribution(1_000.0, 0.0, 8.0, config).is_err());

        let mut config = base_config();
        config.tolerance = 0.0;
        assert!(solve_required_contribution(1_000.0, 0.0, 8.0, config).is_err());

        assert!(solve_required_contribution(0.0, 0.0, 8.0, base_config()).is_err());
        assert!(solve_required_contribution(1_000.0, 0.0, -100.0, base_config()).is_err());
    }
}
