use super::types::TrajectoryPoint;

pub const DEFAULT_HORIZON_YEARS: u32 = 40;

// Rates this close to zero hit catastrophic cancellation in the annuity
// formulas, so they take the linear path instead.
const ZERO_RATE_EPSILON: f64 = 1e-12;

// Month counts past 200 years are reported as unreachable rather than as an
// arbitrarily large finite number.
const UNREACHABLE_MONTH_CAP: f64 = 2400.0;

pub fn monthly_rate(annual_return_pct: f64) -> f64 {
    let annual = annual_return_pct / 100.0;
    if annual <= -1.0 {
        return f64::NAN;
    }
    (1.0 + annual).powf(1.0 / 12.0) - 1.0
}

pub fn future_value(
    current_assets: f64,
    monthly_contribution: f64,
    annual_return_pct: f64,
    months: u32,
) -> f64 {
    if !current_assets.is_finite()
        || !monthly_contribution.is_finite()
        || !annual_return_pct.is_finite()
    {
        return f64::NAN;
    }
    if months == 0 {
        return current_assets;
    }

    let rate = monthly_rate(annual_return_pct);
    if !rate.is_finite() {
        return f64::NAN;
    }
    if rate.abs() < ZERO_RATE_EPSILON {
        return current_assets + monthly_contribution * f64::from(months);
    }

    let growth = (1.0 + rate).powf(f64::from(months));
    current_assets * growth + monthly_contribution * (growth - 1.0) / rate
}

pub fn fire_number(target_assets: f64, safety_margin_pct: f64) -> f64 {
    target_assets * (1.0 + safety_margin_pct / 100.0)
}

// Spend is derived from the unbuffered base target: the margin portion of the
// fire number is reserved, not spendable.
pub fn monthly_spend_estimate(
    target_assets: f64,
    withdrawal_rate_pct: f64,
    safety_margin_pct: f64,
) -> f64 {
    let rate = withdrawal_rate_pct / 100.0;
    let margin = 1.0 + safety_margin_pct / 100.0;
    if rate <= 0.0 || margin <= 0.0 {
        return f64::NAN;
    }
    target_assets * rate / 12.0 / margin
}

pub fn months_to_target(
    target: f64,
    current_assets: f64,
    monthly_contribution: f64,
    annual_return_pct: f64,
) -> f64 {
    if !target.is_finite() || target <= 0.0 {
        return f64::NAN;
    }

    let rate = monthly_rate(annual_return_pct);
    if !rate.is_finite() {
        return f64::NAN;
    }
    if current_assets >= target {
        return 0.0;
    }

    if rate.abs() < ZERO_RATE_EPSILON {
        if monthly_contribution <= 0.0 {
            return f64::INFINITY;
        }
        return ((target - current_assets) / monthly_contribution).ceil();
    }

    let denom = current_assets + monthly_contribution / rate;
    if denom <= 0.0 {
        return f64::INFINITY;
    }

    let rhs = (target + monthly_contribution / rate) / denom;
    if rhs <= 1.0 {
        return 0.0;
    }

    // A negative solution means the trajectory is decaying away from the
    // target (possible with negative rates), which is unreachable too.
    let n = rhs.ln() / (1.0 + rate).ln();
    if !n.is_finite() || n < 0.0 {
        return f64::INFINITY;
    }

    let months = n.ceil();
    if months > UNREACHABLE_MONTH_CAP {
        f64::INFINITY
    } else {
        months
    }
}

pub fn progress_percent(current_assets: f64, fire_number: f64) -> f64 {
    if !fire_number.is_finite() || fire_number <= 0.0 {
        return f64::NAN;
    }
    current_assets / fire_number * 100.0
}

pub fn asset_gap(current_assets: f64, fire_number: f64) -> f64 {
    if !fire_number.is_finite() {
        return f64::NAN;
    }
    fire_number - current_assets
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Phase {
    Accumulating,
    Decumulating,
}

#[derive(Debug, Clone)]
pub struct Trajectory {
    assets: f64,
    target: f64,
    monthly_contribution: f64,
    monthly_rate: f64,
    annual_withdrawal_rate: f64,
    phase: Phase,
    year: u32,
    horizon_years: u32,
    exhausted: bool,
}

impl Trajectory {
    pub fn new(
        current_assets: f64,
        monthly_contribution: f64,
        annual_return_pct: f64,
        withdrawal_rate_pct: f64,
        target: f64,
        horizon_years: u32,
    ) -> Self {
        let rate = monthly_rate(annual_return_pct);
        let invalid = !target.is_finite()
            || target <= 0.0
            || !rate.is_finite()
            || !current_assets.is_finite()
            || !monthly_contribution.is_finite();
        let phase = if current_assets >= target {
            Phase::Decumulating
        } else {
            Phase::Accumulating
        };

        Self {
            assets: current_assets,
            target,
            monthly_contribution,
            monthly_rate: rate,
            annual_withdrawal_rate: withdrawal_rate_pct / 100.0,
            phase,
            year: 0,
            horizon_years,
            exhausted: invalid,
        }
    }

    fn advance_one_year(&mut self) {
        for _ in 0..12 {
            match self.phase {
                Phase::Accumulating => {
                    self.assets = self.assets * (1.0 + self.monthly_rate) + self.monthly_contribution;
                    if self.assets >= self.target {
                        // One-way transition: withdrawals start the following
                        // month and never revert to accumulation.
                        self.phase = Phase::Decumulating;
                    }
                }
                Phase::Decumulating => {
                    let withdrawal = self.assets * self.annual_withdrawal_rate / 12.0;
                    self.assets = self.assets * (1.0 + self.monthly_rate) - withdrawal;
                    if self.assets <= 0.0 {
                        self.assets = 0.0;
                        break;
                    }
                }
            }
        }
    }
}

impl Iterator for Trajectory {
    type Item = TrajectoryPoint;

    fn next(&mut self) -> Option<TrajectoryPoint> {
        if self.exhausted || self.year > self.horizon_years {
            return None;
        }

        let point = TrajectoryPoint {
            year: self.year,
            assets: self.assets,
            target: self.target,
        };
        self.advance_one_year();
        self.year += 1;
        Some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_rel(actual: f64, expected: f64, rel: f64) {
        let tol = expected.abs().max(1.0) * rel;
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    // Annual rate whose equivalent monthly compounding rate is exactly 1%.
    fn annual_pct_for_one_percent_monthly() -> f64 {
        (1.01f64.powi(12) - 1.0) * 100.0
    }

    #[test]
    fn monthly_rate_matches_annual_compounding() {
        let rate = monthly_rate(8.0);
        assert_approx_rel((1.0 + rate).powi(12), 1.08, 1e-12);
    }

    #[test]
    fn monthly_rate_zero_annual_is_exactly_zero() {
        assert_eq!(monthly_rate(0.0), 0.0);
    }

    #[test]
    fn monthly_rate_rejects_total_loss_or_worse() {
        assert!(monthly_rate(-100.0).is_nan());
        assert!(monthly_rate(-250.0).is_nan());
    }

    #[test]
    fn future_value_zero_months_returns_current_assets() {
        assert_eq!(future_value(123_456.0, 1_000.0, 8.0, 0), 123_456.0);
    }

    #[test]
    fn future_value_zero_rate_is_linear() {
        assert_eq!(future_value(1_000.0, 250.0, 0.0, 36), 1_000.0 + 250.0 * 36.0);
    }

    #[test]
    fn future_value_propagates_non_finite_inputs() {
        assert!(future_value(f64::NAN, 100.0, 8.0, 12).is_nan());
        assert!(future_value(100.0, f64::INFINITY, 8.0, 12).is_nan());
        assert!(future_value(100.0, 100.0, f64::NAN, 12).is_nan());
    }

    #[test]
    fn future_value_propagates_invalid_rate() {
        // Scenario: -100% annual return has no monthly equivalent.
        assert!(future_value(100_000.0, 1_000.0, -100.0, 120).is_nan());
    }

    #[test]
    fn future_value_two_months_hand_calculation() {
        let annual = annual_pct_for_one_percent_monthly();
        // 1000*1.01^2 + 100*((1.01^2 - 1)/0.01) = 1020.1 + 201 = 1221.1
        assert_approx(future_value(1_000.0, 100.0, annual, 2), 1_221.1);
    }

    #[test]
    fn future_value_matches_iterated_monthly_recurrence() {
        // 100M at 8% with 1.5M monthly contributions over 10 years: the
        // closed form must agree with stepping the recurrence 120 times.
        let current = 100_000_000.0;
        let contribution = 1_500_000.0;
        let months = 120u32;
        let rate = monthly_rate(8.0);

        let mut assets = current;
        for _ in 0..months {
            assets = assets * (1.0 + rate) + contribution;
        }

        let closed_form = future_value(current, contribution, 8.0, months);
        assert_approx_rel(closed_form, assets, 1e-9);
        // Compounding must beat the zero-rate linear path.
        assert!(closed_form > current + contribution * f64::from(months));
    }

    #[test]
    fn fire_number_applies_safety_margin() {
        assert_approx(fire_number(825_000_000.0, 10.0), 907_500_000.0);
        assert_approx(fire_number(1_000.0, 0.0), 1_000.0);
        // Negative margins shrink the target; the engine does not clamp.
        assert_approx(fire_number(1_000.0, -10.0), 900.0);
    }

    #[test]
    fn monthly_spend_estimate_hand_calculation() {
        // 825M * 4% / 12 / 1.1 = 2.5M
        assert_approx(monthly_spend_estimate(825_000_000.0, 4.0, 10.0), 2_500_000.0);
    }

    #[test]
    fn monthly_spend_estimate_rejects_non_positive_rate_or_margin() {
        assert!(monthly_spend_estimate(1_000.0, 0.0, 10.0).is_nan());
        assert!(monthly_spend_estimate(1_000.0, -4.0, 10.0).is_nan());
        assert!(monthly_spend_estimate(1_000.0, 4.0, -100.0).is_nan());
    }

    #[test]
    fn months_to_target_is_zero_when_already_reached() {
        assert_eq!(months_to_target(100.0, 100.0, 0.0, 8.0), 0.0);
        assert_eq!(months_to_target(100.0, 150.0, 10.0, 0.0), 0.0);
    }

    #[test]
    fn months_to_target_zero_rate_divides_the_gap() {
        assert_eq!(months_to_target(1_200.0, 0.0, 100.0, 0.0), 12.0);
        assert_eq!(months_to_target(1_250.0, 100.0, 100.0, 0.0), 12.0);
    }

    #[test]
    fn months_to_target_zero_rate_zero_contribution_is_unreachable() {
        // Scenario: nothing grows and nothing is added.
        assert_eq!(months_to_target(1.0, 0.0, 0.0, 0.0), f64::INFINITY);
    }

    #[test]
    fn months_to_target_zero_rate_branch_is_uncapped() {
        // The cap applies to the closed-form branch only; the degenerate
        // linear branch reports the exact month count however large.
        assert_eq!(months_to_target(3_000.0, 0.0, 1.0, 0.0), 3_000.0);
    }

    #[test]
    fn months_to_target_invalid_target_is_nan() {
        assert!(months_to_target(0.0, 0.0, 100.0, 8.0).is_nan());
        assert!(months_to_target(-5.0, 0.0, 100.0, 8.0).is_nan());
        assert!(months_to_target(f64::NAN, 0.0, 100.0, 8.0).is_nan());
        assert!(months_to_target(f64::INFINITY, 0.0, 100.0, 8.0).is_nan());
    }

    #[test]
    fn months_to_target_invalid_rate_is_nan() {
        assert!(months_to_target(1_000.0, 0.0, 100.0, -100.0).is_nan());
    }

    #[test]
    fn months_to_target_hand_calculation() {
        let annual = annual_pct_for_one_percent_monthly();
        // n = ln((1200 + 10000) / 10000) / ln(1.01) = 11.39 -> 12 months
        assert_eq!(months_to_target(1_200.0, 0.0, 100.0, annual), 12.0);
    }

    #[test]
    fn months_to_target_caps_implausible_horizons() {
        assert_eq!(
            months_to_target(1_000_000_000.0, 0.0, 1.0, 1.0),
            f64::INFINITY
        );
    }

    #[test]
    fn months_to_target_negative_denominator_is_unreachable() {
        assert_eq!(
            months_to_target(2_000.0, 1_000.0, 100.0, -10.0),
            f64::INFINITY
        );
    }

    #[test]
    fn months_to_target_decaying_trajectory_is_unreachable() {
        // Assets above the contribution equilibrium decay under a negative
        // rate, so a target above the current balance is never reached.
        assert_eq!(
            months_to_target(200_000.0, 100_000.0, 1.0, -10.0),
            f64::INFINITY
        );
    }

    #[test]
    fn progress_percent_and_gap() {
        assert_approx(progress_percent(50.0, 200.0), 25.0);
        assert!(progress_percent(50.0, 0.0).is_nan());
        assert!(progress_percent(50.0, f64::NAN).is_nan());

        assert_approx(asset_gap(50.0, 200.0), 150.0);
        assert!(asset_gap(50.0, f64::NAN).is_nan());
    }

    #[test]
    fn trajectory_records_year_start_values() {
        let points: Vec<_> =
            Trajectory::new(100.0, 10.0, 0.0, 4.0, 1_000_000_000.0, 2).collect();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].year, 0);
        assert_approx(points[0].assets, 100.0);
        assert_approx(points[1].assets, 220.0);
        assert_approx(points[2].assets, 340.0);
        for point in &points {
            assert_approx(point.target, 1_000_000_000.0);
        }
    }

    #[test]
    fn trajectory_yields_horizon_plus_one_points() {
        let count = Trajectory::new(0.0, 100.0, 8.0, 4.0, 1_000_000.0, DEFAULT_HORIZON_YEARS).count();
        assert_eq!(count, DEFAULT_HORIZON_YEARS as usize + 1);
    }

    #[test]
    fn trajectory_switches_to_decumulation_the_month_after_crossing() {
        // Zero growth, 10 per month toward a target of 125: months 1-3
        // accumulate (110, 120, 130), month 3 crosses, months 4-12 withdraw
        // 10% of assets (120% annual rate / 12). The phase must stay in
        // decumulation even though assets fall straight back below 125.
        let points: Vec<_> = Trajectory::new(100.0, 10.0, 0.0, 120.0, 125.0, 2).collect();

        let year1 = 130.0 * 0.9f64.powi(9);
        let year2 = 130.0 * 0.9f64.powi(21);
        assert_approx(points[1].assets, year1);
        assert_approx(points[2].assets, year2);
        assert!(points[2].assets < points[1].assets);
    }

    #[test]
    fn trajectory_starts_decumulating_when_already_at_target() {
        let points: Vec<_> = Trajectory::new(200.0, 50.0, 0.0, 12.0, 100.0, 1).collect();
        // 1% of assets withdrawn each month, contributions ignored.
        assert_approx(points[1].assets, 200.0 * 0.99f64.powi(12));
    }

    #[test]
    fn trajectory_clamps_to_zero_and_stays_there() {
        let points: Vec<_> = Trajectory::new(100.0, 0.0, 0.0, 1_200.0, 50.0, 3).collect();
        assert_approx(points[0].assets, 100.0);
        assert_eq!(points[1].assets, 0.0);
        assert_eq!(points[2].assets, 0.0);
        assert_eq!(points[3].assets, 0.0);
    }

    #[test]
    fn trajectory_is_empty_for_invalid_target_or_rate() {
        assert_eq!(Trajectory::new(100.0, 10.0, 8.0, 4.0, 0.0, 40).count(), 0);
        assert_eq!(Trajectory::new(100.0, 10.0, 8.0, 4.0, -1.0, 40).count(), 0);
        assert_eq!(
            Trajectory::new(100.0, 10.0, 8.0, 4.0, f64::NAN, 40).count(),
            0
        );
        assert_eq!(
            Trajectory::new(100.0, 10.0, -100.0, 4.0, 1_000.0, 40).count(),
            0
        );
    }

    #[test]
    fn trajectory_clone_restarts_the_series() {
        let trajectory = Trajectory::new(100.0, 10.0, 8.0, 4.0, 10_000.0, 10);
        let first: Vec<_> = trajectory.clone().collect();
        let second: Vec<_> = trajectory.collect();
        assert_eq!(first, second);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_future_value_zero_rate_is_exactly_linear(
            current in 0u32..2_000_000_000,
            contribution in 0u32..10_000_000,
            months in 0u32..600
        ) {
            let current = current as f64;
            let contribution = contribution as f64;
            let expected = if months == 0 {
                current
            } else {
                current + contribution * f64::from(months)
            };
            prop_assert!(future_value(current, contribution, 0.0, months) == expected);
        }

        #[test]
        fn prop_months_to_target_monotone_in_target(
            current in 0u32..1_000_000,
            contribution in 1u32..50_000,
            return_bp in -4999i32..5000,
            target in 1u32..2_000_000,
            target_delta in 0u32..2_000_000
        ) {
            let annual_return_pct = return_bp as f64 / 100.0;
            let near = months_to_target(target as f64, current as f64, contribution as f64, annual_return_pct);
            let far = months_to_target(
                (target + target_delta) as f64,
                current as f64,
                contribution as f64,
                annual_return_pct,
            );
            prop_assert!(far >= near);
        }

        #[test]
        fn prop_months_to_target_monotone_in_contribution(
            current in 0u32..1_000_000,
            contribution in 1u32..50_000,
            contribution_delta in 0u32..50_000,
            return_bp in -4999i32..5000,
            target in 1u32..2_000_000
        ) {
            let annual_return_pct = return_bp as f64 / 100.0;
            let slower = months_to_target(target as f64, current as f64, contribution as f64, annual_return_pct);
            let faster = months_to_target(
                target as f64,
                current as f64,
                (contribution + contribution_delta) as f64,
                annual_return_pct,
            );
            prop_assert!(faster <= slower);
        }

        #[test]
        fn prop_reaching_the_fire_number_takes_zero_months(
            target in 1u32..1_000_000_000,
            margin_pct in 0u32..101,
            surplus in 0u32..1_000_000,
            return_bp in -4999i32..5000
        ) {
            let buffered = fire_number(target as f64, margin_pct as f64);
            let current = buffered + surplus as f64;
            let months = months_to_target(buffered, current, 0.0, return_bp as f64 / 100.0);
            prop_assert!(months == 0.0);
        }

        #[test]
        fn prop_fire_number_monotone_in_margin(
            target in 0u32..2_000_000_000,
            margin_pct in 0u32..100,
            margin_delta in 0u32..100
        ) {
            let lower = fire_number(target as f64, margin_pct as f64);
            let higher = fire_number(target as f64, (margin_pct + margin_delta) as f64);
            prop_assert!(higher >= lower);
        }

        #[test]
        fn prop_spend_estimate_inverts_back_to_target(
            target in 1u32..2_000_000_000,
            rate_decibp in 5u32..200,
            margin_pct in 0u32..101
        ) {
            let target = target as f64;
            let withdrawal_rate_pct = rate_decibp as f64 / 10.0;
            let margin_pct = margin_pct as f64;

            let annual_spend = monthly_spend_estimate(target, withdrawal_rate_pct, margin_pct) * 12.0;
            let recovered = annual_spend / (withdrawal_rate_pct / 100.0) * (1.0 + margin_pct / 100.0);
            prop_assert!((recovered - target).abs() <= target.abs() * 1e-9);
        }

        #[test]
        fn prop_trajectory_samples_are_well_formed(
            current in 0u32..10_000_000,
            contribution in 0u32..100_000,
            return_bp in -4999i32..5000,
            withdrawal_decibp in 0u32..120,
            target in 1u32..10_000_000,
            horizon in 0u32..41
        ) {
            let target = target as f64;
            let points: Vec<_> = Trajectory::new(
                current as f64,
                contribution as f64,
                return_bp as f64 / 100.0,
                withdrawal_decibp as f64 / 10.0,
                target,
                horizon,
            )
            .collect();

            prop_assert!(points.len() == horizon as usize + 1);
            for (index, point) in points.iter().enumerate() {
                prop_assert!(point.year == index as u32);
                prop_assert!(point.assets.is_finite());
                prop_assert!(point.target == target);
            }
        }
    }
}
