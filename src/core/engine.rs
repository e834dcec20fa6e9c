use super::error::{InputError, check_amount, check_rate, check_years};
use super::types::{
    MAX_HORIZON_YEARS, MAX_PROJECTION_YEARS, ProjectionConfig, ProjectionInput, ProjectionPoint,
    ProjectionResult,
};

const MONTHS_PER_YEAR: u32 = 12;

pub fn calculate_projection(
    input: &ProjectionInput,
    config: &ProjectionConfig,
) -> Result<ProjectionResult, InputError> {
    input.validate()?;
    config.validate()?;

    let Some(months_to_target) = simulate_accumulation(input, config.horizon_years)? else {
        return Ok(ProjectionResult::unreached());
    };

    let series = project_post_target(
        input.target_net_worth,
        input.annual_return_rate,
        input.fire_spend_ratio,
        config.inflation_rate,
        months_to_target,
        config.projection_years,
    )?;

    Ok(ProjectionResult {
        months_to_target: Some(months_to_target),
        series,
    })
}

/// Earliest month (counting from 1) whose closing balance meets the target.
///
/// Each month grows the balance at the compounding-equivalent monthly rate
/// and adds the monthly contribution; the bonus lands on every 12th month.
/// Returns `Ok(None)` when no month inside `horizon_years` reaches the target.
pub fn simulate_accumulation(
    input: &ProjectionInput,
    horizon_years: u32,
) -> Result<Option<u32>, InputError> {
    input.validate()?;
    check_years("horizonYears", horizon_years, MAX_HORIZON_YEARS)?;

    let monthly_rate = monthly_rate(input.annual_return_rate);
    let total_months = horizon_years.saturating_mul(MONTHS_PER_YEAR);

    let mut balance = input.current_balance;
    for month in 1..=total_months {
        balance = balance * (1.0 + monthly_rate) + input.monthly_contribution;
        if month % MONTHS_PER_YEAR == 0 {
            balance += input.annual_bonus;
        }
        if balance >= input.target_net_worth {
            return Ok(Some(month));
        }
    }

    Ok(None)
}

/// Year-by-year trajectory after the target is reached.
///
/// Point 0 restates the target; its real values are deflated from time zero to
/// the moment the target is hit. Later points track a no-spending path and a
/// path that withdraws `target * fire_spend_ratio` every year, floored at zero
/// once depleted. Inflation always compounds from time zero.
pub fn project_post_target(
    target: f64,
    annual_return_rate: f64,
    fire_spend_ratio: f64,
    inflation_rate: f64,
    months_to_target: u32,
    projection_years: u32,
) -> Result<Vec<ProjectionPoint>, InputError> {
    check_amount("targetNetWorth", target)?;
    check_rate("annualReturnRate", annual_return_rate)?;
    check_amount("fireSpendRatio", fire_spend_ratio)?;
    check_rate("inflationRate", inflation_rate)?;
    check_years("projectionYears", projection_years, MAX_PROJECTION_YEARS)?;
    if months_to_target == 0 {
        return Err(InputError::ZeroMonths {
            field: "monthsToTarget",
        });
    }

    let fire_years = months_to_target as f64 / MONTHS_PER_YEAR as f64;
    let annual_spending = target * fire_spend_ratio;
    let baseline_real = target / (1.0 + inflation_rate).powf(fire_years);

    let mut series = Vec::with_capacity(projection_years as usize + 1);
    series.push(ProjectionPoint {
        year_offset: 0,
        nominal_assets: target,
        real_assets: baseline_real,
        net_worth_after_spending: baseline_real,
    });

    let mut no_spend_balance = target;
    let mut with_spend_balance = target;
    let mut depleted = false;

    for year in 1..=projection_years {
        no_spend_balance *= 1.0 + annual_return_rate;

        if !depleted {
            with_spend_balance = with_spend_balance * (1.0 + annual_return_rate) - annual_spending;
            if with_spend_balance <= 0.0 {
                with_spend_balance = 0.0;
                depleted = true;
            }
        }

        let inflation_factor = (1.0 + inflation_rate).powf(fire_years + year as f64);
        series.push(ProjectionPoint {
            year_offset: year,
            nominal_assets: no_spend_balance,
            real_assets: no_spend_balance / inflation_factor,
            net_worth_after_spending: with_spend_balance / inflation_factor,
        });
    }

    Ok(series)
}

fn monthly_rate(annual_return_rate: f64) -> f64 {
    (1.0 + annual_return_rate).powf(1.0 / MONTHS_PER_YEAR as f64) - 1.0
}
