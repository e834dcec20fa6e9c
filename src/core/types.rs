use serde::{Deserialize, Serialize};

use super::error::{InputError, check_amount, check_rate, check_years};

pub const DEFAULT_HORIZON_YEARS: u32 = 50;
pub const DEFAULT_PROJECTION_YEARS: u32 = 40;
pub const DEFAULT_INFLATION_RATE: f64 = 0.03;
pub const MAX_HORIZON_YEARS: u32 = 100;
pub const MAX_PROJECTION_YEARS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionInput {
    pub target_net_worth: f64,
    pub current_balance: f64,
    pub monthly_contribution: f64,
    pub annual_bonus: f64,
    pub annual_return_rate: f64,
    pub fire_spend_ratio: f64,
}

impl ProjectionInput {
    pub fn validate(&self) -> Result<(), InputError> {
        check_amount("targetNetWorth", self.target_net_worth)?;
        check_amount("currentBalance", self.current_balance)?;
        check_amount("monthlyContribution", self.monthly_contribution)?;
        check_amount("annualBonus", self.annual_bonus)?;
        check_rate("annualReturnRate", self.annual_return_rate)?;
        check_amount("fireSpendRatio", self.fire_spend_ratio)?;
        Ok(())
    }

    /// Annual spending once the target is reached, fixed in nominal terms.
    pub fn annual_spending(&self) -> f64 {
        self.target_net_worth * self.fire_spend_ratio
    }

    pub fn monthly_spending(&self) -> f64 {
        self.annual_spending() / 12.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionConfig {
    pub horizon_years: u32,
    pub projection_years: u32,
    pub inflation_rate: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            horizon_years: DEFAULT_HORIZON_YEARS,
            projection_years: DEFAULT_PROJECTION_YEARS,
            inflation_rate: DEFAULT_INFLATION_RATE,
        }
    }
}

impl ProjectionConfig {
    pub fn validate(&self) -> Result<(), InputError> {
        check_years("horizonYears", self.horizon_years, MAX_HORIZON_YEARS)?;
        check_years("projectionYears", self.projection_years, MAX_PROJECTION_YEARS)?;
        check_rate("inflationRate", self.inflation_rate)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionPoint {
    pub year_offset: u32,
    pub nominal_assets: f64,
    pub real_assets: f64,
    pub net_worth_after_spending: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub months_to_target: Option<u32>,
    pub series: Vec<ProjectionPoint>,
}

impl ProjectionResult {
    pub fn unreached() -> Self {
        Self {
            months_to_target: None,
            series: Vec::new(),
        }
    }

    pub fn is_reached(&self) -> bool {
        self.months_to_target.is_some()
    }
}
