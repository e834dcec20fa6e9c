mod classify;
mod duration;
mod engine;
mod error;
mod locale;
mod types;

pub use classify::{
    IncomePercentiles, PERCENTILE_LEVELS, TierLabel, TierLabelError, WealthStatus,
    WealthTierTable, classify,
};
pub use duration::format_duration;
pub use engine::{calculate_projection, project_post_target, simulate_accumulation};
pub use error::InputError;
pub use locale::{Locale, LocaleError, LocalizedText};
pub use types::{
    DEFAULT_HORIZON_YEARS, DEFAULT_INFLATION_RATE, DEFAULT_PROJECTION_YEARS, MAX_HORIZON_YEARS,
    MAX_PROJECTION_YEARS, ProjectionConfig, ProjectionInput, ProjectionPoint, ProjectionResult,
};
