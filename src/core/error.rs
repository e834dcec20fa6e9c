use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("{field} must be >= 0")]
    NegativeAmount { field: &'static str },
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} must be > -100%")]
    RateOutOfRange { field: &'static str },
    #[error("{field} must be at least 1 year")]
    ZeroHorizon { field: &'static str },
    #[error("{field} must be at most {max} years")]
    HorizonTooLong { field: &'static str, max: u32 },
    #[error("{field} must be at least 1 month")]
    ZeroMonths { field: &'static str },
}

pub(crate) fn check_amount(field: &'static str, value: f64) -> Result<(), InputError> {
    if !value.is_finite() {
        return Err(InputError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(InputError::NegativeAmount { field });
    }
    Ok(())
}

pub(crate) fn check_rate(field: &'static str, value: f64) -> Result<(), InputError> {
    if !value.is_finite() {
        return Err(InputError::NotFinite { field });
    }
    if value <= -1.0 {
        return Err(InputError::RateOutOfRange { field });
    }
    Ok(())
}

pub(crate) fn check_years(field: &'static str, value: u32, max: u32) -> Result<(), InputError> {
    if value == 0 {
        return Err(InputError::ZeroHorizon { field });
    }
    if value > max {
        return Err(InputError::HorizonTooLong { field, max });
    }
    Ok(())
}
