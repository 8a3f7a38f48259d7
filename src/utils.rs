use crate::error::SimError;
use std::{fmt::Debug, ops::RangeBounds};

pub fn check_num<T, R>(name: &str, num: T, range: R) -> Result<(), SimError>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        return Err(SimError::InvalidArgument(format!(
            "{name} must be in the range {range:?}, but is {num:?}"
        )));
    }

    Ok(())
}

pub fn check_finite(name: &str, num: f64) -> Result<(), SimError> {
    if !num.is_finite() {
        return Err(SimError::InvalidArgument(format!(
            "{name} must be finite, but is {num:?}"
        )));
    }

    Ok(())
}
