/// Common types and utilities shared across handlers and services
use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::ServiceError;

/// Current time truncated to microseconds, the finest precision every
/// supported store keeps.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Smallest step between two stored timestamps.
pub fn one_micro() -> Duration {
    Duration::microseconds(1)
}

/// Inclusive date range parameters for filtering queries
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRangeParams {
    /// `YYYY-MM-DD` or RFC 3339; a bare date means start of day
    pub date_from: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339; a bare date means end of day
    pub date_to: Option<String>,
}

impl DateRangeParams {
    pub fn to_datetime_range(
        &self,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ServiceError> {
        let from = self
            .date_from
            .as_deref()
            .map(|s| parse_bound(s, false))
            .transpose()?;
        let to = self
            .date_to
            .as_deref()
            .map(|s| parse_bound(s, true))
            .transpose()?;
        Ok((from, to))
    }
}

fn parse_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ServiceError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| ServiceError::ValidationError(format!("Invalid date '{}': {}", raw, e)))?;
    let time = if end_of_day {
        date.and_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| ServiceError::ValidationError(format!("Invalid date '{}'", raw)))
}
