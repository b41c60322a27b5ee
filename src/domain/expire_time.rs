use std::fmt;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Duration, Months, SubsecRound, Utc};

/// A relative age threshold such as "6months", "1year" or "90days",
/// interpreted as "this far into the past from now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpireTime {
    amount: u32,
    unit: ExpireUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

// Keeps the cutoff arithmetic far inside chrono's representable range,
// so `cutoff_from` cannot overflow.
const MAX_AMOUNT: u32 = 10_000;

impl ExpireTime {
    pub fn parse(s: &str) -> Result<Self, String> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(
                "Expired time is empty. Please give an expired time. Ex : \"6months\", \"1year\", \"90days\".".to_string(),
            );
        }

        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit_token) = trimmed.split_at(digits_end);

        if digits.is_empty() {
            return Err(format!(
                "Expired time '{trimmed}' is not readable. Use a valid format like \"6months\", \"1year\", \"90days\"."
            ));
        }

        let amount: u32 = digits.parse().map_err(|_| {
            format!("Expired time '{trimmed}' is not readable: the number is too large.")
        })?;

        if amount == 0 {
            return Err(format!(
                "Expired time '{trimmed}' is not readable: the amount must be at least 1."
            ));
        }

        if amount > MAX_AMOUNT {
            return Err(format!(
                "Expired time '{trimmed}' is not readable: the amount cannot exceed {MAX_AMOUNT}."
            ));
        }

        let unit = ExpireUnit::parse(unit_token.trim())?;

        Ok(Self { amount, unit })
    }

    /// Resolves the expression against `now`, truncated to whole seconds so
    /// the displayed cutoff and the query bound are the same instant.
    pub fn cutoff_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let amount = self.amount;
        let cutoff = match self.unit {
            ExpireUnit::Seconds => now - Duration::seconds(i64::from(amount)),
            ExpireUnit::Minutes => now - Duration::minutes(i64::from(amount)),
            ExpireUnit::Hours => now - Duration::hours(i64::from(amount)),
            ExpireUnit::Days => now - Duration::days(i64::from(amount)),
            ExpireUnit::Weeks => now - Duration::weeks(i64::from(amount)),
            // Calendar months: "6months" from June 15th lands on December 15th
            ExpireUnit::Months => now - Months::new(amount),
            ExpireUnit::Years => now - Months::new(amount * 12),
        };

        cutoff.trunc_subsecs(0)
    }
}

impl ExpireUnit {
    fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "second" | "seconds" => Ok(Self::Seconds),
            "minute" | "minutes" => Ok(Self::Minutes),
            "hour" | "hours" => Ok(Self::Hours),
            "day" | "days" => Ok(Self::Days),
            "week" | "weeks" => Ok(Self::Weeks),
            "month" | "months" => Ok(Self::Months),
            "year" | "years" => Ok(Self::Years),
            _ => Err(format!(
                "Expired time unit '{s}' is not readable. Use a valid format like \"6months\", \"1year\", \"90days\"."
            )),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Seconds => "second",
            Self::Minutes => "minute",
            Self::Hours => "hour",
            Self::Days => "day",
            Self::Weeks => "week",
            Self::Months => "month",
            Self::Years => "year",
        }
    }
}

impl Display for ExpireTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let plural = if self.amount == 1 { "" } else { "s" };
        write!(f, "{}{}{}", self.amount, self.unit.as_str(), plural)
    }
}
