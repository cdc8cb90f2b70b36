use super::transaction::PriceError;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Per-transaction problems that are reported in the row and do not stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum RowError {
    /// Disposal of more units than the fund's open lots hold.
    /// When `available = 0`, no purchase was seen at all.
    UnmatchedDisposal {
        #[schemars(with = "String")]
        available: Decimal,
        #[schemars(with = "String")]
        required: Decimal,
    },
    /// Exchange rate was zero or negative, so no EUR price could be derived.
    InvalidExchangeRate {
        #[schemars(with = "String")]
        rate: Decimal,
    },
    /// Purchase or disposal with a negative number of units.
    NegativeUnits {
        #[schemars(with = "String")]
        units: Decimal,
    },
    /// A price or gain did not fit into a decimal.
    Overflow { detail: String },
}

impl RowError {
    pub fn name(&self) -> &'static str {
        match self {
            RowError::UnmatchedDisposal { available, .. } if available.is_zero() => "NoLots",
            RowError::UnmatchedDisposal { .. } => "UnmatchedDisposal",
            RowError::InvalidExchangeRate { .. } => "InvalidExchangeRate",
            RowError::NegativeUnits { .. } => "NegativeUnits",
            RowError::Overflow { .. } => "Overflow",
        }
    }
}

impl Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowError::UnmatchedDisposal {
                available,
                required,
            } => {
                if available.is_zero() {
                    write!(f, "no open lots to match {} units against", required)
                } else {
                    write!(
                        f,
                        "only {} units held, {} required",
                        available.normalize(),
                        required.normalize()
                    )
                }
            }
            RowError::InvalidExchangeRate { rate } => {
                write!(f, "exchange rate {} is not positive", rate)
            }
            RowError::NegativeUnits { units } => {
                write!(f, "units must not be negative, got {}", units.normalize())
            }
            RowError::Overflow { detail } => write!(f, "calculation out of range: {}", detail),
        }
    }
}

impl From<PriceError> for RowError {
    fn from(err: PriceError) -> Self {
        match err {
            PriceError::InvalidExchangeRate { rate } => RowError::InvalidExchangeRate { rate },
            err @ PriceError::Overflow { .. } => RowError::Overflow {
                detail: err.to_string(),
            },
        }
    }
}
