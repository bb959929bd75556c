use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::DistributionConfig;
use crate::decimal::{round_half_up, Money, Rate};
use crate::errors::{Result, RideError};

/// split of one payment amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub admin_share: Money,
    pub driver_share: Money,
    pub owner_share: Money,
}

impl Distribution {
    pub fn total(&self) -> Money {
        self.admin_share + self.driver_share + self.owner_share
    }
}

/// the same split in integer cents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentSplit {
    pub total: i64,
    pub admin: i64,
    pub driver: i64,
    pub owner: i64,
}

impl CentSplit {
    pub fn into_distribution(self) -> Distribution {
        Distribution {
            admin_share: Money::from_cents(self.admin),
            driver_share: Money::from_cents(self.driver),
            owner_share: Money::from_cents(self.owner),
        }
    }
}

/// split `amount` with the standard 10% platform rate
pub fn calculate_distribution(
    amount: Money,
    has_owner: bool,
    owner_share_of_remaining: Rate,
) -> Result<Distribution> {
    let config = DistributionConfig {
        owner_share_of_remaining,
        ..DistributionConfig::default()
    };
    DistributionEngine::new(&config).distribute(amount, has_owner)
}

/// fails when the parts do not add up to the total
pub fn reconcile(split: &CentSplit) -> Result<()> {
    let allocated = split.admin + split.driver + split.owner;
    if allocated != split.total {
        return Err(RideError::DistributionMismatch {
            total_cents: split.total,
            allocated_cents: allocated,
        });
    }
    Ok(())
}

fn share_of(cents: i64, rate: Rate) -> Result<i64> {
    round_half_up(Decimal::from(cents) * rate.as_decimal(), 0)
        .to_i64()
        .ok_or(RideError::Internal {
            context: "distribution".to_string(),
            message: format!("share of {} cents at {} overflows", cents, rate),
        })
}

/// platform / owner / driver split in cent space
#[derive(Debug, Clone)]
pub struct DistributionEngine {
    admin_rate: Rate,
    owner_share_of_remaining: Rate,
}

impl DistributionEngine {
    pub fn new(config: &DistributionConfig) -> Self {
        Self {
            admin_rate: config.admin_rate,
            owner_share_of_remaining: config.owner_share_of_remaining,
        }
    }

    /// integer split; the driver absorbs the rounding residue
    pub fn split_cents(&self, total_cents: i64, has_owner: bool) -> Result<CentSplit> {
        let admin = share_of(total_cents, self.admin_rate)?;
        let remaining = total_cents - admin;

        let (driver, owner) = if has_owner {
            let owner = share_of(remaining, self.owner_share_of_remaining)?;
            (remaining - owner, owner)
        } else {
            (remaining, 0)
        };

        let split = CentSplit {
            total: total_cents,
            admin,
            driver,
            owner,
        };
        reconcile(&split)?;
        Ok(split)
    }

    pub fn distribute(&self, amount: Money, has_owner: bool) -> Result<Distribution> {
        if !amount.is_positive() {
            return Err(RideError::InvalidAmount { amount });
        }

        let total_cents = amount.to_cents().ok_or(RideError::Internal {
            context: "distribution".to_string(),
            message: format!("amount {} does not fit in cents", amount),
        })?;

        let distribution = self.split_cents(total_cents, has_owner)?.into_distribution();

        // back in currency units the parts still sum exactly
        if distribution.total() != amount {
            return Err(RideError::DistributionMismatch {
                total_cents,
                allocated_cents: distribution.total().to_cents().unwrap_or_default(),
            });
        }

        Ok(distribution)
    }
}

impl Default for DistributionEngine {
    fn default() -> Self {
        Self::new(&DistributionConfig::default())
    }
}
