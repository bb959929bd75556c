use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{Result, RideError};

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pricing: PricingConfig,
    pub distribution: DistributionConfig,
    pub rating_policy: RatingPolicy,
    pub pagination: PaginationConfig,
}

/// fare calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub price_per_km: Money,
    pub earth_radius_km: Decimal,
}

/// how a payment is split between platform, owner and driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// platform share of the whole amount
    pub admin_rate: Rate,
    /// owner share of what remains after the platform share
    pub owner_share_of_remaining: Rate,
}

/// rating eligibility and automatic moderation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingPolicy {
    /// hours after completion during which a trip can be rated
    pub window_hours: i64,
    /// scores strictly below this count as low
    pub low_score_below: u8,
    /// number of low scores that blocks a user
    pub block_threshold: usize,
}

/// earnings pagination bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page: u32,
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            price_per_km: Money::from_major(3000),
            earth_radius_km: dec!(6371),
        }
    }
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            admin_rate: Rate::from_percentage(10),
            owner_share_of_remaining: Rate::from_percentage(40),
        }
    }
}

impl Default for RatingPolicy {
    fn default() -> Self {
        Self {
            window_hours: 24,
            low_score_below: 3,
            block_threshold: 5,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_limit: 10,
            max_limit: 50,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl EngineConfig {
    /// production defaults: 3000 per km, 10% platform, 40% of the rest to owners
    pub fn standard() -> Self {
        Self {
            pricing: PricingConfig::default(),
            distribution: DistributionConfig::default(),
            rating_policy: RatingPolicy::default(),
            pagination: PaginationConfig::default(),
        }
    }

    /// standard config with a different per-km price
    pub fn with_price_per_km(price_per_km: Money) -> Self {
        let mut config = Self::standard();
        config.pricing.price_per_km = price_per_km;
        config
    }

    /// parse from json; absent sections keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| RideError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| RideError::InvalidConfiguration {
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.pricing.price_per_km.is_positive() {
            return Err(invalid(format!(
                "price per km must be positive, got {}",
                self.pricing.price_per_km
            )));
        }

        if self.pricing.earth_radius_km <= Decimal::ZERO {
            return Err(invalid("earth radius must be positive".to_string()));
        }

        if !self.distribution.admin_rate.is_fraction() {
            return Err(invalid(format!(
                "admin rate must be between 0% and 100%, got {}",
                self.distribution.admin_rate
            )));
        }

        if !self.distribution.owner_share_of_remaining.is_fraction() {
            return Err(invalid(format!(
                "owner share must be between 0% and 100%, got {}",
                self.distribution.owner_share_of_remaining
            )));
        }

        if self.rating_policy.window_hours <= 0 {
            return Err(invalid("rating window must be at least one hour".to_string()));
        }

        if self.rating_policy.block_threshold == 0 {
            return Err(invalid("block threshold must be at least 1".to_string()));
        }

        let pagination = &self.pagination;
        if pagination.default_page == 0 || pagination.default_limit == 0 || pagination.max_limit == 0 {
            return Err(invalid("pagination values must be at least 1".to_string()));
        }

        if pagination.default_limit > pagination.max_limit {
            return Err(invalid(format!(
                "default limit {} exceeds max limit {}",
                pagination.default_limit, pagination.max_limit
            )));
        }

        Ok(())
    }
}

fn invalid(message: String) -> RideError {
    RideError::InvalidConfiguration { message }
}
