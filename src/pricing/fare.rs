use rust_decimal::prelude::ToPrimitive;

use crate::config::PricingConfig;
use crate::decimal::{Distance, Money};
use crate::types::Coordinates;

use super::distance::{distance_with_radius, EARTH_RADIUS_KM};
use super::FareQuote;

/// per-km price when nothing else is configured
pub const DEFAULT_PRICE_PER_KM: i64 = 3000;

/// linear fare at the default price, rounded to 2 decimals
pub fn compute_cost(distance: Distance) -> Money {
    Money::from_decimal(distance.km() * Money::from_major(DEFAULT_PRICE_PER_KM).as_decimal())
}

/// distance and fare from a pricing configuration
#[derive(Debug, Clone)]
pub struct FareCalculator {
    price_per_km: Money,
    earth_radius_km: f64,
}

impl FareCalculator {
    pub fn new(config: &PricingConfig) -> Self {
        Self {
            price_per_km: config.price_per_km,
            earth_radius_km: config.earth_radius_km.to_f64().unwrap_or(EARTH_RADIUS_KM),
        }
    }

    pub fn distance(&self, from: Coordinates, to: Coordinates) -> Distance {
        distance_with_radius(from, to, self.earth_radius_km)
    }

    /// no minimum fare is applied
    pub fn cost(&self, distance: Distance) -> Money {
        Money::from_decimal(distance.km() * self.price_per_km.as_decimal())
    }

    pub fn quote(&self, from: Coordinates, to: Coordinates) -> FareQuote {
        let distance = self.distance(from, to);
        FareQuote {
            distance,
            cost: self.cost(distance),
        }
    }
}

impl Default for FareCalculator {
    fn default() -> Self {
        Self::new(&PricingConfig::default())
    }
}
