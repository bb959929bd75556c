pub mod distance;
pub mod fare;

use serde::{Deserialize, Serialize};

use crate::decimal::{Distance, Money};

pub use distance::{compute_distance_km, haversine_km, EARTH_RADIUS_KM};
pub use fare::{compute_cost, FareCalculator, DEFAULT_PRICE_PER_KM};

/// distance and price for a trip, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareQuote {
    pub distance: Distance,
    pub cost: Money,
}
