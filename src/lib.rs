pub mod config;
pub mod decimal;
pub mod earnings;
pub mod engine;
pub mod errors;
pub mod events;
pub mod payments;
pub mod pricing;
pub mod ratings;
pub mod serialization;
pub mod state;
pub mod telemetry;
pub mod trips;
pub mod types;

#[cfg(test)]
mod test_support;

// re-export key types
pub use config::{DistributionConfig, EngineConfig, PaginationConfig, PricingConfig, RatingPolicy};
pub use decimal::{Distance, Money, Rate};
pub use earnings::{
    DateRange, EarningsEntry, EarningsFilter, EarningsPage, EarningsView, Pagination,
    PaymentsSummary, Requester,
};
pub use engine::RideEngine;
pub use errors::{ErrorKind, Result, RideError};
pub use events::{Event, EventStore};
pub use payments::{calculate_distribution, Distribution, DistributionEngine, PaymentRecord, PaymentRequest};
pub use pricing::{compute_cost, compute_distance_km, FareCalculator, FareQuote};
pub use ratings::{BlockOutcome, Rating, RatingRequest};
pub use serialization::{PaymentView, RatingView, TripSummary};
pub use state::{Location, Store, User, Vehicle};
pub use trips::{Trip, TripRequest};
pub use types::{
    Coordinates, DriverStatus, LocationId, PaymentId, PaymentMethod, PaymentStatus, RatingId,
    RatingStatus, Role, TripId, TripStatus, UserId, VehicleId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
