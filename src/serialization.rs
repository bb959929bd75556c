/// serialization support for trips, payments and ratings
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{Result, RideError};
use crate::payments::PaymentRecord;
use crate::ratings::Rating;
use crate::state::Store;
use crate::trips::Trip;
use crate::types::{
    PaymentId, PaymentMethod, PaymentStatus, RatingId, RatingStatus, TripId, TripStatus, UserId,
};

/// trip as returned to callers of the trip operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub trip_id: TripId,
    pub passenger_name: String,
    pub driver_name: String,
    pub vehicle_plate: String,
    pub origin_zone: String,
    pub destination_zone: String,
    pub distance_km: Decimal,
    pub cost: Money,
    pub formatted_cost: String,
    pub status: TripStatus,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl TripSummary {
    pub fn from_trip(trip: &Trip, store: &Store) -> Result<Self> {
        let passenger = store
            .user(trip.passenger_id)
            .ok_or(RideError::PassengerNotFound { id: trip.passenger_id })?;
        let driver = store
            .user(trip.driver_id)
            .ok_or(RideError::DriverNotFound { id: trip.driver_id })?;
        let vehicle = store.vehicle(trip.vehicle_id).ok_or(RideError::Internal {
            context: format!("trip {}", trip.id),
            message: format!("vehicle {} missing", trip.vehicle_id),
        })?;
        let origin = store
            .location(trip.origin_id)
            .ok_or(RideError::LocationNotFound { id: trip.origin_id })?;
        let destination = store
            .location(trip.destination_id)
            .ok_or(RideError::LocationNotFound { id: trip.destination_id })?;

        Ok(TripSummary {
            trip_id: trip.id,
            passenger_name: passenger.name.clone(),
            driver_name: driver.name.clone(),
            vehicle_plate: vehicle.plate.clone(),
            origin_zone: origin.zone.clone(),
            destination_zone: destination.zone.clone(),
            distance_km: trip.distance.km(),
            cost: trip.cost,
            formatted_cost: trip.cost.formatted(),
            status: trip.status,
            requested_at: trip.requested_at,
            completed_at: trip.completed_at,
            canceled_at: trip.canceled_at,
        })
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// payment as returned to the paying passenger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentView {
    pub payment_id: PaymentId,
    pub reference: String,
    pub trip_id: TripId,
    pub amount: Money,
    pub formatted_amount: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    pub admin_share: Money,
    pub driver_share: Money,
    pub owner_share: Money,
}

impl PaymentView {
    pub fn from_payment(payment: &PaymentRecord) -> Self {
        PaymentView {
            payment_id: payment.id,
            reference: payment.reference.clone(),
            trip_id: payment.trip_id,
            amount: payment.amount,
            formatted_amount: payment.amount.formatted(),
            method: payment.method,
            status: payment.status,
            payment_date: payment.payment_date,
            admin_share: payment.distribution.admin_share,
            driver_share: payment.distribution.driver_share,
            owner_share: payment.distribution.owner_share,
        }
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// rating confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingView {
    pub rating_id: RatingId,
    pub trip_id: TripId,
    pub author_id: UserId,
    pub target_id: UserId,
    pub score: Option<u8>,
    pub comments: Option<String>,
    pub status: RatingStatus,
    pub created_at: DateTime<Utc>,
}

impl RatingView {
    pub fn from_rating(rating: &Rating) -> Self {
        RatingView {
            rating_id: rating.id,
            trip_id: rating.trip_id,
            author_id: rating.author_id,
            target_id: rating.target_id,
            score: rating.score,
            comments: rating.comments.clone(),
            status: rating.status,
            created_at: rating.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::PaymentRequest;
    use crate::ratings::RatingRequest;
    use crate::test_support::fixture;
    use crate::trips::TripRequest;

    #[test]
    fn test_trip_summary_json() {
        let (mut engine, f, time) = fixture();
        let summary = engine
            .create_trip(TripRequest::new(f.passenger, f.downtown, f.airport).with_driver(f.driver), &time)
            .unwrap();

        let json = summary.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["vehicle_plate"], "ABC-123");
        assert_eq!(value["formatted_cost"], summary.cost.formatted());
        assert!(value["completed_at"].is_null());

        let back: TripSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }

    #[test]
    fn test_payment_and_rating_views() {
        let (mut engine, f, time) = fixture();
        let trip = engine
            .create_trip(TripRequest::new(f.passenger, f.downtown, f.airport).with_driver(f.driver), &time)
            .unwrap();
        engine.complete_trip(trip.trip_id, &time).unwrap();

        let payment = engine
            .register_payment(PaymentRequest::new(trip.trip_id, "card", f.passenger), &time)
            .unwrap();
        let view = PaymentView::from_payment(&payment);
        assert_eq!(view.formatted_amount, payment.amount.formatted());
        assert_eq!(view.admin_share + view.driver_share + view.owner_share, view.amount);

        let value: serde_json::Value = serde_json::from_str(&view.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["method"], "card");
        assert_eq!(value["status"], "completed");

        let rating = engine
            .create_rating(RatingRequest::new(trip.trip_id, f.driver, 5), &time)
            .unwrap();
        let view = RatingView::from_rating(&rating);
        assert_eq!(view.target_id, f.passenger);
        assert_eq!(view.score, Some(5));
        assert_eq!(view.status, RatingStatus::Rated);
    }
}
