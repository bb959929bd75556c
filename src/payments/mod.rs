pub mod distribution;

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::decimal::Money;
use crate::engine::RideEngine;
use crate::errors::{ErrorKind, Result, RideError};
use crate::events::Event;
use crate::types::{PaymentId, PaymentMethod, PaymentStatus, TripId, TripStatus, UserId};

pub use distribution::{
    calculate_distribution, reconcile, CentSplit, Distribution, DistributionEngine,
};

/// persisted payment; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub reference: String,
    pub trip_id: TripId,
    pub passenger_id: UserId,
    pub driver_id: UserId,
    /// vehicle owner at payment time
    pub owner_id: Option<UserId>,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    pub distribution: Distribution,
}

/// payment request as received from a passenger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub trip_id: TripId,
    pub method: String,
    pub passenger_id: UserId,
}

impl PaymentRequest {
    pub fn new(trip_id: TripId, method: &str, passenger_id: UserId) -> Self {
        Self {
            trip_id,
            method: method.to_string(),
            passenger_id,
        }
    }
}

/// trimmed, case-insensitive; empty input is its own error
pub fn parse_payment_method(value: &str) -> Result<PaymentMethod> {
    if value.trim().is_empty() {
        return Err(RideError::PaymentMethodRequired);
    }
    value.parse().map_err(|_| RideError::InvalidPaymentMethod {
        value: value.trim().to_string(),
    })
}

impl RideEngine {
    /// register payment with system time
    pub fn register_payment_now(&mut self, request: PaymentRequest) -> Result<PaymentRecord> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.register_payment(request, &time)
    }

    /// create the single payment for a completed trip and split it
    pub fn register_payment(
        &mut self,
        request: PaymentRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentRecord> {
        let now = time_provider.now();

        let (method, has_owner) = self.validate_payment(&request).map_err(|err| {
            warn!(
                trip_id = request.trip_id,
                passenger_id = request.passenger_id,
                error = %err,
                "payment rejected"
            );
            err
        })?;

        let record = self.persist_payment(&request, method, has_owner, now)?;

        info!(
            payment_id = record.id,
            trip_id = record.trip_id,
            amount = %record.amount,
            method = %record.method,
            admin_share = %record.distribution.admin_share,
            driver_share = %record.distribution.driver_share,
            owner_share = %record.distribution.owner_share,
            "payment registered"
        );

        self.events.emit(Event::PaymentRegistered {
            payment_id: record.id,
            trip_id: record.trip_id,
            amount: record.amount,
            method: record.method,
            distribution: record.distribution,
            timestamp: now,
        });

        Ok(record)
    }

    /// preconditions in order; returns the parsed method and whether the vehicle has an owner
    fn validate_payment(&self, request: &PaymentRequest) -> Result<(PaymentMethod, bool)> {
        if request.trip_id == 0 {
            return Err(RideError::InvalidTripId { id: request.trip_id });
        }

        let method = parse_payment_method(&request.method)?;

        let trip = self
            .store
            .trip(request.trip_id)
            .ok_or(RideError::TripNotFound { id: request.trip_id })?;

        if trip.status != TripStatus::Completed {
            return Err(RideError::TripNotCompleted {
                id: trip.id,
                status: trip.status,
            });
        }

        if self.store.payment_for_trip(trip.id).is_some() {
            return Err(RideError::PaymentAlreadyExists { trip_id: trip.id });
        }

        if trip.passenger_id != request.passenger_id {
            return Err(RideError::NotTripPassenger {
                trip_id: trip.id,
                user_id: request.passenger_id,
            });
        }

        if !trip.cost.is_positive() {
            return Err(RideError::InvalidCost {
                trip_id: trip.id,
                cost: trip.cost,
            });
        }

        let has_owner = self
            .store
            .vehicle(trip.vehicle_id)
            .map(|v| v.owner_id.is_some())
            .unwrap_or(false);

        Ok((method, has_owner))
    }

    /// re-checked client errors pass through as they are; internal failures are logged with context
    fn persist_payment(
        &mut self,
        request: &PaymentRequest,
        method: PaymentMethod,
        has_owner: bool,
        now: DateTime<Utc>,
    ) -> Result<PaymentRecord> {
        let engine = DistributionEngine::new(&self.config.distribution);

        self.store.transaction(|tx| {
            let trip = tx
                .trip(request.trip_id)
                .ok_or(RideError::TripNotFound { id: request.trip_id })?
                .clone();

            if tx.payment_for_trip(trip.id).is_some() {
                return Err(RideError::PaymentAlreadyExists { trip_id: trip.id });
            }

            let owner_id = if has_owner {
                tx.vehicle(trip.vehicle_id).and_then(|v| v.owner_id)
            } else {
                None
            };

            // cost was validated positive, so any failure here is an invariant violation
            let distribution = engine
                .distribute(trip.cost, has_owner)
                .map_err(|err| RideError::internal("payment distribution", err))?;

            let record = PaymentRecord {
                id: tx.next_payment_id(),
                reference: format!("PAY-{}", Uuid::new_v4().to_string()[..8].to_uppercase()),
                trip_id: trip.id,
                passenger_id: trip.passenger_id,
                driver_id: trip.driver_id,
                owner_id,
                amount: trip.cost,
                method,
                status: PaymentStatus::Completed,
                payment_date: now,
                distribution,
            };
            tx.insert_payment(record.clone());

            Ok(record)
        })
        .map_err(|err| {
            match err.kind() {
                ErrorKind::Internal => error!(
                    trip_id = request.trip_id,
                    passenger_id = request.passenger_id,
                    method = %method,
                    has_owner,
                    error = ?err,
                    "payment distribution failed"
                ),
                _ => warn!(
                    trip_id = request.trip_id,
                    passenger_id = request.passenger_id,
                    error = %err,
                    "payment rejected at persistence"
                ),
            }
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, Fixture};
    use crate::trips::TripRequest;
    use hourglass_rs::SafeTimeProvider;

    fn completed_trip(engine: &mut RideEngine, f: &Fixture, time: &SafeTimeProvider, driver: UserId) -> TripId {
        let trip = engine
            .create_trip(TripRequest::new(f.passenger, f.downtown, f.airport).with_driver(driver), time)
            .unwrap();
        engine.complete_trip(trip.trip_id, time).unwrap();
        trip.trip_id
    }

    #[test]
    fn test_payment_for_owned_vehicle() {
        let (mut engine, f, time) = fixture();
        let trip_id = completed_trip(&mut engine, &f, &time, f.driver);
        let cost = engine.store.trip(trip_id).unwrap().cost;

        let payment = engine
            .register_payment(PaymentRequest::new(trip_id, " Card ", f.passenger), &time)
            .unwrap();

        assert_eq!(payment.amount, cost);
        assert_eq!(payment.method, PaymentMethod::Card);
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.payment_date, time.now());
        assert_eq!(payment.owner_id, Some(f.owner));
        assert!(payment.reference.starts_with("PAY-"));
        assert!(payment.distribution.owner_share.is_positive());
        assert_eq!(payment.distribution.total(), cost);
        assert_eq!(engine.store.payment_for_trip(trip_id), Some(&payment));
    }

    #[test]
    fn test_payment_without_owner() {
        let (mut engine, f, time) = fixture();
        let trip_id = completed_trip(&mut engine, &f, &time, f.second_driver);

        let payment = engine
            .register_payment(PaymentRequest::new(trip_id, "cash", f.passenger), &time)
            .unwrap();

        assert_eq!(payment.owner_id, None);
        assert_eq!(payment.distribution.owner_share, Money::ZERO);
        assert_eq!(
            payment.distribution.admin_share + payment.distribution.driver_share,
            payment.amount
        );
    }

    #[test]
    fn test_payment_issued_once() {
        let (mut engine, f, time) = fixture();
        let trip_id = completed_trip(&mut engine, &f, &time, f.driver);

        engine
            .register_payment(PaymentRequest::new(trip_id, "transfer", f.passenger), &time)
            .unwrap();
        let err = engine
            .register_payment(PaymentRequest::new(trip_id, "transfer", f.passenger), &time)
            .unwrap_err();

        assert_eq!(err, RideError::PaymentAlreadyExists { trip_id });
        assert!(err.to_string().contains("already has a registered payment"));
        assert_eq!(engine.store.payments().count(), 1);
    }

    #[test]
    fn test_payment_preconditions() {
        let (mut engine, f, time) = fixture();

        let err = engine
            .register_payment(PaymentRequest::new(0, "cash", f.passenger), &time)
            .unwrap_err();
        assert_eq!(err, RideError::InvalidTripId { id: 0 });

        let err = engine
            .register_payment(PaymentRequest::new(1, "   ", f.passenger), &time)
            .unwrap_err();
        assert_eq!(err, RideError::PaymentMethodRequired);

        let err = engine
            .register_payment(PaymentRequest::new(1, "voucher", f.passenger), &time)
            .unwrap_err();
        assert_eq!(err, RideError::InvalidPaymentMethod { value: "voucher".to_string() });

        let err = engine
            .register_payment(PaymentRequest::new(42, "cash", f.passenger), &time)
            .unwrap_err();
        assert_eq!(err, RideError::TripNotFound { id: 42 });

        let trip = engine
            .create_trip(TripRequest::new(f.passenger, f.downtown, f.airport).with_driver(f.driver), &time)
            .unwrap();
        let err = engine
            .register_payment(PaymentRequest::new(trip.trip_id, "cash", f.passenger), &time)
            .unwrap_err();
        assert_eq!(
            err,
            RideError::TripNotCompleted {
                id: trip.trip_id,
                status: TripStatus::InProgress,
            }
        );

        engine.complete_trip(trip.trip_id, &time).unwrap();
        let err = engine
            .register_payment(PaymentRequest::new(trip.trip_id, "cash", f.second_passenger), &time)
            .unwrap_err();
        assert_eq!(
            err,
            RideError::NotTripPassenger {
                trip_id: trip.trip_id,
                user_id: f.second_passenger,
            }
        );
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(engine.store.payments().count(), 0);
    }

    #[test]
    fn test_zero_cost_trip_rejected() {
        let (mut engine, f, time) = fixture();
        let trip_id = completed_trip(&mut engine, &f, &time, f.driver);
        engine.store.trip_mut(trip_id).unwrap().cost = Money::ZERO;

        let err = engine
            .register_payment(PaymentRequest::new(trip_id, "cash", f.passenger), &time)
            .unwrap_err();
        assert_eq!(
            err,
            RideError::InvalidCost {
                trip_id,
                cost: Money::ZERO,
            }
        );
    }

    #[test]
    fn test_payment_event() {
        let (mut engine, f, time) = fixture();
        let trip_id = completed_trip(&mut engine, &f, &time, f.driver);
        engine.take_events();

        let payment = engine
            .register_payment(PaymentRequest::new(trip_id, "cash", f.passenger), &time)
            .unwrap();

        let events = engine.take_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::PaymentRegistered { payment_id, distribution, .. } => {
                assert_eq!(*payment_id, payment.id);
                assert_eq!(*distribution, payment.distribution);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_persist_keeps_client_errors() {
        let (mut engine, f, time) = fixture();
        let trip_id = completed_trip(&mut engine, &f, &time, f.driver);
        let request = PaymentRequest::new(trip_id, "cash", f.passenger);

        engine.register_payment(request.clone(), &time).unwrap();

        // a payment that lands between validation and persistence
        let err = engine
            .persist_payment(&request, PaymentMethod::Cash, true, time.now())
            .unwrap_err();
        assert_eq!(err, RideError::PaymentAlreadyExists { trip_id });
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.client_message(), format!("trip {trip_id} already has a registered payment"));
        assert_eq!(engine.store.payments().count(), 1);
    }

    #[test]
    fn test_persist_wraps_distribution_failure() {
        let (mut engine, f, time) = fixture();
        let trip_id = completed_trip(&mut engine, &f, &time, f.driver);
        engine.store.trip_mut(trip_id).unwrap().cost = Money::ZERO;

        let err = engine
            .persist_payment(&PaymentRequest::new(trip_id, "cash", f.passenger), PaymentMethod::Cash, true, time.now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.client_message(), "internal error");
        assert_eq!(engine.store.payments().count(), 0);
    }

    #[test]
    fn test_parse_payment_method() {
        assert_eq!(parse_payment_method("CASH"), Ok(PaymentMethod::Cash));
        assert_eq!(parse_payment_method(""), Err(RideError::PaymentMethodRequired));
        assert!(parse_payment_method("cheque").is_err());
    }
}
