pub mod lifecycle;

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::decimal::{Distance, Money};
use crate::engine::{release_driver, DriverStatusChange, RideEngine};
use crate::errors::{Result, RideError};
use crate::events::Event;
use crate::serialization::TripSummary;
use crate::types::{Coordinates, DriverStatus, LocationId, Role, TripId, TripStatus, UserId, VehicleId};

pub use lifecycle::{INITIAL_STATUS, TRANSITIONS};

/// trip record; distance and cost never change after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub passenger_id: UserId,
    pub driver_id: UserId,
    pub vehicle_id: VehicleId,
    pub origin_id: LocationId,
    pub destination_id: LocationId,
    pub distance: Distance,
    pub cost: Money,
    pub status: TripStatus,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Trip {
    /// move to `next`, stamping completion or cancellation time
    pub fn transition_to(&mut self, next: TripStatus, timestamp: DateTime<Utc>) -> Result<()> {
        self.status = self.status.transition(next)?;
        match next {
            TripStatus::Completed => self.completed_at = Some(timestamp),
            TripStatus::Canceled => self.canceled_at = Some(timestamp),
            _ => {}
        }
        Ok(())
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.passenger_id == user_id || self.driver_id == user_id
    }

    /// the participant on the other side of `user_id`
    pub fn counterpart_of(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.driver_id {
            Some(self.passenger_id)
        } else if user_id == self.passenger_id {
            Some(self.driver_id)
        } else {
            None
        }
    }
}

/// trip request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripRequest {
    pub passenger_id: UserId,
    /// `None` lets the engine pick the first available driver
    pub driver_id: Option<UserId>,
    pub origin_id: LocationId,
    pub destination_id: LocationId,
}

impl TripRequest {
    pub fn new(passenger_id: UserId, origin_id: LocationId, destination_id: LocationId) -> Self {
        Self {
            passenger_id,
            driver_id: None,
            origin_id,
            destination_id,
        }
    }

    pub fn with_driver(mut self, driver_id: UserId) -> Self {
        self.driver_id = Some(driver_id);
        self
    }
}

/// resolved driver, vehicle and endpoints of a valid request
struct Assignment {
    driver_id: UserId,
    vehicle_id: VehicleId,
    origin: Coordinates,
    destination: Coordinates,
}

impl RideEngine {
    /// request trip with system time
    pub fn create_trip_now(&mut self, request: TripRequest) -> Result<TripSummary> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.create_trip(request, &time)
    }

    /// validate the request, price it, persist the trip and mark the driver busy
    pub fn create_trip(
        &mut self,
        request: TripRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<TripSummary> {
        let now = time_provider.now();

        let Assignment {
            driver_id,
            vehicle_id,
            origin,
            destination,
        } = self.validate_trip_request(&request).map_err(|err| {
            warn!(passenger_id = request.passenger_id, error = %err, "trip request rejected");
            err
        })?;
        let quote = self.fares.quote(origin, destination);

        let trip_id = self.store.transaction(|tx| {
            let id = tx.next_trip_id();
            tx.insert_trip(Trip {
                id,
                passenger_id: request.passenger_id,
                driver_id,
                vehicle_id,
                origin_id: request.origin_id,
                destination_id: request.destination_id,
                distance: quote.distance,
                cost: quote.cost,
                status: INITIAL_STATUS,
                requested_at: now,
                completed_at: None,
                canceled_at: None,
            });
            tx.set_driver_status(driver_id, DriverStatus::Available, DriverStatus::Busy)?;
            Ok(id)
        })?;

        info!(
            trip_id,
            passenger_id = request.passenger_id,
            driver_id,
            vehicle_id,
            distance_km = %quote.distance.km(),
            cost = %quote.cost,
            "trip created"
        );

        self.events.emit(Event::TripRequested {
            trip_id,
            passenger_id: request.passenger_id,
            driver_id,
            vehicle_id,
            distance: quote.distance,
            cost: quote.cost,
            timestamp: now,
        });
        self.publish_driver_change(
            DriverStatusChange {
                driver_id,
                old_status: DriverStatus::Available,
                new_status: DriverStatus::Busy,
            },
            &format!("assigned to trip {}", trip_id),
            now,
        );

        self.trip_summary(trip_id)
    }

    pub fn complete_trip_now(&mut self, trip_id: TripId) -> Result<TripSummary> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.complete_trip(trip_id, &time)
    }

    pub fn cancel_trip_now(&mut self, trip_id: TripId) -> Result<TripSummary> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.cancel_trip(trip_id, &time)
    }

    /// mark an in-progress (or accepted) trip completed and free the driver
    pub fn complete_trip(
        &mut self,
        trip_id: TripId,
        time_provider: &SafeTimeProvider,
    ) -> Result<TripSummary> {
        self.finish_trip(trip_id, TripStatus::Completed, time_provider)
    }

    /// cancel a trip that has not reached a terminal state and free the driver
    pub fn cancel_trip(
        &mut self,
        trip_id: TripId,
        time_provider: &SafeTimeProvider,
    ) -> Result<TripSummary> {
        self.finish_trip(trip_id, TripStatus::Canceled, time_provider)
    }

    pub fn trip_summary(&self, trip_id: TripId) -> Result<TripSummary> {
        let trip = self
            .store
            .trip(trip_id)
            .ok_or(RideError::TripNotFound { id: trip_id })?;
        TripSummary::from_trip(trip, &self.store)
    }

    /// preconditions in order, first failure wins
    fn validate_trip_request(&self, request: &TripRequest) -> Result<Assignment> {
        self.require_user(request.passenger_id, Role::Passenger)?;

        let driver_id = match request.driver_id {
            Some(id) => {
                self.check_driver_eligible(id)?;
                id
            }
            None => self.first_available_driver()?,
        };

        let vehicle_id = self
            .store
            .first_vehicle_for_driver(driver_id)
            .map(|v| v.id)
            .ok_or(RideError::NoVehicleAssigned { driver_id })?;

        let origin = self
            .store
            .location(request.origin_id)
            .ok_or(RideError::LocationNotFound { id: request.origin_id })?
            .coordinates;
        let destination = self
            .store
            .location(request.destination_id)
            .ok_or(RideError::LocationNotFound { id: request.destination_id })?
            .coordinates;

        if request.origin_id == request.destination_id {
            return Err(RideError::SameOriginDestination);
        }

        if let Some(active) = self.store.active_trip_for_passenger(request.passenger_id) {
            return Err(RideError::ActiveTripExists {
                passenger_id: request.passenger_id,
                trip_id: active.id,
            });
        }

        Ok(Assignment {
            driver_id,
            vehicle_id,
            origin,
            destination,
        })
    }

    fn check_driver_eligible(&self, driver_id: UserId) -> Result<()> {
        let driver = self.require_user(driver_id, Role::Driver)?;

        match driver.driver_status {
            Some(DriverStatus::Available) => {}
            status => {
                return Err(RideError::DriverUnavailable {
                    id: driver_id,
                    status: status.unwrap_or(DriverStatus::Offline),
                })
            }
        }

        if self.store.first_vehicle_for_driver(driver_id).is_none() {
            return Err(RideError::NoVehicleAssigned { driver_id });
        }

        Ok(())
    }

    /// lowest-id driver that passes every eligibility check
    fn first_available_driver(&self) -> Result<UserId> {
        self.store
            .users()
            .filter(|u| u.is_driver())
            .map(|u| u.id)
            .find(|id| self.check_driver_eligible(*id).is_ok())
            .ok_or(RideError::NoDriverAvailable)
    }

    fn finish_trip(
        &mut self,
        trip_id: TripId,
        target: TripStatus,
        time_provider: &SafeTimeProvider,
    ) -> Result<TripSummary> {
        let now = time_provider.now();

        let trip = self
            .store
            .trip(trip_id)
            .ok_or(RideError::TripNotFound { id: trip_id })?;
        let previous_status = trip.status;
        let driver_id = trip.driver_id;

        match previous_status {
            TripStatus::Canceled => return Err(RideError::TripAlreadyCanceled { id: trip_id }),
            TripStatus::Completed => return Err(RideError::TripAlreadyCompleted { id: trip_id }),
            status => {
                status.transition(target)?;
            }
        }

        let change = self.store.transaction(|tx| {
            tx.trip_mut(trip_id)
                .ok_or(RideError::TripNotFound { id: trip_id })?
                .transition_to(target, now)?;
            release_driver(tx, driver_id)
        })?;

        match target {
            TripStatus::Completed => {
                info!(trip_id, driver_id, "trip completed");
                self.events.emit(Event::TripCompleted {
                    trip_id,
                    driver_id,
                    timestamp: now,
                });
            }
            _ => {
                info!(trip_id, driver_id, previous_status = ?previous_status, "trip canceled");
                self.events.emit(Event::TripCanceled {
                    trip_id,
                    driver_id,
                    previous_status,
                    timestamp: now,
                });
            }
        }

        if let Some(change) = change {
            self.publish_driver_change(change, &format!("trip {} ended", trip_id), now);
        }

        self.trip_summary(trip_id)
    }
}
