use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, RideError};
use crate::payments::PaymentRecord;
use crate::ratings::Rating;
use crate::trips::Trip;
use crate::types::{
    Coordinates, DriverStatus, LocationId, PaymentId, RatingId, Role, TripId, UserId, VehicleId,
};

/// platform user, only the fields the engine reads or writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub active: bool,
    /// `Some` only for drivers
    pub driver_status: Option<DriverStatus>,
    /// bumped on every driver status write
    pub version: u64,
}

impl User {
    pub fn is_driver(&self) -> bool {
        self.role == Role::Driver
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub plate: String,
    pub driver_id: Option<UserId>,
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub zone: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Default)]
struct Sequences {
    user: u64,
    vehicle: u64,
    location: u64,
    trip: u64,
    payment: u64,
    rating: u64,
}

fn next(seq: &mut u64) -> u64 {
    *seq += 1;
    *seq
}

/// in-memory relational store backing the engine
#[derive(Debug, Clone, Default)]
pub struct Store {
    users: BTreeMap<UserId, User>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    locations: BTreeMap<LocationId, Location>,
    trips: BTreeMap<TripId, Trip>,
    payments: BTreeMap<PaymentId, PaymentRecord>,
    ratings: BTreeMap<RatingId, Rating>,
    sequences: Sequences,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// run `op` as one unit of work; any error restores the store as it was
    pub fn transaction<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Store) -> Result<T>,
    {
        let checkpoint = self.clone();
        match op(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                *self = checkpoint;
                Err(err)
            }
        }
    }

    // users

    pub fn insert_user(&mut self, name: &str, role: Role) -> UserId {
        let id = next(&mut self.sequences.user);
        let driver_status = (role == Role::Driver).then_some(DriverStatus::Available);
        self.users.insert(
            id,
            User {
                id,
                name: name.to_string(),
                role,
                active: true,
                driver_status,
                version: 0,
            },
        );
        id
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn set_user_active(&mut self, id: UserId, active: bool) -> Result<()> {
        let user = self.users.get_mut(&id).ok_or(RideError::UserNotFound { id })?;
        user.active = active;
        Ok(())
    }

    /// compare-and-swap on a driver's status; the only write path for it
    pub fn set_driver_status(
        &mut self,
        driver_id: UserId,
        expected: DriverStatus,
        new_status: DriverStatus,
    ) -> Result<u64> {
        let user = self
            .users
            .get_mut(&driver_id)
            .ok_or(RideError::DriverNotFound { id: driver_id })?;

        let current = match user.driver_status {
            Some(status) if user.role == Role::Driver => status,
            _ => {
                return Err(RideError::WrongRole {
                    id: driver_id,
                    expected: Role::Driver,
                    actual: user.role,
                })
            }
        };

        if current != expected {
            return Err(RideError::DriverStatusConflict {
                expected,
                actual: current,
            });
        }

        user.driver_status = Some(new_status);
        user.version += 1;
        Ok(user.version)
    }

    // vehicles

    pub fn insert_vehicle(
        &mut self,
        plate: &str,
        driver_id: Option<UserId>,
        owner_id: Option<UserId>,
    ) -> VehicleId {
        let id = next(&mut self.sequences.vehicle);
        self.vehicles.insert(
            id,
            Vehicle {
                id,
                plate: plate.to_string(),
                driver_id,
                owner_id,
            },
        );
        id
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn vehicles_for_driver(&self, driver_id: UserId) -> impl Iterator<Item = &Vehicle> {
        self.vehicles
            .values()
            .filter(move |v| v.driver_id == Some(driver_id))
    }

    /// lowest-id vehicle assigned to the driver
    pub fn first_vehicle_for_driver(&self, driver_id: UserId) -> Option<&Vehicle> {
        self.vehicles_for_driver(driver_id).next()
    }

    // locations

    pub fn insert_location(&mut self, zone: &str, coordinates: Coordinates) -> LocationId {
        let id = next(&mut self.sequences.location);
        self.locations.insert(
            id,
            Location {
                id,
                zone: zone.to_string(),
                coordinates,
            },
        );
        id
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    // trips

    pub fn next_trip_id(&mut self) -> TripId {
        next(&mut self.sequences.trip)
    }

    pub fn insert_trip(&mut self, trip: Trip) {
        self.trips.insert(trip.id, trip);
    }

    pub fn trip(&self, id: TripId) -> Option<&Trip> {
        self.trips.get(&id)
    }

    pub(crate) fn trip_mut(&mut self, id: TripId) -> Option<&mut Trip> {
        self.trips.get_mut(&id)
    }

    pub fn trips(&self) -> impl Iterator<Item = &Trip> {
        self.trips.values()
    }

    /// the passenger's trip in pending, accepted or in progress, if any
    pub fn active_trip_for_passenger(&self, passenger_id: UserId) -> Option<&Trip> {
        self.trips
            .values()
            .find(|t| t.passenger_id == passenger_id && t.status.is_active())
    }

    pub fn trips_for_user(&self, user_id: UserId) -> impl Iterator<Item = &Trip> {
        self.trips
            .values()
            .filter(move |t| t.passenger_id == user_id || t.driver_id == user_id)
    }

    // payments

    pub fn next_payment_id(&mut self) -> PaymentId {
        next(&mut self.sequences.payment)
    }

    pub fn insert_payment(&mut self, payment: PaymentRecord) {
        self.payments.insert(payment.id, payment);
    }

    pub fn payment(&self, id: PaymentId) -> Option<&PaymentRecord> {
        self.payments.get(&id)
    }

    pub fn payment_for_trip(&self, trip_id: TripId) -> Option<&PaymentRecord> {
        self.payments.values().find(|p| p.trip_id == trip_id)
    }

    pub fn payments(&self) -> impl Iterator<Item = &PaymentRecord> {
        self.payments.values()
    }

    // ratings

    pub fn next_rating_id(&mut self) -> RatingId {
        next(&mut self.sequences.rating)
    }

    pub fn insert_rating(&mut self, rating: Rating) {
        self.ratings.insert(rating.id, rating);
    }

    pub fn rating_by(&self, trip_id: TripId, author_id: UserId) -> Option<&Rating> {
        self.ratings
            .values()
            .find(|r| r.trip_id == trip_id && r.author_id == author_id)
    }

    pub fn ratings_for_target(&self, target_id: UserId) -> impl Iterator<Item = &Rating> {
        self.ratings
            .values()
            .filter(move |r| r.target_id == target_id)
    }
}
