//! Shared fixtures for unit tests.

use chrono::{TimeZone, Utc};
use hourglass_rs::{SafeTimeProvider, TimeSource};

use crate::engine::RideEngine;
use crate::types::{Coordinates, LocationId, Role, UserId, VehicleId};

/// ids of everything seeded by [`fixture`]
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fixture {
    pub passenger: UserId,
    pub second_passenger: UserId,
    pub driver: UserId,
    pub second_driver: UserId,
    pub driver_without_vehicle: UserId,
    pub owner: UserId,
    pub admin: UserId,
    /// driven by `driver`, owned by `owner`
    pub owned_vehicle: VehicleId,
    /// driven by `second_driver`, no owner
    pub unowned_vehicle: VehicleId,
    pub downtown: LocationId,
    pub airport: LocationId,
    pub stadium: LocationId,
}

/// standard engine seeded with users, vehicles and locations, clock frozen at 2024-01-01
pub(crate) fn fixture() -> (RideEngine, Fixture, SafeTimeProvider) {
    let mut engine = RideEngine::standard();
    let store = &mut engine.store;

    let passenger = store.insert_user("Lucia", Role::Passenger);
    let second_passenger = store.insert_user("Marta", Role::Passenger);
    let driver = store.insert_user("Ana", Role::Driver);
    let second_driver = store.insert_user("Sofia", Role::Driver);
    let driver_without_vehicle = store.insert_user("Elena", Role::Driver);
    let owner = store.insert_user("Carmen", Role::Owner);
    let admin = store.insert_user("Paula", Role::Admin);

    let owned_vehicle = store.insert_vehicle("ABC-123", Some(driver), Some(owner));
    let unowned_vehicle = store.insert_vehicle("XYZ-789", Some(second_driver), None);

    let downtown = store.insert_location("Downtown", Coordinates::new(4.6097, -74.0817));
    let airport = store.insert_location("Airport", Coordinates::new(4.7016, -74.1469));
    let stadium = store.insert_location("Stadium", Coordinates::new(4.6486, -74.0778));

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
    ));

    let fixture = Fixture {
        passenger,
        second_passenger,
        driver,
        second_driver,
        driver_without_vehicle,
        owner,
        admin,
        owned_vehicle,
        unowned_vehicle,
        downtown,
        airport,
        stadium,
    };

    (engine, fixture, time)
}
