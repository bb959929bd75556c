/// rating policy - averages, the rating window and automatic blocking
use chrono::{Duration, TimeZone, Utc};
use ride_hailing_rs::{
    Coordinates, RatingRequest, RideEngine, Role, SafeTimeProvider, TimeSource, TripRequest,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ride_hailing_rs::telemetry::init("info")?;

    println!("=== rating policy example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let mut engine = RideEngine::standard();
    let passenger = engine.store.insert_user("Lucia", Role::Passenger);
    let driver = engine.store.insert_user("Ana", Role::Driver);
    engine.store.insert_vehicle("XYZ-789", Some(driver), None);
    let home = engine.store.insert_location("Home", Coordinates::new(4.6097, -74.0817));
    let office = engine.store.insert_location("Office", Coordinates::new(4.6486, -74.0778));

    let ride = |engine: &mut RideEngine| -> Result<u64, Box<dyn std::error::Error>> {
        let trip = engine.create_trip(TripRequest::new(passenger, home, office), &time)?;
        engine.complete_trip(trip.trip_id, &time)?;
        Ok(trip.trip_id)
    };

    // a late rating is rejected
    let late = ride(&mut engine)?;
    controller.advance(Duration::hours(25));
    if let Err(err) = engine.create_rating(RatingRequest::new(late, passenger, 4), &time) {
        println!("late rating: {}", err);
    }

    // low scores accumulate until the driver is taken offline
    for score in [2, 1, 5, 2, 1, 2] {
        let trip_id = ride(&mut engine)?;
        engine.create_rating(RatingRequest::new(trip_id, passenger, score).with_comments("late pickup"), &time)?;
        let user = engine.store.user(driver).unwrap();
        println!(
            "rated {}: average {}, status {:?}",
            score,
            engine.user_average(driver),
            user.driver_status
        );
        if user.driver_status == Some(ride_hailing_rs::DriverStatus::Offline) {
            break;
        }
    }

    for event in engine.take_events().iter().rev().take(3) {
        println!("{:?}", event);
    }

    Ok(())
}
