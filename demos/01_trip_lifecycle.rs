/// trip lifecycle - driver status follows the trip through completion and cancellation
use chrono::{Duration, TimeZone, Utc};
use ride_hailing_rs::{
    Coordinates, Event, PaymentRequest, RideEngine, RideError, Role, SafeTimeProvider, TimeSource,
    TripRequest,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ride_hailing_rs::telemetry::init("info")?;

    println!("=== trip lifecycle example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let mut engine = RideEngine::standard();
    let passenger = engine.store.insert_user("Lucia", Role::Passenger);
    let driver = engine.store.insert_user("Ana", Role::Driver);
    engine.store.insert_vehicle("XYZ-789", Some(driver), None);
    let downtown = engine.store.insert_location("Downtown", Coordinates::new(4.6097, -74.0817));
    let stadium = engine.store.insert_location("Stadium", Coordinates::new(4.6486, -74.0778));

    // first trip is canceled
    let trip = engine.create_trip(TripRequest::new(passenger, downtown, stadium).with_driver(driver), &time)?;
    println!("trip {} requested: {} for ${}", trip.trip_id, trip.distance_km, trip.formatted_cost);
    println!("driver status: {:?}", engine.store.user(driver).unwrap().driver_status);

    // a second request while the first is active is rejected
    match engine.create_trip(TripRequest::new(passenger, stadium, downtown), &time) {
        Err(err @ RideError::ActiveTripExists { .. }) => println!("rejected: {}", err),
        other => println!("unexpected: {:?}", other.map(|t| t.trip_id)),
    }

    engine.cancel_trip(trip.trip_id, &time)?;
    println!("trip {} canceled", trip.trip_id);
    println!("driver status: {:?}", engine.store.user(driver).unwrap().driver_status);

    // second trip is completed and paid
    controller.advance(Duration::minutes(10));
    let trip = engine.create_trip(TripRequest::new(passenger, stadium, downtown), &time)?;
    controller.advance(Duration::minutes(25));
    let completed = engine.complete_trip(trip.trip_id, &time)?;
    println!("\ntrip {} completed at {}", completed.trip_id, completed.completed_at.unwrap().format("%H:%M"));

    let payment = engine.register_payment(PaymentRequest::new(trip.trip_id, "cash", passenger), &time)?;
    println!("payment {} of ${}", payment.reference, payment.amount.formatted());
    println!("  admin:  ${}", payment.distribution.admin_share);
    println!("  driver: ${}", payment.distribution.driver_share);
    println!("  owner:  ${}", payment.distribution.owner_share);

    // paying twice fails
    if let Err(err) = engine.register_payment(PaymentRequest::new(trip.trip_id, "cash", passenger), &time) {
        println!("second payment: {}", err.client_message());
    }

    println!("\nevents:");
    for event in engine.take_events() {
        match event {
            Event::DriverStatusChanged { old_status, new_status, reason, .. } => {
                println!("  driver {:?} -> {:?} ({})", old_status, new_status, reason)
            }
            other => println!("  {:?}", other),
        }
    }

    Ok(())
}
