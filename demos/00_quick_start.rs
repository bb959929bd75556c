/// quick start - request, complete and pay for one trip
use ride_hailing_rs::{Coordinates, PaymentRequest, RideEngine, Role, TripRequest};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ride_hailing_rs::telemetry::init("info")?;

    let mut engine = RideEngine::standard();

    // seed the store
    let passenger = engine.store.insert_user("Lucia", Role::Passenger);
    let driver = engine.store.insert_user("Ana", Role::Driver);
    let owner = engine.store.insert_user("Carmen", Role::Owner);
    engine.store.insert_vehicle("ABC-123", Some(driver), Some(owner));
    let downtown = engine.store.insert_location("Downtown", Coordinates::new(4.6097, -74.0817));
    let airport = engine.store.insert_location("Airport", Coordinates::new(4.7016, -74.1469));

    // request a trip, the first available driver is assigned
    let trip = engine.create_trip_now(TripRequest::new(passenger, downtown, airport))?;
    engine.complete_trip_now(trip.trip_id)?;

    // pay for it
    let payment = engine.register_payment_now(PaymentRequest::new(trip.trip_id, "card", passenger))?;

    println!("{}", trip.to_json_pretty()?);
    println!("{}", serde_json::to_string_pretty(&payment)?);

    Ok(())
}
