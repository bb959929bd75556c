/// earnings report - role-scoped earnings and the admin summary
use chrono::{Duration, TimeZone, Utc};
use ride_hailing_rs::{
    Coordinates, EarningsFilter, PaymentRequest, Requester, RideEngine, Role, SafeTimeProvider,
    TimeSource, TripRequest,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ride_hailing_rs::telemetry::init("info")?;

    println!("=== earnings report example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let mut engine = RideEngine::standard();
    let passenger = engine.store.insert_user("Lucia", Role::Passenger);
    let driver = engine.store.insert_user("Ana", Role::Driver);
    let owner = engine.store.insert_user("Carmen", Role::Owner);
    let admin = engine.store.insert_user("Paula", Role::Admin);
    engine.store.insert_vehicle("ABC-123", Some(driver), Some(owner));

    let stops = [
        engine.store.insert_location("Downtown", Coordinates::new(4.6097, -74.0817)),
        engine.store.insert_location("Airport", Coordinates::new(4.7016, -74.1469)),
        engine.store.insert_location("Stadium", Coordinates::new(4.6486, -74.0778)),
    ];

    // one paid trip per day for a week
    let methods = ["cash", "card", "transfer"];
    for day in 0..7 {
        let origin = stops[day % 3];
        let destination = stops[(day + 1) % 3];
        let trip = engine.create_trip(TripRequest::new(passenger, origin, destination), &time)?;
        engine.complete_trip(trip.trip_id, &time)?;
        engine.register_payment(PaymentRequest::new(trip.trip_id, methods[day % 3], passenger), &time)?;
        controller.advance(Duration::days(1));
    }

    let filter = EarningsFilter::from_query(Some("2024-05-02"), Some("2024-05-05"), None, None, Some(1), Some(3))?;

    for (label, requester) in [
        ("driver", Requester::new(driver, Role::Driver)),
        ("owner", Requester::new(owner, Role::Owner)),
        ("admin", Requester::new(admin, Role::Admin)),
    ] {
        let page = engine.earnings(requester, &filter)?;
        println!(
            "{} earnings: {} items over {} pages, total ${}",
            label,
            page.total_items,
            page.total_pages,
            page.total_amount.formatted()
        );
        for item in &page.items {
            println!("  trip {} on {}: ${} ({})", item.trip_id, item.date.format("%Y-%m-%d"), item.amount, item.method);
        }
    }

    // passengers have no earnings
    if let Err(err) = engine.earnings(Requester::new(passenger, Role::Passenger), &filter) {
        println!("\npassenger query: {}", err);
    }

    let summary = engine.payments_summary(Requester::new(admin, Role::Admin), &EarningsFilter::new())?;
    println!("\nplatform summary:");
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
