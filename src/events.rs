use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Distance, Money};
use crate::payments::Distribution;
use crate::types::{
    DriverStatus, PaymentId, PaymentMethod, RatingId, TripId, TripStatus, UserId, VehicleId,
};

/// all events that can be emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // trip events
    TripRequested {
        trip_id: TripId,
        passenger_id: UserId,
        driver_id: UserId,
        vehicle_id: VehicleId,
        distance: Distance,
        cost: Money,
        timestamp: DateTime<Utc>,
    },
    TripCompleted {
        trip_id: TripId,
        driver_id: UserId,
        timestamp: DateTime<Utc>,
    },
    TripCanceled {
        trip_id: TripId,
        driver_id: UserId,
        previous_status: TripStatus,
        timestamp: DateTime<Utc>,
    },

    // driver events
    DriverStatusChanged {
        driver_id: UserId,
        old_status: DriverStatus,
        new_status: DriverStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentRegistered {
        payment_id: PaymentId,
        trip_id: TripId,
        amount: Money,
        method: PaymentMethod,
        distribution: Distribution,
        timestamp: DateTime<Utc>,
    },

    // rating events
    RatingSubmitted {
        rating_id: RatingId,
        trip_id: TripId,
        author_id: UserId,
        target_id: UserId,
        score: u8,
        timestamp: DateTime<Utc>,
    },
    UserBlocked {
        user_id: UserId,
        low_ratings: usize,
        driver_offline: bool,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
