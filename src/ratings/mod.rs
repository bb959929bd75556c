use chrono::{DateTime, Duration, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::RatingPolicy;
use crate::engine::{DriverStatusChange, RideEngine};
use crate::errors::{Result, RideError};
use crate::events::Event;
use crate::state::Store;
use crate::types::{DriverStatus, RatingId, RatingStatus, TripId, TripStatus, UserId};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

/// a participant's rating of the other participant of a trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub trip_id: TripId,
    pub author_id: UserId,
    pub target_id: UserId,
    pub score: Option<u8>,
    pub comments: Option<String>,
    pub status: RatingStatus,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    /// score counted by averages and moderation
    pub fn rated_score(&self) -> Option<u8> {
        match self.status {
            RatingStatus::Rated => self.score,
            RatingStatus::NotRated => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingRequest {
    pub trip_id: TripId,
    pub author_id: UserId,
    pub score: u8,
    pub comments: Option<String>,
}

impl RatingRequest {
    pub fn new(trip_id: TripId, author_id: UserId, score: u8) -> Self {
        Self {
            trip_id,
            author_id,
            score,
            comments: None,
        }
    }

    pub fn with_comments(mut self, comments: &str) -> Self {
        let trimmed = comments.trim();
        self.comments = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }
}

/// result of evaluating the low-rating policy for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// below the threshold, or already blocked
    Unchanged { low_ratings: usize },
    /// driver forced offline
    DriverOffline { low_ratings: usize, previous: DriverStatus },
    /// non-driver deactivated
    Deactivated { low_ratings: usize },
}

impl BlockOutcome {
    pub fn is_blocked(&self) -> bool {
        !matches!(self, BlockOutcome::Unchanged { .. })
    }

    pub fn low_ratings(&self) -> usize {
        match *self {
            BlockOutcome::Unchanged { low_ratings }
            | BlockOutcome::DriverOffline { low_ratings, .. }
            | BlockOutcome::Deactivated { low_ratings } => low_ratings,
        }
    }
}

pub(crate) fn count_low_ratings(store: &Store, user_id: UserId, low_score_below: u8) -> usize {
    store
        .ratings_for_target(user_id)
        .filter_map(Rating::rated_score)
        .filter(|score| *score < low_score_below)
        .count()
}

/// apply the low-rating policy to `user_id` inside the caller's unit of work
pub(crate) fn apply_block(store: &mut Store, policy: &RatingPolicy, user_id: UserId) -> Result<BlockOutcome> {
    let low_ratings = count_low_ratings(store, user_id, policy.low_score_below);
    if low_ratings < policy.block_threshold {
        return Ok(BlockOutcome::Unchanged { low_ratings });
    }

    let (is_driver, driver_status, active) = store
        .user(user_id)
        .map(|u| (u.is_driver(), u.driver_status, u.active))
        .ok_or(RideError::UserNotFound { id: user_id })?;

    match (is_driver, driver_status) {
        (true, Some(DriverStatus::Offline)) => Ok(BlockOutcome::Unchanged { low_ratings }),
        (true, Some(previous)) => {
            store.set_driver_status(user_id, previous, DriverStatus::Offline)?;
            Ok(BlockOutcome::DriverOffline { low_ratings, previous })
        }
        _ if !active => Ok(BlockOutcome::Unchanged { low_ratings }),
        _ => {
            store.set_user_active(user_id, false)?;
            Ok(BlockOutcome::Deactivated { low_ratings })
        }
    }
}

impl RideEngine {
    pub fn create_rating_now(&mut self, request: RatingRequest) -> Result<Rating> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.create_rating(request, &time)
    }

    /// rate the other participant of a completed trip, then run the block policy on them
    pub fn create_rating(&mut self, request: RatingRequest, time_provider: &SafeTimeProvider) -> Result<Rating> {
        let now = time_provider.now();

        let target_id = self.validate_rating(&request, now).map_err(|err| {
            warn!(
                trip_id = request.trip_id,
                author_id = request.author_id,
                error = %err,
                "rating rejected"
            );
            err
        })?;

        let policy = self.config.rating_policy.clone();
        let (rating, outcome) = self.store.transaction(|tx| {
            let rating = Rating {
                id: tx.next_rating_id(),
                trip_id: request.trip_id,
                author_id: request.author_id,
                target_id,
                score: Some(request.score),
                comments: request.comments.clone(),
                status: RatingStatus::Rated,
                created_at: now,
            };
            tx.insert_rating(rating.clone());

            let outcome = apply_block(tx, &policy, target_id)?;
            Ok((rating, outcome))
        })?;

        info!(
            rating_id = rating.id,
            trip_id = rating.trip_id,
            author_id = rating.author_id,
            target_id,
            score = request.score,
            "rating submitted"
        );

        self.events.emit(Event::RatingSubmitted {
            rating_id: rating.id,
            trip_id: rating.trip_id,
            author_id: rating.author_id,
            target_id,
            score: request.score,
            timestamp: now,
        });
        self.publish_block(target_id, outcome, now);

        Ok(rating)
    }

    /// evaluate the low-rating policy for `user_id` outside of a rating submission
    pub fn block_user(&mut self, user_id: UserId, time_provider: &SafeTimeProvider) -> Result<BlockOutcome> {
        if self.store.user(user_id).is_none() {
            return Err(RideError::UserNotFound { id: user_id });
        }

        let policy = self.config.rating_policy.clone();
        let outcome = self.store.transaction(|tx| apply_block(tx, &policy, user_id))?;
        self.publish_block(user_id, outcome, time_provider.now());

        Ok(outcome)
    }

    /// arithmetic mean of rated scores received; zero when there are none
    pub fn user_average(&self, user_id: UserId) -> Decimal {
        let (sum, count) = self
            .store
            .ratings_for_target(user_id)
            .filter_map(Rating::rated_score)
            .fold((0u64, 0u64), |(sum, count), score| (sum + u64::from(score), count + 1));

        if count == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(sum) / Decimal::from(count)
    }

    /// checks in order; returns the rating target
    fn validate_rating(&self, request: &RatingRequest, now: DateTime<Utc>) -> Result<UserId> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&request.score) {
            return Err(RideError::InvalidScore { score: request.score });
        }

        let trip = self
            .store
            .trip(request.trip_id)
            .ok_or(RideError::TripNotFound { id: request.trip_id })?;

        let completed_at = match (trip.status, trip.completed_at) {
            (TripStatus::Completed, Some(at)) => at,
            _ => {
                return Err(RideError::TripNotCompleted {
                    id: trip.id,
                    status: trip.status,
                })
            }
        };

        let target_id = trip
            .counterpart_of(request.author_id)
            .ok_or(RideError::NotTripParticipant {
                trip_id: trip.id,
                user_id: request.author_id,
            })?;

        if self.store.rating_by(trip.id, request.author_id).is_some() {
            return Err(RideError::AlreadyRated {
                trip_id: trip.id,
                author_id: request.author_id,
            });
        }

        let window_hours = self.config.rating_policy.window_hours;
        if now - completed_at > Duration::hours(window_hours) {
            return Err(RideError::RatingWindowExpired {
                trip_id: trip.id,
                window_hours,
            });
        }

        Ok(target_id)
    }

    fn publish_block(&mut self, user_id: UserId, outcome: BlockOutcome, timestamp: DateTime<Utc>) {
        let driver_offline = match outcome {
            BlockOutcome::Unchanged { .. } => return,
            BlockOutcome::DriverOffline { previous, .. } => {
                self.publish_driver_change(
                    DriverStatusChange {
                        driver_id: user_id,
                        old_status: previous,
                        new_status: DriverStatus::Offline,
                    },
                    "low ratings",
                    timestamp,
                );
                true
            }
            BlockOutcome::Deactivated { .. } => false,
        };

        warn!(
            user_id,
            low_ratings = outcome.low_ratings(),
            driver_offline,
            "user blocked by rating policy"
        );

        self.events.emit(Event::UserBlocked {
            user_id,
            low_ratings: outcome.low_ratings(),
            driver_offline,
            timestamp,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, Fixture};
    use crate::trips::TripRequest;
    use crate::types::Role;
    use rust_decimal_macros::dec;

    fn completed_trip(engine: &mut RideEngine, f: &Fixture, time: &SafeTimeProvider, passenger: UserId) -> TripId {
        let trip = engine
            .create_trip(TripRequest::new(passenger, f.downtown, f.airport).with_driver(f.driver), time)
            .unwrap();
        engine.complete_trip(trip.trip_id, time).unwrap();
        trip.trip_id
    }

    #[test]
    fn test_passenger_rates_driver() {
        let (mut engine, f, time) = fixture();
        let trip_id = completed_trip(&mut engine, &f, &time, f.passenger);

        let rating = engine
            .create_rating(RatingRequest::new(trip_id, f.passenger, 5).with_comments("  smooth ride "), &time)
            .unwrap();

        assert_eq!(rating.target_id, f.driver);
        assert_eq!(rating.status, RatingStatus::Rated);
        assert_eq!(rating.comments.as_deref(), Some("smooth ride"));
        assert_eq!(engine.store.rating_by(trip_id, f.passenger), Some(&rating));
    }

    #[test]
    fn test_driver_rates_passenger() {
        let (mut engine, f, time) = fixture();
        let trip_id = completed_trip(&mut engine, &f, &time, f.passenger);

        let rating = engine
            .create_rating(RatingRequest::new(trip_id, f.driver, 4), &time)
            .unwrap();
        assert_eq!(rating.target_id, f.passenger);
    }

    #[test]
    fn test_rating_preconditions() {
        let (mut engine, f, time) = fixture();

        assert_eq!(
            engine.create_rating(RatingRequest::new(1, f.passenger, 6), &time),
            Err(RideError::InvalidScore { score: 6 })
        );
        assert_eq!(
            engine.create_rating(RatingRequest::new(1, f.passenger, 0), &time),
            Err(RideError::InvalidScore { score: 0 })
        );
        assert_eq!(
            engine.create_rating(RatingRequest::new(99, f.passenger, 3), &time),
            Err(RideError::TripNotFound { id: 99 })
        );

        let trip = engine
            .create_trip(TripRequest::new(f.passenger, f.downtown, f.airport).with_driver(f.driver), &time)
            .unwrap();
        assert!(matches!(
            engine.create_rating(RatingRequest::new(trip.trip_id, f.passenger, 3), &time),
            Err(RideError::TripNotCompleted { .. })
        ));

        engine.complete_trip(trip.trip_id, &time).unwrap();
        assert_eq!(
            engine.create_rating(RatingRequest::new(trip.trip_id, f.second_passenger, 3), &time),
            Err(RideError::NotTripParticipant {
                trip_id: trip.trip_id,
                user_id: f.second_passenger,
            })
        );

        engine
            .create_rating(RatingRequest::new(trip.trip_id, f.passenger, 3), &time)
            .unwrap();
        assert_eq!(
            engine.create_rating(RatingRequest::new(trip.trip_id, f.passenger, 2), &time),
            Err(RideError::AlreadyRated {
                trip_id: trip.trip_id,
                author_id: f.passenger,
            })
        );
    }

    #[test]
    fn test_canceled_trip_cannot_be_rated() {
        let (mut engine, f, time) = fixture();
        let trip = engine
            .create_trip(TripRequest::new(f.passenger, f.downtown, f.airport).with_driver(f.driver), &time)
            .unwrap();
        engine.cancel_trip(trip.trip_id, &time).unwrap();

        assert_eq!(
            engine.create_rating(RatingRequest::new(trip.trip_id, f.passenger, 1), &time),
            Err(RideError::TripNotCompleted {
                id: trip.trip_id,
                status: TripStatus::Canceled,
            })
        );
    }

    #[test]
    fn test_rating_window() {
        let (mut engine, f, time) = fixture();
        let control = time.test_control().unwrap();
        let trip_id = completed_trip(&mut engine, &f, &time, f.passenger);

        control.advance(Duration::hours(24));
        engine
            .create_rating(RatingRequest::new(trip_id, f.passenger, 5), &time)
            .unwrap();

        control.advance(Duration::hours(1));
        assert_eq!(
            engine.create_rating(RatingRequest::new(trip_id, f.driver, 5), &time),
            Err(RideError::RatingWindowExpired {
                trip_id,
                window_hours: 24,
            })
        );
    }

    #[test]
    fn test_user_average() {
        let (mut engine, f, time) = fixture();
        assert_eq!(engine.user_average(f.driver), Decimal::ZERO);

        for score in [5, 3, 4] {
            let trip_id = completed_trip(&mut engine, &f, &time, f.passenger);
            engine
                .create_rating(RatingRequest::new(trip_id, f.passenger, score), &time)
                .unwrap();
        }
        assert_eq!(engine.user_average(f.driver), dec!(4));

        let trip_id = completed_trip(&mut engine, &f, &time, f.passenger);
        engine
            .create_rating(RatingRequest::new(trip_id, f.passenger, 5), &time)
            .unwrap();
        assert_eq!(engine.user_average(f.driver), dec!(4.25));
    }

    #[test]
    fn test_user_average_is_not_rounded() {
        let (mut engine, f, time) = fixture();

        for score in [5, 4, 4] {
            let trip_id = completed_trip(&mut engine, &f, &time, f.passenger);
            engine
                .create_rating(RatingRequest::new(trip_id, f.passenger, score), &time)
                .unwrap();
        }

        let average = engine.user_average(f.driver);
        assert_eq!(average, dec!(13) / dec!(3));
        assert!(average > dec!(4.33));
    }

    #[test]
    fn test_four_low_ratings_leave_driver_available() {
        let (mut engine, f, time) = fixture();

        for _ in 0..4 {
            let trip_id = completed_trip(&mut engine, &f, &time, f.passenger);
            engine
                .create_rating(RatingRequest::new(trip_id, f.passenger, 2), &time)
                .unwrap();
        }

        let driver = engine.store.user(f.driver).unwrap();
        assert_eq!(driver.driver_status, Some(DriverStatus::Available));
        assert!(driver.active);
        assert_eq!(
            engine.block_user(f.driver, &time).unwrap(),
            BlockOutcome::Unchanged { low_ratings: 4 }
        );
    }

    #[test]
    fn test_fifth_low_rating_takes_driver_offline() {
        let (mut engine, f, time) = fixture();

        for score in [1, 2, 1, 5, 2] {
            let trip_id = completed_trip(&mut engine, &f, &time, f.passenger);
            engine
                .create_rating(RatingRequest::new(trip_id, f.passenger, score), &time)
                .unwrap();
        }
        assert_eq!(
            engine.store.user(f.driver).unwrap().driver_status,
            Some(DriverStatus::Available)
        );

        let trip_id = completed_trip(&mut engine, &f, &time, f.passenger);
        engine.take_events();
        engine
            .create_rating(RatingRequest::new(trip_id, f.passenger, 1), &time)
            .unwrap();

        let driver = engine.store.user(f.driver).unwrap();
        assert_eq!(driver.driver_status, Some(DriverStatus::Offline));
        assert!(driver.active);

        let events = engine.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            Event::UserBlocked { user_id, low_ratings: 5, driver_offline: true, .. } if *user_id == f.driver
        )));

        // offline drivers are no longer assignable
        assert!(matches!(
            engine.create_trip(TripRequest::new(f.passenger, f.downtown, f.airport).with_driver(f.driver), &time),
            Err(RideError::DriverUnavailable { .. })
        ));
    }

    #[test]
    fn test_low_ratings_deactivate_passenger() {
        let (mut engine, f, time) = fixture();

        for _ in 0..5 {
            let trip_id = completed_trip(&mut engine, &f, &time, f.passenger);
            engine
                .create_rating(RatingRequest::new(trip_id, f.driver, 1), &time)
                .unwrap();
        }

        let passenger = engine.store.user(f.passenger).unwrap();
        assert_eq!(passenger.role, Role::Passenger);
        assert!(!passenger.active);
        assert_eq!(
            engine.create_trip(TripRequest::new(f.passenger, f.downtown, f.airport), &time),
            Err(RideError::InactiveUser { id: f.passenger })
        );

        // a second evaluation is a no-op
        assert_eq!(
            engine.block_user(f.passenger, &time).unwrap(),
            BlockOutcome::Unchanged { low_ratings: 5 }
        );
    }

    #[test]
    fn test_block_unknown_user() {
        let (mut engine, _, time) = fixture();
        assert_eq!(
            engine.block_user(404, &time),
            Err(RideError::UserNotFound { id: 404 })
        );
    }
}
