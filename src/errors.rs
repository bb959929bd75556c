use thiserror::Error;

use crate::decimal::Money;
use crate::types::{DriverStatus, LocationId, Role, TripId, TripStatus, UserId};

/// caller-facing classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// referenced entity does not exist
    NotFound,
    /// well-formed request that breaks a business rule
    Validation,
    /// actor is not the authorised party
    Forbidden,
    /// invariant violation, never the caller's fault
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RideError {
    // not found
    #[error("passenger not found: {id}")]
    PassengerNotFound {
        id: UserId,
    },

    #[error("driver not found: {id}")]
    DriverNotFound {
        id: UserId,
    },

    #[error("user not found: {id}")]
    UserNotFound {
        id: UserId,
    },

    #[error("location not found: {id}")]
    LocationNotFound {
        id: LocationId,
    },

    #[error("trip not found: {id}")]
    TripNotFound {
        id: TripId,
    },

    // validation
    #[error("user {id} is not active")]
    InactiveUser {
        id: UserId,
    },

    #[error("user {id} has role {actual:?}, expected {expected:?}")]
    WrongRole {
        id: UserId,
        expected: Role,
        actual: Role,
    },

    #[error("driver {id} is not available: current status is {status:?}")]
    DriverUnavailable {
        id: UserId,
        status: DriverStatus,
    },

    #[error("no driver is available")]
    NoDriverAvailable,

    #[error("driver {driver_id} has no assigned vehicle")]
    NoVehicleAssigned {
        driver_id: UserId,
    },

    #[error("origin and destination must be different locations")]
    SameOriginDestination,

    #[error("passenger {passenger_id} already has an active trip: {trip_id}")]
    ActiveTripExists {
        passenger_id: UserId,
        trip_id: TripId,
    },

    #[error("driver status changed concurrently: expected {expected:?}, found {actual:?}")]
    DriverStatusConflict {
        expected: DriverStatus,
        actual: DriverStatus,
    },

    #[error("trip {id} is already canceled")]
    TripAlreadyCanceled {
        id: TripId,
    },

    #[error("trip {id} is already completed")]
    TripAlreadyCompleted {
        id: TripId,
    },

    #[error("invalid trip transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: TripStatus,
        to: TripStatus,
    },

    #[error("invalid trip id: {id}")]
    InvalidTripId {
        id: TripId,
    },

    #[error("payment method is required")]
    PaymentMethodRequired,

    #[error("invalid payment method: {value} (allowed: cash, card, transfer)")]
    InvalidPaymentMethod {
        value: String,
    },

    #[error("trip {id} is not completed: current status is {status:?}")]
    TripNotCompleted {
        id: TripId,
        status: TripStatus,
    },

    #[error("trip {trip_id} already has a registered payment")]
    PaymentAlreadyExists {
        trip_id: TripId,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("trip {trip_id} has an invalid cost: {cost}")]
    InvalidCost {
        trip_id: TripId,
        cost: Money,
    },

    #[error("invalid score: {score} (must be between 1 and 5)")]
    InvalidScore {
        score: u8,
    },

    #[error("user {author_id} has already rated trip {trip_id}")]
    AlreadyRated {
        trip_id: TripId,
        author_id: UserId,
    },

    #[error("rating window of {window_hours} hours for trip {trip_id} has expired")]
    RatingWindowExpired {
        trip_id: TripId,
        window_hours: i64,
    },

    #[error("invalid date: {value}")]
    InvalidDate {
        value: String,
    },

    #[error("invalid date range: {message}")]
    InvalidDateRange {
        message: String,
    },

    #[error("invalid filter: {message}")]
    InvalidFilter {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    // forbidden
    #[error("user {user_id} is not the passenger of trip {trip_id}")]
    NotTripPassenger {
        trip_id: TripId,
        user_id: UserId,
    },

    #[error("user {user_id} is not a participant of trip {trip_id}")]
    NotTripParticipant {
        trip_id: TripId,
        user_id: UserId,
    },

    #[error("role {role:?} cannot query earnings")]
    ForbiddenRole {
        role: Role,
    },

    // internal
    #[error("distribution mismatch: allocated {allocated_cents} cents of {total_cents}")]
    DistributionMismatch {
        total_cents: i64,
        allocated_cents: i64,
    },

    #[error("internal error during {context}: {message}")]
    Internal {
        context: String,
        message: String,
    },
}

impl RideError {
    pub fn kind(&self) -> ErrorKind {
        use RideError::*;

        match self {
            PassengerNotFound { .. }
            | DriverNotFound { .. }
            | UserNotFound { .. }
            | LocationNotFound { .. }
            | TripNotFound { .. } => ErrorKind::NotFound,

            NotTripPassenger { .. } | NotTripParticipant { .. } | ForbiddenRole { .. } => {
                ErrorKind::Forbidden
            }

            DistributionMismatch { .. } | Internal { .. } => ErrorKind::Internal,

            _ => ErrorKind::Validation,
        }
    }

    /// message safe to hand back to a caller
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "internal error".to_string(),
            _ => self.to_string(),
        }
    }

    /// wrap an unexpected failure, keeping internal errors as they are
    pub fn internal(context: &str, source: RideError) -> RideError {
        if source.kind() == ErrorKind::Internal {
            return source;
        }
        RideError::Internal {
            context: context.to_string(),
            message: source.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RideError>;
