use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::errors::{Result, RideError};
use crate::events::{Event, EventStore};
use crate::pricing::FareCalculator;
use crate::state::{Store, User};
use crate::types::{DriverStatus, Role, UserId};

/// trip, payment and rating operations over one store
pub struct RideEngine {
    pub config: EngineConfig,
    pub store: Store,
    pub events: EventStore,
    pub(crate) fares: FareCalculator,
}

/// pending driver status change, applied inside a transaction and published after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DriverStatusChange {
    pub driver_id: UserId,
    pub old_status: DriverStatus,
    pub new_status: DriverStatus,
}

impl RideEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_store(config, Store::new())
    }

    /// engine over an existing store
    pub fn with_store(config: EngineConfig, store: Store) -> Result<Self> {
        config.validate()?;
        let fares = FareCalculator::new(&config.pricing);

        Ok(Self {
            config,
            store,
            events: EventStore::new(),
            fares,
        })
    }

    pub fn standard() -> Self {
        let config = EngineConfig::standard();
        let fares = FareCalculator::new(&config.pricing);

        Self {
            config,
            store: Store::new(),
            events: EventStore::new(),
            fares,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn fares(&self) -> &FareCalculator {
        &self.fares
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// active user holding `role`, checked in that order
    pub(crate) fn require_user(&self, id: UserId, role: Role) -> Result<&User> {
        let user = self.store.user(id).ok_or(match role {
            Role::Passenger => RideError::PassengerNotFound { id },
            Role::Driver => RideError::DriverNotFound { id },
            _ => RideError::UserNotFound { id },
        })?;

        if !user.active {
            return Err(RideError::InactiveUser { id });
        }

        if user.role != role {
            return Err(RideError::WrongRole {
                id,
                expected: role,
                actual: user.role,
            });
        }

        Ok(user)
    }

    pub(crate) fn publish_driver_change(
        &mut self,
        change: DriverStatusChange,
        reason: &str,
        timestamp: DateTime<Utc>,
    ) {
        info!(
            driver_id = change.driver_id,
            old_status = ?change.old_status,
            new_status = ?change.new_status,
            reason,
            "driver status changed"
        );

        self.events.emit(Event::DriverStatusChanged {
            driver_id: change.driver_id,
            old_status: change.old_status,
            new_status: change.new_status,
            reason: reason.to_string(),
            timestamp,
        });
    }
}

/// guarded `busy -> available` after a trip ends; other states are left alone
pub(crate) fn release_driver(store: &mut Store, driver_id: UserId) -> Result<Option<DriverStatusChange>> {
    let current = store
        .user(driver_id)
        .and_then(|u| u.driver_status)
        .ok_or(RideError::DriverNotFound { id: driver_id })?;

    if current != DriverStatus::Busy {
        warn!(driver_id, status = ?current, "driver not busy at trip end, status left unchanged");
        return Ok(None);
    }

    store.set_driver_status(driver_id, DriverStatus::Busy, DriverStatus::Available)?;

    Ok(Some(DriverStatusChange {
        driver_id,
        old_status: DriverStatus::Busy,
        new_status: DriverStatus::Available,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;

    #[test]
    fn test_engine_rejects_invalid_config() {
        let mut config = EngineConfig::standard();
        config.pricing.price_per_km = Money::ZERO;
        assert!(matches!(
            RideEngine::new(config),
            Err(RideError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_require_user_checks() {
        let mut engine = RideEngine::standard();
        let passenger = engine.store.insert_user("Lucia", Role::Passenger);
        let driver = engine.store.insert_user("Ana", Role::Driver);

        assert!(engine.require_user(passenger, Role::Passenger).is_ok());
        assert_eq!(
            engine.require_user(42, Role::Passenger).unwrap_err(),
            RideError::PassengerNotFound { id: 42 }
        );
        assert_eq!(
            engine.require_user(42, Role::Driver).unwrap_err(),
            RideError::DriverNotFound { id: 42 }
        );
        assert!(matches!(
            engine.require_user(driver, Role::Passenger),
            Err(RideError::WrongRole { .. })
        ));

        engine.store.set_user_active(passenger, false).unwrap();
        assert_eq!(
            engine.require_user(passenger, Role::Passenger).unwrap_err(),
            RideError::InactiveUser { id: passenger }
        );
    }

    #[test]
    fn test_release_driver_leaves_offline_driver() {
        let mut store = Store::new();
        let driver = store.insert_user("Ana", Role::Driver);
        store
            .set_driver_status(driver, DriverStatus::Available, DriverStatus::Offline)
            .unwrap();

        assert_eq!(release_driver(&mut store, driver).unwrap(), None);
        assert_eq!(store.user(driver).unwrap().driver_status, Some(DriverStatus::Offline));
    }
}
