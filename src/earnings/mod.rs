use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PaginationConfig;
use crate::decimal::Money;
use crate::engine::RideEngine;
use crate::errors::{Result, RideError};
use crate::payments::PaymentRecord;
use crate::types::{PaymentId, PaymentMethod, PaymentStatus, Role, TripId, UserId};

/// authenticated caller of an earnings query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: UserId,
    pub role: Role,
}

impl Requester {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// which share of a payment a requester is entitled to see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningsView {
    Driver,
    Owner,
    Admin,
}

impl TryFrom<Role> for EarningsView {
    type Error = RideError;

    fn try_from(role: Role) -> Result<Self> {
        match role {
            Role::Driver => Ok(EarningsView::Driver),
            Role::Owner => Ok(EarningsView::Owner),
            Role::Admin => Ok(EarningsView::Admin),
            Role::Passenger => Err(RideError::ForbiddenRole { role }),
        }
    }
}

impl EarningsView {
    pub fn project(self, user_id: UserId, payment: &PaymentRecord) -> Option<EarningsEntry> {
        match self {
            EarningsView::Driver => project_driver(user_id, payment),
            EarningsView::Owner => project_owner(user_id, payment),
            EarningsView::Admin => Some(project_admin(payment)),
        }
    }
}

fn entry(payment: &PaymentRecord, amount: Money) -> EarningsEntry {
    EarningsEntry {
        trip_id: payment.trip_id,
        payment_id: payment.id,
        amount,
        date: payment.payment_date,
        status: payment.status,
        method: payment.method,
    }
}

fn project_driver(driver_id: UserId, payment: &PaymentRecord) -> Option<EarningsEntry> {
    (payment.driver_id == driver_id).then(|| entry(payment, payment.distribution.driver_share))
}

fn project_owner(owner_id: UserId, payment: &PaymentRecord) -> Option<EarningsEntry> {
    (payment.owner_id == Some(owner_id)).then(|| entry(payment, payment.distribution.owner_share))
}

fn project_admin(payment: &PaymentRecord) -> EarningsEntry {
    entry(payment, payment.distribution.admin_share)
}

/// inclusive payment-date bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

fn parse_bound(value: &str, bound: Bound) -> Result<DateTime<Utc>> {
    let value = value.trim();
    let invalid = || RideError::InvalidDate {
        value: value.to_string(),
    };

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let naive = match bound {
            Bound::Start => date.and_hms_opt(0, 0, 0),
            Bound::End => date.and_hms_milli_opt(23, 59, 59, 999),
        }
        .ok_or_else(invalid)?;
        return Ok(Utc.from_utc_datetime(&naive));
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid())
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(RideError::InvalidDateRange {
                message: format!("from {} is after to {}", from, to),
            });
        }
        Ok(Self { from, to })
    }

    /// both bounds or neither; `YYYY-MM-DD` covers the whole day
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Option<Self>> {
        match (from, to) {
            (None, None) => Ok(None),
            (Some(from), Some(to)) => {
                let from = parse_bound(from, Bound::Start)?;
                let to = parse_bound(to, Bound::End)?;
                Self::new(from, to).map(Some)
            }
            _ => Err(RideError::InvalidDateRange {
                message: "both from and to are required when filtering by date".to_string(),
            }),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }
}

/// page and limit after clamping; only built through [`Pagination::clamped`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Pagination {
    /// out-of-range values are clamped, never rejected
    pub fn clamped(page: Option<i64>, limit: Option<i64>, config: &PaginationConfig) -> Self {
        let page = match page {
            Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
            Some(_) => 1,
            None => config.default_page.max(1),
        };

        let limit = match limit {
            Some(l) if l < 1 => config.default_limit,
            Some(l) => u32::try_from(l).unwrap_or(u32::MAX).min(config.max_limit),
            None => config.default_limit,
        };

        Self { page, limit }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> usize {
        (self.page as usize)
            .saturating_sub(1)
            .saturating_mul(self.limit as usize)
    }
}

/// optional filters of an earnings or summary query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EarningsFilter {
    pub range: Option<DateRange>,
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl EarningsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// build from raw query parameters
    pub fn from_query(
        from: Option<&str>,
        to: Option<&str>,
        status: Option<&str>,
        method: Option<&str>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Self> {
        let status = status
            .map(|s| {
                s.parse::<PaymentStatus>().map_err(|_| RideError::InvalidFilter {
                    message: format!("unknown payment status: {}", s.trim()),
                })
            })
            .transpose()?;

        let method = method
            .map(|m| {
                m.parse::<PaymentMethod>().map_err(|_| RideError::InvalidFilter {
                    message: format!("unknown payment method: {}", m.trim()),
                })
            })
            .transpose()?;

        Ok(Self {
            range: DateRange::parse(from, to)?,
            status,
            method,
            page,
            limit,
        })
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_page(mut self, page: i64, limit: i64) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, payment: &PaymentRecord) -> bool {
        self.range.map_or(true, |r| r.contains(payment.payment_date))
            && self.status.map_or(true, |s| s == payment.status)
            && self.method.map_or(true, |m| m == payment.method)
    }
}

/// one payment as seen by a requester, amount is their share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsEntry {
    pub trip_id: TripId,
    pub payment_id: PaymentId,
    pub amount: Money,
    pub date: DateTime<Utc>,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsPage {
    pub items: Vec<EarningsEntry>,
    pub page: u32,
    pub limit: u32,
    pub total_items: usize,
    pub total_pages: usize,
    /// sum over all matching entries, not only this page
    pub total_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodTotal {
    pub method: PaymentMethod,
    pub count: usize,
    pub amount: Money,
}

/// platform-wide totals over the filtered payments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentsSummary {
    pub payment_count: usize,
    pub total_amount: Money,
    pub admin_total: Money,
    pub driver_total: Money,
    pub owner_total: Money,
    pub by_method: Vec<MethodTotal>,
}

impl PaymentsSummary {
    fn from_payments<'a>(payments: impl Iterator<Item = &'a PaymentRecord>) -> Self {
        let mut summary = PaymentsSummary {
            payment_count: 0,
            total_amount: Money::ZERO,
            admin_total: Money::ZERO,
            driver_total: Money::ZERO,
            owner_total: Money::ZERO,
            by_method: PaymentMethod::ALL
                .into_iter()
                .map(|method| MethodTotal {
                    method,
                    count: 0,
                    amount: Money::ZERO,
                })
                .collect(),
        };

        for payment in payments {
            summary.payment_count += 1;
            summary.total_amount += payment.amount;
            summary.admin_total += payment.distribution.admin_share;
            summary.driver_total += payment.distribution.driver_share;
            summary.owner_total += payment.distribution.owner_share;

            if let Some(bucket) = summary.by_method.iter_mut().find(|b| b.method == payment.method) {
                bucket.count += 1;
                bucket.amount += payment.amount;
            }
        }

        summary
    }
}

impl RideEngine {
    /// the requester's own share of each matching payment, newest first
    pub fn earnings(&self, requester: Requester, filter: &EarningsFilter) -> Result<EarningsPage> {
        let view = EarningsView::try_from(requester.role).map_err(|err| {
            warn!(user_id = requester.user_id, role = ?requester.role, "earnings query forbidden");
            err
        })?;
        let pagination = Pagination::clamped(filter.page, filter.limit, &self.config.pagination);

        let mut entries: Vec<EarningsEntry> = self
            .store
            .payments()
            .filter(|p| filter.matches(p))
            .filter_map(|p| view.project(requester.user_id, p))
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.payment_id.cmp(&a.payment_id)));

        let total_items = entries.len();
        let total_amount: Money = entries.iter().map(|e| e.amount).sum();
        let limit = pagination.limit.max(1) as usize;
        let total_pages = (total_items + limit - 1) / limit;

        let items = entries
            .into_iter()
            .skip(pagination.offset())
            .take(limit)
            .collect();

        debug!(
            user_id = requester.user_id,
            view = ?view,
            total_items,
            page = pagination.page,
            "earnings query"
        );

        Ok(EarningsPage {
            items,
            page: pagination.page,
            limit: pagination.limit,
            total_items,
            total_pages,
            total_amount,
        })
    }

    /// unscoped aggregate over all matching payments; admins only
    pub fn payments_summary(&self, requester: Requester, filter: &EarningsFilter) -> Result<PaymentsSummary> {
        if requester.role != Role::Admin {
            warn!(user_id = requester.user_id, role = ?requester.role, "payments summary forbidden");
            return Err(RideError::ForbiddenRole { role: requester.role });
        }

        Ok(PaymentsSummary::from_payments(
            self.store.payments().filter(|p| filter.matches(p)),
        ))
    }
}
