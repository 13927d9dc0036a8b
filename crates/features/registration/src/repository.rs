//! `SurrealDB` access for registrations and the seat configuration.

use crate::error::{RegistrationError, RegistrationErrorExt};
use crate::model::Registration;
use crate::query::SearchQuery;
use crate::validation::{NewRegistration, TotalSeats};
use chrono::{DateTime, SecondsFormat, Utc};
use evreg_database::Database;
use std::time::Duration;
use surrealdb::types::SurrealValue;
use tracing::{instrument, warn};

/// Admission statements run at most this many times when they lose a write race.
pub(crate) const ADMIT_ATTEMPTS: u32 = 10;
const ADMIT_BASE_DELAY_MS: u64 = 5;
const ADMIT_MAX_DELAY_MS: u64 = 200;

const NAME_FILTER: &str = "$needle = '' \
    OR string::contains(string::lowercase(first_name), $needle) \
    OR string::contains(string::lowercase(last_name), $needle)";

#[derive(Debug, SurrealValue)]
struct RegistrationRecord {
    id: String,
    first_name: String,
    last_name: String,
    phone_number: String,
    registered_at: String,
}

impl TryFrom<RegistrationRecord> for Registration {
    type Error = RegistrationError;

    fn try_from(record: RegistrationRecord) -> Result<Self, Self::Error> {
        let registered_at = DateTime::parse_from_rfc3339(&record.registered_at)
            .map_err(|e| RegistrationError::Internal {
                message: e.to_string().into(),
                context: Some(format!("Malformed registered_at on registration:{}", record.id).into()),
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id: record.id,
            first_name: record.first_name,
            last_name: record.last_name,
            phone_number: record.phone_number,
            registered_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct AdmissionRecord {
    outcome: String,
    registration: Option<RegistrationRecord>,
}

/// Result of an atomic admission attempt.
#[derive(Debug)]
pub(crate) enum Admission {
    Created(Registration),
    DuplicatePhone,
    CapacityExceeded,
}

/// Fixed-width so that string order in the store matches time order.
pub(crate) fn store_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Clone)]
pub(crate) struct RegistrationRepository {
    db: Database,
}

impl RegistrationRepository {
    pub(crate) const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Ensures the seat configuration, rejects duplicates and full events, then inserts.
    /// All of it runs in one store transaction; a transaction that loses a write
    /// race is run again, up to [`ADMIT_ATTEMPTS`] times in total.
    #[instrument(skip(self, registration), fields(phone_number = %registration.phone_number))]
    pub(crate) async fn admit(
        &self,
        registration: &NewRegistration,
        registered_at: DateTime<Utc>,
        default_seats: u32,
    ) -> Result<Admission, RegistrationError> {
        let mut attempt = 1;
        loop {
            match self.try_admit(registration, registered_at, default_seats).await {
                Err(e) if e.is_retryable() && attempt < ADMIT_ATTEMPTS => {
                    let delay = retry_delay(attempt);
                    warn!(attempt, ?delay, "Admission lost a write race, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(e) if e.is_retryable() => {
                    warn!(attempts = attempt, "Admission kept losing write races, giving up");
                    return Err(e);
                },
                outcome => return outcome,
            }
        }
    }

    async fn try_admit(
        &self,
        registration: &NewRegistration,
        registered_at: DateTime<Utc>,
        default_seats: u32,
    ) -> Result<Admission, RegistrationError> {
        let record = self
            .db
            .query(
                "RETURN fn::registration::admit(\
                    $first_name, $last_name, $phone_number, $registered_at, $default_seats)",
            )
            .bind(("first_name", registration.first_name.clone()))
            .bind(("last_name", registration.last_name.clone()))
            .bind(("phone_number", registration.phone_number.clone()))
            .bind(("registered_at", store_timestamp(registered_at)))
            .bind(("default_seats", i64::from(default_seats)))
            .await
            .context("Running admission")?
            .take::<Option<AdmissionRecord>>(0)
            .context("Reading admission outcome")?
            .ok_or(RegistrationError::Internal {
                message: "Admission returned nothing".into(),
                context: None,
            })?;

        match (record.outcome.as_str(), record.registration) {
            ("created", Some(created)) => Ok(Admission::Created(created.try_into()?)),
            ("duplicate_phone", _) => Ok(Admission::DuplicatePhone),
            ("capacity_exceeded", _) => Ok(Admission::CapacityExceeded),
            (outcome, _) => Err(RegistrationError::Internal {
                message: format!("Unexpected admission outcome '{outcome}'").into(),
                context: None,
            }),
        }
    }

    /// One page of matching registrations plus the total match count.
    #[instrument(skip(self))]
    pub(crate) async fn search(
        &self,
        query: &SearchQuery,
    ) -> Result<(Vec<Registration>, u64), RegistrationError> {
        let statement = format!(
            "SELECT record::id(id) AS id, first_name, last_name, phone_number, registered_at \
                FROM registration WHERE {NAME_FILTER} \
                ORDER BY {order} LIMIT $limit START $start;
            RETURN array::len((SELECT id FROM registration WHERE {NAME_FILTER}));",
            order = query.order_clause(),
        );

        let mut response = self
            .db
            .query(statement)
            .bind(("needle", query.needle.clone()))
            .bind(("limit", i64::from(query.limit)))
            .bind(("start", i64::try_from(query.start()).unwrap_or(i64::MAX)))
            .await
            .context("Searching registrations")?;

        let records =
            response.take::<Vec<RegistrationRecord>>(0).context("Reading registration page")?;
        let total = response
            .take::<Option<i64>>(1)
            .context("Reading registration count")?
            .unwrap_or_default();

        let registrations =
            records.into_iter().map(Registration::try_from).collect::<Result<Vec<_>, _>>()?;
        Ok((registrations, u64::try_from(total).unwrap_or_default()))
    }

    /// Current seat limit (if configured) and registration count.
    #[instrument(skip(self))]
    pub(crate) async fn seats(&self) -> Result<(Option<u32>, u64), RegistrationError> {
        let mut response = self
            .db
            .query(
                "RETURN event_config:current.total_seats;
                RETURN array::len((SELECT id FROM registration));",
            )
            .await
            .context("Reading seat usage")?;

        let total_seats = response.take::<Option<i64>>(0).context("Reading seat limit")?;
        let registered = response.take::<Option<i64>>(1).context("Reading registration count")?;

        Ok((
            total_seats.map(seat_limit).transpose()?,
            registered.and_then(|n| u64::try_from(n).ok()).unwrap_or_default(),
        ))
    }

    /// Overwrites the seat limit. `None` when no configuration exists.
    #[instrument(skip(self), fields(total_seats = seats.get()))]
    pub(crate) async fn update_total_seats(
        &self,
        seats: TotalSeats,
    ) -> Result<Option<u32>, RegistrationError> {
        let updated = self
            .db
            .query("RETURN fn::event_config::update($total_seats)")
            .bind(("total_seats", i64::from(seats.get())))
            .await
            .context("Updating seat limit")?
            .take::<Option<i64>>(0)
            .context("Reading updated seat limit")?;

        updated.map(seat_limit).transpose()
    }

    /// Returns the seat limit, creating the configuration with `default_seats` if absent.
    #[instrument(skip(self))]
    pub(crate) async fn ensure_config(&self, default_seats: u32) -> Result<u32, RegistrationError> {
        let total = self
            .db
            .query("RETURN fn::event_config::ensure($default_seats)")
            .bind(("default_seats", i64::from(default_seats)))
            .await
            .context("Ensuring event configuration")?
            .take::<Option<i64>>(0)
            .context("Reading event configuration")?
            .ok_or(RegistrationError::Internal {
                message: "Event configuration missing after ensure".into(),
                context: None,
            })?;

        seat_limit(total)
    }
}

/// Exponential backoff with jitter, so racing admissions stop colliding in lockstep.
fn retry_delay(attempt: u32) -> Duration {
    let ceiling = (ADMIT_BASE_DELAY_MS << attempt.min(8)).min(ADMIT_MAX_DELAY_MS);
    let jitter = u64::from(Utc::now().timestamp_subsec_nanos()) % ceiling;
    Duration::from_millis(ceiling / 2 + jitter / 2)
}

fn seat_limit(value: i64) -> Result<u32, RegistrationError> {
    u32::try_from(value).map_err(|_| RegistrationError::Internal {
        message: format!("Stored seat limit {value} out of range").into(),
        context: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn store_timestamps_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2026, 1, 9, 23, 59, 59).single().expect("valid");
        let later = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).single().expect("valid");

        let (a, b) = (store_timestamp(earlier), store_timestamp(later));
        assert_eq!(a, "2026-01-09T23:59:59.000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn retry_delays_grow_and_stay_bounded() {
        for attempt in 1..ADMIT_ATTEMPTS {
            let ceiling = (ADMIT_BASE_DELAY_MS << attempt.min(8)).min(ADMIT_MAX_DELAY_MS);
            let delay = retry_delay(attempt);
            assert!(delay >= Duration::from_millis(ceiling / 2), "attempt {attempt}: {delay:?}");
            assert!(delay < Duration::from_millis(ceiling), "attempt {attempt}: {delay:?}");
        }
    }

    #[test]
    fn records_convert_to_registrations() {
        let record = RegistrationRecord {
            id: "abc".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            phone_number: "1234567890".to_owned(),
            registered_at: "2026-01-10T08:30:00.250000Z".to_owned(),
        };
        let registration = Registration::try_from(record).expect("valid record");
        assert_eq!(store_timestamp(registration.registered_at), "2026-01-10T08:30:00.250000Z");

        let broken = RegistrationRecord {
            id: "abc".to_owned(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: String::new(),
            registered_at: "yesterday".to_owned(),
        };
        assert!(matches!(Registration::try_from(broken), Err(RegistrationError::Internal { .. })));
    }
}
