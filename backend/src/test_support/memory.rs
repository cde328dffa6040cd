//! In-memory port adapters.
//!
//! Each adapter keeps the atomicity contract of its PostgreSQL counterpart by
//! doing the whole check-and-write under one mutex guard.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    BookingRepository, BookingRepositoryError, GuestAccessRepository, GuestAccessRepositoryError,
    IdempotencyStore, IdempotencyStoreError, RateLimitStore, RateLimitStoreError, UserDirectory,
    UserDirectoryError,
};
use crate::domain::{
    Booking, BookingChanges, BookingId, BookingListQuery, BookingOwner, BookingStatus, GuestAccessCode,
    KeyHash, ManageToken, NewBooking, NewGuestAccessCode, PayloadHash, RateLimitHit,
    RegisteredUser, Reservation, UserId, code_ttl,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{name} mutex poisoned"),
    }
}

#[derive(Debug, Clone)]
struct Counter {
    count: u32,
    window_start: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Fixed-window counters keyed by hash.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    counters: Mutex<HashMap<String, Counter>>,
    failing: AtomicBool,
}

impl InMemoryRateLimitStore {
    /// Make every subsequent call fail with a connection error.
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Current count for a key hash.
    pub fn count(&self, key_hash: &KeyHash) -> Option<u32> {
        lock(&self.counters, "rate limit")
            .get(key_hash.as_str())
            .map(|counter| counter.count)
    }

    /// Number of stored counters.
    pub fn len(&self) -> usize {
        lock(&self.counters, "rate limit").len()
    }

    /// Whether no counters are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_failing(&self) -> Result<(), RateLimitStoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RateLimitStoreError::connection("store offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn record_hit(&self, hit: &RateLimitHit) -> Result<u32, RateLimitStoreError> {
        self.check_failing()?;
        let mut counters = lock(&self.counters, "rate limit");
        let counter = counters
            .entry(hit.key_hash.as_str().to_owned())
            .or_insert(Counter {
                count: 0,
                window_start: hit.now,
                expires_at: hit.expires_at,
            });
        if counter.window_start < hit.window_floor {
            counter.count = 1;
            counter.window_start = hit.now;
        } else {
            counter.count += 1;
        }
        counter.expires_at = hit.expires_at;
        Ok(counter.count)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RateLimitStoreError> {
        self.check_failing()?;
        let mut counters = lock(&self.counters, "rate limit");
        let before = counters.len();
        counters.retain(|_, counter| counter.expires_at >= now);
        Ok((before - counters.len()) as u64)
    }
}

#[derive(Debug, Clone)]
struct IdempotencyEntry {
    payload_hash: PayloadHash,
    booking_id: Option<BookingId>,
    expires_at: DateTime<Utc>,
}

/// Reserve-or-fetch records keyed by hash.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyStore {
    entries: Mutex<HashMap<String, IdempotencyEntry>>,
}

impl InMemoryIdempotencyStore {
    /// Booking recorded for a key hash, if completed.
    pub fn booking_for(&self, key_hash: &KeyHash) -> Option<BookingId> {
        lock(&self.entries, "idempotency")
            .get(key_hash.as_str())
            .and_then(|entry| entry.booking_id)
    }

    /// Whether any record exists for a key hash.
    pub fn contains(&self, key_hash: &KeyHash) -> bool {
        lock(&self.entries, "idempotency").contains_key(key_hash.as_str())
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn reserve(
        &self,
        key_hash: &KeyHash,
        payload_hash: &PayloadHash,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Reservation, IdempotencyStoreError> {
        let mut entries = lock(&self.entries, "idempotency");
        if let Some(entry) = entries.get(key_hash.as_str()) {
            if entry.expires_at > now {
                return Ok(match entry.booking_id {
                    Some(booking_id) => Reservation::Completed {
                        booking_id,
                        payload_hash: entry.payload_hash.clone(),
                    },
                    None => Reservation::InFlight,
                });
            }
        }
        entries.insert(
            key_hash.as_str().to_owned(),
            IdempotencyEntry {
                payload_hash: payload_hash.clone(),
                booking_id: None,
                expires_at,
            },
        );
        Ok(Reservation::Reserved)
    }

    async fn complete(
        &self,
        key_hash: &KeyHash,
        booking_id: BookingId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), IdempotencyStoreError> {
        let mut entries = lock(&self.entries, "idempotency");
        if let Some(entry) = entries.get_mut(key_hash.as_str()) {
            if entry.booking_id.is_none() {
                entry.booking_id = Some(booking_id);
                entry.expires_at = expires_at;
            }
        }
        Ok(())
    }

    async fn release(&self, key_hash: &KeyHash) -> Result<(), IdempotencyStoreError> {
        let mut entries = lock(&self.entries, "idempotency");
        if entries
            .get(key_hash.as_str())
            .is_some_and(|entry| entry.booking_id.is_none())
        {
            entries.remove(key_hash.as_str());
        }
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, IdempotencyStoreError> {
        let mut entries = lock(&self.entries, "idempotency");
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);
        Ok((before - entries.len()) as u64)
    }
}

/// Guest access code records in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryGuestAccessCodes {
    records: Mutex<Vec<GuestAccessCode>>,
}

impl InMemoryGuestAccessCodes {
    /// Snapshot of every stored record.
    pub fn records(&self) -> Vec<GuestAccessCode> {
        lock(&self.records, "guest access").clone()
    }

    /// Overwrite the stored hash of a record, e.g. to plant a known code.
    pub fn set_code_hash(&self, id: i64, code_hash: impl Into<String>) {
        let code_hash = code_hash.into();
        if let Some(record) = lock(&self.records, "guest access")
            .iter_mut()
            .find(|record| record.id == id)
        {
            record.code_hash = code_hash;
        }
    }
}

#[async_trait]
impl GuestAccessRepository for InMemoryGuestAccessCodes {
    async fn create(&self, code: &NewGuestAccessCode) -> Result<(), GuestAccessRepositoryError> {
        let mut records = lock(&self.records, "guest access");
        let id = records.len() as i64 + 1;
        records.push(GuestAccessCode {
            id,
            email: code.email.clone(),
            code_hash: code.code_hash.clone(),
            token: code.token.clone(),
            expires_at: code.expires_at,
            used_at: None,
            attempts: 0,
            created_at: code.expires_at - code_ttl(),
        });
        Ok(())
    }

    async fn latest_for_email(
        &self,
        email: &str,
    ) -> Result<Option<GuestAccessCode>, GuestAccessRepositoryError> {
        Ok(lock(&self.records, "guest access")
            .iter()
            .filter(|record| record.email == email)
            .max_by_key(|record| (record.created_at, record.id))
            .cloned())
    }

    async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<GuestAccessCode>, GuestAccessRepositoryError> {
        Ok(lock(&self.records, "guest access")
            .iter()
            .find(|record| record.token == token)
            .cloned())
    }

    async fn record_failed_attempt(&self, id: i64) -> Result<(), GuestAccessRepositoryError> {
        if let Some(record) = lock(&self.records, "guest access")
            .iter_mut()
            .find(|record| record.id == id)
        {
            record.attempts += 1;
        }
        Ok(())
    }

    async fn mark_used(
        &self,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, GuestAccessRepositoryError> {
        let mut records = lock(&self.records, "guest access");
        match records
            .iter_mut()
            .find(|record| record.id == id && record.used_at.is_none())
        {
            Some(record) => {
                record.used_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expired(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, GuestAccessRepositoryError> {
        let mut records = lock(&self.records, "guest access");
        let before = records.len();
        records.retain(|record| record.expires_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

/// Booking rows keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryBookings {
    rows: Mutex<Vec<Booking>>,
    next_id: AtomicI64,
}

impl InMemoryBookings {
    /// Store a prepared booking as-is, e.g. one built with
    /// [`super::sample_booking`].
    pub fn seed(&self, booking: Booking) {
        self.next_id.fetch_max(booking.id.get(), Ordering::SeqCst);
        lock(&self.rows, "bookings").push(booking);
    }

    /// Force a status, as operations staff would.
    pub fn set_status(&self, id: BookingId, status: BookingStatus) {
        if let Some(row) = lock(&self.rows, "bookings")
            .iter_mut()
            .find(|row| row.id == id)
        {
            row.status = status;
        }
    }

    /// Current copy of a booking.
    pub fn get(&self, id: BookingId) -> Option<Booking> {
        lock(&self.rows, "bookings")
            .iter()
            .find(|row| row.id == id)
            .cloned()
    }

    /// Number of stored bookings.
    pub fn count(&self) -> usize {
        lock(&self.rows, "bookings").len()
    }
}

fn apply(row: &mut Booking, changes: &BookingChanges, now: DateTime<Utc>) {
    if let Some(value) = &changes.rider_name {
        row.rider_name.clone_from(value);
    }
    if let Some(value) = &changes.rider_phone {
        row.rider_phone.clone_from(value);
    }
    if let Some(value) = &changes.pickup {
        row.pickup.clone_from(value);
    }
    if let Some(value) = &changes.dropoff {
        row.dropoff.clone_from(value);
    }
    if let Some(value) = changes.scheduled_at {
        row.scheduled_at = value;
    }
    if let Some(value) = &changes.notes {
        row.notes = Some(value.clone());
    }
    if let Some(value) = changes.passengers {
        row.passengers = value;
    }
    if let Some(value) = changes.luggages {
        row.luggages = value;
    }
    if let Some(value) = changes.ride_type {
        row.ride_type = value;
    }
    row.reschedule_count += i32::from(changes.reschedules);
    row.updated_at = now;
}

fn owned_by(row: &Booking, owner: &BookingOwner) -> bool {
    match owner {
        BookingOwner::Email(email) => row.rider_email.eq_ignore_ascii_case(email),
        BookingOwner::User(user_id) => row.user_id == Some(*user_id),
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookings {
    async fn insert(
        &self,
        booking: &NewBooking,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingRepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = Booking {
            id: BookingId::new(id),
            manage_token: booking.manage_token.clone(),
            status: BookingStatus::Pending,
            rider_name: booking.contact.name.clone(),
            rider_email: booking.contact.email.clone(),
            rider_phone: booking.contact.phone.clone(),
            pickup: booking.trip.pickup.clone(),
            dropoff: booking.trip.dropoff.clone(),
            scheduled_at: booking.trip.scheduled_at,
            notes: booking.trip.notes.clone(),
            passengers: booking.trip.passengers,
            luggages: booking.trip.luggages,
            ride_type: booking.trip.ride_type,
            user_id: booking.user_id,
            driver_id: None,
            reschedule_count: 0,
            created_at: now,
            updated_at: now,
        };
        lock(&self.rows, "bookings").push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, BookingRepositoryError> {
        Ok(self.get(id))
    }

    async fn find_by_id_and_token(
        &self,
        id: BookingId,
        token: &ManageToken,
    ) -> Result<Option<Booking>, BookingRepositoryError> {
        Ok(self.get(id).filter(|row| &row.manage_token == token))
    }

    async fn apply_changes(
        &self,
        id: BookingId,
        changes: &BookingChanges,
        expected_reschedule_count: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<Booking>, BookingRepositoryError> {
        let mut rows = lock(&self.rows, "bookings");
        let Some(row) = rows.iter_mut().find(|row| {
            row.id == id
                && row.reschedule_count == expected_reschedule_count
                && !row.status.is_terminal()
        }) else {
            return Ok(None);
        };
        apply(row, changes, now);
        Ok(Some(row.clone()))
    }

    async fn cancel(&self, id: BookingId, now: DateTime<Utc>) -> Result<bool, BookingRepositoryError> {
        let mut rows = lock(&self.rows, "bookings");
        match rows
            .iter_mut()
            .find(|row| row.id == id && !row.status.is_terminal())
        {
            Some(row) => {
                row.status = BookingStatus::Canceled;
                row.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(
        &self,
        owner: &BookingOwner,
        query: &BookingListQuery,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        let mut matching: Vec<Booking> = lock(&self.rows, "bookings")
            .iter()
            .filter(|row| owned_by(row, owner))
            .filter(|row| query.status().is_none_or(|status| row.status == status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        let offset = usize::try_from(query.offset()).unwrap_or(0);
        let limit = usize::try_from(query.limit()).unwrap_or(0);
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }
}

/// Registered accounts.
#[derive(Debug, Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<RegisteredUser>>,
}

impl InMemoryUsers {
    /// Add an account.
    #[must_use]
    pub fn with_user(self, user: RegisteredUser) -> Self {
        lock(&self.users, "users").push(user);
        self
    }
}

#[async_trait]
impl UserDirectory for InMemoryUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<RegisteredUser>, UserDirectoryError> {
        Ok(lock(&self.users, "users")
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<RegisteredUser>, UserDirectoryError> {
        Ok(lock(&self.users, "users")
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }
}
