//! Booking lifecycle: creation, reads, patches, cancellation, and listings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use super::authorization::booking_storage_error;
use super::idempotency::{completed_ttl, reservation_ttl};
use super::ports::{BookingRepository, IdempotencyStore, IdempotencyStoreError, UserDirectory};
use super::{
    AuthorizationResolver, Booking, BookingCredential, BookingId, BookingListQuery, BookingOwner,
    BookingPatch, BookingStatus, ContactDraft, Error, IdempotencyKey, KeyHash, ManageToken,
    NewBooking, PayloadHash, PolicyReason, Reservation, ResolvedBooking, RiderContact, Role,
    SessionIdentity, TripDetails, TripDraft, UserId, canonicalize_and_hash,
};

const CANCEL_CUTOFF: &str = "Booking cannot be canceled less than 24 hours before pickup";
const CLOSED: &str = "Booking can no longer be modified";

/// Guest booking request before validation.
#[derive(Debug, Clone, Default)]
pub struct GuestBookingDraft {
    /// Rider contact details.
    pub contact: ContactDraft,
    /// Trip details.
    pub trip: TripDraft,
}

/// Result of a guest booking creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedBooking {
    /// The booking.
    pub booking: Booking,
    /// Whether an earlier request with the same idempotency key created it.
    pub replayed: bool,
}

/// Collaborators of [`BookingService`].
#[derive(Clone)]
pub struct BookingServicePorts {
    /// Booking storage.
    pub bookings: Arc<dyn BookingRepository>,
    /// Idempotency records.
    pub idempotency: Arc<dyn IdempotencyStore>,
    /// Registered account lookup.
    pub users: Arc<dyn UserDirectory>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// Booking use-cases.
#[derive(Clone)]
pub struct BookingService {
    ports: BookingServicePorts,
    resolver: AuthorizationResolver,
}

fn idempotency_error(err: IdempotencyStoreError) -> Error {
    Error::internal(format!("idempotency store failed: {err}"))
}

fn payload_hash(contact: &RiderContact, trip: &TripDetails) -> Result<PayloadHash, Error> {
    let contact = serde_json::to_value(contact)
        .map_err(|err| Error::internal(format!("failed to encode booking payload: {err}")))?;
    let trip = serde_json::to_value(trip)
        .map_err(|err| Error::internal(format!("failed to encode booking payload: {err}")))?;
    Ok(canonicalize_and_hash(&json!({ "contact": contact, "trip": trip })))
}

impl BookingService {
    /// Create the service.
    pub fn new(ports: BookingServicePorts, resolver: AuthorizationResolver) -> Self {
        Self { ports, resolver }
    }

    fn now(&self) -> DateTime<Utc> {
        self.ports.clock.utc()
    }

    /// Create a guest booking, replaying an earlier result for a repeated
    /// idempotency key.
    ///
    /// # Errors
    /// - `invalid_request` when validation fails.
    /// - `conflict` when the key was used with a different payload, or a
    ///   request with the same key is still in flight.
    pub async fn create_guest(
        &self,
        draft: GuestBookingDraft,
        key: Option<IdempotencyKey>,
    ) -> Result<CreatedBooking, Error> {
        let now = self.now();
        let contact = draft.contact.validate()?;
        let trip = draft.trip.validate(now)?;
        let Some(key) = key else {
            let booking = self.insert(contact, trip, None, now).await?;
            return Ok(CreatedBooking {
                booking,
                replayed: false,
            });
        };

        let hash = payload_hash(&contact, &trip)?;
        let key_hash = key.hash();
        let reservation = self
            .ports
            .idempotency
            .reserve(&key_hash, &hash, now, now + reservation_ttl())
            .await
            .map_err(idempotency_error)?;

        match reservation {
            Reservation::Reserved => {
                let booking = match self.insert(contact, trip, None, now).await {
                    Ok(booking) => booking,
                    Err(err) => {
                        self.release(&key_hash).await;
                        return Err(err);
                    }
                };
                if let Err(err) = self
                    .ports
                    .idempotency
                    .complete(&key_hash, booking.id, now + completed_ttl())
                    .await
                {
                    warn!(%key_hash, booking_id = %booking.id, error = %err, "failed to complete idempotency record");
                }
                Ok(CreatedBooking {
                    booking,
                    replayed: false,
                })
            }
            Reservation::Completed {
                booking_id,
                payload_hash,
            } => {
                if payload_hash != hash {
                    return Err(Error::conflict(
                        "Idempotency key was already used with a different request",
                    ));
                }
                let booking = self
                    .ports
                    .bookings
                    .find_by_id(booking_id)
                    .await
                    .map_err(booking_storage_error)?
                    .ok_or_else(|| Error::not_found("Booking not found"))?;
                info!(%key_hash, %booking_id, "replayed idempotent booking creation");
                Ok(CreatedBooking {
                    booking,
                    replayed: true,
                })
            }
            Reservation::InFlight => Err(Error::conflict(
                "A request with this idempotency key is still in progress",
            )),
        }
    }

    /// Create a booking for a rider, copying contact details from the
    /// account.
    pub async fn create_for_user(
        &self,
        identity: &SessionIdentity,
        trip: TripDraft,
    ) -> Result<Booking, Error> {
        let user_id = require_role(identity, Role::Rider)?;
        let now = self.now();
        let trip = trip.validate(now)?;
        let user = self
            .ports
            .users
            .find_by_id(user_id)
            .await
            .map_err(|err| Error::internal(format!("account lookup failed: {err}")))?
            .ok_or_else(|| Error::unauthorized("Account not found"))?;
        let contact = ContactDraft {
            name: user.name,
            email: user.email,
            phone: user.phone,
        }
        .validate()?;
        self.insert(contact, trip, Some(user_id), now).await
    }

    /// Fetch one booking.
    pub async fn get(
        &self,
        id: BookingId,
        credential: &BookingCredential,
    ) -> Result<ResolvedBooking, Error> {
        self.resolver.resolve(id, credential).await
    }

    /// Apply a partial update.
    ///
    /// The write is guarded by the reschedule count read during resolution,
    /// so a concurrent change yields `conflict` instead of a lost update.
    pub async fn patch(
        &self,
        id: BookingId,
        credential: &BookingCredential,
        patch: BookingPatch,
    ) -> Result<ResolvedBooking, Error> {
        let resolved = self.resolver.resolve(id, credential).await?;
        let current = &resolved.booking;
        let now = self.now();
        let changes = patch.validate(current, now)?;
        let changed = changes.changed_fields(current);

        let booking = self
            .ports
            .bookings
            .apply_changes(id, &changes, current.reschedule_count, now)
            .await
            .map_err(booking_storage_error)?
            .ok_or_else(|| Error::conflict("Booking was modified concurrently; retry"))?;
        info!(
            booking_id = %id,
            changed_fields = ?changed,
            reschedule_count = booking.reschedule_count,
            "booking updated"
        );
        Ok(ResolvedBooking {
            booking,
            grant: resolved.grant,
        })
    }

    /// Cancel a booking on behalf of its rider, honouring the cutoff.
    pub async fn cancel(&self, id: BookingId, credential: &BookingCredential) -> Result<(), Error> {
        let resolved = self.resolver.resolve(id, credential).await?;
        let now = self.now();
        ensure_not_canceled(&resolved.booking)?;
        match resolved.booking.cancel_refusal(now) {
            Some(PolicyReason::CancellationCutoff) => {
                return Err(Error::policy(PolicyReason::CancellationCutoff, CANCEL_CUTOFF));
            }
            Some(reason) => return Err(Error::policy(reason, CLOSED)),
            None => {}
        }
        self.transition_to_canceled(id, now).await
    }

    /// Cancel any open booking regardless of the cutoff.
    pub async fn admin_cancel(&self, id: BookingId, identity: &SessionIdentity) -> Result<(), Error> {
        require_role(identity, Role::Admin)?;
        let booking = self
            .ports
            .bookings
            .find_by_id(id)
            .await
            .map_err(booking_storage_error)?
            .ok_or_else(|| Error::not_found("Booking not found"))?;
        ensure_not_canceled(&booking)?;
        if booking.status.is_terminal() {
            return Err(Error::policy(PolicyReason::BookingClosed, CLOSED));
        }
        self.transition_to_canceled(id, self.now()).await
    }

    /// List the caller's bookings.
    ///
    /// Account sessions list by user id; guest sessions by email.
    pub async fn list(
        &self,
        identity: &SessionIdentity,
        query: &BookingListQuery,
    ) -> Result<Vec<Booking>, Error> {
        let owner = match identity.user_id() {
            Some(user_id) => BookingOwner::User(user_id),
            None => BookingOwner::Email(identity.email().to_lowercase()),
        };
        self.ports
            .bookings
            .list(&owner, query)
            .await
            .map_err(booking_storage_error)
    }

    /// Delete idempotency records whose retention has passed.
    pub async fn cleanup_idempotency(&self) -> Result<u64, Error> {
        self.ports
            .idempotency
            .delete_expired(self.now())
            .await
            .map_err(idempotency_error)
    }

    async fn insert(
        &self,
        contact: RiderContact,
        trip: TripDetails,
        user_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        let new = NewBooking {
            contact,
            trip,
            user_id,
            manage_token: ManageToken::generate(),
        };
        let booking = self
            .ports
            .bookings
            .insert(&new, now)
            .await
            .map_err(booking_storage_error)?;
        info!(booking_id = %booking.id, "booking created");
        Ok(booking)
    }

    async fn release(&self, key_hash: &KeyHash) {
        if let Err(err) = self.ports.idempotency.release(key_hash).await {
            warn!(%key_hash, error = %err, "failed to release idempotency reservation");
        }
    }

    async fn transition_to_canceled(&self, id: BookingId, now: DateTime<Utc>) -> Result<(), Error> {
        let changed = self
            .ports
            .bookings
            .cancel(id, now)
            .await
            .map_err(booking_storage_error)?;
        if !changed {
            return Err(Error::not_found("Booking not found"));
        }
        info!(booking_id = %id, "booking canceled");
        Ok(())
    }
}

fn ensure_not_canceled(booking: &Booking) -> Result<(), Error> {
    if booking.status == BookingStatus::Canceled {
        Err(Error::not_found("Booking not found"))
    } else {
        Ok(())
    }
}

fn require_role(identity: &SessionIdentity, role: Role) -> Result<UserId, Error> {
    match identity.user_id() {
        Some(user_id) if identity.role() == role => Ok(user_id),
        _ => Err(Error::forbidden(format!("{role} account required"))),
    }
}
