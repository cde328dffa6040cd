//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate
//! with `diesel print-schema` after changing a migration.

diesel::table! {
    /// Fixed-window request counters, one row per hashed key.
    rate_limits (key_hash) {
        /// SHA-256 hex of the scoped limiter key.
        key_hash -> Text,
        /// Requests counted since `window_start`.
        count -> Integer,
        /// Start of the current window.
        window_start -> Timestamptz,
        /// Retention deadline used by clean-up.
        expires_at -> Timestamptz,
    }
}

diesel::table! {
    /// Idempotency records for guest booking creation.
    booking_idempotency (key_hash) {
        /// SHA-256 hex of the `Idempotency-Key` header.
        key_hash -> Text,
        /// SHA-256 of the canonical request payload.
        payload_hash -> Bytea,
        /// Booking created under this key; null while reserved.
        booking_id -> Nullable<Int8>,
        /// End of the reservation or replay window.
        expires_at -> Timestamptz,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// One-time guest access codes and their magic link tokens.
    guest_access_codes (id) {
        id -> Int8,
        /// Lowercased recipient email.
        email -> Text,
        /// `hex(salt):hex(scrypt key)` of the numeric code.
        code_hash -> Text,
        /// Magic link token (unique).
        token -> Text,
        expires_at -> Timestamptz,
        /// Set once when either secret is redeemed.
        used_at -> Nullable<Timestamptz>,
        /// Failed code verifications.
        attempts -> Integer,
        created_at -> Timestamptz,
        /// Requesting client address.
        ip_created -> Nullable<Text>,
    }
}

diesel::table! {
    /// Ride bookings.
    bookings (id) {
        id -> Int8,
        /// Per-booking capability secret (unique).
        manage_token -> Text,
        /// Lifecycle status name.
        status -> Text,
        rider_name -> Text,
        rider_email -> Text,
        rider_phone -> Text,
        pickup -> Text,
        dropoff -> Text,
        scheduled_at -> Timestamptz,
        notes -> Nullable<Text>,
        passengers -> Integer,
        luggages -> Integer,
        /// `per_ride` or `hourly`.
        ride_type -> Text,
        /// Owning rider account, if any.
        user_id -> Nullable<Int8>,
        /// Assigned driver, set outside this service.
        driver_id -> Nullable<Int8>,
        reschedule_count -> Integer,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Registered accounts. Read only from this service.
    users (id) {
        id -> Int8,
        name -> Text,
        email -> Text,
        phone -> Text,
        /// `rider` or `admin`.
        role -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(bookings -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    rate_limits,
    booking_idempotency,
    guest_access_codes,
    bookings,
    users,
);
