//! Firebase Realtime Database persistence and ID-token verification over REST.

pub mod auth;
pub mod client;
pub mod compact;
pub mod error;
pub mod query;
pub mod repository;

pub use auth::{
    IdentityToolkitVerifier, StaticTokenVerifier, TokenVerifier, VerifiedUser,
    DEFAULT_IDENTITY_TOOLKIT_URL,
};
pub use client::{DbRef, FirebaseClient, Query};
pub use compact::{build_compact_users_data, fetch_all_users_data, MAX_CONCURRENT_USER_FETCHES};
pub use error::{FirebaseError, VerifyError};
pub use query::{get_ordered_with_fallback, ORDER_KEYS};
pub use repository::{
    fetch_history_raw, get_or_create_profile, increment_profile_counter, list_analysis_history,
    list_user_ids, list_vehicles, save_analysis, save_vehicle, NewVehicle, ProfileCounter,
};
