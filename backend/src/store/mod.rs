//! Document collections behind one blocking interface.
//!
//! Handlers never talk to diesel directly; they hand a closure to
//! [`AppState::with_store`](crate::state::AppState::with_store), which runs it
//! on the blocking pool against whichever backend was configured.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Booking, Hotel, HotelStatus, Payment, PaymentState, Place, Selection, User, UserRole,
};

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("no rooms left in hotel {0}")]
    NoRoomsLeft(Uuid),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Exact-match filters for hotel listings. Results are ordered by status
/// descending, then by listing time.
#[derive(Debug, Clone, Default)]
pub struct HotelQuery {
    pub status: Option<HotelStatus>,
    pub owner: Option<String>,
}

impl HotelQuery {
    pub fn approved() -> Self {
        Self {
            status: Some(HotelStatus::Approved),
            owner: None,
        }
    }

    pub fn owned_by(email: impl Into<String>) -> Self {
        Self {
            status: None,
            owner: Some(email.into()),
        }
    }

    fn matches(&self, hotel: &Hotel) -> bool {
        self.status.map_or(true, |status| hotel.status == status)
            && self.owner.as_deref().map_or(true, |owner| hotel.email == owner)
    }
}

pub trait Store: Send + Sync {
    // users
    fn list_users(&self) -> StoreResult<Vec<User>>;
    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Inserts unless a user with the same email exists. Returns whether a row
    /// was written.
    fn insert_user(&self, user: User) -> StoreResult<bool>;
    fn delete_user(&self, id: Uuid) -> StoreResult<usize>;
    fn set_user_role(&self, id: Uuid, role: UserRole) -> StoreResult<usize>;

    // places
    fn list_places(&self) -> StoreResult<Vec<Place>>;
    fn get_place(&self, id: Uuid) -> StoreResult<Option<Place>>;

    // selections
    fn list_selections(&self, email: &str) -> StoreResult<Vec<Selection>>;
    fn insert_selection(&self, selection: Selection) -> StoreResult<()>;
    fn delete_selection(&self, id: Uuid) -> StoreResult<usize>;

    // hotels
    fn list_hotels(&self, query: &HotelQuery) -> StoreResult<Vec<Hotel>>;
    /// Approved hotels whose name or location contains `text`, ignoring case.
    fn search_hotels(&self, text: &str) -> StoreResult<Vec<Hotel>>;
    fn get_hotel(&self, id: Uuid) -> StoreResult<Option<Hotel>>;
    fn insert_hotel(&self, hotel: Hotel) -> StoreResult<()>;
    fn delete_hotel(&self, id: Uuid) -> StoreResult<usize>;
    fn set_hotel_status(&self, id: Uuid, status: HotelStatus) -> StoreResult<usize>;
    /// Atomically moves one room from available to booked.
    fn reserve_room(&self, id: Uuid) -> StoreResult<Hotel>;

    // bookings
    fn list_bookings(&self, email: &str) -> StoreResult<Vec<Booking>>;
    fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;
    fn insert_booking(&self, booking: Booking) -> StoreResult<()>;
    fn delete_booking(&self, id: Uuid) -> StoreResult<usize>;

    // payments
    /// Newest first.
    fn list_payments(&self, email: &str) -> StoreResult<Vec<Payment>>;
    fn find_payment(&self, transaction_id: &str) -> StoreResult<Option<Payment>>;
    /// Fails with [`StoreError::Duplicate`] when the transaction id is taken.
    fn insert_payment(&self, payment: Payment) -> StoreResult<()>;
    /// Moves a `pending` payment to `state`. Returns `None` when no pending
    /// payment carries `transaction_id`, so a settled payment never changes twice.
    fn settle_payment(
        &self,
        transaction_id: &str,
        state: PaymentState,
        validation_id: Option<String>,
    ) -> StoreResult<Option<Payment>>;
    /// Moves any payment that is not yet `paid` to `paid`. Returns `None` when
    /// the payment is unknown or already paid.
    fn mark_paid(
        &self,
        transaction_id: &str,
        validation_id: String,
    ) -> StoreResult<Option<Payment>>;
}
