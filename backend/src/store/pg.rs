use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use uuid::Uuid;

use super::{HotelQuery, Store, StoreError, StoreResult};
use crate::models::{
    Booking, Hotel, HotelStatus, Payment, PaymentState, Place, Selection, User, UserRole,
};
use crate::schema::{bookings, hotels, payments, places, selections, users};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

type PgPool = Pool<ConnectionManager<PgConnection>>;
type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

/// Postgres-backed collections, one table each, sharing an r2d2 pool.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Builds the pool, checks a connection and applies pending migrations.
    pub fn connect(database_url: &str, pool_size: u32) -> StoreResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder().max_size(pool_size).build(manager)?;
        let store = Self { pool };

        let mut conn = store.conn()?;
        let ping: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1"))
            .get_result(&mut conn)?;
        log::info!("Database test query result: {}", ping);

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        log::info!("Applied {} pending migration(s)", applied.len());

        Ok(store)
    }

    fn conn(&self) -> StoreResult<PgPooled> {
        Ok(self.pool.get()?)
    }
}

/// Escapes LIKE metacharacters so user text is matched literally.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl Store for PgStore {
    fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(users::table
            .select(User::as_select())
            .order(users::created_at.asc())
            .load(&mut self.conn()?)?)
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut self.conn()?)
            .optional()?)
    }

    fn insert_user(&self, user: User) -> StoreResult<bool> {
        let written = diesel::insert_into(users::table)
            .values(&user)
            .on_conflict(users::email)
            .do_nothing()
            .execute(&mut self.conn()?)?;
        Ok(written == 1)
    }

    fn delete_user(&self, id: Uuid) -> StoreResult<usize> {
        Ok(diesel::delete(users::table.find(id)).execute(&mut self.conn()?)?)
    }

    fn set_user_role(&self, id: Uuid, role: UserRole) -> StoreResult<usize> {
        Ok(diesel::update(users::table.find(id))
            .set(users::role.eq(role))
            .execute(&mut self.conn()?)?)
    }

    fn list_places(&self) -> StoreResult<Vec<Place>> {
        Ok(places::table
            .select(Place::as_select())
            .order(places::name.asc())
            .load(&mut self.conn()?)?)
    }

    fn get_place(&self, id: Uuid) -> StoreResult<Option<Place>> {
        Ok(places::table
            .find(id)
            .select(Place::as_select())
            .first(&mut self.conn()?)
            .optional()?)
    }

    fn list_selections(&self, email: &str) -> StoreResult<Vec<Selection>> {
        Ok(selections::table
            .filter(selections::email.eq(email))
            .select(Selection::as_select())
            .order(selections::created_at.asc())
            .load(&mut self.conn()?)?)
    }

    fn insert_selection(&self, selection: Selection) -> StoreResult<()> {
        diesel::insert_into(selections::table)
            .values(&selection)
            .execute(&mut self.conn()?)?;
        Ok(())
    }

    fn delete_selection(&self, id: Uuid) -> StoreResult<usize> {
        Ok(diesel::delete(selections::table.find(id)).execute(&mut self.conn()?)?)
    }

    fn list_hotels(&self, query: &HotelQuery) -> StoreResult<Vec<Hotel>> {
        let mut statement = hotels::table.select(Hotel::as_select()).into_boxed();
        if let Some(status) = query.status {
            statement = statement.filter(hotels::status.eq(status));
        }
        if let Some(owner) = query.owner.clone() {
            statement = statement.filter(hotels::email.eq(owner));
        }
        Ok(statement
            .order((hotels::status.desc(), hotels::created_at.asc()))
            .load(&mut self.conn()?)?)
    }

    fn search_hotels(&self, text: &str) -> StoreResult<Vec<Hotel>> {
        let pattern = like_pattern(text);
        Ok(hotels::table
            .filter(hotels::status.eq(HotelStatus::Approved))
            .filter(
                hotels::name
                    .ilike(pattern.clone())
                    .or(hotels::location.ilike(pattern)),
            )
            .select(Hotel::as_select())
            .order(hotels::created_at.asc())
            .load(&mut self.conn()?)?)
    }

    fn get_hotel(&self, id: Uuid) -> StoreResult<Option<Hotel>> {
        Ok(hotels::table
            .find(id)
            .select(Hotel::as_select())
            .first(&mut self.conn()?)
            .optional()?)
    }

    fn insert_hotel(&self, hotel: Hotel) -> StoreResult<()> {
        diesel::insert_into(hotels::table)
            .values(&hotel)
            .execute(&mut self.conn()?)?;
        Ok(())
    }

    fn delete_hotel(&self, id: Uuid) -> StoreResult<usize> {
        Ok(diesel::delete(hotels::table.find(id)).execute(&mut self.conn()?)?)
    }

    fn set_hotel_status(&self, id: Uuid, status: HotelStatus) -> StoreResult<usize> {
        Ok(diesel::update(hotels::table.find(id))
            .set(hotels::status.eq(status))
            .execute(&mut self.conn()?)?)
    }

    fn reserve_room(&self, id: Uuid) -> StoreResult<Hotel> {
        let mut conn = self.conn()?;
        let updated = diesel::update(
            hotels::table
                .filter(hotels::id.eq(id))
                .filter(hotels::available_room.gt(0)),
        )
        .set((
            hotels::booked.eq(hotels::booked + 1),
            hotels::available_room.eq(hotels::available_room - 1),
        ))
        .returning(Hotel::as_returning())
        .get_result(&mut conn)
        .optional()?;

        match updated {
            Some(hotel) => Ok(hotel),
            None => {
                let known: bool =
                    diesel::select(exists(hotels::table.find(id))).get_result(&mut conn)?;
                if known {
                    Err(StoreError::NoRoomsLeft(id))
                } else {
                    Err(StoreError::NotFound("hotel".into()))
                }
            }
        }
    }

    fn list_bookings(&self, email: &str) -> StoreResult<Vec<Booking>> {
        Ok(bookings::table
            .filter(bookings::email.eq(email))
            .select(Booking::as_select())
            .order(bookings::created_at.asc())
            .load(&mut self.conn()?)?)
    }

    fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(bookings::table
            .find(id)
            .select(Booking::as_select())
            .first(&mut self.conn()?)
            .optional()?)
    }

    fn insert_booking(&self, booking: Booking) -> StoreResult<()> {
        diesel::insert_into(bookings::table)
            .values(&booking)
            .execute(&mut self.conn()?)?;
        Ok(())
    }

    fn delete_booking(&self, id: Uuid) -> StoreResult<usize> {
        Ok(diesel::delete(bookings::table.find(id)).execute(&mut self.conn()?)?)
    }

    fn list_payments(&self, email: &str) -> StoreResult<Vec<Payment>> {
        Ok(payments::table
            .filter(payments::email.eq(email))
            .select(Payment::as_select())
            .order(payments::date.desc())
            .load(&mut self.conn()?)?)
    }

    fn find_payment(&self, transaction_id: &str) -> StoreResult<Option<Payment>> {
        Ok(payments::table
            .filter(payments::transaction_id.eq(transaction_id))
            .select(Payment::as_select())
            .first(&mut self.conn()?)
            .optional()?)
    }

    fn insert_payment(&self, payment: Payment) -> StoreResult<()> {
        diesel::insert_into(payments::table)
            .values(&payment)
            .execute(&mut self.conn()?)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    StoreError::Duplicate(format!("payment {}", payment.transaction_id))
                }
                other => StoreError::Query(other),
            })?;
        Ok(())
    }

    fn settle_payment(
        &self,
        transaction_id: &str,
        state: PaymentState,
        validation_id: Option<String>,
    ) -> StoreResult<Option<Payment>> {
        Ok(diesel::update(
            payments::table
                .filter(payments::transaction_id.eq(transaction_id))
                .filter(payments::state.eq(PaymentState::Pending)),
        )
        .set((
            payments::state.eq(state),
            payments::paid_status.eq(state == PaymentState::Paid),
            payments::validation_id.eq(validation_id),
        ))
        .returning(Payment::as_returning())
        .get_result(&mut self.conn()?)
        .optional()?)
    }

    fn mark_paid(
        &self,
        transaction_id: &str,
        validation_id: String,
    ) -> StoreResult<Option<Payment>> {
        Ok(diesel::update(
            payments::table
                .filter(payments::transaction_id.eq(transaction_id))
                .filter(payments::state.ne(PaymentState::Paid)),
        )
        .set((
            payments::state.eq(PaymentState::Paid),
            payments::paid_status.eq(true),
            payments::validation_id.eq(Some(validation_id)),
        ))
        .returning(Payment::as_returning())
        .get_result(&mut self.conn()?)
        .optional()?)
    }
}
