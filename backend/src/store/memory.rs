use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{HotelQuery, Store, StoreError, StoreResult};
use crate::models::{
    Booking, Hotel, HotelStatus, Payment, PaymentState, Place, Selection, User, UserRole,
};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    places: Vec<Place>,
    hotels: Vec<Hotel>,
    selections: Vec<Selection>,
    bookings: Vec<Booking>,
    payments: Vec<Payment>,
}

/// Process-local collections behind a single lock. Every operation holds the
/// lock for its whole read-modify-write, which gives the same atomicity the
/// conditional updates in [`PgStore`](super::PgStore) rely on.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places are read-only through the API, so they are seeded here.
    pub fn with_places(places: Vec<Place>) -> Self {
        let store = Self::new();
        if let Ok(mut collections) = store.inner.lock() {
            collections.places = places;
        }
        store
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Collections>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn remove_by<T>(items: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> usize {
    let before = items.len();
    items.retain(|item| !pred(item));
    before - items.len()
}

impl Store for MemoryStore {
    fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.lock()?.users.clone())
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    fn insert_user(&self, user: User) -> StoreResult<bool> {
        let mut db = self.lock()?;
        if db.users.iter().any(|u| u.email == user.email) {
            return Ok(false);
        }
        db.users.push(user);
        Ok(true)
    }

    fn delete_user(&self, id: Uuid) -> StoreResult<usize> {
        Ok(remove_by(&mut self.lock()?.users, |u| u.id == id))
    }

    fn set_user_role(&self, id: Uuid, role: UserRole) -> StoreResult<usize> {
        let mut db = self.lock()?;
        Ok(match db.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.role = role;
                1
            }
            None => 0,
        })
    }

    fn list_places(&self) -> StoreResult<Vec<Place>> {
        let mut places = self.lock()?.places.clone();
        places.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(places)
    }

    fn get_place(&self, id: Uuid) -> StoreResult<Option<Place>> {
        Ok(self.lock()?.places.iter().find(|p| p.id == id).cloned())
    }

    fn list_selections(&self, email: &str) -> StoreResult<Vec<Selection>> {
        Ok(self
            .lock()?
            .selections
            .iter()
            .filter(|s| s.email == email)
            .cloned()
            .collect())
    }

    fn insert_selection(&self, selection: Selection) -> StoreResult<()> {
        self.lock()?.selections.push(selection);
        Ok(())
    }

    fn delete_selection(&self, id: Uuid) -> StoreResult<usize> {
        Ok(remove_by(&mut self.lock()?.selections, |s| s.id == id))
    }

    fn list_hotels(&self, query: &HotelQuery) -> StoreResult<Vec<Hotel>> {
        let mut hotels: Vec<Hotel> = self
            .lock()?
            .hotels
            .iter()
            .filter(|h| query.matches(h))
            .cloned()
            .collect();
        hotels.sort_by(|a, b| {
            b.status
                .as_str()
                .cmp(a.status.as_str())
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(hotels)
    }

    fn search_hotels(&self, text: &str) -> StoreResult<Vec<Hotel>> {
        Ok(self
            .lock()?
            .hotels
            .iter()
            .filter(|h| h.status == HotelStatus::Approved)
            .filter(|h| contains_ignore_case(&h.name, text) || contains_ignore_case(&h.location, text))
            .cloned()
            .collect())
    }

    fn get_hotel(&self, id: Uuid) -> StoreResult<Option<Hotel>> {
        Ok(self.lock()?.hotels.iter().find(|h| h.id == id).cloned())
    }

    fn insert_hotel(&self, hotel: Hotel) -> StoreResult<()> {
        self.lock()?.hotels.push(hotel);
        Ok(())
    }

    fn delete_hotel(&self, id: Uuid) -> StoreResult<usize> {
        Ok(remove_by(&mut self.lock()?.hotels, |h| h.id == id))
    }

    fn set_hotel_status(&self, id: Uuid, status: HotelStatus) -> StoreResult<usize> {
        let mut db = self.lock()?;
        Ok(match db.hotels.iter_mut().find(|h| h.id == id) {
            Some(hotel) => {
                hotel.status = status;
                1
            }
            None => 0,
        })
    }

    fn reserve_room(&self, id: Uuid) -> StoreResult<Hotel> {
        let mut db = self.lock()?;
        let hotel = db
            .hotels
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| StoreError::NotFound("hotel".into()))?;
        if hotel.available_room <= 0 {
            return Err(StoreError::NoRoomsLeft(id));
        }
        hotel.booked += 1;
        hotel.available_room -= 1;
        Ok(hotel.clone())
    }

    fn list_bookings(&self, email: &str) -> StoreResult<Vec<Booking>> {
        Ok(self
            .lock()?
            .bookings
            .iter()
            .filter(|b| b.email == email)
            .cloned()
            .collect())
    }

    fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.lock()?.bookings.iter().find(|b| b.id == id).cloned())
    }

    fn insert_booking(&self, booking: Booking) -> StoreResult<()> {
        self.lock()?.bookings.push(booking);
        Ok(())
    }

    fn delete_booking(&self, id: Uuid) -> StoreResult<usize> {
        Ok(remove_by(&mut self.lock()?.bookings, |b| b.id == id))
    }

    fn list_payments(&self, email: &str) -> StoreResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .lock()?
            .payments
            .iter()
            .filter(|p| p.email == email)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(payments)
    }

    fn find_payment(&self, transaction_id: &str) -> StoreResult<Option<Payment>> {
        Ok(self
            .lock()?
            .payments
            .iter()
            .find(|p| p.transaction_id == transaction_id)
            .cloned())
    }

    fn insert_payment(&self, payment: Payment) -> StoreResult<()> {
        let mut db = self.lock()?;
        if db
            .payments
            .iter()
            .any(|p| p.transaction_id == payment.transaction_id)
        {
            return Err(StoreError::Duplicate(format!(
                "payment {}",
                payment.transaction_id
            )));
        }
        db.payments.push(payment);
        Ok(())
    }

    fn settle_payment(
        &self,
        transaction_id: &str,
        state: PaymentState,
        validation_id: Option<String>,
    ) -> StoreResult<Option<Payment>> {
        let mut db = self.lock()?;
        let pending = db
            .payments
            .iter_mut()
            .find(|p| p.transaction_id == transaction_id && p.state == PaymentState::Pending);
        Ok(pending.map(|payment| {
            payment.state = state;
            payment.paid_status = state == PaymentState::Paid;
            payment.validation_id = validation_id;
            payment.clone()
        }))
    }

    fn mark_paid(
        &self,
        transaction_id: &str,
        validation_id: String,
    ) -> StoreResult<Option<Payment>> {
        let mut db = self.lock()?;
        let unpaid = db
            .payments
            .iter_mut()
            .find(|p| p.transaction_id == transaction_id && p.state != PaymentState::Paid);
        Ok(unpaid.map(|payment| {
            payment.state = PaymentState::Paid;
            payment.paid_status = true;
            payment.validation_id = Some(validation_id);
            payment.clone()
        }))
    }
}
