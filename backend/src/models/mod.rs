use chrono::{DateTime, NaiveDate, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Declares a lowercase string enum stored in a `Text` column.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
        #[serde(rename_all = "lowercase")]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {}: {}", stringify!($name), other)),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                raw.parse().map_err(Into::into)
            }
        }
    };
}

text_enum!(
    UserRole {
        User => "user",
        Admin => "admin",
    }
);

text_enum!(
    /// Moderation state of a hotel listing; only `approved` listings are public.
    HotelStatus {
        Pending => "pending",
        Approved => "approved",
        Denied => "denied",
    }
);

text_enum!(
    /// Lifecycle of a checkout attempt. `paid` is final and is reached only
    /// through a validated confirmation, which may still follow a `failed` or
    /// `cancelled` callback.
    PaymentState {
        Pending => "pending",
        Paid => "paid",
        Failed => "failed",
        Cancelled => "cancelled",
    }
);

// ── Stored documents ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub photo_url: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::places)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Place {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub image: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::hotels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub price: f64,
    pub status: HotelStatus,
    pub booked: i32,
    pub available_room: i32,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::selections)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub item_id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub image: Option<String>,
    pub price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub product_id: Uuid,
    pub name: String,
    pub price: f64,
    pub booking_days: i32,
    pub booking_date: NaiveDate,
    pub address: String,
    pub post_code: String,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Amount charged for the whole stay.
    pub fn total_price(&self) -> f64 {
        self.price * f64::from(self.booking_days.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub transaction_id: String,
    pub email: String,
    pub booking_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub booking_days: i32,
    pub booking_date: NaiveDate,
    pub total_price: f64,
    pub currency: String,
    pub state: PaymentState,
    pub paid_status: bool,
    pub validation_id: Option<String>,
    pub date: DateTime<Utc>,
}

impl Payment {
    pub fn for_booking(
        transaction_id: String,
        booking: &Booking,
        hotel: &Hotel,
        currency: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id,
            email: booking.email.clone(),
            booking_id: booking.id,
            product_id: hotel.id,
            product_name: hotel.name.clone(),
            booking_days: booking.booking_days,
            booking_date: booking.booking_date,
            total_price: booking.total_price(),
            currency: currency.to_string(),
            state: PaymentState::Pending,
            paid_status: false,
            validation_id: None,
            date: Utc::now(),
        }
    }
}

// ── Request payloads ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub name: Option<String>,
    #[validate(email)]
    pub email: String,
    #[serde(alias = "photoURL")]
    pub photo_url: Option<String>,
}

impl From<UserPayload> for User {
    fn from(payload: UserPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: payload.name,
            email: payload.email,
            photo_url: payload.photo_url,
            role: UserRole::User,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SelectionPayload {
    #[validate(email)]
    pub email: String,
    pub item_id: Uuid,
    #[validate(length(min = 1))]
    pub name: String,
    pub location: Option<String>,
    pub image: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
}

impl From<SelectionPayload> for Selection {
    fn from(payload: SelectionPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: payload.email,
            item_id: payload.item_id,
            name: payload.name,
            location: payload.location,
            image: payload.image,
            price: payload.price,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HotelPayload {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub location: String,
    pub image: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[validate(range(min = 0))]
    pub available_room: i32,
}

impl Hotel {
    /// New listings always wait for moderation.
    pub fn listed_by(owner: &str, payload: HotelPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: payload.name,
            location: payload.location,
            image: payload.image,
            description: payload.description,
            price: payload.price,
            status: HotelStatus::Pending,
            booked: 0,
            available_room: payload.available_room,
            email: owner.to_string(),
            created_at: Utc::now(),
        }
    }
}

fn one_day() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    #[validate(email)]
    pub email: String,
    pub product_id: Uuid,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[serde(default = "one_day")]
    #[validate(range(min = 1))]
    pub booking_days: i32,
    pub booking_date: NaiveDate,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1))]
    pub post_code: String,
}

impl From<BookingPayload> for Booking {
    fn from(payload: BookingPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: payload.email,
            product_id: payload.product_id,
            name: payload.name,
            price: payload.price,
            booking_days: payload.booking_days,
            booking_date: payload.booking_date,
            address: payload.address,
            post_code: payload.post_code,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// The booking being paid for.
    pub product_id: Uuid,
    pub currency: Option<String>,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1))]
    pub post_code: String,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PaymentIntentRequest {
    #[validate(range(min = 0.5))]
    pub price: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CardPaymentPayload {
    #[validate(length(min = 1))]
    pub transaction_id: String,
    #[validate(email)]
    pub email: String,
    pub booking_id: Uuid,
}
