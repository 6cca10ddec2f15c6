//! Проверки `PgStore` на живом Postgres.
//!
//! Запуск: `DATABASE_URL=postgres://... cargo test -- --ignored`

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use cinema_booking::error::{AppError, Conflict};
use cinema_booking::models::{NewBooking, NewTicket, SeatLabel, TicketSelection, TicketType};
use cinema_booking::services::{BookingRequest, LogNotifier, Services};
use cinema_booking::store::{BookingStore, PgStore};

async fn seed(pool: &PgPool) -> (Arc<PgStore>, Services, i64) {
    let showroom_id: i64 = sqlx::query_scalar(
        "INSERT INTO showrooms (name, seat_count, num_rows, num_cols, theatre_id)
         VALUES ('Hall 1', 20, 4, 5, 'downtown')
         RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    for i in 0..8 {
        sqlx::query("INSERT INTO payment_cards (id, customer_id) VALUES ($1, $2)")
            .bind(format!("card-{}", i))
            .bind(format!("cust-{}", i))
            .execute(pool)
            .await
            .unwrap();
    }

    let store = Arc::new(PgStore::new(pool.clone()));
    let services = Services::new(store.clone(), Arc::new(LogNotifier), Duration::from_secs(5));
    let showtime_id = services
        .scheduler
        .add_showtime(
            1,
            showroom_id,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        )
        .await
        .unwrap();
    (store, services, showtime_id)
}

fn request(customer: usize, showtime_id: i64, seats: &[&str]) -> BookingRequest {
    BookingRequest {
        customer_id: format!("cust-{}", customer),
        movie_id: Some(1),
        showtime_id,
        tickets: seats
            .iter()
            .map(|s| TicketSelection {
                seat_id: s.to_string(),
                ticket_type: TicketType::Adult,
            })
            .collect(),
        promo_code: None,
        card_id: format!("card-{}", customer),
    }
}

#[sqlx::test(migrations = "./src/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn unique_index_prevents_double_sale(pool: PgPool) {
    let (_store, services, showtime_id) = seed(&pool).await;

    let mut handles = Vec::new();
    for customer in 0..8 {
        let engine = services.booking.clone();
        handles.push(tokio::spawn(async move {
            engine
                .create_booking(request(customer, showtime_id, &["B1", "B2"]))
                .await
        }));
    }

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(AppError::Conflict(Conflict::SeatsTaken { .. })) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(won, 1);

    let bookings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
        .fetch_one(&pool)
        .await
        .unwrap();
    let tickets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE showtime_id = $1")
        .bind(showtime_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(bookings, 1);
    assert_eq!(tickets, 2);
}

#[sqlx::test(migrations = "./src/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn conflicting_booking_rolls_back_completely(pool: PgPool) {
    let (_store, services, showtime_id) = seed(&pool).await;
    let first = services
        .booking
        .create_booking(request(0, showtime_id, &["A1"]))
        .await
        .unwrap();

    let err = services
        .booking
        .create_booking(request(1, showtime_id, &["A2", "A1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::SeatsTaken { .. })));

    let booked = services.booking.booked_seats(showtime_id).await.unwrap();
    assert_eq!(booked.into_iter().collect::<Vec<_>>(), vec!["A1"]);

    let view = services
        .booking
        .booking_by_id(first.booking_id, "cust-0")
        .await
        .unwrap();
    assert_eq!(view.tickets.len(), 1);
    assert!(services.orders.list_bookings("cust-1").await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./src/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn showtime_slot_is_unique(pool: PgPool) {
    let (_store, services, showtime_id) = seed(&pool).await;
    let showtime = services.scheduler.showtime(showtime_id).await.unwrap();

    let err = services
        .scheduler
        .add_showtime(2, showtime.showroom_id, showtime.show_date, showtime.show_time)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::ShowtimeTaken { .. })));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM showtimes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

async fn count(pool: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

#[sqlx::test(migrations = "./src/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn ticket_index_rejects_sold_seat_and_rolls_back(pool: PgPool) {
    let (store, services, showtime_id) = seed(&pool).await;
    services
        .booking
        .create_booking(request(0, showtime_id, &["A1"]))
        .await
        .unwrap();
    let showroom_id: i64 = sqlx::query_scalar("SELECT showroom_id FROM showtimes WHERE id = $1")
        .bind(showtime_id)
        .fetch_one(&pool)
        .await
        .unwrap();

    // Мимо предварительной проверки сервиса: отказ даёт только индекс
    let late = NewBooking {
        id: Uuid::new_v4(),
        customer_id: "cust-1".into(),
        showtime_id,
        showroom_id,
        total_price: Decimal::new(2400, 2),
        promotion_id: None,
        card_id: "card-1".into(),
        tickets: ["A2", "A1"]
            .iter()
            .map(|s| NewTicket {
                id: Uuid::new_v4(),
                seat: SeatLabel::parse(s).unwrap(),
                price: Decimal::new(1200, 2),
                ticket_type: TicketType::Adult,
            })
            .collect(),
    };
    let err = store
        .commit_booking(&late, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::SeatsTaken { .. })));

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM bookings").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM tickets").await, 1);
    let leftover: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE id = $1")
        .bind(late.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(leftover, 0);
}
