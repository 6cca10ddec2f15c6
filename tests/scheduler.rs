use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use futures::TryStreamExt;

use cinema_booking::error::{AppError, Conflict};
use cinema_booking::models::Showroom;
use cinema_booking::services::{LogNotifier, Services};
use cinema_booking::store::MemoryStore;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
}

fn time(hour: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, min, 0).unwrap()
}

fn setup() -> (Arc<MemoryStore>, Services) {
    let store = Arc::new(MemoryStore::new());
    for id in 1..=2 {
        store.add_showroom(Showroom {
            id,
            name: format!("Hall {}", id),
            seat_count: 40,
            num_rows: 4,
            num_cols: 10,
            theatre_id: "downtown".into(),
        });
    }
    let services = Services::new(store.clone(), Arc::new(LogNotifier), Duration::from_secs(5));
    (store, services)
}

#[tokio::test]
async fn second_showtime_in_same_slot_conflicts_and_store_is_unchanged() {
    let (store, services) = setup();
    let scheduler = &services.scheduler;

    assert!(!scheduler.check_conflict(1, date(1), time(19, 0)).await.unwrap());
    scheduler.add_showtime(10, 1, date(1), time(19, 0)).await.unwrap();
    assert!(scheduler.check_conflict(1, date(1), time(19, 0)).await.unwrap());

    let err = scheduler
        .add_showtime(11, 1, date(1), time(19, 0))
        .await
        .unwrap_err();
    match err {
        AppError::Conflict(Conflict::ShowtimeTaken { showroom_id, .. }) => {
            assert_eq!(showroom_id, 1)
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.showtime_count(), 1);
    assert!(services
        .scheduler
        .showtimes_by_movie(11)
        .try_collect::<Vec<_>>()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn same_slot_in_another_room_or_time_is_free() {
    let (store, services) = setup();
    let scheduler = &services.scheduler;

    scheduler.add_showtime(10, 1, date(1), time(19, 0)).await.unwrap();
    scheduler.add_showtime(10, 2, date(1), time(19, 0)).await.unwrap();
    scheduler.add_showtime(10, 1, date(1), time(21, 30)).await.unwrap();
    scheduler.add_showtime(10, 1, date(2), time(19, 0)).await.unwrap();
    assert_eq!(store.showtime_count(), 4);
}

#[tokio::test]
async fn showtimes_for_movie_come_back_in_chronological_order() {
    let (_store, services) = setup();
    let scheduler = &services.scheduler;

    scheduler.add_showtime(10, 1, date(3), time(18, 0)).await.unwrap();
    scheduler.add_showtime(10, 2, date(1), time(21, 0)).await.unwrap();
    scheduler.add_showtime(10, 1, date(1), time(14, 0)).await.unwrap();
    scheduler.add_showtime(20, 1, date(2), time(14, 0)).await.unwrap();

    let showtimes: Vec<_> = scheduler.showtimes_by_movie(10).try_collect().await.unwrap();
    let slots: Vec<_> = showtimes.iter().map(|s| (s.show_date, s.show_time)).collect();
    assert_eq!(
        slots,
        vec![(date(1), time(14, 0)), (date(1), time(21, 0)), (date(3), time(18, 0))]
    );
    assert_eq!(showtimes[1].showroom_name, "Hall 2");
    assert_eq!(showtimes[1].seat_count, 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_admins_get_exactly_one_showtime() {
    let (store, services) = setup();

    let mut handles = Vec::new();
    for movie_id in 1..=8 {
        let scheduler = services.scheduler.clone();
        handles.push(tokio::spawn(async move {
            scheduler.add_showtime(movie_id, 2, date(5), time(20, 0)).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict(Conflict::ShowtimeTaken { .. })) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(store.showtime_count(), 1);
}

#[tokio::test]
async fn unknown_showroom_and_showtime_are_reported() {
    let (store, services) = setup();
    let scheduler = &services.scheduler;

    let err = scheduler.add_showtime(10, 99, date(1), time(19, 0)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidRequest(_)));
    assert_eq!(store.showtime_count(), 0);

    assert!(matches!(scheduler.showtime(42).await.unwrap_err(), AppError::NotFound(_)));
    assert!(matches!(scheduler.showroom(42).await.unwrap_err(), AppError::NotFound(_)));
    assert_eq!(scheduler.all_showrooms().await.unwrap().len(), 2);
}
