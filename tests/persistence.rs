//! Integration tests over the public API: durable state across reopen,
//! and tenant isolation through the TenantManager.

use std::path::PathBuf;

use ulid::Ulid;

use bookgate::EngineError;
use bookgate::engine::Engine;
use bookgate::model::{EventKind, ReservationStatus, Span};
use bookgate::tenant::TenantManager;

const H: i64 = 3_600_000;

fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("bookgate_test_integration").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn booking_day_survives_reopen() {
    let dir = test_dir("reopen");
    let wal = dir.join("gym.wal");

    let sala = Ulid::new();
    let yoga = Ulid::new();
    let ana_seat = Ulid::new();
    let bruno_seat = Ulid::new();

    {
        let engine = Engine::new(wal.clone()).unwrap();
        engine.create_resource(sala, "Sala 1".into(), 10).await.unwrap();
        engine
            .schedule_event(yoga, sala, "Yoga".into(), Span::new(9 * H, 10 * H), EventKind::Group, 2)
            .await
            .unwrap();
        engine.confirm_reservation(ana_seat, yoga, Ulid::new()).await.unwrap();
        engine.confirm_reservation(bruno_seat, yoga, Ulid::new()).await.unwrap();
        engine.cancel_reservation(bruno_seat).await.unwrap();
    }

    // Reopen from the same WAL: identical schedule, identical seats
    let engine = Engine::new(wal).unwrap();

    let resources = engine.list_resources().await;
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].name, "Sala 1");

    let events = engine.get_events(sala).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Yoga");
    assert_eq!(events[0].confirmed, 1);

    let seats = engine.get_reservations(yoga).await.unwrap();
    assert_eq!(seats.len(), 2);
    assert_eq!(
        seats.iter().find(|s| s.id == ana_seat).unwrap().status,
        ReservationStatus::Confirmed
    );
    assert_eq!(
        seats.iter().find(|s| s.id == bruno_seat).unwrap().status,
        ReservationStatus::Cancelled
    );

    // The freed seat is bookable again after the restart
    engine.confirm_reservation(Ulid::new(), yoga, Ulid::new()).await.unwrap();
    assert!(matches!(
        engine.confirm_reservation(Ulid::new(), yoga, Ulid::new()).await,
        Err(EngineError::CapacityFull(_))
    ));

    // And the conflict gate still sees the replayed schedule
    let result = engine
        .schedule_event(
            Ulid::new(),
            sala,
            "Crossfit".into(),
            Span::new(9 * H + 30 * 60_000, 10 * H + 30 * 60_000),
            EventKind::Group,
            0,
        )
        .await;
    assert!(matches!(result, Err(EngineError::Conflict(_))));
}

#[tokio::test]
async fn tenants_never_share_schedules() {
    let dir = test_dir("tenants");
    let tm = TenantManager::new(dir, 10_000);

    let north = tm.get_or_create("gym-north").unwrap();
    let south = tm.get_or_create("gym-south").unwrap();

    // Identical resource ids and windows in both tenants
    let rid = Ulid::new();
    let window = Span::new(18 * H, 19 * H);
    north.create_resource(rid, "Sala 1".into(), 10).await.unwrap();
    south.create_resource(rid, "Sala 1".into(), 10).await.unwrap();

    north
        .schedule_event(Ulid::new(), rid, "Spin".into(), window, EventKind::Group, 0)
        .await
        .unwrap();

    // South's identically-named room is still free at that hour
    south
        .schedule_event(Ulid::new(), rid, "Boxe".into(), window, EventKind::Group, 0)
        .await
        .unwrap();

    assert_eq!(north.get_events(rid).await.unwrap()[0].title, "Spin");
    assert_eq!(south.get_events(rid).await.unwrap()[0].title, "Boxe");
}

#[tokio::test]
async fn rejected_writes_are_never_persisted() {
    let dir = test_dir("rejected");
    let wal = dir.join("gym.wal");

    let sala = Ulid::new();
    let yoga = Ulid::new();

    {
        let engine = Engine::new(wal.clone()).unwrap();
        engine.create_resource(sala, "Sala 1".into(), 1).await.unwrap();
        engine
            .schedule_event(yoga, sala, "Yoga".into(), Span::new(9 * H, 10 * H), EventKind::Group, 0)
            .await
            .unwrap();
        // One conflict, one capacity violation
        let _ = engine
            .schedule_event(Ulid::new(), sala, "Clash".into(), Span::new(9 * H, 11 * H), EventKind::Group, 0)
            .await;
        engine.confirm_reservation(Ulid::new(), yoga, Ulid::new()).await.unwrap();
        let _ = engine.confirm_reservation(Ulid::new(), yoga, Ulid::new()).await;
    }

    let engine = Engine::new(wal).unwrap();
    assert_eq!(engine.get_events(sala).await.unwrap().len(), 1);
    assert_eq!(engine.get_reservations(yoga).await.unwrap().len(), 1);
}
