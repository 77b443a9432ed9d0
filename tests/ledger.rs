use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use std::collections::HashSet;
use std::sync::Arc;

use conference_registration::models::{
    Attendee, Block, Category, Day, ReservationRequest, Role, Seat, SeatSelection,
};
use conference_registration::services::{
    LedgerError, SeatCatalog, SeatLedger, TicketCodeGenerator, ValidationResult,
};
use conference_registration::store::{LedgerStore, MemoryLedgerStore};

// Первые VIP_SEATS мест VIP, остальные обычные
const VIP_SEATS: i64 = 2;

fn catalog(seat_count: i64) -> SeatCatalog {
    SeatCatalog::new((1..=seat_count).map(|id| {
        let row = ((id - 1) / 5 + 1) as i32;
        let index = ((id - 1) % 5 + 1) as i32;
        Seat {
            id,
            seat_number: format!("L-{}-{}", row, index),
            block: Block::Left,
            row_number: row,
            seat_index: index,
            category: if id <= VIP_SEATS { Category::Vip } else { Category::Regular },
        }
    }))
}

fn setup(seat_count: i64) -> (SeatLedger, Arc<MemoryLedgerStore>) {
    let store = Arc::new(MemoryLedgerStore::new());
    let ledger = SeatLedger::new(store.clone(), catalog(seat_count), TicketCodeGenerator::default());
    (ledger, store)
}

fn attendee() -> Attendee {
    Attendee {
        first_name: FirstName().fake(),
        last_name: LastName().fake(),
        email: SafeEmail().fake(),
        phone: format!("06{}", (10_000_000u32..99_999_999).fake::<u32>()),
        role: Role::Employee,
        institution_name: None,
    }
}

fn request(pairs: &[(i64, Day)]) -> ReservationRequest {
    let mut days: Vec<Day> = pairs.iter().map(|(_, day)| *day).collect();
    days.sort();
    days.dedup();
    ReservationRequest {
        attendee: attendee(),
        days,
        seats: pairs
            .iter()
            .map(|(seat_id, day)| SeatSelection { seat_id: *seat_id, day: *day })
            .collect(),
    }
}

async fn assert_single_claim_per_pair(ledger: &SeatLedger) {
    for day in Day::ALL {
        let claimed = ledger.claimed_seat_ids(day).await.unwrap();
        let unique: HashSet<i64> = claimed.iter().copied().collect();
        assert_eq!(claimed.len(), unique.len(), "duplicate claim on {}", day);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn contested_pair_has_exactly_one_winner() {
    let (ledger, store) = setup(20);
    let seat = 3;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.try_reserve(request(&[(seat, Day::Day1)])).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(LedgerError::Conflict { seat_id, seat_number, day }) => {
                assert_eq!(seat_id, seat);
                assert_eq!(seat_number, "L-1-3");
                assert_eq!(day, Day::Day1);
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(store.claim_count().await, 1);
    assert_eq!(store.reservation_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disjoint_requests_all_succeed() {
    let (ledger, store) = setup(20);

    let first = tokio::spawn({
        let ledger = ledger.clone();
        async move { ledger.try_reserve(request(&[(3, Day::Day1)])).await }
    });
    let second = tokio::spawn({
        let ledger = ledger.clone();
        async move { ledger.try_reserve(request(&[(4, Day::Day1)])).await }
    });

    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());
    assert_eq!(store.claim_count().await, 2);
}

#[tokio::test]
async fn conflicting_batch_commits_nothing() {
    let (ledger, store) = setup(20);
    ledger.try_reserve(request(&[(7, Day::Day2)])).await.unwrap();

    let err = ledger
        .try_reserve(request(&[(5, Day::Day1), (6, Day::Day2), (7, Day::Day2), (5, Day::Day2)]))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        LedgerError::Conflict { seat_id: 7, seat_number: "L-2-2".to_string(), day: Day::Day2 }
    );
    assert_eq!(store.claim_count().await, 1);
    assert_eq!(store.reservation_count().await, 1);
    assert!(ledger.claimed_seat_ids(Day::Day1).await.unwrap().is_empty());
}

#[tokio::test]
async fn conflict_reports_first_taken_pair_in_supplied_order() {
    let (ledger, _) = setup(20);
    ledger.try_reserve(request(&[(8, Day::Day3), (9, Day::Day3)])).await.unwrap();

    let err = ledger
        .try_reserve(request(&[(10, Day::Day3), (9, Day::Day3), (8, Day::Day3)]))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict { seat_id: 9, .. }));
}

#[tokio::test]
async fn successful_batch_creates_every_claim() {
    let (ledger, store) = setup(20);
    let pairs = [(3, Day::Day1), (3, Day::Day2), (4, Day::Day2), (5, Day::Day3)];

    let reservation = ledger.try_reserve(request(&pairs)).await.unwrap();

    assert_eq!(reservation.claims.len(), pairs.len());
    assert_eq!(reservation.days, vec![Day::Day1, Day::Day2, Day::Day3]);
    assert_eq!(store.claim_count().await, pairs.len());
    assert!(!reservation.is_used);
    assert_eq!(reservation.scan_count, 0);
}

#[tokio::test]
async fn vip_seat_rejects_whole_request_before_claiming() {
    let (ledger, store) = setup(20);

    let err = ledger
        .try_reserve(request(&[(3, Day::Day1), (1, Day::Day1)]))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::Validation(_)));
    assert_eq!(store.claim_count().await, 0);
    assert_eq!(store.reservation_count().await, 0);
}

#[tokio::test]
async fn student_without_institution_is_rejected() {
    let (ledger, store) = setup(20);
    let mut req = request(&[(3, Day::Day1)]);
    req.attendee.role = Role::Student;

    assert!(matches!(ledger.try_reserve(req.clone()).await, Err(LedgerError::Validation(_))));

    req.attendee.institution_name = Some("Université Mohammed V".to_string());
    let reservation = ledger.try_reserve(req).await.unwrap();
    assert_eq!(reservation.attendee.role, Role::Student);
    assert_eq!(store.claim_count().await, 1);
}

#[tokio::test]
async fn release_frees_every_pair() {
    let (ledger, store) = setup(20);
    let pairs = [(3, Day::Day1), (4, Day::Day2)];
    let reservation = ledger.try_reserve(request(&pairs)).await.unwrap();

    ledger.release_reservation(reservation.id).await.unwrap();
    assert_eq!(store.claim_count().await, 0);

    let again = ledger.try_reserve(request(&pairs)).await.unwrap();
    assert_ne!(again.id, reservation.id);
    assert_eq!(
        ledger.release_reservation(reservation.id).await.unwrap_err(),
        LedgerError::NotFound(format!("reservation {}", reservation.id))
    );
}

#[tokio::test]
async fn check_in_is_not_repeatable() {
    let (ledger, _) = setup(20);
    let reservation = ledger.try_reserve(request(&[(3, Day::Day1)])).await.unwrap();

    let first = ledger.validate_ticket(&reservation.qr_data, true).await.unwrap();
    let used = match first {
        ValidationResult::Used { reservation } => reservation,
        other => panic!("expected used, got {other:?}"),
    };
    assert!(used.is_used);

    let second = ledger.validate_ticket(&reservation.qr_data, true).await.unwrap();
    assert!(matches!(second, ValidationResult::AlreadyUsed { .. }));
    assert!(!second.is_valid());

    // Повторный скан ничего не меняет
    let after = ledger.reservation(reservation.id).await.unwrap();
    assert_eq!(after.scan_count, 1);
}

#[tokio::test]
async fn preview_scans_are_counted_without_check_in() {
    let (ledger, _) = setup(20);
    let reservation = ledger.try_reserve(request(&[(3, Day::Day1)])).await.unwrap();

    for _ in 0..3 {
        let result = ledger.validate_ticket(&reservation.qr_data, false).await.unwrap();
        assert!(matches!(result, ValidationResult::Unused { .. }));
    }

    let after = ledger.reservation(reservation.id).await.unwrap();
    assert!(!after.is_used);
    assert_eq!(after.scan_count, 3);
    assert!(after.last_scanned_at.is_some());

    let result = ledger.validate_ticket(&reservation.qr_data, true).await.unwrap();
    assert!(matches!(result, ValidationResult::Used { .. }));

    // Голый код без JSON не принимается
    let raw = ledger.validate_ticket(&reservation.ticket_code, true).await.unwrap();
    assert!(matches!(raw, ValidationResult::Invalid));
}

#[tokio::test]
async fn unknown_and_malformed_tickets() {
    let (ledger, _) = setup(20);

    let unknown = ledger.validate_ticket(r#"{"ticket_code": "ZZZZZZZZZZ"}"#, true).await.unwrap();
    assert!(matches!(unknown, ValidationResult::Unknown));

    let malformed = ledger.validate_ticket(r#"{"ticket_code": 42}"#, true).await.unwrap();
    assert!(matches!(malformed, ValidationResult::Invalid));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_check_ins_admit_once() {
    let (ledger, _) = setup(20);
    let reservation = ledger.try_reserve(request(&[(3, Day::Day1)])).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = ledger.clone();
            let qr = reservation.qr_data.clone();
            tokio::spawn(async move { ledger.validate_ticket(&qr, true).await })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        if matches!(handle.await.unwrap().unwrap(), ValidationResult::Used { .. }) {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_reserve_and_release_keeps_one_claim_per_pair() {
    let (ledger, _) = setup(12);

    let handles: Vec<_> = (0..48)
        .map(|i| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                let seat = 3 + (i % 10) as i64;
                let day = Day::ALL[(i % 3) as usize];
                if let Ok(reservation) = ledger.try_reserve(request(&[(seat, day), (3 + ((i + 1) % 10) as i64, day)])).await {
                    if i % 4 == 0 {
                        ledger.release_reservation(reservation.id).await.unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_single_claim_per_pair(&ledger).await;
}

#[tokio::test]
async fn ten_thousand_reservations_have_distinct_tickets() {
    // 3400 обычных мест * 3 дня дают больше 10 000 пар
    let (ledger, store) = setup(3400 + VIP_SEATS);
    let mut codes = HashSet::new();

    for n in 0..10_000i64 {
        let seat = VIP_SEATS + 1 + n / 3;
        let day = Day::ALL[(n % 3) as usize];
        let reservation = ledger.try_reserve(request(&[(seat, day)])).await.unwrap();
        assert!(codes.insert(reservation.ticket_code));
    }

    assert_eq!(codes.len(), 10_000);
    assert_eq!(store.reservation_count().await, 10_000);
}

#[tokio::test]
async fn list_filters_by_day_and_role() {
    let (ledger, store) = setup(20);
    ledger.try_reserve(request(&[(3, Day::Day1)])).await.unwrap();
    ledger.try_reserve(request(&[(4, Day::Day2)])).await.unwrap();

    let filter = conference_registration::store::ReservationFilter {
        day: Some(Day::Day2),
        ..Default::default()
    };
    let listed = ledger.reservations(&filter).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].claims[0].seat_id, 4);

    let students = store
        .list_reservations(&conference_registration::store::ReservationFilter {
            role: Some(Role::Student),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(students.is_empty());
}
