use evreg_database::Database;
use evreg_registration::{
    RegistrationError, RegistrationRequest, RegistrationService, SearchParams, migrations,
};
use serde_json::json;

async fn service(name: &str, default_total_seats: u32) -> RegistrationService {
    let db = Database::builder()
        .url("mem://")
        .session("registration_tests", name)
        .migrations(migrations())
        .init()
        .await
        .expect("migrated in-memory database");
    RegistrationService::new(db, default_total_seats)
}

fn attendee(first: &str, last: &str, n: u32) -> RegistrationRequest {
    RegistrationRequest::new(first, last, format!("{:010}", 5_550_000_000_u64 + u64::from(n)))
}

fn sort(sort_by: &str, order: Option<&str>) -> SearchParams {
    SearchParams {
        sort_by: Some(sort_by.to_owned()),
        order: order.map(str::to_owned),
        ..SearchParams::default()
    }
}

fn first_names(page: &evreg_registration::RegistrationPage) -> Vec<&str> {
    page.data.iter().map(|r| r.first_name.as_str()).collect()
}

#[tokio::test]
async fn registration_is_stored_with_server_timestamp() {
    let service = service("stored", 10).await;
    let before = chrono::Utc::now();

    let created = service.register(attendee("Ada", "Lovelace", 1)).await.expect("admitted");

    assert!(!created.id.is_empty());
    assert_eq!(created.first_name, "Ada");
    assert_eq!(created.phone_number, "5550000001");
    assert!(created.registered_at >= before - chrono::Duration::seconds(1));

    let page = service.search(&SearchParams::default()).await.expect("search");
    assert_eq!(page.data, vec![created]);
}

#[tokio::test]
async fn duplicate_phone_is_rejected_regardless_of_names() {
    let service = service("duplicate", 10).await;
    service.register(attendee("Ada", "Lovelace", 7)).await.expect("first");

    let err = service.register(attendee("Grace", "Hopper", 7)).await.unwrap_err();
    assert!(matches!(err, RegistrationError::DuplicatePhone { .. }));
    assert_eq!(err.to_string(), "Phone number already registered");

    let seats = service.seats().await.expect("seats");
    assert_eq!(seats.remaining_seats, 9);
}

#[tokio::test]
async fn validation_runs_before_touching_the_store() {
    let service = service("validation", 10).await;

    let err = service.register(RegistrationRequest::new("Ada", "Lovelace", "12345")).await;
    assert!(matches!(err, Err(RegistrationError::Validation { .. })));

    // Nothing was admitted, so the configuration was never created either.
    let err = service.seats().await.unwrap_err();
    assert!(matches!(err, RegistrationError::ConfigNotFound { .. }));
}

#[tokio::test]
async fn third_attendee_is_turned_away_when_two_seats_exist() {
    let service = service("end_to_end", 2).await;

    service.register(attendee("Ada", "Lovelace", 1)).await.expect("first seat");
    service.register(attendee("Grace", "Hopper", 2)).await.expect("second seat");
    let err = service.register(attendee("Alan", "Turing", 3)).await.unwrap_err();

    assert!(matches!(err, RegistrationError::CapacityExceeded { .. }));
    assert_eq!(err.to_string(), "No seats available");

    let seats = service.seats().await.expect("seats");
    assert_eq!((seats.remaining_seats, seats.total_seats), (0, 2));
}

#[tokio::test]
async fn lowering_the_limit_keeps_existing_registrations() {
    let service = service("lowering", 5).await;
    for n in 0..3 {
        service.register(attendee("Ada", "Lovelace", n)).await.expect("admitted");
    }

    let config = service.set_seats(&json!(1)).await.expect("lowered");
    assert_eq!(config.total_seats, 1);

    let seats = service.seats().await.expect("seats");
    assert_eq!((seats.remaining_seats, seats.total_seats), (-2, 1));

    let page = service.search(&SearchParams::default()).await.expect("search");
    assert_eq!(page.pagination.total, 3);

    let err = service.register(attendee("Grace", "Hopper", 9)).await.unwrap_err();
    assert!(matches!(err, RegistrationError::CapacityExceeded { .. }));

    service.set_seats(&json!(4)).await.expect("raised");
    service.register(attendee("Grace", "Hopper", 9)).await.expect("seat after raising limit");
}

#[tokio::test]
async fn seat_configuration_lifecycle() {
    let service = service("config", 100).await;

    let err = service.set_seats(&json!(50)).await.unwrap_err();
    assert!(matches!(err, RegistrationError::ConfigNotFound { .. }));
    assert_eq!(err.to_string(), "Event configuration not found");

    assert_eq!(service.event_config().await.expect("created").total_seats, 100);
    assert_eq!(service.event_config().await.expect("existing").total_seats, 100);

    assert_eq!(service.set_seats(&json!(50)).await.expect("updated").total_seats, 50);
    let seats = service.seats().await.expect("seats");
    assert_eq!((seats.remaining_seats, seats.total_seats), (50, 50));
}

#[tokio::test]
async fn invalid_seat_limits_are_rejected() {
    let service = service("invalid_seats", 10).await;
    service.event_config().await.expect("config");

    for (value, message) in [
        (json!(0), "Total seats must be greater than 0"),
        (json!(-5), "Total seats must be greater than 0"),
        (json!(3.5), "Total seats must be an integer"),
    ] {
        let err = service.set_seats(&value).await.unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidValue { .. }), "{value}");
        assert_eq!(err.to_string(), message);
    }

    assert_eq!(service.seats().await.expect("seats").total_seats, 10);
}

#[tokio::test]
async fn search_sorts_in_both_directions() {
    let service = service("sorting", 10).await;
    for (n, (first, last)) in [("Carol", "Young"), ("alice", "Xu"), ("Bob", "Zimmer")].iter().enumerate() {
        let n = u32::try_from(n).expect("small index");
        service.register(attendee(first, last, n)).await.expect("admitted");
    }

    let asc = service.search(&sort("firstName", None)).await.expect("asc");
    assert_eq!(first_names(&asc), ["Bob", "Carol", "alice"]);

    let desc = service.search(&sort("firstName", Some("desc"))).await.expect("desc");
    assert_eq!(first_names(&desc), ["alice", "Carol", "Bob"]);

    let by_last = service.search(&sort("lastName", Some("ASC"))).await.expect("lastName");
    assert_eq!(first_names(&by_last), ["alice", "Carol", "Bob"]);

    let oldest_first = service.search(&sort("registeredAt", Some("asc"))).await.expect("oldest");
    assert_eq!(first_names(&oldest_first), ["Carol", "alice", "Bob"]);

    let newest_first = service.search(&SearchParams::default()).await.expect("default");
    assert_eq!(first_names(&newest_first), ["Bob", "alice", "Carol"]);

    let err = service.search(&sort("phoneNumber", None)).await.unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidSortField { .. }));
}

#[tokio::test]
async fn search_matches_names_case_insensitively() {
    let service = service("searching", 10).await;
    service.register(attendee("Johanna", "Smith", 1)).await.expect("admitted");
    service.register(attendee("Mary", "Johnson", 2)).await.expect("admitted");
    service.register(attendee("Peter", "Parker", 3)).await.expect("admitted");

    let params = SearchParams { search: Some("JOH".to_owned()), ..sort("firstName", None) };
    let page = service.search(&params).await.expect("search");
    assert_eq!(first_names(&page), ["Johanna", "Mary"]);
    assert_eq!(page.pagination.total, 2);

    // Literal substring, not a pattern.
    let params = SearchParams { search: Some("p.t".to_owned()), ..SearchParams::default() };
    assert!(service.search(&params).await.expect("search").data.is_empty());
}

#[tokio::test]
async fn twenty_five_registrations_span_three_pages() {
    let service = service("pagination", 100).await;
    for n in 0..25 {
        service.register(attendee("Attendee", "Number", n)).await.expect("admitted");
    }

    let page = |page| SearchParams { page: Some(page), limit: Some(10), ..SearchParams::default() };

    let first = service.search(&page(1)).await.expect("page 1");
    assert_eq!(first.data.len(), 10);
    assert_eq!((first.pagination.total, first.pagination.total_pages), (25, 3));

    let last = service.search(&page(3)).await.expect("page 3");
    assert_eq!(last.data.len(), 5);
    assert_eq!(last.pagination.page, 3);

    let beyond = service.search(&page(4)).await.expect("page 4");
    assert!(beyond.data.is_empty());
    assert_eq!(beyond.pagination.total_pages, 3);
}

#[tokio::test]
async fn empty_search_has_zero_pages() {
    let service = service("empty", 10).await;
    let page = service.search(&SearchParams::default()).await.expect("search");
    assert!(page.data.is_empty());
    assert_eq!((page.pagination.total, page.pagination.page, page.pagination.total_pages), (0, 1, 0));
}

/// Outcome tally of a burst of parallel registrations.
#[derive(Debug, Default)]
struct Burst {
    admitted: u32,
    full: u32,
    duplicate: u32,
    failed: Vec<String>,
}

async fn burst(service: &RegistrationService, requests: Vec<RegistrationRequest>) -> Burst {
    let tasks: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let service = service.clone();
            tokio::spawn(async move { service.register(request).await })
        })
        .collect();

    let mut burst = Burst::default();
    for task in tasks {
        match task.await.expect("task completed") {
            Ok(_) => burst.admitted += 1,
            Err(RegistrationError::CapacityExceeded { .. }) => burst.full += 1,
            Err(RegistrationError::DuplicatePhone { .. }) => burst.duplicate += 1,
            Err(other) => burst.failed.push(other.to_string()),
        }
    }
    burst
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_registrations_fill_exactly_the_limit() {
    const SEATS: u32 = 5;
    const ATTEMPTS: u32 = 20;

    let service = service("concurrency_capped", SEATS).await;
    service.event_config().await.expect("config");

    let result = burst(&service, (0..ATTEMPTS).map(|n| attendee("Racer", "Runner", n)).collect()).await;

    assert!(result.failed.is_empty(), "store failures: {:?}", result.failed);
    assert_eq!((result.admitted, result.full), (SEATS, ATTEMPTS - SEATS));

    let page = service.search(&SearchParams::default()).await.expect("search");
    assert_eq!(page.pagination.total, u64::from(SEATS));
    assert_eq!(service.seats().await.expect("seats").remaining_seats, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_registrations_all_succeed_while_seats_remain() {
    const ATTEMPTS: u32 = 30;

    // No configuration yet: the racing admissions also race to create it.
    let service = service("concurrency_open", 1000).await;

    let result = burst(&service, (0..ATTEMPTS).map(|n| attendee("Racer", "Runner", n)).collect()).await;

    assert!(result.failed.is_empty(), "store failures: {:?}", result.failed);
    assert_eq!(result.admitted, ATTEMPTS);

    let seats = service.seats().await.expect("seats");
    assert_eq!((seats.remaining_seats, seats.total_seats), (970, 1000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_registrations_with_one_phone_admit_once() {
    const ATTEMPTS: u32 = 20;

    let service = service("concurrency_duplicate", 100).await;
    service.event_config().await.expect("config");

    let result = burst(&service, (0..ATTEMPTS).map(|_| attendee("Twin", "Sibling", 42)).collect()).await;

    assert!(result.failed.is_empty(), "store failures: {:?}", result.failed);
    assert_eq!((result.admitted, result.duplicate), (1, ATTEMPTS - 1));
    assert_eq!(service.seats().await.expect("seats").remaining_seats, 99);
}
