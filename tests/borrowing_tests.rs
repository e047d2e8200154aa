//! Borrowing engine live-server tests
//!
//! Run with a server, Postgres and Redis up: cargo test -- --ignored

mod common;

use common::{borrow, create_book, get_book, register_and_login, return_book, unique_email};
use reqwest::Client;
use serde_json::Value;

use liber_server::services::borrowing::MAX_ACTIVE_BORROWS;

#[tokio::test]
#[ignore]
async fn borrow_decrements_stock_and_creates_record() {
    let client = Client::new();
    let (admin_token, _) = register_and_login(&client, "admin").await;
    let (member_token, member_id) = register_and_login(&client, "member").await;

    let book = create_book(&client, &admin_token, &unique_email("title"), 3).await;
    let book_id = book["id"].as_i64().unwrap();

    let response = borrow(&client, &member_token, book_id).await;
    assert_eq!(response.status(), 201);

    let record: Value = response.json().await.expect("Failed to parse record");
    assert_eq!(record["status"], "borrowed");
    assert!(record["return_date"].is_null());
    assert_eq!(record["user"]["id"].as_i64().unwrap(), member_id);
    assert_eq!(record["book"]["id"].as_i64().unwrap(), book_id);
    // stock attached to the committed record already reflects the decrement
    assert_eq!(record["book"]["stock"].as_i64().unwrap(), 2);

    let fetched = get_book(&client, &member_token, book_id).await;
    assert_eq!(fetched["stock"].as_i64().unwrap(), 2);
}

#[tokio::test]
#[ignore]
async fn return_increments_stock_and_closes_record() {
    let client = Client::new();
    let (admin_token, _) = register_and_login(&client, "admin").await;
    let (member_token, _) = register_and_login(&client, "member").await;

    let book = create_book(&client, &admin_token, &unique_email("title"), 1).await;
    let book_id = book["id"].as_i64().unwrap();

    assert_eq!(borrow(&client, &member_token, book_id).await.status(), 201);

    let response = return_book(&client, &member_token, book_id).await;
    assert_eq!(response.status(), 200);

    let record: Value = response.json().await.expect("Failed to parse record");
    assert_eq!(record["status"], "returned");
    assert!(!record["return_date"].is_null());
    assert_eq!(record["book"]["stock"].as_i64().unwrap(), 1);
}

#[tokio::test]
#[ignore]
async fn borrow_fails_when_out_of_stock() {
    let client = Client::new();
    let (admin_token, _) = register_and_login(&client, "admin").await;
    let (member_a, _) = register_and_login(&client, "member").await;
    let (member_b, _) = register_and_login(&client, "member").await;

    let book = create_book(&client, &admin_token, &unique_email("title"), 1).await;
    let book_id = book["id"].as_i64().unwrap();

    assert_eq!(borrow(&client, &member_a, book_id).await.status(), 201);
    assert_eq!(borrow(&client, &member_b, book_id).await.status(), 409);

    let fetched = get_book(&client, &member_a, book_id).await;
    assert_eq!(fetched["stock"].as_i64().unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn duplicate_borrow_of_same_book_fails() {
    let client = Client::new();
    let (admin_token, _) = register_and_login(&client, "admin").await;
    let (member_token, _) = register_and_login(&client, "member").await;

    let book = create_book(&client, &admin_token, &unique_email("title"), 5).await;
    let book_id = book["id"].as_i64().unwrap();

    assert_eq!(borrow(&client, &member_token, book_id).await.status(), 201);

    let response = borrow(&client, &member_token, book_id).await;
    assert_eq!(response.status(), 409);

    // only the first borrow decremented
    let fetched = get_book(&client, &member_token, book_id).await;
    assert_eq!(fetched["stock"].as_i64().unwrap(), 4);
}

#[tokio::test]
#[ignore]
async fn sixth_borrow_hits_the_active_cap() {
    let client = Client::new();
    let (admin_token, _) = register_and_login(&client, "admin").await;
    let (member_token, _) = register_and_login(&client, "member").await;

    let mut book_ids = Vec::new();
    for i in 0..=MAX_ACTIVE_BORROWS {
        let book = create_book(
            &client,
            &admin_token,
            &format!("{}-{}", unique_email("title"), i),
            1,
        )
        .await;
        book_ids.push(book["id"].as_i64().unwrap());
    }

    for book_id in &book_ids[..MAX_ACTIVE_BORROWS as usize] {
        assert_eq!(borrow(&client, &member_token, *book_id).await.status(), 201);
    }

    let sixth = book_ids[MAX_ACTIVE_BORROWS as usize];
    let response = borrow(&client, &member_token, sixth).await;
    assert_eq!(response.status(), 409);

    // the rejected borrow left the sixth book untouched
    let fetched = get_book(&client, &member_token, sixth).await;
    assert_eq!(fetched["stock"].as_i64().unwrap(), 1);

    // returning one frees a slot
    assert_eq!(
        return_book(&client, &member_token, book_ids[0]).await.status(),
        200
    );
    assert_eq!(borrow(&client, &member_token, sixth).await.status(), 201);
}

#[tokio::test]
#[ignore]
async fn double_return_fails_without_second_increment() {
    let client = Client::new();
    let (admin_token, _) = register_and_login(&client, "admin").await;
    let (member_token, _) = register_and_login(&client, "member").await;

    let book = create_book(&client, &admin_token, &unique_email("title"), 2).await;
    let book_id = book["id"].as_i64().unwrap();

    assert_eq!(borrow(&client, &member_token, book_id).await.status(), 201);
    assert_eq!(return_book(&client, &member_token, book_id).await.status(), 200);
    assert_eq!(return_book(&client, &member_token, book_id).await.status(), 409);

    let fetched = get_book(&client, &member_token, book_id).await;
    assert_eq!(fetched["stock"].as_i64().unwrap(), 2);
}

#[tokio::test]
#[ignore]
async fn return_without_borrow_fails() {
    let client = Client::new();
    let (admin_token, _) = register_and_login(&client, "admin").await;
    let (member_token, _) = register_and_login(&client, "member").await;

    let book = create_book(&client, &admin_token, &unique_email("title"), 1).await;
    let book_id = book["id"].as_i64().unwrap();

    assert_eq!(return_book(&client, &member_token, book_id).await.status(), 409);
}

#[tokio::test]
#[ignore]
async fn borrow_return_borrow_again_creates_a_second_record() {
    let client = Client::new();
    let (admin_token, _) = register_and_login(&client, "admin").await;
    let (member_token, _) = register_and_login(&client, "member").await;

    let book = create_book(&client, &admin_token, &unique_email("title"), 3).await;
    let book_id = book["id"].as_i64().unwrap();

    let first: Value = borrow(&client, &member_token, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse record");
    let first_id = first["id"].as_i64().unwrap();
    assert_eq!(first["book"]["stock"].as_i64().unwrap(), 2);

    let returned: Value = return_book(&client, &member_token, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse record");
    assert_eq!(returned["id"].as_i64().unwrap(), first_id);
    assert_eq!(returned["book"]["stock"].as_i64().unwrap(), 3);

    let second: Value = borrow(&client, &member_token, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse record");
    assert_ne!(second["id"].as_i64().unwrap(), first_id);
    assert_eq!(second["status"], "borrowed");
    assert_eq!(second["book"]["stock"].as_i64().unwrap(), 2);
}

#[tokio::test]
#[ignore]
async fn parallel_borrows_of_last_copy_yield_one_winner() {
    let client = Client::new();
    let (admin_token, _) = register_and_login(&client, "admin").await;

    let book = create_book(&client, &admin_token, &unique_email("title"), 1).await;
    let book_id = book["id"].as_i64().unwrap();

    let mut tokens = Vec::new();
    for _ in 0..4 {
        let (token, _) = register_and_login(&client, "member").await;
        tokens.push(token);
    }

    let (r0, r1, r2, r3) = tokio::join!(
        borrow(&client, &tokens[0], book_id),
        borrow(&client, &tokens[1], book_id),
        borrow(&client, &tokens[2], book_id),
        borrow(&client, &tokens[3], book_id),
    );

    let statuses = [r0.status(), r1.status(), r2.status(), r3.status()];
    let wins = statuses.iter().filter(|s| s.as_u16() == 201).count();
    let conflicts = statuses.iter().filter(|s| s.as_u16() == 409).count();

    assert_eq!(wins, 1, "exactly one borrow should win: {:?}", statuses);
    assert_eq!(conflicts, 3, "the rest should conflict: {:?}", statuses);

    let fetched = get_book(&client, &tokens[0], book_id).await;
    assert_eq!(fetched["stock"].as_i64().unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn my_borrows_lists_only_active_records() {
    let client = Client::new();
    let (admin_token, _) = register_and_login(&client, "admin").await;
    let (member_token, _) = register_and_login(&client, "member").await;

    let kept = create_book(&client, &admin_token, &unique_email("kept"), 1).await;
    let returned = create_book(&client, &admin_token, &unique_email("returned"), 1).await;
    let kept_id = kept["id"].as_i64().unwrap();
    let returned_id = returned["id"].as_i64().unwrap();

    assert_eq!(borrow(&client, &member_token, kept_id).await.status(), 201);
    assert_eq!(borrow(&client, &member_token, returned_id).await.status(), 201);
    assert_eq!(
        return_book(&client, &member_token, returned_id).await.status(),
        200
    );

    let response = client
        .get(format!("{}/borrows", common::BASE_URL))
        .bearer_auth(&member_token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let records: Vec<Value> = response.json().await.expect("Failed to parse records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["book"]["id"].as_i64().unwrap(), kept_id);
}

#[tokio::test]
#[ignore]
async fn admin_cannot_borrow() {
    let client = Client::new();
    let (admin_token, _) = register_and_login(&client, "admin").await;

    let book = create_book(&client, &admin_token, &unique_email("title"), 1).await;
    let book_id = book["id"].as_i64().unwrap();

    assert_eq!(borrow(&client, &admin_token, book_id).await.status(), 403);
}

#[tokio::test]
#[ignore]
async fn borrow_of_unknown_book_is_not_found() {
    let client = Client::new();
    let (member_token, _) = register_and_login(&client, "member").await;

    assert_eq!(borrow(&client, &member_token, 999_999_999).await.status(), 404);
}
