//! End-to-end tests for skill listings, their moderation and the childlock gate

mod common;

use common::{data, TestClient, TestServer, CHILD_USER, PARENT_USER};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn guitar_listing() -> Value {
    json!({
        "title": "Guitar lessons",
        "description": "Beginner friendly, one hour per week",
        "skill": "music",
        "priceCents": 2500,
    })
}

async fn create_listing(client: &TestClient) -> String {
    let response = client.create_listing(guitar_listing(), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    data(response).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_listing_goes_through_moderation() {
    let server = TestServer::spawn().await;
    let seller = TestClient::authenticated_student(server.base_url.clone()).await;
    let buyer = TestClient::authenticated_friend(server.base_url.clone()).await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;

    let response = seller.create_listing(guitar_listing(), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let listing = data(response).await;
    assert_eq!(listing["status"], "pending");
    let listing_id = listing["id"].as_str().unwrap().to_string();

    // Pending listings only reach their seller and moderators
    assert_eq!(
        buyer.get_listing(&listing_id).await.status(),
        StatusCode::NOT_FOUND
    );
    assert!(data(buyer.listings().await).await.as_array().unwrap().is_empty());
    assert_eq!(seller.get_listing(&listing_id).await.status(), StatusCode::OK);
    assert_eq!(
        data(seller.my_listings().await).await.as_array().unwrap().len(),
        1
    );

    let pending = data(admin.pending_listings().await).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let response = admin.moderate_listing(&listing_id, "approve").await;
    assert_eq!(response.status(), StatusCode::OK);
    let reviewed = data(response).await;
    assert_eq!(reviewed["status"], "approved");
    assert_eq!(reviewed["moderationNote"], "reviewed in tests");

    let listings = data(buyer.listings().await).await;
    assert_eq!(listings.as_array().unwrap().len(), 1);
    assert_eq!(listings[0]["id"], listing_id.as_str());

    let notifications = data(seller.notifications().await).await;
    assert_eq!(notifications[0]["notificationType"], "listing_approved");

    // A reviewed listing cannot be reviewed again
    assert_eq!(
        admin.moderate_listing(&listing_id, "reject").await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_rejected_listing_stays_hidden() {
    let server = TestServer::spawn().await;
    let seller = TestClient::authenticated_student(server.base_url.clone()).await;
    let buyer = TestClient::authenticated_friend(server.base_url.clone()).await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;

    let listing_id = create_listing(&seller).await;
    let response = admin.moderate_listing(&listing_id, "reject").await;
    assert_eq!(data(response).await["status"], "rejected");

    assert_eq!(
        buyer.get_listing(&listing_id).await.status(),
        StatusCode::NOT_FOUND
    );
    let notifications = data(seller.notifications().await).await;
    assert_eq!(notifications[0]["notificationType"], "listing_rejected");
}

#[tokio::test]
async fn test_listing_validation_and_deletion() {
    let server = TestServer::spawn().await;
    let seller = TestClient::authenticated_student(server.base_url.clone()).await;
    let other = TestClient::authenticated_friend(server.base_url.clone()).await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;

    let response = seller
        .create_listing(
            json!({ "title": " ", "skill": "music", "priceCents": -1 }),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let listing_id = create_listing(&seller).await;
    admin.moderate_listing(&listing_id, "approve").await;

    assert_eq!(
        other.delete_listing(&listing_id).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        seller.delete_listing(&listing_id).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        seller.get_listing(&listing_id).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_students_cannot_moderate() {
    let server = TestServer::spawn().await;
    let seller = TestClient::authenticated_student(server.base_url.clone()).await;
    let other = TestClient::authenticated_friend(server.base_url.clone()).await;

    let listing_id = create_listing(&seller).await;

    assert_eq!(other.pending_listings().await.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        other.moderate_listing(&listing_id, "approve").await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        seller.moderate_listing(&listing_id, "approve").await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_childlock_gates_child_listings() {
    let server = TestServer::spawn().await;
    let parent = TestClient::authenticated_parent(server.base_url.clone()).await;
    let child = TestClient::authenticated_child(server.base_url.clone()).await;
    let child_id = server.user_id(CHILD_USER);

    // Without a childlock nothing is asked
    create_listing(&child).await;

    parent.request_family_link(child_id).await;
    child
        .accept_family_link(server.user_id(PARENT_USER))
        .await;
    assert_eq!(
        parent.set_childlock(child_id, Some("open-sesame")).await.status(),
        StatusCode::OK
    );

    assert_eq!(
        child.create_listing(guitar_listing(), None).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        child
            .create_listing(guitar_listing(), Some("wrong"))
            .await
            .status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        child
            .create_listing(guitar_listing(), Some("open-sesame"))
            .await
            .status(),
        StatusCode::CREATED
    );
}
