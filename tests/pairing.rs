mod common;

use http::{Method, StatusCode};
use tower::ServiceExt;

use pairspace::db;
use pairspace::error::AppError;
use pairspace::flow::ConfirmFlow;
use pairspace::models::space::PendingMatch;

#[tokio::test]
async fn test_create_space_returns_invite_code() {
    let server = common::TestServer::new().await;
    let alice = server.create_user_with_token("alice").await;

    let response = server
        .router()
        .oneshot(common::authenticated_json_request(
            Method::POST,
            "/api/v1/spaces",
            &alice.auth_header(),
            &serde_json::json!({ "anniversary_date": "2020-01-01" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    let code = body["data"]["invite_code"].as_str().unwrap();
    assert_eq!(code.len(), 6);
    assert_eq!(body["data"]["partners"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_space_twice_is_rejected() {
    let server = common::TestServer::new().await;
    let alice = server.create_user_with_token("alice").await;
    server.create_space(&alice.user.id, "2020-01-01").await;

    let response = server
        .router()
        .oneshot(common::authenticated_json_request(
            Method::POST,
            "/api/v1/spaces",
            &alice.auth_header(),
            &serde_json::json!({ "anniversary_date": "2021-02-02" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = common::parse_body(response).await;
    assert_eq!(body["error"]["code"], "already_in_space");
}

#[tokio::test]
async fn test_redeem_previews_partner_without_mutation() {
    let server = common::TestServer::new().await;
    let alice = server.create_user_with_token("alice").await;
    let bob = server.create_user_with_token("bob").await;
    let (space_id, code) = server.create_space(&alice.user.id, "2020-01-01").await;

    // Redeem twice; neither call may change server state.
    for _ in 0..2 {
        let response = server
            .router()
            .oneshot(common::authenticated_json_request(
                Method::POST,
                "/api/v1/spaces/redeem",
                &bob.auth_header(),
                &serde_json::json!({ "code": code }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = common::parse_body(response).await;
        assert_eq!(body["data"]["space_id"], space_id.as_str());
        assert_eq!(body["data"]["partner"]["username"], "alice");
        assert_eq!(body["data"]["anniversary_date"], "2020-01-01");
    }

    // Still one partner, code still live.
    let space = db::spaces::get_space(server.pool(), &space_id).await.unwrap();
    assert_eq!(space.partners.len(), 1);
    assert_eq!(space.invite_code.as_deref(), Some(code.as_str()));
}

#[tokio::test]
async fn test_redeem_own_code_is_self_join() {
    let server = common::TestServer::new().await;
    let alice = server.create_user_with_token("alice").await;
    let (_space_id, code) = server.create_space(&alice.user.id, "2020-01-01").await;

    let response = server
        .router()
        .oneshot(common::authenticated_json_request(
            Method::POST,
            "/api/v1/spaces/redeem",
            &alice.auth_header(),
            &serde_json::json!({ "code": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::parse_body(response).await;
    assert_eq!(body["error"]["code"], "self_join");
}

#[tokio::test]
async fn test_redeem_unknown_code() {
    let server = common::TestServer::new().await;
    let bob = server.create_user_with_token("bob").await;

    let response = server
        .router()
        .oneshot(common::authenticated_json_request(
            Method::POST,
            "/api/v1/spaces/redeem",
            &bob.auth_header(),
            &serde_json::json!({ "code": "ZZZZZZ" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = common::parse_body(response).await;
    assert_eq!(body["error"]["code"], "invalid_code");
}

#[tokio::test]
async fn test_two_phase_join_retires_the_code() {
    let server = common::TestServer::new().await;
    let app = server.router();
    let alice = server.create_user_with_token("alice").await;
    let bob = server.create_user_with_token("bob").await;
    let carol = server.create_user_with_token("carol").await;
    let (space_id, code) = server.create_space(&alice.user.id, "2020-01-01").await;

    // Drive the client flow the way the UI would.
    let mut flow = ConfirmFlow::new();

    let response = app
        .clone()
        .oneshot(common::authenticated_json_request(
            Method::POST,
            "/api/v1/spaces/redeem",
            &bob.auth_header(),
            &serde_json::json!({ "code": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    let pending: PendingMatch = serde_json::from_value(body["data"].clone()).unwrap();
    flow.redeemed(pending);

    let confirm_code = flow.pending().unwrap().code.clone();
    let response = app
        .clone()
        .oneshot(common::authenticated_json_request(
            Method::POST,
            "/api/v1/spaces/join",
            &bob.auth_header(),
            &serde_json::json!({ "code": confirm_code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    assert_eq!(body["data"]["partners"].as_array().unwrap().len(), 2);
    assert!(body["data"]["invite_code"].is_null());
    flow.confirmed(space_id.clone());
    assert!(matches!(flow, ConfirmFlow::Paired { .. }));

    // The code no longer resolves for anyone else.
    let response = app
        .oneshot(common::authenticated_json_request(
            Method::POST,
            "/api/v1/spaces/redeem",
            &carol.auth_header(),
            &serde_json::json!({ "code": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_confirm_retry_by_joined_user_is_benign() {
    let server = common::TestServer::new().await;
    let app = server.router();
    let alice = server.create_user_with_token("alice").await;
    let bob = server.create_user_with_token("bob").await;
    let (space_id, code) = server.create_space(&alice.user.id, "2020-01-01").await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(common::authenticated_json_request(
                Method::POST,
                "/api/v1/spaces/join",
                &bob.auth_header(),
                &serde_json::json!({ "code": code }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = common::parse_body(response).await;
        assert_eq!(body["data"]["id"], space_id.as_str());
        assert_eq!(body["data"]["partners"].as_array().unwrap().len(), 2);
    }
}

#[tokio::test]
async fn test_confirm_loser_sees_generic_unavailable() {
    let server = common::TestServer::new().await;
    let app = server.router();
    let alice = server.create_user_with_token("alice").await;
    let bob = server.create_user_with_token("bob").await;
    let carol = server.create_user_with_token("carol").await;
    let (_space_id, code) = server.create_space(&alice.user.id, "2020-01-01").await;

    // Carol previews while the code is still live.
    let response = app
        .clone()
        .oneshot(common::authenticated_json_request(
            Method::POST,
            "/api/v1/spaces/redeem",
            &carol.auth_header(),
            &serde_json::json!({ "code": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    let pending: PendingMatch = serde_json::from_value(body["data"].clone()).unwrap();
    let mut flow = ConfirmFlow::new();
    flow.redeemed(pending);

    // Bob commits first.
    let response = app
        .clone()
        .oneshot(common::authenticated_json_request(
            Method::POST,
            "/api/v1/spaces/join",
            &bob.auth_header(),
            &serde_json::json!({ "code": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Carol's confirm now fails; the message must not leak who won.
    let response = app
        .oneshot(common::authenticated_json_request(
            Method::POST,
            "/api/v1/spaces/join",
            &carol.auth_header(),
            &serde_json::json!({ "code": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = common::parse_body(response).await;
    assert_eq!(
        body["error"]["message"],
        "this connection is no longer available"
    );
    let msg = flow.confirm_failed();
    assert_eq!(msg, "this connection is no longer available");
    assert_eq!(flow, ConfirmFlow::Idle);
}

#[tokio::test]
async fn test_add_partner_full_space_is_space_full() {
    let server = common::TestServer::new().await;
    let alice = server.create_user_with_token("alice").await;
    let bob = server.create_user_with_token("bob").await;
    let carol = server.create_user_with_token("carol").await;
    let space_id = server.create_paired_space(&alice.user.id, &bob.user.id).await;

    let err = db::spaces::add_partner(server.pool(), &space_id, &carol.user.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SpaceFull));

    let space = db::spaces::get_space(server.pool(), &space_id).await.unwrap();
    assert_eq!(space.partners.len(), 2);
}

#[tokio::test]
async fn test_join_while_already_in_another_space() {
    let server = common::TestServer::new().await;
    let alice = server.create_user_with_token("alice").await;
    let bob = server.create_user_with_token("bob").await;
    server.create_space(&bob.user.id, "2019-05-05").await;
    let (_space_id, code) = server.create_space(&alice.user.id, "2020-01-01").await;

    let response = server
        .router()
        .oneshot(common::authenticated_json_request(
            Method::POST,
            "/api/v1/spaces/join",
            &bob.auth_header(),
            &serde_json::json!({ "code": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = common::parse_body(response).await;
    assert_eq!(body["error"]["code"], "already_in_space");
}

#[tokio::test]
async fn test_membership_unique_violation_maps_to_already_in_space() {
    let server = common::TestServer::new().await;
    let alice = server.create_user_with_token("alice").await;
    let bob = server.create_user_with_token("bob").await;
    let (space_a, _code) = server.create_space(&alice.user.id, "2020-01-01").await;
    server.create_space(&bob.user.id, "2021-02-02").await;

    // Two confirms racing against different spaces can both pass the
    // membership pre-check; the unique index on user_id is what stops the
    // loser, and that error must read as already_in_space, not a 500.
    let err = sqlx::query("INSERT INTO space_members (space_id, user_id) VALUES (?, ?)")
        .bind(&space_a)
        .bind(&bob.user.id)
        .execute(server.pool())
        .await
        .unwrap_err();
    assert!(db::is_unique_violation(&err, "space_members.user_id"));
    assert!(!db::is_unique_violation(&err, "invite_codes.code"));

    let err = db::spaces::add_partner(server.pool(), &space_a, &bob.user.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyInSpace));
}

#[tokio::test]
async fn test_pet_names_are_per_partner() {
    let server = common::TestServer::new().await;
    let app = server.router();
    let alice = server.create_user_with_token("alice").await;
    let bob = server.create_user_with_token("bob").await;
    server.create_paired_space(&alice.user.id, &bob.user.id).await;

    // Unset until the partner writes them.
    let response = app
        .clone()
        .oneshot(common::authenticated_request(
            Method::GET,
            "/api/v1/spaces/pet-names",
            &alice.auth_header(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    assert!(body["data"]["pet_name"].is_null());
    assert!(body["data"]["partner_pet_name"].is_null());

    let response = app
        .clone()
        .oneshot(common::authenticated_json_request(
            Method::PUT,
            "/api/v1/spaces/pet-names",
            &alice.auth_header(),
            &serde_json::json!({ "pet_name": "bear", "partner_pet_name": "bunny" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    assert_eq!(body["data"]["pet_name"], "bear");
    assert_eq!(body["data"]["partner_pet_name"], "bunny");

    // Each partner keeps an independent pair; alice's write is invisible on
    // bob's row.
    let response = app
        .clone()
        .oneshot(common::authenticated_request(
            Method::GET,
            "/api/v1/spaces/pet-names",
            &bob.auth_header(),
        ))
        .await
        .unwrap();
    let body = common::parse_body(response).await;
    assert!(body["data"]["pet_name"].is_null());

    // No space, no pet names.
    let carol = server.create_user_with_token("carol").await;
    let response = app
        .oneshot(common::authenticated_request(
            Method::GET,
            "/api/v1/spaces/pet-names",
            &carol.auth_header(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_codes_are_never_reused_across_spaces() {
    let server = common::TestServer::new().await;
    let alice = server.create_user_with_token("alice").await;
    let bob = server.create_user_with_token("bob").await;
    let (space_id, code) = server.create_space(&alice.user.id, "2020-01-01").await;

    db::spaces::delete_space(server.pool(), &space_id)
        .await
        .unwrap();

    // The retired code row survives the deletion, so a new space can never
    // mint the same code.
    let row = db::invites::lookup(server.pool(), &code).await.unwrap();
    assert_eq!(row, Some((space_id, false)));

    let err = db::invites::resolve(server.pool(), &code).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCode));

    // Bob can create a fresh space afterwards; it gets its own live code.
    let (_new_space, new_code) = server.create_space(&bob.user.id, "2022-03-03").await;
    assert_ne!(new_code, code);
}

#[tokio::test]
async fn test_paired_notification_for_both_partners() {
    let server = common::TestServer::new().await;
    let app = server.router();
    let alice = server.create_user_with_token("alice").await;
    let bob = server.create_user_with_token("bob").await;
    let (_space_id, code) = server.create_space(&alice.user.id, "2020-01-01").await;

    let response = app
        .clone()
        .oneshot(common::authenticated_json_request(
            Method::POST,
            "/api/v1/spaces/join",
            &bob.auth_header(),
            &serde_json::json!({ "code": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for user in [&alice, &bob] {
        let response = app
            .clone()
            .oneshot(common::authenticated_request(
                Method::GET,
                "/api/v1/notifications",
                &user.auth_header(),
            ))
            .await
            .unwrap();
        let body = common::parse_body(response).await;
        let kinds: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["type"].as_str().unwrap())
            .collect();
        assert!(kinds.contains(&"paired"), "missing paired for {}", user.user.username);
    }
}

#[tokio::test]
async fn test_update_anniversary_date_by_either_partner() {
    let server = common::TestServer::new().await;
    let app = server.router();
    let alice = server.create_user_with_token("alice").await;
    let bob = server.create_user_with_token("bob").await;
    let space_id = server.create_paired_space(&alice.user.id, &bob.user.id).await;

    let response = app
        .clone()
        .oneshot(common::authenticated_json_request(
            Method::PUT,
            &format!("/api/v1/spaces/{space_id}"),
            &bob.auth_header(),
            &serde_json::json!({ "anniversary_date": "2021-06-15" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    assert_eq!(body["data"]["anniversary_date"], "2021-06-15");

    // Outsiders cannot touch it.
    let carol = server.create_user_with_token("carol").await;
    let response = app
        .oneshot(common::authenticated_json_request(
            Method::PUT,
            &format!("/api/v1/spaces/{space_id}"),
            &carol.auth_header(),
            &serde_json::json!({ "anniversary_date": "1999-09-09" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_my_space_shape() {
    let server = common::TestServer::new().await;
    let app = server.router();
    let alice = server.create_user_with_token("alice").await;

    // Null before any space exists.
    let response = app
        .clone()
        .oneshot(common::authenticated_request(
            Method::GET,
            "/api/v1/spaces/my",
            &alice.auth_header(),
        ))
        .await
        .unwrap();
    let body = common::parse_body(response).await;
    assert!(body["data"].is_null());

    let (space_id, _code) = server.create_space(&alice.user.id, "2020-01-01").await;

    let response = app
        .oneshot(common::authenticated_request(
            Method::GET,
            "/api/v1/spaces/my",
            &alice.auth_header(),
        ))
        .await
        .unwrap();
    let body = common::parse_body(response).await;
    assert_eq!(body["data"]["id"], space_id.as_str());
    assert_eq!(body["data"]["partners"][0]["username"], "alice");
}
