//! Saved addresses and cards, checkout, order history, tracking and returns.

use reqwest::StatusCode;
use serde_json::{Value, json};

use kranes_integration_tests::{TestContext, body, message, sample_address};

fn order(items: Value, address_id: &str, card_id: &str) -> Value {
    json!({ "items": items, "addressId": address_id, "cardId": card_id })
}

#[tokio::test]
async fn test_saved_addresses_and_cards() {
    let ctx = TestContext::new().await;
    let token = ctx.register("wallet@example.com").await;

    let address_id = ctx.add_address(&token).await;
    let card_id = ctx.add_card(&token).await;

    let addresses = body(
        ctx.get("/account/addresses")
            .bearer_auth(&token)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(addresses[0]["id"], address_id.as_str());
    assert_eq!(addresses[0]["addressLine1"], "1 Market Street");

    let cards = body(ctx.get("/account/cards").bearer_auth(&token).send().await.unwrap()).await;
    assert_eq!(cards[0]["id"], card_id.as_str());
    assert_eq!(cards[0]["last4"], "4242");
    assert_eq!(cards[0]["brand"], "Visa");
    assert!(cards[0].get("cardNumber").is_none());

    let resp = ctx
        .delete(&format!("/account/addresses/{address_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = ctx
        .delete(&format!("/account/cards/{card_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let addresses = body(
        ctx.get("/account/addresses")
            .bearer_auth(&token)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(addresses, json!([]));
}

#[tokio::test]
async fn test_invalid_address_and_card() {
    let ctx = TestContext::new().await;
    let token = ctx.register("bad-wallet@example.com").await;

    let mut address = sample_address();
    address["phone"] = json!("123");
    let resp = ctx
        .post("/account/addresses", &address)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(resp).await, "Invalid address payload");

    let resp = ctx
        .post(
            "/account/cards",
            &json!({ "holderName": "Al", "cardNumber": "4242", "expMonth": "1", "expYear": "30" }),
        )
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(resp).await, "Invalid card payload");
}

#[tokio::test]
async fn test_place_order_decrements_stock() {
    let ctx = TestContext::new().await;
    let (token, address_id, card_id) = ctx.shopper("buyer@example.com").await;

    // Warm the query cache so a stale page would show.
    let before = body(ctx.get("/products?q=stub%20product%2012").send().await.unwrap()).await;
    assert_eq!(before["items"][0]["stock"], 120);

    let resp = ctx
        .post(
            "/orders",
            &order(
                json!([{ "id": 12, "quantity": 2 }, { "id": 3, "quantity": 1 }]),
                &address_id,
                &card_id,
            ),
        )
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let placed = body(resp).await;

    // 2 x 12.99 + 3.99 = 29.97, tax 2.25, shipping 6
    assert_eq!(placed["subtotal"], 29.97);
    assert_eq!(placed["tax"], 2.25);
    assert_eq!(placed["shipping"], 6.0);
    assert_eq!(placed["total"], 38.22);
    assert_eq!(placed["status"], "processing");
    assert_eq!(placed["payment"]["status"], "captured");
    assert_eq!(placed["payment"]["cardLast4"], "4242");
    assert_eq!(placed["payment"]["amount"], 38.22);
    assert!(
        placed["payment"]["transactionId"]
            .as_str()
            .unwrap()
            .starts_with("txn_")
    );
    assert_eq!(placed["shippingAddress"]["id"], address_id.as_str());

    let level = body(ctx.get("/inventory/12").send().await.unwrap()).await;
    assert_eq!(level["stock"], 118);

    let after = body(ctx.get("/products?q=stub%20product%2012").send().await.unwrap()).await;
    assert_eq!(after["items"][0]["stock"], 118);

    let orders = body(ctx.get("/account/orders").bearer_auth(&token).send().await.unwrap()).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["id"], placed["id"]);

    let stored: Value = serde_json::from_str(
        &std::fs::read_to_string(ctx.data_dir().join("orders.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(stored[0]["id"], placed["id"]);
}

#[tokio::test]
async fn test_over_stock_order_changes_nothing() {
    let ctx = TestContext::new().await;
    let (token, address_id, card_id) = ctx.shopper("greedy@example.com").await;

    let resp = ctx
        .post(
            "/orders",
            &order(
                json!([{ "id": 5, "quantity": 1 }, { "id": 8, "quantity": 121 }]),
                &address_id,
                &card_id,
            ),
        )
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(resp).await, "Insufficient stock for Stub Product 8");

    let level = body(ctx.get("/inventory/5").send().await.unwrap()).await;
    assert_eq!(level["stock"], 120);

    let orders = body(ctx.get("/account/orders").bearer_auth(&token).send().await.unwrap()).await;
    assert_eq!(orders, json!([]));
}

#[tokio::test]
async fn test_order_rejections() {
    let ctx = TestContext::new().await;
    let (token, address_id, card_id) = ctx.shopper("picky@example.com").await;

    let cases = [
        (
            order(json!([]), &address_id, &card_id),
            "Invalid order payload",
        ),
        (
            order(json!([{ "id": 1, "quantity": 0 }]), &address_id, &card_id),
            "Invalid order payload",
        ),
        (
            order(json!([{ "id": 1, "quantity": 1 }]), "addr_missing", &card_id),
            "Select a valid saved address and card",
        ),
        (
            order(json!([{ "id": 1, "quantity": 1 }]), &address_id, "card_missing"),
            "Select a valid saved address and card",
        ),
        (
            order(json!([{ "id": 404, "quantity": 1 }]), &address_id, &card_id),
            "Product 404 not found",
        ),
    ];

    for (payload, expected) in cases {
        let resp = ctx
            .post("/orders", &payload)
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(message(resp).await, expected);
    }

    let resp = ctx
        .post(
            "/orders",
            &order(json!([{ "id": 1, "quantity": 1 }]), &address_id, &card_id),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_order_with_failing_catalog() {
    let ctx = TestContext::with_failing_catalog().await;
    let (token, address_id, card_id) = ctx.shopper("offline@example.com").await;

    let resp = ctx
        .post(
            "/orders",
            &order(json!([{ "id": 1, "quantity": 1 }]), &address_id, &card_id),
        )
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(message(resp).await, "Product catalog is unavailable");
}

#[tokio::test]
async fn test_tracking_and_returns() {
    let ctx = TestContext::new().await;
    let (token, address_id, card_id) = ctx.shopper("tracker@example.com").await;

    let placed = body(
        ctx.post(
            "/orders",
            &order(json!([{ "id": 40, "quantity": 2 }]), &address_id, &card_id),
        )
        .bearer_auth(&token)
        .send()
        .await
        .unwrap(),
    )
    .await;
    let order_id = placed["id"].as_str().unwrap();
    // Over the free shipping threshold.
    assert_eq!(placed["shipping"], 0.0);

    let tracking = body(
        ctx.get(&format!("/account/tracking/{order_id}"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(tracking["orderId"], order_id);
    assert_eq!(tracking["status"], "processing");
    let timeline = tracking["timeline"].as_array().unwrap();
    assert_eq!(timeline.len(), 4);
    assert_eq!(timeline[0]["completed"], true);
    assert_eq!(timeline[1]["completed"], false);

    let resp = ctx
        .post(
            "/account/returns",
            &json!({ "orderId": order_id, "reason": "Arrived damaged" }),
        )
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let request = body(resp).await;
    assert_eq!(request["status"], "requested");
    assert_eq!(request["orderId"], order_id);

    let returns = body(ctx.get("/account/returns").bearer_auth(&token).send().await.unwrap()).await;
    assert_eq!(returns.as_array().unwrap().len(), 1);

    let resp = ctx
        .post(
            "/account/returns",
            &json!({ "orderId": order_id, "reason": "meh" }),
        )
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(resp).await, "Invalid return request");
}

#[tokio::test]
async fn test_orders_are_private() {
    let ctx = TestContext::new().await;
    let (owner, address_id, card_id) = ctx.shopper("owner@example.com").await;
    let stranger = ctx.register("stranger@example.com").await;

    let placed = body(
        ctx.post(
            "/orders",
            &order(json!([{ "id": 2, "quantity": 1 }]), &address_id, &card_id),
        )
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap(),
    )
    .await;
    let order_id = placed["id"].as_str().unwrap();

    let resp = ctx
        .get(&format!("/account/tracking/{order_id}"))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(message(resp).await, "Order not found");

    let resp = ctx
        .post(
            "/account/returns",
            &json!({ "orderId": order_id, "reason": "Not mine at all" }),
        )
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let orders = body(
        ctx.get("/account/orders")
            .bearer_auth(&stranger)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(orders, json!([]));
}
