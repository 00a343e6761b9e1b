//! End-to-end journeys against a real database.
//!
//! These tests require a `PostgreSQL` database reachable through
//! `LIVESTALL_DATABASE_URL`. Each test uses fresh accounts, so they can run
//! against a shared database in any order.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use reqwest::StatusCode;
use rust_decimal::Decimal;

use livestall_core::cart::{Cart, CartLine};
use livestall_core::checkout::{ShippingPolicy, split_by_seller};
use livestall_core::otp::OtpPurpose;
use livestall_core::validation::{CouponInput, ProductInput, SellerApplicationInput};
use livestall_core::{Email, OrderStage, ProductId, ProductStatus, UserId, UserRole};
use livestall_integration_tests::{TestServer, unique_email};
use livestall_web::db::orders::NewOrders;
use livestall_web::db::otp::OtpCheck;
use livestall_web::db::{
    ConversationRepository, CouponRepository, OrderRepository, OtpRepository, PayoutRepository,
    ProductRepository, RepositoryError, SellerRepository, UserRepository,
};
use livestall_web::models::ShippingAddress;
use livestall_web::services::auth::AuthService;

const PASSWORD: &str = "correct-horse-battery";

async fn register(server: &TestServer, client: &reqwest::Client, email: &str, name: &str) {
    let response = client
        .post(server.url("/auth/register"))
        .form(&[
            ("email", email),
            ("display_name", name),
            ("password", PASSWORD),
            ("password_confirm", PASSWORD),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/");
}

async fn sign_in(server: &TestServer, client: &reqwest::Client, email: &str) {
    let response = client
        .post(server.url("/auth/login"))
        .form(&[("email", email), ("password", PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

async fn create_user(
    server: &TestServer,
    prefix: &str,
    name: &str,
    role: UserRole,
) -> (UserId, String) {
    let email = unique_email(prefix);
    let user = AuthService::new(&server.pool)
        .create_account(&email, name, PASSWORD, PASSWORD, role)
        .await
        .unwrap();
    (user.id, email)
}

async fn user_id(server: &TestServer, email: &str) -> UserId {
    UserRepository::new(&server.pool)
        .get_by_email(&Email::parse_normalized(email).unwrap())
        .await
        .unwrap()
        .unwrap()
        .id
}

fn unique_code(prefix: &str) -> String {
    let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("{prefix}{}", suffix.to_uppercase())
}

fn address(name: &str) -> [(&'static str, String); 6] {
    [
        ("name", name.to_owned()),
        ("address", "4 Quay Street".to_owned()),
        ("city", "Bristol".to_owned()),
        ("postal_code", "BS1 4DJ".to_owned()),
        ("country", "GB".to_owned()),
        ("phone", "+44 117 496 0000".to_owned()),
    ]
}

/// An approved seller with one active product.
struct Shop {
    seller_id: UserId,
    seller_email: String,
    product_id: ProductId,
}

async fn seller_with_product(server: &TestServer, stock: u32) -> Shop {
    let auth = AuthService::new(&server.pool);
    let seller_email = unique_email("potter");
    let admin = auth
        .create_account(
            &unique_email("reviewer"),
            "Reviewer",
            PASSWORD,
            PASSWORD,
            UserRole::Admin,
        )
        .await
        .unwrap();
    let seller = auth
        .create_account(
            &seller_email,
            "Pat Potter",
            PASSWORD,
            PASSWORD,
            UserRole::Customer,
        )
        .await
        .unwrap();

    let sellers = SellerRepository::new(&server.pool);
    let store = SellerApplicationInput {
        store_name: "Pat's Pots".to_owned(),
        phone: "+1 555 0100".to_owned(),
        description: String::new(),
        payout_account: "US00 1234 5678".to_owned(),
    }
    .validate()
    .unwrap();
    let application = sellers.submit_application(seller.id, &store).await.unwrap();
    sellers.approve(application, admin.id).await.unwrap();

    let fields = ProductInput {
        title: "Speckled mug".to_owned(),
        description: "Holds 350 ml.".to_owned(),
        price: "18.00".to_owned(),
        stock: stock.to_string(),
        category: "Kitchen".to_owned(),
    }
    .validate()
    .unwrap();
    let product_id = ProductRepository::new(&server.pool)
        .create(seller.id, &fields, ProductStatus::Active)
        .await
        .unwrap();

    Shop {
        seller_id: seller.id,
        seller_email,
        product_id,
    }
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_register_then_account_page_shows_profile() {
    let server = TestServer::start().await;
    let client = server.client();
    let email = unique_email("buyer");

    register(&server, &client, &email, "Robin").await;

    let response = client.get(server.url("/account")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains(&email));
    assert!(html.contains("Robin"));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_duplicate_registration_is_rejected() {
    let server = TestServer::start().await;
    let email = unique_email("twice");
    register(&server, &server.client(), &email, "First").await;

    let response = server
        .client()
        .post(server.url("/auth/register"))
        .form(&[
            ("email", email.as_str()),
            ("display_name", "Second"),
            ("password", PASSWORD),
            ("password_confirm", PASSWORD),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("An account with this email already exists"));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_wrong_password_does_not_sign_in() {
    let server = TestServer::start().await;
    let email = unique_email("forgetful");
    register(&server, &server.client(), &email, "Kim").await;

    let client = server.client();
    let response = client
        .post(server.url("/auth/login"))
        .form(&[("email", email.as_str()), ("password", "not-my-password")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .text()
            .await
            .unwrap()
            .contains("Invalid email or password")
    );

    let response = client.get(server.url("/account")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_customer_cannot_open_seller_center() {
    let server = TestServer::start().await;
    let client = server.client();
    register(&server, &client, &unique_email("curious"), "Alex").await;

    let response = client.get(server.url("/seller")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.get(server.url("/admin")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_checkout_places_order_and_takes_stock() {
    let server = TestServer::start().await;
    let product_id = seller_with_product(&server, 5).await.product_id;

    let client = server.client();
    let email = unique_email("shopper");
    register(&server, &client, &email, "Jo Shopper").await;

    let response = client
        .post(server.url("/cart/add"))
        .header("HX-Request", "true")
        .form(&[("product_id", product_id.to_string()), ("quantity", "2".to_owned())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["hx-trigger"], "cart-updated");
    assert!(response.text().await.unwrap().contains('2'));

    let cart = client.get(server.url("/cart")).send().await.unwrap();
    assert_eq!(cart.status(), StatusCode::OK);
    assert!(cart.text().await.unwrap().contains("Speckled mug"));

    let response = client
        .post(server.url("/checkout"))
        .form(&[
            ("name", "Jo Shopper"),
            ("address", "1 Harbour Road"),
            ("city", "Portsmouth"),
            ("postal_code", "PO1 1AA"),
            ("country", "GB"),
            ("phone", "+44 20 7946 0000"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/orders");

    let product = ProductRepository::new(&server.pool)
        .get(product_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.stock, 3);

    let buyer = UserRepository::new(&server.pool)
        .get_by_email(&Email::parse_normalized(&email).unwrap())
        .await
        .unwrap()
        .unwrap();
    let orders = OrderRepository::new(&server.pool)
        .list_for_buyer(buyer.id)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    let order = orders.first().unwrap();
    assert_eq!(order.stage, OrderStage::Placed);
    assert_eq!(order.subtotal, Decimal::new(3600, 2));

    let items = OrderRepository::new(&server.pool).items(order.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items.first().unwrap().quantity, 2);

    let history = client.get(server.url("/orders")).send().await.unwrap();
    let html = history.text().await.unwrap();
    assert!(html.contains(&order.public_id));

    // Cart is emptied after checkout.
    let count = client.get(server.url("/cart/count")).send().await.unwrap();
    assert!(count.text().await.unwrap().contains(">0<"));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_buyer_cancel_restores_stock() {
    let server = TestServer::start().await;
    let product_id = seller_with_product(&server, 1).await.product_id;

    let client = server.client();
    let email = unique_email("fickle");
    register(&server, &client, &email, "Sam").await;

    client
        .post(server.url("/cart/add"))
        .form(&[("product_id", product_id.to_string())])
        .send()
        .await
        .unwrap();
    let response = client
        .post(server.url("/checkout"))
        .form(&[
            ("name", "Sam"),
            ("address", "9 Mill Lane"),
            ("city", "Leeds"),
            ("postal_code", "LS1 4AP"),
            ("country", "GB"),
            ("phone", "+44 113 496 0000"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let products = ProductRepository::new(&server.pool);
    assert_eq!(products.get(product_id).await.unwrap().unwrap().stock, 0);

    let buyer = UserRepository::new(&server.pool)
        .get_by_email(&Email::parse_normalized(&email).unwrap())
        .await
        .unwrap()
        .unwrap();
    let orders = OrderRepository::new(&server.pool);
    let order = orders
        .list_for_buyer(buyer.id)
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap();

    let response = client
        .post(server.url(&format!("/orders/{}/cancel", order.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let order = orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(order.stage, OrderStage::Cancelled);
    assert_eq!(products.get(product_id).await.unwrap().unwrap().stock, 1);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_price_change_during_checkout_needs_confirmation() {
    let server = TestServer::start().await;
    let shop = seller_with_product(&server, 5).await;

    let client = server.client();
    let email = unique_email("watcher");
    register(&server, &client, &email, "Lee").await;

    client
        .post(server.url("/cart/add"))
        .form(&[("product_id", shop.product_id.to_string())])
        .send()
        .await
        .unwrap();
    let page = client.get(server.url("/checkout")).send().await.unwrap();
    assert!(page.text().await.unwrap().contains("$18.00"));

    let fields = ProductInput {
        title: "Speckled mug".to_owned(),
        description: "Holds 350 ml.".to_owned(),
        price: "20.00".to_owned(),
        stock: "5".to_owned(),
        category: "Kitchen".to_owned(),
    }
    .validate()
    .unwrap();
    ProductRepository::new(&server.pool)
        .update(shop.product_id, shop.seller_id, &fields, ProductStatus::Active)
        .await
        .unwrap();

    let response = client
        .post(server.url("/checkout"))
        .form(&address("Lee"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("your cart changed"));
    assert!(html.contains("$20.00"));

    let buyer = user_id(&server, &email).await;
    let orders = OrderRepository::new(&server.pool);
    assert!(orders.list_for_buyer(buyer).await.unwrap().is_empty());

    // The refreshed cart was kept, so confirming again goes through.
    let response = client
        .post(server.url("/checkout"))
        .form(&address("Lee"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let placed = orders.list_for_buyer(buyer).await.unwrap();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed.first().unwrap().subtotal, Decimal::new(2000, 2));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_checkout_counts_coupon_use_and_refuses_exhausted_coupon() {
    let server = TestServer::start().await;
    let shop = seller_with_product(&server, 5).await;

    let code = unique_code("ONCE");
    let fields = CouponInput {
        code: code.clone(),
        kind: "fixed".to_owned(),
        value: "5.00".to_owned(),
        usage_limit: "1".to_owned(),
        ..CouponInput::default()
    }
    .validate()
    .unwrap();
    let coupons = CouponRepository::new(&server.pool);
    let coupon_id = coupons.create(None, &fields).await.unwrap();

    let client = server.client();
    let email = unique_email("saver");
    register(&server, &client, &email, "Ash").await;
    client
        .post(server.url("/cart/add"))
        .form(&[("product_id", shop.product_id.to_string())])
        .send()
        .await
        .unwrap();
    client
        .post(server.url("/cart/coupon"))
        .form(&[("code", code.as_str())])
        .send()
        .await
        .unwrap();
    let response = client
        .post(server.url("/checkout"))
        .form(&address("Ash"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let buyer = user_id(&server, &email).await;
    let orders = OrderRepository::new(&server.pool);
    let order = orders
        .list_for_buyer(buyer)
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
    assert_eq!(order.discount, Decimal::new(500, 2));
    assert_eq!(order.coupon_code.as_deref(), Some(code.as_str()));

    let coupon = coupons.get_by_code(&code).await.unwrap().unwrap();
    assert_eq!(coupon.used_count, 1);

    // A second checkout that still carries the spent coupon writes nothing.
    let products = ProductRepository::new(&server.pool);
    let product = products.get(shop.product_id).await.unwrap().unwrap();
    let stock_before = product.stock;
    let mut cart = Cart::new();
    cart.add(CartLine {
        product_id: product.id,
        seller_id: product.seller_id,
        seller_name: product.seller_name.clone(),
        title: product.title.clone(),
        unit_price: product.price,
        quantity: 1,
        image_url: None,
    });
    let drafts = split_by_seller(
        &cart,
        Some((&coupon, Decimal::new(500, 2))),
        &ShippingPolicy::default(),
    );
    let ship_to = ShippingAddress {
        name: "Ash".to_owned(),
        address: "4 Quay Street".to_owned(),
        city: "Bristol".to_owned(),
        postal_code: "BS1 4DJ".to_owned(),
        country: "GB".to_owned(),
        phone: "+44 117 496 0000".to_owned(),
    };
    let result = orders
        .place(&NewOrders {
            buyer_id: buyer,
            drafts: &drafts,
            address: &ship_to,
            coupon: Some((coupon_id, code.as_str())),
            placed_at: Utc::now(),
        })
        .await;
    assert!(matches!(result, Err(RepositoryError::Conflict(_))));

    assert_eq!(products.get(shop.product_id).await.unwrap().unwrap().stock, stock_before);
    assert_eq!(orders.list_for_buyer(buyer).await.unwrap().len(), 1);
    assert_eq!(coupons.get_by_code(&code).await.unwrap().unwrap().used_count, 1);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_otp_code_is_burned_after_five_wrong_guesses() {
    let server = TestServer::start().await;
    let codes = OtpRepository::new(&server.pool);
    let email = unique_email("guesser");

    codes.issue(&email, OtpPurpose::SignIn, "482913").await.unwrap();

    for remaining in (1..=4).rev() {
        assert_eq!(
            codes.verify(&email, OtpPurpose::SignIn, "000000").await.unwrap(),
            OtpCheck::Invalid { remaining }
        );
    }
    assert_eq!(
        codes.verify(&email, OtpPurpose::SignIn, "000000").await.unwrap(),
        OtpCheck::Expired
    );

    // Even the right code no longer works.
    assert_eq!(
        codes.verify(&email, OtpPurpose::SignIn, "482913").await.unwrap(),
        OtpCheck::Expired
    );
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_otp_code_expires_and_is_single_use() {
    let server = TestServer::start().await;
    let codes = OtpRepository::new(&server.pool);

    let late = unique_email("late");
    codes.issue(&late, OtpPurpose::Verify, "130572").await.unwrap();
    sqlx::query(
        "UPDATE marketplace.otp_code SET expires_at = now() - INTERVAL '1 second' \
         WHERE email = $1",
    )
    .bind(&late)
    .execute(&server.pool)
    .await
    .unwrap();
    assert_eq!(
        codes.verify(&late, OtpPurpose::Verify, "130572").await.unwrap(),
        OtpCheck::Expired
    );

    let prompt = unique_email("prompt");
    codes.issue(&prompt, OtpPurpose::Verify, "130572").await.unwrap();
    assert_eq!(
        codes.verify(&prompt, OtpPurpose::Verify, "130572").await.unwrap(),
        OtpCheck::Valid
    );
    assert_eq!(
        codes.verify(&prompt, OtpPurpose::Verify, "130572").await.unwrap(),
        OtpCheck::Expired
    );
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_opening_a_conversation_marks_it_read_for_participants_only() {
    let server = TestServer::start().await;
    let shop = seller_with_product(&server, 3).await;

    let buyer_client = server.client();
    let buyer_email = unique_email("asker");
    register(&server, &buyer_client, &buyer_email, "Quinn").await;
    let buyer = user_id(&server, &buyer_email).await;

    let conversations = ConversationRepository::new(&server.pool);
    let id = conversations
        .find_or_create(buyer, shop.seller_id, Some(shop.product_id))
        .await
        .unwrap();
    assert_eq!(
        conversations
            .find_or_create(buyer, shop.seller_id, Some(shop.product_id))
            .await
            .unwrap(),
        id
    );
    conversations.send(id, buyer, "Is it dishwasher safe?").await.unwrap();
    conversations.send(id, buyer, "And microwave safe?").await.unwrap();

    let seller_inbox = conversations.inbox(shop.seller_id).await.unwrap();
    let summary = seller_inbox.iter().find(|c| c.id == id).unwrap();
    assert_eq!(summary.unread_count, 2);
    assert_eq!(summary.last_message.as_deref(), Some("And microwave safe?"));
    // The sender's own messages never count as unread.
    let buyer_inbox = conversations.inbox(buyer).await.unwrap();
    assert_eq!(buyer_inbox.iter().find(|c| c.id == id).unwrap().unread_count, 0);

    let seller_client = server.client();
    sign_in(&server, &seller_client, &shop.seller_email).await;
    let response = seller_client
        .get(server.url(&format!("/messages/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("dishwasher safe"));

    let seller_inbox = conversations.inbox(shop.seller_id).await.unwrap();
    assert_eq!(seller_inbox.iter().find(|c| c.id == id).unwrap().unread_count, 0);

    let outsider = server.client();
    register(&server, &outsider, &unique_email("nosy"), "Nosy").await;
    let response = outsider
        .get(server.url(&format!("/messages/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_payout_request_cannot_exceed_balance() {
    let server = TestServer::start().await;
    let shop = seller_with_product(&server, 5).await;
    let payouts = PayoutRepository::new(&server.pool);
    let commission = Decimal::TEN;

    assert_eq!(
        payouts.available_balance(shop.seller_id, commission).await.unwrap(),
        Decimal::ZERO
    );
    assert!(matches!(
        payouts.request(shop.seller_id, Decimal::ONE, commission).await,
        Err(RepositoryError::Conflict(_))
    ));

    let client = server.client();
    register(&server, &client, &unique_email("regular"), "Mo").await;
    client
        .post(server.url("/cart/add"))
        .form(&[("product_id", shop.product_id.to_string())])
        .send()
        .await
        .unwrap();
    let response = client
        .post(server.url("/checkout"))
        .form(&address("Mo"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let orders = OrderRepository::new(&server.pool);
    let order = orders
        .list_for_seller(shop.seller_id, None)
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
    let mut timeline = order.timeline.clone();
    timeline.advance_to(OrderStage::Delivered, Utc::now()).unwrap();
    orders
        .update_timeline(order.id, OrderStage::Placed, &timeline, None)
        .await
        .unwrap();

    let available = payouts.available_balance(shop.seller_id, commission).await.unwrap();
    assert!(available > Decimal::ZERO);
    assert!(available < order.total);

    let too_much = available + Decimal::new(1, 2);
    assert!(matches!(
        payouts.request(shop.seller_id, too_much, commission).await,
        Err(RepositoryError::Conflict(_))
    ));

    let payout = payouts.request(shop.seller_id, available, commission).await.unwrap();
    assert!(payout.public_id.starts_with("PAY-"));
    assert_eq!(
        payouts.available_balance(shop.seller_id, commission).await.unwrap(),
        Decimal::ZERO
    );
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_approving_an_application_makes_a_seller() {
    let server = TestServer::start().await;
    let (_, admin_email) = create_user(&server, "approver", "Approver", UserRole::Admin).await;

    let applicant = server.client();
    let email = unique_email("maker");
    register(&server, &applicant, &email, "Dana Maker").await;
    let response = applicant
        .post(server.url("/account/apply"))
        .form(&[
            ("store_name", "Dana's Glass"),
            ("phone", "+1 555 0142"),
            ("description", "Blown glass"),
            ("payout_account", "US00 9876 5432"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let user = user_id(&server, &email).await;
    let sellers = SellerRepository::new(&server.pool);
    let application = sellers.latest_application(user).await.unwrap().unwrap();

    let admin = server.client();
    sign_in(&server, &admin, &admin_email).await;
    let response = admin
        .post(server.url(&format!("/admin/applications/{}/approve", application.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let account = UserRepository::new(&server.pool)
        .get_by_id(user)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.role, UserRole::Seller);
    let profile = sellers.profile(user).await.unwrap().unwrap();
    assert!(profile.public_id.starts_with("SEL-"));
    assert_eq!(profile.store_name, "Dana's Glass");

    // A second approval of the same application is a no-op.
    let again = sellers.approve(application.id, account.id).await;
    assert!(matches!(again, Err(RepositoryError::NotFound)));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (LIVESTALL_DATABASE_URL)"]
async fn test_stop_impersonating_restores_the_admin() {
    let server = TestServer::start().await;
    let (_, admin_email) = create_user(&server, "support", "Support", UserRole::Admin).await;
    let (customer, customer_email) =
        create_user(&server, "helped", "Helped Customer", UserRole::Customer).await;
    let (other_admin, _) = create_user(&server, "peer", "Peer Admin", UserRole::Admin).await;

    let client = server.client();
    sign_in(&server, &client, &admin_email).await;
    assert_eq!(
        client.get(server.url("/admin")).send().await.unwrap().status(),
        StatusCode::OK
    );

    // Admins cannot take over other admins.
    client
        .post(server.url(&format!("/admin/users/{other_admin}/impersonate")))
        .send()
        .await
        .unwrap();
    assert_eq!(
        client.get(server.url("/admin")).send().await.unwrap().status(),
        StatusCode::OK
    );

    let response = client
        .post(server.url(&format!("/admin/users/{customer}/impersonate")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let account = client.get(server.url("/account")).send().await.unwrap();
    assert!(account.text().await.unwrap().contains(&customer_email));
    assert_eq!(
        client.get(server.url("/admin")).send().await.unwrap().status(),
        StatusCode::FORBIDDEN
    );

    let response = client
        .post(server.url("/auth/stop-impersonating"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/admin/users");

    let account = client.get(server.url("/account")).send().await.unwrap();
    assert!(account.text().await.unwrap().contains(&admin_email));
    assert_eq!(
        client.get(server.url("/admin")).send().await.unwrap().status(),
        StatusCode::OK
    );
}
