use std::collections::HashMap;

use bazaar_auth::{JwtClaims, Role};
use bazaar_core::AccountId;
use bazaar_infra::AppConfig;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "ops@bazaar.test";
const ADMIN_PASSWORD: &str = "ops-password";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores, on an ephemeral port.
        let vars: HashMap<&str, &str> = HashMap::from([
            ("JWT_SECRET", JWT_SECRET),
            ("BCRYPT_COST", "4"),
            ("BOOTSTRAP_ADMIN_EMAIL", ADMIN_EMAIL),
            ("BOOTSTRAP_ADMIN_PASSWORD", ADMIN_PASSWORD),
        ]);
        let cfg = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
            .expect("test config");
        let app = bazaar_api::app::build_app(&cfg).await.expect("app builds");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, token: Option<&str>, path: &str, body: Value) -> (StatusCode, Value) {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.unwrap();
        (res.status(), res.json().await.unwrap())
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        (res.status(), res.json().await.unwrap())
    }

    async fn patch(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        (res.status(), res.json().await.unwrap())
    }

    async fn login(&self, role: &str, email: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                None,
                "/auth/login",
                json!({ "role": role, "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: AccountId::new(),
        name: "minted".to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + ChronoDuration::minutes(10)).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn id(value: &Value, key: &str) -> String {
    value[key]
        .as_str()
        .unwrap_or_else(|| panic!("missing {key} in {value}"))
        .to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/auth/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unauthorized");

    let res = srv
        .client
        .get(srv.url("/warehouses"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_role_is_forbidden() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(Role::Customer);

    let (status, body) = srv
        .post(Some(&token), "/categories", json!({ "name": "Grocery" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(Role::OperationalGuy);

    let (status, body) = srv.get(&token, "/stores/not-an-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let res = srv
        .client
        .post(srv.url("/categories"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signup_login_and_profile() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post(
            None,
            "/auth/signup",
            json!({
                "email": "Asha@Example.com",
                "password": "asha-password",
                "name": "Asha",
                "address": "12 MG Road"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, _) = srv
        .post(
            None,
            "/auth/signup",
            json!({ "email": "asha@example.com", "password": "asha-password", "name": "Asha" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = srv
        .post(
            None,
            "/auth/login",
            json!({ "role": "customer", "email": "asha@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let token = srv.login("customer", "asha@example.com", "asha-password").await;
    let (status, body) = srv.get(&token, "/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "asha@example.com");
    assert_eq!(body["data"]["role"], "customer");
}

#[tokio::test]
async fn seller_stocks_inventory_and_customer_orders() {
    let srv = TestServer::spawn().await;
    let ops = srv.login("operational_guy", ADMIN_EMAIL, ADMIN_PASSWORD).await;

    // Onboard a seller; first login is flagged until the password changes.
    let (status, body) = srv
        .post(
            Some(&ops),
            "/onboarding/sellers",
            json!({ "email": "kiran@example.com", "password": "initial-pass", "name": "Kiran" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let seller_id = id(&body["data"], "id");

    let (_, body) = srv
        .post(
            None,
            "/auth/login",
            json!({ "role": "seller", "email": "kiran@example.com", "password": "initial-pass" }),
        )
        .await;
    assert_eq!(body["data"]["isFirstLogin"], true);
    let seller = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = srv
        .post(
            Some(&seller),
            "/auth/password",
            json!({ "currentPassword": "initial-pass", "newPassword": "kiran-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let seller = srv.login("seller", "kiran@example.com", "kiran-password").await;

    // Warehouse and store.
    let (status, body) = srv
        .post(
            Some(&ops),
            "/warehouses",
            json!({
                "name": "North Hub",
                "address": "Plot 7",
                "coordinates": { "latitude": 28.6, "longitude": 77.2 },
                "storageCapacity": 100
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let warehouse_id = id(&body["data"], "id");

    let (status, body) = srv
        .post(
            Some(&ops),
            "/stores",
            json!({
                "sellerId": seller_id,
                "warehouseId": warehouse_id,
                "name": "Fresh Mart",
                "address": "Bay 4",
                "numberOfRacks": 10,
                "occupiedRacks": 2
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let store_id = id(&body["data"], "storeId");

    let (status, body) = srv
        .patch(&seller, &format!("/stores/{store_id}/racks"), json!({ "occupiedRacks": 11 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let (status, body) = srv
        .patch(&seller, &format!("/stores/{store_id}/racks"), json!({ "occupiedRacks": 4 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["occupiedRacks"], 4);

    // Catalog.
    let (_, body) = srv
        .post(Some(&ops), "/categories", json!({ "name": "Grocery" }))
        .await;
    let category_id = id(&body["data"], "id");
    let (status, body) = srv
        .post(
            Some(&ops),
            "/subcategories",
            json!({ "categoryId": category_id, "name": "Staples" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let subcategory_id = id(&body["data"], "id");

    let mut product_ids = Vec::new();
    for (hsn, name, mrp) in [("1006", "Basmati Rice", 12_000), ("0902", "Assam Tea", 45_000)] {
        let (status, body) = srv
            .post(
                Some(&ops),
                "/metadata",
                json!({
                    "hsnCode": hsn,
                    "name": name,
                    "categoryId": category_id,
                    "subcategoryId": subcategory_id,
                    "mrp": mrp
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        product_ids.push(id(&body["data"], "productId"));
    }

    // Inventory.
    let (status, body) = srv
        .post(
            Some(&seller),
            "/inventory",
            json!({ "products": [
                { "productId": product_ids[0] },
                { "productId": product_ids[1], "price": 40_000 }
            ] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["inventory"]["storeId"], store_id.as_str());

    let (status, body) = srv.get(&seller, "/inventory?sort=mrp_desc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["totalPages"], 1);
    assert_eq!(body["data"]["items"][0]["name"], "Assam Tea");
    assert_eq!(body["data"]["items"][0]["categoryName"], "Grocery");

    let (status, _) = srv.get(&ops, "/inventory").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = srv.get(&ops, &format!("/inventory?sellerId={seller_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);

    // Customer places an order and reviews a product.
    srv.post(
        None,
        "/auth/signup",
        json!({ "email": "asha@example.com", "password": "asha-password", "name": "Asha" }),
    )
    .await;
    let customer = srv.login("customer", "asha@example.com", "asha-password").await;

    let (status, body) = srv
        .post(
            Some(&customer),
            "/orders",
            json!({
                "warehouseId": warehouse_id,
                "address": "12 MG Road",
                "products": [
                    { "productId": product_ids[0], "quantity": 2, "price": 12_000, "mrp": 12_000, "sellerId": seller_id },
                    { "productId": product_ids[1], "quantity": 1, "price": 40_000, "mrp": 45_000, "sellerId": seller_id }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["orderTotal"], 64_000);
    let order_id = id(&body["data"], "orderId");

    let (status, body) = srv.get(&customer, "/orders/mine").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = srv.get(&seller, "/orders/seller").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["products"].as_array().unwrap().len(), 2);

    let (status, body) = srv.get(&ops, "/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let (status, _) = srv.get(&mint_jwt(Role::Customer), &format!("/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = srv
        .post(
            Some(&customer),
            &format!("/metadata/{}/reviews", product_ids[0]),
            json!({ "rating": 4 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let (_, body) = srv.get(&customer, &format!("/metadata/{}", product_ids[0])).await;
    assert_eq!(body["data"]["totalReviews"], 1);
    assert_eq!(body["data"]["totalStars"], 4);
}
