use catalog_sync::test_support::CountingThrottle;
use catalog_sync::{
    CatalogDestination, CollectionDraft, Collect, DestinationError, IdentityMap, ImageSource,
    ProductDraft, ProductId, ProductUpdate, VariantDraft, VariantId, VariantPriceUpdate,
};
use catalog_sync_http::{ShopifyConfig, ShopifyDestination};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_PATH: &str = "/admin/api/2024-01";

fn destination_for(server: &MockServer) -> ShopifyDestination {
    let config = ShopifyConfig::new(format!("{}{API_PATH}/", server.uri()), "shpat_test");
    ShopifyDestination::new(&config).unwrap()
}

fn shop_product(id: u64, sku: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": format!("Product {id}"),
        "variants": [{"id": id * 10, "sku": sku, "price": "10.00"}]
    })
}

fn next_header(server: &MockServer, page_info: &str) -> String {
    format!(
        r#"<{}{API_PATH}/products.json?limit=2&page_info={page_info}>; rel="next""#,
        server.uri()
    )
}

#[tokio::test]
async fn identity_map_follows_link_chain() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{API_PATH}/products.json")))
        .and(query_param("limit", "2"))
        .and(query_param_is_missing("page_info"))
        .and(header("x-shopify-access-token", "shpat_test"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", next_header(&server, "p2").as_str())
                .set_body_json(json!({"products": [shop_product(1, "A"), shop_product(2, "B")]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page_three_link = format!(
        r#"<{uri}{API_PATH}/products.json?limit=2&page_info=p1>; rel="previous", {next}"#,
        uri = server.uri(),
        next = next_header(&server, "p3"),
    );
    Mock::given(method("GET"))
        .and(path(format!("{API_PATH}/products.json")))
        .and(query_param("page_info", "p2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", page_three_link.as_str())
                .set_body_json(json!({"products": [shop_product(3, "C"), shop_product(4, "D")]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let last_link = format!(
        r#"<{}{API_PATH}/products.json?limit=2&page_info=p2>; rel="previous""#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path(format!("{API_PATH}/products.json")))
        .and(query_param("page_info", "p3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", last_link.as_str())
                .set_body_json(json!({"products": [shop_product(5, "E")]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let destination = destination_for(&server);
    let throttle = CountingThrottle::default();
    let map = IdentityMap::build(&destination, &throttle, 2).await.unwrap();

    assert_eq!(map.len(), 5);
    assert_eq!(map.get("A"), Some(ProductId(1)));
    assert_eq!(map.get("E"), Some(ProductId(5)));
    assert_eq!(throttle.pauses(), 2);
}

#[tokio::test]
async fn malformed_link_header_fails_the_listing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{API_PATH}/products.json")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", "not-a-link")
                .set_body_json(json!({"products": []})),
        )
        .mount(&server)
        .await;

    let result = destination_for(&server).list_products(None, 250).await;

    assert!(matches!(result, Err(DestinationError::Pagination(_))));
}

#[tokio::test]
async fn create_product_posts_full_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{API_PATH}/products.json")))
        .and(body_json(json!({
            "product": {
                "title": "Joust Duffle Bag",
                "body_html": "<p>Bag</p>",
                "images": [{"src": "https://magento.example/media/m/b/mb01.jpg"}],
                "variants": [{"sku": "MB01", "price": 34.0}]
            }
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"product": shop_product(42, "MB01")})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let draft = ProductDraft {
        title: "Joust Duffle Bag".into(),
        body_html: "<p>Bag</p>".into(),
        images: vec![ImageSource {
            src: "https://magento.example/media/m/b/mb01.jpg".into(),
        }],
        variants: vec![VariantDraft {
            sku: "MB01".into(),
            price: 34.0,
        }],
    };

    let created = destination_for(&server)
        .create_product(&draft)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(created.id, ProductId(42));
    assert_eq!(created.primary_sku(), Some("MB01"));
}

#[tokio::test]
async fn accepted_create_with_unreadable_body_is_not_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{API_PATH}/products.json")))
        .respond_with(ResponseTemplate::new(201).set_body_string("Created"))
        .expect(1)
        .mount(&server)
        .await;

    let draft = ProductDraft {
        title: "Bag".into(),
        body_html: String::new(),
        images: vec![],
        variants: vec![VariantDraft {
            sku: "MB01".into(),
            price: 34.0,
        }],
    };
    let created = destination_for(&server).create_product(&draft).await.unwrap();

    assert_eq!(created, None);
}

#[tokio::test]
async fn update_with_unreadable_body_is_a_parse_failure() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("{API_PATH}/products/42.json")))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let result = destination_for(&server)
        .update_product(
            ProductId(42),
            &ProductUpdate {
                title: "Bag".into(),
                body_html: String::new(),
            },
        )
        .await;

    assert!(matches!(result, Err(DestinationError::Parse(_))));
}

#[tokio::test]
async fn unprocessable_create_is_rejected_not_transport() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{API_PATH}/products.json")))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({"errors": {"title": ["can't be blank"]}})),
        )
        .mount(&server)
        .await;

    let draft = ProductDraft {
        title: String::new(),
        body_html: String::new(),
        images: vec![],
        variants: vec![],
    };
    let result = destination_for(&server).create_product(&draft).await;

    match result {
        Err(DestinationError::Rejected { status, body }) => {
            assert_eq!(status, 422);
            assert!(body.contains("can't be blank"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_on_write_is_transport() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{API_PATH}/custom_collections.json")))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let draft = CollectionDraft {
        title: "Bags".into(),
        body_html: String::new(),
        collects: vec![],
    };
    let result = destination_for(&server).create_collection(&draft).await;

    assert!(matches!(result, Err(DestinationError::Transport(_))));
}

#[tokio::test]
async fn update_writes_product_then_variant() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("{API_PATH}/products/42.json")))
        .and(body_json(json!({
            "product": {"title": "Bag", "body_html": "<p>New</p>"}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"product": shop_product(42, "MB01")})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("{API_PATH}/variants/420.json")))
        .and(body_json(json!({"variant": {"id": 420, "price": 39.5}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "variant": {"id": 420, "sku": "MB01", "price": "39.50"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let destination = destination_for(&server);
    let updated = destination
        .update_product(
            ProductId(42),
            &ProductUpdate {
                title: "Bag".into(),
                body_html: "<p>New</p>".into(),
            },
        )
        .await
        .unwrap();

    let variant = destination
        .update_variant(&VariantPriceUpdate {
            id: updated.variants[0].id,
            price: 39.5,
        })
        .await
        .unwrap();

    assert_eq!(variant.id, VariantId(420));
    assert_eq!(variant.price.as_deref(), Some("39.50"));
}

#[tokio::test]
async fn create_collection_posts_collects() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{API_PATH}/custom_collections.json")))
        .and(body_json(json!({
            "custom_collection": {
                "title": "Bags",
                "body_html": "All bags",
                "collects": [{"product_id": 42}, {"product_id": 43}]
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "custom_collection": {"id": 900, "title": "Bags"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let draft = CollectionDraft {
        title: "Bags".into(),
        body_html: "All bags".into(),
        collects: vec![
            Collect {
                product_id: ProductId(42),
            },
            Collect {
                product_id: ProductId(43),
            },
        ],
    };
    let collection = destination_for(&server)
        .create_collection(&draft)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(collection.id, 900);
    assert_eq!(collection.title, "Bags");
}
