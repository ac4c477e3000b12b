use catalog_sync::test_support::{CountingThrottle, RecordingDestination, listing};
use catalog_sync::{CatalogSource, IdentityMap, Normalizer, ProductSync};
use catalog_sync_http::{MagentoConfig, MagentoSource, SnapshotStore};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_for(server: &MockServer) -> (MagentoSource, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = MagentoConfig::new(server.uri(), "magento-token");
    let source = MagentoSource::new(&config, SnapshotStore::new(dir.path())).unwrap();
    (source, dir)
}

fn read_json(path: std::path::PathBuf) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn fetch_persists_under_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/products/MB01"))
        .and(header("authorization", "Bearer magento-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sku": "MB01"})))
        .mount(&server)
        .await;

    let (source, dir) = source_for(&server);
    let payload = source.fetch("products/MB01", None, true).await.unwrap();

    assert_eq!(payload, Some(json!({"sku": "MB01"})));
    assert_eq!(
        read_json(dir.path().join("products/MB01.json")),
        json!({"sku": "MB01"})
    );
}

#[tokio::test]
async fn fetch_persists_under_override_folder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/categories/2/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"sku": "MB01"}])))
        .mount(&server)
        .await;

    let (source, dir) = source_for(&server);
    source
        .fetch("categories/2/products", Some("products"), true)
        .await
        .unwrap();

    assert!(dir.path().join("products.json").exists());
    assert!(!dir.path().join("categories/2/products.json").exists());
}

#[tokio::test]
async fn fetch_without_persist_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/categories/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3})))
        .mount(&server)
        .await;

    let (source, dir) = source_for(&server);
    let payload = source.fetch("categories/3", None, false).await.unwrap();

    assert!(payload.is_some());
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn non_200_yields_none_and_no_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/products/GONE"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&server)
        .await;

    let (source, dir) = source_for(&server);

    assert!(source.fetch("products/GONE", None, true).await.unwrap().is_none());
    assert!(source.product("GONE").await.unwrap().is_none());
    assert!(!dir.path().join("products/GONE.json").exists());
}

#[tokio::test]
async fn server_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/categories"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (source, _dir) = source_for(&server);

    assert!(source.category_tree().await.is_err());
}

#[tokio::test]
async fn product_detail_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/products/MB01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "sku": "MB01",
            "name": "Joust Duffle Bag",
            "price": 34,
            "type_id": "simple",
            "custom_attributes": [
                {"attribute_code": "description", "value": "<p>Bag</p>"}
            ],
            "media_gallery_entries": [
                {"id": 1, "media_type": "image", "file": "/m/b/mb01-blue-0.jpg"}
            ]
        })))
        .mount(&server)
        .await;

    let (source, _dir) = source_for(&server);
    let product = source.product("MB01").await.unwrap().unwrap();

    assert_eq!(product.name, "Joust Duffle Bag");
    assert_eq!(product.price, 34.0);
    assert_eq!(product.media_gallery_entries[0].file, "/m/b/mb01-blue-0.jpg");
}

#[tokio::test]
async fn category_detail_joins_membership_and_snapshots_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/categories/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4,
            "name": "Bags",
            "custom_attributes": [{"attribute_code": "description", "value": "All bags"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/categories/4/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"sku": "MB01", "position": 1, "category_id": "4"},
            {"sku": "MB02", "position": 2, "category_id": "4"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (source, dir) = source_for(&server);
    let detail = source.category_detail(4).await.unwrap().unwrap();

    assert_eq!(detail.name, "Bags");
    assert_eq!(detail.products.len(), 2);
    assert_eq!(detail.products[1].sku, "MB02");

    let snapshot = read_json(dir.path().join("categories/4.json"));
    assert_eq!(snapshot["products"][0]["sku"], "MB01");
    assert!(!dir.path().join("categories/4/products.json").exists());
}

#[tokio::test]
async fn category_detail_without_membership_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/categories/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "New"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/categories/7/products"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "denied"})))
        .mount(&server)
        .await;

    let (source, _dir) = source_for(&server);
    let detail = source.category_detail(7).await.unwrap().unwrap();

    assert!(detail.products.is_empty());
}

#[tokio::test]
async fn catalog_listing_snapshots_as_products() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/categories/2/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"sku": "A", "position": 0, "category_id": "2"}
        ])))
        .mount(&server)
        .await;

    let (source, dir) = source_for(&server);
    let listing = source.catalog_products(2).await.unwrap().unwrap();

    assert_eq!(listing[0].sku, "A");
    assert!(dir.path().join("products.json").exists());
}

#[tokio::test]
async fn sku_is_sent_as_a_single_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/products/MB%2F01%3Fv"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"sku": "MB/01?v", "price": 5.0})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (source, dir) = source_for(&server);
    let product = source.product("MB/01?v").await.unwrap().unwrap();

    assert_eq!(product.sku, "MB/01?v");
    assert!(dir.path().join("products/MB%2F01%3Fv.json").exists());
    assert!(!dir.path().join("products/MB").exists());
}

#[tokio::test]
async fn null_price_reads_as_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/products/MB01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"sku": "MB01", "price": null})),
        )
        .mount(&server)
        .await;

    let (source, _dir) = source_for(&server);
    let product = source.product("MB01").await.unwrap().unwrap();

    assert_eq!(product.price, 0.0);
}

#[tokio::test]
async fn undecodable_product_is_skipped_and_the_next_one_synced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/products/BAD"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"sku": "BAD", "price": "free"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/V1/products/GOOD"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"sku": "GOOD", "name": "Good", "price": 9.5})),
        )
        .mount(&server)
        .await;

    let (source, _dir) = source_for(&server);
    let destination = RecordingDestination::with_pages(vec![]);
    let throttle = CountingThrottle::default();
    let normalizer = Normalizer::default();

    let report = ProductSync::new(&source, &destination, &throttle, &normalizer)
        .run(&listing(&["BAD", "GOOD"]), &IdentityMap::new())
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].key, "BAD");
    assert_eq!(report.created, 1);
    assert_eq!(destination.creates()[0].variants[0].sku, "GOOD");
}
