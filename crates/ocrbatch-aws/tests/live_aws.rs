//! Tests against real AWS
//!
//! These need credentials and a writable bucket named by `OCRBATCH_TEST_BUCKET`.
//! Run with `cargo test -p ocrbatch-aws -- --ignored`.

use bytes::Bytes;
use ocrbatch_aws::{bucket_region, load_sdk_config, S3ObjectStore};
use ocrbatch_domain::ObjectStore;

fn test_bucket() -> String {
    std::env::var("OCRBATCH_TEST_BUCKET").expect("OCRBATCH_TEST_BUCKET not set")
}

#[tokio::test]
#[ignore] // Requires AWS credentials
async fn test_put_head_delete_roundtrip() {
    let bucket = test_bucket();
    let config = load_sdk_config(None).await;
    let store = S3ObjectStore::new(&config, &bucket);
    let key = "ocrbatch-tests/live-roundtrip.pdf";

    store
        .put(key, Bytes::from_static(b"%PDF-1.4 live test"))
        .await
        .unwrap();
    assert!(store.head(key).await.unwrap());

    store.delete(key).await.unwrap();
    assert!(!store.head(key).await.unwrap());
}

#[tokio::test]
#[ignore] // Requires AWS credentials
async fn test_bucket_region_lookup() {
    let bucket = test_bucket();
    let config = load_sdk_config(None).await;
    let region = bucket_region(&config, &bucket).await.unwrap();
    assert!(!region.is_empty());
}
