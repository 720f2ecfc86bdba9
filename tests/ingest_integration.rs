//! Catalog ingestion into persistent and in-memory indexes
mod common;

use artscout::index::{IndexHandle, MemoryStore, QueryRequest};
use artscout::ingest::{catalog_from_file, catalog_from_folder, Ingestor};
use artscout::metadata::UNKNOWN;
use common::{loader, write_png, ColorEmbedder};
use std::sync::Arc;
use tempfile::TempDir;

fn ingestor(temp: &TempDir, index: Arc<IndexHandle>) -> Ingestor {
    Ingestor::new(
        index,
        Arc::new(ColorEmbedder),
        Arc::new(loader(temp.path())),
        2,
    )
}

#[tokio::test]
async fn test_folder_ingestion_skips_undecodable_images() {
    let temp = TempDir::new().unwrap();
    let images = temp.path().join("image_store");
    std::fs::create_dir_all(&images).unwrap();

    write_png(&images, "a.png", [255, 0, 0]);
    std::fs::write(images.join("b.jpg"), b"definitely not a jpeg").unwrap();
    write_png(&images, "c.png", [0, 0, 255]);

    let entries = catalog_from_folder(&images).unwrap();
    assert_eq!(entries.len(), 3);

    let index = Arc::new(IndexHandle::new(Arc::new(MemoryStore::new()), 3));
    let report = ingestor(&temp, index.clone()).ingest(entries).await.unwrap();

    assert_eq!(report.indexed, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(index.count().await.unwrap(), 2);
    assert!(index.is_ready());

    let hits = index
        .query(&QueryRequest::new(vec![0.0, 0.0, 1.0], 10))
        .await
        .unwrap();
    assert_eq!(hits[0].id, 2);
    assert_eq!(hits[0].payload.medium, UNKNOWN);
    assert_eq!(hits[0].payload.extra["index"], 2);
}

#[tokio::test]
async fn test_manifest_ingestion_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let red = write_png(temp.path(), "red.png", [255, 0, 0]);
    let green = write_png(temp.path(), "green.png", [0, 255, 0]);

    let manifest = temp.path().join("catalog.jsonl");
    std::fs::write(
        &manifest,
        format!(
            "{}\n{}\n",
            serde_json::json!({"id": 10, "image": red, "period": "1851-1900", "medium": "Oil"}),
            serde_json::json!({"id": 11, "path": green, "period": "after 2000"}),
        ),
    )
    .unwrap();

    let snapshot = temp.path().join("data/image_embeddings.snapshot.zst");
    {
        let store = Arc::new(MemoryStore::open(snapshot.clone()).unwrap());
        let index = Arc::new(IndexHandle::open(store, 3).await.unwrap());
        let report = ingestor(&temp, index)
            .ingest(catalog_from_file(&manifest).unwrap())
            .await
            .unwrap();
        assert_eq!(report.indexed, 2);
    }

    assert!(snapshot.exists());

    let store = Arc::new(MemoryStore::open(snapshot).unwrap());
    let index = IndexHandle::open(store, 3).await.unwrap();
    assert!(index.is_ready());
    assert_eq!(index.count().await.unwrap(), 2);

    let hits = index
        .query(&QueryRequest::new(vec![1.0, 0.0, 0.0], 1))
        .await
        .unwrap();
    assert_eq!(hits[0].id, 10);
    assert_eq!(hits[0].payload.period_start, Some(1851));
    assert_eq!(hits[0].payload.period_end, Some(1900));
    assert_eq!(hits[0].payload.medium, "oil");
}

#[tokio::test]
async fn test_rebuild_drops_previous_records() {
    let temp = TempDir::new().unwrap();
    let images = temp.path().join("images");
    std::fs::create_dir_all(&images).unwrap();
    write_png(&images, "a.png", [255, 0, 0]);
    write_png(&images, "b.png", [0, 255, 0]);

    let index = Arc::new(IndexHandle::new(Arc::new(MemoryStore::new()), 3));
    let ingestor = ingestor(&temp, index.clone());
    ingestor
        .ingest(catalog_from_folder(&images).unwrap())
        .await
        .unwrap();

    std::fs::remove_file(images.join("b.png")).unwrap();
    ingestor
        .rebuild(catalog_from_folder(&images).unwrap())
        .await
        .unwrap();

    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_ingests_images_whose_name_hides_the_format() {
    let temp = TempDir::new().unwrap();

    let extensionless = temp.path().join("scan_0007");
    image::RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0]))
        .save_with_format(&extensionless, image::ImageFormat::Png)
        .unwrap();
    let mislabelled = temp.path().join("mislabelled.png");
    image::RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 255]))
        .save_with_format(&mislabelled, image::ImageFormat::Jpeg)
        .unwrap();

    let manifest = temp.path().join("catalog.json");
    std::fs::write(
        &manifest,
        serde_json::json!([
            {"id": 1, "path": extensionless.display().to_string()},
            {"id": 2, "path": mislabelled.display().to_string()},
        ])
        .to_string(),
    )
    .unwrap();

    let index = Arc::new(IndexHandle::new(Arc::new(MemoryStore::new()), 3));
    let report = ingestor(&temp, index.clone())
        .ingest(catalog_from_file(&manifest).unwrap())
        .await
        .unwrap();

    assert_eq!(report.indexed, 2);
    assert_eq!(report.skipped, 0);

    let hits = index
        .query(&QueryRequest::new(vec![0.0, 0.0, 1.0], 1))
        .await
        .unwrap();
    assert_eq!(hits[0].id, 2);
}
