//! Concurrent access to one shared biography
//!
//! Run with: cargo test --package bio-document --test concurrency_tests

use bio_document::prelude::*;
use bio_test_utils::{memory_biography, populate_sample, temp_biography, TEST_USER};
use futures::future::join_all;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const LABELS: &[&str] = &[
    "Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot", "Golf", "Hotel", "India", "Juliet",
    "Kilo", "Lima",
];

fn numbered_titles() -> Vec<String> {
    LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{} {label}", i + 1))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_top_level_adds_end_sorted() {
    let fixture = temp_biography().await;
    let mut shuffled = numbered_titles();
    shuffled.shuffle(&mut rand::rng());

    let tasks = shuffled.iter().map(|title| {
        let bio = Arc::clone(&fixture.biography);
        let title = title.clone();
        tokio::spawn(async move { bio.add_section(&title, "content").await })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let root = fixture.biography.root();
    let titles: Vec<String> = root.child_titles().map(str::to_string).collect();
    assert_eq!(titles, numbered_titles(), "10+ must sort after 9");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_nested_adds_keep_every_section() {
    let fixture = temp_biography().await;
    let mut paths = Vec::new();
    for chapter in 1..=4 {
        for part in 1..=3 {
            paths.push(format!("{chapter} Chapter/{chapter}.{part} Part"));
        }
    }
    paths.shuffle(&mut rand::rng());

    let tasks = paths.iter().map(|path| {
        let bio = Arc::clone(&fixture.biography);
        let path = path.clone();
        tokio::spawn(async move { bio.add_section(&path, "[MEM_x]").await })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let bio = &fixture.biography;
    assert_eq!(bio.stats().section_count, 16);
    for path in &paths {
        assert!(bio.get_section_by_path(path).unwrap().is_some(), "{path}");
    }
    assert_eq!(bio.memory_ids(), vec!["MEM_x"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exports_interleaved_with_writes_are_consistent() {
    let fixture = temp_biography().await;
    let bio = Arc::clone(&fixture.biography);

    let writers = (1..=8).map(|n| {
        let bio = Arc::clone(&bio);
        tokio::spawn(async move {
            bio.add_section(&format!("{n} Part/{n}.1 Detail"), &format!("detail {n}"))
                .await
        })
    });
    let readers = (0..8).map(|_| {
        let bio = Arc::clone(&bio);
        tokio::spawn(async move { bio.export_to_markdown(false, true).await })
    });

    let (written, exported) = tokio::join!(join_all(writers), join_all(readers));
    for result in written {
        result.unwrap().unwrap();
    }
    for markdown in exported {
        let markdown = markdown.unwrap().unwrap();
        // Every part present in an export also shows its detail.
        for n in 1..=8 {
            if markdown.contains(&format!("## {n} Part\n")) {
                assert!(markdown.contains(&format!("### {n}.1 Detail\n\ndetail {n}")));
            }
        }
    }
}

#[tokio::test]
async fn save_times_out_while_another_save_holds_the_gate() {
    let config = BiographyConfig::new(TEST_USER, "unused")
        .with_save_timeout(Duration::from_millis(50));
    let (bio, store) = memory_biography(config).await;
    bio.add_section("1 Start", "text").await.unwrap();
    store.delay_writes(Duration::from_millis(500));

    let slow_save = {
        let bio = Arc::clone(&bio);
        tokio::spawn(async move { bio.save().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let err = bio.save().await.unwrap_err();
    assert!(matches!(err, BiographyError::SaveTimeout { waited_ms: 50 }));
    assert!(err.is_retryable());
    assert!(!err.is_rejected_input());

    assert_eq!(slow_save.await.unwrap().unwrap(), 1);
    assert_eq!(bio.version(), 1);
}

#[tokio::test]
async fn export_waits_for_pending_writes() {
    let (bio, store) = memory_biography(BiographyConfig::new(TEST_USER, "unused")).await;
    populate_sample(&bio).await;
    store.delay_writes(Duration::from_millis(200));

    let saving = {
        let bio = Arc::clone(&bio);
        tokio::spawn(async move { bio.save().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(
        timeout(Duration::from_millis(50), bio.export_to_markdown(false, true))
            .await
            .is_err(),
        "export must not start while a save holds the write side"
    );
    assert!(
        timeout(Duration::from_millis(50), bio.add_section("4 Later", ""))
            .await
            .is_err(),
        "mutations queue behind the save"
    );

    saving.await.unwrap().unwrap();
    let markdown = bio.export_to_markdown(false, true).await.unwrap();
    assert!(markdown.contains("## 3 Family"));
    assert!(!markdown.contains("4 Later"), "cancelled add was never applied");
}

#[tokio::test]
async fn cancelled_save_releases_the_gate() {
    let (bio, store) = memory_biography(BiographyConfig::new(TEST_USER, "unused")).await;
    bio.add_section("1 Start", "text").await.unwrap();
    store.delay_writes(Duration::from_millis(500));

    assert!(timeout(Duration::from_millis(30), bio.save()).await.is_err());
    assert_eq!(bio.version(), 0, "version only moves after a completed write");
    assert!(store.list_versions(TEST_USER).await.unwrap().is_empty());

    store.delay_writes(Duration::ZERO);
    timeout(Duration::from_millis(200), bio.add_section("2 Next", ""))
        .await
        .expect("writer not blocked by the cancelled save")
        .unwrap();
    timeout(Duration::from_millis(200), bio.export_to_markdown(false, true))
        .await
        .expect("reader not blocked by the cancelled save")
        .unwrap();
    assert_eq!(bio.save().await.unwrap(), 1);
}

#[tokio::test]
async fn failed_store_write_keeps_version() {
    let (bio, store) = memory_biography(BiographyConfig::new(TEST_USER, "unused")).await;
    bio.add_section("1 Start", "text").await.unwrap();
    store.fail_writes(true);

    let err = bio.save().await.unwrap_err();
    assert!(matches!(err, BiographyError::Storage(_)));
    assert!(err.is_retryable());
    assert_eq!(bio.version(), 0);

    store.fail_writes(false);
    assert_eq!(bio.save().await.unwrap(), 1);
    // The document stays usable after the failure.
    bio.add_section("2 Next", "").await.unwrap();
}
