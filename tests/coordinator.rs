//! Integration tests for the dedup + background conversion + status pipeline.
//!
//! Everything runs against in-memory backends and a fake renderer.
//!
//! Run with:
//!   cargo test --test coordinator -- --nocapture

mod common;

use bytes::Bytes;
use common::{harness, pdf_bytes, Gate, SolidRenderer};
use edgequake_pdf2img::pipeline::encode::decode_page;
use edgequake_pdf2img::{
    fingerprint, ArtifactStore, Catalog, ConversionCoordinator, ConversionFailure,
    ConversionQueue, ConvertOutcome, FsArtifactStore, MemoryCatalog, PdfCacheError, QueueConfig,
    StatusQuery, SubmitOutcome, TaskStatus,
};
use std::sync::Arc;
use std::time::Duration;

const POLL: Duration = Duration::from_millis(10);
const PATIENCE: Duration = Duration::from_secs(10);

fn status_query(h: &common::Harness, queue: &ConversionQueue) -> StatusQuery {
    StatusQuery::new(h.catalog.clone(), queue.in_flight())
}

// ── Fingerprint ──────────────────────────────────────────────────────────────

#[test]
fn fingerprint_is_stable_and_distinguishes_documents() {
    let a = pdf_bytes("a");
    assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
    assert_ne!(fingerprint(&a), fingerprint(&pdf_bytes("b")));
    assert_eq!(fingerprint(&a).as_str().len(), 64);
}

// ── Coordinator ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_page_document_end_to_end() {
    let h = harness(SolidRenderer::new(3), 10);
    let doc = Bytes::from(pdf_bytes("three pages"));

    let before = h.coordinator.submit(&doc).await.unwrap();
    assert!(!before.found());

    let outcome = h.coordinator.convert(doc.clone()).await.unwrap();
    assert!(matches!(outcome, ConvertOutcome::Converted { pages: 3, .. }));

    let after = h.coordinator.submit(&doc).await.unwrap();
    assert!(after.found());
    assert_eq!(after.location.as_deref(), Some(outcome.location()));

    let pages = h
        .coordinator
        .fetch_pages(&after.address)
        .await
        .unwrap()
        .expect("pages stored");
    assert_eq!(pages.len(), 3);
    for (i, page) in pages.iter().enumerate() {
        assert_eq!(page.page as usize, i + 1);
        assert_eq!(page.format, "JPEG");
        assert_eq!(page.encoding, "base64");
        let jpeg = decode_page(page).unwrap();
        assert!(!jpeg.is_empty());
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "page {} is not a JPEG", page.page);
    }

    // The blob is stored under the address-derived name.
    let blob = h.store.get(outcome.location()).await.unwrap();
    assert!(outcome.location().ends_with(&after.address.artifact_name()));
    assert!(!blob.is_empty());
}

#[tokio::test]
async fn batch_size_does_not_change_output() {
    let doc = Bytes::from(pdf_bytes("seven pages"));

    let one = harness(SolidRenderer::new(7), 1);
    one.coordinator.convert(doc.clone()).await.unwrap();
    let ten = harness(SolidRenderer::new(7), 10);
    ten.coordinator.convert(doc.clone()).await.unwrap();

    let addr = fingerprint(&doc);
    let a = one.coordinator.fetch_pages(&addr).await.unwrap().unwrap();
    let b = ten.coordinator.fetch_pages(&addr).await.unwrap().unwrap();
    assert_eq!(a, b);
    assert_eq!(one.renderer.windows(), 7);
    assert_eq!(ten.renderer.windows(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_converts_leave_one_record() {
    let h = harness(SolidRenderer::new(2), 10);
    let doc = Bytes::from(pdf_bytes("raced"));

    let (a, b) = futures::join!(
        h.coordinator.convert(doc.clone()),
        h.coordinator.convert(doc.clone())
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let fresh = [&a, &b]
        .iter()
        .filter(|o| matches!(o, ConvertOutcome::Converted { .. }))
        .count();
    assert_eq!(fresh, 1, "exactly one convert creates the record: {a:?} / {b:?}");
    assert_eq!(a.location(), b.location());
    assert_eq!(h.catalog.record_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_converts_on_disk_leave_one_record() {
    let root = tempfile::tempdir().unwrap();
    let catalog = Arc::new(MemoryCatalog::new());
    let store = FsArtifactStore::new(root.path(), "pdf-images").await.unwrap();
    let coordinator = ConversionCoordinator::new(
        catalog.clone(),
        Arc::new(store),
        Arc::new(SolidRenderer::new(40)),
        10,
    );

    for round in 0..5 {
        let doc = Bytes::from(pdf_bytes(&format!("raced on disk {round}")));
        let (a, b) = futures::join!(coordinator.convert(doc.clone()), coordinator.convert(doc));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.location(), b.location());
    }
    assert_eq!(catalog.record_count().await, 5);
}

#[tokio::test]
async fn empty_document_fails_conversion() {
    let h = harness(SolidRenderer::new(0), 10);
    let err = h
        .coordinator
        .convert(Bytes::from(pdf_bytes("empty")))
        .await
        .unwrap_err();
    assert!(matches!(err, PdfCacheError::CorruptPdf { .. }));
    assert_eq!(h.catalog.record_count().await, 0);
    assert!(h.store.is_empty().await);
}

// ── Queue + status ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn submit_twice_renders_once() {
    let h = harness(SolidRenderer::new(2), 10);
    let queue = ConversionQueue::start(h.coordinator.clone(), QueueConfig::default());
    let status = status_query(&h, &queue);
    let doc = Bytes::from(pdf_bytes("dedup"));

    let first = queue.submit(doc.clone()).await.unwrap();
    assert!(matches!(first, SubmitOutcome::Processing { .. }));

    let report = status
        .wait_for_terminal(first.address(), POLL, PATIENCE)
        .await
        .unwrap();
    assert_eq!(report.status, TaskStatus::Completed);
    assert!(report.location.is_some());

    let second = queue.submit(doc).await.unwrap();
    match second {
        SubmitOutcome::AlreadyExists { address, location } => {
            assert_eq!(&address, first.address());
            assert_eq!(Some(location), report.location);
        }
        other => panic!("expected a cache hit, got {other:?}"),
    }
    assert_eq!(h.renderer.documents(), 1);
    queue.shutdown().await;
}

#[tokio::test]
async fn unknown_address_is_not_found() {
    let h = harness(SolidRenderer::new(1), 10);
    let queue = ConversionQueue::start(h.coordinator.clone(), QueueConfig::default());
    let report = status_query(&h, &queue)
        .status(&fingerprint(b"never uploaded"))
        .await
        .unwrap();
    assert_eq!(report.status, TaskStatus::NotFound);
    assert!(report.location.is_none());
    queue.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn in_flight_duplicate_is_pending_and_rendered_once() {
    let gate = Gate::new();
    let h = harness(SolidRenderer::gated(1, gate.clone()), 10);
    let queue = ConversionQueue::start(h.coordinator.clone(), QueueConfig::default());
    let status = status_query(&h, &queue);
    let doc = Bytes::from(pdf_bytes("slow"));

    let first = queue.submit(doc.clone()).await.unwrap();
    gate.wait_for_arrivals(1).await;
    let second = queue.submit(doc).await.unwrap();
    assert!(matches!(second, SubmitOutcome::Processing { .. }));
    assert_eq!(second.address(), first.address());

    let report = status.status(first.address()).await.unwrap();
    assert_eq!(report.status, TaskStatus::Pending);

    gate.open();
    let done = status
        .wait_for_terminal(first.address(), POLL, PATIENCE)
        .await
        .unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(h.renderer.documents(), 1);
    queue.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_conversion_is_terminal_until_resubmitted() {
    let h = harness(SolidRenderer::failing_once(2), 10);
    let queue = ConversionQueue::start(h.coordinator.clone(), QueueConfig::default());
    let status = status_query(&h, &queue);
    let doc = Bytes::from(pdf_bytes("flaky"));

    let first = queue.submit(doc.clone()).await.unwrap();
    let report = status
        .wait_for_terminal(first.address(), POLL, PATIENCE)
        .await
        .unwrap();
    assert_eq!(report.status, TaskStatus::Failed);
    assert!(report.message.contains("xref"), "message: {}", report.message);
    assert_eq!(h.catalog.record_count().await, 0);

    // The worker drops its in-flight slot just after writing the marker.
    for _ in 0..500 {
        if !queue.in_flight().contains(first.address()) {
            break;
        }
        tokio::time::sleep(POLL).await;
    }

    // Same bytes again: the marker is cleared and the job runs again.
    let retry = queue.submit(doc).await.unwrap();
    assert!(matches!(retry, SubmitOutcome::Processing { .. }));
    let report = status
        .wait_for_terminal(retry.address(), POLL, PATIENCE)
        .await
        .unwrap();
    assert_eq!(report.status, TaskStatus::Completed);
    assert!(h.catalog.get_failure(retry.address()).await.unwrap().is_none());
    queue.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_queue_rejects_without_scheduling() {
    let gate = Gate::new();
    let h = harness(SolidRenderer::gated(1, gate.clone()), 10);
    let queue = ConversionQueue::start(
        h.coordinator.clone(),
        QueueConfig {
            capacity: 1,
            workers: 1,
        },
    );
    let status = status_query(&h, &queue);

    let first = queue.submit(Bytes::from(pdf_bytes("doc-0"))).await.unwrap();
    gate.wait_for_arrivals(1).await;

    // One job is running; at most two more fit (one held by the dispatcher,
    // one buffered), so the queue must push back within a few submissions.
    let mut accepted = vec![first.address().clone()];
    let mut rejected = None;
    for i in 1..6 {
        let doc = Bytes::from(pdf_bytes(&format!("doc-{i}")));
        match queue.submit(doc.clone()).await {
            Ok(outcome) => accepted.push(outcome.address().clone()),
            Err(PdfCacheError::QueueFull { capacity }) => {
                assert_eq!(capacity, 1);
                rejected = Some(fingerprint(&doc));
                break;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    let rejected = rejected.expect("queue never reported full");
    assert_eq!(
        status.status(&rejected).await.unwrap().status,
        TaskStatus::NotFound
    );

    gate.open();
    for address in &accepted {
        let report = status.wait_for_terminal(address, POLL, PATIENCE).await.unwrap();
        assert_eq!(report.status, TaskStatus::Completed);
    }
    queue.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_resubmission_keeps_failed_status() {
    let gate = Gate::new();
    let h = harness(SolidRenderer::gated(1, gate.clone()), 10);
    let queue = ConversionQueue::start(
        h.coordinator.clone(),
        QueueConfig {
            capacity: 1,
            workers: 1,
        },
    );
    let status = status_query(&h, &queue);

    let broken = Bytes::from(pdf_bytes("failed earlier"));
    let broken_addr = fingerprint(&broken);
    h.catalog
        .record_failure(ConversionFailure::new(broken_addr.clone(), "xref table is damaged"))
        .await
        .unwrap();

    queue.submit(Bytes::from(pdf_bytes("blocker-0"))).await.unwrap();
    gate.wait_for_arrivals(1).await;
    let mut full = false;
    for i in 1..6 {
        match queue.submit(Bytes::from(pdf_bytes(&format!("blocker-{i}")))).await {
            Ok(_) => {}
            Err(PdfCacheError::QueueFull { .. }) => {
                full = true;
                break;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert!(full, "queue never reported full");

    let retry = queue.submit(broken.clone()).await;
    assert!(matches!(retry, Err(PdfCacheError::QueueFull { .. })));
    let report = status.status(&broken_addr).await.unwrap();
    assert_eq!(report.status, TaskStatus::Failed);
    assert!(report.message.contains("xref"));

    gate.open();
    queue.shutdown().await;
    assert_eq!(
        status.status(&broken_addr).await.unwrap().status,
        TaskStatus::Failed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_finishes_queued_work() {
    let h = harness(SolidRenderer::new(1), 10);
    let queue = Arc::new(ConversionQueue::start(
        h.coordinator.clone(),
        QueueConfig {
            capacity: 8,
            workers: 1,
        },
    ));
    for i in 0..4 {
        queue
            .submit(Bytes::from(pdf_bytes(&format!("drain-{i}"))))
            .await
            .unwrap();
    }
    queue.shutdown().await;
    assert_eq!(h.catalog.record_count().await, 4);

    let late = queue.submit(Bytes::from(pdf_bytes("late"))).await;
    assert!(matches!(late, Err(PdfCacheError::QueueClosed)));
}
