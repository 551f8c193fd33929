//! Shared fakes for the integration tests. None of them need pdfium.

#![allow(dead_code)]

use edgequake_pdf2img::{
    ConversionCoordinator, MemoryArtifactStore, MemoryCatalog, PageRenderer, PdfCacheError,
};
use image::{DynamicImage, Rgb, RgbImage};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Renders `pages` solid-colour pages for any input.
///
/// Each page gets a different colour so batch boundaries would show up as
/// different output if pages were mixed up.
pub struct SolidRenderer {
    pages: usize,
    documents: AtomicUsize,
    windows: AtomicUsize,
    gate: Option<Gate>,
    fail_first: AtomicBool,
}

impl SolidRenderer {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            documents: AtomicUsize::new(0),
            windows: AtomicUsize::new(0),
            gate: None,
            fail_first: AtomicBool::new(false),
        }
    }

    /// Block every render until [`Gate::open`] is called.
    pub fn gated(pages: usize, gate: Gate) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(pages)
        }
    }

    /// Fail the first document with a render error, succeed afterwards.
    pub fn failing_once(pages: usize) -> Self {
        let r = Self::new(pages);
        r.fail_first.store(true, Ordering::SeqCst);
        r
    }

    /// Number of documents whose page count was read, i.e. render attempts.
    pub fn documents(&self) -> usize {
        self.documents.load(Ordering::SeqCst)
    }

    pub fn windows(&self) -> usize {
        self.windows.load(Ordering::SeqCst)
    }
}

impl PageRenderer for SolidRenderer {
    fn page_count(&self, _pdf: &[u8]) -> Result<usize, PdfCacheError> {
        self.documents.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        if self.fail_first.swap(false, Ordering::SeqCst) {
            return Err(PdfCacheError::CorruptPdf {
                detail: "xref table is damaged".into(),
            });
        }
        Ok(self.pages)
    }

    fn render_range(
        &self,
        _pdf: &[u8],
        pages: Range<usize>,
    ) -> Result<Vec<DynamicImage>, PdfCacheError> {
        self.windows.fetch_add(1, Ordering::SeqCst);
        Ok(pages
            .map(|i| {
                let shade = (i * 40 % 256) as u8;
                DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 12, Rgb([shade, 128, 255 - shade])))
            })
            .collect())
    }
}

/// A latch that blocking render threads wait on.
#[derive(Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
    waiting: Arc<AtomicUsize>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    fn wait(&self) {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let (lock, cvar) = &*self.inner;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = cvar.wait(open).unwrap();
        }
    }

    pub fn open(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    /// Renders currently parked (or already released) at the gate.
    pub fn arrivals(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` renders have reached the gate.
    pub async fn wait_for_arrivals(&self, n: usize) {
        for _ in 0..500 {
            if self.arrivals() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("only {} renders reached the gate, expected {}", self.arrivals(), n);
    }
}

pub struct Harness {
    pub catalog: Arc<MemoryCatalog>,
    pub store: Arc<MemoryArtifactStore>,
    pub renderer: Arc<SolidRenderer>,
    pub coordinator: Arc<ConversionCoordinator>,
}

pub fn harness(renderer: SolidRenderer, batch_size: usize) -> Harness {
    let catalog = Arc::new(MemoryCatalog::new());
    let store = Arc::new(MemoryArtifactStore::default());
    let renderer = Arc::new(renderer);
    let coordinator = Arc::new(ConversionCoordinator::new(
        catalog.clone(),
        store.clone(),
        renderer.clone(),
        batch_size,
    ));
    Harness {
        catalog,
        store,
        renderer,
        coordinator,
    }
}

pub fn pdf_bytes(tag: &str) -> Vec<u8> {
    format!("%PDF-1.7\n% {tag}\n%%EOF\n").into_bytes()
}
