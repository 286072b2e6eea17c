use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Instant,
};

use image::GrayImage;
use rayon::prelude::*;

use crate::{
    common::error::{BarcodeError, BarcodeResult},
    reader::{DecodeResult, Reader, ReaderOptions, Rejection},
};

// Cancellation
//------------------------------------------------------------------------------

/// Cooperative cancellation, checked between images. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// Batch report
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Ordered by source index.
    pub results: Vec<DecodeResult>,
    pub rejections: Vec<Rejection>,
    /// Images that were read, whether or not they held a symbol.
    pub processed: usize,
    /// Source indices left unread due to cancellation or the deadline.
    pub skipped: Vec<usize>,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct Sink {
    results: Vec<DecodeResult>,
    rejections: Vec<Rejection>,
    skipped: Vec<usize>,
}

// Batch decoder
//------------------------------------------------------------------------------

/// Fixed pool of `max_workers` threads decoding independent images.
pub struct BatchDecoder {
    reader: Reader,
    pool: rayon::ThreadPool,
}

impl BatchDecoder {
    pub fn new(opts: ReaderOptions) -> BarcodeResult<Self> {
        let workers = opts.max_workers;
        let reader = Reader::new(opts)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("barcodism-worker-{i}"))
            .build()
            .map_err(|e| {
                log::warn!("Failed to start worker pool: {e}");
                BarcodeError::WorkerPool
            })?;
        Ok(Self { reader, pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn decode_all(&self, images: &[GrayImage]) -> BatchReport {
        self.decode_all_with(images, &CancelToken::new())
    }

    /// Decodes every image on the pool. Results carry the index of their image.
    /// Cancellation and the deadline are honoured between images; unread
    /// images are listed as skipped.
    pub fn decode_all_with(&self, images: &[GrayImage], cancel: &CancelToken) -> BatchReport {
        let started = Instant::now();
        let deadline = self.reader.options().deadline();
        let sink = Mutex::new(Sink::default());
        let processed = AtomicUsize::new(0);
        log::debug!("Decoding {} images on {} workers", images.len(), self.workers());

        self.pool.install(|| {
            images.par_iter().enumerate().for_each(|(idx, img)| {
                let expired = deadline.is_some_and(|d| started.elapsed() >= d);
                if cancel.is_cancelled() || expired {
                    sink.lock().unwrap_or_else(PoisonError::into_inner).skipped.push(idx);
                    return;
                }

                let outcome = self.reader.read_indexed(img, idx);
                processed.fetch_add(1, Ordering::Relaxed);

                let mut sink = sink.lock().unwrap_or_else(PoisonError::into_inner);
                sink.results.extend(outcome.results);
                sink.rejections.extend(outcome.rejections);
            })
        });

        let Sink { mut results, mut rejections, mut skipped } =
            sink.into_inner().unwrap_or_else(PoisonError::into_inner);
        results.sort_by_key(|r| r.source_index);
        rejections.sort_by_key(|r| r.source_index);
        skipped.sort_unstable();

        let report = BatchReport {
            results,
            rejections,
            processed: processed.into_inner(),
            cancelled: cancel.is_cancelled(),
            skipped,
        };
        log::debug!(
            "Batch done in {:?}: {} results, {} rejections, {} skipped",
            started.elapsed(),
            report.results.len(),
            report.rejections.len(),
            report.skipped.len()
        );
        report
    }
}

#[cfg(test)]
mod batch_tests {
    use image::{GrayImage, Luma};

    use super::{BatchDecoder, CancelToken};
    use crate::{
        builder::QRBuilder,
        common::error::BarcodeError,
        reader::ReaderOptions,
        render::{render, RenderOptions},
    };

    fn qr_image(data: &[u8]) -> GrayImage {
        let qr = QRBuilder::new(data).build().unwrap();
        render(&qr.to_grid(), &RenderOptions::default().module_size(4))
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(!token.is_cancelled());
        shared.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_pool_size() {
        let opts = ReaderOptions { max_workers: 3, ..Default::default() };
        assert_eq!(BatchDecoder::new(opts).unwrap().workers(), 3);
        let opts = ReaderOptions { max_workers: 0, ..Default::default() };
        assert_eq!(BatchDecoder::new(opts).err().map(|_| ()), Some(()));
        let opts = ReaderOptions { confidence_threshold: -1.0, ..Default::default() };
        assert!(matches!(BatchDecoder::new(opts), Err(BarcodeError::UnsupportedOperation)));
    }

    #[test]
    fn test_order_by_source() {
        let images = (0..6).map(|i| qr_image(format!("image {i}").as_bytes())).collect::<Vec<_>>();
        let opts = ReaderOptions { max_workers: 4, ..Default::default() };
        let report = BatchDecoder::new(opts).unwrap().decode_all(&images);
        assert_eq!(report.processed, 6);
        let indices = report.results.iter().map(|r| r.source_index).collect::<Vec<_>>();
        assert_eq!(indices, [0, 1, 2, 3, 4, 5]);
        for r in report.results.iter() {
            assert_eq!(r.text, format!("image {}", r.source_index));
        }
    }

    #[test]
    fn test_cancelled_before_start() {
        let images = vec![qr_image(b"a"), GrayImage::from_pixel(10, 10, Luma([255]))];
        let token = CancelToken::new();
        token.cancel();
        let report = BatchDecoder::new(ReaderOptions::default()).unwrap().decode_all_with(&images, &token);
        assert!(report.cancelled);
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped, [0, 1]);
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_expired_deadline() {
        let images = vec![qr_image(b"late"); 3];
        let opts = ReaderOptions { deadline_ms: Some(0), ..Default::default() };
        let report = BatchDecoder::new(opts).unwrap().decode_all(&images);
        assert!(!report.cancelled);
        assert_eq!(report.skipped, [0, 1, 2]);
    }
}
