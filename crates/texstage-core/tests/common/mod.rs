#![allow(dead_code)]

pub mod asset_server;
pub mod fake_api;

use std::path::Path;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use texstage_core::fetch::{Fetcher, ManifestSource};
use texstage_core::queue::{JobProgress, JobRecord, JobRunner, JobState, QueueCounts, QueueObserver};
use texstage_core::raster::encode_png;
use texstage_core::staging::StagingDir;

use fake_api::FakeApi;

pub fn png_rgb(w: u32, h: u32, px: [u8; 3]) -> Vec<u8> {
    encode_png(&DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(px)))).unwrap()
}

pub fn png_luma(w: u32, h: u32, v: u8) -> Vec<u8> {
    encode_png(&DynamicImage::ImageLuma8(GrayImage::from_pixel(w, h, Luma([v])))).unwrap()
}

/// The four 4k source maps of `asset`, sized like a real set (height smaller).
pub fn full_map_set(asset: &str) -> Vec<(String, Vec<u8>)> {
    vec![
        (format!("{}_arm_4k.png", asset), png_rgb(8, 8, [10, 20, 30])),
        (format!("{}_nor_dx_4k.png", asset), png_rgb(8, 8, [128, 128, 255])),
        (format!("{}_disp_4k.png", asset), png_luma(4, 4, 77)),
        (format!("{}_diff_4k.png", asset), png_rgb(8, 8, [50, 60, 70])),
    ]
}

pub fn staging_in(dir: &Path) -> StagingDir {
    StagingDir::new(dir.join("staging"), dir.join("staging").join("textures"))
}

pub fn runner(api: &Arc<FakeApi>, dir: &Path) -> JobRunner {
    let fetcher: Arc<dyn Fetcher> = Arc::clone(api) as Arc<dyn Fetcher>;
    let manifests: Arc<dyn ManifestSource> = Arc::clone(api) as Arc<dyn ManifestSource>;
    JobRunner::new(fetcher, manifests, staging_in(dir))
}

/// Observer that keeps every event.
#[derive(Default)]
pub struct Recorder {
    pub counts: Mutex<Vec<QueueCounts>>,
    pub progress: Mutex<Vec<JobProgress>>,
    pub finished: Mutex<Vec<(u64, JobState)>>,
}

impl Recorder {
    pub fn finished(&self) -> Vec<(u64, JobState)> {
        self.finished.lock().unwrap().clone()
    }

    pub fn max_in_progress(&self) -> usize {
        self.counts.lock().unwrap().iter().map(|c| c.in_progress).max().unwrap_or(0)
    }
}

impl QueueObserver for Recorder {
    fn on_counts(&self, counts: QueueCounts) {
        self.counts.lock().unwrap().push(counts);
    }

    fn on_progress(&self, progress: JobProgress) {
        self.progress.lock().unwrap().push(progress);
    }

    fn on_finished(&self, record: &JobRecord) {
        self.finished.lock().unwrap().push((record.id, record.state));
    }
}
