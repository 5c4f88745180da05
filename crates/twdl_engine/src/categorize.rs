//! Post-processing pass that sorts downloaded images into colour buckets.
//!
//! Each image is centre-cropped to a square, scaled to 256x256 and every
//! pixel is mapped to a coarse CIE XYZ key; the most frequent key is the
//! image's colour index. Images are then copied into `NNNN` subfolders; an
//! index shared by fewer than two images goes to the catch-all bucket.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use twdl_core::StatusUpdate;
use twdl_logging::{twdl_debug, twdl_info};

use crate::persist::{AtomicFileWriter, PersistError};
use crate::sink::StatusSink;

/// Bucket for colour indices that only one image has.
pub const SINGLETON_BUCKET: u32 = 9999;

const SAMPLE_SIZE: u32 = 256;
const X_SCALE: f64 = 255.0 / 3877.86048;
const Z_SCALE: f64 = 255.0 / 4443.35664;

#[derive(Debug, thiserror::Error)]
pub enum CategorizeError {
    #[error("cannot list {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot copy: {0}")]
    Persist(#[from] PersistError),
    #[error("cannot write statistics: {0}")]
    Stats(#[from] serde_json::Error),
}

/// Quantised XYZ key of one RGB pixel.
pub fn color_key(red: u8, green: u8, blue: u8) -> u32 {
    let (r, g, b) = (f64::from(red), f64::from(green), f64::from(blue));
    let x = r * 0.412391 + g * 0.357584 + b * 0.180481;
    let y = r * 0.212639 + g * 0.715169 + b * 0.072192;
    let z = r * 0.019331 + g * 0.119195 + b * 0.950532;
    let kx = (x * X_SCALE).floor() as u32;
    let ky = (y / 16.0).floor() as u32;
    let kz = (z * Z_SCALE).floor() as u32;
    kx * 256 + ky * 16 + kz
}

#[derive(Debug, Clone, Default)]
pub struct ColorHistogram {
    counts: HashMap<u32, u32>,
    distinct_rgb: usize,
    pixels: u64,
    key_sum: u64,
}

impl ColorHistogram {
    pub fn of_image(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let side = width.min(height);
        let sample = image
            .crop_imm((width - side) / 2, (height - side) / 2, side, side)
            .resize_exact(SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Triangle)
            .to_rgb8();

        let mut histogram = Self::default();
        let mut rgb = HashSet::new();
        for pixel in sample.pixels() {
            let [r, g, b] = pixel.0;
            rgb.insert((r, g, b));
            let key = color_key(r, g, b);
            *histogram.counts.entry(key).or_insert(0) += 1;
            histogram.pixels += 1;
            histogram.key_sum += u64::from(key);
        }
        histogram.distinct_rgb = rgb.len();
        histogram
    }

    /// Most frequent key; ties go to the smaller key.
    pub fn dominant(&self) -> Option<u32> {
        self.counts
            .iter()
            .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then(kb.cmp(ka)))
            .map(|(key, _)| *key)
    }

    pub fn stats(&self) -> ColorStats {
        let mean = if self.pixels == 0 {
            0.0
        } else {
            self.key_sum as f64 / self.pixels as f64
        };
        let variance = if self.pixels == 0 {
            0.0
        } else {
            self.counts
                .iter()
                .map(|(key, count)| f64::from(*count) * (f64::from(*key) - mean).powi(2))
                .sum::<f64>()
                / self.pixels as f64
        };
        let min = self.counts.values().copied().min().unwrap_or(0);
        let max = self.counts.values().copied().max().unwrap_or(0);
        let gini = if max == min {
            0.0
        } else {
            let spread: f64 = self.counts.values().map(|c| f64::from(c - min)).sum();
            1.0 - spread * 2.0 / (f64::from(max - min) * self.counts.len() as f64)
        };
        ColorStats {
            colors_before: self.distinct_rgb,
            colors_after: self.counts.len(),
            mean_key: mean,
            std_dev: variance.sqrt(),
            gini,
            dominant: self.dominant(),
        }
    }
}

/// Development-mode sidecar content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorStats {
    pub colors_before: usize,
    pub colors_after: usize,
    pub mean_key: f64,
    pub std_dev: f64,
    pub gini: f64,
    pub dominant: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorizeSummary {
    pub scanned: usize,
    pub categorized: usize,
    /// Bucket number to number of files copied into it.
    pub buckets: BTreeMap<u32, usize>,
}

pub struct ColorCategorizer<'a> {
    destination: PathBuf,
    sink: &'a dyn StatusSink,
    development_mode: bool,
}

impl<'a> ColorCategorizer<'a> {
    pub fn new(destination: impl Into<PathBuf>, sink: &'a dyn StatusSink) -> Self {
        Self {
            destination: destination.into(),
            sink,
            development_mode: false,
        }
    }

    /// Also write a `<name>.json` statistics sidecar per image.
    pub fn with_development_mode(mut self, enabled: bool) -> Self {
        self.development_mode = enabled;
        self
    }

    pub fn run(&self) -> Result<CategorizeSummary, CategorizeError> {
        let files = self.list_files()?;
        let mut summary = CategorizeSummary {
            scanned: files.len(),
            ..CategorizeSummary::default()
        };

        self.sink.emit(StatusUpdate::Count(files.len()));
        self.sink
            .status("detecting the dominant colour of each image".to_string());
        let mut indices: Vec<(PathBuf, u32)> = Vec::new();
        let mut counters: HashMap<u32, usize> = HashMap::new();
        for (i, path) in files.iter().enumerate() {
            self.sink.emit(StatusUpdate::Index(i));
            if let Some(index) = self.classify(path)? {
                *counters.entry(index).or_insert(0) += 1;
                indices.push((path.clone(), index));
            }
        }

        self.sink.status("copying files".to_string());
        for (i, (path, index)) in indices.iter().enumerate() {
            self.sink.emit(StatusUpdate::Index(i));
            let bucket = if counters.get(index).copied().unwrap_or(0) < 2 {
                SINGLETON_BUCKET
            } else {
                *index
            };
            let bucket_dir = self.destination.join(format!("{bucket:04}"));
            AtomicFileWriter::new(bucket_dir).copy_in(path)?;
            *summary.buckets.entry(bucket).or_insert(0) += 1;
            summary.categorized += 1;
        }
        self.sink.emit(StatusUpdate::Index(files.len()));
        twdl_info!(
            "categorized {} of {} files into {} bucket(s)",
            summary.categorized,
            summary.scanned,
            summary.buckets.len()
        );
        Ok(summary)
    }

    fn list_files(&self) -> Result<Vec<PathBuf>, CategorizeError> {
        let read_dir = |path: &Path| {
            fs::read_dir(path).map_err(|source| CategorizeError::ReadDir {
                path: path.to_path_buf(),
                source,
            })
        };
        let mut files: Vec<_> = read_dir(&self.destination)?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .collect();
        files.sort();
        Ok(files)
    }

    fn classify(&self, path: &Path) -> Result<Option<u32>, CategorizeError> {
        let image = match image::open(path) {
            Ok(image) => image,
            Err(err) => {
                twdl_debug!("skipping {}: {}", path.display(), err);
                return Ok(None);
            }
        };
        if image.width() == 0 || image.height() == 0 {
            return Ok(None);
        }
        let histogram = ColorHistogram::of_image(&image);
        if self.development_mode {
            let stats = histogram.stats();
            let sidecar = path.with_extension("json");
            if let Some(name) = sidecar.file_name().and_then(|n| n.to_str()) {
                let json = serde_json::to_string_pretty(&stats)?;
                AtomicFileWriter::new(&self.destination).write(name, json)?;
            }
        }
        Ok(histogram.dominant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_and_white_keys_are_the_extremes() {
        assert_eq!(color_key(0, 0, 0), 0);
        let white = color_key(255, 255, 255);
        assert_eq!(white, 15 * 256 + 15 * 16 + 15);
    }

    #[test]
    fn dominant_prefers_smaller_key_on_ties() {
        let histogram = ColorHistogram {
            counts: HashMap::from([(7, 3), (2, 3), (9, 1)]),
            ..ColorHistogram::default()
        };
        assert_eq!(histogram.dominant(), Some(2));
    }
}
