use std::path::Path;

mod bucket;
mod error;
mod export;
pub mod layout;
mod result;
pub mod util;

#[cfg(feature = "pdf")]
pub mod pdf;
#[cfg(feature = "tesseract")]
pub mod tesseract;

use image::DynamicImage;
use tracing::instrument;

pub use bucket::{bucket_line, column_boundaries, fixed_bands, read_header_titles};
pub use error::{Error, Result};
pub use export::{write_csv, write_csv_to_string, SOURCE_FILE_HEADER};
pub use layout::{CalibrationMode, Calibrator, ColumnSet, Layout, DIVIDER_HIT_TOLERANCE};
pub use result::*;

pub use image;

pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

/// Renders one page of a document to a raster image at a fixed scale factor.
/// The scale must match the one used while calibrating the layout; no check
/// is made that a batch file's page size matches the template's.
pub trait PageRenderer {
    fn page_count(&self, file: &Path) -> Result<usize>;
    fn render_page(&self, file: &Path, page: usize, scale: f32) -> Result<DynamicImage>;
}

/// Recognizes text in a raster image, returning lines of words with bounding
/// boxes in the image's own coordinate space. Line grouping and word
/// segmentation are entirely the engine's responsibility.
pub trait OcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextLine>>;
}

/// How recognized words are grouped into output rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowStrategy {
    /// Trust the OCR engine's own line grouping.
    Auto,
    /// Re-slice the data region into uniform-height bands.
    Fixed { row_height: f32 },
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Process every page of each document instead of only the first.
    pub multi_page: bool,
    /// Skip the final page of each document, for statements that end with a
    /// summary or disclaimer page. Only meaningful together with multi_page.
    pub ignore_last_page: bool,
    pub row_strategy: RowStrategy,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            multi_page: false,
            ignore_last_page: false,
            row_strategy: RowStrategy::Auto,
        }
    }
}

pub struct OcrGridBuilder {
    scale: f32,
    options: ExtractOptions,
}

impl OcrGridBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    pub fn multi_page(mut self, multi_page: bool) -> Self {
        self.options.multi_page = multi_page;
        self
    }

    pub fn ignore_last_page(mut self, ignore_last_page: bool) -> Self {
        self.options.ignore_last_page = ignore_last_page;
        self
    }

    pub fn row_strategy(mut self, row_strategy: RowStrategy) -> Self {
        self.options.row_strategy = row_strategy;
        self
    }

    pub fn build<R: PageRenderer, O: OcrEngine>(self, renderer: R, ocr: O) -> OcrGrid<R, O> {
        OcrGrid {
            renderer,
            ocr,
            scale: self.scale,
            options: self.options,
        }
    }
}

impl Default for OcrGridBuilder {
    fn default() -> Self {
        Self {
            scale: DEFAULT_RENDER_SCALE,
            options: ExtractOptions::default(),
        }
    }
}

/// Applies one calibrated layout across a batch of structurally similar
/// documents: render, crop to the calibrated region, recognize, and bucket
/// every word into its column by geometric containment.
pub struct OcrGrid<R, O> {
    renderer: R,
    ocr: O,
    scale: f32,
    options: ExtractOptions,
}

impl<R: PageRenderer, O: OcrEngine> OcrGrid<R, O> {
    /// Process every file sequentially with the same layout. A failure in one
    /// file is logged and recorded, and the batch moves on; only an
    /// incomplete layout aborts before the first file.
    #[instrument(skip(self, files, layout, columns))]
    pub fn extract_batch(
        &self,
        files: &[impl AsRef<Path>],
        layout: &Layout,
        columns: &ColumnSet,
    ) -> Result<BatchSummary> {
        let missing = layout.missing_boundaries();
        if !missing.is_empty() {
            return Err(Error::MissingBoundary { missing });
        }

        let mut summary = BatchSummary::default();
        let total = files.len();
        for (index, file) in files.iter().enumerate() {
            let file = file.as_ref();
            tracing::info!(file = %file.display(), "processing file {} of {total}", index + 1);
            match self.extract_file(file, layout, columns) {
                Ok(rows) => summary.rows.extend(rows),
                Err(error) => {
                    tracing::warn!(file = %file.display(), %error, "file skipped");
                    summary.failures.push(FileFailure {
                        file: file.display().to_string(),
                        message: error.to_string(),
                    });
                }
            }
        }
        Ok(summary)
    }

    /// Extract the rows of a single document with an already-validated
    /// layout.
    #[instrument(level = "debug", skip(self, layout, columns))]
    pub fn extract_file(
        &self,
        file: &Path,
        layout: &Layout,
        columns: &ColumnSet,
    ) -> Result<Vec<ExtractedRow>> {
        let mut rows = Vec::new();
        for page in self.pages_to_process(file)? {
            let image = self.renderer.render_page(file, page, self.scale)?;
            rows.extend(self.extract_page(file, &image, layout, columns)?);
        }
        Ok(rows)
    }

    /// Extract the rows of one already-rendered page.
    pub fn extract_page(
        &self,
        file: &Path,
        image: &DynamicImage,
        layout: &Layout,
        columns: &ColumnSet,
    ) -> Result<Vec<ExtractedRow>> {
        let (x0, y0, x1, y1) = layout.data_region().ok_or_else(|| Error::MissingBoundary {
            missing: layout.missing_boundaries(),
        })?;

        let crop = util::crop_region(image, x0, y0, x1, y1);
        if crop.width() == 0 || crop.height() == 0 {
            log::debug!("calibrated data region is empty for {}", file.display());
            return Ok(Vec::new());
        }

        let lines = self.ocr.recognize(&crop)?;
        let lines = match self.options.row_strategy {
            RowStrategy::Auto => lines,
            RowStrategy::Fixed { row_height } => bucket::fixed_bands(&lines, row_height),
        };

        let boundaries = bucket::to_crop_space(&columns.boundaries);
        let source_file = source_name(file);
        Ok(lines
            .iter()
            .filter_map(|line| bucket::bucket_line(&line.words, &boundaries))
            .map(|cells| ExtractedRow {
                source_file: source_file.clone(),
                cells,
            })
            .collect())
    }

    /// Recognize the calibrated header strip of the template and return one
    /// title per column, `"Untitled"` where nothing was read.
    #[instrument(level = "debug", skip(self, image, layout))]
    pub fn read_header_titles(&self, image: &DynamicImage, layout: &Layout) -> Result<Vec<String>> {
        let (x0, y0, x1, y1) = layout.header_region().ok_or_else(|| Error::MissingBoundary {
            missing: layout.missing_header_boundaries(),
        })?;
        let boundaries = bucket::to_crop_space(&column_boundaries(x0, x1, &layout.dividers));
        let column_count = boundaries.len() - 1;

        let crop = util::crop_region(image, x0, y0, x1, y1);
        if crop.width() == 0 || crop.height() == 0 {
            return Ok(vec!["Untitled".to_string(); column_count]);
        }

        let lines = self.ocr.recognize(&crop)?;
        let words = lines
            .into_iter()
            .flat_map(|line| line.words)
            .collect::<Vec<_>>();
        Ok(bucket::read_header_titles(&words, &boundaries))
    }

    /// Render the template's first page and infer header titles from it.
    pub fn infer_header_titles(&self, file: &Path, layout: &Layout) -> Result<Vec<String>> {
        let image = self.renderer.render_page(file, 0, self.scale)?;
        self.read_header_titles(&image, layout)
    }

    fn pages_to_process(&self, file: &Path) -> Result<std::ops::Range<usize>> {
        if !self.options.multi_page {
            return Ok(0..1);
        }
        let count = self.renderer.page_count(file)?;
        let end = if self.options.ignore_last_page {
            count.saturating_sub(1)
        } else {
            count
        };
        Ok(0..end)
    }
}

fn source_name(file: &Path) -> String {
    file.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}
