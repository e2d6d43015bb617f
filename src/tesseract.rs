use image::DynamicImage;
use rusty_tesseract::{Args, Image};
use tracing::instrument;

use crate::{Error, OcrEngine, Result, TextLine, WordBox};

// Word-level entries in tesseract's TSV output.
const WORD_LEVEL: i32 = 5;

/// OCR engine backed by the tesseract CLI. Word boxes come back in the
/// coordinate space of the image that was recognized.
pub struct TesseractEngine {
    args: Args,
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self {
            args: Args::default(),
        }
    }

    pub fn with_lang(lang: impl Into<String>) -> Self {
        let mut args = Args::default();
        args.lang = lang.into();
        Self { args }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractEngine {
    #[instrument(level = "debug", skip(self, image))]
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextLine>> {
        let image = Image::from_dynamic_image(image).map_err(ocr_error)?;
        let output = rusty_tesseract::image_to_data(&image, &self.args).map_err(ocr_error)?;

        let mut lines: Vec<TextLine> = Vec::new();
        let mut current_line: Option<(i32, i32, i32)> = None;
        for record in &output.data {
            if record.level != WORD_LEVEL || record.text.trim().is_empty() {
                continue;
            }
            let key = (record.block_num, record.par_num, record.line_num);
            if current_line != Some(key) {
                lines.push(TextLine::default());
                current_line = Some(key);
            }
            let x0 = record.left as f32;
            let y0 = record.top as f32;
            if let Some(line) = lines.last_mut() {
                line.words.push(WordBox::new(
                    record.text.trim(),
                    x0,
                    y0,
                    x0 + record.width as f32,
                    y0 + record.height as f32,
                ));
            }
        }
        log::debug!("recognized {} lines", lines.len());
        Ok(lines)
    }
}

fn ocr_error(error: rusty_tesseract::TessError) -> Error {
    Error::Ocr(error.to_string())
}
