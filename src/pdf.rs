use std::path::Path;

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::instrument;

use crate::{Error, PageRenderer, Result};

/// Page renderer backed by pdfium. Binds to a library next to the executable
/// first, then to a system-wide install.
pub struct PdfiumRenderer {
    pdfium: Pdfium,
}

impl PdfiumRenderer {
    #[instrument(level = "debug")]
    pub fn new() -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|error| Error::Backend(error.to_string()))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PageRenderer for PdfiumRenderer {
    fn page_count(&self, file: &Path) -> Result<usize> {
        let document = self
            .pdfium
            .load_pdf_from_file(file, None)
            .map_err(|error| render_error(file, &error))?;
        Ok(document.pages().len() as usize)
    }

    #[instrument(level = "debug", skip(self))]
    fn render_page(&self, file: &Path, page: usize, scale: f32) -> Result<DynamicImage> {
        let document = self
            .pdfium
            .load_pdf_from_file(file, None)
            .map_err(|error| render_error(file, &error))?;
        let page = document
            .pages()
            .get(page as u16)
            .map_err(|error| render_error(file, &error))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|error| render_error(file, &error))?;
        let image = bitmap.as_image();
        log::debug!(
            "rendered {} page at {}x{}",
            file.display(),
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

fn render_error(file: &Path, error: &PdfiumError) -> Error {
    Error::Render(format!("{}: {error}", file.display()))
}
