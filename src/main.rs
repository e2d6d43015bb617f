use std::path::PathBuf;

use clap::Parser;
use ocrgrid::pdf::PdfiumRenderer;
use ocrgrid::tesseract::TesseractEngine;
use ocrgrid::{ColumnSet, Layout, OcrGridBuilder, RowStrategy, DEFAULT_RENDER_SCALE};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Extract tabular data from a batch of structurally similar documents using
/// a calibrated layout template.
#[derive(Parser, Debug)]
#[command(name = "ocrgrid")]
struct Cli {
    /// Layout template JSON produced by a calibration session
    #[arg(long)]
    layout: PathBuf,

    /// Input PDF files, all assumed to share the template's layout
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output CSV path
    #[arg(short, long, default_value = "extracted.csv")]
    output: PathBuf,

    /// Render scale factor; must match the one used during calibration
    #[arg(long, default_value_t = DEFAULT_RENDER_SCALE)]
    scale: f32,

    /// Process every page of each document instead of only the first
    #[arg(long)]
    multi_page: bool,

    /// Skip the final page of each document
    #[arg(long)]
    ignore_last_page: bool,

    /// Slice rows at a fixed pixel height instead of trusting OCR line
    /// grouping
    #[arg(long)]
    row_height: Option<f32>,

    /// Read column names from the calibrated header region of the first file
    #[arg(long)]
    infer_headers: bool,

    /// Tesseract language
    #[arg(long, default_value = "eng")]
    lang: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let raw = std::fs::read_to_string(&cli.layout).expect("Failed to read layout template");
    let layout: Layout = serde_json::from_str(&raw).expect("Invalid layout template");

    let renderer = PdfiumRenderer::new().expect("Failed to bind pdfium");
    let ocr = TesseractEngine::with_lang(&cli.lang);

    let row_strategy = match cli.row_height {
        Some(row_height) => RowStrategy::Fixed { row_height },
        None => RowStrategy::Auto,
    };
    let engine = OcrGridBuilder::new()
        .scale(cli.scale)
        .multi_page(cli.multi_page)
        .ignore_last_page(cli.ignore_last_page)
        .row_strategy(row_strategy)
        .build(renderer, ocr);

    let mut names = Vec::new();
    if cli.infer_headers {
        names = engine
            .infer_header_titles(&cli.files[0], &layout)
            .expect("Header inference failed");
        log::info!("inferred column names: {names:?}");
    }
    let columns =
        ColumnSet::derive(&layout, &names).expect("Layout template is missing left/right edges");

    let summary = engine
        .extract_batch(&cli.files, &layout, &columns)
        .expect("Extraction could not start");
    for failure in &summary.failures {
        eprintln!("failed: {} ({})", failure.file, failure.message);
    }

    let written =
        ocrgrid::write_csv(&cli.output, &columns.names, &summary.rows).expect("CSV export failed");
    if written {
        println!(
            "Wrote {} rows from {} files to {}",
            summary.rows.len(),
            cli.files.len() - summary.failures.len(),
            cli.output.display()
        );
    } else {
        println!("No rows extracted, nothing written");
    }
}
