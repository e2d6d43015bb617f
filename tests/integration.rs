use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::DynamicImage;
use ocrgrid::{
    write_csv_to_string, ColumnSet, Error, Layout, OcrEngine, OcrGridBuilder, PageRenderer, Result,
    TextLine, WordBox,
};

const HEADER_CROP_HEIGHT: u32 = 40;

fn layout() -> Layout {
    Layout {
        header_top: Some(10.0),
        header_bottom: Some(50.0),
        table_bottom: Some(150.0),
        left: Some(0.0),
        right: Some(300.0),
        dividers: vec![100.0, 200.0],
    }
}

fn line(words: &[(&str, f32, f32)]) -> TextLine {
    TextLine {
        words: words
            .iter()
            .map(|(text, x0, x1)| WordBox::new(*text, *x0, 0.0, *x1, 12.0))
            .collect(),
    }
}

struct StubRenderer {
    pages: usize,
    fail_on: Option<&'static str>,
    rendered: Rc<RefCell<Vec<(PathBuf, usize)>>>,
}

impl StubRenderer {
    fn new() -> Self {
        Self {
            pages: 1,
            fail_on: None,
            rendered: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn with_pages(mut self, pages: usize) -> Self {
        self.pages = pages;
        self
    }

    fn failing_on(mut self, name: &'static str) -> Self {
        self.fail_on = Some(name);
        self
    }
}

impl PageRenderer for StubRenderer {
    fn page_count(&self, _file: &Path) -> Result<usize> {
        Ok(self.pages)
    }

    fn render_page(&self, file: &Path, page: usize, _scale: f32) -> Result<DynamicImage> {
        if let Some(fail) = self.fail_on {
            if file.ends_with(fail) {
                return Err(Error::Render(format!(
                    "{}: synthetic render failure",
                    file.display()
                )));
            }
        }
        self.rendered.borrow_mut().push((file.to_path_buf(), page));
        Ok(DynamicImage::new_rgb8(600, 800))
    }
}

/// Replays scripted lines; the header strip and the data region are told
/// apart by the height of the crop that reaches the engine.
struct ScriptedOcr {
    data_lines: Vec<TextLine>,
    header_lines: Vec<TextLine>,
}

impl ScriptedOcr {
    fn with_data(data_lines: Vec<TextLine>) -> Self {
        Self {
            data_lines,
            header_lines: Vec::new(),
        }
    }
}

impl OcrEngine for ScriptedOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextLine>> {
        if image.height() == HEADER_CROP_HEIGHT {
            Ok(self.header_lines.clone())
        } else {
            Ok(self.data_lines.clone())
        }
    }
}

#[test]
fn single_file_extracts_bucketed_rows() {
    let ocr = ScriptedOcr::with_data(vec![line(&[("Acme", 10.0, 90.0), ("42.50", 210.0, 280.0)])]);
    let engine = OcrGridBuilder::new().build(StubRenderer::new(), ocr);

    let layout = layout();
    let columns = ColumnSet::derive(&layout, &[]).unwrap();
    let summary = engine
        .extract_batch(&["statements/a.pdf"], &layout, &columns)
        .unwrap();

    assert!(summary.failures.is_empty());
    assert_eq!(summary.rows.len(), 1);
    assert_eq!(summary.rows[0].source_file, "a.pdf");
    assert_eq!(summary.rows[0].cells, vec!["Acme", "", "42.50"]);
}

#[test]
fn extracted_rows_export_as_csv() {
    let ocr = ScriptedOcr::with_data(vec![line(&[("1/1/24", 10.0, 90.0), ("10.00", 110.0, 190.0)])]);
    let engine = OcrGridBuilder::new().build(StubRenderer::new(), ocr);

    let layout = Layout {
        dividers: vec![100.0],
        ..layout()
    };
    let names = ["Date".to_string(), "Amount".to_string()];
    let columns = ColumnSet::derive(&layout, &names).unwrap();
    let summary = engine.extract_batch(&["a.pdf"], &layout, &columns).unwrap();

    let csv = write_csv_to_string(&columns.names, &summary.rows).unwrap();
    assert_eq!(csv, "Source File,Date,Amount\na.pdf,1/1/24,10.00\n");
}

#[test]
fn batch_continues_past_a_failing_file() {
    let ocr = ScriptedOcr::with_data(vec![line(&[("7.50", 10.0, 90.0)])]);
    let engine = OcrGridBuilder::new().build(StubRenderer::new().failing_on("b.pdf"), ocr);

    let layout = layout();
    let columns = ColumnSet::derive(&layout, &[]).unwrap();
    let summary = engine
        .extract_batch(&["a.pdf", "b.pdf", "c.pdf"], &layout, &columns)
        .unwrap();

    assert_eq!(summary.rows.len(), 2);
    assert_eq!(summary.rows[0].source_file, "a.pdf");
    assert_eq!(summary.rows[1].source_file, "c.pdf");
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].file.contains("b.pdf"));
    assert!(summary.failures[0].message.contains("render"));
}

#[test]
fn incomplete_layout_aborts_before_any_file() {
    let renderer = StubRenderer::new();
    let rendered = Rc::clone(&renderer.rendered);
    let ocr = ScriptedOcr::with_data(Vec::new());
    let engine = OcrGridBuilder::new().build(renderer, ocr);

    let layout = Layout {
        right: None,
        ..layout()
    };
    let columns = ColumnSet {
        boundaries: vec![0.0, 300.0],
        names: vec!["Column 1".to_string()],
    };
    let error = engine
        .extract_batch(&["a.pdf"], &layout, &columns)
        .unwrap_err();

    match error {
        Error::MissingBoundary { missing } => assert_eq!(missing, vec!["right"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(rendered.borrow().is_empty());
}

#[test]
fn multi_page_skips_the_last_page_when_asked() {
    let ocr = ScriptedOcr::with_data(vec![line(&[("7.50", 10.0, 90.0)])]);
    let renderer = StubRenderer::new().with_pages(3);
    let rendered = Rc::clone(&renderer.rendered);
    let engine = OcrGridBuilder::new()
        .multi_page(true)
        .ignore_last_page(true)
        .build(renderer, ocr);

    let layout = layout();
    let columns = ColumnSet::derive(&layout, &[]).unwrap();
    let summary = engine.extract_batch(&["a.pdf"], &layout, &columns).unwrap();

    assert_eq!(summary.rows.len(), 2);
    let pages = rendered
        .borrow()
        .iter()
        .map(|(_, page)| *page)
        .collect::<Vec<_>>();
    assert_eq!(pages, vec![0, 1]);
}

#[test]
fn header_titles_come_from_the_header_strip() {
    let ocr = ScriptedOcr {
        data_lines: Vec::new(),
        header_lines: vec![line(&[("Date", 20.0, 80.0), ("Amount", 210.0, 290.0)])],
    };
    let engine = OcrGridBuilder::new().build(StubRenderer::new(), ocr);

    let names = engine
        .infer_header_titles(Path::new("a.pdf"), &layout())
        .unwrap();
    assert_eq!(names, vec!["Date", "Untitled", "Amount"]);
}

#[test]
fn inverted_boundaries_extract_nothing() {
    let ocr = ScriptedOcr::with_data(vec![line(&[("7.50", 10.0, 90.0)])]);
    let engine = OcrGridBuilder::new().build(StubRenderer::new(), ocr);

    let layout = Layout {
        header_bottom: Some(150.0),
        table_bottom: Some(50.0),
        ..layout()
    };
    let columns = ColumnSet::derive(&layout, &[]).unwrap();
    let summary = engine.extract_batch(&["a.pdf"], &layout, &columns).unwrap();

    assert!(summary.rows.is_empty());
    assert!(summary.failures.is_empty());
}
