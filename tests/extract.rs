//! Orchestrator tests against an in-process model backend.
//!
//! No network and no pdfium: documents are PNG/JPEG bytes generated here, and
//! the backend replays a canned reply while recording what it was sent.

use futures::future::BoxFuture;
use image::{DynamicImage, ImageFormat, RgbImage};
use paper2q::{
    extract, extract_document, extract_document_sync, parse_response, ExtractError,
    ExtractionConfig, ExtractionProgressCallback, ModelBackend, ModelReply, ModelRequest,
    ModelVariant, PageImage, QuestionDetail, QuestionPaper, QuestionType, ReasoningEffort,
    ServiceErrorKind,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MCQ_REPLY: &str = r#"{"questions": [{"question_number":"1","question_type":"MCQ","question_text":"$1+1=?$","marks":2}], "total_max_marks": 2}"#;

// ── Test helpers ─────────────────────────────────────────────────────────────

struct MockBackend {
    reply: Result<String, ServiceErrorKind>,
    delay: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<ModelRequest>>,
}

impl MockBackend {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing(kind: ServiceErrorKind) -> Self {
        Self {
            reply: Err(kind),
            ..Self::replying("")
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::replying(MCQ_REPLY)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> ModelRequest {
        self.seen.lock().unwrap().last().cloned().expect("no request recorded")
    }
}

impl ModelBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> BoxFuture<'a, Result<ModelReply, ExtractError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.reply {
                Ok(text) => Ok(ModelReply {
                    text: text.clone(),
                    input_tokens: Some(1000),
                    output_tokens: Some(50),
                }),
                Err(kind) => Err(ExtractError::service(*kind, "mock failure")),
            }
        })
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ExtractionProgressCallback for Recorder {
    fn on_rasterized(&self, page_count: usize, _elapsed: Duration) {
        self.events.lock().unwrap().push(format!("rasterized:{page_count}"));
    }
    fn on_request_start(&self, model: &str, page_count: usize) {
        self.events.lock().unwrap().push(format!("start:{model}:{page_count}"));
    }
    fn on_request_complete(&self, _elapsed: Duration, response_len: usize) {
        self.events.lock().unwrap().push(format!("complete:{response_len}"));
    }
    fn on_request_error(&self, _error: &str) {
        self.events.lock().unwrap().push("error".to_string());
    }
}

fn pages(n: usize) -> Vec<PageImage> {
    (1..=n)
        .map(|page_num| PageImage {
            page_num,
            image: RgbImage::from_pixel(40, 60, image::Rgb([255, 255, 255])),
        })
        .collect()
}

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(30, 20, image::Rgb([10, 20, 30])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn config_with(recorder: Arc<Recorder>) -> ExtractionConfig {
    ExtractionConfig::builder()
        .progress_callback(recorder)
        .build()
        .unwrap()
}

// ── extract ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn one_request_carries_every_page_in_order() {
    let backend = MockBackend::replying(MCQ_REPLY);
    let config = ExtractionConfig::default();

    let output = extract(&pages(3), &config, &backend).await.unwrap();

    assert_eq!(backend.calls(), 1);
    let req = backend.last_request();
    assert_eq!(
        req.pages.iter().map(|p| p.page_num).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(req.pages.iter().all(|p| p.data.starts_with(b"\x89PNG")));
    assert_eq!(output.stats.page_count, 3);
    assert_eq!(output.stats.input_tokens, Some(1000));
    assert_eq!(output.raw_response, MCQ_REPLY);
}

#[tokio::test]
async fn synthetic_mcq_reply_is_parsed() {
    let backend = MockBackend::replying(MCQ_REPLY);
    let output = extract(&pages(1), &ExtractionConfig::default(), &backend)
        .await
        .unwrap();

    assert_eq!(output.paper.questions.len(), 1);
    let q = &output.paper.questions[0];
    assert_eq!(q.question_type, QuestionType::Mcq);
    assert_eq!(q.marks, 2.0);
    assert_eq!(output.paper.total_max_marks, 2.0);
    assert!(output.audit.totals_match);
}

#[tokio::test]
async fn empty_page_list_sends_nothing() {
    let backend = MockBackend::replying(MCQ_REPLY);
    let err = extract(&[], &ExtractionConfig::default(), &backend)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::InvalidConfig(_)));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn reasoning_effort_omitted_for_older_model() {
    let backend = MockBackend::replying(MCQ_REPLY);
    let config = ExtractionConfig::builder()
        .model(ModelVariant::Gemini25Flash)
        .reasoning_effort(ReasoningEffort::High)
        .build()
        .unwrap();
    extract(&pages(1), &config, &backend).await.unwrap();
    let req = backend.last_request();
    assert_eq!(req.model, ModelVariant::Gemini25Flash);
    assert_eq!(req.reasoning_effort, None);

    let config = ExtractionConfig::builder()
        .reasoning_effort(ReasoningEffort::Low)
        .build()
        .unwrap();
    extract(&pages(1), &config, &backend).await.unwrap();
    assert_eq!(backend.last_request().reasoning_effort, Some(ReasoningEffort::Low));
}

#[tokio::test]
async fn not_json_reply_keeps_raw_text() {
    let backend = MockBackend::replying("not json");
    match extract(&pages(1), &ExtractionConfig::default(), &backend).await {
        Err(ExtractError::ResponseParse { raw, .. }) => assert_eq!(raw, "not json"),
        other => panic!("expected ResponseParse, got {other:?}"),
    }
}

#[tokio::test]
async fn merged_sub_parts_question() {
    let reply = r#"{
        "questions": [{
            "question_number": "4",
            "question_type": "Subjective",
            "question_text": "(a) State Ohm's law. (b) Derive $R = \\rho L / A$.",
            "marks": 10,
            "sub_parts_mapping": "a: 5 marks, b: 5 marks"
        }],
        "total_max_marks": 10
    }"#;
    let backend = MockBackend::replying(reply);
    let output = extract(&pages(1), &ExtractionConfig::default(), &backend)
        .await
        .unwrap();
    let q = output.paper.find("4").unwrap();
    assert_eq!(q.marks, 10.0);
    assert!(q.has_sub_parts());
    assert!(!q.is_choice_question);
}

#[tokio::test]
async fn service_error_passes_through_with_events() {
    let recorder = Arc::new(Recorder::default());
    let backend = MockBackend::failing(ServiceErrorKind::RateLimited);
    let err = extract(&pages(2), &config_with(recorder.clone()), &backend)
        .await
        .unwrap_err();

    match err {
        ExtractError::Service { kind, .. } => assert_eq!(kind, ServiceErrorKind::RateLimited),
        other => panic!("expected Service error, got {other:?}"),
    }
    assert_eq!(
        recorder.events(),
        vec!["start:gemini-3-flash-preview:2".to_string(), "error".to_string()]
    );
}

#[tokio::test]
async fn slow_backend_times_out() {
    let backend = MockBackend::slow(Duration::from_secs(5));
    let config = ExtractionConfig::builder()
        .api_timeout_secs(1)
        .build()
        .unwrap();
    match extract(&pages(1), &config, &backend).await {
        Err(ExtractError::Service { kind, .. }) => assert_eq!(kind, ServiceErrorKind::Timeout),
        other => panic!("expected timeout, got {other:?}"),
    }
}

// ── extract_document ─────────────────────────────────────────────────────────

#[tokio::test]
async fn image_document_fires_all_events() {
    let recorder = Arc::new(Recorder::default());
    let backend = MockBackend::replying(MCQ_REPLY);
    let output = extract_document(png_bytes(), "image/png", &config_with(recorder.clone()), &backend)
        .await
        .unwrap();

    assert_eq!(output.stats.page_count, 1);
    assert_eq!(
        recorder.events(),
        vec![
            "rasterized:1".to_string(),
            "start:gemini-3-flash-preview:1".to_string(),
            format!("complete:{}", MCQ_REPLY.len()),
        ]
    );
}

#[tokio::test]
async fn unsupported_format_sends_nothing() {
    let backend = MockBackend::replying(MCQ_REPLY);
    let err = extract_document(vec![0x50, 0x4b, 0x03, 0x04], "application/zip", &ExtractionConfig::default(), &backend)
        .await
        .unwrap_err();
    match err {
        ExtractError::UnsupportedFormat { mime } => assert_eq!(mime, "application/zip"),
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn undecodable_image_sends_nothing() {
    let backend = MockBackend::replying(MCQ_REPLY);
    let err = extract_document(b"garbage".to_vec(), "image/jpeg", &ExtractionConfig::default(), &backend)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::Decode { .. }));
    assert_eq!(backend.calls(), 0);
}

#[test]
fn sync_wrapper_runs_without_runtime() {
    let backend = MockBackend::replying(MCQ_REPLY);
    let output =
        extract_document_sync(png_bytes(), "image/jpg; charset=binary", &ExtractionConfig::default(), &backend);
    // A PNG declared as JPEG does not decode.
    assert!(matches!(output, Err(ExtractError::Decode { .. })));

    let output = extract_document_sync(png_bytes(), "IMAGE/PNG", &ExtractionConfig::default(), &backend).unwrap();
    assert_eq!(output.paper.questions.len(), 1);
}

// ── Round trip ───────────────────────────────────────────────────────────────

#[test]
fn serialised_paper_parses_back_equal() {
    let mut paper: QuestionPaper = parse_response(MCQ_REPLY).unwrap();
    paper.questions[0].diagram_description = "A right triangle with legs 3 and 4".into();
    paper.questions[0].is_choice_question = true;
    paper.questions[0].choice_instruction = "Attempt either 1 or 2".into();

    let json = paper.to_json_pretty().unwrap();
    assert_eq!(parse_response(&json).unwrap(), paper);
}

#[test]
fn unnumbered_question_round_trips() {
    let paper = QuestionPaper {
        questions: vec![QuestionDetail::new("", QuestionType::Subjective, "Write an essay.", 10.0)],
        total_max_marks: 10.0,
    };
    let json = paper.to_json_pretty().unwrap();
    assert_eq!(parse_response(&json).unwrap(), paper);
}
