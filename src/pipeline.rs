//! Consumer side of a capture: reading the capture step's exit, finding the
//! fixed-name image, picking the best OCR pass and handing the text to a
//! translator.
//!
//! The OCR engine and the translation service are external; they plug in
//! through `OcrEngine` and `Translator`.

use image::imageops;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::capture::CURRENT_CAPTURE;
use crate::outcome::CaptureOutcome;

/// Once the best text is longer than this and has a letter, stop trying configs.
pub const EARLY_EXIT_CHARS: usize = 50;

pub const DEFAULT_TARGET_LANG: &str = "en";

/// Written next to the capture; the capture itself is left untouched.
pub const PREPROCESSED_CAPTURE: &str = "preprocessed_capture.png";

/// `imageops::contrast` percent that doubles each pixel's distance from mid-grey.
const CONTRAST_PERCENT: f32 = 41.42;
const UNSHARP_SIGMA: f32 = 0.5;
const UNSHARP_THRESHOLD: i32 = 0;

pub const NO_TEXT_MESSAGE: &str =
    "No text detected in the selected area. Please try selecting an area with clearer text.";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Screen capture was cancelled: {0}")]
    Cancelled(String),

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("Screen capture failed: No image file was created at {}", .0.display())]
    MissingCapture(PathBuf),

    #[error("Screen capture process failed with code {code}: {detail}")]
    BadExit { code: i32, detail: String },

    #[error("Could not start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Translation error: {0}")]
    Translation(String),
}

/// Decodes the capture process's exit code and its JSON stdout line.
pub fn interpret_exit(code: i32, stdout: &str) -> Result<CaptureOutcome, PipelineError> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| PipelineError::BadExit {
            code,
            detail: "no outcome payload".to_string(),
        })?;
    let outcome = CaptureOutcome::from_json(line).map_err(|e| PipelineError::BadExit {
        code,
        detail: e.to_string(),
    })?;
    if outcome.exit_code() != code {
        return Err(PipelineError::BadExit {
            code,
            detail: format!("payload says exit code {}", outcome.exit_code()),
        });
    }
    Ok(outcome)
}

/// Runs the capture binary and decodes its exit. Stderr is passed through so
/// the child's log lines reach the terminal.
pub fn run_capture<I, S>(program: &Path, args: I) -> Result<CaptureOutcome, PipelineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    log::info!("Launching capture process: {}", program.display());
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| PipelineError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;
    // killed by a signal
    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout);
    log::debug!("Capture process exited with code {}", code);
    interpret_exit(code, &stdout)
}

/// Sharpened high-contrast greyscale copy, saved as
/// `PREPROCESSED_CAPTURE` beside `capture`. Falls back to `capture` itself when
/// the file cannot be read or the result cannot be written.
pub fn preprocess(capture: &Path) -> PathBuf {
    match try_preprocess(capture) {
        Ok(path) => {
            log::debug!("Preprocessed image saved to: {}", path.display());
            path
        }
        Err(e) => {
            log::warn!("Preprocessing failed, using the original image: {}", e);
            capture.to_path_buf()
        }
    }
}

fn try_preprocess(capture: &Path) -> Result<PathBuf, image::ImageError> {
    let source = image::open(capture)?;
    let gray = imageops::grayscale(&source);
    let contrasted = imageops::contrast(&gray, CONTRAST_PERCENT);
    let sharpened = imageops::unsharpen(&contrasted, UNSHARP_SIGMA, UNSHARP_THRESHOLD);

    let out = capture
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(PREPROCESSED_CAPTURE);
    sharpened.save(&out)?;
    Ok(out)
}

/// Path of the image to OCR. Only an accepted outcome whose fixed-name file
/// really exists gets one.
pub fn locate_capture(outcome: &CaptureOutcome, captures_dir: &Path) -> Result<PathBuf, PipelineError> {
    match outcome {
        CaptureOutcome::Accepted { blank, .. } => {
            if *blank {
                log::warn!("Capture looks blank; OCR will probably find nothing");
            }
            let path = captures_dir.join(CURRENT_CAPTURE);
            if !path.exists() {
                log::error!("Error: {} does not exist after capture", path.display());
                return Err(PipelineError::MissingCapture(path));
            }
            Ok(path)
        }
        CaptureOutcome::Cancelled { reason } => Err(PipelineError::Cancelled(reason.clone())),
        CaptureOutcome::Failed { error } => Err(PipelineError::CaptureFailed(error.clone())),
    }
}

/// One tesseract page segmentation setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrConfig {
    pub name: &'static str,
    pub args: &'static str,
}

/// Tried in this order.
pub const OCR_CONFIGS: [OcrConfig; 4] = [
    OcrConfig { name: "Default", args: "--psm 6 --oem 3" },
    OcrConfig { name: "Auto page", args: "--psm 3 --oem 3" },
    OcrConfig { name: "Single column", args: "--psm 4 --oem 3" },
    OcrConfig { name: "Single word", args: "--psm 8 --oem 3 -c preserve_interword_spaces=1" },
];

pub trait OcrEngine {
    fn recognize(&self, image: &Path, config: &OcrConfig) -> Result<String, PipelineError>;
}

pub trait Translator {
    /// Source language is detected by the service.
    fn translate(&self, text: &str, target_lang: &str) -> Result<String, PipelineError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrPick {
    pub text: String,
    pub config: &'static str,
}

/// Longest trimmed output wins; ties keep the earlier config.
pub fn best_text<E: OcrEngine + ?Sized>(engine: &E, image: &Path, configs: &[OcrConfig]) -> Option<OcrPick> {
    let mut best: Option<OcrPick> = None;
    for (idx, config) in configs.iter().enumerate() {
        log::debug!("Trying OCR config {}: {}", idx + 1, config.name);
        let text = match engine.recognize(image, config) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                log::warn!("Error with config {}: {}", config.name, e);
                continue;
            }
        };
        let len = text.chars().count();
        log::debug!("Extracted {} characters", len);

        let best_len = best.as_ref().map_or(0, |b| b.text.chars().count());
        if len > best_len {
            best = Some(OcrPick { text, config: config.name });
        }
        if let Some(b) = &best {
            if b.text.chars().count() > EARLY_EXIT_CHARS && b.text.chars().any(char::is_alphabetic) {
                log::debug!("Found good quality text, stopping OCR tries");
                break;
            }
        }
    }
    best
}

/// What the OCR/translation step prints for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub extracted: String,
    pub translated: String,
}

impl PipelineReport {
    fn message(extracted: impl Into<String>) -> Self {
        PipelineReport { extracted: extracted.into(), translated: String::new() }
    }
}

/// Capture outcome in, report out. Every failure ends up as a message in the
/// report rather than an error.
pub fn run_pipeline<E, T>(
    outcome: &CaptureOutcome,
    captures_dir: &Path,
    engine: &E,
    translator: &T,
    target_lang: &str,
) -> PipelineReport
where
    E: OcrEngine + ?Sized,
    T: Translator + ?Sized,
{
    let image = match locate_capture(outcome, captures_dir) {
        Ok(path) => path,
        Err(e) => return PipelineReport::message(format!("Error capturing screen: {e}")),
    };

    let image = preprocess(&image);
    let Some(pick) = best_text(engine, &image, &OCR_CONFIGS) else {
        log::info!("No text could be extracted from the image");
        return PipelineReport::message(NO_TEXT_MESSAGE);
    };
    if pick.text.trim().is_empty() {
        return PipelineReport::message(NO_TEXT_MESSAGE);
    }
    log::info!(
        "Best text extraction from config: {} ({} characters)",
        pick.config,
        pick.text.chars().count()
    );

    log::info!("Translating text of length {} to {}", pick.text.chars().count(), target_lang);
    let translated = match translator.translate(&pick.text, target_lang) {
        Ok(text) => text,
        Err(e) => {
            log::error!("{e}");
            e.to_string()
        }
    };
    PipelineReport { extracted: pick.text, translated }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;

    struct ScriptedOcr<'a> {
        results: HashMap<&'static str, Result<&'a str, &'a str>>,
        tried: RefCell<Vec<&'static str>>,
    }

    impl<'a> ScriptedOcr<'a> {
        fn new(results: &[(&'static str, Result<&'a str, &'a str>)]) -> Self {
            ScriptedOcr {
                results: results.iter().copied().collect(),
                tried: RefCell::new(Vec::new()),
            }
        }
    }

    impl OcrEngine for ScriptedOcr<'_> {
        fn recognize(&self, _image: &Path, config: &OcrConfig) -> Result<String, PipelineError> {
            self.tried.borrow_mut().push(config.name);
            match self.results.get(config.name) {
                Some(Ok(text)) => Ok(text.to_string()),
                Some(Err(e)) => Err(PipelineError::Ocr(e.to_string())),
                None => Ok(String::new()),
            }
        }
    }

    struct Upper;

    impl Translator for Upper {
        fn translate(&self, text: &str, target_lang: &str) -> Result<String, PipelineError> {
            Ok(format!("[{target_lang}] {}", text.to_uppercase()))
        }
    }

    struct Offline;

    impl Translator for Offline {
        fn translate(&self, _text: &str, _target_lang: &str) -> Result<String, PipelineError> {
            Err(PipelineError::Translation("network unreachable".into()))
        }
    }

    fn accepted(dir: &Path) -> CaptureOutcome {
        CaptureOutcome::Accepted {
            path: dir.join(CURRENT_CAPTURE),
            archive_path: dir.join("capture_20260101_000000.png"),
            size: (100, 40),
            blank: false,
        }
    }

    #[test]
    fn longest_output_wins() {
        let ocr = ScriptedOcr::new(&[
            ("Default", Ok("  hi  ")),
            ("Auto page", Ok("hello world")),
            ("Single column", Ok("hello")),
            ("Single word", Err("crashed")),
        ]);
        let pick = best_text(&ocr, Path::new("x.png"), &OCR_CONFIGS).unwrap();
        assert_eq!(pick, OcrPick { text: "hello world".into(), config: "Auto page" });
        assert_eq!(ocr.tried.borrow().len(), 4);
    }

    #[test]
    fn long_alphabetic_text_stops_early() {
        let long = "The quick brown fox jumps over the lazy dog, twice over.";
        let filler = "x".repeat(200);
        let ocr = ScriptedOcr::new(&[("Default", Ok(long)), ("Auto page", Ok(filler.as_str()))]);
        let pick = best_text(&ocr, Path::new("x.png"), &OCR_CONFIGS).unwrap();
        assert_eq!(pick.config, "Default");
        assert_eq!(*ocr.tried.borrow(), vec!["Default"]);
    }

    #[test]
    fn long_numeric_text_keeps_trying() {
        let digits = "1234567890".repeat(6);
        let ocr = ScriptedOcr::new(&[("Default", Ok(digits.as_str()))]);
        best_text(&ocr, Path::new("x.png"), &OCR_CONFIGS);
        assert_eq!(ocr.tried.borrow().len(), 4);
    }

    #[test]
    fn all_empty_gives_nothing() {
        let ocr = ScriptedOcr::new(&[]);
        assert_eq!(best_text(&ocr, Path::new("x.png"), &OCR_CONFIGS), None);
    }

    #[test]
    fn exit_payload_must_match_code() {
        let ok = r#"{"status":"cancelled","reason":"Cancelled by user"}"#;
        assert_eq!(interpret_exit(2, ok).unwrap(), CaptureOutcome::cancelled("Cancelled by user"));
        assert!(matches!(interpret_exit(0, ok), Err(PipelineError::BadExit { code: 0, .. })));
        assert!(matches!(interpret_exit(1, ""), Err(PipelineError::BadExit { .. })));
        assert!(interpret_exit(1, "noise\n{\"status\":\"failed\",\"error\":\"x\"}\n").is_ok());
    }

    #[test]
    fn missing_fixed_file_is_a_hard_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let err = locate_capture(&accepted(tmp.path()), tmp.path()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingCapture(_)));
    }

    #[test]
    fn cancelled_capture_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let report = run_pipeline(
            &CaptureOutcome::cancelled("Cancelled by user"),
            tmp.path(),
            &ScriptedOcr::new(&[]),
            &Upper,
            DEFAULT_TARGET_LANG,
        );
        assert_eq!(report.extracted, "Error capturing screen: Screen capture was cancelled: Cancelled by user");
        assert!(report.translated.is_empty());
    }

    #[test]
    fn text_is_extracted_and_translated() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(CURRENT_CAPTURE), b"png").unwrap();
        let ocr = ScriptedOcr::new(&[("Default", Ok("merhaba dunya"))]);
        let report = run_pipeline(&accepted(tmp.path()), tmp.path(), &ocr, &Upper, "tr");
        assert_eq!(report.extracted, "merhaba dunya");
        assert_eq!(report.translated, "[tr] MERHABA DUNYA");
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"extracted":"merhaba dunya","translated":"[tr] MERHABA DUNYA"}"#);
    }

    #[test]
    fn empty_ocr_and_translation_errors_become_messages() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(CURRENT_CAPTURE), b"png").unwrap();

        let report = run_pipeline(&accepted(tmp.path()), tmp.path(), &ScriptedOcr::new(&[]), &Upper, "de");
        assert_eq!(report, PipelineReport::message(NO_TEXT_MESSAGE));

        let ocr = ScriptedOcr::new(&[("Default", Ok("text"))]);
        let report = run_pipeline(&accepted(tmp.path()), tmp.path(), &ocr, &Offline, "de");
        assert_eq!(report.translated, "Translation error: network unreachable");
    }

    #[test]
    fn preprocess_writes_grey_copy_beside_capture() {
        let tmp = tempfile::tempdir().unwrap();
        let capture = tmp.path().join(CURRENT_CAPTURE);
        let img = image::RgbaImage::from_fn(40, 20, |x, y| image::Rgba([(x * 6) as u8, (y * 12) as u8, 90, 255]));
        img.save(&capture).unwrap();

        let out = preprocess(&capture);
        assert_eq!(out, tmp.path().join(PREPROCESSED_CAPTURE));
        let written = image::open(&out).unwrap();
        assert_eq!(written.color(), image::ColorType::L8);
        assert_eq!((written.width(), written.height()), (40, 20));
        // capture untouched
        assert_eq!(image::open(&capture).unwrap().to_rgba8(), img);
    }

    #[test]
    fn unreadable_capture_is_used_as_is() {
        let tmp = tempfile::tempdir().unwrap();
        let capture = tmp.path().join(CURRENT_CAPTURE);
        fs::write(&capture, b"png").unwrap();
        assert_eq!(preprocess(&capture), capture);
        assert!(!tmp.path().join(PREPROCESSED_CAPTURE).exists());
    }

    #[cfg(unix)]
    #[test]
    fn capture_process_exit_is_decoded() {
        let outcome = run_capture(
            Path::new("sh"),
            ["-c", r#"echo '{"status":"cancelled","reason":"Cancelled by user"}'; exit 2"#],
        )
        .unwrap();
        assert_eq!(outcome, CaptureOutcome::cancelled("Cancelled by user"));

        let err = run_capture(Path::new("sh"), ["-c", r#"echo '{"status":"cancelled","reason":"x"}'; exit 0"#])
            .unwrap_err();
        assert!(matches!(err, PipelineError::BadExit { code: 0, .. }));
    }

    #[test]
    fn missing_capture_binary_is_a_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let program = tmp.path().join("no-such-ocrsnip");
        let err = run_capture(&program, Vec::<&str>::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Spawn { .. }));
        assert!(err.to_string().contains("no-such-ocrsnip"));
    }
}
