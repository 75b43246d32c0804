use std::io::Cursor;
use std::process::Stdio;

use async_trait::async_trait;
use image::{GrayImage, ImageFormat};
use platewatch_common::config::RecognizerConfig;
use platewatch_common::plate::{Region, TextFragment};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{RecognizeError, TextRecognizer};

/// Tesseract word-level TSV output: the word rows are level 5.
const TSV_WORD_LEVEL: &str = "5";
const TSV_COLUMNS: usize = 12;

/// Runs the `tesseract` CLI once per crop, piping the crop in as PNG.
///
/// With the `tsv` output config each recognized word becomes one fragment
/// carrying its box and confidence. Plain-text output is also accepted; each
/// non-blank line is then a fragment spanning the whole crop.
pub struct TesseractRecognizer {
    command: String,
    args: Vec<String>,
}

impl TesseractRecognizer {
    pub fn new(config: &RecognizerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&mut self, crop: &GrayImage) -> Result<Vec<TextFragment>, RecognizeError> {
        let mut png = Vec::new();
        crop.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RecognizeError::Spawn(self.command.clone(), e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RecognizeError::Io("could not get stdin handle".into()))?;
        // A recognizer that exits without reading its input is reported by
        // its exit status below, not as a pipe error.
        if let Err(e) = stdin.write_all(&png).await {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(RecognizeError::Io(e.to_string()));
            }
        }
        // Close stdin so the recognizer sees end of input.
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RecognizeError::Io(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognizeError::Failed(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let fragments = parse_output(&stdout, crop.width(), crop.height());
        debug!(
            fragments = fragments.len(),
            width = crop.width(),
            height = crop.height(),
            "tesseract finished"
        );
        Ok(fragments)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Parse tesseract stdout, detecting TSV by its header row.
pub fn parse_output(stdout: &str, crop_width: u32, crop_height: u32) -> Vec<TextFragment> {
    if stdout.starts_with("level\t") {
        parse_tsv(stdout)
    } else {
        stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| TextFragment {
                bounds: Region::new(0, 0, crop_width, crop_height),
                text: line.to_string(),
                confidence: -1.0,
            })
            .collect()
    }
}

fn parse_tsv(stdout: &str) -> Vec<TextFragment> {
    let mut fragments = Vec::new();
    // Columns: level page block par line word left top width height conf text
    for line in stdout.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < TSV_COLUMNS || cols[0] != TSV_WORD_LEVEL {
            continue;
        }
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }
        let parsed = (
            cols[6].parse::<u32>(),
            cols[7].parse::<u32>(),
            cols[8].parse::<u32>(),
            cols[9].parse::<u32>(),
            cols[10].parse::<f32>(),
        );
        match parsed {
            (Ok(left), Ok(top), Ok(width), Ok(height), Ok(confidence)) => {
                fragments.push(TextFragment {
                    bounds: Region::new(left, top, width, height),
                    text: text.to_string(),
                    confidence,
                });
            }
            _ => warn!(line, "malformed tesseract TSV row, skipping"),
        }
    }
    fragments
}

/// Check whether the recognizer command is runnable. Logs a warning if not.
pub async fn check_available(config: &RecognizerConfig) {
    match Command::new(&config.command).arg("--version").output().await {
        Ok(out) if out.status.success() => {
            debug!(command = config.command, "recognizer is available");
        }
        Ok(_) => {
            warn!(command = config.command, "recognizer returned non-zero for --version");
        }
        Err(e) => {
            warn!(
                command = config.command,
                error = %e,
                "recognizer not found on PATH; every region will fail recognition"
            );
        }
    }
}
