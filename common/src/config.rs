use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// "mjpeg" (HTTP multipart camera stream) or "directory" (still images).
    #[serde(default = "default_capture_source")]
    pub source: String,
    #[serde(default = "default_capture_url")]
    pub url: String,
    #[serde(default = "default_capture_directory")]
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    /// Only every `frame_skip`-th captured frame is processed.
    #[serde(default = "default_frame_skip")]
    pub frame_skip: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// "full_frame" or "cascade" (requires the `cascade` feature).
    #[serde(default = "default_detector_kind")]
    pub kind: String,
    #[serde(default = "default_cascade_model")]
    pub model: PathBuf,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    #[serde(default = "default_min_neighbors")]
    pub min_neighbors: i32,
    /// Regions must have `width * height` strictly greater than this.
    #[serde(default = "default_min_area")]
    pub min_area: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognizerConfig {
    #[serde(default = "default_recognizer_command")]
    pub command: String,
    #[serde(default = "default_recognizer_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_plates_dir")]
    pub plates_dir: PathBuf,
    #[serde(default = "default_text_dir")]
    pub text_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_notify_host")]
    pub host: String,
    #[serde(default = "default_notify_port")]
    pub port: u16,
    /// Slot number reported with every plate.
    #[serde(default = "default_slot")]
    pub slot: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_preview_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiverConfig {
    #[serde(default = "default_receiver_listen")]
    pub listen: String,
    #[serde(default = "default_receiver_http")]
    pub http: String,
    #[serde(default = "default_receiver_db")]
    pub db_path: PathBuf,
    #[serde(default = "default_slot_count")]
    pub slots: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: default_capture_source(),
            url: default_capture_url(),
            directory: default_capture_directory(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            frame_skip: default_frame_skip(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            kind: default_detector_kind(),
            model: default_cascade_model(),
            scale_factor: default_scale_factor(),
            min_neighbors: default_min_neighbors(),
            min_area: default_min_area(),
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            command: default_recognizer_command(),
            args: default_recognizer_args(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            plates_dir: default_plates_dir(),
            text_dir: default_text_dir(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_notify_host(),
            port: default_notify_port(),
            slot: default_slot(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_preview_path(),
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            listen: default_receiver_listen(),
            http: default_receiver_http(),
            db_path: default_receiver_db(),
            slots: default_slot_count(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling.frame_skip == 0 {
            return Err(ConfigError::Invalid("sampling.frame_skip must be positive".into()));
        }
        if self.detector.scale_factor <= 1.0 {
            return Err(ConfigError::Invalid(
                "detector.scale_factor must be greater than 1.0".into(),
            ));
        }
        if self.receiver.slots == 0 {
            return Err(ConfigError::Invalid("receiver.slots must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_capture_source() -> String {
    "mjpeg".into()
}
fn default_capture_url() -> String {
    "http://localhost:8080/stream".into()
}
fn default_capture_directory() -> PathBuf {
    PathBuf::from("frames")
}
fn default_frame_skip() -> u64 {
    5
}
fn default_detector_kind() -> String {
    "full_frame".into()
}
fn default_cascade_model() -> PathBuf {
    PathBuf::from("model/haarcascade_russian_plate_number.xml")
}
fn default_scale_factor() -> f64 {
    1.1
}
fn default_min_neighbors() -> i32 {
    4
}
fn default_min_area() -> u64 {
    500
}
fn default_recognizer_command() -> String {
    "tesseract".into()
}
fn default_recognizer_args() -> Vec<String> {
    ["stdin", "stdout", "--psm", "7", "-l", "eng", "tsv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_plates_dir() -> PathBuf {
    PathBuf::from("plates")
}
fn default_text_dir() -> PathBuf {
    PathBuf::from("output_text")
}
fn default_true() -> bool {
    true
}
fn default_notify_host() -> String {
    "localhost".into()
}
fn default_notify_port() -> u16 {
    5000
}
fn default_slot() -> u32 {
    1
}
fn default_preview_path() -> PathBuf {
    PathBuf::from("preview/latest.jpg")
}
fn default_receiver_listen() -> String {
    "0.0.0.0:5000".into()
}
fn default_receiver_http() -> String {
    "0.0.0.0:8081".into()
}
fn default_receiver_db() -> PathBuf {
    PathBuf::from("data/vehicles.db")
}
fn default_slot_count() -> usize {
    3
}
fn default_log_level() -> String {
    "info".into()
}
