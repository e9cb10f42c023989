//! Configuration management for the Exam Shuffler server

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Lowest answer letter the segmenter may be configured to stop at
pub const MIN_ANSWER_LETTER: char = 'D';

/// Highest answer letter supported (nine answers per question)
pub const MAX_ANSWER_LETTER: char = 'I';

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub exam: ExamConfig,
    pub header: HeaderConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body
    pub max_upload_bytes: usize,
    /// Upper bound for one generate request, parsing through archiving
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Where incoming documents are written
    pub upload_dir: PathBuf,
    /// Parent of the per-run output directories
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExamConfig {
    /// Word that opens a question line ("Câu 1.")
    pub question_marker: String,
    /// Last letter recognised as an answer marker
    pub max_answer_letter: char,
    /// Upper bound for `numFiles`
    pub max_variants: usize,
    /// Archive name prefix, `<prefix>_<runId>.zip`
    pub archive_prefix: String,
}

/// Labels printed in the header table of every variant document
#[derive(Debug, Clone)]
pub struct HeaderConfig {
    pub authority: String,
    pub school: String,
    pub title: String,
    pub subject: String,
    pub duration: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_upload_bytes: 20 * 1024 * 1024,
                request_timeout_secs: 120,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads/exams"),
                output_dir: PathBuf::from("uploads/output"),
            },
            exam: ExamConfig::default(),
            header: HeaderConfig::default(),
        }
    }
}

impl Default for ExamConfig {
    fn default() -> Self {
        ExamConfig {
            question_marker: "Câu".to_string(),
            max_answer_letter: MAX_ANSWER_LETTER,
            max_variants: 100,
            archive_prefix: "DeThi".to_string(),
        }
    }
}

impl Default for HeaderConfig {
    fn default() -> Self {
        HeaderConfig {
            authority: "SỞ GD & ĐT TP HỒ CHÍ MINH".to_string(),
            school: "TRƯỜNG THPT TRƯỜNG CHINH".to_string(),
            title: "ĐỀ KIỂM TRA CUỐI KỲ".to_string(),
            subject: "MÔN: VẬT LÍ".to_string(),
            duration: "Thời gian làm bài: 45 PHÚT".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
                max_upload_bytes: parse_var("EXAM_MAX_UPLOAD_BYTES", defaults.server.max_upload_bytes)?,
                request_timeout_secs: parse_var(
                    "EXAM_REQUEST_TIMEOUT_SECS",
                    defaults.server.request_timeout_secs,
                )?,
            },
            storage: StorageConfig {
                upload_dir: env::var("EXAM_UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.upload_dir),
                output_dir: env::var("EXAM_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.output_dir),
            },
            exam: ExamConfig {
                question_marker: env::var("EXAM_QUESTION_MARKER")
                    .unwrap_or(defaults.exam.question_marker),
                max_answer_letter: answer_letter_var(defaults.exam.max_answer_letter)?,
                max_variants: parse_var("EXAM_MAX_VARIANTS", defaults.exam.max_variants)?,
                archive_prefix: env::var("EXAM_ARCHIVE_PREFIX")
                    .unwrap_or(defaults.exam.archive_prefix),
            },
            header: HeaderConfig {
                authority: env::var("EXAM_HEADER_AUTHORITY").unwrap_or(defaults.header.authority),
                school: env::var("EXAM_HEADER_SCHOOL").unwrap_or(defaults.header.school),
                title: env::var("EXAM_HEADER_TITLE").unwrap_or(defaults.header.title),
                subject: env::var("EXAM_HEADER_SUBJECT").unwrap_or(defaults.header.subject),
                duration: env::var("EXAM_HEADER_DURATION").unwrap_or(defaults.header.duration),
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

fn answer_letter_var(default: char) -> Result<char, ConfigError> {
    const KEY: &str = "EXAM_MAX_ANSWER_LETTER";
    let Ok(value) = env::var(KEY) else {
        return Ok(default);
    };

    let mut chars = value.trim().chars();
    match (chars.next().map(|c| c.to_ascii_uppercase()), chars.next()) {
        (Some(letter), None) if (MIN_ANSWER_LETTER..=MAX_ANSWER_LETTER).contains(&letter) => {
            Ok(letter)
        }
        _ => Err(ConfigError::Invalid { key: KEY, value }),
    }
}
