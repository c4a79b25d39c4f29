//! Bind-time argument handling and format selection.
//!
//! Format selection precedence, highest first:
//!
//! 1. `format_str` - used directly; `format_type` becomes a label.
//! 2. `conf` - nickname lookup when `format_type` is given, otherwise the
//!    first default/inline/named entry whose recognizer matches a majority of
//!    sampled lines.
//! 3. `format_type` - the `common`/`combined` built-ins.
//! 4. Auto-detection over sampled lines (combined, then common).
//!
//! An unresolvable format is fatal at bind unless `raw` is set, in which case
//! the scan degrades to the raw-only schema (metadata columns only).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use httpdlog_format::conf::{parse_config_lines, ConfFormatType, ConfigEntry};
use httpdlog_format::detect::{self, DETECTION_SAMPLE_LINES};
use httpdlog_format::CompiledFormat;

use crate::error::TableError;

/// Arguments of `read_httpd_log` beyond the path.
#[derive(Debug, Clone, Default)]
pub struct HttpdLogOptions {
    /// Built-in shortcut (`common`, `combined`) or a nickname to look up in
    /// `conf`.
    pub format_type: Option<String>,
    /// Explicit LogFormat string; overrides `format_type` when both are given.
    pub format_str: Option<String>,
    /// Apache config file used for nickname lookup. Ignored when
    /// `format_str` is given.
    pub conf: Option<String>,
    /// Emit per-row diagnostics and keep rows that failed to parse.
    pub raw: bool,
}

/// Everything the provider needs after bind-time resolution.
#[derive(Debug)]
pub struct ResolvedScan {
    pub files: Vec<PathBuf>,
    /// `common`, `combined`, `custom`, a conf nickname, or `unknown`.
    pub format_type: String,
    pub format: Arc<CompiledFormat>,
    pub raw: bool,
}

/// Expand a path or glob into a sorted file list.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>, TableError> {
    let paths = glob::glob(pattern).map_err(|source| TableError::Pattern {
        pattern: pattern.to_owned(),
        source,
    })?;

    let mut files: Vec<PathBuf> = paths
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Resolve the file list and format for a scan.
pub fn resolve_scan(
    path_pattern: &str,
    options: &HttpdLogOptions,
) -> Result<ResolvedScan, TableError> {
    let files = expand_glob(path_pattern)?;
    if files.is_empty() {
        return Err(TableError::NoFilesMatched(path_pattern.to_owned()));
    }

    let (format_type, format) = match select_format(&files, options) {
        Ok(selected) => selected,
        Err(TableError::UnknownFormat(reason)) if options.raw => {
            // Raw-only degradation: an empty format has no fields, so every
            // line is a parse error and only the metadata columns remain.
            tracing::warn!(reason, "format unknown; degrading to raw-only schema");
            ("unknown".to_owned(), CompiledFormat::compile("")?)
        }
        Err(err) => return Err(err),
    };

    tracing::debug!(
        files = files.len(),
        format_type = %format_type,
        format = %format.format_str(),
        raw = options.raw,
        "resolved httpd log scan"
    );

    Ok(ResolvedScan {
        files,
        format_type,
        format: Arc::new(format),
        raw: options.raw,
    })
}

fn select_format(
    files: &[PathBuf],
    options: &HttpdLogOptions,
) -> Result<(String, CompiledFormat), TableError> {
    if let Some(format_str) = &options.format_str {
        let label = options
            .format_type
            .clone()
            .unwrap_or_else(|| "custom".to_owned());
        return Ok((label, CompiledFormat::compile(format_str)?));
    }

    if let Some(conf_path) = &options.conf {
        return select_from_conf(conf_path, files, options);
    }

    if let Some(format_type) = &options.format_type {
        let format_str = detect::builtin_format(format_type).ok_or_else(|| {
            TableError::InvalidOption {
                option: "format_type".to_owned(),
                message: format!(
                    "'{format_type}' is not a built-in format; supported: 'common', 'combined' \
                     (use format_str or conf for custom formats)"
                ),
            }
        })?;
        return Ok((format_type.clone(), CompiledFormat::compile(format_str)?));
    }

    let samples = sample_lines(files)?;
    match detect::detect_format(&samples)? {
        Some(detected) => Ok((detected.format_type.to_owned(), detected.format)),
        None => Err(TableError::UnknownFormat(
            "no built-in format matched the sampled lines".to_owned(),
        )),
    }
}

/// Pick a format out of an Apache config file.
fn select_from_conf(
    conf_path: &str,
    files: &[PathBuf],
    options: &HttpdLogOptions,
) -> Result<(String, CompiledFormat), TableError> {
    let entries = read_conf_entries(conf_path)?;

    if let Some(nickname) = &options.format_type {
        let entry = entries
            .iter()
            .find(|e| {
                e.format_type == ConfFormatType::Named && e.nickname.as_deref() == Some(nickname)
            })
            .ok_or_else(|| {
                TableError::UnknownFormat(format!(
                    "no LogFormat named '{nickname}' in {conf_path}"
                ))
            })?;
        let format_str = entry.format_string.as_deref().unwrap_or_default();
        return Ok((nickname.clone(), CompiledFormat::compile(format_str)?));
    }

    // No nickname requested: try defaults, then inline CustomLog formats,
    // then named formats, accepting the first that matches the samples.
    let samples = sample_lines(files)?;
    let ordered = [
        ConfFormatType::Default,
        ConfFormatType::Inline,
        ConfFormatType::Named,
    ];
    for wanted in ordered {
        for entry in entries.iter().filter(|e| e.log_type == "access") {
            if entry.format_type != wanted {
                continue;
            }
            let Some(format_str) = entry.format_string.as_deref() else {
                continue;
            };
            let Ok(format) = CompiledFormat::compile(format_str) else {
                continue;
            };
            if detect::matches_majority(&format, &samples) {
                let label = entry
                    .nickname
                    .clone()
                    .unwrap_or_else(|| entry.format_type.as_str().to_owned());
                return Ok((label, format));
            }
        }
    }

    Err(TableError::UnknownFormat(format!(
        "no format in {conf_path} matched the sampled lines"
    )))
}

/// Parse every file the conf path expands to. An empty expansion is fine; the
/// selection simply has no candidates.
pub fn read_conf_entries(conf_pattern: &str) -> Result<Vec<ConfigEntry>, TableError> {
    let mut entries = Vec::new();
    for path in expand_glob(conf_pattern)? {
        let file = File::open(&path)?;
        let lines: Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>()?;
        entries.extend(parse_config_lines(lines, &path.to_string_lossy()));
    }
    Ok(entries)
}

/// Read up to ten non-empty lines from the first file for detection.
fn sample_lines(files: &[PathBuf]) -> Result<Vec<String>, TableError> {
    let Some(first) = files.first() else {
        return Ok(Vec::new());
    };
    let file = File::open(first)?;
    let mut samples = Vec::with_capacity(DETECTION_SAMPLE_LINES);
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        samples.push(line);
        if samples.len() >= DETECTION_SAMPLE_LINES {
            break;
        }
    }
    Ok(samples)
}
