use encoding_rs::Encoding;
use std::fs;
use std::path::{Path, PathBuf};

/// Form feed: starts every page of a report.
const PAGE_START: char = '\u{c}';

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Report not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read report {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Reads a report into lines, each keeping its line terminator.
///
/// Reports are UTF-8 when possible; anything else is decoded with
/// `fallback`, usually the Windows-1251 code page the reports are produced in.
pub fn read_report(path: &Path, fallback: &'static Encoding) -> Result<Vec<String>, ReportError> {
    if !path.exists() {
        return Err(ReportError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            log::debug!(
                "{} is not valid UTF-8 (at byte {}), decoding as {}",
                path.display(),
                e.utf8_error().valid_up_to(),
                fallback.name()
            );
            let (text, had_errors) = fallback.decode_without_bom_handling(e.as_bytes());
            if had_errors {
                log::warn!(
                    "{} has bytes that are invalid in {}, replaced",
                    path.display(),
                    fallback.name()
                );
            }
            text.into_owned()
        }
    };

    Ok(split_lines(&text))
}

pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(String::from).collect()
}

/// Drops everything before the first page break, i.e. the title page.
///
/// A report without any page break is returned unchanged.
pub fn strip_title_page(mut lines: Vec<String>) -> Vec<String> {
    match lines.iter().position(|l| l.starts_with(PAGE_START)) {
        Some(first_page) => {
            log::debug!("dropping {first_page} title page line(s)");
            lines.drain(..first_page);
            lines
        }
        None => {
            log::warn!("report has no page break, keeping all lines");
            lines
        }
    }
}
