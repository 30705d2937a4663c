//! Assertions over find-usages reports.

use codemodel::FilePath;
use codemodel::ide::{TextEdit, Usage, UsageReport};

pub fn usages_in<'a>(report: &'a UsageReport, file: &FilePath) -> Vec<&'a Usage> {
    report.usages.iter().filter(|u| &u.file == file).collect()
}

/// Usages that are not declaration sites.
pub fn references_in<'a>(report: &'a UsageReport, file: &FilePath) -> Vec<&'a Usage> {
    usages_in(report, file)
        .into_iter()
        .filter(|u| !u.is_declaration)
        .collect()
}

pub fn edits_in(report: &UsageReport, file: &FilePath) -> Vec<TextEdit> {
    report
        .staged_edits()
        .into_iter()
        .filter(|e| &e.file == file)
        .collect()
}
