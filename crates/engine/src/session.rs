//! 스캔 세션: `scan()` 한 번 동안 누적되는 상태
//!
//! 세션은 매 호출마다 새로 만들어지므로 이전 스캔의 결과가 남지 않습니다.
//! 모든 리프 경로는 `scanned`와 `skipped` 중 정확히 한 곳에만 기록됩니다.

use std::path::PathBuf;

use tracing::debug;

use modelscan_core::metrics as m;
use modelscan_core::types::{ErrorRecord, Issue, Issues};

use crate::scanner::ScanResults;

/// 스캔 세션 상태
#[derive(Debug, Default)]
pub struct ScanSession {
    issues: Issues,
    errors: Vec<ErrorRecord>,
    scanned: Vec<PathBuf>,
    skipped: Vec<PathBuf>,
}

impl ScanSession {
    /// 초기화 에러를 포함한 새 세션을 생성합니다.
    pub fn new(init_errors: &[ErrorRecord]) -> Self {
        Self {
            errors: init_errors.to_vec(),
            ..Default::default()
        }
    }

    /// 스캐너 결과를 병합합니다.
    pub fn merge(&mut self, results: ScanResults) {
        for issue in &results.issues {
            metrics::counter!(
                m::ISSUES_FOUND_TOTAL,
                m::LABEL_SEVERITY => issue.severity.name()
            )
            .increment(1);
        }
        self.issues.add_issues(results.issues);
        for error in results.errors {
            self.record_error(error);
        }
    }

    /// 에러를 기록합니다.
    pub fn record_error(&mut self, error: ErrorRecord) {
        metrics::counter!(m::ERRORS_TOTAL).increment(1);
        self.errors.push(error);
    }

    /// 스캔된 대상을 기록합니다.
    pub fn record_scanned(&mut self, path: impl Into<PathBuf>) {
        metrics::counter!(m::TARGETS_SCANNED_TOTAL).increment(1);
        self.scanned.push(path.into());
    }

    /// 건너뛴 대상을 기록합니다.
    pub fn record_skipped(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(path = %path.display(), "target skipped");
        metrics::counter!(m::TARGETS_SKIPPED_TOTAL).increment(1);
        self.skipped.push(path);
    }

    pub fn issues(&self) -> &Issues {
        &self.issues
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn scanned(&self) -> &[PathBuf] {
        &self.scanned
    }

    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    /// 모든 이슈를 순서대로 반환합니다.
    pub fn all_issues(&self) -> &[Issue] {
        self.issues.all_issues()
    }
}
