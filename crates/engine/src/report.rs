//! 리포트 생성: 세션 상태를 심각도별로 집계하고 경로를 상대화
//!
//! 리포트의 모든 경로는 루트 기준 상대 경로입니다.
//!
//! - 입력이 디렉토리면 루트는 입력 자신
//! - 그 외(파일, 존재하지 않는 경로)면 루트는 입력의 부모 디렉토리
//!
//! 루트 기준으로 표현할 수 없는 경로가 있으면 조용히 자르지 않고
//! [`ReportError::PathOutsideRoot`]를 반환합니다.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use modelscan_core::error::ReportError;
use modelscan_core::types::{ErrorRecord, SeverityCounts};

use crate::session::ScanSession;

/// 리포트 버전 문자열
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 스캔 리포트
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// 요약
    pub summary: ReportSummary,
    /// 이슈 목록 (스캐너 필드 + 상대 경로 `source`)
    pub issues: Vec<Map<String, Value>>,
    /// 에러 목록
    pub errors: Vec<ErrorEntry>,
}

/// 리포트 요약
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    /// 심각도별 이슈 수 (모든 심각도 포함)
    pub total_issues_by_severity: SeverityCounts,
    /// 전체 이슈 수
    pub total_issues: usize,
    /// 사용자가 입력한 경로 그대로
    pub input_path: String,
    /// 리포트 루트 (절대 경로)
    pub absolute_path: String,
    /// modelscan 버전
    pub version: String,
    /// 리포트 생성 시각 (RFC 3339)
    pub timestamp: String,
    /// 스캔 식별자
    pub scan_id: String,
    /// 건너뛴 대상
    pub skipped: SkippedSummary,
    /// 스캔된 대상
    pub scanned: ScannedSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedSummary {
    pub total_skipped: usize,
    pub skipped_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScannedSummary {
    pub total_scanned: usize,
    pub scanned_files: Vec<String>,
}

/// 리포트 에러 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ScanReport {
    /// 이슈가 있는지 확인합니다.
    pub fn has_issues(&self) -> bool {
        self.summary.total_issues > 0
    }

    /// 에러가 있는지 확인합니다.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// JSON 문자열로 직렬화합니다.
    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        serde_json::to_string_pretty(self).map_err(|e| ReportError::Serialize(e.to_string()))
    }
}

/// 입력 경로와 절대 경로로 리포트 루트를 계산합니다.
pub fn report_root(absolute_input: &Path) -> PathBuf {
    if absolute_input.is_dir() {
        return absolute_input.to_path_buf();
    }
    absolute_input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| absolute_input.to_path_buf())
}

/// 경로를 루트 기준 상대 경로 문자열로 변환합니다.
///
/// 루트 자체는 `.`으로 표현됩니다.
pub fn relativize(path: &Path, root: &Path) -> Result<String, ReportError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ReportError::PathOutsideRoot {
            path: path.display().to_string(),
            root: root.display().to_string(),
        })?;
    if relative.as_os_str().is_empty() {
        return Ok(".".to_owned());
    }
    Ok(relative.display().to_string())
}

fn relativize_all(paths: &[PathBuf], root: &Path) -> Result<Vec<String>, ReportError> {
    paths.iter().map(|p| relativize(p, root)).collect()
}

fn error_entry(record: &ErrorRecord, root: &Path) -> Result<ErrorEntry, ReportError> {
    let description = (!record.message.is_empty()).then(|| record.message.clone());
    let source = record
        .source
        .as_deref()
        .map(|s| relativize(s, root))
        .transpose()?;
    Ok(ErrorEntry {
        description,
        source,
    })
}

/// 세션 상태로 리포트를 생성합니다.
///
/// `absolute_input`은 탐색에 사용한 절대 경로와 같은 형태여야 합니다.
pub fn build_report(
    input_path: &Path,
    absolute_input: &Path,
    session: &ScanSession,
) -> Result<ScanReport, ReportError> {
    let root = report_root(absolute_input);

    let issues = session
        .all_issues()
        .iter()
        .map(|issue| {
            let mut json = issue.to_json();
            json.insert(
                "source".to_owned(),
                Value::String(relativize(issue.source(), &root)?),
            );
            Ok(json)
        })
        .collect::<Result<Vec<_>, ReportError>>()?;

    let errors = session
        .errors()
        .iter()
        .map(|record| error_entry(record, &root))
        .filter(|entry| {
            !matches!(entry, Ok(ErrorEntry { description: None, source: None }))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let skipped_files = relativize_all(session.skipped(), &root)?;
    let scanned_files = relativize_all(session.scanned(), &root)?;

    let by_severity = session.issues().group_by_severity();

    Ok(ScanReport {
        summary: ReportSummary {
            total_issues: by_severity.total(),
            total_issues_by_severity: by_severity,
            input_path: input_path.display().to_string(),
            absolute_path: root.display().to_string(),
            version: VERSION.to_owned(),
            timestamp: chrono::Local::now().to_rfc3339(),
            scan_id: Uuid::new_v4().to_string(),
            skipped: SkippedSummary {
                total_skipped: skipped_files.len(),
                skipped_files,
            },
            scanned: ScannedSummary {
                total_scanned: scanned_files.len(),
                scanned_files,
            },
        },
        issues,
        errors,
    })
}
