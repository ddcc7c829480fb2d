//! 도메인 타입: 스캐너와 엔진이 공유하는 결과 타입
//!
//! 엔진은 이 타입들의 내용을 해석하지 않고 저장, 그룹화, 경로 상대화만 수행합니다.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Low < Medium < High < Critical`).
/// 리포트에는 `LOW`, `MEDIUM`, `HIGH`, `CRITICAL` 이름으로 표시됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적, 임의 코드 실행 가능
    Critical,
}

impl Severity {
    /// 정의된 순서대로 나열한 전체 심각도
    pub const ALL: [Severity; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// 리포트에 사용되는 심각도 이름을 반환합니다.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 이슈 분류 코드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    /// 안전하지 않은 연산자/전역 참조
    UnsafeOperator,
}

/// 이슈 상세 정보
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueDetails {
    /// 사람이 읽을 수 있는 설명
    pub description: String,
    /// 이슈가 발견된 소스 (파일 경로 또는 `archive:entry`)
    pub source: PathBuf,
    /// 이슈를 보고한 스캐너 이름
    pub scanner: String,
    /// 스캐너별 추가 필드 (예: `module`, `operator`)
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// 스캐너가 보고한 단일 이슈
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// 분류 코드
    pub code: IssueCode,
    /// 심각도
    pub severity: Severity,
    /// 상세 정보
    pub details: IssueDetails,
}

impl Issue {
    /// 새 이슈를 생성합니다.
    pub fn new(code: IssueCode, severity: Severity, details: IssueDetails) -> Self {
        Self {
            code,
            severity,
            details,
        }
    }

    /// 이슈 소스 경로를 반환합니다.
    pub fn source(&self) -> &Path {
        &self.details.source
    }

    /// 리포트에 들어가는 평탄화된 JSON 객체를 생성합니다.
    ///
    /// 스캐너별 필드가 먼저 들어가고 공통 필드가 그 위에 기록됩니다.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut out = self.details.fields.clone();
        out.insert(
            "description".to_owned(),
            Value::String(self.details.description.clone()),
        );
        out.insert(
            "severity".to_owned(),
            Value::String(self.severity.name().to_owned()),
        );
        out.insert(
            "scanner".to_owned(),
            Value::String(self.details.scanner.clone()),
        );
        out.insert(
            "source".to_owned(),
            Value::String(self.details.source.display().to_string()),
        );
        out
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({})",
            self.severity,
            self.details.description,
            self.details.source.display(),
        )
    }
}

/// 이슈 모음
///
/// 추가된 순서를 보존합니다.
#[derive(Debug, Clone, Default)]
pub struct Issues {
    all_issues: Vec<Issue>,
}

impl Issues {
    /// 빈 이슈 모음을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 이슈 목록을 추가합니다.
    pub fn add_issues(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.all_issues.extend(issues);
    }

    /// 전체 이슈를 추가 순서대로 반환합니다.
    pub fn all_issues(&self) -> &[Issue] {
        &self.all_issues
    }

    /// 이슈 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.all_issues.len()
    }

    /// 이슈가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.all_issues.is_empty()
    }

    /// 심각도별 이슈 수를 집계합니다.
    pub fn group_by_severity(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for issue in &self.all_issues {
            counts.increment(issue.severity);
        }
        counts
    }
}

/// 심각도별 이슈 개수
///
/// 발생하지 않은 심각도도 0으로 직렬화됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    #[serde(rename = "LOW")]
    pub low: usize,
    #[serde(rename = "MEDIUM")]
    pub medium: usize,
    #[serde(rename = "HIGH")]
    pub high: usize,
    #[serde(rename = "CRITICAL")]
    pub critical: usize,
}

impl SeverityCounts {
    /// 해당 심각도의 개수를 반환합니다.
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }

    fn increment(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
            Severity::Critical => self.critical += 1,
        }
    }

    /// 전체 이슈 수를 반환합니다.
    pub fn total(&self) -> usize {
        self.low + self.medium + self.high + self.critical
    }
}

/// 리포트에 기록되는 에러 분류
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// 설정된 스캐너를 생성하지 못함
    Initialization { scanner: String },
    /// 입력 경로가 존재하지 않거나 탐색 중 접근 실패
    Path,
    /// 아카이브 안에 또 다른 아카이브가 있음
    NestedArchive,
    /// 아카이브를 열거나 엔트리를 읽지 못함
    Archive,
    /// 스캐너가 대상을 처리하다 실패함
    Scanner { scanner: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialization { scanner } => write!(f, "initialization:{scanner}"),
            Self::Path => write!(f, "path"),
            Self::NestedArchive => write!(f, "nested-archive"),
            Self::Archive => write!(f, "archive"),
            Self::Scanner { scanner } => write!(f, "scanner:{scanner}"),
        }
    }
}

/// 리포트에 기록되는 에러
///
/// 스캔을 중단시키지 않는 조건을 표현합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// 에러 분류
    pub kind: ErrorKind,
    /// 에러 메시지
    pub message: String,
    /// 관련 소스 경로 (있을 경우)
    pub source: Option<PathBuf>,
}

impl ErrorRecord {
    /// 스캐너 초기화 실패를 기록합니다.
    pub fn initialization(scanner: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Initialization {
                scanner: scanner.into(),
            },
            message: message.into(),
            source: None,
        }
    }

    /// 유효하지 않은 경로를 기록합니다.
    pub fn path(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Path,
            message: message.into(),
            source: Some(path.into()),
        }
    }

    /// 중첩 아카이브를 기록합니다.
    pub fn nested_archive(source: impl Into<PathBuf>) -> Self {
        Self {
            kind: ErrorKind::NestedArchive,
            message: "nested zip files are not supported".to_owned(),
            source: Some(source.into()),
        }
    }

    /// 아카이브 처리 실패를 기록합니다.
    pub fn archive(source: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Archive,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 스캐너 처리 실패를 기록합니다.
    pub fn scanner(
        scanner: impl Into<String>,
        source: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::Scanner {
                scanner: scanner.into(),
            },
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "[{}] {} ({})", self.kind, self.message, source.display()),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}
