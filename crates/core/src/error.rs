//! 에러 타입: 도메인별 에러 정의
//!
//! 스캔 중 만나는 조건(존재하지 않는 경로, 손상된 아카이브, 스캐너 실패)은
//! 에러가 아니라 리포트의 [`ErrorRecord`](crate::types::ErrorRecord)로 기록됩니다.
//! 이 모듈의 타입은 호출자에게 즉시 반환되어야 하는 실패만 표현합니다.

/// modelscan 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ModelScanError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 리포트 생성 에러
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// 모델 리소스 사용 에러
    #[error("model error: {0}")]
    Model(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 리포트 생성 에러
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// 보고할 경로를 리포트 루트 기준 상대 경로로 표현할 수 없음
    #[error("path '{path}' is not relative to report root '{root}'")]
    PathOutsideRoot { path: String, root: String },

    /// 리포트 직렬화 실패
    #[error("failed to serialize report: {0}")]
    Serialize(String),
}
