//! modelscan 공통 크레이트
//!
//! 엔진, 스캐너, CLI가 공유하는 설정, 에러, 결과 타입을 정의합니다.
//!
//! # Module Structure
//!
//! - [`config`]: 설정 (`ModelScanConfig`, `ScannerSettings`)
//! - [`error`]: 에러 타입 (`ModelScanError`, `ConfigError`, `ReportError`)
//! - [`metrics`]: 메트릭 이름 상수
//! - [`types`]: 결과 타입 (`Severity`, `Issue`, `Issues`, `ErrorRecord`)

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ModelScanError, ReportError};

// 설정
pub use config::{GeneralConfig, ModelScanConfig, ScannerSettings};

// 도메인 타입
pub use types::{
    ErrorKind, ErrorRecord, Issue, IssueCode, IssueDetails, Issues, Severity, SeverityCounts,
};
