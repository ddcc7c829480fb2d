//! modelscan 탐색/디스패치 엔진
//!
//! 입력 경로를 방문 대상(파일, 단일 단계 아카이브 엔트리)으로 분해하고, 각 대상을
//! 등록된 모든 스캐너에 제공한 뒤, 결과를 심각도별로 집계한 리포트를 만듭니다.
//!
//! # Module Structure
//!
//! - [`model`]: 지연 열림 바이트 소스 (`Model`, `ModelContext`)
//! - [`scanner`]: 스캐너 capability 계약 (`ModelScanner`, `ScanResults`)
//! - [`registry`]: 설정 기반 스캐너 레지스트리 (`ScannerRegistry`, builder)
//! - [`archive`]: zip 판별과 `archive:entry` 로케이터
//! - [`dispatch`]: 대상 하나를 모든 스캐너에 제공
//! - [`session`]: `scan()` 한 번의 누적 상태
//! - [`report`]: 리포트 생성과 경로 상대화 (`ScanReport`)
//! - [`engine`]: 최상위 엔진 (`ModelScan`)
//! - [`scanners`]: 내장 스캐너 (`PickleScanner`)
//! - [`error`]: 엔진 에러 (`ModelError`, `ScannerInitError`)
//!
//! # Architecture
//!
//! ```text
//! ModelScanConfig --> ScannerRegistry (once)
//!                            |
//! scan(path) --> ScanSession (fresh) --> Traversal
//!                                           |
//!                     file / dir (walkdir) / zip entry
//!                                           |
//!                                   dispatch --> [ModelScanner...]
//!                                           |
//!                              issues / errors / scanned / skipped
//!                                           |
//!                                      build_report --> ScanReport
//! ```

pub mod archive;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod model;
pub mod registry;
pub mod report;
pub mod scanner;
pub mod scanners;
pub mod session;
mod traversal;

// --- Public API Re-exports ---

// Engine
pub use engine::{ModelScan, absolutize};

// Model
pub use model::{ContextKey, Model, ModelContext, OpenModel, ReadSeek};

// Scanner contract & registry
pub use registry::{ScannerRegistry, ScannerRegistryBuilder};
pub use scanner::{ModelScanner, ScanResults, ScannerFactory};

// Report
pub use report::{ErrorEntry, ReportSummary, ScanReport, ScannedSummary, SkippedSummary};

// Error
pub use error::{ModelError, ScannerInitError};

// Built-in scanners
pub use scanners::PickleScanner;
