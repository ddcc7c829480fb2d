//! 스캔 엔진: 레지스트리, 탐색, 리포트를 묶는 최상위 타입
//!
//! [`ModelScan`]은 생성 시 한 번 레지스트리를 만들고, `scan()`을 호출할 때마다
//! 새 세션으로 탐색과 리포트 생성을 수행합니다.
//!
//! # 사용 예시
//! ```no_run
//! use std::sync::Arc;
//! use modelscan_core::config::ModelScanConfig;
//! use modelscan_engine::ModelScan;
//!
//! # fn example() -> Result<(), modelscan_core::error::ModelScanError> {
//! let mut engine = ModelScan::new(Arc::new(ModelScanConfig::default()));
//! let report = engine.scan("models/")?;
//! println!("{} issues", report.summary.total_issues);
//! # Ok(())
//! # }
//! ```

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use modelscan_core::config::ModelScanConfig;
use modelscan_core::error::ModelScanError;
use modelscan_core::types::{ErrorRecord, Issues};

use crate::archive::suffix;
use crate::registry::ScannerRegistry;
use crate::report::{ScanReport, build_report};
use crate::session::ScanSession;
use crate::traversal::Traversal;

/// modelscan 엔진
pub struct ModelScan {
    config: Arc<ModelScanConfig>,
    registry: ScannerRegistry,
    session: ScanSession,
}

impl ModelScan {
    /// 내장 스캐너 팩토리로 엔진을 생성합니다.
    pub fn new(config: Arc<ModelScanConfig>) -> Self {
        let registry = ScannerRegistry::from_config(&config);
        Self::with_registry(config, registry)
    }

    /// 이미 생성된 레지스트리로 엔진을 생성합니다.
    pub fn with_registry(config: Arc<ModelScanConfig>, registry: ScannerRegistry) -> Self {
        let session = ScanSession::new(registry.init_errors());
        Self {
            config,
            registry,
            session,
        }
    }

    /// 경로를 스캔하고 리포트를 반환합니다.
    ///
    /// 존재하지 않는 경로, 손상된 아카이브, 스캐너 실패는 리포트의 에러로
    /// 기록되며 `Err`가 되지 않습니다.
    ///
    /// # Errors
    ///
    /// - 현재 작업 디렉토리를 알 수 없어 상대 경로를 절대 경로로 만들 수 없는 경우
    /// - 보고할 경로를 리포트 루트 기준으로 표현할 수 없는 경우
    pub fn scan(&mut self, path: impl AsRef<Path>) -> Result<ScanReport, ModelScanError> {
        let input = path.as_ref();
        self.session = ScanSession::new(self.registry.init_errors());

        let absolute = absolutize(input)?;
        info!(
            path = %input.display(),
            absolute = %absolute.display(),
            scanners = ?self.registry.names(),
            "scan started"
        );

        Traversal::new(&self.config, self.registry.scanners(), &mut self.session)
            .scan_path(&absolute);

        let report = build_report(input, &absolute, &self.session)?;
        info!(
            scanned = report.summary.scanned.total_scanned,
            skipped = report.summary.skipped.total_skipped,
            issues = report.summary.total_issues,
            errors = report.errors.len(),
            "scan completed"
        );
        Ok(report)
    }

    /// 경로의 확장자를 처리할 수 있는지 확인합니다.
    ///
    /// 활성 스캐너의 지원 확장자 또는 아카이브 확장자와 비교하며 I/O를 하지 않습니다.
    pub fn is_compatible(&self, path: impl AsRef<Path>) -> bool {
        let Some(ext) = suffix(path.as_ref()) else {
            return false;
        };
        self.config.is_zip_extension(&ext)
            || self
                .config
                .scanners
                .iter()
                .filter(|s| s.enabled)
                .any(|s| s.supports_extension(&ext))
    }

    /// 설정을 반환합니다.
    pub fn config(&self) -> &ModelScanConfig {
        &self.config
    }

    /// 스캐너 레지스트리를 반환합니다.
    pub fn registry(&self) -> &ScannerRegistry {
        &self.registry
    }

    /// 마지막 스캔의 이슈
    pub fn issues(&self) -> &Issues {
        self.session.issues()
    }

    /// 마지막 스캔의 에러 (초기화 에러 포함)
    pub fn errors(&self) -> &[ErrorRecord] {
        self.session.errors()
    }

    /// 마지막 스캔에서 스캔된 대상 (절대 경로)
    pub fn scanned(&self) -> &[PathBuf] {
        self.session.scanned()
    }

    /// 마지막 스캔에서 건너뛴 대상 (절대 경로)
    pub fn skipped(&self) -> &[PathBuf] {
        self.session.skipped()
    }
}

/// 경로를 심볼릭 링크를 해석하지 않고 절대 경로로 정규화합니다.
///
/// `.`는 제거하고 `..`는 앞 구성요소를 제거합니다.
pub fn absolutize(path: &Path) -> Result<PathBuf, ModelScanError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}
