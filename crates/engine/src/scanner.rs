//! 스캐너 capability 계약
//!
//! [`ModelScanner`] trait은 포맷별 스캐너가 구현해야 하는 인터페이스입니다.
//! 엔진은 스캐너가 반환한 이슈와 에러를 해석하지 않고 리포트에 모읍니다.
//!
//! # 클레임(claim)
//!
//! - `scan()`이 `Some(ScanResults)`를 반환하면 스캐너가 대상을 인식한 것입니다.
//!   이슈와 에러가 모두 비어 있어도 클레임입니다.
//! - `None`은 "이 대상은 내 포맷이 아님"을 뜻하며 아무 것도 기여하지 않습니다.

use modelscan_core::config::ScannerSettings;
use modelscan_core::types::{ErrorRecord, Issue};

use crate::error::ScannerInitError;
use crate::model::Model;

/// 스캐너 한 번 실행 결과
#[derive(Debug, Clone, Default)]
pub struct ScanResults {
    /// 발견된 이슈
    pub issues: Vec<Issue>,
    /// 처리 중 발생한 에러
    pub errors: Vec<ErrorRecord>,
}

impl ScanResults {
    /// 빈 결과를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 이슈와 에러를 지정하여 결과를 생성합니다.
    pub fn with(issues: Vec<Issue>, errors: Vec<ErrorRecord>) -> Self {
        Self { issues, errors }
    }

    /// 이슈와 에러가 모두 없는지 확인합니다.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.errors.is_empty()
    }
}

/// 모델 스캐너 trait
///
/// 구현체는 레지스트리가 한 번 생성한 뒤 여러 스캔에서 공유하므로
/// `scan()`은 내부 상태를 변경하지 않아야 합니다.
pub trait ModelScanner: Send + Sync {
    /// 설정 식별자와 같은 짧은 이름을 반환합니다.
    fn name(&self) -> &str;

    /// 리포트에 표시되는 전체 이름을 반환합니다.
    fn full_name(&self) -> &str;

    /// 이 스캐너가 처리하는 확장자 목록 (`.pkl` 형식)
    fn supported_extensions(&self) -> &[String];

    /// 대상을 스캔합니다.
    ///
    /// 스트림이 없는 모델은 필요 시 스캐너가 직접 `open()`합니다.
    fn scan(&self, model: &mut Model<'_>) -> Option<ScanResults>;
}

/// 설정으로부터 스캐너를 생성하는 팩토리
pub type ScannerFactory = Box<
    dyn Fn(&ScannerSettings) -> Result<Box<dyn ModelScanner>, ScannerInitError> + Send + Sync,
>;
