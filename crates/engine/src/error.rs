//! 엔진 에러 타입
//!
//! [`ModelError`]는 [`Model`](crate::model::Model) 리소스를 잘못 사용했을 때,
//! [`ScannerInitError`]는 설정된 스캐너를 생성하지 못했을 때 발생합니다.
//!
//! `ModelError`는 호출자에게 즉시 반환되는 계약 위반이며 리포트에 흡수되지 않습니다.
//! `ScannerInitError`는 레지스트리가 리포트 에러로 기록하고 다음 스캐너로 넘어갑니다.

use modelscan_core::error::ModelScanError;

/// 모델 리소스 에러
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// 스트림이 열리지 않은 상태에서 데이터를 요청함
    #[error("model data is empty: {path} (open the model first)")]
    EmptyData {
        /// 모델 소스 경로
        path: String,
    },

    /// 데이터가 읽기 한도를 넘음
    #[error("model data exceeds {limit} bytes: {path}")]
    TooLarge {
        /// 모델 소스 경로
        path: String,
        /// 허용 바이트 수
        limit: u64,
    },

    /// 파일 열기 또는 탐색(seek) 실패
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl From<ModelError> for ModelScanError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Io { source, .. } => ModelScanError::Io(source),
            other => ModelScanError::Model(other.to_string()),
        }
    }
}

/// 스캐너 초기화 에러
#[derive(Debug, thiserror::Error)]
pub enum ScannerInitError {
    /// 레지스트리에 등록되지 않은 식별자
    #[error("unknown scanner '{id}'")]
    Unknown {
        /// 스캐너 식별자
        id: String,
    },

    /// 스캐너 옵션이 잘못됨
    #[error("invalid option '{option}' for scanner '{id}': {reason}")]
    InvalidOption {
        /// 스캐너 식별자
        id: String,
        /// 옵션 이름
        option: String,
        /// 실패 사유
        reason: String,
    },

    /// 그 밖의 생성 실패
    #[error("scanner '{id}' failed to initialize: {reason}")]
    Failed {
        /// 스캐너 식별자
        id: String,
        /// 실패 사유
        reason: String,
    },
}
