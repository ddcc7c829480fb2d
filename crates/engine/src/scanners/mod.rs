//! 내장 스캐너
//!
//! - [`pickle`]: pickle 스트림의 안전하지 않은 전역 참조 탐지
//!
//! 새 스캐너는 [`ModelScanner`](crate::scanner::ModelScanner)를 구현하고
//! [`ScannerRegistryBuilder::new`](crate::registry::ScannerRegistryBuilder::new)의
//! 팩토리 테이블에 등록합니다.

pub mod pickle;

pub use pickle::PickleScanner;
