//! 아카이브 판별 및 엔트리 로케이터
//!
//! 파일시스템 경로는 두 가지 휴리스틱 중 하나라도 맞으면 아카이브로 봅니다.
//!
//! 1. 내용의 첫 4바이트가 zip 시그니처 (`PK\x03\x04` 등)
//! 2. 확장자가 `supported_zip_extensions`에 포함
//!
//! 확장자만 맞고 실제로는 zip이 아닌 경우 여는 단계에서 걸러집니다.
//! 아카이브 엔트리는 열어 보지 않으므로 시그니처만으로 판별합니다.

use std::ffi::OsString;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use modelscan_core::config::ModelScanConfig;

/// zip 로컬/중앙 디렉토리/EOCD/spanning 시그니처 검사
pub fn is_zip_magic(header: &[u8]) -> bool {
    if header.len() < 4 {
        return false;
    }
    if header[0] != b'P' || header[1] != b'K' {
        return false;
    }
    matches!((header[2], header[3]), (1, 2) | (3, 4) | (5, 6) | (7, 8))
}

/// 파일의 첫 4바이트로 zip 여부를 판별합니다.
///
/// 열 수 없거나 4바이트보다 짧은 파일은 zip이 아닙니다.
pub fn sniff_zip_path(path: &Path) -> bool {
    let mut header = [0u8; 4];
    match File::open(path) {
        Ok(mut file) => file.read_exact(&mut header).is_ok() && is_zip_magic(&header),
        Err(_) => false,
    }
}

/// 경로의 확장자를 `.ext` 형식으로 반환합니다.
///
/// 대소문자를 그대로 유지합니다. `archive.zip:model.pkl` 같은 로케이터는
/// 엔트리 이름의 확장자가 반환됩니다.
pub fn suffix(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
}

/// 확장자가 아카이브 확장자 목록에 포함되는지 확인합니다.
pub fn has_archive_suffix(path: &Path, config: &ModelScanConfig) -> bool {
    suffix(path).is_some_and(|ext| config.is_zip_extension(&ext))
}

/// 파일시스템 경로가 아카이브로 보이는지 확인합니다.
pub fn is_archive_path(path: &Path, config: &ModelScanConfig) -> bool {
    sniff_zip_path(path) || has_archive_suffix(path, config)
}

/// 아카이브 엔트리 내용이 또 다른 zip 아카이브인지 확인합니다.
///
/// 이름이 `.zip`이어도 시그니처가 없으면 아카이브가 아닙니다.
pub fn is_archive_entry(data: &[u8]) -> bool {
    is_zip_magic(data)
}

/// 엔트리 이름을 아카이브 내부 상대 경로로 정규화합니다.
///
/// 루트, 드라이브 접두사, `.`은 버리고 `..`은 아카이브 루트 위로 올라가지 않습니다.
/// 구분자는 `/`로 통일합니다.
pub fn normalize_entry_name(entry: &str) -> String {
    let unified = entry.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().unwrap_or_default()),
            Component::ParentDir => {
                parts.pop();
            }
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
        }
    }
    parts.join("/")
}

/// `archive:entry` 형식의 복합 로케이터를 생성합니다.
pub fn entry_locator(archive: &Path, entry: &str) -> PathBuf {
    let mut locator = OsString::from(archive.as_os_str());
    locator.push(":");
    locator.push(normalize_entry_name(entry));
    PathBuf::from(locator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn zip_magic_signatures() {
        assert!(is_zip_magic(b"PK\x03\x04rest"));
        assert!(is_zip_magic(b"PK\x05\x06"));
        assert!(is_zip_magic(b"PK\x01\x02"));
        assert!(is_zip_magic(b"PK\x07\x08"));
        assert!(!is_zip_magic(b"PK\x03"));
        assert!(!is_zip_magic(b"\x80\x04\x95\x00"));
        assert!(!is_zip_magic(b"PK\x09\x09"));
    }

    #[test]
    fn suffix_keeps_case_and_dot() {
        assert_eq!(suffix(Path::new("model.PKL")).as_deref(), Some(".PKL"));
        assert_eq!(suffix(Path::new("dir/archive.zip")).as_deref(), Some(".zip"));
        assert_eq!(suffix(Path::new("Makefile")), None);
    }

    #[test]
    fn locator_suffix_comes_from_entry_name() {
        let locator = entry_locator(Path::new("/models/archive.zip"), "data/model.pkl");
        assert_eq!(locator, PathBuf::from("/models/archive.zip:data/model.pkl"));
        assert_eq!(suffix(&locator).as_deref(), Some(".pkl"));
    }

    #[test]
    fn archive_path_by_suffix_or_magic() {
        let config = ModelScanConfig::default();
        let dir = tempfile::tempdir().unwrap();

        let by_suffix = dir.path().join("weights.npz");
        std::fs::write(&by_suffix, b"not really a zip").unwrap();
        assert!(is_archive_path(&by_suffix, &config));

        let by_magic = dir.path().join("bundle.bin");
        let mut file = File::create(&by_magic).unwrap();
        file.write_all(b"PK\x03\x04\x00\x00").unwrap();
        assert!(is_archive_path(&by_magic, &config));

        let plain = dir.path().join("notes.txt");
        std::fs::write(&plain, b"hello").unwrap();
        assert!(!is_archive_path(&plain, &config));
    }

    #[test]
    fn archive_entry_detection_requires_signature() {
        assert!(is_archive_entry(b"PK\x03\x04"));
        assert!(!is_archive_entry(b""));
        assert!(!is_archive_entry(b"just some text"));
        assert!(!is_archive_entry(b"\x80\x02"));
    }

    #[test]
    fn entry_names_are_normalized() {
        assert_eq!(normalize_entry_name("a/../../x.txt"), "x.txt");
        assert_eq!(normalize_entry_name("/etc/passwd"), "etc/passwd");
        assert_eq!(normalize_entry_name("./data//model.pkl"), "data/model.pkl");
        assert_eq!(normalize_entry_name("..\\..\\evil.pkl"), "evil.pkl");
        assert_eq!(normalize_entry_name("a/b/../c.pkl"), "a/c.pkl");

        let locator = entry_locator(Path::new("outer.zip"), "a/../../x.txt");
        assert_eq!(locator, PathBuf::from("outer.zip:x.txt"));
    }

    #[test]
    fn missing_file_is_not_sniffed_as_zip() {
        assert!(!sniff_zip_path(Path::new("/nonexistent/file.bin")));
    }
}
