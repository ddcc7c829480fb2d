//! 모델 리소스: 스캐너에 전달되는 지연 열림(lazy-open) 바이트 소스
//!
//! [`Model`]은 파일 경로 또는 호출자가 넘긴 스트림을 감쌉니다.
//!
//! # 소유권
//!
//! - 경로만 가진 모델은 `open()` 시점에 파일을 직접 열고, `close()`에서 닫습니다.
//! - 외부 스트림을 받은 모델은 스트림을 빌리기만 하며 절대 닫지 않습니다.
//!
//! ```text
//! Model::new(path) --open()--> Owned(file) --close()--> (none)
//! Model::with_stream(path, s) -----------> Borrowed(s) --close()--> Borrowed(s)
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::ModelError;

/// 읽기와 탐색이 가능한 바이트 스트림
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// 모델이 보유한 스트림
enum ModelStream<'a> {
    /// 모델이 직접 연 파일
    Owned(BufReader<File>),
    /// 호출자가 소유한 스트림
    Borrowed(&'a mut dyn ReadSeek),
}

impl ModelStream<'_> {
    fn as_read_seek(&mut self) -> &mut dyn ReadSeek {
        match self {
            Self::Owned(reader) => reader,
            Self::Borrowed(stream) => &mut **stream,
        }
    }
}

/// 컨텍스트 키
///
/// 여러 스캐너가 같은 대상에 대해 주고받는 주석의 키입니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextKey {
    /// 대상에서 인식된 포맷 이름 목록 (JSON 문자열 배열)
    Formats,
    /// 스캐너 고유 키
    Custom(String),
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Formats => write!(f, "formats"),
            Self::Custom(key) => write!(f, "{key}"),
        }
    }
}

/// 스캐너 간 공유 컨텍스트
///
/// 생성 시 `Formats`는 빈 배열로 초기화됩니다.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelContext {
    values: BTreeMap<ContextKey, Value>,
}

impl Default for ModelContext {
    fn default() -> Self {
        let mut values = BTreeMap::new();
        values.insert(ContextKey::Formats, Value::Array(Vec::new()));
        Self { values }
    }
}

impl ModelContext {
    /// 값을 설정합니다. 기존 값은 덮어씁니다.
    pub fn set(&mut self, key: ContextKey, value: Value) {
        self.values.insert(key, value);
    }

    /// 값을 조회합니다.
    pub fn get(&self, key: &ContextKey) -> Option<&Value> {
        self.values.get(key)
    }

    /// 인식된 포맷 목록을 반환합니다.
    pub fn formats(&self) -> Vec<&str> {
        match self.values.get(&ContextKey::Formats) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// 포맷을 추가합니다. 이미 있으면 무시합니다.
    pub fn add_format(&mut self, format: &str) {
        let entry = self
            .values
            .entry(ContextKey::Formats)
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(items) = entry {
            if !items.iter().any(|v| v.as_str() == Some(format)) {
                items.push(Value::String(format.to_owned()));
            }
        }
    }
}

/// 스캔 대상 모델
pub struct Model<'a> {
    source: PathBuf,
    stream: Option<ModelStream<'a>>,
    context: ModelContext,
}

impl<'a> Model<'a> {
    /// 경로로 모델을 생성합니다. 파일은 `open()` 시점에 열립니다.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            stream: None,
            context: ModelContext::default(),
        }
    }

    /// 호출자가 소유한 스트림으로 모델을 생성합니다.
    ///
    /// 이 스트림은 `close()`로 닫히지 않습니다.
    pub fn with_stream(source: impl Into<PathBuf>, stream: &'a mut dyn ReadSeek) -> Self {
        Self {
            source: source.into(),
            stream: Some(ModelStream::Borrowed(stream)),
            context: ModelContext::default(),
        }
    }

    /// 소스 경로 (파일 경로 또는 `archive:entry`)를 반환합니다.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// 스트림이 연결되어 있는지 확인합니다.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// 모델이 스트림을 직접 열었는지 확인합니다.
    pub fn owns_stream(&self) -> bool {
        matches!(self.stream, Some(ModelStream::Owned(_)))
    }

    /// 스트림을 엽니다.
    ///
    /// 이미 스트림이 있으면 아무 것도 하지 않습니다.
    pub fn open(&mut self) -> Result<&mut Self, ModelError> {
        if self.stream.is_none() {
            let file = File::open(&self.source).map_err(|e| ModelError::Io {
                path: self.source.display().to_string(),
                source: e,
            })?;
            self.stream = Some(ModelStream::Owned(BufReader::new(file)));
        }
        Ok(self)
    }

    /// 스트림을 열고, 가드가 drop될 때 닫습니다.
    ///
    /// 에러로 빠져나가는 경우에도 소유한 스트림은 닫힙니다.
    pub fn open_scoped(&mut self) -> Result<OpenModel<'_, 'a>, ModelError> {
        self.open()?;
        Ok(OpenModel { model: self })
    }

    /// 모델이 연 스트림만 닫습니다.
    ///
    /// 열리지 않았거나 외부 스트림인 경우 아무 것도 하지 않습니다.
    pub fn close(&mut self) {
        if self.owns_stream() {
            self.stream = None;
        }
    }

    /// `offset`으로 이동한 스트림을 반환합니다.
    ///
    /// # Errors
    ///
    /// - 스트림이 없으면 `ModelError::EmptyData`
    /// - 탐색 실패 시 `ModelError::Io`
    pub fn get_stream(&mut self, offset: u64) -> Result<&mut dyn ReadSeek, ModelError> {
        let path = &self.source;
        let stream = match self.stream.as_mut() {
            Some(stream) => stream.as_read_seek(),
            None => {
                return Err(ModelError::EmptyData {
                    path: path.display().to_string(),
                });
            }
        };
        stream
            .seek(SeekFrom::Start(offset))
            .map_err(|e| ModelError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        Ok(stream)
    }

    /// 스트림 전체를 처음부터 읽습니다.
    ///
    /// `limit` 바이트를 넘는 데이터는 버퍼에 담지 않고 `ModelError::TooLarge`를 반환합니다.
    pub fn read_all(&mut self, limit: u64) -> Result<Vec<u8>, ModelError> {
        let path = self.source.display().to_string();
        let stream = self.get_stream(0)?;
        let mut data = Vec::new();
        Read::take(stream, limit.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|e| ModelError::Io {
                path: path.clone(),
                source: e,
            })?;
        if data.len() as u64 > limit {
            return Err(ModelError::TooLarge { path, limit });
        }
        Ok(data)
    }

    /// 컨텍스트 값을 설정합니다.
    pub fn set_context(&mut self, key: ContextKey, value: Value) {
        self.context.set(key, value);
    }

    /// 컨텍스트 값을 조회합니다.
    pub fn get_context(&self, key: &ContextKey) -> Option<&Value> {
        self.context.get(key)
    }

    /// 컨텍스트 전체를 반환합니다.
    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    /// 컨텍스트 전체를 가변으로 반환합니다.
    pub fn context_mut(&mut self) -> &mut ModelContext {
        &mut self.context
    }
}

impl fmt::Debug for Model<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("source", &self.source)
            .field("open", &self.is_open())
            .field("owns_stream", &self.owns_stream())
            .field("context", &self.context)
            .finish()
    }
}

/// 스코프가 끝나면 모델을 닫는 가드
pub struct OpenModel<'m, 'a> {
    model: &'m mut Model<'a>,
}

impl<'a> Deref for OpenModel<'_, 'a> {
    type Target = Model<'a>;

    fn deref(&self) -> &Self::Target {
        self.model
    }
}

impl DerefMut for OpenModel<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.model
    }
}

impl Drop for OpenModel<'_, '_> {
    fn drop(&mut self) {
        self.model.close();
    }
}
