use thiserror::Error;

/// Numeric error codes, identical to the ones the native engine reports so
/// that a host can translate them one to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    InternalError = 1,
    InternalTypeError = 2,
    ValueOutOfRange = 3,
    DivisionByZero = 4,
    MemoryAllocError = 5,
    AggregationError = 6,
    DirectoryError = 7,
    FileError = 8,
    InvalidArg = 10,
    InvalidArgType = 11,
    InvalidArgValue = 12,
    FeatureNotSupported = 13,
    MfjsonInput = 20,
    MfjsonOutput = 21,
    TextInput = 22,
    TextOutput = 23,
    WkbInput = 24,
    WkbOutput = 25,
    GeojsonInput = 26,
    GeojsonOutput = 27,
}

#[derive(Error, Debug)]
pub enum MeosError {
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Internal type error: {0}")]
    InternalType(String),
    #[error("Value out of range: {0}")]
    OutOfRange(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Aggregation error: {0}")]
    Aggregation(String),
    #[error("Directory error: {0}")]
    Directory(String),
    #[error("File error: {0}")]
    File(String),
    #[error("Invalid argument: {0}")]
    InvalidArg(String),
    #[error("Invalid argument type: {0}")]
    InvalidArgType(String),
    #[error("Invalid argument value: {0}")]
    InvalidArgValue(String),
    #[error("Feature not supported: {0}")]
    NotSupported(String),
    #[error("MF-JSON input error: {0}")]
    MfjsonInput(String),
    #[error("MF-JSON output error: {0}")]
    MfjsonOutput(String),
    #[error("Parse error: {message}")]
    TextInput { message: String, col: Option<usize> },
    #[error("Text output error: {0}")]
    TextOutput(String),
    #[error("WKB input error: {0}")]
    WkbInput(String),
    #[error("WKB output error: {0}")]
    WkbOutput(String),
    #[error("GeoJSON input error: {0}")]
    GeojsonInput(String),
    #[error("Config error: {0}")]
    Config(String),
}

impl MeosError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Internal(_) => ErrorCode::InternalError,
            Self::InternalType(_) => ErrorCode::InternalTypeError,
            Self::OutOfRange(_) => ErrorCode::ValueOutOfRange,
            Self::DivisionByZero => ErrorCode::DivisionByZero,
            Self::Aggregation(_) => ErrorCode::AggregationError,
            Self::Directory(_) => ErrorCode::DirectoryError,
            Self::File(_) => ErrorCode::FileError,
            Self::InvalidArg(_) | Self::Config(_) => ErrorCode::InvalidArg,
            Self::InvalidArgType(_) => ErrorCode::InvalidArgType,
            Self::InvalidArgValue(_) => ErrorCode::InvalidArgValue,
            Self::NotSupported(_) => ErrorCode::FeatureNotSupported,
            Self::MfjsonInput(_) => ErrorCode::MfjsonInput,
            Self::MfjsonOutput(_) => ErrorCode::MfjsonOutput,
            Self::TextInput { .. } => ErrorCode::TextInput,
            Self::TextOutput(_) => ErrorCode::TextOutput,
            Self::WkbInput(_) => ErrorCode::WkbInput,
            Self::WkbOutput(_) => ErrorCode::WkbOutput,
            Self::GeojsonInput(_) => ErrorCode::GeojsonInput,
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::TextInput { message: message.into(), col: None }
    }

    pub(crate) fn value(message: impl Into<String>) -> Self {
        Self::InvalidArgValue(message.into())
    }
}

pub type Result<T> = std::result::Result<T, MeosError>;

// Helper conversions
impl From<serde_json::Error> for MeosError {
    fn from(e: serde_json::Error) -> Self { Self::MfjsonInput(e.to_string()) }
}
impl From<std::io::Error> for MeosError {
    fn from(e: std::io::Error) -> Self { Self::File(e.to_string()) }
}
impl From<config::ConfigError> for MeosError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<hex::FromHexError> for MeosError {
    fn from(e: hex::FromHexError) -> Self { Self::WkbInput(e.to_string()) }
}
impl<R: pest::RuleType> From<pest::error::Error<R>> for MeosError {
    fn from(e: pest::error::Error<R>) -> Self {
        let col = match e.line_col {
            pest::error::LineColLocation::Pos((_, c)) => Some(c),
            pest::error::LineColLocation::Span((_, c), _) => Some(c),
        };
        Self::TextInput { message: e.to_string(), col }
    }
}
