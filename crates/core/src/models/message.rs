use std::collections::BTreeMap;
use std::fmt;

/// 必需的消息头：文件ID
pub const HEADER_FILE_ID: &str = "file-id";
/// 必需的消息头：源文件路径
pub const HEADER_SOURCE_FILE_LOCATION: &str = "source-file-location";
/// 必需的消息头：重建后文件路径
pub const HEADER_REBUILT_FILE_LOCATION: &str = "rebuilt-file-location";
/// 可选的消息头：是否生成报告
pub const HEADER_GENERATE_REPORT: &str = "generate-report";
/// 由broker维护的投递次数（仅quorum队列等会设置）
pub const HEADER_DELIVERY_COUNT: &str = "x-delivery-count";

/// 消息头的值
///
/// broker协议层的字段类型被折叠成少数几种，校验阶段只关心是否为字符串。
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    /// 其他无法映射的类型，保存类型名称用于日志
    Other(String),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// 类型名称
    pub fn type_name(&self) -> &str {
        match self {
            HeaderValue::String(_) => "string",
            HeaderValue::Bool(_) => "bool",
            HeaderValue::Int(_) => "int",
            HeaderValue::Float(_) => "float",
            HeaderValue::Bytes(_) => "bytes",
            HeaderValue::Other(name) => name,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::String(s) => write!(f, "{s}"),
            HeaderValue::Bool(b) => write!(f, "{b}"),
            HeaderValue::Int(i) => write!(f, "{i}"),
            HeaderValue::Float(v) => write!(f, "{v}"),
            HeaderValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            HeaderValue::Other(name) => write!(f, "<{name}>"),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::String(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::String(value)
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        HeaderValue::Bool(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Int(value)
    }
}

/// 从broker收到的一条消息
///
/// 与具体broker客户端解耦，消息体本身不参与分发，所以这里不保存。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InboundMessage {
    pub delivery_tag: u64,
    pub headers: BTreeMap<String, HeaderValue>,
    pub reply_to: Option<String>,
    pub redelivered: bool,
}

impl InboundMessage {
    pub fn new(delivery_tag: u64) -> Self {
        Self {
            delivery_tag,
            ..Default::default()
        }
    }

    pub fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.headers.get(key)
    }

    /// broker报告的投递次数，没有该消息头时返回None
    pub fn delivery_count(&self) -> Option<u32> {
        self.header(HEADER_DELIVERY_COUNT)
            .and_then(HeaderValue::as_i64)
            .and_then(|count| u32::try_from(count).ok())
    }
}
