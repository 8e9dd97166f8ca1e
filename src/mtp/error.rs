// 错误模型 - 核心的五类错误与USB传输错误分类
use std::fmt;
use std::io;

use crate::mtp::standard_codes::{ResponseCode, StandardResponseCode};

/// USB传输层错误分类
#[derive(Debug)]
pub enum TransportError {
    /// 传输在超时时间内未完成
    Timeout,
    /// 端点STALL，需要清除后才能继续
    Stall,
    /// 设备已断开
    Disconnected,
    /// 其他底层IO错误
    Io(io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "传输超时"),
            TransportError::Stall => write!(f, "端点STALL"),
            TransportError::Disconnected => write!(f, "设备已断开"),
            TransportError::Io(e) => write!(f, "IO错误: {}", e),
        }
    }
}

impl From<rusb::Error> for TransportError {
    fn from(e: rusb::Error) -> TransportError {
        match e {
            rusb::Error::Timeout => TransportError::Timeout,
            rusb::Error::Pipe => TransportError::Stall,
            rusb::Error::NoDevice => TransportError::Disconnected,
            other => TransportError::Io(io::Error::new(io::ErrorKind::Other, other)),
        }
    }
}

/// MTP会话错误类型
#[derive(Debug)]
pub enum Error {
    /// 底层USB传输失败
    Transport(TransportError),

    /// 收到的数据格式错误：长度不一致、字符串缺少终止符、未知数据类型等
    Malformed(String),

    /// 协议状态被破坏：事务ID不匹配、阶段中出现错误的容器类型、响应缺失
    Protocol(String),

    /// 设备返回非 Ok 的响应码，保留原始码供上层分类处理
    Response(ResponseCode),

    /// 在取消点观察到取消请求
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "传输错误: {}", e),
            Error::Malformed(e) => write!(f, "{}", e),
            Error::Protocol(e) => write!(f, "协议错误: {}", e),
            Error::Response(r) => write!(
                f,
                "{} (0x{:04x})",
                StandardResponseCode::name(*r).unwrap_or("未知响应码"),
                r
            ),
            Error::Cancelled => write!(f, "操作已取消"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(TransportError::Io(e)) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Error {
        Error::Transport(e)
    }
}

impl From<rusb::Error> for Error {
    fn from(e: rusb::Error) -> Error {
        Error::Transport(TransportError::from(e))
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::Malformed("消息意外结束".to_string()),
            _ => Error::Transport(TransportError::Io(e)),
        }
    }
}
