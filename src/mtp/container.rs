// 容器封包层 - 12字节容器头的解析与生成
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::mtp::error::Error;
use crate::mtp::standard_codes::ContainerType;

/// 容器头大小(字节)
pub const CONTAINER_HEADER_SIZE: usize = 12;

/// 数据容器长度字段的"长度未知"标记值，
/// 此时数据阶段以短USB包(非整包长度)作为结束标志
pub const DATA_LENGTH_UNKNOWN: u32 = 0xFFFF_FFFF;

/// 命令容器最多携带的32位参数个数
pub const MAX_COMMAND_PARAMS: usize = 5;

/// 容器头信息
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// 容器总长度字段原始值(含头)，数据容器可能为DATA_LENGTH_UNKNOWN
    pub length: u32,

    /// 容器类型
    pub kind: ContainerType,

    /// 操作码、响应码或事件码，取决于容器类型
    pub code: u16,

    /// 此容器所属的事务ID
    pub tid: u32,
}

impl ContainerInfo {
    /// 从数据流解析容器头
    pub fn parse<R: ReadBytesExt>(mut r: R) -> Result<ContainerInfo, Error> {
        let length = r.read_u32::<LittleEndian>()?;
        let kind_u16 = r.read_u16::<LittleEndian>()?;
        let kind = ContainerType::from_u16(kind_u16)
            .ok_or_else(|| Error::Malformed(format!("无效的容器类型 0x{:04x}", kind_u16)))?;
        let code = r.read_u16::<LittleEndian>()?;
        let tid = r.read_u32::<LittleEndian>()?;

        if length != DATA_LENGTH_UNKNOWN && (length as usize) < CONTAINER_HEADER_SIZE {
            return Err(Error::Malformed(format!("容器长度{}小于头大小", length)));
        }

        Ok(ContainerInfo {
            length,
            kind,
            code,
            tid,
        })
    }

    /// 负载长度(字节)；长度未知模式下返回None
    pub fn payload_len(&self) -> Option<usize> {
        if self.length == DATA_LENGTH_UNKNOWN {
            None
        } else {
            Some(self.length as usize - CONTAINER_HEADER_SIZE)
        }
    }

    /// 检查此容器是否属于给定的事务
    pub fn belongs_to(&self, tid: u32) -> bool {
        self.tid == tid
    }
}

/// 生成12字节容器头
pub fn encode_header(length: u32, kind: ContainerType, code: u16, tid: u32) -> [u8; CONTAINER_HEADER_SIZE] {
    let mut buf = [0u8; CONTAINER_HEADER_SIZE];
    {
        let mut w = &mut buf[..];
        w.write_u32::<LittleEndian>(length).ok();
        w.write_u16::<LittleEndian>(kind as u16).ok();
        w.write_u16::<LittleEndian>(code).ok();
        w.write_u32::<LittleEndian>(tid).ok();
    }
    buf
}

/// 生成命令容器的参数负载，长度为参数个数×4
pub fn command_payload(params: &[u32]) -> Result<Vec<u8>, Error> {
    if params.len() > MAX_COMMAND_PARAMS {
        return Err(Error::Protocol(format!(
            "命令参数过多: {}个，最多{}个",
            params.len(),
            MAX_COMMAND_PARAMS
        )));
    }
    let mut payload = Vec::with_capacity(params.len() * 4);
    for p in params {
        payload.write_u32::<LittleEndian>(*p).ok();
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_header() {
        let buf = [
            0x10, 0x00, 0x00, 0x00, // length = 16
            0x01, 0x00, // type = Command
            0x02, 0x10, // code = OpenSession
            0x05, 0x00, 0x00, 0x00, // tid = 5
        ];
        let info = ContainerInfo::parse(&buf[..]).unwrap();
        assert_eq!(info.length, 16);
        assert_eq!(info.kind, ContainerType::Command);
        assert_eq!(info.code, 0x1002);
        assert_eq!(info.tid, 5);
        assert_eq!(info.payload_len(), Some(4));
        assert!(info.belongs_to(5));
        assert!(!info.belongs_to(6));
    }

    #[test]
    fn parse_unknown_length_data_header() {
        let buf = [
            0xFF, 0xFF, 0xFF, 0xFF, // 长度未知
            0x02, 0x00, // type = Data
            0x09, 0x10, // code = GetObject
            0x02, 0x00, 0x00, 0x00,
        ];
        let info = ContainerInfo::parse(&buf[..]).unwrap();
        assert_eq!(info.kind, ContainerType::Data);
        assert_eq!(info.payload_len(), None);
    }

    #[test]
    fn length_below_header_is_malformed() {
        let buf = [
            0x0B, 0x00, 0x00, 0x00, // length = 11 < 12
            0x03, 0x00, 0x01, 0x20, 0x01, 0x00, 0x00, 0x00,
        ];
        assert!(ContainerInfo::parse(&buf[..]).is_err());
    }

    #[test]
    fn invalid_container_type_is_malformed() {
        let buf = [
            0x0C, 0x00, 0x00, 0x00, 0x07, 0x00, 0x01, 0x20, 0x01, 0x00, 0x00, 0x00,
        ];
        assert!(ContainerInfo::parse(&buf[..]).is_err());
    }

    #[test]
    fn header_roundtrip() {
        let buf = encode_header(17, ContainerType::Data, 0x1009, 2);
        assert_eq!(
            buf,
            [0x11, 0x00, 0x00, 0x00, 0x02, 0x00, 0x09, 0x10, 0x02, 0x00, 0x00, 0x00]
        );
        let info = ContainerInfo::parse(&buf[..]).unwrap();
        assert_eq!(info.length, 17);
        assert_eq!(info.code, 0x1009);
    }

    #[test]
    fn command_payload_rules() {
        assert_eq!(command_payload(&[]).unwrap(), Vec::<u8>::new());
        assert_eq!(command_payload(&[1]).unwrap(), vec![1, 0, 0, 0]);
        assert_eq!(command_payload(&[1, 2, 3, 4, 5]).unwrap().len(), 20);
        assert!(command_payload(&[1, 2, 3, 4, 5, 6]).is_err());
    }
}
