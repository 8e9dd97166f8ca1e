// 线上编解码 - 小端整数、带长度前缀的UTF-16LE字符串与数组，字节序只存在于这里
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::mtp::error::Error;
use crate::mtp::standard_codes::{DataType, DataTypeCode};

/// PTP数据读取特性
pub trait PtpRead: ReadBytesExt {
    fn read_ptp_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_u8()?)
    }

    fn read_ptp_i8(&mut self) -> Result<i8, Error> {
        Ok(self.read_i8()?)
    }

    fn read_ptp_u16(&mut self) -> Result<u16, Error> {
        Ok(self.read_u16::<LittleEndian>()?)
    }

    fn read_ptp_i16(&mut self) -> Result<i16, Error> {
        Ok(self.read_i16::<LittleEndian>()?)
    }

    fn read_ptp_u32(&mut self) -> Result<u32, Error> {
        Ok(self.read_u32::<LittleEndian>()?)
    }

    fn read_ptp_i32(&mut self) -> Result<i32, Error> {
        Ok(self.read_i32::<LittleEndian>()?)
    }

    fn read_ptp_u64(&mut self) -> Result<u64, Error> {
        Ok(self.read_u64::<LittleEndian>()?)
    }

    fn read_ptp_i64(&mut self) -> Result<i64, Error> {
        Ok(self.read_i64::<LittleEndian>()?)
    }

    fn read_ptp_u128(&mut self) -> Result<u128, Error> {
        Ok(self.read_u128::<LittleEndian>()?)
    }

    fn read_ptp_i128(&mut self) -> Result<i128, Error> {
        Ok(self.read_i128::<LittleEndian>()?)
    }

    /// 读取u32长度前缀数组的辅助方法
    #[inline(always)]
    fn read_ptp_vec<T: Sized, U: Fn(&mut Self) -> Result<T, Error>>(
        &mut self,
        func: U,
    ) -> Result<Vec<T>, Error> {
        let len = self.read_u32::<LittleEndian>()? as usize;
        (0..len).map(|_| func(self)).collect()
    }

    fn read_ptp_u8_vec(&mut self) -> Result<Vec<u8>, Error> {
        self.read_ptp_vec(|cur| cur.read_ptp_u8())
    }

    fn read_ptp_i8_vec(&mut self) -> Result<Vec<i8>, Error> {
        self.read_ptp_vec(|cur| cur.read_ptp_i8())
    }

    fn read_ptp_u16_vec(&mut self) -> Result<Vec<u16>, Error> {
        self.read_ptp_vec(|cur| cur.read_ptp_u16())
    }

    fn read_ptp_i16_vec(&mut self) -> Result<Vec<i16>, Error> {
        self.read_ptp_vec(|cur| cur.read_ptp_i16())
    }

    fn read_ptp_u32_vec(&mut self) -> Result<Vec<u32>, Error> {
        self.read_ptp_vec(|cur| cur.read_ptp_u32())
    }

    fn read_ptp_i32_vec(&mut self) -> Result<Vec<i32>, Error> {
        self.read_ptp_vec(|cur| cur.read_ptp_i32())
    }

    fn read_ptp_u64_vec(&mut self) -> Result<Vec<u64>, Error> {
        self.read_ptp_vec(|cur| cur.read_ptp_u64())
    }

    fn read_ptp_i64_vec(&mut self) -> Result<Vec<i64>, Error> {
        self.read_ptp_vec(|cur| cur.read_ptp_i64())
    }

    fn read_ptp_u128_vec(&mut self) -> Result<Vec<u128>, Error> {
        self.read_ptp_vec(|cur| cur.read_ptp_u128())
    }

    fn read_ptp_i128_vec(&mut self) -> Result<Vec<i128>, Error> {
        self.read_ptp_vec(|cur| cur.read_ptp_i128())
    }

    /// 读取PTP字符串
    ///
    /// 长度前缀是UTF-16码元数，计数包含结尾的单个null码元；空串编码为单个0。
    /// 缺少null终止符按格式错误处理。
    fn read_ptp_str(&mut self) -> Result<String, Error> {
        let len = self.read_u8()?;
        if len == 0 {
            return Ok(String::new());
        }
        let mut data = Vec::with_capacity(len as usize - 1);
        for _ in 0..(len - 1) {
            data.push(self.read_u16::<LittleEndian>()?);
        }
        let terminator = self.read_u16::<LittleEndian>()?;
        if terminator != 0 {
            return Err(Error::Malformed(format!(
                "字符串缺少null终止符，结尾码元为 0x{:04x}",
                terminator
            )));
        }
        String::from_utf16(&data)
            .map_err(|_| Error::Malformed(format!("无效的UTF-16数据: {:?}", data)))
    }

    /// 检查是否已读取到数据流末尾
    fn expect_end(&mut self) -> Result<(), Error>;
}

/// 为Cursor实现PtpRead特性
impl<T: AsRef<[u8]>> PtpRead for Cursor<T> {
    fn expect_end(&mut self) -> Result<(), Error> {
        let len = self.get_ref().as_ref().len() as u64;
        if len != self.position() {
            Err(Error::Malformed(format!(
                "负载共{}字节，仅消费了{}字节",
                len,
                self.position()
            )))
        } else {
            Ok(())
        }
    }
}

/// PTP数据写入特性，与PtpRead对称
pub trait PtpWrite: WriteBytesExt {
    fn write_ptp_u8(&mut self, v: u8) -> Result<(), Error> {
        Ok(self.write_u8(v)?)
    }

    fn write_ptp_i8(&mut self, v: i8) -> Result<(), Error> {
        Ok(self.write_i8(v)?)
    }

    fn write_ptp_u16(&mut self, v: u16) -> Result<(), Error> {
        Ok(self.write_u16::<LittleEndian>(v)?)
    }

    fn write_ptp_i16(&mut self, v: i16) -> Result<(), Error> {
        Ok(self.write_i16::<LittleEndian>(v)?)
    }

    fn write_ptp_u32(&mut self, v: u32) -> Result<(), Error> {
        Ok(self.write_u32::<LittleEndian>(v)?)
    }

    fn write_ptp_i32(&mut self, v: i32) -> Result<(), Error> {
        Ok(self.write_i32::<LittleEndian>(v)?)
    }

    fn write_ptp_u64(&mut self, v: u64) -> Result<(), Error> {
        Ok(self.write_u64::<LittleEndian>(v)?)
    }

    fn write_ptp_i64(&mut self, v: i64) -> Result<(), Error> {
        Ok(self.write_i64::<LittleEndian>(v)?)
    }

    fn write_ptp_u128(&mut self, v: u128) -> Result<(), Error> {
        Ok(self.write_u128::<LittleEndian>(v)?)
    }

    fn write_ptp_i128(&mut self, v: i128) -> Result<(), Error> {
        Ok(self.write_i128::<LittleEndian>(v)?)
    }

    /// 写入u32长度前缀数组的辅助方法
    #[inline(always)]
    fn write_ptp_vec<T, U: Fn(&mut Self, &T) -> Result<(), Error>>(
        &mut self,
        items: &[T],
        func: U,
    ) -> Result<(), Error> {
        self.write_u32::<LittleEndian>(items.len() as u32)?;
        for item in items {
            func(self, item)?;
        }
        Ok(())
    }

    fn write_ptp_u16_vec(&mut self, items: &[u16]) -> Result<(), Error> {
        self.write_ptp_vec(items, |w, v| w.write_ptp_u16(*v))
    }

    fn write_ptp_u32_vec(&mut self, items: &[u32]) -> Result<(), Error> {
        self.write_ptp_vec(items, |w, v| w.write_ptp_u32(*v))
    }

    /// 写入PTP字符串，编码规则与read_ptp_str对称
    fn write_ptp_str(&mut self, s: &str) -> Result<(), Error> {
        let units: Vec<u16> = s.encode_utf16().collect();
        if units.is_empty() {
            self.write_u8(0)?;
            return Ok(());
        }
        if units.len() + 1 > 0xFF {
            return Err(Error::Malformed(format!(
                "字符串过长，{}个码元超出长度前缀上限",
                units.len()
            )));
        }
        self.write_u8((units.len() + 1) as u8)?;
        for u in &units {
            self.write_u16::<LittleEndian>(*u)?;
        }
        self.write_u16::<LittleEndian>(0)?;
        Ok(())
    }
}

impl<T: WriteBytesExt> PtpWrite for T {}

/// 由DataTypeCode标记的PTP属性值
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, PartialEq)]
pub enum PtpDataType {
    UNDEF,
    INT8(i8),
    UINT8(u8),
    INT16(i16),
    UINT16(u16),
    INT32(i32),
    UINT32(u32),
    INT64(i64),
    UINT64(u64),
    INT128(i128),
    UINT128(u128),
    AINT8(Vec<i8>),
    AUINT8(Vec<u8>),
    AINT16(Vec<i16>),
    AUINT16(Vec<u16>),
    AINT32(Vec<i32>),
    AUINT32(Vec<u32>),
    AINT64(Vec<i64>),
    AUINT64(Vec<u64>),
    AINT128(Vec<i128>),
    AUINT128(Vec<u128>),
    STR(String),
}

impl PtpDataType {
    /// 值对应的数据类型码
    pub fn type_code(&self) -> DataTypeCode {
        use self::PtpDataType::*;
        match self {
            UNDEF => DataType::Undefined,
            INT8(_) => DataType::Int8,
            UINT8(_) => DataType::Uint8,
            INT16(_) => DataType::Int16,
            UINT16(_) => DataType::Uint16,
            INT32(_) => DataType::Int32,
            UINT32(_) => DataType::Uint32,
            INT64(_) => DataType::Int64,
            UINT64(_) => DataType::Uint64,
            INT128(_) => DataType::Int128,
            UINT128(_) => DataType::Uint128,
            AINT8(_) => DataType::AInt8,
            AUINT8(_) => DataType::AUint8,
            AINT16(_) => DataType::AInt16,
            AUINT16(_) => DataType::AUint16,
            AINT32(_) => DataType::AInt32,
            AUINT32(_) => DataType::AUint32,
            AINT64(_) => DataType::AInt64,
            AUINT64(_) => DataType::AUint64,
            AINT128(_) => DataType::AInt128,
            AUINT128(_) => DataType::AUint128,
            STR(_) => DataType::Str,
        }
    }

    /// 将值编码为字节序列
    pub fn encode(&self) -> Vec<u8> {
        use self::PtpDataType::*;
        let mut out = vec![];
        match self {
            UNDEF => {}
            &INT8(val) => {
                out.write_ptp_i8(val).ok();
            }
            &UINT8(val) => {
                out.write_ptp_u8(val).ok();
            }
            &INT16(val) => {
                out.write_ptp_i16(val).ok();
            }
            &UINT16(val) => {
                out.write_ptp_u16(val).ok();
            }
            &INT32(val) => {
                out.write_ptp_i32(val).ok();
            }
            &UINT32(val) => {
                out.write_ptp_u32(val).ok();
            }
            &INT64(val) => {
                out.write_ptp_i64(val).ok();
            }
            &UINT64(val) => {
                out.write_ptp_u64(val).ok();
            }
            &INT128(val) => {
                out.write_ptp_i128(val).ok();
            }
            &UINT128(val) => {
                out.write_ptp_u128(val).ok();
            }
            AINT8(val) => {
                out.write_ptp_vec(val, |w, v| w.write_ptp_i8(*v)).ok();
            }
            AUINT8(val) => {
                out.write_ptp_vec(val, |w, v| w.write_ptp_u8(*v)).ok();
            }
            AINT16(val) => {
                out.write_ptp_vec(val, |w, v| w.write_ptp_i16(*v)).ok();
            }
            AUINT16(val) => {
                out.write_ptp_vec(val, |w, v| w.write_ptp_u16(*v)).ok();
            }
            AINT32(val) => {
                out.write_ptp_vec(val, |w, v| w.write_ptp_i32(*v)).ok();
            }
            AUINT32(val) => {
                out.write_ptp_vec(val, |w, v| w.write_ptp_u32(*v)).ok();
            }
            AINT64(val) => {
                out.write_ptp_vec(val, |w, v| w.write_ptp_i64(*v)).ok();
            }
            AUINT64(val) => {
                out.write_ptp_vec(val, |w, v| w.write_ptp_u64(*v)).ok();
            }
            AINT128(val) => {
                out.write_ptp_vec(val, |w, v| w.write_ptp_i128(*v)).ok();
            }
            AUINT128(val) => {
                out.write_ptp_vec(val, |w, v| w.write_ptp_u128(*v)).ok();
            }
            STR(val) => {
                out.write_ptp_str(val).ok();
            }
        }
        out
    }

    /// 根据数据类型码从数据流中读取值，未知类型码按格式错误处理
    pub fn read_type<T: PtpRead>(kind: DataTypeCode, reader: &mut T) -> Result<PtpDataType, Error> {
        use self::PtpDataType::*;
        Ok(match kind {
            DataType::Int8 => INT8(reader.read_ptp_i8()?),
            DataType::Uint8 => UINT8(reader.read_ptp_u8()?),
            DataType::Int16 => INT16(reader.read_ptp_i16()?),
            DataType::Uint16 => UINT16(reader.read_ptp_u16()?),
            DataType::Int32 => INT32(reader.read_ptp_i32()?),
            DataType::Uint32 => UINT32(reader.read_ptp_u32()?),
            DataType::Int64 => INT64(reader.read_ptp_i64()?),
            DataType::Uint64 => UINT64(reader.read_ptp_u64()?),
            DataType::Int128 => INT128(reader.read_ptp_i128()?),
            DataType::Uint128 => UINT128(reader.read_ptp_u128()?),
            DataType::AInt8 => AINT8(reader.read_ptp_i8_vec()?),
            DataType::AUint8 => AUINT8(reader.read_ptp_u8_vec()?),
            DataType::AInt16 => AINT16(reader.read_ptp_i16_vec()?),
            DataType::AUint16 => AUINT16(reader.read_ptp_u16_vec()?),
            DataType::AInt32 => AINT32(reader.read_ptp_i32_vec()?),
            DataType::AUint32 => AUINT32(reader.read_ptp_u32_vec()?),
            DataType::AInt64 => AINT64(reader.read_ptp_i64_vec()?),
            DataType::AUint64 => AUINT64(reader.read_ptp_u64_vec()?),
            DataType::AInt128 => AINT128(reader.read_ptp_i128_vec()?),
            DataType::AUint128 => AUINT128(reader.read_ptp_u128_vec()?),
            DataType::Str => STR(reader.read_ptp_str()?),
            _ => {
                return Err(Error::Malformed(format!(
                    "未知的数据类型代码 0x{:04x}",
                    kind
                )))
            }
        })
    }
}

impl From<i8> for PtpDataType {
    fn from(value: i8) -> Self {
        PtpDataType::INT8(value)
    }
}

impl From<u8> for PtpDataType {
    fn from(value: u8) -> Self {
        PtpDataType::UINT8(value)
    }
}

impl From<i16> for PtpDataType {
    fn from(value: i16) -> Self {
        PtpDataType::INT16(value)
    }
}

impl From<u16> for PtpDataType {
    fn from(value: u16) -> Self {
        PtpDataType::UINT16(value)
    }
}

impl From<i32> for PtpDataType {
    fn from(value: i32) -> Self {
        PtpDataType::INT32(value)
    }
}

impl From<u32> for PtpDataType {
    fn from(value: u32) -> Self {
        PtpDataType::UINT32(value)
    }
}

impl From<i64> for PtpDataType {
    fn from(value: i64) -> Self {
        PtpDataType::INT64(value)
    }
}

impl From<u64> for PtpDataType {
    fn from(value: u64) -> Self {
        PtpDataType::UINT64(value)
    }
}

impl<'a> From<&'a str> for PtpDataType {
    fn from(value: &'a str) -> Self {
        PtpDataType::STR(value.to_owned())
    }
}

impl From<String> for PtpDataType {
    fn from(value: String) -> Self {
        PtpDataType::STR(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_roundtrip() {
        let mut buf = vec![];
        buf.write_ptp_u16(0xDC07).unwrap();
        buf.write_ptp_u32(0xDEAD_BEEF).unwrap();
        buf.write_ptp_u64(0x0102_0304_0506_0708).unwrap();
        buf.write_ptp_i32(-5).unwrap();

        let mut cur = Cursor::new(buf);
        assert_eq!(cur.read_ptp_u16().unwrap(), 0xDC07);
        assert_eq!(cur.read_ptp_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(cur.read_ptp_u64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(cur.read_ptp_i32().unwrap(), -5);
        cur.expect_end().unwrap();
    }

    #[test]
    fn integers_are_little_endian() {
        let mut buf = vec![];
        buf.write_ptp_u32(0x1002).unwrap();
        assert_eq!(buf, [0x02, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn str_roundtrip() {
        let mut buf = vec![];
        buf.write_ptp_str("DCIM").unwrap();
        // 码元数5（含null），之后是UTF-16LE内容与终止符
        assert_eq!(buf[0], 5);
        assert_eq!(buf.len(), 1 + 5 * 2);
        assert_eq!(&buf[buf.len() - 2..], &[0, 0]);

        let mut cur = Cursor::new(buf);
        assert_eq!(cur.read_ptp_str().unwrap(), "DCIM");
        cur.expect_end().unwrap();
    }

    #[test]
    fn empty_str_is_single_zero() {
        let mut buf = vec![];
        buf.write_ptp_str("").unwrap();
        assert_eq!(buf, [0]);

        let mut cur = Cursor::new(buf);
        assert_eq!(cur.read_ptp_str().unwrap(), "");
    }

    #[test]
    fn str_missing_terminator_is_malformed() {
        // 计数2：一个'a'码元加null，但结尾码元不是null
        let buf = vec![2, b'a', 0, b'b', 0];
        let mut cur = Cursor::new(buf);
        match cur.read_ptp_str() {
            Err(Error::Malformed(_)) => {}
            other => panic!("预期格式错误，得到 {:?}", other),
        }
    }

    #[test]
    fn str_truncated_is_malformed() {
        let buf = vec![4, b'a', 0];
        let mut cur = Cursor::new(buf);
        match cur.read_ptp_str() {
            Err(Error::Malformed(_)) => {}
            other => panic!("预期格式错误，得到 {:?}", other),
        }
    }

    #[test]
    fn vec_roundtrip() {
        let mut buf = vec![];
        buf.write_ptp_u16_vec(&[0x1001, 0x1002, 0x9805]).unwrap();

        let mut cur = Cursor::new(buf);
        assert_eq!(cur.read_ptp_u16_vec().unwrap(), vec![0x1001, 0x1002, 0x9805]);
        cur.expect_end().unwrap();
    }

    #[test]
    fn datatype_roundtrip_all_kinds() {
        use super::PtpDataType::*;
        let values = vec![
            INT8(-1),
            UINT8(0xFF),
            INT16(-2),
            UINT16(0xDC04),
            INT32(-3),
            UINT32(42),
            INT64(-4),
            UINT64(u64::MAX),
            INT128(-5),
            UINT128(u128::MAX),
            AINT8(vec![-1, 1]),
            AUINT8(vec![1, 2, 3]),
            AINT16(vec![-7]),
            AUINT16(vec![7, 8]),
            AINT32(vec![-9]),
            AUINT32(vec![9]),
            AINT64(vec![-10]),
            AUINT64(vec![10]),
            AINT128(vec![-11]),
            AUINT128(vec![11]),
            STR("hello".into()),
        ];
        for v in values {
            let encoded = v.encode();
            let mut cur = Cursor::new(encoded);
            let decoded = PtpDataType::read_type(v.type_code(), &mut cur).unwrap();
            assert_eq!(decoded, v);
            cur.expect_end().unwrap();
        }
    }

    #[test]
    fn unknown_datatype_code_is_malformed() {
        let mut cur = Cursor::new(vec![1, 2, 3, 4]);
        match PtpDataType::read_type(0x1234, &mut cur) {
            Err(Error::Malformed(_)) => {}
            other => panic!("预期格式错误，得到 {:?}", other),
        }
    }

    #[test]
    fn expect_end_rejects_leftover() {
        let mut cur = Cursor::new(vec![1, 0, 0, 0, 9]);
        cur.read_ptp_u32().unwrap();
        assert!(cur.expect_end().is_err());
    }
}
