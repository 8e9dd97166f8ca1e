#![allow(non_snake_case)]

// 类型化负载记录 - DeviceInfo/ObjectInfo/StorageInfo/设备属性描述的编解码
use std::io::Cursor;

use crate::mtp::data_types::{PtpDataType, PtpRead, PtpWrite};
use crate::mtp::error::Error;
use crate::mtp::standard_codes::ObjectFormat;

/// 大对象在ObjectInfo的32位大小字段中的占位值，
/// 真实大小需查询64位的ObjectSize对象属性
pub const COMPRESSED_SIZE_UNKNOWN: u32 = 0xFFFF_FFFF;

/// 设备信息，每个会话解析一次并缓存
#[derive(Debug, Clone)]
pub struct PtpDeviceInfo {
    pub Version: u16,                        // PTP版本号
    pub VendorExID: u32,                     // 厂商扩展ID
    pub VendorExVersion: u16,                // 厂商扩展版本
    pub VendorExtensionDesc: String,         // 厂商扩展描述
    pub FunctionalMode: u16,                 // 功能模式
    pub OperationsSupported: Vec<u16>,       // 支持的操作列表
    pub EventsSupported: Vec<u16>,           // 支持的事件列表
    pub DevicePropertiesSupported: Vec<u16>, // 支持的设备属性列表
    pub CaptureFormats: Vec<u16>,            // 支持的捕获格式列表
    pub ImageFormats: Vec<u16>,              // 支持的回放格式列表
    pub Manufacturer: String,                // 制造商
    pub Model: String,                       // 型号
    pub DeviceVersion: String,               // 设备版本
    pub SerialNumber: String,                // 序列号
}

impl PtpDeviceInfo {
    /// 从字节缓冲区解码设备信息
    pub fn decode(buf: &[u8]) -> Result<PtpDeviceInfo, Error> {
        let mut cur = Cursor::new(buf);

        let info = PtpDeviceInfo {
            Version: cur.read_ptp_u16()?,
            VendorExID: cur.read_ptp_u32()?,
            VendorExVersion: cur.read_ptp_u16()?,
            VendorExtensionDesc: cur.read_ptp_str()?,
            FunctionalMode: cur.read_ptp_u16()?,
            OperationsSupported: cur.read_ptp_u16_vec()?,
            EventsSupported: cur.read_ptp_u16_vec()?,
            DevicePropertiesSupported: cur.read_ptp_u16_vec()?,
            CaptureFormats: cur.read_ptp_u16_vec()?,
            ImageFormats: cur.read_ptp_u16_vec()?,
            Manufacturer: cur.read_ptp_str()?,
            Model: cur.read_ptp_str()?,
            DeviceVersion: cur.read_ptp_str()?,
            SerialNumber: cur.read_ptp_str()?,
        };
        cur.expect_end()?;
        Ok(info)
    }

    /// 编码为字节序列，与decode对称
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![];
        out.write_ptp_u16(self.Version).ok();
        out.write_ptp_u32(self.VendorExID).ok();
        out.write_ptp_u16(self.VendorExVersion).ok();
        out.write_ptp_str(&self.VendorExtensionDesc).ok();
        out.write_ptp_u16(self.FunctionalMode).ok();
        out.write_ptp_u16_vec(&self.OperationsSupported).ok();
        out.write_ptp_u16_vec(&self.EventsSupported).ok();
        out.write_ptp_u16_vec(&self.DevicePropertiesSupported).ok();
        out.write_ptp_u16_vec(&self.CaptureFormats).ok();
        out.write_ptp_u16_vec(&self.ImageFormats).ok();
        out.write_ptp_str(&self.Manufacturer).ok();
        out.write_ptp_str(&self.Model).ok();
        out.write_ptp_str(&self.DeviceVersion).ok();
        out.write_ptp_str(&self.SerialNumber).ok();
        out
    }
}

/// 对象信息记录
#[derive(Debug, Clone, PartialEq)]
pub struct PtpObjectInfo {
    pub StorageID: u32,     // 所在存储ID
    pub ObjectFormat: u16,  // 对象格式
    pub ProtectionStatus: u16, // 保护状态
    /// 压缩后大小；超出32位表示范围的对象为COMPRESSED_SIZE_UNKNOWN
    pub ObjectCompressedSize: u32,
    pub ThumbFormat: u16,          // 缩略图格式
    pub ThumbCompressedSize: u32,  // 缩略图压缩后大小
    pub ThumbPixWidth: u32,        // 缩略图宽度(像素)
    pub ThumbPixHeight: u32,       // 缩略图高度(像素)
    pub ImagePixWidth: u32,        // 图像宽度(像素)
    pub ImagePixHeight: u32,       // 图像高度(像素)
    pub ImageBitDepth: u32,        // 图像位深度
    pub ParentObject: u32,         // 父对象句柄，位于根目录时为0
    pub AssociationType: u16,      // 关联类型
    pub AssociationDesc: u32,      // 关联描述
    pub SequenceNumber: u32,       // 序列号
    pub Filename: String,          // 文件名
    pub CaptureDate: String,       // 捕获日期
    pub ModificationDate: String,  // 修改日期
    pub Keywords: String,          // 关键词
}

impl PtpObjectInfo {
    /// 从字节缓冲区解码对象信息
    pub fn decode(buf: &[u8]) -> Result<PtpObjectInfo, Error> {
        let mut cur = Cursor::new(buf);

        let info = PtpObjectInfo {
            StorageID: cur.read_ptp_u32()?,
            ObjectFormat: cur.read_ptp_u16()?,
            ProtectionStatus: cur.read_ptp_u16()?,
            ObjectCompressedSize: cur.read_ptp_u32()?,
            ThumbFormat: cur.read_ptp_u16()?,
            ThumbCompressedSize: cur.read_ptp_u32()?,
            ThumbPixWidth: cur.read_ptp_u32()?,
            ThumbPixHeight: cur.read_ptp_u32()?,
            ImagePixWidth: cur.read_ptp_u32()?,
            ImagePixHeight: cur.read_ptp_u32()?,
            ImageBitDepth: cur.read_ptp_u32()?,
            ParentObject: cur.read_ptp_u32()?,
            AssociationType: cur.read_ptp_u16()?,
            AssociationDesc: cur.read_ptp_u32()?,
            SequenceNumber: cur.read_ptp_u32()?,
            Filename: cur.read_ptp_str()?,
            CaptureDate: cur.read_ptp_str()?,
            ModificationDate: cur.read_ptp_str()?,
            Keywords: cur.read_ptp_str()?,
        };
        cur.expect_end()?;
        Ok(info)
    }

    /// 编码为SendObjectInfo的数据负载
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![];
        out.write_ptp_u32(self.StorageID).ok();
        out.write_ptp_u16(self.ObjectFormat).ok();
        out.write_ptp_u16(self.ProtectionStatus).ok();
        out.write_ptp_u32(self.ObjectCompressedSize).ok();
        out.write_ptp_u16(self.ThumbFormat).ok();
        out.write_ptp_u32(self.ThumbCompressedSize).ok();
        out.write_ptp_u32(self.ThumbPixWidth).ok();
        out.write_ptp_u32(self.ThumbPixHeight).ok();
        out.write_ptp_u32(self.ImagePixWidth).ok();
        out.write_ptp_u32(self.ImagePixHeight).ok();
        out.write_ptp_u32(self.ImageBitDepth).ok();
        out.write_ptp_u32(self.ParentObject).ok();
        out.write_ptp_u16(self.AssociationType).ok();
        out.write_ptp_u32(self.AssociationDesc).ok();
        out.write_ptp_u32(self.SequenceNumber).ok();
        out.write_ptp_str(&self.Filename).ok();
        out.write_ptp_str(&self.CaptureDate).ok();
        out.write_ptp_str(&self.ModificationDate).ok();
        out.write_ptp_str(&self.Keywords).ok();
        out
    }

    /// 以给定文件名和大小构造上传用的对象信息，其余字段为零值
    pub fn for_upload(filename: &str, format: u16, size: u64) -> PtpObjectInfo {
        PtpObjectInfo {
            StorageID: 0,
            ObjectFormat: format,
            ProtectionStatus: 0,
            ObjectCompressedSize: if size > COMPRESSED_SIZE_UNKNOWN as u64 - 1 {
                COMPRESSED_SIZE_UNKNOWN
            } else {
                size as u32
            },
            ThumbFormat: 0,
            ThumbCompressedSize: 0,
            ThumbPixWidth: 0,
            ThumbPixHeight: 0,
            ImagePixWidth: 0,
            ImagePixHeight: 0,
            ImageBitDepth: 0,
            ParentObject: 0,
            AssociationType: 0,
            AssociationDesc: 0,
            SequenceNumber: 0,
            Filename: filename.to_string(),
            CaptureDate: String::new(),
            ModificationDate: String::new(),
            Keywords: String::new(),
        }
    }

    /// 构造目录(关联对象)的对象信息
    pub fn for_directory(name: &str) -> PtpObjectInfo {
        let mut info = PtpObjectInfo::for_upload(name, ObjectFormat::Association, 0);
        info.AssociationType = 0x0001; // 通用文件夹
        info
    }
}

/// 存储信息记录
#[derive(Debug, Clone, PartialEq)]
pub struct PtpStorageInfo {
    pub StorageType: u16,           // 存储类型
    pub FilesystemType: u16,        // 文件系统类型
    pub AccessCapability: u16,      // 访问能力
    pub MaxCapacity: u64,           // 最大容量(字节)
    pub FreeSpaceInBytes: u64,      // 可用空间(字节)
    pub FreeSpaceInImages: u32,     // 可存储图像数量
    pub StorageDescription: String, // 存储描述
    pub VolumeLabel: String,        // 卷标
}

impl PtpStorageInfo {
    /// 从数据流中解码存储信息
    pub fn decode<T: PtpRead>(cur: &mut T) -> Result<PtpStorageInfo, Error> {
        Ok(PtpStorageInfo {
            StorageType: cur.read_ptp_u16()?,
            FilesystemType: cur.read_ptp_u16()?,
            AccessCapability: cur.read_ptp_u16()?,
            MaxCapacity: cur.read_ptp_u64()?,
            FreeSpaceInBytes: cur.read_ptp_u64()?,
            FreeSpaceInImages: cur.read_ptp_u32()?,
            StorageDescription: cur.read_ptp_str()?,
            VolumeLabel: cur.read_ptp_str()?,
        })
    }

    /// 编码为字节序列，与decode对称
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![];
        out.write_ptp_u16(self.StorageType).ok();
        out.write_ptp_u16(self.FilesystemType).ok();
        out.write_ptp_u16(self.AccessCapability).ok();
        out.write_ptp_u64(self.MaxCapacity).ok();
        out.write_ptp_u64(self.FreeSpaceInBytes).ok();
        out.write_ptp_u32(self.FreeSpaceInImages).ok();
        out.write_ptp_str(&self.StorageDescription).ok();
        out.write_ptp_str(&self.VolumeLabel).ok();
        out
    }
}

/// 设备属性描述的表单数据
#[derive(Debug)]
pub enum PtpFormData {
    None,
    Range {
        minValue: PtpDataType,
        maxValue: PtpDataType,
        step: PtpDataType,
    },
    Enumeration {
        array: Vec<PtpDataType>,
    },
}

/// 设备属性描述
#[derive(Debug)]
pub struct PtpPropInfo {
    pub PropertyCode: u16,          // 属性代码
    pub DataType: u16,              // 数据类型码
    pub GetSet: u8,                 // 读写权限(1=只读，2=读写)
    pub FactoryDefault: PtpDataType, // 出厂默认值
    pub Current: PtpDataType,       // 当前值
    pub Form: PtpFormData,          // 表单数据
}

impl PtpPropInfo {
    /// 从数据流中解码设备属性描述
    pub fn decode<T: PtpRead>(cur: &mut T) -> Result<PtpPropInfo, Error> {
        use byteorder::{LittleEndian, ReadBytesExt};

        let property_code = cur.read_u16::<LittleEndian>()?;
        let data_type = cur.read_u16::<LittleEndian>()?;
        let get_set = cur.read_u8()?;
        let factory_default = PtpDataType::read_type(data_type, cur)?;
        let current = PtpDataType::read_type(data_type, cur)?;
        let form = match cur.read_u8()? {
            0x01 => PtpFormData::Range {
                minValue: PtpDataType::read_type(data_type, cur)?,
                maxValue: PtpDataType::read_type(data_type, cur)?,
                step: PtpDataType::read_type(data_type, cur)?,
            },
            0x02 => PtpFormData::Enumeration {
                array: {
                    let len = cur.read_u16::<LittleEndian>()? as usize;
                    let mut arr = Vec::with_capacity(len);
                    for _ in 0..len {
                        arr.push(PtpDataType::read_type(data_type, cur)?);
                    }
                    arr
                },
            },
            _ => PtpFormData::None,
        };

        Ok(PtpPropInfo {
            PropertyCode: property_code,
            DataType: data_type,
            GetSet: get_set,
            FactoryDefault: factory_default,
            Current: current,
            Form: form,
        })
    }
}
