#![allow(non_snake_case)]

// PTP/MTP协议代码表 - 容器类型、操作码、响应码、对象属性码、数据类型码

/// 容器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ContainerType {
    Command = 1,  // 命令容器
    Data = 2,     // 数据容器
    Response = 3, // 响应容器
    Event = 4,    // 事件容器
}

impl ContainerType {
    /// 从u16值转换为ContainerType枚举
    pub fn from_u16(v: u16) -> Option<ContainerType> {
        use self::ContainerType::*;
        match v {
            1 => Some(Command),
            2 => Some(Data),
            3 => Some(Response),
            4 => Some(Event),
            _ => None,
        }
    }
}

/// 响应码类型
pub type ResponseCode = u16;

/// 标准PTP/MTP响应码定义
#[allow(non_upper_case_globals)]
pub mod StandardResponseCode {
    use super::ResponseCode;

    pub const Undefined: ResponseCode = 0x2000;
    pub const Ok: ResponseCode = 0x2001;
    pub const GeneralError: ResponseCode = 0x2002;
    pub const SessionNotOpen: ResponseCode = 0x2003;
    pub const InvalidTransactionId: ResponseCode = 0x2004;
    pub const OperationNotSupported: ResponseCode = 0x2005;
    pub const ParameterNotSupported: ResponseCode = 0x2006;
    pub const IncompleteTransfer: ResponseCode = 0x2007;
    pub const InvalidStorageId: ResponseCode = 0x2008;
    pub const InvalidObjectHandle: ResponseCode = 0x2009;
    pub const DevicePropNotSupported: ResponseCode = 0x200A;
    pub const InvalidObjectFormatCode: ResponseCode = 0x200B;
    pub const StoreFull: ResponseCode = 0x200C;
    pub const ObjectWriteProtected: ResponseCode = 0x200D;
    pub const StoreReadOnly: ResponseCode = 0x200E;
    pub const AccessDenied: ResponseCode = 0x200F;
    pub const NoThumbnailPresent: ResponseCode = 0x2010;
    pub const SelfTestFailed: ResponseCode = 0x2011;
    pub const PartialDeletion: ResponseCode = 0x2012;
    pub const StoreNotAvailable: ResponseCode = 0x2013;
    pub const SpecificationByFormatUnsupported: ResponseCode = 0x2014;
    pub const NoValidObjectInfo: ResponseCode = 0x2015;
    pub const InvalidCodeFormat: ResponseCode = 0x2016;
    pub const UnknownVendorCode: ResponseCode = 0x2017;
    pub const CaptureAlreadyTerminated: ResponseCode = 0x2018;
    pub const DeviceBusy: ResponseCode = 0x2019;
    pub const InvalidParentObject: ResponseCode = 0x201A;
    pub const InvalidDevicePropFormat: ResponseCode = 0x201B;
    pub const InvalidDevicePropValue: ResponseCode = 0x201C;
    pub const InvalidParameter: ResponseCode = 0x201D;
    pub const SessionAlreadyOpen: ResponseCode = 0x201E;
    pub const TransactionCancelled: ResponseCode = 0x201F;
    pub const SpecificationOfDestinationUnsupported: ResponseCode = 0x2020;
    // MTP扩展响应码
    pub const InvalidObjectPropCode: ResponseCode = 0xA801;
    pub const InvalidObjectPropFormat: ResponseCode = 0xA802;
    pub const InvalidObjectPropValue: ResponseCode = 0xA803;
    pub const InvalidObjectReference: ResponseCode = 0xA804;
    pub const GroupNotSupported: ResponseCode = 0xA805;
    pub const InvalidDataset: ResponseCode = 0xA806;
    pub const ObjectTooLarge: ResponseCode = 0xA809;

    /// 根据响应码返回对应的名称
    pub fn name(v: ResponseCode) -> Option<&'static str> {
        match v {
            Undefined => Some("未定义"),
            Ok => Some("成功"),
            GeneralError => Some("一般错误"),
            SessionNotOpen => Some("会话未打开"),
            InvalidTransactionId => Some("无效的事务ID"),
            OperationNotSupported => Some("不支持的操作"),
            ParameterNotSupported => Some("不支持的参数"),
            IncompleteTransfer => Some("传输不完整"),
            InvalidStorageId => Some("无效的存储ID"),
            InvalidObjectHandle => Some("无效的对象句柄"),
            DevicePropNotSupported => Some("不支持的设备属性"),
            InvalidObjectFormatCode => Some("无效的对象格式代码"),
            StoreFull => Some("存储已满"),
            ObjectWriteProtected => Some("对象写保护"),
            StoreReadOnly => Some("存储只读"),
            AccessDenied => Some("访问被拒绝"),
            NoThumbnailPresent => Some("没有缩略图"),
            SelfTestFailed => Some("自检失败"),
            PartialDeletion => Some("部分删除"),
            StoreNotAvailable => Some("存储不可用"),
            SpecificationByFormatUnsupported => Some("不支持按格式指定"),
            NoValidObjectInfo => Some("无有效对象信息"),
            InvalidCodeFormat => Some("无效的代码格式"),
            UnknownVendorCode => Some("未知的厂商代码"),
            CaptureAlreadyTerminated => Some("捕获已终止"),
            DeviceBusy => Some("设备忙"),
            InvalidParentObject => Some("无效的父对象"),
            InvalidDevicePropFormat => Some("无效的设备属性格式"),
            InvalidDevicePropValue => Some("无效的设备属性值"),
            InvalidParameter => Some("无效的参数"),
            SessionAlreadyOpen => Some("会话已打开"),
            TransactionCancelled => Some("事务已取消"),
            SpecificationOfDestinationUnsupported => Some("不支持指定目标"),
            InvalidObjectPropCode => Some("无效的对象属性代码"),
            InvalidObjectPropFormat => Some("无效的对象属性格式"),
            InvalidObjectPropValue => Some("无效的对象属性值"),
            InvalidObjectReference => Some("无效的对象引用"),
            GroupNotSupported => Some("不支持的属性分组"),
            InvalidDataset => Some("无效的数据集"),
            ObjectTooLarge => Some("对象过大"),
            _ => None,
        }
    }
}

/// 操作码类型
pub type CommandCode = u16;

/// 标准PTP/MTP操作码定义
#[allow(non_upper_case_globals)]
pub mod StandardCommandCode {
    use super::CommandCode;

    pub const Undefined: CommandCode = 0x1000;
    pub const GetDeviceInfo: CommandCode = 0x1001;
    pub const OpenSession: CommandCode = 0x1002;
    pub const CloseSession: CommandCode = 0x1003;
    pub const GetStorageIDs: CommandCode = 0x1004;
    pub const GetStorageInfo: CommandCode = 0x1005;
    pub const GetNumObjects: CommandCode = 0x1006;
    pub const GetObjectHandles: CommandCode = 0x1007;
    pub const GetObjectInfo: CommandCode = 0x1008;
    pub const GetObject: CommandCode = 0x1009;
    pub const GetThumb: CommandCode = 0x100A;
    pub const DeleteObject: CommandCode = 0x100B;
    pub const SendObjectInfo: CommandCode = 0x100C;
    pub const SendObject: CommandCode = 0x100D;
    pub const FormatStore: CommandCode = 0x100F;
    pub const ResetDevice: CommandCode = 0x1010;
    pub const SetObjectProtection: CommandCode = 0x1012;
    pub const PowerDown: CommandCode = 0x1013;
    pub const GetDevicePropDesc: CommandCode = 0x1014;
    pub const GetDevicePropValue: CommandCode = 0x1015;
    pub const SetDevicePropValue: CommandCode = 0x1016;
    pub const ResetDevicePropValue: CommandCode = 0x1017;
    pub const MoveObject: CommandCode = 0x1019;
    pub const CopyObject: CommandCode = 0x101A;
    pub const GetPartialObject: CommandCode = 0x101B;
    // MTP扩展操作码
    pub const GetObjectPropsSupported: CommandCode = 0x9801;
    pub const GetObjectPropDesc: CommandCode = 0x9802;
    pub const GetObjectPropValue: CommandCode = 0x9803;
    pub const SetObjectPropValue: CommandCode = 0x9804;
    pub const GetObjectPropList: CommandCode = 0x9805;

    /// 根据操作码返回对应的名称
    pub fn name(v: CommandCode) -> Option<&'static str> {
        match v {
            Undefined => Some("未定义"),
            GetDeviceInfo => Some("获取设备信息"),
            OpenSession => Some("打开会话"),
            CloseSession => Some("关闭会话"),
            GetStorageIDs => Some("获取存储ID"),
            GetStorageInfo => Some("获取存储信息"),
            GetNumObjects => Some("获取对象数量"),
            GetObjectHandles => Some("获取对象句柄"),
            GetObjectInfo => Some("获取对象信息"),
            GetObject => Some("获取对象"),
            GetThumb => Some("获取缩略图"),
            DeleteObject => Some("删除对象"),
            SendObjectInfo => Some("发送对象信息"),
            SendObject => Some("发送对象"),
            FormatStore => Some("格式化存储"),
            ResetDevice => Some("重置设备"),
            SetObjectProtection => Some("设置对象保护"),
            PowerDown => Some("关机"),
            GetDevicePropDesc => Some("获取设备属性描述"),
            GetDevicePropValue => Some("获取设备属性值"),
            SetDevicePropValue => Some("设置设备属性值"),
            ResetDevicePropValue => Some("重置设备属性值"),
            MoveObject => Some("移动对象"),
            CopyObject => Some("复制对象"),
            GetPartialObject => Some("获取部分对象"),
            GetObjectPropsSupported => Some("获取支持的对象属性"),
            GetObjectPropDesc => Some("获取对象属性描述"),
            GetObjectPropValue => Some("获取对象属性值"),
            SetObjectPropValue => Some("设置对象属性值"),
            GetObjectPropList => Some("获取对象属性列表"),
            _ => None,
        }
    }
}

/// 事件码类型
pub type EventCode = u16;

/// 标准PTP/MTP事件码定义
#[allow(non_upper_case_globals)]
pub mod StandardEventCode {
    use super::EventCode;

    pub const Undefined: EventCode = 0x4000;
    pub const CancelTransaction: EventCode = 0x4001;
    pub const ObjectAdded: EventCode = 0x4002;
    pub const ObjectRemoved: EventCode = 0x4003;
    pub const StoreAdded: EventCode = 0x4004;
    pub const StoreRemoved: EventCode = 0x4005;
    pub const DevicePropChanged: EventCode = 0x4006;
    pub const ObjectInfoChanged: EventCode = 0x4007;
    pub const DeviceInfoChanged: EventCode = 0x4008;
    pub const RequestObjectTransfer: EventCode = 0x4009;
    pub const StoreFull: EventCode = 0x400A;
    pub const StorageInfoChanged: EventCode = 0x400C;
    pub const ObjectPropChanged: EventCode = 0xC801;

    /// 根据事件码返回对应的名称
    pub fn name(v: EventCode) -> Option<&'static str> {
        match v {
            Undefined => Some("未定义"),
            CancelTransaction => Some("取消事务"),
            ObjectAdded => Some("对象已添加"),
            ObjectRemoved => Some("对象已移除"),
            StoreAdded => Some("存储已添加"),
            StoreRemoved => Some("存储已移除"),
            DevicePropChanged => Some("设备属性已变更"),
            ObjectInfoChanged => Some("对象信息已变更"),
            DeviceInfoChanged => Some("设备信息已变更"),
            RequestObjectTransfer => Some("请求对象传输"),
            StoreFull => Some("存储已满"),
            StorageInfoChanged => Some("存储信息已变更"),
            ObjectPropChanged => Some("对象属性已变更"),
            _ => None,
        }
    }
}

/// 对象属性码类型
pub type ObjectPropCode = u16;

/// MTP对象属性码定义
#[allow(non_upper_case_globals)]
pub mod ObjectProperty {
    use super::ObjectPropCode;

    pub const StorageId: ObjectPropCode = 0xDC01;
    pub const ObjectFormat: ObjectPropCode = 0xDC02;
    pub const ProtectionStatus: ObjectPropCode = 0xDC03;
    /// 64位对象大小，大对象的真实大小从这里取（ObjectInfo中的32位字段放不下）
    pub const ObjectSize: ObjectPropCode = 0xDC04;
    pub const ObjectFileName: ObjectPropCode = 0xDC07;
    pub const DateCreated: ObjectPropCode = 0xDC08;
    pub const DateModified: ObjectPropCode = 0xDC09;
    pub const ParentObject: ObjectPropCode = 0xDC0B;
    pub const PersistentUniqueObjectId: ObjectPropCode = 0xDC41;
    pub const Name: ObjectPropCode = 0xDC44;

    /// 根据属性码返回对应的名称
    pub fn name(v: ObjectPropCode) -> Option<&'static str> {
        match v {
            StorageId => Some("存储ID"),
            ObjectFormat => Some("对象格式"),
            ProtectionStatus => Some("保护状态"),
            ObjectSize => Some("对象大小"),
            ObjectFileName => Some("文件名"),
            DateCreated => Some("创建日期"),
            DateModified => Some("修改日期"),
            ParentObject => Some("父对象"),
            PersistentUniqueObjectId => Some("持久对象标识"),
            Name => Some("名称"),
            _ => None,
        }
    }
}

/// 对象格式码类型
pub type ObjectFormatCode = u16;

/// 常用对象格式码定义
#[allow(non_upper_case_globals)]
pub mod ObjectFormat {
    use super::ObjectFormatCode;

    pub const Undefined: ObjectFormatCode = 0x3000;
    /// 关联对象（目录）
    pub const Association: ObjectFormatCode = 0x3001;
    pub const Text: ObjectFormatCode = 0x3004;
    pub const Html: ObjectFormatCode = 0x3005;
    pub const Wav: ObjectFormatCode = 0x3008;
    pub const Mp3: ObjectFormatCode = 0x3009;
    pub const Avi: ObjectFormatCode = 0x300A;
    pub const Mpeg: ObjectFormatCode = 0x300B;
    pub const Asf: ObjectFormatCode = 0x300C;
    pub const ExifJpeg: ObjectFormatCode = 0x3801;
    pub const Bmp: ObjectFormatCode = 0x3804;
    pub const Gif: ObjectFormatCode = 0x3807;
    pub const Png: ObjectFormatCode = 0x380B;
    pub const Tiff: ObjectFormatCode = 0x380D;
    pub const Wma: ObjectFormatCode = 0xB901;
    pub const Ogg: ObjectFormatCode = 0xB902;
    pub const Aac: ObjectFormatCode = 0xB903;
    pub const Flac: ObjectFormatCode = 0xB906;
    pub const Wmv: ObjectFormatCode = 0xB981;
    pub const Mp4: ObjectFormatCode = 0xB982;
}

/// 数据类型码类型
pub type DataTypeCode = u16;

/// PTP数据类型码定义，选择属性值的编码方式
#[allow(non_upper_case_globals)]
pub mod DataType {
    use super::DataTypeCode;

    pub const Undefined: DataTypeCode = 0x0000;
    pub const Int8: DataTypeCode = 0x0001;
    pub const Uint8: DataTypeCode = 0x0002;
    pub const Int16: DataTypeCode = 0x0003;
    pub const Uint16: DataTypeCode = 0x0004;
    pub const Int32: DataTypeCode = 0x0005;
    pub const Uint32: DataTypeCode = 0x0006;
    pub const Int64: DataTypeCode = 0x0007;
    pub const Uint64: DataTypeCode = 0x0008;
    pub const Int128: DataTypeCode = 0x0009;
    pub const Uint128: DataTypeCode = 0x000A;
    pub const AInt8: DataTypeCode = 0x4001;
    pub const AUint8: DataTypeCode = 0x4002;
    pub const AInt16: DataTypeCode = 0x4003;
    pub const AUint16: DataTypeCode = 0x4004;
    pub const AInt32: DataTypeCode = 0x4005;
    pub const AUint32: DataTypeCode = 0x4006;
    pub const AInt64: DataTypeCode = 0x4007;
    pub const AUint64: DataTypeCode = 0x4008;
    pub const AInt128: DataTypeCode = 0x4009;
    pub const AUint128: DataTypeCode = 0x400A;
    pub const Str: DataTypeCode = 0xFFFF;
}
