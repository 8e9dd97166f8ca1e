// MTP协议核心模块 - 会话状态机、容器封包、对象流与负载编解码
pub mod container;
pub mod data_types;
pub mod device_info;
pub mod error;
pub mod object_stream;
pub mod property_list;
pub mod session;
pub mod standard_codes;
pub mod usb_transport;

// 重导出常用类型
pub use container::{ContainerInfo, CONTAINER_HEADER_SIZE, DATA_LENGTH_UNKNOWN};
pub use data_types::{PtpDataType, PtpRead, PtpWrite};
pub use device_info::{PtpDeviceInfo, PtpObjectInfo, PtpPropInfo, PtpStorageInfo};
pub use error::{Error, TransportError};
pub use object_stream::{
    ByteArrayInputStream, ByteArrayOutputStream, CancellationToken, FileInputStream,
    FileOutputStream, FixedSizeInputStream, FixedSizeOutputStream, JoinedInputStream,
    JoinedOutputStream, ObjectInputStream, ObjectOutputStream,
};
pub use property_list::parse_object_prop_list;
pub use session::{reserved, PtpEvent, Session, SessionState};
pub use standard_codes::ContainerType;
pub use usb_transport::{RusbChannel, UsbChannel, DEFAULT_TRANSFER_TIMEOUT};
