// 会话与事务引擎 - 命令/数据/响应三阶段状态机与流式对象传输
use std::io::{self, Cursor};
use std::time::Duration;

use log::{debug, error, info, trace};

use crate::mtp::container::{
    self, ContainerInfo, CONTAINER_HEADER_SIZE, DATA_LENGTH_UNKNOWN, MAX_COMMAND_PARAMS,
};
use crate::mtp::data_types::{PtpDataType, PtpRead};
use crate::mtp::device_info::{PtpDeviceInfo, PtpObjectInfo, PtpPropInfo, PtpStorageInfo};
use crate::mtp::error::{Error, TransportError};
use crate::mtp::object_stream::{
    ByteArrayInputStream, ByteArrayOutputStream, JoinedInputStream, ObjectInputStream,
    ObjectOutputStream,
};
use crate::mtp::standard_codes::{
    CommandCode, ContainerType, EventCode, ObjectPropCode, ObjectProperty, StandardCommandCode,
    StandardResponseCode,
};
use crate::mtp::usb_transport::{UsbChannel, DEFAULT_TRANSFER_TIMEOUT};

/// 对象与存储句柄的保留值
#[allow(non_upper_case_globals)]
pub mod reserved {
    /// 列目录时代表根目录的对象句柄
    pub const Root: u32 = 0xFFFF_FFFF;
    /// 根目录的父对象，即设备本身；对象信息中父对象为此值表示位于根目录
    pub const Device: u32 = 0x0000_0000;
    /// 覆盖设备上全部存储
    pub const AllStorages: u32 = 0xFFFF_FFFF;
    /// 由设备自行选择存储
    pub const AnyStorage: u32 = 0x0000_0000;
}

/// 发送数据阶段的分块大小，实际块长会对齐到端点包大小的整数倍
const SEND_CHUNK_SIZE: usize = 64 * 1024;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 尚未打开或已关闭
    Closed,
    /// 会话已建立，可以发起事务
    Open,
    /// 协议被破坏或传输中断，需要关闭后重新打开
    Faulted,
}

/// 从中断端点收到的设备事件
#[derive(Debug, Clone, PartialEq)]
pub struct PtpEvent {
    pub code: EventCode,
    pub tid: u32,
    pub params: Vec<u32>,
}

/// MTP会话
///
/// 独占持有USB通道；每个事务依次完成命令、可选数据、响应三个阶段，
/// 事务ID单调递增且三个阶段必须一致。&mut接收器保证了同一会话上
/// 同时至多一个事务在途。
pub struct Session<C: UsbChannel> {
    channel: C,
    session_id: u32,
    next_tid: u32,
    state: SessionState,
    device_info: Option<PtpDeviceInfo>,
    timeout: Duration,
}

#[allow(non_upper_case_globals)]
impl<C: UsbChannel> Session<C> {
    /// 列目录时代表根目录的对象句柄
    pub const Root: u32 = reserved::Root;
    /// 根目录的父对象，即设备本身
    pub const Device: u32 = reserved::Device;
    /// 覆盖设备上全部存储
    pub const AllStorages: u32 = reserved::AllStorages;
    /// 由设备自行选择存储
    pub const AnyStorage: u32 = reserved::AnyStorage;
}

impl<C: UsbChannel> Session<C> {
    /// 打开会话并缓存设备信息
    pub fn open(channel: C, session_id: u32) -> Result<Session<C>, Error> {
        Session::open_with_timeout(channel, session_id, DEFAULT_TRANSFER_TIMEOUT)
    }

    /// 以指定的传输超时打开会话
    pub fn open_with_timeout(
        channel: C,
        session_id: u32,
        timeout: Duration,
    ) -> Result<Session<C>, Error> {
        if session_id == 0 {
            return Err(Error::Protocol("会话ID必须非零".to_string()));
        }
        let mut session = Session {
            channel,
            session_id: 0,
            next_tid: 1,
            state: SessionState::Closed,
            device_info: None,
            timeout,
        };
        info!("打开会话 {}", session_id);
        let mut sink = ByteArrayOutputStream::new();
        session.transact_in(StandardCommandCode::OpenSession, &[session_id], &mut sink)?;
        session.state = SessionState::Open;
        session.session_id = session_id;

        let device_info = session.get_device_info()?;
        info!(
            "已连接设备: {} {} ({})",
            device_info.Manufacturer, device_info.Model, device_info.DeviceVersion
        );
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// 会话打开时缓存的设备信息
    pub fn device_info(&self) -> Option<&PtpDeviceInfo> {
        self.device_info.as_ref()
    }

    /// 设备是否支持给定操作，用于批量属性查询等功能判定
    pub fn operation_supported(&self, code: CommandCode) -> bool {
        self.device_info
            .as_ref()
            .map(|info| info.OperationsSupported.contains(&code))
            .unwrap_or(false)
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// 关闭会话，尽力而为
    pub fn close(&mut self) {
        if self.state == SessionState::Open {
            debug!("关闭会话 {}", self.session_id);
            let mut sink = ByteArrayOutputStream::new();
            if let Err(e) = self.transact_in(StandardCommandCode::CloseSession, &[], &mut sink) {
                debug!("关闭会话失败: {}", e);
            }
        }
        self.state = SessionState::Closed;
    }

    // ------------------------------------------------------------------
    // 类型化操作
    // ------------------------------------------------------------------

    /// 重新查询设备信息并刷新缓存；该操作在会话打开前后都被设备允许
    pub fn get_device_info(&mut self) -> Result<PtpDeviceInfo, Error> {
        self.ensure_not_faulted()?;
        let data = self.transact_bytes(StandardCommandCode::GetDeviceInfo, &[])?;
        let info = self.fatal_scope(|| PtpDeviceInfo::decode(&data))?;
        self.device_info = Some(info.clone());
        Ok(info)
    }

    /// 获取存储ID列表
    pub fn get_storage_ids(&mut self) -> Result<Vec<u32>, Error> {
        self.ensure_open()?;
        let data = self.transact_bytes(StandardCommandCode::GetStorageIDs, &[])?;
        self.fatal_scope(|| {
            let mut cur = Cursor::new(data);
            let ids = cur.read_ptp_u32_vec()?;
            cur.expect_end()?;
            Ok(ids)
        })
    }

    /// 获取存储信息
    pub fn get_storage_info(&mut self, storage: u32) -> Result<PtpStorageInfo, Error> {
        self.ensure_open()?;
        let data = self.transact_bytes(StandardCommandCode::GetStorageInfo, &[storage])?;
        self.fatal_scope(|| {
            let mut cur = Cursor::new(data);
            let storage_info = PtpStorageInfo::decode(&mut cur)?;
            cur.expect_end()?;
            Ok(storage_info)
        })
    }

    /// 获取对象句柄列表
    ///
    /// format为0时不过滤格式；parent为reserved::Root时列根目录，
    /// 为0时列存储内全部对象
    pub fn get_object_handles(
        &mut self,
        storage: u32,
        format: u16,
        parent: u32,
    ) -> Result<Vec<u32>, Error> {
        self.ensure_open()?;
        let data = self.transact_bytes(
            StandardCommandCode::GetObjectHandles,
            &[storage, format as u32, parent],
        )?;
        self.fatal_scope(|| {
            let mut cur = Cursor::new(data);
            let handles = cur.read_ptp_u32_vec()?;
            cur.expect_end()?;
            Ok(handles)
        })
    }

    /// 获取对象数量，结果由响应参数携带
    pub fn get_num_objects(
        &mut self,
        storage: u32,
        format: u16,
        parent: u32,
    ) -> Result<u32, Error> {
        self.ensure_open()?;
        let params = self.transact_none(
            StandardCommandCode::GetNumObjects,
            &[storage, format as u32, parent],
        )?;
        self.fatal_scope(|| {
            params
                .first()
                .copied()
                .ok_or_else(|| Error::Malformed("GetNumObjects响应缺少参数".to_string()))
        })
    }

    /// 获取对象信息
    pub fn get_object_info(&mut self, handle: u32) -> Result<PtpObjectInfo, Error> {
        self.ensure_open()?;
        let data = self.transact_bytes(StandardCommandCode::GetObjectInfo, &[handle])?;
        self.fatal_scope(|| PtpObjectInfo::decode(&data))
    }

    /// 下载对象，负载流式写入给定的输出流
    ///
    /// 非Ok响应时输出流中已写入的部分不会回滚，由调用方处置
    pub fn get_object(
        &mut self,
        handle: u32,
        sink: &mut dyn ObjectOutputStream,
    ) -> Result<(), Error> {
        self.ensure_open()?;
        debug!("下载对象 0x{:08x}", handle);
        self.transact_in(StandardCommandCode::GetObject, &[handle], sink)
            .map(|_| ())
    }

    /// 获取对象的一个分片
    pub fn get_partial_object(
        &mut self,
        handle: u32,
        offset: u32,
        max_bytes: u32,
    ) -> Result<Vec<u8>, Error> {
        self.ensure_open()?;
        self.transact_bytes(
            StandardCommandCode::GetPartialObject,
            &[handle, offset, max_bytes],
        )
    }

    /// 获取对象缩略图
    pub fn get_thumb(&mut self, handle: u32) -> Result<Vec<u8>, Error> {
        self.ensure_open()?;
        self.transact_bytes(StandardCommandCode::GetThumb, &[handle])
    }

    /// 发送对象信息，为随后的SendObject指定归属
    ///
    /// 返回设备确定的(存储ID, 父对象, 新对象句柄)
    pub fn send_object_info(
        &mut self,
        info: &PtpObjectInfo,
        storage: u32,
        parent: u32,
    ) -> Result<(u32, u32, u32), Error> {
        self.ensure_open()?;
        debug!("发送对象信息: {}", info.Filename);
        let mut source = ByteArrayInputStream::new(info.encode());
        let params = self.transact_out(
            StandardCommandCode::SendObjectInfo,
            &[storage, parent],
            &mut source,
        )?;
        self.fatal_scope(|| {
            if params.len() < 3 {
                return Err(Error::Malformed(format!(
                    "SendObjectInfo响应参数不足: {}个",
                    params.len()
                )));
            }
            Ok((params[0], params[1], params[2]))
        })
    }

    /// 上传对象，负载从给定的输入流读取
    ///
    /// 归属由此前的SendObjectInfo确定
    pub fn send_object(&mut self, source: &mut dyn ObjectInputStream) -> Result<(), Error> {
        self.ensure_open()?;
        debug!("上传对象，{} 字节", source.size());
        self.transact_out(StandardCommandCode::SendObject, &[], source)
            .map(|_| ())
    }

    /// 创建目录(关联对象)
    pub fn create_directory(
        &mut self,
        name: &str,
        parent: u32,
        storage: u32,
    ) -> Result<(u32, u32, u32), Error> {
        debug!("创建目录 {}", name);
        let info = PtpObjectInfo::for_directory(name);
        self.send_object_info(&info, storage, parent)
    }

    /// 删除对象；删除关联对象时设备会递归删除其子对象
    pub fn delete_object(&mut self, handle: u32) -> Result<(), Error> {
        self.ensure_open()?;
        debug!("删除对象 0x{:08x}", handle);
        self.transact_none(StandardCommandCode::DeleteObject, &[handle])
            .map(|_| ())
    }

    /// 批量获取对象属性列表，返回原始负载，由调用方用
    /// property_list::parse_object_prop_list按需解析
    ///
    /// 调用前应以operation_supported(GetObjectPropList)判定设备支持，
    /// 不支持时回退到逐对象的GetObjectInfo/属性访问
    pub fn get_object_property_list(
        &mut self,
        handle: u32,
        format: u16,
        property: u16,
        group: u32,
        depth: u32,
    ) -> Result<Vec<u8>, Error> {
        self.ensure_open()?;
        self.transact_bytes(
            StandardCommandCode::GetObjectPropList,
            &[handle, format as u32, property as u32, group, depth],
        )
    }

    /// 获取设备对给定格式支持的对象属性集合
    pub fn get_object_properties_supported(
        &mut self,
        format: u16,
    ) -> Result<Vec<u16>, Error> {
        self.ensure_open()?;
        let data =
            self.transact_bytes(StandardCommandCode::GetObjectPropsSupported, &[format as u32])?;
        self.fatal_scope(|| {
            let mut cur = Cursor::new(data);
            let props = cur.read_ptp_u16_vec()?;
            cur.expect_end()?;
            Ok(props)
        })
    }

    /// 读取整数型对象属性，按负载宽度放大到u64
    pub fn get_object_integer_property(
        &mut self,
        handle: u32,
        property: ObjectPropCode,
    ) -> Result<u64, Error> {
        self.ensure_open()?;
        let data = self.transact_bytes(
            StandardCommandCode::GetObjectPropValue,
            &[handle, property as u32],
        )?;
        self.fatal_scope(|| match data.len() {
            1 => Ok(data[0] as u64),
            2 => Ok(u16::from_le_bytes([data[0], data[1]]) as u64),
            4 => Ok(u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as u64),
            8 => Ok(u64::from_le_bytes([
                data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
            ])),
            n => Err(Error::Malformed(format!("整数属性负载长度非法: {}字节", n))),
        })
    }

    /// 对象的64位真实大小
    ///
    /// ObjectInfo的32位大小字段放不下的大对象以0xFFFFFFFF占位，
    /// 准确大小一律从这里取
    pub fn get_object_size(&mut self, handle: u32) -> Result<u64, Error> {
        self.get_object_integer_property(handle, ObjectProperty::ObjectSize)
    }

    /// 对象所在的存储
    pub fn get_object_storage(&mut self, handle: u32) -> Result<u32, Error> {
        self.get_object_integer_property(handle, ObjectProperty::StorageId)
            .map(|v| v as u32)
    }

    /// 读取字符串型对象属性
    pub fn get_object_string_property(
        &mut self,
        handle: u32,
        property: ObjectPropCode,
    ) -> Result<String, Error> {
        self.ensure_open()?;
        let data = self.transact_bytes(
            StandardCommandCode::GetObjectPropValue,
            &[handle, property as u32],
        )?;
        self.fatal_scope(|| {
            let mut cur = Cursor::new(data);
            let value = cur.read_ptp_str()?;
            cur.expect_end()?;
            Ok(value)
        })
    }

    /// 设置对象属性
    pub fn set_object_property(
        &mut self,
        handle: u32,
        property: ObjectPropCode,
        value: &PtpDataType,
    ) -> Result<(), Error> {
        self.ensure_open()?;
        let mut source = ByteArrayInputStream::new(value.encode());
        self.transact_out(
            StandardCommandCode::SetObjectPropValue,
            &[handle, property as u32],
            &mut source,
        )
        .map(|_| ())
    }

    /// 读取设备属性的原始值负载
    pub fn get_device_property(&mut self, code: u16) -> Result<Vec<u8>, Error> {
        self.ensure_open()?;
        self.transact_bytes(StandardCommandCode::GetDevicePropValue, &[code as u32])
    }

    /// 读取设备属性描述
    pub fn get_device_property_desc(&mut self, code: u16) -> Result<PtpPropInfo, Error> {
        self.ensure_open()?;
        let data = self.transact_bytes(StandardCommandCode::GetDevicePropDesc, &[code as u32])?;
        self.fatal_scope(|| {
            let mut cur = Cursor::new(data);
            let prop = PtpPropInfo::decode(&mut cur)?;
            cur.expect_end()?;
            Ok(prop)
        })
    }

    /// 设置设备属性
    pub fn set_device_property(&mut self, code: u16, value: &PtpDataType) -> Result<(), Error> {
        self.ensure_open()?;
        let mut source = ByteArrayInputStream::new(value.encode());
        self.transact_out(StandardCommandCode::SetDevicePropValue, &[code as u32], &mut source)
            .map(|_| ())
    }

    /// 轮询中断端点上的设备事件，超时返回None
    pub fn poll_event(&mut self, timeout: Duration) -> Result<Option<PtpEvent>, Error> {
        // 事件容器很小：12字节头加至多3个参数
        let mut buf = [0u8; 64];
        let n = match self.channel.read_interrupt(&mut buf, timeout) {
            Ok(n) => n,
            Err(TransportError::Timeout) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            return Ok(None);
        }
        if n < CONTAINER_HEADER_SIZE {
            return Err(Error::Malformed(format!("事件容器不完整，仅{}字节", n)));
        }
        let info = ContainerInfo::parse(&buf[..CONTAINER_HEADER_SIZE])?;
        if info.kind != ContainerType::Event {
            return Err(Error::Protocol(format!(
                "中断端点收到非事件容器 {:?}",
                info.kind
            )));
        }
        let payload = &buf[CONTAINER_HEADER_SIZE..n];
        if payload.len() % 4 != 0 || payload.len() > 12 {
            return Err(Error::Malformed(format!(
                "事件参数长度非法: {}字节",
                payload.len()
            )));
        }
        let params = payload
            .chunks(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Some(PtpEvent {
            code: info.code,
            tid: info.tid,
            params,
        }))
    }

    // ------------------------------------------------------------------
    // 事务引擎
    // ------------------------------------------------------------------

    fn ensure_open(&self) -> Result<(), Error> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Closed => Err(Error::Protocol("会话尚未打开".to_string())),
            SessionState::Faulted => {
                Err(Error::Protocol("会话已失效，需要关闭后重新打开".to_string()))
            }
        }
    }

    fn ensure_not_faulted(&self) -> Result<(), Error> {
        if self.state == SessionState::Faulted {
            Err(Error::Protocol("会话已失效，需要关闭后重新打开".to_string()))
        } else {
            Ok(())
        }
    }

    fn allocate_tid(&mut self) -> u32 {
        let tid = self.next_tid;
        self.next_tid = self.next_tid.wrapping_add(1);
        if self.next_tid == 0 {
            self.next_tid = 1;
        }
        tid
    }

    /// 事务体的失效包装：设备的非Ok响应不破坏会话，其余错误使会话失效；
    /// STALL先尽力清除再失效
    fn guard<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        match f(self) {
            Ok(v) => Ok(v),
            Err(e @ Error::Response(_)) => Err(e),
            Err(e) => {
                if matches!(e, Error::Transport(TransportError::Stall)) {
                    let _ = self.channel.reset();
                }
                error!("事务失败，会话失效: {}", e);
                self.state = SessionState::Faulted;
                Err(e)
            }
        }
    }

    /// 事务后负载解析的失效包装：格式/协议错误使会话失效
    fn fatal_scope<T>(&mut self, f: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
        let result = f();
        if let Err(e) = &result {
            if matches!(e, Error::Malformed(_) | Error::Protocol(_)) {
                error!("负载解析失败，会话失效: {}", e);
                self.state = SessionState::Faulted;
            }
        }
        result
    }

    /// 无数据阶段的事务（或忽略数据负载），返回响应参数
    fn transact_none(&mut self, code: CommandCode, params: &[u32]) -> Result<Vec<u32>, Error> {
        let mut sink = ByteArrayOutputStream::new();
        self.transact_in(code, params, &mut sink)
    }

    /// 数据流入事务，负载收进内存，返回负载字节
    fn transact_bytes(&mut self, code: CommandCode, params: &[u32]) -> Result<Vec<u8>, Error> {
        let mut sink = ByteArrayOutputStream::new();
        self.transact_in(code, params, &mut sink)?;
        Ok(sink.into_inner())
    }

    /// 数据流入事务：命令、可选的数据阶段、响应
    ///
    /// 设备可以跳过数据阶段直接给出响应（无数据结果），此形态被接受
    fn transact_in(
        &mut self,
        code: CommandCode,
        params: &[u32],
        sink: &mut dyn ObjectOutputStream,
    ) -> Result<Vec<u32>, Error> {
        // 事务开始前的取消干净地中止，不破坏会话
        sink.check_cancelled()?;
        let tid = self.allocate_tid();
        self.guard(|s| {
            s.write_command(code, params, tid)?;
            let (head, first) = s.read_container_head_retrying()?;
            match head.kind {
                ContainerType::Data => {
                    if !head.belongs_to(tid) {
                        return Err(Error::Protocol(format!(
                            "事务ID不匹配，收到{}，期望{}",
                            head.tid, tid
                        )));
                    }
                    if head.code != code {
                        return Err(Error::Protocol(format!(
                            "数据容器操作码不符: 0x{:04x}，期望0x{:04x}",
                            head.code, code
                        )));
                    }
                    s.read_data_phase(&head, first, sink)?;
                    s.read_response(tid)
                }
                ContainerType::Response => s.finish_response(tid, head, first),
                other => Err(Error::Protocol(format!(
                    "数据阶段收到意外的容器类型 {:?}",
                    other
                ))),
            }
        })
    }

    /// 数据流出事务：命令、数据阶段、响应
    fn transact_out(
        &mut self,
        code: CommandCode,
        params: &[u32],
        source: &mut dyn ObjectInputStream,
    ) -> Result<Vec<u32>, Error> {
        source.check_cancelled()?;
        let tid = self.allocate_tid();
        self.guard(|s| {
            s.write_command(code, params, tid)?;
            s.write_data_phase(code, tid, source)?;
            s.read_response(tid)
        })
    }

    /// 写出命令容器
    fn write_command(&mut self, code: CommandCode, params: &[u32], tid: u32) -> Result<(), Error> {
        trace!(
            "发出命令 0x{:04x} ({}), tid:{}",
            code,
            StandardCommandCode::name(code).unwrap_or("未知"),
            tid
        );
        let payload = container::command_payload(params)?;
        let mut buf = Vec::with_capacity(CONTAINER_HEADER_SIZE + payload.len());
        buf.extend_from_slice(&container::encode_header(
            (CONTAINER_HEADER_SIZE + payload.len()) as u32,
            ContainerType::Command,
            code,
            tid,
        ));
        buf.extend_from_slice(&payload);
        self.channel.write_bulk(&buf, self.timeout)?;
        Ok(())
    }

    /// 写出数据阶段：容器头与负载流拼成连接流按包发送
    fn write_data_phase(
        &mut self,
        code: CommandCode,
        tid: u32,
        source: &mut dyn ObjectInputStream,
    ) -> Result<(), Error> {
        let size = source.size();
        let mps = self.channel.bulk_out_max_packet_size();
        // 总长超出32位长度字段表示范围时进入长度未知模式（大对象路径）
        let length = match size.checked_add(CONTAINER_HEADER_SIZE as u64) {
            Some(total) if total < DATA_LENGTH_UNKNOWN as u64 => total as u32,
            _ => DATA_LENGTH_UNKNOWN,
        };
        trace!("数据阶段开始: {}字节, tid:{}", size, tid);

        let header = container::encode_header(length, ContainerType::Data, code, tid);
        let mut joined = JoinedInputStream::new(
            Box::new(ByteArrayInputStream::new(header.to_vec())),
            Box::new(source),
        );
        joined.set_on_stream1_exhausted(|| trace!("容器头发送完毕，进入负载传输"));

        let chunk_len = (SEND_CHUNK_SIZE / mps).max(1) * mps;
        let mut chunk = vec![0u8; chunk_len];
        let mut sent: u64 = 0;
        loop {
            let n = joined.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            self.channel.write_bulk(&chunk[..n], self.timeout)?;
            sent += n as u64;
            if n < chunk.len() {
                break;
            }
        }

        if length != DATA_LENGTH_UNKNOWN && sent != CONTAINER_HEADER_SIZE as u64 + size {
            return Err(Error::Protocol(format!(
                "源流提供的字节数与声明不符: 发送{}字节，声明{}字节",
                sent,
                CONTAINER_HEADER_SIZE as u64 + size
            )));
        }
        // 发送总量恰为整包倍数时补零长度包：已知长度模式下这是ZLP终结规则，
        // 长度未知模式下结束本就需要一个短包
        if sent % mps as u64 == 0 {
            trace!("补零长度包");
            self.channel.write_bulk(&[], self.timeout)?;
        }
        Ok(())
    }

    /// 读入一个容器头，数据容器的第一块负载可能与头在同一个USB包里
    fn read_container_head(&mut self) -> Result<(ContainerInfo, Vec<u8>), Error> {
        let mps = self.channel.bulk_in_max_packet_size().max(CONTAINER_HEADER_SIZE);
        let mut buf = vec![0u8; mps];
        let mut n = self.channel.read_bulk(&mut buf, self.timeout)?;
        if n == 0 {
            // 个别设备在阶段之间多送一个零长度包，跳过一次
            n = self.channel.read_bulk(&mut buf, self.timeout)?;
        }
        if n < CONTAINER_HEADER_SIZE {
            return Err(Error::Malformed(format!("容器头不完整，仅{}字节", n)));
        }
        let info = ContainerInfo::parse(&buf[..CONTAINER_HEADER_SIZE])?;
        trace!("收到容器 {:?}", info);
        Ok((info, buf[CONTAINER_HEADER_SIZE..n].to_vec()))
    }

    /// 消费数据阶段，负载写入输出流
    fn read_data_phase(
        &mut self,
        head: &ContainerInfo,
        first: Vec<u8>,
        sink: &mut dyn ObjectOutputStream,
    ) -> Result<(), Error> {
        let mps = self.channel.bulk_in_max_packet_size();
        match head.payload_len() {
            Some(total) => {
                sink.set_total(total as u64);
                if first.len() > total {
                    return Err(Error::Malformed(format!(
                        "数据负载超出容器声明长度: {} > {}",
                        first.len(),
                        total
                    )));
                }
                write_to_sink(sink, &first)?;
                let mut received = first.len();
                let mut buf = vec![0u8; mps];
                while received < total {
                    let n = self.channel.read_bulk(&mut buf, self.timeout)?;
                    if n == 0 {
                        return Err(Error::Malformed(format!(
                            "数据阶段提前结束，已收{}/{}字节",
                            received, total
                        )));
                    }
                    if received + n > total {
                        return Err(Error::Malformed(format!(
                            "数据负载超出容器声明长度: {} > {}",
                            received + n,
                            total
                        )));
                    }
                    write_to_sink(sink, &buf[..n])?;
                    received += n;
                }
                trace!("数据阶段完成，共{}字节", received);
            }
            None => {
                // 长度未知模式：短包(含零长度包)标志数据结束
                write_to_sink(sink, &first)?;
                let mut received = first.len();
                let mut done = CONTAINER_HEADER_SIZE + first.len() < mps;
                let mut buf = vec![0u8; mps];
                while !done {
                    let n = self.channel.read_bulk(&mut buf, self.timeout)?;
                    write_to_sink(sink, &buf[..n])?;
                    received += n;
                    done = n < mps;
                }
                trace!("数据阶段完成(长度未知)，共{}字节", received);
            }
        }
        Ok(())
    }

    /// 命令写出后的首次容器回读，可能直接就是响应(无数据操作)；
    /// 操作已完整写出，超时允许重试一次
    fn read_container_head_retrying(&mut self) -> Result<(ContainerInfo, Vec<u8>), Error> {
        match self.read_container_head() {
            Err(Error::Transport(TransportError::Timeout)) => {
                debug!("响应读取超时，重试一次");
                self.read_container_head()
            }
            other => other,
        }
    }

    /// 读取并校验响应容器
    fn read_response(&mut self, tid: u32) -> Result<Vec<u32>, Error> {
        let (info, payload) = self.read_container_head_retrying()?;
        self.finish_response(tid, info, payload)
    }

    /// 校验响应容器并提取至多5个32位响应参数
    fn finish_response(
        &mut self,
        tid: u32,
        info: ContainerInfo,
        mut payload: Vec<u8>,
    ) -> Result<Vec<u32>, Error> {
        if info.kind != ContainerType::Response {
            return Err(Error::Protocol(format!(
                "期待响应容器，收到 {:?}",
                info.kind
            )));
        }
        if !info.belongs_to(tid) {
            return Err(Error::Protocol(format!(
                "事务ID不匹配，收到{}，期望{}",
                info.tid, tid
            )));
        }
        let expected = info
            .payload_len()
            .ok_or_else(|| Error::Malformed("响应容器长度未知".to_string()))?;
        if expected > MAX_COMMAND_PARAMS * 4 || expected % 4 != 0 {
            return Err(Error::Malformed(format!(
                "响应参数长度非法: {}字节",
                expected
            )));
        }
        while payload.len() < expected {
            let mut buf = vec![0u8; self.channel.bulk_in_max_packet_size()];
            let n = self.channel.read_bulk(&mut buf, self.timeout)?;
            if n == 0 {
                return Err(Error::Malformed("响应参数不完整".to_string()));
            }
            payload.extend_from_slice(&buf[..n]);
        }
        if payload.len() != expected {
            return Err(Error::Malformed(format!(
                "响应参数长度不符: 收到{}字节，声明{}字节",
                payload.len(),
                expected
            )));
        }
        debug!(
            "响应 0x{:04x} ({}), tid:{}",
            info.code,
            StandardResponseCode::name(info.code).unwrap_or("未知"),
            info.tid
        );
        if info.code != StandardResponseCode::Ok {
            return Err(Error::Response(info.code));
        }
        Ok(payload
            .chunks(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}

impl<C: UsbChannel> Drop for Session<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// 把一段字节完整写入输出流
fn write_to_sink(sink: &mut dyn ObjectOutputStream, mut data: &[u8]) -> Result<(), Error> {
    while !data.is_empty() {
        let n = sink.write(data)?;
        if n == 0 {
            return Err(Error::Transport(TransportError::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                "对象输出流拒绝接收更多数据",
            ))));
        }
        data = &data[n..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mtp::object_stream::CancellationToken;
    use crate::mtp::standard_codes::{ObjectProperty, StandardEventCode};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    const MPS: usize = 64;

    /// 按脚本应答的内存通道，记录全部写出的包
    struct MockChannel {
        reads: VecDeque<Result<Vec<u8>, TransportError>>,
        interrupts: VecDeque<Result<Vec<u8>, TransportError>>,
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
        resets: Arc<Mutex<usize>>,
    }

    impl MockChannel {
        fn new() -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
            let writes = Arc::new(Mutex::new(vec![]));
            let channel = MockChannel {
                reads: VecDeque::new(),
                interrupts: VecDeque::new(),
                writes: writes.clone(),
                resets: Arc::new(Mutex::new(0)),
            };
            (channel, writes)
        }

        /// 把一个完整容器按端点包大小切成读脚本
        fn script_container(&mut self, container: Vec<u8>) {
            if container.is_empty() {
                self.reads.push_back(Ok(vec![]));
                return;
            }
            for chunk in container.chunks(MPS) {
                self.reads.push_back(Ok(chunk.to_vec()));
            }
        }

        fn script_error(&mut self, e: TransportError) {
            self.reads.push_back(Err(e));
        }
    }

    impl UsbChannel for MockChannel {
        fn bulk_in_max_packet_size(&self) -> usize {
            MPS
        }

        fn bulk_out_max_packet_size(&self) -> usize {
            MPS
        }

        fn write_bulk(&mut self, data: &[u8], _timeout: Duration) -> Result<usize, TransportError> {
            self.writes.lock().unwrap().push(data.to_vec());
            Ok(data.len())
        }

        fn read_bulk(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, TransportError> {
            match self.reads.pop_front() {
                Some(Ok(data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(TransportError::Timeout),
            }
        }

        fn read_interrupt(
            &mut self,
            buf: &mut [u8],
            _timeout: Duration,
        ) -> Result<usize, TransportError> {
            match self.interrupts.pop_front() {
                Some(Ok(data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(TransportError::Timeout),
            }
        }

        fn reset(&mut self) -> Result<(), TransportError> {
            *self.resets.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn container_bytes(kind: ContainerType, code: u16, tid: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = container::encode_header(
            (CONTAINER_HEADER_SIZE + payload.len()) as u32,
            kind,
            code,
            tid,
        )
        .to_vec();
        buf.extend_from_slice(payload);
        buf
    }

    fn ok_response(tid: u32) -> Vec<u8> {
        container_bytes(ContainerType::Response, StandardResponseCode::Ok, tid, &[])
    }

    fn response_with_params(code: u16, tid: u32, params: &[u32]) -> Vec<u8> {
        let mut payload = vec![];
        for p in params {
            payload.extend_from_slice(&p.to_le_bytes());
        }
        container_bytes(ContainerType::Response, code, tid, &payload)
    }

    fn minimal_device_info() -> PtpDeviceInfo {
        PtpDeviceInfo {
            Version: 100,
            VendorExID: 6,
            VendorExVersion: 100,
            VendorExtensionDesc: String::new(),
            FunctionalMode: 0,
            OperationsSupported: vec![
                StandardCommandCode::GetObject,
                StandardCommandCode::SendObject,
                StandardCommandCode::GetObjectPropList,
            ],
            EventsSupported: vec![],
            DevicePropertiesSupported: vec![],
            CaptureFormats: vec![],
            ImageFormats: vec![],
            Manufacturer: "M".into(),
            Model: "D".into(),
            DeviceVersion: "1".into(),
            SerialNumber: "S".into(),
        }
    }

    /// 脚本化OpenSession(tid=1)与GetDeviceInfo(tid=2)的应答
    fn script_open(channel: &mut MockChannel) {
        channel.script_container(ok_response(1));
        channel.script_container(container_bytes(
            ContainerType::Data,
            StandardCommandCode::GetDeviceInfo,
            2,
            &minimal_device_info().encode(),
        ));
        channel.script_container(ok_response(2));
    }

    fn opened_session(
        prepare: impl FnOnce(&mut MockChannel),
    ) -> (Session<MockChannel>, Arc<Mutex<Vec<Vec<u8>>>>) {
        let (mut channel, writes) = MockChannel::new();
        script_open(&mut channel);
        prepare(&mut channel);
        let session = Session::open(channel, 1).unwrap();
        (session, writes)
    }

    #[test]
    fn open_session_wire_trace_is_exact() {
        let (session, writes) = opened_session(|_| {});
        assert_eq!(session.state(), SessionState::Open);
        let writes = writes.lock().unwrap().clone();
        // OpenSession(1): 长度16、命令容器、0x1002、tid=1、参数1
        assert_eq!(
            writes[0],
            vec![
                0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x10, 0x01, 0x00, 0x00, 0x00, 0x01,
                0x00, 0x00, 0x00
            ]
        );
        // 随后是GetDeviceInfo(tid=2)
        assert_eq!(
            writes[1],
            vec![0x0C, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x10, 0x02, 0x00, 0x00, 0x00]
        );
        assert_eq!(writes.len(), 2);
    }

    #[test]
    fn open_rejects_zero_session_id() {
        let (channel, _) = MockChannel::new();
        assert!(matches!(
            Session::open(channel, 0),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn transaction_ids_increase_monotonically() {
        let (mut session, writes) = opened_session(|c| {
            c.script_container(ok_response(3));
            c.script_container(ok_response(4));
        });
        session.delete_object(5).unwrap();
        session.delete_object(6).unwrap();
        let writes = writes.lock().unwrap().clone();
        // 命令容器的tid字段位于第8..12字节
        let tids: Vec<u32> = writes
            .iter()
            .map(|w| u32::from_le_bytes([w[8], w[9], w[10], w[11]]))
            .collect();
        assert_eq!(tids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn get_object_streams_known_length_payload() {
        // 数据容器头与5字节负载合并在一个USB包里
        let (mut session, _) = opened_session(|c| {
            c.script_container(container_bytes(
                ContainerType::Data,
                StandardCommandCode::GetObject,
                3,
                b"Hello",
            ));
            c.script_container(ok_response(3));
        });
        let mut sink = ByteArrayOutputStream::new();
        session.get_object(42, &mut sink).unwrap();
        assert_eq!(sink.into_inner(), b"Hello");
        assert_eq!(session.state(), SessionState::Open);
    }

    #[test]
    fn get_object_data_header_bytes_match_protocol_layout() {
        // 头部字节与协议布局逐字节一致: 11 00 00 00 02 00 09 10 02 00 00 00 + "Hello"
        let mut container = vec![
            0x11, 0x00, 0x00, 0x00, 0x02, 0x00, 0x09, 0x10, 0x03, 0x00, 0x00, 0x00,
        ];
        container.extend_from_slice(b"Hello");
        let (mut session, _) = opened_session(|c| {
            c.script_container(container);
            c.script_container(ok_response(3));
        });
        let mut sink = ByteArrayOutputStream::new();
        session.get_object(42, &mut sink).unwrap();
        assert_eq!(sink.into_inner(), b"Hello");
    }

    #[test]
    fn get_object_spanning_multiple_packets() {
        let payload: Vec<u8> = (0..200u8).map(|i| i as u8).collect();
        let (mut session, _) = opened_session(|c| {
            c.script_container(container_bytes(
                ContainerType::Data,
                StandardCommandCode::GetObject,
                3,
                &payload,
            ));
            c.script_container(ok_response(3));
        });
        let mut sink = ByteArrayOutputStream::new();
        session.get_object(42, &mut sink).unwrap();
        assert_eq!(sink.into_inner(), payload);
    }

    #[test]
    fn get_object_unknown_length_ends_on_short_packet() {
        // 长度未知的数据容器：头与20字节负载合并成一个32字节短包
        let mut container = container::encode_header(
            DATA_LENGTH_UNKNOWN,
            ContainerType::Data,
            StandardCommandCode::GetObject,
            3,
        )
        .to_vec();
        container.extend_from_slice(&[0xAB; 20]);
        let (mut session, _) = opened_session(|c| {
            c.script_container(container);
            c.script_container(ok_response(3));
        });
        let mut sink = ByteArrayOutputStream::new();
        session.get_object(42, &mut sink).unwrap();
        assert_eq!(sink.into_inner(), vec![0xAB; 20]);
    }

    #[test]
    fn get_object_accepts_response_without_data_phase() {
        // 设备跳过数据阶段直接响应，空对象场景
        let (mut session, _) = opened_session(|c| {
            c.script_container(ok_response(3));
        });
        let mut sink = ByteArrayOutputStream::new();
        session.get_object(42, &mut sink).unwrap();
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn send_object_appends_zlp_when_container_fills_packet() {
        // 52字节负载: 12+52=64恰为整包，必须跟零长度包
        let (mut session, writes) = opened_session(|c| {
            c.script_container(ok_response(3));
        });
        let mut source = ByteArrayInputStream::new(vec![0x5A; 52]);
        session.send_object(&mut source).unwrap();

        let writes = writes.lock().unwrap().clone();
        // 写序列: OpenSession命令、GetDeviceInfo命令、SendObject命令、64字节数据、ZLP
        assert_eq!(writes.len(), 5);
        assert_eq!(writes[2].len(), CONTAINER_HEADER_SIZE);
        assert_eq!(writes[3].len(), 64);
        assert_eq!(
            &writes[3][..CONTAINER_HEADER_SIZE],
            &[0x40, 0x00, 0x00, 0x00, 0x02, 0x00, 0x0D, 0x10, 0x03, 0x00, 0x00, 0x00]
        );
        assert_eq!(writes[4].len(), 0);
    }

    #[test]
    fn send_object_without_packet_boundary_has_no_zlp() {
        let (mut session, writes) = opened_session(|c| {
            c.script_container(ok_response(3));
        });
        let mut source = ByteArrayInputStream::new(vec![0x5A; 40]);
        session.send_object(&mut source).unwrap();

        let writes = writes.lock().unwrap().clone();
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[3].len(), 52);
    }

    #[test]
    fn transaction_id_mismatch_faults_session() {
        let (mut session, _) = opened_session(|c| {
            c.script_container(ok_response(6)); // tid应为3
        });
        match session.delete_object(1) {
            Err(Error::Protocol(_)) => {}
            other => panic!("预期协议错误，得到 {:?}", other),
        }
        assert_eq!(session.state(), SessionState::Faulted);
        // 失效后拒绝继续操作
        assert!(matches!(
            session.delete_object(2),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn data_container_with_wrong_tid_faults_session() {
        let (mut session, _) = opened_session(|c| {
            c.script_container(container_bytes(
                ContainerType::Data,
                StandardCommandCode::GetObject,
                9, // tid应为3
                b"xx",
            ));
        });
        let mut sink = ByteArrayOutputStream::new();
        assert!(matches!(
            session.get_object(1, &mut sink),
            Err(Error::Protocol(_))
        ));
        assert_eq!(session.state(), SessionState::Faulted);
    }

    #[test]
    fn invalid_response_code_keeps_session_usable() {
        let (mut session, _) = opened_session(|c| {
            c.script_container(response_with_params(
                StandardResponseCode::InvalidStorageId,
                3,
                &[],
            ));
            // 下一个事务正常应答
            c.script_container(ok_response(4));
        });
        match session.get_storage_info(0x0001_0001) {
            Err(Error::Response(code)) => assert_eq!(code, 0x2008),
            other => panic!("预期设备响应错误，得到 {:?}", other),
        }
        assert_eq!(session.state(), SessionState::Open);
        session.delete_object(7).unwrap();
    }

    #[test]
    fn response_read_timeout_retries_once() {
        let (mut session, _) = opened_session(|c| {
            c.script_error(TransportError::Timeout);
            c.script_container(ok_response(3));
        });
        session.delete_object(1).unwrap();
        assert_eq!(session.state(), SessionState::Open);
    }

    #[test]
    fn second_timeout_faults_session() {
        let (mut session, _) = opened_session(|c| {
            c.script_error(TransportError::Timeout);
            c.script_error(TransportError::Timeout);
        });
        assert!(matches!(
            session.delete_object(1),
            Err(Error::Transport(TransportError::Timeout))
        ));
        assert_eq!(session.state(), SessionState::Faulted);
    }

    #[test]
    fn stall_triggers_reset_then_fault() {
        let (mut channel, _) = MockChannel::new();
        script_open(&mut channel);
        channel.script_error(TransportError::Stall);
        let resets = channel.resets.clone();
        let mut session = Session::open(channel, 1).unwrap();
        assert!(matches!(
            session.delete_object(1),
            Err(Error::Transport(TransportError::Stall))
        ));
        assert_eq!(session.state(), SessionState::Faulted);
        assert_eq!(*resets.lock().unwrap(), 1);
    }

    #[test]
    fn cancel_before_transaction_aborts_cleanly() {
        let (mut session, writes) = opened_session(|_| {});
        let token = CancellationToken::new();
        token.cancel();
        let mut sink = ByteArrayOutputStream::new();
        sink.set_cancellation_token(token);
        assert!(matches!(
            session.get_object(1, &mut sink),
            Err(Error::Cancelled)
        ));
        // 命令未写出，会话保持可用
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(writes.lock().unwrap().len(), 2);
    }

    /// 第一次read填满缓冲区，之后报告取消，模拟传输中途的取消
    struct CancelAfterFirstRead {
        reads: usize,
    }

    impl ObjectInputStream for CancelAfterFirstRead {
        fn size(&self) -> u64 {
            1024 * 1024
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
            if self.reads > 0 {
                return Err(Error::Cancelled);
            }
            self.reads += 1;
            for b in buf.iter_mut() {
                *b = 0x77;
            }
            Ok(buf.len())
        }
    }

    #[test]
    fn cancel_mid_data_phase_faults_session() {
        let (mut session, writes) = opened_session(|_| {});
        let mut source = CancelAfterFirstRead { reads: 0 };
        assert!(matches!(
            session.send_object(&mut source),
            Err(Error::Cancelled)
        ));
        assert_eq!(session.state(), SessionState::Faulted);
        // 取消后不再有字节到达传输层: 命令+第一块数据之后立即停止
        assert_eq!(writes.lock().unwrap().len(), 4);
    }

    #[test]
    fn send_object_info_returns_response_params() {
        let (mut session, _) = opened_session(|c| {
            c.script_container(response_with_params(
                StandardResponseCode::Ok,
                3,
                &[0x0001_0001, 0xFFFF_FFFF, 0x0000_00AB],
            ));
        });
        let info = PtpObjectInfo::for_upload("a.txt", 0x3004, 5);
        let (storage, parent, handle) = session
            .send_object_info(&info, reserved::AnyStorage, reserved::Root)
            .unwrap();
        assert_eq!(storage, 0x0001_0001);
        assert_eq!(parent, 0xFFFF_FFFF);
        assert_eq!(handle, 0xAB);
    }

    #[test]
    fn get_storage_ids_parses_and_session_continues() {
        let mut payload = vec![];
        payload.extend_from_slice(&2u32.to_le_bytes());
        payload.extend_from_slice(&0x0001_0001u32.to_le_bytes());
        payload.extend_from_slice(&0x0002_0001u32.to_le_bytes());
        let (mut session, _) = opened_session(|c| {
            c.script_container(container_bytes(
                ContainerType::Data,
                StandardCommandCode::GetStorageIDs,
                3,
                &payload,
            ));
            c.script_container(ok_response(3));
        });
        let ids = session.get_storage_ids().unwrap();
        assert_eq!(ids, vec![0x0001_0001, 0x0002_0001]);
    }

    #[test]
    fn get_num_objects_comes_from_response_params() {
        let (mut session, _) = opened_session(|c| {
            c.script_container(response_with_params(StandardResponseCode::Ok, 3, &[17]));
        });
        let n = session
            .get_num_objects(
                Session::<MockChannel>::AllStorages,
                0,
                Session::<MockChannel>::Root,
            )
            .unwrap();
        assert_eq!(n, 17);
    }

    #[test]
    fn reserved_sentinels_available_on_session_type() {
        assert_eq!(Session::<MockChannel>::Root, reserved::Root);
        assert_eq!(Session::<MockChannel>::Device, reserved::Device);
        assert_eq!(Session::<MockChannel>::AllStorages, reserved::AllStorages);
        assert_eq!(Session::<MockChannel>::AnyStorage, reserved::AnyStorage);
        assert_eq!(Session::<MockChannel>::Root, 0xFFFF_FFFF);
        assert_eq!(Session::<MockChannel>::Device, 0);
    }

    #[test]
    fn get_object_integer_property_widens_by_length() {
        let (mut session, _) = opened_session(|c| {
            c.script_container(container_bytes(
                ContainerType::Data,
                StandardCommandCode::GetObjectPropValue,
                3,
                &42u64.to_le_bytes(),
            ));
            c.script_container(ok_response(3));
        });
        let size = session
            .get_object_integer_property(7, ObjectProperty::ObjectSize)
            .unwrap();
        assert_eq!(size, 42);
    }

    #[test]
    fn malformed_payload_faults_session() {
        // 对象信息负载被截断
        let (mut session, _) = opened_session(|c| {
            c.script_container(container_bytes(
                ContainerType::Data,
                StandardCommandCode::GetObjectInfo,
                3,
                &[0x01, 0x02],
            ));
            c.script_container(ok_response(3));
        });
        assert!(matches!(
            session.get_object_info(9),
            Err(Error::Malformed(_))
        ));
        assert_eq!(session.state(), SessionState::Faulted);
    }

    #[test]
    fn operation_supported_uses_cached_device_info() {
        let (session, _) = opened_session(|_| {});
        assert!(session.operation_supported(StandardCommandCode::GetObjectPropList));
        assert!(!session.operation_supported(StandardCommandCode::FormatStore));
    }

    #[test]
    fn poll_event_parses_event_container() {
        let (mut channel, _) = MockChannel::new();
        script_open(&mut channel);
        let mut event = container::encode_header(
            16,
            ContainerType::Event,
            StandardEventCode::ObjectAdded,
            0,
        )
        .to_vec();
        event.extend_from_slice(&0x00AB_CDEFu32.to_le_bytes());
        channel.interrupts.push_back(Ok(event));
        let mut session = Session::open(channel, 1).unwrap();

        let event = session.poll_event(Duration::from_millis(10)).unwrap();
        assert_eq!(
            event,
            Some(PtpEvent {
                code: StandardEventCode::ObjectAdded,
                tid: 0,
                params: vec![0x00AB_CDEF],
            })
        );
        // 队列空时按无事件处理
        assert_eq!(session.poll_event(Duration::from_millis(10)).unwrap(), None);
    }

    #[test]
    fn close_is_best_effort_and_idempotent() {
        let (mut session, writes) = opened_session(|c| {
            c.script_container(ok_response(3));
        });
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        session.close();
        let writes = writes.lock().unwrap().clone();
        // OpenSession、GetDeviceInfo、CloseSession各一条命令
        assert_eq!(writes.len(), 3);
        assert_eq!(&writes[2][6..8], &[0x03, 0x10]);
    }
}
