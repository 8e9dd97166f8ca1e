// USB传输层 - 会话消费的最小双工通道契约与rusb实现
use std::time::Duration;

use log::{debug, trace, warn};
use rusb::{Context, DeviceHandle};

use crate::mtp::error::TransportError;

/// 端点传输默认超时
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_millis(5000);

/// 会话依赖的USB双工通道
///
/// 约定：一次read_bulk至多返回一个USB包；写入零长度切片发送ZLP。
pub trait UsbChannel {
    /// 批量输入端点的最大包大小
    fn bulk_in_max_packet_size(&self) -> usize;

    /// 批量输出端点的最大包大小
    fn bulk_out_max_packet_size(&self) -> usize;

    /// 批量写入(主机到设备)，返回实际写入字节数
    fn write_bulk(&mut self, data: &[u8], timeout: Duration) -> Result<usize, TransportError>;

    /// 批量读取(设备到主机)，返回实际读取字节数
    fn read_bulk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;

    /// 从中断端点读取事件数据
    fn read_interrupt(&mut self, buf: &mut [u8], timeout: Duration)
        -> Result<usize, TransportError>;

    /// 尽力而为的STALL清除
    fn reset(&mut self) -> Result<(), TransportError>;
}

/// 基于rusb的通道实现
///
/// 端点与接口由device_connection在打开设备时取得，通道独占设备句柄，
/// 析构时释放接口。
pub struct RusbChannel {
    handle: DeviceHandle<Context>,
    iface: u8,
    ep_in: u8,
    ep_out: u8,
    ep_int: Option<u8>,
    mps_in: usize,
    mps_out: usize,
}

impl RusbChannel {
    pub fn new(
        handle: DeviceHandle<Context>,
        iface: u8,
        ep_in: u8,
        ep_out: u8,
        ep_int: Option<u8>,
        mps_in: usize,
        mps_out: usize,
    ) -> Self {
        debug!(
            "通道就绪: 接口={}, IN=0x{:02x}({}), OUT=0x{:02x}({}), INTR={:?}",
            iface, ep_in, mps_in, ep_out, mps_out, ep_int
        );
        RusbChannel {
            handle,
            iface,
            ep_in,
            ep_out,
            ep_int,
            mps_in,
            mps_out,
        }
    }
}

impl UsbChannel for RusbChannel {
    fn bulk_in_max_packet_size(&self) -> usize {
        self.mps_in
    }

    fn bulk_out_max_packet_size(&self) -> usize {
        self.mps_out
    }

    fn write_bulk(&mut self, data: &[u8], timeout: Duration) -> Result<usize, TransportError> {
        let n = self.handle.write_bulk(self.ep_out, data, timeout)?;
        trace!("批量写出 {} 字节", n);
        Ok(n)
    }

    fn read_bulk(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        let n = self.handle.read_bulk(self.ep_in, buf, timeout)?;
        trace!("批量读入 {} 字节", n);
        Ok(n)
    }

    fn read_interrupt(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        let ep = self.ep_int.ok_or_else(|| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "设备没有中断端点",
            ))
        })?;
        Ok(self.handle.read_interrupt(ep, buf, timeout)?)
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        debug!("清除端点STALL状态");
        if let Err(e) = self.handle.clear_halt(self.ep_in) {
            warn!("清除输入端点失败: {}", e);
        }
        if let Err(e) = self.handle.clear_halt(self.ep_out) {
            warn!("清除输出端点失败: {}", e);
        }
        Ok(())
    }
}

impl Drop for RusbChannel {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.iface) {
            debug!("释放接口{}失败: {}", self.iface, e);
        }
    }
}
