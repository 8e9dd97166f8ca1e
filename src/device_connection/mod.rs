// 设备连接模块 - 扫描MTP/PTP设备并取得批量端点，产出会话可用的USB通道
use log::{debug, info, warn};
use rusb::{Context, Device, Direction, TransferType, UsbContext};

use crate::mtp::error::Error;
use crate::mtp::usb_transport::RusbChannel;

// 静态图像类，PTP/MTP接口的类代码
const IMAGE_CLASS: u8 = 6;

/// 已发现但尚未打开的MTP设备
pub struct MtpDevice {
    device: Device<Context>,
    vendor_id: u16,
    product_id: u16,
    iface: u8,
    ep_in: u8,
    ep_out: u8,
    ep_int: Option<u8>,
    mps_in: usize,
    mps_out: usize,
}

impl MtpDevice {
    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn interface_number(&self) -> u8 {
        self.iface
    }

    /// 打开设备：声明接口并把端点交给通道，通道独占设备句柄
    pub fn open(&self) -> Result<RusbChannel, Error> {
        debug!(
            "打开设备 {:04x}:{:04x}, 接口 {}",
            self.vendor_id, self.product_id, self.iface
        );
        let mut handle = self.device.open()?;
        // 内核可能挂载了usb存储等驱动，尽力自动分离
        handle.set_auto_detach_kernel_driver(true).ok();
        handle.claim_interface(self.iface)?;
        info!("已连接设备 {:04x}:{:04x}", self.vendor_id, self.product_id);
        Ok(RusbChannel::new(
            handle,
            self.iface,
            self.ep_in,
            self.ep_out,
            self.ep_int,
            self.mps_in,
            self.mps_out,
        ))
    }
}

/// 扫描所有暴露MTP/PTP接口的USB设备
pub fn find_devices() -> Result<Vec<MtpDevice>, Error> {
    let context = Context::new()?;
    let mut found = Vec::new();

    for device in context.devices()?.iter() {
        let descriptor = match device.device_descriptor() {
            Ok(d) => d,
            Err(_) => continue,
        };
        let config = match device.config_descriptor(0) {
            Ok(c) => c,
            Err(_) => continue,
        };

        for interface in config.interfaces() {
            for setting in interface.descriptors() {
                if setting.class_code() != IMAGE_CLASS {
                    continue;
                }

                // 收集批量输入/输出与中断端点
                let mut ep_in = None;
                let mut ep_out = None;
                let mut ep_int = None;
                let mut mps_in = 0usize;
                let mut mps_out = 0usize;
                for endpoint in setting.endpoint_descriptors() {
                    match (endpoint.transfer_type(), endpoint.direction()) {
                        (TransferType::Bulk, Direction::In) => {
                            ep_in = Some(endpoint.address());
                            mps_in = endpoint.max_packet_size() as usize;
                        }
                        (TransferType::Bulk, Direction::Out) => {
                            ep_out = Some(endpoint.address());
                            mps_out = endpoint.max_packet_size() as usize;
                        }
                        (TransferType::Interrupt, Direction::In) => {
                            ep_int = Some(endpoint.address());
                        }
                        _ => {}
                    }
                }

                match (ep_in, ep_out) {
                    (Some(ep_in), Some(ep_out)) => {
                        info!(
                            "发现MTP/PTP设备: VID={:04x}, PID={:04x}, 接口={}",
                            descriptor.vendor_id(),
                            descriptor.product_id(),
                            setting.interface_number()
                        );
                        found.push(MtpDevice {
                            device: device.clone(),
                            vendor_id: descriptor.vendor_id(),
                            product_id: descriptor.product_id(),
                            iface: setting.interface_number(),
                            ep_in,
                            ep_out,
                            ep_int,
                            mps_in,
                            mps_out,
                        });
                    }
                    _ => {
                        warn!(
                            "设备 {:04x}:{:04x} 的接口{}缺少批量端点，跳过",
                            descriptor.vendor_id(),
                            descriptor.product_id(),
                            setting.interface_number()
                        );
                    }
                }
            }
        }
    }

    debug!("扫描完成，共{}个MTP/PTP设备", found.len());
    Ok(found)
}
