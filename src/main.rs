fn main() {
    // 初始化日志，默认info级别，可用RUST_LOG覆盖
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("运行出错: {}", e);
        std::process::exit(1);
    }
}

/// 演示流程：扫描设备、打开会话、列出存储与根目录对象
fn run() -> Result<(), Box<dyn std::error::Error>> {
    use rmtp::device_connection;
    use rmtp::mtp::error::Error;
    use rmtp::mtp::session::{reserved, Session};
    use rmtp::mtp::standard_codes::StandardResponseCode;

    log::info!("扫描MTP设备...");
    let devices = device_connection::find_devices()?;
    let device = match devices.first() {
        Some(d) => d,
        None => return Err("未发现MTP设备".into()),
    };
    log::info!(
        "使用设备 {:04x}:{:04x}",
        device.vendor_id(),
        device.product_id()
    );

    let channel = device.open()?;
    let mut session = Session::open(channel, 1)?;

    if let Some(info) = session.device_info() {
        log::info!(
            "设备: {} {} (序列号 {})，支持{}个操作",
            info.Manufacturer,
            info.Model,
            info.SerialNumber,
            info.OperationsSupported.len()
        );
    }

    for storage in session.get_storage_ids()? {
        let storage_info = match session.get_storage_info(storage) {
            Ok(info) => info,
            Err(Error::Response(code)) if code == StandardResponseCode::InvalidStorageId => {
                // 锁屏或仅充电模式下设备会拒绝存储访问
                log::warn!("存储 0x{:08x} 不可访问，设备可能处于锁屏或仅充电模式", storage);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        log::info!(
            "存储 0x{:08x}: {} ({}/{} 字节可用)",
            storage,
            storage_info.StorageDescription,
            storage_info.FreeSpaceInBytes,
            storage_info.MaxCapacity
        );

        let handles = session.get_object_handles(storage, 0, reserved::Root)?;
        log::info!("根目录共{}个对象", handles.len());
        for handle in handles.iter().take(32) {
            let info = session.get_object_info(*handle)?;
            log::info!("  {} ({}字节)", info.Filename, info.ObjectCompressedSize);
        }
    }

    session.close();
    Ok(())
}
