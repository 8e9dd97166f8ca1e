// 对象属性列表解析 - GetObjectPropList负载的模式驱动解析
use std::io::Cursor;

use log::trace;

use crate::mtp::data_types::{PtpDataType, PtpRead};
use crate::mtp::error::Error;

/// 解析GetObjectPropList返回的负载
///
/// 负载为u32元素计数，后接元素序列，每个元素是
/// (对象句柄:u32, 属性码:u16, 数据类型码:u16, 按类型编码的值)。
/// 每个元素原样交给回调，解析器负责投递而不做过滤；负载必须被精确
/// 消费完，多余或缺失字节都按格式错误处理。返回元素个数。
pub fn parse_object_prop_list<F>(payload: &[u8], mut callback: F) -> Result<u32, Error>
where
    F: FnMut(u32, u16, u16, PtpDataType),
{
    let mut cur = Cursor::new(payload);
    let count = cur.read_ptp_u32()?;
    trace!("属性列表包含 {} 个元素", count);

    for _ in 0..count {
        let object_id = cur.read_ptp_u32()?;
        let property_code = cur.read_ptp_u16()?;
        let data_type = cur.read_ptp_u16()?;
        let value = PtpDataType::read_type(data_type, &mut cur)?;
        callback(object_id, property_code, data_type, value);
    }

    cur.expect_end()?;
    Ok(count)
}
