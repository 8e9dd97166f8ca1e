// 对象流抽象 - 输入/输出两个能力接口，连接流用于头与负载的无拷贝拼接
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::mtp::error::Error;

/// 进度回调，参数为累计已传输字节数
pub type ProgressFn = Box<dyn FnMut(u64) + Send>;

/// 可共享的粘性取消标志
///
/// 置位后不可复位；持有同一标志的所有流在下一次read/write入口处失败。
/// 可从其他线程置位。
#[derive(Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 请求取消
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// 取消与进度的公共部分，嵌入各具体流
#[derive(Default)]
struct StreamControl {
    token: Option<CancellationToken>,
    progress: Option<ProgressFn>,
    transferred: u64,
}

impl StreamControl {
    /// 每次read/write入口处的取消检查
    fn check(&self) -> Result<(), Error> {
        match &self.token {
            Some(t) if t.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    /// 成功传输一块后推进进度
    fn advance(&mut self, n: usize) {
        self.transferred += n as u64;
        if let Some(progress) = &mut self.progress {
            progress(self.transferred);
        }
    }
}

/// 对象输入流：大小已知，read只在流结束时返回短计数
///
/// 不变式：read返回0当且仅当流已结束；流中间的read总是填满缓冲区。
/// 连接流依赖这一点来判定第一个流何时耗尽。
pub trait ObjectInputStream {
    /// 构造时声明的总大小(字节)
    fn size(&self) -> u64;

    /// 读取至多buf.len()字节，返回实际读取数
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// 取消检查；无取消标志的流默认永不取消
    fn check_cancelled(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// 对象输出流
///
/// 不变式：write只在接收方已满或被取消时返回短计数。
pub trait ObjectOutputStream {
    /// 写入buf，返回实际接受的字节数
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error>;

    /// 传输总量已知时由协议层调用一次，默认忽略
    fn set_total(&mut self, _total: u64) {}

    /// 取消检查；无取消标志的流默认永不取消
    fn check_cancelled(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: ObjectInputStream + ?Sized> ObjectInputStream for &mut T {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        (**self).read(buf)
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        (**self).check_cancelled()
    }
}

impl<T: ObjectOutputStream + ?Sized> ObjectOutputStream for &mut T {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        (**self).write(buf)
    }

    fn set_total(&mut self, total: u64) {
        (**self).set_total(total)
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        (**self).check_cancelled()
    }
}

/// 内存字节输入流
pub struct ByteArrayInputStream {
    data: Vec<u8>,
    pos: usize,
    control: StreamControl,
}

impl ByteArrayInputStream {
    pub fn new(data: Vec<u8>) -> Self {
        ByteArrayInputStream {
            data,
            pos: 0,
            control: StreamControl::default(),
        }
    }

    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.control.token = Some(token);
    }

    pub fn set_progress_reporter(&mut self, f: impl FnMut(u64) + Send + 'static) {
        self.control.progress = Some(Box::new(f));
    }
}

impl ObjectInputStream for ByteArrayInputStream {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.control.check()?;
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        if n > 0 {
            self.control.advance(n);
        }
        Ok(n)
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        self.control.check()
    }
}

/// 内存字节输出流
#[derive(Default)]
pub struct ByteArrayOutputStream {
    data: Vec<u8>,
    control: StreamControl,
}

impl ByteArrayOutputStream {
    pub fn new() -> Self {
        ByteArrayOutputStream::default()
    }

    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.control.token = Some(token);
    }

    pub fn set_progress_reporter(&mut self, f: impl FnMut(u64) + Send + 'static) {
        self.control.progress = Some(Box::new(f));
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl ObjectOutputStream for ByteArrayOutputStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.control.check()?;
        self.data.extend_from_slice(buf);
        if !buf.is_empty() {
            self.control.advance(buf.len());
        }
        Ok(buf.len())
    }

    fn set_total(&mut self, total: u64) {
        self.data.reserve(total as usize);
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        self.control.check()
    }
}

/// 文件输入流，打开时记录大小
pub struct FileInputStream {
    file: File,
    size: u64,
    control: StreamControl,
}

impl FileInputStream {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(FileInputStream {
            file,
            size,
            control: StreamControl::default(),
        })
    }

    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.control.token = Some(token);
    }

    pub fn set_progress_reporter(&mut self, f: impl FnMut(u64) + Send + 'static) {
        self.control.progress = Some(Box::new(f));
    }
}

impl ObjectInputStream for FileInputStream {
    fn size(&self) -> u64 {
        self.size
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.control.check()?;
        // 循环填满缓冲区，维持"短读即结束"的不变式
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled > 0 {
            self.control.advance(filled);
        }
        Ok(filled)
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        self.control.check()
    }
}

/// 文件输出流
pub struct FileOutputStream {
    file: File,
    control: StreamControl,
}

impl FileOutputStream {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::create(path)?;
        Ok(FileOutputStream {
            file,
            control: StreamControl::default(),
        })
    }

    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.control.token = Some(token);
    }

    pub fn set_progress_reporter(&mut self, f: impl FnMut(u64) + Send + 'static) {
        self.control.progress = Some(Box::new(f));
    }
}

impl ObjectOutputStream for FileOutputStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.control.check()?;
        self.file.write_all(buf)?;
        if !buf.is_empty() {
            self.control.advance(buf.len());
        }
        Ok(buf.len())
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        self.control.check()
    }
}

/// 限长输入流：从内部流读取至多limit字节，之后报告流结束
pub struct FixedSizeInputStream<S: ObjectInputStream> {
    inner: S,
    remaining: u64,
    limit: u64,
}

impl<S: ObjectInputStream> FixedSizeInputStream<S> {
    pub fn new(inner: S, limit: u64) -> Self {
        FixedSizeInputStream {
            inner,
            remaining: limit,
            limit,
        }
    }
}

impl<S: ObjectInputStream> ObjectInputStream for FixedSizeInputStream<S> {
    fn size(&self) -> u64 {
        self.limit.min(self.inner.size())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let want = (buf.len() as u64).min(self.remaining) as usize;
        if want == 0 {
            return Ok(0);
        }
        let n = self.inner.read(&mut buf[..want])?;
        self.remaining -= n as u64;
        Ok(n)
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        self.inner.check_cancelled()
    }
}

/// 限长输出流：向内部流写入至多limit字节，超出部分以短计数拒绝
pub struct FixedSizeOutputStream<S: ObjectOutputStream> {
    inner: S,
    remaining: u64,
}

impl<S: ObjectOutputStream> FixedSizeOutputStream<S> {
    pub fn new(inner: S, limit: u64) -> Self {
        FixedSizeOutputStream {
            inner,
            remaining: limit,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ObjectOutputStream> ObjectOutputStream for FixedSizeOutputStream<S> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let want = (buf.len() as u64).min(self.remaining) as usize;
        if want == 0 {
            return Ok(0);
        }
        let n = self.inner.write(&buf[..want])?;
        self.remaining -= n as u64;
        Ok(n)
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        self.inner.check_cancelled()
    }
}

/// 连接输入流：两个流顺次表现为一个流
///
/// 第一个流返回短计数即视为耗尽，触发一次on_stream1_exhausted回调，
/// 同一次read的剩余部分立即由第二个流补足。协议层用它把容器头与负载流
/// 拼接成一次发送，无需合并拷贝。
pub struct JoinedInputStream<'a> {
    stream1: Box<dyn ObjectInputStream + 'a>,
    stream2: Box<dyn ObjectInputStream + 'a>,
    size: u64,
    stream1_exhausted: bool,
    on_stream1_exhausted: Option<Box<dyn FnMut() + 'a>>,
    control: StreamControl,
}

impl<'a> JoinedInputStream<'a> {
    pub fn new(
        stream1: Box<dyn ObjectInputStream + 'a>,
        stream2: Box<dyn ObjectInputStream + 'a>,
    ) -> Self {
        let size = stream1.size() + stream2.size();
        JoinedInputStream {
            stream1,
            stream2,
            size,
            stream1_exhausted: false,
            on_stream1_exhausted: None,
            control: StreamControl::default(),
        }
    }

    /// 注册第一个流耗尽时的回调，恰好触发一次
    pub fn set_on_stream1_exhausted(&mut self, f: impl FnMut() + 'a) {
        self.on_stream1_exhausted = Some(Box::new(f));
    }

    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.control.token = Some(token);
    }

    pub fn set_progress_reporter(&mut self, f: impl FnMut(u64) + Send + 'static) {
        self.control.progress = Some(Box::new(f));
    }
}

impl<'a> ObjectInputStream for JoinedInputStream<'a> {
    fn size(&self) -> u64 {
        self.size
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.control.check()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let n = if !self.stream1_exhausted {
            let mut r = self.stream1.read(buf)?;
            if r < buf.len() {
                self.stream1_exhausted = true;
                if let Some(hook) = &mut self.on_stream1_exhausted {
                    hook();
                }
                r += self.stream2.read(&mut buf[r..])?;
            }
            r
        } else {
            self.stream2.read(buf)?
        };
        if n > 0 {
            self.control.advance(n);
        }
        Ok(n)
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        self.control.check()
    }
}

/// 连接输出流，与JoinedInputStream对称
pub struct JoinedOutputStream<'a> {
    stream1: Box<dyn ObjectOutputStream + 'a>,
    stream2: Box<dyn ObjectOutputStream + 'a>,
    stream1_exhausted: bool,
    on_stream1_exhausted: Option<Box<dyn FnMut() + 'a>>,
    control: StreamControl,
}

impl<'a> JoinedOutputStream<'a> {
    pub fn new(
        stream1: Box<dyn ObjectOutputStream + 'a>,
        stream2: Box<dyn ObjectOutputStream + 'a>,
    ) -> Self {
        JoinedOutputStream {
            stream1,
            stream2,
            stream1_exhausted: false,
            on_stream1_exhausted: None,
            control: StreamControl::default(),
        }
    }

    /// 注册第一个流写满时的回调，恰好触发一次
    pub fn set_on_stream1_exhausted(&mut self, f: impl FnMut() + 'a) {
        self.on_stream1_exhausted = Some(Box::new(f));
    }

    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.control.token = Some(token);
    }
}

impl<'a> ObjectOutputStream for JoinedOutputStream<'a> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.control.check()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let n = if !self.stream1_exhausted {
            let mut r = self.stream1.write(buf)?;
            if r < buf.len() {
                self.stream1_exhausted = true;
                if let Some(hook) = &mut self.on_stream1_exhausted {
                    hook();
                }
                r += self.stream2.write(&buf[r..])?;
            }
            r
        } else {
            self.stream2.write(buf)?
        };
        if n > 0 {
            self.control.advance(n);
        }
        Ok(n)
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        self.control.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// 每次read最多返回cap字节的输入流，用于验证连接流在各种块边界下的行为
    struct ChunkedInput {
        inner: ByteArrayInputStream,
        cap: usize,
    }

    impl ObjectInputStream for ChunkedInput {
        fn size(&self) -> u64 {
            self.inner.size()
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
            let n = buf.len().min(self.cap);
            self.inner.read(&mut buf[..n])
        }
    }

    #[test]
    fn byte_array_read_write() {
        let mut input = ByteArrayInputStream::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(input.size(), 5);
        let mut buf = [0u8; 3];
        assert_eq!(input.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(input.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(input.read(&mut buf).unwrap(), 0);

        let mut output = ByteArrayOutputStream::new();
        output.write(&[1, 2]).unwrap();
        output.write(&[3]).unwrap();
        assert_eq!(output.into_inner(), vec![1, 2, 3]);
    }

    #[test]
    fn joined_input_reproduces_any_split() {
        let data: Vec<u8> = (0u8..=99).collect();
        for split in [0usize, 1, 37, 50, 99, 100] {
            let s1 = ByteArrayInputStream::new(data[..split].to_vec());
            let s2 = ByteArrayInputStream::new(data[split..].to_vec());
            let mut joined = JoinedInputStream::new(Box::new(s1), Box::new(s2));
            assert_eq!(joined.size(), 100);

            let mut out = vec![];
            let mut buf = [0u8; 7];
            loop {
                let n = joined.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&buf[..n]);
            }
            assert_eq!(out, data, "切分点 {} 处数据不一致", split);
        }
    }

    #[test]
    fn joined_input_hook_fires_exactly_once_at_boundary() {
        let fired = Arc::new(AtomicUsize::new(0));
        let seen_at = Arc::new(AtomicUsize::new(0));

        let s1 = ByteArrayInputStream::new(vec![0xAA; 10]);
        let s2 = ByteArrayInputStream::new(vec![0xBB; 20]);
        let mut joined = JoinedInputStream::new(Box::new(s1), Box::new(s2));

        let total = Arc::new(AtomicUsize::new(0));
        {
            let fired = fired.clone();
            let seen_at = seen_at.clone();
            let total = total.clone();
            joined.set_on_stream1_exhausted(move || {
                fired.fetch_add(1, Ordering::SeqCst);
                seen_at.store(total.load(Ordering::SeqCst), Ordering::SeqCst);
            });
        }

        let mut buf = [0u8; 4];
        loop {
            let n = joined.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            total.fetch_add(n, Ordering::SeqCst);
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        // 回调发生在累计字节数越过第一个流大小(10)的那次read内，
        // 此前已完整读出的是8字节
        assert_eq!(seen_at.load(Ordering::SeqCst), 8);
        assert_eq!(total.load(Ordering::SeqCst), 30);
    }

    #[test]
    fn joined_output_reproduces_any_split() {
        let data: Vec<u8> = (0u8..=79).collect();
        for split in [0usize, 1, 40, 79, 80] {
            let mut s1 = FixedSizeOutputStream::new(ByteArrayOutputStream::new(), split as u64);
            let mut s2 = ByteArrayOutputStream::new();
            let fired = Arc::new(AtomicUsize::new(0));
            {
                let mut joined = JoinedOutputStream::new(Box::new(&mut s1), Box::new(&mut s2));
                {
                    let fired = fired.clone();
                    joined.set_on_stream1_exhausted(move || {
                        fired.fetch_add(1, Ordering::SeqCst);
                    });
                }
                let mut written = 0;
                while written < data.len() {
                    let n = joined.write(&data[written..(written + 9).min(data.len())]).unwrap();
                    assert!(n > 0);
                    written += n;
                }
            }
            let head = s1.into_inner().into_inner();
            let tail = s2.into_inner();
            assert_eq!(head, data[..split].to_vec());
            assert_eq!(tail, data[split..].to_vec());
            if split < data.len() {
                assert_eq!(fired.load(Ordering::SeqCst), 1, "切分点 {}", split);
            }
        }
    }

    #[test]
    fn joined_input_with_chunked_first_stream() {
        // 第一个流在中途返回短计数会被视为耗尽，因此具体流必须填满缓冲区；
        // 这里验证符合不变式的流在连接后不会丢数据
        let s1 = ByteArrayInputStream::new(vec![1; 16]);
        let s2 = ChunkedInput {
            inner: ByteArrayInputStream::new(vec![2; 16]),
            cap: 16,
        };
        let mut joined = JoinedInputStream::new(Box::new(s1), Box::new(s2));
        let mut out = vec![];
        let mut buf = [0u8; 8];
        loop {
            let n = joined.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out.len(), 32);
    }

    #[test]
    fn cancellation_is_sticky_and_checked_on_entry() {
        let token = CancellationToken::new();
        let mut input = ByteArrayInputStream::new(vec![1, 2, 3]);
        input.set_cancellation_token(token.clone());

        let mut buf = [0u8; 2];
        assert_eq!(input.read(&mut buf).unwrap(), 2);

        token.cancel();
        assert!(matches!(input.read(&mut buf), Err(Error::Cancelled)));
        // 粘性：再次调用仍然失败
        assert!(matches!(input.read(&mut buf), Err(Error::Cancelled)));
    }

    #[test]
    fn cancelling_joined_propagates_before_children_touched() {
        let token = CancellationToken::new();
        let s1 = ByteArrayInputStream::new(vec![1; 4]);
        let s2 = ByteArrayInputStream::new(vec![2; 4]);
        let mut joined = JoinedInputStream::new(Box::new(s1), Box::new(s2));
        joined.set_cancellation_token(token.clone());

        token.cancel();
        let mut buf = [0u8; 8];
        assert!(matches!(joined.read(&mut buf), Err(Error::Cancelled)));
    }

    #[test]
    fn progress_reports_cumulative_bytes() {
        let reported = Arc::new(std::sync::Mutex::new(vec![]));
        let mut input = ByteArrayInputStream::new(vec![0; 10]);
        {
            let reported = reported.clone();
            input.set_progress_reporter(move |n| reported.lock().unwrap().push(n));
        }
        let mut buf = [0u8; 4];
        while input.read(&mut buf).unwrap() > 0 {}
        assert_eq!(*reported.lock().unwrap(), vec![4, 8, 10]);
    }

    #[test]
    fn fixed_size_input_limits_reads() {
        let inner = ByteArrayInputStream::new(vec![7; 100]);
        let mut limited = FixedSizeInputStream::new(inner, 10);
        assert_eq!(limited.size(), 10);
        let mut buf = [0u8; 64];
        assert_eq!(limited.read(&mut buf).unwrap(), 10);
        assert_eq!(limited.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn file_streams_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("object.bin");
        let payload: Vec<u8> = (0u8..200).collect();

        {
            let mut out = FileOutputStream::create(&path).unwrap();
            out.write(&payload).unwrap();
        }

        let mut input = FileInputStream::open(&path).unwrap();
        assert_eq!(input.size(), 200);
        let mut read_back = vec![];
        let mut buf = [0u8; 33];
        loop {
            let n = input.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            read_back.extend_from_slice(&buf[..n]);
        }
        assert_eq!(read_back, payload);
    }
}
