//! 内核栈
//!
//! 定义了内核栈的结构体和相关函数

#![warn(unused_imports)]

use alloc::alloc::{alloc, dealloc, Layout};
use core::ptr::NonNull;

use crate::rtconfig::RT_ALIGN_SIZE;
use crate::rtdef::{RtError, RtResult};

/// 栈填充字节，用于溢出检测
pub const RT_STACK_FILL: u8 = b'#';

/// 内核栈结构体
/// 注意：栈向下增长，`top` 在高地址，`bottom` 在低地址
pub struct KernelStack {
    bottom: NonNull<u8>,
    size: usize,
    /// 堆上分配的栈在 drop 时归还
    owned: bool,
}

impl KernelStack {
    /// 在堆上分配一个新的内核栈
    pub fn new(size: usize) -> RtResult<Self> {
        let layout = Self::layout(size)?;
        let bottom = NonNull::new(unsafe { alloc(layout) }).ok_or(RtError::NoMemory)?;
        Ok(KernelStack { bottom, size, owned: true })
    }

    /// 使用静态内存作为栈，drop 时不释放
    pub fn from_static(buf: &'static mut [u8]) -> RtResult<Self> {
        if buf.is_empty() {
            return Err(RtError::InvalidArgument);
        }
        let size = buf.len();
        let bottom = NonNull::from(buf).cast::<u8>();
        Ok(KernelStack { bottom, size, owned: false })
    }

    fn layout(size: usize) -> RtResult<Layout> {
        if size == 0 {
            return Err(RtError::InvalidArgument);
        }
        Layout::from_size_align(size, RT_ALIGN_SIZE).map_err(|_| RtError::InvalidArgument)
    }

    /// 获取内核栈的大小
    pub fn size(&self) -> usize {
        self.size
    }

    /// 获取内核栈的低地址端
    pub fn bottom(&self) -> usize {
        self.bottom.as_ptr() as usize
    }

    /// 获取内核栈的高地址端
    pub fn top(&self) -> usize {
        self.bottom() + self.size
    }

    /// 地址是否落在本栈内（含栈顶）
    pub fn contains(&self, sp: usize) -> bool {
        sp > self.bottom() && sp <= self.top()
    }

    pub(crate) fn fill(&mut self, byte: u8) {
        unsafe { core::ptr::write_bytes(self.bottom.as_ptr(), byte, self.size) };
    }

    /// 栈底填充字节仍然完好
    pub(crate) fn magic_intact(&self) -> bool {
        unsafe { *self.bottom.as_ptr() == RT_STACK_FILL }
    }

    #[cfg(test)]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { core::slice::from_raw_parts_mut(self.bottom.as_ptr(), self.size) }
    }
}

/// 内核栈的析构函数
impl Drop for KernelStack {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        if let Ok(layout) = Self::layout(self.size) {
            unsafe { dealloc(self.bottom.as_ptr(), layout) };
        }
    }
}

impl core::fmt::Debug for KernelStack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "KernelStack {{ bottom: {:#x}, size: {:#x} }}", self.bottom(), self.size)
    }
}
