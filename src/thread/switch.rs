//! 中断上下文的两阶段切换
//!
//! 中断里不能直接保存当前线程的寄存器，只能先登记 from/to，
//! 再挂起最低优先级的软件中断，由它在安全点完成切换。
//! 连续多次登记会合并：from 固定为第一次的值，to 取最后一次的值。

use crate::rtdef::ThreadId;

/// 切换请求状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchRequest {
    #[default]
    Idle,
    /// `from` 为 `None` 表示没有需要保存的上下文（第一次切换）
    Pending { from: Option<ThreadId>, to: ThreadId },
}

impl SwitchRequest {
    /// 登记一次切换并返回合并后的状态
    pub fn request(self, from: Option<ThreadId>, to: ThreadId) -> Self {
        match self {
            SwitchRequest::Idle => SwitchRequest::Pending { from, to },
            SwitchRequest::Pending { from: first, .. } => SwitchRequest::Pending { from: first, to },
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SwitchRequest::Pending { .. })
    }

    /// 软件中断服务时取走请求，状态回到 `Idle`。
    /// 合并后 from 与 to 相同则无需切换，返回 `None`。
    pub fn take(&mut self) -> Option<(Option<ThreadId>, ThreadId)> {
        match core::mem::take(self) {
            SwitchRequest::Pending { from, to } if from != Some(to) => Some((from, to)),
            _ => None,
        }
    }
}

/// 交给移植层的栈指针槽位
#[derive(Debug, Clone, Copy)]
pub struct SwitchSlots {
    pub from: Option<*mut usize>,
    pub to: *const usize,
}
