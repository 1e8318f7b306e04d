//! 空闲线程
//!
//! 空闲线程优先级最低且永远就绪。每一轮先回收僵尸队列里的线程，
//! 再依次调用空闲钩子。钩子不能阻塞，也不能挂起自己。

#![warn(unused_imports)]

use crate::hardware::{Port, ThreadEntry};
use crate::rtconfig::{RT_IDLE_HOOK_LIST_SIZE, RT_IDLE_THREAD_PRIORITY};
use crate::rtdef::{RtError, RtResult, ThreadId};
use crate::thread::kstack::KernelStack;
use crate::thread::scheduler::{IrqGuard, Scheduler};

/// 空闲线程时间片
const IDLE_THREAD_TICK: u32 = 32;

/// 已回收的线程。句柄此时已经失效，只用于标识
#[derive(Debug, Clone, Copy)]
pub struct Reaped {
    pub id: ThreadId,
    cleanup: Option<fn(ThreadId)>,
}

impl Reaped {
    pub fn has_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }

    /// 执行回收回调
    pub fn finish(self) {
        if let Some(cleanup) = self.cleanup {
            cleanup(self.id);
        }
    }
}

impl<P: Port> Scheduler<P> {
    /// 创建并启动空闲线程
    pub fn idle_init(&mut self, entry: ThreadEntry, stack: KernelStack) -> RtResult<ThreadId> {
        if self.idle.is_some() {
            return Err(RtError::Busy);
        }
        let id = self.thread_create("tidle", entry, 0, stack, RT_IDLE_THREAD_PRIORITY, IDLE_THREAD_TICK)?;
        self.thread_startup(id)?;
        self.idle = Some(id);
        Ok(id)
    }

    pub fn idle_thread(&self) -> Option<ThreadId> {
        self.idle
    }

    /// 设置空闲钩子，钩子表满返回 `Full`
    pub fn idle_sethook(&mut self, hook: fn()) -> RtResult {
        let _guard = IrqGuard::<P>::new();
        self.idle_hooks.push(hook).map_err(|_| RtError::Full)
    }

    /// 删除空闲钩子，未找到返回 `NoSystem`
    pub fn idle_delhook(&mut self, hook: fn()) -> RtResult {
        let _guard = IrqGuard::<P>::new();
        let index = self
            .idle_hooks
            .iter()
            .position(|h| core::ptr::fn_addr_eq(*h, hook))
            .ok_or(RtError::NoSystem)?;
        self.idle_hooks.remove(index);
        Ok(())
    }

    /// 当前注册的钩子副本，供目标板在不持有调度器时调用
    pub fn idle_hooks(&self) -> heapless::Vec<fn(), RT_IDLE_HOOK_LIST_SIZE> {
        self.idle_hooks.clone()
    }

    /// 僵尸队列长度
    pub fn defunct_len(&self) -> usize {
        self.defunct.len()
    }

    /// 在一个临界区内回收一个僵尸线程：释放栈和控制块。
    ///
    /// 回收回调不在这里调用，由调用者在释放调度器之后执行 `Reaped::finish`，
    /// 回调里可以再次使用调度器接口。
    pub fn reap_defunct(&mut self) -> Option<Reaped> {
        self.enter_critical();
        let reaped = self
            .defunct
            .pop_front(&mut self.threads)
            .and_then(|index| self.threads.id_at(index))
            .map(|id| {
                let cleanup = self.threads.free(id).and_then(|thread| {
                    rt_debug_log!("idle: reap {} {}", thread.name(), id);
                    thread.cleanup
                });
                self.stats.reaped += 1;
                Reaped { id, cleanup }
            });
        self.exit_critical();
        reaped
    }

    /// 回收一个僵尸线程并立即执行它的回收回调
    pub fn reap_one(&mut self) -> Option<ThreadId> {
        let reaped = self.reap_defunct()?;
        reaped.finish();
        Some(reaped.id)
    }

    /// 回收所有僵尸线程，返回回收数量
    pub fn idle_execute(&mut self) -> usize {
        let mut count = 0;
        while self.reap_one().is_some() {
            count += 1;
        }
        count
    }

    /// 空闲线程的一轮：回收后调用所有钩子
    pub fn idle_pass(&mut self) -> usize {
        let count = self.idle_execute();
        for hook in self.idle_hooks.clone() {
            hook();
        }
        count
    }
}
