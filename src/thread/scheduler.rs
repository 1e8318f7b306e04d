//! 调度器相关函数
//!
//! 结构体：Scheduler、SchedulerStats
//! 函数：start、schedule、enter_critical、exit_critical、critical_level、
//! interrupt_enter、interrupt_leave、take_pending_switch

#![warn(unused_imports)]

use core::marker::PhantomData;

use heapless::Vec;

use crate::hardware::Port;
use crate::kservice::ListHead;
use crate::rtconfig::*;
use crate::rtdef::{ThreadId, ThreadState};
use crate::thread::switch::{SwitchRequest, SwitchSlots};
use crate::thread::thread::ThreadTable;
use crate::thread::thread_priority_table::ThreadPriorityTable;

/// 作用域内关中断，离开作用域恢复原状态
pub(crate) struct IrqGuard<P: Port>(P::Level);

impl<P: Port> IrqGuard<P> {
    pub(crate) fn new() -> Self {
        Self(P::interrupt_disable())
    }
}

impl<P: Port> Drop for IrqGuard<P> {
    fn drop(&mut self) {
        P::interrupt_enable(self.0);
    }
}

/// 调度统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    /// 调用 `schedule` 的次数
    pub schedule_calls: u32,
    /// 线程上下文中立即完成的切换
    pub context_switches: u32,
    /// 登记给软件中断的切换请求
    pub switch_requests: u32,
    /// 软件中断实际完成的切换
    pub switches_serviced: u32,
    /// 线程被放回就绪队列队尾的次数
    pub requeues: u32,
    /// 空闲线程回收的线程数
    pub reaped: u32,
}

/// 调度器
///
/// 就绪队列、当前线程、临界区嵌套计数等全部共享状态都在这里，
/// 目标板上放在一个全局的中断安全单元里。
pub struct Scheduler<P: Port> {
    pub(crate) threads: ThreadTable,
    pub(crate) ready: ThreadPriorityTable,
    /// 僵尸线程队列
    pub(crate) defunct: ListHead,
    /// 当前线程
    pub(crate) current: Option<ThreadId>,
    /// 当前优先级
    pub(crate) current_priority: u8,
    started: bool,
    /// 锁嵌套计数
    lock_nest: u16,
    /// 最外层 enter_critical 之前的中断状态
    critical_level: Option<P::Level>,
    interrupt_nest: u8,
    switch: SwitchRequest,
    pub(crate) idle: Option<ThreadId>,
    pub(crate) idle_hooks: Vec<fn(), RT_IDLE_HOOK_LIST_SIZE>,
    pub(crate) config: SchedulerConfig,
    pub(crate) tick: u32,
    pub(crate) stats: SchedulerStats,
    #[cfg(feature = "hook")]
    scheduler_hook: Option<fn(Option<ThreadId>, ThreadId)>,
    _port: PhantomData<fn() -> P>,
}

impl<P: Port> Scheduler<P> {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            threads: ThreadTable::new(),
            ready: ThreadPriorityTable::new(),
            defunct: ListHead::new(),
            current: None,
            current_priority: RT_IDLE_THREAD_PRIORITY,
            started: false,
            lock_nest: 0,
            critical_level: None,
            interrupt_nest: 0,
            switch: SwitchRequest::Idle,
            idle: None,
            idle_hooks: Vec::new(),
            config,
            tick: 0,
            stats: SchedulerStats::default(),
            #[cfg(feature = "hook")]
            scheduler_hook: None,
            _port: PhantomData,
        }
    }

    /// 启动调度器，切换到最高优先级的就绪线程
    pub fn start(&mut self) {
        let _guard = IrqGuard::<P>::new();
        rt_assert!(!self.started, "scheduler started twice");
        let Some(to) = self.ready.highest_ready(&self.threads) else {
            rt_fatal!("scheduler started with no ready thread");
        };
        self.ready_remove(to);
        self.set_running(to);
        self.started = true;
        rt_debug_log!("scheduler start: {}", to);
        self.dispatch(None, to);
    }

    /// 调度
    ///
    /// 临界区内或调度器未启动时直接返回，`exit_critical` 会补做一次。
    /// 当前线程仍在运行且更紧急（或同级且未让出）时不切换。
    pub fn schedule(&mut self) {
        self.stats.schedule_calls += 1;
        let _guard = IrqGuard::<P>::new();
        if self.lock_nest > 0 || !self.started {
            return;
        }

        let from = self.current;
        let mut from_running = false;
        if let Some(id) = from {
            if let Some(thread) = self.threads.get_mut(id) {
                if thread.stat == ThreadState::Running {
                    if thread.yielded {
                        // 让出的线程先排到同级队尾，再参与选择
                        thread.yielded = false;
                        self.requeue(id);
                    } else {
                        from_running = true;
                    }
                }
            }
        }

        let Some(to) = self.ready.highest_ready(&self.threads) else {
            if from_running {
                return;
            }
            let (name, priority, stat) = from
                .and_then(|id| self.threads.get(id))
                .map_or(("<none>", 0, None), |t| (t.name(), t.current_priority, Some(t.stat)));
            rt_fatal!(
                "no ready thread to dispatch, current thread:{} priority:{} stat:{:?}",
                name,
                priority,
                stat
            );
        };

        if from == Some(to) {
            // 让出后仍是唯一的最高优先级线程，继续运行
            self.ready_remove(to);
            self.set_running(to);
            return;
        }

        let to_priority = self.priority_of(to);
        if let Some(id) = from.filter(|_| from_running) {
            if self.priority_of(id) <= to_priority {
                return;
            }
            self.requeue(id);
        }

        self.ready_remove(to);
        self.set_running(to);
        self.dispatch(from, to);
    }

    /// 进入临界区
    pub fn enter_critical(&mut self) {
        let level = P::interrupt_disable();
        self.enter_critical_with(level);
    }

    /// 进入临界区，调用者已关中断，`level` 是关中断之前的状态
    pub fn enter_critical_with(&mut self, level: P::Level) {
        if self.lock_nest >= RT_CRITICAL_NEST_MAX {
            rt_fatal!("critical section nesting overflow at level {}", self.lock_nest);
        }
        if self.lock_nest == 0 {
            self.critical_level = Some(level);
        }
        self.lock_nest += 1;
    }

    /// 退出临界区
    ///
    /// 回到最外层时恢复中断并调度一次；否则保持关中断。
    pub fn exit_critical(&mut self) {
        if let Some(level) = self.leave_critical() {
            P::interrupt_enable(level);
            if self.started {
                self.schedule();
            }
        }
    }

    /// 退出一层临界区，不恢复中断也不调度。
    /// 回到最外层时返回进入前的中断状态，由调用者恢复后再调度。
    pub fn leave_critical(&mut self) -> Option<P::Level> {
        if self.lock_nest == 0 {
            rt_fatal!("exit_critical without a matching enter_critical");
        }
        self.lock_nest -= 1;
        if self.lock_nest > 0 {
            return None;
        }
        match self.critical_level.take() {
            Some(level) => Some(level),
            None => rt_fatal!("critical section lost its saved interrupt state"),
        }
    }

    /// 获取临界区嵌套层数
    pub fn critical_level(&self) -> u16 {
        self.lock_nest
    }

    /// 中断进入时调用
    pub fn interrupt_enter(&mut self) {
        let _guard = IrqGuard::<P>::new();
        self.interrupt_nest = match self.interrupt_nest.checked_add(1) {
            Some(nest) => nest,
            None => rt_fatal!("interrupt nesting overflow"),
        };
    }

    /// 中断退出时调用
    pub fn interrupt_leave(&mut self) {
        let _guard = IrqGuard::<P>::new();
        rt_assert!(self.interrupt_nest > 0, "interrupt_leave without a matching interrupt_enter");
        self.interrupt_nest -= 1;
    }

    /// 获取当前中断嵌套层数
    pub fn interrupt_nest(&self) -> u8 {
        self.interrupt_nest
    }

    /// 软件中断服务函数调用：取走挂起的切换，返回栈指针槽位
    pub fn take_pending_switch(&mut self) -> Option<SwitchSlots> {
        let (from, to) = self.switch.take()?;
        let Some(to) = self.threads.sp_slot(to) else {
            rt_fatal!("pending switch to stale thread {}", to);
        };
        let from = from.and_then(|id| self.threads.sp_slot(id));
        self.stats.switches_serviced += 1;
        Some(SwitchSlots { from, to })
    }

    pub fn pending_switch(&self) -> SwitchRequest {
        self.switch
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// 当前线程的优先级
    pub fn current_priority(&self) -> u8 {
        self.current_priority
    }

    pub fn ready_queue(&self) -> &ThreadPriorityTable {
        &self.ready
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SchedulerConfig) {
        self.config = config;
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// 设置调度钩子，每次真正发生切换时调用
    #[cfg(feature = "hook")]
    pub fn set_scheduler_hook(&mut self, hook: fn(Option<ThreadId>, ThreadId)) {
        self.scheduler_hook = Some(hook);
    }

    /// 打印线程列表
    pub fn list_thread(&self) {
        rt_kprintf!("thread   pri  status     sp         stack size  left tick");
        rt_kprintf!("-------- ---  ---------- ---------- ----------  ---------");
        for (_, thread) in self.threads.iter() {
            rt_kprintf!(
                "{:<8} {:>3}  {:<10} {:#010x} {:#010x}  {:>9}",
                thread.name(),
                thread.current_priority,
                thread.stat,
                thread.sp,
                thread.stack.size(),
                thread.remaining_tick
            );
        }
    }

    pub(crate) fn ready_insert(&mut self, id: ThreadId) {
        self.assert_masked("ready queue insert");
        self.ready.insert(&mut self.threads, id);
    }

    pub(crate) fn ready_remove(&mut self, id: ThreadId) {
        self.assert_masked("ready queue remove");
        self.ready.remove(&mut self.threads, id);
    }

    fn assert_masked(&self, op: &str) {
        if cfg!(debug_assertions) && !P::interrupts_masked() {
            rt_fatal!("{} with interrupts enabled", op);
        }
    }

    fn requeue(&mut self, id: ThreadId) {
        if let Some(thread) = self.threads.get_mut(id) {
            thread.stat = ThreadState::Ready;
        }
        self.ready_insert(id);
        self.stats.requeues += 1;
    }

    fn set_running(&mut self, id: ThreadId) {
        let priority = match self.threads.get_mut(id) {
            Some(thread) => {
                thread.stat = ThreadState::Running;
                thread.current_priority
            }
            None => rt_fatal!("dispatch to stale thread {}", id),
        };
        self.current = Some(id);
        self.current_priority = priority;
    }

    fn priority_of(&self, id: ThreadId) -> u8 {
        self.threads.get(id).map_or(RT_IDLE_THREAD_PRIORITY, |thread| thread.current_priority)
    }

    /// 完成或登记一次切换
    fn dispatch(&mut self, from: Option<ThreadId>, to: ThreadId) {
        if self.config.stack_check {
            self.stack_check(to);
        }
        #[cfg(feature = "hook")]
        if let Some(hook) = self.scheduler_hook {
            hook(from, to);
        }
        rt_debug_log!("switch {:?} -> {} at tick {}", from, to, self.tick);

        if P::SWITCH_VIA_INTERRUPT || self.interrupt_nest > 0 {
            self.switch = self.switch.request(from, to);
            self.stats.switch_requests += 1;
            P::trigger_switch_interrupt();
            return;
        }

        let Some(to_sp) = self.threads.sp_slot(to) else {
            rt_fatal!("dispatch to stale thread {}", to);
        };
        self.stats.context_switches += 1;
        match from.and_then(|id| self.threads.sp_slot(id)) {
            Some(from_sp) => unsafe { P::context_switch(from_sp, to_sp) },
            None => unsafe { P::context_switch_to(to_sp) },
        }
    }

    /// 栈溢出检查：栈底填充字节被改写或栈指针越界即停机
    fn stack_check(&self, id: ThreadId) {
        let Some(thread) = self.threads.get(id) else {
            return;
        };
        let stack = &thread.stack;
        if !stack.magic_intact() || !stack.contains(thread.sp) {
            rt_fatal!(
                "thread:{} priority:{} stack overflow, sp {:#x} outside {:#x}..{:#x}",
                thread.name(),
                thread.current_priority,
                thread.sp,
                stack.bottom(),
                stack.top()
            );
        }
        if thread.sp <= stack.bottom() + RT_STACK_WARN_MARGIN {
            rt_kprintf!("warning: {} stack is close to end of stack address.", thread.name());
        }
    }
}
