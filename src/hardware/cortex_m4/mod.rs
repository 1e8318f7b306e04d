//! 硬件相关函数-Cortex-M4
//!
//! 全局调度器 `KERNEL` 以及面向应用的 rt_* 接口。
//! 每次访问 `KERNEL` 都在关中断下进行。

#![warn(unused_imports)]

pub mod context;
pub mod cpuport;
pub mod irq;

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use cortex_m_rt::exception;
use lazy_static::lazy_static;

use crate::hardware::{Port, ThreadEntry};
use crate::kservice::RTIntrFreeCell;
use crate::rtconfig::{SchedulerConfig, IDLE_THREAD_STACK_SIZE, RT_TICK_PER_SECOND};
use crate::rtdef::{RtResult, ThreadId};
use crate::thread::{KernelStack, Scheduler};

pub use self::context::{init, rt_hw_trigger_pendsv};
pub use self::cpuport::{rt_hw_cpu_reset, rt_hw_cpu_shutdown, rt_hw_stack_init, ExceptionStackFrame, StackFrame};
pub use self::irq::{
    rt_hw_interrupt_disable, rt_hw_interrupt_enable, rt_interrupt_enter, rt_interrupt_enter_sethook,
    rt_interrupt_get_nest, rt_interrupt_leave, rt_interrupt_leave_sethook,
};

/// Cortex-M4 移植层
pub struct CortexM4;

impl Port for CortexM4 {
    type Level = u32;

    const SWITCH_VIA_INTERRUPT: bool = true;

    fn interrupt_disable() -> u32 {
        irq::rt_hw_interrupt_disable()
    }

    fn interrupt_enable(level: u32) {
        irq::rt_hw_interrupt_enable(level)
    }

    fn interrupts_masked() -> bool {
        irq::rt_hw_interrupts_masked()
    }

    unsafe fn stack_init(entry: usize, parameter: usize, stack_addr: usize, texit: usize) -> usize {
        unsafe { rt_hw_stack_init(entry, parameter, stack_addr, texit) }
    }

    fn thread_exit_entry() -> usize {
        rt_thread_exit_entry as extern "C" fn() -> ! as usize
    }

    fn trigger_switch_interrupt() {
        rt_hw_trigger_pendsv()
    }
}

lazy_static! {
    /// 调度器
    pub static ref KERNEL: RTIntrFreeCell<Scheduler<CortexM4>, CortexM4> =
        unsafe { RTIntrFreeCell::new(Scheduler::new(SchedulerConfig::new())) };
}

/// 配置 SysTick 为每秒 `RT_TICK_PER_SECOND` 次中断
pub fn rt_hw_systick_init(mut syst: SYST, sysclk: fugit::HertzU32) {
    let reload = sysclk.raw() / RT_TICK_PER_SECOND;
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(reload - 1);
    syst.clear_current();
    syst.enable_counter();
    syst.enable_interrupt();
}

pub fn rt_system_scheduler_config(config: SchedulerConfig) {
    KERNEL.exclusive_access().set_config(config);
}

/// 创建空闲线程
pub fn rt_thread_idle_init() -> RtResult<ThreadId> {
    let stack = KernelStack::new(IDLE_THREAD_STACK_SIZE)?;
    KERNEL.exclusive_access().idle_init(rt_thread_idle_entry, stack)
}

/// 启动调度器，不再返回
pub fn rt_system_scheduler_start() -> ! {
    init();
    KERNEL.exclusive_access().start();
    // 开中断后 PendSV 立即切到第一个线程，主栈上的上下文不再使用
    loop {
        cortex_m::asm::wfi();
    }
}

pub fn rt_schedule() {
    KERNEL.exclusive_access().schedule();
}

/// 进入临界区，直到最外层退出前保持关中断
pub fn rt_enter_critical() {
    let level = rt_hw_interrupt_disable();
    KERNEL.exclusive_access().enter_critical_with(level);
}

/// 退出临界区，最外层退出时开中断并调度
pub fn rt_exit_critical() {
    let level = KERNEL.exclusive_access().leave_critical();
    if let Some(level) = level {
        rt_hw_interrupt_enable(level);
        rt_schedule();
    }
}

pub fn rt_critical_level() -> u16 {
    KERNEL.exclusive_access().critical_level()
}

/// 创建线程，栈从堆上分配
pub fn rt_thread_create(
    name: &str,
    entry: ThreadEntry,
    parameter: usize,
    stack_size: usize,
    priority: u8,
    tick: u32,
) -> RtResult<ThreadId> {
    let stack = KernelStack::new(stack_size)?;
    KERNEL.exclusive_access().thread_create(name, entry, parameter, stack, priority, tick)
}

pub fn rt_thread_startup(thread: ThreadId) -> RtResult {
    KERNEL.exclusive_access().thread_startup(thread)
}

pub fn rt_thread_suspend(thread: ThreadId) -> RtResult {
    KERNEL.exclusive_access().thread_suspend(thread)
}

pub fn rt_thread_resume(thread: ThreadId) -> RtResult {
    KERNEL.exclusive_access().thread_resume(thread)
}

pub fn rt_thread_delete(thread: ThreadId) -> RtResult {
    KERNEL.exclusive_access().thread_delete(thread)
}

pub fn rt_thread_yield() {
    KERNEL.exclusive_access().thread_yield();
}

pub fn rt_thread_self() -> Option<ThreadId> {
    KERNEL.exclusive_access().thread_self()
}

pub fn rt_thread_idle_sethook(hook: fn()) -> RtResult {
    KERNEL.exclusive_access().idle_sethook(hook)
}

pub fn rt_thread_idle_delhook(hook: fn()) -> RtResult {
    KERNEL.exclusive_access().idle_delhook(hook)
}

pub fn rt_tick_get() -> u32 {
    KERNEL.exclusive_access().tick_get()
}

/// 线程入口函数返回后落到这里
extern "C" fn rt_thread_exit_entry() -> ! {
    KERNEL.exclusive_access().thread_exit();
    // 释放借用、开中断后 PendSV 切走，不会再回来
    loop {
        cortex_m::asm::nop();
    }
}

/// 空闲线程入口
extern "C" fn rt_thread_idle_entry(_parameter: usize) {
    loop {
        // 回收回调和钩子都在不持有调度器时调用，内部可以使用 rt_* 接口
        loop {
            let reaped = KERNEL.exclusive_access().reap_defunct();
            match reaped {
                Some(reaped) => reaped.finish(),
                None => break,
            }
        }
        let hooks = KERNEL.exclusive_access().idle_hooks();
        for hook in hooks {
            hook();
        }
    }
}

#[exception]
fn SysTick() {
    rt_interrupt_enter();
    KERNEL.exclusive_access().tick_increase();
    rt_interrupt_leave();
}
