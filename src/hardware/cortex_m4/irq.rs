//! 中断管理模块
//!
//! 本文件提供了中断嵌套计数、钩子设置、使能/禁用中断等功能。
//! 主要函数：
//! - rt_hw_interrupt_disable/enable：保存/恢复 PRIMASK，常用于临界区保护。
//! - rt_interrupt_enter/leave：中断进入/退出时调用，维护嵌套计数。
//! - rt_interrupt_get_nest：获取当前中断嵌套层数。
//! - rt_interrupt_enter_sethook/leave_sethook：设置中断进入/退出钩子。

use core::arch::asm;

use cortex_m::register::primask;
use spin::Mutex;

use super::KERNEL;

// 钩子只在关中断时写入，中断里读取时不会遇到锁被持有
static INTERRUPT_ENTER_HOOK: Mutex<Option<fn()>> = Mutex::new(None);
static INTERRUPT_LEAVE_HOOK: Mutex<Option<fn()>> = Mutex::new(None);

/// 禁用中断，并返回原 PRIMASK 状态。
pub fn rt_hw_interrupt_disable() -> u32 {
    let level: u32;
    unsafe {
        asm!(
            "MRS {0}, PRIMASK",
            "CPSID I",
            out(reg) level,
            options(nostack, preserves_flags)
        );
    }
    level
}

/// 恢复中断状态。
/// 参数 level 应为 rt_hw_interrupt_disable 返回值。
pub fn rt_hw_interrupt_enable(level: u32) {
    unsafe {
        asm!(
            "MSR PRIMASK, {0}",
            in(reg) level,
            options(nostack, preserves_flags)
        );
    }
}

pub fn rt_hw_interrupts_masked() -> bool {
    primask::read().is_inactive()
}

/// 设置中断进入钩子函数
pub fn rt_interrupt_enter_sethook(hook: fn()) {
    let level = rt_hw_interrupt_disable();
    *INTERRUPT_ENTER_HOOK.lock() = Some(hook);
    rt_hw_interrupt_enable(level);
}

/// 设置中断退出钩子函数
pub fn rt_interrupt_leave_sethook(hook: fn()) {
    let level = rt_hw_interrupt_disable();
    *INTERRUPT_LEAVE_HOOK.lock() = Some(hook);
    rt_hw_interrupt_enable(level);
}

/// 中断进入时调用，在中断服务函数入口处调用。
pub fn rt_interrupt_enter() {
    KERNEL.exclusive_access().interrupt_enter();
    let hook = *INTERRUPT_ENTER_HOOK.lock();
    if let Some(hook) = hook {
        hook();
    }
}

/// 中断退出时调用。
/// 这里不做调度，需要的切换已经登记给 PendSV。
pub fn rt_interrupt_leave() {
    let hook = *INTERRUPT_LEAVE_HOOK.lock();
    if let Some(hook) = hook {
        hook();
    }
    KERNEL.exclusive_access().interrupt_leave();
}

/// 获取当前中断嵌套层数
pub fn rt_interrupt_get_nest() -> u8 {
    KERNEL.exclusive_access().interrupt_nest()
}
