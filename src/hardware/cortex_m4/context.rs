//! 线程上下文切换模块-Cortex-M4
//!
//! 所有切换都经过 PendSV：调度器登记 from/to 后挂起 PendSV，
//! PendSV 优先级最低，总在所有其他中断处理完之后、回到线程之前执行。
//! 不保存 FPU 寄存器，目标为软浮点 ABI。

#![warn(unused_imports)]

use core::arch::global_asm;

use cortex_m::peripheral::SCB;

use super::KERNEL;

const NVIC_SYSPRI2: u32 = 0xE000ED20; // system priority register (2)
const NVIC_PENDSV_PRI: u32 = 0xFFFF0000; // PendSV and SysTick priority value (lowest)

/// 把 PendSV 和 SysTick 设为最低优先级
pub fn init() {
    unsafe {
        let nvic_syspri2 = NVIC_SYSPRI2 as *mut u32;
        let temp = core::ptr::read_volatile(nvic_syspri2);
        core::ptr::write_volatile(nvic_syspri2, temp | NVIC_PENDSV_PRI);
    }
}

/// 挂起 PendSV
pub fn rt_hw_trigger_pendsv() {
    SCB::set_pendsv();
}

/// PendSV 中取走挂起的切换
///
/// 返回值低 32 位是 from 栈指针槽位（0 表示无需保存），
/// 高 32 位是 to 栈指针槽位（0 表示无需切换）。
#[unsafe(no_mangle)]
extern "C" fn rt_hw_pendsv_take() -> u64 {
    match KERNEL.exclusive_access().take_pending_switch() {
        Some(slots) => {
            let from = slots.from.map_or(0, |p| p as usize as u32);
            let to = slots.to as usize as u32;
            (from as u64) | ((to as u64) << 32)
        }
        None => 0,
    }
}

// PendSV中断处理函数 - 进行实际的上下文切换
//
// r0 = from 槽位，r1 = to 槽位。保存 r4-r11 到当前 PSP，
// 从目标线程栈恢复 r4-r11，用 PSP 返回线程模式。
global_asm!(
    ".section .text.PendSV, \"ax\"",
    ".global PendSV",
    ".type PendSV, %function",
    ".thumb_func",
    "PendSV:",
    "    mrs r2, primask",
    "    cpsid i",
    "    push {{r2, lr}}",
    "    bl rt_hw_pendsv_take",
    "    pop {{r2, r3}}",
    "    cbz r1, 2f",
    "    cbz r0, 1f",
    "    mrs r12, psp",
    "    stmdb r12!, {{r4-r11}}",
    "    str r12, [r0]",
    "1:",
    "    ldr r12, [r1]",
    "    ldmia r12!, {{r4-r11}}",
    "    msr psp, r12",
    "    orr r3, r3, #0x04",
    "2:",
    "    msr primask, r2",
    "    bx r3",
    ".size PendSV, . - PendSV",
);
