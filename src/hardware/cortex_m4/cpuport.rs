//! Cortex-M4 栈帧与 CPU 相关函数

use core::fmt;
use core::ptr;

// 异常栈帧，进入异常时由硬件压栈
#[repr(C)]
pub struct ExceptionStackFrame {
    pub r0: u32,  // 线程入口参数
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,  // 线程退出处理函数
    pub pc: u32,  // 线程入口函数
    pub psr: u32, // xPSR, 必须设置Thumb位
}

// PendSV 软件保存的 r4-r11 在硬件栈帧之下
#[repr(C)]
pub struct StackFrame {
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    pub exception_stack_frame: ExceptionStackFrame,
}

impl fmt::Debug for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.exception_stack_frame;
        write!(
            f,
            "StackFrame {{ r4: {:x}, r5: {:x}, r6: {:x}, r7: {:x}, r8: {:x}, r9: {:x}, r10: {:x}, r11: {:x}, \
             r0: {:x}, r1: {:x}, r2: {:x}, r3: {:x}, r12: {:x}, lr: {:x}, pc: {:x}, psr: {:x} }}",
            self.r4, self.r5, self.r6, self.r7, self.r8, self.r9, self.r10, self.r11,
            e.r0, e.r1, e.r2, e.r3, e.r12, e.lr, e.pc, e.psr
        )
    }
}

const XPSR_THUMB: u32 = 0x01000000;

/// 栈初始化函数
///
/// # Safety
/// `stack_addr` 以下至少要有 `size_of::<StackFrame>() + 8` 字节可写。
pub unsafe fn rt_hw_stack_init(tentry: usize, parameter: usize, stack_addr: usize, texit: usize) -> usize {
    // 栈顶对齐到8字节
    let mut stk = stack_addr + core::mem::size_of::<u32>();
    stk &= !0x7;
    stk -= core::mem::size_of::<StackFrame>();

    let stack_frame = stk as *mut StackFrame;

    unsafe {
        // 初始化所有寄存器为0xdeadbeef
        let p = stack_frame as *mut u32;
        for i in 0..(core::mem::size_of::<StackFrame>() / 4) {
            ptr::write(p.add(i), 0xdeadbeef);
        }

        // 填充异常栈帧
        let frame = &mut (*stack_frame).exception_stack_frame;
        frame.r0 = parameter as u32;
        frame.r1 = 0;
        frame.r2 = 0;
        frame.r3 = 0;
        frame.r12 = 0;
        frame.lr = texit as u32;
        frame.pc = tentry as u32;
        frame.psr = XPSR_THUMB;
    }

    stk
}

/// CPU关机
#[unsafe(no_mangle)]
pub extern "C" fn rt_hw_cpu_shutdown() -> ! {
    rt_kprintf!("shutdown...");
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}

/// CPU重启
#[unsafe(no_mangle)]
pub extern "C" fn rt_hw_cpu_reset() -> ! {
    cortex_m::peripheral::SCB::sys_reset()
}
