//! 硬件抽象
//!
//! 调度器只通过 `Port` 与 CPU 打交道：开关中断、构造初始栈帧、
//! 保存/恢复上下文、触发最低优先级的软件中断。
//! 具体实现见 `cortex_m4`（目标板）以及测试里的模拟端口。

#![warn(unused_imports)]

#[cfg(all(feature = "embedded", target_arch = "arm"))]
pub mod cortex_m4;

/// 线程入口，参数经 r0 传入
pub type ThreadEntry = extern "C" fn(parameter: usize);

/// CPU 移植层接口
///
/// 所有方法都是关联函数：移植层只有一份全局硬件状态。
pub trait Port {
    /// `interrupt_disable` 返回的中断状态
    type Level: Copy;

    /// 为 `true` 时线程上下文里的切换也走软件中断，
    /// 调度器只记录切换请求，不调用 `context_switch`。
    const SWITCH_VIA_INTERRUPT: bool = false;

    /// 关中断并返回原状态
    fn interrupt_disable() -> Self::Level;

    /// 恢复 `interrupt_disable` 返回的状态
    fn interrupt_enable(level: Self::Level);

    /// 当前是否处于关中断状态
    fn interrupts_masked() -> bool;

    /// 在 `stack_addr`（栈顶）下方构造初始栈帧，返回新的栈指针。
    ///
    /// 第一次切入该线程时的效果等同于从中断返回到 `entry(parameter)`，
    /// `entry` 返回后跳到 `texit`。
    ///
    /// # Safety
    /// `stack_addr` 必须位于一块调用者独占且足够大的栈内存之内。
    unsafe fn stack_init(entry: usize, parameter: usize, stack_addr: usize, texit: usize) -> usize;

    /// 线程入口函数返回后的落脚点
    fn thread_exit_entry() -> usize;

    /// 立即切换：保存当前上下文到 `*from_sp`，从 `*to_sp` 恢复
    ///
    /// # Safety
    /// 两个指针都必须指向存活线程控制块里的栈指针。
    unsafe fn context_switch(from_sp: *mut usize, to_sp: *const usize) {
        let _ = (from_sp, to_sp);
        rt_fatal!("port has no direct context switch, switches go through the software interrupt");
    }

    /// 第一次切换，没有需要保存的上下文
    ///
    /// # Safety
    /// 同 `context_switch`。
    unsafe fn context_switch_to(to_sp: *const usize) {
        let _ = to_sp;
        rt_fatal!("port has no direct context switch, switches go through the software interrupt");
    }

    /// 挂起最低优先级的软件中断，由它完成延迟切换
    fn trigger_switch_interrupt();
}
