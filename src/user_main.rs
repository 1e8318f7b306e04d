//! 用户主线程入口
//!
//! 主线程的优先级和栈大小在 rtconfig.rs 中配置。
//! 入口函数必须以 extern "C" 声明，参数是 usize 类型。

use core::sync::atomic::{AtomicU32, Ordering};

use rust_thread_sched::hardware::cortex_m4::{rt_thread_create, rt_thread_idle_sethook, rt_thread_startup, rt_tick_get};
use rust_thread_sched::rt_kprintf;
use rust_thread_sched::RtResult;

static IDLE_COUNT: AtomicU32 = AtomicU32::new(0);

fn idle_counter() {
    IDLE_COUNT.fetch_add(1, Ordering::Relaxed);
}

extern "C" fn worker_entry(parameter: usize) {
    for round in 0..3 {
        rt_kprintf!("worker {} round {} at tick {}", parameter, round, rt_tick_get());
        for _ in 0..10_000 {
            cortex_m::asm::nop();
        }
    }
    rt_kprintf!("worker {} done, idle passes so far: {}", parameter, IDLE_COUNT.load(Ordering::Relaxed));
    // 返回后进入 rt_thread_exit_entry，由空闲线程回收
}

// 用户主线程入口
pub extern "C" fn main_entry(_arg: usize) {
    rt_kprintf!("main_entry...");
    if let Err(e) = spawn_workers() {
        rt_kprintf!("spawn workers failed: {}", e);
    }
}

/// 两个同优先级线程按时间片轮转，一个更高优先级线程先跑完
fn spawn_workers() -> RtResult {
    rt_thread_idle_sethook(idle_counter)?;

    for (parameter, priority) in [(1, 12), (2, 12), (3, 8)] {
        let worker = rt_thread_create("worker", worker_entry, parameter, 0x400, priority, 5)?;
        rt_thread_startup(worker)?;
    }
    Ok(())
}
