#![no_std]
#![no_main]

// pick a panicking behavior
use panic_halt as _; // you can put a breakpoint on `rust_begin_unwind` to catch panics

use buddy_system_allocator::LockedHeap;
use cortex_m_rt::entry;
use stm32f4xx_hal::{pac, prelude::*};

use rust_thread_sched::hardware::cortex_m4::{
    rt_hw_cpu_shutdown, rt_hw_systick_init, rt_system_scheduler_start, rt_thread_create, rt_thread_idle_init,
    rt_thread_startup,
};
use rust_thread_sched::rt_kprintf;
use rust_thread_sched::rtconfig::{RT_HEAP_SIZE, RT_MAIN_THREAD_PRIORITY, RT_MAIN_THREAD_STACK_SIZE};

mod user_main;

#[global_allocator]
static HEAP_ALLOCATOR: LockedHeap<32> = LockedHeap::empty();

static mut HEAP: [u8; RT_HEAP_SIZE] = [0; RT_HEAP_SIZE];

#[entry]
fn main() -> ! {
    rt_kprintf!("RusT-thread scheduler booting...");

    init_heap();

    let (Some(dp), Some(cp)) = (pac::Peripherals::take(), cortex_m::Peripherals::take()) else {
        rt_kprintf!("peripherals already taken");
        rt_hw_cpu_shutdown();
    };
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.sysclk(84.MHz()).freeze();
    rt_hw_systick_init(cp.SYST, clocks.sysclk());

    if let Err(e) = rtthread_startup() {
        rt_kprintf!("startup failed: {}", e);
        rt_hw_cpu_shutdown();
    }
    rt_system_scheduler_start()
}

fn init_heap() {
    unsafe {
        HEAP_ALLOCATOR.lock().init(&raw mut HEAP as usize, RT_HEAP_SIZE);
    }
}

/// 创建空闲线程和用户主线程
fn rtthread_startup() -> rust_thread_sched::RtResult {
    rt_thread_idle_init()?;
    let main = rt_thread_create(
        "main",
        user_main::main_entry,
        0,
        RT_MAIN_THREAD_STACK_SIZE,
        RT_MAIN_THREAD_PRIORITY,
        20,
    )?;
    rt_thread_startup(main)
}
