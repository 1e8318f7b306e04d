//! RusT-thread 调度器内核
//!
//! RT-Thread 风格的抢占式优先级调度器：
//! 位图就绪队列、可嵌套临界区、两阶段中断切换、空闲线程回收。
//!
//! 优先级约定：数值越小越紧急，`RT_THREAD_PRIORITY_MAX - 1` 保留给空闲线程。

#![cfg_attr(not(test), no_std)]
#![warn(unused_imports)]

extern crate alloc;

#[macro_use]
pub mod kservice;

pub mod clock;
pub mod hardware;
pub mod rtconfig;
pub mod rtdef;
pub mod thread;

pub use rtdef::{RtError, RtResult, ThreadId, ThreadState};
pub use thread::{Scheduler, SchedulerStats};

#[cfg(test)]
mod test;
