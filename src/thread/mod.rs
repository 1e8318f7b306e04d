//! 线程与调度
//!
//! 线程控制块、就绪队列、调度器、空闲线程

pub mod idle;
pub mod kstack;
pub mod scheduler;
pub mod switch;
pub mod thread;
pub mod thread_priority_table;

pub use self::idle::Reaped;
pub use self::kstack::{KernelStack, RT_STACK_FILL};
pub use self::scheduler::{Scheduler, SchedulerStats};
pub use self::switch::{SwitchRequest, SwitchSlots};
pub use self::thread::{ListOwner, RtThread, ThreadTable};
pub use self::thread_priority_table::ThreadPriorityTable;
