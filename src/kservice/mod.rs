//! 内核基础服务
//!
//! 位查找、下标链表、中断安全单元以及内核打印宏。

#![warn(unused_imports)]

pub mod cell;
pub mod ffs;
pub mod list;

pub use self::cell::{RTIntrFreeCell, RTIntrRefMut};
pub use self::ffs::rt_ffs;
pub use self::list::{ListHead, ListIter, ListNode, NodeArena, RT_LIST_NONE};

/// 内核打印
///
/// 目标板上经半主机输出，测试时走标准输出，其余情况丢弃。
#[macro_export]
macro_rules! rt_kprintf {
    ($($arg:tt)*) => {
        $crate::kservice::_print(format_args!($($arg)*))
    };
}

/// 调试输出，仅在 `debug` 特性下生效
#[macro_export]
macro_rules! rt_debug_log {
    ($($arg:tt)*) => {
        if cfg!(feature = "debug") {
            $crate::rt_kprintf!($($arg)*);
        }
    };
}

/// 不可恢复的内核错误：先打印诊断信息再停机
#[macro_export]
macro_rules! rt_fatal {
    ($($arg:tt)*) => {{
        $crate::rt_kprintf!("[kernel fatal] {}", format_args!($($arg)*));
        panic!($($arg)*)
    }};
}

/// 内核断言，失败即 `rt_fatal!`
#[macro_export]
macro_rules! rt_assert {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::rt_fatal!($($arg)*);
        }
    };
}

#[doc(hidden)]
#[cfg(test)]
pub fn _print(args: core::fmt::Arguments<'_>) {
    std::println!("{}", args);
}

#[doc(hidden)]
#[cfg(all(not(test), feature = "embedded", target_arch = "arm"))]
pub fn _print(args: core::fmt::Arguments<'_>) {
    cortex_m_semihosting::hprintln!("{}", args);
}

#[doc(hidden)]
#[cfg(all(not(test), not(all(feature = "embedded", target_arch = "arm"))))]
pub fn _print(_args: core::fmt::Arguments<'_>) {}
