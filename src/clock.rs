//! 时钟模块
//!
//! 系统节拍计数以及时间片轮转

#![warn(unused_imports)]

use fugit::MillisDurationU32;

use crate::hardware::Port;
use crate::rtconfig::{RoundRobinPolicy, RT_TICK_PER_SECOND};
use crate::rtdef::ThreadState;
use crate::thread::Scheduler;

pub const RT_WAITING_FOREVER: u32 = 0xFFFFFFFF;

/// 节拍对应的时长类型
pub type TickDuration = fugit::TimerDurationU32<RT_TICK_PER_SECOND>;

impl<P: Port> Scheduler<P> {
    /// 获取当前时钟周期
    pub fn tick_get(&self) -> u32 {
        self.tick
    }

    /// 设置当前时钟周期
    pub fn tick_set(&mut self, tick: u32) {
        self.tick = tick;
    }

    /// 时钟中断处理函数
    ///
    /// 当前线程时间片用完后重新装填，按轮转策略决定是否让出 CPU。
    pub fn tick_increase(&mut self) {
        let yielded = {
            let level = P::interrupt_disable();
            self.tick = self.tick.wrapping_add(1);
            let policy = self.config.round_robin;
            let expired = match self.current.and_then(|id| self.threads.get_mut(id)) {
                Some(thread) if thread.stat == ThreadState::Running => {
                    thread.remaining_tick = thread.remaining_tick.saturating_sub(1);
                    if thread.remaining_tick == 0 {
                        thread.remaining_tick = thread.init_tick;
                        Some(thread.current_priority)
                    } else {
                        None
                    }
                }
                _ => None,
            };
            let yielded = match expired {
                Some(priority) => {
                    policy == RoundRobinPolicy::Always || self.ready.bucket_len(priority) > 0
                }
                None => false,
            };
            if yielded {
                if let Some(thread) = self.current.and_then(|id| self.threads.get_mut(id)) {
                    thread.yielded = true;
                }
            }
            P::interrupt_enable(level);
            yielded
        };

        if yielded {
            rt_debug_log!("tick {}: time slice expired", self.tick);
            self.schedule();
        }
    }
}

/// 将毫秒转换为时钟周期，负数表示永久等待
pub fn tick_from_millisecond(ms: i32) -> u32 {
    if ms < 0 {
        return RT_WAITING_FOREVER;
    }
    let ms = ms as u32;
    let tick = RT_TICK_PER_SECOND * (ms / 1000);
    tick + (RT_TICK_PER_SECOND * (ms % 1000)).div_ceil(1000)
}

/// 时长转换为时钟周期，不足一个周期向上取整
pub fn tick_from_duration(duration: MillisDurationU32) -> u32 {
    let ticks: TickDuration = duration.convert();
    let exact: MillisDurationU32 = ticks.convert();
    if exact < duration {
        ticks.ticks() + 1
    } else {
        ticks.ticks()
    }
}

/// 节拍数换算为毫秒
pub fn tick_to_millisecond(tick: u32) -> u32 {
    TickDuration::from_ticks(tick).to_millis()
}
