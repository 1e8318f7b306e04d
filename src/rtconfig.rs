//! 本模块是RT-Thread的配置模块
//! 包含了RT-Thread的配置信息

#![warn(unused_imports)]

/// 最大优先级
#[cfg(not(feature = "full_ffs"))]
pub const RT_THREAD_PRIORITY_MAX: usize = 32;
#[cfg(feature = "full_ffs")]
pub const RT_THREAD_PRIORITY_MAX: usize = 256;

const _: () = assert!(RT_THREAD_PRIORITY_MAX >= 2 && RT_THREAD_PRIORITY_MAX <= 256);

/// 空闲线程优先级
pub const RT_IDLE_THREAD_PRIORITY: u8 = (RT_THREAD_PRIORITY_MAX - 1) as u8;

/// 线程控制块数量上限
pub const RT_THREAD_MAX: usize = 32;

/// 时钟频率
pub const RT_TICK_PER_SECOND: u32 = 1000;

/// 对齐大小
pub const RT_ALIGN_SIZE: usize = 8;

/// 最大名称长度
pub const RT_NAME_MAX: usize = 8;

/// 空闲钩子数量
pub const RT_IDLE_HOOK_LIST_SIZE: usize = 4;

/// 空闲线程栈大小
pub const IDLE_THREAD_STACK_SIZE: usize = 0x400;

/// 内核栈大小
pub const KERNEL_STACK_SIZE: usize = 0x400; // 1kB

/// 用户主线程优先级
pub const RT_MAIN_THREAD_PRIORITY: u8 = 10;

/// 主函数堆栈大小
pub const RT_MAIN_THREAD_STACK_SIZE: usize = 0x800;

/// 系统堆大小
pub const RT_HEAP_SIZE: usize = 0x8000; // 32kB

/// 临界区最大嵌套层数
pub const RT_CRITICAL_NEST_MAX: u16 = u16::MAX - 1;

/// 默认时间片
pub const RT_DEFAULT_TICK: u32 = 10;

/// 栈溢出告警距离
pub const RT_STACK_WARN_MARGIN: usize = 32;

/// 时间片用完后是否让出 CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundRobinPolicy {
    /// 总是重新插入队尾，同优先级只有自己时会立刻再次被选中
    Always,
    /// 仅当同优先级还有其他就绪线程时才让出
    WhenContended,
}

/// 调度器运行时配置
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub round_robin: RoundRobinPolicy,
    /// 创建线程时 tick 为 0 则使用该值
    pub default_tick: u32,
    /// 切换前检查目标线程栈
    pub stack_check: bool,
}

impl SchedulerConfig {
    pub const fn new() -> Self {
        Self {
            round_robin: RoundRobinPolicy::Always,
            default_tick: RT_DEFAULT_TICK,
            stack_check: true,
        }
    }

    pub const fn round_robin(mut self, policy: RoundRobinPolicy) -> Self {
        self.round_robin = policy;
        self
    }

    pub const fn default_tick(mut self, tick: u32) -> Self {
        self.default_tick = tick;
        self
    }

    pub const fn stack_check(mut self, enable: bool) -> Self {
        self.stack_check = enable;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}
