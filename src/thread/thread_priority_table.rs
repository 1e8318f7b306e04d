//! 就绪队列
//!
//! 每个优先级一条 FIFO 链表，外加就绪优先级位图。
//! 优先级数不超过 32 时位图是一个字；超过 32 时用两级位图：
//! `ready_priority_group` 的每一位对应 `ready_table` 中的一个字节，
//! 每个字节管 8 个优先级。

#![warn(unused_imports)]

use crate::kservice::{rt_ffs, ListHead};
use crate::rtconfig::RT_THREAD_PRIORITY_MAX;
use crate::rtdef::{ThreadId, ThreadState};
use crate::thread::thread::{ListOwner, ThreadTable};

const TWO_LEVEL: bool = RT_THREAD_PRIORITY_MAX > 32;

/// 线程优先级表
pub struct ThreadPriorityTable {
    table: [ListHead; RT_THREAD_PRIORITY_MAX],
    ready_table: [u8; 32],
    ready_priority_group: u32,
}

impl ThreadPriorityTable {
    /// 创建一个线程优先级表
    pub const fn new() -> Self {
        Self {
            table: [ListHead::new(); RT_THREAD_PRIORITY_MAX],
            ready_table: [0; 32],
            ready_priority_group: 0,
        }
    }

    /// 插入到 `current_priority` 对应队列的队尾，并置为 Ready
    pub fn insert(&mut self, threads: &mut ThreadTable, id: ThreadId) {
        if threads.owner(id) != ListOwner::None {
            let (name, priority) = describe(threads, id);
            rt_fatal!("thread:{} priority:{} is already queued", name, priority);
        }
        let Some(thread) = threads.get_mut(id) else {
            rt_fatal!("ready queue insert of stale handle {}", id);
        };
        if thread.stat == ThreadState::Running {
            rt_fatal!(
                "thread:{} priority:{} inserted into the ready queue while running",
                thread.name(),
                thread.current_priority
            );
        }
        thread.stat = ThreadState::Ready;
        let priority = thread.current_priority;

        self.table[priority as usize].push_back(threads, id.index);
        threads.set_owner(id, ListOwner::Ready);
        self.tag_on_priority(priority);
    }

    /// 从所在队列移除；队列变空时清除位图
    pub fn remove(&mut self, threads: &mut ThreadTable, id: ThreadId) {
        if threads.owner(id) != ListOwner::Ready {
            let (name, priority) = describe(threads, id);
            rt_fatal!("thread:{} priority:{} removed from the ready queue but not queued", name, priority);
        }
        let Some(priority) = threads.get(id).map(|thread| thread.current_priority) else {
            rt_fatal!("ready queue remove of stale handle {}", id);
        };

        self.table[priority as usize].remove(threads, id.index);
        threads.set_owner(id, ListOwner::None);
        if self.table[priority as usize].is_empty() {
            self.tag_off_priority(priority);
        }
    }

    /// 最高优先级队列的队首，不出队
    pub fn highest_ready(&self, threads: &ThreadTable) -> Option<ThreadId> {
        let priority = self.highest_priority()?;
        let index = self.table[priority as usize].front()?;
        threads.id_at(index)
    }

    /// 最高就绪优先级（数值最小）
    pub fn highest_priority(&self) -> Option<u8> {
        if self.ready_priority_group == 0 {
            return None;
        }
        if TWO_LEVEL {
            // 先减一再拼接，255 在 u8 上相加会溢出
            let number = (rt_ffs(self.ready_priority_group) - 1) as usize;
            let bit = (rt_ffs(self.ready_table[number] as u32) - 1) as usize;
            Some(((number << 3) | bit) as u8)
        } else {
            Some(rt_ffs(self.ready_priority_group) - 1)
        }
    }

    /// 位图中 `priority` 是否置位
    pub fn is_priority_ready(&self, priority: u8) -> bool {
        if TWO_LEVEL {
            self.ready_table[(priority >> 3) as usize] & (1 << (priority & 0x07)) != 0
        } else {
            self.ready_priority_group & (1 << priority) != 0
        }
    }

    /// 获取就绪优先级组
    pub fn ready_priority_group(&self) -> u32 {
        self.ready_priority_group
    }

    pub fn bucket_len(&self, priority: u8) -> usize {
        self.table[priority as usize].len()
    }

    /// 按出队顺序遍历某个优先级的线程
    pub fn bucket<'a>(&self, threads: &'a ThreadTable, priority: u8) -> impl Iterator<Item = ThreadId> + 'a {
        self.table[priority as usize]
            .iter(threads)
            .filter_map(|index| threads.id_at(index))
    }

    pub fn is_empty(&self) -> bool {
        self.ready_priority_group == 0
    }

    /// 设置priority在ready_priority_group中的标记
    fn tag_on_priority(&mut self, priority: u8) {
        if TWO_LEVEL {
            let number = priority >> 3;
            self.ready_table[number as usize] |= 1 << (priority & 0x07);
            self.ready_priority_group |= 1 << number;
        } else {
            self.ready_priority_group |= 1 << priority;
        }
    }

    /// 去除priority在ready_priority_group中的标记
    fn tag_off_priority(&mut self, priority: u8) {
        if TWO_LEVEL {
            let number = priority >> 3;
            self.ready_table[number as usize] &= !(1 << (priority & 0x07));
            if self.ready_table[number as usize] == 0 {
                self.ready_priority_group &= !(1 << number);
            }
        } else {
            self.ready_priority_group &= !(1 << priority);
        }
    }
}

impl Default for ThreadPriorityTable {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(threads: &ThreadTable, id: ThreadId) -> (&str, u8) {
    threads
        .get(id)
        .map_or(("<stale>", 0), |thread| (thread.name(), thread.current_priority))
}
