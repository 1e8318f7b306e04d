//! 线程相关函数
//!
//! 结构体：RtThread、ThreadTable
//! 函数：thread_create、thread_startup、thread_suspend、thread_resume、thread_yield、
//! thread_exit、thread_delete、thread_set_priority、thread_restore_priority

#![warn(unused_imports)]

use core::fmt::Debug;
use heapless::String;

use crate::hardware::{Port, ThreadEntry};
use crate::kservice::{ListNode, NodeArena};
use crate::rtconfig::*;
use crate::rtdef::*;
use crate::thread::kstack::{KernelStack, RT_STACK_FILL};
use crate::thread::scheduler::{IrqGuard, Scheduler};

/// 线程控制块
pub struct RtThread {
    name: String<RT_NAME_MAX>,

    /// stat
    pub(crate) stat: ThreadState,

    /// 初始优先级与当前优先级，数值越小越紧急
    pub(crate) init_priority: u8,
    pub(crate) current_priority: u8,

    /// 线程相关信息
    pub(crate) entry: usize,
    pub(crate) parameter: usize,

    /// context
    pub(crate) sp: usize,
    pub(crate) stack: KernelStack,

    /// tick
    pub(crate) init_tick: u32,
    pub(crate) remaining_tick: u32,
    pub(crate) yielded: bool,

    /// 空闲线程回收该线程时调用
    pub(crate) cleanup: Option<fn(ThreadId)>,
}

impl RtThread {
    /// 名字超过 `RT_NAME_MAX` 字节时截断
    pub fn new(name: &str, entry: usize, parameter: usize, stack: KernelStack, priority: u8, tick: u32) -> Self {
        let mut short = String::new();
        for c in name.chars() {
            if short.push(c).is_err() {
                break;
            }
        }
        Self {
            name: short,
            stat: ThreadState::Init,
            init_priority: priority,
            current_priority: priority,
            entry,
            parameter,
            sp: 0,
            stack,
            init_tick: tick,
            remaining_tick: tick,
            yielded: false,
            cleanup: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stat(&self) -> ThreadState {
        self.stat
    }

    pub fn init_priority(&self) -> u8 {
        self.init_priority
    }

    pub fn current_priority(&self) -> u8 {
        self.current_priority
    }

    pub fn entry(&self) -> usize {
        self.entry
    }

    pub fn parameter(&self) -> usize {
        self.parameter
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn stack(&self) -> &KernelStack {
        &self.stack
    }

    pub fn init_tick(&self) -> u32 {
        self.init_tick
    }

    pub fn remaining_tick(&self) -> u32 {
        self.remaining_tick
    }
}

impl Debug for RtThread {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RtThread")
            .field("name", &self.name())
            .field("stat", &self.stat)
            .field("priority", &self.current_priority)
            .field("sp", &format_args!("{:#x}", self.sp))
            .finish()
    }
}

/// 线程控制块挂在哪条链表上
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOwner {
    None,
    Ready,
    Defunct,
}

struct Slot {
    generation: u16,
    tlist: ListNode,
    owner: ListOwner,
    thread: Option<RtThread>,
}

impl Slot {
    fn new() -> Self {
        Self {
            generation: 0,
            tlist: ListNode::new(),
            owner: ListOwner::None,
            thread: None,
        }
    }
}

/// 线程表
///
/// 固定容量的线程控制块池，用 `ThreadId` 访问。
/// 就绪队列与僵尸队列的链表节点也存放在这里。
pub struct ThreadTable {
    slots: [Slot; RT_THREAD_MAX],
    used: usize,
}

impl ThreadTable {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::new()),
            used: 0,
        }
    }

    /// 放入线程控制块，表满返回 `NoMemory`
    pub fn alloc(&mut self, thread: RtThread) -> RtResult<ThreadId> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.thread.is_none())
            .ok_or(RtError::NoMemory)?;
        slot.thread = Some(thread);
        slot.tlist = ListNode::new();
        slot.owner = ListOwner::None;
        self.used += 1;
        Ok(ThreadId {
            index: index as u16,
            generation: slot.generation,
        })
    }

    /// 取出线程控制块并作废旧句柄
    pub fn free(&mut self, id: ThreadId) -> Option<RtThread> {
        let slot = self.slot_mut(id)?;
        let thread = slot.thread.take();
        slot.generation = slot.generation.wrapping_add(1);
        slot.owner = ListOwner::None;
        self.used -= 1;
        thread
    }

    fn slot(&self, id: ThreadId) -> Option<&Slot> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation && slot.thread.is_some())
    }

    fn slot_mut(&mut self, id: ThreadId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation && slot.thread.is_some())
    }

    pub fn get(&self, id: ThreadId) -> Option<&RtThread> {
        self.slot(id).and_then(|slot| slot.thread.as_ref())
    }

    pub fn get_mut(&mut self, id: ThreadId) -> Option<&mut RtThread> {
        self.slot_mut(id).and_then(|slot| slot.thread.as_mut())
    }

    /// 下标对应的当前句柄
    pub fn id_at(&self, index: u16) -> Option<ThreadId> {
        let slot = self.slots.get(index as usize)?;
        slot.thread.as_ref()?;
        Some(ThreadId {
            index,
            generation: slot.generation,
        })
    }

    pub fn owner(&self, id: ThreadId) -> ListOwner {
        self.slot(id).map_or(ListOwner::None, |slot| slot.owner)
    }

    pub(crate) fn set_owner(&mut self, id: ThreadId, owner: ListOwner) {
        if let Some(slot) = self.slot_mut(id) {
            slot.owner = owner;
        }
    }

    /// 栈指针槽位，交给移植层做上下文切换
    pub(crate) fn sp_slot(&mut self, id: ThreadId) -> Option<*mut usize> {
        self.get_mut(id).map(|thread| &mut thread.sp as *mut usize)
    }

    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn is_full(&self) -> bool {
        self.used == RT_THREAD_MAX
    }

    pub fn iter(&self) -> impl Iterator<Item = (ThreadId, &RtThread)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.thread.as_ref().map(|thread| {
                (
                    ThreadId {
                        index: index as u16,
                        generation: slot.generation,
                    },
                    thread,
                )
            })
        })
    }
}

impl Default for ThreadTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeArena for ThreadTable {
    fn node(&self, index: u16) -> &ListNode {
        &self.slots[index as usize].tlist
    }

    fn node_mut(&mut self, index: u16) -> &mut ListNode {
        &mut self.slots[index as usize].tlist
    }
}

impl<P: Port> Scheduler<P> {
    /// 创建线程
    /// @param name 线程名称
    /// @param entry 线程入口函数
    /// @param parameter 入口参数
    /// @param stack 线程栈，由线程独占，回收时释放
    /// @param priority 线程优先级
    /// @param tick 线程时间片，0 使用默认值
    /// @return 线程句柄，状态为 Init
    pub fn thread_create(
        &mut self,
        name: &str,
        entry: ThreadEntry,
        parameter: usize,
        stack: KernelStack,
        priority: u8,
        tick: u32,
    ) -> RtResult<ThreadId> {
        if priority as usize >= RT_THREAD_PRIORITY_MAX {
            return Err(RtError::InvalidArgument);
        }
        let tick = if tick == 0 { self.config.default_tick } else { tick };

        let mut thread = RtThread::new(name, entry as usize, parameter, stack, priority, tick);
        thread.stack.fill(RT_STACK_FILL);
        thread.sp = unsafe {
            P::stack_init(
                thread.entry,
                parameter,
                thread.stack.top() - core::mem::size_of::<usize>(),
                P::thread_exit_entry(),
            )
        };

        let _guard = IrqGuard::<P>::new();
        let id = self.threads.alloc(thread)?;
        rt_debug_log!("thread_create: {} {} priority {}", name, id, priority);
        Ok(id)
    }

    /// 启动线程：Init -> Ready
    pub fn thread_startup(&mut self, id: ThreadId) -> RtResult {
        {
            let _guard = IrqGuard::<P>::new();
            let thread = self.threads.get_mut(id).ok_or(RtError::InvalidArgument)?;
            if thread.stat != ThreadState::Init {
                return Err(RtError::Error);
            }
            thread.current_priority = thread.init_priority;
            self.ready_insert(id);
        }
        if self.current.is_some() {
            self.schedule();
        }
        Ok(())
    }

    /// 挂起线程，只能挂起就绪或运行中的线程，空闲线程不可挂起
    pub fn thread_suspend(&mut self, id: ThreadId) -> RtResult {
        self.reject_idle(id)?;
        {
            let _guard = IrqGuard::<P>::new();
            let stat = self.threads.get(id).ok_or(RtError::InvalidArgument)?.stat;
            match stat {
                ThreadState::Ready => self.detach(id),
                ThreadState::Running => {}
                _ => return Err(RtError::Error),
            }
            if let Some(thread) = self.threads.get_mut(id) {
                thread.stat = ThreadState::Suspended;
            }
        }
        if self.current == Some(id) {
            self.schedule();
        }
        Ok(())
    }

    /// 恢复挂起的线程
    pub fn thread_resume(&mut self, id: ThreadId) -> RtResult {
        {
            let _guard = IrqGuard::<P>::new();
            let thread = self.threads.get(id).ok_or(RtError::InvalidArgument)?;
            if thread.stat != ThreadState::Suspended {
                return Err(RtError::Error);
            }
            self.ready_insert(id);
        }
        self.schedule();
        Ok(())
    }

    /// 当前线程让出 CPU，排到同优先级队尾
    pub fn thread_yield(&mut self) {
        {
            let _guard = IrqGuard::<P>::new();
            let Some(thread) = self.current.and_then(|id| self.threads.get_mut(id)) else {
                return;
            };
            if thread.stat != ThreadState::Running {
                return;
            }
            thread.remaining_tick = thread.init_tick;
            thread.yielded = true;
        }
        self.schedule();
    }

    /// 当前线程退出，挂到僵尸队列等待空闲线程回收
    pub fn thread_exit(&mut self) {
        let Some(id) = self.current else {
            rt_fatal!("thread_exit called with no current thread");
        };
        rt_assert!(self.idle != Some(id), "idle thread {} cannot exit", id);
        {
            let _guard = IrqGuard::<P>::new();
            self.detach(id);
            self.defunct_push(id);
        }
        self.schedule();
    }

    /// 删除线程。删除当前线程等同于 `thread_exit`，空闲线程不可删除
    pub fn thread_delete(&mut self, id: ThreadId) -> RtResult {
        self.reject_idle(id)?;
        if self.current == Some(id) {
            self.thread_exit();
            return Ok(());
        }
        let _guard = IrqGuard::<P>::new();
        let thread = self.threads.get(id).ok_or(RtError::InvalidArgument)?;
        if thread.stat == ThreadState::Terminated {
            return Err(RtError::Error);
        }
        self.detach(id);
        self.defunct_push(id);
        Ok(())
    }

    /// 修改当前优先级；在就绪队列中的线程会被移到新的优先级队列
    pub fn thread_set_priority(&mut self, id: ThreadId, priority: u8) -> RtResult {
        if priority as usize >= RT_THREAD_PRIORITY_MAX {
            return Err(RtError::InvalidArgument);
        }
        self.reject_idle(id)?;
        {
            let _guard = IrqGuard::<P>::new();
            let stat = self.threads.get(id).ok_or(RtError::InvalidArgument)?.stat;
            if stat == ThreadState::Ready {
                self.ready_remove(id);
            }
            if let Some(thread) = self.threads.get_mut(id) {
                thread.current_priority = priority;
            }
            if stat == ThreadState::Ready {
                self.ready_insert(id);
            }
            if self.current == Some(id) {
                self.current_priority = priority;
            }
        }
        self.schedule();
        Ok(())
    }

    /// 恢复初始优先级
    pub fn thread_restore_priority(&mut self, id: ThreadId) -> RtResult {
        let priority = self.threads.get(id).ok_or(RtError::InvalidArgument)?.init_priority;
        self.thread_set_priority(id, priority)
    }

    /// 设置回收回调
    pub fn thread_set_cleanup(&mut self, id: ThreadId, cleanup: fn(ThreadId)) -> RtResult {
        let thread = self.threads.get_mut(id).ok_or(RtError::InvalidArgument)?;
        thread.cleanup = Some(cleanup);
        Ok(())
    }

    pub fn thread_self(&self) -> Option<ThreadId> {
        self.current
    }

    pub fn thread(&self, id: ThreadId) -> Option<&RtThread> {
        self.threads.get(id)
    }

    pub fn thread_state(&self, id: ThreadId) -> Option<ThreadState> {
        self.threads.get(id).map(|thread| thread.stat)
    }

    pub fn threads(&self) -> &ThreadTable {
        &self.threads
    }

    /// 空闲线程必须一直就绪且处于最低优先级
    fn reject_idle(&self, id: ThreadId) -> RtResult {
        if self.idle == Some(id) {
            return Err(RtError::Error);
        }
        Ok(())
    }

    /// 从就绪队列摘下（如果在队列里）
    fn detach(&mut self, id: ThreadId) {
        if self.threads.owner(id) == ListOwner::Ready {
            self.ready_remove(id);
        }
    }

    fn defunct_push(&mut self, id: ThreadId) {
        if let Some(thread) = self.threads.get_mut(id) {
            thread.stat = ThreadState::Terminated;
        }
        self.defunct.push_back(&mut self.threads, id.index);
        self.threads.set_owner(id, ListOwner::Defunct);
    }
}
