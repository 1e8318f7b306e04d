//! 下标双向链表
//!
//! 节点不持有指针，只记录前驱/后继在线程表中的下标，
//! 插入、删除都是 O(1)。`RT_LIST_NONE` 表示空。

pub const RT_LIST_NONE: u16 = u16::MAX;

/// 链表节点，存放在线程表槽位里
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListNode {
    pub(crate) prev: u16,
    pub(crate) next: u16,
}

impl ListNode {
    pub const fn new() -> Self {
        Self {
            prev: RT_LIST_NONE,
            next: RT_LIST_NONE,
        }
    }
}

impl Default for ListNode {
    fn default() -> Self {
        Self::new()
    }
}

/// 提供节点存储的容器
pub trait NodeArena {
    fn node(&self, index: u16) -> &ListNode;
    fn node_mut(&mut self, index: u16) -> &mut ListNode;
}

/// 链表头
#[derive(Debug, Clone, Copy)]
pub struct ListHead {
    head: u16,
    tail: u16,
    len: u16,
}

impl ListHead {
    pub const fn new() -> Self {
        Self {
            head: RT_LIST_NONE,
            tail: RT_LIST_NONE,
            len: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head == RT_LIST_NONE
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn front(&self) -> Option<u16> {
        (self.head != RT_LIST_NONE).then_some(self.head)
    }

    /// 追加到队尾
    pub fn push_back<A: NodeArena + ?Sized>(&mut self, arena: &mut A, index: u16) {
        let tail = self.tail;
        {
            let node = arena.node_mut(index);
            node.prev = tail;
            node.next = RT_LIST_NONE;
        }
        if tail == RT_LIST_NONE {
            self.head = index;
        } else {
            arena.node_mut(tail).next = index;
        }
        self.tail = index;
        self.len += 1;
    }

    /// 摘除节点，调用者保证节点在本链表上
    pub fn remove<A: NodeArena + ?Sized>(&mut self, arena: &mut A, index: u16) {
        let ListNode { prev, next } = *arena.node(index);
        if prev == RT_LIST_NONE {
            self.head = next;
        } else {
            arena.node_mut(prev).next = next;
        }
        if next == RT_LIST_NONE {
            self.tail = prev;
        } else {
            arena.node_mut(next).prev = prev;
        }
        *arena.node_mut(index) = ListNode::new();
        self.len -= 1;
    }

    pub fn pop_front<A: NodeArena + ?Sized>(&mut self, arena: &mut A) -> Option<u16> {
        let head = self.front()?;
        self.remove(arena, head);
        Some(head)
    }

    pub fn iter<'a, A: NodeArena + ?Sized>(&self, arena: &'a A) -> ListIter<'a, A> {
        ListIter {
            arena,
            cursor: self.head,
        }
    }
}

impl Default for ListHead {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ListIter<'a, A: NodeArena + ?Sized> {
    arena: &'a A,
    cursor: u16,
}

impl<A: NodeArena + ?Sized> Iterator for ListIter<'_, A> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.cursor == RT_LIST_NONE {
            return None;
        }
        let index = self.cursor;
        self.cursor = self.arena.node(index).next;
        Some(index)
    }
}
