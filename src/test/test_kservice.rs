//! 内核服务：下标链表与中断安全单元

use crate::hardware::Port;
use crate::kservice::{ListHead, ListNode, NodeArena, RTIntrFreeCell};

use super::mock_port::{self, MockPort};

struct Nodes(Vec<ListNode>);

impl NodeArena for Nodes {
    fn node(&self, index: u16) -> &ListNode {
        &self.0[index as usize]
    }

    fn node_mut(&mut self, index: u16) -> &mut ListNode {
        &mut self.0[index as usize]
    }
}

fn nodes(n: usize) -> Nodes {
    Nodes(vec![ListNode::new(); n])
}

#[test]
fn list_keeps_insertion_order() {
    let mut arena = nodes(4);
    let mut list = ListHead::new();
    for i in [2, 0, 3] {
        list.push_back(&mut arena, i);
    }
    assert_eq!(list.len(), 3);
    assert_eq!(list.front(), Some(2));
    assert_eq!(list.iter(&arena).collect::<Vec<_>>(), vec![2, 0, 3]);
}

#[test]
fn list_removes_from_any_position() {
    let mut arena = nodes(4);
    let mut list = ListHead::new();
    for i in 0..4 {
        list.push_back(&mut arena, i);
    }
    list.remove(&mut arena, 2);
    list.remove(&mut arena, 0);
    assert_eq!(list.iter(&arena).collect::<Vec<_>>(), vec![1, 3]);
    list.remove(&mut arena, 3);
    assert_eq!(list.pop_front(&mut arena), Some(1));
    assert!(list.is_empty());
    assert_eq!(list.pop_front(&mut arena), None);

    // 摘下的节点可以重新插入
    list.push_back(&mut arena, 2);
    assert_eq!(list.iter(&arena).collect::<Vec<_>>(), vec![2]);
}

#[test]
fn cell_masks_interrupts_while_borrowed() {
    mock_port::reset();
    let cell: RTIntrFreeCell<u32, MockPort> = unsafe { RTIntrFreeCell::new(1) };
    {
        let mut value = cell.exclusive_access();
        *value += 1;
        assert!(mock_port::state().irq_masked);
    }
    assert!(!mock_port::state().irq_masked);
    assert_eq!(cell.exclusive_session(|v| *v), 2);
}

#[test]
fn cell_restores_outer_mask() {
    mock_port::reset();
    let cell: RTIntrFreeCell<u32, MockPort> = unsafe { RTIntrFreeCell::new(0) };
    let level = MockPort::interrupt_disable();
    cell.exclusive_session(|v| *v = 7);
    assert!(mock_port::state().irq_masked);
    MockPort::interrupt_enable(level);
    assert!(!mock_port::state().irq_masked);
}

#[test]
#[should_panic]
fn cell_rejects_reentrant_borrow() {
    mock_port::reset();
    let cell: RTIntrFreeCell<u32, MockPort> = unsafe { RTIntrFreeCell::new(0) };
    let _outer = cell.exclusive_access();
    let _inner = cell.exclusive_access();
}
