//! 空闲线程：僵尸回收与空闲钩子

use std::cell::Cell;

use crate::rtconfig::{SchedulerConfig, RT_IDLE_HOOK_LIST_SIZE, RT_IDLE_THREAD_PRIORITY};
use crate::rtdef::{RtError, ThreadId, ThreadState};
use crate::thread::ListOwner;

use super::mock_port::{dummy_entry, spawn, stack, with_idle, MockPort};

thread_local! {
    static HOOK_CALLS: Cell<u32> = const { Cell::new(0) };
    static OTHER_CALLS: Cell<u32> = const { Cell::new(0) };
    static CLEANED: Cell<Option<ThreadId>> = const { Cell::new(None) };
}

fn counting_hook() {
    HOOK_CALLS.with(|c| c.set(c.get() + 1));
}

fn other_hook() {
    OTHER_CALLS.with(|c| c.set(c.get() + 1));
}

fn record_cleanup(id: ThreadId) {
    CLEANED.with(|c| c.set(Some(id)));
}

#[test]
fn exited_thread_is_reaped_by_idle() {
    let (mut s, idle) = with_idle::<MockPort>(SchedulerConfig::new());
    let a = spawn(&mut s, "A", 10, 5);
    s.thread_set_cleanup(a, record_cleanup).unwrap();
    s.start();

    s.thread_exit();
    assert_eq!(s.thread_self(), Some(idle));
    assert_eq!(s.thread_state(a), Some(ThreadState::Terminated));
    assert_eq!(s.threads().owner(a), ListOwner::Defunct);
    assert_eq!(s.defunct_len(), 1);

    assert_eq!(s.reap_one(), Some(a));
    assert_eq!(CLEANED.with(|c| c.get()), Some(a));
    assert_eq!(s.defunct_len(), 0);
    assert!(s.thread(a).is_none());
    assert_eq!(s.stats().reaped, 1);
    assert_eq!(s.critical_level(), 0);
    assert_eq!(s.reap_one(), None);
}

#[test]
fn deleting_a_ready_thread_detaches_it() {
    let (mut s, _) = with_idle::<MockPort>(SchedulerConfig::new());
    let a = spawn(&mut s, "A", 5, 5);
    let b = spawn(&mut s, "B", 10, 5);
    s.start();

    s.thread_delete(b).unwrap();
    assert_eq!(s.thread_state(b), Some(ThreadState::Terminated));
    assert_eq!(s.ready_queue().bucket_len(10), 0);
    assert!(!s.ready_queue().is_priority_ready(10));
    assert_eq!(s.thread_delete(b), Err(RtError::Error));
    assert_eq!(s.thread_self(), Some(a));

    assert_eq!(s.idle_execute(), 1);
    assert_eq!(s.thread_delete(b), Err(RtError::InvalidArgument));
}

#[test]
fn deleting_current_thread_switches_away() {
    let (mut s, _) = with_idle::<MockPort>(SchedulerConfig::new());
    let a = spawn(&mut s, "A", 10, 5);
    let b = spawn(&mut s, "B", 5, 5);
    s.start();

    s.thread_delete(b).unwrap();
    assert_eq!(s.thread_self(), Some(a));
    assert_eq!(s.defunct_len(), 1);
}

#[test]
fn suspended_and_init_threads_can_be_deleted() {
    let (mut s, _) = with_idle::<MockPort>(SchedulerConfig::new());
    let a = spawn(&mut s, "A", 10, 5);
    let b = spawn(&mut s, "B", 11, 5);
    let c = s.thread_create("C", dummy_entry, 0, stack(), 12, 5).unwrap();
    s.start();
    s.thread_suspend(b).unwrap();

    s.thread_delete(b).unwrap();
    s.thread_delete(c).unwrap();
    assert_eq!(s.idle_execute(), 2);
    assert_eq!(s.threads().len(), 2);
    assert_eq!(s.thread_self(), Some(a));
}

#[test]
fn reaped_slot_is_reused_with_new_generation() {
    let (mut s, _) = with_idle::<MockPort>(SchedulerConfig::new());
    let a = spawn(&mut s, "A", 10, 5);
    s.start();
    s.thread_exit();
    s.idle_execute();

    let b = s.thread_create("B", dummy_entry, 0, stack(), 10, 5).unwrap();
    assert_eq!(a.index(), b.index());
    assert_ne!(a, b);
    assert!(s.thread(a).is_none());
}

#[test]
fn second_idle_init_is_rejected() {
    let (mut s, _) = with_idle::<MockPort>(SchedulerConfig::new());
    assert_eq!(s.idle_init(dummy_entry, stack()).unwrap_err(), RtError::Busy);
}

#[test]
fn idle_hooks_run_each_pass() {
    let (mut s, _) = with_idle::<MockPort>(SchedulerConfig::new());
    s.start();
    s.idle_sethook(counting_hook).unwrap();
    s.idle_sethook(other_hook).unwrap();

    s.idle_pass();
    s.idle_pass();
    assert_eq!(HOOK_CALLS.with(|c| c.get()), 2);
    assert_eq!(OTHER_CALLS.with(|c| c.get()), 2);

    s.idle_delhook(counting_hook).unwrap();
    s.idle_pass();
    assert_eq!(HOOK_CALLS.with(|c| c.get()), 2);
    assert_eq!(OTHER_CALLS.with(|c| c.get()), 3);
}

#[test]
fn hook_table_is_bounded() {
    let (mut s, _) = with_idle::<MockPort>(SchedulerConfig::new());
    for _ in 0..RT_IDLE_HOOK_LIST_SIZE {
        s.idle_sethook(counting_hook).unwrap();
    }
    assert_eq!(s.idle_sethook(other_hook), Err(RtError::Full));
    assert_eq!(s.idle_hooks().len(), RT_IDLE_HOOK_LIST_SIZE);

    // 重复注册的钩子每次删除一个
    s.idle_delhook(counting_hook).unwrap();
    assert_eq!(s.idle_hooks().len(), RT_IDLE_HOOK_LIST_SIZE - 1);
}

#[test]
fn deleting_unknown_hook_fails() {
    let (mut s, _) = with_idle::<MockPort>(SchedulerConfig::new());
    s.idle_sethook(counting_hook).unwrap();
    assert_eq!(s.idle_delhook(other_hook), Err(RtError::NoSystem));
    assert_eq!(s.idle_hooks().len(), 1);
}

#[test]
fn idle_thread_cannot_be_suspended_deleted_or_reprioritised() {
    let (mut s, idle) = with_idle::<MockPort>(SchedulerConfig::new());
    let a = spawn(&mut s, "A", 10, 5);
    s.start();

    assert_eq!(s.thread_suspend(idle), Err(RtError::Error));
    assert_eq!(s.thread_delete(idle), Err(RtError::Error));
    assert_eq!(s.thread_set_priority(idle, 3), Err(RtError::Error));
    assert_eq!(s.thread_restore_priority(idle), Err(RtError::Error));
    assert_eq!(s.thread_state(idle), Some(ThreadState::Ready));
    assert_eq!(s.defunct_len(), 0);

    // 空闲线程仍在，挂起唯一的工作线程后由它接管
    s.thread_suspend(a).unwrap();
    assert_eq!(s.thread_self(), Some(idle));
    assert_eq!(s.thread(idle).unwrap().current_priority(), RT_IDLE_THREAD_PRIORITY);
}

#[test]
fn running_idle_thread_cannot_be_suspended() {
    let (mut s, idle) = with_idle::<MockPort>(SchedulerConfig::new());
    s.start();
    assert_eq!(s.thread_self(), Some(idle));
    assert_eq!(s.thread_suspend(idle), Err(RtError::Error));
    assert_eq!(s.thread_delete(idle), Err(RtError::Error));
    assert_eq!(s.thread_state(idle), Some(ThreadState::Running));
}

#[test]
#[should_panic(expected = "cannot exit")]
fn idle_thread_exit_is_fatal() {
    let (mut s, _) = with_idle::<MockPort>(SchedulerConfig::new());
    s.start();
    s.thread_exit();
}

#[test]
fn cleanup_runs_after_the_slot_is_released() {
    let (mut s, _) = with_idle::<MockPort>(SchedulerConfig::new());
    let a = spawn(&mut s, "A", 10, 5);
    s.thread_set_cleanup(a, record_cleanup).unwrap();
    s.start();
    s.thread_exit();

    let reaped = s.reap_defunct().expect("defunct thread");
    assert_eq!(reaped.id, a);
    assert!(reaped.has_cleanup());
    // 回收完成、临界区已退出，回调还没有执行
    assert!(s.thread(a).is_none());
    assert_eq!(s.critical_level(), 0);
    assert_eq!(CLEANED.with(|c| c.get()), None);

    reaped.finish();
    assert_eq!(CLEANED.with(|c| c.get()), Some(a));
    assert!(s.reap_defunct().is_none());
}
