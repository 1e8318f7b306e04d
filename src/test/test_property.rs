//! 随机操作序列下的调度器不变量

use proptest::prelude::*;

use crate::rtconfig::{RoundRobinPolicy, SchedulerConfig, RT_IDLE_THREAD_PRIORITY, RT_THREAD_MAX};
use crate::rtdef::{ThreadId, ThreadState};
use crate::thread::{ListOwner, Scheduler};

use super::mock_port::{dummy_entry, stack, with_idle, MockPort};

#[derive(Debug, Clone)]
enum Op {
    Create(u8),
    Suspend(usize),
    Resume(usize),
    Delete(usize),
    SetPriority(usize, u8),
    Yield,
    Tick,
    Exit,
    Reap,
    IrqResume(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let priority = 0..RT_IDLE_THREAD_PRIORITY;
    prop_oneof![
        3 => priority.clone().prop_map(Op::Create),
        2 => any::<usize>().prop_map(Op::Suspend),
        2 => any::<usize>().prop_map(Op::Resume),
        1 => any::<usize>().prop_map(Op::Delete),
        1 => (any::<usize>(), priority).prop_map(|(i, p)| Op::SetPriority(i, p)),
        2 => Just(Op::Yield),
        3 => Just(Op::Tick),
        1 => Just(Op::Exit),
        1 => Just(Op::Reap),
        1 => any::<usize>().prop_map(Op::IrqResume),
    ]
}

fn check_invariants(s: &Scheduler<MockPort>) {
    let running: Vec<ThreadId> = s
        .threads()
        .iter()
        .filter(|(_, t)| t.stat() == ThreadState::Running)
        .map(|(id, _)| id)
        .collect();
    assert!(running.len() <= 1);
    if let Some(&id) = running.first() {
        assert_eq!(s.thread_self(), Some(id));
        assert_eq!(s.current_priority(), s.thread(id).unwrap().current_priority());
        // 运行线程不能比任何就绪线程更不紧急
        if let Some(highest) = s.ready_queue().highest_priority() {
            assert!(highest >= s.current_priority());
        }
    }

    let ready = s.ready_queue();
    for priority in 0..=RT_IDLE_THREAD_PRIORITY {
        let bucket: Vec<ThreadId> = ready.bucket(s.threads(), priority).collect();
        assert_eq!(ready.is_priority_ready(priority), !bucket.is_empty());
        assert_eq!(ready.bucket_len(priority), bucket.len());
        for id in bucket {
            let thread = s.thread(id).unwrap();
            assert_eq!(thread.stat(), ThreadState::Ready);
            assert_eq!(thread.current_priority(), priority);
            assert_eq!(s.threads().owner(id), ListOwner::Ready);
        }
    }

    for (id, thread) in s.threads().iter() {
        let queued = s.threads().owner(id) == ListOwner::Ready;
        assert_eq!(queued, thread.stat() == ThreadState::Ready);
    }
}

fn pick(ids: &[ThreadId], i: usize) -> Option<ThreadId> {
    if ids.is_empty() { None } else { Some(ids[i % ids.len()]) }
}

fn apply(s: &mut Scheduler<MockPort>, ids: &mut Vec<ThreadId>, idle: ThreadId, op: Op) {
    // 空闲线程不参与随机操作
    let current_is_worker = s.thread_self().is_some_and(|id| id != idle);
    match op {
        Op::Create(priority) => {
            if s.threads().len() < RT_THREAD_MAX {
                let id = s.thread_create("w", dummy_entry, 0, stack(), priority, 2).unwrap();
                s.thread_startup(id).unwrap();
                ids.push(id);
            }
        }
        Op::Suspend(i) => {
            if let Some(id) = pick(ids, i) {
                let _ = s.thread_suspend(id);
            }
        }
        Op::Resume(i) => {
            if let Some(id) = pick(ids, i) {
                let _ = s.thread_resume(id);
            }
        }
        Op::Delete(i) => {
            if let Some(id) = pick(ids, i) {
                let _ = s.thread_delete(id);
            }
        }
        Op::SetPriority(i, priority) => {
            if let Some(id) = pick(ids, i) {
                let _ = s.thread_set_priority(id, priority);
            }
        }
        Op::Yield => s.thread_yield(),
        Op::Tick => s.tick_increase(),
        Op::Exit => {
            if current_is_worker {
                s.thread_exit();
            }
        }
        Op::Reap => {
            s.idle_execute();
            ids.retain(|&id| s.thread(id).is_some());
        }
        Op::IrqResume(i) => {
            s.interrupt_enter();
            if let Some(id) = pick(ids, i) {
                let _ = s.thread_resume(id);
            }
            s.interrupt_leave();
            let _ = s.take_pending_switch();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_operations_keep_queue_consistent(
        ops in prop::collection::vec(op(), 1..80),
        contended in any::<bool>(),
    ) {
        let policy = if contended { RoundRobinPolicy::WhenContended } else { RoundRobinPolicy::Always };
        let (mut s, idle) = with_idle::<MockPort>(SchedulerConfig::new().round_robin(policy));
        s.start();
        let mut ids = Vec::new();
        for op in ops {
            apply(&mut s, &mut ids, idle, op);
            check_invariants(&s);
            prop_assert_eq!(s.critical_level(), 0);
            prop_assert!(s.thread_state(idle).is_some());
        }
    }
}
