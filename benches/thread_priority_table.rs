use std::sync::atomic::{AtomicBool, Ordering};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rust_thread_sched::hardware::Port;
use rust_thread_sched::kservice::rt_ffs;
use rust_thread_sched::rtconfig::{SchedulerConfig, RT_IDLE_THREAD_PRIORITY};
use rust_thread_sched::thread::{KernelStack, RtThread, ThreadPriorityTable, ThreadTable};
use rust_thread_sched::{Scheduler, ThreadId};

// 基准测试里不切换上下文，只统计调度器本身的开销
static MASKED: AtomicBool = AtomicBool::new(false);

struct NullPort;

impl Port for NullPort {
    type Level = bool;

    fn interrupt_disable() -> bool {
        MASKED.swap(true, Ordering::Relaxed)
    }

    fn interrupt_enable(level: bool) {
        MASKED.store(level, Ordering::Relaxed);
    }

    fn interrupts_masked() -> bool {
        MASKED.load(Ordering::Relaxed)
    }

    unsafe fn stack_init(_entry: usize, _parameter: usize, stack_addr: usize, _texit: usize) -> usize {
        (stack_addr & !0x7) - 64
    }

    fn thread_exit_entry() -> usize {
        0
    }

    unsafe fn context_switch(_from_sp: *mut usize, _to_sp: *const usize) {}

    unsafe fn context_switch_to(_to_sp: *const usize) {}

    fn trigger_switch_interrupt() {}
}

extern "C" fn entry(_parameter: usize) {}

fn fill_table(threads: &mut ThreadTable, count: usize) -> Vec<ThreadId> {
    (0..count)
        .map(|i| {
            let priority = (i % RT_IDLE_THREAD_PRIORITY as usize) as u8;
            let stack = KernelStack::new(256).unwrap();
            threads.alloc(RtThread::new("bench", 0, 0, stack, priority, 10)).unwrap()
        })
        .collect()
}

fn bench_ffs(c: &mut Criterion) {
    c.bench_function("rt_ffs", |b| {
        b.iter(|| {
            let mut acc = 0u32;
            for value in [1u32, 0x80, 0x8000, 0x80_0000, 0x8000_0000, 0xffff_ffff] {
                acc += rt_ffs(black_box(value)) as u32;
            }
            acc
        })
    });
}

fn bench_ready_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("ready_queue");
    for count in [1usize, 8, 31] {
        group.bench_with_input(BenchmarkId::new("insert_remove", count), &count, |b, &count| {
            let mut threads = ThreadTable::new();
            let ids = fill_table(&mut threads, count);
            let mut ready = ThreadPriorityTable::new();
            b.iter(|| {
                for &id in &ids {
                    ready.insert(&mut threads, id);
                }
                for &id in &ids {
                    ready.remove(&mut threads, id);
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("highest_ready", count), &count, |b, &count| {
            let mut threads = ThreadTable::new();
            let ids = fill_table(&mut threads, count);
            let mut ready = ThreadPriorityTable::new();
            for &id in &ids {
                ready.insert(&mut threads, id);
            }
            b.iter(|| black_box(ready.highest_ready(&threads)))
        });
    }
    group.finish();
}

fn bench_schedule(c: &mut Criterion) {
    c.bench_function("schedule_yield_round_robin", |b| {
        let mut s: Scheduler<NullPort> = Scheduler::new(SchedulerConfig::new());
        s.idle_init(entry, KernelStack::new(256).unwrap()).unwrap();
        for _ in 0..4 {
            let id = s.thread_create("w", entry, 0, KernelStack::new(256).unwrap(), 10, 5).unwrap();
            s.thread_startup(id).unwrap();
        }
        s.start();
        b.iter(|| s.thread_yield())
    });
}

criterion_group!(benches, bench_ffs, bench_ready_queue, bench_schedule);
criterion_main!(benches);
