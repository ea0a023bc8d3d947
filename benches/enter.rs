#![feature(test)]

extern crate test;

use test::Bencher;

use crossbeam_utils::thread::scope;

use dem::EpochManager;

#[bench]
fn single_enter_exit(b: &mut Bencher) {
    let manager = EpochManager::new();
    manager.register_thread(1);

    b.iter(|| {
        let txn = manager.enter(1);
        manager.exit(1, txn);
    });
}

#[bench]
fn multi_enter_exit(b: &mut Bencher) {
    const THREADS: u64 = 16;
    const STEPS: usize = 100_000;

    let manager = EpochManager::new();
    manager.start();

    b.iter(|| {
        scope(|s| {
            for thread_id in 0..THREADS {
                let manager = &manager;
                s.spawn(move |_| {
                    manager.register_thread(thread_id);
                    for _ in 0..STEPS {
                        let txn = manager.enter(thread_id);
                        manager.exit(thread_id, txn);
                    }
                    manager.deregister_thread(thread_id);
                });
            }
        })
        .unwrap();
    });

    manager.stop();
}

#[bench]
fn horizon_reduction(b: &mut Bencher) {
    const THREADS: u64 = 16;

    let manager = EpochManager::new();
    for thread_id in 0..THREADS {
        manager.register_thread(thread_id);
    }

    b.iter(|| manager.global_tail_epoch());

    for thread_id in 0..THREADS {
        manager.deregister_thread(thread_id);
    }
}
