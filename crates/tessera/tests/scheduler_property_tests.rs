//! Ordering properties of the timeout queue over random deadline sets

use proptest::prelude::*;
use std::time::Duration;
use tessera::main_loop::Scheduler;

const MS: u64 = 1_000_000;

/// Fired entry indices, recorded by the callbacks
type Fired = Vec<usize>;

fn scheduler_with(spans: &[u64]) -> Scheduler<Fired> {
    let mut sched = Scheduler::new();
    for (index, span) in spans.iter().enumerate() {
        sched.add_timeout(0, Duration::from_millis(*span), move |fired: &mut Fired| {
            fired.push(index);
            false
        });
    }
    sched
}

fn fire_due(sched: &mut Scheduler<Fired>, now: u64, fired: &mut Fired) {
    for mut timeout in sched.take_due(now) {
        let id = timeout.id();
        if !timeout.fire(fired) {
            sched.retire(id);
        }
    }
}

proptest! {
    /// Everything fires exactly once, ordered by deadline, with entries that
    /// share a deadline kept in insertion order.
    #[test]
    fn timeouts_fire_by_deadline_then_insertion(spans in prop::collection::vec(0u64..8, 1..40)) {
        let mut sched = scheduler_with(&spans);
        prop_assert_eq!(sched.timeout_count(), spans.len());

        let mut fired = Fired::new();
        fire_due(&mut sched, 100 * MS, &mut fired);

        let mut expected: Vec<usize> = (0..spans.len()).collect();
        expected.sort_by_key(|&index| spans[index]);
        prop_assert_eq!(&fired, &expected);
        prop_assert!(fired.windows(2).all(|w| spans[w[0]] <= spans[w[1]]));
        prop_assert_eq!(sched.timeout_count(), 0);
    }

    /// Stepping the clock never fires an entry before its deadline and never
    /// loses one.
    #[test]
    fn stepped_clock_never_fires_early(
        spans in prop::collection::vec(0u64..8, 1..40),
        steps in prop::collection::vec(0u64..3, 1..10),
    ) {
        let mut sched = scheduler_with(&spans);
        let mut fired = Fired::new();
        let mut now = 0;

        for step in steps {
            now += step * MS;
            let before = fired.len();
            fire_due(&mut sched, now, &mut fired);
            for &index in &fired[before..] {
                prop_assert!(spans[index] * MS <= now);
            }
        }
        fire_due(&mut sched, 100 * MS, &mut fired);

        let mut seen = fired.clone();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..spans.len()).collect::<Vec<_>>());
        prop_assert!(fired.windows(2).all(|w| spans[w[0]] <= spans[w[1]]));
    }
}
