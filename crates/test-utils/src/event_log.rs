use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// One recorded transition of a labelled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start,
    Finish,
}

/// Thread-safe log of task start/finish events, for ordering assertions.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<(String, Event, Instant)>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, label: &str, event: Event) {
        self.events.lock().push((label.to_string(), event, Instant::now()));
    }

    /// A task body that logs its start, sleeps for `work`, then logs its
    /// finish.
    pub fn task(&self, label: impl Into<String>, work: Duration) -> impl FnOnce() + Send + 'static {
        let log = self.clone();
        let label = label.into();
        move || {
            log.record(&label, Event::Start);
            if !work.is_zero() {
                thread::sleep(work);
            }
            log.record(&label, Event::Finish);
        }
    }

    fn position(&self, label: &str, event: Event) -> usize {
        self.events
            .lock()
            .iter()
            .position(|(l, e, _)| l == label && *e == event)
            .unwrap_or_else(|| panic!("no {event:?} event recorded for {label}"))
    }

    /// Panic unless `first` finished before `second` started.
    pub fn assert_finished_before(&self, first: &str, second: &str) {
        let finished = self.position(first, Event::Finish);
        let started = self.position(second, Event::Start);
        assert!(
            finished < started,
            "{second} started before {first} finished: {:?}",
            self.labels()
        );
    }

    /// Labels of all started tasks, in start order.
    pub fn start_order(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|(_, e, _)| *e == Event::Start)
            .map(|(l, _, _)| l.clone())
            .collect()
    }

    /// How many times `label` started.
    pub fn starts_of(&self, label: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(l, e, _)| l == label && *e == Event::Start)
            .count()
    }

    /// Largest number of tasks that were running at the same time.
    pub fn max_concurrency(&self) -> usize {
        let mut running = 0usize;
        let mut peak = 0usize;
        for (_, event, _) in self.events.lock().iter() {
            match event {
                Event::Start => {
                    running += 1;
                    peak = peak.max(running);
                }
                Event::Finish => running = running.saturating_sub(1),
            }
        }
        peak
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    fn labels(&self) -> Vec<(String, Event)> {
        self.events
            .lock()
            .iter()
            .map(|(l, e, _)| (l.clone(), *e))
            .collect()
    }
}
