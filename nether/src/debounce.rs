use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};

/// Keyed delayed actions. Scheduling a key which already has an action cancel
/// the previous one. An action which has been taken by `expired` keeps its key
/// busy until `complete` is called with its generation.
pub struct KeyedTimers<K, A> {
    delay: Duration,
    entries: HashMap<K, Entry<A>>,
    generation: u64,
}

struct Entry<A> {
    deadline: Instant,
    generation: u64,
    // None when action has been taken (it is running)
    action: Option<A>,
}

#[derive(Debug)]
pub struct Fired<K, A> {
    pub key: K,
    pub generation: u64,
    pub action: A,
}

impl<K: Eq + Hash + Clone, A> KeyedTimers<K, A> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            entries: HashMap::new(),
            generation: 0,
        }
    }

    /// Start timer of `key` at `now`. Return true if a waiting action has been
    /// canceled by this one.
    pub fn schedule(&mut self, key: K, action: A, now: Instant) -> bool {
        self.generation += 1;
        let previous = self.entries.insert(
            key,
            Entry {
                deadline: now + self.delay,
                generation: self.generation,
                action: Some(action),
            },
        );
        matches!(previous, Some(Entry { action: Some(_), .. }))
    }

    /// Nearest deadline of waiting actions
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries
            .values()
            .filter(|entry| entry.action.is_some())
            .map(|entry| entry.deadline)
            .min()
    }

    /// Take actions which deadline is reached, ordered by deadline
    pub fn expired(&mut self, now: Instant) -> Vec<Fired<K, A>> {
        let mut fired = vec![];
        for (key, entry) in self.entries.iter_mut() {
            if entry.deadline <= now {
                if let Some(action) = entry.action.take() {
                    fired.push((
                        entry.deadline,
                        Fired {
                            key: key.clone(),
                            generation: entry.generation,
                            action,
                        },
                    ));
                }
            }
        }

        fired.sort_by_key(|(deadline, _)| *deadline);
        fired.into_iter().map(|(_, fired)| fired).collect()
    }

    /// Release key after its action ran. Do nothing if key has been scheduled
    /// again in the meantime.
    pub fn complete(&mut self, key: &K, generation: u64) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.generation == generation => {
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Waiting or running
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn waiting(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.action.is_some())
            .count()
    }

    /// Cancel all waiting actions, return how many
    pub fn clear(&mut self) -> usize {
        let waiting = self.waiting();
        self.entries.clear();
        waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    const DELAY: Duration = Duration::from_secs(10);

    fn keys(fired: &[Fired<&'static str, &'static str>]) -> Vec<(&'static str, &'static str)> {
        fired.iter().map(|f| (f.key, f.action)).collect()
    }

    #[test]
    fn test_burst_produce_one_action_after_last_edit() {
        // Given : three edits of "Notes" spaced by two seconds
        let start = Instant::now();
        let mut timers = KeyedTimers::new(DELAY);
        assert!(!timers.schedule("Notes", "edit1", start));
        assert!(timers.schedule("Notes", "edit2", start + Duration::from_secs(2)));
        assert!(timers.schedule("Notes", "edit3", start + Duration::from_secs(4)));

        // When Then
        assert_eq!(timers.next_deadline(), Some(start + Duration::from_secs(14)));
        assert!(timers.expired(start + Duration::from_secs(13)).is_empty());
        let fired = timers.expired(start + Duration::from_secs(14));
        assert_eq!(keys(&fired), vec![("Notes", "edit3")]);
        assert!(timers.expired(start + Duration::from_secs(60)).is_empty());
    }

    #[rstest]
    #[case(vec![0], 1)]
    #[case(vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9], 1)]
    #[case(vec![0, 9, 18], 1)]
    #[case(vec![0, 11], 2)]
    #[case(vec![0, 10, 20], 3)]
    fn test_action_count(#[case] edit_seconds: Vec<u64>, #[case] expected_actions: usize) {
        let start = Instant::now();
        let mut timers = KeyedTimers::new(DELAY);
        let mut actions = 0;

        let mut now_seconds = 0;
        for edit_second in edit_seconds {
            // Let time pass until the edit, firing what must be fired
            while now_seconds < edit_second {
                now_seconds += 1;
                let now = start + Duration::from_secs(now_seconds);
                for fired in timers.expired(now) {
                    actions += 1;
                    timers.complete(&fired.key, fired.generation);
                }
            }
            timers.schedule("Notes", edit_second, start + Duration::from_secs(edit_second));
        }
        for fired in timers.expired(start + Duration::from_secs(now_seconds + 10)) {
            actions += 1;
            timers.complete(&fired.key, fired.generation);
        }

        assert_eq!(actions, expected_actions);
        assert!(!timers.contains(&"Notes"));
    }

    #[test]
    fn test_keys_are_independent() {
        let start = Instant::now();
        let mut timers = KeyedTimers::new(DELAY);
        timers.schedule("A", "a", start);
        timers.schedule("B", "b", start + Duration::from_secs(3));

        let fired = timers.expired(start + Duration::from_secs(20));

        assert_eq!(keys(&fired), vec![("A", "a"), ("B", "b")]);
    }

    #[test]
    fn test_running_action_keep_key_busy() {
        let start = Instant::now();
        let mut timers = KeyedTimers::new(DELAY);
        timers.schedule("Notes", "edit1", start);
        let fired = timers.expired(start + DELAY);
        assert_eq!(fired.len(), 1);

        // Running : key is busy but nothing is waiting
        assert!(timers.contains(&"Notes"));
        assert_eq!(timers.waiting(), 0);
        assert_eq!(timers.next_deadline(), None);

        // New edit during run : not a cancellation of a waiting action
        assert!(!timers.schedule("Notes", "edit2", start + DELAY));

        // Completion of the first run must not forget the new edit
        assert!(!timers.complete(&"Notes", fired[0].generation));
        assert!(timers.contains(&"Notes"));
        let fired = timers.expired(start + DELAY * 2);
        assert_eq!(keys(&fired), vec![("Notes", "edit2")]);
        assert!(timers.complete(&"Notes", fired[0].generation));
        assert!(!timers.contains(&"Notes"));
    }

    #[test]
    fn test_clear() {
        let start = Instant::now();
        let mut timers = KeyedTimers::new(DELAY);
        timers.schedule("A", "a", start);
        timers.schedule("B", "b", start);

        assert_eq!(timers.clear(), 2);
        assert!(timers.expired(start + DELAY).is_empty());
        assert_eq!(timers.next_deadline(), None);
    }
}
