//! Pending one-shot timers, optionally persisted to a JSON file so they
//! survive the process that scheduled them.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::{ReminderError, ReminderPayload, ReminderResult, TimerService};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTimer {
    pub token: i32,
    pub fire_at: i64,
    pub payload: ReminderPayload,
}

type Timers = BTreeMap<i32, PendingTimer>;

/// Timer queue shared by every handle opened on the same file.
///
/// Mutations take an exclusive lock on `<file>.lock`, re-read the file,
/// apply the change and replace the file with a rename, so concurrent
/// schedulers and dispatchers in other processes never lose or tear a write.
#[derive(Debug, Clone)]
pub struct TimerQueue {
    path: Option<PathBuf>,
    timers: Arc<Mutex<Timers>>,
}

impl TimerQueue {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            timers: Arc::default(),
        }
    }

    /// Open a file-backed queue. A missing file is an empty queue.
    pub fn open(path: impl Into<PathBuf>) -> ReminderResult<Self> {
        let path = path.into();
        let timers = read_timers(&path)?;
        Ok(Self {
            path: Some(path),
            timers: Arc::new(Mutex::new(timers)),
        })
    }

    /// Pending timers ordered by fire time.
    pub fn pending(&self) -> Vec<PendingTimer> {
        let mut pending = self.lock().values().cloned().collect::<Vec<_>>();
        pending.sort_by_key(|timer| (timer.fire_at, timer.token));
        pending
    }

    pub fn next_fire_at(&self) -> Option<i64> {
        self.lock().values().map(|timer| timer.fire_at).min()
    }

    /// Remove and return every timer due at `now` (Unix ms), oldest first.
    pub fn take_due(&self, now: i64) -> ReminderResult<Vec<PendingTimer>> {
        self.update(|timers| {
            let due_tokens = timers
                .values()
                .filter(|timer| timer.fire_at <= now)
                .map(|timer| timer.token)
                .collect::<Vec<_>>();

            let mut due = due_tokens
                .iter()
                .filter_map(|token| timers.remove(token))
                .collect::<Vec<_>>();
            due.sort_by_key(|timer| timer.fire_at);
            let changed = !due.is_empty();
            (due, changed)
        })
    }

    fn lock(&self) -> MutexGuard<'_, Timers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `apply` against the latest timers. `apply` reports whether it
    /// changed anything; only then is the file rewritten.
    fn update<T>(&self, apply: impl FnOnce(&mut Timers) -> (T, bool)) -> ReminderResult<T> {
        let mut timers = self.lock();
        let Some(path) = &self.path else {
            return Ok(apply(&mut timers).0);
        };

        let dir = parent_dir(path);
        std::fs::create_dir_all(dir).map_err(|source| ReminderError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let lock_file_path = lock_path(path);
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_file_path)
            .map_err(|source| ReminderError::Io {
                path: lock_file_path.clone(),
                source,
            })?;
        let mut file_lock = RwLock::new(lock_file);
        let _guard = file_lock.write().map_err(|source| ReminderError::Io {
            path: lock_file_path,
            source,
        })?;

        *timers = read_timers(path)?;
        let (value, changed) = apply(&mut timers);
        if changed {
            write_timers(path, &timers)?;
        }
        Ok(value)
    }
}

impl TimerService for TimerQueue {
    fn schedule_once(
        &self,
        token: i32,
        fire_at: i64,
        payload: ReminderPayload,
    ) -> ReminderResult<()> {
        self.update(|timers| {
            timers.insert(
                token,
                PendingTimer {
                    token,
                    fire_at,
                    payload,
                },
            );
            ((), true)
        })
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn lock_path(path: &Path) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(".lock");
    PathBuf::from(raw)
}

fn read_timers(path: &Path) -> ReminderResult<Timers> {
    if !path.exists() {
        return Ok(Timers::new());
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ReminderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(Timers::new());
    }
    let entries: Vec<PendingTimer> =
        serde_json::from_str(&raw).map_err(|source| ReminderError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(entries
        .into_iter()
        .map(|timer| (timer.token, timer))
        .collect())
}

/// Write to a temp file beside `path`, then rename it over `path`.
fn write_timers(path: &Path, timers: &Timers) -> ReminderResult<()> {
    let io_error = |source: std::io::Error| ReminderError::Io {
        path: path.to_path_buf(),
        source,
    };
    let entries = timers.values().collect::<Vec<_>>();
    let serialized =
        serde_json::to_string_pretty(&entries).map_err(|source| ReminderError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut staged = NamedTempFile::new_in(parent_dir(path)).map_err(io_error)?;
    staged.write_all(serialized.as_bytes()).map_err(io_error)?;
    staged.as_file().sync_all().map_err(io_error)?;
    staged
        .persist(path)
        .map_err(|error| io_error(error.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn take_due_removes_only_due_timers() {
        let queue = TimerQueue::in_memory();
        queue
            .schedule_once(1, 100, ReminderPayload::new("early"))
            .unwrap();
        queue
            .schedule_once(2, 300, ReminderPayload::new("late"))
            .unwrap();

        assert_eq!(queue.next_fire_at(), Some(100));
        let due = queue.take_due(200).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].payload.note_text.as_deref(), Some("early"));
        assert_eq!(queue.next_fire_at(), Some(300));
        assert!(queue.take_due(200).unwrap().is_empty());
    }

    #[test]
    fn file_queue_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let queue = TimerQueue::open(&path).unwrap();
        queue
            .schedule_once(7, 1_000, ReminderPayload::new("Call mom"))
            .unwrap();

        let reopened = TimerQueue::open(&path).unwrap();
        assert_eq!(
            reopened.pending(),
            vec![PendingTimer {
                token: 7,
                fire_at: 1_000,
                payload: ReminderPayload::new("Call mom"),
            }]
        );
    }

    #[test]
    fn file_queue_sees_timers_scheduled_by_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let dispatcher_side = TimerQueue::open(&path).unwrap();
        let scheduler_side = TimerQueue::open(&path).unwrap();

        scheduler_side
            .schedule_once(9, 50, ReminderPayload::new("from elsewhere"))
            .unwrap();
        let due = dispatcher_side.take_due(100).unwrap();
        assert_eq!(due.len(), 1);
        assert!(TimerQueue::open(&path).unwrap().pending().is_empty());
    }

    #[test]
    fn concurrent_handles_keep_every_scheduled_timer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");

        let workers = (0..2)
            .map(|worker| {
                let queue = TimerQueue::open(&path).unwrap();
                std::thread::spawn(move || {
                    (0..200)
                        .map(|index| {
                            let token = worker * 1_000 + index;
                            queue.schedule_once(
                                token,
                                i64::from(token),
                                ReminderPayload::new(format!("note {token}")),
                            )
                        })
                        .filter(Result::is_err)
                        .count()
                })
            })
            .collect::<Vec<_>>();
        let failures = workers
            .into_iter()
            .map(|worker| worker.join().unwrap())
            .sum::<usize>();

        assert_eq!(failures, 0);
        assert_eq!(TimerQueue::open(&path).unwrap().pending().len(), 400);
    }

    #[test]
    fn dispatching_while_scheduling_hands_out_each_timer_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let scheduler = TimerQueue::open(&path).unwrap();
        let dispatcher = TimerQueue::open(&path).unwrap();
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let scheduling = {
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                for token in 0..200 {
                    scheduler
                        .schedule_once(token, 0, ReminderPayload::default())
                        .unwrap();
                }
                done.store(true, std::sync::atomic::Ordering::SeqCst);
            })
        };

        let mut fired = Vec::new();
        while !done.load(std::sync::atomic::Ordering::SeqCst) {
            fired.extend(dispatcher.take_due(1).unwrap());
        }
        scheduling.join().unwrap();
        fired.extend(dispatcher.take_due(1).unwrap());

        let mut tokens = fired.iter().map(|timer| timer.token).collect::<Vec<_>>();
        tokens.sort_unstable();
        assert_eq!(tokens, (0..200).collect::<Vec<_>>());
        assert!(TimerQueue::open(&path).unwrap().pending().is_empty());
    }

    #[test]
    fn lock_file_sits_beside_queue_file() {
        assert_eq!(
            lock_path(Path::new("/data/quicknotes/reminders.json")),
            PathBuf::from("/data/quicknotes/reminders.json.lock")
        );
        assert_eq!(parent_dir(Path::new("reminders.json")), Path::new("."));
    }
}
