use crate::dispatch::HostAttachment;
use crate::geometry::Point;
use crate::menu::PieMenu;
use crate::tree::NodeId;
use derive_more::Display;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use strum::Display as StrumDisplay;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub const BLINK_PERIOD: Duration = Duration::from_millis(20);
pub const BLINK_TOGGLES: u8 = 3;
pub const COMMIT_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("task#{_0}")]
pub struct TaskId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay)]
pub enum TaskKind {
    ShowMenu,
    ShowSubmenu,
    CommitCountdown,
    Blink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
pub enum TaskStatus {
    Scheduled,
    Fired,
    Aborted,
}

/// What a pending task does once it fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Task {
    ShowMenu { anchor: HostAttachment },
    ShowSubmenu { child: NodeId },
    Commit { item: usize },
    Blink,
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::ShowMenu { .. } => TaskKind::ShowMenu,
            Self::ShowSubmenu { .. } => TaskKind::ShowSubmenu,
            Self::Commit { .. } => TaskKind::CommitCountdown,
            Self::Blink => TaskKind::Blink,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingTask {
    pub id: TaskId,
    pub task: Task,
    pub owner: NodeId,
    /// Host-space point for show tasks, owner-local point for submenus.
    pub target: Point,
    pub delay: Duration,
    status: TaskStatus,
}

impl PendingTask {
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn kind(&self) -> TaskKind {
        self.task.kind()
    }

    /// Returns `true` only for the call that moved the task out of `Scheduled`.
    pub fn abort(&mut self) -> bool {
        if self.status == TaskStatus::Scheduled {
            self.status = TaskStatus::Aborted;
            true
        } else {
            false
        }
    }

    pub fn begin_fire(&mut self) -> bool {
        if self.status == TaskStatus::Scheduled {
            self.status = TaskStatus::Fired;
            true
        } else {
            false
        }
    }
}

/// Wakes the owner of a [`TaskQueue`] once a task's delay has elapsed.
///
/// Implementations only deliver ids; whether the task still runs is decided
/// by the queue when the id comes back.
pub trait Scheduler {
    fn schedule(&mut self, id: TaskId, delay: Duration);
    fn cancel(&mut self, id: TaskId);
}

pub struct TaskQueue {
    next_id: u64,
    live: HashMap<TaskId, PendingTask>,
    scheduler: Box<dyn Scheduler>,
}

impl TaskQueue {
    pub fn new(scheduler: Box<dyn Scheduler>) -> Self {
        Self {
            next_id: 1,
            live: HashMap::new(),
            scheduler,
        }
    }

    pub fn schedule(
        &mut self,
        task: Task,
        owner: NodeId,
        target: Point,
        delay: Duration,
    ) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        log::debug!("scheduling {id} ({}) for {owner} in {delay:?}", task.kind());
        self.live.insert(
            id,
            PendingTask {
                id,
                task,
                owner,
                target,
                delay,
                status: TaskStatus::Scheduled,
            },
        );
        self.scheduler.schedule(id, delay);
        id
    }

    pub fn get(&self, id: TaskId) -> Option<&PendingTask> {
        self.live.get(&id)
    }

    pub fn is_live(&self, id: Option<TaskId>) -> bool {
        id.is_some_and(|id| self.live.contains_key(&id))
    }

    /// Moves the target of a still-scheduled task; the deadline is unchanged.
    pub fn retarget(&mut self, id: TaskId, target: Point) {
        if let Some(task) = self.live.get_mut(&id) {
            task.target = target;
        }
    }

    /// Claims a due task. Ids that were aborted in the meantime yield `None`.
    pub fn take_fired(&mut self, id: TaskId) -> Option<PendingTask> {
        let mut task = self.live.remove(&id)?;
        task.begin_fire().then_some(task)
    }

    pub fn abort(&mut self, id: TaskId) -> Option<PendingTask> {
        let mut task = self.live.remove(&id)?;
        if task.abort() {
            log::debug!("aborted {id} ({})", task.kind());
            self.scheduler.cancel(id);
        }
        Some(task)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live(&self) -> impl Iterator<Item = &PendingTask> {
        self.live.values()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("next_id", &self.next_id)
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}

/// Timers on a tokio runtime. Fired ids come back through the receiver so the
/// thread owning the menu can call [`PieMenu::fire`].
pub struct TokioScheduler {
    handle: Handle,
    sender: async_channel::Sender<TaskId>,
    timers: HashMap<TaskId, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> (Self, async_channel::Receiver<TaskId>) {
        let (sender, receiver) = async_channel::unbounded();
        (
            Self {
                handle,
                sender,
                timers: HashMap::new(),
            },
            receiver,
        )
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, id: TaskId, delay: Duration) {
        self.timers.retain(|_, timer| !timer.is_finished());

        let sender = self.sender.clone();
        let timer = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = sender.send(id).await {
                log::debug!("dropping {id}, menu is gone: {e}");
            }
        });
        self.timers.insert(id, timer);
    }

    fn cancel(&mut self, id: TaskId) {
        if let Some(timer) = self.timers.remove(&id) {
            timer.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}

#[derive(Debug, Default)]
struct ClockInner {
    now: Duration,
    seq: u64,
    due: BTreeMap<(Duration, u64), TaskId>,
    index: HashMap<TaskId, (Duration, u64)>,
}

/// Virtual clock. Clones share the same timeline, so one clone can be handed
/// to the menu while the other drives it.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    inner: Arc<Mutex<ClockInner>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.inner.lock().now
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().due.len()
    }

    /// Fires every task due within `by`, in deadline order. Tasks scheduled by
    /// those fires also run if they fall inside the window.
    pub fn advance(&self, menu: &mut PieMenu, by: Duration) {
        let deadline = self.now() + by;
        loop {
            let next = {
                let mut inner = self.inner.lock();
                match inner.due.first_key_value() {
                    Some((&key, &id)) if key.0 <= deadline => {
                        inner.due.remove(&key);
                        inner.index.remove(&id);
                        inner.now = key.0;
                        Some(id)
                    }
                    _ => None,
                }
            };
            match next {
                Some(id) => menu.fire(id),
                None => break,
            }
        }
        self.inner.lock().now = deadline;
    }
}

impl Scheduler for ManualClock {
    fn schedule(&mut self, id: TaskId, delay: Duration) {
        let mut inner = self.inner.lock();
        let key = (inner.now + delay, inner.seq);
        inner.seq += 1;
        inner.due.insert(key, id);
        inner.index.insert(id, key);
    }

    fn cancel(&mut self, id: TaskId) {
        let mut inner = self.inner.lock();
        if let Some(key) = inner.index.remove(&id) {
            inner.due.remove(&key);
        }
    }
}

/// Commit feedback: the selected slice toggles between dimmed and lit.
#[derive(Debug, Clone, PartialEq)]
pub struct Blink {
    pub task: TaskId,
    pub toggles: u8,
    pub dimmed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(clock: &ManualClock) -> TaskQueue {
        TaskQueue::new(Box::new(clock.clone()))
    }

    fn owner() -> NodeId {
        crate::tree::MenuTree::new(crate::tree::MenuNode::new("root")).root()
    }

    #[test]
    fn test_abort_and_fire_are_exclusive() {
        let clock = ManualClock::new();
        let mut tasks = queue(&clock);
        let id = tasks.schedule(Task::Blink, owner(), Point::default(), BLINK_PERIOD);
        assert_eq!(clock.pending(), 1);

        let aborted = tasks.abort(id).unwrap();
        assert_eq!(aborted.status(), TaskStatus::Aborted);
        assert_eq!(clock.pending(), 0);
        assert!(tasks.take_fired(id).is_none());
        assert!(tasks.abort(id).is_none());
    }

    #[test]
    fn test_abort_after_fire_is_noop() {
        let mut task = PendingTask {
            id: TaskId(7),
            task: Task::Commit { item: 1 },
            owner: owner(),
            target: Point::default(),
            delay: COMMIT_DELAY,
            status: TaskStatus::Scheduled,
        };
        assert!(task.begin_fire());
        assert!(!task.abort());
        assert!(!task.begin_fire());
        assert_eq!(task.status(), TaskStatus::Fired);
        assert_eq!(task.kind(), TaskKind::CommitCountdown);
    }

    #[test]
    fn test_double_abort_equals_single() {
        let mut task = PendingTask {
            id: TaskId(1),
            task: Task::Blink,
            owner: owner(),
            target: Point::default(),
            delay: BLINK_PERIOD,
            status: TaskStatus::Scheduled,
        };
        assert!(task.abort());
        assert!(!task.abort());
        assert_eq!(task.status(), TaskStatus::Aborted);
    }

    #[test]
    fn test_retarget_keeps_task_scheduled() {
        let clock = ManualClock::new();
        let mut tasks = queue(&clock);
        let id = tasks.schedule(
            Task::ShowSubmenu { child: owner() },
            owner(),
            Point::new(1.0, 1.0),
            Duration::from_millis(500),
        );
        tasks.retarget(id, Point::new(5.0, 6.0));
        let task = tasks.get(id).unwrap();
        assert_eq!(task.target, Point::new(5.0, 6.0));
        assert_eq!(task.status(), TaskStatus::Scheduled);
        assert_eq!(tasks.live_count(), 1);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_delivers_and_cancels() {
        let (mut scheduler, fired) = TokioScheduler::new(Handle::current());
        scheduler.schedule(TaskId(1), Duration::from_millis(5));
        scheduler.schedule(TaskId(2), Duration::from_millis(5));
        scheduler.cancel(TaskId(2));

        let id = tokio::time::timeout(Duration::from_secs(2), fired.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(id, TaskId(1));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(fired.try_recv().is_err());
    }
}
