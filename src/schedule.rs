//! Task queue and frame sources.
//!
//! Two deferral primitives order the component lifecycle:
//!
//! - **Next paint**: tasks run in the next frame. Tasks queued while a frame is
//!   running wait for the frame after it, so a task can never observe work
//!   scheduled after it in the same turn as already done.
//! - **Microtask**: tasks run at the next checkpoint, which happens before every
//!   frame and after every paint task.
//!
//! When frames happen is decided by a [`FrameSource`]: [`Immediate`] hands out
//! frames back to back (tests, [`Runtime::settle`](crate::runtime::Runtime::settle)),
//! [`PaintAligned`] paces them on a tokio interval.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};

use crate::component::ComponentId;
use crate::dom::NodeId;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Deferred lifecycle work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Resolve the render target and materialize content.
    Mount(ComponentId),
    /// Flip `ready`, run ready hooks, broadcast the ready event.
    Ready(ComponentId),
    /// Forward batched attribute changes to the component.
    FlushAttributes(ComponentId),
    /// Remove a node (gate rejection removes itself this way).
    RemoveNode(NodeId),
    /// Hand pending mutation records to the watchers.
    DeliverMutations,
}

/// Which queue a task goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferral {
    NextPaint,
    Microtask,
}

// ---------------------------------------------------------------------------
// TaskQueue
// ---------------------------------------------------------------------------

/// Paint and microtask queues with coalescing.
///
/// Queuing a task identical to one already waiting in the same queue is a
/// no-op, so several triggers in one turn produce one follow-up.
#[derive(Debug, Default)]
pub struct TaskQueue {
    paint: VecDeque<Task>,
    microtasks: VecDeque<Task>,
    frames: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task. Returns `false` if an identical task was already waiting.
    pub fn defer(&mut self, deferral: Deferral, task: Task) -> bool {
        let queue = match deferral {
            Deferral::NextPaint => &mut self.paint,
            Deferral::Microtask => &mut self.microtasks,
        };
        if queue.contains(&task) {
            return false;
        }
        queue.push_back(task);
        true
    }

    /// Queue a task for the next paint frame.
    pub fn next_paint(&mut self, task: Task) -> bool {
        self.defer(Deferral::NextPaint, task)
    }

    /// Queue a task for the next microtask checkpoint.
    pub fn microtask(&mut self, task: Task) -> bool {
        self.defer(Deferral::Microtask, task)
    }

    /// Pop the oldest microtask.
    pub fn pop_microtask(&mut self) -> Option<Task> {
        self.microtasks.pop_front()
    }

    /// Start a frame: take every paint task queued so far.
    pub fn begin_frame(&mut self) -> Vec<Task> {
        self.frames += 1;
        self.paint.drain(..).collect()
    }

    /// Whether a frame has work to do.
    pub fn frame_requested(&self) -> bool {
        !self.paint.is_empty()
    }

    /// Number of frames started so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Number of queued tasks across both queues.
    pub fn len(&self) -> usize {
        self.paint.len() + self.microtasks.len()
    }

    /// Whether both queues are empty.
    pub fn is_idle(&self) -> bool {
        self.paint.is_empty() && self.microtasks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Frame sources
// ---------------------------------------------------------------------------

/// Decides when the next frame may run.
pub trait FrameSource {
    /// Resolve when the next frame may run.
    fn next_frame(&mut self) -> Pin<Box<dyn Future<Output = ()> + '_>>;

    /// Whether a driver loop should return once the runtime is idle.
    fn stop_when_idle(&self) -> bool {
        false
    }
}

/// Frames are always available. Driver loops stop as soon as nothing is queued.
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl FrameSource for Immediate {
    fn next_frame(&mut self) -> Pin<Box<dyn Future<Output = ()> + '_>> {
        Box::pin(std::future::ready(()))
    }

    fn stop_when_idle(&self) -> bool {
        true
    }
}

/// Frames paced at a fixed rate. Missed frames are skipped, not replayed.
#[derive(Debug)]
pub struct PaintAligned {
    period: Duration,
    interval: Option<Interval>,
}

impl PaintAligned {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// A source ticking `fps` times per second.
    pub fn with_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / f64::from(fps.max(1))))
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl FrameSource for PaintAligned {
    fn next_frame(&mut self) -> Pin<Box<dyn Future<Output = ()> + '_>> {
        let period = self.period;
        // Created lazily: building an interval needs a running tokio runtime.
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        Box::pin(async move {
            interval.tick().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids() -> (ComponentId, ComponentId) {
        let mut sm: SlotMap<ComponentId, ()> = SlotMap::with_key();
        (sm.insert(()), sm.insert(()))
    }

    #[test]
    fn new_queue_is_idle() {
        let queue = TaskQueue::new();
        assert!(queue.is_idle());
        assert!(!queue.frame_requested());
        assert_eq!(queue.frame_count(), 0);
    }

    #[test]
    fn identical_tasks_coalesce() {
        let (a, b) = ids();
        let mut queue = TaskQueue::new();
        assert!(queue.next_paint(Task::FlushAttributes(a)));
        assert!(!queue.next_paint(Task::FlushAttributes(a)));
        assert!(queue.next_paint(Task::FlushAttributes(b)));
        assert!(queue.microtask(Task::DeliverMutations));
        assert!(!queue.microtask(Task::DeliverMutations));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn same_task_may_sit_in_both_queues() {
        let mut queue = TaskQueue::new();
        assert!(queue.next_paint(Task::DeliverMutations));
        assert!(queue.microtask(Task::DeliverMutations));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn begin_frame_takes_only_queued_tasks() {
        let (a, b) = ids();
        let mut queue = TaskQueue::new();
        queue.next_paint(Task::Mount(a));
        let frame = queue.begin_frame();
        queue.next_paint(Task::Mount(b));
        assert_eq!(frame, vec![Task::Mount(a)]);
        assert_eq!(queue.begin_frame(), vec![Task::Mount(b)]);
        assert_eq!(queue.frame_count(), 2);
    }

    #[test]
    fn microtasks_pop_in_order() {
        let (a, _) = ids();
        let mut queue = TaskQueue::new();
        queue.microtask(Task::Ready(a));
        queue.microtask(Task::DeliverMutations);
        assert_eq!(queue.pop_microtask(), Some(Task::Ready(a)));
        assert_eq!(queue.pop_microtask(), Some(Task::DeliverMutations));
        assert_eq!(queue.pop_microtask(), None);
    }

    #[test]
    fn immediate_frames_are_ready() {
        let mut source = Immediate;
        assert!(source.stop_when_idle());
        tokio_test::block_on(source.next_frame());
    }

    #[tokio::test(start_paused = true)]
    async fn paint_aligned_paces_frames() {
        let mut source = PaintAligned::with_fps(10);
        assert_eq!(source.period(), Duration::from_millis(100));
        assert!(!source.stop_when_idle());
        let start = tokio::time::Instant::now();
        source.next_frame().await; // first tick completes immediately
        source.next_frame().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
