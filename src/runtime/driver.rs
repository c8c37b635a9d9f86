//! Frame driving: microtask checkpoints, paint frames, the async loop.

use std::future::Future;

use crate::schedule::{FrameSource, Task};

use super::Runtime;

impl Runtime {
    /// Run one frame.
    ///
    /// A microtask checkpoint runs first, then every paint task queued before
    /// the frame started, each followed by its own checkpoint. Paint tasks
    /// queued during the frame run in the next one.
    pub fn tick(&mut self) {
        self.run_microtasks();
        for task in self.tasks.begin_frame() {
            self.run_task(task);
            self.run_microtasks();
        }
    }

    /// Tick until nothing is queued, bounded by the configured frame limit.
    ///
    /// Returns whether the runtime is idle afterwards.
    pub fn settle(&mut self) -> bool {
        for _ in 0..self.config.max_settle_frames {
            if self.is_idle() {
                return true;
            }
            self.tick();
        }
        self.is_idle()
    }

    /// Whether no lifecycle work is queued.
    pub fn is_idle(&self) -> bool {
        self.tasks.is_idle()
    }

    /// Number of frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.tasks.frame_count()
    }

    /// Drive frames from `frames` until `shutdown` resolves, or until the
    /// runtime is idle when the source says to stop there.
    ///
    /// Returns the number of frames run.
    pub async fn run<F, S>(&mut self, frames: &mut F, shutdown: S) -> u64
    where
        F: FrameSource + ?Sized,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ran = 0;
        loop {
            if frames.stop_when_idle() && self.is_idle() {
                break;
            }
            let stop = tokio::select! {
                biased;
                _ = &mut shutdown => true,
                _ = frames.next_frame() => false,
            };
            if stop {
                break;
            }
            self.tick();
            ran += 1;
        }
        ran
    }

    fn run_microtasks(&mut self) {
        while let Some(task) = self.tasks.pop_microtask() {
            self.run_task(task);
        }
    }

    /// Run one task. Errors stop at this boundary: they are logged and
    /// journaled against the owning instance.
    fn run_task(&mut self, task: Task) {
        match task {
            Task::Mount(id) => {
                if let Err(err) = self.mount(id) {
                    self.fail(id, err);
                }
            }
            Task::Ready(id) => self.ready(id),
            Task::FlushAttributes(id) => self.flush_attributes(id),
            Task::RemoveNode(node) => {
                self.remove(node);
            }
            Task::DeliverMutations => self.deliver_mutations(),
        }
    }
}
