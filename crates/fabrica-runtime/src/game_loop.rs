// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The four-activity simulation loop.
//!
//! Every step runs the update activity; render, autosave and
//! housekeeping each run on their own accumulated interval, gated
//! independently so a slow autosave never starves rendering. A callback
//! returning an error is logged with its registered name and skipped for
//! that step; the remaining callbacks and activities still run.

use crate::config::RuntimeConfig;
use crate::context::SimContext;
use fabrica_core::{StateStore, Stopwatch};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A simulation-rule callback, run once per update activity.
pub type UpdateFn = Box<dyn FnMut(&StateStore, Duration) -> anyhow::Result<()> + Send>;

/// A presentation callback, run once per render activity.
pub type RenderFn = Box<dyn FnMut(&StateStore) -> anyhow::Result<()> + Send>;

/// Drives update, render, autosave and housekeeping over a shared
/// [`SimContext`].
pub struct GameLoop {
    ctx: SimContext,
    config: RuntimeConfig,
    update_callbacks: Vec<(String, UpdateFn)>,
    render_callbacks: Vec<(String, RenderFn)>,
    since_render: Duration,
    since_autosave: Duration,
    since_housekeeping: Duration,
    running: Arc<AtomicBool>,
}

impl GameLoop {
    pub fn new(ctx: SimContext, config: RuntimeConfig) -> Self {
        Self {
            ctx,
            config,
            update_callbacks: Vec::new(),
            render_callbacks: Vec::new(),
            since_render: Duration::ZERO,
            since_autosave: Duration::ZERO,
            since_housekeeping: Duration::ZERO,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Registers a named update callback. Registration order is
    /// execution order.
    pub fn add_update(
        &mut self,
        name: impl Into<String>,
        callback: impl FnMut(&StateStore, Duration) -> anyhow::Result<()> + Send + 'static,
    ) {
        self.update_callbacks.push((name.into(), Box::new(callback)));
    }

    /// Registers a named render callback.
    pub fn add_render(
        &mut self,
        name: impl Into<String>,
        callback: impl FnMut(&StateStore) -> anyhow::Result<()> + Send + 'static,
    ) {
        self.render_callbacks.push((name.into(), Box::new(callback)));
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    /// A handle that can stop a `run()` loop from another thread.
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Requests the `run()` loop to exit after the current iteration.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Advances the simulation by `delta`. Update always runs; the other
    /// three activities run when their accumulated interval has elapsed.
    pub fn step(&mut self, delta: Duration) {
        let iteration = Stopwatch::new();

        self.run_updates(delta);

        self.since_render += delta;
        if self.since_render >= self.config.render_interval() {
            self.since_render = Duration::ZERO;
            self.run_renders();
        }

        self.since_autosave += delta;
        if self.since_autosave >= self.config.autosave_interval() {
            self.since_autosave = Duration::ZERO;
            self.autosave();
        }

        self.since_housekeeping += delta;
        if self.since_housekeeping >= self.config.housekeeping_interval() {
            self.since_housekeeping = Duration::ZERO;
            self.housekeeping();
        }

        self.ctx.perf.record_iteration(iteration.elapsed());
    }

    fn run_updates(&mut self, delta: Duration) {
        let sw = Stopwatch::new();
        for (name, callback) in &mut self.update_callbacks {
            if let Err(e) = callback(&self.ctx.store, delta) {
                log::error!("Update callback '{name}' failed: {e:#}");
            }
        }
        self.ctx.store.increment("meta.ticks", 1.0);
        self.ctx
            .store
            .increment("meta.play_time_ms", delta.as_secs_f64() * 1000.0);
        self.ctx.perf.record_update(sw.elapsed());
    }

    fn run_renders(&mut self) {
        let sw = Stopwatch::new();
        for (name, callback) in &mut self.render_callbacks {
            if let Err(e) = callback(&self.ctx.store) {
                log::error!("Render callback '{name}' failed: {e:#}");
            }
        }
        self.ctx.batcher.flush_if_scheduled();
        self.ctx.perf.record_render(sw.elapsed());
    }

    fn autosave(&self) {
        if self.ctx.store.save() {
            log::debug!("Autosave complete");
        }
    }

    fn housekeeping(&self) {
        self.ctx.monitors.update_all();

        for issue in self.ctx.perf.check_issues(self.ctx.memory.current_mb()) {
            log::warn!("Performance issue: {issue}");
        }

        let trimmed = self.ctx.batcher.trim_cache();
        if trimmed > 0 {
            log::debug!("Trimmed {trimmed} stale handle cache entries");
        }

        let tracker = self.ctx.memory.leak_tracker();
        tracker.sweep();
        if let Some(warning) = tracker.check_leak() {
            log::warn!("{warning}");
        }
    }

    /// Blocks the current thread, stepping the simulation until
    /// [`stop`](GameLoop::stop) is called. Sleeps between iterations,
    /// clamped so the loop stays responsive without spinning.
    pub fn run(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            log::warn!("Simulation loop already running");
            return;
        }
        log::info!("Simulation loop starting");

        let mut frame = Stopwatch::new();
        while self.running.load(Ordering::SeqCst) {
            let delta = frame.elapsed();
            frame.restart();
            self.step(delta);

            let spent = frame.elapsed();
            let sleep = self
                .config
                .render_interval()
                .saturating_sub(spent)
                .clamp(Duration::from_millis(1), Duration::from_millis(16));
            std::thread::sleep(sleep);
        }
        log::info!("Simulation loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabrica_core::persist::{MemoryStorageBackend, StorageBackend};
    use fabrica_render::HeadlessSurface;
    use std::sync::atomic::AtomicUsize;

    fn game_loop(config: RuntimeConfig) -> (GameLoop, Arc<MemoryStorageBackend>) {
        let backend = Arc::new(MemoryStorageBackend::new());
        let ctx = SimContext::new(backend.clone(), Arc::new(HeadlessSurface::new()));
        (GameLoop::new(ctx, config), backend)
    }

    fn fast_config() -> RuntimeConfig {
        RuntimeConfig {
            render_interval_ms: 10,
            autosave_interval_ms: 50,
            housekeeping_interval_ms: 30,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn update_runs_every_step_and_advances_ticks() {
        let (mut game_loop, _) = game_loop(fast_config());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        game_loop.add_update("count", move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        for _ in 0..3 {
            game_loop.step(Duration::from_millis(4));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(game_loop.context().store.get_number("meta.ticks"), 3.0);
        let played = game_loop.context().store.get_number("meta.play_time_ms");
        assert!((played - 12.0).abs() < 1e-9);
    }

    #[test]
    fn failed_update_does_not_block_later_callbacks() {
        let (mut game_loop, _) = game_loop(fast_config());
        let reached = Arc::new(AtomicUsize::new(0));
        let seen = reached.clone();
        game_loop.add_update("broken", |_, _| anyhow::bail!("rule exploded"));
        game_loop.add_update("after", move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        game_loop.step(Duration::from_millis(4));
        assert_eq!(reached.load(Ordering::SeqCst), 1);
        // The step itself still counted.
        assert_eq!(game_loop.context().store.get_number("meta.ticks"), 1.0);
    }

    #[test]
    fn render_is_interval_gated() {
        let (mut game_loop, _) = game_loop(fast_config());
        let renders = Arc::new(AtomicUsize::new(0));
        let seen = renders.clone();
        game_loop.add_render("count", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        // 4 + 4 = 8ms < 10ms interval, third step crosses it.
        game_loop.step(Duration::from_millis(4));
        game_loop.step(Duration::from_millis(4));
        assert_eq!(renders.load(Ordering::SeqCst), 0);
        game_loop.step(Duration::from_millis(4));
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn render_flushes_pending_mutations() {
        let backend = Arc::new(MemoryStorageBackend::new());
        let surface = Arc::new(HeadlessSurface::new());
        surface.add_target("panel");
        let ctx = SimContext::new(backend, surface.clone() as Arc<dyn fabrica_render::Surface>);
        let batcher = ctx.batcher.clone();
        let mut game_loop = GameLoop::new(ctx, fast_config());
        game_loop.add_render("text", move |store| {
            batcher.update_text("panel", store.get_number("resources.clips").to_string());
            Ok(())
        });

        game_loop.context().store.set("resources.clips", 7.0);
        game_loop.step(Duration::from_millis(12));
        assert_eq!(surface.node("panel").unwrap().text, "7");
    }

    #[test]
    fn autosave_persists_on_its_own_cadence() {
        let (mut game_loop, backend) = game_loop(fast_config());
        game_loop.step(Duration::from_millis(20));
        assert!(backend.read().unwrap().is_none());
        game_loop.step(Duration::from_millis(40));
        let payload = backend.read().unwrap().expect("autosave should have run");
        assert!(payload.contains("\"version\""));
    }

    #[test]
    fn failing_autosave_does_not_stop_the_loop() {
        let (mut game_loop, backend) = game_loop(fast_config());
        backend.fail_writes(true);
        game_loop.step(Duration::from_millis(60));
        game_loop.step(Duration::from_millis(4));
        assert_eq!(game_loop.context().store.get_number("meta.ticks"), 2.0);
    }

    #[test]
    fn housekeeping_sweeps_dead_tracked_objects() {
        let (mut game_loop, _) = game_loop(fast_config());
        let memory = game_loop.context().memory.clone();
        {
            let temp = Arc::new(42u32);
            memory.leak_tracker().track("temp", &temp);
        }
        let before = memory.leak_tracker().tracked_count();
        game_loop.step(Duration::from_millis(40));
        assert!(memory.leak_tracker().tracked_count() < before);
    }

    #[test]
    fn stop_signal_ends_run() {
        let (mut game_loop, _) = game_loop(fast_config());
        let stop = game_loop.stop_signal();
        let handle = std::thread::spawn(move || {
            game_loop.run();
            game_loop
        });
        std::thread::sleep(Duration::from_millis(50));
        stop.store(false, Ordering::SeqCst);
        let game_loop = handle.join().unwrap();
        assert!(!game_loop.is_running());
        assert!(game_loop.context().store.get_number("meta.ticks") >= 1.0);
    }
}
