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

//! Sandbox: wires the full runtime together against the headless
//! surface and runs a short simulation session end to end.

use fabrica_core::persist::FileStorageBackend;
use fabrica_core::StateStore;
use fabrica_render::{HeadlessSurface, StateBindings, Surface};
use fabrica_runtime::phase::{CapabilityModule, ModuleRegistry, Phase, PhaseManager};
use fabrica_runtime::{GameLoop, RuntimeConfig, SimContext};
use fabrica_telemetry::ResourceMonitor;
use std::sync::Arc;
use std::time::Duration;

/// Automated clip production, active from the automation phase on.
#[derive(Debug)]
struct AutoClippers;

impl CapabilityModule for AutoClippers {
    fn name(&self) -> &'static str {
        "auto_clippers"
    }

    fn on_enter(&self, store: &StateStore) -> anyhow::Result<()> {
        log::info!("Auto-clippers online");
        store.set("production.clippers", 1.0);
        Ok(())
    }

    fn update(&self, store: &StateStore, delta: Duration) -> anyhow::Result<()> {
        let clippers = store.get_number("production.clippers");
        let wanted = clippers * delta.as_secs_f64();
        let wire = store.get_number("resources.wire");
        let made = wanted.min(wire);
        if made > 0.0 {
            store.decrement("resources.wire", made);
            store.increment("resources.clips", made);
        }
        Ok(())
    }
}

fn main() {
    let config = RuntimeConfig::from_file("fabrica.json");
    env_logger::Builder::from_default_env()
        .filter_level(config.log_level_filter())
        .init();

    let backend = Arc::new(FileStorageBackend::new("sandbox-save.json"));
    let surface = Arc::new(HeadlessSurface::new());
    for target in ["clips", "wire", "space-panel"] {
        surface.add_target(target);
    }

    let ctx = SimContext::new(backend, surface.clone() as Arc<dyn Surface>);
    if !ctx.store.load() {
        log::info!("No usable save, starting fresh");
    }

    let mut registry = ModuleRegistry::new();
    registry.register("auto_clippers", || Arc::new(AutoClippers));
    registry.assign(Phase::Automation, "auto_clippers");
    registry.assign(Phase::Space, "auto_clippers");
    let phases = PhaseManager::new(ctx.store.clone(), registry);
    phases.init();

    let mut bindings = StateBindings::new();
    bindings.bind_text("resources.clips", "clips");
    bindings.bind_text("resources.wire", "wire");
    bindings.bind_visibility("flags.space", "space-panel");

    let mut game_loop = GameLoop::new(ctx.clone(), config);

    game_loop.add_update("manual_clipper", |store, delta| {
        // Stand-in for player input: one clip per second of play.
        let wanted = delta.as_secs_f64();
        let wire = store.get_number("resources.wire");
        let made = wanted.min(wire);
        store.decrement("resources.wire", made);
        store.increment("resources.clips", made);
        Ok(())
    });

    let phases_for_update = phases.clone();
    game_loop.add_update("phase_modules", move |_, delta| {
        phases_for_update.update_active(delta);
        Ok(())
    });

    game_loop.add_update("progression", |store, _| {
        if !store.get_bool("flags.automation") && store.get_number("resources.clips") >= 5.0 {
            store.set("flags.automation", true);
        }
        Ok(())
    });

    let batcher = ctx.batcher.clone();
    game_loop.add_render("bindings", move |store| {
        bindings.render_pass(store, &batcher);
        Ok(())
    });

    // A short fixed session instead of an endless loop.
    for _ in 0..600 {
        game_loop.step(Duration::from_millis(16));
        std::thread::sleep(Duration::from_millis(1));
    }

    for notification in ctx.notifications.drain() {
        log::info!("Notification: {notification}");
    }

    ctx.store.save();
    println!("{}", ctx.monitors.combined_report());
    match serde_json::to_string_pretty(&ctx.perf.stats()) {
        Ok(stats) => println!("perf stats:\n{stats}"),
        Err(e) => log::warn!("Could not render perf stats: {e}"),
    }
    println!(
        "clips display: {}",
        surface.node("clips").map(|n| n.text).unwrap_or_default()
    );
    println!("final phase: {}", phases.current_phase());
}
