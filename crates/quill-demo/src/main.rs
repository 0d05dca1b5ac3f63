use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Context, Result};

use quill_engine::coords::{ColorRgba, Rgba8};
use quill_engine::core::{App, AppControl, FrameCtx};
use quill_engine::device::GpuInit;
use quill_engine::input::Key;
use quill_engine::logging::{init_logging, LoggingConfig};
use quill_engine::render::{BatchQueue, BatchRenderer, BatchRendererConfig, TextureCache, TextureCacheConfig};
use quill_engine::window::{CursorIcon, Runtime, RuntimeConfig};
use quill_stage::prelude::*;

const CLEAR: ColorRgba = ColorRgba::new(0.05, 0.05, 0.07, 1.0);

const FIELD_COLS: usize = 16;
const FIELD_ROWS: usize = 9;
const CELL: f32 = 40.0;
const TILE: f32 = 24.0;

const HIGHLIGHT: Rgba8 = Rgba8::from_hex(0xffc040ff);

/// Seconds between draw statistics in the log.
const REPORT_INTERVAL: f32 = 2.0;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "quill demo".to_string(),
        ..RuntimeConfig::default()
    };
    Runtime::run(config, GpuInit::default(), Demo::default())
}

/// GPU-side state, created on the first frame once a device exists.
struct Gfx {
    textures: TextureCache,
    renderer: BatchRenderer,
}

#[derive(Default)]
struct Demo {
    stage: Stage,
    pointer: PointerDispatcher,
    queue: BatchQueue,
    gfx: Option<Gfx>,
    last_report: f32,
}

impl Demo {
    fn init_gfx(&mut self, ctx: &FrameCtx<'_, '_>) -> Result<Gfx> {
        let device = ctx.gpu.device();
        let queue = ctx.gpu.queue();

        let mut textures = TextureCache::new(device, TextureCacheConfig::default());
        let white = textures.create_solid(device, queue, 4, 4, Rgba8::WHITE)?;
        let teal = textures.create_solid(device, queue, 4, 4, Rgba8::from_hex(0x2bb3a3ff))?;
        let rose = textures.create_solid(device, queue, 4, 4, Rgba8::from_hex(0xd9517aff))?;

        build_field(&mut self.stage, [white, teal, rose]).context("failed to build sprite field")?;
        build_spinner(&mut self.stage, white, rose).context("failed to build spinner")?;

        let renderer = BatchRenderer::new(device, BatchRendererConfig::default());
        log::info!("scene ready: {} nodes, {} textures", self.stage.len(), textures.len());

        Ok(Gfx { textures, renderer })
    }
}

impl App for Demo {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        if ctx.input_frame.key_pressed(Key::Escape) {
            return Ok(AppControl::Exit);
        }

        if self.gfx.is_none() {
            let gfx = self.init_gfx(ctx)?;
            self.gfx = Some(gfx);
        }
        let Some(Gfx { textures, renderer }) = self.gfx.as_mut() else {
            return Ok(AppControl::Continue);
        };

        self.pointer.process(&mut self.stage, ctx.input_frame, ctx.time.now);
        ctx.window.set_cursor(match self.pointer.hovered() {
            Some(_) => CursorIcon::Pointer,
            None => CursorIcon::Default,
        });

        let sprites = self.stage.render(ctx.time.since_start, &mut self.queue);

        let queue = &mut self.queue;
        let control = ctx.render(CLEAR, |rctx, target| {
            renderer.render(rctx, target, textures, queue)?;
            Ok(())
        })?;
        // Skipped frames leave the queue filled.
        self.queue.clear();

        if ctx.time.since_start - self.last_report >= REPORT_INTERVAL {
            self.last_report = ctx.time.since_start;
            log::info!(
                "{sprites} sprites in {} draw calls ({:.1} ms/frame)",
                renderer.draw_count(),
                ctx.time.dt * 1000.0
            );
        }

        Ok(control)
    }
}

/// Grid of spinning tiles. Each row uses one texture, so consecutive tiles
/// share a batch and the whole grid costs one draw call per row.
fn build_field(stage: &mut Stage, palette: [TextureId; 3]) -> Result<(), SceneError> {
    let root = stage.root();
    let field = stage.insert(Node::container().with_name("field").with_position(40.0, 40.0));
    stage.add_child(root, field)?;

    for row in 0..FIELD_ROWS {
        let texture = palette[row % palette.len()];
        for col in 0..FIELD_COLS {
            let half = TILE * 0.5;
            let tile = stage.insert(
                Node::sprite(Some(texture), TILE, TILE)
                    .with_position(col as f32 * CELL + half, row as f32 * CELL + half)
                    .with_pivot(half, half),
            );
            stage.add_child(field, tile)?;

            let phase = (row * FIELD_COLS + col) as f32 * 0.15;
            let speed = 0.5 + (col % 4) as f32 * 0.35;
            stage.on(tile, EventKind::EnterFrame, move |stage, id, ev| {
                if let (Some(node), NodeEvent::EnterFrame { elapsed }) = (stage.node_mut(id), ev) {
                    node.set_rotation(phase + elapsed * speed);
                }
            })?;

            stage.on(tile, EventKind::PointerEnter, |stage, id, _| {
                if let Some(node) = stage.node_mut(id) {
                    node.tint = HIGHLIGHT;
                    node.set_scale(1.3);
                }
            })?;
            stage.on(tile, EventKind::PointerExit, |stage, id, _| {
                if let Some(node) = stage.node_mut(id) {
                    node.tint = Rgba8::WHITE;
                    node.set_scale(1.0);
                }
            })?;
            stage.on(tile, EventKind::Click, |stage, id, _| {
                if let Some(node) = stage.node_mut(id) {
                    node.alpha = if node.alpha < 1.0 { 1.0 } else { 0.35 };
                }
            })?;
        }
    }
    Ok(())
}

/// An arm rotating about its left end with a moon spinning at its tip.
/// Clicking the arm reverses it.
fn build_spinner(stage: &mut Stage, arm_texture: TextureId, moon_texture: TextureId) -> Result<(), SceneError> {
    let root = stage.root();
    let hub = stage.insert(Node::container().with_name("spinner").with_position(1000.0, 560.0));
    let arm = stage.insert(
        Node::sprite(Some(arm_texture), 140.0, 12.0)
            .with_name("arm")
            .with_pivot(0.0, 6.0)
            .with_tint(Rgba8::from_hex(0x8fa3bfff)),
    );
    let moon = stage.insert(
        Node::sprite(Some(moon_texture), 28.0, 28.0)
            .with_name("moon")
            .with_position(140.0, 6.0)
            .with_pivot(14.0, 14.0),
    );
    stage.add_child(root, hub)?;
    stage.add_child(hub, arm)?;
    stage.add_child(arm, moon)?;

    let direction = Rc::new(Cell::new(1.0_f32));

    let dir = Rc::clone(&direction);
    let (mut angle, mut last) = (0.0_f32, 0.0_f32);
    stage.on(arm, EventKind::EnterFrame, move |stage, id, ev| {
        let NodeEvent::EnterFrame { elapsed } = *ev else {
            return;
        };
        angle += (elapsed - last) * dir.get();
        last = elapsed;
        if let Some(node) = stage.node_mut(id) {
            node.set_rotation(angle);
        }
    })?;
    stage.on(arm, EventKind::Click, move |_, _, _| {
        direction.set(-direction.get());
        log::info!("spinner reversed");
    })?;

    stage.on(moon, EventKind::EnterFrame, |stage, id, ev| {
        if let (Some(node), NodeEvent::EnterFrame { elapsed }) = (stage.node_mut(id), ev) {
            node.set_rotation(-elapsed * 3.0);
        }
    })?;

    Ok(())
}
