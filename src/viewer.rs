//! The slideshow window: a winit event loop that feeds input, timer ticks and
//! loader replies to the [`Slideshow`] and carries out the resulting effects.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use tracing::{debug, error, info, trace, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::config::Configuration;
use crate::controller::{Command, Effect, Event, Key, Slideshow};
use crate::error::Error;
use crate::loader::{DecodeRequest, FitPolicy, LoaderMsg, LoaderReply, PreparedImage, spawn_loader};
use crate::overlay::{BarLayout, OverlayPainter};
use crate::render::Renderer;
use crate::requests::{Outcome, SlideRequests};

const EMPTY_MESSAGE: &str = "No images found in the selected folders";
const EXHAUSTED_MESSAGE: &str = "No displayable images";

#[derive(Debug)]
pub enum ViewerEvent {
    Loaded(LoaderReply),
}

/// Keyboard keys the slideshow reacts to.
#[must_use]
pub const fn map_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::Space => Some(Key::Space),
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::KeyR => Some(Key::R),
        KeyCode::KeyF => Some(Key::F),
        _ => None,
    }
}

struct ViewerApp {
    slideshow: Slideshow,
    background: [u8; 3],
    transition: Duration,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    painter: OverlayPainter,
    layout: BarLayout,
    cursor: PhysicalPosition<f64>,
    to_loader: Sender<LoaderMsg>,
    requests: SlideRequests,
    placeholder: bool,
    closing: bool,
}

impl ViewerApp {
    fn new(slideshow: Slideshow, cfg: &Configuration, to_loader: Sender<LoaderMsg>) -> Self {
        let requests = SlideRequests::new(slideshow.state().mode());
        Self {
            slideshow,
            background: cfg.background,
            transition: cfg.transition(),
            window: None,
            renderer: None,
            painter: OverlayPainter::new(),
            layout: BarLayout::compute(1, 1, 1.0),
            cursor: PhysicalPosition::new(0.0, 0.0),
            to_loader,
            requests,
            placeholder: false,
            closing: false,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }
        let fullscreen = self
            .slideshow
            .state()
            .is_fullscreen()
            .then_some(Fullscreen::Borderless(None));
        let attrs = WindowAttributes::default()
            .with_title("Slideshow")
            .with_fullscreen(fullscreen);
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create slideshow window");
                None
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn scale(&self) -> f32 {
        self.window
            .as_ref()
            .map_or(1.0, |w| w.scale_factor() as f32)
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn viewport(&self) -> Option<(u32, u32)> {
        self.renderer.as_ref().map(Renderer::size)
    }

    fn send(&mut self, request: DecodeRequest) {
        let ticket = request.ticket;
        trace!(ticket, purpose = ?request.purpose, "decode requested");
        if let Err(err) = self.to_loader.send(LoaderMsg::Decode(request)) {
            warn!(error = %err, "loader is gone; request dropped");
            self.requests.forget(ticket);
        }
    }

    /// Put the slide under the cursor on screen, or the placeholder when
    /// there is none.
    fn show_current(&mut self, now: Instant) {
        let Some(path) = self.slideshow.current_image().map(|p| p.as_path().to_path_buf()) else {
            self.requests.clear();
            self.show_placeholder();
            return;
        };
        let Some(viewport) = self.viewport() else {
            return;
        };
        if !self.placeholder && self.requests.is_settled_on(&path) {
            trace!(path = %path.display(), "slide already on screen");
            self.schedule_prefetch();
            return;
        }
        if let Some(image) = self.requests.take_prefetched(&path, viewport) {
            debug!(path = %path.display(), "using prefetched slide");
            self.present(&image, false, now);
            return;
        }
        let request = self.requests.show(path, viewport);
        self.send(request);
    }

    fn present(&mut self, image: &PreparedImage, refit: bool, now: Instant) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        renderer.set_message(None);
        self.placeholder = false;
        if refit {
            renderer.replace_photo(image);
        } else {
            renderer.set_photo(image, now);
            debug!(path = %image.path.display(), w = image.width, h = image.height, "slide shown");
        }
        self.requests.presented(image.path.clone());
        self.slideshow.handle(Event::Shown(image.path.clone()), now);
        self.schedule_prefetch();
        self.request_redraw();
    }

    fn schedule_prefetch(&mut self) {
        if self.slideshow.catalog().len() < 2 {
            return;
        }
        let Some(viewport) = self.viewport() else {
            return;
        };
        let Some(next) = self
            .slideshow
            .upcoming_image()
            .map(|p| p.as_path().to_path_buf())
        else {
            return;
        };
        if let Some(request) = self.requests.prefetch(next, viewport) {
            self.send(request);
        }
    }

    fn show_placeholder(&mut self) {
        let text = if self.slideshow.catalog().is_empty() {
            EMPTY_MESSAGE
        } else {
            EXHAUSTED_MESSAGE
        };
        let scale = self.scale();
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let (w, h) = renderer.size();
        renderer.clear_photo();
        renderer.set_message(Some(self.painter.message(w, h, scale, text)));
        self.placeholder = true;
        self.request_redraw();
    }

    fn refresh_overlay(&mut self, now: Instant) {
        let scale = self.scale();
        let overlay = self.slideshow.controls_visible(now).then(|| {
            self.painter
                .control_bar(&self.layout, &self.slideshow.status(), scale)
        });
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_overlay(overlay);
        }
        self.request_redraw();
    }

    fn apply(&mut self, effect: Effect, event_loop: &ActiveEventLoop, now: Instant) {
        match effect {
            Effect::None => {}
            Effect::Refresh => {
                if self.slideshow.current_image().is_none() && !self.placeholder {
                    self.show_current(now);
                }
                self.refresh_overlay(now);
            }
            Effect::Show => {
                self.requests.note_mode(self.slideshow.state().mode());
                self.show_current(now);
                self.refresh_overlay(now);
            }
            Effect::SetFullscreen(on) => {
                if let Some(window) = self.window.as_ref() {
                    window.set_fullscreen(on.then_some(Fullscreen::Borderless(None)));
                }
                self.refresh_overlay(now);
            }
            Effect::Exit => self.shutdown(event_loop),
        }
    }

    fn handle(&mut self, event: Event, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let effect = self.slideshow.handle(event, now);
        self.apply(effect, event_loop, now);
    }

    fn on_loaded(&mut self, reply: LoaderReply, event_loop: &ActiveEventLoop) {
        match self.requests.accept(reply) {
            Outcome::Present { image, refit } => self.present(&image, refit, Instant::now()),
            Outcome::Failed(path) => self.handle(Event::DecodeFailed(path), event_loop),
            Outcome::Stored | Outcome::Ignored => {}
        }
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        let now = Instant::now();
        let scale = self.scale();
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        renderer.resize(width, height);
        let viewport = renderer.size();
        self.layout = BarLayout::compute(viewport.0, viewport.1, scale);
        self.requests.drop_prefetch();

        if let Some(window) = self.window.as_ref() {
            let on = window.fullscreen().is_some();
            if on != self.slideshow.state().is_fullscreen() {
                self.slideshow.sync_fullscreen(on);
            }
        }

        if width == 0 || height == 0 {
            return;
        }
        let refit = self
            .slideshow
            .current_image()
            .and_then(|current| self.requests.refit(current.as_path(), viewport));
        match refit {
            Some(request) => self.send(request),
            None if self.placeholder => self.show_placeholder(),
            None => {}
        }
        self.refresh_overlay(now);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        match renderer.render(Instant::now()) {
            Ok(true) => self.request_redraw(),
            Ok(false) => {}
            Err(err) => {
                error!(error = %Error::Render(err), "rendering failed");
                self.shutdown(event_loop);
            }
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if !self.closing {
            self.closing = true;
            info!("shutting down slideshow");
            let _ = self.to_loader.send(LoaderMsg::Quit);
        }
        event_loop.exit();
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.ensure_window(event_loop) else {
            self.shutdown(event_loop);
            return;
        };
        if self.renderer.is_none() {
            match Renderer::new(window.clone(), self.background, self.transition) {
                Ok(renderer) => {
                    let (w, h) = renderer.size();
                    self.layout = BarLayout::compute(w, h, self.scale());
                    self.renderer = Some(renderer);
                }
                Err(err) => {
                    error!(error = %Error::Render(err), "failed to initialise GPU state");
                    self.shutdown(event_loop);
                    return;
                }
            }
            let now = Instant::now();
            self.show_current(now);
            self.refresh_overlay(now);
        }
        self.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                info!("window close requested");
                let effect = self.slideshow.apply(Command::Quit, Instant::now());
                self.apply(effect, event_loop, Instant::now());
            }
            WindowEvent::Resized(size) => self.on_resize(size.width, size.height),
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                if let Err(err) = inner_size_writer.request_inner_size(size) {
                    debug!(error = %err, "inner size request rejected");
                }
                self.on_resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                if let PhysicalKey::Code(code) = event.physical_key
                    && let Some(key) = map_key(code)
                {
                    self.handle(Event::Key(key), event_loop);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position;
                self.handle(Event::PointerMoved, event_loop);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                #[allow(clippy::cast_possible_truncation)]
                let target = self.layout.hit(self.cursor.x as f32, self.cursor.y as f32);
                self.handle(Event::Click(target), event_loop);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Loaded(reply) => self.on_loaded(reply, event_loop),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.closing {
            return;
        }
        self.handle(Event::Tick, event_loop);
        let flow = match self.slideshow.next_deadline() {
            Some(deadline) => ControlFlow::WaitUntil(deadline),
            None => ControlFlow::Wait,
        };
        event_loop.set_control_flow(flow);
        if self.renderer.as_ref().is_some_and(Renderer::is_animating) {
            self.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if !self.closing {
            let _ = self.to_loader.send(LoaderMsg::Quit);
        }
    }
}

/// Open the slideshow window and run until the user quits.
///
/// # Errors
/// Fails when the event loop or the loader thread cannot be started.
pub fn run(slideshow: Slideshow, cfg: &Configuration) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build slideshow event loop")?;
    let proxy = event_loop.create_proxy();

    let (to_loader, from_viewer) = crossbeam_channel::unbounded();
    let policy = FitPolicy {
        upscale: cfg.upscale,
        background: cfg.background,
    };
    let loader = spawn_loader(from_viewer, policy, move |reply| {
        if proxy.send_event(ViewerEvent::Loaded(reply)).is_err() {
            trace!("event loop closed; reply dropped");
        }
    })
    .context("failed to start image loader")?;

    let mut app = ViewerApp::new(slideshow, cfg, to_loader);
    let run_result = event_loop.run_app(&mut app);
    drop(app);

    if loader.join().is_err() {
        warn!("image loader panicked");
    }
    run_result.context("slideshow event loop failed")
}
