use std::{sync::Arc, time::Instant};

use anyhow::Context;
use imgui::{FontConfig, FontSource};
use imgui_winit_support::WinitPlatform;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    cli::Cli, debug_gui::DebugGui, engine, haunted_house::HauntedHouse,
    rendering::config::RenderConfig, rendering::renderer::Renderer,
};

const WINDOW_TITLE: &str = "Haunted House";

struct ImguiState {
    context: imgui::Context,
    platform: WinitPlatform,
    gui: DebugGui,
}

struct App {
    renderer: Option<Renderer>,
    house: HauntedHouse,
    render_config: RenderConfig,
    enable_gui: bool,
    imgui: Option<ImguiState>,
    last_frame: Instant,
}

impl App {
    fn new(house: HauntedHouse, render_config: RenderConfig, enable_gui: bool) -> Self {
        Self {
            renderer: None,
            house,
            render_config,
            enable_gui,
            imgui: None,
            last_frame: Instant::now(),
        }
    }

    fn setup_imgui(&mut self, window: &Window) {
        let mut context = imgui::Context::create();
        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(
            context.io_mut(),
            window,
            imgui_winit_support::HiDpiMode::Default,
        );

        let font_size = 14.0;
        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: font_size,
                ..Default::default()
            }),
        }]);

        // Disable INI support because it's broken in the published version of imgui
        context.set_ini_filename(None);

        self.imgui = Some(ImguiState {
            context,
            platform,
            gui: DebugGui::new(),
        });
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        if self.enable_gui {
            self.setup_imgui(&window);
        }

        let mut renderer = pollster::block_on(Renderer::new(
            window.clone(),
            self.render_config.clone(),
            self.imgui.as_mut().map(|imgui| &mut imgui.context),
        ))
        .context("Failed to create renderer")?;

        renderer.load_scene(&self.house);
        self.house.resize(window.inner_size(), window.scale_factor());
        window.request_redraw();

        self.renderer = Some(renderer);

        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let now = Instant::now();
        let delta_time = now - self.last_frame;
        self.last_frame = now;

        renderer.window.request_redraw();

        match self.imgui.as_mut() {
            Some(imgui) => {
                imgui.context.io_mut().update_delta_time(delta_time);

                if let Err(e) = imgui
                    .platform
                    .prepare_frame(imgui.context.io_mut(), &renderer.window)
                {
                    log::error!("Failed to prepare Imgui frame: {}", e);
                }

                let ui = imgui.context.new_frame();
                engine::update(&mut self.house, Some((&mut imgui.gui, &*ui)));
                imgui.platform.prepare_render(ui, &renderer.window);
            }
            None => engine::update(&mut self.house, None),
        }

        let imgui_context = self.imgui.as_mut().map(|imgui| &mut imgui.context);

        match renderer.render(&self.house, imgui_context) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                renderer.resize(renderer.size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                event_loop.exit();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timeout");
            }
            Err(other) => {
                log::error!("Unexpected error: {:?}", other);
            }
        }
    }

    /// Routes input to the GUI first and to the orbit controls if the GUI didn't want it.
    fn handle_input(&mut self, event: &WindowEvent) {
        let gui_wants_mouse = self
            .imgui
            .as_ref()
            .is_some_and(|imgui| imgui.gui.visible && imgui.context.io().want_capture_mouse);
        let gui_wants_keyboard = self
            .imgui
            .as_ref()
            .is_some_and(|imgui| imgui.gui.visible && imgui.context.io().want_capture_keyboard);

        let is_mouse_event = matches!(
            event,
            WindowEvent::MouseInput { .. } | WindowEvent::MouseWheel { .. }
        );
        let is_keyboard_event = matches!(event, WindowEvent::KeyboardInput { .. });

        if (is_mouse_event && gui_wants_mouse) || (is_keyboard_event && gui_wants_keyboard) {
            self.house.controls.cancel_drag();
            return;
        }

        if let WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    physical_key: PhysicalKey::Code(KeyCode::KeyH),
                    state: ElementState::Pressed,
                    repeat: false,
                    ..
                },
            ..
        } = event
        {
            if let Some(imgui) = self.imgui.as_mut() {
                imgui.gui.toggle();
            }
            return;
        }

        self.house
            .controls
            .handle_window_event(event, &self.house.camera);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        if let Err(e) = self.init(event_loop) {
            log::error!("{:#}", e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.renderer.as_ref().map(|renderer| renderer.window.clone()) else {
            return;
        };

        match &event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(*new_size);
                }
                if new_size.width > 0 && new_size.height > 0 {
                    self.house.resize(*new_size, window.scale_factor());
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::debug!("Scale factor changed to {}", scale_factor);

                // Resized only follows if the physical size changes too
                let size = window.inner_size();
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size);
                }
                if size.width > 0 && size.height > 0 {
                    self.house.resize(size, *scale_factor);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => self.handle_input(&event),
        }

        if let Some(imgui) = self.imgui.as_mut() {
            imgui.platform.handle_event::<()>(
                imgui.context.io_mut(),
                &window,
                &Event::WindowEvent { window_id, event },
            );
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let house = HauntedHouse::new(&cli.assets, cli.seed, cli.graves)
        .context("Failed to create the haunted house")?;

    let mut app = App::new(house, cli.render_config(), !cli.no_gui);
    event_loop.run_app(&mut app)?;

    Ok(())
}
