mod emulator_loop;

use std::{
    path::PathBuf,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

use color_eyre::eyre::eyre;
use dotmatrix_core::{Emulator, HEIGHT, WIDTH, cartridge::Cartridge, joypad::Buttons};
use pixels::{Pixels, PixelsBuilder, SurfaceTexture};
use ringbuf::{HeapRb, traits::Split};
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowBuilder},
};

use emulator_loop::{Frame, blit};

fn get_pixels_from_window(window: &Window) -> color_eyre::Result<Pixels<'_>> {
    let window_size = window.inner_size();
    let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, window);
    Ok(
        PixelsBuilder::new(WIDTH as u32, HEIGHT as u32, surface_texture)
            .enable_vsync(true)
            .build()?,
    )
}

fn apply_key(buttons: &mut Buttons, keycode: KeyCode, pressed: bool) {
    match keycode {
        KeyCode::KeyA => buttons.a = pressed,
        KeyCode::KeyB => buttons.b = pressed,
        KeyCode::ArrowLeft => buttons.left = pressed,
        KeyCode::ArrowRight => buttons.right = pressed,
        KeyCode::ArrowUp => buttons.up = pressed,
        KeyCode::ArrowDown => buttons.down = pressed,
        KeyCode::Enter => buttons.start = pressed,
        KeyCode::Tab => buttons.select = pressed,
        _ => {}
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let rom_path = args
        .next()
        .ok_or_else(|| eyre!("usage: dotmatrix-native <rom.gb> [boot.bin]"))?;
    let rom = std::fs::read(&rom_path)?;
    let mut cartridge = Cartridge::new(rom.into_boxed_slice())?;
    if let Some(boot_path) = args.next() {
        cartridge = cartridge.with_boot_rom(&std::fs::read(boot_path)?)?;
    }

    let save_path = PathBuf::from(format!("{rom_path}.sav"));
    let mut emulator = Box::new(Emulator::new(cartridge));
    if emulator.cartridge().battery_backed()
        && let Ok(save) = std::fs::read(&save_path)
    {
        log::info!("loaded save data from {}", save_path.display());
        emulator.cartridge_mut().load_save_ram(&save);
    }

    let buttons: Arc<RwLock<Buttons>> = Default::default();
    let running = Arc::new(AtomicBool::new(true));
    let (tx_frame, rx_frame) = mpsc::sync_channel::<Frame>(2);

    // a quarter second of audio; the emulation thread blocks once it is
    // more than a frame ahead
    let (producer, consumer) = HeapRb::<f32>::new(22_050).split();
    let _stream = emulator_loop::start_audio(consumer)?;

    let worker = {
        let buttons = buttons.clone();
        let running = running.clone();
        thread::spawn(move || {
            emulator_loop::run(emulator, producer, tx_frame, buttons, running, save_path)
        })
    };

    let event_loop = EventLoop::new()?;
    let window = {
        let size = LogicalSize::new(WIDTH as f64, HEIGHT as f64);
        let scaled_size = LogicalSize::new(WIDTH as f64 * 4.0, HEIGHT as f64 * 4.0);
        WindowBuilder::new()
            .with_title("dotmatrix")
            .with_inner_size(scaled_size)
            .with_min_inner_size(size)
            .build(&event_loop)?
    };
    let mut pixels = get_pixels_from_window(&window)?;

    event_loop.run(|event, elwt| match event {
        Event::WindowEvent {
            event: WindowEvent::RedrawRequested,
            window_id,
        } if window_id == window.id() => {
            if let Ok(frame) = rx_frame.recv_timeout(Duration::from_millis(100)) {
                blit(&frame, pixels.frame_mut());
            }
            if let Err(err) = pixels.render() {
                log::error!("render failed: {err}");
                elwt.exit();
            }
            window.request_redraw();
        }
        Event::WindowEvent {
            event: WindowEvent::Resized(size),
            window_id,
        } if window_id == window.id() => {
            if let Err(err) = pixels.resize_surface(size.width, size.height) {
                log::error!("surface resize failed: {err}");
            }
        }
        Event::WindowEvent {
            event:
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            state,
                            physical_key: PhysicalKey::Code(keycode),
                            ..
                        },
                    ..
                },
            ..
        } => {
            if keycode == KeyCode::Escape {
                elwt.exit();
                return;
            }
            if let Ok(mut buttons) = buttons.write() {
                apply_key(&mut buttons, keycode, state == ElementState::Pressed);
            }
        }
        Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            ..
        } => elwt.exit(),
        _ => {}
    })?;

    // the die flag stops the emulation thread, which flushes saves on its
    // way out
    running.store(false, Ordering::Relaxed);
    drop(rx_frame);
    worker
        .join()
        .map_err(|_| eyre!("emulation thread panicked"))?;
    Ok(())
}
