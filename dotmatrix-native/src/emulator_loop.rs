use std::{
    path::PathBuf,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
        mpsc::SyncSender,
    },
    thread,
    time::{Duration, Instant},
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use dotmatrix_core::{Emulator, HEIGHT, WIDTH, apu::SAMPLE_RATE, joypad::Buttons};
use ringbuf::{
    HeapCons, HeapProd,
    traits::{Consumer, Observer, Producer},
};

pub type Frame = Box<[u32; WIDTH * HEIGHT]>;

/// One emulated frame's worth of queued stereo samples; the emulation
/// thread sleeps while the audio queue is deeper than this.
const FRAME_SAMPLES: usize = (SAMPLE_RATE as usize / 60) * 2;

const FRAME_DURATION: Duration = Duration::from_micros(1_000_000 / 60);

/// Opens the host audio output at 44.1 kHz stereo f32, fed from the ring
/// buffer. Underruns play silence.
pub fn start_audio(mut samples: HeapCons<f32>) -> color_eyre::Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| color_eyre::eyre::eyre!("no audio output device"))?;
    let config = cpal::StreamConfig {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        buffer_size: cpal::BufferSize::Default,
    };
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for slot in data.iter_mut() {
                *slot = samples.try_pop().unwrap_or(0.0);
            }
        },
        |err| log::error!("audio stream error: {err}"),
        None,
    )?;
    stream.play()?;
    Ok(stream)
}

/// The emulation thread. Communication with the host side is limited to
/// the sample queue, the frame channel, the shared button block and the
/// running flag; everything else stays on this thread. Pacing comes from
/// audio backpressure plus a 60 fps cap at frame boundaries.
pub fn run(
    mut emulator: Box<Emulator<Box<[u8]>>>,
    mut samples: HeapProd<f32>,
    frames: SyncSender<Frame>,
    buttons: Arc<RwLock<Buttons>>,
    running: Arc<AtomicBool>,
    save_path: PathBuf,
) {
    let mut last_frame = emulator.frames_rendered();
    let mut deadline = Instant::now();

    while running.load(Ordering::Relaxed) {
        emulator.step();

        for sample in emulator.drain_samples() {
            let _ = samples.try_push(sample);
        }
        while samples.occupied_len() > FRAME_SAMPLES && running.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(1));
        }

        if emulator.frames_rendered() != last_frame {
            last_frame = emulator.frames_rendered();

            if let Ok(input) = buttons.try_read() {
                *emulator.buttons_mut() = *input;
            }
            let _ = frames.try_send(Box::new(*emulator.frame()));

            if emulator.cartridge_mut().take_dirty() {
                flush_save(&emulator, &save_path);
            }

            deadline += FRAME_DURATION;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            } else {
                deadline = now;
            }
        }
    }

    // pending save data goes out before a clean exit
    if emulator.cartridge_mut().take_dirty() || emulator.cartridge().battery_backed() {
        flush_save(&emulator, &save_path);
    }
}

fn flush_save(emulator: &Emulator<Box<[u8]>>, save_path: &PathBuf) {
    if !emulator.cartridge().battery_backed() {
        return;
    }
    let ram = emulator.cartridge().save_ram();
    if ram.is_empty() {
        return;
    }
    if let Err(err) = std::fs::write(save_path, ram) {
        log::error!("failed to write {}: {err}", save_path.display());
    }
}

/// ARGB (the core's pixel format) to the RGBA bytes `pixels` wants.
pub fn blit(frame: &Frame, target: &mut [u8]) {
    for (slot, &argb) in target.chunks_exact_mut(4).zip(frame.iter()) {
        slot[0] = (argb >> 16) as u8;
        slot[1] = (argb >> 8) as u8;
        slot[2] = argb as u8;
        slot[3] = (argb >> 24) as u8;
    }
}
