//! Cpal output device owned by a dedicated render thread.
//!
//! The stream (not `Send` on every host) never leaves the thread that built
//! it; the rest of the system talks to it through the command channel.

use crate::error::{Error, Result};
use crate::render::Mixer;
use crate::sink::{AudioSink, VoiceCommand};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

const COMMAND_FIFO: usize = 1024;

/// The single audio output context. Owned by the voice manager's side of the
/// world; dropping it closes the device.
pub struct CpalOutput {
    command_tx: Sender<VoiceCommand>,
    shutdown_tx: Sender<()>,
    sample_rate: f64,
}

impl CpalOutput {
    /// Open the default output device and start rendering.
    pub fn open() -> Result<Arc<Self>> {
        let (command_tx, command_rx) = bounded(COMMAND_FIFO);
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let (ready_tx, ready_rx) = bounded::<Result<f64>>(1);

        thread::Builder::new()
            .name("chordboard-audio-output".to_string())
            .spawn(move || render_thread(command_rx, shutdown_rx, ready_tx))
            .map_err(Error::Io)?;

        match ready_rx.recv() {
            Ok(Ok(sample_rate)) => {
                info!("audio output open at {sample_rate} Hz");
                Ok(Arc::new(Self {
                    command_tx,
                    shutdown_tx,
                    sample_rate,
                }))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::OutputUnavailable(
                "audio render thread exited during startup".to_string(),
            )),
        }
    }

    pub fn close(&self) {
        let _ = self.shutdown_tx.try_send(());
    }
}

impl AudioSink for CpalOutput {
    fn send(&self, command: VoiceCommand) {
        if self.command_tx.try_send(command).is_err() {
            debug!("audio command queue full or closed; dropping command");
        }
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.close();
    }
}

fn render_thread(
    command_rx: Receiver<VoiceCommand>,
    shutdown_rx: Receiver<()>,
    ready_tx: Sender<Result<f64>>,
) {
    let stream = match build_stream(command_rx) {
        Ok((stream, sample_rate)) => {
            let _ = ready_tx.send(Ok(sample_rate));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // Park until shutdown; the stream renders on cpal's own thread.
    let _ = shutdown_rx.recv();
    drop(stream);
    debug!("audio output closed");
}

fn build_stream(command_rx: Receiver<VoiceCommand>) -> Result<(cpal::Stream, f64)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::OutputUnavailable("no default output device".to_string()))?;

    let supported = device.default_output_config()?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(Error::OutputUnavailable(format!(
            "unsupported sample format: {:?}",
            supported.sample_format()
        )));
    }

    let config: cpal::StreamConfig = supported.into();
    let sample_rate = config.sample_rate.0 as f64;
    let channels = config.channels as usize;
    let mut mixer = Mixer::new(sample_rate, channels);

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for command in command_rx.try_iter() {
                mixer.apply(command);
            }
            mixer.render(data);
        },
        |e| warn!("audio stream error: {e}"),
        None,
    )?;
    stream.play()?;

    Ok((stream, sample_rate))
}
