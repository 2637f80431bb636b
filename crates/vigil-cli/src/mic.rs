//! Microphone capture via cpal.
//!
//! The cpal callback downmixes to mono and pushes frames through an mpsc
//! channel; the monitor loop drains them at its own cadence. Dropping the
//! stream stops capture, which makes `stop` naturally idempotent.

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use vigil_core::{CaptureError, CaptureSource, SampleFrame};

pub struct MicSource {
    device_name: Option<String>,
    stream: Option<Stream>,
    frames: Option<Receiver<SampleFrame>>,
}

impl MicSource {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            stream: None,
            frames: None,
        }
    }

    fn find_device(&self) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        match &self.device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| CaptureError::Stream(e.to_string()))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or(CaptureError::DeviceUnavailable),
            None => host
                .default_input_device()
                .ok_or(CaptureError::DeviceUnavailable),
        }
    }

    fn build_stream(
        device: &cpal::Device,
        config: &StreamConfig,
        format: SampleFormat,
        tx: Sender<SampleFrame>,
    ) -> Result<Stream, CaptureError> {
        let channels = config.channels as usize;
        let err_fn = |e| eprintln!("audio stream error: {e}");

        let stream = match format {
            SampleFormat::F32 => device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(downmix(data.iter().copied(), channels));
                },
                err_fn,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let samples = data.iter().map(|&s| s as f32 / i16::MAX as f32);
                    let _ = tx.send(downmix(samples, channels));
                },
                err_fn,
                None,
            ),
            SampleFormat::U16 => device.build_input_stream(
                config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    let samples = data
                        .iter()
                        .map(|&s| (s as f32 - 32_768.0) / 32_768.0);
                    let _ = tx.send(downmix(samples, channels));
                },
                err_fn,
                None,
            ),
            other => {
                return Err(CaptureError::Stream(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        };

        stream.map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
            other => CaptureError::Stream(other.to_string()),
        })
    }
}

/// Average interleaved channels into mono samples normalized to [-1, 1].
fn downmix(samples: impl Iterator<Item = f32>, channels: usize) -> SampleFrame {
    let channels = channels.max(1);
    let mut mono = Vec::new();
    let mut acc = 0.0f32;
    let mut n = 0usize;
    for sample in samples {
        acc += sample;
        n += 1;
        if n == channels {
            mono.push((acc / channels as f32).clamp(-1.0, 1.0));
            acc = 0.0;
            n = 0;
        }
    }
    SampleFrame::new(mono)
}

impl CaptureSource for MicSource {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let device = self.find_device()?;
        let supported = device
            .default_input_config()
            .map_err(|_| CaptureError::DeviceUnavailable)?;
        let format = supported.sample_format();
        let config: StreamConfig = supported.into();

        let (tx, rx) = channel();
        let stream = Self::build_stream(&device, &config, format, tx)?;
        stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        self.stream = Some(stream);
        self.frames = Some(rx);
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the stream stops capture and releases the device.
        self.stream.take();
        self.frames.take();
    }

    fn poll(&mut self) -> Result<Option<SampleFrame>, CaptureError> {
        let Some(rx) = self.frames.as_ref() else {
            return Ok(None);
        };
        match rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.stop();
                Err(CaptureError::Stream("input stream closed".into()))
            }
        }
    }
}
