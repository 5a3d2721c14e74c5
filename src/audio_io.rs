// src/audio_io.rs

use crate::audio_engine::AudioEngine;
use crate::settings::AppSettings;
use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, FromSample, Sample, SampleFormat, Stream, StreamConfig};
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Blocks up to this size are processed without touching the allocator.
const PREALLOCATED_FRAMES: usize = 8192;

/// Devices and stream configs chosen from the settings, before any stream runs.
pub struct StreamSetup {
    input_device: Device,
    output_device: Device,
    input_config: StreamConfig,
    output_config: StreamConfig,
    sample_format: SampleFormat,
    latency_ms: f32,
}

impl StreamSetup {
    pub fn sample_rate(&self) -> u32 {
        self.output_config.sample_rate.0
    }

    pub fn buffer_size(&self) -> u32 {
        match self.output_config.buffer_size {
            BufferSize::Fixed(size) => size,
            BufferSize::Default => 512, // A reasonable assumption if default
        }
    }

    /// Starts both streams. The engine moves into the output callback.
    pub fn run(self, engine: AudioEngine, xrun_count: Arc<AtomicUsize>) -> Result<(Stream, Stream)> {
        let sample_rate = self.sample_rate();
        let input_rb = HeapRb::<f32>::new((sample_rate * 4) as usize);
        let (input_producer, input_consumer) = input_rb.split();
        let target_len = (self.latency_ms / 1000.0 * sample_rate as f32).round() as usize;

        fn run<T>(
            setup: &StreamSetup,
            input_producer: HeapProducer<f32>,
            input_consumer: HeapConsumer<f32>,
            engine: AudioEngine,
            xrun_count: Arc<AtomicUsize>,
            target_len: usize,
        ) -> Result<(Stream, Stream)>
        where
            T: Sample + cpal::SizedSample + FromSample<f32>,
            f32: FromSample<T>,
        {
            let input_stream = build_input_stream::<T>(
                &setup.input_device,
                &setup.input_config,
                input_producer,
                xrun_count.clone(),
            )?;
            let output_stream = build_output_stream::<T>(
                &setup.output_device,
                &setup.output_config,
                input_consumer,
                engine,
                xrun_count,
                target_len,
            )?;
            input_stream.play()?;
            output_stream.play()?;
            Ok((input_stream, output_stream))
        }

        let streams = match self.sample_format {
            SampleFormat::F32 => run::<f32>(&self, input_producer, input_consumer, engine, xrun_count, target_len)?,
            SampleFormat::I16 => run::<i16>(&self, input_producer, input_consumer, engine, xrun_count, target_len)?,
            SampleFormat::U16 => run::<u16>(&self, input_producer, input_consumer, engine, xrun_count, target_len)?,
            format => return Err(anyhow::anyhow!("Unsupported sample format {}", format)),
        };

        tracing::info!(
            "Successfully started streams with Sample Rate: {} Hz, Buffer Size: {} Samples",
            sample_rate,
            self.buffer_size()
        );
        Ok(streams)
    }
}

fn find_host(settings: &AppSettings) -> Result<cpal::Host> {
    if let Some(name) = &settings.host_name {
        for host_id in cpal::available_hosts() {
            if host_id.name() == name {
                return Ok(cpal::host_from_id(host_id)?);
            }
        }
        tracing::warn!("Audio host {} not available, using the default host", name);
    }
    Ok(cpal::default_host())
}

/// Picks devices and configs. Falls back to the defaults for anything the
/// settings leave open.
pub fn configure(settings: &AppSettings) -> Result<StreamSetup> {
    let host = find_host(settings)?;
    let input_device = if let Some(name) = &settings.input_device {
        host.input_devices()?
            .find(|d| d.name().ok().as_ref() == Some(name))
            .ok_or_else(|| anyhow::anyhow!("Input device not found: {}", name))?
    } else {
        host.default_input_device()
            .ok_or_else(|| anyhow::anyhow!("No default input device"))?
    };
    let output_device = if let Some(name) = &settings.output_device {
        host.output_devices()?
            .find(|d| d.name().ok().as_ref() == Some(name))
            .ok_or_else(|| anyhow::anyhow!("Output device not found: {}", name))?
    } else {
        host.default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default output device"))?
    };
    tracing::info!("Using input device: {}", input_device.name()?);
    tracing::info!("Using output device: {}", output_device.name()?);

    let default_input_config = input_device.default_input_config()?;
    let default_output_config = output_device.default_output_config()?;
    let sample_format = default_output_config.sample_format();

    let mut input_config: StreamConfig = default_input_config.into();
    let mut output_config: StreamConfig = default_output_config.into();
    for config in [&mut input_config, &mut output_config] {
        if let Some(sr) = settings.sample_rate {
            config.sample_rate = cpal::SampleRate(sr);
        }
        if let Some(bs) = settings.buffer_size {
            config.buffer_size = BufferSize::Fixed(bs);
        }
    }

    Ok(StreamSetup {
        input_device,
        output_device,
        input_config,
        output_config,
        sample_format,
        latency_ms: settings.input_latency_compensation_ms,
    })
}

fn build_input_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut producer: HeapProducer<f32>,
    xrun_count: Arc<AtomicUsize>,
) -> Result<Stream>
where
    T: Sample + cpal::SizedSample,
    f32: FromSample<T>,
{
    let err_fn = move |err| {
        tracing::warn!("an error occurred on input stream: {}", err);
        xrun_count.fetch_add(1, Ordering::Relaxed);
    };
    let channels = config.channels as usize;

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            for frame in data.chunks(channels) {
                let mono_sample =
                    frame.iter().map(|s| f32::from_sample(*s)).sum::<f32>() / (channels as f32);
                if producer.push(mono_sample).is_err() {
                    // buffer full, drop sample
                }
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}

fn build_output_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut consumer: HeapConsumer<f32>,
    mut engine: AudioEngine,
    xrun_count: Arc<AtomicUsize>,
    target_len: usize,
) -> Result<Stream>
where
    T: Sample + cpal::SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let err_fn = move |err| {
        tracing::warn!("an error occurred on output stream: {}", err);
        xrun_count.fetch_add(1, Ordering::Relaxed);
    };
    let mut input_buffer: Vec<f32> = Vec::with_capacity(PREALLOCATED_FRAMES);
    let mut output_buffer: Vec<f32> = Vec::with_capacity(PREALLOCATED_FRAMES);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let num_samples = data.len() / channels;
            input_buffer.resize(num_samples, 0.0);
            output_buffer.resize(num_samples, 0.0);

            // keep the input queue from drifting past the latency target
            if consumer.len() > target_len {
                consumer.skip(consumer.len() - target_len);
            }

            let samples_read = consumer.pop_slice(&mut input_buffer);
            input_buffer[samples_read..].iter_mut().for_each(|s| *s = 0.0);

            engine.process_buffer(&input_buffer, &mut output_buffer);

            for (frame, &sample_value) in data.chunks_mut(channels).zip(output_buffer.iter()) {
                for sample in frame.iter_mut() {
                    *sample = T::from_sample(sample_value);
                }
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}
