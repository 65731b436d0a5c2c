use std::{sync::Arc, thread};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig, SupportedStreamConfig,
};
use crossbeam_channel::{bounded, Sender, TrySendError};
use tracing::{debug, error, info, warn};

use sampler_core::{
    display::{DisplayFrame, SampleSlot, WaveformView},
    engine::{SamplerEvent, SamplerParameters, VoiceEngine, VoiceEngineStatsReader},
    AudioStreamParams, ChannelCount, PlaybackClockReader, SampleBuffer,
};

use crate::{
    stream_renderer::{SamplerCommand, StreamRenderer},
    DisplayTicker, RealtimeError, RealtimeSamplerConfig,
};

/// A sampler playing through an audio output device.
///
/// The voice engine lives inside the audio callback. This handle only talks
/// to it through a bounded command queue and lock-free shared state.
pub struct RealtimeSampler {
    stream: Stream,
    commands: Sender<SamplerCommand>,

    parameters: SamplerParameters,
    clock: PlaybackClockReader,
    sample_slot: SampleSlot,
    stats: VoiceEngineStatsReader,

    stream_params: AudioStreamParams,
    config: RealtimeSamplerConfig,
}

impl RealtimeSampler {
    /// Opens the sampler on the default output device of the default host.
    pub fn open_with_default_output(config: RealtimeSamplerConfig) -> Result<Self, RealtimeError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(RealtimeError::NoOutputDevice)?;
        let name = device.name().unwrap_or_else(|_| "unknown".into());
        info!(device = %name, "Using default output device");

        let stream_config = device.default_output_config()?;
        RealtimeSampler::open(config, &device, stream_config)
    }

    pub fn open(
        config: RealtimeSamplerConfig,
        device: &Device,
        stream_config: SupportedStreamConfig,
    ) -> Result<Self, RealtimeError> {
        let sample_rate = stream_config.sample_rate().0;
        let device_channels = stream_config.channels();
        let channels = match device_channels {
            0 => return Err(RealtimeError::NoOutputChannels),
            1 => ChannelCount::Mono,
            _ => ChannelCount::Stereo,
        };
        let stream_params = AudioStreamParams::new(sample_rate, channels);

        let parameters = SamplerParameters::default();
        let engine = VoiceEngine::new(stream_params, config.engine, parameters.clone());
        let clock = engine.clock();
        let stats = engine.get_stats();

        let (command_sender, command_receiver) = bounded(config.command_queue_size.max(1));
        let (reclaim_sender, reclaim_receiver) =
            bounded::<Arc<SampleBuffer>>(config.reclaim_queue_size.max(1));

        // Replaced samples are freed here instead of on the audio thread.
        // The thread exits once the stream and its renderer are dropped.
        thread::spawn(move || {
            for sample in reclaim_receiver {
                debug!(frames = sample.frames(), "Dropping replaced sample");
            }
        });

        let renderer = StreamRenderer::new(
            engine,
            command_receiver,
            reclaim_sender,
            device_channels as usize,
        );

        let sample_format = stream_config.sample_format();
        let output_config = stream_config.config();
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(device, &output_config, renderer)?,
            SampleFormat::I16 => build_stream::<i16>(device, &output_config, renderer)?,
            SampleFormat::U16 => build_stream::<u16>(device, &output_config, renderer)?,
            other => return Err(RealtimeError::UnsupportedSampleFormat(other)),
        };

        stream.play()?;
        info!(
            sample_rate,
            channels = device_channels,
            ?sample_format,
            "Output stream started"
        );

        Ok(Self {
            stream,
            commands: command_sender,
            parameters,
            clock,
            sample_slot: SampleSlot::new(),
            stats,
            stream_params,
            config,
        })
    }

    fn send_command(&self, command: SamplerCommand) -> Result<(), RealtimeError> {
        self.commands.try_send(command).map_err(|err| match err {
            TrySendError::Full(_) => RealtimeError::QueueFull,
            TrySendError::Disconnected(_) => RealtimeError::Disconnected,
        })
    }

    pub fn send_event(&self, event: SamplerEvent) -> Result<(), RealtimeError> {
        self.send_command(SamplerCommand::Event(event))
    }

    /// Replaces the playing sample. All sounding voices stop.
    pub fn load_sample(&self, sample: impl Into<Arc<SampleBuffer>>) -> Result<(), RealtimeError> {
        let sample = sample.into();
        info!(
            name = sample.name().unwrap_or("<unnamed>"),
            frames = sample.frames(),
            channels = sample.channel_count(),
            "Loading sample"
        );
        if sample.sample_rate() != self.stream_params.sample_rate {
            warn!(
                sample_rate = sample.sample_rate(),
                output_rate = self.stream_params.sample_rate,
                "Sample rate differs from the output, playback speed will be off"
            );
        }

        self.send_command(SamplerCommand::LoadSample(sample.clone()))?;
        self.sample_slot.publish(Some(sample));
        Ok(())
    }

    pub fn unload_sample(&self) -> Result<(), RealtimeError> {
        self.send_command(SamplerCommand::UnloadSample)?;
        self.sample_slot.publish(None);
        Ok(())
    }

    /// The currently loaded sample, as last requested from this handle.
    pub fn sample(&self) -> Option<Arc<SampleBuffer>> {
        self.sample_slot.current()
    }

    pub fn parameters(&self) -> &SamplerParameters {
        &self.parameters
    }

    pub fn clock(&self) -> PlaybackClockReader {
        self.clock.clone()
    }

    pub fn waveform_view(&self) -> WaveformView {
        WaveformView::new(
            self.sample_slot.clone(),
            self.clock.clone(),
            self.parameters.clone(),
        )
    }

    /// Starts a display ticker at the configured refresh rate.
    pub fn display_ticker<F>(&self, width: usize, on_frame: F) -> DisplayTicker
    where
        F: FnMut(DisplayFrame) + Send + 'static,
    {
        DisplayTicker::spawn(
            self.waveform_view(),
            self.config.display_refresh_hz,
            width,
            on_frame,
        )
    }

    pub fn stats(&self) -> &VoiceEngineStatsReader {
        &self.stats
    }

    pub fn stream_params(&self) -> &AudioStreamParams {
        &self.stream_params
    }

    pub fn pause(&self) -> Result<(), RealtimeError> {
        self.stream.pause()?;
        Ok(())
    }

    pub fn resume(&self) -> Result<(), RealtimeError> {
        self.stream.play()?;
        Ok(())
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut renderer: StreamRenderer,
) -> Result<Stream, RealtimeError>
where
    T: SizedSample + FromSample<f32>,
{
    let err_fn = |err: cpal::StreamError| error!("Output stream error: {}", err);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| renderer.render(data),
        err_fn,
        None,
    )?;

    Ok(stream)
}
