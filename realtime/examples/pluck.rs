use std::{f32::consts::TAU, thread, time::Duration};

use sampler_core::{
    engine::{AdsrParameter, SamplerEvent},
    SampleBuffer,
};
use sampler_realtime::{RealtimeSampler, RealtimeSamplerConfig};

const WIDTH: usize = 60;

fn pluck(sample_rate: u32, seconds: f32) -> SampleBuffer {
    let frames = (sample_rate as f32 * seconds) as usize;
    let data = (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (t * 220.0 * TAU).sin() * (-t * 3.0).exp() * 0.5
        })
        .collect();

    SampleBuffer::from_channels(vec![data], sample_rate)
        .unwrap()
        .with_name("pluck")
}

fn draw(peaks: &[f32], playhead: Option<usize>) -> String {
    peaks
        .iter()
        .enumerate()
        .map(|(column, peak)| match playhead {
            Some(p) if p == column => '|',
            _ if peak.abs() > 0.25 => '#',
            _ if peak.abs() > 0.05 => '=',
            _ => '-',
        })
        .collect()
}

fn main() {
    tracing_subscriber::fmt::init();

    let sampler = match RealtimeSampler::open_with_default_output(RealtimeSamplerConfig::default()) {
        Ok(sampler) => sampler,
        Err(err) => {
            eprintln!("Failed to open output: {err}");
            return;
        }
    };

    let sample_rate = sampler.stream_params().sample_rate;
    sampler.load_sample(pluck(sample_rate, 2.0)).unwrap();

    sampler.parameters().set(AdsrParameter::Attack, 0.01);
    sampler.parameters().set(AdsrParameter::Decay, 0.3);
    sampler.parameters().set(AdsrParameter::Sustain, 0.6);
    sampler.parameters().set(AdsrParameter::Release, 0.4);

    let _ticker = sampler.display_ticker(WIDTH, |frame| {
        println!(
            "{} {}",
            draw(frame.waveform.peaks(), frame.playhead),
            frame.sample_name.as_deref().unwrap_or("")
        );
    });

    for key in [60, 64, 67, 72] {
        sampler
            .send_event(SamplerEvent::NoteOn { key, vel: 110 })
            .unwrap();
        thread::sleep(Duration::from_millis(700));
        sampler.send_event(SamplerEvent::NoteOff { key }).unwrap();
        thread::sleep(Duration::from_millis(300));
    }

    println!("Voice Count: {}", sampler.stats().voice_count());
    thread::sleep(Duration::from_millis(500));
}
