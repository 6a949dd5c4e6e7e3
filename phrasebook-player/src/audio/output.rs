//! Audio output using cpal
//!
//! One output stream per clip. The stream callback reads the decoded
//! samples through an atomic cursor; pause leaves the cursor in place
//! and the callback emits silence until resumed. cpal streams are not
//! `Send`, so each stream lives on its own thread and the resource talks
//! to it through the shared playout state plus a release channel.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::audio::{decoder, resampler};
use crate::error::{Error, Result};
use crate::session::resource::{AudioBackend, CompletionHook, PlaybackResource};

/// Production backend: whole-clip decode plus a per-clip cpal stream
pub struct CpalBackend {
    /// Output device sample rate, captured at startup; decoded clips are
    /// converted to this rate before playback.
    sample_rate: u32,
}

impl CpalBackend {
    /// Probe the default output device so a missing device fails at
    /// startup rather than on the first selection.
    pub fn new() -> Result<Self> {
        let config = default_output_config()?;
        Ok(Self {
            sample_rate: config.sample_rate().0,
        })
    }
}

impl AudioBackend for CpalBackend {
    fn create(
        &self,
        audio: &Path,
        completion: CompletionHook,
    ) -> Result<Box<dyn PlaybackResource>> {
        let pcm = decoder::decode_clip(audio)?;
        let samples = if pcm.sample_rate != self.sample_rate {
            resampler::resample(&pcm.samples, pcm.sample_rate, self.sample_rate, 2)?
        } else {
            pcm.samples
        };

        let resource = ClipResource::build(samples, self.sample_rate, completion)?;
        Ok(Box::new(resource))
    }
}

fn default_output_config() -> Result<cpal::SupportedStreamConfig> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::AudioOutput("no output device available".to_string()))?;
    device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("no default output config: {}", e)))
}

/// State shared between the resource handle and the stream callback
struct PlayoutState {
    /// Interleaved stereo samples at the device rate
    samples: Vec<f32>,

    /// Next sample index to emit. Pausing leaves it untouched, which is
    /// what retains the playback position.
    cursor: AtomicUsize,

    paused: AtomicBool,
    done: AtomicBool,

    /// Fired exactly once, when the cursor crosses the end
    completion: Mutex<Option<CompletionHook>>,
}

/// A decoded clip bound to a live cpal output stream
pub struct ClipResource {
    playout: Arc<PlayoutState>,
    sample_rate: u32,
    release_tx: mpsc::Sender<()>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl ClipResource {
    fn build(samples: Vec<f32>, sample_rate: u32, completion: CompletionHook) -> Result<Self> {
        let playout = Arc::new(PlayoutState {
            samples,
            cursor: AtomicUsize::new(0),
            // Created paused; `start()` opens the gate.
            paused: AtomicBool::new(true),
            done: AtomicBool::new(false),
            completion: Mutex::new(Some(completion)),
        });

        let (release_tx, release_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let thread_playout = Arc::clone(&playout);

        let thread = std::thread::Builder::new()
            .name("clip-playout".to_string())
            .spawn(move || match open_stream(thread_playout) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Hold the stream until released; a dropped sender
                    // releases it too.
                    let _ = release_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| Error::AudioOutput(format!("failed to spawn playout thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                playout,
                sample_rate,
                release_tx,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(Error::AudioOutput(
                "playout thread exited before reporting readiness".to_string(),
            )),
        }
    }
}

impl PlaybackResource for ClipResource {
    fn start(&mut self) -> Result<()> {
        self.playout.paused.store(false, Ordering::Release);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.playout.paused.store(true, Ordering::Release);
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        let frame = (position.as_secs_f64() * self.sample_rate as f64) as usize;
        let sample = (frame * 2).min(self.playout.samples.len());
        self.playout.cursor.store(sample, Ordering::Release);
        Ok(())
    }

    fn position(&self) -> Duration {
        let frames = self.playout.cursor.load(Ordering::Acquire) / 2;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    fn release(mut self: Box<Self>) {
        self.playout.paused.store(true, Ordering::Release);
        if self.release_tx.send(()).is_err() {
            debug!("Playout thread already gone");
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Playout thread panicked during release");
            }
        }
    }
}

impl Drop for ClipResource {
    fn drop(&mut self) {
        // Backstop for a resource dropped without `release()`: stop the
        // thread, but never block here.
        let _ = self.release_tx.send(());
    }
}

fn open_stream(playout: Arc<PlayoutState>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::AudioOutput("no output device available".to_string()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("no default output config: {}", e)))?;

    let channels = supported.channels() as usize;
    let config = supported.config();

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, playout),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, playout),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, playout),
        format => {
            return Err(Error::AudioOutput(format!(
                "unsupported sample format: {:?}",
                format
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| Error::AudioOutput(format!("failed to start stream: {}", e)))?;

    Ok(stream)
}

fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    playout: Arc<PlayoutState>,
) -> Result<cpal::Stream> {
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                fill_output(data, channels, &playout)
            },
            move |err| {
                error!("Audio output error: {}", err);
            },
            None,
        )
        .map_err(|e| Error::AudioOutput(format!("failed to build output stream: {}", e)))
}

/// Fill one output buffer from the playout state.
fn fill_output<T: cpal::SizedSample + cpal::FromSample<f32>>(
    data: &mut [T],
    channels: usize,
    playout: &PlayoutState,
) {
    let silence = T::from_sample(0.0f32);

    if playout.paused.load(Ordering::Acquire) || playout.done.load(Ordering::Acquire) {
        for sample in data.iter_mut() {
            *sample = silence;
        }
        return;
    }

    let total = playout.samples.len();
    let mut cursor = playout.cursor.load(Ordering::Acquire);

    for frame in data.chunks_mut(channels.max(1)) {
        if cursor + 1 < total {
            let left = playout.samples[cursor];
            let right = playout.samples[cursor + 1];
            cursor += 2;
            write_frame(frame, left, right);
        } else {
            for sample in frame.iter_mut() {
                *sample = silence;
            }
        }
    }

    playout.cursor.store(cursor, Ordering::Release);

    if cursor + 1 >= total && !playout.done.swap(true, Ordering::AcqRel) {
        if let Some(hook) = playout.completion.lock().unwrap().take() {
            hook.fire();
        }
    }
}

/// Map one stereo sample pair onto a device frame of any width.
fn write_frame<T: cpal::SizedSample + cpal::FromSample<f32>>(
    frame: &mut [T],
    left: f32,
    right: f32,
) {
    match frame.len() {
        0 => {}
        1 => frame[0] = T::from_sample((left + right) * 0.5),
        _ => {
            frame[0] = T::from_sample(left);
            frame[1] = T::from_sample(right);
            for sample in &mut frame[2..] {
                *sample = T::from_sample(0.0f32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::engine::SessionMsg;
    use tokio::sync::mpsc as tokio_mpsc;

    fn playout_with_hook(
        samples: Vec<f32>,
    ) -> (PlayoutState, tokio_mpsc::UnboundedReceiver<SessionMsg>) {
        let (tx, rx) = tokio_mpsc::unbounded_channel();
        let state = PlayoutState {
            samples,
            cursor: AtomicUsize::new(0),
            paused: AtomicBool::new(false),
            done: AtomicBool::new(false),
            completion: Mutex::new(Some(CompletionHook::new(3, tx))),
        };
        (state, rx)
    }

    #[test]
    fn test_fill_output_advances_cursor() {
        let (playout, _rx) = playout_with_hook(vec![0.1; 64]);
        let mut buffer = vec![0.0f32; 16]; // 8 stereo frames

        fill_output(&mut buffer, 2, &playout);

        assert_eq!(playout.cursor.load(Ordering::Acquire), 16);
        assert_eq!(buffer[0], 0.1);
        assert!(!playout.done.load(Ordering::Acquire));
    }

    #[test]
    fn test_fill_output_paused_emits_silence_and_holds_cursor() {
        let (playout, _rx) = playout_with_hook(vec![0.5; 64]);
        playout.cursor.store(10, Ordering::Release);
        playout.paused.store(true, Ordering::Release);

        let mut buffer = vec![1.0f32; 16];
        fill_output(&mut buffer, 2, &playout);

        assert!(buffer.iter().all(|&s| s == 0.0));
        assert_eq!(playout.cursor.load(Ordering::Acquire), 10);
    }

    #[test]
    fn test_completion_fires_exactly_once() {
        let (playout, mut rx) = playout_with_hook(vec![0.2; 8]);
        let mut buffer = vec![0.0f32; 16];

        fill_output(&mut buffer, 2, &playout);
        assert!(playout.done.load(Ordering::Acquire));
        match rx.try_recv() {
            Ok(SessionMsg::Completed { generation }) => assert_eq!(generation, 3),
            other => panic!("expected completion, got {:?}", other),
        }

        // Further callbacks stay silent and never fire again
        fill_output(&mut buffer, 2, &playout);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_write_frame_mono_device() {
        let mut frame = [0.0f32];
        write_frame(&mut frame, 0.2, 0.4);
        assert!((frame[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_write_frame_surround_device_pads_silence() {
        let mut frame = [9.0f32; 6];
        write_frame(&mut frame, 0.2, 0.4);
        assert_eq!(frame[0], 0.2);
        assert_eq!(frame[1], 0.4);
        assert!(frame[2..].iter().all(|&s| s == 0.0));
    }
}
