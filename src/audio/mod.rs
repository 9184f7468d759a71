pub mod chime;

use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use log::warn;
use rodio::{OutputStream, Sink};

use chime::Chime;

/// Completion sound collaborator. `play` is fire-and-forget; a machine with
/// no usable audio output degrades to silence.
pub trait CompletionCue: Send + Sync {
    fn play(&self);
}

/// Silent implementation for headless runs and tests.
pub struct NullCue;

impl CompletionCue for NullCue {
    fn play(&self) {}
}

enum CueCommand {
    Chime,
}

/// Plays a short synthesized chime. The rodio output objects are not `Send`,
/// so they live on a dedicated thread fed over a channel, spawned on first
/// use.
pub struct ChimeCue {
    tx: Arc<Mutex<Option<Sender<CueCommand>>>>,
}

impl ChimeCue {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Option<Sender<CueCommand>> {
        let mut guard = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(tx) = guard.as_ref() {
            return Some(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<CueCommand>();
        let spawned = thread::Builder::new()
            .name("completion-cue".to_string())
            .spawn(move || {
                // Keep the stream alive alongside the sink for the thread's
                // lifetime; dropping it silences playback.
                let mut output: Option<(OutputStream, Sink)> = None;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        CueCommand::Chime => {
                            if output.is_none() {
                                output = match OutputStream::try_default() {
                                    Ok((stream, handle)) => match Sink::try_new(&handle) {
                                        Ok(sink) => Some((stream, sink)),
                                        Err(err) => {
                                            warn!("audio sink unavailable: {err}");
                                            continue;
                                        }
                                    },
                                    Err(err) => {
                                        warn!("audio output unavailable: {err}");
                                        continue;
                                    }
                                };
                            }
                            if let Some((_, sink)) = output.as_ref() {
                                sink.append(Chime::new());
                            }
                        }
                    }
                }
            });

        match spawned {
            Ok(_) => {
                *guard = Some(tx.clone());
                Some(tx)
            }
            Err(err) => {
                warn!("failed to spawn audio thread: {err}");
                None
            }
        }
    }
}

impl Default for ChimeCue {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionCue for ChimeCue {
    fn play(&self) {
        if let Some(tx) = self.ensure_thread() {
            if tx.send(CueCommand::Chime).is_err() {
                warn!("audio thread is gone; completion cue dropped");
            }
        }
    }
}
