//! Asynchronous per-file decoding with generation filtering
//!
//! Every call to [`MeshLoadPipeline::start`] opens a new generation. Jobs carry
//! the generation they were issued under; results that come back from an
//! older generation are dropped on arrival, so a reselection made while
//! decodes are still running never lets stale meshes into the scene.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use crate::geometry::Mesh;
use crate::scene::ActorStyle;
use crate::stl::{self, StlError};

/// A selected file: its name and raw bytes
#[derive(Clone, PartialEq, Eq)]
pub struct LoadedFile {
    name: String,
    bytes: Arc<[u8]>,
}

impl LoadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for LoadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One file to decode, with the style its actor will get
#[derive(Debug, Clone)]
pub struct DecodeJob {
    pub generation: u64,
    pub file: LoadedFile,
    pub style: ActorStyle,
}

impl DecodeJob {
    /// Run the decode on the current thread
    pub fn run(self) -> DecodeOutcome {
        let result = stl::parse_stl(self.file.bytes()).map(Arc::new);
        DecodeOutcome {
            generation: self.generation,
            file_name: self.file.name,
            style: self.style,
            result,
        }
    }
}

#[derive(Debug)]
pub struct DecodeOutcome {
    pub generation: u64,
    pub file_name: String,
    pub style: ActorStyle,
    pub result: Result<Arc<Mesh>, StlError>,
}

/// Where decode jobs run
pub trait DecodeExecutor {
    /// Run `job` and post its outcome on `completions`. Must not block on
    /// the receiving side.
    fn submit(&self, job: DecodeJob, completions: Sender<DecodeOutcome>);
}

/// One worker thread per job
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadedExecutor;

impl ThreadedExecutor {
    /// Hand `job` to `spawn`; if no worker can be started, decode it here so
    /// the file still gets an outcome.
    fn dispatch<F>(job: DecodeJob, completions: Sender<DecodeOutcome>, spawn: F)
    where
        F: FnOnce(String, Box<dyn FnOnce() + Send>) -> io::Result<()>,
    {
        let name = format!("stl-decode-{}", job.file.name());
        let fallback = (job.clone(), completions.clone());
        let worker = Box::new(move || {
            // Receiver gone means the viewer was dropped; nothing to report to
            let _ = completions.send(job.run());
        });

        if let Err(e) = spawn(name, worker) {
            let (job, completions) = fallback;
            warn!("failed to spawn decode worker, decoding {} inline: {e}", job.file.name());
            let _ = completions.send(job.run());
        }
    }
}

impl DecodeExecutor for ThreadedExecutor {
    fn submit(&self, job: DecodeJob, completions: Sender<DecodeOutcome>) {
        Self::dispatch(job, completions, |name, worker| {
            thread::Builder::new().name(name).spawn(worker).map(|_| ())
        });
    }
}

/// Decodes on the submitting thread; the outcome is queued immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl DecodeExecutor for InlineExecutor {
    fn submit(&self, job: DecodeJob, completions: Sender<DecodeOutcome>) {
        let _ = completions.send(job.run());
    }
}

pub struct MeshLoadPipeline {
    generation: u64,
    in_flight: usize,
    executor: Box<dyn DecodeExecutor>,
    sender: Sender<DecodeOutcome>,
    receiver: Receiver<DecodeOutcome>,
}

impl MeshLoadPipeline {
    pub fn new(executor: Box<dyn DecodeExecutor>) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            generation: 0,
            in_flight: 0,
            executor,
            sender,
            receiver,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Decodes of the current generation not yet received
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Open a new generation and submit one job per file
    pub fn start<F>(&mut self, files: &[LoadedFile], style_for: F) -> u64
    where
        F: Fn(&str) -> ActorStyle,
    {
        self.generation += 1;
        self.in_flight = files.len();
        debug!(
            "decode generation {} started for {} file(s)",
            self.generation,
            files.len()
        );

        for file in files {
            let job = DecodeJob {
                generation: self.generation,
                style: style_for(file.name()),
                file: file.clone(),
            };
            self.executor.submit(job, self.sender.clone());
        }
        self.generation
    }

    /// Abandon the current generation without starting jobs
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight = 0;
    }

    /// Next current-generation outcome that is already available
    pub fn try_next(&mut self) -> Option<DecodeOutcome> {
        while let Ok(outcome) = self.receiver.try_recv() {
            if let Some(outcome) = self.accept(outcome) {
                return Some(outcome);
            }
        }
        None
    }

    /// Next current-generation outcome, waiting at most `timeout`
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<DecodeOutcome> {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            match self.receiver.recv_deadline(deadline) {
                Ok(outcome) => {
                    if let Some(outcome) = self.accept(outcome) {
                        return Some(outcome);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
        None
    }

    fn accept(&mut self, outcome: DecodeOutcome) -> Option<DecodeOutcome> {
        if outcome.generation != self.generation {
            debug!(
                "discarding stale decode of {} (generation {}, current {})",
                outcome.file_name, outcome.generation, self.generation
            );
            return None;
        }
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(outcome)
    }
}

impl fmt::Debug for MeshLoadPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshLoadPipeline")
            .field("generation", &self.generation)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::representation::Representation;
    use crate::stl::encode_binary_stl;

    /// Holds jobs until released, to control completion order
    #[derive(Default)]
    struct ManualExecutor {
        jobs: std::cell::RefCell<Vec<(DecodeJob, Sender<DecodeOutcome>)>>,
    }

    impl DecodeExecutor for std::rc::Rc<ManualExecutor> {
        fn submit(&self, job: DecodeJob, completions: Sender<DecodeOutcome>) {
            self.jobs.borrow_mut().push((job, completions));
        }
    }

    impl ManualExecutor {
        fn release_all(&self) {
            for (job, tx) in self.jobs.borrow_mut().drain(..) {
                tx.send(job.run()).unwrap();
            }
        }
    }

    fn style(_: &str) -> ActorStyle {
        ActorStyle {
            representation: Representation::Surface,
            color: Rgb::WHITE,
        }
    }

    fn cube_file(name: &str) -> LoadedFile {
        LoadedFile::new(name, encode_binary_stl(&Mesh::cube(1.0), name))
    }

    #[test]
    fn inline_outcomes_are_ready_immediately() {
        let mut pipeline = MeshLoadPipeline::new(Box::new(InlineExecutor));
        pipeline.start(&[cube_file("a.stl"), cube_file("b.stl")], style);
        assert_eq!(pipeline.in_flight(), 2);

        let first = pipeline.try_next().unwrap();
        let second = pipeline.try_next().unwrap();
        assert!(first.result.is_ok() && second.result.is_ok());
        assert_eq!(pipeline.in_flight(), 0);
        assert!(pipeline.try_next().is_none());
    }

    /// Threaded executor on a host that refuses to start threads
    struct NoThreads;

    impl DecodeExecutor for NoThreads {
        fn submit(&self, job: DecodeJob, completions: Sender<DecodeOutcome>) {
            ThreadedExecutor::dispatch(job, completions, |_, _| {
                Err(io::Error::new(io::ErrorKind::Other, "thread limit reached"))
            });
        }
    }

    #[test]
    fn failed_spawn_still_delivers_outcome() {
        let mut pipeline = MeshLoadPipeline::new(Box::new(NoThreads));
        pipeline.start(&[cube_file("a.stl")], style);

        let outcome = pipeline.try_next().unwrap();
        assert_eq!(outcome.file_name, "a.stl");
        assert!(outcome.result.is_ok());
        assert_eq!(pipeline.in_flight(), 0);
    }

    #[test]
    fn stale_generation_is_dropped() {
        let manual = std::rc::Rc::new(ManualExecutor::default());
        let mut pipeline = MeshLoadPipeline::new(Box::new(manual.clone()));

        pipeline.start(&[cube_file("old.stl")], style);
        pipeline.start(&[cube_file("new.stl")], style);
        manual.release_all();

        let outcome = pipeline.try_next().unwrap();
        assert_eq!(outcome.file_name, "new.stl");
        assert_eq!(outcome.generation, 2);
        assert!(pipeline.try_next().is_none());
    }

    #[test]
    fn threaded_outcomes_arrive() {
        let mut pipeline = MeshLoadPipeline::new(Box::new(ThreadedExecutor));
        pipeline.start(&[cube_file("a.stl"), cube_file("b.stl"), cube_file("c.stl")], style);

        let mut names = Vec::new();
        while let Some(outcome) = pipeline.next_timeout(Duration::from_secs(5)) {
            names.push(outcome.file_name);
        }
        names.sort();
        assert_eq!(names, ["a.stl", "b.stl", "c.stl"]);
    }

    #[test]
    fn decode_errors_are_reported_per_file() {
        let mut pipeline = MeshLoadPipeline::new(Box::new(InlineExecutor));
        pipeline.start(&[LoadedFile::new("bad.stl", vec![1u8, 2, 3]), cube_file("ok.stl")], style);

        let bad = pipeline.try_next().unwrap();
        assert_eq!(bad.result.unwrap_err(), StlError::TooSmall { len: 3 });
        assert!(pipeline.try_next().unwrap().result.is_ok());
    }
}
