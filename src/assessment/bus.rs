use crate::engine::{EngineSink, RecognitionEngine, RecognitionEvent, RecognitionRequest};
use anyhow::Result;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

struct BusShared {
    engine: Box<dyn RecognitionEngine>,
    stop_tx: watch::Sender<bool>,
    released: AtomicBool,
}

impl BusShared {
    fn stop(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            debug!("Event bus already stopped");
            return;
        }

        // Raise the flag first so nothing is delivered once stop returns
        self.stop_tx.send_replace(true);
        self.engine.stop();
        info!("Released {} engine", self.engine.name());
    }
}

impl Drop for BusShared {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Single ordered channel over an engine's asynchronous callbacks
///
/// The engine may call its sink from any number of tasks or threads; the
/// consumer sees one event at a time, in send order. The engine is released
/// exactly once, by the first `stop()` or when the last handle is dropped.
pub struct RecognitionEventBus {
    shared: Arc<BusShared>,
}

/// Cloneable stop handle for a bus
#[derive(Clone)]
pub struct BusHandle {
    shared: Arc<BusShared>,
}

impl BusHandle {
    pub fn stop(&self) {
        self.shared.stop();
    }
}

impl RecognitionEventBus {
    pub fn new(engine: Box<dyn RecognitionEngine>) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(BusShared {
                engine,
                stop_tx,
                released: AtomicBool::new(false),
            }),
        }
    }

    pub fn handle(&self) -> BusHandle {
        BusHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn engine_name(&self) -> &str {
        self.shared.engine.name()
    }

    /// Start the engine and return the stream of its events
    ///
    /// If the bus was stopped before this call the engine is not started and
    /// the stream is empty. A stop while the engine is still starting abandons
    /// the start and returns the (already ended) stream.
    pub async fn start(&self, request: RecognitionRequest) -> Result<EventStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EngineSink::new(tx, self.shared.stop_tx.subscribe());
        let mut stopped = self.shared.stop_tx.subscribe();
        let stream = EventStream {
            rx,
            stopped: self.shared.stop_tx.subscribe(),
            finished: false,
        };

        if self.is_stopped() {
            debug!("Bus stopped before start; engine not started");
            return Ok(stream);
        }

        tokio::select! {
            biased;
            _ = stopped.changed() => {
                debug!("Bus stopped while {} engine was starting", self.engine_name());
            }
            result = self.shared.engine.start(request, sink) => result?,
        }
        Ok(stream)
    }

    /// Stop the engine; idempotent and non-blocking
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.released.load(Ordering::SeqCst)
    }
}

/// Ordered events of one recognition session
///
/// Ends after the first terminal event, when the bus is stopped, or when
/// the engine drops every sink.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<RecognitionEvent>,
    stopped: watch::Receiver<bool>,
    finished: bool,
}

impl EventStream {
    pub async fn next(&mut self) -> Option<RecognitionEvent> {
        if self.finished || *self.stopped.borrow() {
            return None;
        }

        let event = tokio::select! {
            biased;
            _ = self.stopped.changed() => None,
            event = self.rx.recv() => event,
        };

        match &event {
            Some(e) if e.is_terminal() => self.finished = true,
            None => self.finished = true,
            _ => {}
        }
        event
    }

    /// Lazy `Stream` view of the events
    pub fn into_stream(self) -> BoxStream<'static, RecognitionEvent> {
        stream::unfold(self, |mut events| async move {
            events.next().await.map(|event| (event, events))
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::SegmentResult;
    use crate::audio::AudioClip;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    type SinkSlot = Arc<Mutex<Option<EngineSink>>>;

    /// Engine that hands its sink back to the test
    struct CapturingEngine {
        sink: SinkSlot,
        stops: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl RecognitionEngine for CapturingEngine {
        async fn start(&self, _request: RecognitionRequest, sink: EngineSink) -> Result<()> {
            *self.sink.lock().unwrap() = Some(sink);
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            "capturing"
        }
    }

    fn capturing_bus() -> (RecognitionEventBus, SinkSlot, Arc<AtomicUsize>) {
        let sink: SinkSlot = Arc::new(Mutex::new(None));
        let stops = Arc::new(AtomicUsize::new(0));
        let engine = CapturingEngine {
            sink: Arc::clone(&sink),
            stops: Arc::clone(&stops),
        };
        (RecognitionEventBus::new(Box::new(engine)), sink, stops)
    }

    fn request() -> RecognitionRequest {
        RecognitionRequest {
            audio: AudioClip::new("test", Vec::new()),
            reference_text: "hello".to_string(),
        }
    }

    fn segment(text: &str) -> SegmentResult {
        SegmentResult {
            recognized_text: text.to_string(),
            words: Vec::new(),
            pronunciation_score: 0.0,
            accuracy_score: 0.0,
            fluency_score: 0.0,
            prosody_score: 0.0,
        }
    }

    fn recognized(text: &str) -> Option<RecognitionEvent> {
        Some(RecognitionEvent::SegmentRecognized(segment(text)))
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (bus, slot, _) = capturing_bus();
        let mut stream = bus.start(request()).await.unwrap();
        let sink = slot.lock().unwrap().clone().unwrap();

        sink.recognized(segment("one"));
        sink.recognized(segment("two"));
        sink.session_stopped();

        assert_eq!(stream.next().await, recognized("one"));
        assert_eq!(stream.next().await, recognized("two"));
        assert_eq!(stream.next().await, Some(RecognitionEvent::SessionStopped));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_duplicate_terminal_event_delivered_once() {
        let (bus, slot, _) = capturing_bus();
        let mut stream = bus.start(request()).await.unwrap();
        let sink = slot.lock().unwrap().clone().unwrap();

        sink.session_stopped();
        sink.session_stopped();

        assert_eq!(stream.next().await, Some(RecognitionEvent::SessionStopped));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_stop_twice_releases_engine_once() {
        let (bus, slot, stops) = capturing_bus();
        let mut stream = bus.start(request()).await.unwrap();
        let sink = slot.lock().unwrap().clone().unwrap();

        bus.stop();
        bus.handle().stop();
        assert!(bus.is_stopped());
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        assert!(!sink.session_stopped());
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_queued_events_not_delivered_after_stop() {
        let (bus, slot, _) = capturing_bus();
        let mut stream = bus.start(request()).await.unwrap();
        let sink = slot.lock().unwrap().clone().unwrap();

        sink.recognized(segment("queued"));
        bus.stop();

        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_stop_before_start_skips_engine() {
        let (bus, slot, stops) = capturing_bus();
        bus.stop();

        let mut stream = bus.start(request()).await.unwrap();
        assert!(slot.lock().unwrap().is_none());
        assert_eq!(stream.next().await, None);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    /// Engine whose start never completes
    struct StallingEngine {
        stops: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl RecognitionEngine for StallingEngine {
        async fn start(&self, _request: RecognitionRequest, _sink: EngineSink) -> Result<()> {
            futures::future::pending::<()>().await;
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            "stalling"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_abandons_pending_start() {
        let stops = Arc::new(AtomicUsize::new(0));
        let bus = RecognitionEventBus::new(Box::new(StallingEngine {
            stops: Arc::clone(&stops),
        }));

        let handle = bus.handle();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            handle.stop();
        });

        let mut stream = tokio::time::timeout(std::time::Duration::from_secs(60), bus.start(request()))
            .await
            .expect("start should return once the bus is stopped")
            .unwrap();

        assert!(bus.is_stopped());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_drop_releases_engine() {
        let (bus, _, stops) = capturing_bus();
        let handle = bus.handle();
        drop(bus);
        assert_eq!(stops.load(Ordering::SeqCst), 0);

        drop(handle);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_ends_when_engine_drops_sink() {
        let (bus, slot, _) = capturing_bus();
        let mut stream = bus.start(request()).await.unwrap();

        let sink = slot.lock().unwrap().take().unwrap();
        sink.recognized(segment("last"));
        drop(sink);

        assert_eq!(stream.next().await, recognized("last"));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callbacks_are_serialized() {
        let (bus, slot, _) = capturing_bus();
        let stream = bus.start(request()).await.unwrap();
        let sink = slot.lock().unwrap().take().unwrap();

        let mut producers = Vec::new();
        for producer in 0..4 {
            let sink = sink.clone();
            producers.push(tokio::spawn(async move {
                for i in 0..25 {
                    sink.recognized(segment(&format!("{}-{}", producer, i)));
                    tokio::task::yield_now().await;
                }
            }));
        }
        for p in producers {
            p.await.unwrap();
        }
        sink.session_stopped();

        let events: Vec<RecognitionEvent> = stream.into_stream().collect().await;
        assert_eq!(events.len(), 101);
        assert_eq!(events.last(), Some(&RecognitionEvent::SessionStopped));

        // Each producer's own events keep their order
        for producer in 0..4 {
            let prefix = format!("{}-", producer);
            let seen: Vec<usize> = events
                .iter()
                .filter_map(|e| match e {
                    RecognitionEvent::SegmentRecognized(s) => s.recognized_text.strip_prefix(&prefix).map(|n| n.parse().unwrap()),
                    _ => None,
                })
                .collect();
            assert_eq!(seen, (0..25).collect::<Vec<_>>());
        }
    }
}
