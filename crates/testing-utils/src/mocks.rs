//! Mock implementations for the dispatcher's trait seams
//!
//! In-memory doubles that record every interaction so tests can assert on
//! dispatch requests, acknowledgments and metrics without a broker or cluster.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use adaptation_core::{
    Acknowledger, AdaptationError, ClusterClientFactory, DispatchError, DispatchOutcome,
    DispatchRequest, InboundMessage, MessageSource, MetricsRecorder, Result, WorkerHandle,
    WorkerLauncher,
};

#[derive(Debug, Default)]
struct ClusterState {
    connect_failure: Option<String>,
    launch_failure: Option<String>,
    connect_calls: Vec<String>,
    launched: Vec<DispatchRequest>,
}

/// Mock implementation of ClusterClientFactory for testing
#[derive(Debug, Clone, Default)]
pub struct MockClusterClientFactory {
    state: Arc<Mutex<ClusterState>>,
}

impl MockClusterClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后的每次connect都失败
    pub fn failing_connect(self, message: &str) -> Self {
        self.state.lock().unwrap().connect_failure = Some(message.to_string());
        self
    }

    /// 之后的每次launch都失败
    pub fn failing_launch(self, message: &str) -> Self {
        self.state.lock().unwrap().launch_failure = Some(message.to_string());
        self
    }

    pub fn recover(&self) {
        let mut state = self.state.lock().unwrap();
        state.connect_failure = None;
        state.launch_failure = None;
    }

    /// 每次connect传入的namespace
    pub fn connect_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().connect_calls.clone()
    }

    pub fn launched_requests(&self) -> Vec<DispatchRequest> {
        self.state.lock().unwrap().launched.clone()
    }

    pub fn launched_file_ids(&self) -> Vec<String> {
        self.launched_requests()
            .into_iter()
            .map(|request| request.file_id)
            .collect()
    }
}

#[async_trait]
impl ClusterClientFactory for MockClusterClientFactory {
    async fn connect(&self, namespace: &str) -> std::result::Result<Box<dyn WorkerLauncher>, DispatchError> {
        let mut state = self.state.lock().unwrap();
        state.connect_calls.push(namespace.to_string());

        if let Some(message) = &state.connect_failure {
            return Err(DispatchError::ClientAcquisition(message.clone()));
        }

        Ok(Box::new(MockWorkerLauncher {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockWorkerLauncher {
    state: Arc<Mutex<ClusterState>>,
}

#[async_trait]
impl WorkerLauncher for MockWorkerLauncher {
    async fn launch(&self, request: &DispatchRequest) -> std::result::Result<WorkerHandle, DispatchError> {
        let mut state = self.state.lock().unwrap();

        if let Some(message) = &state.launch_failure {
            return Err(DispatchError::Submission(message.clone()));
        }

        state.launched.push(request.clone());
        Ok(WorkerHandle {
            pod_name: format!("rebuild-{}", state.launched.len()),
            namespace: request.namespace().to_string(),
        })
    }
}

/// 记录所有指标调用
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    latencies: Mutex<Vec<Duration>>,
    outcomes: Mutex<HashMap<DispatchOutcome, u64>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, outcome: DispatchOutcome) -> u64 {
        self.outcomes
            .lock()
            .unwrap()
            .get(&outcome)
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.outcomes.lock().unwrap().values().sum()
    }

    pub fn latencies(&self) -> Vec<Duration> {
        self.latencies.lock().unwrap().clone()
    }
}

impl MetricsRecorder for RecordingMetrics {
    fn record_processing_time(&self, elapsed: Duration) {
        self.latencies.lock().unwrap().push(elapsed);
    }

    fn record_outcome(&self, outcome: DispatchOutcome) {
        *self.outcomes.lock().unwrap().entry(outcome).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckRecord {
    Ack(u64),
    Nack { delivery_tag: u64, requeue: bool },
}

/// 记录所有确认操作
#[derive(Debug, Default)]
pub struct RecordingAcknowledger {
    records: Mutex<Vec<AckRecord>>,
    fail: Mutex<bool>,
}

impl RecordingAcknowledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 确认操作返回错误，但仍然记录
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: Mutex::new(true),
        }
    }

    pub fn records(&self) -> Vec<AckRecord> {
        self.records.lock().unwrap().clone()
    }

    fn push(&self, record: AckRecord) -> Result<()> {
        self.records.lock().unwrap().push(record);
        if *self.fail.lock().unwrap() {
            return Err(AdaptationError::MessageQueue("channel closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Acknowledger for RecordingAcknowledger {
    async fn ack(&self, delivery_tag: u64) -> Result<()> {
        self.push(AckRecord::Ack(delivery_tag))
    }

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<()> {
        self.push(AckRecord::Nack {
            delivery_tag,
            requeue,
        })
    }
}

/// 基于mpsc通道的消息来源，发送端全部释放后消费流结束
pub struct ChannelMessageSource {
    receiver: mpsc::UnboundedReceiver<Result<InboundMessage>>,
}

impl ChannelMessageSource {
    pub fn channel() -> (mpsc::UnboundedSender<Result<InboundMessage>>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self { receiver })
    }
}

#[async_trait]
impl MessageSource for ChannelMessageSource {
    async fn next_message(&mut self) -> Option<Result<InboundMessage>> {
        self.receiver.recv().await
    }
}
