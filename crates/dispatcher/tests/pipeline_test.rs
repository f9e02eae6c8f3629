use std::sync::Arc;
use std::time::Duration;

use adaptation_core::models::{
    HEADER_FILE_ID, HEADER_REBUILT_FILE_LOCATION, HEADER_SOURCE_FILE_LOCATION,
};
use adaptation_core::DispatchOutcome;
use adaptation_dispatcher::{
    AckDecision, AckPolicy, DispatchCoordinator, MessageProcessor, RedeliveryPolicy,
};
use adaptation_testing_utils::{
    test_process_config, MessageBuilder, MockClusterClientFactory, RecordingMetrics,
};

fn processor(
    clients: &MockClusterClientFactory,
    metrics: &Arc<RecordingMetrics>,
) -> MessageProcessor {
    let coordinator = DispatchCoordinator::new(test_process_config(), Arc::new(clients.clone()));
    MessageProcessor::new(coordinator, metrics.clone(), AckPolicy::default())
}

#[tokio::test]
async fn test_missing_required_header_is_dropped_as_json_error() {
    for missing in [
        HEADER_FILE_ID,
        HEADER_SOURCE_FILE_LOCATION,
        HEADER_REBUILT_FILE_LOCATION,
    ] {
        let clients = MockClusterClientFactory::new();
        let metrics = Arc::new(RecordingMetrics::new());
        let processor = processor(&clients, &metrics);

        let message = MessageBuilder::valid(1, "abc").without_header(missing).build();
        let report = processor.process(&message).await;

        assert_eq!(report.outcome, DispatchOutcome::ValidationFailed);
        assert_eq!(report.decision, AckDecision::Nack { requeue: false });
        assert_eq!(metrics.count(DispatchOutcome::ValidationFailed), 1);
        assert_eq!(metrics.total(), 1);
        // 校验失败时不会尝试获取集群客户端
        assert!(clients.connect_calls().is_empty());
    }
}

#[tokio::test]
async fn test_client_acquisition_failure_is_requeued() {
    let clients = MockClusterClientFactory::new().failing_connect("connection refused");
    let metrics = Arc::new(RecordingMetrics::new());
    let processor = processor(&clients, &metrics);

    let report = processor.process(&MessageBuilder::valid(2, "abc").build()).await;

    assert_eq!(report.outcome, DispatchOutcome::ClientAcquisitionFailed);
    assert_eq!(report.decision, AckDecision::Nack { requeue: true });
    assert_eq!(metrics.count(DispatchOutcome::ClientAcquisitionFailed), 1);
    assert_eq!(metrics.total(), 1);
    assert_eq!(clients.connect_calls(), vec!["icap-adaptation".to_string()]);
    assert!(clients.launched_requests().is_empty());
}

#[tokio::test]
async fn test_submission_failure_is_requeued() {
    let clients = MockClusterClientFactory::new().failing_launch("pods is forbidden");
    let metrics = Arc::new(RecordingMetrics::new());
    let processor = processor(&clients, &metrics);

    let report = processor.process(&MessageBuilder::valid(3, "abc").build()).await;

    assert_eq!(report.outcome, DispatchOutcome::SubmissionFailed);
    assert_eq!(report.decision, AckDecision::Nack { requeue: true });
    assert_eq!(metrics.count(DispatchOutcome::SubmissionFailed), 1);
    assert_eq!(metrics.total(), 1);
}

#[tokio::test]
async fn test_accepted_message_is_acked_and_counted_ok() {
    let clients = MockClusterClientFactory::new();
    let metrics = Arc::new(RecordingMetrics::new());
    let processor = processor(&clients, &metrics);

    let message = MessageBuilder::valid(4, "abc")
        .with_generate_report("true")
        .with_reply_to("adaptation-reply")
        .build();
    let report = processor.process(&message).await;

    assert_eq!(report.outcome, DispatchOutcome::Accepted);
    assert_eq!(report.decision, AckDecision::Ack);
    assert_eq!(metrics.count(DispatchOutcome::Accepted), 1);
    assert_eq!(metrics.total(), 1);

    let worker = report.worker.unwrap();
    assert_eq!(worker.namespace, "icap-adaptation");

    let launched = clients.launched_requests();
    assert_eq!(launched.len(), 1);
    let request = &launched[0];
    assert_eq!(request.file_id, "abc");
    assert_eq!(request.source_file_location, "/in/abc");
    assert_eq!(request.rebuilt_file_location, "/out/abc");
    assert_eq!(request.generate_report, "true");
    assert_eq!(request.reply_to.as_deref(), Some("adaptation-reply"));
    assert_eq!(request.config.request_processing_image, "registry.local/rebuild:1.0");
}

#[tokio::test]
async fn test_latency_recorded_on_every_path() {
    let clients = MockClusterClientFactory::new();
    let metrics = Arc::new(RecordingMetrics::new());
    let processor = processor(&clients, &metrics);

    processor
        .process(&MessageBuilder::new(1).build())
        .await;
    processor
        .process(&MessageBuilder::valid(2, "ok").build())
        .await;

    let latencies = metrics.latencies();
    assert_eq!(latencies.len(), 2);
    assert!(latencies.iter().all(|latency| *latency > Duration::ZERO));
}

#[tokio::test]
async fn test_same_file_id_is_dispatched_twice() {
    let clients = MockClusterClientFactory::new();
    let metrics = Arc::new(RecordingMetrics::new());
    let processor = processor(&clients, &metrics);

    processor.process(&MessageBuilder::valid(1, "dup").build()).await;
    processor.process(&MessageBuilder::valid(2, "dup").build()).await;

    assert_eq!(clients.launched_file_ids(), vec!["dup".to_string(), "dup".to_string()]);
    assert_eq!(metrics.count(DispatchOutcome::Accepted), 2);
}

#[tokio::test]
async fn test_transient_failure_past_redelivery_limit_is_dropped() {
    let clients = MockClusterClientFactory::new().failing_launch("quota exceeded");
    let metrics = Arc::new(RecordingMetrics::new());
    let coordinator = DispatchCoordinator::new(test_process_config(), Arc::new(clients.clone()));
    let processor = MessageProcessor::new(
        coordinator,
        metrics.clone(),
        AckPolicy::new(RedeliveryPolicy { max_redeliveries: 5 }),
    );

    let message = MessageBuilder::valid(9, "abc").with_delivery_count(5).build();
    let report = processor.process(&message).await;

    assert_eq!(report.outcome, DispatchOutcome::SubmissionFailed);
    assert_eq!(report.decision, AckDecision::Nack { requeue: false });
    assert_eq!(metrics.count(DispatchOutcome::SubmissionFailed), 1);
}

fn bounded_processor(
    clients: &MockClusterClientFactory,
    metrics: &Arc<RecordingMetrics>,
    max_redeliveries: u32,
) -> MessageProcessor {
    let coordinator = DispatchCoordinator::new(test_process_config(), Arc::new(clients.clone()));
    MessageProcessor::new(
        coordinator,
        metrics.clone(),
        AckPolicy::new(RedeliveryPolicy { max_redeliveries }),
    )
}

#[tokio::test]
async fn test_redelivered_message_without_count_header_stops_requeueing() {
    let clients = MockClusterClientFactory::new().failing_launch("quota exceeded");
    let metrics = Arc::new(RecordingMetrics::new());
    let processor = bounded_processor(&clients, &metrics, 3);

    // 经典队列只给出redelivered标志，不带投递次数
    let mut decisions = Vec::new();
    for tag in 1..=50 {
        let message = MessageBuilder::valid(tag, "abc").redelivered().build();
        let decision = processor.process(&message).await.decision;
        decisions.push(decision);
        if decision == (AckDecision::Nack { requeue: false }) {
            break;
        }
    }

    assert_eq!(
        decisions,
        vec![
            AckDecision::Nack { requeue: true },
            AckDecision::Nack { requeue: true },
            AckDecision::Nack { requeue: true },
            AckDecision::Nack { requeue: false },
        ]
    );
    assert_eq!(metrics.count(DispatchOutcome::SubmissionFailed), 4);
}

#[tokio::test]
async fn test_redelivery_count_resets_on_fresh_delivery_and_success() {
    let clients = MockClusterClientFactory::new().failing_connect("unauthorized");
    let metrics = Arc::new(RecordingMetrics::new());
    let processor = bounded_processor(&clients, &metrics, 2);

    let first = processor.process(&MessageBuilder::valid(1, "abc").build()).await;
    let second = processor
        .process(&MessageBuilder::valid(2, "abc").redelivered().build())
        .await;
    assert_eq!(first.decision, AckDecision::Nack { requeue: true });
    assert_eq!(second.decision, AckDecision::Nack { requeue: true });

    // 相同file-id的新消息是独立请求，重新计数
    let fresh = processor.process(&MessageBuilder::valid(3, "abc").build()).await;
    assert_eq!(fresh.decision, AckDecision::Nack { requeue: true });

    clients.recover();
    let accepted = processor
        .process(&MessageBuilder::valid(4, "abc").redelivered().build())
        .await;
    assert_eq!(accepted.decision, AckDecision::Ack);

    // 成功之后计数被清除，再次失败时重新获得完整的重投次数
    let _ = clients.clone().failing_connect("unauthorized");
    let mut decisions = Vec::new();
    for tag in 5..=7 {
        let message = MessageBuilder::valid(tag, "abc").redelivered().build();
        decisions.push(processor.process(&message).await.decision);
    }
    assert_eq!(
        decisions,
        vec![
            AckDecision::Nack { requeue: true },
            AckDecision::Nack { requeue: true },
            AckDecision::Nack { requeue: false },
        ]
    );
}
