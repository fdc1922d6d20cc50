//! Integration tests for the outfit generation queue
//!
//! These tests drive the queue end to end on Tokio's paused clock, using the
//! mock generator and the in-memory wardrobe so nothing leaves the process
//! unless a test sets up its own journal file.

use pawdrobe::{
    CollectingNotifier, FrameKind, GenerationJob, ItemDescriptor, JobId, JobStatus, MemoryWardrobe,
    MockFrameGenerator, OutfitJobQueue, QueueConfig, RetryPolicy, Subscription, WardrobeStore,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn hat() -> ItemDescriptor {
    ItemDescriptor::new("hat-1", "hat", "items/hat-1.png", "Top Hat")
}

fn scarf() -> ItemDescriptor {
    ItemDescriptor::new("scarf-1", "neck", "items/scarf-1.png", "Wool Scarf")
}

/// Poll until the job reaches a terminal state, letting the paused clock
/// advance through any worker sleeps
async fn wait_until_terminal(queue: &OutfitJobQueue, id: JobId) -> GenerationJob {
    for _ in 0..2000 {
        if let Some(job) = queue.job(id) {
            if job.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} never reached a terminal state");
}

/// Record the clock instant at which each job is first seen in `status`
fn record_status_instants(
    queue: &OutfitJobQueue,
    status: JobStatus,
) -> (Subscription, Arc<Mutex<HashMap<JobId, Instant>>>) {
    let instants = Arc::new(Mutex::new(HashMap::new()));
    let seen = Arc::clone(&instants);
    let subscription = queue.subscribe(move |jobs| {
        let mut map = seen.lock().unwrap();
        for job in jobs {
            if job.status == status {
                map.entry(job.id).or_insert_with(Instant::now);
            }
        }
    });
    (subscription, instants)
}

#[tokio::test(start_paused = true)]
async fn test_full_lifecycle_from_submit_to_wear() {
    let store = Arc::new(MemoryWardrobe::new());
    let queue = OutfitJobQueue::new(
        Arc::new(MockFrameGenerator::new()),
        store.clone(),
        QueueConfig::immediate(),
    )
    .unwrap();

    let notifier = Arc::new(CollectingNotifier::new());
    queue.add_notifier(notifier.clone());

    let items = vec![hat(), scarf()];
    let id = queue.submit("pet-1", "Winter Walk", items.clone());
    let job = wait_until_terminal(&queue, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        notifier.statuses(),
        vec![
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed
        ]
    );
    let last = notifier.events().pop().unwrap();
    assert_eq!(last.display_name, "Winter Walk");
    assert!(last.error_message.is_none());

    queue.acknowledge(id).await.unwrap();
    assert_eq!(store.equipped("pet-1").await.unwrap(), items);
    assert!(queue.job(id).is_none());
    assert!(queue.frame_set(id).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_completed_frames_have_transparent_backdrops() {
    let queue = OutfitJobQueue::new(
        Arc::new(MockFrameGenerator::new()),
        Arc::new(MemoryWardrobe::new()),
        QueueConfig::immediate(),
    )
    .unwrap();

    let id = queue.submit("pet-1", "", vec![hat()]);
    wait_until_terminal(&queue, id).await;

    let frames = queue.frame_set(id).unwrap();
    for kind in FrameKind::ALL {
        let frame = frames
            .get(kind)
            .unwrap_or_else(|| panic!("missing {kind} frame"));
        let decoded = image::load_from_memory(&frame.png).unwrap().to_rgba8();

        // The mock paints a white ring around the subject; finishing must
        // turn the ring transparent and leave the subject opaque
        assert_eq!(decoded.get_pixel(0, 0)[3], 0, "{kind} corner still opaque");
        assert_eq!(decoded.get_pixel(8, 8)[3], 255, "{kind} subject not opaque");
    }
}

#[tokio::test(start_paused = true)]
async fn test_jobs_are_processed_one_at_a_time_in_order() {
    let queue = OutfitJobQueue::new(
        Arc::new(MockFrameGenerator::new()),
        Arc::new(MemoryWardrobe::new()),
        QueueConfig::immediate(),
    )
    .unwrap();
    let notifier = Arc::new(CollectingNotifier::new());
    queue.add_notifier(notifier.clone());

    let first = queue.submit("pet-1", "First", vec![hat()]);
    let second = queue.submit("pet-1", "Second", vec![hat()]);
    let third = queue.submit("pet-2", "Third", vec![scarf()]);

    wait_until_terminal(&queue, third).await;

    // Each job starts and finishes before the next one starts
    let transitions: Vec<(JobId, JobStatus)> = notifier
        .events()
        .into_iter()
        .filter(|e| e.status != JobStatus::Pending)
        .map(|e| (e.job_id, e.status))
        .collect();
    assert_eq!(
        transitions,
        vec![
            (first, JobStatus::Processing),
            (first, JobStatus::Completed),
            (second, JobStatus::Processing),
            (second, JobStatus::Completed),
            (third, JobStatus::Processing),
            (third, JobStatus::Completed),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_minimum_latency_pads_fast_jobs() {
    let config = QueueConfig::builder()
        .min_job_latency(Duration::from_millis(3000))
        .inter_job_delay(Duration::ZERO)
        .build()
        .unwrap();
    let queue = OutfitJobQueue::new(
        Arc::new(MockFrameGenerator::new()),
        Arc::new(MemoryWardrobe::new()),
        config,
    )
    .unwrap();
    let (_subscription, completions) = record_status_instants(&queue, JobStatus::Completed);

    let start = Instant::now();
    let id = queue.submit("pet-1", "", vec![hat()]);
    let job = wait_until_terminal(&queue, id).await;
    assert_eq!(job.status, JobStatus::Completed);

    // Generation is instant under the mock, so the whole 3s is padding
    let completed_at = completions.lock().unwrap()[&id];
    assert_eq!(completed_at - start, Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn test_inter_job_delay_spaces_consecutive_jobs() {
    let config = QueueConfig::builder()
        .min_job_latency(Duration::ZERO)
        .inter_job_delay(Duration::from_millis(1000))
        .build()
        .unwrap();
    let queue = OutfitJobQueue::new(
        Arc::new(MockFrameGenerator::new()),
        Arc::new(MemoryWardrobe::new()),
        config,
    )
    .unwrap();
    let (_subscription, completions) = record_status_instants(&queue, JobStatus::Completed);

    let first = queue.submit("pet-1", "", vec![hat()]);
    let second = queue.submit("pet-1", "", vec![scarf()]);
    wait_until_terminal(&queue, second).await;

    let completions = completions.lock().unwrap();
    let gap = completions[&second] - completions[&first];
    assert_eq!(gap, Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_transient_rate_limits_are_retried_to_completion() {
    let generator = Arc::new(MockFrameGenerator::new_transient(2));
    let config = QueueConfig::builder()
        .min_job_latency(Duration::ZERO)
        .inter_job_delay(Duration::ZERO)
        .retry(RetryPolicy::new(3, Duration::from_millis(100)))
        .build()
        .unwrap();
    let queue =
        OutfitJobQueue::new(generator.clone(), Arc::new(MemoryWardrobe::new()), config).unwrap();

    let id = queue.submit("pet-1", "", vec![hat()]);
    let job = wait_until_terminal(&queue, id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result.unwrap().len(), 4);

    // Two rate-limited attempts at the base pose, then one success per frame
    let history = generator.get_call_history();
    assert_eq!(history.len(), 6);
    assert_eq!(history[0], "normal from entity:pet-1");
    assert_eq!(history[1], "normal from entity:pet-1");
    assert_eq!(history[2], "normal from entity:pet-1");
    assert_eq!(history[3], "blink from inline");
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_fails_with_the_generator_message() {
    let generator = Arc::new(MockFrameGenerator::new_transient(10));
    let config = QueueConfig::builder()
        .min_job_latency(Duration::ZERO)
        .inter_job_delay(Duration::ZERO)
        .retry(RetryPolicy::new(1, Duration::from_millis(10)))
        .build()
        .unwrap();
    let queue =
        OutfitJobQueue::new(generator.clone(), Arc::new(MemoryWardrobe::new()), config).unwrap();
    let notifier = Arc::new(CollectingNotifier::new());
    queue.add_notifier(notifier.clone());

    let id = queue.submit("pet-1", "", vec![hat()]);
    let job = wait_until_terminal(&queue, id).await;

    assert_eq!(job.status, JobStatus::Failed);
    // The upstream wording reaches the user unchanged
    assert_eq!(job.error_message.as_deref(), Some("mock rate limit exceeded"));
    assert!(job.result.is_none());
    assert_eq!(generator.get_call_history().len(), 2);

    let failed = notifier.events().pop().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(
        failed.error_message.as_deref(),
        Some("mock rate limit exceeded")
    );
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_generator_output_fails_the_job() {
    let queue = OutfitJobQueue::new(
        Arc::new(MockFrameGenerator::new_returning_garbage()),
        Arc::new(MemoryWardrobe::new()),
        QueueConfig::immediate(),
    )
    .unwrap();

    let id = queue.submit("pet-1", "", vec![hat()]);
    let job = wait_until_terminal(&queue, id).await;

    assert_eq!(job.status, JobStatus::Failed);
    let message = job.error_message.unwrap();
    assert!(
        message.contains("not a valid image"),
        "unexpected message: {message}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_job_lingers_without_blocking_the_queue() {
    // One transient failure with retries disabled: the first job fails, the
    // second finds a recovered generator
    let generator = Arc::new(MockFrameGenerator::new_transient(1));
    let config = QueueConfig::builder()
        .min_job_latency(Duration::ZERO)
        .inter_job_delay(Duration::ZERO)
        .retry(RetryPolicy::disabled())
        .build()
        .unwrap();
    let queue = OutfitJobQueue::new(generator, Arc::new(MemoryWardrobe::new()), config).unwrap();

    let doomed = queue.submit("pet-1", "Doomed", vec![hat()]);
    let healthy = queue.submit("pet-1", "Healthy", vec![scarf()]);

    let failed = wait_until_terminal(&queue, doomed).await;
    let completed = wait_until_terminal(&queue, healthy).await;

    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(completed.status, JobStatus::Completed);

    // The failed job stays visible until someone dismisses it
    let jobs = queue.jobs();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].display_name, "Healthy");
    assert_eq!(jobs[1].display_name, "Doomed");
}

#[tokio::test(start_paused = true)]
async fn test_acknowledge_replaces_the_previous_outfit() {
    let store = Arc::new(MemoryWardrobe::new());
    let queue = OutfitJobQueue::new(
        Arc::new(MockFrameGenerator::new()),
        store.clone(),
        QueueConfig::immediate(),
    )
    .unwrap();

    let first = queue.submit("pet-1", "", vec![hat(), scarf()]);
    wait_until_terminal(&queue, first).await;
    queue.acknowledge(first).await.unwrap();

    let second = queue.submit("pet-1", "", vec![scarf()]);
    wait_until_terminal(&queue, second).await;
    queue.acknowledge(second).await.unwrap();

    // Equipping is a replacement, not a merge: the hat is gone
    assert_eq!(store.equipped("pet-1").await.unwrap(), vec![scarf()]);
}

#[tokio::test(start_paused = true)]
async fn test_completed_jobs_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let journal_path = dir.path().join("jobs.jsonl");
    let store = Arc::new(MemoryWardrobe::new());

    let config = QueueConfig::builder()
        .min_job_latency(Duration::ZERO)
        .inter_job_delay(Duration::ZERO)
        .journal_path(&journal_path)
        .build()
        .unwrap();

    let items = vec![hat()];
    let id = {
        let queue = OutfitJobQueue::new(
            Arc::new(MockFrameGenerator::new()),
            store.clone(),
            config.clone(),
        )
        .unwrap();
        let id = queue.submit("pet-1", "Restart Me", items.clone());
        wait_until_terminal(&queue, id).await;
        id
    };

    // A fresh queue on the same journal sees the completed job and can
    // still deliver it
    let queue = OutfitJobQueue::new(
        Arc::new(MockFrameGenerator::new()),
        store.clone(),
        config,
    )
    .unwrap();
    let restored = queue.job(id).unwrap();
    assert_eq!(restored.status, JobStatus::Completed);
    assert_eq!(restored.display_name, "Restart Me");

    queue.acknowledge(id).await.unwrap();
    assert_eq!(store.equipped("pet-1").await.unwrap(), items);
    assert!(queue.job(id).is_none());
}
