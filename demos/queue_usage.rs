//! End-to-end outfit generation through the job queue
//!
//! This example wires the queue up with the mock generator and the in-memory
//! wardrobe, submits an outfit, follows its progress, and delivers the result.
//! Swap in a real `FrameGenerator` implementation to drive an actual image
//! model the same way.

use anyhow::{Context, Result};
use pawdrobe::{
    ConsoleNotifier, FrameIOService, ItemDescriptor, JobStatus, MemoryWardrobe,
    MockFrameGenerator, OutfitJobQueue, QueueConfig, WardrobeStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (optional)
    env_logger::init();

    println!("👒 Pawdrobe Outfit Queue Example");
    println!("================================");

    // 1. Wire up the queue with short pacing so the example is quick
    let config = QueueConfig::builder()
        .min_job_latency(Duration::from_millis(500))
        .inter_job_delay(Duration::from_millis(200))
        .build()?;
    let store = Arc::new(MemoryWardrobe::new());
    let queue = OutfitJobQueue::new(Arc::new(MockFrameGenerator::new()), store.clone(), config)?;

    // 2. Observe every transition
    queue.add_notifier(Arc::new(ConsoleNotifier::new(true)));
    let mut updates = queue.watch_updates();

    // 3. Submit an outfit
    let items = vec![
        ItemDescriptor::new("hat-42", "hat", "items/hat-42.png", "Straw Hat"),
        ItemDescriptor::new("scarf-7", "neck", "items/scarf-7.png", "Red Bandana"),
    ];
    let id = queue.submit("pet-rex", "Beach Day", items);
    println!("\n📨 Submitted job {id}");

    // 4. Follow snapshots until the job settles
    while let Some(jobs) = updates.next().await {
        let Some(job) = jobs.iter().find(|j| j.id == id) else {
            continue;
        };
        println!("  • '{}' is {}", job.display_name, job.status);
        if job.is_terminal() {
            break;
        }
    }

    // 5. Export the finished frames and deliver the outfit
    let job = queue.job(id).context("job disappeared before delivery")?;
    if job.status == JobStatus::Completed {
        let frames = queue
            .frame_set(id)
            .context("completed job is missing its frames")?;
        let written = FrameIOService::export_frame_set(&frames, "finished_frames")?;
        println!("\n🖼️ Exported {} frame(s) to finished_frames/", written.len());

        queue.acknowledge(id).await?;
        let worn = store.equipped("pet-rex").await?;
        println!("👕 pet-rex is now wearing {} item(s)", worn.len());
    } else {
        println!(
            "❌ Job failed: {}",
            job.error_message.as_deref().unwrap_or("unknown")
        );
    }

    println!("\n🎉 Queue example completed!");
    Ok(())
}
