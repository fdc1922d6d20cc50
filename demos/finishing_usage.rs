//! Frame finishing without the queue
//!
//! This example demonstrates the low-level finishing APIs: assessing how much
//! studio backdrop a generated frame still shows, stripping it, and checking
//! the result. The sample frame is synthesized in memory so the example runs
//! without any input files.

use anyhow::Result;
use image::{Rgba, RgbaImage};
use pawdrobe::{
    assess_background_from_bytes, finish_frame_from_bytes, finish_frame_from_reader, FrameKind,
};
use std::io::Cursor;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (optional)
    env_logger::init();

    println!("🐾 Pawdrobe Frame Finishing Example");
    println!("===================================");

    let frame_bytes = create_sample_frame()?;

    // 1. Assess the raw generator output
    println!("\n🔍 Assessing the raw frame...");
    let before = assess_background_from_bytes(&frame_bytes)?;
    println!(
        "  • {} backdrop: {:.1}% of pixels, {:.1}% of edge (confidence {:.2})",
        before.classification,
        before.background_percentage,
        before.edge_background_percentage,
        before.confidence
    );

    // 2. Strip the backdrop
    println!("\n✂️ Finishing the frame...");
    let finished = finish_frame_from_bytes(&frame_bytes, FrameKind::Normal)?;
    println!(
        "  • {} frame, {}x{}, asset {}",
        finished.kind, finished.dimensions.0, finished.dimensions.1, finished.asset_id
    );
    tokio::fs::write("finished_normal.png", &finished.png).await?;
    println!("  • Saved to finished_normal.png");

    // 3. The same thing from any async reader
    println!("\n🌊 Finishing from a stream...");
    let from_stream =
        finish_frame_from_reader(Cursor::new(frame_bytes.clone()), FrameKind::Smile).await?;
    println!("  • {} frame finished from a memory cursor", from_stream.kind);

    // 4. Verify the finished frame passes assessment
    println!("\n✅ Re-assessing the finished frame...");
    let after = assess_background_from_bytes(&finished.png)?;
    println!(
        "  • flagged: {}, {:.1}% backdrop remaining",
        after.has_issue, after.background_percentage
    );

    println!("\n🎉 Finishing example completed!");
    Ok(())
}

/// Synthesize a generator-style frame: a colored subject on a white backdrop
fn create_sample_frame() -> Result<Vec<u8>> {
    let image = RgbaImage::from_fn(64, 64, |x, y| {
        let inside = (16..48).contains(&x) && (16..48).contains(&y);
        if inside {
            Rgba([200, 120, 60, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });

    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)?;
    Ok(buffer)
}
