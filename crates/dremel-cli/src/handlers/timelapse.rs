//! Snapshot, add-frame and make-gif handlers

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use crate::{AddFrameArgs, MakeGifArgs, SnapshotArgs};
use chrono::Local;
use dremel_timelapse::{
    parse_rate, run_blocking, snapshot_name, AssembledGif, FrameStore, GifAssembler,
};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decode an image file on the blocking pool
pub async fn load_image(path: &Path) -> CliResult<DynamicImage> {
    if !path.is_file() {
        return Err(CliError::invalid_argument(format!(
            "image file not found: {}",
            path.display()
        )));
    }
    let path = path.to_path_buf();
    let image = run_blocking("load_image", move || Ok(image::open(&path)?)).await?;
    Ok(image)
}

/// Store `args.image` as `<output_dir>/<name>.jpeg`
pub async fn execute_snapshot(
    config: &CliConfig,
    args: &SnapshotArgs,
    reporter: &Reporter,
) -> CliResult<PathBuf> {
    let image = load_image(&args.image).await?;
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| snapshot_name(Local::now()));
    let store = FrameStore::new(&config.timelapse);
    let output_dir = args.output_dir.clone();

    let path = run_blocking("write_snapshot", move || {
        store.write_snapshot(&output_dir, &name, &image)
    })
    .await?;

    reporter.success(&format!("Snapshot saved: {}", path.display()));
    Ok(path)
}

/// Append `args.image` to session `args.name`
pub async fn execute_add_frame(
    config: &CliConfig,
    args: &AddFrameArgs,
    reporter: &Reporter,
) -> CliResult<PathBuf> {
    let image = load_image(&args.image).await?;
    let store = FrameStore::new(&config.timelapse);
    let session = args.name.clone();

    let path = run_blocking("append_frame", move || store.append(&session, &image)).await?;

    debug!(session = %args.name, path = %path.display(), "frame appended");
    reporter.success(&format!("Frame added: {}", path.display()));
    Ok(path)
}

/// Assemble session `args.name` into `<output_dir>/<name>.gif`
pub async fn execute_make_gif(
    config: &CliConfig,
    args: &MakeGifArgs,
    reporter: &mut Reporter,
) -> CliResult<AssembledGif> {
    let timing = parse_rate(
        args.fps.as_deref(),
        args.duration.as_deref(),
        config.timelapse.default_fps,
    )?;
    let assembler = GifAssembler::new(&config.timelapse);
    let session = args.name.clone();
    let output_dir = args.output_dir.clone();

    reporter.start_spinner(&format!("Encoding {session}.gif"));
    let result = run_blocking("assemble_gif", move || {
        assembler.assemble(&session, &output_dir, timing)
    })
    .await;
    reporter.finish_spinner();

    let gif = result?;
    reporter.success(&format!(
        "GIF written: {} ({} frames)",
        gif.path.display(),
        gif.frame_count
    ));
    Ok(gif)
}
