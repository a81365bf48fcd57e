use std::path::Path;

use anyhow::Result;

use gallery_core::AppConfig;
use gallery_imaging::ImageTranscoder;

pub fn run(config: &AppConfig, input: &Path, output: &Path) -> Result<()> {
    let transcoder = ImageTranscoder::from_config(&config.upload);
    transcoder.transcode_to_file(input, output)?;
    println!(
        "Wrote {}x{} icon to {}",
        transcoder.width,
        transcoder.height,
        output.display()
    );
    Ok(())
}
