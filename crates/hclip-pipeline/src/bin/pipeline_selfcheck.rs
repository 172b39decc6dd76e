use std::path::Path;
use std::process::Command;

use hclip_pipeline::{PipelineConfig, ScratchSpace};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PipelineConfig::from_env();

    println!(
        "pipeline-selfcheck: starting with scratch_dir={}",
        config.scratch_dir.display()
    );
    ensure_scratch(&config.scratch_dir).await?;
    for tool in ["ffmpeg", "ffprobe"] {
        ensure_tool(tool, "-version")?;
    }
    ensure_tool("yt-dlp", "--version")?;

    if config.gemini_api_key.is_none() {
        println!("pipeline-selfcheck: warning: no GEMINI_API_KEY, fallback moments only");
    }

    println!("pipeline-selfcheck: ok");
    Ok(())
}

async fn ensure_scratch(path: &Path) -> anyhow::Result<()> {
    ScratchSpace::new(path)
        .check_writable()
        .await
        .map_err(|e| anyhow::anyhow!("scratch dir {} not writable: {}", path.display(), e))
}

fn ensure_tool(tool: &str, version_flag: &str) -> anyhow::Result<()> {
    let output = Command::new(tool)
        .arg(version_flag)
        .output()
        .map_err(|e| anyhow::anyhow!("{} not available: {}", tool, e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "{} {} failed: {:?}",
            tool,
            version_flag,
            output.status
        ));
    }
    Ok(())
}
