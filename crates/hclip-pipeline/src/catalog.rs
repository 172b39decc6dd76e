//! Catalog builder: rendered clips to the result manifest.

use hclip_models::{RenderedClip, ResultManifest};

/// Combine the source title with rendered clips, preserving clip order.
pub fn build_manifest(original_title: &str, clips: &[RenderedClip]) -> ResultManifest {
    ResultManifest::from_rendered(original_title, clips)
}
