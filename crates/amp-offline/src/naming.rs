//! Output path naming
//!
//! Renders land under `<effect>/<audio>/<params>/audio.wav`. A chain joins
//! its effect names and parameter tags with `+`.

use std::path::{Path, PathBuf};

use amp_dsp::Effect;

/// File name of a render inside its output directory
pub const OUTPUT_FILE_NAME: &str = "audio.wav";

const PASSTHROUGH: &str = "passthrough";
const DEFAULT_PARAMS: &str = "default-params";

/// Audio name used in output paths: the input's file stem
pub fn audio_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string())
}

/// Relative output directory for a chain of effects
pub fn output_dir<'a>(effects: impl IntoIterator<Item = &'a dyn Effect>, audio_name: &str) -> PathBuf {
    let (names, tags): (Vec<_>, Vec<_>) = effects
        .into_iter()
        .map(|e| {
            let tag = e.params_tag();
            let tag = if tag.is_empty() { DEFAULT_PARAMS.to_string() } else { tag };
            (e.name(), tag)
        })
        .unzip();

    if names.is_empty() {
        return [PASSTHROUGH, audio_name, DEFAULT_PARAMS].iter().collect();
    }

    let mut dir = PathBuf::from(names.join("+"));
    dir.push(audio_name);
    dir.push(tags.join("+"));
    dir
}

/// Full output path of a render under `root`
pub fn output_path<'a>(
    root: &Path,
    effects: impl IntoIterator<Item = &'a dyn Effect>,
    input: &Path,
) -> PathBuf {
    root.join(output_dir(effects, &audio_name(input)))
        .join(OUTPUT_FILE_NAME)
}
