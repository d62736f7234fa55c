//! # Built-in Backends
//!
//! Factory per i backend predefiniti. Ogni factory valida le opzioni, costruisce
//! gli argomenti del tool e restituisce un `ToolTransform`.
//!
//! | Plugin   | Tool     | Formati          | I/O   |
//! |----------|----------|------------------|-------|
//! | gifsicle | gifsicle | GIF              | pipe  |
//! | jpegtran | jpegtran | JPEG             | pipe  |
//! | optipng  | optipng  | PNG              | files |
//! | svgo     | svgo     | SVG              | pipe  |
//! | pngquant | pngquant | PNG              | pipe  |
//! | mozjpeg  | cjpeg    | JPEG             | pipe  |
//! | webp     | cwebp    | PNG, JPEG, WebP  | files |
//! | oxipng   | oxipng   | PNG              | files |

use super::registry::PluginRegistry;
use super::spec::{OptionReader, TransformSpec};
use super::tool::{ToolIo, ToolTransform, INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER};
use super::Transform;
use crate::error::{ImageminError, Result};
use crate::format::ImageKind;
use crate::platform::{install_hint, ToolLocator};
use serde_json::Value;
use std::sync::Arc;

type ArgsBuilder = fn(&OptionReader) -> Result<Vec<String>>;

/// Static description of one built-in backend
struct Backend {
    name: &'static str,
    tool: &'static str,
    accepts: &'static [ImageKind],
    io: ToolIo,
    converts: bool,
    args: ArgsBuilder,
}

const BACKENDS: &[Backend] = &[
    Backend {
        name: "gifsicle",
        tool: "gifsicle",
        accepts: &[ImageKind::Gif],
        io: ToolIo::Pipe,
        converts: false,
        args: gifsicle_args,
    },
    Backend {
        name: "jpegtran",
        tool: "jpegtran",
        accepts: &[ImageKind::Jpeg],
        io: ToolIo::Pipe,
        converts: false,
        args: jpegtran_args,
    },
    Backend {
        name: "optipng",
        tool: "optipng",
        accepts: &[ImageKind::Png],
        io: ToolIo::Files { output_ext: None },
        converts: false,
        args: optipng_args,
    },
    Backend {
        name: "svgo",
        tool: "svgo",
        accepts: &[ImageKind::Svg],
        io: ToolIo::Pipe,
        converts: false,
        args: svgo_args,
    },
    Backend {
        name: "pngquant",
        tool: "pngquant",
        accepts: &[ImageKind::Png],
        io: ToolIo::Pipe,
        converts: false,
        args: pngquant_args,
    },
    Backend {
        name: "mozjpeg",
        tool: "cjpeg",
        accepts: &[ImageKind::Jpeg],
        io: ToolIo::Pipe,
        converts: false,
        args: mozjpeg_args,
    },
    Backend {
        name: "webp",
        tool: "cwebp",
        accepts: &[ImageKind::Png, ImageKind::Jpeg, ImageKind::Webp],
        io: ToolIo::Files { output_ext: Some("webp") },
        converts: true,
        args: webp_args,
    },
    Backend {
        name: "oxipng",
        tool: "oxipng",
        accepts: &[ImageKind::Png],
        io: ToolIo::Files { output_ext: None },
        converts: false,
        args: oxipng_args,
    },
];

/// Register every built-in backend on `registry`
pub fn register_all(registry: &mut PluginRegistry, locator: ToolLocator) {
    let locator = Arc::new(locator);

    for backend in BACKENDS {
        let locator = Arc::clone(&locator);
        registry.register(backend.name, move |spec: &TransformSpec| build(backend, spec, &locator));
    }
}

fn build(backend: &Backend, spec: &TransformSpec, locator: &ToolLocator) -> Result<Arc<dyn Transform>> {
    // Options are checked before the tool so bad flags fail the same way everywhere.
    let args = (backend.args)(&OptionReader::new(spec))?;

    let program = locator.resolve(backend.tool).ok_or_else(|| ImageminError::MissingTool {
        plugin: backend.name.to_string(),
        tool: backend.tool.to_string(),
        install: install_hint(backend.tool),
    })?;

    let transform = ToolTransform::new(backend.name, program, args, backend.accepts.to_vec(), backend.io.clone());
    Ok(Arc::new(if backend.converts {
        transform.converting()
    } else {
        transform
    }))
}

fn gifsicle_args(opts: &OptionReader) -> Result<Vec<String>> {
    let mut args = vec!["--no-warnings".to_string(), "--no-app-extensions".to_string()];

    if opts.bool("interlaced")?.unwrap_or(false) {
        args.push("--interlace".to_string());
    }
    let level = opts.integer("optimizationLevel", 1, 3)?.unwrap_or(1);
    args.push(format!("--optimize={}", level));
    if let Some(colors) = opts.integer("colors", 2, 256)? {
        args.push(format!("--colors={}", colors));
    }
    Ok(args)
}

fn jpegtran_args(opts: &OptionReader) -> Result<Vec<String>> {
    let mut args = vec!["-copy".to_string(), "none".to_string()];

    if opts.bool("progressive")?.unwrap_or(false) {
        args.push("-progressive".to_string());
    }
    if opts.bool("arithmetic")?.unwrap_or(false) {
        args.push("-arithmetic".to_string());
    } else {
        args.push("-optimize".to_string());
    }
    Ok(args)
}

fn optipng_args(opts: &OptionReader) -> Result<Vec<String>> {
    let level = opts.integer("optimizationLevel", 0, 7)?.unwrap_or(3);
    let mut args = vec![
        "-strip".to_string(),
        "all".to_string(),
        "-clobber".to_string(),
        "-quiet".to_string(),
        "-o".to_string(),
        level.to_string(),
    ];

    if !opts.bool("bitDepthReduction")?.unwrap_or(true) {
        args.push("-nb".to_string());
    }
    if !opts.bool("colorTypeReduction")?.unwrap_or(true) {
        args.push("-nc".to_string());
    }
    if !opts.bool("paletteReduction")?.unwrap_or(true) {
        args.push("-np".to_string());
    }
    if let Some(interlaced) = opts.bool("interlaced")? {
        args.push("-i".to_string());
        args.push(if interlaced { "1" } else { "0" }.to_string());
    }

    args.extend([
        "-out".to_string(),
        OUTPUT_PLACEHOLDER.to_string(),
        INPUT_PLACEHOLDER.to_string(),
    ]);
    Ok(args)
}

fn svgo_args(opts: &OptionReader) -> Result<Vec<String>> {
    let mut args = vec![
        "--input".to_string(),
        "-".to_string(),
        "--output".to_string(),
        "-".to_string(),
    ];

    if opts.bool("multipass")?.unwrap_or(false) {
        args.push("--multipass".to_string());
    }
    if let Some(precision) = opts.integer("precision", 0, 20)? {
        args.push("--precision".to_string());
        args.push(precision.to_string());
    }
    Ok(args)
}

fn pngquant_args(opts: &OptionReader) -> Result<Vec<String>> {
    let mut args = Vec::new();

    if let Some(quality) = opts.raw("quality") {
        args.push(format!("--quality={}", pngquant_quality(opts, quality)?));
    }
    if let Some(speed) = opts.integer("speed", 1, 11)? {
        args.push("--speed".to_string());
        args.push(speed.to_string());
    }
    if opts.bool("strip")?.unwrap_or(false) {
        args.push("--strip".to_string());
    }
    if !opts.bool("dithering")?.unwrap_or(true) {
        args.push("--nofs".to_string());
    }

    args.push("-".to_string());
    Ok(args)
}

// `[0.6, 0.8]` becomes `60-80`; a preformatted `"60-80"` passes through.
fn pngquant_quality(opts: &OptionReader, quality: &Value) -> Result<String> {
    match quality {
        Value::String(range) => {
            let valid = range
                .split_once('-')
                .map(|(min, max)| min.parse::<u8>().is_ok() && max.parse::<u8>().is_ok())
                .unwrap_or(false);
            if valid {
                Ok(range.clone())
            } else {
                Err(ImageminError::invalid_options(
                    opts.plugin(),
                    format!("`quality` must look like `60-80`, got `{}`", range),
                ))
            }
        }
        Value::Array(bounds) if bounds.len() == 2 => {
            let min = opts.float(&bounds[0], "quality")?;
            let max = opts.float(&bounds[1], "quality")?;
            if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min > max {
                return Err(ImageminError::invalid_options(
                    opts.plugin(),
                    "`quality` must be [min, max] with 0 <= min <= max <= 1",
                ));
            }
            Ok(format!("{}-{}", (min * 100.0).round() as u8, (max * 100.0).round() as u8))
        }
        other => Err(ImageminError::invalid_options(
            opts.plugin(),
            format!("`quality` must be [min, max], got {}", other),
        )),
    }
}

fn mozjpeg_args(opts: &OptionReader) -> Result<Vec<String>> {
    let quality = opts.integer("quality", 0, 100)?.unwrap_or(75);
    let mut args = vec!["-quality".to_string(), quality.to_string(), "-optimize".to_string()];

    if !opts.bool("progressive")?.unwrap_or(true) {
        args.push("-baseline".to_string());
    }
    Ok(args)
}

fn webp_args(opts: &OptionReader) -> Result<Vec<String>> {
    const PRESETS: &[&str] = &["default", "photo", "picture", "drawing", "icon", "text"];

    let mut args = Vec::new();

    // cwebp requires -preset to come first
    if let Some(preset) = opts.choice("preset", PRESETS)? {
        args.push("-preset".to_string());
        args.push(preset.to_string());
    }

    args.push("-quiet".to_string());
    let quality = opts.integer("quality", 0, 100)?.unwrap_or(75);
    args.push("-q".to_string());
    args.push(quality.to_string());

    if let Some(method) = opts.integer("method", 0, 6)? {
        args.push("-m".to_string());
        args.push(method.to_string());
    }
    if opts.bool("lossless")?.unwrap_or(false) {
        args.push("-lossless".to_string());
    }

    args.extend([
        INPUT_PLACEHOLDER.to_string(),
        "-o".to_string(),
        OUTPUT_PLACEHOLDER.to_string(),
    ]);
    Ok(args)
}

fn oxipng_args(opts: &OptionReader) -> Result<Vec<String>> {
    let level = opts.integer("optimizationLevel", 0, 6)?.unwrap_or(2);
    let mut args = vec!["-o".to_string(), level.to_string(), "--quiet".to_string()];

    if opts.bool("strip")?.unwrap_or(true) {
        args.push("--strip".to_string());
        args.push("safe".to_string());
    }

    args.extend([
        "--out".to_string(),
        OUTPUT_PLACEHOLDER.to_string(),
        INPUT_PLACEHOLDER.to_string(),
    ]);
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn args_for(builder: ArgsBuilder, spec: TransformSpec) -> Result<Vec<String>> {
        builder(&OptionReader::new(&spec))
    }

    #[test]
    fn test_webp_args_put_preset_first() {
        let spec = TransformSpec::new("webp")
            .with_option("quality", json!(95))
            .with_option("preset", json!("icon"));
        let args = args_for(webp_args, spec).unwrap();

        assert_eq!(&args[..2], &["-preset", "icon"]);
        let q = args.iter().position(|a| a == "-q").unwrap();
        assert_eq!(args[q + 1], "95");
        assert!(args.ends_with(&[
            INPUT_PLACEHOLDER.to_string(),
            "-o".to_string(),
            OUTPUT_PLACEHOLDER.to_string()
        ]));
    }

    #[test]
    fn test_webp_rejects_unknown_preset() {
        let spec = TransformSpec::new("webp").with_option("preset", json!("poster"));
        assert!(matches!(
            args_for(webp_args, spec),
            Err(ImageminError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn test_pngquant_quality_forms() {
        let spec = TransformSpec::new("pngquant").with_option("quality", json!([0.6, 0.8]));
        let args = args_for(pngquant_args, spec).unwrap();
        assert!(args.contains(&"--quality=60-80".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("-"));

        let spec = TransformSpec::new("pngquant").with_option("quality", json!("50-70"));
        assert!(args_for(pngquant_args, spec).unwrap().contains(&"--quality=50-70".to_string()));

        let spec = TransformSpec::new("pngquant").with_option("quality", json!([0.9, 0.1]));
        assert!(args_for(pngquant_args, spec).is_err());
    }

    #[test]
    fn test_gifsicle_defaults_and_options() {
        let args = args_for(gifsicle_args, TransformSpec::new("gifsicle")).unwrap();
        assert!(args.contains(&"--optimize=1".to_string()));
        assert!(!args.contains(&"--interlace".to_string()));

        let spec = TransformSpec::new("gifsicle")
            .with_option("interlaced", json!(true))
            .with_option("optimizationLevel", json!(3));
        let args = args_for(gifsicle_args, spec).unwrap();
        assert!(args.contains(&"--interlace".to_string()));
        assert!(args.contains(&"--optimize=3".to_string()));

        let spec = TransformSpec::new("gifsicle").with_option("optimizationLevel", json!(9));
        assert!(args_for(gifsicle_args, spec).is_err());
    }

    #[test]
    fn test_optipng_reductions() {
        let spec = TransformSpec::new("optipng")
            .with_option("bitDepthReduction", json!(false))
            .with_option("optimizationLevel", json!(5));
        let args = args_for(optipng_args, spec).unwrap();
        assert!(args.contains(&"-nb".to_string()));
        assert!(!args.contains(&"-nc".to_string()));
        let o = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[o + 1], "5");
    }

    #[test]
    fn test_jpegtran_arithmetic_replaces_optimize() {
        let args = args_for(jpegtran_args, TransformSpec::new("jpegtran")).unwrap();
        assert!(args.contains(&"-optimize".to_string()));

        let spec = TransformSpec::new("jpegtran").with_option("arithmetic", json!(true));
        let args = args_for(jpegtran_args, spec).unwrap();
        assert!(args.contains(&"-arithmetic".to_string()));
        assert!(!args.contains(&"-optimize".to_string()));
    }

    #[test]
    fn test_missing_tool_is_reported_with_hint() {
        let dir = TempDir::new().unwrap();
        let locator = ToolLocator::with_search_path(vec![dir.path().to_path_buf()]);
        let backend = BACKENDS.iter().find(|b| b.name == "svgo").unwrap();

        match build(backend, &TransformSpec::new("svgo"), &locator) {
            Err(ImageminError::MissingTool { plugin, tool, install }) => {
                assert_eq!(plugin, "svgo");
                assert_eq!(tool, "svgo");
                assert!(install.contains("svgo"));
            }
            other => panic!("expected MissingTool, got {:?}", other.map(|t| t.name().to_string())),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_build_with_fake_tool() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let tool = dir.path().join("cwebp");
        std::fs::write(&tool, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let locator = ToolLocator::with_search_path(vec![dir.path().to_path_buf()]);
        let backend = BACKENDS.iter().find(|b| b.name == "webp").unwrap();
        let transform = build(backend, &TransformSpec::new("webp"), &locator).unwrap();

        assert_eq!(transform.name(), "webp");
        assert!(transform.converts_format());
        assert!(transform.accepts(ImageKind::Png));
        assert!(!transform.accepts(ImageKind::Gif));
    }

    #[test]
    fn test_backends_cover_defaults() {
        for default in crate::plugin::DEFAULT_PLUGINS {
            assert!(BACKENDS.iter().any(|b| b.name == default), "{} missing", default);
        }
    }
}
