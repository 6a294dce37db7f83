mod cli;
mod config;
mod effects;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use cli::Cli;
use effects::{EffectRegistry, EffectRuntime, ParamInput, Selection};
use render::effect_renderer::EffectRenderer;
use render::frame::{FrameRenderer, TEXTURE_FORMAT};
use render::gpu::GpuContext;
use render::source::{SourceImage, SourceTexture};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Config values apply only where the CLI was left at its default
    let mut config_params = Vec::new();
    if let Some(path) = cli.config.clone().or_else(config::find_config) {
        if let Some(cfg) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            if cli.input.is_none() {
                cli.input = cfg.input;
            }
            if cli.effect == "none" {
                if let Some(effect) = cfg.effect {
                    cli.effect = effect;
                }
            }
            if cli.output == Path::new("output.png") {
                if let Some(output) = cfg.output.path {
                    cli.output = output;
                }
            }
            cli.width = cli.width.or(cfg.output.width);
            cli.height = cli.height.or(cfg.output.height);
            config_params = cfg.params.into_iter().collect();
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    let registry = EffectRegistry::builtin();

    if cli.list_effects {
        println!("Available effects:");
        for effect in registry.list_effects() {
            println!("  {:<18} {:<18} {} params", effect.id, effect.label, effect.defaults.len());
        }
        return Ok(());
    }

    // CLI overrides follow config ones so they win on conflict
    let mut overrides: Vec<(String, ParamInput)> = config_params;
    for (key, raw) in cli.param_pairs() {
        match ParamInput::parse(&raw) {
            Ok(value) => overrides.push((key, value)),
            Err(err) => log::warn!("Ignoring parameter '{}': {}", key, err),
        }
    }

    let mut runtime = EffectRuntime::new(registry.clone());

    if let Some(ref id) = cli.describe {
        if registry.find_effect(id).is_none() {
            anyhow::bail!("Unknown effect '{}'", id);
        }
        runtime.select_effect(id);
        apply_overrides(&mut runtime, &overrides, false, cli.clamp);
        let parameters: serde_json::Map<String, serde_json::Value> = runtime
            .parameters()
            .iter()
            .map(|(k, v)| Ok((k.to_string(), serde_json::to_value(v)?)))
            .collect::<Result<_, serde_json::Error>>()?;
        let description = serde_json::json!({
            "id": runtime.active().id,
            "label": runtime.active().label,
            "parameters": parameters,
            "controls": runtime.editor_view(),
        });
        println!("{}", serde_json::to_string_pretty(&description)?);
        return Ok(());
    }

    let input = cli.input.as_deref().context("Input image is required")?;

    log::info!("shaderlab - GPU image effects");
    log::info!("Input: {}", input);

    let image = SourceImage::load(input)?;
    let gpu = GpuContext::new()?;
    gpu.check_texture_size("Source image", image.width, image.height)?;

    let width = cli.width.unwrap_or(image.width);
    let height = cli.height.unwrap_or(image.height);
    gpu.check_texture_size("Viewport", width, height)?;

    let source = SourceTexture::upload(&gpu, &image);
    drop(image);
    log::info!(
        "Viewport: {}x{} (source {}x{})",
        width,
        height,
        source.width,
        source.height
    );

    let frame_renderer = FrameRenderer::new(&gpu, width, height);
    let mut effect_renderer = EffectRenderer::new(&gpu, TEXTURE_FORMAT);

    let render_all = cli.effect == "all";
    let effect_ids: Vec<&str> = if render_all {
        registry.list_effects().iter().map(|e| e.id).collect()
    } else {
        vec![cli.effect.as_str()]
    };

    let pb = if render_all {
        let pb = ProgressBar::new(effect_ids.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} effects {msg}")?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    for id in &effect_ids {
        runtime.select_effect(id);
        match runtime.selection() {
            Selection::Effect(selected) => log::debug!("Rendering '{}'", selected),
            Selection::Unselected => {
                log::warn!("'{}' is not a registered effect, rendering the image unmodified", id)
            }
        }
        apply_overrides(&mut runtime, &overrides, render_all, cli.clamp);

        let output = if render_all {
            output_for_effect(&cli.output, id)
        } else {
            cli.output.clone()
        };

        if let Some(ref pb) = pb {
            pb.set_message(id.to_string());
        }

        if !effect_renderer.draw(
            &gpu,
            &runtime,
            Some(&source),
            &frame_renderer.render_texture_view,
            (width, height),
        ) {
            log::warn!("Effect '{}' produced no frame", id);
            continue;
        }

        let pixels = frame_renderer.readback(&gpu)?;
        save_png(&output, &pixels, width, height)?;
        log::info!("Wrote {} ({})", output.display(), runtime.active().label);

        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }
    log::info!("Compiled {} effect program(s)", effect_renderer.rebuilds());
    Ok(())
}

/// Forward parameter edits to the runtime. In batch mode only keys the
/// active effect declares are applied.
fn apply_overrides(
    runtime: &mut EffectRuntime,
    overrides: &[(String, ParamInput)],
    declared_only: bool,
    clamp: bool,
) {
    for (key, input) in overrides {
        if declared_only && runtime.active().defaults.get(key).is_none() {
            continue;
        }
        let result = runtime.coerce_input(key, input.clone()).and_then(|value| {
            let value = if clamp { runtime.clamp_to_editor(key, value) } else { value };
            runtime.set_parameter(key, value)
        });
        if let Err(err) = result {
            log::warn!("Skipping override for '{}': {}", runtime.active().id, err);
        }
    }
}

/// `out.png` + `sepia` -> `out_sepia.png`
fn output_for_effect(base: &Path, id: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let ext = base.extension().and_then(|e| e.to_str()).unwrap_or("png");
    base.with_file_name(format!("{}_{}.{}", stem, id, ext))
}

fn save_png(path: &Path, pixels: &[u8], width: u32, height: u32) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    image::save_buffer(path, pixels, width, height, image::ColorType::Rgba8)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_output_names() {
        assert_eq!(
            output_for_effect(Path::new("out/lenna.png"), "sepia"),
            PathBuf::from("out/lenna_sepia.png")
        );
        assert_eq!(
            output_for_effect(Path::new("result"), "invert"),
            PathBuf::from("result_invert.png")
        );
    }
}
