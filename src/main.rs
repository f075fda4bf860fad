use std::process::exit;
use std::time::Instant;

use adaptive_raytracer::raytracer::camera::Camera;
use adaptive_raytracer::raytracer::exporter::{PngExporter, ToneMap};
use adaptive_raytracer::raytracer::framebuffer::RenderState;
use adaptive_raytracer::raytracer::params::AdaptiveParams;
use adaptive_raytracer::raytracer::renderer::{
    EyelightSampler, PathSampler, Sampler, TraceMode,
};
use adaptive_raytracer::raytracer::renderloop::trace_image;
use adaptive_raytracer::raytracer::scene::SphereScene;
use adaptive_raytracer::raytracer::stats::{
    collect_statistics, q_img, sample_density_img, time_density_img,
};
use glam::Vec3;
use indicatif::{ProgressBar, ProgressStyle};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let mut mode = TraceMode::Path;
    let mut params = AdaptiveParams {
        resolution: 640,
        ..AdaptiveParams::default()
    };
    let mut output = String::from("output.png");
    let mut diagnostics = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--mode" => {
                let value = expect_value(&mut iter, "--mode");
                mode = TraceMode::parse(&value).unwrap_or_else(|| {
                    eprintln!("Unknown trace mode: {} (path, eyelight)", value);
                    exit(2);
                });
            }
            "--spp" => params.desired_spp = parse_value(&mut iter, "--spp"),
            "--seconds" => params.desired_seconds = parse_value(&mut iter, "--seconds"),
            "--quality" => params.desired_q = parse_value(&mut iter, "--quality"),
            "--resolution" => params.resolution = parse_value(&mut iter, "--resolution"),
            "--seed" => params.trace.seed = parse_value(&mut iter, "--seed"),
            "--output" => output = expect_value(&mut iter, "--output"),
            "--diagnostics" | "-d" => diagnostics = true,
            _ => {
                eprintln!(
                    "Usage: adaptive-raytracer [--mode path|eyelight] [--spp N] \
                     [--seconds N] [--quality Q] [--resolution N] [--seed N] \
                     [--output FILE] [--diagnostics]"
                );
                exit(2);
            }
        }
    }

    let scene = SphereScene::demo();
    let camera = Camera::new(
        Vec3::new(0.0, 1.8, 6.0),
        Vec3::new(0.0, 0.8, 0.0),
        40.0,
        16.0 / 9.0,
    );

    match mode {
        TraceMode::Path => render(&scene, &PathSampler::<8>::new(), &camera, &params, &output, diagnostics),
        TraceMode::Eyelight => render(&scene, &EyelightSampler, &camera, &params, &output, diagnostics),
    }
}

fn expect_value(iter: &mut impl Iterator<Item = impl AsRef<str>>, flag: &str) -> String {
    match iter.next() {
        Some(value) => value.as_ref().to_string(),
        None => {
            eprintln!("Missing value for {}", flag);
            exit(2);
        }
    }
}

fn parse_value<T: std::str::FromStr>(
    iter: &mut impl Iterator<Item = impl AsRef<str>>,
    flag: &str,
) -> T {
    let value = expect_value(iter, flag);
    value.parse().unwrap_or_else(|_| {
        eprintln!("Invalid value for {}: {}", flag, value);
        exit(2);
    })
}

fn render<R: Sampler + Sync>(
    scene: &SphereScene,
    sampler: &R,
    camera: &Camera,
    params: &AdaptiveParams,
    output: &str,
    diagnostics: bool,
) {
    let mut state = RenderState::new(camera, params).unwrap_or_else(|e| {
        eprintln!("{}", e);
        exit(1);
    });
    println!(
        "Rendering {}x{} ({} spp min, quality target {})",
        state.width(),
        state.height(),
        params.min_samples,
        params.desired_q
    );

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut progress_cb = |_: &RenderState, phase: &str, current: u64, max: u64| {
        progress.set_length(max);
        progress.set_position(current);
        progress.set_message(phase.to_string());
    };
    let mut batch_cb = |state: &RenderState, curr_q: f32, desired_q: f32| {
        progress.println(format!(
            "  quality {:.2}/{:.2} at {} samples",
            curr_q,
            desired_q,
            state.sample_count()
        ));
    };

    let render_start = Instant::now();
    let image = trace_image(
        &mut state,
        scene,
        sampler,
        camera,
        params,
        Some(&mut progress_cb),
        Some(&mut batch_cb),
    );
    progress.finish_and_clear();

    let stats = collect_statistics(&state);
    println!("{}", stats.summary);
    println!(
        "Rendered in {:.2}s: {:.1} avg spp (min {}, max {}), q in [{:.2}, {:.2}]",
        render_start.elapsed().as_secs_f32(),
        stats.avg_spp,
        stats.min_spp,
        stats.max_spp,
        stats.min_q,
        stats.max_q
    );

    PngExporter::with_tonemap(ToneMap::Aces).export(&image, output);
    println!("Saved {}", output);

    if diagnostics {
        sample_density_img(&state, &stats)
            .save("sample_density.png")
            .expect("Failed to write PNG file");
        time_density_img(&state)
            .save("time_density.png")
            .expect("Failed to write PNG file");
        q_img(&state)
            .save("q.png")
            .expect("Failed to write PNG file");
        println!("Saved sample_density.png, time_density.png, q.png");
    }
}
