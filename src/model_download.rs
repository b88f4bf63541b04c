use std::{
    fs,
    io::{self, Read},
    path::Path,
    time::Duration,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

use crate::pipeline::ModelComplexity;

/// Download location of the landmark model for `complexity`.
pub fn model_url(complexity: ModelComplexity) -> &'static str {
    match complexity {
        ModelComplexity::Full => {
            "https://raw.githubusercontent.com/214zzl995/gesture-universe/refs/heads/main/models/handpose_estimation_mediapipe_2023feb.onnx"
        }
        ModelComplexity::Lite => {
            "https://media.githubusercontent.com/media/opencv/opencv_zoo/main/models/handpose_estimation_mediapipe/handpose_estimation_mediapipe_2023feb_int8.onnx"
        }
    }
}

#[derive(Clone, Debug)]
pub enum ModelDownloadEvent {
    AlreadyPresent,
    Started { total: Option<u64> },
    Progress { downloaded: u64, total: Option<u64> },
    Finished,
}

/// Makes sure the `complexity` landmark model exists at `model_path`,
/// downloading it if needed.
pub fn ensure_handpose_model_ready<F>(
    model_path: &Path,
    complexity: ModelComplexity,
    mut on_event: F,
) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    if model_path.exists() {
        on_event(ModelDownloadEvent::AlreadyPresent);
        on_event(ModelDownloadEvent::Finished);
        return Ok(());
    }

    if let Some(parent) = model_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create model directory {}", parent.display()))?;
    }

    let mut bar = DownloadBar::default();
    fetch(model_url(complexity), model_path, &mut |event| {
        bar.update(&event);
        on_event(event);
    })
}

fn fetch<F>(url: &str, dest: &Path, on_event: &mut F) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    log::info!("downloading handpose model from {url} to {}", dest.display());

    let response = Client::new()
        .get(url)
        .send()
        .context("failed to start model download")?
        .error_for_status()
        .context("model download returned error status")?;
    let total = response.content_length();
    on_event(ModelDownloadEvent::Started { total });

    // Bytes land in `.download` until complete; only the rename exposes the model.
    let partial = dest.with_extension("download");
    let mut file = fs::File::create(&partial)
        .with_context(|| format!("failed to create {}", partial.display()))?;
    let mut reader = ProgressReader {
        inner: response,
        downloaded: 0,
        total,
        on_event: &mut *on_event,
    };
    io::copy(&mut reader, &mut file).context("failed while downloading model")?;
    file.sync_all()
        .context("failed to flush downloaded model to disk")?;
    drop(file);

    fs::rename(&partial, dest)
        .with_context(|| format!("failed to move {} to {}", partial.display(), dest.display()))?;
    on_event(ModelDownloadEvent::Finished);
    Ok(())
}

/// Reports every chunk read from `inner` as a progress event.
struct ProgressReader<'a, R, F> {
    inner: R,
    downloaded: u64,
    total: Option<u64>,
    on_event: &'a mut F,
}

impl<R: Read, F: FnMut(ModelDownloadEvent)> Read for ProgressReader<'_, R, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        if read > 0 {
            self.downloaded += read as u64;
            (self.on_event)(ModelDownloadEvent::Progress {
                downloaded: self.downloaded,
                total: self.total,
            });
        }
        Ok(read)
    }
}

#[derive(Default)]
struct DownloadBar(Option<ProgressBar>);

impl DownloadBar {
    fn update(&mut self, event: &ModelDownloadEvent) {
        match event {
            ModelDownloadEvent::Started { total } => self.0 = Some(new_bar(*total)),
            ModelDownloadEvent::Progress { downloaded, .. } => {
                if let Some(bar) = &self.0 {
                    bar.set_position(*downloaded);
                }
            }
            ModelDownloadEvent::Finished => {
                if let Some(bar) = self.0.take() {
                    bar.finish_with_message("handpose model ready");
                }
            }
            ModelDownloadEvent::AlreadyPresent => {}
        }
    }
}

fn new_bar(total: Option<u64>) -> ProgressBar {
    let (bar, template) = match total {
        Some(total) if total > 0 => (
            ProgressBar::new(total),
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ),
        _ => {
            let bar = ProgressBar::new_spinner();
            bar.enable_steady_tick(Duration::from_millis(100));
            (bar, "{spinner:.green} downloading model {bytes}")
        }
    };
    if let Ok(style) = ProgressStyle::with_template(template) {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar
}
