use anyhow::Context;
use log::info;

use crate::{config::{AssetConfig, DomConfig}, loading::LoadingIndicator, resources::gltf::ModelData};

/**
 * This module contains all logic for loading meshes, textures and animations from external files.
 */
pub mod animation;
pub mod gltf;
pub mod mesh;
pub mod texture;

/// Byte counts reported while an asset downloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    /// Unknown when the server sends no length.
    pub total: Option<u64>,
}

impl LoadProgress {
    /// Rounded percentage, or `None` when the total is unknown or zero.
    pub fn percent(&self) -> Option<u32> {
        let total = self.total.filter(|&total| total > 0)?;
        Some((self.loaded as f64 / total as f64 * 100.0).round() as u32)
    }
}

/// Somewhere assets can be fetched from by relative path.
pub trait AssetSource {
    /// Read the whole asset, calling `progress` as bytes arrive.
    fn fetch(
        &self,
        path: &str,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> impl std::future::Future<Output = anyhow::Result<Vec<u8>>>;
}

/// Reads assets from a directory with `tokio::fs`. Needs a tokio runtime.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Clone, Debug)]
pub struct FileSource {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileSource {
    const CHUNK_SIZE: usize = 64 * 1024;

    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured root, or the copy made at build time if the configured
    /// (relative) root does not exist from the current directory.
    pub fn from_config(assets: &AssetConfig) -> Self {
        let configured = std::path::PathBuf::from(&assets.root);
        match option_env!("AVATAR_VIEWER_ASSET_DIR") {
            Some(built) if !configured.exists() => Self::new(built),
            _ => Self::new(configured),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetSource for FileSource {
    async fn fetch(&self, path: &str, progress: &mut dyn FnMut(LoadProgress)) -> anyhow::Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let path = self.root.join(path);
        let mut file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("Could not open {}", path.display()))?;
        let total = file.metadata().await.ok().map(|metadata| metadata.len());
        let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut chunk = vec![0u8; Self::CHUNK_SIZE];
        progress(LoadProgress { loaded: 0, total });
        loop {
            let read = file
                .read(&mut chunk)
                .await
                .with_context(|| format!("Could not read {}", path.display()))?;
            if read == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..read]);
            progress(LoadProgress {
                loaded: data.len() as u64,
                total,
            });
        }
        Ok(data)
    }
}

/// Streams assets over HTTP relative to the hosting page.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Debug)]
pub struct HttpSource {
    base: reqwest::Url,
}

#[cfg(target_arch = "wasm32")]
impl HttpSource {
    pub fn new(root: &str) -> anyhow::Result<Self> {
        Ok(Self {
            base: format_url(root)?,
        })
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(root: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("No window available")?;
    let href = window
        .location()
        .href()
        .map_err(|err| anyhow::anyhow!("Could not read the page location: {:?}", err))?;
    let page = reqwest::Url::parse(&href)?;
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return Ok(page);
    }
    Ok(page.join(&format!("{}/", root))?)
}

#[cfg(target_arch = "wasm32")]
impl AssetSource for HttpSource {
    async fn fetch(&self, path: &str, progress: &mut dyn FnMut(LoadProgress)) -> anyhow::Result<Vec<u8>> {
        use futures::StreamExt;

        let url = self.base.join(path)?;
        let response = reqwest::get(url.clone())
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("Request for {} failed", url))?;
        let total = response.content_length();
        let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        progress(LoadProgress { loaded: 0, total });
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("Download of {} was interrupted", url))?;
            data.extend_from_slice(&chunk);
            progress(LoadProgress {
                loaded: data.len() as u64,
                total,
            });
        }
        Ok(data)
    }
}

/// Both models, parsed and ready to be placed in the stage.
#[derive(Clone, Debug)]
pub struct LoadedAssets {
    pub avatar: ModelData,
    pub decor: ModelData,
}

/// Fetch and parse the avatar, then the decor.
///
/// Progress of the avatar download goes to the indicator and the log. Once
/// both models are parsed the indicator is hidden. On failure the indicator
/// is left untouched and the error names the asset that failed.
pub async fn load_viewer_assets<S, I>(
    source: &S,
    assets: &AssetConfig,
    indicator: &mut I,
) -> anyhow::Result<LoadedAssets>
where
    S: AssetSource,
    I: LoadingIndicator + ?Sized,
{
    let avatar_bytes = source
        .fetch(&assets.avatar, &mut |progress: LoadProgress| {
            if let Some(percent) = progress.percent() {
                indicator.set_text(&DomConfig::loading_text(percent));
                info!("Loading model... {}%", percent);
            }
        })
        .await
        .with_context(|| format!("Error loading avatar model {}", assets.avatar))?;
    let avatar = gltf::parse_model(source, &assets.avatar, &avatar_bytes)
        .await
        .with_context(|| format!("Error loading avatar model {}", assets.avatar))?;

    let decor_bytes = source
        .fetch(&assets.decor, &mut |_: LoadProgress| {})
        .await
        .with_context(|| format!("Error loading decor model {}", assets.decor))?;
    let decor = gltf::parse_model(source, &assets.decor, &decor_bytes)
        .await
        .with_context(|| format!("Error loading decor model {}", assets.decor))?;

    indicator.hide();
    Ok(LoadedAssets { avatar, decor })
}
