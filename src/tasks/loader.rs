use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{AssetKind, Error, Result};
use crate::events::{EffectSources, LoadedAssets, PreparedImageCpu};

// Decodes an image to RGBA8 and applies EXIF orientation if available.
// Orientation handling is best-effort; if metadata is missing, the original
// orientation is preserved.
fn decode_rgba8_apply_exif(path: &Path) -> anyhow::Result<image::RgbaImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()? // sniff based on content/extension
        .decode()?;

    let img = img.to_rgba8();
    let orientation = read_orientation(path).unwrap_or(1);
    Ok(apply_orientation(img, orientation))
}

fn apply_orientation(img: image::RgbaImage, orientation: u16) -> image::RgbaImage {
    use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
    match orientation {
        2 => flip_horizontal(&img),
        3 => rotate180(&img),
        4 => flip_vertical(&img),
        // transpose: rotate90 + flip_horizontal
        5 => flip_horizontal(&rotate90(&img)),
        6 => rotate90(&img),
        // transverse: rotate270 + flip_horizontal
        7 => flip_horizontal(&rotate270(&img)),
        8 => rotate270(&img),
        _ => img,
    }
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = u16::try_from(field.value.get_uint(0)?).ok()?;
    debug!("exif orientation {} for {}", o, path.display());
    Some(o)
}

async fn decode(kind: AssetKind, path: PathBuf) -> Result<PreparedImageCpu> {
    let task_path = path.clone();
    let decoded = tokio::task::spawn_blocking(move || decode_rgba8_apply_exif(&task_path))
        .await
        .map_err(|err| Error::AssetLoad {
            kind,
            path: path.clone(),
            reason: format!("decode task failed: {err}"),
        })?;
    let rgba8 = decoded.map_err(|err| Error::AssetLoad {
        kind,
        path: path.clone(),
        reason: format!("{err:#}"),
    })?;

    let (width, height) = rgba8.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::AssetLoad {
            kind,
            path,
            reason: "image has no pixels".into(),
        });
    }
    debug!(%kind, width, height, "loaded (rgba8): {}", path.display());
    Ok(PreparedImageCpu {
        path,
        width,
        height,
        pixels: rgba8.into_raw(),
    })
}

/// Decode the base image and depth map concurrently.
///
/// Fails as a unit: the first decode error aborts the load and no partial
/// result is ever returned. No retries.
pub async fn load(sources: &EffectSources) -> Result<LoadedAssets> {
    let (image, depth_map) = tokio::try_join!(
        decode(AssetKind::Image, sources.image.clone()),
        decode(AssetKind::DepthMap, sources.depth_map.clone()),
    )?;
    Ok(LoadedAssets { image, depth_map })
}

/// [`load`], abandoned with [`Error::Cancelled`] once `cancel` fires.
pub async fn load_cancellable(
    sources: &EffectSources,
    cancel: CancellationToken,
) -> Result<LoadedAssets> {
    select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        loaded = load(sources) => loaded,
    }
}
