//! Request-driven background image loader.
//! Receives decode jobs (path + viewport), decodes, orients, flattens and
//! fits them off-thread, and hands RGBA8 frames back without blocking the
//! event loop.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::Context;
use crossbeam_channel::Receiver;
use fast_image_resize as fir;
use image::error::{ParameterError, ParameterErrorKind};
use image::{ImageError, RgbaImage};
use tracing::{debug, trace, warn};

use crate::error::Error;

/// How decoded images are fitted into the viewport.
#[derive(Debug, Clone, Copy)]
pub struct FitPolicy {
    /// Enlarge images smaller than the viewport.
    pub upscale: bool,
    /// Colour transparent pixels are composited onto.
    pub background: [u8; 3],
}

impl Default for FitPolicy {
    fn default() -> Self {
        Self {
            upscale: false,
            background: [0, 0, 0],
        }
    }
}

/// An image fitted on the CPU and ready for GPU upload.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub path: PathBuf,
    /// Viewport the image was fitted for.
    pub viewport: (u32, u32),
    pub width: u32,
    pub height: u32,
    /// Opaque RGBA8 pixels, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// The slide must go on screen as soon as it is ready.
    Show,
    /// Decode ahead of time into the prefetch slot.
    Prefetch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    pub ticket: u64,
    pub path: PathBuf,
    pub viewport: (u32, u32),
    pub purpose: Purpose,
}

/// Message sent to the background loader thread.
#[derive(Debug)]
pub enum LoaderMsg {
    Decode(DecodeRequest),
    /// Stop the loader.
    Quit,
}

/// Outcome of a decode job, delivered back to the event loop.
#[derive(Debug)]
pub enum LoaderReply {
    Ready {
        ticket: u64,
        purpose: Purpose,
        image: PreparedImage,
    },
    Failed {
        ticket: u64,
        purpose: Purpose,
        error: Error,
    },
}

impl LoaderReply {
    #[must_use]
    pub const fn ticket(&self) -> u64 {
        match self {
            Self::Ready { ticket, .. } | Self::Failed { ticket, .. } => *ticket,
        }
    }
}

/// Scaled size of a `src_w`×`src_h` image fitted inside the viewport with its
/// aspect ratio preserved. The scale is capped at 1.0 unless `upscale`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn fit_size(src_w: u32, src_h: u32, view_w: u32, view_h: u32, upscale: bool) -> (u32, u32) {
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let vw = view_w.max(1) as f32;
    let vh = view_h.max(1) as f32;
    let mut scale = (vw / iw).min(vh / ih);
    if !upscale {
        scale = scale.min(1.0);
    }
    let w = (iw * scale).round().clamp(1.0, vw);
    let h = (ih * scale).round().clamp(1.0, vh);
    (w as u32, h as u32)
}

/// Top-left offset that centres `inner` inside `outer`.
#[must_use]
pub const fn center_offset(inner_w: u32, inner_h: u32, outer_w: u32, outer_h: u32) -> (u32, u32) {
    (
        outer_w.saturating_sub(inner_w) / 2,
        outer_h.saturating_sub(inner_h) / 2,
    )
}

/// Decode `path` and fit it to `viewport`.
///
/// # Errors
/// Returns [`Error::Decode`] when the file is missing, unreadable, corrupt or
/// cannot be scaled.
pub fn decode_fitted(
    path: &Path,
    viewport: (u32, u32),
    policy: FitPolicy,
) -> Result<PreparedImage, Error> {
    let decode_err = |source: ImageError| Error::Decode {
        path: path.to_path_buf(),
        source,
    };

    let mut img = decode_rgba8_apply_exif(path).map_err(decode_err)?;
    flatten_onto(&mut img, policy.background);

    let (w, h) = fit_size(
        img.width(),
        img.height(),
        viewport.0,
        viewport.1,
        policy.upscale,
    );
    let img = resize_rgba(img, w, h).map_err(|err| {
        decode_err(ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::Generic(format!("{err:#}")),
        )))
    })?;

    Ok(PreparedImage {
        path: path.to_path_buf(),
        viewport,
        width: w,
        height: h,
        pixels: img.into_raw(),
    })
}

// Decodes an image to RGBA8 and applies EXIF orientation if available.
fn decode_rgba8_apply_exif(path: &Path) -> Result<RgbaImage, ImageError> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let mut img = img.to_rgba8();

    match read_orientation(path).unwrap_or(1) {
        2 => img = image::imageops::flip_horizontal(&img),
        3 => img = image::imageops::rotate180(&img),
        4 => img = image::imageops::flip_vertical(&img),
        5 => {
            img = image::imageops::rotate90(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        6 => img = image::imageops::rotate90(&img),
        7 => {
            img = image::imageops::rotate270(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        8 => img = image::imageops::rotate270(&img),
        _ => {}
    }

    Ok(img)
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = u16::try_from(field.value.get_uint(0)?).ok()?;
    trace!(orientation = o, path = %path.display(), "exif orientation");
    Some(o)
}

/// Composite every pixel over an opaque background colour.
pub fn flatten_onto(img: &mut RgbaImage, background: [u8; 3]) {
    for px in img.pixels_mut() {
        let a = u16::from(px[3]);
        if a == 255 {
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let blended = (u16::from(px[c]) * a + u16::from(background[c]) * inv + 127) / 255;
            px[c] = u8::try_from(blended).unwrap_or(u8::MAX);
        }
        px[3] = 255;
    }
}

fn resize_rgba(source: RgbaImage, target_w: u32, target_h: u32) -> anyhow::Result<RgbaImage> {
    if target_w == 0 || target_h == 0 {
        anyhow::bail!("resize dimensions must be positive");
    }
    if source.width() == target_w && source.height() == target_h {
        return Ok(source);
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .context("failed to create source view for resize")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options =
        fir::ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("resize failed")?;
    let buffer = dst_image.into_vec();
    RgbaImage::from_raw(target_w, target_h, buffer)
        .ok_or_else(|| anyhow::anyhow!("failed to construct resized RGBA image"))
}

/// Drop work that newer requests made pointless: only the newest show request
/// survives, together with the newest prefetch issued after it.
#[must_use]
pub fn coalesce(batch: Vec<DecodeRequest>) -> Vec<DecodeRequest> {
    let last_show = batch.iter().rposition(|r| r.purpose == Purpose::Show);
    let last_prefetch = batch.iter().rposition(|r| r.purpose == Purpose::Prefetch);
    let mut out = Vec::with_capacity(2);
    let mut batch: Vec<Option<DecodeRequest>> = batch.into_iter().map(Some).collect();
    if let Some(i) = last_show {
        out.extend(batch[i].take());
    }
    if let Some(i) = last_prefetch
        && last_show.is_none_or(|s| i > s)
    {
        out.extend(batch[i].take());
    }
    out
}

/// Spawn the request-driven loader. Every reply goes through `deliver`, which
/// must hand it to the event loop.
///
/// # Errors
/// Returns an error if the worker thread cannot be spawned.
pub fn spawn_loader<F>(
    rx: Receiver<LoaderMsg>,
    policy: FitPolicy,
    deliver: F,
) -> std::io::Result<thread::JoinHandle<()>>
where
    F: Fn(LoaderReply) + Send + 'static,
{
    thread::Builder::new()
        .name("slide-loader".into())
        .spawn(move || {
            while let Ok(first) = rx.recv() {
                let mut batch = Vec::new();
                let mut quit = false;
                for msg in std::iter::once(first).chain(rx.try_iter()) {
                    match msg {
                        LoaderMsg::Decode(req) => batch.push(req),
                        LoaderMsg::Quit => quit = true,
                    }
                }
                if quit {
                    break;
                }
                let received = batch.len();
                let jobs = coalesce(batch);
                if jobs.len() < received {
                    debug!(received, kept = jobs.len(), "coalesced decode requests");
                }
                for DecodeRequest {
                    ticket,
                    path,
                    viewport,
                    purpose,
                } in jobs
                {
                    let reply = match decode_fitted(&path, viewport, policy) {
                        Ok(image) => {
                            debug!(ticket, ?purpose, path = %path.display(), w = image.width, h = image.height, "decoded");
                            LoaderReply::Ready {
                                ticket,
                                purpose,
                                image,
                            }
                        }
                        Err(error) => {
                            warn!(ticket, ?purpose, %error, "decode failed");
                            LoaderReply::Failed {
                                ticket,
                                purpose,
                                error,
                            }
                        }
                    };
                    deliver(reply);
                }
            }
            debug!("loader thread exiting");
        })
}
