use std::{
    env::{self, VarError},
    process,
    sync::OnceLock,
};

use anyhow::bail;
use image::ImageBuffer;

use super::Image;

/// Webcams deliver Motion JPEG, so decoding speed matters. Both backends are pure Rust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JpegBackend {
    /// Uses the `zune-jpeg` crate, the faster of the two.
    ZuneJpeg,
    /// Uses the `jpeg-decoder` crate (through `image`), robust but slow.
    JpegDecoder,
}

const DEFAULT_BACKEND: JpegBackend = JpegBackend::ZuneJpeg;

const ENV_VAR_JPEG_BACKEND: &str = "HANDCAM_JPEG_BACKEND";

fn backend() -> JpegBackend {
    static BACKEND: OnceLock<JpegBackend> = OnceLock::new();
    *BACKEND.get_or_init(|| {
        let backend = match env::var(ENV_VAR_JPEG_BACKEND).as_deref() {
            Ok("zune-jpeg") | Err(VarError::NotPresent) => DEFAULT_BACKEND,
            Ok("jpeg-decoder") => JpegBackend::JpegDecoder,
            Ok(invalid) => {
                eprintln!(
                    "invalid value set for `{ENV_VAR_JPEG_BACKEND}` variable: '{invalid}'; exiting"
                );
                process::exit(1);
            }
            Err(VarError::NotUnicode(s)) => {
                eprintln!(
                    "invalid value set for `{ENV_VAR_JPEG_BACKEND}` variable: {}; exiting",
                    s.to_string_lossy()
                );
                process::exit(1);
            }
        };
        log::debug!("using JPEG decode backend: {:?}", backend);
        backend
    })
}

pub(super) fn decode_jpeg(data: &[u8]) -> anyhow::Result<Image> {
    let buf = match backend() {
        JpegBackend::JpegDecoder => {
            image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?.to_rgba8()
        }
        JpegBackend::ZuneJpeg => {
            use zune_jpeg::zune_core::colorspace::ColorSpace;
            use zune_jpeg::zune_core::options::DecoderOptions;

            let mut decomp = zune_jpeg::JpegDecoder::new_with_options(
                DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGBA),
                data,
            );
            decomp.decode_headers()?;
            match decomp.get_output_colorspace() {
                Some(ColorSpace::RGBA) => {}
                other => bail!("unsupported colorspace {other:?} (expected RGBA)"),
            }

            let Some(size) = decomp.output_buffer_size() else {
                bail!("JPEG headers do not specify an image size");
            };
            let mut buf = vec![0; size];
            decomp.decode_into(&mut buf)?;
            let Some((width, height)) = decomp.dimensions() else {
                bail!("JPEG headers do not specify an image size");
            };
            match ImageBuffer::from_raw(width.into(), height.into(), buf) {
                Some(buf) => buf,
                None => bail!("decoded JPEG data does not match its {width}x{height} size"),
            }
        }
    };

    Ok(Image { buf })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage() {
        assert!(decode_jpeg(&[0xff, 0xd8, 0x00, 0x01, 0x02]).is_err());
        assert!(decode_jpeg(&[]).is_err());
    }

    #[test]
    fn decodes_encoded_frame() {
        let mut encoded = Vec::new();
        let rgb = image::RgbImage::from_pixel(16, 8, image::Rgb([200, 40, 40]));
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, 95)
            .encode_image(&rgb)
            .unwrap();

        let image = decode_jpeg(&encoded).unwrap();
        assert_eq!(image.width(), 16);
        assert_eq!(image.height(), 8);
        let c = image.get(4, 4);
        assert!(c.r() > 150 && c.g() < 100 && c.b() < 100, "{c:?}");
        assert_eq!(c.a(), 255);
    }
}
