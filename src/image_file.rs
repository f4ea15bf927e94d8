//! PNG input and output.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use epd_image::RgbaImage;

use crate::error::ImageFileError;

/// Decode a PNG from any reader into RGBA8.
///
/// Palette, grayscale and 16-bit images are expanded; alpha defaults to opaque.
pub fn decode_png<R: Read>(reader: R) -> Result<RgbaImage, ImageFileError> {
    let mut decoder = png::Decoder::new(reader);
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    let bytes = &buf[..info.buffer_size()];

    let rgba: Vec<u8> = match info.color_type {
        png::ColorType::Rgba => bytes.to_vec(),
        png::ColorType::Rgb => bytes
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        png::ColorType::GrayscaleAlpha => bytes
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        png::ColorType::Grayscale => bytes.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        other => {
            return Err(ImageFileError::Unsupported(format!(
                "{other:?} after expansion"
            )))
        }
    };

    Ok(RgbaImage::new(
        info.width as usize,
        info.height as usize,
        rgba,
    )?)
}

/// Encode an image as an RGBA8 PNG.
pub fn encode_png<W: Write>(writer: W, image: &RgbaImage) -> Result<(), ImageFileError> {
    let mut encoder = png::Encoder::new(writer, image.width() as u32, image.height() as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Fast);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_bytes())?;
    writer.finish()?;
    Ok(())
}

pub fn read_png(path: &Path) -> Result<RgbaImage, ImageFileError> {
    let image = decode_png(BufReader::new(File::open(path)?))?;
    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "Read PNG"
    );
    Ok(image)
}

pub fn write_png(path: &Path, image: &RgbaImage) -> Result<(), ImageFileError> {
    let mut file = BufWriter::new(File::create(path)?);
    encode_png(&mut file, image)?;
    file.flush()?;
    Ok(())
}

/// Encode to an in-memory PNG.
pub fn to_png_bytes(image: &RgbaImage) -> Result<Vec<u8>, ImageFileError> {
    let mut buf = Cursor::new(Vec::new());
    encode_png(&mut buf, image)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_round_trip() {
        let mut image = RgbaImage::filled(5, 3, [255, 255, 255, 255]);
        image.set_pixel(2, 1, [255, 0, 0, 128]);

        let bytes = to_png_bytes(&image).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(decode_png(Cursor::new(bytes)).unwrap(), image);
    }

    #[test]
    fn test_decode_grayscale() {
        let mut buf = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut buf, 2, 1);
            encoder.set_color(png::ColorType::Grayscale);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[0, 200]).unwrap();
        }
        let image = decode_png(Cursor::new(buf)).unwrap();
        assert_eq!(image.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(image.pixel(1, 0), [200, 200, 200, 255]);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_png(Cursor::new(b"not a png".to_vec())),
            Err(ImageFileError::Decode(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let image = RgbaImage::filled(4, 4, [10, 20, 30, 255]);
        write_png(&path, &image).unwrap();
        assert_eq!(read_png(&path).unwrap(), image);
    }
}
