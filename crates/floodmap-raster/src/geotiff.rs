//! GeoTIFF reading and writing for single-band rasters.
//!
//! Georeferencing is read from ModelTiepoint + ModelPixelScale (or
//! ModelTransformation), the CRS from the GeoKeyDirectory and the no-data
//! value from the GDAL_NODATA ASCII tag. Output files are written with the
//! same set of tags so they open in GDAL/QGIS with the right placement.

use crate::category::{FloodCategory, CATEGORY_NODATA};
use crate::crs::Crs;
use crate::raster::{CategoryRaster, DepthRaster, Raster};
use crate::transform::GeoTransform;
use crate::{RasterError, Result};
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::{debug, warn};

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// Read a single-band GeoTIFF as floating point depths.
pub fn read_depth_raster<P: AsRef<Path>>(path: P) -> Result<DepthRaster> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let raster = decode_band(file)?;
    debug!(
        path = %path.display(),
        width = raster.width(),
        height = raster.height(),
        crs = %raster.crs(),
        "loaded depth raster"
    );
    Ok(raster)
}

/// Read a single-band GeoTIFF of flood categories.
///
/// The file's no-data value, and any value outside 0-4, become
/// [`CATEGORY_NODATA`].
pub fn read_category_raster<P: AsRef<Path>>(path: P) -> Result<CategoryRaster> {
    let path = path.as_ref();
    let band = read_depth_raster(path)?;

    let mut out_of_range = 0usize;
    let data: Vec<u8> = band
        .data()
        .iter()
        .map(|&v| {
            if v.is_nan() || band.is_nodata(v) {
                return CATEGORY_NODATA;
            }
            let rounded = v.round();
            if rounded != v || !(0.0..=4.0).contains(&rounded) {
                out_of_range += 1;
                return CATEGORY_NODATA;
            }
            FloodCategory::from_value(rounded as u8)
                .map(FloodCategory::value)
                .unwrap_or(CATEGORY_NODATA)
        })
        .collect();

    if out_of_range > 0 {
        warn!(
            path = %path.display(),
            cells = out_of_range,
            "values outside flood categories 0-4 treated as nodata"
        );
    }

    Raster::new(
        band.width(),
        band.height(),
        data,
        *band.transform(),
        band.crs(),
        Some(CATEGORY_NODATA),
    )
}

/// Write a depth raster as a Float32 GeoTIFF.
pub fn write_depth_raster<P: AsRef<Path>>(path: P, raster: &DepthRaster) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder = TiffEncoder::new(file)?;
    let mut image =
        encoder.new_image::<colortype::Gray32Float>(raster.width() as u32, raster.height() as u32)?;
    write_geo_tags(
        image.encoder(),
        raster.transform(),
        raster.crs(),
        raster.nodata().map(|v| v.to_string()),
    )?;
    image.write_data(raster.data())?;
    Ok(())
}

/// Write a category raster as an 8-bit GeoTIFF.
pub fn write_category_raster<P: AsRef<Path>>(path: P, raster: &CategoryRaster) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder = TiffEncoder::new(file)?;
    let mut image =
        encoder.new_image::<colortype::Gray8>(raster.width() as u32, raster.height() as u32)?;
    write_geo_tags(
        image.encoder(),
        raster.transform(),
        raster.crs(),
        raster.nodata().map(|v| v.to_string()),
    )?;
    image.write_data(raster.data())?;
    Ok(())
}

/// Decode the single band of a GeoTIFF stream.
pub fn decode_band<R: Read + Seek>(reader: R) -> Result<DepthRaster> {
    let mut decoder = Decoder::new(reader)?;

    // Flood maps of a whole county easily exceed the default limits
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.ifd_value_size = 1024 * 1024 * 1024;
    decoder = decoder.with_limits(limits);

    // SamplesPerPixel defaults to 1 when absent
    let bands = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1);
    if bands != 1 {
        return Err(RasterError::MultiBand { bands });
    }

    let (width, height) = decoder.dimensions()?;
    let geo_keys = read_geo_keys(&mut decoder);
    let transform = read_geotransform(&mut decoder, &geo_keys)?;
    let crs = crs_from_geo_keys(&geo_keys);
    let nodata = read_nodata_value(&mut decoder);
    let data = decode_samples(&mut decoder)?;

    Raster::new(width as usize, height as usize, data, transform, crs, nodata)
}

/// Read the georeferencing transform from GeoTIFF tags.
fn read_geotransform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    geo_keys: &[(u16, u16)],
) -> Result<GeoTransform> {
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT));
    let pixel_scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE));

    let mut transform = if let (Ok(tiepoint), Ok(scale)) = (tiepoint, pixel_scale) {
        if tiepoint.len() < 6 || scale.len() < 2 {
            return Err(RasterError::InvalidGeoTiff(
                "truncated ModelTiepoint/ModelPixelScale tags".to_string(),
            ));
        }
        // Tiepoint format: [i, j, k, x, y, z] where (i,j) is pixel coords and (x,y) is world coords
        let (i, j) = (tiepoint[0], tiepoint[1]);
        let (x, y) = (tiepoint[3], tiepoint[4]);
        let (scale_x, scale_y) = (scale[0], scale[1]);
        GeoTransform {
            origin_x: x - i * scale_x,
            origin_y: y + j * scale_y,
            pixel_width: scale_x,
            pixel_height: -scale_y,
        }
    } else if let Ok(matrix) = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TRANSFORMATION)) {
        if matrix.len() < 16 {
            return Err(RasterError::InvalidGeoTiff(
                "truncated ModelTransformation tag".to_string(),
            ));
        }
        if matrix[1] != 0.0 || matrix[4] != 0.0 {
            return Err(RasterError::InvalidGeoTiff(
                "rotated rasters are not supported".to_string(),
            ));
        }
        GeoTransform {
            origin_x: matrix[3],
            origin_y: matrix[7],
            pixel_width: matrix[0],
            pixel_height: matrix[5],
        }
    } else {
        return Err(RasterError::InvalidGeoTiff(
            "missing ModelTiepoint/ModelPixelScale or ModelTransformation tags".to_string(),
        ));
    };

    if transform.pixel_width == 0.0 || transform.pixel_height == 0.0 {
        return Err(RasterError::InvalidGeoTiff("zero pixel size".to_string()));
    }

    // PixelIsPoint rasters tie the pixel centre, not its corner
    if geo_key(geo_keys, KEY_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT) {
        transform.origin_x -= transform.pixel_width / 2.0;
        transform.origin_y -= transform.pixel_height / 2.0;
    }

    Ok(transform)
}

/// Parse the GeoKeyDirectory into `(key, value)` pairs.
///
/// Only keys stored inline (TIFFTagLocation = 0) are returned; the ones
/// this crate reads are all inline SHORT values.
fn read_geo_keys<R: Read + Seek>(decoder: &mut Decoder<R>) -> Vec<(u16, u16)> {
    let Ok(directory) = decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY)) else {
        return Vec::new();
    };
    if directory.len() < 4 {
        return Vec::new();
    }
    let count = directory[3] as usize;
    directory[4..]
        .chunks_exact(4)
        .take(count)
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect()
}

fn geo_key(keys: &[(u16, u16)], key: u16) -> Option<u16> {
    keys.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn crs_from_geo_keys(keys: &[(u16, u16)]) -> Crs {
    let code = match geo_key(keys, KEY_MODEL_TYPE) {
        Some(MODEL_TYPE_GEOGRAPHIC) => geo_key(keys, KEY_GEOGRAPHIC_TYPE),
        _ => geo_key(keys, KEY_PROJECTED_CS_TYPE).or_else(|| geo_key(keys, KEY_GEOGRAPHIC_TYPE)),
    };
    match code {
        Some(USER_DEFINED) | None => Crs::Unknown,
        Some(code) => Crs::from_epsg(code),
    }
}

/// Decode raster samples from the TIFF decoder.
fn decode_samples<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>> {
    let result = decoder.read_image()?;

    match result {
        DecodingResult::F32(data) => Ok(data),
        DecodingResult::F64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
    }
}

/// Try to read the no-data value from the GDAL_NODATA tag.
fn read_nodata_value<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse().ok())
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    directory: &mut DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
    crs: Crs,
    nodata: Option<String>,
) -> Result<()> {
    let scale = [transform.pixel_width, -transform.pixel_height, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    directory.write_tag(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE), &scale[..])?;
    directory.write_tag(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT), &tiepoint[..])?;

    let keys = geo_key_directory(crs);
    directory.write_tag(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY), &keys[..])?;

    if let Some(nodata) = nodata {
        directory.write_tag(Tag::from_u16_exhaustive(TAG_GDAL_NODATA), nodata.as_str())?;
    }
    Ok(())
}

/// GeoKeyDirectory contents for a CRS: header followed by sorted keys.
fn geo_key_directory(crs: Crs) -> Vec<u16> {
    let mut keys: Vec<[u16; 4]> = Vec::new();
    match crs.epsg() {
        Some(code) if crs.is_geographic() => {
            keys.push([KEY_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC]);
            keys.push([KEY_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);
            keys.push([KEY_GEOGRAPHIC_TYPE, 0, 1, code]);
        }
        Some(code) => {
            keys.push([KEY_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED]);
            keys.push([KEY_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);
            keys.push([KEY_PROJECTED_CS_TYPE, 0, 1, code]);
        }
        None => {
            keys.push([KEY_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);
        }
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    directory
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_key_directory_projected() {
        let dir = geo_key_directory(Crs::Utm { zone: 10, north: true });
        assert_eq!(&dir[..4], &[1, 1, 0, 3]);
        let keys: Vec<(u16, u16)> = dir[4..].chunks_exact(4).map(|e| (e[0], e[3])).collect();
        assert_eq!(crs_from_geo_keys(&keys), Crs::Utm { zone: 10, north: true });
    }

    #[test]
    fn test_geo_key_directory_geographic() {
        let dir = geo_key_directory(Crs::Wgs84);
        let keys: Vec<(u16, u16)> = dir[4..].chunks_exact(4).map(|e| (e[0], e[3])).collect();
        assert_eq!(geo_key(&keys, KEY_MODEL_TYPE), Some(MODEL_TYPE_GEOGRAPHIC));
        assert_eq!(crs_from_geo_keys(&keys), Crs::Wgs84);
    }

    #[test]
    fn test_crs_from_missing_or_user_defined_keys() {
        assert_eq!(crs_from_geo_keys(&[]), Crs::Unknown);
        assert_eq!(
            crs_from_geo_keys(&[(KEY_MODEL_TYPE, MODEL_TYPE_PROJECTED), (KEY_PROJECTED_CS_TYPE, USER_DEFINED)]),
            Crs::Unknown
        );
    }
}
