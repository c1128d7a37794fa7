//! Integration tests for GeoTIFF round trips and reclassification.

use floodmap_raster::{
    read_category_raster, read_depth_raster, reclassify, sample_depth_raster,
    write_category_raster, write_depth_raster, Crs, FloodCategory, GeoTransform, Raster,
    RasterError, Thresholds, CATEGORY_NODATA, SAMPLE_NODATA,
};
use std::fs::File;
use tiff::encoder::{colortype, TiffEncoder};

#[test]
fn test_depth_round_trip() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("depth.tif");

    let depth = sample_depth_raster(64, 48, 42).expect("sample raster");
    write_depth_raster(&path, &depth).expect("write depth raster");

    let loaded = read_depth_raster(&path).expect("read depth raster");
    assert_eq!(loaded.dimensions(), (64, 48));
    assert_eq!(loaded.data(), depth.data());
    assert_eq!(loaded.transform(), depth.transform());
    assert_eq!(loaded.crs(), Crs::Utm { zone: 10, north: true });
    assert_eq!(loaded.nodata(), Some(SAMPLE_NODATA));
}

#[test]
fn test_reclassify_file_round_trip() {
    let dir = tempfile::tempdir().expect("temp dir");
    let depth_path = dir.path().join("depth.tif");
    let category_path = dir.path().join("categories.tif");

    let depth = Raster::new(
        4,
        1,
        vec![0.0, 0.15, 1.5, -9999.0],
        GeoTransform::from_origin(-95.5, 29.8, 0.0001, 0.0001),
        Crs::Wgs84,
        Some(-9999.0),
    )
    .expect("valid raster");
    write_depth_raster(&depth_path, &depth).expect("write depth raster");

    let loaded = read_depth_raster(&depth_path).expect("read depth raster");
    let categories = reclassify(&loaded, &Thresholds::default());
    write_category_raster(&category_path, &categories).expect("write category raster");

    let reread = read_category_raster(&category_path).expect("read category raster");
    assert_eq!(reread.data(), &[0, 1, 4, CATEGORY_NODATA]);
    assert_eq!(reread.crs(), Crs::Wgs84);
    assert_eq!(reread.transform(), depth.transform());
    assert_eq!(reread.category(2, 0), Some(FloodCategory::Major));
    assert_eq!(reread.category(3, 0), None);
}

#[test]
fn test_multi_band_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("rgb.tif");

    let file = File::create(&path).expect("create file");
    let mut encoder = TiffEncoder::new(file).expect("encoder");
    encoder
        .write_image::<colortype::RGB8>(2, 2, &[0u8; 12])
        .expect("write rgb image");

    match read_depth_raster(&path) {
        Err(RasterError::MultiBand { bands }) => assert_eq!(bands, 3),
        other => panic!("expected MultiBand error, got {:?}", other),
    }
}

#[test]
fn test_missing_georeferencing_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("plain.tif");

    let file = File::create(&path).expect("create file");
    let mut encoder = TiffEncoder::new(file).expect("encoder");
    encoder
        .write_image::<colortype::Gray32Float>(2, 2, &[0.0f32; 4])
        .expect("write plain image");

    assert!(matches!(
        read_depth_raster(&path),
        Err(RasterError::InvalidGeoTiff(_))
    ));
}

#[test]
fn test_unreadable_file() {
    assert!(matches!(
        read_depth_raster("does/not/exist.tif"),
        Err(RasterError::Io(_))
    ));
}
