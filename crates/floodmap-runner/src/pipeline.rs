//! The `impact`, `reclassify` and `sample` runs.

use crate::emit::html::{render_map_page, MapPage};
use crate::emit::maps::{
    render_category_preview, render_depth_preview, render_impact_map, render_overlay,
};
use crate::emit::report::{LayerReport, RasterReport, RunReport};
use crate::emit::{preview_path, OutputPaths};
use crate::settings::Settings;
use crate::RunError;
use chrono::Utc;
use floodmap_impact::{
    assign_impact, write_feature_collection, FeatureCollection, ImpactOutcome, ImpactSummary,
};
use floodmap_osm::{
    gather_vectors, BoundingBox, GeoJsonFileSource, OverpassClient, VectorSource, VectorWarning,
};
use floodmap_raster::{
    read_category_raster, read_depth_raster, reclassify, sample_depth_raster,
    write_category_raster, write_depth_raster, CategoryHistogram, CategoryRaster, Thresholds,
};
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// Impact
// ============================================================================

/// Inputs of an `impact` run.
#[derive(Debug, Clone)]
pub struct ImpactRequest {
    /// Category GeoTIFF (values 0-4).
    pub flood_map: PathBuf,
    /// Directory receiving every output file.
    pub output_dir: PathBuf,
    /// Effective settings after CLI overrides.
    pub settings: Settings,
    /// Local infrastructure GeoJSON used instead of Overpass.
    pub infrastructure_file: Option<PathBuf>,
    /// Local road GeoJSON used instead of Overpass.
    pub roads_file: Option<PathBuf>,
}

impl ImpactRequest {
    /// Whether vector data comes from local files rather than Overpass.
    pub fn is_offline(&self) -> bool {
        self.infrastructure_file.is_some() || self.roads_file.is_some()
    }
}

/// What an `impact` run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub infrastructure: ImpactSummary,
    pub roads: Option<ImpactSummary>,
    pub warnings: Vec<VectorWarning>,
    pub outputs: Vec<PathBuf>,
    pub report: PathBuf,
}

impl RunOutcome {
    /// Skipped features across all layers.
    pub fn skipped(&self) -> usize {
        self.infrastructure.failed() + self.roads.as_ref().map_or(0, ImpactSummary::failed)
    }
}

/// Run the full impact analysis with the source chosen by the request.
///
/// Local GeoJSON files are used when any is given; a layer without a file
/// is then simply empty. Otherwise features are downloaded from Overpass.
pub fn run_impact(request: &ImpactRequest) -> Result<RunOutcome, RunError> {
    let source: Box<dyn VectorSource> = if request.is_offline() {
        Box::new(GeoJsonFileSource::open(
            request.infrastructure_file.as_deref(),
            request.roads_file.as_deref(),
        )?)
    } else {
        let mut client = OverpassClient::with_endpoint(&request.settings.overpass_url)?;
        if let Some(dir) = &request.settings.cache_dir {
            client = client.with_cache_dir(dir)?;
        }
        Box::new(client)
    };
    run_impact_with_source(request, source.as_ref())
}

/// Run the impact analysis against an explicit vector source.
pub fn run_impact_with_source(
    request: &ImpactRequest,
    source: &dyn VectorSource,
) -> Result<RunOutcome, RunError> {
    let settings = &request.settings;

    // Configuration problems surface before any data is read
    let kinds = settings.catalog()?.resolve(&settings.infrastructure)?;

    let raster = read_category_raster(&request.flood_map)?;
    log_histogram(&raster.histogram(), raster.nodata_count());

    let bbox = BoundingBox::from_extent(&raster.extent(), raster.crs())?;
    info!(
        west = bbox.west,
        south = bbox.south,
        east = bbox.east,
        north = bbox.north,
        "analysis area"
    );

    info!(source = source.name(), kinds = kinds.len(), "gathering vector data");
    let gathered = gather_vectors(source, &bbox, &kinds, settings.include_roads)?;

    let config = settings.impact_config();
    let infrastructure = assign_impact(gathered.infrastructure, &raster, &config);
    let roads = gathered
        .roads
        .map(|roads| assign_impact(roads, &raster, &config));

    let paths = OutputPaths::new(&request.output_dir);
    paths.create_dirs()?;
    let outputs = write_outputs(&paths, &raster, &bbox, &infrastructure, roads.as_ref(), settings)?;

    let mut layers = vec![LayerReport::new(
        "infrastructure",
        &infrastructure.summary,
        &infrastructure.skipped,
    )];
    if let Some(roads) = &roads {
        layers.push(LayerReport::new("roads", &roads.summary, &roads.skipped));
    }

    let report = RunReport {
        generated_at: Utc::now(),
        flood_map: request.flood_map.clone(),
        raster: RasterReport::new(&raster),
        bounding_box: RunReport::bounding_box(&bbox),
        source: source.name().to_string(),
        settings: settings.clone(),
        layers,
        warnings: RunReport::warning_messages(&gathered.warnings),
        outputs: outputs.clone(),
    };
    let report_path = paths.report();
    report.write(&report_path)?;
    info!(path = %report_path.display(), "wrote run report");

    Ok(RunOutcome {
        infrastructure: infrastructure.summary,
        roads: roads.map(|r| r.summary),
        warnings: gathered.warnings,
        outputs,
        report: report_path,
    })
}

fn write_outputs(
    paths: &OutputPaths,
    raster: &CategoryRaster,
    bbox: &BoundingBox,
    infrastructure: &ImpactOutcome,
    roads: Option<&ImpactOutcome>,
    settings: &Settings,
) -> Result<Vec<PathBuf>, RunError> {
    let mut outputs = Vec::new();

    let path = paths.infrastructure_geojson();
    write_feature_collection(&path, &infrastructure.collection)?;
    outputs.push(path);
    if let Some(roads) = roads {
        let path = paths.roads_geojson();
        write_feature_collection(&path, &roads.collection)?;
        outputs.push(path);
    }

    let overlay = paths.overlay();
    render_overlay(raster).save(&overlay)?;
    outputs.push(overlay);

    let page = MapPage {
        title: "Flood Impact Map",
        bounds: *bbox,
        overlay: Some(paths.overlay_file_name()),
        infrastructure: &infrastructure.collection,
        roads: roads.map(|r| &r.collection),
    };
    let html = paths.html_map();
    std::fs::write(&html, render_map_page(&page)?)?;
    outputs.push(html);

    if settings.static_maps {
        let mut maps: Vec<(&str, Vec<&FeatureCollection>)> =
            vec![("infrastructure_flood_impact", vec![&infrastructure.collection])];
        if let Some(roads) = roads {
            maps.push(("road_flood_impact", vec![&roads.collection]));
            maps.push((
                "flood_impact_overview",
                vec![&roads.collection, &infrastructure.collection],
            ));
        } else {
            maps.push(("flood_impact_overview", vec![&infrastructure.collection]));
        }
        for (name, layers) in maps {
            let path = paths.static_map(name);
            render_impact_map(raster, &layers).save(&path)?;
            outputs.push(path);
        }
    }

    info!(files = outputs.len(), dir = %paths.root().display(), "wrote outputs");
    Ok(outputs)
}

fn log_histogram(histogram: &CategoryHistogram, nodata: usize) {
    for (category, cells) in histogram.iter() {
        info!(category = category.value(), label = category.label(), cells, "flood map cells");
    }
    if nodata > 0 {
        info!(cells = nodata, "nodata cells");
    }
}

// ============================================================================
// Reclassify and sample
// ============================================================================

/// Reclassify a depth GeoTIFF into a category GeoTIFF and write a preview
/// image next to it. Returns the preview path.
pub fn run_reclassify(input: &Path, output: &Path, thresholds: &Thresholds) -> Result<PathBuf, RunError> {
    let depth = read_depth_raster(input)?;
    info!(
        path = %input.display(),
        width = depth.width(),
        height = depth.height(),
        crs = %depth.crs(),
        "loaded depth raster"
    );

    let categories = reclassify(&depth, thresholds);
    log_histogram(&categories.histogram(), categories.nodata_count());
    write_category_raster(output, &categories)?;

    let preview = preview_path(output);
    render_category_preview(&categories).save(&preview)?;
    info!(output = %output.display(), preview = %preview.display(), "wrote category raster");
    Ok(preview)
}

/// Generate a synthetic depth GeoTIFF and its preview. Returns the preview
/// path.
pub fn run_sample(output: &Path, width: usize, height: usize, seed: u64) -> Result<PathBuf, RunError> {
    let depth = sample_depth_raster(width, height, seed)?;
    write_depth_raster(output, &depth)?;

    let preview = preview_path(output);
    render_depth_preview(&depth).save(&preview)?;
    info!(
        output = %output.display(),
        width,
        height,
        seed,
        "wrote sample depth raster"
    );
    Ok(preview)
}
