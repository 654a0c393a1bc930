//! Integration tests for platform racing and multi-sensor fetches.

use std::sync::Arc;
use std::time::{Duration, Instant};

use acquisition::{
    get_binding, AcquisitionConfig, AcquisitionError, AcquisitionService, ConfigurationError,
    FetchQuery, Platform, Sensor, StaticAvailability,
};
use tempfile::TempDir;
use test_utils::{make_items, summer_2022, test_boundary, MockCatalog, MockRaster};

// ============================================================================
// Helpers
// ============================================================================

fn query(cache: &TempDir) -> FetchQuery {
    FetchQuery::new(summer_2022(), test_boundary(), cache.path())
}

fn landsat_items(platform: Platform, prefix: &str, count: u32) -> Vec<acquisition::AcquisitionItem> {
    make_items(get_binding(Sensor::Landsat, platform).unwrap(), prefix, count)
}

fn service(available: impl IntoIterator<Item = Platform>) -> AcquisitionService {
    AcquisitionService::new(
        AcquisitionConfig::default(),
        Arc::new(StaticAvailability::new(available)),
    )
}

// ============================================================================
// Platform racing
// ============================================================================

#[tokio::test]
async fn test_fastest_platform_wins_and_loser_is_cancelled() {
    let cache = TempDir::new().unwrap();
    let slow_raster = Arc::new(MockRaster::new((4, 4)).with_delay(Duration::from_millis(1500)));
    let fast_raster = Arc::new(MockRaster::new((4, 4)).with_delay(Duration::from_millis(50)));
    let svc = service([Platform::Aws, Platform::Planetary])
        .with_platform(
            Platform::Aws,
            Arc::new(MockCatalog::new(landsat_items(Platform::Aws, "LA", 2))),
            slow_raster.clone(),
        )
        .with_platform(
            Platform::Planetary,
            Arc::new(MockCatalog::new(landsat_items(Platform::Planetary, "LP", 2))),
            fast_raster.clone(),
        );

    let started = Instant::now();
    let result = svc
        .fetch_fastest(
            Sensor::Landsat,
            &query(&cache),
            Some(vec![Platform::Aws, Platform::Planetary]),
        )
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.platform, Platform::Planetary);
    assert_eq!(result.item_ids, vec!["LP-00", "LP-01"]);
    assert!(elapsed < Duration::from_secs(1), "race took {elapsed:?}");
    assert!(slow_raster.reads() > 0);
    assert_eq!(slow_raster.completed(), 0);

    // Dropped reads never finish.
    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(slow_raster.completed(), 0);
}

#[tokio::test]
async fn test_race_falls_through_to_working_platform() {
    let cache = TempDir::new().unwrap();
    let svc = service([Platform::Aws, Platform::Planetary])
        .with_platform(
            Platform::Aws,
            Arc::new(MockCatalog::failing("catalog down")),
            Arc::new(MockRaster::new((4, 4))),
        )
        .with_platform(
            Platform::Planetary,
            Arc::new(
                MockCatalog::new(landsat_items(Platform::Planetary, "LP", 1))
                    .with_delay(Duration::from_millis(30)),
            ),
            Arc::new(MockRaster::new((4, 4))),
        );

    let result = svc
        .fetch_fastest(Sensor::Landsat, &query(&cache), None)
        .await
        .unwrap();
    assert_eq!(result.platform, Platform::Planetary);
}

#[tokio::test]
async fn test_race_with_every_platform_failing() {
    let cache = TempDir::new().unwrap();
    let svc = service([Platform::Aws, Platform::Planetary])
        .with_platform(
            Platform::Aws,
            Arc::new(MockCatalog::failing("aws down")),
            Arc::new(MockRaster::new((4, 4))),
        )
        .with_platform(
            Platform::Planetary,
            Arc::new(MockCatalog::new(Vec::new())),
            Arc::new(MockRaster::new((4, 4))),
        );

    let err = svc
        .fetch_fastest(Sensor::Landsat, &query(&cache), None)
        .await
        .unwrap_err();

    match err {
        AcquisitionError::PlatformRaceAllFailed { sensor, failures } => {
            assert_eq!(sensor, Sensor::Landsat);
            assert_eq!(failures.len(), 2);
            let mut platforms: Vec<Platform> = failures.iter().map(|f| f.platform).collect();
            platforms.sort();
            assert_eq!(platforms, vec![Platform::Aws, Platform::Planetary]);
            assert!(failures
                .iter()
                .any(|f| matches!(*f.error, AcquisitionError::CatalogEmpty { .. })));
        }
        other => panic!("expected PlatformRaceAllFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unsupported_candidate_fails_before_any_search() {
    let cache = TempDir::new().unwrap();
    let catalog = Arc::new(MockCatalog::new(landsat_items(Platform::Aws, "LA", 1)));
    let svc = service([Platform::Aws]).with_platform(
        Platform::Aws,
        catalog.clone(),
        Arc::new(MockRaster::new((4, 4))),
    );

    let err = svc
        .fetch_fastest(
            Sensor::Landsat,
            &query(&cache),
            Some(vec![Platform::Aws, Platform::Cdse]),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AcquisitionError::Configuration(ConfigurationError::NoBinding { .. })
    ));

    let err = svc
        .fetch_fastest(
            Sensor::Landsat,
            &query(&cache),
            Some(vec![Platform::Earthdata]),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AcquisitionError::Configuration(ConfigurationError::NoClients(Platform::Earthdata))
    ));

    assert_eq!(catalog.calls(), 0);
}

#[tokio::test]
async fn test_single_candidate_is_fetched_directly() {
    let cache = TempDir::new().unwrap();
    let catalog = Arc::new(MockCatalog::new(landsat_items(Platform::Aws, "LA", 2)));
    let svc = service([Platform::Aws]).with_platform(
        Platform::Aws,
        catalog.clone(),
        Arc::new(MockRaster::new((4, 4))),
    );

    let result = svc
        .fetch_fastest(Sensor::Landsat, &query(&cache), Some(vec![Platform::Aws, Platform::Aws]))
        .await
        .unwrap();
    assert_eq!(result.platform, Platform::Aws);
    assert_eq!(result.len(), 2);
    assert_eq!(catalog.calls(), 1);
}

#[tokio::test]
async fn test_configured_cloud_ceiling_reaches_the_catalog() {
    let cache = TempDir::new().unwrap();
    let config = AcquisitionConfig::from_yaml_str("cloud_ceiling: 40").unwrap();
    let catalog = Arc::new(MockCatalog::new(landsat_items(Platform::Aws, "LA", 1)));
    let svc = AcquisitionService::new(config, Arc::new(StaticAvailability::new([Platform::Aws])))
        .with_platform(Platform::Aws, catalog.clone(), Arc::new(MockRaster::new((4, 4))));

    svc.fetch(Sensor::Landsat, Platform::Aws, &query(&cache))
        .await
        .unwrap();
    assert_eq!(catalog.last_query().unwrap().cloud_ceiling, Some(40.0));

    // An explicit query ceiling overrides the configured one.
    svc.fetch(
        Sensor::Landsat,
        Platform::Aws,
        &query(&cache).with_cloud_ceiling(25.0),
    )
    .await
    .unwrap();
    assert_eq!(catalog.last_query().unwrap().cloud_ceiling, Some(25.0));
}

// ============================================================================
// Multi-sensor fetch
// ============================================================================

#[tokio::test]
async fn test_fetch_many_isolates_sensor_failures() {
    let cache = TempDir::new().unwrap();
    let mut items = landsat_items(Platform::Planetary, "LC09", 2);
    items.extend(make_items(
        get_binding(Sensor::Modis, Platform::Planetary).unwrap(),
        "MOD09",
        3,
    ));
    let svc = service([Platform::Planetary]).with_platform(
        Platform::Planetary,
        Arc::new(MockCatalog::new(items)),
        Arc::new(MockRaster::new((4, 4)).with_qa_value(0)),
    );

    let combined = svc
        .fetch_many(
            &[
                Sensor::Landsat,
                Sensor::Modis,
                Sensor::Sentinel2,
                Sensor::Viirs,
                Sensor::Landsat,
            ],
            &query(&cache),
        )
        .await;

    assert!(!combined.is_complete());
    assert_eq!(combined.results.len(), 2);
    assert_eq!(combined.results[&Sensor::Landsat].len(), 2);
    assert_eq!(combined.results[&Sensor::Modis].len(), 3);
    assert_eq!(combined.results[&Sensor::Modis].band_names.len(), 7);

    assert!(matches!(
        combined.errors[&Sensor::Sentinel2],
        AcquisitionError::CatalogEmpty { .. }
    ));
    assert!(matches!(
        combined.errors[&Sensor::Viirs],
        AcquisitionError::Configuration(ConfigurationError::NoCandidates { .. })
    ));
}

#[tokio::test]
async fn test_fetch_many_prefers_available_platform() {
    let cache = TempDir::new().unwrap();
    let svc = service([Platform::Planetary])
        .with_platform(
            Platform::Aws,
            Arc::new(MockCatalog::new(landsat_items(Platform::Aws, "LA", 1))),
            Arc::new(MockRaster::new((4, 4))),
        )
        .with_platform(
            Platform::Planetary,
            Arc::new(MockCatalog::new(landsat_items(Platform::Planetary, "LP", 1))),
            Arc::new(MockRaster::new((4, 4))),
        );

    let combined = svc.fetch_many(&[Sensor::Landsat], &query(&cache)).await;

    assert!(combined.is_complete());
    assert_eq!(combined.results[&Sensor::Landsat].platform, Platform::Planetary);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fetch_many_runs_sensors_as_parallel_tasks() {
    let cache = TempDir::new().unwrap();
    let mut items = landsat_items(Platform::Planetary, "LC09", 1);
    items.extend(make_items(
        get_binding(Sensor::Modis, Platform::Planetary).unwrap(),
        "MOD09",
        1,
    ));
    let svc = service([Platform::Planetary]).with_platform(
        Platform::Planetary,
        Arc::new(MockCatalog::new(items)),
        Arc::new(
            MockRaster::new((4, 4))
                .with_qa_value(0)
                .with_delay(Duration::from_millis(400)),
        ),
    );

    let started = Instant::now();
    let combined = svc
        .fetch_many(&[Sensor::Landsat, Sensor::Modis], &query(&cache))
        .await;
    let elapsed = started.elapsed();

    assert!(combined.is_complete(), "errors: {:?}", combined.errors);
    assert_eq!(combined.results.len(), 2);
    assert!(elapsed < Duration::from_millis(750), "fetch_many took {elapsed:?}");
}
