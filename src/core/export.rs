use crate::core::maps::MapService;
use crate::core::plans::{require_feature, Feature};
use crate::core::sharing::Permission;
use crate::domain::model::{MapDoc, Marker};
use crate::domain::ports::Storage;
use crate::utils::error::{MapiesError, Result};
use chrono::Utc;
use serde_json::json;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

fn markers_csv(markers: &[Marker]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["name", "address", "lat", "lng", "category", "visible"])?;
    for marker in markers {
        let lat = marker.lat.to_string();
        let lng = marker.lng.to_string();
        writer.write_record([
            marker.name.as_str(),
            marker.address.as_str(),
            lat.as_str(),
            lng.as_str(),
            marker.category.as_deref().unwrap_or_default(),
            if marker.visible { "true" } else { "false" },
        ])?;
    }
    writer.into_inner().map_err(|e| MapiesError::ProcessingError {
        message: format!("failed to finish markers.csv: {}", e),
    })
}

/// GeoJSON 座標順序為 `[lng, lat]`
fn markers_geojson(markers: &[Marker]) -> serde_json::Value {
    let features: Vec<_> = markers
        .iter()
        .map(|marker| {
            json!({
                "type": "Feature",
                "id": marker.id,
                "geometry": { "type": "Point", "coordinates": [marker.lng, marker.lat] },
                "properties": {
                    "name": marker.name,
                    "address": marker.address,
                    "category": marker.category,
                    "visible": marker.visible,
                }
            })
        })
        .collect();
    json!({ "type": "FeatureCollection", "features": features })
}

pub fn build_archive(map: &MapDoc, markers: &[Marker]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    zip.start_file::<_, ()>("markers.csv", FileOptions::default())?;
    zip.write_all(&markers_csv(markers)?)?;

    zip.start_file::<_, ()>("markers.geojson", FileOptions::default())?;
    zip.write_all(serde_json::to_string_pretty(&markers_geojson(markers))?.as_bytes())?;

    zip.start_file::<_, ()>("map.json", FileOptions::default())?;
    zip.write_all(serde_json::to_string_pretty(map)?.as_bytes())?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// 匯出地圖為 ZIP，回傳儲存路徑
pub async fn export_map<S: Storage>(
    maps: &MapService<S>,
    actor: &str,
    map_id: &str,
) -> Result<String> {
    let map = maps.map_for(actor, map_id, Permission::View).await?;
    require_feature(maps.tier_of(&map.owner_id).await?, Feature::DataExport)?;

    let markers = maps.markers_of(map_id).await?;
    let archive = build_archive(&map, &markers)?;

    let path = format!(
        "exports/{}/{}.zip",
        map_id,
        Utc::now().format("%Y%m%dT%H%M%S%3fZ")
    );
    tracing::debug!("Writing export ({} bytes) to {}", archive.len(), path);
    maps.store().storage().write_file(&path, &archive).await?;

    tracing::info!(map_id = %map_id, "📦 Exported {} markers to {}", markers.len(), path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::documents::DocumentStore;
    use crate::adapters::memory::MemoryStorage;
    use crate::domain::model::{MarkerInput, PlanTier, User};
    use std::io::Read;
    use std::sync::Arc;

    async fn service(tier: PlanTier) -> MapService<MemoryStorage> {
        let service = MapService::new(Arc::new(DocumentStore::new(MemoryStorage::new())));
        service
            .save_user(&User::new("u1", "u1@example.com").with_tier(tier))
            .await
            .unwrap();
        service
    }

    #[tokio::test]
    async fn test_export_writes_zip_with_three_entries() {
        let maps = service(PlanTier::Starter).await;
        let map = maps.create_map("u1", "Coffee").await.unwrap();
        maps.create_marker(
            "u1",
            &map.id,
            MarkerInput {
                name: "Bean, Inc".to_string(),
                address: "1 Main St".to_string(),
                lat: 40.5,
                lng: -73.25,
                category: Some("cafe".to_string()),
                visible: None,
            },
        )
        .await
        .unwrap();

        let path = export_map(&maps, "u1", &map.id).await.unwrap();
        assert!(path.starts_with(&format!("exports/{}/", map.id)));

        let bytes = maps.store().storage().read_file(&path).await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);

        let mut csv = String::new();
        archive
            .by_name("markers.csv")
            .unwrap()
            .read_to_string(&mut csv)
            .unwrap();
        assert!(csv.starts_with("name,address,lat,lng,category,visible"));
        assert!(csv.contains("\"Bean, Inc\",1 Main St,40.5,-73.25,cafe,true"));

        let mut geojson = String::new();
        archive
            .by_name("markers.geojson")
            .unwrap()
            .read_to_string(&mut geojson)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&geojson).unwrap();
        assert_eq!(
            value["features"][0]["geometry"]["coordinates"],
            json!([-73.25, 40.5])
        );
    }

    #[tokio::test]
    async fn test_freemium_cannot_export() {
        let maps = service(PlanTier::Freemium).await;
        let map = maps.create_map("u1", "Mine").await.unwrap();

        let err = export_map(&maps, "u1", &map.id).await.unwrap_err();
        assert!(matches!(err, MapiesError::PlanLimitExceeded { .. }));
    }
}
