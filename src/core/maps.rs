use crate::adapters::documents::DocumentStore;
use crate::core::plans::{check_map_quota, check_marker_quota, require_feature, Feature};
use crate::core::sharing::{self, ensure, Permission};
use crate::domain::model::{
    markers_collection, new_id, polygons_collection, public_markers_collection, GeocodeSource,
    MapDoc, MapRole, MapSettings, MapStats, Marker, MarkerInput, PlanTier, Polygon, PublicMap,
    User, MAPS, PUBLIC_MAPS, USERS,
};
use crate::domain::ports::Storage;
use crate::utils::error::{MapiesError, Result};
use crate::utils::validation::validate_coordinates;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

const DEFAULT_POLYGON_COLOR: &str = "#3B82F680";

/// `update_map` 可修改的欄位，`None` 表示不變
#[derive(Debug, Clone, Default)]
pub struct MapUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub settings: Option<MapSettings>,
}

fn validate_name(kind: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MapiesError::validation(format!("{} name cannot be empty", kind)));
    }
    if name.chars().count() > 200 {
        return Err(MapiesError::validation(format!(
            "{} name cannot exceed 200 characters",
            kind
        )));
    }
    Ok(name.to_string())
}

fn validate_marker_input(input: &MarkerInput) -> Result<String> {
    let name = validate_name("marker", &input.name)?;
    validate_coordinates(input.lat, input.lng)?;
    Ok(name)
}

/// 地圖、標記與多邊形的讀寫，每次變更後重新計算統計並同步公開鏡像
pub struct MapService<S: Storage> {
    store: Arc<DocumentStore<S>>,
}

impl<S: Storage> MapService<S> {
    pub fn new(store: Arc<DocumentStore<S>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DocumentStore<S> {
        &self.store
    }

    // ---- users ----

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.store.get(USERS, user_id).await
    }

    pub async fn save_user(&self, user: &User) -> Result<()> {
        self.store.set(USERS, &user.id, user).await
    }

    /// 找不到使用者文件時視為免費方案
    pub async fn tier_of(&self, user_id: &str) -> Result<PlanTier> {
        Ok(self
            .get_user(user_id)
            .await?
            .map(|user| user.subscription_tier)
            .unwrap_or_default())
    }

    // ---- maps ----

    pub async fn get_map(&self, map_id: &str) -> Result<MapDoc> {
        self.store.require(MAPS, map_id, "map").await
    }

    /// 讀取地圖並確認權限
    pub async fn map_for(&self, actor: &str, map_id: &str, permission: Permission) -> Result<MapDoc> {
        let map = self.get_map(map_id).await?;
        ensure(&map, actor, permission)?;
        Ok(map)
    }

    async fn save_map(&self, map: &MapDoc) -> Result<()> {
        self.store.set(MAPS, &map.id, map).await
    }

    pub async fn create_map(&self, user_id: &str, name: &str) -> Result<MapDoc> {
        let name = validate_name("map", name)?;
        let tier = self.tier_of(user_id).await?;
        let owned = self
            .store
            .list::<MapDoc>(MAPS)
            .await?
            .iter()
            .filter(|m| m.owner_id == user_id)
            .count();
        check_map_quota(tier, owned as u32)?;

        let now = Utc::now();
        let map = MapDoc {
            id: new_id(),
            owner_id: user_id.to_string(),
            name,
            description: String::new(),
            settings: MapSettings::default(),
            is_public: false,
            collaborators: Vec::new(),
            stats: MapStats::default(),
            created_at: now,
            updated_at: now,
        };
        self.save_map(&map).await?;
        tracing::info!(map_id = %map.id, "🗺️ Map '{}' created for {}", map.name, user_id);
        Ok(map)
    }

    pub async fn update_map(&self, actor: &str, map_id: &str, update: MapUpdate) -> Result<MapDoc> {
        let mut map = self.map_for(actor, map_id, Permission::Manage).await?;
        if let Some(name) = update.name {
            map.name = validate_name("map", &name)?;
        }
        if let Some(description) = update.description {
            map.description = description.trim().to_string();
        }
        if let Some(settings) = update.settings {
            map.settings = settings;
        }
        map.updated_at = Utc::now();
        self.save_map(&map).await?;
        self.refresh_public_mirror(&map).await?;
        Ok(map)
    }

    pub async fn set_public(&self, actor: &str, map_id: &str, is_public: bool) -> Result<MapDoc> {
        let mut map = self.map_for(actor, map_id, Permission::Manage).await?;
        map.is_public = is_public;
        map.updated_at = Utc::now();
        self.save_map(&map).await?;
        self.refresh_public_mirror(&map).await?;
        tracing::info!(map_id = %map.id, "🌐 Map visibility set to public={}", is_public);
        Ok(map)
    }

    pub async fn delete_map(&self, actor: &str, map_id: &str) -> Result<()> {
        let mut map = self.map_for(actor, map_id, Permission::Own).await?;

        let markers = markers_collection(map_id);
        for id in self.store.list_ids(&markers).await? {
            self.store.delete(&markers, &id).await?;
        }
        let polygons = polygons_collection(map_id);
        for id in self.store.list_ids(&polygons).await? {
            self.store.delete(&polygons, &id).await?;
        }

        map.is_public = false;
        self.refresh_public_mirror(&map).await?;
        self.store.delete(MAPS, map_id).await?;
        tracing::info!(map_id = %map_id, "🗑️ Map deleted");
        Ok(())
    }

    /// 擁有的地圖加上被分享的地圖
    pub async fn maps_for_user(&self, user_id: &str) -> Result<Vec<MapDoc>> {
        let mut maps: Vec<MapDoc> = self
            .store
            .list::<MapDoc>(MAPS)
            .await?
            .into_iter()
            .filter(|m| sharing::role_of(m, user_id).is_some())
            .collect();
        maps.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(maps)
    }

    // ---- sharing ----

    pub async fn share_map(
        &self,
        actor: &str,
        map_id: &str,
        user_id: &str,
        email: &str,
        role: MapRole,
    ) -> Result<MapDoc> {
        let mut map = self.get_map(map_id).await?;
        require_feature(self.tier_of(&map.owner_id).await?, Feature::Sharing)?;
        sharing::add_collaborator(&mut map, actor, user_id, email, role)?;
        map.updated_at = Utc::now();
        self.save_map(&map).await?;
        tracing::info!(map_id = %map_id, "🤝 Shared with {} as {:?}", user_id, role);
        Ok(map)
    }

    pub async fn unshare_map(&self, actor: &str, map_id: &str, user_id: &str) -> Result<MapDoc> {
        let mut map = self.get_map(map_id).await?;
        sharing::remove_collaborator(&mut map, actor, user_id)?;
        map.updated_at = Utc::now();
        self.save_map(&map).await?;
        Ok(map)
    }

    pub async fn transfer_ownership(
        &self,
        actor: &str,
        map_id: &str,
        new_owner_id: &str,
    ) -> Result<MapDoc> {
        let mut map = self.get_map(map_id).await?;
        let previous_email = self
            .get_user(&map.owner_id)
            .await?
            .map(|user| user.email)
            .unwrap_or_default();
        sharing::transfer_ownership(&mut map, actor, new_owner_id, &previous_email)?;
        map.updated_at = Utc::now();
        self.save_map(&map).await?;
        tracing::info!(map_id = %map_id, "🔑 Ownership transferred to {}", new_owner_id);
        Ok(map)
    }

    // ---- markers ----

    /// 不檢查權限，供匯入與匯出內部使用
    pub async fn markers_of(&self, map_id: &str) -> Result<Vec<Marker>> {
        let mut markers: Vec<Marker> = self.store.list(&markers_collection(map_id)).await?;
        markers.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.source_row.cmp(&b.source_row))
        });
        Ok(markers)
    }

    pub async fn list_markers(&self, actor: &str, map_id: &str) -> Result<Vec<Marker>> {
        self.map_for(actor, map_id, Permission::View).await?;
        self.markers_of(map_id).await
    }

    pub async fn create_marker(
        &self,
        actor: &str,
        map_id: &str,
        input: MarkerInput,
    ) -> Result<Marker> {
        let map = self.map_for(actor, map_id, Permission::Edit).await?;
        let name = validate_marker_input(&input)?;

        let collection = markers_collection(map_id);
        let current = self.store.list_ids(&collection).await?.len() as u32;
        check_marker_quota(self.tier_of(&map.owner_id).await?, current, 1)?;

        let now = Utc::now();
        let marker = Marker {
            id: new_id(),
            map_id: map_id.to_string(),
            name,
            address: input.address.trim().to_string(),
            lat: input.lat,
            lng: input.lng,
            category: input.category,
            visible: input.visible.unwrap_or(true),
            geocode_source: GeocodeSource::Manual,
            source_job_id: None,
            source_row: None,
            created_at: now,
            updated_at: now,
        };
        self.store.set(&collection, &marker.id, &marker).await?;
        self.recompute_stats(map_id).await?;
        Ok(marker)
    }

    async fn require_marker(&self, map_id: &str, marker_id: &str) -> Result<Marker> {
        self.store
            .require(&markers_collection(map_id), marker_id, "marker")
            .await
    }

    pub async fn update_marker(
        &self,
        actor: &str,
        map_id: &str,
        marker_id: &str,
        input: MarkerInput,
    ) -> Result<Marker> {
        self.map_for(actor, map_id, Permission::Edit).await?;
        let name = validate_marker_input(&input)?;
        let mut marker = self.require_marker(map_id, marker_id).await?;

        if marker.lat != input.lat || marker.lng != input.lng {
            marker.geocode_source = GeocodeSource::Manual;
        }
        marker.name = name;
        marker.address = input.address.trim().to_string();
        marker.lat = input.lat;
        marker.lng = input.lng;
        marker.category = input.category;
        if let Some(visible) = input.visible {
            marker.visible = visible;
        }
        marker.updated_at = Utc::now();

        self.store
            .set(&markers_collection(map_id), &marker.id, &marker)
            .await?;
        self.recompute_stats(map_id).await?;
        Ok(marker)
    }

    pub async fn set_marker_visibility(
        &self,
        actor: &str,
        map_id: &str,
        marker_id: &str,
        visible: bool,
    ) -> Result<Marker> {
        self.map_for(actor, map_id, Permission::Edit).await?;
        let mut marker = self.require_marker(map_id, marker_id).await?;
        marker.visible = visible;
        marker.updated_at = Utc::now();
        self.store
            .set(&markers_collection(map_id), &marker.id, &marker)
            .await?;
        self.recompute_stats(map_id).await?;
        Ok(marker)
    }

    pub async fn delete_marker(&self, actor: &str, map_id: &str, marker_id: &str) -> Result<()> {
        self.map_for(actor, map_id, Permission::Edit).await?;
        self.require_marker(map_id, marker_id).await?;
        self.store
            .delete(&markers_collection(map_id), marker_id)
            .await?;
        self.recompute_stats(map_id).await?;
        Ok(())
    }

    /// 批次刪除，回傳實際刪除的數量；不存在的 id 直接略過
    pub async fn delete_markers(&self, actor: &str, map_id: &str, ids: &[String]) -> Result<usize> {
        self.map_for(actor, map_id, Permission::Edit).await?;
        let collection = markers_collection(map_id);
        let existing: HashSet<String> = self.store.list_ids(&collection).await?.into_iter().collect();

        let mut deleted = 0;
        for id in ids.iter().filter(|id| existing.contains(*id)) {
            self.store.delete(&collection, id).await?;
            deleted += 1;
        }
        self.recompute_stats(map_id).await?;
        tracing::info!(map_id = %map_id, "🗑️ Deleted {} of {} markers", deleted, ids.len());
        Ok(deleted)
    }

    // ---- polygons ----

    pub async fn create_polygon(
        &self,
        actor: &str,
        map_id: &str,
        name: &str,
        coordinates: Vec<[f64; 2]>,
        fill_color: Option<String>,
    ) -> Result<Polygon> {
        self.map_for(actor, map_id, Permission::Edit).await?;
        let name = validate_name("polygon", name)?;

        let mut ring = coordinates;
        for [lng, lat] in &ring {
            validate_coordinates(*lat, *lng)?;
        }
        let mut distinct: Vec<[f64; 2]> = Vec::with_capacity(ring.len());
        for point in &ring {
            if !distinct.contains(point) {
                distinct.push(*point);
            }
        }
        if distinct.len() < 3 {
            return Err(MapiesError::validation(
                "polygon needs at least three distinct points",
            ));
        }
        // 封閉環：最後一點等於第一點
        if ring.first() != ring.last() {
            if let Some(first) = ring.first().copied() {
                ring.push(first);
            }
        }

        let polygon = Polygon {
            id: new_id(),
            map_id: map_id.to_string(),
            name,
            coordinates: ring,
            fill_color: fill_color.unwrap_or_else(|| DEFAULT_POLYGON_COLOR.to_string()),
            created_at: Utc::now(),
        };
        self.store
            .set(&polygons_collection(map_id), &polygon.id, &polygon)
            .await?;
        self.recompute_stats(map_id).await?;
        Ok(polygon)
    }

    pub async fn list_polygons(&self, actor: &str, map_id: &str) -> Result<Vec<Polygon>> {
        self.map_for(actor, map_id, Permission::View).await?;
        let mut polygons: Vec<Polygon> = self.store.list(&polygons_collection(map_id)).await?;
        polygons.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(polygons)
    }

    pub async fn delete_polygon(&self, actor: &str, map_id: &str, polygon_id: &str) -> Result<()> {
        self.map_for(actor, map_id, Permission::Edit).await?;
        let collection = polygons_collection(map_id);
        self.store
            .require::<Polygon>(&collection, polygon_id, "polygon")
            .await?;
        self.store.delete(&collection, polygon_id).await?;
        self.recompute_stats(map_id).await?;
        Ok(())
    }

    // ---- stats & public mirror ----

    pub async fn recompute_stats(&self, map_id: &str) -> Result<MapStats> {
        self.update_stats(map_id, false).await
    }

    /// 匯入完成後更新統計並記錄 `lastImportAt`
    pub async fn record_import(&self, map_id: &str) -> Result<MapStats> {
        self.update_stats(map_id, true).await
    }

    async fn update_stats(&self, map_id: &str, imported: bool) -> Result<MapStats> {
        let mut map = self.get_map(map_id).await?;
        let markers = self.markers_of(map_id).await?;
        let polygon_count = self
            .store
            .list_ids(&polygons_collection(map_id))
            .await?
            .len();

        let now = Utc::now();
        let stats = MapStats {
            marker_count: markers.len() as u32,
            visible_marker_count: markers.iter().filter(|m| m.visible).count() as u32,
            polygon_count: polygon_count as u32,
            last_import_at: if imported {
                Some(now)
            } else {
                map.stats.last_import_at
            },
            updated_at: now,
        };

        map.stats = stats.clone();
        map.updated_at = now;
        self.save_map(&map).await?;
        self.sync_mirror(&map, &markers).await?;
        tracing::debug!(
            map_id = %map_id,
            "Stats: {} markers ({} visible), {} polygons",
            stats.marker_count,
            stats.visible_marker_count,
            stats.polygon_count
        );
        Ok(stats)
    }

    /// 公開地圖寫入鏡像；非公開時移除鏡像
    pub async fn refresh_public_mirror(&self, map: &MapDoc) -> Result<()> {
        let markers = if map.is_public {
            self.markers_of(&map.id).await?
        } else {
            Vec::new()
        };
        self.sync_mirror(map, &markers).await
    }

    async fn sync_mirror(&self, map: &MapDoc, markers: &[Marker]) -> Result<()> {
        let collection = public_markers_collection(&map.id);
        let mirrored: HashSet<String> = self.store.list_ids(&collection).await?.into_iter().collect();

        if !map.is_public {
            for id in &mirrored {
                self.store.delete(&collection, id).await?;
            }
            return self.store.delete(PUBLIC_MAPS, &map.id).await;
        }

        self.store
            .set(PUBLIC_MAPS, &map.id, &PublicMap::from(map))
            .await?;

        let mut keep = HashSet::new();
        for marker in markers.iter().filter(|m| m.visible) {
            self.store.set(&collection, &marker.id, marker).await?;
            keep.insert(marker.id.clone());
        }
        for id in mirrored.difference(&keep) {
            self.store.delete(&collection, id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStorage;

    async fn service_with(users: &[(&str, PlanTier)]) -> MapService<MemoryStorage> {
        let service = MapService::new(Arc::new(DocumentStore::new(MemoryStorage::new())));
        for (id, tier) in users {
            let user = User::new(*id, format!("{}@example.com", id)).with_tier(*tier);
            service.save_user(&user).await.unwrap();
        }
        service
    }

    fn marker(name: &str, lat: f64, lng: f64) -> MarkerInput {
        MarkerInput {
            name: name.to_string(),
            lat,
            lng,
            ..MarkerInput::default()
        }
    }

    #[tokio::test]
    async fn test_create_map_respects_quota() {
        let service = service_with(&[("free", PlanTier::Freemium)]).await;

        service.create_map("free", "First").await.unwrap();
        let err = service.create_map("free", "Second").await.unwrap_err();
        assert!(matches!(err, MapiesError::PlanLimitExceeded { .. }));
        assert!(service.create_map("free", "  ").await.is_err());
    }

    #[tokio::test]
    async fn test_marker_crud_updates_stats() {
        let service = service_with(&[("u1", PlanTier::Starter)]).await;
        let map = service.create_map("u1", "Shops").await.unwrap();

        let a = service
            .create_marker("u1", &map.id, marker("A", 10.0, 20.0))
            .await
            .unwrap();
        service
            .create_marker("u1", &map.id, marker("B", 11.0, 21.0))
            .await
            .unwrap();
        service
            .set_marker_visibility("u1", &map.id, &a.id, false)
            .await
            .unwrap();

        let stats = service.get_map(&map.id).await.unwrap().stats;
        assert_eq!(stats.marker_count, 2);
        assert_eq!(stats.visible_marker_count, 1);

        let updated = service
            .update_marker("u1", &map.id, &a.id, marker("A2", 12.0, 22.0))
            .await
            .unwrap();
        assert_eq!(updated.name, "A2");
        assert!(!updated.visible);

        service.delete_marker("u1", &map.id, &a.id).await.unwrap();
        assert_eq!(service.get_map(&map.id).await.unwrap().stats.marker_count, 1);
        assert!(service
            .delete_marker("u1", &map.id, &a.id)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_marker_validation_and_permissions() {
        let service = service_with(&[("owner", PlanTier::Starter)]).await;
        let map = service.create_map("owner", "Shops").await.unwrap();

        assert!(service
            .create_marker("owner", &map.id, marker("Bad", 91.0, 0.0))
            .await
            .is_err());
        assert!(service
            .create_marker("owner", &map.id, marker("", 1.0, 1.0))
            .await
            .is_err());

        service
            .share_map("owner", &map.id, "viewer", "v@example.com", MapRole::Viewer)
            .await
            .unwrap();
        let err = service
            .create_marker("viewer", &map.id, marker("X", 1.0, 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, MapiesError::PermissionDenied { .. }));
        assert!(service.list_markers("viewer", &map.id).await.is_ok());
        assert!(service.list_markers("stranger", &map.id).await.is_err());
    }

    #[tokio::test]
    async fn test_freemium_cannot_share() {
        let service = service_with(&[("free", PlanTier::Freemium)]).await;
        let map = service.create_map("free", "Mine").await.unwrap();

        let err = service
            .share_map("free", &map.id, "friend", "f@example.com", MapRole::Viewer)
            .await
            .unwrap_err();
        assert!(matches!(err, MapiesError::PlanLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_public_mirror_tracks_visible_markers() {
        let service = service_with(&[("u1", PlanTier::Professional)]).await;
        let map = service.create_map("u1", "Public").await.unwrap();
        let a = service
            .create_marker("u1", &map.id, marker("A", 1.0, 1.0))
            .await
            .unwrap();
        let b = service
            .create_marker("u1", &map.id, marker("B", 2.0, 2.0))
            .await
            .unwrap();

        service.set_public("u1", &map.id, true).await.unwrap();
        let mirror = public_markers_collection(&map.id);
        assert_eq!(service.store().list_ids(&mirror).await.unwrap().len(), 2);
        assert!(service.list_markers("anyone", &map.id).await.is_ok());

        service
            .set_marker_visibility("u1", &map.id, &b.id, false)
            .await
            .unwrap();
        assert_eq!(service.store().list_ids(&mirror).await.unwrap(), vec![a.id.clone()]);

        service.set_public("u1", &map.id, false).await.unwrap();
        assert!(service.store().list_ids(&mirror).await.unwrap().is_empty());
        let public: Option<PublicMap> = service.store().get(PUBLIC_MAPS, &map.id).await.unwrap();
        assert!(public.is_none());
    }

    #[tokio::test]
    async fn test_polygons() {
        let service = service_with(&[("u1", PlanTier::Starter)]).await;
        let map = service.create_map("u1", "Zones").await.unwrap();

        let polygon = service
            .create_polygon(
                "u1",
                &map.id,
                "Downtown",
                vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
                None,
            )
            .await
            .unwrap();
        assert_eq!(polygon.coordinates.len(), 4);
        assert_eq!(polygon.coordinates.first(), polygon.coordinates.last());

        assert!(service
            .create_polygon("u1", &map.id, "Line", vec![[0.0, 0.0], [1.0, 1.0]], None)
            .await
            .is_err());
        // 重複的點不算
        for ring in [
            vec![[0.0, 0.0], [0.0, 0.0], [1.0, 1.0]],
            vec![[0.0, 0.0], [1.0, 1.0], [1.0, 1.0], [0.0, 0.0]],
        ] {
            let err = service
                .create_polygon("u1", &map.id, "Degenerate", ring, None)
                .await
                .unwrap_err();
            assert!(matches!(err, MapiesError::ValidationError { .. }));
        }
        assert_eq!(service.get_map(&map.id).await.unwrap().stats.polygon_count, 1);

        service
            .delete_polygon("u1", &map.id, &polygon.id)
            .await
            .unwrap();
        assert!(service.list_polygons("u1", &map.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_map_removes_children() {
        let service = service_with(&[("u1", PlanTier::Starter), ("ed", PlanTier::Freemium)]).await;
        let map = service.create_map("u1", "Temp").await.unwrap();
        service
            .create_marker("u1", &map.id, marker("A", 1.0, 1.0))
            .await
            .unwrap();
        service
            .share_map("u1", &map.id, "ed", "ed@example.com", MapRole::Editor)
            .await
            .unwrap();

        assert!(service.delete_map("ed", &map.id).await.is_err());
        service.delete_map("u1", &map.id).await.unwrap();

        assert!(service.get_map(&map.id).await.unwrap_err().is_not_found());
        assert!(service
            .store()
            .list_ids(&markers_collection(&map.id))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_maps_for_user_and_transfer() {
        let service = service_with(&[("a", PlanTier::Starter), ("b", PlanTier::Starter)]).await;
        let map_a = service.create_map("a", "A's map").await.unwrap();
        service.create_map("b", "B's map").await.unwrap();

        service
            .share_map("a", &map_a.id, "b", "b@example.com", MapRole::Editor)
            .await
            .unwrap();
        assert_eq!(service.maps_for_user("b").await.unwrap().len(), 2);
        assert_eq!(service.maps_for_user("a").await.unwrap().len(), 1);

        let map = service.transfer_ownership("a", &map_a.id, "b").await.unwrap();
        assert_eq!(map.owner_id, "b");
        assert_eq!(sharing::role_of(&map, "a"), Some(MapRole::Admin));
        assert_eq!(map.collaborators[0].email, "a@example.com");

        let map = service.unshare_map("a", &map_a.id, "a").await.unwrap();
        assert!(map.collaborators.is_empty());
    }
}
