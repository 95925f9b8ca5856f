use crate::domain::model::PlanTier;
use crate::utils::error::{MapiesError, Result};

/// 各訂閱方案的數量與功能上限，`None` 代表無上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub max_maps: Option<u32>,
    pub max_markers_per_map: Option<u32>,
    pub csv_import: bool,
    pub max_import_rows: Option<u32>,
    pub geocoding: bool,
    pub sharing: bool,
    pub data_export: bool,
    pub custom_branding: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    CsvImport,
    Geocoding,
    Sharing,
    DataExport,
    CustomBranding,
}

impl Feature {
    fn label(&self) -> &'static str {
        match self {
            Feature::CsvImport => "CSV import",
            Feature::Geocoding => "geocoding",
            Feature::Sharing => "map sharing",
            Feature::DataExport => "data export",
            Feature::CustomBranding => "custom branding",
        }
    }
}

pub fn limits_for(tier: PlanTier) -> PlanLimits {
    match tier {
        PlanTier::Freemium => PlanLimits {
            max_maps: Some(1),
            max_markers_per_map: Some(50),
            csv_import: true,
            max_import_rows: Some(50),
            geocoding: true,
            sharing: false,
            data_export: false,
            custom_branding: false,
        },
        PlanTier::Starter => PlanLimits {
            max_maps: Some(3),
            max_markers_per_map: Some(500),
            csv_import: true,
            max_import_rows: Some(500),
            geocoding: true,
            sharing: true,
            data_export: true,
            custom_branding: false,
        },
        PlanTier::Professional => PlanLimits {
            max_maps: Some(10),
            max_markers_per_map: Some(5000),
            csv_import: true,
            max_import_rows: Some(5000),
            geocoding: true,
            sharing: true,
            data_export: true,
            custom_branding: true,
        },
        PlanTier::Enterprise => PlanLimits {
            max_maps: None,
            max_markers_per_map: None,
            csv_import: true,
            max_import_rows: None,
            geocoding: true,
            sharing: true,
            data_export: true,
            custom_branding: true,
        },
    }
}

impl PlanLimits {
    pub fn allows(&self, feature: Feature) -> bool {
        match feature {
            Feature::CsvImport => self.csv_import,
            Feature::Geocoding => self.geocoding,
            Feature::Sharing => self.sharing,
            Feature::DataExport => self.data_export,
            Feature::CustomBranding => self.custom_branding,
        }
    }
}

pub fn require_feature(tier: PlanTier, feature: Feature) -> Result<()> {
    if limits_for(tier).allows(feature) {
        Ok(())
    } else {
        Err(MapiesError::PlanLimitExceeded {
            message: format!(
                "{} is not included in the {} plan",
                feature.label(),
                tier.as_str()
            ),
        })
    }
}

pub fn check_map_quota(tier: PlanTier, current_maps: u32) -> Result<()> {
    match limits_for(tier).max_maps {
        Some(max) if current_maps >= max => Err(MapiesError::PlanLimitExceeded {
            message: format!("the {} plan allows {} map(s)", tier.as_str(), max),
        }),
        _ => Ok(()),
    }
}

pub fn check_marker_quota(tier: PlanTier, current_markers: u32, adding: u32) -> Result<()> {
    match limits_for(tier).max_markers_per_map {
        Some(max) if current_markers.saturating_add(adding) > max => {
            Err(MapiesError::PlanLimitExceeded {
                message: format!(
                    "the {} plan allows {} markers per map ({} already used)",
                    tier.as_str(),
                    max,
                    current_markers
                ),
            })
        }
        _ => Ok(()),
    }
}

/// 一次匯入可以新增的標記數：同時受每張地圖上限與單次匯入列數限制
pub fn remaining_markers(tier: PlanTier, current_markers: u32) -> Option<u32> {
    let limits = limits_for(tier);
    let by_map = limits
        .max_markers_per_map
        .map(|max| max.saturating_sub(current_markers));
    match (by_map, limits.max_import_rows) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freemium_limits() {
        let limits = limits_for(PlanTier::Freemium);
        assert_eq!(limits.max_maps, Some(1));
        assert_eq!(limits.max_markers_per_map, Some(50));
        assert!(!limits.sharing);
        assert!(require_feature(PlanTier::Freemium, Feature::Sharing).is_err());
        assert!(require_feature(PlanTier::Freemium, Feature::CsvImport).is_ok());
    }

    #[test]
    fn test_map_quota() {
        assert!(check_map_quota(PlanTier::Freemium, 0).is_ok());
        assert!(check_map_quota(PlanTier::Freemium, 1).is_err());
        assert!(check_map_quota(PlanTier::Starter, 2).is_ok());
        assert!(check_map_quota(PlanTier::Enterprise, 10_000).is_ok());
    }

    #[test]
    fn test_marker_quota() {
        assert!(check_marker_quota(PlanTier::Freemium, 49, 1).is_ok());
        assert!(check_marker_quota(PlanTier::Freemium, 50, 1).is_err());
        assert!(check_marker_quota(PlanTier::Enterprise, u32::MAX, 1).is_ok());
    }

    #[test]
    fn test_remaining_markers() {
        assert_eq!(remaining_markers(PlanTier::Freemium, 45), Some(5));
        assert_eq!(remaining_markers(PlanTier::Freemium, 60), Some(0));
        assert_eq!(remaining_markers(PlanTier::Starter, 0), Some(500));
        assert_eq!(remaining_markers(PlanTier::Enterprise, 1_000_000), None);
    }
}
