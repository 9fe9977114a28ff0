//! Disk usage aggregation.
//!
//! Folds the raw per-item sizes reported by the engine into the
//! [`DiskUsageSummary`] served to clients. The total keeps the engine's
//! own accounting: shared layer bytes plus container root filesystems
//! plus volume usage plus build cache. Per-image sizes are reported per
//! category but deliberately excluded from the total, since layer bytes
//! already cover them.

use dockyard_core::types::{CategoryUsage, DiskUsageSummary, RawDiskUsage};

/// Aggregates a raw usage snapshot into category totals.
///
/// Recomputed from scratch on every call; nothing here is cached.
pub fn summarize(raw: &RawDiskUsage) -> DiskUsageSummary {
    let containers_size: i64 = raw.container_rootfs_sizes.iter().sum();
    let volumes_size: i64 = raw.volume_usage_sizes.iter().sum();
    let build_cache_size: i64 = raw.build_cache_sizes.iter().sum();

    DiskUsageSummary {
        total_size: raw.layers_size + containers_size + volumes_size + build_cache_size,
        images: CategoryUsage {
            count: raw.image_sizes.len(),
            size: raw.image_sizes.iter().sum(),
        },
        containers: CategoryUsage {
            count: raw.container_rootfs_sizes.len(),
            size: containers_size,
        },
        volumes: CategoryUsage {
            count: raw.volume_usage_sizes.len(),
            size: volumes_size,
        },
        build_cache: CategoryUsage {
            count: raw.build_cache_sizes.len(),
            size: build_cache_size,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw() -> RawDiskUsage {
        RawDiskUsage {
            layers_size: 1000,
            image_sizes: vec![600, 400],
            container_rootfs_sizes: vec![50, 25],
            volume_usage_sizes: vec![300],
            build_cache_sizes: vec![10, 10, 10],
        }
    }

    #[test]
    fn total_uses_layer_accounting_not_image_sizes() {
        let summary = summarize(&sample_raw());
        // 1000 (layers) + 75 (containers) + 300 (volumes) + 30 (build cache)
        assert_eq!(summary.total_size, 1405);
        // image sizes appear in their category but not in the total
        assert_eq!(summary.images.size, 1000);
        assert_eq!(summary.images.count, 2);
    }

    #[test]
    fn category_counts_match_item_counts() {
        let summary = summarize(&sample_raw());
        assert_eq!(summary.containers.count, 2);
        assert_eq!(summary.volumes.count, 1);
        assert_eq!(summary.build_cache.count, 3);
    }

    #[test]
    fn empty_snapshot_is_all_zero() {
        let summary = summarize(&RawDiskUsage::default());
        assert_eq!(summary.total_size, 0);
        assert_eq!(summary.images, CategoryUsage::default());
        assert_eq!(summary.build_cache, CategoryUsage::default());
    }

    #[test]
    fn same_snapshot_summarizes_identically() {
        let raw = sample_raw();
        assert_eq!(summarize(&raw), summarize(&raw));
    }

    #[test]
    fn volume_without_usage_data_contributes_nothing() {
        let raw = RawDiskUsage {
            layers_size: 100,
            volume_usage_sizes: vec![],
            ..Default::default()
        };
        let summary = summarize(&raw);
        assert_eq!(summary.volumes.count, 0);
        assert_eq!(summary.total_size, 100);
    }
}
