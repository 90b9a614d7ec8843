// Resource models returned by the cluster management API
//
// Only the fields the CLI actually renders are modeled; unknown fields are
// ignored so management-plane upgrades do not break listings.

use serde::Deserialize;
use std::collections::HashMap;

/// A storage-serving node as returned by `/servers/all/0/0`
#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    pub node_id: String,
    #[serde(default)]
    pub health: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub disks: Vec<TargetDisk>,
    #[serde(default)]
    pub nics: Vec<TargetNic>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetDisk {
    #[serde(rename = "diskID")]
    pub disk_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetNic {
    #[serde(rename = "nicID")]
    pub nic_id: String,
}

/// A consuming node as returned by `/clients/all/0/0`
#[derive(Debug, Clone, Deserialize)]
pub struct Client {
    pub client_id: String,
    #[serde(default)]
    pub health: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub block_devices: Vec<BlockDevice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockDevice {
    #[serde(default)]
    pub name: String,
}

/// A volume as returned by `/volumes/all/0/0`
#[derive(Debug, Clone, Deserialize)]
pub struct Volume {
    pub name: String,
    #[serde(default)]
    pub health: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "RAIDLevel", default)]
    pub raid_level: String,
    #[serde(default)]
    pub capacity: u64,
    #[serde(rename = "stripeWidth")]
    pub stripe_width: Option<u64>,
    #[serde(default)]
    pub chunks: Vec<VolumeChunk>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeChunk {
    #[serde(rename = "pRaids", default)]
    pub p_raids: Vec<PRaid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PRaid {
    #[serde(rename = "diskSegments", default)]
    pub disk_segments: Vec<DiskSegment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiskSegment {
    #[serde(rename = "type", default)]
    pub segment_type: String,
    #[serde(rename = "remainingDirtyBits", default)]
    pub remaining_dirty_bits: u64,
    #[serde(default)]
    pub node_id: String,
}

/// A volume provisioning group as returned by `/volumeProvisioningGroups/all`
#[derive(Debug, Clone, Deserialize)]
pub struct Vpg {
    pub name: String,
    #[serde(rename = "RAIDLevel", default)]
    pub raid_level: String,
    #[serde(rename = "stripeWidth")]
    pub stripe_width: Option<u64>,
    #[serde(default)]
    pub capacity: u64,
    #[serde(rename = "diskClasses", default)]
    pub disk_classes: Vec<String>,
    #[serde(rename = "serverClasses", default)]
    pub server_classes: Vec<String>,
    pub description: Option<String>,
}

/// A drive class as returned by `/diskClasses/all`
#[derive(Debug, Clone, Deserialize)]
pub struct DriveClass {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub disks: Vec<DriveClassModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveClassModel {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub disks: Vec<DriveClassDrive>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveClassDrive {
    #[serde(rename = "diskID", default)]
    pub disk_id: String,
    #[serde(default)]
    pub node_id: String,
}

/// A target class as returned by `/serverClasses/all`
#[derive(Debug, Clone, Deserialize)]
pub struct TargetClass {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "targetNodes", default)]
    pub target_nodes: Vec<String>,
}

/// Cluster-wide node and volume counters from `/status`
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterStatus {
    pub servers: ServerCounters,
    pub clients: ClientCounters,
    #[serde(default)]
    pub volumes: HashMap<String, u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerCounters {
    #[serde(rename = "totalServers", default)]
    pub total: u64,
    #[serde(rename = "offlineServers", default)]
    pub offline: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientCounters {
    #[serde(rename = "totalClients", default)]
    pub total: u64,
    #[serde(rename = "offlineClients", default)]
    pub offline: u64,
}

/// Capacity totals from `/getSpaceAllocation`
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceAllocation {
    #[serde(rename = "totalCapacityInBytes", default)]
    pub total_capacity_in_bytes: u64,
    #[serde(rename = "availableSpaceInBytes", default)]
    pub available_space_in_bytes: u64,
}
