// Resource listings: pure builders from API models to renderable listings
//
// Each builder is a plain function from the deserialized API payload to a
// `Listing`, so the rendering path stays testable without a management
// server.

use crate::api::{
    ApiClient, Client, ClusterStatus, DriveClass, SpaceAllocation, Target, TargetClass, Volume,
    Vpg,
};
use crate::output::{format_size, Listing, MeshError, OutputFormat, TerminalOutput};

/// Render the cluster summary: node counters, volume state counts, capacity
pub async fn cluster(
    api: &ApiClient,
    out: &TerminalOutput,
    format: OutputFormat,
) -> Result<(), MeshError> {
    let status = api.get_cluster_status().await?;
    let space = api.get_space_allocation().await?;
    out.print_listing(&cluster_listing(&status, &space), format);
    Ok(())
}

pub async fn targets(
    api: &ApiClient,
    out: &TerminalOutput,
    format: OutputFormat,
) -> Result<(), MeshError> {
    let targets = api.get_servers().await?;
    out.print_listing(&target_listing(&targets), format);
    Ok(())
}

pub async fn clients(
    api: &ApiClient,
    out: &TerminalOutput,
    format: OutputFormat,
) -> Result<(), MeshError> {
    let clients = api.get_clients().await?;
    out.print_listing(&client_listing(&clients), format);
    Ok(())
}

pub async fn volumes(
    api: &ApiClient,
    out: &TerminalOutput,
    format: OutputFormat,
) -> Result<(), MeshError> {
    let volumes = api.get_volumes().await?;
    out.print_listing(&volume_listing(&volumes), format);
    Ok(())
}

pub async fn vpgs(
    api: &ApiClient,
    out: &TerminalOutput,
    format: OutputFormat,
) -> Result<(), MeshError> {
    let vpgs = api.get_vpgs().await?;
    out.print_listing(&vpg_listing(&vpgs), format);
    Ok(())
}

pub async fn drive_classes(
    api: &ApiClient,
    out: &TerminalOutput,
    format: OutputFormat,
) -> Result<(), MeshError> {
    let classes = api.get_drive_classes().await?;
    out.print_listing(&drive_class_listing(&classes), format);
    Ok(())
}

pub async fn target_classes(
    api: &ApiClient,
    out: &TerminalOutput,
    format: OutputFormat,
) -> Result<(), MeshError> {
    let classes = api.get_target_classes().await?;
    out.print_listing(&target_class_listing(&classes), format);
    Ok(())
}

fn cluster_listing(status: &ClusterStatus, space: &SpaceAllocation) -> Listing {
    let mut listing = Listing::new(&[
        "Targets Total",
        "Targets Offline",
        "Clients Total",
        "Clients Offline",
        "Volumes",
        "Capacity Total",
        "Capacity Available",
    ]);

    let volume_count: u64 = status.volumes.values().sum();
    listing.push(vec![
        status.servers.total.to_string(),
        status.servers.offline.to_string(),
        status.clients.total.to_string(),
        status.clients.offline.to_string(),
        volume_count.to_string(),
        format_size(space.total_capacity_in_bytes),
        format_size(space.available_space_in_bytes),
    ]);
    listing
}

fn target_listing(targets: &[Target]) -> Listing {
    let mut listing = Listing::new(&["Target Name", "Health", "Version", "Drives", "NICs"]);
    for target in targets {
        let drives: Vec<&str> = target.disks.iter().map(|d| d.disk_id.as_str()).collect();
        let nics: Vec<&str> = target.nics.iter().map(|n| n.nic_id.as_str()).collect();
        listing.push(vec![
            target.node_id.clone(),
            target.health.clone(),
            target.version.clone(),
            drives.join(" "),
            nics.join(" "),
        ]);
    }
    listing
}

fn client_listing(clients: &[Client]) -> Listing {
    let mut listing = Listing::new(&["Client Name", "Health", "Version", "Block Devices"]);
    for client in clients {
        let devices: Vec<&str> = client
            .block_devices
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        listing.push(vec![
            client.client_id.clone(),
            client.health.clone(),
            client.version.clone(),
            devices.join(" "),
        ]);
    }
    listing
}

fn volume_listing(volumes: &[Volume]) -> Listing {
    let mut listing = Listing::new(&[
        "Volume Name",
        "Health",
        "Status",
        "RAID Level",
        "Capacity",
        "Stripe Width",
        "Target Names",
    ]);

    for volume in volumes {
        let mut targets: Vec<String> = volume
            .chunks
            .iter()
            .flat_map(|c| &c.p_raids)
            .flat_map(|p| &p.disk_segments)
            .map(|s| s.node_id.clone())
            .collect();
        targets.sort();
        targets.dedup();

        listing.push(vec![
            volume.name.clone(),
            volume.health.clone(),
            volume.status.clone(),
            volume.raid_level.clone(),
            format_size(volume.capacity),
            volume
                .stripe_width
                .map(|w| w.to_string())
                .unwrap_or_default(),
            targets.join(" "),
        ]);
    }
    listing
}

fn vpg_listing(vpgs: &[Vpg]) -> Listing {
    let mut listing = Listing::new(&[
        "VPG Name",
        "RAID Level",
        "Capacity",
        "Stripe Width",
        "Drive Classes",
        "Target Classes",
    ]);
    for vpg in vpgs {
        listing.push(vec![
            vpg.name.clone(),
            vpg.raid_level.clone(),
            format_size(vpg.capacity),
            vpg.stripe_width.map(|w| w.to_string()).unwrap_or_default(),
            vpg.disk_classes.join(" "),
            vpg.server_classes.join(" "),
        ]);
    }
    listing
}

fn drive_class_listing(classes: &[DriveClass]) -> Listing {
    let mut listing = Listing::new(&["Drive Class", "Models", "Drives"]);
    for class in classes {
        let models: Vec<&str> = class.disks.iter().map(|m| m.model.as_str()).collect();
        let drives: Vec<String> = class
            .disks
            .iter()
            .flat_map(|m| &m.disks)
            .map(|d| format!("{}:{}", d.disk_id, d.node_id))
            .collect();
        listing.push(vec![class.id.clone(), models.join(" "), drives.join(" ")]);
    }
    listing
}

fn target_class_listing(classes: &[TargetClass]) -> Listing {
    let mut listing = Listing::new(&["Target Class", "Description", "Target Nodes"]);
    for class in classes {
        listing.push(vec![
            class.name.clone(),
            class.description.clone().unwrap_or_default(),
            class.target_nodes.join(" "),
        ]);
    }
    listing
}
