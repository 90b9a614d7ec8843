// Volume provisioning and attachment operations
//
// Volume create/delete go through the management API's save envelope; the
// API answers per-item success flags. Placement itself is server-side, the
// CLI only validates the request shape.

use clap::ValueEnum;
use serde_json::json;
use tracing::debug;

use crate::api::{ApiClient, ControlJob};
use crate::output::{MeshError, TerminalOutput};

/// A requested volume capacity, either an absolute byte count or all the
/// space the cluster can give
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Max,
    Bytes(u64),
}

impl Capacity {
    fn to_json(self) -> serde_json::Value {
        match self {
            Capacity::Max => json!("MAX"),
            Capacity::Bytes(n) => json!(n),
        }
    }
}

/// Parse a human size string into bytes using binary units, so "12GB" and
/// "12GiB" both mean 12 * 1024^3. The literal "MAX" requests all available
/// space.
pub fn parse_size(input: &str) -> Result<Capacity, MeshError> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("max") {
        return Ok(Capacity::Max);
    }

    let split = input
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);

    let value: f64 = number.parse().map_err(|_| invalid_size(input))?;
    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        "t" | "tb" | "tib" => 1 << 40,
        "p" | "pb" | "pib" => 1 << 50,
        _ => return Err(invalid_size(input)),
    };

    if value < 0.0 || !value.is_finite() {
        return Err(invalid_size(input));
    }
    Ok(Capacity::Bytes((value * multiplier as f64) as u64))
}

fn invalid_size(input: &str) -> MeshError {
    MeshError::InvalidInput {
        message: format!("cannot parse size '{}'", input),
        suggestion: Some("Use a size like 12GB, 1.5TiB, or MAX".to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RaidLevel {
    /// Plain concatenation, no redundancy
    Lvm,
    /// Striped
    #[value(name = "0")]
    Raid0,
    /// Mirrored
    #[value(name = "1")]
    Raid1,
    /// Striped and mirrored
    #[value(name = "10")]
    Raid10,
}

impl RaidLevel {
    fn api_name(&self) -> &'static str {
        match self {
            RaidLevel::Lvm => "LVM/JBOD",
            RaidLevel::Raid0 => "Striped RAID-0",
            RaidLevel::Raid1 => "Mirrored RAID-1",
            RaidLevel::Raid10 => "Striped & Mirrored RAID-10",
        }
    }

    fn striped(&self) -> bool {
        matches!(self, RaidLevel::Raid0 | RaidLevel::Raid10)
    }

    fn mirrored(&self) -> bool {
        matches!(self, RaidLevel::Raid1 | RaidLevel::Raid10)
    }
}

/// A validated volume-creation request
#[derive(Debug, Clone)]
pub struct CreateVolume {
    pub name: String,
    pub capacity: Capacity,
    pub description: Option<String>,
    pub drive_classes: Vec<String>,
    pub target_classes: Vec<String>,
    pub limit_by_nodes: Vec<String>,
    pub limit_by_drives: Vec<String>,
    pub raid_level: Option<RaidLevel>,
    pub stripe_width: Option<u64>,
    pub vpg: Option<String>,
}

impl CreateVolume {
    /// Build the create payload, enforcing the RAID/VPG request rules:
    /// exactly one of the two must be given, and striped levels need an
    /// explicit stripe width.
    pub fn to_payload(&self) -> Result<serde_json::Value, MeshError> {
        let mut object = serde_json::Map::new();
        object.insert("name".to_string(), json!(self.name));
        object.insert("capacity".to_string(), self.capacity.to_json());
        object.insert("serverClasses".to_string(), json!(self.target_classes));
        object.insert("limitByNodes".to_string(), json!(self.limit_by_nodes));
        object.insert("limitByDisks".to_string(), json!(self.limit_by_drives));

        if let Some(description) = &self.description {
            object.insert("description".to_string(), json!(description));
        }
        if !self.drive_classes.is_empty() {
            object.insert("diskClasses".to_string(), json!(self.drive_classes));
        }

        match (self.raid_level, &self.vpg) {
            (Some(raid), None) => {
                object.insert("RAIDLevel".to_string(), json!(raid.api_name()));
                if raid.striped() {
                    let width = self.stripe_width.ok_or_else(|| MeshError::InvalidInput {
                        message: format!("RAID level {} requires a stripe width", raid.api_name()),
                        suggestion: Some("Pass the stripe width, e.g. '-w 2'".to_string()),
                    })?;
                    object.insert("stripeSize".to_string(), json!(32));
                    object.insert("stripeWidth".to_string(), json!(width));
                }
                if raid.mirrored() {
                    object.insert("numberOfMirrors".to_string(), json!(1));
                }
            }
            (None, Some(vpg)) => {
                object.insert("VPG".to_string(), json!(vpg));
            }
            _ => {
                return Err(MeshError::InvalidInput {
                    message: "a volume needs either a RAID level or a VPG, not both".to_string(),
                    suggestion: Some("Pass '-r lvm|0|1|10' or '-g <vpg name>'".to_string()),
                });
            }
        }

        Ok(json!({ "create": [object], "remove": [], "edit": [] }))
    }
}

/// Create one volume and report the per-item outcome from the save envelope
pub async fn create(
    api: &ApiClient,
    out: &TerminalOutput,
    request: &CreateVolume,
) -> Result<(), MeshError> {
    let payload = request.to_payload()?;
    debug!(volume = request.name.as_str(), "creating volume");

    let response = api.save_volume(&payload).await?;
    if item_succeeded(&response, "create") {
        out.print_ok(&format!("Volume {} successfully created.", request.name));
    } else {
        out.print_failed(&format!("Couldn't create volume {}", request.name));
    }
    Ok(())
}

/// Delete volumes by name, one save envelope per volume so a failure leaves
/// the remaining deletions untouched
pub async fn delete(
    api: &ApiClient,
    out: &TerminalOutput,
    names: &[String],
    force: bool,
) -> Result<(), MeshError> {
    for name in names {
        let mut item = serde_json::Map::new();
        item.insert("_id".to_string(), json!(name));
        if force {
            item.insert("force".to_string(), json!(true));
        }
        let payload = json!({ "create": [], "remove": [item], "edit": [] });

        debug!(volume = name.as_str(), force, "deleting volume");
        let response = api.save_volume(&payload).await?;
        if item_succeeded(&response, "remove") {
            out.print_ok(&format!("Volume {} successfully deleted.", name));
        } else {
            out.print_failed(&format!("Couldn't delete volume {}", name));
        }
    }
    Ok(())
}

/// Submit attach or detach control jobs for every (client, volume) pair.
/// `all` expands against the management API.
pub async fn attach_detach(
    api: &ApiClient,
    out: &TerminalOutput,
    clients: &[String],
    volumes: &[String],
    job: ControlJob,
) -> Result<(), MeshError> {
    let clients = expand_all(clients, || api.get_client_list()).await?;
    let volumes = expand_all(volumes, || async {
        Ok(api.get_volumes().await?.into_iter().map(|v| v.name).collect())
    })
    .await?;

    let verb = match job {
        ControlJob::Attach => "attach",
        ControlJob::Detach => "detach",
    };

    for client in &clients {
        for volume in &volumes {
            match api.set_control_job(client, volume, job).await? {
                None => out.print_ok(&format!("{} {} {}", client, volume, verb)),
                Some(detail) => {
                    out.print_failed(&format!("{} {} {} ({})", client, volume, verb, detail))
                }
            }
        }
    }
    Ok(())
}

async fn expand_all<F, Fut>(names: &[String], fetch: F) -> Result<Vec<String>, MeshError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<Vec<String>, MeshError>>,
{
    if names.len() == 1 && names[0] == "all" {
        fetch().await
    } else {
        Ok(names.to_vec())
    }
}

/// Whether the first item under `key` in a save-envelope response reports
/// success
fn item_succeeded(response: &serde_json::Value, key: &str) -> bool {
    response[key][0]["success"].as_bool().unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(raid_level: Option<RaidLevel>, stripe_width: Option<u64>, vpg: Option<&str>) -> CreateVolume {
        CreateVolume {
            name: "vol1".to_string(),
            capacity: Capacity::Bytes(1 << 30),
            description: None,
            drive_classes: vec![],
            target_classes: vec![],
            limit_by_nodes: vec![],
            limit_by_drives: vec![],
            raid_level,
            stripe_width,
            vpg: vpg.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_parse_size_binary_units() {
        assert_eq!(parse_size("12GB").unwrap(), Capacity::Bytes(12884901888));
        assert_eq!(parse_size("12GiB").unwrap(), Capacity::Bytes(12884901888));
        assert_eq!(parse_size("1024").unwrap(), Capacity::Bytes(1024));
        assert_eq!(parse_size("1.5k").unwrap(), Capacity::Bytes(1536));
        assert_eq!(parse_size("2TiB").unwrap(), Capacity::Bytes(2199023255552));
    }

    #[test]
    fn test_parse_size_max_keyword() {
        assert_eq!(parse_size("MAX").unwrap(), Capacity::Max);
        assert_eq!(parse_size("max").unwrap(), Capacity::Max);
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert!(parse_size("lots").is_err());
        assert!(parse_size("12XB").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn test_mirrored_payload() {
        let payload = request(Some(RaidLevel::Raid1), None, None).to_payload().unwrap();
        let create = &payload["create"][0];

        assert_eq!(create["RAIDLevel"], "Mirrored RAID-1");
        assert_eq!(create["numberOfMirrors"], 1);
        assert!(create.get("stripeWidth").is_none());
        assert_eq!(payload["remove"], serde_json::json!([]));
    }

    #[test]
    fn test_striped_mirrored_payload() {
        let payload = request(Some(RaidLevel::Raid10), Some(2), None).to_payload().unwrap();
        let create = &payload["create"][0];

        assert_eq!(create["RAIDLevel"], "Striped & Mirrored RAID-10");
        assert_eq!(create["stripeSize"], 32);
        assert_eq!(create["stripeWidth"], 2);
        assert_eq!(create["numberOfMirrors"], 1);
    }

    #[test]
    fn test_striped_level_requires_stripe_width() {
        let err = request(Some(RaidLevel::Raid0), None, None).to_payload().unwrap_err();
        assert!(matches!(err, MeshError::InvalidInput { .. }));
    }

    #[test]
    fn test_raid_and_vpg_are_mutually_exclusive() {
        assert!(request(Some(RaidLevel::Lvm), None, Some("vpg1")).to_payload().is_err());
        assert!(request(None, None, None).to_payload().is_err());

        let payload = request(None, None, Some("vpg1")).to_payload().unwrap();
        assert_eq!(payload["create"][0]["VPG"], "vpg1");
    }

    #[test]
    fn test_max_capacity_serializes_as_keyword() {
        let mut req = request(Some(RaidLevel::Lvm), None, None);
        req.capacity = Capacity::Max;
        let payload = req.to_payload().unwrap();
        assert_eq!(payload["create"][0]["capacity"], "MAX");
    }

    #[test]
    fn test_save_envelope_success_flag() {
        let response = serde_json::json!({ "create": [{ "success": true, "id": "vol1" }] });
        assert!(item_succeeded(&response, "create"));
        assert!(!item_succeeded(&response, "remove"));

        let response = serde_json::json!({ "remove": [{ "success": false }] });
        assert!(!item_succeeded(&response, "remove"));
    }
}
