use std::collections::{HashMap, HashSet};

use super::records::DeviceRecord;

pub const UNKNOWN: &str = "Unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Router,
    Local,
    Other,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::Router => "Router",
            Self::Local => "This device",
            Self::Other => "Device",
        }
    }
}

#[derive(Clone, Debug)]
pub struct DeviceNode {
    pub id: String,
    pub ip: String,
    pub mac: String,
    pub hostname: String,
    pub vendor: String,
    pub role: Role,
    pub disabled: bool,
}

#[derive(Clone, Debug)]
pub struct DeviceLink {
    pub source: String,
    pub target: String,
    pub disabled: bool,
}

#[derive(Clone, Debug)]
pub struct DeviceGraph {
    pub nodes: Vec<DeviceNode>,
    pub links: Vec<DeviceLink>,
    pub router_index: Option<usize>,
}

impl DeviceGraph {
    pub fn router(&self) -> Option<&DeviceNode> {
        self.router_index.and_then(|index| self.nodes.get(index))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn field(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn claim_id(used: &mut HashSet<String>, mac: &str) -> String {
    if used.insert(mac.to_string()) {
        return mac.to_string();
    }

    let mut suffix = 2usize;
    loop {
        let candidate = format!("{mac} ({suffix})");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Turn a flat scan result into deduplicated nodes plus router-centered
/// links. Pure and deterministic for a given input ordering; never fails.
///
/// Duplicate `(ip, mac)` pairs keep the first hostname unsuffixed and get
/// ` (2)`, ` (3)`, ... appended to later occurrences so simulation identity
/// never collides. When no record carries the gateway flag a placeholder
/// router is synthesized so the layout always has a pinned center, but no
/// links are emitted for it: without a stable root MAC there is no topology
/// to draw.
pub fn build_device_graph(records: &[DeviceRecord]) -> DeviceGraph {
    let mut nodes = Vec::with_capacity(records.len() + 1);
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut used_ids = HashSet::new();

    for record in records {
        let ip = field(&record.ip);
        let mac = field(&record.mac);

        let key = format!("{ip}-{mac}");
        let count = occurrences
            .entry(key)
            .and_modify(|count| *count += 1)
            .or_insert(1);

        let mut hostname = field(&record.hostname);
        if *count >= 2 {
            hostname = format!("{hostname} ({count})");
        }

        let role = if record.is_gateway {
            Role::Router
        } else if record.is_local {
            Role::Local
        } else {
            Role::Other
        };

        nodes.push(DeviceNode {
            id: claim_id(&mut used_ids, &mac),
            ip,
            mac,
            hostname,
            vendor: field(&record.vendor),
            role,
            disabled: false,
        });
    }

    let router_index = match nodes.iter().position(|node| node.role == Role::Router) {
        Some(index) => index,
        None => {
            nodes.push(DeviceNode {
                id: claim_id(&mut used_ids, UNKNOWN),
                ip: UNKNOWN.to_string(),
                mac: UNKNOWN.to_string(),
                hostname: "Router".to_string(),
                vendor: UNKNOWN.to_string(),
                role: Role::Router,
                disabled: false,
            });
            nodes.len() - 1
        }
    };

    let mut links = Vec::new();
    if nodes[router_index].mac != UNKNOWN {
        let router_id = nodes[router_index].id.clone();
        for node in &nodes {
            if node.role == Role::Router {
                continue;
            }
            links.push(DeviceLink {
                source: node.id.clone(),
                target: router_id.clone(),
                disabled: node.disabled,
            });
        }
    }

    DeviceGraph {
        nodes,
        links,
        router_index: Some(router_index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ip: &str, mac: &str) -> DeviceRecord {
        DeviceRecord {
            ip: Some(ip.to_string()),
            mac: Some(mac.to_string()),
            ..DeviceRecord::default()
        }
    }

    fn gateway(ip: &str, mac: &str) -> DeviceRecord {
        DeviceRecord {
            is_gateway: true,
            ..record(ip, mac)
        }
    }

    #[test]
    fn router_plus_device_yields_one_link() {
        let graph = build_device_graph(&[
            gateway("192.168.1.1", "AA:AA:AA:AA:AA:AA"),
            record("192.168.1.5", "BB:BB:BB:BB:BB:BB"),
        ]);

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.router().unwrap().mac, "AA:AA:AA:AA:AA:AA");
        assert_eq!(graph.links[0].source, "BB:BB:BB:BB:BB:BB");
        assert_eq!(graph.links[0].target, "AA:AA:AA:AA:AA:AA");
    }

    #[test]
    fn duplicate_pairs_get_suffixed_hostnames_and_unique_ids() {
        let printer = DeviceRecord {
            hostname: Some("printer".to_string()),
            ..record("10.0.0.5", "CC:CC:CC:CC:CC:CC")
        };
        let graph = build_device_graph(&[printer.clone(), printer.clone(), printer]);

        let hostnames: Vec<_> = graph
            .nodes
            .iter()
            .filter(|node| node.role != Role::Router)
            .map(|node| node.hostname.as_str())
            .collect();
        assert_eq!(hostnames, ["printer", "printer (2)", "printer (3)"]);

        let mut ids: Vec<_> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before, "node ids must be unique");
    }

    #[test]
    fn every_non_router_node_links_to_the_router_exactly_once() {
        let graph = build_device_graph(&[
            record("10.0.0.2", "B2"),
            gateway("10.0.0.1", "A1"),
            record("10.0.0.3", "C3"),
            record("10.0.0.4", "D4"),
        ]);

        let router_id = graph.router().unwrap().id.clone();
        for node in graph.nodes.iter().filter(|node| node.role != Role::Router) {
            let links: Vec<_> = graph
                .links
                .iter()
                .filter(|link| link.source == node.id)
                .collect();
            assert_eq!(links.len(), 1);
            assert_eq!(links[0].target, router_id);
        }
        assert!(
            graph
                .links
                .iter()
                .all(|link| link.source != router_id && link.target == router_id)
        );
    }

    #[test]
    fn missing_gateway_synthesizes_an_edgeless_placeholder_router() {
        let graph = build_device_graph(&[record("10.0.0.2", "B2"), record("10.0.0.3", "C3")]);

        assert_eq!(graph.nodes.len(), 3);
        assert!(graph.links.is_empty());
        let router = graph.router().unwrap();
        assert_eq!(router.mac, UNKNOWN);
        assert_eq!(router.hostname, "Router");
    }

    #[test]
    fn empty_input_still_has_a_router_for_the_pinned_center() {
        let graph = build_device_graph(&[]);
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.links.is_empty());
        assert_eq!(graph.router().unwrap().role, Role::Router);
    }

    #[test]
    fn gateway_flag_wins_over_local_flag() {
        let both = DeviceRecord {
            is_gateway: true,
            is_local: true,
            ..record("10.0.0.1", "A1")
        };
        let local = DeviceRecord {
            is_local: true,
            ..record("10.0.0.9", "F9")
        };
        let graph = build_device_graph(&[both, local]);

        assert_eq!(graph.nodes[0].role, Role::Router);
        assert_eq!(graph.nodes[1].role, Role::Local);
    }

    #[test]
    fn missing_fields_degrade_to_unknown_placeholders() {
        let graph = build_device_graph(&[DeviceRecord::default()]);
        let node = &graph.nodes[0];
        assert_eq!(node.ip, UNKNOWN);
        assert_eq!(node.mac, UNKNOWN);
        assert_eq!(node.hostname, UNKNOWN);
        assert_eq!(node.vendor, UNKNOWN);
    }

    #[test]
    fn shared_mac_across_different_ips_still_yields_unique_ids() {
        let graph = build_device_graph(&[record("10.0.0.2", "B2"), record("10.0.0.3", "B2")]);
        assert_ne!(graph.nodes[0].id, graph.nodes[1].id);
        // Distinct dedup keys, so the second hostname stays unsuffixed.
        assert_eq!(graph.nodes[1].hostname, UNKNOWN);
    }
}
