use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::net::IpAddr;
use std::path::Path;
use anyhow::{Context, Result};
use shared::types::{Device, Registry};

fn sorted(registry: &Registry) -> BTreeMap<&IpAddr, &Device> {
    registry.iter().collect()
}

/// Human-readable listing, one block per responding address
pub fn render(registry: &Registry) -> String {
    let mut out = String::new();
    if registry.is_empty() {
        out.push_str("No mDNS responders found\n");
        return out;
    }

    for (addr, device) in sorted(registry) {
        let _ = writeln!(out, "{}", addr);
        for service in &device.services {
            let _ = writeln!(out, "  service  {}", service);
        }
        for address in &device.addresses {
            let _ = writeln!(out, "  address  {}", address);
        }
        for srv in &device.srv_records {
            let _ = writeln!(
                out,
                "  srv      {}:{} (priority {}, weight {})",
                srv.target, srv.port, srv.priority, srv.weight
            );
        }
        for txt in &device.txt_records {
            let pairs: Vec<String> = txt.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            let _ = writeln!(out, "  txt      {}", pairs.join(" "));
        }
    }
    out
}

/// JSON object keyed by source address
pub fn to_json(registry: &Registry) -> Result<String> {
    serde_json::to_string_pretty(&sorted(registry)).context("Failed to serialize registry")
}

pub fn write_json(path: impl AsRef<Path>, registry: &Registry) -> Result<()> {
    let path = path.as_ref();
    let json = to_json(registry)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write results to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::{SrvRecord, TxtRecord};

    fn registry() -> Registry {
        let device = Device {
            services: vec!["web._http._tcp.local".to_string()],
            addresses: vec!["192.168.1.5".parse().unwrap()],
            srv_records: vec![SrvRecord {
                priority: 0,
                weight: 0,
                port: 80,
                target: "web.local".to_string(),
            }],
            txt_records: vec![TxtRecord::from([("path".to_string(), "/".to_string())])],
        };
        Registry::from([("192.168.1.5".parse().unwrap(), device)])
    }

    #[test]
    fn test_json_shape() {
        let value: serde_json::Value =
            serde_json::from_str(&to_json(&registry()).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "192.168.1.5": {
                    "services": ["web._http._tcp.local"],
                    "addresses": ["192.168.1.5"],
                    "srv_records": [
                        {"priority": 0, "weight": 0, "port": 80, "target": "web.local"}
                    ],
                    "txt_records": [{"path": "/"}]
                }
            })
        );
    }

    #[test]
    fn test_render_lists_everything() {
        let text = render(&registry());
        assert!(text.starts_with("192.168.1.5\n"));
        assert!(text.contains("service  web._http._tcp.local"));
        assert!(text.contains("srv      web.local:80"));
        assert!(text.contains("txt      path=/"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&Registry::new()), "No mDNS responders found\n");
    }
}
