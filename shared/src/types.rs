use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use serde::{Serialize, Deserialize};

/// TXT attributes of a single record. Two entries are the same entry only when
/// every key and value matches.
pub type TxtRecord = BTreeMap<String, String>;

/// Scan result: every responding source address and what it advertised.
pub type Registry = HashMap<IpAddr, Device>;

/// Service locator decoded from an SRV record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SrvRecord {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

/// Everything one source address answered with during a scan.
///
/// Each list is de-duplicated and keeps first-seen order, so merging the same
/// fragment twice or merging fragments in a different order yields the same set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Advertised service instance names (PTR targets)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,

    /// A and AAAA addresses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<IpAddr>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub srv_records: Vec<SrvRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub txt_records: Vec<TxtRecord>,
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) -> bool {
    if list.contains(&item) {
        return false;
    }
    list.push(item);
    true
}

impl Device {
    /// Returns true if the service was not already known
    pub fn add_service(&mut self, name: String) -> bool {
        push_unique(&mut self.services, name)
    }

    pub fn add_address(&mut self, addr: IpAddr) -> bool {
        push_unique(&mut self.addresses, addr)
    }

    pub fn add_srv(&mut self, srv: SrvRecord) -> bool {
        push_unique(&mut self.srv_records, srv)
    }

    pub fn add_txt(&mut self, txt: TxtRecord) -> bool {
        push_unique(&mut self.txt_records, txt)
    }

    /// Union `other` into `self`, keeping existing order and appending new entries.
    pub fn merge(&mut self, other: Device) {
        for name in other.services {
            self.add_service(name);
        }
        for addr in other.addresses {
            self.add_address(addr);
        }
        for srv in other.srv_records {
            self.add_srv(srv);
        }
        for txt in other.txt_records {
            self.add_txt(txt);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
            && self.addresses.is_empty()
            && self.srv_records.is_empty()
            && self.txt_records.is_empty()
    }
}

/// Merge every device of `fragment` into `registry`.
pub fn merge_registry(registry: &mut Registry, fragment: Registry) {
    for (addr, device) in fragment {
        registry.entry(addr).or_default().merge(device);
    }
}
