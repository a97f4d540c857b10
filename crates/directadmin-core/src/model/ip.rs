// Server IP pool entries, parsed from the per-address blobs inside an
// `IP_MANAGER` response.

use std::collections::BTreeMap;

use crate::convert;

/// One address in the server's IP pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ip {
    address: String,
    gateway: String,
    global: bool,
    netmask: String,
    ns: String,
    reseller: String,
    status: String,
    value: String,
    linked_ips: Vec<String>,
}

impl Ip {
    pub(crate) fn from_blob(address: String, blob: &BTreeMap<String, String>) -> Self {
        let field = |key: &str| blob.get(key).cloned().unwrap_or_default();
        Self {
            address,
            gateway: field("gateway"),
            global: blob.get("global").map(String::as_str).is_some_and(convert::to_bool),
            netmask: field("netmask"),
            ns: field("ns"),
            reseller: field("reseller"),
            status: field("status"),
            value: field("value"),
            linked_ips: blob
                .get("linked_ips")
                .map(|v| convert::split_list(v))
                .unwrap_or_default(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Whether the address is shared server-wide.
    pub fn is_global(&self) -> bool {
        self.global
    }

    pub fn netmask(&self) -> &str {
        &self.netmask
    }

    pub fn nameserver(&self) -> &str {
        &self.ns
    }

    /// Owning reseller, empty when unassigned.
    pub fn reseller(&self) -> &str {
        &self.reseller
    }

    /// Assignment status as the panel reports it (`server`, `shared`,
    /// `owned`, ...).
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn linked_ips(&self) -> &[String] {
        &self.linked_ips
    }
}
