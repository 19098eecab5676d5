use std::net::SocketAddr;

/// Configuration for the MQTT event bus connection.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Broker host
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Topic trigger events are published to
    pub topic: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            topic: "missiond/trigger".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Project name, used as the root prefix for all coordination keys
    pub project: String,
    /// Heartbeat / scheduling tick period in seconds
    pub heartbeat_period_secs: u64,
    /// Coordination store endpoints (host:port)
    pub store_endpoints: Vec<String>,
    pub bus: BusConfig,
    /// Admin API listen address. None disables the admin API.
    pub http_addr: Option<SocketAddr>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            project: "missiond".to_string(),
            heartbeat_period_secs: 5,
            store_endpoints: vec!["127.0.0.1:2379".to_string()],
            bus: BusConfig::default(),
            http_addr: None,
        }
    }
}

impl NodeConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Default::default()
        }
    }

    pub fn with_store_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.store_endpoints = vec![endpoint.into()];
        self
    }

    pub fn key_space(&self) -> KeySpace {
        KeySpace::new(&self.project)
    }
}

/// Key layout for everything this node reads or writes in the store.
///
/// All keys live under the project root, '/'-joined:
/// `<root>/heartbeat/<nodeID>`, `<root>/mission/<missionID>`,
/// `<root>/nextExecTime/<missionID>`.
#[derive(Debug, Clone)]
pub struct KeySpace {
    root: String,
}

impl KeySpace {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.trim_end_matches('/').to_string(),
        }
    }

    pub fn heartbeat_prefix(&self) -> String {
        format!("{}/heartbeat/", self.root)
    }

    pub fn heartbeat_key(&self, node_id: i64) -> String {
        format!("{}{}", self.heartbeat_prefix(), node_id)
    }

    pub fn mission_prefix(&self) -> String {
        format!("{}/mission/", self.root)
    }

    pub fn mission_key(&self, mission_id: &str) -> String {
        format!("{}{}", self.mission_prefix(), mission_id)
    }

    pub fn next_exec_prefix(&self) -> String {
        format!("{}/nextExecTime/", self.root)
    }

    pub fn next_exec_key(&self, mission_id: &str) -> String {
        format!("{}{}", self.next_exec_prefix(), mission_id)
    }

    /// Extract the mission ID from a key under the mission prefix.
    pub fn mission_id_from_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.mission_prefix().as_str())
    }

    /// Extract the mission ID from a key under the next-exec-time prefix.
    pub fn next_exec_id_from_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.next_exec_prefix().as_str())
    }
}
