//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker threads pulling ready operators from the shared queue.
    pub worker_threads: usize,

    /// Node id baked into the high bits of every event name created by this
    /// engine instance.
    pub node_id: u32,

    /// Entry-count threshold above which an operator's output collapses its
    /// rect list into a single bitmap entry over the bounding box.
    pub consolidate_threshold: usize,

    /// Share completion events between identical in-flight requests.
    pub dedup: bool,

    /// Debugging aid: every submission blocks on its completion event before
    /// returning, serializing the dataflow graph stage by stage.
    pub serialize_operators: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            node_id: 0,
            consolidate_threshold: 64,
            dedup: true,
            serialize_operators: false,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PARTWISE_WORKER_THREADS`: worker pool size
    /// - `PARTWISE_NODE_ID`: event-name namespace
    /// - `PARTWISE_CONSOLIDATE_THRESHOLD`: bitmap-collapse threshold
    /// - `PARTWISE_DEDUP`: 0/1, in-flight request dedup
    /// - `PARTWISE_SERIALIZE_OPERATORS`: 0/1, stage-by-stage execution
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("PARTWISE_WORKER_THREADS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.worker_threads = v.max(1);
            }
        }

        if let Ok(s) = std::env::var("PARTWISE_NODE_ID") {
            if let Ok(v) = s.parse::<u32>() {
                cfg.node_id = v;
            }
        }

        if let Ok(s) = std::env::var("PARTWISE_CONSOLIDATE_THRESHOLD") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.consolidate_threshold = v.max(1);
            }
        }

        if let Ok(s) = std::env::var("PARTWISE_DEDUP") {
            cfg.dedup = s != "0";
        }

        if let Ok(s) = std::env::var("PARTWISE_SERIALIZE_OPERATORS") {
            cfg.serialize_operators = s != "0";
        }

        cfg
    }
}
