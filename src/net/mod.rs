mod collect;
mod control;
mod graph;
mod records;
mod scan_cmd;

pub use collect::{ScanSource, collect_device_records};
pub use control::set_device_blocked;
pub use graph::{DeviceGraph, DeviceLink, DeviceNode, Role, UNKNOWN, build_device_graph};
pub use records::DeviceRecord;
