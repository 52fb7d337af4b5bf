//! Built-in target devices.

use qcbench_compile::{BasisGates, CouplingMap};

/// A coupling map plus the native gate basis a compiler may target.
#[derive(Debug, Clone)]
pub struct TargetDevice {
    /// Registry id.
    pub id: String,
    /// Physical connectivity.
    pub coupling_map: CouplingMap,
    /// Native gates.
    pub basis_gates: BasisGates,
}

impl TargetDevice {
    /// Create a device.
    pub fn new(id: impl Into<String>, coupling_map: CouplingMap, basis_gates: BasisGates) -> Self {
        Self {
            id: id.into(),
            coupling_map,
            basis_gates,
        }
    }

    /// Number of physical qubits.
    pub fn num_qubits(&self) -> u32 {
        self.coupling_map.num_qubits()
    }
}

/// 20 qubits on a line, `{cx, u}` basis.
pub fn linear_20() -> TargetDevice {
    TargetDevice::new("linear_20", CouplingMap::linear(20), BasisGates::cx_u())
}

/// 5x5 nearest-neighbour grid, `{rx, ry, rz, cx}` basis.
pub fn grid_5x5() -> TargetDevice {
    TargetDevice::new(
        "grid_5x5",
        CouplingMap::grid(5, 5),
        BasisGates::new(["rx", "ry", "rz", "cx"]),
    )
}

const HEAVY_HEX_27_EDGES: [(u32, u32); 28] = [
    (0, 1),
    (1, 2),
    (1, 4),
    (2, 3),
    (3, 5),
    (4, 7),
    (5, 8),
    (6, 7),
    (7, 10),
    (8, 9),
    (8, 11),
    (10, 12),
    (11, 14),
    (12, 13),
    (12, 15),
    (13, 14),
    (14, 16),
    (15, 18),
    (16, 19),
    (17, 18),
    (18, 21),
    (19, 20),
    (19, 22),
    (21, 23),
    (22, 25),
    (23, 24),
    (24, 25),
    (25, 26),
];

/// 27-qubit heavy-hex lattice (Falcon layout), `{rz, sx, x, cx}` basis.
pub fn heavy_hex_27() -> TargetDevice {
    TargetDevice::new(
        "heavy_hex_27",
        CouplingMap::from_edges(27, HEAVY_HEX_27_EDGES),
        BasisGates::ibm(),
    )
}

/// Every built-in device.
pub fn builtin_devices() -> Vec<TargetDevice> {
    vec![linear_20(), grid_5x5(), heavy_hex_27()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_device_sizes() {
        let sizes: Vec<(String, u32)> = builtin_devices()
            .into_iter()
            .map(|d| (d.id.clone(), d.num_qubits()))
            .collect();
        assert_eq!(
            sizes,
            vec![
                ("linear_20".to_string(), 20),
                ("grid_5x5".to_string(), 25),
                ("heavy_hex_27".to_string(), 27),
            ]
        );
    }

    #[test]
    fn test_heavy_hex_is_connected() {
        let device = heavy_hex_27();
        for q in 1..27 {
            assert!(device.coupling_map.distance(0, q).is_some(), "qubit {q} unreachable");
        }
        assert_eq!(device.coupling_map.edges().len(), 28);
    }

    #[test]
    fn test_heavy_hex_max_degree_three() {
        let device = heavy_hex_27();
        for q in 0..27 {
            assert!(device.coupling_map.neighbors(q).count() <= 3);
        }
    }
}
