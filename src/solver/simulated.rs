//! # Simulated IEEE 13-Bus Feeder
//!
//! An in-process stand-in for the external power flow engine. The topology and
//! base loads follow the IEEE 13 node test feeder reduced to a balanced
//! single-phase equivalent on a 4.16 kV / 1 MVA base.
//!
//! Voltages come from a linearized DistFlow sweep on squared magnitudes:
//!
//! V_to² = V_from² - 2 (r·P + x·Q)
//!
//! where P and Q are the downstream demand of each branch. Capacitors inject
//! reactive power proportional to V², so the sweep is repeated until the squared
//! voltages reach a fixed point. Losses are ignored.

use std::path::Path;

use tracing::debug;

use super::{PowerFlowSolver, SolverError};

/// Base voltage (kV line-to-line)
const BASE_KV: f64 = 4.16;
/// Base power (MVA)
const BASE_MVA: f64 = 1.0;
const FEET_PER_MILE: f64 = 5280.0;

/// Substation voltage boost with all three regulators in service (p.u.)
const REGULATOR_BOOST_PU: f64 = 0.0625;

const MAX_SWEEPS: usize = 50;
const SWEEP_TOLERANCE: f64 = 1e-10;

/// Bus names in reporting order; index 0 is the substation
const BUS_NAMES: [&str; 13] = [
    "650", "632", "633", "634", "645", "646", "671", "680", "684", "611", "652", "692", "675",
];

/// Positive-sequence line impedances (Ω/mile)
#[derive(Debug, Clone, Copy)]
enum LineCode {
    L601,
    L602,
    L603,
    L604,
    L605,
    L606,
    L607,
}

impl LineCode {
    fn ohms_per_mile(&self) -> (f64, f64) {
        match self {
            LineCode::L601 => (0.19, 0.60),
            LineCode::L602 => (0.60, 0.80),
            LineCode::L603 | LineCode::L604 | LineCode::L605 => (1.33, 1.35),
            LineCode::L606 => (0.80, 0.45),
            LineCode::L607 => (1.34, 0.51),
        }
    }
}

/// Series element between two buses, impedance in p.u.
#[derive(Debug, Clone)]
struct Branch {
    from: usize,
    to: usize,
    r_pu: f64,
    x_pu: f64,
}

impl Branch {
    fn line(from: &str, to: &str, code: LineCode, length_ft: f64) -> Self {
        let z_base = BASE_KV * BASE_KV / BASE_MVA;
        let miles = length_ft / FEET_PER_MILE;
        let (r, x) = code.ohms_per_mile();
        Self {
            from: bus_index(from),
            to: bus_index(to),
            r_pu: r * miles / z_base,
            x_pu: x * miles / z_base,
        }
    }

    fn series(from: &str, to: &str, r_pu: f64, x_pu: f64) -> Self {
        Self {
            from: bus_index(from),
            to: bus_index(to),
            r_pu,
            x_pu,
        }
    }
}

fn bus_index(name: &str) -> usize {
    BUS_NAMES
        .iter()
        .position(|b| *b == name)
        .unwrap_or_else(|| panic!("bus {name} missing from BUS_NAMES"))
}

#[derive(Debug, Clone)]
struct SimLoad {
    name: String,
    bus: usize,
    kw: f64,
    kvar: f64,
    /// kvar per kW, held constant across kW writes
    kvar_per_kw: f64,
}

impl SimLoad {
    fn set_kw(&mut self, kw: f64) {
        self.kw = kw;
        self.kvar = kw * self.kvar_per_kw;
    }

    fn set_kvar(&mut self, kvar: f64) {
        self.kvar = kvar;
        if self.kw > 0.0 {
            self.kvar_per_kw = kvar / self.kw;
        }
    }
}

#[derive(Debug, Clone)]
struct SimCapacitor {
    name: String,
    bus: usize,
    kvar: f64,
    closed: bool,
}

#[derive(Debug, Clone)]
struct SimRegulator {
    name: String,
    enabled: bool,
}

/// Compiled circuit state
#[derive(Debug, Clone)]
struct Circuit {
    branches: Vec<Branch>,
    loads: Vec<SimLoad>,
    capacitors: Vec<SimCapacitor>,
    regulators: Vec<SimRegulator>,
    voltages_pu: Vec<f64>,
}

impl Circuit {
    /// Build the IEEE 13-bus circuit with its published base loads
    fn ieee13() -> Self {
        // Ordered so every branch's `from` bus is fed by an earlier branch
        let branches = vec![
            Branch::line("650", "632", LineCode::L601, 2000.0),
            Branch::line("632", "633", LineCode::L602, 500.0),
            Branch::series("633", "634", 0.022, 0.04), // XFM-1, 500 kVA
            Branch::line("632", "645", LineCode::L603, 500.0),
            Branch::line("645", "646", LineCode::L603, 300.0),
            Branch::line("632", "671", LineCode::L601, 2000.0),
            Branch::line("671", "680", LineCode::L601, 1000.0),
            Branch::line("671", "684", LineCode::L604, 300.0),
            Branch::line("684", "611", LineCode::L605, 300.0),
            Branch::line("684", "652", LineCode::L607, 800.0),
            Branch::series("671", "692", 1e-6, 1e-6), // closed switch
            Branch::line("692", "675", LineCode::L606, 500.0),
        ];

        let load = |name: &str, bus: &str, kw: f64, kvar: f64| SimLoad {
            name: name.to_string(),
            bus: bus_index(bus),
            kw,
            kvar,
            kvar_per_kw: kvar / kw,
        };
        let loads = vec![
            load("671", "671", 1155.0, 660.0),
            load("634a", "634", 160.0, 110.0),
            load("634b", "634", 120.0, 90.0),
            load("634c", "634", 120.0, 90.0),
            load("645", "645", 170.0, 125.0),
            load("646", "646", 230.0, 132.0),
            load("692", "692", 170.0, 151.0),
            load("675a", "675", 485.0, 190.0),
            load("675b", "675", 68.0, 60.0),
            load("675c", "675", 290.0, 212.0),
            load("611", "611", 170.0, 80.0),
            load("652", "652", 128.0, 86.0),
        ];

        let capacitors = vec![
            SimCapacitor {
                name: "cap1".to_string(),
                bus: bus_index("675"),
                kvar: 600.0,
                closed: true,
            },
            SimCapacitor {
                name: "cap2".to_string(),
                bus: bus_index("611"),
                kvar: 100.0,
                closed: true,
            },
        ];

        let regulators = ["reg1", "reg2", "reg3"]
            .iter()
            .map(|name| SimRegulator {
                name: name.to_string(),
                enabled: true,
            })
            .collect();

        Self {
            branches,
            loads,
            capacitors,
            regulators,
            voltages_pu: vec![0.0; BUS_NAMES.len()],
        }
    }

    fn source_voltage_pu(&self) -> f64 {
        let enabled = self.regulators.iter().filter(|r| r.enabled).count() as f64;
        1.0 + REGULATOR_BOOST_PU * enabled / self.regulators.len().max(1) as f64
    }

    fn load_mut(&mut self, name: &str) -> Option<&mut SimLoad> {
        self.loads.iter_mut().find(|l| l.name.eq_ignore_ascii_case(name))
    }

    fn capacitor_mut(&mut self, name: &str) -> Option<&mut SimCapacitor> {
        self.capacitors
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn regulator_mut(&mut self, name: &str) -> Option<&mut SimRegulator> {
        self.regulators
            .iter_mut()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Fixed-point DistFlow sweep; returns squared voltages
    fn sweep(&self) -> Result<Vec<f64>, SolverError> {
        let n = BUS_NAMES.len();
        let v_source = self.source_voltage_pu();
        let mut v2 = vec![v_source * v_source; n];

        for sweep in 0..MAX_SWEEPS {
            // Net demand per bus (p.u.)
            let mut p = vec![0.0; n];
            let mut q = vec![0.0; n];
            for load in &self.loads {
                p[load.bus] += load.kw / 1000.0 / BASE_MVA;
                q[load.bus] += load.kvar / 1000.0 / BASE_MVA;
            }
            for cap in self.capacitors.iter().filter(|c| c.closed) {
                q[cap.bus] -= cap.kvar / 1000.0 / BASE_MVA * v2[cap.bus];
            }

            // Backward pass: accumulate downstream demand into each sending bus
            let mut p_down = p;
            let mut q_down = q;
            let mut flows = vec![(0.0, 0.0); self.branches.len()];
            for (idx, branch) in self.branches.iter().enumerate().rev() {
                flows[idx] = (p_down[branch.to], q_down[branch.to]);
                p_down[branch.from] += p_down[branch.to];
                q_down[branch.from] += q_down[branch.to];
            }

            // Forward pass
            let mut next = vec![0.0; n];
            next[0] = v_source * v_source;
            for (branch, (p_flow, q_flow)) in self.branches.iter().zip(&flows) {
                let v2_to = next[branch.from] - 2.0 * (branch.r_pu * p_flow + branch.x_pu * q_flow);
                if !v2_to.is_finite() || v2_to <= 0.0 {
                    return Err(SolverError::Divergence(format!(
                        "voltage collapse at bus {}",
                        BUS_NAMES[branch.to]
                    )));
                }
                next[branch.to] = v2_to;
            }

            let delta = next
                .iter()
                .zip(&v2)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            v2 = next;

            if delta < SWEEP_TOLERANCE {
                debug!(sweeps = sweep + 1, "simulated power flow converged");
                return Ok(v2);
            }
        }

        Err(SolverError::Divergence(format!(
            "no fixed point after {MAX_SWEEPS} sweeps"
        )))
    }
}

/// In-process power flow engine for the IEEE 13-bus feeder
#[derive(Debug, Default)]
pub struct SimulatedFeeder {
    circuit: Option<Circuit>,
}

impl SimulatedFeeder {
    /// Model reference accepted by `compile` besides `IEEE13Nodeckt.dss`
    pub const MODEL_NAME: &'static str = "ieee13";

    pub fn new() -> Self {
        Self::default()
    }

    fn accepts(model: &str) -> bool {
        if model.eq_ignore_ascii_case(Self::MODEL_NAME) {
            return true;
        }
        // Windows-style paths are common for this model; split on either separator
        let file = model.rsplit(['/', '\\']).next().unwrap_or(model);
        Path::new(file)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.eq_ignore_ascii_case("ieee13nodeckt"))
            .unwrap_or(false)
    }

    fn circuit(&self) -> Result<&Circuit, SolverError> {
        self.circuit.as_ref().ok_or(SolverError::NotCompiled)
    }

    fn circuit_mut(&mut self) -> Result<&mut Circuit, SolverError> {
        self.circuit.as_mut().ok_or(SolverError::NotCompiled)
    }
}

fn parse_number(element: &str, property: &str, value: &str) -> Result<f64, SolverError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| SolverError::InvalidValue {
            element: element.to_string(),
            property: property.to_string(),
            value: value.to_string(),
        })
}

fn parse_flag(element: &str, property: &str, value: &str) -> Result<bool, SolverError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        _ => Err(SolverError::InvalidValue {
            element: element.to_string(),
            property: property.to_string(),
            value: value.to_string(),
        }),
    }
}

impl PowerFlowSolver for SimulatedFeeder {
    fn compile(&mut self, model: &str) -> Result<(), SolverError> {
        if !Self::accepts(model) {
            return Err(SolverError::Compile {
                model: model.to_string(),
                reason: "only the IEEE 13 node feeder is available".to_string(),
            });
        }
        self.circuit = Some(Circuit::ieee13());
        Ok(())
    }

    fn set_element_property(
        &mut self,
        element: &str,
        property: &str,
        value: &str,
    ) -> Result<(), SolverError> {
        let circuit = self.circuit_mut()?;
        let (class, name) = element
            .split_once('.')
            .ok_or_else(|| SolverError::UnknownElement(element.to_string()))?;
        let unknown_property = || SolverError::UnknownProperty {
            element: element.to_string(),
            property: property.to_string(),
        };

        match class.to_ascii_lowercase().as_str() {
            "regcontrol" => {
                let enabled = match property.to_ascii_lowercase().as_str() {
                    "enabled" => parse_flag(element, property, value)?,
                    _ => return Err(unknown_property()),
                };
                let reg = circuit
                    .regulator_mut(name)
                    .ok_or_else(|| SolverError::UnknownElement(element.to_string()))?;
                reg.enabled = enabled;
            }
            "capacitor" => {
                let kvar = match property.to_ascii_lowercase().as_str() {
                    "kvar" => parse_number(element, property, value)?,
                    _ => return Err(unknown_property()),
                };
                let cap = circuit
                    .capacitor_mut(name)
                    .ok_or_else(|| SolverError::UnknownElement(element.to_string()))?;
                cap.kvar = kvar;
            }
            "load" => {
                let prop = property.to_ascii_lowercase();
                if prop != "kw" && prop != "kvar" {
                    return Err(unknown_property());
                }
                let amount = parse_number(element, property, value)?;
                let load = circuit
                    .load_mut(name)
                    .ok_or_else(|| SolverError::UnknownElement(element.to_string()))?;
                if prop == "kw" {
                    load.set_kw(amount);
                } else {
                    load.set_kvar(amount);
                }
            }
            _ => return Err(SolverError::UnknownElement(element.to_string())),
        }
        Ok(())
    }

    fn set_load_kw(&mut self, load: &str, kw: f64) -> Result<(), SolverError> {
        if !kw.is_finite() || kw < 0.0 {
            return Err(SolverError::InvalidValue {
                element: format!("load.{load}"),
                property: "kw".to_string(),
                value: kw.to_string(),
            });
        }
        let target = self
            .circuit_mut()?
            .load_mut(load)
            .ok_or_else(|| SolverError::UnknownElement(format!("load.{load}")))?;
        target.set_kw(kw);
        Ok(())
    }

    fn load_kw(&self, load: &str) -> Result<f64, SolverError> {
        self.circuit()?
            .loads
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(load))
            .map(|l| l.kw)
            .ok_or_else(|| SolverError::UnknownElement(format!("load.{load}")))
    }

    fn set_switch_state(&mut self, switch: &str, closed: bool) -> Result<(), SolverError> {
        let name = switch
            .strip_prefix("capacitor.")
            .or_else(|| switch.strip_prefix("Capacitor."))
            .unwrap_or(switch);
        let cap = self
            .circuit_mut()?
            .capacitor_mut(name)
            .ok_or_else(|| SolverError::UnknownElement(format!("capacitor.{name}")))?;
        cap.closed = closed;
        Ok(())
    }

    fn solve(&mut self) -> Result<(), SolverError> {
        let circuit = self.circuit_mut()?;
        let v2 = circuit.sweep()?;
        circuit.voltages_pu = v2.into_iter().map(f64::sqrt).collect();
        Ok(())
    }

    fn bus_voltage_magnitudes(&self) -> Result<Vec<f64>, SolverError> {
        Ok(self.circuit()?.voltages_pu.clone())
    }

    fn load_ids(&self) -> Result<Vec<String>, SolverError> {
        Ok(self.circuit()?.loads.iter().map(|l| l.name.clone()).collect())
    }

    fn switch_ids(&self) -> Result<Vec<String>, SolverError> {
        Ok(self
            .circuit()?
            .capacitors
            .iter()
            .map(|c| c.name.clone())
            .collect())
    }
}
