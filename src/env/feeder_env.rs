use tracing::{debug, info, warn};

use super::{BoxSpace, DiscreteSpace, Environment, Info, RenderMode, Step};
use crate::config::{Config, FeederConfig};
use crate::domain::{Action, CapacitorState, FeederModel, Observation, ACTION_COUNT};
use crate::error::{EnvError, EnvResult};
use crate::reward::RewardShaper;
use crate::search::{apply_load_configuration, LoadConfigSearch};
use crate::solver::{PowerFlowSolver, SolverError};

/// Declared observation bounds (p.u.), looser than the search's legality band
pub const OBSERVATION_LOW_PU: f64 = 0.0;
pub const OBSERVATION_HIGH_PU: f64 = 2.0;

/// Capacitor switching environment on a fixed distribution feeder
///
/// Each `reset` draws a fresh voltage-legal load configuration; each `step`
/// switches the two capacitor banks, solves and scores the voltage profile.
/// Episodes are one step long, so `done` is always true.
///
/// Capacitor state is not touched by `reset`: the banks keep whatever the
/// previous `step` set, and only the loads are re-randomized.
pub struct FeederEnv<S: PowerFlowSolver> {
    solver: S,
    feeder: FeederModel,
    search: LoadConfigSearch,
    shaper: RewardShaper,
    capacitors: CapacitorState,
    action_space: DiscreteSpace,
    observation_space: BoxSpace,
    last_observation: Option<Observation>,
    episodes: u64,
}

impl<S: PowerFlowSolver> FeederEnv<S> {
    /// Compile the feeder, disable regulation and open both capacitor banks
    pub fn new(mut solver: S, config: &Config) -> EnvResult<Self> {
        config.validate().map_err(EnvError::InvalidConfig)?;

        solver
            .compile(&config.feeder.model)
            .map_err(EnvError::EngineStartup)?;
        let feeder = prepare_feeder(&mut solver, &config.feeder)?;
        let capacitors = CapacitorState::new(feeder.capacitor_ids().clone());

        info!(
            model = %config.feeder.model,
            buses = feeder.bus_count(),
            loads = feeder.load_count(),
            capacitors = ?feeder.capacitor_ids(),
            "feeder environment initialized"
        );

        Ok(Self {
            observation_space: BoxSpace::new(
                OBSERVATION_LOW_PU,
                OBSERVATION_HIGH_PU,
                feeder.bus_count(),
            ),
            action_space: DiscreteSpace::new(ACTION_COUNT),
            search: LoadConfigSearch::new(config.search.clone(), config.env.random_seed),
            shaper: RewardShaper::new(config.reward.clone()),
            solver,
            feeder,
            capacitors,
            last_observation: None,
            episodes: 0,
        })
    }

    /// Re-seed the load sampler
    pub fn seed(&mut self, seed: u64) {
        self.search.reseed(seed);
    }

    pub fn feeder(&self) -> &FeederModel {
        &self.feeder
    }

    pub fn capacitor_state(&self) -> &CapacitorState {
        &self.capacitors
    }

    pub fn last_observation(&self) -> Option<&Observation> {
        self.last_observation.as_ref()
    }

    /// Completed resets since construction
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    fn observe(&mut self) -> EnvResult<Observation> {
        let observation = Observation::new(self.solver.bus_voltage_magnitudes()?);
        if observation.len() != self.feeder.bus_count() {
            warn!(
                expected = self.feeder.bus_count(),
                got = observation.len(),
                "solver reported an unexpected number of buses"
            );
            return Err(EnvError::Solver(SolverError::InvalidValue {
                element: "circuit".to_string(),
                property: "bus_count".to_string(),
                value: observation.len().to_string(),
            }));
        }
        self.last_observation = Some(observation.clone());
        Ok(observation)
    }
}

impl<S: PowerFlowSolver> Environment for FeederEnv<S> {
    type Observation = Observation;
    type Action = i64;

    fn reset(&mut self) -> EnvResult<Observation> {
        let loads = self.search.generate(&mut self.solver, &self.feeder)?;

        apply_load_configuration(&mut self.solver, &self.feeder, &loads)?;
        self.solver.solve()?;
        let observation = self.observe()?;

        self.episodes += 1;
        info!(
            episode = self.episodes,
            total_kw = loads.total_kw(),
            min_pu = ?observation.min(),
            max_pu = ?observation.max(),
            "episode reset"
        );
        Ok(observation)
    }

    fn step(&mut self, action: i64) -> EnvResult<Step<Observation>> {
        let action = Action::try_from(action)?;
        let pattern = action.pattern();

        for (bank, closed) in pattern.as_array().into_iter().enumerate() {
            let id = &self.feeder.capacitor_ids()[bank];
            self.solver.set_switch_state(id, closed)?;
            self.capacitors.set_bank(bank, closed);
        }

        self.solver.solve()?;
        let observation = self.observe()?;
        let reward = self.shaper.reward(observation.as_slice());

        let zones = self.shaper.zone_counts(observation.as_slice());
        debug!(
            %action,
            reward,
            nominal = zones.nominal,
            moderate = zones.moderate,
            severe = zones.severe,
            "step complete"
        );

        Ok(Step {
            observation,
            reward,
            done: true,
            info: Info::new(),
        })
    }

    fn render(&self, _mode: RenderMode) {}

    fn action_space(&self) -> &DiscreteSpace {
        &self.action_space
    }

    fn observation_space(&self) -> &BoxSpace {
        &self.observation_space
    }
}

/// Construction-time solver setup; every failure is a startup failure
fn prepare_feeder<S: PowerFlowSolver>(
    solver: &mut S,
    config: &FeederConfig,
) -> EnvResult<FeederModel> {
    let startup = EnvError::EngineStartup;

    for regulator in &config.regulators {
        solver
            .set_element_property(regulator, "enabled", "false")
            .map_err(startup)?;
    }

    let load_ids = solver.load_ids().map_err(startup)?;
    let base_load_kw = load_ids
        .iter()
        .map(|id| solver.load_kw(id))
        .collect::<Result<Vec<_>, _>>()
        .map_err(startup)?;

    let switch_ids = solver.switch_ids().map_err(startup)?;
    let capacitor_ids: [String; 2] = switch_ids.try_into().map_err(|ids: Vec<String>| {
        startup(SolverError::Compile {
            model: config.model.clone(),
            reason: format!("expected 2 switchable capacitors, found {}", ids.len()),
        })
    })?;

    let kvar = config.capacitor_kvar.to_string();
    for cap in &capacitor_ids {
        solver
            .set_element_property(&format!("capacitor.{cap}"), "kvar", &kvar)
            .map_err(startup)?;
        solver.set_switch_state(cap, false).map_err(startup)?;
    }

    solver.solve().map_err(startup)?;
    let bus_count = solver.bus_voltage_magnitudes().map_err(startup)?.len();
    if bus_count == 0 {
        return Err(startup(SolverError::Compile {
            model: config.model.clone(),
            reason: "model has no buses".to_string(),
        }));
    }

    FeederModel::new(load_ids, base_load_kw, capacitor_ids, bus_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::MockPowerFlowSolver;
    use std::sync::{Arc, Mutex};

    /// Mock that accepts the construction sequence and logs property writes
    fn constructible_mock(
        switches: Vec<&'static str>,
        solves: usize,
        log: Arc<Mutex<Vec<String>>>,
    ) -> MockPowerFlowSolver {
        let mut mock = MockPowerFlowSolver::new();
        mock.expect_compile().times(1).returning(|_: &str| Ok(()));
        let props = log.clone();
        mock.expect_set_element_property().returning(
            move |element: &str, property: &str, value: &str| {
                props
                    .lock()
                    .unwrap()
                    .push(format!("{element}.{property}={value}"));
                Ok(())
            },
        );
        mock.expect_load_ids()
            .returning(|| Ok(vec!["l1".to_string(), "l2".to_string()]));
        mock.expect_load_kw().returning(|_: &str| Ok(100.0));
        let switch_ids: Vec<String> = switches.into_iter().map(String::from).collect();
        mock.expect_switch_ids()
            .returning(move || Ok(switch_ids.clone()));
        let switches_log = log;
        mock.expect_set_switch_state()
            .returning(move |switch: &str, closed: bool| {
                switches_log
                    .lock()
                    .unwrap()
                    .push(format!("switch {switch}={closed}"));
                Ok(())
            });
        mock.expect_solve().times(solves).returning(|| Ok(()));
        mock.expect_bus_voltage_magnitudes()
            .returning(|| Ok(vec![1.0, 0.97, 1.02]));
        mock
    }

    #[test]
    fn test_construction_disables_regulators_and_opens_capacitors() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mock = constructible_mock(vec!["cap1", "cap2"], 1, log.clone());

        let env = FeederEnv::new(mock, &Config::default()).unwrap();

        assert_eq!(env.feeder().bus_count(), 3);
        assert_eq!(env.observation_space().dim, 3);
        assert_eq!(env.action_space().n, 4);
        assert_eq!(env.capacitor_state().is_closed("cap1"), Some(false));

        let log = log.lock().unwrap();
        assert_eq!(
            log.as_slice(),
            &[
                "regcontrol.Reg1.enabled=false",
                "regcontrol.Reg2.enabled=false",
                "regcontrol.Reg3.enabled=false",
                "capacitor.cap1.kvar=600",
                "switch cap1=false",
                "capacitor.cap2.kvar=600",
                "switch cap2=false",
            ]
        );
    }

    #[test]
    fn test_invalid_action_performs_no_solve() {
        let log = Arc::new(Mutex::new(Vec::new()));
        // The only solve allowed is the one during construction
        let mock = constructible_mock(vec!["cap1", "cap2"], 1, log.clone());
        let mut env = FeederEnv::new(mock, &Config::default()).unwrap();
        let writes_before = log.lock().unwrap().len();

        for bad in [-1, 4, 99] {
            assert!(matches!(env.step(bad), Err(EnvError::InvalidAction(v)) if v == bad));
        }
        assert_eq!(log.lock().unwrap().len(), writes_before);
    }

    #[test]
    fn test_compile_failure_is_startup_failure() {
        let mut mock = MockPowerFlowSolver::new();
        mock.expect_compile().returning(|model: &str| {
            Err(SolverError::Compile {
                model: model.to_string(),
                reason: "engine unavailable".to_string(),
            })
        });
        mock.expect_solve().never();

        let result = FeederEnv::new(mock, &Config::default());
        assert!(matches!(result, Err(EnvError::EngineStartup(_))));
    }

    #[test]
    fn test_wrong_capacitor_count_is_startup_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mock = constructible_mock(vec!["cap1"], 0, log);

        let result = FeederEnv::new(mock, &Config::default());
        assert!(matches!(result, Err(EnvError::EngineStartup(_))));
    }

    #[test]
    fn test_invalid_config_rejected_before_compile() {
        let mut mock = MockPowerFlowSolver::new();
        mock.expect_compile().never();

        let mut config = Config::default();
        config.search.max_attempts = 0;
        let result = FeederEnv::new(mock, &config);
        assert!(matches!(result, Err(EnvError::InvalidConfig(_))));
    }
}
