//! The scenario: owns the model and drives it period by period.
//!
//! # Run loop
//!
//! ```text
//! complete_init ─► for each period ──────────────────────────────────┐
//!                  │ 1. reset_period      6. update_summary            │
//!                  │ 2. carry_forward     7. emiss_ind                 │
//!                  │ 3. init_calc         8. debug XML, graph          │
//!                  │ 4. calc                                           │
//!                  │ 5. solve ─► unsolved periods                      │
//!                  └───────────────────────────────────────────────────┘
//!                ─► emissions artifact ─► climate model (once)
//! ```
//!
//! A period that fails to converge is recorded and the loop moves on. Output
//! files other than the run itself are best effort: failures are logged and
//! the simulation continues.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use marketplace::Marketplace;
use solver::{BisectionNrSolver, Solver, SolverConfig};
use tracing::{error, info, warn};
use types::{Configuration, Modeltime, Period, ToDebugXml, XmlWriter, Year};

use crate::climate::{ClimateModel, NoClimateModel};
use crate::debug_xml::{with_file_name_ending, DebugDocument};
use crate::graph::{write_dependency_graph, write_sector_dependencies};
use crate::hooks::{HookRunner, PeriodContext, ScenarioHook};
use crate::input::ScenarioInput;
use crate::world::WorldCalc;
use crate::{InputError, Region, Result, ScenarioError, World};

/// Where a scenario is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running(Period),
    Completed,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub scenario: String,
    pub all_solved: bool,
    /// Periods that did not converge, ascending.
    pub unsolved_periods: Vec<Period>,
    pub periods: usize,
    pub total_evaluations: usize,
}

/// Top-level orchestrator.
pub struct Scenario {
    name: String,
    config: Configuration,
    modeltime: Option<Modeltime>,
    world: Option<World>,
    marketplace: Option<Marketplace>,
    solver: Box<dyn Solver>,
    climate: Box<dyn ClimateModel>,
    hooks: HookRunner,
    unsolved_periods: Vec<Period>,
    state: RunState,
}

impl Scenario {
    /// Create a scenario with the default solver tuned from `config`.
    pub fn new(name: impl Into<String>, config: Configuration) -> Self {
        let solver = BisectionNrSolver::new(SolverConfig::from_configuration(&config));
        Self {
            name: name.into(),
            config,
            modeltime: None,
            world: None,
            marketplace: None,
            solver: Box::new(solver),
            climate: Box::new(NoClimateModel),
            hooks: HookRunner::new(),
            unsolved_periods: Vec::new(),
            state: RunState::NotStarted,
        }
    }

    pub fn with_solver(mut self, solver: Box<dyn Solver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_climate_model(mut self, climate: Box<dyn ClimateModel>) -> Self {
        self.climate = climate;
        self
    }

    pub fn with_modeltime(mut self, modeltime: Modeltime) -> Self {
        self.set_modeltime(modeltime);
        self
    }

    pub fn with_world(mut self, world: World) -> Self {
        self.world = Some(world);
        self
    }

    pub fn add_hook(&mut self, hook: Arc<dyn ScenarioHook>) {
        self.hooks.add(hook);
    }

    /// Model time can be supplied once; later attempts are ignored.
    pub fn set_modeltime(&mut self, modeltime: Modeltime) {
        if self.modeltime.is_some() {
            warn!("Modeltime already set; ignoring the later definition");
            return;
        }
        self.modeltime = Some(modeltime);
    }

    /// Add a region, replacing any region of the same name.
    pub fn add_region(&mut self, region: Region) {
        self.world.get_or_insert_with(World::new).add_region(region);
    }

    /// Merge an input document (base or add-on) into the scenario.
    pub fn apply_input(&mut self, input: &ScenarioInput) -> std::result::Result<(), InputError> {
        if let Some(name) = &input.name {
            self.name = name.clone();
        }
        if let Some(modeltime) = input.modeltime {
            self.set_modeltime(modeltime);
        }
        for region in input.build_regions()? {
            self.add_region(region);
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn modeltime(&self) -> Option<&Modeltime> {
        self.modeltime.as_ref()
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn marketplace(&self) -> Option<&Marketplace> {
        self.marketplace.as_ref()
    }

    pub fn climate_model(&self) -> &dyn ClimateModel {
        self.climate.as_ref()
    }

    /// Periods that failed to converge, ascending.
    pub fn unsolved_periods(&self) -> &[Period] {
        &self.unsolved_periods
    }

    /// Emissions of one gas per region as (year, quantity) series.
    pub fn emissions_quantity_curves(&self, gas: &str) -> BTreeMap<String, Vec<(Year, f64)>> {
        match (&self.world, &self.modeltime) {
            (Some(world), Some(modeltime)) => world.emissions_quantity_curves(gas, modeltime),
            _ => BTreeMap::new(),
        }
    }

    // =========================================================================
    // Running
    // =========================================================================

    /// Register markets, calibrate and initialize prices.
    ///
    /// Called by [`run`](Self::run) when not called beforehand.
    pub fn complete_init(&mut self) -> Result<()> {
        if self.marketplace.is_some() {
            return Ok(());
        }
        let world = self.world.as_mut().ok_or(ScenarioError::MissingWorld)?;
        let modeltime = self.modeltime.as_ref().ok_or(ScenarioError::MissingModeltime)?;

        let mut marketplace = Marketplace::new(modeltime.max_period());
        world.complete_init(&mut marketplace, modeltime)?;
        marketplace.init_prices()?;
        info!(
            scenario = %self.name,
            markets = marketplace.len(),
            periods = modeltime.max_period(),
            "Scenario initialized"
        );
        self.marketplace = Some(marketplace);
        Ok(())
    }

    /// Run every period, then hand the emissions to the climate model.
    ///
    /// `file_name_ending` is inserted before the extension of every output
    /// file name so several runs can share one output directory.
    ///
    /// # Phases per period
    ///
    /// 1. Reset supplies and demands, carry the previous period forward
    /// 2. Hook: on_period_start
    /// 3. World init_calc and a first calc at the starting prices
    /// 4. Solve; record the period when it does not converge
    /// 5. Hook: on_solve
    /// 6. Summaries and emissions
    /// 7. Debug XML and dependency graph
    /// 8. Hook: on_period_end
    pub fn run(&mut self, file_name_ending: &str) -> Result<RunSummary> {
        if self.state == RunState::Completed {
            return Err(ScenarioError::AlreadyCompleted);
        }
        self.complete_init()?;

        let (Some(modeltime), Some(world), Some(marketplace)) = (
            self.modeltime.as_ref(),
            self.world.as_mut(),
            self.marketplace.as_mut(),
        ) else {
            return Err(ScenarioError::MissingWorld);
        };

        let output_dir = PathBuf::from(self.config.get_file("outputDirectory", "."));
        if let Err(err) = fs::create_dir_all(&output_dir) {
            error!(path = %output_dir.display(), %err, "Failed to create output directory");
        }

        let mut debug = open_debug_document(&self.config, &output_dir, file_name_ending, &self.name);
        if self.config.get_bool("PrintSectorDependencies", false) {
            let path = output_dir.join("SectorDependencies.csv");
            if let Err(err) = write_file(&path, |out| write_sector_dependencies(world, out)) {
                error!(path = %path.display(), %err, "Failed to write sector dependencies");
            }
        }
        let print_graphs = self.config.get_bool("PrintDependencyGraphs", false);
        let graph_name = self.config.get_file("dependencyGraphName", "graph");

        self.hooks.on_run_start(&self.name, modeltime.max_period());
        self.unsolved_periods.clear();
        let mut total_evaluations = 0;

        for period in modeltime.periods() {
            self.state = RunState::Running(period);
            let year = modeltime.period_to_year(period);
            info!("Period {period}: {year}");

            // Phase 1: Fresh accumulators, previous period's committed state
            marketplace.reset_period(period);
            marketplace.carry_forward(period);

            // Phase 2: Hook - period start
            if !self.hooks.is_empty() {
                let ctx = PeriodContext::from_marketplace(marketplace, period, year);
                self.hooks.on_period_start(&ctx);
            }

            // Phase 3: Initial calculation at the starting prices
            world.init_calc(marketplace, modeltime, period);
            world.calc(marketplace, modeltime, period);

            // Phase 4: Clear the markets
            let outcome = {
                let mut calc = WorldCalc {
                    world: &mut *world,
                    modeltime,
                };
                self.solver.solve(marketplace, &mut calc, period)
            };
            total_evaluations += outcome.evaluations;
            if !outcome.solved() {
                self.unsolved_periods.push(period);
            }

            // Phase 5: Hook - solve outcome
            let ctx = (!self.hooks.is_empty())
                .then(|| PeriodContext::from_marketplace(marketplace, period, year));
            if let Some(ctx) = &ctx {
                self.hooks.on_solve(&outcome, ctx);
            }

            // Phase 6: Summaries
            world.update_summary(marketplace, period);
            world.emiss_ind(period);

            // Phase 7: Per-period output
            if let Some(doc) = debug.as_mut() {
                let items: [&dyn ToDebugXml; 2] = [&*world, &*marketplace];
                if let Err(err) = doc.write_period(period, year, &items) {
                    error!(path = %doc.path().display(), %err, "Failed to write debug document");
                    debug = None;
                }
            }
            if print_graphs {
                let path = output_dir.join(format!("{graph_name}_{period}.dot"));
                let result =
                    write_file(&path, |out| write_dependency_graph(world, &graph_name, period, out));
                if let Err(err) = result {
                    error!(path = %path.display(), %err, "Failed to write dependency graph");
                }
            }

            // Phase 8: Hook - period end
            if let Some(ctx) = &ctx {
                self.hooks.on_period_end(ctx);
            }
        }
        self.state = RunState::Completed;

        // The artifact is closed before the climate model reads it.
        let emissions = world.emissions_totals(modeltime);
        let file = self.config.get_file("emissionsFileName", "emissions.csv");
        let artifact = output_dir.join(with_file_name_ending(&file, file_name_ending));
        if let Err(err) = emissions.write_csv_file(&artifact) {
            error!(path = %artifact.display(), %err, "Failed to write emissions");
        }
        if let Err(err) = self.climate.run(&artifact, &emissions) {
            error!(%err, "Climate model failed");
        }

        if let Some(doc) = debug {
            let path = doc.path().to_path_buf();
            if let Err(err) = doc.finish() {
                error!(path = %path.display(), %err, "Failed to close debug document");
            }
        }

        if self.unsolved_periods.is_empty() {
            info!("All model periods solved correctly.");
        } else {
            warn!(
                "The following model periods did not solve: {:?}",
                self.unsolved_periods
            );
        }

        let summary = RunSummary {
            scenario: self.name.clone(),
            all_solved: self.unsolved_periods.is_empty(),
            unsolved_periods: self.unsolved_periods.clone(),
            periods: modeltime.max_period(),
            total_evaluations,
        };
        self.hooks.on_run_end(&summary);
        Ok(summary)
    }
}

fn open_debug_document(
    config: &Configuration,
    output_dir: &Path,
    file_name_ending: &str,
    scenario: &str,
) -> Option<DebugDocument> {
    let file = config.get_file("xmlDebugFileName", "debug.xml");
    let path = output_dir.join(with_file_name_ending(&file, file_name_ending));
    match DebugDocument::create(&path, scenario) {
        Ok(doc) => Some(doc),
        Err(err) => {
            error!(path = %path.display(), %err, "Failed to open debug document");
            None
        }
    }
}

/// Create `path`, run `write` against it, flush.
fn write_file(path: &Path, write: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write(&mut out)?;
    out.flush()
}

impl ToDebugXml for Scenario {
    fn to_debug_xml(&self, period: Period, out: &mut XmlWriter<'_>) -> io::Result<()> {
        out.open("Scenario", &[("name", self.name.as_str())])?;
        if let Some(world) = &self.world {
            world.to_debug_xml(period, out)?;
        }
        if let Some(marketplace) = &self.marketplace {
            marketplace.to_debug_xml(period, out)?;
        }
        out.close("Scenario")
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("modeltime", &self.modeltime)
            .field("solver", &self.solver.name())
            .field("climate", &self.climate.name())
            .field("hooks", &self.hooks)
            .field("unsolved_periods", &self.unsolved_periods)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use technologies::{GenericTechnology, SimpleLandAllocator};

    use crate::Sector;

    fn config_in(dir: &Path) -> Configuration {
        let mut config = Configuration::new();
        config.set("outputDirectory", dir.display().to_string());
        config
    }

    /// One widget factory vintage per period.
    fn simple_world(modeltime: &Modeltime) -> World {
        let sector = modeltime.periods().fold(
            Sector::new("Widgets", 1.0).with_demand(10.0, 0.5),
            |sector, period| {
                sector.with_technology(Box::new(
                    GenericTechnology::new("factory", modeltime.period_to_year(period))
                        .with_cost(0.5)
                        .with_capacity(40.0),
                ))
            },
        );
        World::new().with_region(
            Region::new("USA", Box::new(SimpleLandAllocator::new())).with_sector(sector),
        )
    }

    fn simple_scenario(config: Configuration, end_year: Year) -> Scenario {
        let modeltime = Modeltime::new(1975, end_year, 15).unwrap();
        Scenario::new("simple", config)
            .with_modeltime(modeltime)
            .with_world(simple_world(&modeltime))
    }

    #[test]
    fn test_missing_world_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut scenario = Scenario::new("empty", config_in(dir.path()))
            .with_modeltime(Modeltime::new(1975, 2005, 15).unwrap());
        assert!(matches!(scenario.run(""), Err(ScenarioError::MissingWorld)));
        assert_eq!(scenario.state(), RunState::NotStarted);
    }

    #[test]
    fn test_missing_modeltime_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let modeltime = Modeltime::new(1975, 2005, 15).unwrap();
        let mut scenario =
            Scenario::new("no-time", config_in(dir.path())).with_world(simple_world(&modeltime));
        assert!(matches!(scenario.run(""), Err(ScenarioError::MissingModeltime)));
    }

    #[test]
    fn test_second_modeltime_ignored() {
        let mut scenario = Scenario::new("s", Configuration::new())
            .with_modeltime(Modeltime::new(1975, 2005, 15).unwrap());
        scenario.set_modeltime(Modeltime::new(2000, 2100, 5).unwrap());
        assert_eq!(scenario.modeltime().unwrap().start_year(), 1975);
    }

    #[test]
    fn test_run_solves_and_completes() {
        let dir = tempfile::tempdir().unwrap();
        let mut scenario = simple_scenario(config_in(dir.path()), 2005);

        let summary = scenario.run("").unwrap();
        assert!(summary.all_solved);
        assert_eq!(summary.periods, 3);
        assert!(summary.total_evaluations > 0);
        assert_eq!(scenario.state(), RunState::Completed);
        assert!(matches!(scenario.run(""), Err(ScenarioError::AlreadyCompleted)));

        // 10 p^-0.5 = 40 (1 - 0.5 / p)
        let price = scenario.marketplace().unwrap().price("Widgets", "USA", 2).unwrap();
        let demand = 10.0 * price.powf(-0.5);
        let supply = 40.0 * (1.0 - 0.5 / price);
        assert!((demand - supply).abs() <= 1e-3 * demand.max(supply) + 1e-6);

        assert!(dir.path().join("debug.xml").exists());
        assert!(dir.path().join("emissions.csv").exists());
    }

    #[test]
    fn test_file_name_ending_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut scenario = simple_scenario(config_in(dir.path()), 1990);
        scenario.run("_b").unwrap();
        assert!(dir.path().join("debug_b.xml").exists());
        assert!(dir.path().join("emissions_b.csv").exists());
    }

    #[test]
    fn test_debug_document_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.set("xmlDebugFileName", "missing-dir/debug.xml");
        let mut scenario = simple_scenario(config, 1990);
        let summary = scenario.run("").unwrap();
        assert!(summary.all_solved);
        assert!(!dir.path().join("missing-dir/debug.xml").exists());
    }
}
