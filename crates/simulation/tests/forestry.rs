//! End-to-end forestry runs: rotation lag, calibration and future markets.

use std::path::Path;

use simulation::{
    CumulativeEmissionsClimate, Scenario, ScenarioInput, TemperatureTarget, TrialStatus,
};
use technologies::{discount_factor, LandAllocator, CAL_VAR_COST};
use types::Configuration;

/// Four 15-year periods, one softwood vintage per period, rotation of one
/// period. The 1975 vintage is calibrated one rotation ahead.
const FOREST_WORLD: &str = r#"{
    "name": "forestry",
    "modeltime": { "startYear": 1975, "endYear": 2020, "timestep": 15 },
    "regions": [{
        "name": "USA",
        "landTypes": { "Forest": { "totalArea": 200.0, "unmanagedRate": 0.1 } },
        "sectors": [{
            "name": "Forest",
            "price": 2.0,
            "futurePrice": 2.0,
            "baseDemand": 100.0,
            "demandElasticity": 0.5,
            "calibratedPrices": { "1975": 2.0 },
            "technologies": [
                { "type": "ForestProductionTechnology", "name": "softwood", "year": 1975,
                  "landType": "Forest", "rotationPeriod": 15, "variableCost": 0.5,
                  "calProduction": 100.0, "calYield": 2.0, "futureProduction": 110.0,
                  "ghgs": [{ "name": "CO2", "coefficient": 0.01 }] },
                { "type": "ForestProductionTechnology", "name": "softwood", "year": 1990,
                  "landType": "Forest", "rotationPeriod": 15, "variableCost": 0.5,
                  "ghgs": [{ "name": "CO2", "coefficient": 0.01 }] },
                { "type": "ForestProductionTechnology", "name": "softwood", "year": 2005,
                  "landType": "Forest", "rotationPeriod": 15, "variableCost": 0.5,
                  "ghgs": [{ "name": "CO2", "coefficient": 0.01 }] },
                { "type": "ForestProductionTechnology", "name": "softwood", "year": 2020,
                  "landType": "Forest", "rotationPeriod": 15, "variableCost": 0.5,
                  "ghgs": [{ "name": "CO2", "coefficient": 0.01 }] }
            ]
        }]
    }]
}"#;

fn scenario(json: &str, dir: &Path) -> Scenario {
    let mut config = Configuration::new();
    config.set("outputDirectory", dir.display().to_string());
    config.set("solverMaxEvaluations", 300.0);
    let mut scenario = Scenario::new("unnamed", config);
    scenario
        .apply_input(&ScenarioInput::from_json_str(json).unwrap())
        .unwrap();
    scenario
}

fn forest_output(scenario: &Scenario, period: usize) -> f64 {
    scenario
        .world()
        .unwrap()
        .region("USA")
        .unwrap()
        .sector("Forest")
        .unwrap()
        .summary(period)
        .unwrap()
        .output
}

#[test]
fn test_forest_scenario_solves_every_period() {
    let dir = tempfile::tempdir().unwrap();
    let mut scenario = scenario(FOREST_WORLD, dir.path());
    let summary = scenario.run("").unwrap();
    assert!(summary.all_solved, "unsolved: {:?}", summary.unsolved_periods);

    let mp = scenario.marketplace().unwrap();
    // Calibrated harvest of 100 meets demand 100 (p / 2)^-0.5 at p = 2.
    assert!((mp.price("Forest", "USA", 0).unwrap() - 2.0).abs() < 0.01);
    // The calibrated stand of 110 arrives one rotation later.
    let expected = 2.0 * (100.0f64 / 110.0).powi(2);
    assert!((mp.price("Forest", "USA", 1).unwrap() - expected).abs() < 0.01);
    // Nothing is delivered past the horizon.
    assert_eq!(mp.supply("FutureForest", "USA", 3).unwrap(), 0.0);
}

#[test]
fn test_harvest_lags_planting_by_one_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let mut scenario = scenario(FOREST_WORLD, dir.path());
    scenario.run("").unwrap();

    let land = scenario.world().unwrap().region("USA").unwrap().land_allocator();
    // Period 0 harvests the calibrated stand: 50 × 2.
    assert!((forest_output(&scenario, 0) - 100.0).abs() < 1e-9);
    for period in 1..4 {
        let harvested = land.land_allocation("Forest", "softwood", period)
            * land.yield_for("Forest", "softwood", period);
        let output = forest_output(&scenario, period);
        assert!(
            (output - harvested).abs() < 1e-6,
            "period {period}: output {output}, harvest {harvested}"
        );
        assert!(output > 0.0);
    }

    // What was sold on the future market in period 2 is harvested in 3.
    let mp = scenario.marketplace().unwrap();
    let sold = mp.supply("FutureForest", "USA", 2).unwrap();
    assert!((sold - forest_output(&scenario, 3)).abs() < 1e-6);
}

#[test]
fn test_future_sales_match_harvest_under_productivity_growth() {
    let json = FOREST_WORLD.replace(
        r#""variableCost": 0.5,"#,
        r#""variableCost": 0.5, "agProdChange": 0.01,"#,
    );
    let dir = tempfile::tempdir().unwrap();
    let mut scenario = scenario(&json, dir.path());
    let summary = scenario.run("").unwrap();
    assert!(summary.all_solved, "unsolved: {:?}", summary.unsolved_periods);

    let mp = scenario.marketplace().unwrap();
    for period in 1..3 {
        let sold = mp.supply("FutureForest", "USA", period).unwrap();
        let harvested = forest_output(&scenario, period + 1);
        assert!(harvested > 0.0);
        assert!(
            (sold - harvested).abs() <= 1e-9 * harvested,
            "period {period}: sold {sold}, harvested {harvested}"
        );
    }

    // Yield compounds at 1% a year across the whole horizon.
    let land = scenario.world().unwrap().region("USA").unwrap().land_allocator();
    let base = land.yield_for("Forest", "softwood", 1);
    let last = land.yield_for("Forest", "softwood", 3);
    assert!((last / base - 1.01f64.powi(30)).abs() < 1e-9);
}

#[test]
fn test_uncalibrated_first_vintage_harvests_nothing() {
    let json = FOREST_WORLD
        .replace(r#""calProduction": 100.0, "calYield": 2.0, "futureProduction": 110.0,"#, "");
    let dir = tempfile::tempdir().unwrap();
    let mut scenario = scenario(&json, dir.path());
    scenario.run("").unwrap();
    assert_eq!(forest_output(&scenario, 0), 0.0);
}

#[test]
fn test_calibration_survives_the_run_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let mut scenario = scenario(FOREST_WORLD, dir.path());
    scenario.complete_init().unwrap();

    let snapshot = |scenario: &Scenario| -> Vec<(Option<u64>, Option<u64>)> {
        let land = scenario.world().unwrap().region("USA").unwrap().land_allocator();
        (0..4)
            .map(|p| {
                (
                    land.cal_land_allocation("Forest", "softwood", p).map(f64::to_bits),
                    land.cal_observed_yield("Forest", "softwood", p).map(f64::to_bits),
                )
            })
            .collect()
    };
    let before = snapshot(&scenario);
    assert_eq!(before[0].0, Some(50.0f64.to_bits()));
    assert_eq!(before[1].0, Some(55.0f64.to_bits()));
    assert_eq!(before[2], (None, None));

    scenario.run("").unwrap();
    assert_eq!(snapshot(&scenario), before);
}

#[test]
fn test_calibrated_cost_flows_to_later_vintages() {
    let dir = tempfile::tempdir().unwrap();
    let mut scenario = scenario(FOREST_WORLD, dir.path());
    scenario.run("").unwrap();

    let mp = scenario.marketplace().unwrap();
    let expected = 2.0 - (0.1 / discount_factor(0.02, 15)) / 2.0;
    for period in 1..4 {
        let carried = mp
            .market_info("Forest", "USA", period)
            .and_then(|info| info.get_double(CAL_VAR_COST))
            .unwrap();
        assert!((carried - expected).abs() < 1e-12, "period {period}");
    }
}

#[test]
fn test_temperature_target_after_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut scenario = scenario(FOREST_WORLD, dir.path())
        .with_climate_model(Box::new(CumulativeEmissionsClimate::new("CO2", 0.001)));
    scenario.run("").unwrap();

    let climate = scenario.climate_model();
    let t2020 = climate.temperature(2020).unwrap();
    assert!(t2020 > 0.0);
    assert_eq!(climate.temperature(1975), Some(0.0));

    let target = TemperatureTarget::new(t2020, 1975, 2020);
    assert_eq!(target.status(climate, 1e-9, 2020), TrialStatus::Solved);
    assert_eq!(
        TemperatureTarget::new(t2020 / 2.0, 1975, 2020).status(climate, 1e-9, 2020),
        TrialStatus::High
    );
    assert_eq!(target.status(climate, 1e-9, 2050), TrialStatus::Unknown);
}
