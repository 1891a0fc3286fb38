//! Sector dependency reports: Graphviz dot per period and a CSV summary.
//!
//! ```text
//! "USA:Forest" [label="Forest\n12.5"];
//! "USA:Forest" -> "USA:Paper";
//! ```
//!
//! An edge runs from the good a sector buys to the sector buying it. Goods no
//! sector of the region produces are drawn as boxes.

use std::collections::BTreeSet;
use std::io::{self, Write};

use types::Period;

use crate::World;

fn node_id(region: &str, good: &str) -> String {
    format!("\"{region}:{good}\"")
}

/// Write the dependency graph of every region for one period.
pub fn write_dependency_graph(
    world: &World,
    name: &str,
    period: Period,
    out: &mut dyn Write,
) -> io::Result<()> {
    writeln!(out, "digraph \"{name}_{period}\" {{")?;
    for region in world.regions() {
        let produced: BTreeSet<&str> = region.sectors().iter().map(|s| s.name()).collect();
        let mut external = BTreeSet::new();

        for sector in region.sectors() {
            let output = sector.summary(period).map_or(0.0, |s| s.output);
            writeln!(
                out,
                "    {} [label=\"{}\\n{:.4}\"];",
                node_id(region.name(), sector.name()),
                sector.name(),
                output
            )?;
            for input in sector.input_goods() {
                if !produced.contains(input.as_str()) {
                    external.insert(input.clone());
                }
                writeln!(
                    out,
                    "    {} -> {};",
                    node_id(region.name(), &input),
                    node_id(region.name(), sector.name())
                )?;
            }
        }
        for good in external {
            writeln!(out, "    {} [shape=box];", node_id(region.name(), &good))?;
        }
    }
    writeln!(out, "}}")
}

/// Write `region,sector,inputs` rows, inputs joined with `;`.
pub fn write_sector_dependencies(world: &World, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "region,sector,inputs")?;
    for dep in world.sector_dependencies() {
        writeln!(out, "{},{},{}", dep.region, dep.sector, dep.inputs.join(";"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Region, Sector};
    use technologies::{GenericTechnology, SimpleLandAllocator};

    fn world() -> World {
        let paper = Sector::new("Paper", 5.0)
            .with_technology(Box::new(
                GenericTechnology::new("mill", 1975).with_input("Forest", 1.2),
            ))
            .with_technology(Box::new(
                GenericTechnology::new("recycler", 1975).with_input("Electricity", 0.4),
            ));
        let forest = Sector::new("Forest", 2.0);
        World::new().with_region(
            Region::new("USA", Box::new(SimpleLandAllocator::default()))
                .with_sector(forest)
                .with_sector(paper),
        )
    }

    #[test]
    fn test_dependency_graph_edges() {
        let mut out = Vec::new();
        write_dependency_graph(&world(), "graph", 0, &mut out).unwrap();
        let dot = String::from_utf8(out).unwrap();

        assert!(dot.starts_with("digraph \"graph_0\" {"));
        assert!(dot.contains("\"USA:Forest\" -> \"USA:Paper\";"));
        assert!(dot.contains("\"USA:Electricity\" -> \"USA:Paper\";"));
        assert!(dot.contains("\"USA:Electricity\" [shape=box];"));
        assert!(!dot.contains("\"USA:Forest\" [shape=box];"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_sector_dependencies_csv() {
        let mut out = Vec::new();
        write_sector_dependencies(&world(), &mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec!["region,sector,inputs", "USA,Forest,", "USA,Paper,Electricity;Forest"]
        );
    }
}
